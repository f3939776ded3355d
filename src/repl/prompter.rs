//! Direct yes/no questions that bypass the line editor.

use std::collections::VecDeque;
use std::io::{self, BufRead, Write};

/// Asks the user a question and returns the raw answer.
pub trait Prompter: Send {
    /// Prints `question` and reads one line.  The trailing newline is
    /// removed; nothing else is.
    fn confirm(&mut self, question: &str) -> io::Result<String>;
}

/// Reads answers straight from stdin, so they never enter line history.
#[derive(Debug, Default)]
pub struct StdinPrompter;

impl Prompter for StdinPrompter {
    fn confirm(&mut self, question: &str) -> io::Result<String> {
        let mut stdout = io::stdout();
        write!(stdout, "{question}")?;
        stdout.flush()?;
        let mut answer = String::new();
        io::stdin().lock().read_line(&mut answer)?;
        Ok(answer.trim_end_matches(['\n', '\r']).to_string())
    }
}

/// Replays canned answers; records the questions asked.
#[derive(Debug, Default)]
pub struct ScriptedPrompter {
    answers: VecDeque<String>,
    questions: Vec<String>,
}

impl ScriptedPrompter {
    /// Creates a prompter that answers with `answers` in order, then with
    /// empty lines.
    pub fn new<S: Into<String>>(answers: impl IntoIterator<Item = S>) -> Self {
        Self {
            answers: answers.into_iter().map(Into::into).collect(),
            questions: Vec::new(),
        }
    }

    /// Every question asked so far.
    pub fn questions(&self) -> &[String] {
        &self.questions
    }
}

impl Prompter for ScriptedPrompter {
    fn confirm(&mut self, question: &str) -> io::Result<String> {
        self.questions.push(question.to_string());
        Ok(self.answers.pop_front().unwrap_or_default())
    }
}
