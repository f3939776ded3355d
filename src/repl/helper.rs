//! Tab completion for the line editor.

use rustyline::completion::{Completer, FilenameCompleter, Pair};
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::validate::Validator;
use rustyline::{Context, Helper};

use crate::repl::commands::parse_command;
use crate::types::ModelName;

/// Completes command names, model names after `/model`, and paths after
/// `/add`.
///
/// The helper holds snapshots; the loop pushes fresh ones in before each
/// prompt.
pub struct ReplHelper {
    commands: Vec<String>,
    models: Vec<ModelName>,
    files: FilenameCompleter,
}

impl ReplHelper {
    /// Creates a helper that completes the given command names.
    pub fn new(commands: Vec<String>) -> Self {
        Self {
            commands,
            models: Vec::new(),
            files: FilenameCompleter::new(),
        }
    }

    /// Replaces the model-name snapshot.
    pub fn set_models(&mut self, models: &[ModelName]) {
        self.models = models.to_vec();
    }

    /// Completion candidates for `line` ending at the cursor, and where the
    /// replaced word starts.  Path completion is not included.
    pub fn candidates(&self, line: &str) -> (usize, Vec<String>) {
        if !line.starts_with('/') {
            return (0, Vec::new());
        }
        let Some((_, partial)) = line.split_once(char::is_whitespace) else {
            let matches = self
                .commands
                .iter()
                .filter(|name| name.starts_with(line))
                .cloned()
                .collect();
            return (0, matches);
        };
        match parse_command(line) {
            Some((token, _)) if token == "model" || token == "models" => {
                let start = line.len() - partial.len();
                let matches = self
                    .models
                    .iter()
                    .map(String::as_str)
                    .chain(std::iter::once("refresh"))
                    .filter(|name| name.starts_with(partial))
                    .map(str::to_string)
                    .collect();
                (start, matches)
            }
            _ => (0, Vec::new()),
        }
    }
}

impl Completer for ReplHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let head = &line[..pos];
        if let Some((token, _)) = parse_command(head)
            && (token == "add" || token == "file")
            && head.contains(char::is_whitespace)
        {
            return self.files.complete(line, pos, ctx);
        }
        let (start, matches) = self.candidates(head);
        let pairs = matches
            .into_iter()
            .map(|candidate| Pair {
                display: candidate.clone(),
                replacement: candidate,
            })
            .collect();
        Ok((start, pairs))
    }
}

impl Hinter for ReplHelper {
    type Hint = String;
}

impl Highlighter for ReplHelper {}

impl Validator for ReplHelper {}

impl Helper for ReplHelper {}
