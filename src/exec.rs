//! Local code and command execution.
//!
//! **Unsafe by design.**  Everything here runs user-supplied text with the
//! full privileges of the REPL process: no sandbox, no resource limits, no
//! filtering.  All execution goes through the [`Executor`] trait so that a
//! sandboxed implementation can be dropped in without touching the modes.
//!
//! Executors never fail: launch errors, non-zero exits and script exceptions
//! are folded into the returned [`ExecutionOutcome`] as data.

use std::process::Stdio;
use std::time::Instant;

use tokio::process::Command;

use crate::observability::{EXECUTION_DURATION, EXECUTION_FAILURES, EXECUTIONS};

/// Default interpreter program for code mode.
pub const DEFAULT_INTERPRETER: &str = "ruby -e";
/// Default language label for code mode.
pub const DEFAULT_LANGUAGE: &str = "ruby";
/// Default shell program for shell mode.
pub const DEFAULT_SHELL: &str = "/bin/sh";

/// Exit status `sh` uses when a command cannot be found.
const SHELL_NOT_FOUND: i32 = 127;
/// Exit status `sh` uses when a command is found but cannot be executed.
const SHELL_NOT_EXECUTABLE: i32 = 126;

/// An error raised while executing, kept apart from stderr.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionException {
    /// Type name, e.g. `ZeroDivisionError`.
    pub kind: String,
    /// Human-readable message.
    pub message: String,
    /// Stack trace lines, innermost first as reported; possibly empty.
    pub trace: Vec<String>,
}

impl ExecutionException {
    /// Creates an exception without a trace.
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
            trace: Vec::new(),
        }
    }

    /// Renders as `Kind: message` followed by indented trace lines.
    pub fn render(&self) -> String {
        let mut out = format!("{}: {}", self.kind, self.message);
        for line in &self.trace {
            out.push_str("\n  ");
            out.push_str(line.trim());
        }
        out
    }
}

/// Captured result of one execution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionOutcome {
    /// Everything written to standard output.
    pub stdout: String,
    /// Everything written to standard error, plus any notes the executor
    /// appends (exit status, launch failures).
    pub stderr: String,
    /// The exit code, when the process ran to completion with one.
    pub exit_code: Option<i32>,
    /// Set when execution failed rather than merely exiting non-zero.
    pub exception: Option<ExecutionException>,
}

impl ExecutionOutcome {
    /// Returns true if no exception was recorded.
    pub fn succeeded(&self) -> bool {
        self.exception.is_none()
    }

    fn append_stderr_line(&mut self, line: &str) {
        if !self.stderr.is_empty() && !self.stderr.ends_with('\n') {
            self.stderr.push('\n');
        }
        self.stderr.push_str(line);
        self.stderr.push('\n');
    }
}

/// Runs one piece of user input.
///
/// Implementations run arbitrary code and must be treated as a trust
/// boundary.  Each call starts from fresh state: nothing defined by one
/// call is visible to the next.
#[async_trait::async_trait]
pub trait Executor: Send + Sync {
    /// Label used in headers and context entries, e.g. `ruby` or `shell`.
    fn label(&self) -> &str;

    /// Runs `input` to completion and captures the outcome.
    async fn execute(&self, input: &str) -> ExecutionOutcome;
}

/// Runs snippets with a fresh scripting-language interpreter per call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interpreter {
    language: String,
    program: String,
    args: Vec<String>,
}

impl Interpreter {
    /// Creates an interpreter for `language` invoked as `command <code>`.
    ///
    /// `command` is split on whitespace: the first word is the program and
    /// the rest are leading arguments (e.g. `ruby -e`, `python3 -c`).
    pub fn new(language: impl Into<String>, command: &str) -> Self {
        let mut words = command.split_whitespace().map(str::to_string);
        let program = words.next().unwrap_or_default();
        Self {
            language: language.into(),
            program,
            args: words.collect(),
        }
    }

    /// The language label.
    pub fn language(&self) -> &str {
        &self.language
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new(DEFAULT_LANGUAGE, DEFAULT_INTERPRETER)
    }
}

#[async_trait::async_trait]
impl Executor for Interpreter {
    fn label(&self) -> &str {
        &self.language
    }

    async fn execute(&self, input: &str) -> ExecutionOutcome {
        let mut args = self.args.clone();
        args.push(input.to_string());
        match run_process(&self.program, &args).await {
            Ok(mut outcome) => {
                match outcome.exit_code {
                    Some(0) => {}
                    code => {
                        EXECUTION_FAILURES.click();
                        outcome.exception = Some(parse_script_exception(&outcome.stderr, code));
                    }
                }
                outcome
            }
            Err(err) => {
                EXECUTION_FAILURES.click();
                tracing::debug!(program = %self.program, error = %err, "interpreter launch failed");
                ExecutionOutcome {
                    exception: Some(ExecutionException::new(
                        "LaunchError",
                        format!("cannot start interpreter '{}': {err}", self.program),
                    )),
                    ..ExecutionOutcome::default()
                }
            }
        }
    }
}

/// Runs commands through the operating system's shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shell {
    program: String,
}

impl Shell {
    /// Creates a shell executor invoking `program -c <command>`.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// The shell program.
    pub fn program(&self) -> &str {
        &self.program
    }
}

impl Default for Shell {
    fn default() -> Self {
        Self::new(DEFAULT_SHELL)
    }
}

#[async_trait::async_trait]
impl Executor for Shell {
    fn label(&self) -> &str {
        "shell"
    }

    async fn execute(&self, input: &str) -> ExecutionOutcome {
        let args = ["-c".to_string(), input.to_string()];
        match run_process(&self.program, &args).await {
            Ok(mut outcome) => {
                let launch = outcome
                    .exit_code
                    .and_then(|code| launch_failure(code, &outcome).map(|reason| (code, reason)));
                match (outcome.exit_code, launch) {
                    (Some(0), _) => {}
                    (_, Some((code, reason))) => {
                        EXECUTION_FAILURES.click();
                        let detail = format!("Failed to launch command: {reason} (status {code})");
                        outcome.append_stderr_line(&detail);
                        outcome.exception = Some(ExecutionException::new("LaunchError", reason));
                    }
                    (Some(code), None) => {
                        outcome.append_stderr_line(&format!("Command exited with status: {code}"));
                    }
                    (None, _) => {
                        outcome.append_stderr_line("Command terminated by signal");
                    }
                }
                outcome
            }
            Err(err) => {
                EXECUTION_FAILURES.click();
                tracing::debug!(program = %self.program, error = %err, "shell launch failed");
                let mut outcome = ExecutionOutcome {
                    exception: Some(ExecutionException::new(
                        "LaunchError",
                        format!("cannot start '{}': {err}", self.program),
                    )),
                    ..ExecutionOutcome::default()
                };
                outcome.append_stderr_line(&format!("Failed to launch command: {err}"));
                outcome
            }
        }
    }
}

/// Whether a 126/127 exit means the shell never got the command running.
///
/// Only a run with no stdout whose stderr carries the shell's own "not
/// found" or "cannot execute" complaint counts; `echo ran; exit 127` ran.
fn launch_failure(code: i32, outcome: &ExecutionOutcome) -> Option<&'static str> {
    if !outcome.stdout.trim().is_empty() {
        return None;
    }
    let stderr = outcome.stderr.to_ascii_lowercase();
    match code {
        SHELL_NOT_FOUND if stderr.contains("not found") => Some("command not found"),
        SHELL_NOT_EXECUTABLE
            if stderr.contains("cannot execute")
                || stderr.contains("permission denied")
                || stderr.contains("is a directory") =>
        {
            Some("command not executable")
        }
        _ => None,
    }
}

/// Spawns `program args...` with no stdin and captures both output streams.
async fn run_process(program: &str, args: &[String]) -> std::io::Result<ExecutionOutcome> {
    EXECUTIONS.click();
    let start = Instant::now();
    let output = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .output()
        .await?;
    EXECUTION_DURATION.add(start.elapsed().as_secs_f64());
    Ok(ExecutionOutcome {
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        exit_code: output.status.code(),
        exception: None,
    })
}

/// Extracts the uncaught exception from an interpreter's stderr.
///
/// Understands the Ruby layout (`file:1:in 'm': message (Kind)` followed by
/// `from` lines) and the Python layout (traceback lines ending in
/// `Kind: message`).  Anything else becomes a `ScriptError` naming the exit
/// status.
fn parse_script_exception(stderr: &str, exit_code: Option<i32>) -> ExecutionException {
    let lines: Vec<&str> = stderr.lines().filter(|l| !l.trim().is_empty()).collect();

    if let Some(first) = lines.first()
        && let Some((location, message, kind)) = split_ruby_exception(first)
    {
        let mut trace = vec![location.to_string()];
        trace.extend(
            lines[1..]
                .iter()
                .map(|l| l.trim().trim_start_matches("from ").to_string()),
        );
        return ExecutionException {
            kind: kind.to_string(),
            message: message.to_string(),
            trace,
        };
    }

    if let Some(last) = lines.last()
        && let Some((kind, message)) = split_python_exception(last)
    {
        let trace = lines[..lines.len() - 1]
            .iter()
            .filter(|l| !l.starts_with("Traceback"))
            .map(|l| l.trim().to_string())
            .collect();
        return ExecutionException {
            kind: kind.to_string(),
            message: message.to_string(),
            trace,
        };
    }

    let message = match exit_code {
        Some(code) => format!("exited with status {code}"),
        None => "terminated by signal".to_string(),
    };
    ExecutionException::new("ScriptError", message)
}

/// `-e:1:in '/': divided by 0 (ZeroDivisionError)`
fn split_ruby_exception(line: &str) -> Option<(&str, &str, &str)> {
    let line = line.trim_end();
    let body = line.strip_suffix(')')?;
    let open = body.rfind(" (")?;
    let kind = &body[open + 2..];
    if !is_type_name(kind) {
        return None;
    }
    let rest = &body[..open];
    let split = rest.find(": ")?;
    let location = &rest[..split];
    if !location.contains(':') {
        return None;
    }
    Some((location, &rest[split + 2..], kind))
}

/// `ZeroDivisionError: division by zero`
fn split_python_exception(line: &str) -> Option<(&str, &str)> {
    let line = line.trim();
    let (kind, message) = match line.split_once(": ") {
        Some((kind, message)) => (kind, message),
        None => (line, ""),
    };
    let short = kind.rsplit('.').next().unwrap_or(kind);
    if is_type_name(kind)
        && (short.ends_with("Error") || short.ends_with("Exception") || short == "KeyboardInterrupt")
    {
        Some((kind, message))
    } else {
        None
    }
}

fn is_type_name(name: &str) -> bool {
    name.chars().next().is_some_and(|c| c.is_ascii_uppercase())
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == ':' || c == '.')
}
