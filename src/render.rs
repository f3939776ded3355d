//! Output rendering for the interactive transcript.
//!
//! Everything the user sees during a session goes through a [`Renderer`]:
//! streamed assistant text, execution reports, notices and errors.  The
//! plain-text implementation writes to stdout/stderr with optional ANSI
//! styling; [`CapturingRenderer`] records output for tests and embedding.

use std::io::{self, Stdout, Write};
use std::sync::{Arc, Mutex, MutexGuard};
use std::sync::atomic::{AtomicBool, Ordering};

use crate::modes::ExecutionReport;

/// ANSI escape code for dim text.
const ANSI_DIM: &str = "\x1b[2m";

/// ANSI escape code for bold text.
const ANSI_BOLD: &str = "\x1b[1m";

/// ANSI escape code to reset all styling.
const ANSI_RESET: &str = "\x1b[0m";

/// ANSI escape code for cyan text (used for report headers).
const ANSI_CYAN: &str = "\x1b[36m";

/// ANSI escape code for yellow text (used for stderr).
const ANSI_YELLOW: &str = "\x1b[33m";

/// ANSI escape code for green text (used for stdout).
const ANSI_GREEN: &str = "\x1b[32m";

/// ANSI escape code for red text (used for errors and exceptions).
const ANSI_RED: &str = "\x1b[31m";

/// The output sink for one session.
///
/// Modes and commands never write to the terminal directly; swapping the
/// sink is how tests and non-interactive front ends observe a session.
pub trait Renderer: Send {
    /// Print a chunk of assistant text.
    ///
    /// Called once per streamed fragment, in arrival order; implementations
    /// must not batch or reorder.
    fn print_text(&mut self, text: &str);

    /// Called when a streamed response is complete.
    fn finish_response(&mut self);

    /// Print the transcript of a code or shell execution.
    fn print_report(&mut self, report: &ExecutionReport);

    /// Print a notice on its own line.
    fn print_info(&mut self, info: &str);

    /// Print a recoverable failure on its own line.
    fn print_error(&mut self, error: &str);

    /// Called when the current operation is interrupted by the user.
    fn print_interrupted(&mut self) {}

    /// Returns true if the current operation should stop.
    fn should_interrupt(&self) -> bool {
        false
    }
}

/// Writes to stdout (errors to stderr), styled with ANSI codes unless
/// color is off.
pub struct PlainTextRenderer {
    stdout: Stdout,
    use_color: bool,
    line_start: bool,
    interrupted: Option<Arc<AtomicBool>>,
}

impl PlainTextRenderer {
    /// A colored renderer with no interrupt flag.
    pub fn new() -> Self {
        Self::with_color(true)
    }

    /// A renderer with color on or off.
    pub fn with_color(use_color: bool) -> Self {
        Self {
            stdout: io::stdout(),
            use_color,
            line_start: true,
            interrupted: None,
        }
    }

    /// Reports an interrupt whenever `interrupted` is set.
    pub fn with_interrupt(self, interrupted: Arc<AtomicBool>) -> Self {
        Self {
            interrupted: Some(interrupted),
            ..self
        }
    }

    /// [`PlainTextRenderer::with_color`] plus [`PlainTextRenderer::with_interrupt`].
    pub fn with_color_and_interrupt(use_color: bool, interrupted: Arc<AtomicBool>) -> Self {
        Self::with_color(use_color).with_interrupt(interrupted)
    }

    fn write(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        let mut out = self.stdout.lock();
        let _ = out.write_all(text.as_bytes());
        let _ = out.flush();
        self.line_start = text.ends_with('\n');
    }

    fn ensure_line_start(&mut self) {
        if !self.line_start {
            self.write("\n");
        }
    }

    fn styled(&self, style: &str, text: &str) -> String {
        if self.use_color {
            format!("{style}{text}{ANSI_RESET}")
        } else {
            text.to_string()
        }
    }

    fn write_section(&mut self, style: &str, label: &str, body: &str) {
        let label = self.styled(style, label);
        self.write(&format!("{label}\n"));
        self.write(body);
        self.ensure_line_start();
    }
}

impl Default for PlainTextRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer for PlainTextRenderer {
    fn print_text(&mut self, text: &str) {
        self.write(text);
    }

    fn finish_response(&mut self) {
        self.ensure_line_start();
    }

    fn print_report(&mut self, report: &ExecutionReport) {
        self.ensure_line_start();
        let header = self.styled(ANSI_BOLD, &report.header);
        let header = self.styled(ANSI_CYAN, &header);
        self.write(&format!("{header}\n"));
        self.write_section(ANSI_GREEN, "STDOUT:", report.stdout_section());
        self.write_section(ANSI_YELLOW, "STDERR:", &report.stderr_section());
        if let Some(exception) = &report.exception {
            self.write_section(ANSI_RED, "Exception:", &exception.render());
        }
    }

    fn print_info(&mut self, info: &str) {
        self.ensure_line_start();
        self.write(&format!("{info}\n"));
    }

    fn print_error(&mut self, error: &str) {
        self.ensure_line_start();
        if self.use_color {
            eprintln!("{ANSI_RED}Error: {error}{ANSI_RESET}");
        } else {
            eprintln!("Error: {error}");
        }
    }

    fn print_interrupted(&mut self) {
        self.ensure_line_start();
        let message = self.styled(ANSI_DIM, "[interrupted]");
        self.write(&format!("{message}\n"));
    }

    fn should_interrupt(&self) -> bool {
        self.interrupted
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }
}

/// One recorded call on a [`CapturingRenderer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderEvent {
    /// A streamed text fragment.
    Text(String),
    /// End of a streamed response.
    FinishResponse,
    /// An execution transcript, rendered as plain text.
    Report(String),
    /// An informational message.
    Info(String),
    /// An error message.
    Error(String),
    /// An interruption notice.
    Interrupted,
}

/// Renderer that records every call instead of writing to the terminal.
///
/// Clones share one recording, so a test can hand a clone to a session and
/// inspect the original afterwards.
#[derive(Debug, Default, Clone)]
pub struct CapturingRenderer {
    events: Arc<Mutex<Vec<RenderEvent>>>,
    interrupted: Option<Arc<AtomicBool>>,
}

impl CapturingRenderer {
    /// Creates an empty capture.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reports an interrupt whenever `interrupted` is set.
    pub fn with_interrupt(self, interrupted: Arc<AtomicBool>) -> Self {
        Self {
            interrupted: Some(interrupted),
            ..self
        }
    }

    fn recorded(&self) -> MutexGuard<'_, Vec<RenderEvent>> {
        self.events.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn record(&self, event: RenderEvent) {
        self.recorded().push(event);
    }

    fn filtered(&self, select: impl Fn(&RenderEvent) -> Option<&String>) -> Vec<String> {
        self.recorded().iter().filter_map(select).cloned().collect()
    }

    /// Everything recorded so far, in call order.
    pub fn events(&self) -> Vec<RenderEvent> {
        self.recorded().clone()
    }

    /// The streamed text fragments, in call order.
    pub fn fragments(&self) -> Vec<String> {
        self.filtered(|event| match event {
            RenderEvent::Text(text) => Some(text),
            _ => None,
        })
    }

    /// The execution reports, in call order.
    pub fn reports(&self) -> Vec<String> {
        self.filtered(|event| match event {
            RenderEvent::Report(text) => Some(text),
            _ => None,
        })
    }

    /// The informational messages, in call order.
    pub fn infos(&self) -> Vec<String> {
        self.filtered(|event| match event {
            RenderEvent::Info(text) => Some(text),
            _ => None,
        })
    }

    /// The error messages, in call order.
    pub fn errors(&self) -> Vec<String> {
        self.filtered(|event| match event {
            RenderEvent::Error(text) => Some(text),
            _ => None,
        })
    }

    /// All recorded output joined into one string.
    pub fn transcript(&self) -> String {
        let mut out = String::new();
        for event in self.recorded().iter() {
            match event {
                RenderEvent::Text(text) => out.push_str(text),
                RenderEvent::FinishResponse => out.push('\n'),
                RenderEvent::Report(text) => out.push_str(text),
                RenderEvent::Info(text) => {
                    out.push_str(text);
                    out.push('\n');
                }
                RenderEvent::Error(text) => {
                    out.push_str("Error: ");
                    out.push_str(text);
                    out.push('\n');
                }
                RenderEvent::Interrupted => out.push_str("[interrupted]\n"),
            }
        }
        out
    }

    /// Forgets everything recorded so far.
    pub fn clear(&self) {
        self.recorded().clear();
    }
}

impl Renderer for CapturingRenderer {
    fn print_text(&mut self, text: &str) {
        self.record(RenderEvent::Text(text.to_string()));
    }

    fn finish_response(&mut self) {
        self.record(RenderEvent::FinishResponse);
    }

    fn print_report(&mut self, report: &ExecutionReport) {
        self.record(RenderEvent::Report(report.to_string()));
    }

    fn print_info(&mut self, info: &str) {
        self.record(RenderEvent::Info(info.to_string()));
    }

    fn print_error(&mut self, error: &str) {
        self.record(RenderEvent::Error(error.to_string()));
    }

    fn print_interrupted(&mut self) {
        self.record(RenderEvent::Interrupted);
    }

    fn should_interrupt(&self) -> bool {
        self.interrupted
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }
}
