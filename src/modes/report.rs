//! The fixed report layout shared by code and shell execution.

use std::fmt;

use crate::exec::{ExecutionException, ExecutionOutcome};

/// Marker printed for an output stream that produced nothing.
pub const EMPTY_MARKER: &str = "(empty)";

/// The formatted result of one execution.
///
/// The same report is appended to the context as a system message and
/// mirrored on the terminal; its text layout is:
///
/// ```text
/// <header>
/// STDOUT:
/// <stdout or (empty)>
/// STDERR:
/// <stderr or (empty)>
/// Exception:                  (only when one occurred)
/// <Kind>: <message>
///   <trace line>...
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionReport {
    /// First line of the report.
    pub header: String,
    /// Captured standard output.
    pub stdout: String,
    /// Captured standard error, including executor notes.
    pub stderr: String,
    /// The exception, if execution failed.
    pub exception: Option<ExecutionException>,
}

impl ExecutionReport {
    /// Builds a report from an execution outcome.
    pub fn new(header: impl Into<String>, outcome: ExecutionOutcome) -> Self {
        Self {
            header: header.into(),
            stdout: outcome.stdout,
            stderr: outcome.stderr,
            exception: outcome.exception,
        }
    }

    /// The STDOUT section body.
    pub fn stdout_section(&self) -> &str {
        section(&self.stdout)
    }

    /// The STDERR section body.
    pub fn stderr_section(&self) -> &str {
        section(&self.stderr)
    }
}

fn section(text: &str) -> &str {
    if text.trim().is_empty() {
        EMPTY_MARKER
    } else {
        text.trim_end_matches(['\n', '\r'])
    }
}

impl fmt::Display for ExecutionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.header)?;
        writeln!(f, "STDOUT:")?;
        writeln!(f, "{}", self.stdout_section())?;
        writeln!(f, "STDERR:")?;
        writeln!(f, "{}", self.stderr_section())?;
        if let Some(exception) = &self.exception {
            writeln!(f, "Exception:")?;
            writeln!(f, "{}", exception.render())?;
        }
        Ok(())
    }
}
