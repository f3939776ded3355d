//! Execution modes.
//!
//! A mode turns one line of plain (non-command) input into context entries
//! and terminal output.  There are exactly three: chatting with the model,
//! running a code snippet, and running a shell command.  [`ModeFactory`] is
//! the only place that knows all of them.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::client::Backend;
use crate::context::ContextManager;
use crate::error::{Error, Result};
use crate::exec::{Executor, Interpreter, Shell};
use crate::render::Renderer;

mod code;
mod llm;
mod report;
mod shell;

pub use code::CodeMode;
pub use llm::LlmMode;
pub use report::{EMPTY_MARKER, ExecutionReport};
pub use shell::ShellMode;

/// The closed set of modes.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ModeTag {
    /// Chat with the language model.
    Llm,
    /// Run scripting-language snippets.
    Code,
    /// Run shell commands.
    Shell,
}

impl ModeTag {
    /// Every mode, in display order.
    pub const ALL: [ModeTag; 3] = [ModeTag::Llm, ModeTag::Code, ModeTag::Shell];

    /// The lowercase name, which is also the mode's command word.
    pub fn name(&self) -> &'static str {
        match self {
            ModeTag::Llm => "llm",
            ModeTag::Code => "code",
            ModeTag::Shell => "shell",
        }
    }
}

impl fmt::Display for ModeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for ModeTag {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "llm" => Ok(ModeTag::Llm),
            "code" => Ok(ModeTag::Code),
            "shell" => Ok(ModeTag::Shell),
            _ => Err(Error::unknown_mode(s)),
        }
    }
}

/// Collaborators a mode reads and writes while handling one input.
pub struct ModeIo<'a> {
    /// The shared conversation history.
    pub context: &'a mut ContextManager,
    /// The model server.
    pub backend: &'a dyn Backend,
    /// The terminal transcript.
    pub renderer: &'a mut dyn Renderer,
}

/// One way of handling plain input.
#[async_trait::async_trait]
pub trait ExecutionMode: Send + Sync {
    /// Which mode this is.
    fn tag(&self) -> ModeTag;

    /// The short prompt shown while this mode is active.
    fn prompt(&self) -> String;

    /// Handles one line of input.
    ///
    /// Modes report every failure they can anticipate to the renderer; this
    /// never fails.
    async fn handle_input(&self, input: &str, io: ModeIo<'_>);
}

/// Builds mode instances.
///
/// Executors are shared between instances, so building a mode for a single
/// one-shot input is cheap.
#[derive(Clone)]
pub struct ModeFactory {
    interpreter: Arc<dyn Executor>,
    shell: Arc<dyn Executor>,
}

impl ModeFactory {
    /// Creates a factory using the given code and shell executors.
    pub fn new(interpreter: Arc<dyn Executor>, shell: Arc<dyn Executor>) -> Self {
        Self { interpreter, shell }
    }

    /// Creates the mode named by `tag`.
    ///
    /// Fails with [`Error::UnknownMode`] for anything but `llm`, `code` or
    /// `shell` (case-insensitive).
    pub fn create(&self, tag: &str) -> Result<Box<dyn ExecutionMode>> {
        Ok(self.create_tagged(tag.parse()?))
    }

    /// Creates the mode for an already-parsed tag.
    pub fn create_tagged(&self, tag: ModeTag) -> Box<dyn ExecutionMode> {
        match tag {
            ModeTag::Llm => Box::new(LlmMode::new()),
            ModeTag::Code => Box::new(CodeMode::new(Arc::clone(&self.interpreter))),
            ModeTag::Shell => Box::new(ShellMode::new(Arc::clone(&self.shell))),
        }
    }
}

impl Default for ModeFactory {
    fn default() -> Self {
        Self::new(Arc::new(Interpreter::default()), Arc::new(Shell::default()))
    }
}
