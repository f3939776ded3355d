//! The interactive front end.
//!
//! - [`config`]: command-line arguments and layered settings
//! - [`session`]: the session controller owning history, cache and mode
//! - [`commands`]: slash-command parsing and the built-in commands
//! - [`prompter`]: yes/no questions outside the line editor
//! - [`helper`]: tab completion
//!
//! [`Repl`] ties them together for one line at a time; the binary owns the
//! terminal loop around it.

mod commands;
mod config;
mod helper;
mod prompter;
mod session;

pub use commands::{
    COMMAND_PREFIX, Command, CommandContext, CommandDispatcher, CommandOutcome, format_context,
    help_text, is_command, parse_command,
};
pub use config::{ReplArgs, ReplConfig};
pub use helper::ReplHelper;
pub use prompter::{Prompter, ScriptedPrompter, StdinPrompter};
pub use session::Session;

use crate::error::{Error, Result};

/// One REPL: a session, its commands and a way to ask questions.
pub struct Repl {
    session: Session,
    dispatcher: CommandDispatcher,
    prompter: Box<dyn Prompter>,
}

impl Repl {
    /// Creates a REPL with the built-in commands.
    pub fn new(session: Session, prompter: Box<dyn Prompter>) -> Self {
        Self::with_dispatcher(session, CommandDispatcher::with_default_commands(), prompter)
    }

    /// Creates a REPL with a custom command set.
    pub fn with_dispatcher(
        session: Session,
        dispatcher: CommandDispatcher,
        prompter: Box<dyn Prompter>,
    ) -> Self {
        Self {
            session,
            dispatcher,
            prompter,
        }
    }

    /// The session.
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// The session, mutably.
    pub fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    /// Every registered command name, with its prefix.
    pub fn command_names(&self) -> Vec<String> {
        self.dispatcher.names()
    }

    /// Prints where the session is connected and how to get help.
    pub fn print_banner(&mut self, url: &str) {
        let model = self.session.model().to_string();
        let mode = self.session.mode();
        let renderer = self.session.renderer();
        renderer.print_info(&format!("ollama-repl connected to {url}"));
        renderer.print_info(&format!("Model: {model}  Mode: {mode}"));
        renderer.print_info("Type /help for commands, /exit to quit.");
    }

    /// Verifies the server before the first prompt.
    ///
    /// A configured model the server does not have is reported along with
    /// the models it does have, and the session carries on.  Any other
    /// failure is returned and should end the process.
    pub async fn startup_check(&mut self) -> Result<()> {
        let checked = self.session.backend().check_reachable().await;
        match checked {
            Ok(()) => {
                self.session.models(false).await;
                Ok(())
            }
            Err(err @ Error::ModelNotFound { .. }) => {
                let renderer = self.session.renderer();
                renderer.print_error(&err.to_string());
                renderer.print_info("Use /model <name> to switch to an available model.");
                Ok(())
            }
            Err(err) => Err(err),
        }
    }

    /// Processes one line: a command, or input for the durable mode.
    ///
    /// Never fails; errors that escape a command are reported here.
    pub async fn handle_line(&mut self, line: &str) -> CommandOutcome {
        if line.trim().is_empty() {
            return CommandOutcome::Continue;
        }
        if !is_command(line) {
            self.session.handle_input(line.trim()).await;
            return CommandOutcome::Continue;
        }
        let dispatched = self
            .dispatcher
            .dispatch(line, &mut self.session, self.prompter.as_mut())
            .await;
        match dispatched {
            Ok(outcome) => outcome,
            Err(err) => {
                self.report_error(&err);
                CommandOutcome::Continue
            }
        }
    }

    /// Reports an error that no mode or command handled.
    pub fn report_error(&mut self, err: &Error) {
        tracing::debug!(error = ?err, "unhandled error");
        self.session
            .renderer()
            .print_error(&format!("{}: {err}", err.kind()));
    }
}
