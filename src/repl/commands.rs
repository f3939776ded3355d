//! Slash commands.
//!
//! A line starting with `/` is a command.  The first word picks the
//! command case-insensitively; everything after it is handed over as one
//! unsplit argument string.  Commands report their own failures to the
//! renderer; only unanticipated errors come back to the caller.

use std::collections::BTreeMap;

use crate::error::{Error, Result};
use crate::files;
use crate::model_cache::{ModelResolution, resolve_model};
use crate::modes::ModeTag;
use crate::repl::{Prompter, Session};
use crate::types::MessageRole;

/// Marker that introduces a command.
pub const COMMAND_PREFIX: char = '/';

/// What the loop should do after a command.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    /// Read the next line.
    Continue,
    /// Leave the loop and exit successfully.
    Exit,
}

/// Everything a command may touch.
pub struct CommandContext<'a> {
    /// The session controller, which owns the history and the output sink.
    pub session: &'a mut Session,
    /// Direct questions to the user.
    pub prompter: &'a mut dyn Prompter,
}

/// One slash command.
#[async_trait::async_trait]
pub trait Command: Send + Sync {
    /// Runs the command with the raw argument string (possibly empty).
    async fn execute(&self, args: &str, ctx: &mut CommandContext<'_>) -> Result<CommandOutcome>;
}

/// Splits a command line into its lowercase token and the remainder.
///
/// The leading `/` is optional.  The remainder is kept as typed apart from
/// the whitespace separating it from the token.  Returns `None` for a blank
/// line.
pub fn parse_command(input: &str) -> Option<(String, &str)> {
    let input = input.trim_start();
    let input = input.strip_prefix(COMMAND_PREFIX).unwrap_or(input);
    let (token, args) = match input.split_once(char::is_whitespace) {
        Some((token, args)) => (token, args.trim_start()),
        None => (input, ""),
    };
    if token.is_empty() {
        return None;
    }
    Some((token.to_lowercase(), args))
}

/// Returns true if `line` should go to the dispatcher rather than a mode.
pub fn is_command(line: &str) -> bool {
    line.trim_start().starts_with(COMMAND_PREFIX)
}

/// Routes command lines to registered commands.
#[derive(Default)]
pub struct CommandDispatcher {
    commands: BTreeMap<String, Box<dyn Command>>,
}

impl CommandDispatcher {
    /// Creates a dispatcher with no commands.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a dispatcher with every built-in command and alias.
    pub fn with_default_commands() -> Self {
        let mut dispatcher = Self::new();
        for tag in ModeTag::ALL {
            dispatcher.register(tag.name(), Box::new(ModeCommand(tag)));
        }
        dispatcher.register("add", Box::new(AddFileCommand));
        dispatcher.register("file", Box::new(AddFileCommand));
        dispatcher.register("model", Box::new(ModelCommand));
        dispatcher.register("models", Box::new(ModelCommand));
        dispatcher.register("context", Box::new(ContextCommand));
        dispatcher.register("clear", Box::new(ClearCommand));
        dispatcher.register("help", Box::new(HelpCommand));
        dispatcher.register("?", Box::new(HelpCommand));
        dispatcher.register("exit", Box::new(ExitCommand));
        dispatcher.register("quit", Box::new(ExitCommand));
        dispatcher.register("q", Box::new(ExitCommand));
        dispatcher
    }

    /// Registers `command` under `name`, replacing any previous one.
    pub fn register(&mut self, name: &str, command: Box<dyn Command>) {
        self.commands.insert(name.to_lowercase(), command);
    }

    /// Registered names, sorted, each with the command prefix.
    pub fn names(&self) -> Vec<String> {
        self.commands
            .keys()
            .map(|name| format!("{COMMAND_PREFIX}{name}"))
            .collect()
    }

    /// Parses and runs one command line.
    ///
    /// An unregistered command prints a notice and continues.
    pub async fn dispatch(
        &self,
        input: &str,
        session: &mut Session,
        prompter: &mut dyn Prompter,
    ) -> Result<CommandOutcome> {
        let Some((token, args)) = parse_command(input) else {
            return Ok(CommandOutcome::Continue);
        };
        let Some(command) = self.commands.get(&token) else {
            session.renderer().print_error(&format!(
                "Unknown command: {COMMAND_PREFIX}{token} (type /help for a list)"
            ));
            return Ok(CommandOutcome::Continue);
        };
        tracing::debug!(command = %token, "dispatching command");
        let mut ctx = CommandContext { session, prompter };
        command.execute(args, &mut ctx).await
    }
}

/// `/llm`, `/code`, `/shell`: switch durably, or run one input.
struct ModeCommand(ModeTag);

#[async_trait::async_trait]
impl Command for ModeCommand {
    async fn execute(&self, args: &str, ctx: &mut CommandContext<'_>) -> Result<CommandOutcome> {
        if args.is_empty() {
            ctx.session.switch_mode(self.0);
        } else {
            ctx.session.run_once(self.0, args).await;
        }
        Ok(CommandOutcome::Continue)
    }
}

/// `/add <path>`: puts a file into the context as a system message.
struct AddFileCommand;

#[async_trait::async_trait]
impl Command for AddFileCommand {
    async fn execute(&self, args: &str, ctx: &mut CommandContext<'_>) -> Result<CommandOutcome> {
        let args = args.trim_end();
        if args.is_empty() {
            ctx.session.renderer().print_info("Usage: /add <path>");
            return Ok(CommandOutcome::Continue);
        }
        match files::read_file(args).await {
            Ok(content) => {
                ctx.session
                    .context_mut()
                    .add(MessageRole::System, files::ingest_message(args, &content));
                ctx.session.renderer().print_info(&format!(
                    "Added {args} to context ({} bytes)",
                    content.len()
                ));
            }
            Err(err @ (Error::FileNotFound { .. } | Error::FileNotReadable { .. } | Error::Io { .. })) => {
                ctx.session.renderer().print_error(&err.to_string());
            }
            Err(err) => return Err(err),
        }
        Ok(CommandOutcome::Continue)
    }
}

/// `/model [name|refresh]`: lists models or switches the active one.
struct ModelCommand;

impl ModelCommand {
    async fn list(ctx: &mut CommandContext<'_>, force_refresh: bool) {
        let models = ctx.session.models(force_refresh).await;
        let current = ctx.session.model().to_string();
        let renderer = ctx.session.renderer();
        renderer.print_info(&format!("Current model: {current}"));
        if models.is_empty() {
            renderer.print_info("No models available (is the server running?)");
            return;
        }
        renderer.print_info("Available models:");
        for name in &models {
            let marker = if *name == current { "*" } else { " " };
            renderer.print_info(&format!("  {marker} {name}"));
        }
    }
}

#[async_trait::async_trait]
impl Command for ModelCommand {
    async fn execute(&self, args: &str, ctx: &mut CommandContext<'_>) -> Result<CommandOutcome> {
        match args.trim_end() {
            "" => Self::list(ctx, false).await,
            "refresh" => Self::list(ctx, true).await,
            query => {
                let models = ctx.session.models(false).await;
                match resolve_model(query, &models) {
                    ModelResolution::Exact(name) | ModelResolution::UniquePrefix(name) => {
                        ctx.session.set_model(name.clone());
                        ctx.session
                            .renderer()
                            .print_info(&format!("Switched to model: {name}"));
                    }
                    ModelResolution::Ambiguous(matches) => {
                        ctx.session.renderer().print_info(&format!(
                            "Ambiguous model name '{query}' matches: {}",
                            matches.join(", ")
                        ));
                    }
                    ModelResolution::NotFound => {
                        ctx.session.renderer().print_error(&format!(
                            "Model '{query}' not found; use /model to list available models"
                        ));
                    }
                }
            }
        }
        Ok(CommandOutcome::Continue)
    }
}

/// `/context`: prints the whole history.
struct ContextCommand;

/// Formats the history as numbered entries separated by `---`.
pub fn format_context(messages: &[crate::types::Message]) -> String {
    let mut out = String::new();
    for (index, message) in messages.iter().enumerate() {
        out.push_str(&format!(
            "{}. {}:\n{}\n---\n",
            index + 1,
            message.role.display_name(),
            message.content
        ));
    }
    out
}

#[async_trait::async_trait]
impl Command for ContextCommand {
    async fn execute(&self, _: &str, ctx: &mut CommandContext<'_>) -> Result<CommandOutcome> {
        if ctx.session.context().is_empty() {
            ctx.session.renderer().print_info("Context is empty.");
        } else {
            let text = format_context(ctx.session.context().all());
            ctx.session.renderer().print_info(text.trim_end());
        }
        Ok(CommandOutcome::Continue)
    }
}

/// `/clear`: empties the history after an explicit `y`.
struct ClearCommand;

#[async_trait::async_trait]
impl Command for ClearCommand {
    async fn execute(&self, _: &str, ctx: &mut CommandContext<'_>) -> Result<CommandOutcome> {
        let answer = ctx
            .prompter
            .confirm("Clear the conversation context? (y/N) ")
            .map_err(|e| Error::io("failed to read confirmation", e))?;
        if answer == "y" {
            ctx.session.context_mut().clear();
            ctx.session.renderer().print_info("Context cleared.");
        } else {
            ctx.session.renderer().print_info("Context kept.");
        }
        Ok(CommandOutcome::Continue)
    }
}

/// `/help`: the command reference.
struct HelpCommand;

/// Returns the help text for the command reference.
pub fn help_text() -> &'static str {
    r#"Commands:
  /llm [text]       Switch to LLM mode, or send one message
  /code [code]      Switch to code mode, or run one snippet
  /shell [command]  Switch to shell mode, or run one command
  /add <path>       Add a file to the context (alias: /file)
  /model            List models and show the current one (alias: /models)
  /model <name>     Switch model; a unique prefix is enough
  /model refresh    Refetch the model list
  /context          Show the conversation context
  /clear            Clear the conversation context
  /help             Show this help (alias: /?)
  /exit             Exit (aliases: /quit, /q)

Anything else is sent to the current mode.  Ctrl+C interrupts a reply."#
}

#[async_trait::async_trait]
impl Command for HelpCommand {
    async fn execute(&self, _: &str, ctx: &mut CommandContext<'_>) -> Result<CommandOutcome> {
        ctx.session.renderer().print_info(help_text());
        Ok(CommandOutcome::Continue)
    }
}

/// `/exit`.
struct ExitCommand;

#[async_trait::async_trait]
impl Command for ExitCommand {
    async fn execute(&self, _: &str, ctx: &mut CommandContext<'_>) -> Result<CommandOutcome> {
        ctx.session.renderer().print_info("Goodbye!");
        Ok(CommandOutcome::Exit)
    }
}
