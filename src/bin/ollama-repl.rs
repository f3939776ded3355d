//! Interactive REPL for a locally-hosted model server.
//!
//! # Usage
//!
//! ```bash
//! # Chat with a model on the default host
//! ollama-repl --model llama3
//!
//! # Use a remote host and Python for code mode
//! ollama-repl --url http://gpu-box:11434 --model llama3 \
//!     --language python --interpreter "python3 -c"
//! ```
//!
//! Plain lines go to the current mode (LLM, code or shell); lines starting
//! with `/` are commands.  Type `/help` for the list.

use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use arrrg::CommandLine;
use rustyline::Editor;
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use tracing_subscriber::EnvFilter;

use ollama_repl::repl::{CommandOutcome, ReplHelper, StdinPrompter};
use ollama_repl::{PlainTextRenderer, Repl, ReplArgs, ReplConfig, Session};

#[tokio::main]
async fn main() -> ExitCode {
    let (args, _) = ReplArgs::from_command_line_relaxed("ollama-repl [OPTIONS]");
    let config = ReplConfig::from_env_and_args(args);
    init_tracing(config.debug);

    let config = match config.validate() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{err}");
            return ExitCode::from(1);
        }
    };

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err}");
            ExitCode::from(1)
        }
    }
}

/// Diagnostics go to stderr; `RUST_LOG` overrides the debug flag.
fn init_tracing(debug: bool) {
    let default = if debug { "ollama_repl=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(config: ReplConfig) -> Result<(), Box<dyn std::error::Error>> {
    // Flag for interrupt handling during streaming
    let interrupted = Arc::new(AtomicBool::new(false));
    let interrupted_clone = interrupted.clone();
    ctrlc::set_handler(move || {
        interrupted_clone.store(true, Ordering::Relaxed);
    })?;

    let renderer = PlainTextRenderer::with_color_and_interrupt(config.use_color, interrupted.clone());
    let session = Session::from_config(&config, Box::new(renderer))?;
    let mut repl = Repl::new(session, Box::new(StdinPrompter));

    if let Err(err) = repl.startup_check().await {
        repl.session_mut().renderer().print_error(&err.to_string());
        return Err(format!(
            "Cannot reach the model server at {}. Is it running? (try `ollama serve`)",
            config.url
        )
        .into());
    }
    repl.print_banner(&config.url);

    let mut rl: Editor<ReplHelper, DefaultHistory> = Editor::new()?;
    rl.set_helper(Some(ReplHelper::new(repl.command_names())));

    loop {
        // Reset interrupt flag before each input
        interrupted.store(false, Ordering::Relaxed);
        if let Some(helper) = rl.helper_mut() {
            helper.set_models(repl.session().model_cache().cached());
        }

        match rl.readline(&repl.session().prompt()) {
            Ok(line) => {
                if !line.trim().is_empty() {
                    let _ = rl.add_history_entry(line.as_str());
                }
                if repl.handle_line(&line).await == CommandOutcome::Exit {
                    break;
                }
            }
            Err(ReadlineError::Interrupted) => {
                // Ctrl+C at prompt - soft interrupt
                repl.session_mut()
                    .renderer()
                    .print_info("(Use /exit or Ctrl+D to quit)");
            }
            Err(ReadlineError::Eof) => {
                println!("Goodbye!");
                break;
            }
            Err(err) => {
                repl.session_mut()
                    .renderer()
                    .print_error(&format!("Input error: {err}"));
                return Err(err.into());
            }
        }
    }

    Ok(())
}
