use std::sync::Arc;

use crate::exec::Executor;
use crate::modes::{ExecutionMode, ExecutionReport, ModeIo, ModeTag};
use crate::types::MessageRole;

/// Runs commands through the system shell.
///
/// A non-zero exit status is a normal result, noted in STDERR.  Only a
/// command that cannot be launched produces an `Exception:` section.
#[derive(Clone)]
pub struct ShellMode {
    executor: Arc<dyn Executor>,
}

impl ShellMode {
    /// Creates the mode around a shell executor.
    pub fn new(executor: Arc<dyn Executor>) -> Self {
        Self { executor }
    }
}

#[async_trait::async_trait]
impl ExecutionMode for ShellMode {
    fn tag(&self) -> ModeTag {
        ModeTag::Shell
    }

    fn prompt(&self) -> String {
        "shell$ ".to_string()
    }

    async fn handle_input(&self, input: &str, io: ModeIo<'_>) {
        io.context.add(
            MessageRole::User,
            format!("Execute shell command:\n```sh\n{input}\n```"),
        );

        let outcome = self.executor.execute(input).await;
        let report = ExecutionReport::new(format!("Shell command result: {input}"), outcome);
        io.renderer.print_report(&report);
        io.context.add(MessageRole::System, report.to_string());
    }
}
