use std::sync::Arc;

use crate::exec::Executor;
use crate::modes::{ExecutionMode, ExecutionReport, ModeIo, ModeTag};
use crate::types::MessageRole;

/// Runs scripting-language snippets.
///
/// Each input gets a fresh interpreter; variables and definitions do not
/// carry over between inputs.
#[derive(Clone)]
pub struct CodeMode {
    executor: Arc<dyn Executor>,
}

impl CodeMode {
    /// Creates the mode around an interpreter.
    pub fn new(executor: Arc<dyn Executor>) -> Self {
        Self { executor }
    }

    fn language(&self) -> &str {
        self.executor.label()
    }
}

#[async_trait::async_trait]
impl ExecutionMode for CodeMode {
    fn tag(&self) -> ModeTag {
        ModeTag::Code
    }

    fn prompt(&self) -> String {
        format!("{}> ", self.language())
    }

    async fn handle_input(&self, input: &str, io: ModeIo<'_>) {
        let language = self.language();
        io.context.add(
            MessageRole::User,
            format!("Execute {language} code:\n```{language}\n{input}\n```"),
        );

        let outcome = self.executor.execute(input).await;
        let report = ExecutionReport::new(format!("{} execution result:", title(language)), outcome);
        io.renderer.print_report(&report);
        io.context.add(MessageRole::System, report.to_string());
    }
}

fn title(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{Backend, ChunkStream};
    use crate::context::ContextManager;
    use crate::exec::{ExecutionException, ExecutionOutcome};
    use crate::render::{CapturingRenderer, RenderEvent};
    use crate::types::{Message, ModelName};
    use crate::{Error, Result};

    struct FixedExecutor(ExecutionOutcome);

    #[async_trait::async_trait]
    impl Executor for FixedExecutor {
        fn label(&self) -> &str {
            "ruby"
        }

        async fn execute(&self, _: &str) -> ExecutionOutcome {
            self.0.clone()
        }
    }

    struct NoBackend;

    #[async_trait::async_trait]
    impl Backend for NoBackend {
        async fn list_models(&self) -> Result<Vec<ModelName>> {
            Ok(Vec::new())
        }

        async fn chat(&self, _: &[Message]) -> Result<ChunkStream> {
            Err(Error::unknown("code mode never chats"))
        }

        fn model(&self) -> &str {
            ""
        }

        fn set_model(&mut self, _: ModelName) {}
    }

    async fn run(outcome: ExecutionOutcome, input: &str) -> (ContextManager, CapturingRenderer) {
        let mode = CodeMode::new(Arc::new(FixedExecutor(outcome)));
        let mut context = ContextManager::new();
        let mut renderer = CapturingRenderer::new();
        mode.handle_input(
            input,
            ModeIo {
                context: &mut context,
                backend: &NoBackend,
                renderer: &mut renderer,
            },
        )
        .await;
        (context, renderer)
    }

    #[tokio::test]
    async fn hello_report() {
        let (context, renderer) = run(
            ExecutionOutcome {
                stdout: "Hello\n".to_string(),
                exit_code: Some(0),
                ..ExecutionOutcome::default()
            },
            "puts 'Hello'",
        )
        .await;

        let messages = context.all();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, MessageRole::User);
        assert_eq!(
            messages[0].content,
            "Execute ruby code:\n```ruby\nputs 'Hello'\n```"
        );
        assert_eq!(messages[1].role, MessageRole::System);
        assert!(messages[1].content.starts_with("Ruby execution result:\n"));
        assert!(messages[1].content.contains("STDOUT:\nHello"));
        assert!(messages[1].content.contains("STDERR:\n(empty)"));
        assert!(!messages[1].content.contains("Exception:"));
        assert_eq!(
            renderer.events(),
            vec![RenderEvent::Report(messages[1].content.clone())]
        );
    }

    #[tokio::test]
    async fn silent_code_reports_both_empty() {
        let (context, _) = run(ExecutionOutcome::default(), "x = 1").await;
        let report = &context.all()[1].content;
        assert!(report.contains("STDOUT:\n(empty)"));
        assert!(report.contains("STDERR:\n(empty)"));
    }

    #[tokio::test]
    async fn exception_is_reported_once() {
        let (context, _) = run(
            ExecutionOutcome {
                stderr: "-e:1:in '/': divided by 0 (ZeroDivisionError)\n".to_string(),
                exit_code: Some(1),
                exception: Some(ExecutionException::new("ZeroDivisionError", "divided by 0")),
                ..ExecutionOutcome::default()
            },
            "1/0",
        )
        .await;

        assert_eq!(context.size(), 2);
        let report = &context.all()[1].content;
        assert!(report.contains("Exception:\nZeroDivisionError: divided by 0"));
    }
}
