use futures::StreamExt;

use crate::client::Backend;
use crate::error::{Error, Result};
use crate::modes::{ExecutionMode, ModeIo, ModeTag};
use crate::observability::STREAM_INTERRUPTS;
use crate::render::Renderer;
use crate::types::{Message, MessageRole};

/// Chats with the active model, streaming its reply to the terminal.
#[derive(Debug, Default, Clone)]
pub struct LlmMode;

impl LlmMode {
    /// Creates the mode.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait::async_trait]
impl ExecutionMode for LlmMode {
    fn tag(&self) -> ModeTag {
        ModeTag::Llm
    }

    fn prompt(&self) -> String {
        "llm> ".to_string()
    }

    /// Appends the user message, then streams the reply.
    ///
    /// On success a non-empty reply is appended as an assistant message.  On
    /// failure or interruption the partial reply is dropped and the user
    /// message stays in the history.
    async fn handle_input(&self, input: &str, io: ModeIo<'_>) {
        io.context.add(MessageRole::User, input);

        let result = stream_reply(io.backend, io.context.for_api(), &mut *io.renderer).await;
        match result {
            Ok(reply) => {
                io.renderer.finish_response();
                if !reply.is_empty() {
                    io.context.add(MessageRole::Assistant, reply);
                }
            }
            Err(err) if err.is_interrupted() => {
                STREAM_INTERRUPTS.click();
                io.renderer.print_interrupted();
            }
            Err(err) => {
                io.renderer.finish_response();
                if let Some(partial) = err.partial_content() {
                    tracing::debug!(partial, "discarding partial reply");
                }
                io.renderer
                    .print_error(&format!("Error communicating with model: {err}"));
            }
        }
    }
}

/// Echoes every fragment as it arrives and returns their concatenation.
///
/// The interrupt flag is checked between fragments; a set flag ends the
/// stream with [`Error::Interrupted`].
async fn stream_reply(
    backend: &dyn Backend,
    messages: &[Message],
    renderer: &mut dyn Renderer,
) -> Result<String> {
    let mut stream = backend.chat(messages).await?;
    let mut reply = String::new();

    loop {
        if renderer.should_interrupt() {
            return Err(Error::Interrupted);
        }
        match stream.next().await {
            Some(Ok(chunk)) => {
                if !chunk.content_fragment.is_empty() {
                    renderer.print_text(&chunk.content_fragment);
                    reply.push_str(&chunk.content_fragment);
                }
                if chunk.is_final {
                    break;
                }
            }
            Some(Err(err)) => return Err(err.with_partial_content(reply)),
            None => break,
        }
    }

    Ok(reply)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ChunkStream;
    use crate::context::ContextManager;
    use crate::render::{CapturingRenderer, RenderEvent};
    use crate::types::{ModelName, StreamChunk};
    use futures::stream;
    use std::sync::Arc;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct ScriptedBackend {
        chunks: Mutex<Option<Vec<Result<StreamChunk>>>>,
        fail_open: bool,
        seen: Mutex<Vec<Message>>,
    }

    impl ScriptedBackend {
        fn streaming(chunks: Vec<Result<StreamChunk>>) -> Self {
            Self {
                chunks: Mutex::new(Some(chunks)),
                fail_open: false,
                seen: Mutex::new(Vec::new()),
            }
        }

        fn refusing() -> Self {
            Self {
                chunks: Mutex::new(None),
                fail_open: true,
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait::async_trait]
    impl Backend for ScriptedBackend {
        async fn list_models(&self) -> Result<Vec<ModelName>> {
            Ok(vec!["llama3".to_string()])
        }

        async fn chat(&self, messages: &[Message]) -> Result<ChunkStream> {
            *self.seen.lock().unwrap() = messages.to_vec();
            if self.fail_open {
                return Err(Error::connection("connection refused", None));
            }
            let chunks = self.chunks.lock().unwrap().take().unwrap_or_default();
            Ok(Box::pin(stream::iter(chunks)))
        }

        fn model(&self) -> &str {
            "llama3"
        }

        fn set_model(&mut self, _: ModelName) {}
    }

    async fn run(backend: &ScriptedBackend, renderer: &mut CapturingRenderer) -> ContextManager {
        let mut context = ContextManager::new();
        LlmMode::new()
            .handle_input(
                "Why?",
                ModeIo {
                    context: &mut context,
                    backend,
                    renderer,
                },
            )
            .await;
        context
    }

    #[tokio::test]
    async fn fragments_are_echoed_in_order_and_concatenated() {
        let backend = ScriptedBackend::streaming(vec![
            Ok(StreamChunk::fragment("Why ")),
            Ok(StreamChunk::fragment("not")),
            Ok(StreamChunk::last("?")),
        ]);
        let mut renderer = CapturingRenderer::new();
        let context = run(&backend, &mut renderer).await;

        assert_eq!(
            renderer.events(),
            vec![
                RenderEvent::Text("Why ".to_string()),
                RenderEvent::Text("not".to_string()),
                RenderEvent::Text("?".to_string()),
                RenderEvent::FinishResponse,
            ]
        );
        assert_eq!(
            context.all(),
            &[Message::user("Why?"), Message::assistant("Why not?")]
        );
        assert_eq!(backend.seen.lock().unwrap().as_slice(), &[Message::user("Why?")]);
    }

    #[tokio::test]
    async fn chunks_after_final_are_ignored() {
        let backend = ScriptedBackend::streaming(vec![
            Ok(StreamChunk::last("done")),
            Ok(StreamChunk::fragment("extra")),
        ]);
        let mut renderer = CapturingRenderer::new();
        let context = run(&backend, &mut renderer).await;

        assert_eq!(renderer.fragments(), vec!["done"]);
        assert_eq!(context.all()[1], Message::assistant("done"));
    }

    #[tokio::test]
    async fn empty_reply_is_not_appended() {
        let backend = ScriptedBackend::streaming(vec![Ok(StreamChunk::last(""))]);
        let mut renderer = CapturingRenderer::new();
        let context = run(&backend, &mut renderer).await;

        assert_eq!(context.all(), &[Message::user("Why?")]);
    }

    #[tokio::test]
    async fn stream_failure_discards_partial_and_keeps_user_message() {
        let backend = ScriptedBackend::streaming(vec![
            Ok(StreamChunk::fragment("Why ")),
            Err(Error::streaming("connection reset", None)),
        ]);
        let mut renderer = CapturingRenderer::new();
        let context = run(&backend, &mut renderer).await;

        assert_eq!(context.all(), &[Message::user("Why?")]);
        let errors = renderer.errors();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("connection reset"));
    }

    #[tokio::test]
    async fn open_failure_is_reported() {
        let backend = ScriptedBackend::refusing();
        let mut renderer = CapturingRenderer::new();
        let context = run(&backend, &mut renderer).await;

        assert_eq!(context.size(), 1);
        assert!(renderer.errors()[0].contains("connection refused"));
        assert!(renderer.fragments().is_empty());
    }

    #[tokio::test]
    async fn interrupt_stops_streaming() {
        let backend = ScriptedBackend::streaming(vec![
            Ok(StreamChunk::fragment("a")),
            Ok(StreamChunk::last("b")),
        ]);
        let flag = Arc::new(AtomicBool::new(false));
        flag.store(true, Ordering::Relaxed);
        let mut renderer = CapturingRenderer::new().with_interrupt(flag);
        let context = run(&backend, &mut renderer).await;

        assert_eq!(renderer.events(), vec![RenderEvent::Interrupted]);
        assert_eq!(context.all(), &[Message::user("Why?")]);
    }
}
