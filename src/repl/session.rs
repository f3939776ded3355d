//! The session controller: one conversation, one durable mode.

use std::sync::Arc;

use crate::client::{Backend, Ollama};
use crate::context::ContextManager;
use crate::error::Result;
use crate::exec::{Interpreter, Shell};
use crate::model_cache::ModelCache;
use crate::modes::{ExecutionMode, ModeFactory, ModeIo, ModeTag};
use crate::render::Renderer;
use crate::repl::ReplConfig;
use crate::types::ModelName;

/// Owns all mutable state of one REPL session.
///
/// The history, the model cache and the active mode live here and are
/// handed by reference to whatever needs them for the duration of one
/// input.  Everything runs on the caller's task; nothing is shared.
pub struct Session {
    context: ContextManager,
    backend: Box<dyn Backend>,
    model_cache: ModelCache,
    factory: ModeFactory,
    mode: Box<dyn ExecutionMode>,
    renderer: Box<dyn Renderer>,
}

impl Session {
    /// Creates a session in LLM mode with an empty history.
    pub fn new(
        backend: Box<dyn Backend>,
        factory: ModeFactory,
        model_cache: ModelCache,
        renderer: Box<dyn Renderer>,
    ) -> Self {
        let mode = factory.create_tagged(ModeTag::Llm);
        Self {
            context: ContextManager::new(),
            backend,
            model_cache,
            factory,
            mode,
            renderer,
        }
    }

    /// Creates a session talking to the configured server with the
    /// configured executors.
    pub fn from_config(config: &ReplConfig, renderer: Box<dyn Renderer>) -> Result<Self> {
        let backend = Ollama::new(&config.url, &config.model)?;
        let factory = ModeFactory::new(
            Arc::new(Interpreter::new(&config.language, &config.interpreter)),
            Arc::new(Shell::new(&config.shell)),
        );
        Ok(Self::new(
            Box::new(backend),
            factory,
            ModelCache::with_duration(config.cache_duration),
            renderer,
        ))
    }

    /// The durable mode.
    pub fn mode(&self) -> ModeTag {
        self.mode.tag()
    }

    /// The prompt of the durable mode.
    pub fn prompt(&self) -> String {
        self.mode.prompt()
    }

    /// Replaces the durable mode and announces the change.
    pub fn switch_mode(&mut self, tag: ModeTag) {
        self.mode = self.factory.create_tagged(tag);
        tracing::debug!(mode = %tag, "switched mode");
        self.renderer.print_info(&format!("Switched to {tag} mode"));
    }

    /// [`Session::switch_mode`] by name; fails for unknown names.
    pub fn switch_mode_named(&mut self, tag: &str) -> Result<()> {
        self.switch_mode(tag.parse()?);
        Ok(())
    }

    /// Feeds one input to the durable mode.
    pub async fn handle_input(&mut self, input: &str) {
        let io = ModeIo {
            context: &mut self.context,
            backend: self.backend.as_ref(),
            renderer: self.renderer.as_mut(),
        };
        self.mode.handle_input(input, io).await;
    }

    /// Feeds one input to a fresh instance of `tag`, leaving the durable
    /// mode untouched.
    pub async fn run_once(&mut self, tag: ModeTag, input: &str) {
        let mode = self.factory.create_tagged(tag);
        let io = ModeIo {
            context: &mut self.context,
            backend: self.backend.as_ref(),
            renderer: self.renderer.as_mut(),
        };
        mode.handle_input(input, io).await;
    }

    /// The model list, served from the cache when it is fresh.
    pub async fn models(&mut self, force_refresh: bool) -> Vec<ModelName> {
        self.model_cache
            .get_models(self.backend.as_ref(), force_refresh)
            .await
    }

    /// The active model.
    pub fn model(&self) -> &str {
        self.backend.model()
    }

    /// Replaces the active model.  The history is not touched.
    pub fn set_model(&mut self, model: ModelName) {
        tracing::debug!(model = %model, "active model changed");
        self.backend.set_model(model);
    }

    /// The conversation history.
    pub fn context(&self) -> &ContextManager {
        &self.context
    }

    /// The conversation history, mutably.
    pub fn context_mut(&mut self) -> &mut ContextManager {
        &mut self.context
    }

    /// The model server.
    pub fn backend(&self) -> &dyn Backend {
        self.backend.as_ref()
    }

    /// The model list cache.
    pub fn model_cache(&self) -> &ModelCache {
        &self.model_cache
    }

    /// The output sink.
    pub fn renderer(&mut self) -> &mut dyn Renderer {
        self.renderer.as_mut()
    }
}
