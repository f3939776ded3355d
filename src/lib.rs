// Public modules
pub mod client;
pub mod context;
pub mod error;
pub mod exec;
pub mod files;
pub mod model_cache;
pub mod modes;
pub mod ndjson;
pub mod observability;
pub mod render;
pub mod repl;
pub mod types;
pub mod utils;

// Re-exports
pub use client::{Backend, ChunkStream, DEFAULT_BASE_URL, Ollama};
pub use context::ContextManager;
pub use error::{Error, Result};
pub use exec::{ExecutionException, ExecutionOutcome, Executor, Interpreter, Shell};
pub use model_cache::{ModelCache, ModelResolution, resolve_model};
pub use modes::{ExecutionMode, ExecutionReport, ModeFactory, ModeTag};
pub use render::{CapturingRenderer, PlainTextRenderer, RenderEvent, Renderer};
pub use repl::{Repl, ReplArgs, ReplConfig, Session};
pub use types::*;
