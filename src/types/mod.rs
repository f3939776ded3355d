// Public modules
pub mod chat_request;
pub mod chat_response_chunk;
pub mod message;
pub mod model_info;
pub mod model_list_response;

// Re-exports
pub use chat_request::ChatRequest;
pub use chat_response_chunk::{ChatResponseChunk, ChunkMessage, StreamChunk};
pub use message::{Message, MessageRole};
pub use model_info::ModelInfo;
pub use model_list_response::ModelListResponse;

/// Opaque name of a model on the serving host.
///
/// Only string equality and prefix matching are meaningful.
pub type ModelName = String;
