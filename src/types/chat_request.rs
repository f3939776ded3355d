use serde::Serialize;

use crate::types::Message;

/// Body of `POST /api/chat`.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ChatRequest<'a> {
    /// The model that should answer.
    pub model: &'a str,

    /// The whole conversation, oldest first.
    pub messages: &'a [Message],

    /// Always `true`; responses are consumed incrementally.
    pub stream: bool,
}

impl<'a> ChatRequest<'a> {
    /// Create a streaming chat request.
    pub fn streaming(model: &'a str, messages: &'a [Message]) -> Self {
        Self {
            model,
            messages,
            stream: true,
        }
    }
}
