use serde::{Deserialize, Serialize};

/// One line of the newline-delimited `POST /api/chat` response.
///
/// Every field is optional on the wire: missing content reads as the empty
/// string and a missing `done` reads as `false`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatResponseChunk {
    /// The assistant message fragment carried by this line.
    #[serde(default)]
    pub message: Option<ChunkMessage>,

    /// Set on the last line of the response.
    #[serde(default)]
    pub done: bool,
}

/// The nested `message` object of a response line.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChunkMessage {
    /// Normally `"assistant"`.
    #[serde(default)]
    pub role: Option<String>,

    /// The text fragment.
    #[serde(default)]
    pub content: Option<String>,
}

/// A decoded unit of a streamed chat response.
///
/// Chunks are ephemeral: only the concatenation of their fragments is ever
/// stored, as an assistant message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamChunk {
    /// The text fragment; possibly empty.
    pub content_fragment: String,

    /// True when the server marked this as the final chunk.
    pub is_final: bool,
}

impl StreamChunk {
    /// Create a non-final chunk.
    pub fn fragment(content: impl Into<String>) -> Self {
        Self {
            content_fragment: content.into(),
            is_final: false,
        }
    }

    /// Create a final chunk.
    pub fn last(content: impl Into<String>) -> Self {
        Self {
            content_fragment: content.into(),
            is_final: true,
        }
    }
}

impl From<ChatResponseChunk> for StreamChunk {
    fn from(chunk: ChatResponseChunk) -> Self {
        Self {
            content_fragment: chunk
                .message
                .and_then(|message| message.content)
                .unwrap_or_default(),
            is_final: chunk.done,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_with_content() {
        let chunk: ChatResponseChunk = serde_json::from_str(
            r#"{"model":"llama3","message":{"role":"assistant","content":"Why "},"done":false}"#,
        )
        .unwrap();
        assert_eq!(StreamChunk::from(chunk), StreamChunk::fragment("Why "));
    }

    #[test]
    fn final_chunk_without_message() {
        let chunk: ChatResponseChunk =
            serde_json::from_str(r#"{"done":true,"total_duration":12345}"#).unwrap();
        assert_eq!(StreamChunk::from(chunk), StreamChunk::last(""));
    }

    #[test]
    fn message_without_content_is_empty_fragment() {
        let chunk: ChatResponseChunk =
            serde_json::from_str(r#"{"message":{"role":"assistant"}}"#).unwrap();
        let chunk = StreamChunk::from(chunk);
        assert_eq!(chunk.content_fragment, "");
        assert!(!chunk.is_final);
    }
}
