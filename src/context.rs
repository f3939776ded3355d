//! The shared conversation history.

use crate::types::{Message, MessageRole};

/// Owns the ordered conversation history for one session.
///
/// Every execution mode and the file-ingest command append here; the LLM
/// mode sends the whole history with each request.  Entries are never edited
/// in place; [`ContextManager::clear`] is the only removal and it is
/// unconditional (asking the user is the caller's job).
#[derive(Debug, Default, Clone)]
pub struct ContextManager {
    messages: Vec<Message>,
}

impl ContextManager {
    /// Creates an empty history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a message.
    pub fn add(&mut self, role: MessageRole, content: impl Into<String>) {
        self.messages.push(Message::new(role, content));
    }

    /// The full history, oldest first.
    pub fn all(&self) -> &[Message] {
        &self.messages
    }

    /// The history in the shape the chat endpoint expects.
    ///
    /// This is the same sequence as [`ContextManager::all`]; the wire type
    /// already carries exactly role and content.
    pub fn for_api(&self) -> &[Message] {
        &self.messages
    }

    /// Returns true if nothing has been added since creation or the last clear.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// The number of messages.
    pub fn size(&self) -> usize {
        self.messages.len()
    }

    /// Empties the history.
    pub fn clear(&mut self) {
        self.messages.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_context_is_empty() {
        let context = ContextManager::new();
        assert!(context.is_empty());
        assert_eq!(context.size(), 0);
        assert!(context.all().is_empty());
    }

    #[test]
    fn add_preserves_call_order() {
        let mut context = ContextManager::new();
        context.add(MessageRole::User, "one");
        context.add(MessageRole::Assistant, "two");
        context.add(MessageRole::System, "three");
        context.add(MessageRole::User, "four");

        let contents: Vec<&str> = context.all().iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["one", "two", "three", "four"]);
        assert_eq!(context.size(), 4);
        assert_eq!(context.for_api(), context.all());
    }

    #[test]
    fn clear_then_all_is_empty() {
        let mut context = ContextManager::new();
        context.add(MessageRole::User, "hello");
        context.add(MessageRole::Assistant, "hi");
        context.clear();

        assert!(context.is_empty());
        assert!(context.all().is_empty());

        context.add(MessageRole::User, "again");
        assert_eq!(context.size(), 1);
    }

    #[test]
    fn size_counts_adds_since_last_clear() {
        let mut context = ContextManager::new();
        for round in 0..3 {
            for i in 0..(round + 2) {
                context.add(MessageRole::User, format!("{round}-{i}"));
            }
            assert_eq!(context.size(), round + 2);
            context.clear();
        }
        assert_eq!(context.size(), 0);
    }
}
