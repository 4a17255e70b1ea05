//! Conversation transcripts
//!
//! A [`Transcript`] is the ordered message sequence sent to the reasoning
//! service. The planner trims it every iteration to its system message plus
//! the most recent messages so context growth stays bounded.

use serde::{Deserialize, Serialize};

/// Message author
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Directive
    System,
    /// User input or engine instruction
    User,
    /// Reasoning service output
    Assistant,
    /// Capability observation
    Tool,
}

/// A structured invocation request produced by the reasoning service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvocationRequest {
    /// Correlation id echoed by the observation
    pub id: String,
    /// Capability name
    pub name: String,
    /// Raw argument blob
    pub arguments: String,
}

impl InvocationRequest {
    /// Create request
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments: arguments.into(),
        }
    }
}

/// One transcript entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Author
    pub role: Role,
    /// Text content
    pub content: String,
    /// Invocations requested by an assistant message
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub invocations: Vec<InvocationRequest>,
    /// Invocation answered by a tool message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invocation_id: Option<String>,
    /// Capability that produced a tool message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Message {
    fn plain(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            invocations: Vec::new(),
            invocation_id: None,
            name: None,
        }
    }

    /// System directive
    pub fn system(content: impl Into<String>) -> Self {
        Self::plain(Role::System, content)
    }

    /// User message
    pub fn user(content: impl Into<String>) -> Self {
        Self::plain(Role::User, content)
    }

    /// Assistant text
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::plain(Role::Assistant, content)
    }

    /// Assistant reply carrying invocation requests
    pub fn assistant_with(content: impl Into<String>, invocations: Vec<InvocationRequest>) -> Self {
        Self {
            invocations,
            ..Self::plain(Role::Assistant, content)
        }
    }

    /// Observation answering an invocation
    pub fn tool(request: &InvocationRequest, content: impl Into<String>) -> Self {
        Self {
            invocation_id: Some(request.id.clone()),
            name: Some(request.name.clone()),
            ..Self::plain(Role::Tool, content)
        }
    }
}

/// Ordered message sequence
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transcript {
    messages: Vec<Message>,
}

impl Transcript {
    /// Start a transcript with a system directive
    #[must_use]
    pub fn with_system(directive: impl Into<String>) -> Self {
        Self {
            messages: vec![Message::system(directive)],
        }
    }

    /// Append a message
    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Append several messages
    pub fn extend(&mut self, messages: impl IntoIterator<Item = Message>) {
        self.messages.extend(messages);
    }

    /// Keep the first message plus the `recent` most recent ones
    pub fn trim_to_recent(&mut self, recent: usize) {
        let len = self.messages.len();
        if len <= 1 + recent {
            return;
        }
        self.messages.drain(1..len - recent);
    }

    /// All messages, oldest first
    #[inline]
    #[must_use]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Most recent message
    #[inline]
    #[must_use]
    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Number of messages
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Check if empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

/// Truncate to at most `limit` characters, marking the cut
#[must_use]
pub fn summarize(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((cut, _)) => format!("{}... [truncated, full detail in scratchpad]", &text[..cut]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn numbered(n: usize) -> Transcript {
        let mut t = Transcript::with_system("directive");
        for i in 0..n {
            t.push(Message::user(format!("m{i}")));
        }
        t
    }

    #[test]
    fn short_transcript_is_untouched() {
        let mut t = numbered(14);
        t.trim_to_recent(14);
        assert_eq!(t.len(), 15);
    }

    #[test]
    fn trim_keeps_system_and_most_recent() {
        let mut t = numbered(30);
        t.trim_to_recent(14);

        assert_eq!(t.len(), 15);
        assert_eq!(t.messages()[0], Message::system("directive"));
        assert_eq!(t.messages()[1].content, "m16");
        assert_eq!(t.last().map(|m| m.content.as_str()), Some("m29"));
    }

    #[test]
    fn tool_message_echoes_request() {
        let request = InvocationRequest::new("call-1", "web_search", "{}");
        let msg = Message::tool(&request, "results");
        assert_eq!(msg.role, Role::Tool);
        assert_eq!(msg.invocation_id.as_deref(), Some("call-1"));
        assert_eq!(msg.name.as_deref(), Some("web_search"));
    }

    #[test]
    fn summarize_respects_char_boundaries() {
        let text = "é".repeat(600);
        let brief = summarize(&text, 500);
        assert!(brief.starts_with(&"é".repeat(500)));
        assert!(brief.ends_with("... [truncated, full detail in scratchpad]"));
        assert_eq!(summarize("short", 500), "short");
    }
}
