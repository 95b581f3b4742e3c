//! Data models for requests, replies and stream records.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::client::ClientError;

/// Role of the message sender.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

/// A single message in a conversation.
///
/// # Example
/// ```
/// use ollama_stream::model::{Message, Role};
///
/// let message = Message::user("What is machine learning?");
/// assert_eq!(message.role, Role::User);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    pub role: Role,
    #[serde(default)]
    pub content: String,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// Token counts and timings reported with a finished generation.
///
/// Durations are in nanoseconds.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Usage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_eval_count: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eval_count: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_duration: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub load_duration: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_eval_duration: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eval_duration: Option<u64>,
}

/// Reply of a non-streamed `/api/generate` call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateResponse {
    pub model: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,

    /// The generated text.
    pub response: String,

    #[serde(default)]
    pub done: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub done_reason: Option<String>,

    #[serde(flatten)]
    pub usage: Usage,
}

/// Reply of a non-streamed `/api/chat` call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    pub model: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,

    /// The assistant turn; append it to the history to continue the conversation.
    pub message: Message,

    #[serde(default)]
    pub done: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub done_reason: Option<String>,

    #[serde(flatten)]
    pub usage: Usage,
}

/// One decoded line of a streaming reply.
///
/// Only the fields the reader acts on are typed; everything else the server
/// sends is kept in `extra` untouched.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct StreamRecord {
    /// Text delta of a `/api/generate` stream.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,

    /// Chat shape; `message.content` is the delta of a `/api/chat` stream.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<Message>,

    /// Set on the completion record.
    #[serde(default)]
    pub done: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub done_reason: Option<String>,

    /// Set when the server aborts a generation mid-stream.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl StreamRecord {
    /// Decode one raw line.
    pub fn from_line(line: &[u8]) -> Result<Self, ClientError> {
        serde_json::from_slice(line).map_err(|source| ClientError::MalformedRecord {
            line: String::from_utf8_lossy(line).into_owned(),
            source,
        })
    }

    /// The text carried by this record, from `response` or `message.content`.
    ///
    /// # Example
    /// ```
    /// use ollama_stream::model::StreamRecord;
    ///
    /// let record = StreamRecord::from_line(br#"{"response":"Hel","done":false}"#).unwrap();
    /// assert_eq!(record.fragment(), Some("Hel"));
    /// ```
    pub fn fragment(&self) -> Option<&str> {
        self.response
            .as_deref()
            .or_else(|| self.message.as_ref().map(|message| message.content.as_str()))
    }

    /// Counters and timings, present on the completion record.
    pub fn usage(&self) -> Usage {
        let field = |name: &str| self.extra.get(name).and_then(Value::as_u64);

        Usage {
            prompt_eval_count: field("prompt_eval_count"),
            eval_count: field("eval_count"),
            total_duration: field("total_duration"),
            load_duration: field("load_duration"),
            prompt_eval_duration: field("prompt_eval_duration"),
            eval_duration: field("eval_duration"),
        }
    }

    /// Model name echoed by the server, if any.
    pub fn model(&self) -> Option<&str> {
        self.extra.get("model").and_then(Value::as_str)
    }
}
