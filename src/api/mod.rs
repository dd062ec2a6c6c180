use serde::{Deserialize, Serialize};

/// A single role/content pair as sent on the wire. Transcript metadata never
/// leaves the process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

/// The request envelope posted once per user turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
    /// Empty when the exchange is stateless from the server's perspective.
    #[serde(default)]
    pub session_id: String,
    pub model: String,
    #[serde(default)]
    pub memory: bool,
}
