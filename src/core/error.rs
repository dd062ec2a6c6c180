use std::error::Error as StdError;
use std::fmt;

/// Reasons a submit is refused before any state changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    /// The composed text is empty or whitespace only.
    EmptyInput,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::EmptyInput => write!(f, "message is empty"),
        }
    }
}

/// Everything that can end or refuse a chat turn.
///
/// `Validation` and `Busy` are rejections: nothing was appended and nothing is
/// retained. `Transport` and `Stream` are recovered into the apology message
/// and kept as the session's last error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatError {
    Validation(ValidationError),

    /// A turn is already streaming.
    Busy,

    /// The endpoint could not be reached or answered with a non-success
    /// status.
    Transport {
        status: Option<u16>,
        message: String,
    },

    /// Reading or decoding the response body failed after it started.
    Stream {
        message: String,
        /// Reply text assembled before the failure.
        partial: String,
    },

    /// The turn was aborted because its session was closed.
    Cancelled,
}

impl ChatError {
    pub fn transport(message: impl Into<String>) -> Self {
        ChatError::Transport {
            status: None,
            message: message.into(),
        }
    }

    pub fn http_status(status: u16) -> Self {
        ChatError::Transport {
            status: Some(status),
            message: format!("HTTP error! status: {status}"),
        }
    }

    pub fn stream(message: impl Into<String>, partial: impl Into<String>) -> Self {
        ChatError::Stream {
            message: message.into(),
            partial: partial.into(),
        }
    }

    /// True for failures that end a turn with the apology message.
    pub fn is_failure(&self) -> bool {
        matches!(self, ChatError::Transport { .. } | ChatError::Stream { .. })
    }
}

impl fmt::Display for ChatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChatError::Validation(err) => write!(f, "Invalid input: {err}"),
            ChatError::Busy => write!(f, "A response is still streaming"),
            ChatError::Transport { message, .. } => write!(f, "Transport error: {message}"),
            ChatError::Stream { message, .. } => write!(f, "Stream error: {message}"),
            ChatError::Cancelled => write!(f, "Request cancelled"),
        }
    }
}

impl StdError for ChatError {}

impl From<ValidationError> for ChatError {
    fn from(value: ValidationError) -> Self {
        ChatError::Validation(value)
    }
}
