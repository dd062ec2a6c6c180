//! Shared constants used across the application

/// Content written into the assistant record when a turn fails.
pub const APOLOGY_MESSAGE: &str = "Sorry, there was an error processing your request.";

pub const DEFAULT_ENDPOINT: &str = "http://localhost:8000/api/chat";

pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Environment variable holding the `tracing` filter directive.
pub const LOG_ENV_VAR: &str = "CHATSTREAM_LOG";
