use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq, Eq)]
pub struct Config {
    /// Chat endpoint that receives the POSTed conversation
    pub endpoint: Option<String>,
    /// Model selector sent with every request (e.g., "gpt-4o-mini")
    pub model: Option<String>,
    /// Ask the server to keep session memory
    pub memory: Option<bool>,
    /// Conversation identifier forwarded to the server
    pub session_id: Option<String>,
    /// Treat invalid UTF-8 in a reply as a stream error instead of replacing it
    pub strict_utf8: Option<bool>,
    /// Give up connecting to the endpoint after this many seconds
    pub connect_timeout_secs: Option<u64>,
}

/// Get a user-friendly display string for a path
/// Converts absolute paths to use ~ notation on Unix-like systems when possible
///
/// # Examples
/// - Unix: `/home/user/.config/chatstream/config.toml` → `~/.config/chatstream/config.toml`
/// - Windows: paths are returned unchanged
pub fn path_display<P: AsRef<Path>>(path: P) -> String {
    let path = path.as_ref();

    #[cfg(unix)]
    {
        if let Some(home) = std::env::var_os("HOME") {
            let home_path = PathBuf::from(home);
            if let Ok(relative) = path.strip_prefix(&home_path) {
                return format!("~/{}", relative.display());
            }
        }
    }

    path.display().to_string()
}
