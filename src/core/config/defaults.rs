use std::time::Duration;

use crate::core::config::data::Config;
use crate::core::constants::{DEFAULT_ENDPOINT, DEFAULT_MODEL};

/// Keys accepted by `chatstream set` / `chatstream unset`.
pub const CONFIG_KEYS: &[&str] = &[
    "endpoint",
    "model",
    "memory",
    "session-id",
    "strict-utf8",
    "connect-timeout",
];

impl Config {
    pub fn endpoint(&self) -> &str {
        self.endpoint
            .as_deref()
            .filter(|value| !value.trim().is_empty())
            .unwrap_or(DEFAULT_ENDPOINT)
    }

    pub fn model(&self) -> &str {
        self.model
            .as_deref()
            .filter(|value| !value.trim().is_empty())
            .unwrap_or(DEFAULT_MODEL)
    }

    pub fn memory(&self) -> bool {
        self.memory.unwrap_or(false)
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id
            .as_deref()
            .filter(|value| !value.is_empty())
    }

    pub fn strict_utf8(&self) -> bool {
        self.strict_utf8.unwrap_or(false)
    }

    pub fn connect_timeout(&self) -> Option<Duration> {
        self.connect_timeout_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }

    pub fn set_value(&mut self, key: &str, value: &str) -> Result<(), String> {
        let value = value.trim();
        if value.is_empty() {
            return Err(format!("A value is required for {key}"));
        }
        match canonical_key(key) {
            "endpoint" => {
                reqwest::Url::parse(value).map_err(|err| format!("Invalid endpoint URL: {err}"))?;
                self.endpoint = Some(value.to_string());
            }
            "model" => self.model = Some(value.to_string()),
            "memory" => self.memory = Some(parse_toggle(value)?),
            "session-id" => self.session_id = Some(value.to_string()),
            "strict-utf8" => self.strict_utf8 = Some(parse_toggle(value)?),
            "connect-timeout" => {
                let secs = value
                    .parse::<u64>()
                    .map_err(|_| format!("Expected a number of seconds, got '{value}'"))?;
                self.connect_timeout_secs = Some(secs);
            }
            _ => return Err(unknown_key(key)),
        }
        Ok(())
    }

    pub fn unset_value(&mut self, key: &str) -> Result<(), String> {
        match canonical_key(key) {
            "endpoint" => self.endpoint = None,
            "model" => self.model = None,
            "memory" => self.memory = None,
            "session-id" => self.session_id = None,
            "strict-utf8" => self.strict_utf8 = None,
            "connect-timeout" => self.connect_timeout_secs = None,
            _ => return Err(unknown_key(key)),
        }
        Ok(())
    }
}

/// Accepts the config-file spellings (`session_id`, `connect_timeout_secs`)
/// alongside the hyphenated command-line ones.
fn canonical_key(key: &str) -> &str {
    let spelled = key.trim().replace('_', "-");
    let spelled = spelled.strip_suffix("-secs").unwrap_or(&spelled);
    CONFIG_KEYS
        .iter()
        .copied()
        .find(|known| spelled.eq_ignore_ascii_case(known))
        .unwrap_or(key)
}

fn unknown_key(key: &str) -> String {
    format!(
        "Unknown config key: {key} (expected one of: {})",
        CONFIG_KEYS.join(", ")
    )
}

fn parse_toggle(value: &str) -> Result<bool, String> {
    match value.to_ascii_lowercase().as_str() {
        "on" | "true" | "yes" | "1" => Ok(true),
        "off" | "false" | "no" | "0" => Ok(false),
        _ => Err(format!("Expected on/off, got '{value}'")),
    }
}
