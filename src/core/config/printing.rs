use crate::core::config::data::Config;

fn on_off(value: bool) -> &'static str {
    if value {
        "on"
    } else {
        "off"
    }
}

impl Config {
    /// Effective settings, one `key: value` line each, with `(default)` marking
    /// values that are not set in the file.
    pub fn describe(&self) -> Vec<String> {
        let mark = |is_set: bool| if is_set { "" } else { " (default)" };
        let mut lines = vec![
            format!("  endpoint: {}{}", self.endpoint(), mark(self.endpoint.is_some())),
            format!("  model: {}{}", self.model(), mark(self.model.is_some())),
            format!("  memory: {}{}", on_off(self.memory()), mark(self.memory.is_some())),
        ];
        match self.session_id() {
            Some(id) => lines.push(format!("  session-id: {id}")),
            None => lines.push("  session-id: (unset)".to_string()),
        }
        lines.push(format!(
            "  strict-utf8: {}{}",
            on_off(self.strict_utf8()),
            mark(self.strict_utf8.is_some())
        ));
        match self.connect_timeout() {
            Some(timeout) => lines.push(format!("  connect-timeout: {}s", timeout.as_secs())),
            None => lines.push("  connect-timeout: (none)".to_string()),
        }
        lines
    }

    pub fn print_all(&self) {
        println!("Current configuration:");
        for line in self.describe() {
            println!("{line}");
        }
    }
}
