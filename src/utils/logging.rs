use crate::core::message::Message;
use std::error::Error;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
enum LogTarget {
    Disabled,
    Active(PathBuf),
    Paused(PathBuf),
}

/// Optional plain-text transcript log, appended to one finished message at a
/// time.
#[derive(Debug)]
pub struct LoggingState {
    target: LogTarget,
}

impl LoggingState {
    pub fn new(log_file: Option<String>) -> Result<Self, Box<dyn Error>> {
        let mut logging = LoggingState {
            target: LogTarget::Disabled,
        };
        if let Some(path) = log_file {
            logging.set_log_file(path)?;
        }
        Ok(logging)
    }

    /// Points the log at `path` and activates it. The file is created up front
    /// so an unwritable path is reported now rather than after the next reply.
    pub fn set_log_file(&mut self, path: impl Into<PathBuf>) -> Result<String, Box<dyn Error>> {
        let path = path.into();
        open_append(&path)?;
        let status = format!("Logging enabled to: {}", path.display());
        self.target = LogTarget::Active(path);
        Ok(status)
    }

    /// Pauses an active log or resumes a paused one. `marker` is written as a
    /// `##` line while the log is active: before pausing, after resuming.
    pub fn toggle_logging(&mut self, marker: &str) -> Result<String, Box<dyn Error>> {
        match std::mem::replace(&mut self.target, LogTarget::Disabled) {
            LogTarget::Active(path) => {
                let written = append_lines(&path, &format!("## {marker}"));
                let status = format!("Logging paused (file: {})", path.display());
                self.target = LogTarget::Paused(path);
                written.map(|_| status)
            }
            LogTarget::Paused(path) => {
                let written = append_lines(&path, &format!("## {marker}"));
                let status = format!("Logging resumed to: {}", path.display());
                self.target = LogTarget::Active(path);
                written.map(|_| status)
            }
            LogTarget::Disabled => {
                Err("No log file specified. Use /log <filename> to enable logging first.".into())
            }
        }
    }

    /// Appends `content` followed by a blank line. A no-op unless active.
    pub fn log_message(&self, content: &str) -> Result<(), Box<dyn Error>> {
        match &self.target {
            LogTarget::Active(path) => append_lines(path, content),
            _ => Ok(()),
        }
    }

    /// User text gets a `You:` prefix; empty replies are skipped.
    pub fn log_transcript_message(&self, message: &Message) -> Result<(), Box<dyn Error>> {
        if message.is_user() {
            self.log_message(&format!("You: {}", message.content))
        } else if message.content.is_empty() {
            Ok(())
        } else {
            self.log_message(&message.content)
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self.target, LogTarget::Active(_))
    }

    pub fn status(&self) -> String {
        match &self.target {
            LogTarget::Disabled => "disabled".to_string(),
            LogTarget::Active(path) => format!("active ({})", file_name(path)),
            LogTarget::Paused(path) => format!("paused ({})", file_name(path)),
        }
    }
}

fn open_append(path: &Path) -> std::io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}

fn append_lines(path: &Path, content: &str) -> Result<(), Box<dyn Error>> {
    let mut writer = BufWriter::new(open_append(path)?);
    for line in content.lines() {
        writeln!(writer, "{line}")?;
    }
    writeln!(writer)?;
    writer.flush()?;
    Ok(())
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn disabled_logging_writes_nothing() {
        let logging = LoggingState::new(None).expect("logging");
        assert!(!logging.is_active());
        assert_eq!(logging.status(), "disabled");
        logging
            .log_message("ignored")
            .expect("no-op log should succeed");
    }

    #[test]
    fn transcript_messages_are_appended_with_spacing() {
        let temp_dir = TempDir::new().expect("temp dir");
        let path = temp_dir.path().join("chat.log");
        let logging =
            LoggingState::new(Some(path.to_string_lossy().into_owned())).expect("logging");

        logging
            .log_transcript_message(&Message::user("hello"))
            .expect("log user");
        logging
            .log_transcript_message(&Message::placeholder())
            .expect("skip empty");
        logging
            .log_transcript_message(&Message::assistant("Hi\nthere"))
            .expect("log assistant");

        let contents = std::fs::read_to_string(&path).expect("read log");
        assert_eq!(contents, "You: hello\n\nHi\nthere\n\n");
        assert_eq!(logging.status(), "active (chat.log)");
    }

    #[test]
    fn toggle_pauses_and_resumes() {
        let temp_dir = TempDir::new().expect("temp dir");
        let path = temp_dir.path().join("chat.log");
        let mut logging = LoggingState::new(None).expect("logging");

        assert!(logging.toggle_logging("paused").is_err());
        assert_eq!(logging.status(), "disabled");

        logging.set_log_file(&path).expect("set log file");
        let paused = logging.toggle_logging("Logging paused").expect("pause");
        assert!(paused.starts_with("Logging paused"));
        assert!(!logging.is_active());
        assert_eq!(logging.status(), "paused (chat.log)");
        logging.log_message("dropped").expect("paused log");

        logging.toggle_logging("Logging resumed").expect("resume");
        assert!(logging.is_active());
        logging.log_message("kept").expect("active log");

        let contents = std::fs::read_to_string(&path).expect("read log");
        assert_eq!(contents, "## Logging paused\n\n## Logging resumed\n\nkept\n\n");
    }

    #[test]
    fn unwritable_path_is_rejected() {
        let temp_dir = TempDir::new().expect("temp dir");
        let mut logging = LoggingState::new(None).expect("logging");
        assert!(logging
            .set_log_file(temp_dir.path().join("missing").join("chat.log"))
            .is_err());
        assert!(!logging.is_active());
    }
}
