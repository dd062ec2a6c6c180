use std::sync::Arc;

use tracing::info;

use crate::core::session::{ChatSession, SessionOptions};
use crate::core::transport::ChatTransport;
use crate::utils::logging::LoggingState;

/// State the interactive front end threads through slash commands.
pub struct ChatContext {
    pub session: ChatSession,
    pub logging: LoggingState,
    transport: Arc<dyn ChatTransport>,
    options: SessionOptions,
    notices: Vec<String>,
}

impl ChatContext {
    pub fn new(
        transport: Arc<dyn ChatTransport>,
        options: SessionOptions,
        logging: LoggingState,
    ) -> Self {
        let session = ChatSession::new(Arc::clone(&transport), options.clone());
        Self {
            session,
            logging,
            transport,
            options,
            notices: Vec::new(),
        }
    }

    /// Queues a line for the front end to show outside the transcript.
    pub fn notify(&mut self, message: impl Into<String>) {
        self.notices.push(message.into());
    }

    pub fn take_notices(&mut self) -> Vec<String> {
        std::mem::take(&mut self.notices)
    }

    /// Abandons the current session, aborting any reply still streaming, and
    /// starts an empty one under a fresh session id. Returns the new id.
    pub fn start_new_chat(&mut self) -> String {
        self.session.close();
        let session_id = new_session_id();
        let options = SessionOptions {
            session_id: Some(session_id.clone()),
            initial_messages: Vec::new(),
            ..self.options.clone()
        };
        self.session = ChatSession::new(Arc::clone(&self.transport), options);
        info!(session_id = %session_id, "Started new chat session");
        session_id
    }
}

fn new_session_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
