//! The chat session controller.
//!
//! A session is either idle or awaiting a reply. An accepted submit appends
//! the user message and an empty assistant placeholder, then spawns the
//! stream that fills that placeholder. While a reply is streaming every
//! further submit is refused with [`ChatError::Busy`] and nothing changes.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::api::ChatRequest;
use crate::core::chat_stream::{ChatStreamService, StreamMessage, StreamParams};
use crate::core::config::Config;
use crate::core::constants::DEFAULT_MODEL;
use crate::core::error::{ChatError, ValidationError};
use crate::core::message::Message;
use crate::core::transcript::Transcript;
use crate::core::transport::ChatTransport;

pub type ResponseObserver = Arc<dyn Fn(&Message) + Send + Sync>;
pub type ErrorObserver = Arc<dyn Fn(&ChatError) + Send + Sync>;

#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub model: String,
    pub session_id: Option<String>,
    pub memory: bool,
    pub strict_utf8: bool,
    /// Messages the transcript starts with.
    pub initial_messages: Vec<Message>,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            session_id: None,
            memory: false,
            strict_utf8: false,
            initial_messages: Vec::new(),
        }
    }
}

impl SessionOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            model: config.model().to_string(),
            session_id: config.session_id().map(str::to_string),
            memory: config.memory(),
            strict_utf8: config.strict_utf8(),
            initial_messages: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Idle,
    Awaiting,
}

struct SessionState {
    phase: SessionPhase,
    composing: String,
    last_error: Option<ChatError>,
    cancel_token: Option<CancellationToken>,
    current_stream_id: u64,
}

struct SessionInner {
    transcript: Transcript,
    stream_service: ChatStreamService,
    model: String,
    session_id: Option<String>,
    memory: bool,
    state: Mutex<SessionState>,
    on_response: Option<ResponseObserver>,
    on_error: Option<ErrorObserver>,
}

pub struct SessionBuilder {
    transport: Arc<dyn ChatTransport>,
    options: SessionOptions,
    on_response: Option<ResponseObserver>,
    on_error: Option<ErrorObserver>,
    events: Option<mpsc::UnboundedSender<(StreamMessage, u64)>>,
}

impl SessionBuilder {
    pub fn options(mut self, options: SessionOptions) -> Self {
        self.options = options;
        self
    }

    pub fn on_response(mut self, observer: impl Fn(&Message) + Send + Sync + 'static) -> Self {
        self.on_response = Some(Arc::new(observer));
        self
    }

    pub fn on_error(mut self, observer: impl Fn(&ChatError) + Send + Sync + 'static) -> Self {
        self.on_error = Some(Arc::new(observer));
        self
    }

    /// Forwards per-chunk stream events to `tx`.
    pub fn stream_events(mut self, tx: mpsc::UnboundedSender<(StreamMessage, u64)>) -> Self {
        self.events = Some(tx);
        self
    }

    pub fn build(self) -> ChatSession {
        let SessionOptions {
            model,
            session_id,
            memory,
            strict_utf8,
            initial_messages,
        } = self.options;

        let transcript = Transcript::seeded(initial_messages);
        let mut stream_service = ChatStreamService::new(self.transport, transcript.clone())
            .with_strict_utf8(strict_utf8);
        if let Some(tx) = self.events {
            stream_service = stream_service.with_events(tx);
        }

        ChatSession {
            inner: Arc::new(SessionInner {
                transcript,
                stream_service,
                model,
                session_id,
                memory,
                state: Mutex::new(SessionState {
                    phase: SessionPhase::Idle,
                    composing: String::new(),
                    last_error: None,
                    cancel_token: None,
                    current_stream_id: 0,
                }),
                on_response: self.on_response,
                on_error: self.on_error,
            }),
        }
    }
}

/// Handle to one accepted turn.
pub struct TurnHandle {
    stream_id: u64,
    target_index: usize,
    handle: JoinHandle<Result<Message, ChatError>>,
}

impl TurnHandle {
    pub fn stream_id(&self) -> u64 {
        self.stream_id
    }

    /// Transcript index of the assistant record this turn fills.
    pub fn target_index(&self) -> usize {
        self.target_index
    }

    /// Waits for the turn to finish. The session is idle again by the time
    /// this resolves. A panic inside the turn (an observer, say) is resumed
    /// on the waiting task.
    pub async fn wait(self) -> Result<Message, ChatError> {
        match self.handle.await {
            Ok(result) => result,
            Err(err) if err.is_panic() => std::panic::resume_unwind(err.into_panic()),
            Err(err) => {
                error!(stream_id = self.stream_id, error = %err, "Chat turn task failed");
                Err(ChatError::Cancelled)
            }
        }
    }
}

#[derive(Clone)]
pub struct ChatSession {
    inner: Arc<SessionInner>,
}

impl ChatSession {
    pub fn builder(transport: Arc<dyn ChatTransport>) -> SessionBuilder {
        SessionBuilder {
            transport,
            options: SessionOptions::default(),
            on_response: None,
            on_error: None,
            events: None,
        }
    }

    pub fn new(transport: Arc<dyn ChatTransport>, options: SessionOptions) -> Self {
        Self::builder(transport).options(options).build()
    }

    /// Current messages, by value.
    pub fn transcript(&self) -> Vec<Message> {
        self.inner.transcript.snapshot()
    }

    /// The shared store, for subscribing to changes.
    pub fn transcript_store(&self) -> &Transcript {
        &self.inner.transcript
    }

    pub fn composing_text(&self) -> String {
        self.inner.lock_state().composing.clone()
    }

    pub fn set_composing_text(&self, text: impl Into<String>) {
        self.inner.lock_state().composing = text.into();
    }

    pub fn phase(&self) -> SessionPhase {
        self.inner.lock_state().phase
    }

    pub fn is_busy(&self) -> bool {
        self.phase() == SessionPhase::Awaiting
    }

    pub fn last_error(&self) -> Option<ChatError> {
        self.inner.lock_state().last_error.clone()
    }

    pub fn session_id(&self) -> Option<&str> {
        self.inner.session_id.as_deref()
    }

    pub fn model(&self) -> &str {
        &self.inner.model
    }

    /// Submits the composed text. The text is read and cleared under the
    /// same lock that admits the turn.
    pub fn submit(&self) -> Result<TurnHandle, ChatError> {
        self.start_turn(None)
    }

    /// Submits `text` as the next user turn.
    ///
    /// Empty or whitespace-only text is refused with a validation error and a
    /// submit while a reply is streaming is refused with [`ChatError::Busy`];
    /// neither touches the transcript, the composed text, or the last error.
    /// Must be called from within a tokio runtime.
    pub fn send_message(&self, text: impl Into<String>) -> Result<TurnHandle, ChatError> {
        self.start_turn(Some(text.into()))
    }

    fn start_turn(&self, text: Option<String>) -> Result<TurnHandle, ChatError> {
        let params = {
            let mut state = self.inner.lock_state();
            let text = text.unwrap_or_else(|| state.composing.clone());
            if text.trim().is_empty() {
                return Err(ValidationError::EmptyInput.into());
            }
            if state.phase == SessionPhase::Awaiting {
                debug!(stream_id = state.current_stream_id, "Submit rejected while busy");
                return Err(ChatError::Busy);
            }

            state.phase = SessionPhase::Awaiting;
            state.last_error = None;
            state.composing.clear();
            state.current_stream_id += 1;
            let cancel_token = CancellationToken::new();
            state.cancel_token = Some(cancel_token.clone());

            self.inner.transcript.append(Message::user(text));
            let history = self.inner.transcript.snapshot();
            let target_index = self.inner.transcript.append(Message::placeholder()) - 1;

            StreamParams {
                request: self.inner.build_request(&history),
                target_index,
                cancel_token,
                stream_id: state.current_stream_id,
            }
        };

        let stream_id = params.stream_id;
        let target_index = params.target_index;
        info!(stream_id, target_index, "Submitting chat turn");

        let inner = Arc::clone(&self.inner);
        let handle = tokio::spawn(async move { inner.run_turn(params).await });

        Ok(TurnHandle {
            stream_id,
            target_index,
            handle,
        })
    }

    /// Aborts the in-flight turn, if any. Its response body is dropped, the
    /// placeholder keeps whatever had arrived, and no observer fires.
    pub fn close(&self) {
        let token = self.inner.lock_state().cancel_token.take();
        if let Some(token) = token {
            debug!("Cancelling in-flight chat turn");
            token.cancel();
        }
    }
}

impl SessionInner {
    fn lock_state(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn build_request(&self, history: &[Message]) -> ChatRequest {
        ChatRequest {
            messages: history.iter().map(Message::to_api).collect(),
            session_id: self.session_id.clone().unwrap_or_default(),
            model: self.model.clone(),
            memory: self.memory,
        }
    }

    async fn run_turn(self: Arc<Self>, params: StreamParams) -> Result<Message, ChatError> {
        let stream_id = params.stream_id;
        let guard = BusyGuard {
            inner: Arc::clone(&self),
            stream_id,
        };

        let result = self.stream_service.run(params).await;

        if let Err(err) = &result {
            if err.is_failure() {
                let mut state = self.lock_state();
                if state.current_stream_id == stream_id {
                    state.last_error = Some(err.clone());
                }
            }
        }
        drop(guard);

        match &result {
            Ok(message) => {
                if let Some(observer) = &self.on_response {
                    observer(message);
                }
            }
            Err(err) if err.is_failure() => {
                if let Some(observer) = &self.on_error {
                    observer(err);
                }
            }
            Err(_) => {}
        }

        result
    }
}

/// Returns the session to idle when the turn ends, however it ends.
struct BusyGuard {
    inner: Arc<SessionInner>,
    stream_id: u64,
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        let mut state = self.inner.lock_state();
        if state.current_stream_id == self.stream_id {
            state.phase = SessionPhase::Idle;
            state.cancel_token = None;
        }
    }
}
