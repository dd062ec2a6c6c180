use std::sync::Arc;

use futures_util::StreamExt;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::api::ChatRequest;
use crate::core::constants::APOLOGY_MESSAGE;
use crate::core::decoder::Utf8StreamDecoder;
use crate::core::error::ChatError;
use crate::core::message::Message;
use crate::core::transcript::Transcript;
use crate::core::transport::ChatTransport;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StreamMessage {
    Chunk(String),
    Error(String),
    End,
}

pub struct StreamParams {
    pub request: ChatRequest,
    /// Index of the assistant placeholder the reply is folded into.
    pub target_index: usize,
    pub cancel_token: CancellationToken,
    pub stream_id: u64,
}

/// Runs one request/response exchange and folds the streamed body into a
/// single assistant record of the transcript.
#[derive(Clone)]
pub struct ChatStreamService {
    transport: Arc<dyn ChatTransport>,
    transcript: Transcript,
    strict_utf8: bool,
    events: Option<mpsc::UnboundedSender<(StreamMessage, u64)>>,
}

impl ChatStreamService {
    pub fn new(transport: Arc<dyn ChatTransport>, transcript: Transcript) -> Self {
        Self {
            transport,
            transcript,
            strict_utf8: false,
            events: None,
        }
    }

    pub fn with_strict_utf8(mut self, strict: bool) -> Self {
        self.strict_utf8 = strict;
        self
    }

    /// Mirrors every decoded delta, failure and completion onto `tx`.
    pub fn with_events(mut self, tx: mpsc::UnboundedSender<(StreamMessage, u64)>) -> Self {
        self.events = Some(tx);
        self
    }

    /// Drives the exchange to completion.
    ///
    /// On success the target holds the full reply and that message is
    /// returned. On a transport or stream failure the target is overwritten
    /// with [`APOLOGY_MESSAGE`], whether or not chunks had already arrived.
    /// Cancellation drops the response body and leaves the target as it was.
    pub async fn run(&self, params: StreamParams) -> Result<Message, ChatError> {
        let StreamParams {
            request,
            target_index,
            cancel_token,
            stream_id,
        } = params;

        let result = tokio::select! {
            biased;
            _ = cancel_token.cancelled() => Err(ChatError::Cancelled),
            result = self.consume(&request, target_index, stream_id) => result,
        };

        match &result {
            Ok(message) => {
                debug!(stream_id, bytes = message.content.len(), "Chat stream completed");
                self.emit(StreamMessage::End, stream_id);
            }
            Err(ChatError::Cancelled) => {
                debug!(stream_id, "Chat stream cancelled");
            }
            Err(err) => {
                warn!(stream_id, target_index, error = %err, "Chat stream failed");
                self.transcript
                    .replace_at(target_index, Message::assistant(APOLOGY_MESSAGE));
                self.emit(StreamMessage::Error(err.to_string()), stream_id);
                self.emit(StreamMessage::End, stream_id);
            }
        }

        result
    }

    async fn consume(
        &self,
        request: &ChatRequest,
        target_index: usize,
        stream_id: u64,
    ) -> Result<Message, ChatError> {
        debug!(
            stream_id,
            target_index,
            messages = request.messages.len(),
            model = %request.model,
            "Opening chat stream"
        );
        let mut body = self.transport.open(request).await?;
        let mut decoder = Utf8StreamDecoder::with_strict(self.strict_utf8);
        let mut accumulated = String::new();

        while let Some(chunk) = body.next().await {
            let bytes = chunk.map_err(|message| ChatError::stream(message, accumulated.as_str()))?;
            let delta = decoder
                .decode(&bytes)
                .map_err(|err| ChatError::stream(err.to_string(), accumulated.as_str()))?;
            self.fold(target_index, &mut accumulated, &delta, stream_id);
        }

        let tail = decoder
            .finish()
            .map_err(|err| ChatError::stream(err.to_string(), accumulated.as_str()))?;
        self.fold(target_index, &mut accumulated, &tail, stream_id);

        Ok(Message::assistant(accumulated))
    }

    fn fold(&self, target_index: usize, accumulated: &mut String, delta: &str, stream_id: u64) {
        if delta.is_empty() {
            return;
        }
        accumulated.push_str(delta);
        self.transcript
            .replace_at(target_index, Message::assistant(accumulated.as_str()));
        self.emit(StreamMessage::Chunk(delta.to_string()), stream_id);
    }

    fn emit(&self, message: StreamMessage, stream_id: u64) {
        if let Some(tx) = &self.events {
            let _ = tx.send((message, stream_id));
        }
    }
}
