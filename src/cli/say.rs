//! One-shot "say" command

use std::error::Error;
use std::io::{self, Write};
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::core::chat_stream::StreamMessage;
use crate::core::error::ChatError;
use crate::core::message::Message;
use crate::core::session::{ChatSession, SessionOptions};
use crate::core::transport::ChatTransport;
use crate::utils::logging::LoggingState;

pub async fn run_say(
    transport: Arc<dyn ChatTransport>,
    options: SessionOptions,
    prompt: String,
    log_file: Option<String>,
) -> Result<(), Box<dyn Error>> {
    if prompt.trim().is_empty() {
        eprintln!("Usage: chatstream say <prompt>");
        std::process::exit(1);
    }

    let logging = LoggingState::new(log_file)?;
    let mut stdout = io::stdout();
    match say(transport, options, prompt, &logging, &mut stdout).await {
        Ok(_) => Ok(()),
        Err(SayError::Chat(err)) => {
            eprintln!("\n❌ Error: {err}");
            std::process::exit(1);
        }
        Err(SayError::Io(err)) => Err(err.into()),
    }
}

#[derive(Debug)]
pub enum SayError {
    Chat(ChatError),
    Io(io::Error),
}

impl From<io::Error> for SayError {
    fn from(err: io::Error) -> Self {
        SayError::Io(err)
    }
}

/// Sends `prompt` as a single turn and copies each streamed delta to `out`.
pub async fn say<W: Write>(
    transport: Arc<dyn ChatTransport>,
    options: SessionOptions,
    prompt: String,
    logging: &LoggingState,
    out: &mut W,
) -> Result<Message, SayError> {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let session = ChatSession::builder(transport)
        .options(options)
        .stream_events(tx)
        .build();

    let turn = session.send_message(prompt).map_err(SayError::Chat)?;
    let stream_id = turn.stream_id();

    let mut printed = false;
    while let Some((message, id)) = rx.recv().await {
        if id != stream_id {
            continue;
        }
        match message {
            StreamMessage::Chunk(content) => {
                out.write_all(content.as_bytes())?;
                out.flush()?;
                printed = true;
            }
            StreamMessage::Error(_) => {}
            StreamMessage::End => break,
        }
    }

    let result = turn.wait().await;
    if printed {
        writeln!(out)?;
        out.flush()?;
    }

    for message in session.transcript() {
        if let Err(e) = logging.log_transcript_message(&message) {
            eprintln!("Log error: {e}");
            break;
        }
    }

    result.map_err(SayError::Chat)
}
