//! Line-oriented interactive chat.
//!
//! Input lines go through [`crate::commands::process_input`]; anything that is
//! not a command is submitted to the session. The assistant reply is printed
//! as it streams by watching the transcript revision and writing only the
//! part of the target message not yet shown.

use std::error::Error;
use std::future::Future;
use std::io::{self, Write};
use std::pin::Pin;
use std::sync::Arc;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tracing::{debug, warn};

use crate::commands::{process_input, CommandResult};
use crate::core::error::ChatError;
use crate::core::message::Message;
use crate::core::session::SessionOptions;
use crate::core::transport::ChatTransport;
use crate::ui::context::ChatContext;
use crate::utils::logging::LoggingState;

type PendingTurn = Pin<Box<dyn Future<Output = Result<Message, ChatError>> + Send>>;

const BUSY_NOTICE: &str = "Still waiting for the previous reply; message not sent.";

/// Runs an interactive chat on stdin/stdout until `/quit` or end of input.
pub async fn run_chat(
    transport: Arc<dyn ChatTransport>,
    options: SessionOptions,
    log_file: Option<String>,
) -> Result<(), Box<dyn Error>> {
    let logging = LoggingState::new(log_file)?;
    let mut ctx = ChatContext::new(transport, options, logging);
    ctx.notify(format!(
        "Chatting with {}. Type /help for commands.",
        ctx.session.model()
    ));

    let stdin = BufReader::new(tokio::io::stdin());
    let mut stdout = io::stdout();
    run_loop(&mut ctx, stdin, &mut stdout).await
}

/// Drives one chat context from `input` to `out`. When input ends while a
/// reply is streaming, the reply is allowed to finish first.
pub async fn run_loop<R, W>(
    ctx: &mut ChatContext,
    input: R,
    out: &mut W,
) -> Result<(), Box<dyn Error>>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let mut lines = input.lines();
    let mut printer = TranscriptPrinter::default();
    let mut revisions = ctx.session.transcript_store().subscribe();
    let mut pending: Option<PendingTurn> = None;
    let mut input_open = true;

    print_notices(ctx, out)?;

    loop {
        tokio::select! {
            line = lines.next_line(), if input_open => {
                let Some(line) = line? else {
                    debug!("Input closed");
                    input_open = false;
                    if pending.is_none() {
                        break;
                    }
                    continue;
                };

                match process_input(ctx, &line) {
                    CommandResult::Continue => {}
                    CommandResult::Quit => {
                        print_notices(ctx, out)?;
                        break;
                    }
                    CommandResult::NewChat => {
                        pending = None;
                        printer.finish(out)?;
                        let session_id = ctx.start_new_chat();
                        revisions = ctx.session.transcript_store().subscribe();
                        ctx.notify(format!("Started a new chat (session {session_id})."));
                    }
                    CommandResult::ProcessAsMessage(text) => {
                        ctx.session.set_composing_text(text);
                        match ctx.session.submit() {
                            Ok(turn) => {
                                printer.begin(turn.target_index());
                                pending = Some(Box::pin(turn.wait()));
                            }
                            Err(ChatError::Busy) => ctx.notify(BUSY_NOTICE),
                            Err(ChatError::Validation(_)) => {}
                            Err(err) => ctx.notify(format!("Error: {err}")),
                        }
                    }
                }
                print_notices(ctx, out)?;
            }
            changed = revisions.changed() => {
                if changed.is_err() {
                    // Old store dropped; the next iteration uses the new one.
                    revisions = ctx.session.transcript_store().subscribe();
                    continue;
                }
                printer.render(&ctx.session.transcript(), out)?;
            }
            result = wait_pending(&mut pending), if pending.is_some() => {
                pending = None;
                let transcript = ctx.session.transcript();
                printer.render(&transcript, out)?;
                let target = printer.finish(out)?;

                if let Err(err) = &result {
                    if err.is_failure() {
                        ctx.notify(format!("Error: {err}"));
                    }
                }
                if let Some(target) = target {
                    log_turn(ctx, &transcript, target);
                }
                print_notices(ctx, out)?;

                if !input_open {
                    break;
                }
            }
        }
    }

    ctx.session.close();
    Ok(())
}

async fn wait_pending(pending: &mut Option<PendingTurn>) -> Result<Message, ChatError> {
    match pending.as_mut() {
        Some(turn) => turn.await,
        None => std::future::pending().await,
    }
}

fn log_turn(ctx: &mut ChatContext, transcript: &[Message], target: usize) {
    let start = target.saturating_sub(1);
    for message in transcript.iter().take(target + 1).skip(start) {
        if let Err(e) = ctx.logging.log_transcript_message(message) {
            warn!(error = %e, "Failed to write transcript log");
            ctx.notify(format!("Log error: {e}"));
            return;
        }
    }
}

fn print_notices<W: Write>(ctx: &mut ChatContext, out: &mut W) -> io::Result<()> {
    for notice in ctx.take_notices() {
        writeln!(out, "{notice}")?;
    }
    out.flush()
}

/// Prints one assistant message incrementally.
#[derive(Debug, Default)]
pub struct TranscriptPrinter {
    target: Option<usize>,
    shown: String,
}

impl TranscriptPrinter {
    pub fn begin(&mut self, target: usize) {
        self.target = Some(target);
        self.shown.clear();
    }

    /// Writes whatever the target message gained since the last call. When
    /// the content is no longer an extension of what was shown (the apology
    /// replacing a partial reply), it starts a new line and prints it whole.
    pub fn render<W: Write>(&mut self, messages: &[Message], out: &mut W) -> io::Result<()> {
        let Some(message) = self.target.and_then(|index| messages.get(index)) else {
            return Ok(());
        };
        let content = message.content.as_str();

        match content.strip_prefix(self.shown.as_str()) {
            Some("") => return Ok(()),
            Some(suffix) => out.write_all(suffix.as_bytes())?,
            None => {
                if !self.shown.is_empty() {
                    writeln!(out)?;
                }
                out.write_all(content.as_bytes())?;
            }
        }
        self.shown.clear();
        self.shown.push_str(content);
        out.flush()
    }

    /// Ends the current message, returning the index it was printing.
    pub fn finish<W: Write>(&mut self, out: &mut W) -> io::Result<Option<usize>> {
        if !self.shown.is_empty() {
            writeln!(out)?;
            out.flush()?;
        }
        self.shown.clear();
        Ok(self.target.take())
    }
}
