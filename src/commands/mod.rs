mod registry;

pub use registry::{all_commands, find_command, Command, CommandInvocation};

use crate::ui::context::ChatContext;

#[derive(Debug, PartialEq, Eq)]
pub enum CommandResult {
    Continue,
    ProcessAsMessage(String),
    NewChat,
    Quit,
}

/// Routes a line of input: known slash commands run here, anything else
/// (including unknown `/words`) is a chat message.
pub fn process_input(ctx: &mut ChatContext, input: &str) -> CommandResult {
    let trimmed = input.trim();

    let Some(rest) = trimmed.strip_prefix('/') else {
        return CommandResult::ProcessAsMessage(input.to_string());
    };

    let mut parts = rest.splitn(2, ' ');
    let command_name = match parts.next() {
        Some(name) if !name.is_empty() => name,
        _ => return CommandResult::ProcessAsMessage(input.to_string()),
    };
    let args = parts.next().unwrap_or("").trim();

    match find_command(command_name) {
        Some(command) => (command.handler)(ctx, CommandInvocation { args }),
        None => CommandResult::ProcessAsMessage(input.to_string()),
    }
}

fn log_timestamp() -> String {
    chrono::Local::now()
        .format("%Y-%m-%d %H:%M:%S %Z")
        .to_string()
}

pub(super) fn handle_help(
    ctx: &mut ChatContext,
    _invocation: CommandInvocation<'_>,
) -> CommandResult {
    ctx.notify("Commands:");
    for command in all_commands() {
        ctx.notify(format!("  {:<18}{}", command.usage, command.help));
    }
    CommandResult::Continue
}

pub(super) fn handle_new(
    _ctx: &mut ChatContext,
    _invocation: CommandInvocation<'_>,
) -> CommandResult {
    CommandResult::NewChat
}

pub(super) fn handle_quit(
    ctx: &mut ChatContext,
    _invocation: CommandInvocation<'_>,
) -> CommandResult {
    ctx.session.close();
    CommandResult::Quit
}

pub(super) fn handle_log(
    ctx: &mut ChatContext,
    invocation: CommandInvocation<'_>,
) -> CommandResult {
    match invocation.args_len() {
        0 => {
            let message = if ctx.logging.is_active() {
                format!("Logging paused at {}", log_timestamp())
            } else {
                format!("Logging resumed at {}", log_timestamp())
            };
            match ctx.logging.toggle_logging(&message) {
                Ok(status) => ctx.notify(status),
                Err(e) => ctx.notify(format!("Log error: {e}")),
            }
        }
        1 => {
            let filename = invocation.arg(0).unwrap_or_default().to_string();
            match ctx.logging.set_log_file(filename) {
                Ok(status) => {
                    let started = format!("## Logging started at {}", log_timestamp());
                    if let Err(e) = ctx.logging.log_message(&started) {
                        ctx.notify(format!("Log error: {e}"));
                    }
                    ctx.notify(status);
                }
                Err(e) => ctx.notify(format!("Logfile error: {e}")),
            }
        }
        _ => ctx.notify("Usage: /log [filename]"),
    }
    CommandResult::Continue
}

pub(super) fn handle_status(
    ctx: &mut ChatContext,
    _invocation: CommandInvocation<'_>,
) -> CommandResult {
    let session_id = ctx
        .session
        .session_id()
        .unwrap_or("(none)")
        .to_string();
    let model = ctx.session.model().to_string();
    let state = if ctx.session.is_busy() {
        "awaiting reply"
    } else {
        "idle"
    };
    let logging = ctx.logging.status();
    let messages = ctx.session.transcript().len();

    ctx.notify(format!("Session: {session_id}"));
    ctx.notify(format!("Model: {model}"));
    ctx.notify(format!("State: {state} ({messages} messages)"));
    ctx.notify(format!("Logging: {logging}"));
    if let Some(err) = ctx.session.last_error() {
        ctx.notify(format!("Last error: {err}"));
    }
    CommandResult::Continue
}

#[cfg(test)]
mod tests;
