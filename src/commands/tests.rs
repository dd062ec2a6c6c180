use super::*;
use crate::core::session::SessionOptions;
use crate::utils::logging::LoggingState;
use crate::utils::test_utils::ScriptedTransport;
use tempfile::TempDir;

fn create_test_context() -> ChatContext {
    ChatContext::new(
        ScriptedTransport::new(),
        SessionOptions {
            session_id: Some("abc".into()),
            ..Default::default()
        },
        LoggingState::new(None).expect("logging"),
    )
}

#[test]
fn plain_text_is_a_message() {
    let mut ctx = create_test_context();
    assert_eq!(
        process_input(&mut ctx, "hello there"),
        CommandResult::ProcessAsMessage("hello there".into())
    );
}

#[test]
fn unknown_slash_words_are_sent_as_messages() {
    let mut ctx = create_test_context();
    assert_eq!(
        process_input(&mut ctx, "/usr/bin is a path"),
        CommandResult::ProcessAsMessage("/usr/bin is a path".into())
    );
    assert_eq!(
        process_input(&mut ctx, "/"),
        CommandResult::ProcessAsMessage("/".into())
    );
}

#[test]
fn commands_are_case_insensitive() {
    let mut ctx = create_test_context();
    assert_eq!(process_input(&mut ctx, "/NEW"), CommandResult::NewChat);
    assert_eq!(process_input(&mut ctx, "  /quit  "), CommandResult::Quit);
}

#[test]
fn help_lists_every_command() {
    let mut ctx = create_test_context();
    assert_eq!(process_input(&mut ctx, "/help"), CommandResult::Continue);
    let notices = ctx.take_notices();
    for command in all_commands() {
        assert!(
            notices.iter().any(|line| line.contains(command.usage)),
            "missing {} in help",
            command.name
        );
    }
}

#[test]
fn log_command_sets_file_and_toggles() {
    let temp_dir = TempDir::new().expect("temp dir");
    let path = temp_dir.path().join("session.log");
    let mut ctx = create_test_context();

    process_input(&mut ctx, "/log");
    assert!(ctx.take_notices()[0].starts_with("Log error"));

    process_input(&mut ctx, &format!("/log {}", path.display()));
    assert!(ctx.logging.is_active());
    assert!(ctx.take_notices()[0].starts_with("Logging enabled to"));

    process_input(&mut ctx, "/log");
    assert!(!ctx.logging.is_active());

    process_input(&mut ctx, "/log");
    assert!(ctx.logging.is_active());
    assert!(ctx.take_notices().iter().any(|n| n.starts_with("Logging resumed to")));

    let contents = std::fs::read_to_string(&path).expect("read log");
    assert!(contents.starts_with("## Logging started at"));
    let paused = contents.find("## Logging paused at").expect("pause marker");
    let resumed = contents.find("## Logging resumed at").expect("resume marker");
    assert!(paused < resumed);
}

#[test]
fn log_command_rejects_extra_arguments() {
    let mut ctx = create_test_context();
    process_input(&mut ctx, "/log a b");
    assert_eq!(ctx.take_notices(), vec!["Usage: /log [filename]"]);
}

#[test]
fn status_reports_session_and_logging() {
    let mut ctx = create_test_context();
    process_input(&mut ctx, "/status");
    let notices = ctx.take_notices();
    assert_eq!(notices[0], "Session: abc");
    assert!(notices.iter().any(|line| line == "State: idle (0 messages)"));
    assert!(notices.iter().any(|line| line == "Logging: disabled"));
}
