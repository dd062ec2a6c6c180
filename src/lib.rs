//! Chatstream is a terminal chat client that streams replies from a remote
//! chat endpoint into an in-memory transcript.
//!
//! The crate is organized around a small set of collaborating layers:
//! - [`core`] owns the transcript store, the stream consumer that folds a
//!   streamed response body into one assistant message, and the session
//!   controller that enforces one reply in flight at a time.
//! - [`ui`] runs the line-oriented interactive loop that prints replies as
//!   they grow.
//! - [`commands`] implements slash-command parsing and execution used by the
//!   interactive loop.
//! - [`api`] defines the request payload POSTed to the endpoint.
//!
//! Runtime entrypoints live in the binary crate (`src/main.rs`) and route
//! through [`crate::cli::main`], which installs [`logging`] and dispatches
//! into [`ui::repl`] for interactive sessions.

pub mod api;
pub mod cli;
pub mod commands;
pub mod core;
pub mod logging;
pub mod ui;
pub mod utils;
