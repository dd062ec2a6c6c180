//! Interactive front end.
//!
//! - [`repl`]: the line loop that dispatches input to [`crate::commands`] and
//!   prints replies streamed by [`crate::core::chat_stream`].
//! - [`context`]: the state slash commands operate on.

pub mod context;
pub mod repl;
