//! Ordered message store shared by the session controller, the stream
//! consumer, and whatever renders the conversation.
//!
//! Every mutation swaps a whole [`Message`] under a write lock, so a reader
//! holding a snapshot never sees a record whose role and content disagree.
//! Each mutation also bumps a revision counter published on a
//! [`tokio::sync::watch`] channel, which is how a front end learns that it
//! should redraw.

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tokio::sync::watch;
use tracing::error;

use crate::core::message::Message;

#[derive(Clone)]
pub struct Transcript {
    inner: Arc<TranscriptInner>,
}

struct TranscriptInner {
    messages: RwLock<Vec<Message>>,
    revision: watch::Sender<u64>,
}

impl Default for Transcript {
    fn default() -> Self {
        Self::new()
    }
}

impl Transcript {
    pub fn new() -> Self {
        Self::seeded(Vec::new())
    }

    pub fn seeded(messages: Vec<Message>) -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            inner: Arc::new(TranscriptInner {
                messages: RwLock::new(messages),
                revision,
            }),
        }
    }

    /// Adds `message` to the end and returns the new length.
    pub fn append(&self, message: Message) -> usize {
        let len = {
            let mut messages = self.write();
            messages.push(message);
            messages.len()
        };
        self.bump();
        len
    }

    /// Overwrites the record at `index`.
    ///
    /// Only the controller hands out indices, so an out-of-range target is a
    /// bookkeeping bug: it panics in debug builds and is logged and ignored
    /// otherwise.
    pub fn replace_at(&self, index: usize, message: Message) {
        let replaced = {
            let mut messages = self.write();
            let len = messages.len();
            match messages.get_mut(index) {
                Some(slot) => {
                    *slot = message;
                    Ok(())
                }
                None => Err(len),
            }
        };

        match replaced {
            Ok(()) => self.bump(),
            Err(len) => {
                if cfg!(debug_assertions) {
                    panic!("replace_at({index}) out of range for transcript of length {len}");
                }
                error!(index, len, "replace_at target out of range; ignoring");
            }
        }
    }

    pub fn snapshot(&self) -> Vec<Message> {
        self.read().clone()
    }

    pub fn get(&self, index: usize) -> Option<Message> {
        self.read().get(index).cloned()
    }

    pub fn last(&self) -> Option<Message> {
        self.read().last().cloned()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Receiver that wakes after every mutation.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.inner.revision.subscribe()
    }

    fn bump(&self) {
        self.inner.revision.send_modify(|revision| *revision += 1);
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<Message>> {
        self.inner
            .messages
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<Message>> {
        self.inner
            .messages
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
