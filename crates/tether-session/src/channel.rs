//! Transport abstraction.

use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use thiserror::Error;

use crate::codec::Message;

/// The peer is gone; the frame was not sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("channel closed")]
pub struct ChannelClosed;

/// A reliable, ordered, best-effort text channel to one mirror.
///
/// Implemented by the host over its connection type. There is no buffering
/// or retry: a frame that cannot be sent is lost.
pub trait Channel: Send + Sync {
    fn send(&self, text: &str) -> Result<(), ChannelClosed>;
    fn is_closed(&self) -> bool;
}

/// In-memory channel recording every frame it accepts.
#[derive(Debug, Default)]
pub struct MemoryChannel {
    frames: Mutex<Vec<String>>,
    closed: AtomicBool,
}

impl MemoryChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Frames accepted so far.
    pub fn frames(&self) -> Vec<String> {
        self.frames.lock().clone()
    }

    /// Accepted frames decoded; frames that fail to decode are skipped.
    pub fn messages(&self) -> Vec<Message> {
        self.frames
            .lock()
            .iter()
            .filter_map(|frame| Message::decode(frame).ok())
            .collect()
    }

    /// Drain the recorded frames.
    pub fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.frames.lock())
    }

    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

impl Channel for MemoryChannel {
    fn send(&self, text: &str) -> Result<(), ChannelClosed> {
        if self.is_closed() {
            return Err(ChannelClosed);
        }
        self.frames.lock().push(text.to_string());
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}
