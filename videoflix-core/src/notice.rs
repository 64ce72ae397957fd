//! Short-lived user-facing notices.
//!
//! Errors, success confirmations and quality changes each occupy one slot.
//! Posting into a slot replaces its message and schedules an automatic clear;
//! a clear timer only removes the message it was scheduled for, so a newer
//! notice is never wiped by an older one's timer.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::watch;

/// Slot a notice is displayed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NoticeKind {
    /// Failure surfaced to the user
    Error,
    /// Confirmation of a completed action
    Success,
    /// Playback quality change
    Quality,
}

/// A message currently shown to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    /// Monotonic identifier, used to match clear timers
    pub id: u64,
    pub kind: NoticeKind,
    pub message: String,
}

/// Snapshot of all notice slots.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Notices {
    pub error: Option<Notice>,
    pub success: Option<Notice>,
    pub quality: Option<Notice>,
}

impl Notices {
    fn slot_mut(&mut self, kind: NoticeKind) -> &mut Option<Notice> {
        match kind {
            NoticeKind::Error => &mut self.error,
            NoticeKind::Success => &mut self.success,
            NoticeKind::Quality => &mut self.quality,
        }
    }

    /// Message in `kind`'s slot, if any.
    pub fn message(&self, kind: NoticeKind) -> Option<&str> {
        let slot = match kind {
            NoticeKind::Error => &self.error,
            NoticeKind::Success => &self.success,
            NoticeKind::Quality => &self.quality,
        };
        slot.as_ref().map(|notice| notice.message.as_str())
    }
}

/// Publishes notices to any number of observers.
///
/// Cheap to clone; all clones share the same slots. Posting requires a
/// running tokio runtime because clears are scheduled on timers.
#[derive(Debug, Clone)]
pub struct NoticeBoard {
    sender: Arc<watch::Sender<Notices>>,
    next_id: Arc<AtomicU64>,
    message_ttl: Duration,
    quality_ttl: Duration,
}

impl NoticeBoard {
    /// Creates a board with the given lifetimes for messages and quality notices.
    pub fn new(message_ttl: Duration, quality_ttl: Duration) -> Self {
        let (sender, _) = watch::channel(Notices::default());
        Self {
            sender: Arc::new(sender),
            next_id: Arc::new(AtomicU64::new(1)),
            message_ttl,
            quality_ttl,
        }
    }

    /// Shows an error message that clears itself after the message lifetime.
    pub fn show_error(&self, message: impl Into<String>) -> u64 {
        self.post(NoticeKind::Error, message.into(), self.message_ttl)
    }

    /// Shows a success message that clears itself after the message lifetime.
    pub fn show_success(&self, message: impl Into<String>) -> u64 {
        self.post(NoticeKind::Success, message.into(), self.message_ttl)
    }

    /// Shows a quality notice that clears itself after the quality lifetime.
    pub fn show_quality(&self, message: impl Into<String>) -> u64 {
        self.post(NoticeKind::Quality, message.into(), self.quality_ttl)
    }

    /// Schedules the current quality notice to clear after `delay`.
    pub fn clear_quality_after(&self, delay: Duration) {
        let current = self.sender.borrow().quality.clone();
        if let Some(notice) = current {
            self.schedule_clear(notice.kind, notice.id, delay);
        }
    }

    /// Clears every slot immediately.
    pub fn clear_all(&self) {
        self.sender.send_replace(Notices::default());
    }

    /// Current contents of all slots.
    pub fn current(&self) -> Notices {
        self.sender.borrow().clone()
    }

    /// Subscribes to notice changes.
    pub fn subscribe(&self) -> watch::Receiver<Notices> {
        self.sender.subscribe()
    }

    fn post(&self, kind: NoticeKind, message: String, ttl: Duration) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(?kind, %message, "Notice posted");
        self.sender.send_modify(|notices| {
            *notices.slot_mut(kind) = Some(Notice { id, kind, message });
        });
        self.schedule_clear(kind, id, ttl);
        id
    }

    fn schedule_clear(&self, kind: NoticeKind, id: u64, delay: Duration) {
        let sender = Arc::clone(&self.sender);
        let deadline = tokio::time::Instant::now() + delay;
        tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            sender.send_if_modified(|notices| {
                let slot = notices.slot_mut(kind);
                if slot.as_ref().is_some_and(|notice| notice.id == id) {
                    *slot = None;
                    true
                } else {
                    false
                }
            });
        });
    }
}

impl Default for NoticeBoard {
    fn default() -> Self {
        Self::new(Duration::from_secs(3), Duration::from_secs(4))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Paused clock: sleeping auto-advances time and fires earlier timers first.
    async fn advance(duration: Duration) {
        tokio::time::sleep(duration).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_error_clears_after_ttl() {
        let board = NoticeBoard::default();
        board.show_error("Failed to fetch videos");
        assert_eq!(
            board.current().message(NoticeKind::Error),
            Some("Failed to fetch videos")
        );

        advance(Duration::from_millis(2_900)).await;
        assert!(board.current().error.is_some());

        advance(Duration::from_millis(200)).await;
        assert!(board.current().error.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_newer_notice_survives_older_timer() {
        let board = NoticeBoard::default();
        board.show_quality("Video quality has been adjusted.");
        advance(Duration::from_secs(3)).await;

        board.show_quality("Video quality has been reduced due to your slow connection.");
        advance(Duration::from_millis(1_500)).await;

        assert_eq!(
            board.current().message(NoticeKind::Quality),
            Some("Video quality has been reduced due to your slow connection.")
        );

        advance(Duration::from_secs(3)).await;
        assert!(board.current().quality.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_slots_are_independent() {
        let board = NoticeBoard::default();
        board.show_success("Saved");
        board.show_quality("Video quality has been adjusted.");

        advance(Duration::from_millis(3_100)).await;
        let notices = board.current();
        assert!(notices.success.is_none());
        assert!(notices.quality.is_some());
    }

    #[tokio::test]
    async fn test_subscribers_observe_posts() {
        let board = NoticeBoard::default();
        let mut receiver = board.subscribe();
        board.show_error("boom");
        receiver.changed().await.unwrap();
        assert_eq!(receiver.borrow().message(NoticeKind::Error), Some("boom"));

        board.clear_all();
        assert_eq!(board.current(), Notices::default());
    }
}
