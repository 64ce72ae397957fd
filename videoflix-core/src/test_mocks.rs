//! Mock implementations for testing playback sessions.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::domain::{QualityTier, VideoId};
use crate::source::{DedupKey, SourceError, SourceProvider};

#[derive(Debug, Default)]
struct MockState {
    calls: Vec<DedupKey>,
    failures_remaining: u32,
    delay: Duration,
}

/// Source provider that records every call and signs URLs locally.
///
/// Clones share their call log, so a test can hand one clone to the session
/// and keep another for assertions.
#[derive(Debug, Clone, Default)]
pub struct MockSourceProvider {
    state: Arc<Mutex<MockState>>,
}

impl MockSourceProvider {
    /// Creates a provider that answers every call immediately.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a provider that sleeps for `delay` before answering.
    pub fn with_delay(delay: Duration) -> Self {
        let provider = Self::new();
        provider.state.lock().delay = delay;
        provider
    }

    /// Makes the next `count` calls fail.
    pub fn fail_next(&self, count: u32) {
        self.state.lock().failures_remaining = count;
    }

    /// Number of provider calls made so far.
    pub fn call_count(&self) -> usize {
        self.state.lock().calls.len()
    }

    /// Pairs requested so far, in call order.
    pub fn calls(&self) -> Vec<DedupKey> {
        self.state.lock().calls.clone()
    }

    /// URL the mock hands out for the `call`-th request (1-based).
    pub fn url_for(video_id: VideoId, tier: QualityTier, call: usize) -> String {
        format!("https://cdn.videoflix.test/{video_id}/{tier}.mp4?sig={call}")
    }
}

#[async_trait]
impl SourceProvider for MockSourceProvider {
    async fn signed_url(&self, video_id: VideoId, tier: QualityTier) -> Result<String, SourceError> {
        let (call, delay, fail) = {
            let mut state = self.state.lock();
            state.calls.push(DedupKey::new(video_id, tier));
            let fail = state.failures_remaining > 0;
            if fail {
                state.failures_remaining -= 1;
            }
            (state.calls.len(), state.delay, fail)
        };

        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        if fail {
            return Err(SourceError::RequestFailed {
                video_id,
                tier,
                reason: "mock failure".to_string(),
            });
        }

        Ok(Self::url_for(video_id, tier, call))
    }
}
