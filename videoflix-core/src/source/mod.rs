//! Signed playback URL resolution with request deduplication.
//!
//! The resolver keeps at most one resolution, pending or satisfied, keyed by
//! the `(video, tier)` pair. Repeating a request for the same pair is served
//! from that resolution without another provider call; a different pair
//! supersedes it. Failures are never cached: a failed resolution drops its
//! key so the next identical request goes back to the provider.

use std::fmt;
use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::oneshot;

use crate::domain::{QualityTier, VideoId};

/// Fetches short-lived playable URLs from the content backend.
#[async_trait]
pub trait SourceProvider: Send + Sync + Debug {
    /// Requests a signed URL for `video_id` at `tier`.
    ///
    /// # Errors
    /// - `SourceError::RequestFailed` - Backend unreachable or rejected the request
    /// - `SourceError::Unauthorized` - Credential missing or expired
    async fn signed_url(&self, video_id: VideoId, tier: QualityTier) -> Result<String, SourceError>;
}

/// Errors produced while resolving a playable URL.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SourceError {
    /// Provider call failed
    #[error("Signed URL request for video {video_id} at {tier} failed: {reason}")]
    RequestFailed {
        video_id: VideoId,
        tier: QualityTier,
        reason: String,
    },

    /// Credential missing or rejected by the backend
    #[error("Not authorized to stream video {video_id}")]
    Unauthorized { video_id: VideoId },

    /// The request was replaced by one for a different pair, or reset
    #[error("Resolution for {key} was superseded")]
    Superseded { key: DedupKey },
}

/// Composite key guarding against duplicate resolution requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DedupKey {
    pub video_id: VideoId,
    pub tier: QualityTier,
}

impl DedupKey {
    pub fn new(video_id: VideoId, tier: QualityTier) -> Self {
        Self { video_id, tier }
    }
}

impl fmt::Display for DedupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.video_id, self.tier)
    }
}

/// Identifies one provider call so its completion can be matched later.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolveTicket {
    pub key: DedupKey,
    pub generation: u64,
}

/// What the caller has to do after [`SourceResolver::request`].
#[derive(Debug, PartialEq, Eq)]
pub enum ResolveStep {
    /// The pair is already resolved
    Cached(String),
    /// A call for the pair is in flight; the waiter, if any, was attached to it
    Joined,
    /// A provider call must be issued for the ticket
    Fetch(ResolveTicket),
}

/// Outcome of feeding a provider result back into the resolver.
#[derive(Debug, PartialEq, Eq)]
pub enum Completion {
    /// The current pair is now resolved
    Ready(String),
    /// The current pair failed; its key was dropped
    Failed(SourceError),
    /// The result belongs to a superseded request and was discarded
    Stale,
}

type Waiter = oneshot::Sender<Result<String, SourceError>>;

#[derive(Debug)]
enum ResolutionState {
    Pending { waiters: Vec<Waiter> },
    Ready { url: String },
}

#[derive(Debug)]
struct Resolution {
    key: DedupKey,
    generation: u64,
    state: ResolutionState,
}

/// Deduplicating front for a [`SourceProvider`].
///
/// The state transitions ([`request`](Self::request) /
/// [`complete`](Self::complete)) are synchronous so an owner running its own
/// event loop can issue the provider call wherever it likes;
/// [`resolve`](Self::resolve) drives both halves inline for simple callers.
#[derive(Debug)]
pub struct SourceResolver {
    provider: Arc<dyn SourceProvider>,
    current: Option<Resolution>,
    next_generation: u64,
}

impl SourceResolver {
    pub fn new(provider: Arc<dyn SourceProvider>) -> Self {
        Self {
            provider,
            current: None,
            next_generation: 1,
        }
    }

    /// Key of the pending or satisfied resolution.
    pub fn key(&self) -> Option<DedupKey> {
        self.current.as_ref().map(|resolution| resolution.key)
    }

    /// Resolved URL, if the current pair is satisfied.
    pub fn current_url(&self) -> Option<&str> {
        match &self.current {
            Some(Resolution {
                state: ResolutionState::Ready { url },
                ..
            }) => Some(url),
            _ => None,
        }
    }

    /// Whether a provider call for the current pair is in flight.
    pub fn is_pending(&self) -> bool {
        matches!(
            self.current,
            Some(Resolution {
                state: ResolutionState::Pending { .. },
                ..
            })
        )
    }

    /// Registers interest in `key`.
    ///
    /// `waiter` receives the outcome once known: immediately for a cached
    /// pair, on completion for a pending or new one.
    pub fn request(&mut self, key: DedupKey, waiter: Option<Waiter>) -> ResolveStep {
        if let Some(resolution) = self.current.as_mut().filter(|r| r.key == key) {
            match &mut resolution.state {
                ResolutionState::Ready { url } => {
                    if let Some(waiter) = waiter {
                        let _ = waiter.send(Ok(url.clone()));
                    }
                    return ResolveStep::Cached(url.clone());
                }
                ResolutionState::Pending { waiters } => {
                    waiters.extend(waiter);
                    return ResolveStep::Joined;
                }
            }
        }

        self.invalidate();
        let generation = self.next_generation;
        self.next_generation += 1;
        self.current = Some(Resolution {
            key,
            generation,
            state: ResolutionState::Pending {
                waiters: waiter.into_iter().collect(),
            },
        });

        tracing::debug!(key = %key, generation, "Requesting signed video URL");
        ResolveStep::Fetch(ResolveTicket { key, generation })
    }

    /// Feeds a provider result back in.
    ///
    /// Results whose ticket no longer matches the current resolution are
    /// discarded, so a superseded session never receives a late URL.
    pub fn complete(
        &mut self,
        ticket: ResolveTicket,
        result: Result<String, SourceError>,
    ) -> Completion {
        let matches = self
            .current
            .as_ref()
            .is_some_and(|r| r.key == ticket.key && r.generation == ticket.generation);
        if !matches {
            tracing::debug!(key = %ticket.key, generation = ticket.generation, "Dropping stale resolution");
            return Completion::Stale;
        }

        let Some(resolution) = self.current.take() else {
            return Completion::Stale;
        };
        let ResolutionState::Pending { waiters } = resolution.state else {
            // Already satisfied; keep the first URL.
            self.current = Some(resolution);
            return Completion::Stale;
        };

        match result {
            Ok(url) => {
                for waiter in waiters {
                    let _ = waiter.send(Ok(url.clone()));
                }
                tracing::info!(key = %ticket.key, "Signed video URL resolved");
                self.current = Some(Resolution {
                    state: ResolutionState::Ready { url: url.clone() },
                    ..resolution
                });
                Completion::Ready(url)
            }
            Err(e) => {
                tracing::warn!(key = %ticket.key, "Failed to fetch signed URL: {e}");
                for waiter in waiters {
                    let _ = waiter.send(Err(e.clone()));
                }
                Completion::Failed(e)
            }
        }
    }

    /// Drops the current resolution so the next request for any pair fetches
    /// again. Waiters of a pending call are told it was superseded.
    pub fn invalidate(&mut self) {
        if let Some(resolution) = self.current.take() {
            if let ResolutionState::Pending { waiters } = resolution.state {
                for waiter in waiters {
                    let _ = waiter.send(Err(SourceError::Superseded {
                        key: resolution.key,
                    }));
                }
            }
        }
    }

    /// Issues the provider call for `ticket`.
    ///
    /// The returned future owns everything it needs and can be spawned.
    pub fn fetch(
        &self,
        ticket: ResolveTicket,
    ) -> impl Future<Output = Result<String, SourceError>> + Send + 'static {
        let provider = Arc::clone(&self.provider);
        async move {
            provider
                .signed_url(ticket.key.video_id, ticket.key.tier)
                .await
        }
    }

    /// Resolves `(video_id, tier)`, calling the provider only when the pair
    /// is not already satisfied.
    ///
    /// # Errors
    /// - `SourceError::RequestFailed` - Provider call failed
    /// - `SourceError::Unauthorized` - Credential missing or expired
    pub async fn resolve(
        &mut self,
        video_id: VideoId,
        tier: QualityTier,
    ) -> Result<String, SourceError> {
        let key = DedupKey::new(video_id, tier);
        let ticket = match self.request(key, None) {
            ResolveStep::Cached(url) => return Ok(url),
            ResolveStep::Fetch(ticket) => ticket,
            ResolveStep::Joined => {
                // Only reachable when an earlier call was dropped mid-flight.
                self.invalidate();
                let ResolveStep::Fetch(ticket) = self.request(key, None) else {
                    return Err(SourceError::Superseded { key });
                };
                ticket
            }
        };

        let result = self.fetch(ticket).await;
        match self.complete(ticket, result) {
            Completion::Ready(url) => Ok(url),
            Completion::Failed(e) => Err(e),
            Completion::Stale => Err(SourceError::Superseded { key }),
        }
    }
}
