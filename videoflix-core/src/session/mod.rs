//! Playback session coordination.
//!
//! A single actor task owns the active video, the progress store, the source
//! resolver and the network monitor. Callers talk to it through a cloneable
//! [`SessionHandle`] and observe it through a `watch` channel of
//! [`SessionSnapshot`]s.

mod actor;
mod commands;
mod coordinator;
mod handle;
mod integration_tests;
mod overlay;

pub use actor::spawn_session_coordinator;
pub use commands::{PlayerEvent, SessionCommand, StartPolicy};
pub use coordinator::{SessionCoordinator, SessionSnapshot, SessionState};
pub use handle::SessionHandle;
