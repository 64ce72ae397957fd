//! In-memory access credential.

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

/// Bearer token shared between clones of the API client.
///
/// The token only ever lives in process memory. It is never written to disk
/// and never appears in `Debug` output.
#[derive(Clone, Default)]
pub struct Credentials {
    token: Arc<RwLock<Option<String>>>,
}

impl Credentials {
    /// Creates credentials holding `token`.
    pub fn with_token(token: impl Into<String>) -> Self {
        let credentials = Self::default();
        credentials.set_token(token);
        credentials
    }

    /// Replaces the access token.
    pub fn set_token(&self, token: impl Into<String>) {
        *self.token.write() = Some(token.into());
    }

    /// Drops the access token.
    pub fn clear(&self) {
        *self.token.write() = None;
    }

    /// Current access token.
    pub fn token(&self) -> Option<String> {
        self.token.read().clone()
    }

    /// Whether a token is held.
    pub fn is_present(&self) -> bool {
        self.token.read().is_some()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = if self.is_present() { "<redacted>" } else { "<none>" };
        f.debug_struct("Credentials").field("token", &state).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_never_prints_token() {
        let credentials = Credentials::with_token("secret-token");
        let printed = format!("{credentials:?}");
        assert!(!printed.contains("secret-token"));
        assert!(printed.contains("<redacted>"));
    }

    #[test]
    fn test_clones_share_token() {
        let credentials = Credentials::default();
        let shared = credentials.clone();
        credentials.set_token("abc");
        assert_eq!(shared.token().as_deref(), Some("abc"));

        shared.clear();
        assert!(!credentials.is_present());
    }
}
