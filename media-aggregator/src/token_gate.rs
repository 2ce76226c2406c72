use crate::types::Result;
use std::fmt;
use std::future::Future;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{sleep_until, Instant};
use tracing::debug;

/// Bearer token handed out by an upstream auth endpoint.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(***)")
    }
}

/// Paces token issuance against an upstream auth endpoint.
///
/// Issuances are serialized: the lock is held across the wait and the
/// issuing call, so two issuances are never in flight at once and
/// consecutive issuances start at least `min_interval` apart. The gate does
/// not cache tokens.
pub struct TokenGate {
    min_interval: Duration,
    last_issued_at: Mutex<Option<Instant>>,
}

impl TokenGate {
    pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(600);

    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_issued_at: Mutex::new(None),
        }
    }

    /// Wait for this caller's turn, then run `issue`.
    pub async fn acquire<F, Fut, T>(&self, issue: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut last_issued_at = self.last_issued_at.lock().await;

        if let Some(previous) = *last_issued_at {
            let ready_at = previous + self.min_interval;
            if Instant::now() < ready_at {
                debug!("Token gate: waiting {:?} before next issuance", ready_at - Instant::now());
                sleep_until(ready_at).await;
            }
        }

        *last_issued_at = Some(Instant::now());
        issue().await
    }

    pub async fn last_issued_at(&self) -> Option<Instant> {
        *self.last_issued_at.lock().await
    }
}

impl Default for TokenGate {
    fn default() -> Self {
        Self::new(Self::DEFAULT_INTERVAL)
    }
}
