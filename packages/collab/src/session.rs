//! Session switch epochs and the epoch-aware readiness wait.

use crate::error::ReadinessError;
use crate::provider::{wait_for_provider_ready, ReplicationProvider};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

/// Options for [`CollabSessions::when_ready`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WhenReady {
    /// Epoch the caller last saw; only a later session can satisfy the wait
    pub since: u64,

    /// `None` waits without a deadline
    pub timeout: Option<Duration>,
}

impl WhenReady {
    pub fn since(epoch: u64) -> Self {
        Self {
            since: epoch,
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

#[derive(Clone)]
struct ActiveSession {
    doc_id: String,
    provider: Arc<dyn ReplicationProvider>,
}

#[derive(Clone, Default)]
struct SwitchState {
    epoch: u64,
    active: Option<ActiveSession>,
}

/// Tracks which document's replication is active
pub struct CollabSessions {
    state: watch::Sender<SwitchState>,
}

impl CollabSessions {
    pub fn new() -> Self {
        let (state, _) = watch::channel(SwitchState::default());
        Self { state }
    }

    /// Number of switches so far, starting at 0
    pub fn switch_epoch(&self) -> u64 {
        self.state.borrow().epoch
    }

    pub fn active_doc_id(&self) -> Option<String> {
        self.state
            .borrow()
            .active
            .as_ref()
            .map(|active| active.doc_id.clone())
    }

    /// Make `provider` the active session; returns the new epoch
    pub fn switch_to(&self, doc_id: &str, provider: Arc<dyn ReplicationProvider>) -> u64 {
        let mut epoch = 0;
        self.state.send_modify(|state| {
            state.epoch += 1;
            state.active = Some(ActiveSession {
                doc_id: doc_id.to_string(),
                provider,
            });
            epoch = state.epoch;
        });
        tracing::info!(doc_id, epoch, "switched collaboration session");
        epoch
    }

    /// Leave the active session without starting another
    pub fn leave(&self) -> u64 {
        let mut epoch = 0;
        self.state.send_modify(|state| {
            state.epoch += 1;
            state.active = None;
            epoch = state.epoch;
        });
        tracing::info!(epoch, "left collaboration session");
        epoch
    }

    /// Resolve once a session newer than `options.since` is replicated
    ///
    /// If another switch happens while waiting, the wait moves to the newer
    /// session. Fails with the active provider's connection error, on
    /// cancellation, or when the timeout expires.
    pub async fn when_ready(
        &self,
        options: WhenReady,
        cancel: &CancellationToken,
    ) -> Result<(), ReadinessError> {
        let deadline = async {
            match options.timeout {
                Some(timeout) => tokio::time::sleep(timeout).await,
                None => std::future::pending().await,
            }
        };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(ReadinessError::Cancelled),
            result = self.wait_for_epoch(options.since, cancel) => result,
            _ = deadline => {
                let timeout = options.timeout.unwrap_or_default();
                tracing::warn!(?timeout, since = options.since, "collaboration readiness timed out");
                Err(ReadinessError::Timeout(timeout))
            }
        }
    }

    async fn wait_for_epoch(
        &self,
        since: u64,
        cancel: &CancellationToken,
    ) -> Result<(), ReadinessError> {
        let mut updates = self.state.subscribe();
        loop {
            let target = {
                let state = updates.borrow_and_update();
                match &state.active {
                    Some(active) if state.epoch > since => Some(Arc::clone(&active.provider)),
                    _ => None,
                }
            };

            let Some(provider) = target else {
                updates
                    .changed()
                    .await
                    .map_err(|_| ReadinessError::Closed)?;
                continue;
            };

            tokio::select! {
                result = wait_for_provider_ready(provider.as_ref(), cancel) => return result,
                changed = updates.changed() => {
                    changed.map_err(|_| ReadinessError::Closed)?;
                    tracing::debug!("session switched while waiting, following the new one");
                }
            }
        }
    }
}

impl Default for CollabSessions {
    fn default() -> Self {
        Self::new()
    }
}
