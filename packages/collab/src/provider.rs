//! Replication provider signals and the single-provider readiness wait.

use crate::error::ReadinessError;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;

/// Signals emitted by a replication transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderEvent {
    /// Replicated state applied (or lost)
    Sync(bool),

    /// Local edits waiting to be sent
    LocalChanges(bool),

    ConnectionError(String),
}

/// A replication transport, observed only through its readiness signals
pub trait ReplicationProvider: Send + Sync {
    fn is_synced(&self) -> bool;

    fn has_local_changes(&self) -> bool;

    fn subscribe(&self) -> broadcast::Receiver<ProviderEvent>;
}

/// Resolve once the provider is synced with no pending local changes
///
/// Resolves immediately if both already hold. Fails on a connection error,
/// on cancellation, or when the provider drops its event channel. The
/// subscription lives only as long as this future.
pub async fn wait_for_provider_ready<P>(
    provider: &P,
    cancel: &CancellationToken,
) -> Result<(), ReadinessError>
where
    P: ReplicationProvider + ?Sized,
{
    if cancel.is_cancelled() {
        return Err(ReadinessError::Cancelled);
    }

    // Subscribe before reading the state so no transition is missed.
    let mut events = provider.subscribe();
    let mut synced = provider.is_synced();
    let mut pending = provider.has_local_changes();

    while !synced || pending {
        let event = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ReadinessError::Cancelled),
            event = events.recv() => event,
        };

        match event {
            Ok(ProviderEvent::Sync(value)) => synced = value,
            Ok(ProviderEvent::LocalChanges(value)) => pending = value,
            Ok(ProviderEvent::ConnectionError(reason)) => {
                tracing::warn!(%reason, "replication provider reported a connection error");
                return Err(ReadinessError::ConnectionError(reason));
            }
            Err(RecvError::Lagged(skipped)) => {
                tracing::debug!(skipped, "provider events lagged, re-reading state");
                synced = provider.is_synced();
                pending = provider.has_local_changes();
            }
            Err(RecvError::Closed) => return Err(ReadinessError::Closed),
        }
    }

    tracing::debug!("replication provider ready");
    Ok(())
}
