//! # Outliner Collab
//!
//! Replication readiness for outline documents.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ editor: Document → persisted JSON           │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ collab                                      │
//! │  - Replica: yrs doc holding the JSON        │
//! │  - ReplicationProvider: sync/local signals  │
//! │  - CollabSessions: switch epochs + waits    │
//! │  - LocalPersistenceProbe: disk cache check  │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Readiness
//!
//! A document is ready once its provider has applied the replicated state
//! and has no local changes left to send. Every document switch bumps the
//! switch epoch; a caller passes the epoch it last saw so it never resolves
//! for a session it has already left.
//!
//! ```rust,ignore
//! let epoch = sessions.switch_epoch();
//! sessions.switch_to("doc-2", replica);
//! sessions
//!     .when_ready(WhenReady::since(epoch).with_timeout(Duration::from_secs(5)), &cancel)
//!     .await?;
//! ```

mod error;
mod persistence;
mod provider;
mod replica;
mod session;

pub use error::{PersistenceProbeError, ReadinessError, ReplicaError};
pub use persistence::{
    get_local_persistence_support_decision, LocalPersistenceProbe, PersistenceDecision,
    PERSISTENCE_DIR_ENV,
};
pub use provider::{wait_for_provider_ready, ProviderEvent, ReplicationProvider};
pub use replica::Replica;
pub use session::{CollabSessions, WhenReady};

// Re-export for callers that pass cancellation tokens
pub use tokio_util::sync::CancellationToken;
