//! Local persistence support probe.
//!
//! Before replicas are cached on disk, the configured directory is probed
//! once by writing, reading back and removing a small file. The decision is
//! cached for the lifetime of the probe.

use crate::error::PersistenceProbeError;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;
use tokio::sync::OnceCell;
use tokio_util::sync::CancellationToken;

/// Environment variable overriding the process-wide probe directory
pub const PERSISTENCE_DIR_ENV: &str = "OUTLINER_PERSISTENCE_DIR";

const PROBE_BYTES: &[u8] = b"outliner-probe";

static PROBE_COUNTER: AtomicU64 = AtomicU64::new(0);
static PROCESS_PROBE: OnceLock<LocalPersistenceProbe> = OnceLock::new();

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PersistenceDecision {
    pub enabled: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl PersistenceDecision {
    fn enabled() -> Self {
        Self {
            enabled: true,
            reason: None,
        }
    }

    fn disabled(reason: impl Into<String>) -> Self {
        Self {
            enabled: false,
            reason: Some(reason.into()),
        }
    }
}

/// Removes the probe file when dropped, unless already removed
struct ProbeFile {
    path: Option<PathBuf>,
}

impl ProbeFile {
    fn new(path: PathBuf) -> Self {
        Self { path: Some(path) }
    }

    async fn remove(mut self) -> std::io::Result<()> {
        match self.path.take() {
            Some(path) => tokio::fs::remove_file(path).await,
            None => Ok(()),
        }
    }
}

impl Drop for ProbeFile {
    fn drop(&mut self) {
        if let Some(path) = self.path.take() {
            if let Err(err) = std::fs::remove_file(&path) {
                if err.kind() != std::io::ErrorKind::NotFound {
                    tracing::warn!(path = %path.display(), error = %err, "could not remove probe file");
                }
            }
        }
    }
}

#[derive(Debug)]
pub struct LocalPersistenceProbe {
    dir: PathBuf,
    decision: OnceCell<PersistenceDecision>,
}

impl LocalPersistenceProbe {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            decision: OnceCell::new(),
        }
    }

    /// Probe `$OUTLINER_PERSISTENCE_DIR`, or `outliner` under the temp dir
    pub fn from_env() -> Self {
        let dir = std::env::var_os(PERSISTENCE_DIR_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| std::env::temp_dir().join("outliner"));
        Self::new(dir)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Cached decision, probing on first use
    ///
    /// A probe failure disables persistence; it is not an error.
    pub async fn decision(&self) -> PersistenceDecision {
        self.decision
            .get_or_init(|| async {
                let decision = match self.probe().await {
                    Ok(()) => PersistenceDecision::enabled(),
                    Err(err) => PersistenceDecision::disabled(err.to_string()),
                };
                tracing::info!(
                    dir = %self.dir.display(),
                    enabled = decision.enabled,
                    reason = ?decision.reason,
                    "local persistence decision"
                );
                decision
            })
            .await
            .clone()
    }

    /// [`decision`](Self::decision), abandoned on cancellation
    ///
    /// A cancelled probe leaves no file behind and no decision cached.
    pub async fn decision_with_cancel(
        &self,
        cancel: &CancellationToken,
    ) -> Result<PersistenceDecision, PersistenceProbeError> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(PersistenceProbeError::Cancelled),
            decision = self.decision() => Ok(decision),
        }
    }

    pub fn cached(&self) -> Option<&PersistenceDecision> {
        self.decision.get()
    }

    async fn probe(&self) -> Result<(), PersistenceProbeError> {
        let io = |source| PersistenceProbeError::Io {
            dir: self.dir.clone(),
            source,
        };

        tokio::fs::create_dir_all(&self.dir).await.map_err(io)?;
        let name = format!(
            ".probe-{}-{}",
            std::process::id(),
            PROBE_COUNTER.fetch_add(1, Ordering::Relaxed)
        );
        let path = self.dir.join(name);
        let file = ProbeFile::new(path.clone());

        tokio::fs::write(&path, PROBE_BYTES).await.map_err(io)?;
        let read_back = tokio::fs::read(&path).await.map_err(io)?;
        if read_back != PROBE_BYTES {
            return Err(PersistenceProbeError::Mismatch(self.dir.clone()));
        }
        file.remove().await.map_err(io)
    }
}

/// Process-wide decision for the directory from [`LocalPersistenceProbe::from_env`]
pub async fn get_local_persistence_support_decision() -> PersistenceDecision {
    PROCESS_PROBE
        .get_or_init(LocalPersistenceProbe::from_env)
        .decision()
        .await
}
