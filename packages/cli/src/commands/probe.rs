use anyhow::Result;
use clap::Args;
use colored::Colorize;
use outliner_collab::{CancellationToken, LocalPersistenceProbe, PersistenceDecision};
use std::time::Duration;

use crate::config::Config;

#[derive(Args, Debug)]
pub struct ProbeArgs {
    /// Output format (text, json)
    #[arg(short, long, default_value = "text")]
    pub format: String,
}

/// Check whether replicas can be cached on local disk
///
/// The check gives up after the configured readiness timeout.
pub fn probe(args: ProbeArgs, cwd: &str) -> Result<()> {
    let config = Config::load(cwd)?;
    let persistence = match config.get_persistence_dir(cwd) {
        Some(dir) => LocalPersistenceProbe::new(dir),
        None => LocalPersistenceProbe::from_env(),
    };
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    let decision = runtime.block_on(decide_within(
        &persistence,
        config.readiness_timeout(),
        CancellationToken::new(),
    ));

    if args.format == "json" {
        println!("{}", serde_json::to_string_pretty(&decision)?);
    } else if decision.enabled {
        println!("{} Local persistence is available", "✓".green());
    } else {
        println!(
            "{} Local persistence is disabled: {}",
            "✗".red(),
            decision.reason.unwrap_or_default()
        );
    }
    Ok(())
}

/// Decide, or report persistence as disabled once `timeout` passes or
/// `cancel` fires
async fn decide_within(
    persistence: &LocalPersistenceProbe,
    timeout: Duration,
    cancel: CancellationToken,
) -> PersistenceDecision {
    let timer = tokio::spawn({
        let cancel = cancel.clone();
        async move {
            tokio::time::sleep(timeout).await;
            cancel.cancel();
        }
    });
    let result = persistence.decision_with_cancel(&cancel).await;
    timer.abort();

    result.unwrap_or_else(|err| {
        tracing::warn!(dir = %persistence.dir().display(), error = %err, "persistence check abandoned");
        PersistenceDecision {
            enabled: false,
            reason: Some(format!("no decision within {} ms", timeout.as_millis())),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_writable_dir_decides_in_time() {
        let temp = tempfile::tempdir().unwrap();
        let persistence = LocalPersistenceProbe::new(temp.path());

        let decision =
            decide_within(&persistence, Duration::from_secs(5), CancellationToken::new()).await;
        assert!(decision.enabled);
        assert_eq!(persistence.cached(), Some(&decision));
    }

    #[tokio::test]
    async fn test_abandoned_check_reports_disabled() {
        let temp = tempfile::tempdir().unwrap();
        let persistence = LocalPersistenceProbe::new(temp.path());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let decision = decide_within(&persistence, Duration::from_millis(250), cancel).await;
        assert!(!decision.enabled);
        assert_eq!(decision.reason.as_deref(), Some("no decision within 250 ms"));
        assert_eq!(persistence.cached(), None);
    }
}
