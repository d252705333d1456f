//! Fire-and-forget snapshot export.
//!
//! The aggregation endpoints call [`spawn_export`] after a successful
//! computation. The work runs on a detached task: the response never
//! waits for it, and failures are logged rather than surfaced. The
//! external batch command, when configured, is bounded by the
//! configured timeout and killed if it overruns.

use std::time::Duration;

use tokio::process::Command;
use tracing::{debug, warn};

use telemetra_aggregate::{CsvSnapshot, SnapshotSink};
use telemetra_types::AggregationResult;

use crate::config::ExportConfig;

/// Spawn a detached task exporting one aggregation result.
///
/// Does nothing when export is disabled. Returns immediately either way.
pub fn spawn_export(config: ExportConfig, result: AggregationResult) {
    if !config.enabled {
        return;
    }

    tokio::spawn(async move {
        if let Err(e) = run_export(&config, &result).await {
            warn!("Snapshot export failed: {}", e);
        }
    });
}

/// Write the CSV tables and optionally run the batch command.
async fn run_export(
    config: &ExportConfig,
    result: &AggregationResult,
) -> Result<(), ExportTaskError> {
    let sink = CsvSnapshot::new(&config.dir);
    sink.export(result)?;

    if let Some(command) = &config.command {
        run_command(
            command,
            &sink.mean_path(),
            &sink.median_path(),
            Duration::from_secs(config.timeout_secs),
        )
        .await?;
    }

    debug!(
        "Exported snapshot for {} devices to {}",
        result.device_count(),
        config.dir.display()
    );
    Ok(())
}

/// Run the external batch command with both table paths as arguments.
///
/// The child is killed if it exceeds the timeout. A non-zero exit
/// status is an error so it gets logged, but like every export failure
/// it never reaches the aggregation response.
async fn run_command(
    command: &str,
    mean_path: &std::path::Path,
    median_path: &std::path::Path,
    timeout: Duration,
) -> Result<(), ExportTaskError> {
    let mut child = Command::new(command)
        .arg(mean_path)
        .arg(median_path)
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| ExportTaskError::Spawn {
            command: command.to_string(),
            source: e,
        })?;

    match tokio::time::timeout(timeout, child.wait()).await {
        Ok(Ok(status)) if status.success() => Ok(()),
        Ok(Ok(status)) => Err(ExportTaskError::CommandFailed {
            command: command.to_string(),
            status,
        }),
        Ok(Err(e)) => Err(ExportTaskError::Spawn {
            command: command.to_string(),
            source: e,
        }),
        Err(_) => {
            let _ = child.start_kill();
            Err(ExportTaskError::Timeout {
                command: command.to_string(),
                timeout,
            })
        }
    }
}

/// Errors from the export task. Logged, never propagated to clients.
#[derive(Debug, thiserror::Error)]
enum ExportTaskError {
    #[error("snapshot write failed: {0}")]
    Snapshot(#[from] telemetra_aggregate::SnapshotError),

    #[error("failed to spawn batch command '{command}': {source}")]
    Spawn {
        command: String,
        source: std::io::Error,
    },

    #[error("batch command '{command}' exited with {status}")]
    CommandFailed {
        command: String,
        status: std::process::ExitStatus,
    },

    #[error("batch command '{command}' timed out after {timeout:?} and was killed")]
    Timeout { command: String, timeout: Duration },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn sample_result() -> AggregationResult {
        let mut result = AggregationResult::default();
        result.mean_values.insert("A".to_string(), 2.0);
        result.median_values.insert("A".to_string(), 2.0);
        result
    }

    #[tokio::test]
    async fn test_run_export_writes_tables() {
        let dir = tempfile::tempdir().unwrap();
        let config = ExportConfig {
            enabled: true,
            dir: dir.path().to_path_buf(),
            command: None,
            timeout_secs: 5,
        };

        run_export(&config, &sample_result()).await.unwrap();

        assert!(dir.path().join("mean_values.csv").exists());
        assert!(dir.path().join("median_values.csv").exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_export_with_successful_command() {
        let dir = tempfile::tempdir().unwrap();
        let config = ExportConfig {
            enabled: true,
            dir: dir.path().to_path_buf(),
            command: Some("true".to_string()),
            timeout_secs: 5,
        };

        run_export(&config, &sample_result()).await.unwrap();
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_export_reports_failing_command() {
        let dir = tempfile::tempdir().unwrap();
        let config = ExportConfig {
            enabled: true,
            dir: dir.path().to_path_buf(),
            command: Some("false".to_string()),
            timeout_secs: 5,
        };

        let err = run_export(&config, &sample_result()).await.unwrap_err();
        assert!(matches!(err, ExportTaskError::CommandFailed { .. }));
    }

    #[tokio::test]
    async fn test_run_export_reports_missing_command() {
        let dir = tempfile::tempdir().unwrap();
        let config = ExportConfig {
            enabled: true,
            dir: dir.path().to_path_buf(),
            command: Some("/definitely/not/a/real/binary".to_string()),
            timeout_secs: 5,
        };

        let err = run_export(&config, &sample_result()).await.unwrap_err();
        assert!(matches!(err, ExportTaskError::Spawn { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_command_timeout_kills_child() {
        let err = run_command(
            "sleep",
            &PathBuf::from("60"),
            &PathBuf::from("60"),
            Duration::from_millis(100),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, ExportTaskError::Timeout { .. }));
    }

    #[tokio::test]
    async fn test_spawn_export_disabled_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let config = ExportConfig {
            enabled: false,
            dir: dir.path().to_path_buf(),
            command: None,
            timeout_secs: 5,
        };

        spawn_export(config, sample_result());
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!dir.path().join("mean_values.csv").exists());
    }
}
