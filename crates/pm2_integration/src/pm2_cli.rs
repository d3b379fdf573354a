use std::{
    path::{Path, PathBuf},
    process::Output,
};

use async_trait::async_trait;
use serde::Deserialize;
use shared::domain::{ProcessId, ProcessRecord, ProcessStatus};
use tokio::process::Command;
use tracing::{debug, warn};

use crate::{ProcessSupervisor, SupervisorError};

/// Drives a local pm2 daemon through its command line client.
#[derive(Debug, Clone)]
pub struct Pm2Cli {
    binary: PathBuf,
}

impl Pm2Cli {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    async fn run(&self, args: &[&str]) -> Result<Vec<u8>, SupervisorError> {
        debug!(binary = %self.binary.display(), ?args, "running pm2");
        let output = Command::new(&self.binary)
            .args(args)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|error| {
                SupervisorError::Unavailable(format!(
                    "failed to run '{}': {error}",
                    self.binary.display()
                ))
            })?;

        if !output.status.success() {
            return Err(SupervisorError::CommandFailed {
                command: args.join(" "),
                detail: failure_detail(&output),
            });
        }
        Ok(output.stdout)
    }
}

#[async_trait]
impl ProcessSupervisor for Pm2Cli {
    async fn connect(&self) -> Result<(), SupervisorError> {
        self.run(&["ping"])
            .await
            .map(|_| ())
            .map_err(|error| SupervisorError::Unavailable(error.detail().to_string()))
    }

    async fn list(&self) -> Result<Vec<ProcessRecord>, SupervisorError> {
        let stdout = self.run(&["jlist"]).await?;
        parse_jlist(&stdout)
    }

    async fn start(&self, id: &ProcessId) -> Result<(), SupervisorError> {
        self.run(&["start", id.as_str()]).await.map(|_| ())
    }

    async fn stop(&self, id: &ProcessId) -> Result<(), SupervisorError> {
        self.run(&["stop", id.as_str()]).await.map(|_| ())
    }

    async fn restart(&self, id: &ProcessId) -> Result<(), SupervisorError> {
        self.run(&["restart", id.as_str()]).await.map(|_| ())
    }

    // The CLI keeps no session open between calls.
    async fn disconnect(&self) {}
}

#[derive(Debug, Deserialize)]
struct JlistEntry {
    pm_id: u32,
    name: String,
    #[serde(default)]
    pm2_env: Option<JlistEnv>,
}

#[derive(Debug, Deserialize)]
struct JlistEnv {
    #[serde(default)]
    status: Option<String>,
}

/// Parses `pm2 jlist` output. pm2 may print notices before the JSON array,
/// including `[PM2] ...` banner lines, so every line that opens with `[` is
/// tried in order and the first one that parses as the list wins.
pub fn parse_jlist(raw: &[u8]) -> Result<Vec<ProcessRecord>, SupervisorError> {
    let line_starts = std::iter::once(0).chain(
        raw.iter()
            .enumerate()
            .filter(|(_, byte)| **byte == b'\n')
            .map(|(index, _)| index + 1),
    );

    let mut last_error = None;
    let mut parsed = None;
    for start in line_starts {
        let candidate = raw[start..].trim_ascii_start();
        if !candidate.starts_with(b"[") {
            continue;
        }
        match serde_json::from_slice::<Vec<JlistEntry>>(candidate) {
            Ok(entries) => {
                if start > 0 {
                    warn!(skipped_bytes = start, "ignoring non-JSON prefix in pm2 jlist output");
                }
                parsed = Some(entries);
                break;
            }
            Err(error) => last_error = Some(error.to_string()),
        }
    }

    let entries = parsed.ok_or_else(|| {
        SupervisorError::Parse(
            last_error.unwrap_or_else(|| "no process list in pm2 output".to_string()),
        )
    })?;

    Ok(entries
        .into_iter()
        .map(|entry| ProcessRecord {
            id: ProcessId::from(entry.pm_id),
            name: entry.name,
            status: entry
                .pm2_env
                .and_then(|env| env.status)
                .map(|status| ProcessStatus::from_supervisor(&status))
                .unwrap_or(ProcessStatus::Unknown),
        })
        .collect())
}

fn failure_detail(output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let stderr = stderr.trim();
    if !stderr.is_empty() {
        return stderr.to_string();
    }
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stdout = stdout.trim();
    if !stdout.is_empty() {
        return stdout.to_string();
    }
    format!("pm2 exited with {}", output.status)
}

#[cfg(test)]
#[path = "tests/pm2_cli_tests.rs"]
mod tests;
