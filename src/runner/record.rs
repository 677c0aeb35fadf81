// ABOUTME: Persisted execution record stored next to the log as execution.json.
// ABOUTME: Lets readers in other processes tell a live log from a sealed one.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::types::ExecutionId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionRecord {
    pub id: ExecutionId,
    /// Display name of the target.
    pub target: String,
    pub script: String,
    /// Hostname of the machine running the script.
    pub holder: String,
    pub pid: u32,
    pub started_at: DateTime<Utc>,
    #[serde(default)]
    pub finished_at: Option<DateTime<Utc>>,
    pub running: bool,
    #[serde(default)]
    pub exit_code: Option<i32>,
    /// Launch failure, if the script never started.
    #[serde(default)]
    pub failure: Option<String>,
}

impl ExecutionRecord {
    pub fn started(id: ExecutionId, target: &str, script: &str, started_at: DateTime<Utc>) -> Self {
        Self {
            id,
            target: target.to_string(),
            script: script.to_string(),
            holder: gethostname::gethostname().to_string_lossy().into_owned(),
            pid: std::process::id(),
            started_at,
            finished_at: None,
            running: true,
            exit_code: None,
            failure: None,
        }
    }

    pub fn finished(mut self, exit_code: Option<i32>) -> Self {
        self.running = false;
        self.exit_code = exit_code;
        self.finished_at = Some(Utc::now());
        self
    }

    pub fn failed(mut self, message: impl Into<String>) -> Self {
        self.running = false;
        self.failure = Some(message.into());
        self.finished_at = Some(Utc::now());
        self
    }

    /// Read a record; `None` when the execution never wrote one.
    pub async fn load(path: &Path) -> std::io::Result<Option<Self>> {
        match tokio::fs::read(path).await {
            Ok(raw) => serde_json::from_slice(&raw)
                .map(Some)
                .map_err(std::io::Error::other),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Write the record atomically (temp file + rename).
    pub async fn save(&self, path: &Path) -> std::io::Result<()> {
        if let Some(dir) = path.parent() {
            tokio::fs::create_dir_all(dir).await?;
        }
        let json = serde_json::to_vec_pretty(self).map_err(std::io::Error::other)?;
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, path).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ProjectName;

    fn record() -> ExecutionRecord {
        ExecutionRecord::started(
            ExecutionId::new(ProjectName::new("web").unwrap(), 4, "Docs"),
            "Docs",
            "run.sh",
            Utc::now(),
        )
    }

    #[test]
    fn started_record_is_running_on_this_host() {
        let record = record();
        assert!(record.running);
        assert_eq!(record.pid, std::process::id());
        assert!(!record.holder.is_empty());
    }

    #[test]
    fn finished_record_keeps_exit_code() {
        let record = record().finished(Some(3));
        assert!(!record.running);
        assert_eq!(record.exit_code, Some(3));
        assert!(record.finished_at.is_some());
    }

    #[tokio::test]
    async fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/execution.json");
        let record = record().failed("interpreter missing");
        record.save(&path).await.unwrap();

        let loaded = ExecutionRecord::load(&path).await.unwrap().unwrap();
        assert_eq!(loaded, record);
    }

    #[tokio::test]
    async fn missing_record_loads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = ExecutionRecord::load(&dir.path().join("execution.json"))
            .await
            .unwrap();
        assert!(loaded.is_none());
    }
}
