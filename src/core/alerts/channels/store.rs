//! Persisted alert log.
//!
//! Appends one JSON line per envelope, so the file can be tailed or replayed
//! with any line-oriented tool.

use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use super::ChannelAdapter;
use crate::core::alerts::model::{AlertEnvelope, ChannelKind};
use crate::core::error::ChannelError;

pub struct StoreChannel {
    path: PathBuf,
    /// Serializes appends from concurrent dispatches
    write_lock: Mutex<()>,
}

impl StoreChannel {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl ChannelAdapter for StoreChannel {
    fn name(&self) -> &str {
        "store"
    }

    fn kind(&self) -> ChannelKind {
        ChannelKind::Store
    }

    async fn deliver(&self, envelope: &AlertEnvelope) -> Result<(), ChannelError> {
        let mut line = serde_json::to_string(envelope)?;
        line.push('\n');

        let _guard = self.write_lock.lock().await;
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}

/// Read back every stored envelope, skipping lines that no longer parse.
pub async fn load_alerts(path: impl AsRef<Path>) -> io::Result<Vec<AlertEnvelope>> {
    let content = fs::read_to_string(path).await?;
    Ok(content
        .lines()
        .filter_map(|line| serde_json::from_str(line).ok())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::ConditionId;
    use chrono::Utc;
    use std::time::Duration;
    use tempfile::tempdir;

    fn envelope(condition: ConditionId) -> AlertEnvelope {
        AlertEnvelope {
            condition,
            message: "test".to_string(),
            timestamp: Duration::from_secs(1),
            raised_at: Utc::now(),
            detail: None,
            location: None,
        }
    }

    #[tokio::test]
    async fn test_appends_json_lines() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("alerts.jsonl");
        let store = StoreChannel::new(path.clone());

        store.deliver(&envelope(ConditionId::Loitering)).await.unwrap();
        store.deliver(&envelope(ConditionId::MaskedFace)).await.unwrap();

        let alerts = load_alerts(&path).await.unwrap();
        assert_eq!(alerts.len(), 2);
        assert_eq!(alerts[0].condition, ConditionId::Loitering);
        assert_eq!(alerts[1].condition, ConditionId::MaskedFace);
    }

    #[tokio::test]
    async fn test_unwritable_path_fails() {
        let dir = tempdir().unwrap();
        // A directory cannot be opened for appending
        let store = StoreChannel::new(dir.path().to_path_buf());
        let result = store.deliver(&envelope(ConditionId::Loitering)).await;
        assert!(matches!(result, Err(ChannelError::Io(_))));
    }
}
