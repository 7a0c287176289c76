use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::{fs, io::AsyncWriteExt, sync::Mutex};

use crate::usage::types::{LedgerError, UsageRecord};

/// Sink for usage records. Callers log failures and carry on.
#[async_trait]
pub trait UsageLedger: Send + Sync {
    async fn record(&self, record: UsageRecord) -> Result<(), LedgerError>;
}

#[derive(Default)]
pub struct InMemoryUsageLedger {
    records: Mutex<Vec<UsageRecord>>,
}

impl InMemoryUsageLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn records(&self) -> Vec<UsageRecord> {
        self.records.lock().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.records.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.lock().await.is_empty()
    }
}

#[async_trait]
impl UsageLedger for InMemoryUsageLedger {
    async fn record(&self, record: UsageRecord) -> Result<(), LedgerError> {
        self.records.lock().await.push(record);
        Ok(())
    }
}

/// Append-only file with one JSON record per line.
pub struct JsonLinesUsageLedger {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonLinesUsageLedger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> LedgerError {
        LedgerError::Io {
            path: self.path.display().to_string(),
            source,
        }
    }
}

#[async_trait]
impl UsageLedger for JsonLinesUsageLedger {
    async fn record(&self, record: UsageRecord) -> Result<(), LedgerError> {
        let mut line = serde_json::to_string(&record)?;
        line.push('\n');

        let _guard = self.write_lock.lock().await;
        if let Some(parent) = self.path.parent().filter(|parent| !parent.as_os_str().is_empty())
        {
            fs::create_dir_all(parent)
                .await
                .map_err(|err| self.io_error(err))?;
        }
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|err| self.io_error(err))?;
        file.write_all(line.as_bytes())
            .await
            .map_err(|err| self.io_error(err))?;
        file.flush().await.map_err(|err| self.io_error(err))?;
        Ok(())
    }
}
