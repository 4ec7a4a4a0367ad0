//! Ercole database inventory sources

use async_trait::async_trait;
use std::path::{Path, PathBuf};

use crate::error::{AdvisorError, Result};
use crate::models::ErcoleDatabaseRecord;

/// External view of database hosts and their workload samples.
#[async_trait]
pub trait ErcoleInventory: Send + Sync {
    /// Every known host record, archived ones included.
    async fn databases(&self) -> Result<Vec<ErcoleDatabaseRecord>>;

    /// Only hosts that are currently tracked.
    async fn active_databases(&self) -> Result<Vec<ErcoleDatabaseRecord>>;
}

/// Fixed records held in memory.
#[derive(Debug, Default, Clone)]
pub struct StaticErcoleInventory {
    records: Vec<ErcoleDatabaseRecord>,
}

impl StaticErcoleInventory {
    pub fn new(records: Vec<ErcoleDatabaseRecord>) -> Self {
        Self { records }
    }

    pub fn empty() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ErcoleInventory for StaticErcoleInventory {
    async fn databases(&self) -> Result<Vec<ErcoleDatabaseRecord>> {
        Ok(self.records.clone())
    }

    async fn active_databases(&self) -> Result<Vec<ErcoleDatabaseRecord>> {
        Ok(self.records.iter().filter(|r| !r.archived).cloned().collect())
    }
}

/// Reads exported Ercole JSON arrays from disk on every call.
#[derive(Debug, Clone)]
pub struct FileErcoleInventory {
    databases_path: PathBuf,
    active_databases_path: Option<PathBuf>,
}

impl FileErcoleInventory {
    pub fn new(databases_path: impl Into<PathBuf>) -> Self {
        Self {
            databases_path: databases_path.into(),
            active_databases_path: None,
        }
    }

    /// Uses a separate export for the active list instead of filtering
    /// archived hosts out of the full one.
    pub fn with_active_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.active_databases_path = Some(path.into());
        self
    }

    async fn read(path: &Path) -> Result<Vec<ErcoleDatabaseRecord>> {
        let raw = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| AdvisorError::Inventory(format!("{}: {e}", path.display())))?;
        serde_json::from_str(&raw)
            .map_err(|e| AdvisorError::Inventory(format!("{}: {e}", path.display())))
    }
}

#[async_trait]
impl ErcoleInventory for FileErcoleInventory {
    async fn databases(&self) -> Result<Vec<ErcoleDatabaseRecord>> {
        Self::read(&self.databases_path).await
    }

    async fn active_databases(&self) -> Result<Vec<ErcoleDatabaseRecord>> {
        match &self.active_databases_path {
            Some(path) => Self::read(path).await,
            None => Ok(Self::read(&self.databases_path)
                .await?
                .into_iter()
                .filter(|r| !r.archived)
                .collect()),
        }
    }
}
