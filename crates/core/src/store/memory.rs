//! In-memory run storage
//!
//! Used for tests and local development. Records live only as long as the
//! process.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::versioned::{RecordBackend, SwapOutcome, VersionedStore};
use crate::run::Run;
use crate::{Error, Result};

/// Run records keyed by run id
#[derive(Default)]
pub struct MemoryRecordBackend {
    records: RwLock<HashMap<String, Run>>,
}

impl MemoryRecordBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop a record. Returns whether one existed.
    pub async fn remove(&self, run_id: &str) -> bool {
        self.records.write().await.remove(run_id).is_some()
    }
}

#[async_trait]
impl RecordBackend for MemoryRecordBackend {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn insert(&self, run: &Run) -> Result<()> {
        let mut records = self.records.write().await;
        if records.contains_key(&run.run_id) {
            return Err(Error::RunExists(run.run_id.clone()));
        }
        records.insert(run.run_id.clone(), run.clone());
        Ok(())
    }

    async fn fetch(&self, run_id: &str) -> Result<Option<Run>> {
        let records = self.records.read().await;
        Ok(records.get(run_id).cloned())
    }

    async fn swap_if_version(&self, next: &Run, expected: u64) -> Result<SwapOutcome> {
        let mut records = self.records.write().await;
        match records.get_mut(&next.run_id) {
            None => Ok(SwapOutcome::Conflict { actual: None }),
            Some(current) if current.version != expected => Ok(SwapOutcome::Conflict {
                actual: Some(current.version),
            }),
            Some(current) => {
                *current = next.clone();
                Ok(SwapOutcome::Applied)
            }
        }
    }
}

/// In-memory `RunStore`
pub type MemoryRunStore = VersionedStore<MemoryRecordBackend>;

impl VersionedStore<MemoryRecordBackend> {
    pub fn in_memory() -> Self {
        Self::new(MemoryRecordBackend::new())
    }
}
