//! Durable run storage
//!
//! `RunStore` is the capability set the runtime depends on. Every backend
//! implements it through [`VersionedStore`], which turns each mutation into a
//! compare-and-swap on the run's `version` so concurrent writers to the same
//! run never silently drop each other's appends.

mod config;
mod factory;
mod memory;
mod supabase;
mod upstash;
mod versioned;

use async_trait::async_trait;

use crate::run::{Message, NewRun, Run, RunCursor, RunStatus, Step};
use crate::Result;

pub use config::{StoreBackend, StoreConfig, SupabaseConfig, UpstashConfig};
pub use factory::{create_preset_catalog, create_run_store};
pub use memory::{MemoryRecordBackend, MemoryRunStore};
pub use supabase::{SupabaseClient, SupabasePresetCatalog, SupabaseRecordBackend, SupabaseRunStore};
pub use upstash::{UpstashClient, UpstashPresetCatalog, UpstashRecordBackend, UpstashRunStore};
pub use versioned::{RecordBackend, SwapOutcome, VersionedStore, DEFAULT_MAX_WRITE_ATTEMPTS};

/// Store interface for run records
#[async_trait]
pub trait RunStore: Send + Sync {
    /// Short name of the backing storage, for logs
    fn backend_name(&self) -> &'static str;

    /// Persist a new run. Fails with `RunExists` rather than overwrite.
    async fn create_run(&self, initial: NewRun) -> Result<Run>;

    /// Get a run by ID; `None` when no record exists
    async fn get_run(&self, run_id: &str) -> Result<Option<Run>>;

    /// Extend the message sequence
    async fn append_messages(&self, run_id: &str, messages: Vec<Message>) -> Result<()>;

    /// Extend the step sequence
    async fn append_step(&self, run_id: &str, step: Step) -> Result<()>;

    async fn set_status(&self, run_id: &str, status: RunStatus) -> Result<()>;

    /// Replace the cursor
    async fn set_cursor(&self, run_id: &str, cursor: Option<RunCursor>) -> Result<()>;
}
