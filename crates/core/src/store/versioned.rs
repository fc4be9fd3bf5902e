//! Optimistic concurrency over a minimal record backend
//!
//! Backends only need three primitives: insert-if-absent, fetch, and a
//! conditional replace keyed on the stored `version`. `VersionedStore` builds
//! the full `RunStore` contract on top of them as read / apply / swap loops.

use async_trait::async_trait;
use tracing::{debug, info, warn};

use super::RunStore;
use crate::run::{Message, NewRun, Run, RunCursor, RunStatus, Step};
use crate::{Error, Result};

/// Swap attempts before a mutation gives up with `VersionConflict`
pub const DEFAULT_MAX_WRITE_ATTEMPTS: u32 = 5;

/// Result of a conditional replace
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwapOutcome {
    Applied,
    /// The stored version differed; `actual` is `None` when the record is gone
    Conflict { actual: Option<u64> },
}

/// Atomic primitives a storage backend has to provide
#[async_trait]
pub trait RecordBackend: Send + Sync {
    fn name(&self) -> &'static str;

    /// Store a new record. Must fail with `RunExists` if the id is taken.
    async fn insert(&self, run: &Run) -> Result<()>;

    async fn fetch(&self, run_id: &str) -> Result<Option<Run>>;

    /// Replace the stored record with `next` only if its version is `expected`
    async fn swap_if_version(&self, next: &Run, expected: u64) -> Result<SwapOutcome>;
}

/// `RunStore` implementation shared by every backend
pub struct VersionedStore<B> {
    backend: B,
    max_attempts: u32,
}

impl<B: RecordBackend> VersionedStore<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            max_attempts: DEFAULT_MAX_WRITE_ATTEMPTS,
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Apply `apply` to the freshest copy of the run and write it back,
    /// re-reading and re-applying whenever another writer got there first.
    async fn mutate<F>(&self, run_id: &str, op: &'static str, mut apply: F) -> Result<Run>
    where
        F: FnMut(&mut Run) + Send,
    {
        let mut expected = 0;
        let mut actual = None;

        for attempt in 1..=self.max_attempts {
            let mut next = self
                .backend
                .fetch(run_id)
                .await?
                .ok_or_else(|| Error::RunNotFound(run_id.to_string()))?;

            expected = next.version;
            apply(&mut next);
            next.version = expected + 1;
            next.touch();

            match self.backend.swap_if_version(&next, expected).await? {
                SwapOutcome::Applied => {
                    debug!(
                        "{} on run {} committed version {} ({})",
                        op,
                        run_id,
                        next.version,
                        self.backend.name()
                    );
                    return Ok(next);
                }
                SwapOutcome::Conflict { actual: None } => {
                    return Err(Error::RunNotFound(run_id.to_string()));
                }
                SwapOutcome::Conflict { actual: found } => {
                    debug!(
                        "{} on run {} lost race at version {} (found {:?}), attempt {}/{}",
                        op, run_id, expected, found, attempt, self.max_attempts
                    );
                    actual = found;
                }
            }
        }

        warn!(
            "{} on run {} gave up after {} attempts",
            op, run_id, self.max_attempts
        );
        Err(Error::VersionConflict {
            run_id: run_id.to_string(),
            expected,
            actual,
        })
    }
}

#[async_trait]
impl<B: RecordBackend> RunStore for VersionedStore<B> {
    fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    async fn create_run(&self, initial: NewRun) -> Result<Run> {
        if initial.run_id.trim().is_empty() {
            return Err(Error::InvalidInput("run id must not be empty".to_string()));
        }
        let run = initial.into_run();
        self.backend.insert(&run).await?;
        info!(
            "Created run {} for agent {} with status {}",
            run.run_id, run.agent_id, run.status
        );
        Ok(run)
    }

    async fn get_run(&self, run_id: &str) -> Result<Option<Run>> {
        self.backend.fetch(run_id).await
    }

    async fn append_messages(&self, run_id: &str, messages: Vec<Message>) -> Result<()> {
        self.mutate(run_id, "append_messages", |run| {
            run.messages.extend(messages.iter().cloned())
        })
        .await?;
        Ok(())
    }

    async fn append_step(&self, run_id: &str, step: Step) -> Result<()> {
        self.mutate(run_id, "append_step", |run| run.steps.push(step.clone()))
            .await?;
        Ok(())
    }

    async fn set_status(&self, run_id: &str, status: RunStatus) -> Result<()> {
        self.mutate(run_id, "set_status", |run| run.status = status)
            .await?;
        Ok(())
    }

    async fn set_cursor(&self, run_id: &str, cursor: Option<RunCursor>) -> Result<()> {
        self.mutate(run_id, "set_cursor", |run| run.cursor = cursor.clone())
            .await?;
        Ok(())
    }
}
