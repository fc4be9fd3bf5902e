//! Supabase-backed storage over the PostgREST HTTP API
//!
//! Runs live in one row each. Mutations are conditional `PATCH`es filtered on
//! both `run_id` and `version`, so a stale writer matches zero rows instead of
//! overwriting a newer record.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::config::SupabaseConfig;
use super::versioned::{RecordBackend, SwapOutcome, VersionedStore};
use crate::preset::{Preset, PresetCatalog};
use crate::run::{Message, Run, RunCursor, RunStatus, Step};
use crate::{Error, Result};

const BACKEND: &str = "supabase";

/// Thin PostgREST client for one Supabase project
#[derive(Clone)]
pub struct SupabaseClient {
    http: Client,
    config: SupabaseConfig,
}

impl SupabaseClient {
    pub fn new(config: SupabaseConfig) -> Self {
        Self {
            http: Client::builder().build().unwrap_or_else(|_| Client::new()),
            config,
        }
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.config.url, table)
    }

    fn request(&self, method: Method, table: &str) -> RequestBuilder {
        self.http
            .request(method, self.table_url(table))
            .header("apikey", &self.config.anon_key)
            .bearer_auth(&self.config.anon_key)
    }
}

async fn check(resp: Response) -> Result<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let text = resp.text().await.unwrap_or_default();
    Err(Error::backend(BACKEND, Some(status.as_u16()), text))
}

/// Row shape of the runs table
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RunRow {
    run_id: String,
    agent_id: String,
    status: RunStatus,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    #[serde(default)]
    messages: Option<Vec<Message>>,
    #[serde(default)]
    steps: Option<Vec<Step>>,
    #[serde(default)]
    cursor: Option<RunCursor>,
    #[serde(default)]
    version: u64,
}

impl From<&Run> for RunRow {
    fn from(run: &Run) -> Self {
        Self {
            run_id: run.run_id.clone(),
            agent_id: run.agent_id.clone(),
            status: run.status,
            created_at: run.created_at,
            updated_at: run.updated_at,
            messages: Some(run.messages.clone()),
            steps: Some(run.steps.clone()),
            cursor: run.cursor.clone(),
            version: run.version,
        }
    }
}

impl From<RunRow> for Run {
    fn from(row: RunRow) -> Self {
        Self {
            run_id: row.run_id,
            agent_id: row.agent_id,
            status: row.status,
            created_at: row.created_at,
            updated_at: row.updated_at,
            messages: row.messages.unwrap_or_default(),
            steps: row.steps.unwrap_or_default(),
            cursor: row.cursor,
            version: row.version,
        }
    }
}

/// Columns rewritten by a conditional update
#[derive(Debug, Serialize)]
struct RunPatch<'a> {
    status: RunStatus,
    updated_at: DateTime<Utc>,
    messages: &'a [Message],
    steps: &'a [Step],
    cursor: Option<&'a RunCursor>,
    version: u64,
}

impl<'a> From<&'a Run> for RunPatch<'a> {
    fn from(run: &'a Run) -> Self {
        Self {
            status: run.status,
            updated_at: run.updated_at,
            messages: &run.messages,
            steps: &run.steps,
            cursor: run.cursor.as_ref(),
            version: run.version,
        }
    }
}

/// Run records in the `agent_runs` table
pub struct SupabaseRecordBackend {
    client: SupabaseClient,
}

impl SupabaseRecordBackend {
    pub fn new(client: SupabaseClient) -> Self {
        Self { client }
    }

    fn runs_table(&self) -> &str {
        &self.client.config.runs_table
    }
}

#[async_trait]
impl RecordBackend for SupabaseRecordBackend {
    fn name(&self) -> &'static str {
        BACKEND
    }

    async fn insert(&self, run: &Run) -> Result<()> {
        let resp = self
            .client
            .request(Method::POST, self.runs_table())
            .header("Prefer", "return=minimal")
            .json(&RunRow::from(run))
            .send()
            .await?;

        if resp.status() == StatusCode::CONFLICT {
            return Err(Error::RunExists(run.run_id.clone()));
        }
        check(resp).await?;
        Ok(())
    }

    async fn fetch(&self, run_id: &str) -> Result<Option<Run>> {
        let resp = self
            .client
            .request(Method::GET, self.runs_table())
            .query(&[("run_id", format!("eq.{}", run_id)), ("select", "*".to_string())])
            .send()
            .await?;

        let rows: Vec<RunRow> = check(resp).await?.json().await?;
        Ok(rows.into_iter().next().map(Run::from))
    }

    async fn swap_if_version(&self, next: &Run, expected: u64) -> Result<SwapOutcome> {
        let resp = self
            .client
            .request(Method::PATCH, self.runs_table())
            .query(&[
                ("run_id", format!("eq.{}", next.run_id)),
                ("version", format!("eq.{}", expected)),
            ])
            .header("Prefer", "return=representation")
            .json(&RunPatch::from(next))
            .send()
            .await?;

        let rows: Vec<RunRow> = check(resp).await?.json().await?;
        if !rows.is_empty() {
            return Ok(SwapOutcome::Applied);
        }

        let actual = self.fetch(&next.run_id).await?.map(|run| run.version);
        debug!(
            "Conditional update on run {} matched no rows (expected version {}, found {:?})",
            next.run_id, expected, actual
        );
        Ok(SwapOutcome::Conflict { actual })
    }
}

/// Supabase-backed `RunStore`
pub type SupabaseRunStore = VersionedStore<SupabaseRecordBackend>;

impl VersionedStore<SupabaseRecordBackend> {
    pub fn supabase(config: SupabaseConfig) -> Self {
        Self::new(SupabaseRecordBackend::new(SupabaseClient::new(config)))
    }
}

/// Presets in the `agent_presets` table
pub struct SupabasePresetCatalog {
    client: SupabaseClient,
}

impl SupabasePresetCatalog {
    pub fn new(client: SupabaseClient) -> Self {
        Self { client }
    }

    fn presets_table(&self) -> &str {
        &self.client.config.presets_table
    }
}

#[async_trait]
impl PresetCatalog for SupabasePresetCatalog {
    async fn list(&self) -> Result<Vec<Preset>> {
        let resp = self
            .client
            .request(Method::GET, self.presets_table())
            .query(&[("select", "*"), ("order", "created_at.desc")])
            .send()
            .await?;

        Ok(check(resp).await?.json().await?)
    }

    async fn add(&self, preset: Preset) -> Result<Preset> {
        preset.validate()?;
        let resp = self
            .client
            .request(Method::POST, self.presets_table())
            .header("Prefer", "return=representation")
            .json(&preset)
            .send()
            .await?;

        let rows: Vec<Preset> = check(resp).await?.json().await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| Error::backend(BACKEND, None, "insert returned no preset row"))
    }
}
