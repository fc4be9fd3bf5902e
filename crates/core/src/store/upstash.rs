//! Upstash Redis storage over the REST API
//!
//! Each run is one JSON string under `<namespace>:run:<run_id>`. Creation uses
//! `SET NX`; updates go through a Lua script that compares the stored
//! `version` before replacing the value, so the check and the write are a
//! single server-side step.

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use super::config::UpstashConfig;
use super::versioned::{RecordBackend, SwapOutcome, VersionedStore};
use crate::preset::{Preset, PresetCatalog};
use crate::run::Run;
use crate::{Error, Result};

const BACKEND: &str = "upstash";

/// Replace KEYS[1] with ARGV[2] only if its stored version equals ARGV[1].
/// Replies `{applied, version}`; version is -1 when the key is missing.
const SWAP_IF_VERSION_SCRIPT: &str = r#"
local raw = redis.call('GET', KEYS[1])
if not raw then
  return {0, -1}
end
local current = tonumber(cjson.decode(raw)['version']) or 0
if current ~= tonumber(ARGV[1]) then
  return {0, current}
end
redis.call('SET', KEYS[1], ARGV[2])
return {1, current + 1}
"#;

#[derive(Debug, Deserialize)]
struct CommandReply {
    #[serde(default)]
    result: Value,
    #[serde(default)]
    error: Option<String>,
}

/// Minimal Upstash REST client: one command per request
#[derive(Clone)]
pub struct UpstashClient {
    http: Client,
    config: UpstashConfig,
}

impl UpstashClient {
    pub fn new(config: UpstashConfig) -> Self {
        Self {
            http: Client::builder().build().unwrap_or_else(|_| Client::new()),
            config,
        }
    }

    pub fn config(&self) -> &UpstashConfig {
        &self.config
    }

    fn run_key(&self, run_id: &str) -> String {
        format!("{}:run:{}", self.config.namespace, run_id)
    }

    fn presets_key(&self) -> String {
        format!("{}:presets", self.config.namespace)
    }

    /// Send one command, e.g. `["GET", "key"]`, and return its `result`
    pub async fn command(&self, args: &[Value]) -> Result<Value> {
        let resp = self
            .http
            .post(&self.config.url)
            .bearer_auth(&self.config.token)
            .json(args)
            .send()
            .await?;

        let status = resp.status();
        let text = resp.text().await?;
        let reply: CommandReply = serde_json::from_str(&text)
            .map_err(|_| Error::backend(BACKEND, Some(status.as_u16()), text.clone()))?;

        if let Some(error) = reply.error {
            return Err(Error::backend(BACKEND, Some(status.as_u16()), error));
        }
        if !status.is_success() {
            return Err(Error::backend(BACKEND, Some(status.as_u16()), text));
        }
        Ok(reply.result)
    }
}

fn parse_swap_reply(reply: &Value) -> Result<SwapOutcome> {
    let parts = reply
        .as_array()
        .filter(|parts| parts.len() == 2)
        .ok_or_else(|| Error::backend(BACKEND, None, format!("unexpected swap reply: {}", reply)))?;

    let applied = parts[0].as_i64().unwrap_or(0) == 1;
    let version = parts[1].as_i64().unwrap_or(-1);

    if applied {
        Ok(SwapOutcome::Applied)
    } else if version < 0 {
        Ok(SwapOutcome::Conflict { actual: None })
    } else {
        Ok(SwapOutcome::Conflict {
            actual: Some(version as u64),
        })
    }
}

/// Run records stored as JSON strings
pub struct UpstashRecordBackend {
    client: UpstashClient,
}

impl UpstashRecordBackend {
    pub fn new(client: UpstashClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl RecordBackend for UpstashRecordBackend {
    fn name(&self) -> &'static str {
        BACKEND
    }

    async fn insert(&self, run: &Run) -> Result<()> {
        let payload = serde_json::to_string(run)?;
        let reply = self
            .client
            .command(&[
                json!("SET"),
                json!(self.client.run_key(&run.run_id)),
                json!(payload),
                json!("NX"),
            ])
            .await?;

        // SET NX replies null when the key already exists
        if reply.is_null() {
            return Err(Error::RunExists(run.run_id.clone()));
        }
        Ok(())
    }

    async fn fetch(&self, run_id: &str) -> Result<Option<Run>> {
        let reply = self
            .client
            .command(&[json!("GET"), json!(self.client.run_key(run_id))])
            .await?;

        match reply {
            Value::Null => Ok(None),
            Value::String(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            other => Err(Error::backend(
                BACKEND,
                None,
                format!("unexpected GET reply for run {}: {}", run_id, other),
            )),
        }
    }

    async fn swap_if_version(&self, next: &Run, expected: u64) -> Result<SwapOutcome> {
        let payload = serde_json::to_string(next)?;
        let reply = self
            .client
            .command(&[
                json!("EVAL"),
                json!(SWAP_IF_VERSION_SCRIPT),
                json!("1"),
                json!(self.client.run_key(&next.run_id)),
                json!(expected.to_string()),
                json!(payload),
            ])
            .await?;

        let outcome = parse_swap_reply(&reply)?;
        if outcome != SwapOutcome::Applied {
            debug!(
                "Swap on run {} rejected at expected version {}: {:?}",
                next.run_id, expected, outcome
            );
        }
        Ok(outcome)
    }
}

/// Upstash-backed `RunStore`
pub type UpstashRunStore = VersionedStore<UpstashRecordBackend>;

impl VersionedStore<UpstashRecordBackend> {
    pub fn upstash(config: UpstashConfig) -> Self {
        Self::new(UpstashRecordBackend::new(UpstashClient::new(config)))
    }
}

/// Presets kept in a Redis list, newest at the head
pub struct UpstashPresetCatalog {
    client: UpstashClient,
}

impl UpstashPresetCatalog {
    pub fn new(client: UpstashClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PresetCatalog for UpstashPresetCatalog {
    async fn list(&self) -> Result<Vec<Preset>> {
        let reply = self
            .client
            .command(&[
                json!("LRANGE"),
                json!(self.client.presets_key()),
                json!("0"),
                json!("-1"),
            ])
            .await?;

        let items = match reply {
            Value::Null => return Ok(Vec::new()),
            Value::Array(items) => items,
            other => {
                return Err(Error::backend(
                    BACKEND,
                    None,
                    format!("unexpected LRANGE reply: {}", other),
                ))
            }
        };

        items
            .into_iter()
            .map(|item| match item {
                Value::String(raw) => serde_json::from_str(&raw).map_err(Error::from),
                other => Ok(serde_json::from_value(other)?),
            })
            .collect()
    }

    async fn add(&self, mut preset: Preset) -> Result<Preset> {
        preset.validate()?;
        preset.created_at.get_or_insert_with(Utc::now);
        let payload = serde_json::to_string(&preset)?;
        self.client
            .command(&[json!("LPUSH"), json!(self.client.presets_key()), json!(payload)])
            .await?;
        Ok(preset)
    }
}
