//! Store configuration
//!
//! Credentials arrive either explicitly (request bodies, tests) or from the
//! process environment via [`StoreConfig::from_env`].

use serde::{Deserialize, Serialize};

use super::versioned::DEFAULT_MAX_WRITE_ATTEMPTS;
use crate::{Error, Result};

pub const DEFAULT_NAMESPACE: &str = "relay";
pub const DEFAULT_RUNS_TABLE: &str = "agent_runs";
pub const DEFAULT_PRESETS_TABLE: &str = "agent_presets";
/// Upper bound for caller-supplied `maxWriteAttempts`
pub const MAX_WRITE_ATTEMPTS: u32 = 16;

/// Raw configuration bag for the store factory
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreConfig {
    #[serde(default)]
    pub supabase_url: Option<String>,
    #[serde(default)]
    pub supabase_anon_key: Option<String>,
    #[serde(default)]
    pub upstash_url: Option<String>,
    #[serde(default)]
    pub upstash_token: Option<String>,
    #[serde(default)]
    pub namespace: Option<String>,
    #[serde(default)]
    pub max_write_attempts: Option<u32>,
}

/// Connection settings for a Supabase (PostgREST) project
#[derive(Debug, Clone, PartialEq)]
pub struct SupabaseConfig {
    pub url: String,
    pub anon_key: String,
    pub runs_table: String,
    pub presets_table: String,
}

impl SupabaseConfig {
    pub fn new(url: impl Into<String>, anon_key: impl Into<String>) -> Self {
        Self {
            url: url.into().trim_end_matches('/').to_string(),
            anon_key: anon_key.into(),
            runs_table: DEFAULT_RUNS_TABLE.to_string(),
            presets_table: DEFAULT_PRESETS_TABLE.to_string(),
        }
    }
}

/// Connection settings for an Upstash Redis REST endpoint
#[derive(Debug, Clone, PartialEq)]
pub struct UpstashConfig {
    pub url: String,
    pub token: String,
    pub namespace: String,
}

impl UpstashConfig {
    pub fn new(url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            url: url.into().trim_end_matches('/').to_string(),
            token: token.into(),
            namespace: DEFAULT_NAMESPACE.to_string(),
        }
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }
}

/// Backend selected from a `StoreConfig`
#[derive(Debug, Clone, PartialEq)]
pub enum StoreBackend {
    Supabase(SupabaseConfig),
    Upstash(UpstashConfig),
}

fn trim_to_none(value: Option<String>) -> Option<String> {
    value.and_then(|raw| {
        let trimmed = raw.trim().to_string();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed)
        }
    })
}

fn env_var(name: &str) -> Option<String> {
    trim_to_none(std::env::var(name).ok())
}

impl StoreConfig {
    /// Read credentials from `SUPABASE_URL`, `SUPABASE_ANON_KEY`,
    /// `UPSTASH_REDIS_REST_URL`, `UPSTASH_REDIS_REST_TOKEN` and `RELAY_NAMESPACE`
    pub fn from_env() -> Self {
        Self {
            supabase_url: env_var("SUPABASE_URL"),
            supabase_anon_key: env_var("SUPABASE_ANON_KEY"),
            upstash_url: env_var("UPSTASH_REDIS_REST_URL"),
            upstash_token: env_var("UPSTASH_REDIS_REST_TOKEN"),
            namespace: env_var("RELAY_NAMESPACE"),
            max_write_attempts: None,
        }
    }

    pub fn supabase(url: impl Into<String>, anon_key: impl Into<String>) -> Self {
        Self {
            supabase_url: Some(url.into()),
            supabase_anon_key: Some(anon_key.into()),
            ..Default::default()
        }
    }

    pub fn upstash(url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            upstash_url: Some(url.into()),
            upstash_token: Some(token.into()),
            ..Default::default()
        }
    }

    /// Fill every unset field from `fallback`
    pub fn or(self, fallback: StoreConfig) -> Self {
        Self {
            supabase_url: trim_to_none(self.supabase_url).or(trim_to_none(fallback.supabase_url)),
            supabase_anon_key: trim_to_none(self.supabase_anon_key)
                .or(trim_to_none(fallback.supabase_anon_key)),
            upstash_url: trim_to_none(self.upstash_url).or(trim_to_none(fallback.upstash_url)),
            upstash_token: trim_to_none(self.upstash_token)
                .or(trim_to_none(fallback.upstash_token)),
            namespace: trim_to_none(self.namespace).or(trim_to_none(fallback.namespace)),
            max_write_attempts: self.max_write_attempts.or(fallback.max_write_attempts),
        }
    }

    pub fn write_attempts(&self) -> u32 {
        self.max_write_attempts
            .unwrap_or(DEFAULT_MAX_WRITE_ATTEMPTS)
            .clamp(1, MAX_WRITE_ATTEMPTS)
    }

    /// Pick a backend. Supabase credentials win over Upstash ones.
    pub fn resolve(&self) -> Result<StoreBackend> {
        let supabase = (
            trim_to_none(self.supabase_url.clone()),
            trim_to_none(self.supabase_anon_key.clone()),
        );
        if let (Some(url), Some(key)) = supabase {
            return Ok(StoreBackend::Supabase(SupabaseConfig::new(url, key)));
        }

        let upstash = (
            trim_to_none(self.upstash_url.clone()),
            trim_to_none(self.upstash_token.clone()),
        );
        if let (Some(url), Some(token)) = upstash {
            let namespace =
                trim_to_none(self.namespace.clone()).unwrap_or_else(|| DEFAULT_NAMESPACE.to_string());
            return Ok(StoreBackend::Upstash(
                UpstashConfig::new(url, token).with_namespace(namespace),
            ));
        }

        Err(Error::NoStoreConfigured)
    }
}
