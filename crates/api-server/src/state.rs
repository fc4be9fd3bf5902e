//! Application state

use std::sync::Arc;

use agent_runtime::{AgentRuntime, CompletionProvider};
use relay_core::preset::PresetCatalog;
use relay_core::store::{create_preset_catalog, create_run_store, RunStore, StoreConfig};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    /// Store settings from the process environment; win over request values
    env_config: StoreConfig,
    provider: Arc<dyn CompletionProvider>,
    run_store: Option<Arc<dyn RunStore>>,
    preset_catalog: Option<Arc<dyn PresetCatalog>>,
}

impl AppState {
    /// Stores are resolved per request from `env_config` merged with the
    /// credentials the caller supplied.
    pub fn new(env_config: StoreConfig, provider: Arc<dyn CompletionProvider>) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                env_config,
                provider,
                run_store: None,
                preset_catalog: None,
            }),
        }
    }

    /// Fixed stores, ignoring any request credentials
    pub fn with_stores(
        provider: Arc<dyn CompletionProvider>,
        run_store: Arc<dyn RunStore>,
        preset_catalog: Arc<dyn PresetCatalog>,
    ) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                env_config: StoreConfig::default(),
                provider,
                run_store: Some(run_store),
                preset_catalog: Some(preset_catalog),
            }),
        }
    }

    /// Effective store configuration for a request
    pub fn store_config(&self, request: &StoreConfig) -> StoreConfig {
        self.inner.env_config.clone().or(request.clone())
    }

    pub fn run_store(&self, request: &StoreConfig) -> relay_core::Result<Arc<dyn RunStore>> {
        match &self.inner.run_store {
            Some(store) => Ok(Arc::clone(store)),
            None => create_run_store(&self.store_config(request)),
        }
    }

    pub fn preset_catalog(
        &self,
        request: &StoreConfig,
    ) -> relay_core::Result<Arc<dyn PresetCatalog>> {
        match &self.inner.preset_catalog {
            Some(catalog) => Ok(Arc::clone(catalog)),
            None => create_preset_catalog(&self.store_config(request)),
        }
    }

    /// Runtime bound to the store a request resolved to
    pub fn runtime(&self, request: &StoreConfig) -> relay_core::Result<AgentRuntime> {
        let store = self.run_store(request)?;
        Ok(AgentRuntime::new(store, Arc::clone(&self.inner.provider)))
    }

    /// Whether the environment alone selects a backend
    pub fn has_env_store(&self) -> bool {
        self.inner.run_store.is_some() || self.inner.env_config.resolve().is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::test_support::EchoProvider;
    use relay_core::Error;

    #[test]
    fn test_env_config_wins_over_request() {
        let state = AppState::new(
            StoreConfig::upstash("https://env.upstash.io", "env-token"),
            Arc::new(EchoProvider),
        );
        let request = StoreConfig {
            upstash_url: Some("https://body.upstash.io".to_string()),
            namespace: Some("tenant".to_string()),
            ..Default::default()
        };

        let merged = state.store_config(&request);

        assert_eq!(
            merged.upstash_url.as_deref(),
            Some("https://env.upstash.io")
        );
        assert_eq!(merged.upstash_token.as_deref(), Some("env-token"));
        assert_eq!(merged.namespace.as_deref(), Some("tenant"));
        assert_eq!(state.run_store(&request).unwrap().backend_name(), "upstash");
    }

    #[test]
    fn test_request_credentials_used_without_env() {
        let state = AppState::new(StoreConfig::default(), Arc::new(EchoProvider));
        assert!(!state.has_env_store());

        let store = state
            .run_store(&StoreConfig::supabase("https://db.example.co", "anon"))
            .unwrap();
        assert_eq!(store.backend_name(), "supabase");

        assert!(matches!(
            state.run_store(&StoreConfig::default()),
            Err(Error::NoStoreConfigured)
        ));
    }
}
