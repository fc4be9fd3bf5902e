//! Backend selection

use std::sync::Arc;

use tracing::info;

use super::config::{StoreBackend, StoreConfig};
use super::supabase::{SupabaseClient, SupabasePresetCatalog, SupabaseRunStore};
use super::upstash::{UpstashClient, UpstashPresetCatalog, UpstashRunStore};
use super::RunStore;
use crate::preset::PresetCatalog;
use crate::Result;

/// Build the run store described by `config`.
///
/// Supabase credentials take priority over Upstash ones; with neither present
/// this fails with `Error::NoStoreConfigured`.
pub fn create_run_store(config: &StoreConfig) -> Result<Arc<dyn RunStore>> {
    let attempts = config.write_attempts();
    let store: Arc<dyn RunStore> = match config.resolve()? {
        StoreBackend::Supabase(cfg) => {
            info!("Using Supabase run store at {}", cfg.url);
            Arc::new(SupabaseRunStore::supabase(cfg).with_max_attempts(attempts))
        }
        StoreBackend::Upstash(cfg) => {
            info!(
                "Using Upstash run store at {} (namespace {})",
                cfg.url, cfg.namespace
            );
            Arc::new(UpstashRunStore::upstash(cfg).with_max_attempts(attempts))
        }
    };
    Ok(store)
}

/// Build the preset catalog for the same backend `create_run_store` would pick
pub fn create_preset_catalog(config: &StoreConfig) -> Result<Arc<dyn PresetCatalog>> {
    let catalog: Arc<dyn PresetCatalog> = match config.resolve()? {
        StoreBackend::Supabase(cfg) => {
            Arc::new(SupabasePresetCatalog::new(SupabaseClient::new(cfg)))
        }
        StoreBackend::Upstash(cfg) => Arc::new(UpstashPresetCatalog::new(UpstashClient::new(cfg))),
    };
    Ok(catalog)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    #[test]
    fn test_factory_prefers_supabase() {
        let config = StoreConfig::supabase("https://db.example.co", "anon")
            .or(StoreConfig::upstash("https://cache.example.io", "token"));

        let store = create_run_store(&config).unwrap();
        assert_eq!(store.backend_name(), "supabase");
    }

    #[test]
    fn test_factory_falls_back_to_upstash() {
        let store = create_run_store(&StoreConfig::upstash("https://cache.example.io", "token"))
            .unwrap();
        assert_eq!(store.backend_name(), "upstash");
    }

    #[test]
    fn test_factory_without_credentials_fails() {
        assert!(matches!(
            create_run_store(&StoreConfig::default()),
            Err(Error::NoStoreConfigured)
        ));
        assert!(matches!(
            create_preset_catalog(&StoreConfig::default()),
            Err(Error::NoStoreConfigured)
        ));
    }
}
