use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use super::model::Preset;
use crate::Result;

/// List/append access to saved presets
#[async_trait]
pub trait PresetCatalog: Send + Sync {
    /// All presets, newest first
    async fn list(&self) -> Result<Vec<Preset>>;

    /// Validate and store a preset, returning the stored record
    async fn add(&self, preset: Preset) -> Result<Preset>;
}

/// In-memory preset catalog
#[derive(Default)]
pub struct MemoryPresetCatalog {
    presets: RwLock<Vec<Preset>>,
}

impl MemoryPresetCatalog {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PresetCatalog for MemoryPresetCatalog {
    async fn list(&self) -> Result<Vec<Preset>> {
        let presets = self.presets.read().await;
        Ok(presets.iter().rev().cloned().collect())
    }

    async fn add(&self, mut preset: Preset) -> Result<Preset> {
        preset.validate()?;
        preset.created_at.get_or_insert_with(Utc::now);
        self.presets.write().await.push(preset.clone());
        Ok(preset)
    }
}
