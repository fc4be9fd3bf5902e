//! Saved agent configurations
//!
//! Presets are independent of runs: a catalog only lists and adds records.

mod catalog;
mod model;

pub use catalog::{MemoryPresetCatalog, PresetCatalog};
pub use model::Preset;
