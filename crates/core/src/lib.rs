//! Core library for Relay
//!
//! This crate contains the durable side of resumable agent runs:
//! - Run, step and message model
//! - The `RunStore` contract and its versioned backends
//! - Store factory and preset catalogs

pub mod agent;
pub mod error;
pub mod preset;
pub mod run;
pub mod store;

pub use error::Error;
pub type Result<T> = std::result::Result<T, Error>;
