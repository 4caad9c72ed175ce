//! Atelier - Virtual Try-On Studio
//!
//! Atelier dresses a generated "digital model" with garment photos by
//! repeatedly calling a hosted image model, and keeps a per-model history of
//! every look so edits can be undone, saved and restored.
//!
//! # Architecture
//!
//! - `layers`: the outfit history. Layer 0 holds the base model image, every
//!   later layer holds the garments added at that step and a pose -> image cache.
//! - `state`: digital models, one session per model, saved outfits, persistence.
//! - `studio`: the edit orchestrator that turns intents into dress calls and
//!   commits the results.
//! - `stylist`: the hosted generation service (and mocks) behind traits.

pub mod catalog;
pub mod cli;
pub mod config;
pub mod error;
pub mod layers;
pub mod media;
pub mod state;
pub mod studio;
pub mod stylist;

pub use config::StudioConfig;
pub use error::{AtelierError, Result};
pub use studio::{EditRequest, Studio};
