//! Outfit layer model
//!
//! - Layer 0: the base model image, never removed or patched
//! - Layers 1..n: garments added at each step, each with its own pose cache
//!
//! The current outfit image is derived from the tail layer, never stored.

mod history;
mod outfit_layer;
mod pose;

pub use history::OutfitHistory;
pub use outfit_layer::OutfitLayer;
pub use pose::{PoseImages, DEFAULT_POSE_KEY, NEUTRAL_POSE, POSE_SUGGESTIONS};
