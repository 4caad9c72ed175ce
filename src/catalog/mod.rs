//! Garment and background catalogs
//!
//! Catalog entries are immutable once created and are referenced, never
//! owned, by outfit layers.

mod backgrounds;
mod wardrobe;

pub use backgrounds::{default_backgrounds, find_background, BackgroundOption, BackgroundSource};
pub use wardrobe::{Wardrobe, WardrobeItem};
