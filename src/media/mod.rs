//! Image data and image loading
//!
//! Images travel through the studio as references (`ImageRef`) and are only
//! materialized into bytes (`ImageData`) when the hosted service needs them.

mod image;
mod loader;

pub use image::{ImageData, ImageRef, SUPPORTED_MIME_TYPES};
pub use loader::{DefaultImageLoader, ImageLoader};
