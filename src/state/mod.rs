//! State Management Module
//!
//! Provides digital models, per-model sessions, saved outfits and the
//! studio file used by the CLI.

pub mod favorites;
pub mod session;
pub mod storage;

pub use favorites::{Favorites, SavedOutfit};
pub use session::{ActiveSession, DigitalModel, SessionManager, SessionState};
pub use storage::{StudioSnapshot, StudioStore, CURRENT_SCHEMA_VERSION};
