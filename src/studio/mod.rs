//! Edit orchestration for the active digital model

#[cfg(feature = "async-bridge")]
pub mod async_bridge;
mod intent;
mod orchestrator;

#[cfg(feature = "async-bridge")]
pub use async_bridge::{apply_edit_shared, shared, SharedStudio};
pub use intent::{BackgroundChoice, CommitMode, EditRequest};
pub use orchestrator::{EditOutcome, EditPlan, PendingEdit, Studio};
