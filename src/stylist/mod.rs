//! External image-generation collaborators
//!
//! This module provides:
//! - `Stylist` trait for base-model generation and dressing
//! - `Animator` trait and the `AnimationJob` polling state machine
//! - Prompt composition for the hosted model
//! - `GeminiStylist`, the hosted implementation
//! - Mock implementations for testing and offline use

mod animation;
mod gemini;
mod mock;
mod prompt;
mod request;
mod service;

pub use animation::{AnimationJob, AnimationState, DEFAULT_POLL_INTERVAL};
pub use gemini::GeminiStylist;
pub use mock::{DressCall, MockAnimator, MockStylist};
pub use prompt::{base_model_prompt, dress_prompt};
pub use request::{BackgroundSpec, DressRequest};
pub use service::{Animator, JobStatus, JobTicket, Stylist};
