//! Stylist and animator traits

use serde::{Deserialize, Serialize};

use super::request::DressRequest;
use crate::error::Result;
use crate::media::ImageData;

/// Trait that every image-generation backend implements.
///
/// Calls are blocking, possibly slow and possibly failing. The studio never
/// retries; a failure aborts the edit.
pub trait Stylist: Send + Sync {
    /// Backend name for logs
    fn name(&self) -> &str;

    /// Turn a user photo into a clean base model on a neutral studio background.
    fn generate_base_model(&self, photo: &ImageData) -> Result<ImageData>;

    /// Dress the base model with the full garment set described by `request`.
    fn dress_model(&self, request: &DressRequest) -> Result<ImageData>;
}

/// Handle of a submitted animation job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobTicket(pub String);

impl JobTicket {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Status reported by one poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobStatus {
    Pending,
    Done { video_url: String },
}

/// Submit-and-poll video generation backend.
pub trait Animator: Send + Sync {
    fn submit(&self, image: &ImageData, motion_prompt: &str) -> Result<JobTicket>;

    /// Poll once. Errors end the job.
    fn poll(&self, ticket: &JobTicket) -> Result<JobStatus>;
}
