//! Mock stylist and animator for testing and offline use
//!
//! Outputs are deterministic PNG-tagged byte strings, so every generated
//! image is distinct and traceable back to the call that produced it.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::debug;

use super::request::{BackgroundSpec, DressRequest};
use super::service::{Animator, JobStatus, JobTicket, Stylist};
use crate::error::{AtelierError, Result};
use crate::media::ImageData;

/// What the mock saw on one dress call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DressCall {
    pub garment_count: usize,
    pub pose: String,
    /// `"image"` for a background image, otherwise the background prompt
    pub background: Option<String>,
    pub refinement: Option<String>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// In-process stylist that records calls.
pub struct MockStylist {
    calls: Mutex<Vec<DressCall>>,
    base_model_calls: AtomicUsize,
    next_failure: Mutex<Option<String>>,
}

impl MockStylist {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            base_model_calls: AtomicUsize::new(0),
            next_failure: Mutex::new(None),
        }
    }

    /// Make the next call (of either kind) fail with `raw` service text.
    pub fn fail_next(&self, raw: impl Into<String>) {
        *lock(&self.next_failure) = Some(raw.into());
    }

    /// Dress calls seen so far, oldest first.
    pub fn dress_calls(&self) -> Vec<DressCall> {
        lock(&self.calls).clone()
    }

    pub fn dress_call_count(&self) -> usize {
        lock(&self.calls).len()
    }

    pub fn base_model_call_count(&self) -> usize {
        self.base_model_calls.load(Ordering::SeqCst)
    }

    fn take_failure(&self, operation: &str) -> Result<()> {
        match lock(&self.next_failure).take() {
            Some(raw) => Err(AtelierError::from_service_failure(operation, raw)),
            None => Ok(()),
        }
    }
}

impl Default for MockStylist {
    fn default() -> Self {
        Self::new()
    }
}

impl Stylist for MockStylist {
    fn name(&self) -> &str {
        "mock"
    }

    fn generate_base_model(&self, photo: &ImageData) -> Result<ImageData> {
        self.take_failure("Generate base model")?;
        let n = self.base_model_calls.fetch_add(1, Ordering::SeqCst) + 1;
        let fingerprint = photo.fingerprint();
        ImageData::new("image/png", format!("base#{}:{}", n, &fingerprint[..12]).into_bytes())
    }

    fn dress_model(&self, request: &DressRequest) -> Result<ImageData> {
        self.take_failure("Dress model")?;

        let call = DressCall {
            garment_count: request.garments.len(),
            pose: request.pose.clone(),
            background: request.background.as_ref().map(|background| match background {
                BackgroundSpec::Image(_) => "image".to_string(),
                BackgroundSpec::Prompt(prompt) => prompt.clone(),
            }),
            refinement: request.refinement.clone(),
        };

        let mut calls = lock(&self.calls);
        calls.push(call);
        let n = calls.len();
        debug!(call = n, garments = request.garments.len(), pose = %request.pose, "mock dress call");

        ImageData::new(
            "image/png",
            format!("dress#{}:{}:{}", n, request.garments.len(), request.pose).into_bytes(),
        )
    }
}

/// In-process animator that reports done after a fixed number of polls.
pub struct MockAnimator {
    polls_until_done: usize,
    failure: Option<String>,
    submitted: AtomicUsize,
    polls: AtomicUsize,
}

impl MockAnimator {
    pub fn finishing_after(polls: usize) -> Self {
        Self {
            polls_until_done: polls.max(1),
            failure: None,
            submitted: AtomicUsize::new(0),
            polls: AtomicUsize::new(0),
        }
    }

    /// Every poll fails with `raw` service text.
    pub fn failing_with(raw: impl Into<String>) -> Self {
        Self {
            failure: Some(raw.into()),
            ..Self::finishing_after(1)
        }
    }

    pub fn poll_count(&self) -> usize {
        self.polls.load(Ordering::SeqCst)
    }

    pub fn submit_count(&self) -> usize {
        self.submitted.load(Ordering::SeqCst)
    }
}

impl Default for MockAnimator {
    fn default() -> Self {
        Self::finishing_after(1)
    }
}

impl Animator for MockAnimator {
    fn submit(&self, image: &ImageData, _motion_prompt: &str) -> Result<JobTicket> {
        let n = self.submitted.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(JobTicket(format!("mock-job-{}-{}", n, &image.fingerprint()[..8])))
    }

    fn poll(&self, ticket: &JobTicket) -> Result<JobStatus> {
        let n = self.polls.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(raw) = &self.failure {
            return Err(AtelierError::from_service_failure("Animate look", raw.clone()));
        }
        if n >= self.polls_until_done {
            Ok(JobStatus::Done {
                video_url: format!("mock://video/{}", ticket.as_str()),
            })
        } else {
            Ok(JobStatus::Pending)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> ImageData {
        ImageData::new("image/png", vec![1, 2, 3]).unwrap()
    }

    #[test]
    fn test_mock_outputs_are_distinct() {
        let stylist = MockStylist::new();
        let request = DressRequest::new(base(), vec![base()], "front");

        let first = stylist.dress_model(&request).unwrap();
        let second = stylist.dress_model(&request).unwrap();

        assert_ne!(first, second);
        assert_eq!(stylist.dress_call_count(), 2);
        assert_eq!(stylist.dress_calls()[0].garment_count, 1);
    }

    #[test]
    fn test_fail_next_is_consumed_once() {
        let stylist = MockStylist::new();
        stylist.fail_next("429 Too Many Requests");
        let request = DressRequest::new(base(), vec![], "front");

        let err = stylist.dress_model(&request).unwrap_err();
        assert!(err.is_rate_limit());
        assert_eq!(stylist.dress_call_count(), 0);
        assert!(stylist.dress_model(&request).is_ok());
    }

    #[test]
    fn test_records_background_kind() {
        let stylist = MockStylist::new();
        let request = DressRequest::new(base(), vec![], "front")
            .with_background(BackgroundSpec::Prompt("a beach".into()));
        stylist.dress_model(&request).unwrap();

        assert_eq!(stylist.dress_calls()[0].background.as_deref(), Some("a beach"));
    }
}
