//! Animation job state machine
//!
//! `Submitted -> Polling -> Done(video_url) | Failed(reason)`
//!
//! Once submitted a job cannot be cancelled. A caller that stops waiting
//! simply drops the job; the remote work continues and its result is unused.

use std::time::Duration;

use tracing::{debug, info, warn};

use super::service::{Animator, JobStatus, JobTicket};
use crate::error::{AtelierError, Result};
use crate::media::ImageData;

/// Interval between status polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Where an animation job stands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnimationState {
    /// Accepted by the service, not yet polled
    Submitted { ticket: JobTicket },
    /// Polled at least once, still running
    Polling { ticket: JobTicket, polls: u32 },
    Done { video_url: String },
    Failed { reason: String },
}

impl AnimationState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, AnimationState::Done { .. } | AnimationState::Failed { .. })
    }
}

/// A submitted video-generation job.
#[derive(Debug, Clone)]
pub struct AnimationJob {
    state: AnimationState,
    poll_interval: Duration,
}

impl AnimationJob {
    /// Submit `image` with a motion prompt. A rejected submission never
    /// produces a job.
    pub fn submit(animator: &dyn Animator, image: &ImageData, motion_prompt: &str) -> Result<Self> {
        let ticket = animator.submit(image, motion_prompt)?;
        info!(ticket = ticket.as_str(), "animation job submitted");
        Ok(Self {
            state: AnimationState::Submitted { ticket },
            poll_interval: DEFAULT_POLL_INTERVAL,
        })
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn state(&self) -> &AnimationState {
        &self.state
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Poll once and move to the next state. Terminal states are left as they are.
    pub fn advance(&mut self, animator: &dyn Animator) -> &AnimationState {
        let _ = self.poll_once(animator);
        &self.state
    }

    /// Sleep and poll until the job finishes, returning the video URL.
    pub fn wait(mut self, animator: &dyn Animator, mut sleep: impl FnMut(Duration)) -> Result<String> {
        loop {
            match &self.state {
                AnimationState::Done { video_url } => return Ok(video_url.clone()),
                AnimationState::Failed { reason } => {
                    return Err(AtelierError::ExternalService {
                        operation: "Animate look".to_string(),
                        reason: reason.clone(),
                    })
                }
                AnimationState::Submitted { .. } | AnimationState::Polling { .. } => {
                    sleep(self.poll_interval);
                    self.poll_once(animator)?;
                }
            }
        }
    }

    fn poll_once(&mut self, animator: &dyn Animator) -> Result<()> {
        let (ticket, polls) = match &self.state {
            AnimationState::Submitted { ticket } => (ticket.clone(), 0),
            AnimationState::Polling { ticket, polls } => (ticket.clone(), *polls),
            AnimationState::Done { .. } | AnimationState::Failed { .. } => return Ok(()),
        };

        match animator.poll(&ticket) {
            Ok(JobStatus::Pending) => {
                debug!(ticket = ticket.as_str(), polls = polls + 1, "animation still running");
                self.state = AnimationState::Polling {
                    ticket,
                    polls: polls + 1,
                };
                Ok(())
            }
            Ok(JobStatus::Done { video_url }) => {
                info!(ticket = ticket.as_str(), polls = polls + 1, "animation finished");
                self.state = AnimationState::Done { video_url };
                Ok(())
            }
            Err(err) => {
                warn!(ticket = ticket.as_str(), error = %err, "animation failed");
                self.state = AnimationState::Failed {
                    reason: err.to_string(),
                };
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stylist::MockAnimator;

    fn still() -> ImageData {
        ImageData::new("image/png", vec![7]).unwrap()
    }

    #[test]
    fn test_polls_until_done() {
        let animator = MockAnimator::finishing_after(3);
        let job = AnimationJob::submit(&animator, &still(), "turn around").unwrap();

        let mut sleeps = Vec::new();
        let url = job.wait(&animator, |d| sleeps.push(d)).unwrap();

        assert!(url.starts_with("mock://video/"));
        assert_eq!(sleeps, vec![DEFAULT_POLL_INTERVAL; 3]);
        assert_eq!(animator.poll_count(), 3);
    }

    #[test]
    fn test_state_transitions() {
        let animator = MockAnimator::finishing_after(2);
        let mut job = AnimationJob::submit(&animator, &still(), "wave")
            .unwrap()
            .with_poll_interval(Duration::from_millis(1));

        assert!(matches!(job.state(), AnimationState::Submitted { .. }));
        assert!(matches!(job.advance(&animator), AnimationState::Polling { polls: 1, .. }));
        assert!(matches!(job.advance(&animator), AnimationState::Done { .. }));
        assert!(job.state().is_terminal());
        // Terminal states do not poll again.
        job.advance(&animator);
        assert_eq!(animator.poll_count(), 2);
    }

    #[test]
    fn test_poll_failure_ends_job() {
        let animator = MockAnimator::failing_with("RESOURCE_EXHAUSTED");
        let job = AnimationJob::submit(&animator, &still(), "spin").unwrap();

        let err = job.wait(&animator, |_| {}).unwrap_err();
        assert!(err.is_rate_limit());
    }
}
