//! Sharing a studio between async tasks
//!
//! The studio sits behind a `tokio::sync::Mutex`. The lock is only held while
//! an edit begins and while it completes. The dress call itself runs on a
//! blocking worker, so other tasks can observe the busy flag meanwhile.

use std::sync::Arc;

use tokio::sync::Mutex;

use super::orchestrator::{EditOutcome, EditPlan, Studio};
use super::EditRequest;
use crate::error::{AtelierError, Result};
use crate::stylist::Stylist;

pub type SharedStudio = Arc<Mutex<Studio>>;

pub fn shared(studio: Studio) -> SharedStudio {
    Arc::new(Mutex::new(studio))
}

/// Run an edit without holding the studio lock across the external call.
///
/// The dress call and its commit run on a spawned task, so the busy flag is
/// cleared even when the caller stops waiting.
pub async fn apply_edit_shared(
    studio: &SharedStudio,
    stylist: Arc<dyn Stylist>,
    request: EditRequest,
) -> Result<EditOutcome> {
    let plan = studio.lock().await.begin_edit(request)?;
    let pending = match plan {
        EditPlan::Cached(outcome) => return Ok(outcome),
        EditPlan::Dress(pending) => pending,
    };

    let studio = Arc::clone(studio);
    let completion = tokio::spawn(async move {
        let dress = pending.dress_request().clone();
        let result = tokio::task::spawn_blocking(move || stylist.dress_model(&dress))
            .await
            .unwrap_or_else(|e| Err(worker_failed(e)));
        studio.lock().await.complete_edit(pending, result)
    });

    completion.await.unwrap_or_else(|e| Err(worker_failed(e)))
}

fn worker_failed(err: tokio::task::JoinError) -> AtelierError {
    AtelierError::ExternalService {
        operation: "Dress model".to_string(),
        reason: format!("worker task failed: {}", err),
    }
}
