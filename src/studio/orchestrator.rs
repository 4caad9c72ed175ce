//! Edit orchestrator
//!
//! Turns edit intents into dress calls and commits the results into the
//! active session. An edit runs in two phases so the external call can happen
//! outside any borrow of the studio:
//!
//! 1. [`Studio::begin_edit`] answers pose-cache hits directly, otherwise
//!    loads every image the call needs, marks the studio busy and returns a
//!    [`PendingEdit`].
//! 2. [`Studio::complete_edit`] clears the busy flag and commits the result
//!    if the call succeeded. A failed call leaves every session untouched.
//!
//! While busy, anything that would replace or switch the active history is
//! refused with `EditInProgress`.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::thread;

use tracing::{debug, info, warn};

use super::intent::{BackgroundChoice, CommitMode, EditRequest};
use crate::catalog::{default_backgrounds, find_background, BackgroundOption, BackgroundSource, Wardrobe, WardrobeItem};
use crate::config::StudioConfig;
use crate::error::{AtelierError, Result};
use crate::layers::OutfitHistory;
use crate::media::{DefaultImageLoader, ImageData, ImageLoader, ImageRef};
use crate::state::{SavedOutfit, SessionManager, SessionState, StudioSnapshot};
use crate::stylist::{AnimationJob, Animator, BackgroundSpec, DressRequest, Stylist};

/// Result of an edit that reached the history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditOutcome {
    /// Image now shown for the current pose
    pub image: ImageRef,
    pub pose: String,
    /// Served from the pose cache without an external call
    pub cached: bool,
    /// History length after the edit
    pub layers: usize,
}

/// An edit waiting for its dress call.
#[derive(Debug)]
pub struct PendingEdit {
    model_id: String,
    pose: String,
    new_garments: Vec<WardrobeItem>,
    mode: CommitMode,
    request: DressRequest,
}

impl PendingEdit {
    /// The request to hand to [`Stylist::dress_model`].
    pub fn dress_request(&self) -> &DressRequest {
        &self.request
    }

    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    pub fn commit_mode(&self) -> CommitMode {
        self.mode
    }
}

/// What [`Studio::begin_edit`] decided.
#[derive(Debug)]
pub enum EditPlan {
    /// Pose cache hit, already applied
    Cached(EditOutcome),
    /// A dress call is needed
    Dress(PendingEdit),
}

/// The virtual fitting room.
pub struct Studio {
    config: StudioConfig,
    sessions: SessionManager,
    wardrobe: Wardrobe,
    backgrounds: Vec<BackgroundOption>,
    loader: Arc<dyn ImageLoader>,
    in_flight: bool,
}

impl Studio {
    pub fn new(config: StudioConfig) -> Self {
        let loader = Arc::new(DefaultImageLoader::with_timeout(config.timeout()));
        Self::with_loader(config, loader)
    }

    pub fn with_loader(config: StudioConfig, loader: Arc<dyn ImageLoader>) -> Self {
        Self {
            sessions: SessionManager::new(config.default_pose.clone()),
            config,
            wardrobe: Wardrobe::new(),
            backgrounds: default_backgrounds(),
            loader,
            in_flight: false,
        }
    }

    /// Rebuild a studio from a persisted snapshot.
    pub fn from_snapshot(config: StudioConfig, snapshot: StudioSnapshot) -> Result<Self> {
        let mut studio = Self::new(config);
        let (sessions, wardrobe) = snapshot.into_sessions(&studio.config.default_pose)?;
        studio.sessions = sessions;
        studio.wardrobe = Wardrobe::with_items(wardrobe);
        Ok(studio)
    }

    /// Capture everything for persistence, working copy included.
    pub fn snapshot(&self) -> StudioSnapshot {
        StudioSnapshot::capture(&self.sessions, self.wardrobe.items())
    }

    pub fn config(&self) -> &StudioConfig {
        &self.config
    }

    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    pub fn wardrobe(&self) -> &Wardrobe {
        &self.wardrobe
    }

    pub fn backgrounds(&self) -> &[BackgroundOption] {
        &self.backgrounds
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight
    }

    pub fn active_session(&self) -> Result<&SessionState> {
        self.sessions.active_state()
    }

    pub fn history(&self) -> Result<&OutfitHistory> {
        Ok(&self.sessions.active_state()?.outfit_history)
    }

    pub fn current_pose(&self) -> Option<&str> {
        self.sessions.active_state().ok().map(|state| state.current_pose.as_str())
    }

    /// Image shown for the active model, if any.
    pub fn current_image(&self) -> Option<&ImageRef> {
        self.sessions.active_state().ok().and_then(SessionState::current_image)
    }

    /// Garments already on the model; these cannot be added again.
    pub fn worn_garment_ids(&self) -> BTreeSet<String> {
        self.sessions
            .active_state()
            .map(|state| state.outfit_history.worn_garment_ids())
            .unwrap_or_default()
    }

    pub fn garment(&self, garment_id: &str) -> Result<&WardrobeItem> {
        self.wardrobe
            .get(garment_id)
            .ok_or_else(|| AtelierError::GarmentNotFound {
                garment_id: garment_id.to_string(),
            })
    }

    fn ensure_idle(&self) -> Result<()> {
        if self.in_flight {
            Err(AtelierError::EditInProgress)
        } else {
            Ok(())
        }
    }

    /// Generate a base model from a photo and make it the active model.
    pub fn create_model(&mut self, stylist: &dyn Stylist, name: &str, photo: &ImageRef) -> Result<String> {
        self.ensure_idle()?;
        let photo = self.loader.load(photo)?;

        self.in_flight = true;
        let generated = stylist.generate_base_model(&photo);
        self.in_flight = false;

        let generated = generated.map_err(|err| {
            warn!(stylist = stylist.name(), error = %err, "base model generation failed");
            err
        })?;
        Ok(self
            .sessions
            .finalize_model(name, photo.to_image_ref(), generated.to_image_ref()))
    }

    pub fn select_model(&mut self, model_id: &str) -> Result<()> {
        self.ensure_idle()?;
        self.sessions.select_model(model_id)
    }

    /// Store the active session, deactivate it and reset the wardrobe.
    pub fn go_home(&mut self) -> Result<Option<String>> {
        self.ensure_idle()?;
        let model_id = self.sessions.go_home();
        self.wardrobe.reset();
        Ok(model_id)
    }

    /// Add a garment from a local file or data URL to the wardrobe.
    pub fn upload_garment(&mut self, name: &str, image: &ImageRef) -> Result<WardrobeItem> {
        let data = self.loader.load(image)?;
        let item = WardrobeItem::from_upload(name, &data);
        if self.wardrobe.add(item.clone()) {
            info!(garment_id = %item.id, name, "garment uploaded");
        }
        Ok(item)
    }

    /// Fetch a product image from a URL and add it to the wardrobe.
    pub fn import_garment_from_url(&mut self, name: &str, url: &str) -> Result<WardrobeItem> {
        self.ensure_idle()?;
        let data = self.loader.load(&ImageRef::new(url))?;
        let item = WardrobeItem::from_url(name, &data);
        self.wardrobe.add(item.clone());
        info!(garment_id = %item.id, name, url, "garment imported");
        Ok(item)
    }

    /// Add every supported image under `dir` to the wardrobe.
    pub fn import_wardrobe_dir(&mut self, dir: &std::path::Path) -> Result<usize> {
        self.wardrobe.import_dir(dir)
    }

    /// Decoded bytes of the image currently shown.
    pub fn current_image_data(&self) -> Result<ImageData> {
        let image = self.current_image().ok_or(AtelierError::NoActiveModel)?;
        self.loader.load(image)
    }

    /// First phase of an edit.
    pub fn begin_edit(&mut self, mut request: EditRequest) -> Result<EditPlan> {
        self.ensure_idle()?;
        let model_id = self
            .sessions
            .active_model_id()
            .ok_or(AtelierError::NoActiveModel)?
            .to_string();

        // Already-worn garments stay in their original layer.
        let worn = self.sessions.active_state()?.outfit_history.worn_garment_ids();
        let requested = request.new_garments.len();
        request.new_garments.retain(|garment| {
            let fresh = !worn.contains(&garment.id);
            if !fresh {
                debug!(garment_id = %garment.id, "skipping garment that is already worn");
            }
            fresh
        });
        let nothing_new = requested > 0 && request == EditRequest::default();

        let state = self.sessions.active_state()?;
        let pose = request
            .pose
            .clone()
            .unwrap_or_else(|| state.current_pose.clone());
        let history = &state.outfit_history;

        if nothing_new || (request.is_pose_only() && history.has_cached_pose(&pose)) {
            debug!(model_id = %model_id, pose = %pose, "served without a dress call");
            let state = self.sessions.active_state_mut()?;
            state.current_pose = pose.clone();
            let image = state
                .current_image()
                .cloned()
                .ok_or_else(|| AtelierError::InvariantViolation {
                    reason: "cached pose has no image".to_string(),
                })?;
            return Ok(EditPlan::Cached(EditOutcome {
                image,
                pose,
                cached: true,
                layers: state.outfit_history.len(),
            }));
        }

        let base_model = self.loader.load(history.base_model_image()?)?;
        let garments = history
            .accumulated_garments()
            .into_iter()
            .chain(request.new_garments.iter())
            .map(|garment| self.loader.load(&garment.url))
            .collect::<Result<Vec<ImageData>>>()?;

        let mut dress = DressRequest::new(base_model, garments, pose.clone());
        if let Some(choice) = &request.background {
            dress = dress.with_background(self.resolve_background(choice)?);
        }
        if let Some(refinement) = &request.refinement {
            dress = dress.with_refinement(refinement.clone());
        }

        let mode = request.commit_mode();
        let new_garments = request.new_garments;

        debug!(
            model_id = %model_id,
            pose = %pose,
            garments = dress.garments.len(),
            ?mode,
            "edit started"
        );
        self.in_flight = true;
        Ok(EditPlan::Dress(PendingEdit {
            model_id,
            pose,
            new_garments,
            mode,
            request: dress,
        }))
    }

    /// Second phase of an edit. Always clears the busy flag.
    pub fn complete_edit(&mut self, pending: PendingEdit, result: Result<ImageData>) -> Result<EditOutcome> {
        self.in_flight = false;

        let image = result.map_err(|err| {
            warn!(model_id = %pending.model_id, error = %err, "dress call failed, history unchanged");
            err
        })?;

        if self.sessions.active_model_id() != Some(pending.model_id.as_str()) {
            return Err(AtelierError::InvariantViolation {
                reason: format!("edit for {} finished after a model switch", pending.model_id),
            });
        }

        let state = self.sessions.active_state_mut()?;
        let image_ref = image.to_image_ref();
        let history = &mut state.outfit_history;
        match pending.mode {
            CommitMode::Append => {
                history.append_layer(pending.new_garments, &pending.pose, image_ref.clone());
            }
            // The base layer keeps the model image, so in-place edits on a
            // bare history get a garment-less layer of their own.
            CommitMode::Patch if history.is_bare() => {
                history.append_layer(Vec::new(), &pending.pose, image_ref.clone());
            }
            CommitMode::Patch => {
                history.patch_last_layer(&pending.pose, image_ref.clone())?;
            }
        }
        state.current_pose = pending.pose.clone();
        state.is_current_outfit_saved = false;

        debug!(
            model_id = %pending.model_id,
            mode = ?pending.mode,
            layers = state.outfit_history.len(),
            "edit committed"
        );
        Ok(EditOutcome {
            image: image_ref,
            pose: pending.pose,
            cached: false,
            layers: state.outfit_history.len(),
        })
    }

    /// Run a whole edit with a blocking stylist.
    pub fn apply_edit(&mut self, stylist: &dyn Stylist, request: EditRequest) -> Result<EditOutcome> {
        match self.begin_edit(request)? {
            EditPlan::Cached(outcome) => Ok(outcome),
            EditPlan::Dress(pending) => {
                let result = stylist.dress_model(pending.dress_request());
                self.complete_edit(pending, result)
            }
        }
    }

    /// Undo the most recent layer. Returns false when only the base is left.
    pub fn remove_last_garment(&mut self) -> Result<bool> {
        self.ensure_idle()?;
        Ok(self.sessions.active_state_mut()?.remove_last_garment())
    }

    pub fn save_outfit(&mut self) -> Result<Option<SavedOutfit>> {
        Ok(self
            .sessions
            .active_state_mut()?
            .save_current_outfit()
            .cloned())
    }

    pub fn load_outfit(&mut self, outfit_id: &str) -> Result<()> {
        self.ensure_idle()?;
        let fallback_pose = self.config.default_pose.clone();
        self.sessions
            .active_state_mut()?
            .load_outfit(outfit_id, &fallback_pose)
    }

    pub fn delete_outfit(&mut self, outfit_id: &str) -> Result<SavedOutfit> {
        self.sessions.active_state_mut()?.delete_outfit(outfit_id)
    }

    /// Animate the current image and wait for the video, sleeping with `sleep`
    /// between polls.
    pub fn animate_with(
        &mut self,
        animator: &dyn Animator,
        motion_prompt: &str,
        sleep: impl FnMut(std::time::Duration),
    ) -> Result<String> {
        self.ensure_idle()?;
        let image = self
            .current_image()
            .cloned()
            .ok_or(AtelierError::NoActiveModel)?;
        let image = self.loader.load(&image)?;

        self.in_flight = true;
        let result = AnimationJob::submit(animator, &image, motion_prompt)
            .and_then(|job| job.with_poll_interval(self.config.poll_interval()).wait(animator, sleep));
        self.in_flight = false;
        result
    }

    /// Animate the current image, sleeping the thread between polls.
    pub fn animate(&mut self, animator: &dyn Animator, motion_prompt: &str) -> Result<String> {
        self.animate_with(animator, motion_prompt, thread::sleep)
    }

    fn resolve_background(&self, choice: &BackgroundChoice) -> Result<BackgroundSpec> {
        match choice {
            BackgroundChoice::Prompt(prompt) => Ok(BackgroundSpec::Prompt(prompt.clone())),
            BackgroundChoice::Image(image) => Ok(BackgroundSpec::Image(self.loader.load(image)?)),
            BackgroundChoice::Preset(id) => {
                let option = find_background(&self.backgrounds, id).ok_or_else(|| {
                    AtelierError::BackgroundNotFound {
                        background_id: id.clone(),
                    }
                })?;
                match &option.source {
                    BackgroundSource::Prompt(prompt) => Ok(BackgroundSpec::Prompt(prompt.clone())),
                    BackgroundSource::Image(image) => Ok(BackgroundSpec::Image(self.loader.load(image)?)),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stylist::MockStylist;

    fn photo() -> ImageRef {
        ImageData::new("image/png", vec![9, 9, 9]).unwrap().to_image_ref()
    }

    fn studio_with_model(stylist: &MockStylist) -> Studio {
        let mut studio = Studio::new(StudioConfig::default());
        studio.create_model(stylist, "Ana", &photo()).unwrap();
        studio
    }

    #[test]
    fn test_begin_edit_sets_busy_until_complete() {
        let stylist = MockStylist::new();
        let mut studio = studio_with_model(&stylist);

        let pending = match studio.begin_edit(EditRequest::change_pose("side")).unwrap() {
            EditPlan::Dress(pending) => pending,
            EditPlan::Cached(_) => panic!("pose was not cached"),
        };
        assert!(studio.is_busy());
        assert!(matches!(
            studio.begin_edit(EditRequest::change_pose("front")),
            Err(AtelierError::EditInProgress)
        ));

        let result = stylist.dress_model(pending.dress_request());
        studio.complete_edit(pending, result).unwrap();
        assert!(!studio.is_busy());
    }

    #[test]
    fn test_failed_call_clears_busy() {
        let stylist = MockStylist::new();
        let mut studio = studio_with_model(&stylist);
        let before = studio.history().unwrap().clone();

        stylist.fail_next("RESOURCE_EXHAUSTED");
        let err = studio.apply_edit(&stylist, EditRequest::refine("brighter")).unwrap_err();

        assert!(err.is_rate_limit());
        assert!(!studio.is_busy());
        assert_eq!(studio.history().unwrap(), &before);
    }

    #[test]
    fn test_unknown_preset_fails_before_call() {
        let stylist = MockStylist::new();
        let mut studio = studio_with_model(&stylist);

        let err = studio
            .apply_edit(
                &stylist,
                EditRequest::change_background(BackgroundChoice::Preset("moon".into())),
            )
            .unwrap_err();
        assert_eq!(err.error_code(), "BACKGROUND_NOT_FOUND");
        assert_eq!(stylist.dress_call_count(), 0);
        assert!(!studio.is_busy());
    }

    #[test]
    fn test_edit_without_model() {
        let stylist = MockStylist::new();
        let mut studio = Studio::new(StudioConfig::default());
        let err = studio.apply_edit(&stylist, EditRequest::change_pose("side")).unwrap_err();
        assert_eq!(err.error_code(), "NO_ACTIVE_MODEL");
    }
}
