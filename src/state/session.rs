//! Digital models and their sessions
//!
//! The [`SessionManager`] owns one [`SessionState`] per digital model. At
//! most one of them is checked out as the working copy; every switch commits
//! the outgoing working copy back as a whole before the next one is loaded.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use super::favorites::{Favorites, SavedOutfit};
use crate::error::{AtelierError, Result};
use crate::layers::OutfitHistory;
use crate::media::ImageRef;

/// A person turned into a reusable base model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DigitalModel {
    /// Unique id (`model-<uuid>`).
    pub id: String,
    /// Display name.
    pub name: String,
    /// The photo the user supplied.
    pub original_image_url: ImageRef,
    /// The generated base model image.
    pub generated_model_url: ImageRef,
    pub created_at: DateTime<Utc>,
}

impl DigitalModel {
    pub fn new(name: impl Into<String>, original_image_url: ImageRef, generated_model_url: ImageRef) -> Self {
        Self {
            id: format!("model-{}", Uuid::new_v4()),
            name: name.into(),
            original_image_url,
            generated_model_url,
            created_at: Utc::now(),
        }
    }
}

/// Everything that belongs to one digital model's try-on session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    pub outfit_history: OutfitHistory,
    pub current_pose: String,
    pub saved_outfits: Favorites,
    /// The current image is exactly a saved outfit
    pub is_current_outfit_saved: bool,
}

impl SessionState {
    /// A session holding only the base layer.
    pub fn fresh(base_model_image: ImageRef, default_pose: impl Into<String>) -> Self {
        Self {
            outfit_history: OutfitHistory::new(base_model_image),
            current_pose: default_pose.into(),
            saved_outfits: Favorites::new(),
            is_current_outfit_saved: false,
        }
    }

    /// Image for the current pose, derived from the tail layer.
    pub fn current_image(&self) -> Option<&ImageRef> {
        self.outfit_history.current_image(&self.current_pose)
    }

    /// Save the current look.
    ///
    /// Returns `None` without saving when there is no image, when the look is
    /// already saved, or when only the bare base layer exists.
    pub fn save_current_outfit(&mut self) -> Option<&SavedOutfit> {
        if self.is_current_outfit_saved || self.outfit_history.is_bare() {
            return None;
        }
        let image = self.current_image()?.clone();

        let outfit = SavedOutfit::new(image, self.outfit_history.clone());
        debug!(outfit_id = %outfit.id, layers = outfit.layers.len(), "saving outfit");
        self.is_current_outfit_saved = true;
        Some(self.saved_outfits.prepend(outfit))
    }

    /// Replace the live history with a copy of a saved outfit.
    ///
    /// The pose becomes the first named pose of the tail layer, or
    /// `fallback_pose` when the tail only has a default image.
    pub fn load_outfit(&mut self, outfit_id: &str, fallback_pose: &str) -> Result<()> {
        let outfit = self
            .saved_outfits
            .get(outfit_id)
            .ok_or_else(|| AtelierError::SavedOutfitNotFound {
                outfit_id: outfit_id.to_string(),
            })?;

        let history = outfit.layers.clone();
        let pose = history
            .last_layer()
            .pose_images
            .first_named_pose()
            .unwrap_or(fallback_pose)
            .to_string();

        self.outfit_history = history;
        self.current_pose = pose;
        self.is_current_outfit_saved = true;
        Ok(())
    }

    /// Remove a saved outfit. The live history is untouched.
    pub fn delete_outfit(&mut self, outfit_id: &str) -> Result<SavedOutfit> {
        self.saved_outfits.remove(outfit_id)
    }

    /// Drop the most recent layer. Returns false when only the base is left.
    pub fn remove_last_garment(&mut self) -> bool {
        if self.outfit_history.remove_last_layer().is_some() {
            self.is_current_outfit_saved = false;
            true
        } else {
            false
        }
    }
}

/// The checked-out working copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveSession {
    pub model_id: String,
    pub state: SessionState,
}

/// Owns every digital model and its session.
#[derive(Debug, Clone)]
pub struct SessionManager {
    models: Vec<DigitalModel>,
    sessions: BTreeMap<String, SessionState>,
    active: Option<ActiveSession>,
    default_pose: String,
}

impl SessionManager {
    pub fn new(default_pose: impl Into<String>) -> Self {
        Self {
            models: Vec::new(),
            sessions: BTreeMap::new(),
            active: None,
            default_pose: default_pose.into(),
        }
    }

    /// Rebuild from persisted parts. The active model, if any, is checked out.
    pub fn restore(
        models: Vec<DigitalModel>,
        sessions: BTreeMap<String, SessionState>,
        active_model_id: Option<&str>,
        default_pose: impl Into<String>,
    ) -> Result<Self> {
        let mut manager = Self {
            models,
            sessions,
            active: None,
            default_pose: default_pose.into(),
        };
        if let Some(model_id) = active_model_id {
            manager.select_model(model_id)?;
        }
        Ok(manager)
    }

    pub fn default_pose(&self) -> &str {
        &self.default_pose
    }

    pub fn models(&self) -> &[DigitalModel] {
        &self.models
    }

    pub fn model(&self, model_id: &str) -> Option<&DigitalModel> {
        self.models.iter().find(|model| model.id == model_id)
    }

    /// Register a freshly generated model and make it active.
    pub fn finalize_model(
        &mut self,
        name: impl Into<String>,
        original_image_url: ImageRef,
        generated_model_url: ImageRef,
    ) -> String {
        let model = DigitalModel::new(name, original_image_url, generated_model_url.clone());
        let model_id = model.id.clone();
        info!(model_id = %model_id, name = %model.name, "digital model created");

        let state = SessionState::fresh(generated_model_url, self.default_pose.clone());
        self.models.push(model);
        self.sessions.insert(model_id.clone(), state.clone());

        self.commit_active();
        self.active = Some(ActiveSession {
            model_id: model_id.clone(),
            state,
        });
        model_id
    }

    /// Check out `model_id`, committing whatever was active before.
    ///
    /// A known model without a stored session starts from its base image.
    pub fn select_model(&mut self, model_id: &str) -> Result<()> {
        let model = self
            .model(model_id)
            .ok_or_else(|| AtelierError::ModelNotFound {
                model_id: model_id.to_string(),
            })?;
        let fresh = SessionState::fresh(model.generated_model_url.clone(), self.default_pose.clone());

        self.commit_active();
        let state = self.sessions.get(model_id).cloned().unwrap_or(fresh);
        info!(model_id, layers = state.outfit_history.len(), "digital model selected");
        self.active = Some(ActiveSession {
            model_id: model_id.to_string(),
            state,
        });
        Ok(())
    }

    /// Commit the working copy and deactivate. Returns the id that was active.
    pub fn go_home(&mut self) -> Option<String> {
        let model_id = self.commit_active();
        if let Some(id) = &model_id {
            info!(model_id = %id, "session stored");
        }
        self.active = None;
        model_id
    }

    /// Commit the working copy without deactivating it.
    pub fn flush(&mut self) {
        if let Some(active) = &self.active {
            self.sessions.insert(active.model_id.clone(), active.state.clone());
        }
    }

    pub fn active(&self) -> Option<&ActiveSession> {
        self.active.as_ref()
    }

    pub fn active_model_id(&self) -> Option<&str> {
        self.active.as_ref().map(|active| active.model_id.as_str())
    }

    pub fn active_model(&self) -> Option<&DigitalModel> {
        self.active_model_id().and_then(|id| self.model(id))
    }

    pub fn active_state(&self) -> Result<&SessionState> {
        self.active
            .as_ref()
            .map(|active| &active.state)
            .ok_or(AtelierError::NoActiveModel)
    }

    pub fn active_state_mut(&mut self) -> Result<&mut SessionState> {
        self.active
            .as_mut()
            .map(|active| &mut active.state)
            .ok_or(AtelierError::NoActiveModel)
    }

    /// The stored snapshot for `model_id`. For the active model this lags
    /// the working copy until the next commit.
    pub fn session(&self, model_id: &str) -> Option<&SessionState> {
        self.sessions.get(model_id)
    }

    /// Every session with the working copy folded in.
    pub fn committed_sessions(&self) -> BTreeMap<String, SessionState> {
        let mut sessions = self.sessions.clone();
        if let Some(active) = &self.active {
            sessions.insert(active.model_id.clone(), active.state.clone());
        }
        sessions
    }

    fn commit_active(&mut self) -> Option<String> {
        let active = self.active.take()?;
        debug!(model_id = %active.model_id, "committing working session");
        self.sessions.insert(active.model_id.clone(), active.state);
        Some(active.model_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::WardrobeItem;
    use crate::layers::NEUTRAL_POSE;

    fn img(name: &str) -> ImageRef {
        ImageRef::new(name)
    }

    fn dressed_session() -> SessionState {
        let mut state = SessionState::fresh(img("B"), NEUTRAL_POSE);
        state.outfit_history.append_layer(
            vec![WardrobeItem::new("g1", "Top", "https://img/g1.png")],
            NEUTRAL_POSE,
            img("I1"),
        );
        state
    }

    #[test]
    fn test_save_skips_bare_history() {
        let mut state = SessionState::fresh(img("B"), NEUTRAL_POSE);
        assert!(state.save_current_outfit().is_none());
        assert!(state.saved_outfits.is_empty());
        assert!(!state.is_current_outfit_saved);
    }

    #[test]
    fn test_save_then_save_again_is_noop() {
        let mut state = dressed_session();
        assert!(state.save_current_outfit().is_some());
        assert!(state.save_current_outfit().is_none());
        assert_eq!(state.saved_outfits.len(), 1);
    }

    #[test]
    fn test_load_falls_back_to_given_pose() {
        let mut state = SessionState::fresh(img("B"), "walking");
        let mut history = OutfitHistory::new(img("B"));
        history.append_layer(vec![], "default", img("I1"));
        let id = state
            .saved_outfits
            .prepend(SavedOutfit::new(img("I1"), history))
            .id
            .clone();

        state.load_outfit(&id, NEUTRAL_POSE).unwrap();
        assert_eq!(state.current_pose, NEUTRAL_POSE);
        assert!(state.is_current_outfit_saved);
    }

    #[test]
    fn test_remove_last_garment_marks_unsaved() {
        let mut state = dressed_session();
        state.is_current_outfit_saved = true;

        assert!(state.remove_last_garment());
        assert!(!state.is_current_outfit_saved);
        assert!(!state.remove_last_garment());
        assert_eq!(state.outfit_history.len(), 1);
    }

    #[test]
    fn test_finalize_activates_new_model() {
        let mut manager = SessionManager::new(NEUTRAL_POSE);
        let id = manager.finalize_model("Ana", img("photo"), img("B"));

        assert_eq!(manager.active_model_id(), Some(id.as_str()));
        let state = manager.active_state().unwrap();
        assert_eq!(state.current_image(), Some(&img("B")));
        assert_eq!(state.current_pose, NEUTRAL_POSE);
    }

    #[test]
    fn test_select_unknown_model() {
        let mut manager = SessionManager::new(NEUTRAL_POSE);
        let err = manager.select_model("model-missing").unwrap_err();
        assert_eq!(err.error_code(), "MODEL_NOT_FOUND");
    }

    #[test]
    fn test_restore_checks_out_active_model() {
        let mut manager = SessionManager::new(NEUTRAL_POSE);
        let id = manager.finalize_model("Ana", img("photo"), img("B"));
        manager.go_home();

        let restored = SessionManager::restore(
            manager.models().to_vec(),
            manager.committed_sessions(),
            Some(&id),
            NEUTRAL_POSE,
        )
        .unwrap();
        assert_eq!(restored.active_model_id(), Some(id.as_str()));
    }
}
