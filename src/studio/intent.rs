//! Edit intents

use crate::catalog::WardrobeItem;
use crate::media::ImageRef;

/// Background picked for an edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackgroundChoice {
    /// Free-text description
    Prompt(String),
    /// Reference image
    Image(ImageRef),
    /// A stock background by id
    Preset(String),
}

/// How a successful edit is written into the history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitMode {
    /// Push a new layer with the new garments
    Append,
    /// Overwrite the tail layer's pose entry and default
    Patch,
}

/// One edit of the current look.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditRequest {
    /// Garments to add on top of what is already worn
    pub new_garments: Vec<WardrobeItem>,
    /// Pose instruction; `None` keeps the current pose
    pub pose: Option<String>,
    pub background: Option<BackgroundChoice>,
    /// Free-text edit of the current image
    pub refinement: Option<String>,
}

impl EditRequest {
    pub fn add_garments(garments: Vec<WardrobeItem>) -> Self {
        Self {
            new_garments: garments,
            ..Self::default()
        }
    }

    pub fn change_pose(pose: impl Into<String>) -> Self {
        Self {
            pose: Some(pose.into()),
            ..Self::default()
        }
    }

    pub fn change_background(background: BackgroundChoice) -> Self {
        Self {
            background: Some(background),
            ..Self::default()
        }
    }

    pub fn refine(instruction: impl Into<String>) -> Self {
        Self {
            refinement: Some(instruction.into()),
            ..Self::default()
        }
    }

    pub fn with_pose(mut self, pose: impl Into<String>) -> Self {
        self.pose = Some(pose.into());
        self
    }

    /// Only the pose changes, so a cached image can stand in for a call.
    pub fn is_pose_only(&self) -> bool {
        self.new_garments.is_empty() && self.background.is_none() && self.refinement.is_none()
    }

    /// New garments without a refinement get their own layer; everything
    /// else edits the tail layer in place.
    pub fn commit_mode(&self) -> CommitMode {
        if !self.new_garments.is_empty() && self.refinement.is_none() {
            CommitMode::Append
        } else {
            CommitMode::Patch
        }
    }
}
