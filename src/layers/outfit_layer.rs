//! A single step of outfit history

use serde::{Deserialize, Serialize};

use super::pose::PoseImages;
use crate::catalog::WardrobeItem;
use crate::media::ImageRef;

/// One layer of outfit history.
///
/// Holds the garments added at this step and the pose cache for exactly
/// that accumulated garment combination. An empty `garments` list marks the
/// base-model layer (or a garment-less edit on top of it).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutfitLayer {
    /// Garments added at this step
    #[serde(default)]
    pub garments: Vec<WardrobeItem>,

    /// Pose instruction -> generated image
    pub pose_images: PoseImages,
}

impl OutfitLayer {
    /// The base-model layer: no garments, the model image as `"default"`.
    pub fn base(model_image: ImageRef) -> Self {
        Self {
            garments: Vec::new(),
            pose_images: PoseImages::with_default(model_image),
        }
    }

    /// A freshly dressed layer with `pose` and `"default"` both set to `image`.
    pub fn dressed(garments: Vec<WardrobeItem>, pose: &str, image: ImageRef) -> Self {
        let mut pose_images = PoseImages::new();
        pose_images.record(pose, image);
        Self {
            garments,
            pose_images,
        }
    }

    /// Image for `pose`, falling back to the layer's default.
    pub fn image_for(&self, pose: &str) -> Option<&ImageRef> {
        self.pose_images.resolve(pose)
    }

    pub fn has_garments(&self) -> bool {
        !self.garments.is_empty()
    }

    pub fn garment_names(&self) -> Vec<&str> {
        self.garments.iter().map(|g| g.name.as_str()).collect()
    }
}
