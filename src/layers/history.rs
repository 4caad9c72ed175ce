//! Outfit history
//!
//! An ordered stack of [`OutfitLayer`]s. The base layer (index 0) is never
//! removed and its `"default"` image is always the base model image, so the
//! history can always be replayed from scratch by the stylist.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::outfit_layer::OutfitLayer;
use super::pose::DEFAULT_POSE_KEY;
use crate::catalog::WardrobeItem;
use crate::error::{AtelierError, Result};
use crate::media::ImageRef;

/// Layer stack for one digital model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<OutfitLayer>", into = "Vec<OutfitLayer>")]
pub struct OutfitHistory {
    layers: Vec<OutfitLayer>,
}

impl OutfitHistory {
    /// History holding only the base layer.
    pub fn new(base_model_image: ImageRef) -> Self {
        Self {
            layers: vec![OutfitLayer::base(base_model_image)],
        }
    }

    /// Rebuild a history, checking the base-layer invariants.
    pub fn from_layers(layers: Vec<OutfitLayer>) -> Result<Self> {
        let base = layers.first().ok_or_else(|| AtelierError::InvariantViolation {
            reason: "outfit history has no layers".to_string(),
        })?;
        if base.has_garments() {
            return Err(AtelierError::InvariantViolation {
                reason: "base layer must not carry garments".to_string(),
            });
        }
        if base.pose_images.default_image().is_none() {
            return Err(AtelierError::InvariantViolation {
                reason: format!("base layer has no '{}' image", DEFAULT_POSE_KEY),
            });
        }
        Ok(Self { layers })
    }

    pub fn layers(&self) -> &[OutfitLayer] {
        &self.layers
    }

    /// Number of layers, base included. Always at least 1.
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    /// Always false; kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// True when only the base layer exists.
    pub fn is_bare(&self) -> bool {
        self.layers.len() == 1
    }

    pub fn base_layer(&self) -> &OutfitLayer {
        &self.layers[0]
    }

    pub fn last_layer(&self) -> &OutfitLayer {
        // Non-empty by construction.
        &self.layers[self.layers.len() - 1]
    }

    /// The unmodified model image every dress call starts from.
    pub fn base_model_image(&self) -> Result<&ImageRef> {
        self.base_layer()
            .pose_images
            .default_image()
            .ok_or_else(|| AtelierError::InvariantViolation {
                reason: "base model image not found".to_string(),
            })
    }

    /// Push a new layer holding `garments` with `image` cached under `pose` and `"default"`.
    pub fn append_layer(&mut self, garments: Vec<WardrobeItem>, pose: &str, image: ImageRef) {
        debug!(
            garments = garments.len(),
            pose,
            depth = self.layers.len() + 1,
            "appending outfit layer"
        );
        self.layers.push(OutfitLayer::dressed(garments, pose, image));
    }

    /// Cache `image` under `pose` and `"default"` on the tail layer.
    ///
    /// Garments and other pose entries are preserved. The base layer cannot be
    /// patched, since its default image is the base model image.
    pub fn patch_last_layer(&mut self, pose: &str, image: ImageRef) -> Result<()> {
        if self.is_bare() {
            return Err(AtelierError::InvariantViolation {
                reason: "the base layer cannot be patched".to_string(),
            });
        }
        debug!(pose, depth = self.layers.len(), "patching tail layer");
        let index = self.layers.len() - 1;
        self.layers[index].pose_images.record(pose, image);
        Ok(())
    }

    /// Drop the tail layer. No-op returning `None` when only the base is left.
    pub fn remove_last_layer(&mut self) -> Option<OutfitLayer> {
        if self.is_bare() {
            return None;
        }
        self.layers.pop()
    }

    /// The image currently shown for `pose`: the tail layer's cached pose,
    /// else its default.
    pub fn current_image(&self, pose: &str) -> Option<&ImageRef> {
        self.layers.last().and_then(|layer| layer.image_for(pose))
    }

    /// Whether the tail layer already holds an image for exactly this pose.
    pub fn has_cached_pose(&self, pose: &str) -> bool {
        self.last_layer().pose_images.contains(pose)
    }

    /// Every garment worn above the base layer, in the order it was added.
    pub fn accumulated_garments(&self) -> Vec<&WardrobeItem> {
        self.layers[1..]
            .iter()
            .flat_map(|layer| layer.garments.iter())
            .collect()
    }

    /// Ids of every garment worn above the base layer.
    pub fn worn_garment_ids(&self) -> BTreeSet<String> {
        self.accumulated_garments()
            .into_iter()
            .map(|garment| garment.id.clone())
            .collect()
    }
}

impl TryFrom<Vec<OutfitLayer>> for OutfitHistory {
    type Error = AtelierError;

    fn try_from(layers: Vec<OutfitLayer>) -> Result<Self> {
        Self::from_layers(layers)
    }
}

impl From<OutfitHistory> for Vec<OutfitLayer> {
    fn from(history: OutfitHistory) -> Self {
        history.layers
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layers::PoseImages;

    fn garment(id: &str) -> WardrobeItem {
        WardrobeItem::new(id, id.to_uppercase(), format!("https://img/{}.png", id))
    }

    fn img(name: &str) -> ImageRef {
        ImageRef::new(name)
    }

    #[test]
    fn test_new_history_has_base_layer() {
        let history = OutfitHistory::new(img("B"));
        assert_eq!(history.len(), 1);
        assert!(history.base_layer().garments.is_empty());
        assert_eq!(history.base_model_image().unwrap(), &img("B"));
        assert_eq!(history.current_image("anything"), Some(&img("B")));
    }

    #[test]
    fn test_from_layers_rejects_broken_base() {
        assert!(OutfitHistory::from_layers(vec![]).is_err());

        let dressed_base = OutfitLayer::dressed(vec![garment("g1")], "front", img("I1"));
        assert!(OutfitHistory::from_layers(vec![dressed_base]).is_err());

        let no_default = OutfitLayer {
            garments: vec![],
            pose_images: PoseImages::new(),
        };
        assert!(OutfitHistory::from_layers(vec![no_default]).is_err());
    }

    #[test]
    fn test_patch_refuses_base_layer() {
        let mut history = OutfitHistory::new(img("B"));
        let err = history.patch_last_layer("side", img("X")).unwrap_err();
        assert_eq!(err.error_code(), "INVARIANT_VIOLATION");
        assert_eq!(history, OutfitHistory::new(img("B")));
    }

    #[test]
    fn test_accumulated_garments_in_order() {
        let mut history = OutfitHistory::new(img("B"));
        history.append_layer(vec![garment("top")], "front", img("I1"));
        history.append_layer(vec![garment("skirt"), garment("belt")], "front", img("I2"));

        let ids: Vec<_> = history
            .accumulated_garments()
            .iter()
            .map(|g| g.id.as_str())
            .collect();
        assert_eq!(ids, vec!["top", "skirt", "belt"]);
    }

    #[test]
    fn test_serde_validates_on_load() {
        let mut history = OutfitHistory::new(img("B"));
        history.append_layer(vec![garment("top")], "front", img("I1"));

        let json = serde_json::to_string(&history).unwrap();
        let back: OutfitHistory = serde_json::from_str(&json).unwrap();
        assert_eq!(back, history);

        assert!(serde_json::from_str::<OutfitHistory>("[]").is_err());
    }
}
