//! Pose keys and the per-layer pose cache

use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::media::ImageRef;

/// Pose key that mirrors the most recently generated image of a layer.
pub const DEFAULT_POSE_KEY: &str = "default";

/// Pose used for a fresh model and whenever no named pose can be derived.
pub const NEUTRAL_POSE: &str = "standing, facing forward, neutral expression";

/// Suggested pose instructions offered next to the free-text pose input.
pub const POSE_SUGGESTIONS: [&str; 4] = [
    "Catalog pose, front view",
    "Showing garment details, close-up",
    "Casual pose, hands in pockets",
    "Walking, motion capture",
];

/// Insertion-ordered cache from pose instruction to generated image.
///
/// Lookups go through [`PoseImages::resolve`], which falls back to the
/// `"default"` entry when a pose has not been generated for this layer.
/// Entries are only ever added or overwritten, never removed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PoseImages {
    entries: Vec<(String, ImageRef)>,
}

impl PoseImages {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cache holding only the `"default"` image.
    pub fn with_default(image: ImageRef) -> Self {
        let mut images = Self::new();
        images.set(DEFAULT_POSE_KEY, image);
        images
    }

    /// Exact lookup, no fallback. A hit here means no external call is needed.
    pub fn get(&self, pose: &str) -> Option<&ImageRef> {
        self.entries
            .iter()
            .find(|(key, _)| key == pose)
            .map(|(_, image)| image)
    }

    /// Two-level lookup: the pose itself, then `"default"`.
    pub fn resolve(&self, pose: &str) -> Option<&ImageRef> {
        self.get(pose).or_else(|| self.default_image())
    }

    pub fn default_image(&self) -> Option<&ImageRef> {
        self.get(DEFAULT_POSE_KEY)
    }

    pub fn contains(&self, pose: &str) -> bool {
        self.get(pose).is_some()
    }

    /// Insert or overwrite one entry, keeping its original position.
    pub fn set(&mut self, pose: &str, image: ImageRef) {
        match self.entries.iter_mut().find(|(key, _)| key == pose) {
            Some((_, existing)) => *existing = image,
            None => self.entries.push((pose.to_string(), image)),
        }
    }

    /// Record a freshly generated image: sets `pose` and mirrors it into `"default"`.
    pub fn record(&mut self, pose: &str, image: ImageRef) {
        self.set(pose, image.clone());
        self.set(DEFAULT_POSE_KEY, image);
    }

    /// First cached pose other than `"default"`, in insertion order.
    pub fn first_named_pose(&self) -> Option<&str> {
        self.poses().find(|pose| *pose != DEFAULT_POSE_KEY)
    }

    pub fn poses(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(key, _)| key.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ImageRef)> {
        self.entries.iter().map(|(key, image)| (key.as_str(), image))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for PoseImages {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (pose, image) in &self.entries {
            map.serialize_entry(pose, image)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for PoseImages {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct PoseImagesVisitor;

        impl<'de> Visitor<'de> for PoseImagesVisitor {
            type Value = PoseImages;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map from pose instruction to image reference")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<PoseImages, A::Error> {
                let mut images = PoseImages::new();
                while let Some((pose, image)) = access.next_entry::<String, ImageRef>()? {
                    images.set(&pose, image);
                }
                Ok(images)
            }
        }

        deserializer.deserialize_map(PoseImagesVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_falls_back_to_default() {
        let mut images = PoseImages::with_default(ImageRef::new("base"));
        images.record("front", ImageRef::new("i1"));

        assert_eq!(images.resolve("front").unwrap().as_str(), "i1");
        assert_eq!(images.resolve("side").unwrap().as_str(), "i1");
        assert!(images.get("side").is_none());
    }

    #[test]
    fn test_record_mirrors_default_and_keeps_order() {
        let mut images = PoseImages::new();
        images.record("front", ImageRef::new("i1"));
        images.record("side", ImageRef::new("i2"));

        let poses: Vec<_> = images.poses().collect();
        assert_eq!(poses, vec!["front", "default", "side"]);
        assert_eq!(images.default_image().unwrap().as_str(), "i2");
        assert_eq!(images.first_named_pose(), Some("front"));
    }

    #[test]
    fn test_first_named_pose_none_for_base() {
        let images = PoseImages::with_default(ImageRef::new("base"));
        assert_eq!(images.first_named_pose(), None);
    }

    #[test]
    fn test_serializes_as_ordered_object() {
        let mut images = PoseImages::new();
        images.record("side", ImageRef::new("i2"));
        images.set("front", ImageRef::new("i1"));

        let json = serde_json::to_string(&images).unwrap();
        assert_eq!(json, r#"{"side":"i2","default":"i2","front":"i1"}"#);

        let back: PoseImages = serde_json::from_str(&json).unwrap();
        assert_eq!(back, images);
    }
}
