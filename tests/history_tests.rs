//! Outfit History Tests
//!
//! Layer stack operations and the base-layer invariants.

use atelier::catalog::WardrobeItem;
use atelier::layers::{OutfitHistory, DEFAULT_POSE_KEY};
use atelier::media::ImageRef;
use pretty_assertions::assert_eq;

fn garment(id: &str) -> WardrobeItem {
    WardrobeItem::new(id, id.to_uppercase(), format!("https://img/{}.png", id))
}

fn img(name: &str) -> ImageRef {
    ImageRef::new(name)
}

fn dressed_history() -> OutfitHistory {
    let mut history = OutfitHistory::new(img("B"));
    history.append_layer(vec![garment("top")], "front", img("I1"));
    history.append_layer(vec![garment("skirt")], "front", img("I2"));
    history
}

// === Base Layer ===

#[test]
fn test_base_layer_never_has_garments() {
    let mut history = dressed_history();
    assert!(history.layers()[0].garments.is_empty());

    history.patch_last_layer("side", img("I3")).unwrap();
    history.remove_last_layer();
    history.remove_last_layer();
    history.remove_last_layer();
    assert!(history.layers()[0].garments.is_empty());
    assert_eq!(history.layers()[0].pose_images.get(DEFAULT_POSE_KEY), Some(&img("B")));
}

#[test]
fn test_remove_last_layer_on_bare_history_is_noop() {
    let mut history = OutfitHistory::new(img("B"));
    let before = history.clone();

    assert!(history.remove_last_layer().is_none());
    assert_eq!(history.len(), 1);
    assert_eq!(history, before);
}

#[test]
fn test_remove_last_layer_drops_tail() {
    let mut history = dressed_history();
    let removed = history.remove_last_layer().unwrap();

    assert_eq!(removed.garments, vec![garment("skirt")]);
    assert_eq!(history.len(), 2);
    assert_eq!(history.current_image("front"), Some(&img("I1")));
}

// === Append ===

#[test]
fn test_append_sets_pose_and_default() {
    let mut history = OutfitHistory::new(img("B"));
    let worn_before = history.worn_garment_ids();

    history.append_layer(vec![garment("top"), garment("belt")], "walking", img("I1"));

    assert_eq!(history.current_image("walking"), Some(&img("I1")));
    let tail = history.last_layer();
    assert_eq!(tail.pose_images.get("walking"), Some(&img("I1")));
    assert_eq!(tail.pose_images.get(DEFAULT_POSE_KEY), Some(&img("I1")));

    let worn_after = history.worn_garment_ids();
    assert!(worn_after.is_superset(&worn_before));
    assert!(worn_after.contains("top"));
    assert!(worn_after.contains("belt"));
}

#[test]
fn test_worn_garments_exclude_base_layer() {
    let history = dressed_history();
    let worn: Vec<_> = history.worn_garment_ids().into_iter().collect();
    assert_eq!(worn, vec!["skirt".to_string(), "top".to_string()]);
}

// === Patch ===

#[test]
fn test_patch_only_changes_tail_pose_images() {
    let mut history = dressed_history();
    let before = history.clone();

    history.patch_last_layer("side", img("I3")).unwrap();

    assert_eq!(history.len(), before.len());
    assert_eq!(history.layers()[..2], before.layers()[..2]);
    let tail = history.last_layer();
    assert_eq!(tail.garments, before.last_layer().garments);
    assert_eq!(tail.pose_images.get("front"), Some(&img("I2")));
    assert_eq!(tail.pose_images.get("side"), Some(&img("I3")));
    assert_eq!(tail.pose_images.get(DEFAULT_POSE_KEY), Some(&img("I3")));
}

#[test]
fn test_patch_overwrites_existing_pose() {
    let mut history = dressed_history();
    history.patch_last_layer("front", img("I2b")).unwrap();

    let poses: Vec<_> = history.last_layer().pose_images.poses().collect();
    assert_eq!(poses, vec!["front", DEFAULT_POSE_KEY]);
    assert_eq!(history.current_image("front"), Some(&img("I2b")));
}

// === Current Image ===

#[test]
fn test_current_image_falls_back_to_default() {
    let history = dressed_history();
    assert_eq!(history.current_image("never generated"), Some(&img("I2")));
}

#[test]
fn test_pose_cache_is_per_layer() {
    let mut history = dressed_history();
    history.patch_last_layer("side", img("I3")).unwrap();
    assert!(history.has_cached_pose("side"));

    history.append_layer(vec![garment("hat")], "front", img("I4"));
    assert!(!history.has_cached_pose("side"));
    assert_eq!(history.current_image("side"), Some(&img("I4")));
}
