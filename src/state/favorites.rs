//! Saved outfits
//!
//! A saved outfit is an immutable deep copy of the outfit history taken at
//! save time. Later edits to the live history never reach it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AtelierError, Result};
use crate::layers::OutfitHistory;
use crate::media::ImageRef;

/// Snapshot of a finished look.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedOutfit {
    /// Unique id (`saved-<uuid>`).
    pub id: String,
    /// Image shown when the outfit was saved.
    pub image_url: ImageRef,
    /// Full history at save time.
    pub layers: OutfitHistory,
    /// When the outfit was saved.
    pub saved_at: DateTime<Utc>,
}

impl SavedOutfit {
    pub fn new(image_url: ImageRef, layers: OutfitHistory) -> Self {
        Self {
            id: format!("saved-{}", Uuid::new_v4()),
            image_url,
            layers,
            saved_at: Utc::now(),
        }
    }
}

/// Saved outfits of one session, most recent first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Favorites {
    outfits: Vec<SavedOutfit>,
}

impl Favorites {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert at the front.
    pub fn prepend(&mut self, outfit: SavedOutfit) -> &SavedOutfit {
        self.outfits.insert(0, outfit);
        &self.outfits[0]
    }

    pub fn get(&self, id: &str) -> Option<&SavedOutfit> {
        self.outfits.iter().find(|outfit| outfit.id == id)
    }

    pub fn remove(&mut self, id: &str) -> Result<SavedOutfit> {
        let index = self
            .outfits
            .iter()
            .position(|outfit| outfit.id == id)
            .ok_or_else(|| AtelierError::SavedOutfitNotFound {
                outfit_id: id.to_string(),
            })?;
        Ok(self.outfits.remove(index))
    }

    pub fn iter(&self) -> impl Iterator<Item = &SavedOutfit> {
        self.outfits.iter()
    }

    pub fn len(&self) -> usize {
        self.outfits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outfits.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outfit(image: &str) -> SavedOutfit {
        SavedOutfit::new(ImageRef::new(image), OutfitHistory::new(ImageRef::new("B")))
    }

    #[test]
    fn test_prepend_orders_newest_first() {
        let mut favorites = Favorites::new();
        let first = favorites.prepend(outfit("one")).id.clone();
        let second = favorites.prepend(outfit("two")).id.clone();

        let ids: Vec<_> = favorites.iter().map(|o| o.id.clone()).collect();
        assert_eq!(ids, vec![second, first]);
    }

    #[test]
    fn test_remove_unknown_id() {
        let mut favorites = Favorites::new();
        favorites.prepend(outfit("one"));

        let err = favorites.remove("saved-missing").unwrap_err();
        assert_eq!(err.error_code(), "SAVED_OUTFIT_NOT_FOUND");
        assert_eq!(favorites.len(), 1);
    }

    #[test]
    fn test_ids_are_unique() {
        assert_ne!(outfit("a").id, outfit("a").id);
    }
}
