//! Wardrobe catalog

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;
use walkdir::WalkDir;

use crate::error::Result;
use crate::media::{ImageData, ImageRef};

/// Number of fingerprint characters used in upload ids.
const UPLOAD_ID_LEN: usize = 12;

/// A garment that can be put on a digital model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WardrobeItem {
    /// Unique identifier
    pub id: String,

    /// Display name
    pub name: String,

    /// Product image
    pub url: ImageRef,
}

impl WardrobeItem {
    pub fn new(id: impl Into<String>, name: impl Into<String>, url: impl Into<ImageRef>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            url: url.into(),
        }
    }

    /// Garment uploaded from a local file.
    ///
    /// The id is derived from the image content, so uploading the same photo
    /// twice yields the same item.
    pub fn from_upload(name: impl Into<String>, image: &ImageData) -> Self {
        let fingerprint = image.fingerprint();
        Self {
            id: format!("upload-{}", &fingerprint[..UPLOAD_ID_LEN]),
            name: name.into(),
            url: image.to_image_ref(),
        }
    }

    /// Garment imported from a product page URL.
    pub fn from_url(name: impl Into<String>, image: &ImageData) -> Self {
        Self {
            id: format!("url-{}", Uuid::new_v4()),
            name: name.into(),
            url: image.to_image_ref(),
        }
    }
}

/// Ordered garment catalog, newest first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wardrobe {
    items: Vec<WardrobeItem>,
}

impl Wardrobe {
    /// The stock wardrobe is empty so users start from their own garments.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_items(items: Vec<WardrobeItem>) -> Self {
        Self { items }
    }

    pub fn items(&self) -> &[WardrobeItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&WardrobeItem> {
        self.items.iter().find(|item| item.id == id)
    }

    /// Prepend an item. Returns false if an item with the same id exists.
    pub fn add(&mut self, item: WardrobeItem) -> bool {
        if self.get(&item.id).is_some() {
            debug!(garment_id = %item.id, "garment already in wardrobe");
            return false;
        }
        self.items.insert(0, item);
        true
    }

    /// Import every supported image under `dir`, named after the file stem.
    ///
    /// Files with unsupported types are skipped. Returns the number of new items.
    pub fn import_dir(&mut self, dir: &Path) -> Result<usize> {
        let mut imported = 0;

        for entry in WalkDir::new(dir).sort_by_file_name() {
            let entry = entry.map_err(std::io::Error::from)?;
            if !entry.file_type().is_file() {
                continue;
            }

            let path = entry.path();
            let image = match ImageData::from_path(path) {
                Ok(image) => image,
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "skipping wardrobe file");
                    continue;
                }
            };

            let name = path
                .file_stem()
                .map(|stem| stem.to_string_lossy().replace(['-', '_'], " "))
                .unwrap_or_else(|| "Garment".to_string());

            if self.add(WardrobeItem::from_upload(name, &image)) {
                imported += 1;
            }
        }

        Ok(imported)
    }

    /// Restore the stock catalog.
    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn png(bytes: &[u8]) -> ImageData {
        ImageData::new("image/png", bytes.to_vec()).unwrap()
    }

    #[test]
    fn test_add_prepends_and_dedupes() {
        let mut wardrobe = Wardrobe::new();
        assert!(wardrobe.add(WardrobeItem::new("a", "Jacket", "https://img/a.png")));
        assert!(wardrobe.add(WardrobeItem::new("b", "Skirt", "https://img/b.png")));
        assert!(!wardrobe.add(WardrobeItem::new("a", "Jacket again", "https://img/a.png")));

        let ids: Vec<_> = wardrobe.items().iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a"]);
    }

    #[test]
    fn test_upload_id_is_content_derived() {
        let first = WardrobeItem::from_upload("Shirt", &png(b"shirt"));
        let second = WardrobeItem::from_upload("Same shirt", &png(b"shirt"));
        assert_eq!(first.id, second.id);
        assert!(first.id.starts_with("upload-"));
        assert!(first.url.is_data_url());
    }

    #[test]
    fn test_url_ids_are_unique() {
        let first = WardrobeItem::from_url("Dress", &png(b"dress"));
        let second = WardrobeItem::from_url("Dress", &png(b"dress"));
        assert_ne!(first.id, second.id);
    }

    #[test]
    fn test_import_dir_skips_unsupported() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("red-jacket.png"), b"jacket").unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();
        fs::write(dir.path().join("nested").join("blue_jeans.jpg"), b"jeans").unwrap();
        fs::write(dir.path().join("readme.txt"), b"not an image").unwrap();

        let mut wardrobe = Wardrobe::new();
        let imported = wardrobe.import_dir(dir.path()).unwrap();

        assert_eq!(imported, 2);
        let names: Vec<_> = wardrobe.items().iter().map(|i| i.name.as_str()).collect();
        assert!(names.contains(&"red jacket"));
        assert!(names.contains(&"blue jeans"));
    }

    #[test]
    fn test_reset() {
        let mut wardrobe = Wardrobe::with_items(vec![WardrobeItem::new("a", "A", "x.png")]);
        wardrobe.reset();
        assert!(wardrobe.is_empty());
    }
}
