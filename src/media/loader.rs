//! Resolving image references into bytes

use std::path::Path;
use std::time::Duration;

use super::image::{ImageData, ImageRef};
use crate::error::{AtelierError, Result};

/// Turns an [`ImageRef`] into decoded [`ImageData`].
pub trait ImageLoader: Send + Sync {
    fn load(&self, image: &ImageRef) -> Result<ImageData>;
}

/// Loader for data URLs, local files and (with the `gemini` feature) http(s) URLs.
#[derive(Debug, Clone)]
pub struct DefaultImageLoader {
    #[cfg_attr(not(feature = "gemini"), allow(dead_code))]
    timeout: Duration,
}

impl DefaultImageLoader {
    pub fn new() -> Self {
        Self {
            timeout: Duration::from_secs(30),
        }
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self { timeout }
    }

    #[cfg(feature = "gemini")]
    fn fetch_remote(&self, image: &ImageRef) -> Result<ImageData> {
        let load_error = |reason: String| AtelierError::ResourceLoad {
            url: image.as_str().to_string(),
            reason,
        };

        let client = reqwest::blocking::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| load_error(e.to_string()))?;

        let response = client
            .get(image.as_str())
            .send()
            .map_err(|e| load_error(e.to_string()))?;

        if !response.status().is_success() {
            return Err(load_error(format!("server returned {}", response.status())));
        }

        let mime_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.split(';').next().unwrap_or(value).trim().to_string())
            .unwrap_or_else(|| "image/png".to_string());

        let bytes = response.bytes().map_err(|e| load_error(e.to_string()))?;
        ImageData::new(mime_type, bytes.to_vec())
    }

    #[cfg(not(feature = "gemini"))]
    fn fetch_remote(&self, image: &ImageRef) -> Result<ImageData> {
        Err(AtelierError::ResourceLoad {
            url: image.as_str().to_string(),
            reason: "remote images need HTTP support. Build with --features gemini".to_string(),
        })
    }
}

impl Default for DefaultImageLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageLoader for DefaultImageLoader {
    fn load(&self, image: &ImageRef) -> Result<ImageData> {
        if image.is_data_url() {
            return ImageData::from_data_url(image.as_str());
        }
        if image.is_remote() {
            return self.fetch_remote(image);
        }

        let path = image.as_str().strip_prefix("file://").unwrap_or(image.as_str());
        let path = Path::new(path);
        if !path.exists() {
            return Err(AtelierError::ResourceLoad {
                url: image.as_str().to_string(),
                reason: "file does not exist".to_string(),
            });
        }
        ImageData::from_path(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loads_data_url() {
        let image = ImageData::new("image/webp", vec![9, 9, 9]).unwrap();
        let loaded = DefaultImageLoader::new().load(&image.to_image_ref()).unwrap();
        assert_eq!(loaded, image);
    }

    #[test]
    fn test_loads_file_url() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.png");
        std::fs::write(&path, b"png").unwrap();

        let reference = ImageRef::new(format!("file://{}", path.display()));
        let loaded = DefaultImageLoader::new().load(&reference).unwrap();
        assert_eq!(loaded.mime_type(), "image/png");
    }

    #[test]
    fn test_missing_file_is_resource_error() {
        let err = DefaultImageLoader::new()
            .load(&ImageRef::new("/definitely/not/here.png"))
            .unwrap_err();
        assert_eq!(err.error_code(), "RESOURCE_LOAD");
    }

    #[cfg(not(feature = "gemini"))]
    #[test]
    fn test_remote_needs_http_feature() {
        let err = DefaultImageLoader::new()
            .load(&ImageRef::new("https://img.example/top.png"))
            .unwrap_err();
        assert_eq!(err.error_code(), "RESOURCE_LOAD");
        assert!(err.to_string().contains("--features gemini"));
    }
}
