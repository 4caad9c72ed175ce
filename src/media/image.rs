//! In-memory images and image references

use std::fmt;
use std::fs;
use std::path::Path;

use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{AtelierError, Result};

/// MIME types accepted by the hosted generation service.
pub const SUPPORTED_MIME_TYPES: [&str; 5] = [
    "image/png",
    "image/jpeg",
    "image/webp",
    "image/heic",
    "image/heif",
];

const DATA_URL_PREFIX: &str = "data:";
const BASE64_MARKER: &str = ";base64,";

/// A reference to an image: a data URL, an http(s) URL or a file path.
///
/// Layers and catalogs only ever hold references; the bytes are resolved
/// through an [`ImageLoader`](super::ImageLoader) when needed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageRef(String);

impl ImageRef {
    pub fn new(reference: impl Into<String>) -> Self {
        Self(reference.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_data_url(&self) -> bool {
        self.0.starts_with(DATA_URL_PREFIX)
    }

    pub fn is_remote(&self) -> bool {
        self.0.starts_with("http://") || self.0.starts_with("https://")
    }

    /// Short form for logs; data URLs can be megabytes long.
    pub fn abbreviated(&self) -> String {
        if self.is_data_url() {
            let header = self.0.split(',').next().unwrap_or(DATA_URL_PREFIX);
            format!("{},<{} bytes>", header, self.0.len())
        } else {
            self.0.clone()
        }
    }
}

impl fmt::Display for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.abbreviated())
    }
}

impl From<String> for ImageRef {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for ImageRef {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// A decoded image with a validated MIME type.
#[derive(Clone, PartialEq, Eq)]
pub struct ImageData {
    mime_type: String,
    bytes: Vec<u8>,
}

impl ImageData {
    /// Wrap raw bytes, rejecting MIME types the service cannot read.
    pub fn new(mime_type: impl Into<String>, bytes: Vec<u8>) -> Result<Self> {
        let mime_type = mime_type.into().to_ascii_lowercase();
        if !SUPPORTED_MIME_TYPES.contains(&mime_type.as_str()) {
            return Err(AtelierError::UnsupportedMedia { mime_type });
        }
        Ok(Self { mime_type, bytes })
    }

    /// Decode a `data:<mime>;base64,<payload>` URL.
    pub fn from_data_url(url: &str) -> Result<Self> {
        let malformed = |reason: &str| AtelierError::ResourceLoad {
            url: ImageRef::new(url).abbreviated(),
            reason: reason.to_string(),
        };

        let rest = url
            .strip_prefix(DATA_URL_PREFIX)
            .ok_or_else(|| malformed("not a data URL"))?;
        let (mime_type, payload) = rest
            .split_once(BASE64_MARKER)
            .ok_or_else(|| malformed("data URL is not base64 encoded"))?;
        let bytes = BASE64_STANDARD
            .decode(payload.trim())
            .map_err(|e| malformed(&format!("invalid base64 payload: {}", e)))?;

        Self::new(mime_type, bytes)
    }

    /// Read an image file, guessing its MIME type from the extension.
    pub fn from_path(path: &Path) -> Result<Self> {
        let mime_type = mime_guess::from_path(path)
            .first()
            .map(|mime| mime.essence_str().to_string())
            .unwrap_or_else(|| "application/octet-stream".to_string());

        // Reject before reading so a huge video is never pulled into memory.
        if !SUPPORTED_MIME_TYPES.contains(&mime_type.as_str()) {
            return Err(AtelierError::UnsupportedMedia { mime_type });
        }

        let bytes = fs::read(path).map_err(|e| AtelierError::ResourceLoad {
            url: path.display().to_string(),
            reason: e.to_string(),
        })?;

        Self::new(mime_type, bytes)
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Base64 payload as sent inline to the service.
    pub fn base64(&self) -> String {
        BASE64_STANDARD.encode(&self.bytes)
    }

    pub fn to_data_url(&self) -> String {
        format!(
            "{}{}{}{}",
            DATA_URL_PREFIX,
            self.mime_type,
            BASE64_MARKER,
            self.base64()
        )
    }

    /// Store the image inline as a data URL reference.
    pub fn to_image_ref(&self) -> ImageRef {
        ImageRef::new(self.to_data_url())
    }

    /// SHA-256 of the image bytes, hex encoded.
    pub fn fingerprint(&self) -> String {
        format!("{:x}", Sha256::digest(&self.bytes))
    }

    /// File extension matching the MIME type.
    pub fn extension(&self) -> &'static str {
        match self.mime_type.as_str() {
            "image/jpeg" => "jpg",
            "image/webp" => "webp",
            "image/heic" => "heic",
            "image/heif" => "heif",
            _ => "png",
        }
    }
}

impl fmt::Debug for ImageData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageData")
            .field("mime_type", &self.mime_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}
