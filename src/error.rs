//! Error handling for Atelier
//!
//! Every failure of the hosted generation service is classified here so the
//! studio can report it without touching any stored state.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for Atelier operations
pub type Result<T> = std::result::Result<T, AtelierError>;

/// Marker placed in `UnsupportedMedia` when the service did not name the type.
pub const UNKNOWN_MIME_TYPE: &str = "unknown";

/// Substrings that identify a quota-exhaustion response from the service.
const RATE_LIMIT_SIGNALS: [&str; 3] = ["429", "RESOURCE_EXHAUSTED", "exceeded your current quota"];

const UNSUPPORTED_MIME_SIGNAL: &str = "Unsupported MIME type";

/// Main error type for Atelier operations
#[derive(Error, Debug)]
pub enum AtelierError {
    // Media Errors
    #[error("Unsupported media type: {mime_type}")]
    UnsupportedMedia { mime_type: String },

    #[error("Could not load image from {url}: {reason}")]
    ResourceLoad { url: String, reason: String },

    // External Service Errors
    #[error("{operation} failed: {reason}")]
    ExternalService { operation: String, reason: String },

    #[error("{operation} was rate limited: {reason}")]
    RateLimited { operation: String, reason: String },

    // Studio Errors
    #[error("An edit is already in progress")]
    EditInProgress,

    #[error("No digital model is active")]
    NoActiveModel,

    #[error("Digital model not found: {model_id}")]
    ModelNotFound { model_id: String },

    #[error("Saved outfit not found: {outfit_id}")]
    SavedOutfitNotFound { outfit_id: String },

    #[error("Garment not found in wardrobe: {garment_id}")]
    GarmentNotFound { garment_id: String },

    #[error("Background option not found: {background_id}")]
    BackgroundNotFound { background_id: String },

    #[error("Internal invariant violated: {reason}")]
    InvariantViolation { reason: String },

    // Configuration Errors
    #[error("No API key configured for the generation service")]
    MissingApiKey,

    #[error("Invalid value for {key}: {value}")]
    InvalidConfig { key: String, value: String },

    // Storage Errors
    #[error("Failed to read file: {path}: {source}")]
    FileReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write file: {path}: {source}")]
    FileWriteError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid studio snapshot: {reason}")]
    InvalidSnapshot { reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl AtelierError {
    /// Classify a raw failure message coming back from the generation service.
    pub fn from_service_failure(operation: impl Into<String>, raw: impl Into<String>) -> Self {
        let operation = operation.into();
        let raw = raw.into();

        if RATE_LIMIT_SIGNALS.iter().any(|signal| raw.contains(signal)) {
            return AtelierError::RateLimited {
                operation,
                reason: raw,
            };
        }

        if raw.contains(UNSUPPORTED_MIME_SIGNAL) {
            return AtelierError::UnsupportedMedia {
                mime_type: extract_unsupported_mime(&raw)
                    .unwrap_or_else(|| UNKNOWN_MIME_TYPE.to_string()),
            };
        }

        AtelierError::ExternalService {
            operation,
            reason: raw,
        }
    }

    /// Get the error code for this error type
    pub fn error_code(&self) -> &'static str {
        match self {
            AtelierError::UnsupportedMedia { .. } => "UNSUPPORTED_MEDIA",
            AtelierError::ResourceLoad { .. } => "RESOURCE_LOAD",
            AtelierError::ExternalService { .. } => "EXTERNAL_SERVICE",
            AtelierError::RateLimited { .. } => "RATE_LIMITED",
            AtelierError::EditInProgress => "EDIT_IN_PROGRESS",
            AtelierError::NoActiveModel => "NO_ACTIVE_MODEL",
            AtelierError::ModelNotFound { .. } => "MODEL_NOT_FOUND",
            AtelierError::SavedOutfitNotFound { .. } => "SAVED_OUTFIT_NOT_FOUND",
            AtelierError::GarmentNotFound { .. } => "GARMENT_NOT_FOUND",
            AtelierError::BackgroundNotFound { .. } => "BACKGROUND_NOT_FOUND",
            AtelierError::InvariantViolation { .. } => "INVARIANT_VIOLATION",
            AtelierError::MissingApiKey => "MISSING_API_KEY",
            AtelierError::InvalidConfig { .. } => "INVALID_CONFIG",
            AtelierError::FileReadError { .. } => "FILE_READ_ERROR",
            AtelierError::FileWriteError { .. } => "FILE_WRITE_ERROR",
            AtelierError::InvalidSnapshot { .. } => "INVALID_SNAPSHOT",
            AtelierError::Io(_) => "IO_ERROR",
            AtelierError::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }

    /// Returns true if the user may re-trigger the same operation later.
    ///
    /// Nothing is retried automatically.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AtelierError::RateLimited { .. }
                | AtelierError::ExternalService { .. }
                | AtelierError::ResourceLoad { .. }
                | AtelierError::EditInProgress
        )
    }

    /// True for the quota-exhaustion sub-kind of external service errors.
    pub fn is_rate_limit(&self) -> bool {
        matches!(self, AtelierError::RateLimited { .. })
    }

    /// Get recovery suggestions for this error
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            AtelierError::UnsupportedMedia { .. } => vec![
                "Convert the image to PNG, JPEG or WEBP",
                "Re-export the photo from your gallery app",
            ],
            AtelierError::ResourceLoad { .. } => vec![
                "Check that the image URL is reachable",
                "Download the image and upload it as a file instead",
            ],
            AtelierError::RateLimited { .. } => vec![
                "Wait a moment before trying again",
                "Check the request quota of your API plan",
            ],
            AtelierError::ExternalService { .. } => vec![
                "Try the same edit again",
                "Use a clearer product photo with a plain background",
            ],
            AtelierError::EditInProgress => vec!["Wait for the current edit to finish"],
            AtelierError::NoActiveModel => vec!["Create or select a digital model first"],
            AtelierError::MissingApiKey => vec![
                "Set ATELIER_API_KEY (or GEMINI_API_KEY)",
                "Run with --offline to use the built-in mock stylist",
            ],
            _ => vec![],
        }
    }

    /// Get a user-friendly message for this error
    pub fn friendly_message(&self, context: &str) -> String {
        match self {
            AtelierError::RateLimited { .. } => {
                "You have reached the API request limit. Please wait a moment before trying again. \
                 If the problem persists, check the quota of your API plan."
                    .to_string()
            }
            AtelierError::UnsupportedMedia { mime_type } if mime_type != UNKNOWN_MIME_TYPE => {
                format!(
                    "The file type '{}' is not supported. Please use a format like PNG, JPEG or WEBP.",
                    mime_type
                )
            }
            AtelierError::UnsupportedMedia { .. } => {
                "Unsupported file format. Please upload an image format like PNG, JPEG or WEBP."
                    .to_string()
            }
            _ => format!("{}. Details: {}", context, self),
        }
    }
}

/// Pull the MIME type out of a service error such as
/// `{"error":{"message":"Unsupported MIME type: image/gif"}}`.
fn extract_unsupported_mime(raw: &str) -> Option<String> {
    let nested = serde_json::from_str::<serde_json::Value>(raw).ok()?;
    let message = nested.get("error")?.get("message")?.as_str()?;
    if !message.contains(UNSUPPORTED_MIME_SIGNAL) {
        return None;
    }
    message
        .split(": ")
        .nth(1)
        .map(str::trim)
        .filter(|mime| !mime.is_empty())
        .map(str::to_string)
}
