//! Dress-model request

use crate::media::ImageData;

/// Background for a dress call. An image and a text prompt are mutually
/// exclusive, so only one can ever be sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackgroundSpec {
    Image(ImageData),
    Prompt(String),
}

/// Everything the stateless dress operation needs.
///
/// `garments` is always the complete accumulated set, never a delta.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DressRequest {
    /// Base model image (layer 0 default)
    pub base_model: ImageData,

    /// Every garment to wear, in the order it was added
    pub garments: Vec<ImageData>,

    /// Pose instruction
    pub pose: String,

    pub background: Option<BackgroundSpec>,

    /// Free-text edit applied after dressing
    pub refinement: Option<String>,
}

impl DressRequest {
    pub fn new(base_model: ImageData, garments: Vec<ImageData>, pose: impl Into<String>) -> Self {
        Self {
            base_model,
            garments,
            pose: pose.into(),
            background: None,
            refinement: None,
        }
    }

    pub fn with_background(mut self, background: BackgroundSpec) -> Self {
        self.background = Some(background);
        self
    }

    pub fn with_refinement(mut self, refinement: impl Into<String>) -> Self {
        self.refinement = Some(refinement.into());
        self
    }
}
