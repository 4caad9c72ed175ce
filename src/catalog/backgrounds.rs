//! Stock background options

use serde::{Deserialize, Serialize};

use crate::media::ImageRef;

const THUMB_BASE: &str = "https://storage.googleapis.com/gemini-95-icons/background-thumbs";
const IMAGE_BASE: &str = "https://storage.googleapis.com/gemini-95-icons/backgrounds";

/// How a background is described to the stylist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackgroundSource {
    /// Text description of the scene
    Prompt(String),
    /// Reference photo of the scene
    Image(ImageRef),
}

/// A selectable background.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackgroundOption {
    pub id: String,
    pub name: String,
    pub thumbnail_url: ImageRef,
    pub source: BackgroundSource,
}

impl BackgroundOption {
    fn prompt(id: &str, name: &str, thumb: &str, prompt: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            thumbnail_url: ImageRef::new(format!("{}/{}", THUMB_BASE, thumb)),
            source: BackgroundSource::Prompt(prompt.to_string()),
        }
    }

    fn image(id: &str, name: &str, thumb: &str, image: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            thumbnail_url: ImageRef::new(format!("{}/{}", THUMB_BASE, thumb)),
            source: BackgroundSource::Image(ImageRef::new(format!("{}/{}", IMAGE_BASE, image))),
        }
    }
}

/// The stock backgrounds offered by the background picker.
pub fn default_backgrounds() -> Vec<BackgroundOption> {
    vec![
        BackgroundOption::prompt(
            "studio-dramatic",
            "Dramatic Studio",
            "studio-dramatic.png",
            "studio backdrop with dramatic lighting, dark gray background",
        ),
        BackgroundOption::prompt(
            "sunny-day-park",
            "Sunny Park",
            "sunny-day-park.png",
            "outdoors in a city park on a bright sunny day with green trees",
        ),
        BackgroundOption::prompt(
            "rooftop-sunset",
            "Rooftop Sunset",
            "rooftop-sunset.png",
            "on a building rooftop overlooking the city at sunset, orange and pink sky",
        ),
        BackgroundOption::image(
            "studio-backdrop-1",
            "Studio Backdrop 1",
            "studio-1.png",
            "studio-backdrop-1.jpg",
        ),
        BackgroundOption::image("beach-background", "Beach", "beach.png", "beach-1.jpg"),
        BackgroundOption::image("city-street", "City Street", "city.png", "city-street-1.jpg"),
    ]
}

/// Look up a background by id.
pub fn find_background<'a>(options: &'a [BackgroundOption], id: &str) -> Option<&'a BackgroundOption> {
    options.iter().find(|option| option.id == id)
}
