//! Prompt composition for the hosted image model

use super::request::{BackgroundSpec, DressRequest};

const BASE_MODEL_PROMPT: &str = "Create a photorealistic full-body image of a fashion model based on the person in this photo. \
The model must have a neutral expression and pose, standing and facing forward. \
**It is crucial to keep the person's original clothing 100% intact, without changes.** \
Only remove the original background and replace it with a plain, neutral gray studio background. \
The goal is a clean, reusable base model for a virtual fitting room that keeps the EXACT appearance \
of the person (face, body, hair) with NO changes, including their original clothes. \
Make sure the output is a sharp image of the model in their original clothes on a gray background.";

const DRESS_PROMPT_HEADER: &[&str] = &[
    "**MAIN TASK: DRESS THE MODEL WITH ABSOLUTE FIDELITY**",
    "Your only task is to take the base model and dress her in the new garments provided. NOTHING ELSE.",
    "",
    "**INVIOLABLE DIRECTIVE: THE ORIGINAL MODEL IS SACRED**",
    "The model in the base image MUST NOT be altered. Face, body, hair, skin tone and every physical trait must remain 100% IDENTICAL. The final image must be THE SAME PERSON, only wearing different clothes.",
    "",
    "**CRITICAL DIRECTIVE: TOTAL FIDELITY TO THE GARMENTS**",
    "The garments provided must be reproduced on the model with 100% accuracy. DO NOT CHANGE the appearance of the clothes in any way.",
    "This includes, but is not limited to:",
    "- **COLORS:** Keep the exact colors. Do not change hue, saturation or brightness.",
    "- **PATTERNS AND PRINTS:** Reproduce every line, shape and pattern exactly as in the original image.",
    "- **DETAILS:** Preserve every detail: buttons, zippers, bows, belts, seams, logos, etc.",
    "- **TEXTURE AND DRAPE:** The material and the way the garment folds must match the original item, fitted realistically to the model's body.",
    "The garment in the final image must be instantly recognizable as the exact item provided. DO NOT INVENT or modify ANY aspect of the clothing.",
    "",
    "**ABSOLUTE PROHIBITIONS (any violation is a failure):**",
    "1. **DO NOT ADD TATTOOS:** Adding tattoos or any skin marking that was not in the original photo is strictly forbidden.",
    "2. **DO NOT ADD ACCESSORIES:** Do not add ANY extra item that was not sent as a product image. This includes, but is not limited to: jewelry (necklaces, earrings, bracelets, rings), bags, hats, glasses, belts, etc.",
    "3. **DO NOT CHANGE THE FACE:** Do not change the model's face, makeup or expression.",
    "4. **DO NOT CHANGE THE BODY:** Do not change the model's body type or proportions.",
    "",
    "**Step-by-step process:**",
    "1. **Analyze the base model:** Identify the model and her immutable traits.",
    "2. **Remove the original clothing:** Digitally remove ALL clothing the model is wearing.",
    "3. **Apply the new clothing:** Dress the model in the new garments, strictly following the fidelity directives, with a realistic fit.",
    "",
    "**Scene instructions:**",
];

/// Prompt that turns a user photo into a clean base model.
pub fn base_model_prompt() -> &'static str {
    BASE_MODEL_PROMPT
}

/// Full dress prompt for a request. Image parts are sent separately, in the
/// order base model, garments, then background image.
pub fn dress_prompt(request: &DressRequest) -> String {
    let mut lines: Vec<String> = DRESS_PROMPT_HEADER.iter().map(|line| line.to_string()).collect();

    if !request.pose.trim().is_empty() {
        lines.push(format!("- **Pose:** The model must be in the following pose: {}.", request.pose));
    }

    match &request.background {
        Some(BackgroundSpec::Image(_)) => {
            lines.push("- **Background:** Use the background image provided.".to_string());
        }
        Some(BackgroundSpec::Prompt(prompt)) => {
            lines.push(format!("- **Background:** The background must be: {}.", prompt));
        }
        None => {}
    }

    if let Some(refinement) = &request.refinement {
        lines.push(format!(
            "- **Refinement:** After dressing the model, apply this edit: \"{}\".",
            refinement
        ));
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::ImageData;

    fn request() -> DressRequest {
        let base = ImageData::new("image/png", vec![0]).unwrap();
        DressRequest::new(base, vec![], "walking")
    }

    #[test]
    fn test_pose_line() {
        let prompt = dress_prompt(&request());
        assert!(prompt.contains("following pose: walking."));
        assert!(!prompt.contains("**Background:**"));
        assert!(!prompt.contains("**Refinement:**"));
    }

    #[test]
    fn test_background_prompt_line() {
        let prompt = dress_prompt(&request().with_background(BackgroundSpec::Prompt("a beach".into())));
        assert!(prompt.contains("The background must be: a beach."));
    }

    #[test]
    fn test_background_image_line() {
        let image = ImageData::new("image/jpeg", vec![1]).unwrap();
        let prompt = dress_prompt(&request().with_background(BackgroundSpec::Image(image)));
        assert!(prompt.contains("Use the background image provided."));
    }

    #[test]
    fn test_refinement_line() {
        let prompt = dress_prompt(&request().with_refinement("make the jacket open"));
        assert!(prompt.contains("apply this edit: \"make the jacket open\"."));
    }
}
