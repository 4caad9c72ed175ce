//! Hosted stylist backed by the Gemini REST API
//!
//! Images go through `models/{model}:generateContent` with an IMAGE response
//! modality. Animation uses the long-running `predictLongRunning` video
//! endpoint and polls the returned operation.
//!
//! HTTP is only compiled with the `gemini` feature. Without it every call
//! fails with an `ExternalService` error naming the feature.

use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::prompt::{base_model_prompt, dress_prompt};
use super::request::{BackgroundSpec, DressRequest};
use super::service::{Animator, JobStatus, JobTicket, Stylist};
use crate::config::StudioConfig;
use crate::error::{AtelierError, Result};
use crate::media::ImageData;

const VIDEO_ASPECT_RATIO: &str = "9:16";
const VIDEO_RESOLUTION: &str = "720p";

/// Stylist and animator talking to the hosted generation service.
#[derive(Debug, Clone)]
pub struct GeminiStylist {
    api_key: String,
    api_url: String,
    image_model: String,
    video_model: String,
    #[cfg_attr(not(feature = "gemini"), allow(dead_code))]
    timeout: Duration,
}

impl GeminiStylist {
    pub fn new(api_key: impl Into<String>) -> Self {
        let defaults = StudioConfig::default();
        let timeout = defaults.timeout();
        Self {
            api_key: api_key.into(),
            api_url: defaults.api_url,
            image_model: defaults.image_model,
            video_model: defaults.video_model,
            timeout,
        }
    }

    /// Build from configuration. Fails with `MissingApiKey` when no key is set.
    pub fn from_config(config: &StudioConfig) -> Result<Self> {
        Ok(Self {
            api_key: config.api_key()?.to_string(),
            api_url: config.api_url.clone(),
            image_model: config.image_model.clone(),
            video_model: config.video_model.clone(),
            timeout: config.timeout(),
        })
    }

    pub fn with_image_model(mut self, model: impl Into<String>) -> Self {
        self.image_model = model.into();
        self
    }

    pub fn image_model(&self) -> &str {
        &self.image_model
    }

    pub fn video_model(&self) -> &str {
        &self.video_model
    }

    fn generate_image(&self, operation: &str, parts: Vec<Part>) -> Result<ImageData> {
        let request = GenerateContentRequest {
            contents: vec![Content {
                role: "user".to_string(),
                parts,
            }],
            generation_config: GenerationConfig {
                response_modalities: vec!["IMAGE".to_string()],
            },
        };
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.api_url, self.image_model, self.api_key
        );
        debug!(model = %self.image_model, operation, "calling generateContent");

        let body = self.post_json(operation, &url, &request)?;
        let response: GenerateContentResponse = serde_json::from_str(&body).map_err(|e| {
            AtelierError::ExternalService {
                operation: operation.to_string(),
                reason: format!("invalid response: {}", e),
            }
        })?;
        extract_image(operation, response)
    }

    /// Fetch the bytes of a finished video. The service URL needs the key appended.
    pub fn download_video(&self, video_url: &str) -> Result<Vec<u8>> {
        let separator = if video_url.contains('?') { '&' } else { '?' };
        let url = format!("{}{}key={}", video_url, separator, self.api_key);
        self.get_bytes("Download video", &url)
    }

    #[cfg(feature = "gemini")]
    fn client(&self, operation: &str) -> Result<reqwest::blocking::Client> {
        reqwest::blocking::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| AtelierError::ExternalService {
                operation: operation.to_string(),
                reason: e.to_string(),
            })
    }

    #[cfg(feature = "gemini")]
    fn send(&self, operation: &str, request: reqwest::blocking::RequestBuilder) -> Result<reqwest::blocking::Response> {
        let response = request.send().map_err(|e| {
            let reason = if e.is_timeout() {
                format!("timed out after {} ms", self.timeout.as_millis())
            } else {
                e.to_string()
            };
            AtelierError::ExternalService {
                operation: operation.to_string(),
                reason,
            }
        })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response
                .text()
                .unwrap_or_else(|_| "failed to read error body".to_string());
            let err = map_http_error(operation, status, &body);
            tracing::warn!(operation, status, error = %err, "generation service returned an error");
            return Err(err);
        }
        Ok(response)
    }

    #[cfg(feature = "gemini")]
    fn post_json<T: Serialize>(&self, operation: &str, url: &str, body: &T) -> Result<String> {
        let client = self.client(operation)?;
        let response = self.send(operation, client.post(url).json(body))?;
        response.text().map_err(|e| AtelierError::ExternalService {
            operation: operation.to_string(),
            reason: e.to_string(),
        })
    }

    #[cfg(feature = "gemini")]
    fn get_text(&self, operation: &str, url: &str) -> Result<String> {
        let client = self.client(operation)?;
        let response = self.send(operation, client.get(url))?;
        response.text().map_err(|e| AtelierError::ExternalService {
            operation: operation.to_string(),
            reason: e.to_string(),
        })
    }

    #[cfg(feature = "gemini")]
    fn get_bytes(&self, operation: &str, url: &str) -> Result<Vec<u8>> {
        let client = self.client(operation)?;
        let response = self.send(operation, client.get(url))?;
        response
            .bytes()
            .map(|bytes| bytes.to_vec())
            .map_err(|e| AtelierError::ExternalService {
                operation: operation.to_string(),
                reason: e.to_string(),
            })
    }

    #[cfg(not(feature = "gemini"))]
    fn post_json<T: Serialize>(&self, operation: &str, _url: &str, _body: &T) -> Result<String> {
        Err(self.not_compiled(operation))
    }

    #[cfg(not(feature = "gemini"))]
    fn get_text(&self, operation: &str, _url: &str) -> Result<String> {
        Err(self.not_compiled(operation))
    }

    #[cfg(not(feature = "gemini"))]
    fn get_bytes(&self, operation: &str, _url: &str) -> Result<Vec<u8>> {
        Err(self.not_compiled(operation))
    }

    #[cfg(not(feature = "gemini"))]
    fn not_compiled(&self, operation: &str) -> AtelierError {
        AtelierError::ExternalService {
            operation: operation.to_string(),
            reason: "hosted generation support not compiled. Build with --features gemini".to_string(),
        }
    }
}

impl Stylist for GeminiStylist {
    fn name(&self) -> &str {
        "gemini"
    }

    fn generate_base_model(&self, photo: &ImageData) -> Result<ImageData> {
        let parts = vec![
            Part::inline(photo),
            Part::Text {
                text: base_model_prompt().to_string(),
            },
        ];
        self.generate_image("Generate base model", parts)
    }

    fn dress_model(&self, request: &DressRequest) -> Result<ImageData> {
        let mut parts = Vec::with_capacity(request.garments.len() + 3);
        parts.push(Part::inline(&request.base_model));
        parts.extend(request.garments.iter().map(Part::inline));
        if let Some(BackgroundSpec::Image(background)) = &request.background {
            parts.push(Part::inline(background));
        }
        parts.push(Part::Text {
            text: dress_prompt(request),
        });
        self.generate_image("Dress model", parts)
    }
}

impl Animator for GeminiStylist {
    fn submit(&self, image: &ImageData, motion_prompt: &str) -> Result<JobTicket> {
        let request = PredictRequest {
            instances: vec![VideoInstance {
                prompt: motion_prompt.to_string(),
                image: VideoImage {
                    bytes_base64_encoded: BASE64_STANDARD.encode(image.bytes()),
                    mime_type: image.mime_type().to_string(),
                },
            }],
            parameters: VideoParameters {
                aspect_ratio: VIDEO_ASPECT_RATIO.to_string(),
                resolution: VIDEO_RESOLUTION.to_string(),
                sample_count: 1,
            },
        };
        let url = format!(
            "{}/models/{}:predictLongRunning?key={}",
            self.api_url, self.video_model, self.api_key
        );

        let body = self.post_json("Animate look", &url, &request)?;
        let operation: VideoOperation = parse_operation(&body)?;
        if operation.name.is_empty() {
            return Err(AtelierError::ExternalService {
                operation: "Animate look".to_string(),
                reason: "service returned no operation name".to_string(),
            });
        }
        Ok(JobTicket(operation.name))
    }

    fn poll(&self, ticket: &JobTicket) -> Result<JobStatus> {
        let url = format!("{}/{}?key={}", self.api_url, ticket.as_str(), self.api_key);
        let body = self.get_text("Animate look", &url)?;
        operation_status(parse_operation(&body)?)
    }
}

fn parse_operation(body: &str) -> Result<VideoOperation> {
    serde_json::from_str(body).map_err(|e| AtelierError::ExternalService {
        operation: "Animate look".to_string(),
        reason: format!("invalid operation response: {}", e),
    })
}

fn operation_status(operation: VideoOperation) -> Result<JobStatus> {
    if let Some(error) = operation.error {
        return Err(AtelierError::from_service_failure(
            "Animate look",
            error.message.unwrap_or_else(|| "video generation failed".to_string()),
        ));
    }
    if !operation.done {
        return Ok(JobStatus::Pending);
    }

    operation
        .response
        .and_then(|response| response.generate_video_response)
        .and_then(|response| response.generated_samples.into_iter().next())
        .and_then(|sample| sample.video)
        .and_then(|video| video.uri)
        .map(|video_url| JobStatus::Done { video_url })
        .ok_or_else(|| AtelierError::ExternalService {
            operation: "Animate look".to_string(),
            reason: "Video download link not found in response.".to_string(),
        })
}

/// Pull the first inline image out of a generateContent response.
fn extract_image(operation: &str, response: GenerateContentResponse) -> Result<ImageData> {
    let failure = |reason: String| AtelierError::ExternalService {
        operation: operation.to_string(),
        reason,
    };

    if let Some(reason) = response.prompt_feedback.and_then(|f| f.block_reason) {
        return Err(failure(format!("request was blocked: {}", reason)));
    }

    let candidate = response
        .candidates
        .and_then(|candidates| candidates.into_iter().next())
        .ok_or_else(|| failure("no candidates in response".to_string()))?;

    let parts = candidate.content.map(|content| content.parts).unwrap_or_default();
    if let Some(inline) = parts.iter().find_map(|part| part.inline_data.as_ref()) {
        let bytes = BASE64_STANDARD
            .decode(inline.data.as_bytes())
            .map_err(|e| failure(format!("invalid image data: {}", e)))?;
        return ImageData::new(inline.mime_type.clone(), bytes);
    }

    if let Some(reason) = candidate.finish_reason.filter(|reason| reason != "STOP") {
        return Err(failure(format!("generation stopped: {}", reason)));
    }

    let text = parts.into_iter().find_map(|part| part.text);
    Err(failure(match text {
        Some(text) => format!("the model returned text instead of an image: {}", text),
        None => "the response contained no image".to_string(),
    }))
}

/// Turn an HTTP error body into a classified error.
fn map_http_error(operation: &str, status: u16, body: &str) -> AtelierError {
    // The MIME type is read from the nested JSON, so hand over the body untouched.
    if body.contains("Unsupported MIME type") {
        return AtelierError::from_service_failure(operation, body);
    }

    let message = serde_json::from_str::<ErrorWrapper>(body)
        .map(|wrapper| {
            let status_text = wrapper.error.status.unwrap_or_default();
            let message = wrapper.error.message.unwrap_or_else(|| body.to_string());
            if status_text.is_empty() {
                message
            } else {
                format!("{}: {}", status_text, message)
            }
        })
        .unwrap_or_else(|_| body.to_string());

    AtelierError::from_service_failure(operation, format!("HTTP {}: {}", status, message))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content {
    role: String,
    parts: Vec<Part>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_modalities: Vec<String>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum Part {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineDataPayload,
    },
}

impl Part {
    fn inline(image: &ImageData) -> Self {
        Part::InlineData {
            inline_data: InlineDataPayload {
                mime_type: image.mime_type().to_string(),
                data: image.base64(),
            },
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineDataPayload {
    mime_type: String,
    data: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    candidates: Option<Vec<Candidate>>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<ContentResponse>,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct ContentResponse {
    #[serde(default)]
    parts: Vec<PartResponse>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PartResponse {
    text: Option<String>,
    inline_data: Option<InlineDataPayload>,
}

#[derive(Serialize)]
struct PredictRequest {
    instances: Vec<VideoInstance>,
    parameters: VideoParameters,
}

#[derive(Serialize)]
struct VideoInstance {
    prompt: String,
    image: VideoImage,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct VideoImage {
    bytes_base64_encoded: String,
    mime_type: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct VideoParameters {
    aspect_ratio: String,
    resolution: String,
    sample_count: u32,
}

#[derive(Deserialize)]
struct VideoOperation {
    #[serde(default)]
    name: String,
    #[serde(default)]
    done: bool,
    response: Option<VideoOperationResponse>,
    error: Option<ErrorBody>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideoOperationResponse {
    generate_video_response: Option<GenerateVideoResponse>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateVideoResponse {
    #[serde(default)]
    generated_samples: Vec<GeneratedSample>,
}

#[derive(Deserialize)]
struct GeneratedSample {
    video: Option<VideoFile>,
}

#[derive(Deserialize)]
struct VideoFile {
    uri: Option<String>,
}

#[derive(Deserialize)]
struct ErrorWrapper {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
    status: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(json: &str) -> GenerateContentResponse {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_new_uses_default_models() {
        let stylist = GeminiStylist::new("key");
        let defaults = StudioConfig::default();
        assert_eq!(stylist.image_model(), crate::config::DEFAULT_IMAGE_MODEL);
        assert_eq!(stylist.video_model(), crate::config::DEFAULT_VIDEO_MODEL);
        assert_eq!(stylist.timeout, defaults.timeout());
    }

    #[cfg(not(feature = "gemini"))]
    #[test]
    fn test_calls_need_http_feature() {
        let err = GeminiStylist::new("key")
            .download_video("https://video.example/clip.mp4")
            .unwrap_err();
        assert_eq!(err.error_code(), "EXTERNAL_SERVICE");
        assert!(err.to_string().contains("--features gemini"));
    }

    #[test]
    fn test_extract_inline_image() {
        let data = BASE64_STANDARD.encode([1u8, 2, 3]);
        let json = format!(
            r#"{{"candidates":[{{"content":{{"parts":[{{"inlineData":{{"mimeType":"image/png","data":"{}"}}}}]}},"finishReason":"STOP"}}]}}"#,
            data
        );
        let image = extract_image("Dress model", response(&json)).unwrap();
        assert_eq!(image.mime_type(), "image/png");
        assert_eq!(image.bytes(), &[1, 2, 3]);
    }

    #[test]
    fn test_blocked_prompt() {
        let err = extract_image(
            "Dress model",
            response(r#"{"promptFeedback":{"blockReason":"SAFETY"}}"#),
        )
        .unwrap_err();
        assert!(err.to_string().contains("blocked: SAFETY"));
    }

    #[test]
    fn test_text_only_response() {
        let err = extract_image(
            "Dress model",
            response(r#"{"candidates":[{"content":{"parts":[{"text":"I cannot"}]},"finishReason":"STOP"}]}"#),
        )
        .unwrap_err();
        assert!(err.to_string().contains("text instead of an image"));
    }

    #[test]
    fn test_http_quota_error_is_rate_limit() {
        let body = r#"{"error":{"code":429,"message":"You exceeded your current quota","status":"RESOURCE_EXHAUSTED"}}"#;
        assert!(map_http_error("Dress model", 429, body).is_rate_limit());
    }

    #[test]
    fn test_http_unsupported_mime() {
        let body = r#"{"error":{"code":400,"message":"Unsupported MIME type: image/gif","status":"INVALID_ARGUMENT"}}"#;
        match map_http_error("Dress model", 400, body) {
            AtelierError::UnsupportedMedia { mime_type } => assert_eq!(mime_type, "image/gif"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_operation_status() {
        let pending: VideoOperation = serde_json::from_str(r#"{"name":"operations/1","done":false}"#).unwrap();
        assert_eq!(operation_status(pending).unwrap(), JobStatus::Pending);

        let done: VideoOperation = serde_json::from_str(
            r#"{"name":"operations/1","done":true,"response":{"generateVideoResponse":{"generatedSamples":[{"video":{"uri":"https://v/1?alt=media"}}]}}}"#,
        )
        .unwrap();
        assert_eq!(
            operation_status(done).unwrap(),
            JobStatus::Done {
                video_url: "https://v/1?alt=media".to_string()
            }
        );

        let missing: VideoOperation = serde_json::from_str(r#"{"name":"operations/1","done":true}"#).unwrap();
        assert!(operation_status(missing).is_err());
    }

    #[test]
    fn test_from_config_requires_key() {
        assert!(GeminiStylist::from_config(&StudioConfig::default()).is_err());
        let stylist = GeminiStylist::from_config(&StudioConfig::default().with_api_key("k")).unwrap();
        assert_eq!(stylist.image_model(), "gemini-2.5-flash-image");
    }
}
