//! Gemini API client for text and image generation.

use std::time::Duration;

use async_trait::async_trait;
use ik_core::{AppError, AspectRatio, GenerativeModel, ImagePayload, Result};
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

const GEMINI_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_TEXT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_IMAGE_MODEL: &str = "imagen-4.0-generate-001";

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<Part<'a>>,
}

/// Request body for `models/{model}:generateContent`
#[derive(Debug, Serialize)]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<ResponseContent>,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

impl GenerateContentResponse {
    /// Concatenated text of the first candidate
    fn text(&self) -> Option<String> {
        let parts = &self.candidates.first()?.content.as_ref()?.parts;
        let text: String = parts.iter().filter_map(|p| p.text.as_deref()).collect();
        (!text.trim().is_empty()).then_some(text)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ImageParameters {
    sample_count: u32,
    aspect_ratio: &'static str,
}

#[derive(Debug, Serialize)]
struct ImageInstance<'a> {
    prompt: &'a str,
}

/// Request body for `models/{model}:predict`
#[derive(Debug, Serialize)]
struct PredictRequest<'a> {
    instances: Vec<ImageInstance<'a>>,
    parameters: ImageParameters,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Prediction {
    bytes_base64_encoded: Option<String>,
    mime_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PredictResponse {
    #[serde(default)]
    predictions: Vec<Prediction>,
}

/// Gemini API client
#[derive(Debug, Clone)]
pub struct GeminiClient {
    http: Client,
    api_key: SecretString,
    base_url: String,
    text_model: String,
    image_model: String,
}

impl GeminiClient {
    const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

    pub fn new(
        api_key: SecretString,
        text_model: Option<String>,
        image_model: Option<String>,
    ) -> Result<Self> {
        let http = Client::builder()
            .timeout(Self::REQUEST_TIMEOUT)
            .user_agent(concat!("infoking/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AppError::Network(e.to_string()))?;

        Ok(Self {
            http,
            api_key,
            base_url: GEMINI_API_URL.to_string(),
            text_model: text_model.unwrap_or_else(|| DEFAULT_TEXT_MODEL.to_string()),
            image_model: image_model.unwrap_or_else(|| DEFAULT_IMAGE_MODEL.to_string()),
        })
    }

    /// Points the client at another endpoint (proxies, tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn post<B: Serialize, R: for<'de> Deserialize<'de>>(&self, url: &str, body: &B) -> Result<R> {
        let res = self
            .http
            .post(url)
            .header("x-goog-api-key", self.api_key.expose_secret())
            .json(body)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        match res.status() {
            s if s.is_success() => res
                .json::<R>()
                .await
                .map_err(|e| AppError::Parse(format!("unexpected response shape: {e}"))),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                Err(AppError::Generation("the API key was rejected".to_string()))
            }
            StatusCode::TOO_MANY_REQUESTS => {
                Err(AppError::Generation("quota exceeded, try again later".to_string()))
            }
            s => {
                let body = res.text().await.unwrap_or_default();
                error!(status = s.as_u16(), body = %body, "Gemini request failed");
                Err(AppError::Generation(format!("http {}", s.as_u16())))
            }
        }
    }
}

#[async_trait]
impl GenerativeModel for GeminiClient {
    async fn generate_text(&self, prompt: &str) -> Result<String> {
        let url = format!("{}/models/{}:generateContent", self.base_url, self.text_model);
        let request = GenerateContentRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![Part { text: prompt }],
            }],
        };
        let response: GenerateContentResponse = self.post(&url, &request).await?;
        let text = response
            .text()
            .ok_or_else(|| AppError::Generation("empty response from model".to_string()))?;
        debug!(model = %self.text_model, chars = text.len(), "Text generated");
        Ok(text)
    }

    async fn generate_image(&self, prompt: &str, aspect_ratio: AspectRatio) -> Result<ImagePayload> {
        let url = format!("{}/models/{}:predict", self.base_url, self.image_model);
        let request = PredictRequest {
            instances: vec![ImageInstance { prompt }],
            parameters: ImageParameters {
                sample_count: 1,
                aspect_ratio: aspect_ratio.as_str(),
            },
        };
        let response: PredictResponse = self.post(&url, &request).await?;
        let prediction = response
            .predictions
            .into_iter()
            .next()
            .ok_or_else(|| AppError::Generation("no image returned".to_string()))?;
        let data_base64 = prediction
            .bytes_base64_encoded
            .filter(|b| !b.is_empty())
            .ok_or_else(|| AppError::Generation("image payload was empty".to_string()))?;
        Ok(ImagePayload {
            mime_type: prediction.mime_type.unwrap_or_else(|| "image/png".to_string()),
            data_base64,
        })
    }
}

/// Stand-in used when no API key is configured. Every call fails with
/// `NotConfigured` so the UI can say so instead of the app refusing to start.
#[derive(Debug, Clone, Default)]
pub struct UnconfiguredModel;

#[async_trait]
impl GenerativeModel for UnconfiguredModel {
    async fn generate_text(&self, _prompt: &str) -> Result<String> {
        Err(AppError::NotConfigured("no Gemini API key set (INFOKING__GEMINI_API_KEY)".to_string()))
    }

    async fn generate_image(&self, _prompt: &str, _aspect_ratio: AspectRatio) -> Result<ImagePayload> {
        Err(AppError::NotConfigured("no Gemini API key set (INFOKING__GEMINI_API_KEY)".to_string()))
    }
}

fn map_reqwest_error(e: reqwest::Error) -> AppError {
    if e.is_timeout() {
        AppError::Network("request timed out".to_string())
    } else {
        AppError::Network(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_text_joins_parts() {
        let response: GenerateContentResponse = serde_json::from_value(serde_json::json!({
            "candidates": [{ "content": { "parts": [{ "text": "[{" }, { "text": "}]" }] } }]
        }))
        .unwrap();
        assert_eq!(response.text().as_deref(), Some("[{}]"));
    }

    #[test]
    fn test_blank_response_has_no_text() {
        let response: GenerateContentResponse =
            serde_json::from_value(serde_json::json!({ "candidates": [] })).unwrap();
        assert!(response.text().is_none());
    }

    #[test]
    fn test_predict_request_shape() {
        let request = PredictRequest {
            instances: vec![ImageInstance { prompt: "a phone screen" }],
            parameters: ImageParameters {
                sample_count: 1,
                aspect_ratio: AspectRatio::Portrait.as_str(),
            },
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["parameters"]["aspectRatio"], "9:16");
        assert_eq!(value["parameters"]["sampleCount"], 1);
    }

    #[tokio::test]
    async fn test_unconfigured_model_reports_missing_key() {
        let err = UnconfiguredModel.generate_text("hi").await.unwrap_err();
        assert!(matches!(err, AppError::NotConfigured(_)));
    }
}
