use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use super::{ExtractionError, OcrProvider};
use crate::config::{ProviderSettings, ENV_OCR_API_KEY};

/// OCR.space HTTP client.
pub struct OcrSpaceClient {
    endpoint: String,
    api_key: Option<String>,
    client: reqwest::blocking::Client,
    timeout_secs: u64,
}

impl OcrSpaceClient {
    /// A missing key is reported on the first `extract` call, not here.
    pub fn new(
        endpoint: &str,
        api_key: Option<String>,
        timeout_secs: u64,
    ) -> Result<Self, ExtractionError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| ExtractionError::HttpClient(e.to_string()))?;

        Ok(Self {
            endpoint: endpoint.to_string(),
            api_key,
            client,
            timeout_secs,
        })
    }

    pub fn from_settings(settings: &ProviderSettings) -> Result<Self, ExtractionError> {
        Self::new(
            &settings.ocr_endpoint,
            settings.ocr_api_key.clone(),
            settings.request_timeout_secs,
        )
    }
}

/// Request body for POST /parse/image
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ParseImageRequest<'a> {
    url: &'a str,
    language: &'a str,
    is_overlay_required: bool,
    filetype: &'a str,
}

/// Response body from POST /parse/image
#[derive(Deserialize, Default)]
#[serde(rename_all = "PascalCase", default)]
struct ParseImageResponse {
    parsed_results: Option<Vec<ParsedResult>>,
    is_errored_on_processing: bool,
    /// A string or an array of strings depending on the failure.
    error_message: Option<serde_json::Value>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "PascalCase", default)]
struct ParsedResult {
    parsed_text: Option<String>,
}

fn render_error_message(value: Option<&serde_json::Value>) -> String {
    let rendered = match value {
        Some(serde_json::Value::String(s)) => s.trim().to_string(),
        Some(serde_json::Value::Array(items)) => items
            .iter()
            .filter_map(|item| item.as_str())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join("; "),
        _ => String::new(),
    };
    if rendered.is_empty() {
        "Unknown error".to_string()
    } else {
        rendered
    }
}

impl OcrProvider for OcrSpaceClient {
    fn extract(&self, image_url: &str) -> Result<String, ExtractionError> {
        let api_key = self.api_key.as_deref().ok_or_else(|| {
            ExtractionError::Configuration(format!("{ENV_OCR_API_KEY} environment variable not set"))
        })?;

        let _span = tracing::info_span!("ocr_extract").entered();
        let start = Instant::now();

        let body = ParseImageRequest {
            url: image_url,
            language: "eng",
            is_overlay_required: false,
            filetype: "auto",
        };

        let response = self
            .client
            .post(&self.endpoint)
            .header("apikey", api_key)
            .json(&body)
            .send()
            .map_err(|e| {
                if e.is_timeout() {
                    ExtractionError::HttpClient(format!(
                        "Request timed out after {}s",
                        self.timeout_secs
                    ))
                } else if e.is_connect() {
                    ExtractionError::HttpClient(format!(
                        "Could not connect to OCR provider at {}",
                        self.endpoint
                    ))
                } else {
                    ExtractionError::HttpClient(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().unwrap_or_default();
            return Err(ExtractionError::Provider {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: ParseImageResponse = response
            .json()
            .map_err(|e| ExtractionError::MalformedResponse(e.to_string()))?;

        if parsed.is_errored_on_processing {
            let message = render_error_message(parsed.error_message.as_ref());
            tracing::warn!(status = status.as_u16(), "OCR provider reported a processing error");
            return Err(ExtractionError::Provider {
                status: status.as_u16(),
                message,
            });
        }

        let first = parsed
            .parsed_results
            .unwrap_or_default()
            .into_iter()
            .next()
            .ok_or_else(|| ExtractionError::EmptyResult("No text found in image".into()))?;

        let text = first.parsed_text.unwrap_or_default().trim().to_string();
        if text.is_empty() {
            return Err(ExtractionError::EmptyResult(
                "No readable text found in image".into(),
            ));
        }

        tracing::info!(
            chars = text.chars().count(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "OCR extraction complete"
        );
        Ok(text)
    }
}

/// Mock OCR provider for testing. Returns configured text and counts calls.
pub struct MockOcrProvider {
    text: Option<String>,
    calls: AtomicUsize,
}

impl MockOcrProvider {
    pub fn new(text: &str) -> Self {
        Self {
            text: Some(text.to_string()),
            calls: AtomicUsize::new(0),
        }
    }

    /// A provider that finds nothing in any image.
    pub fn empty() -> Self {
        Self {
            text: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl OcrProvider for MockOcrProvider {
    fn extract(&self, _image_url: &str) -> Result<String, ExtractionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.text {
            Some(text) => Ok(text.trim().to_string()),
            None => Err(ExtractionError::EmptyResult("No text found in image".into())),
        }
    }
}
