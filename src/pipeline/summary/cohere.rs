use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use super::prompt::SYSTEM_PREAMBLE;
use super::types::SummaryProvider;
use super::SummaryError;
use crate::config::{ProviderSettings, ENV_AI_API_KEY, SUPPORTED_LLM_PROVIDER};

const TEMPERATURE: f64 = 0.1;

/// Cohere chat client.
///
/// Credentials are checked on every `send` so a misconfigured deployment
/// still rejects short input before complaining about keys.
pub struct CohereClient {
    base_url: String,
    api_key: Option<String>,
    provider: Option<String>,
    model: String,
    max_tokens: u32,
    client: reqwest::blocking::Client,
    timeout_secs: u64,
}

impl CohereClient {
    pub fn new(
        base_url: &str,
        api_key: Option<String>,
        provider: Option<String>,
        model: &str,
        max_tokens: u32,
        timeout_secs: u64,
    ) -> Result<Self, SummaryError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| SummaryError::HttpClient(e.to_string()))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            provider,
            model: model.to_string(),
            max_tokens,
            client,
            timeout_secs,
        })
    }

    pub fn from_settings(settings: &ProviderSettings) -> Result<Self, SummaryError> {
        Self::new(
            &settings.llm_base_url,
            settings.ai_api_key.clone(),
            settings.llm_provider.clone(),
            &settings.llm_model,
            settings.llm_max_tokens,
            settings.request_timeout_secs,
        )
    }

    fn credentials(&self) -> Result<&str, SummaryError> {
        let key = self.api_key.as_deref().ok_or_else(|| {
            SummaryError::Configuration(format!("{ENV_AI_API_KEY} environment variable not set"))
        })?;
        if self.provider.as_deref() != Some(SUPPORTED_LLM_PROVIDER) {
            return Err(SummaryError::Configuration(
                "Only Cohere provider is currently supported".into(),
            ));
        }
        Ok(key)
    }
}

/// Request body for POST /v1/chat
#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f64,
    max_tokens: u32,
    message: &'a str,
    preamble: &'a str,
    chat_history: &'a [String],
    prompt_truncation: &'a str,
}

/// Response body from POST /v1/chat
#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    text: Option<String>,
}

impl SummaryProvider for CohereClient {
    fn model_id(&self) -> &str {
        &self.model
    }

    fn send(&self, prompt: &str) -> Result<String, SummaryError> {
        let api_key = self.credentials()?;

        let _span = tracing::info_span!("llm_chat", model = %self.model).entered();
        let start = Instant::now();

        let url = format!("{}/v1/chat", self.base_url);
        let body = ChatRequest {
            model: &self.model,
            temperature: TEMPERATURE,
            max_tokens: self.max_tokens,
            message: prompt,
            preamble: SYSTEM_PREAMBLE,
            chat_history: &[],
            prompt_truncation: "AUTO",
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .map_err(|e| {
                if e.is_timeout() {
                    SummaryError::HttpClient(format!(
                        "Request timed out after {}s",
                        self.timeout_secs
                    ))
                } else if e.is_connect() {
                    SummaryError::HttpClient(format!(
                        "Could not connect to summary provider at {}",
                        self.base_url
                    ))
                } else {
                    SummaryError::HttpClient(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(SummaryError::Provider {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatResponse = response
            .json()
            .map_err(|e| SummaryError::MalformedResponse(e.to_string()))?;

        let text = parsed
            .text
            .filter(|t| !t.is_empty())
            .ok_or_else(|| SummaryError::MalformedResponse("response has no `text`".into()))?;

        tracing::info!(
            prompt_chars = prompt.chars().count(),
            response_chars = text.chars().count(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Summary provider replied"
        );
        Ok(text)
    }
}

/// Mock summary provider for testing. Replays configured replies in order
/// and records every prompt it was sent.
pub struct MockSummaryProvider {
    model: String,
    replies: Mutex<VecDeque<String>>,
    /// Reply used once the queue is exhausted.
    default_reply: String,
    failure: Option<MockFailure>,
    prompts: Mutex<Vec<String>>,
}

struct MockFailure {
    /// Zero-based index of the first call that fails.
    from_call: usize,
    status: u16,
    body: String,
}

impl MockSummaryProvider {
    pub fn new(reply: &str) -> Self {
        Self {
            model: "mock-model".to_string(),
            replies: Mutex::new(VecDeque::new()),
            default_reply: reply.to_string(),
            failure: None,
            prompts: Mutex::new(vec![]),
        }
    }

    /// Replies returned one per call, in order.
    pub fn with_replies(replies: &[&str]) -> Self {
        let mut mock = Self::new(replies.last().copied().unwrap_or_default());
        mock.replies = Mutex::new(replies.iter().map(|r| r.to_string()).collect());
        mock
    }

    /// Every call fails with a provider error.
    pub fn failing(status: u16, body: &str) -> Self {
        Self::new("").fail_from_call(0, status, body)
    }

    /// Calls before `from_call` succeed; that call and all later ones fail.
    pub fn fail_from_call(mut self, from_call: usize, status: u16, body: &str) -> Self {
        self.failure = Some(MockFailure {
            from_call,
            status,
            body: body.to_string(),
        });
        self
    }

    pub fn with_model(mut self, model: &str) -> Self {
        self.model = model.to_string();
        self
    }

    pub fn call_count(&self) -> usize {
        self.prompts().len()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl SummaryProvider for MockSummaryProvider {
    fn model_id(&self) -> &str {
        &self.model
    }

    fn send(&self, prompt: &str) -> Result<String, SummaryError> {
        let call = {
            let mut prompts = self
                .prompts
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            prompts.push(prompt.to_string());
            prompts.len() - 1
        };

        if let Some(failure) = self.failure.as_ref().filter(|f| call >= f.from_call) {
            return Err(SummaryError::Provider {
                status: failure.status,
                body: failure.body.clone(),
            });
        }

        let next = self
            .replies
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .pop_front();
        Ok(next.unwrap_or_else(|| self.default_reply.clone()))
    }
}
