/// Application-level constants
pub const APP_NAME: &str = "Medlink";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

// Environment variable names
pub const ENV_AI_API_KEY: &str = "AI_API_KEY";
pub const ENV_LLM_PROVIDER: &str = "LLM_PROVIDER";
pub const ENV_OCR_API_KEY: &str = "OCR_API_KEY";
pub const ENV_LLM_BASE_URL: &str = "LLM_BASE_URL";
pub const ENV_LLM_MODEL: &str = "LLM_MODEL";
pub const ENV_LLM_MAX_TOKENS: &str = "LLM_MAX_TOKENS";
pub const ENV_OCR_ENDPOINT: &str = "OCR_ENDPOINT";
pub const ENV_PROVIDER_TIMEOUT_SECS: &str = "PROVIDER_TIMEOUT_SECS";

/// The one summary provider implemented today.
pub const SUPPORTED_LLM_PROVIDER: &str = "cohere";

pub const DEFAULT_LLM_BASE_URL: &str = "https://api.cohere.ai";
pub const DEFAULT_LLM_MODEL: &str = "command-r";
pub const DEFAULT_LLM_MAX_TOKENS: u32 = 1000;
pub const DEFAULT_OCR_ENDPOINT: &str = "https://api.ocr.space/parse/image";
pub const DEFAULT_PROVIDER_TIMEOUT_SECS: u64 = 120;

/// Log filter used when `RUST_LOG` is unset.
pub fn default_log_filter() -> &'static str {
    "medlink_lib=info,warn"
}

/// Credentials and endpoints for the external summary and OCR providers.
///
/// Missing keys are not an error here: each client reports a configuration
/// error when it is actually asked to call out.
#[derive(Clone)]
pub struct ProviderSettings {
    pub ai_api_key: Option<String>,
    pub llm_provider: Option<String>,
    pub ocr_api_key: Option<String>,
    pub llm_base_url: String,
    pub llm_model: String,
    pub llm_max_tokens: u32,
    pub ocr_endpoint: String,
    pub request_timeout_secs: u64,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            ai_api_key: None,
            llm_provider: None,
            ocr_api_key: None,
            llm_base_url: DEFAULT_LLM_BASE_URL.to_string(),
            llm_model: DEFAULT_LLM_MODEL.to_string(),
            llm_max_tokens: DEFAULT_LLM_MAX_TOKENS,
            ocr_endpoint: DEFAULT_OCR_ENDPOINT.to_string(),
            request_timeout_secs: DEFAULT_PROVIDER_TIMEOUT_SECS,
        }
    }
}

impl ProviderSettings {
    /// Read settings from the process environment, after loading `.env` if present.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from any key lookup. Blank values count as unset;
    /// unparsable numbers fall back to the defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let defaults = Self::default();

        let llm_max_tokens = parse_or_warn(ENV_LLM_MAX_TOKENS, get(ENV_LLM_MAX_TOKENS))
            .unwrap_or(defaults.llm_max_tokens);
        let request_timeout_secs =
            parse_or_warn(ENV_PROVIDER_TIMEOUT_SECS, get(ENV_PROVIDER_TIMEOUT_SECS))
                .unwrap_or(defaults.request_timeout_secs);

        Self {
            ai_api_key: get(ENV_AI_API_KEY),
            llm_provider: get(ENV_LLM_PROVIDER),
            ocr_api_key: get(ENV_OCR_API_KEY),
            llm_base_url: get(ENV_LLM_BASE_URL).unwrap_or(defaults.llm_base_url),
            llm_model: get(ENV_LLM_MODEL).unwrap_or(defaults.llm_model),
            llm_max_tokens,
            ocr_endpoint: get(ENV_OCR_ENDPOINT).unwrap_or(defaults.ocr_endpoint),
            request_timeout_secs,
        }
    }
}

fn parse_or_warn<T: std::str::FromStr>(key: &str, raw: Option<String>) -> Option<T> {
    let raw = raw?;
    match raw.parse() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!(key, value = %raw, "Ignoring unparsable setting, using default");
            None
        }
    }
}

impl std::fmt::Debug for ProviderSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let redact = |key: &Option<String>| if key.is_some() { "<set>" } else { "<unset>" };
        f.debug_struct("ProviderSettings")
            .field("ai_api_key", &redact(&self.ai_api_key))
            .field("llm_provider", &self.llm_provider)
            .field("ocr_api_key", &redact(&self.ocr_api_key))
            .field("llm_base_url", &self.llm_base_url)
            .field("llm_model", &self.llm_model)
            .field("llm_max_tokens", &self.llm_max_tokens)
            .field("ocr_endpoint", &self.ocr_endpoint)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}
