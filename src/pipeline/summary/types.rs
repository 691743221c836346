use super::SummaryError;
use crate::models::{Audience, SummaryFlag};

/// Text-generation provider abstraction (allows mocking).
pub trait SummaryProvider: Send + Sync {
    /// Identifier stored with every generated summary.
    fn model_id(&self) -> &str;

    /// Send one prompt and return the provider's raw text reply.
    fn send(&self, prompt: &str) -> Result<String, SummaryError>;
}

/// Which recovery strategy produced a parsed summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryTier {
    /// The reply contained a usable JSON object.
    Structured,
    /// No usable JSON; the reply text itself was quoted.
    Excerpt,
    /// Fixed audience-specific sentence.
    Fallback,
}

impl RecoveryTier {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Structured => "structured",
            Self::Excerpt => "excerpt",
            Self::Fallback => "fallback",
        }
    }
}

/// One audience's summary after parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudienceSummary {
    pub audience: Audience,
    pub summary: String,
    pub flags: Vec<SummaryFlag>,
    pub tier: RecoveryTier,
}
