//! Report analysis orchestrator.
//!
//! One run: authorize → resolve text (stored, override, or fresh OCR) →
//! normalize lab values → patient and doctor summaries → persist summary →
//! append audit entry. Any failure before persisting aborts the run with
//! nothing written; the audit append comes after the summary write and its
//! failure is only logged.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use thiserror::Error;
use uuid::Uuid;

use super::extraction::{normalize_lab_text, ExtractionError, OcrProvider};
use super::summary::{
    build_summary_prompt, parse_summary_response, AudienceSummary, RecoveryTier, SummaryError,
    SummaryProvider,
};
use crate::authorization::{check_record_access, AccessReason};
use crate::db::{RecordStore, StoreError};
use crate::models::{
    ActingUser, AnalysisAction, AnalysisLogEntry, Audience, MedicalRecord, ReportSummary,
};

/// Shortest text (in characters, after trimming) worth summarizing.
pub const MIN_ANALYSIS_TEXT_CHARS: usize = 10;

// ═══════════════════════════════════════════════════════════
// Types
// ═══════════════════════════════════════════════════════════

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("No sufficient text available for analysis. Please upload a document with readable text or provide OCR text.")]
    InsufficientText,

    #[error("Medical record not found: {0}")]
    RecordNotFound(Uuid),

    #[error("Patient not found: {0}")]
    PatientNotFound(Uuid),

    #[error("{}", .0.denial_message())]
    AccessDenied(AccessReason),

    #[error("OCR extraction failed: {0}")]
    Extraction(#[from] ExtractionError),

    #[error("AI analysis failed: {0}")]
    Summary(#[from] SummaryError),

    #[error("Record store error: {0}")]
    Store(#[from] StoreError),
}

/// Where a run is. Reported to the observer on every transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisStage {
    NeedText,
    Normalizing,
    Requesting(Audience),
    Persisting,
    Done,
    Aborted,
}

impl fmt::Display for AnalysisStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NeedText => f.write_str("need_text"),
            Self::Normalizing => f.write_str("normalizing"),
            Self::Requesting(audience) => write!(f, "requesting_{audience}"),
            Self::Persisting => f.write_str("persisting"),
            Self::Done => f.write_str("done"),
            Self::Aborted => f.write_str("aborted"),
        }
    }
}

pub type StageObserver = Box<dyn Fn(AnalysisStage) + Send + Sync>;

/// Input for one analysis run.
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    pub record_id: Uuid,
    pub user: ActingUser,
    /// Used instead of the record's stored OCR text when non-empty.
    /// Ignored by [`ReportAnalyzer::extract_and_analyze`].
    pub text_override: Option<String>,
    pub action: AnalysisAction,
}

impl AnalysisRequest {
    pub fn new(record_id: Uuid, user: ActingUser, action: AnalysisAction) -> Self {
        Self {
            record_id,
            user,
            text_override: None,
            action,
        }
    }

    pub fn with_text(mut self, text: &str) -> Self {
        self.text_override = Some(text.to_string());
        self
    }
}

/// What a successful run produced and stored.
#[derive(Debug, Clone)]
pub struct AnalysisOutcome {
    pub summary: ReportSummary,
    /// The corrected text both prompts were built from.
    pub normalized_text: String,
    pub patient_tier: RecoveryTier,
    pub doctor_tier: RecoveryTier,
    pub log_entry: AnalysisLogEntry,
    /// False when the summary was saved but the audit append failed.
    pub log_recorded: bool,
}

enum TextSource<'a> {
    Stored,
    Ocr(Option<&'a str>),
}

// ═══════════════════════════════════════════════════════════
// Orchestrator
// ═══════════════════════════════════════════════════════════

pub struct ReportAnalyzer {
    store: Arc<dyn RecordStore>,
    summarizer: Arc<dyn SummaryProvider>,
    ocr: Option<Arc<dyn OcrProvider>>,
    observer: Option<StageObserver>,
}

impl ReportAnalyzer {
    pub fn new(store: Arc<dyn RecordStore>, summarizer: Arc<dyn SummaryProvider>) -> Self {
        Self {
            store,
            summarizer,
            ocr: None,
            observer: None,
        }
    }

    pub fn with_ocr(mut self, ocr: Arc<dyn OcrProvider>) -> Self {
        self.ocr = Some(ocr);
        self
    }

    pub fn with_observer<F>(mut self, observer: F) -> Self
    where
        F: Fn(AnalysisStage) + Send + Sync + 'static,
    {
        self.observer = Some(Box::new(observer));
        self
    }

    /// Summarize a record from its stored OCR text (or the request override).
    pub fn analyze(&self, request: &AnalysisRequest) -> Result<AnalysisOutcome, AnalysisError> {
        self.run(request, TextSource::Stored)
    }

    /// OCR the image, store the text on the record, then summarize it.
    /// `image_url` defaults to the record's file URL. The extracted text is
    /// always what gets summarized; `request.text_override` is ignored.
    pub fn extract_and_analyze(
        &self,
        request: &AnalysisRequest,
        image_url: Option<&str>,
    ) -> Result<AnalysisOutcome, AnalysisError> {
        self.run(request, TextSource::Ocr(image_url))
    }

    /// OCR only: extract the image text and store it as the record's OCR text.
    pub fn extract_text(
        &self,
        record_id: &Uuid,
        user: &ActingUser,
        image_url: Option<&str>,
    ) -> Result<String, AnalysisError> {
        let _span = tracing::info_span!("extract_text", record_id = %record_id).entered();
        let record = self.authorize(record_id, user)?;
        self.extract_for(&record, image_url)
    }

    fn run(
        &self,
        request: &AnalysisRequest,
        source: TextSource<'_>,
    ) -> Result<AnalysisOutcome, AnalysisError> {
        let _span = tracing::info_span!(
            "analyze_report",
            record_id = %request.record_id,
            action = request.action.as_str()
        )
        .entered();
        let start = Instant::now();

        let result = self.run_stages(request, source);
        match &result {
            Ok(outcome) => tracing::info!(
                patient_tier = outcome.patient_tier.as_str(),
                doctor_tier = outcome.doctor_tier.as_str(),
                flags = outcome.summary.flags.len(),
                elapsed_ms = start.elapsed().as_millis() as u64,
                "Report analysis complete"
            ),
            Err(e) => {
                self.report(AnalysisStage::Aborted);
                tracing::warn!(error = %e, "Report analysis aborted");
            }
        }
        result
    }

    fn run_stages(
        &self,
        request: &AnalysisRequest,
        source: TextSource<'_>,
    ) -> Result<AnalysisOutcome, AnalysisError> {
        self.report(AnalysisStage::NeedText);
        let record = self.authorize(&request.record_id, &request.user)?;
        let text = match source {
            TextSource::Stored => resolve_text(request, &record)?,
            TextSource::Ocr(image_url) => {
                let extracted = self.extract_for(&record, image_url)?;
                ensure_sufficient(&extracted)?;
                extracted
            }
        };

        self.report(AnalysisStage::Normalizing);
        let normalized_text = normalize_lab_text(&text);
        ensure_sufficient(&normalized_text)?;
        tracing::debug!(
            raw_chars = text.chars().count(),
            normalized_chars = normalized_text.chars().count(),
            "Lab text normalized"
        );

        let patient = self.summarize(&normalized_text, Audience::Patient)?;
        let doctor = self.summarize(&normalized_text, Audience::Doctor)?;

        self.report(AnalysisStage::Persisting);
        let now = Utc::now();
        let model = self.summarizer.model_id().to_string();
        let summary = ReportSummary {
            patient_summary: patient.summary,
            doctor_summary: doctor.summary,
            flags: patient.flags,
            model_identifier: model.clone(),
            generated_at: now,
            generated_by: request.user.id,
        };
        self.store.save_summary(&record.id, &summary)?;

        let log_entry = AnalysisLogEntry::new(record.id, &request.user, &model, now, request.action);
        let log_recorded = match self.store.append_analysis_log(&log_entry) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(error = %e, "Summary saved but analysis log append failed");
                false
            }
        };

        self.report(AnalysisStage::Done);
        Ok(AnalysisOutcome {
            summary,
            normalized_text,
            patient_tier: patient.tier,
            doctor_tier: doctor.tier,
            log_entry,
            log_recorded,
        })
    }

    fn summarize(&self, text: &str, audience: Audience) -> Result<AudienceSummary, AnalysisError> {
        self.report(AnalysisStage::Requesting(audience));
        let prompt = build_summary_prompt(text, audience);
        let raw = self.summarizer.send(&prompt)?;
        Ok(parse_summary_response(&raw, audience))
    }

    /// Load the record and check the acting user may use it.
    fn authorize(&self, record_id: &Uuid, user: &ActingUser) -> Result<MedicalRecord, AnalysisError> {
        let record = self
            .store
            .get_record(record_id)?
            .ok_or(AnalysisError::RecordNotFound(*record_id))?;
        let patient = self
            .store
            .get_patient(&record.patient_id)?
            .ok_or(AnalysisError::PatientNotFound(record.patient_id))?;

        let decision =
            check_record_access(self.store.as_ref(), &record, &patient, &user.id, Utc::now())?;
        if !decision.allowed {
            tracing::warn!(reason = decision.reason.as_str(), "Record access denied");
            return Err(AnalysisError::AccessDenied(decision.reason));
        }
        tracing::debug!(reason = decision.reason.as_str(), "Record access granted");
        Ok(record)
    }

    fn extract_for(
        &self,
        record: &MedicalRecord,
        image_url: Option<&str>,
    ) -> Result<String, AnalysisError> {
        let ocr = self.ocr.as_ref().ok_or_else(|| {
            ExtractionError::Configuration("No OCR provider configured".into())
        })?;
        let url = image_url
            .or(record.file_url.as_deref())
            .ok_or_else(|| ExtractionError::EmptyResult("No image available for OCR".into()))?;

        let text = ocr.extract(url)?;
        self.store.save_ocr_text(&record.id, &text)?;
        Ok(text)
    }

    fn report(&self, stage: AnalysisStage) {
        tracing::debug!(stage = %stage, "Analysis stage");
        if let Some(observer) = &self.observer {
            observer(stage);
        }
    }
}

/// Request override when non-empty, otherwise the record's stored OCR text.
fn resolve_text(request: &AnalysisRequest, record: &MedicalRecord) -> Result<String, AnalysisError> {
    let text = request
        .text_override
        .as_deref()
        .filter(|t| !t.is_empty())
        .or(record.ocr_text.as_deref())
        .unwrap_or_default();
    ensure_sufficient(text)?;
    Ok(text.to_string())
}

fn ensure_sufficient(text: &str) -> Result<(), AnalysisError> {
    if text.trim().chars().count() < MIN_ANALYSIS_TEXT_CHARS {
        return Err(AnalysisError::InsufficientText);
    }
    Ok(())
}

// ═══════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════
