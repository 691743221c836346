use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A model-produced annotation on one reported lab parameter.
/// Only shape-checked; the values are whatever the model wrote.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryFlag {
    pub name: String,
    pub value: String,
    pub range: String,
    pub note: String,
}

/// The live AI summary of a medical record. Replaced wholesale on regeneration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportSummary {
    pub patient_summary: String,
    pub doctor_summary: String,
    pub flags: Vec<SummaryFlag>,
    #[serde(rename = "model")]
    pub model_identifier: String,
    pub generated_at: DateTime<Utc>,
    pub generated_by: Uuid,
}
