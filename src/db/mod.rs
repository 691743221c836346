//! Record store seam.
//!
//! Records, profiles, permissions and the analysis log live in an external
//! backend. The pipeline only needs the handful of operations on
//! [`RecordStore`]; [`InMemoryRecordStore`] backs tests and embedders that
//! have no backend of their own.

pub mod memory;

pub use memory::*;

use thiserror::Error;
use uuid::Uuid;

use crate::models::{AccessPermission, AnalysisLogEntry, Doctor, MedicalRecord, Patient, ReportSummary};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Entity not found: {entity_type} with id {id}")]
    NotFound { entity_type: String, id: String },

    #[error("Invalid enum value for {field}: {value}")]
    InvalidEnum { field: String, value: String },

    #[error("Record store backend error: {0}")]
    Backend(String),
}

/// Operations the pipeline consumes from the record backend.
pub trait RecordStore: Send + Sync {
    fn get_record(&self, record_id: &Uuid) -> Result<Option<MedicalRecord>, StoreError>;

    fn get_patient(&self, patient_id: &Uuid) -> Result<Option<Patient>, StoreError>;

    fn get_doctor_by_user(&self, user_id: &Uuid) -> Result<Option<Doctor>, StoreError>;

    fn get_permission(
        &self,
        patient_id: &Uuid,
        doctor_id: &Uuid,
    ) -> Result<Option<AccessPermission>, StoreError>;

    fn save_ocr_text(&self, record_id: &Uuid, text: &str) -> Result<(), StoreError>;

    /// Replace the record's summary in a single write.
    fn save_summary(&self, record_id: &Uuid, summary: &ReportSummary) -> Result<(), StoreError>;

    fn append_analysis_log(&self, entry: &AnalysisLogEntry) -> Result<(), StoreError>;
}
