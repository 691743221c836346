use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use uuid::Uuid;

use super::{RecordStore, StoreError};
use crate::models::{
    AccessPermission, AnalysisLogEntry, Doctor, MedicalRecord, Patient, ReportSummary,
};

#[derive(Default)]
struct Tables {
    records: HashMap<Uuid, MedicalRecord>,
    patients: HashMap<Uuid, Patient>,
    doctors: HashMap<Uuid, Doctor>,
    permissions: HashMap<(Uuid, Uuid), AccessPermission>,
    analysis_logs: Vec<AnalysisLogEntry>,
}

/// Process-local [`RecordStore`]. All tables sit behind one lock, so a
/// summary replacement is never observed half-written.
#[derive(Default)]
pub struct InMemoryRecordStore {
    tables: Mutex<Tables>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>, StoreError> {
        self.tables
            .lock()
            .map_err(|_| StoreError::Backend("record store lock poisoned".into()))
    }

    pub fn insert_record(&self, record: MedicalRecord) -> Result<(), StoreError> {
        self.lock()?.records.insert(record.id, record);
        Ok(())
    }

    pub fn insert_patient(&self, patient: Patient) -> Result<(), StoreError> {
        self.lock()?.patients.insert(patient.id, patient);
        Ok(())
    }

    pub fn insert_doctor(&self, doctor: Doctor) -> Result<(), StoreError> {
        self.lock()?.doctors.insert(doctor.id, doctor);
        Ok(())
    }

    /// Insert or replace the permission for this patient/doctor pair.
    pub fn upsert_permission(&self, permission: AccessPermission) -> Result<(), StoreError> {
        self.lock()?
            .permissions
            .insert((permission.patient_id, permission.doctor_id), permission);
        Ok(())
    }

    /// Log entries for one record, oldest first.
    pub fn analysis_logs_for(&self, record_id: &Uuid) -> Result<Vec<AnalysisLogEntry>, StoreError> {
        Ok(self
            .lock()?
            .analysis_logs
            .iter()
            .filter(|entry| entry.record_id == *record_id)
            .cloned()
            .collect())
    }
}

impl RecordStore for InMemoryRecordStore {
    fn get_record(&self, record_id: &Uuid) -> Result<Option<MedicalRecord>, StoreError> {
        Ok(self.lock()?.records.get(record_id).cloned())
    }

    fn get_patient(&self, patient_id: &Uuid) -> Result<Option<Patient>, StoreError> {
        Ok(self.lock()?.patients.get(patient_id).cloned())
    }

    fn get_doctor_by_user(&self, user_id: &Uuid) -> Result<Option<Doctor>, StoreError> {
        Ok(self
            .lock()?
            .doctors
            .values()
            .find(|d| d.user_id == *user_id)
            .cloned())
    }

    fn get_permission(
        &self,
        patient_id: &Uuid,
        doctor_id: &Uuid,
    ) -> Result<Option<AccessPermission>, StoreError> {
        Ok(self
            .lock()?
            .permissions
            .get(&(*patient_id, *doctor_id))
            .cloned())
    }

    fn save_ocr_text(&self, record_id: &Uuid, text: &str) -> Result<(), StoreError> {
        let mut tables = self.lock()?;
        let record = tables
            .records
            .get_mut(record_id)
            .ok_or_else(|| not_found("medical_record", record_id))?;
        record.ocr_text = Some(text.to_string());
        Ok(())
    }

    fn save_summary(&self, record_id: &Uuid, summary: &ReportSummary) -> Result<(), StoreError> {
        let mut tables = self.lock()?;
        let record = tables
            .records
            .get_mut(record_id)
            .ok_or_else(|| not_found("medical_record", record_id))?;
        record.summary = Some(summary.clone());
        Ok(())
    }

    fn append_analysis_log(&self, entry: &AnalysisLogEntry) -> Result<(), StoreError> {
        self.lock()?.analysis_logs.push(entry.clone());
        Ok(())
    }
}

fn not_found(entity_type: &str, id: &Uuid) -> StoreError {
    StoreError::NotFound {
        entity_type: entity_type.into(),
        id: id.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ActingUser, AnalysisAction, RecordType};
    use chrono::Utc;

    fn sample_record() -> MedicalRecord {
        MedicalRecord {
            id: Uuid::new_v4(),
            patient_id: Uuid::new_v4(),
            title: "CBC".into(),
            record_type: RecordType::LabResult,
            uploaded_by_id: Uuid::new_v4(),
            file_url: None,
            ocr_text: None,
            summary: None,
            date: Utc::now(),
        }
    }

    fn sample_summary(text: &str) -> ReportSummary {
        ReportSummary {
            patient_summary: text.into(),
            doctor_summary: text.into(),
            flags: vec![],
            model_identifier: "command-r".into(),
            generated_at: Utc::now(),
            generated_by: Uuid::new_v4(),
        }
    }

    #[test]
    fn save_summary_replaces_previous() {
        let store = InMemoryRecordStore::new();
        let record = sample_record();
        let id = record.id;
        store.insert_record(record).unwrap();

        store.save_summary(&id, &sample_summary("first")).unwrap();
        store.save_summary(&id, &sample_summary("second")).unwrap();

        let saved = store.get_record(&id).unwrap().unwrap();
        assert_eq!(saved.summary.unwrap().patient_summary, "second");
    }

    #[test]
    fn save_summary_on_missing_record_fails() {
        let store = InMemoryRecordStore::new();
        let result = store.save_summary(&Uuid::new_v4(), &sample_summary("x"));
        assert!(matches!(result, Err(StoreError::NotFound { .. })));
    }

    #[test]
    fn save_ocr_text_overwrites() {
        let store = InMemoryRecordStore::new();
        let record = sample_record();
        let id = record.id;
        store.insert_record(record).unwrap();

        store.save_ocr_text(&id, "Hemoglobin 13.5 g/dl").unwrap();
        let saved = store.get_record(&id).unwrap().unwrap();
        assert_eq!(saved.ocr_text.as_deref(), Some("Hemoglobin 13.5 g/dl"));
    }

    #[test]
    fn analysis_logs_filtered_by_record() {
        let store = InMemoryRecordStore::new();
        let user = ActingUser::new(Uuid::new_v4(), "pat@example.com");
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();

        for (record_id, action) in [
            (a, AnalysisAction::Generate),
            (b, AnalysisAction::Generate),
            (a, AnalysisAction::Regenerate),
        ] {
            let entry = AnalysisLogEntry::new(record_id, &user, "command-r", Utc::now(), action);
            store.append_analysis_log(&entry).unwrap();
        }

        let logs = store.analysis_logs_for(&a).unwrap();
        assert_eq!(logs.len(), 2);
        assert_eq!(logs[0].action, AnalysisAction::Generate);
        assert_eq!(logs[1].action, AnalysisAction::Regenerate);
    }

    #[test]
    fn doctor_lookup_by_user() {
        let store = InMemoryRecordStore::new();
        let user_id = Uuid::new_v4();
        store
            .insert_doctor(Doctor {
                id: Uuid::new_v4(),
                user_id,
                first_name: "Ada".into(),
                last_name: "Mensah".into(),
                license_number: "LIC-1".into(),
                specialization: "Hematology".into(),
                verified: true,
            })
            .unwrap();

        assert!(store.get_doctor_by_user(&user_id).unwrap().is_some());
        assert!(store.get_doctor_by_user(&Uuid::new_v4()).unwrap().is_none());
    }
}
