//! Record access authorization.
//!
//! Cascade, checked in order, default-deny:
//! 1. User uploaded the record → ALLOW
//! 2. User owns the patient profile the record belongs to → ALLOW
//! 3. User is a doctor holding an active grant for that patient → ALLOW
//! 4. Default → DENY
//!
//! Grants are unidirectional and per patient/doctor pair. A revoked or expired
//! grant is treated exactly like a missing one.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::db::{RecordStore, StoreError};
use crate::models::{MedicalRecord, Patient};

// ═══════════════════════════════════════════════════════════
// Types
// ═══════════════════════════════════════════════════════════

/// Why access was granted or denied, for logs and error messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessReason {
    /// User uploaded the record.
    Uploader,
    /// User owns the patient profile.
    PatientOwner,
    /// Doctor with an active permission for the patient.
    DoctorGrant,
    /// Doctor without an active permission.
    NoPermission,
    /// Neither related to the record nor a doctor.
    NotRelated,
}

impl AccessReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Uploader => "uploader",
            Self::PatientOwner => "patient_owner",
            Self::DoctorGrant => "doctor_grant",
            Self::NoPermission => "no_permission",
            Self::NotRelated => "not_related",
        }
    }

    /// User-facing message when this reason blocks access.
    pub fn denial_message(self) -> &'static str {
        match self {
            Self::NoPermission => "No access permission",
            _ => "Permission denied",
        }
    }
}

/// Result of an authorization check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessDecision {
    pub allowed: bool,
    pub reason: AccessReason,
}

impl AccessDecision {
    fn allow(reason: AccessReason) -> Self {
        Self {
            allowed: true,
            reason,
        }
    }

    fn deny(reason: AccessReason) -> Self {
        Self {
            allowed: false,
            reason,
        }
    }
}

// ═══════════════════════════════════════════════════════════
// Authorization check
// ═══════════════════════════════════════════════════════════

/// Check whether `user_id` may read or analyze `record`.
///
/// `patient` must be the profile `record.patient_id` points at. Only the
/// doctor rule touches the store.
pub fn check_record_access(
    store: &dyn RecordStore,
    record: &MedicalRecord,
    patient: &Patient,
    user_id: &Uuid,
    now: DateTime<Utc>,
) -> Result<AccessDecision, StoreError> {
    if record.uploaded_by_id == *user_id {
        return Ok(AccessDecision::allow(AccessReason::Uploader));
    }

    if patient.user_id == *user_id {
        return Ok(AccessDecision::allow(AccessReason::PatientOwner));
    }

    let Some(doctor) = store.get_doctor_by_user(user_id)? else {
        return Ok(AccessDecision::deny(AccessReason::NotRelated));
    };

    let active = store
        .get_permission(&record.patient_id, &doctor.id)?
        .is_some_and(|p| p.is_active_at(now));

    if active {
        Ok(AccessDecision::allow(AccessReason::DoctorGrant))
    } else {
        Ok(AccessDecision::deny(AccessReason::NoPermission))
    }
}

// ═══════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════
