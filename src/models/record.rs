use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::RecordType;
use super::summary::ReportSummary;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Patient {
    pub id: Uuid,
    pub user_id: Uuid,
    pub health_id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Doctor {
    pub id: Uuid,
    pub user_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub license_number: String,
    pub specialization: String,
    pub verified: bool,
}

/// A patient's grant (or revocation) of record access for one doctor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessPermission {
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub granted: bool,
    pub granted_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl AccessPermission {
    /// Granted and not past its expiry at `now`.
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.granted && self.expires_at.map_or(true, |exp| exp > now)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MedicalRecord {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub title: String,
    pub record_type: RecordType,
    pub uploaded_by_id: Uuid,
    pub file_url: Option<String>,
    pub ocr_text: Option<String>,
    pub summary: Option<ReportSummary>,
    pub date: DateTime<Utc>,
}

/// The authenticated user a pipeline run acts on behalf of.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActingUser {
    pub id: Uuid,
    pub display_name: String,
}

impl ActingUser {
    pub fn new(id: Uuid, display_name: &str) -> Self {
        Self {
            id,
            display_name: display_name.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn permission(granted: bool, expires_at: Option<DateTime<Utc>>) -> AccessPermission {
        AccessPermission {
            patient_id: Uuid::new_v4(),
            doctor_id: Uuid::new_v4(),
            granted,
            granted_at: Utc::now() - Duration::days(1),
            expires_at,
        }
    }

    #[test]
    fn granted_without_expiry_is_active() {
        assert!(permission(true, None).is_active_at(Utc::now()));
    }

    #[test]
    fn revoked_permission_is_inactive() {
        assert!(!permission(false, None).is_active_at(Utc::now()));
    }

    #[test]
    fn expired_permission_is_inactive() {
        let now = Utc::now();
        assert!(!permission(true, Some(now - Duration::hours(1))).is_active_at(now));
        assert!(permission(true, Some(now + Duration::hours(1))).is_active_at(now));
    }
}
