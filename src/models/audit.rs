use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::AnalysisAction;
use super::record::ActingUser;

/// Append-only trail of summary generations. Never mutated once written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisLogEntry {
    pub record_id: Uuid,
    pub triggered_by: Uuid,
    pub triggered_by_name: String,
    pub model: String,
    pub timestamp: DateTime<Utc>,
    pub action: AnalysisAction,
}

impl AnalysisLogEntry {
    pub fn new(
        record_id: Uuid,
        user: &ActingUser,
        model: &str,
        timestamp: DateTime<Utc>,
        action: AnalysisAction,
    ) -> Self {
        Self {
            record_id,
            triggered_by: user.id,
            triggered_by_name: user.display_name.clone(),
            model: model.to_string(),
            timestamp,
            action,
        }
    }
}
