use serde::Serialize;

use crate::fill::geolocation::GeoReport;
use crate::fill::session::SessionPhase;
use crate::form::field_model::FieldType;

/// What happened to one template entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum FieldOutcome {
    Filled,
    /// Optional entry without a value.
    Skipped(String),
    /// Set, but the read-back differed.
    Unverified(String),
    Failed(String),
}

impl FieldOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            FieldOutcome::Filled => "filled",
            FieldOutcome::Skipped(_) => "skipped",
            FieldOutcome::Unverified(_) => "unverified",
            FieldOutcome::Failed(_) => "failed",
        }
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            FieldOutcome::Filled => None,
            FieldOutcome::Skipped(r) | FieldOutcome::Unverified(r) | FieldOutcome::Failed(r) => Some(r),
        }
    }

    /// A value reached the page, verified or not.
    pub fn counts_as_filled(&self) -> bool {
        matches!(self, FieldOutcome::Filled | FieldOutcome::Unverified(_))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FieldReport {
    pub id: String,
    pub question: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    pub outcome: FieldOutcome,
}

/// Result of a fill session.
#[derive(Debug, Clone, Serialize)]
pub struct FillReport {
    pub url: String,
    pub phase: SessionPhase,
    pub filled: usize,
    pub total: usize,
    pub fields: Vec<FieldReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub geolocation: Option<GeoReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace_file: Option<String>,
}

impl FillReport {
    pub fn outcome_of(&self, id: &str) -> Option<&FieldOutcome> {
        self.fields.iter().find(|f| f.id == id).map(|f| &f.outcome)
    }
}
