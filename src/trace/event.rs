use serde::Serialize;

use crate::fill::report::FieldOutcome;
use crate::fill::session::SessionPhase;
use crate::form::field_model::UserInputEntry;

/// One line of a fill trace.
#[derive(Debug, Clone, Serialize)]
pub struct FillEvent {
    pub timestamp: String,
    pub step: u64,
    pub phase: SessionPhase,

    pub field_id: Option<String>,
    pub field_type: Option<String>,

    pub outcome: Option<String>,
    pub detail: Option<String>,
}

impl FillEvent {
    pub fn now(step: u64, phase: SessionPhase) -> Self {
        Self {
            timestamp: chrono::Local::now().to_rfc3339(),
            step,
            phase,
            field_id: None,
            field_type: None,
            outcome: None,
            detail: None,
        }
    }

    pub fn with_field(mut self, entry: &UserInputEntry) -> Self {
        self.field_id = Some(entry.id.clone());
        self.field_type = Some(format!("{:?}", entry.field_type).to_lowercase());
        self
    }

    pub fn with_outcome(mut self, outcome: &FieldOutcome) -> Self {
        self.outcome = Some(outcome.label().to_string());
        if let Some(reason) = outcome.reason() {
            self.detail = Some(reason.to_string());
        }
        self
    }

    pub fn with_detail(mut self, detail: impl ToString) -> Self {
        self.detail = Some(detail.to_string());
        self
    }
}
