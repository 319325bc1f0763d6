//! Discovery, extraction and filling of job-application forms.
//!
//! Every heuristic runs against the [`Driver`](browser::driver::Driver)
//! trait, implemented by a live Playwright session and by an in-memory
//! DOM snapshot.

pub mod batch;
pub mod browser;
pub mod canonical;
pub mod cli;
pub mod extract;
pub mod fill;
pub mod form;
pub mod locate;
pub mod trace;

pub use browser::driver::{Driver, NodeId, Scope};
pub use extract::pipeline::{extract_form, extract_loaded_page};
pub use fill::session::{FillSession, SessionPhase};
pub use form::error::FormError;
pub use form::field_model::{ExtractionArtifact, FieldDescriptor, FieldType, FillRequest, UserInputEntry};
