use serde::{Deserialize, Serialize};

use crate::browser::driver::LoadState;
use crate::form::error::FormError;
use crate::form::normalize::normalize_label;

fn is_false(b: &bool) -> bool {
    !*b
}

// ============================================================================
// Field descriptors
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    Text,
    Email,
    Phone,
    Url,
    Dropdown,
    File,
    Textarea,
    CheckboxGroup,
    #[serde(other)]
    Unknown,
}

impl FieldType {
    pub fn is_text_like(self) -> bool {
        matches!(
            self,
            FieldType::Text | FieldType::Email | FieldType::Phone | FieldType::Url
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldOption {
    pub text: String,
    pub value: String,
}

impl FieldOption {
    pub fn new(text: &str, value: &str) -> Self {
        FieldOption {
            text: text.to_string(),
            value: value.to_string(),
        }
    }
}

/// Whether a dropdown's options are the full set or only a sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OptionsNote {
    #[serde(rename = "exhaustive")]
    Exhaustive,
    #[serde(rename = "sample-free-text")]
    SampleFreeText,
}

impl OptionsNote {
    /// Human guidance shown next to the field in the fill template.
    pub fn guidance(self, has_options: bool) -> &'static str {
        match (self, has_options) {
            (OptionsNote::Exhaustive, true) => "Select from the available options.",
            (OptionsNote::SampleFreeText, true) => {
                "These are sample options. You can type any value that matches your specific case."
            }
            (_, false) => {
                "This dropdown accepts custom input. Type the value that matches your specific case."
            }
        }
    }
}

/// One extracted form question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub label: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<FieldOption>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options_note: Option<OptionsNote>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub supports_custom_input: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_type: Option<FieldType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country_selector: Option<bool>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub country_options: Vec<FieldOption>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub upload_options: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accepted_types: Option<String>,
}

impl FieldDescriptor {
    pub fn new(id: &str, name: &str, label: &str, field_type: FieldType, required: bool) -> Self {
        FieldDescriptor {
            id: id.to_string(),
            name: name.to_string(),
            label: label.to_string(),
            field_type,
            required,
            options: None,
            options_note: None,
            supports_custom_input: false,
            original_type: None,
            country_selector: None,
            country_options: Vec::new(),
            upload_options: Vec::new(),
            accepted_types: None,
        }
    }

    /// Attach dropdown options. Fewer than two options are dropped and the
    /// field becomes free text; a dynamic set is marked as a sample.
    pub fn with_options(mut self, options: Vec<FieldOption>, dynamic: bool) -> Self {
        self.supports_custom_input = true;
        if options.len() >= 2 {
            self.options = Some(options);
            self.options_note = Some(if dynamic {
                OptionsNote::SampleFreeText
            } else {
                OptionsNote::Exhaustive
            });
        } else {
            self.options = None;
            self.options_note = Some(OptionsNote::SampleFreeText);
        }
        self
    }

    pub fn has_options(&self) -> bool {
        self.options.as_ref().is_some_and(|o| !o.is_empty())
    }

    pub fn is_dropdown(&self) -> bool {
        self.field_type == FieldType::Dropdown
    }

    pub fn is_checkbox_group(&self) -> bool {
        self.original_type == Some(FieldType::CheckboxGroup)
    }

    /// Key under which two descriptors denote the same question:
    /// id, else name, else normalized label. File fields always key by
    /// label so that several uploads sharing a generic id stay distinct.
    pub fn identity_key(&self) -> String {
        if self.field_type == FieldType::File {
            return format!("{}_file", normalize_label(&self.label));
        }
        if !self.id.is_empty() {
            return self.id.clone();
        }
        if !self.name.is_empty() {
            return self.name.clone();
        }
        normalize_label(&self.label)
    }
}

// ============================================================================
// Form context
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WaitStrategy {
    #[serde(rename = "domcontentloaded")]
    DomContentLoaded,
    #[serde(rename = "load")]
    Load,
    #[serde(rename = "networkidle")]
    NetworkIdle,
}

impl WaitStrategy {
    pub fn load_state(self) -> LoadState {
        match self {
            WaitStrategy::DomContentLoaded => LoadState::DomContentLoaded,
            WaitStrategy::Load => LoadState::Load,
            WaitStrategy::NetworkIdle => LoadState::NetworkIdle,
        }
    }
}

/// How to get back to the form root in a later session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormContext {
    pub is_iframe: bool,
    #[serde(default)]
    pub iframe_src: Option<String>,
    #[serde(default)]
    pub iframe_selector: Option<String>,
    #[serde(default)]
    pub iframe_index: Option<usize>,
    pub wait_strategy: WaitStrategy,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub load_timeout: Option<u64>,
}

impl FormContext {
    pub fn main_document() -> Self {
        FormContext {
            is_iframe: false,
            iframe_src: None,
            iframe_selector: None,
            iframe_index: None,
            wait_strategy: WaitStrategy::NetworkIdle,
            load_timeout: None,
        }
    }

    pub fn iframe(src: &str, selector: &str, index: usize, load_timeout: u64) -> Self {
        FormContext {
            is_iframe: true,
            iframe_src: Some(src.to_string()),
            iframe_selector: Some(selector.to_string()),
            iframe_index: Some(index),
            wait_strategy: WaitStrategy::DomContentLoaded,
            load_timeout: Some(load_timeout),
        }
    }

    pub fn validate(&self) -> Result<(), FormError> {
        if self.is_iframe && self.iframe_src.as_deref().is_none_or(|s| s.trim().is_empty()) {
            return Err(FormError::ContractViolation(
                "form_context.is_iframe is set but iframe_src is missing".into(),
            ));
        }
        Ok(())
    }
}

impl Default for FormContext {
    fn default() -> Self {
        Self::main_document()
    }
}

// ============================================================================
// Fill template
// ============================================================================

/// One question of the fill template, completed externally with `value`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserInputEntry {
    pub id: String,
    #[serde(default)]
    pub question: String,
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub required: bool,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub available_options: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supports_custom_input: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options_note: Option<OptionsNote>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accepted_file_types: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upload_methods: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_country_selector: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sample_countries: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_type: Option<FieldType>,
    /// Id or name of the source control when `id` had to be suffixed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_id: Option<String>,
}

impl UserInputEntry {
    pub fn new(id: &str, question: &str, field_type: FieldType, required: bool) -> Self {
        UserInputEntry {
            id: id.to_string(),
            question: question.to_string(),
            value: String::new(),
            required,
            field_type,
            available_options: None,
            supports_custom_input: None,
            options_note: None,
            note: None,
            accepted_file_types: None,
            upload_methods: None,
            has_country_selector: None,
            sample_countries: None,
            original_type: None,
            source_id: None,
        }
    }

    /// What the selector ladders look the control up by. Entries whose id
    /// came from a label slug have no page id and are found by question.
    pub fn control_id(&self) -> &str {
        self.source_id.as_deref().unwrap_or(&self.id)
    }

    pub fn with_value(mut self, value: &str) -> Self {
        self.value = value.to_string();
        self
    }
}

// ============================================================================
// Artifacts
// ============================================================================

/// Result of one extraction, persisted as JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionArtifact {
    pub url: String,
    pub timestamp: String,
    pub job_title: String,
    pub company: String,
    pub form_context: FormContext,
    pub total_fields: usize,
    pub required_fields: usize,
    pub fields: Vec<FieldDescriptor>,
    pub user_input_template: Vec<UserInputEntry>,
}

/// The subset of an artifact the filler needs. Other keys are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FillRequest {
    pub url: String,
    pub form_context: FormContext,
    pub user_input_template: Vec<UserInputEntry>,
}

impl FillRequest {
    pub fn from_json(json: &str) -> Result<Self, FormError> {
        let request: FillRequest = serde_json::from_str(json)
            .map_err(|e| FormError::ContractViolation(e.to_string()))?;
        request.validate()?;
        Ok(request)
    }

    pub fn validate(&self) -> Result<(), FormError> {
        if self.url.trim().is_empty() {
            return Err(FormError::ContractViolation("url is empty".into()));
        }
        if self.user_input_template.is_empty() {
            return Err(FormError::ContractViolation(
                "user_input_template has no entries".into(),
            ));
        }
        self.form_context.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_option_degrades_to_free_text() {
        let field = FieldDescriptor::new("degree", "", "Degree", FieldType::Dropdown, false)
            .with_options(vec![FieldOption::new("BSc", "bsc")], false);
        assert!(field.options.is_none());
        assert_eq!(field.options_note, Some(OptionsNote::SampleFreeText));
        assert!(field.supports_custom_input);
    }

    #[test]
    fn identity_prefers_id_then_name_then_label() {
        let mut field = FieldDescriptor::new("", "", "First Name *", FieldType::Text, true);
        assert_eq!(field.identity_key(), "first name");
        field.name = "first".into();
        assert_eq!(field.identity_key(), "first");
        field.id = "fn".into();
        assert_eq!(field.identity_key(), "fn");
    }

    #[test]
    fn iframe_context_without_src_is_rejected() {
        let mut context = FormContext::iframe("https://boards.greenhouse.io/x", "iframe", 0, 8000);
        assert!(context.validate().is_ok());
        context.iframe_src = None;
        assert!(matches!(context.validate(), Err(FormError::ContractViolation(_))));
    }

    #[test]
    fn options_note_serializes_with_hyphens() {
        let json = serde_json::to_string(&OptionsNote::SampleFreeText).unwrap();
        assert_eq!(json, "\"sample-free-text\"");
    }
}
