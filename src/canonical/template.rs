use std::collections::HashMap;

use crate::form::field_model::{FieldDescriptor, FieldType, OptionsNote, UserInputEntry};
use crate::form::normalize::slugify;

const SAMPLE_COUNTRIES: usize = 5;
const COUNTRY_SELECTOR_NOTE: &str =
    "This field has a country selector. Select your country code first, then enter your phone number.";

/// Fill-template id: the field id, else its name, else a slug of the label.
fn template_id(field: &FieldDescriptor) -> String {
    if !field.id.is_empty() {
        return field.id.clone();
    }
    if !field.name.is_empty() {
        return field.name.clone();
    }
    slugify(&field.label)
}

/// One template entry per canonical field, ids made unique with `_2`, `_3`…
pub fn build_template(fields: &[FieldDescriptor]) -> Vec<UserInputEntry> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    fields
        .iter()
        .map(|field| {
            let base = template_id(field);
            let count = seen.entry(base.clone()).or_insert(0);
            *count += 1;
            if *count == 1 {
                return template_entry(field, &base);
            }
            let mut entry = template_entry(field, &format!("{}_{}", base, count));
            if !field.id.is_empty() || !field.name.is_empty() {
                entry.source_id = Some(base);
            }
            entry
        })
        .collect()
}

fn template_entry(field: &FieldDescriptor, id: &str) -> UserInputEntry {
    let mut entry = UserInputEntry::new(id, &field.label, field.field_type, field.required);
    entry.original_type = field.original_type;

    match field.field_type {
        FieldType::Dropdown => {
            let note = field.options_note.unwrap_or(OptionsNote::SampleFreeText);
            let has_options = field.has_options();
            if has_options {
                entry.available_options = field
                    .options
                    .as_ref()
                    .map(|options| options.iter().map(|o| o.text.clone()).collect());
            }
            entry.options_note = Some(note);
            entry.supports_custom_input = Some(field.supports_custom_input || !has_options);
            entry.note = Some(note.guidance(has_options).to_string());
        }
        FieldType::File => {
            entry.accepted_file_types = field.accepted_types.clone();
            if !field.upload_options.is_empty() {
                entry.upload_methods = Some(field.upload_options.clone());
            }
        }
        FieldType::Phone => {
            if field.country_selector == Some(true) {
                entry.has_country_selector = Some(true);
                entry.note = Some(COUNTRY_SELECTOR_NOTE.to_string());
            }
            if !field.country_options.is_empty() {
                entry.sample_countries = Some(
                    field
                        .country_options
                        .iter()
                        .take(SAMPLE_COUNTRIES)
                        .map(|o| o.text.clone())
                        .collect(),
                );
            }
        }
        _ => {}
    }
    entry
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::form::field_model::FieldOption;

    #[test]
    fn colliding_ids_get_numeric_suffixes() {
        let fields = vec![
            FieldDescriptor::new("", "", "Question", FieldType::Text, false),
            FieldDescriptor::new("", "", "Question?", FieldType::Textarea, false),
            FieldDescriptor::new("question", "", "Other", FieldType::Text, false),
        ];
        let ids: Vec<String> = build_template(&fields).into_iter().map(|e| e.id).collect();
        assert_eq!(ids, vec!["question", "question_2", "question_3"]);
    }

    #[test]
    fn dropdown_entry_lists_options_and_guidance() {
        let field = FieldDescriptor::new("country", "", "Country", FieldType::Dropdown, true)
            .with_options(vec![FieldOption::new("USA", "usa"), FieldOption::new("Canada", "canada")], false);
        let entry = &build_template(&[field])[0];
        assert_eq!(entry.available_options, Some(vec!["USA".to_string(), "Canada".to_string()]));
        assert_eq!(entry.options_note, Some(OptionsNote::Exhaustive));
        assert_eq!(entry.note.as_deref(), Some("Select from the available options."));
        assert_eq!(entry.supports_custom_input, Some(true));
    }

    #[test]
    fn phone_entry_samples_five_countries() {
        let mut field = FieldDescriptor::new("phone", "", "Phone", FieldType::Phone, true);
        field.country_selector = Some(true);
        field.country_options = (0..8).map(|i| FieldOption::new(&format!("C{}", i), "")).collect();
        let entry = &build_template(&[field])[0];
        assert_eq!(entry.has_country_selector, Some(true));
        assert_eq!(entry.sample_countries.as_ref().map(Vec::len), Some(5));
    }
}
