use job_form_automator::browser::selector::Selector;
use job_form_automator::browser::snapshot::{SnapshotDocument, SnapshotDom};
use job_form_automator::canonical::dedupe::{GENDER_QUESTION, RACE_QUESTION, dedupe_fields, merge_checkbox_groups};
use job_form_automator::canonical::template::build_template;
use job_form_automator::form::field_model::{FieldDescriptor, FieldOption, FieldType};
use job_form_automator::form::fingerprint::{Fingerprint, control_identity};
use job_form_automator::{Driver, Scope, UserInputEntry};

use crate::common::{LEFT, body, el, input};

mod common;

fn checkbox_group(label: &str, options: &[&str], required: bool) -> FieldDescriptor {
    let options = options
        .iter()
        .map(|o| FieldOption::new(o, &o.to_lowercase()))
        .collect();
    let mut field =
        FieldDescriptor::new("", "", label, FieldType::Dropdown, required).with_options(options, false);
    field.original_type = Some(FieldType::CheckboxGroup);
    field
}

fn option_texts(field: &FieldDescriptor) -> Vec<&str> {
    field.options.iter().flatten().map(|o| o.text.as_str()).collect()
}

// ============================================================================
// Deduplication
// ============================================================================

#[test]
fn richer_duplicate_takes_the_first_position() {
    let plain = FieldDescriptor::new("start_date", "", "Start date", FieldType::Text, false);
    let email = FieldDescriptor::new("email", "", "Email", FieldType::Email, true);
    let rich = FieldDescriptor::new("start_date", "", "Start date", FieldType::Dropdown, false).with_options(
        vec![FieldOption::new("Immediately", "now"), FieldOption::new("In a month", "month")],
        false,
    );

    let out = dedupe_fields(vec![plain, email, rich]);
    let ids: Vec<&str> = out.iter().map(|f| f.id.as_str()).collect();
    assert_eq!(ids, vec!["start_date", "email"], "order follows first appearance");
    assert_eq!(out[0].field_type, FieldType::Dropdown, "dropdown with options is kept");
}

#[test]
fn uploads_sharing_a_generic_id_stay_distinct() {
    let resume = FieldDescriptor::new("file", "", "Resume", FieldType::File, true);
    let cover = FieldDescriptor::new("file", "", "Cover Letter", FieldType::File, false);
    let out = dedupe_fields(vec![resume, cover]);
    assert_eq!(out.len(), 2, "file fields key on their label");
}

#[test]
fn label_only_fields_dedupe_on_normalized_label() {
    let a = FieldDescriptor::new("", "", "LinkedIn Profile *", FieldType::Url, true);
    let b = FieldDescriptor::new("", "", "linkedin   profile", FieldType::Url, false);
    let out = dedupe_fields(vec![a, b]);
    assert_eq!(out.len(), 1);
    assert!(out[0].required, "first descriptor wins a tie");
}

// ============================================================================
// Checkbox group merging
// ============================================================================

#[test]
fn race_fragments_merge_under_the_canonical_question() {
    let a = checkbox_group("Please select all that apply", &["White", "Black", "Asian"], false);
    let b = checkbox_group("Hispanic or Latino", &["Asian", "Hispanic"], true);

    let out = merge_checkbox_groups(vec![a, b]);
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].label, RACE_QUESTION);
    assert_eq!(option_texts(&out[0]), vec!["White", "Black", "Asian", "Hispanic"]);
    assert!(out[0].required, "required if any fragment was required");
}

#[test]
fn gender_fragments_merge_under_the_canonical_question() {
    let a = checkbox_group("Select one", &["Woman", "Man"], false);
    let b = checkbox_group("How do you describe yourself?", &["Man", "Non-binary"], false);

    let out = merge_checkbox_groups(vec![a, b]);
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].label, GENDER_QUESTION);
    assert_eq!(option_texts(&out[0]), vec!["Woman", "Man", "Non-binary"]);
}

#[test]
fn similar_labels_merge_without_shared_options() {
    let a = checkbox_group("Are you a protected veteran?", &["Yes", "No"], false);
    let b = checkbox_group(
        "Protected veteran status",
        &["I am a protected veteran", "I am not a protected veteran"],
        false,
    );
    let out = merge_checkbox_groups(vec![a, b]);
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].label, "Are you a protected veteran?", "no category, label kept");
    assert_eq!(out[0].options.as_ref().map(Vec::len), Some(4));
}

#[test]
fn unrelated_groups_and_plain_fields_are_untouched() {
    let name = FieldDescriptor::new("first_name", "", "First Name", FieldType::Text, true);
    let sponsorship = checkbox_group("Will you require sponsorship?", &["Yes", "No"], true);
    let relocation = checkbox_group("Are you open to relocation?", &["Yes", "No", "Maybe"], false);

    let out = merge_checkbox_groups(vec![sponsorship, name, relocation]);
    let labels: Vec<&str> = out.iter().map(|f| f.label.as_str()).collect();
    assert_eq!(
        labels,
        vec!["First Name", "Will you require sponsorship?", "Are you open to relocation?"],
        "plain fields first, groups after in their original order"
    );
}

#[test]
fn merging_runs_to_a_fixpoint() {
    let a = checkbox_group("Race", &["White", "Black"], false);
    let b = checkbox_group("Ethnicity", &["Black", "Asian"], false);
    let c = checkbox_group("Background", &["Asian", "Indigenous"], false);
    let out = merge_checkbox_groups(vec![a, b, c]);
    assert_eq!(out.len(), 1, "a chain of overlapping fragments collapses into one group");
    assert_eq!(out[0].label, "Race");
    assert_eq!(option_texts(&out[0]), vec!["White", "Black", "Asian", "Indigenous"]);
}

// ============================================================================
// Template
// ============================================================================

#[test]
fn merged_group_becomes_one_template_entry() {
    let fields = merge_checkbox_groups(dedupe_fields(vec![
        FieldDescriptor::new("email", "", "Email", FieldType::Email, true),
        checkbox_group("Please select all that apply", &["White", "Black"], false),
        checkbox_group("Hispanic or Latino", &["Black", "Hispanic"], false),
    ]));
    let template = build_template(&fields);

    assert_eq!(template.len(), 2);
    let race = &template[1];
    assert_eq!(race.id, "what_is_your_race_or_ethnicity", "label slug when no id or name");
    assert_eq!(race.question, RACE_QUESTION);
    assert_eq!(race.original_type, Some(FieldType::CheckboxGroup));
    assert_eq!(
        race.available_options,
        Some(vec!["White".to_string(), "Black".to_string(), "Hispanic".to_string()])
    );
    assert!(race.value.is_empty());
}

#[test]
fn template_round_trips_through_json() {
    let fields = vec![
        FieldDescriptor::new("email", "", "Email", FieldType::Email, true),
        FieldDescriptor::new("resume", "", "Resume", FieldType::File, true),
    ];
    let template = build_template(&fields);
    let json = serde_json::to_value(&template).unwrap();
    assert_eq!(json[0]["type"], "email");
    assert!(json[0].get("available_options").is_none(), "absent hints are omitted");
    let back: Vec<UserInputEntry> = serde_json::from_value(json).unwrap();
    assert_eq!(back, template);
}

#[test]
fn suffixed_template_ids_keep_the_control_id() {
    let fields = dedupe_fields(vec![
        FieldDescriptor::new("file", "", "Resume", FieldType::File, true),
        FieldDescriptor::new("file", "", "Cover Letter", FieldType::File, false),
        FieldDescriptor::new("", "", "Portfolio", FieldType::Url, false),
    ]);
    let template = build_template(&fields);
    let ids: Vec<&str> = template.iter().map(|e| e.id.as_str()).collect();
    assert_eq!(ids, vec!["file", "file_2", "portfolio"]);

    assert_eq!(template[0].source_id, None);
    assert_eq!(template[1].source_id.as_deref(), Some("file"));
    assert_eq!(template[1].control_id(), "file");
    assert_eq!(template[2].control_id(), "portfolio", "label slugs are their own id");

    let json = serde_json::to_value(&template).unwrap();
    assert!(json[0].get("source_id").is_none());
    assert_eq!(json[1]["source_id"], "file");
}

// ============================================================================
// Fingerprints
// ============================================================================

fn choices_page() -> SnapshotDocument {
    SnapshotDocument::new(
        "https://jobs.acme.com/apply",
        "Apply",
        body([
            input("email", "email", 50.0),
            el("input").attr("type", "checkbox").attr("name", "gender[]").attr("value", "woman").rect(LEFT, 100.0, 16.0, 16.0),
            el("input").attr("type", "checkbox").attr("name", "gender[]").attr("value", "man").rect(LEFT, 125.0, 16.0, 16.0),
            el("input").attr("type", "text").attr("name", "city").rect(LEFT, 150.0, 200.0, 30.0),
            el("input").attr("type", "text").rect(LEFT, 200.0, 200.0, 30.0),
        ]),
    )
}

#[test]
fn fingerprint_prefers_id_then_name_then_position() {
    let mut dom = SnapshotDom::new(choices_page());
    let inputs = dom.query_all(Scope::Page, &Selector::tag("input").into()).unwrap();
    assert_eq!(inputs.len(), 5);

    let prints: Vec<String> = inputs
        .iter()
        .map(|&n| Fingerprint::of(&mut dom, n).unwrap().to_string())
        .collect();
    assert_eq!(prints[0], "id:email");
    assert_eq!(prints[3], "name:city");
    assert_eq!(prints[4], "pos:20,200");
    assert_ne!(prints[1], prints[2], "choices sharing a name are told apart by value");
}

#[test]
fn control_identity_is_stable() {
    let mut dom = SnapshotDom::new(choices_page());
    let email = dom.find_by_id("email").unwrap();
    let first = control_identity(&mut dom, email).unwrap();
    let second = control_identity(&mut dom, email).unwrap();
    assert_eq!(first, second);
}
