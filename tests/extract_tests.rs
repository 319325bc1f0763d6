use job_form_automator::browser::driver::Key;
use job_form_automator::browser::snapshot::{SnapshotDocument, SnapshotDom};
use job_form_automator::extract::job_info::UNKNOWN_COMPANY;
use job_form_automator::form::field_model::{
    ExtractionArtifact, FieldDescriptor, FieldOption, FieldType, OptionsNote, WaitStrategy,
};
use job_form_automator::{Driver, extract_form, extract_loaded_page};

use crate::common::pages::{
    GENDER_CHOICES, GREENHOUSE_SRC, HOST_URL, POSTING_URL, application_page, page_with_cookie_banner,
    two_iframe_page,
};
use crate::common::{LEFT, WIDTH, body, config, el, labelled_input, submit_button};

mod common;

fn extract(page: SnapshotDocument) -> (ExtractionArtifact, SnapshotDom) {
    let url = page.url.clone();
    let mut dom = SnapshotDom::new(page);
    let artifact = extract_loaded_page(&mut dom, &url, &config()).expect("extraction should succeed");
    (artifact, dom)
}

fn field<'a>(artifact: &'a ExtractionArtifact, id: &str) -> &'a FieldDescriptor {
    artifact
        .fields
        .iter()
        .find(|f| f.id == id)
        .unwrap_or_else(|| panic!("no field '{}' in {:?}", id, artifact.fields.iter().map(|f| &f.id).collect::<Vec<_>>()))
}

// ============================================================================
// Main-document extraction
// ============================================================================

#[test]
fn every_question_is_extracted_once_in_extractor_order() {
    let (artifact, _) = extract(application_page());
    let ids: Vec<&str> = artifact.fields.iter().map(|f| f.id.as_str()).collect();
    assert_eq!(
        ids,
        vec![
            "first_name",
            "email",
            "country",
            "location",
            "resume_cv",
            "why_acme",
            "what_is_your_gender_identity",
        ],
        "text, dropdown, file, textarea and checkbox passes should run in that order"
    );
    assert_eq!(artifact.total_fields, 7);
}

#[test]
fn labels_are_cleaned_and_required_markers_detected() {
    let (artifact, _) = extract(application_page());

    let first = field(&artifact, "first_name");
    assert_eq!(first.label, "First Name", "asterisk should be stripped from the label");
    assert!(first.required, "asterisk in the label marks the field required");
    assert_eq!(first.field_type, FieldType::Text);

    let email = field(&artifact, "email");
    assert_eq!(email.field_type, FieldType::Email);
    assert!(!email.required);

    assert_eq!(artifact.required_fields, 2, "first name and the resume upload are required");
}

#[test]
fn native_select_options_skip_the_placeholder() {
    let (artifact, _) = extract(application_page());
    let country = field(&artifact, "country");
    assert_eq!(country.field_type, FieldType::Dropdown);
    assert_eq!(
        country.options,
        Some(vec![FieldOption::new("USA", "usa"), FieldOption::new("Canada", "canada")])
    );
    assert_eq!(country.options_note, Some(OptionsNote::Exhaustive));
}

#[test]
fn custom_combobox_is_opened_and_harvested() {
    let (artifact, mut dom) = extract(application_page());
    let location = field(&artifact, "location");
    assert_eq!(location.label, "Location");
    let texts: Vec<&str> = location.options.iter().flatten().map(|o| o.text.as_str()).collect();
    assert_eq!(texts, vec!["London", "Berlin", "Remote"]);
    assert_eq!(location.options.as_ref().unwrap()[0].value, "london", "options without a value get a slug");
    assert_eq!(location.options_note, Some(OptionsNote::Exhaustive));

    let list = dom.find_by_id("location-list").unwrap();
    assert!(
        !dom.is_visible(list),
        "the listbox must be closed again after harvesting"
    );
}

fn school_page() -> SnapshotDocument {
    let y = 400.0;
    let row = |i: usize, text: &str| {
        el("li")
            .attr("role", "option")
            .text(text)
            .rect(LEFT, y + 35.0 + 25.0 * i as f64, WIDTH, 20.0)
    };
    SnapshotDocument::new(
        POSTING_URL,
        "Apply",
        body([el("form").id("application").rect(0.0, 100.0, 800.0, 600.0).children([
            labelled_input("first_name", "text", "First Name", 150.0),
            labelled_input("email", "email", "Email", 220.0),
            el("label").id("school-label").text("School").rect(LEFT, y - 25.0, 200.0, 20.0),
            el("div")
                .id("school")
                .attr("role", "combobox")
                .attr("aria-labelledby", "school-label")
                .attr("aria-controls", "school-list")
                .attr("aria-expanded", "false")
                .rect(LEFT, y, WIDTH, 30.0),
            el("ul")
                .id("school-list")
                .attr("role", "listbox")
                .rect(LEFT, y + 35.0, WIDTH, 150.0)
                .hidden()
                .children([
                    row(0, "Acme Polytechnic"),
                    row(1, "Harbor Technical"),
                    row(2, "Northfield Academy"),
                    row(3, "Riverside Academy").lazy(),
                    row(4, "Westgate Polytechnic").lazy(),
                ]),
        ])]),
    )
}

#[test]
fn dropdown_that_grows_on_scroll_is_a_sample() {
    let (artifact, mut dom) = extract(school_page());
    let school = field(&artifact, "school");
    let texts: Vec<&str> = school.options.iter().flatten().map(|o| o.text.as_str()).collect();
    assert_eq!(texts, vec!["Acme Polytechnic", "Harbor Technical", "Northfield Academy"]);
    assert_eq!(school.options_note, Some(OptionsNote::SampleFreeText));
    assert!(school.supports_custom_input);
    assert!(dom.log().keys.contains(&Key::End), "dropdown is scrolled with End");

    let list = dom.find_by_id("school-list").unwrap();
    assert!(!dom.is_visible(list), "closed again after scrolling");
}

#[test]
fn static_listbox_stays_exhaustive_after_scrolling() {
    let (artifact, dom) = extract(application_page());
    assert!(dom.log().keys.contains(&Key::End));
    assert_eq!(field(&artifact, "location").options_note, Some(OptionsNote::Exhaustive));
}

#[test]
fn checkbox_group_becomes_one_dropdown_with_its_question() {
    let (artifact, _) = extract(application_page());
    let gender = field(&artifact, "what_is_your_gender_identity");
    assert_eq!(gender.label, "What is your gender identity?");
    assert_eq!(gender.name, "gender", "name prefix drops the [] suffix");
    assert_eq!(gender.field_type, FieldType::Dropdown);
    assert_eq!(gender.original_type, Some(FieldType::CheckboxGroup));

    let texts: Vec<&str> = gender.options.iter().flatten().map(|o| o.text.as_str()).collect();
    assert_eq!(texts, GENDER_CHOICES.to_vec());
}

#[test]
fn upload_group_reports_methods_and_accepted_types() {
    let (artifact, _) = extract(application_page());
    let resume = field(&artifact, "resume_cv");
    assert_eq!(resume.field_type, FieldType::File);
    assert_eq!(resume.label, "Resume/CV");
    assert!(resume.required);
    assert_eq!(resume.upload_options, vec!["Attach".to_string()]);
    assert_eq!(resume.accepted_types.as_deref(), Some("pdf, docx"));
}

#[test]
fn textarea_uses_its_associated_label() {
    let (artifact, _) = extract(application_page());
    let why = field(&artifact, "why_acme");
    assert_eq!(why.field_type, FieldType::Textarea);
    assert_eq!(why.label, "Why do you want to work at Acme?");
}

#[test]
fn job_title_and_company_come_from_heading_and_page_title() {
    let (artifact, _) = extract(application_page());
    assert_eq!(artifact.job_title, "Senior Engineer");
    assert_eq!(artifact.company, "Acme");
}

#[test]
fn template_mirrors_fields_with_guidance() {
    let (artifact, _) = extract(application_page());
    assert_eq!(artifact.user_input_template.len(), artifact.fields.len());

    let country = artifact.user_input_template.iter().find(|e| e.id == "country").unwrap();
    assert_eq!(country.available_options, Some(vec!["USA".to_string(), "Canada".to_string()]));
    assert_eq!(country.note.as_deref(), Some("Select from the available options."));
    assert!(country.value.is_empty(), "values are left for the user");

    let gender = artifact
        .user_input_template
        .iter()
        .find(|e| e.id == "what_is_your_gender_identity")
        .unwrap();
    assert_eq!(gender.original_type, Some(FieldType::CheckboxGroup));

    let resume = artifact.user_input_template.iter().find(|e| e.id == "resume_cv").unwrap();
    assert_eq!(resume.upload_methods, Some(vec!["Attach".to_string()]));
}

#[test]
fn main_document_context_waits_for_network_idle() {
    let (artifact, _) = extract(application_page());
    assert!(!artifact.form_context.is_iframe);
    assert_eq!(artifact.form_context.iframe_src, None);
    assert_eq!(artifact.form_context.wait_strategy, WaitStrategy::NetworkIdle);
}

// ============================================================================
// Iframe-hosted forms
// ============================================================================

#[test]
fn greenhouse_iframe_form_is_extracted_with_its_context() {
    let (artifact, _) = extract(two_iframe_page());
    assert_eq!(artifact.url, HOST_URL);
    assert!(artifact.form_context.is_iframe);
    assert_eq!(artifact.form_context.iframe_src.as_deref(), Some(GREENHOUSE_SRC));
    assert_eq!(
        artifact.form_context.iframe_selector.as_deref(),
        Some("iframe[src*=\"greenhouse\"]")
    );
    assert_eq!(artifact.form_context.iframe_index, Some(1));
    assert_eq!(artifact.form_context.wait_strategy, WaitStrategy::DomContentLoaded);
    assert_eq!(artifact.total_fields, 7, "fields come from the iframe document");
}

#[test]
fn job_info_falls_back_to_the_host_page() {
    let (artifact, _) = extract(two_iframe_page());
    assert_eq!(artifact.job_title, "Senior Engineer", "heading is on the host page, not in the frame");
    assert_eq!(artifact.company, UNKNOWN_COMPANY);
}

#[test]
fn extraction_is_repeatable_on_the_same_page() {
    let mut dom = SnapshotDom::new(application_page());
    let first = extract_loaded_page(&mut dom, POSTING_URL, &config()).unwrap();
    let second = extract_loaded_page(&mut dom, POSTING_URL, &config()).unwrap();
    assert_eq!(first.total_fields, 7);
    assert_eq!(first.fields, second.fields);
    assert_eq!(first.user_input_template, second.user_input_template);
}

#[test]
fn iframe_extraction_is_repeatable() {
    let mut dom = SnapshotDom::new(two_iframe_page());
    let first = extract_loaded_page(&mut dom, HOST_URL, &config()).unwrap();
    let second = extract_loaded_page(&mut dom, HOST_URL, &config()).unwrap();
    assert_eq!(first.fields, second.fields);
    assert_eq!(first.form_context, second.form_context);
}

// ============================================================================
// Composite phone fields
// ============================================================================

fn phone_page() -> SnapshotDocument {
    let y = 150.0;
    let dial_codes = el("select")
        .id("phone_country")
        .attr("name", "phone_country")
        .rect(LEFT, y, 120.0, 30.0)
        .children([
            el("option").attr("value", "us").text("+1 United States"),
            el("option").attr("value", "gb").text("+44 United Kingdom"),
            el("option").attr("value", "de").text("+49 Germany"),
        ]);
    let number = el("input")
        .id("phone")
        .attr("name", "phone")
        .attr("type", "tel")
        .rect(LEFT + 130.0, y, 270.0, 30.0);
    SnapshotDocument::new(
        POSTING_URL,
        "Apply",
        body([el("form").rect(0.0, 100.0, 800.0, 400.0).children([
            el("div").attr("class", "phone-field").rect(LEFT, y - 25.0, WIDTH, 60.0).children([
                el("label").attr("for", "phone").text("Phone *").rect(LEFT, y - 25.0, 200.0, 20.0),
                dial_codes,
                number,
            ]),
            labelled_input("first_name", "text", "First Name", 250.0),
            submit_button(350.0),
        ])]),
    )
}

#[test]
fn phone_with_country_selector_is_one_field() {
    let (artifact, _) = extract(phone_page());
    let phone = field(&artifact, "phone");
    assert_eq!(phone.field_type, FieldType::Phone);
    assert_eq!(phone.label, "Phone");
    assert!(phone.required);
    assert_eq!(phone.country_selector, Some(true));
    assert_eq!(phone.country_options.len(), 3);

    assert!(
        artifact.fields.iter().all(|f| f.id != "phone_country"),
        "the dial-code selector must not be emitted as its own dropdown"
    );
    let entry = artifact.user_input_template.iter().find(|e| e.id == "phone").unwrap();
    assert_eq!(entry.has_country_selector, Some(true));
    assert_eq!(
        entry.sample_countries,
        Some(vec![
            "+1 United States".to_string(),
            "+44 United Kingdom".to_string(),
            "+49 Germany".to_string()
        ])
    );
}

// ============================================================================
// Navigation and overlays
// ============================================================================

#[test]
fn extract_form_navigates_first() {
    let mut dom = SnapshotDom::new(application_page());
    let artifact = extract_form(&mut dom, POSTING_URL, &config()).unwrap();
    assert_eq!(dom.log().navigations, vec![POSTING_URL.to_string()]);
    assert_eq!(artifact.total_fields, 7);
}

#[test]
fn failed_navigation_continues_on_the_loaded_page() {
    let mut dom = SnapshotDom::new(application_page());
    let missing = "https://jobs.acme.com/moved";
    let artifact = extract_form(&mut dom, missing, &config()).expect("a live page is still usable");
    assert_eq!(artifact.url, missing);
    assert_eq!(artifact.total_fields, 7);
    assert!(dom.log().navigations.is_empty(), "no navigation succeeded");
}

#[test]
fn cookie_banner_is_accepted_not_rejected() {
    let (artifact, dom) = extract(page_with_cookie_banner());
    let accept = dom.find_by_id("accept-cookies").unwrap();
    let reject = dom.find_by_id("reject-cookies").unwrap();
    assert!(dom.log().clicks.contains(&accept), "accept button should be clicked");
    assert!(!dom.log().clicks.contains(&reject), "reject button must never be clicked");
    assert_eq!(artifact.total_fields, 7);
}

#[test]
fn snapshot_round_trips_through_json() {
    let json = serde_json::to_string(&application_page()).unwrap();
    let mut dom = SnapshotDom::from_json(&json).unwrap();
    let artifact = extract_loaded_page(&mut dom, POSTING_URL, &config()).unwrap();
    assert_eq!(artifact.total_fields, 7);
}
