//! One extraction run: navigate, find the form, run every extractor,
//! canonicalise and build the fill template.

use tracing::{debug, info, warn};

use crate::browser::driver::{Driver, LoadState, NodeId, Scope};
use crate::browser::selector::{Selector, SelectorList};
use crate::canonical::dedupe::{dedupe_fields, merge_checkbox_groups};
use crate::canonical::template::build_template;
use crate::cli::config::AppConfig;
use crate::extract::checkbox::extract_checkbox_groups;
use crate::extract::context::ExtractionPass;
use crate::extract::dropdown::extract_dropdowns;
use crate::extract::file::extract_file_fields;
use crate::extract::job_info::job_info;
use crate::extract::label::{is_required, resolve_label};
use crate::extract::options::native_options;
use crate::extract::phone::extract_phone_fields;
use crate::extract::text::{classify_text_type, extract_text_fields};
use crate::extract::textarea::extract_textareas;
use crate::form::error::FormError;
use crate::form::field_model::{ExtractionArtifact, FieldDescriptor, FieldType};
use crate::locate::navigation::arrive;
use crate::locate::overlay::dismiss_overlays;
use crate::locate::page_locator::locate_form;

/// Navigate to `url` and extract its application form.
pub fn extract_form<D: Driver + ?Sized>(
    driver: &mut D,
    url: &str,
    config: &AppConfig,
) -> Result<ExtractionArtifact, FormError> {
    let timeouts = &config.timeouts;
    arrive(
        driver,
        url,
        timeouts.navigation,
        config.extraction.navigation_attempts,
        timeouts.short_wait,
    )?;
    if let Err(e) = driver.wait_for_load(Scope::Page, LoadState::DomContentLoaded, timeouts.navigation) {
        debug!(error = %e, "load wait timed out");
    }
    extract_loaded_page(driver, url, config)
}

/// Extract from whatever page is currently loaded.
pub fn extract_loaded_page<D: Driver + ?Sized>(
    driver: &mut D,
    url: &str,
    config: &AppConfig,
) -> Result<ExtractionArtifact, FormError> {
    dismiss_overlays(driver, Scope::Page, &config.timeouts);

    let root = locate_form(driver, url, config);
    info!(url, iframe = root.context.is_iframe, found = root.found, "form root chosen");

    let mut pass = ExtractionPass::new(root.scope, &config.timeouts);
    let raw = collect_fields(driver, &mut pass);
    let fields = dedupe_fields(raw);
    let template = build_template(&fields);
    let job = job_info(driver, root.scope.document);

    let required_fields = fields.iter().filter(|f| f.required).count();
    info!(
        url,
        total = fields.len(),
        required = required_fields,
        title = %job.title,
        "extraction complete"
    );

    Ok(ExtractionArtifact {
        url: url.to_string(),
        timestamp: chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.6f").to_string(),
        job_title: job.title,
        company: job.company,
        form_context: root.context,
        total_fields: fields.len(),
        required_fields,
        fields,
        user_input_template: template,
    })
}

/// Run the extractors in their fixed order. Earlier ones claim controls so
/// later ones skip them.
pub fn collect_fields<D: Driver + ?Sized>(driver: &mut D, pass: &mut ExtractionPass) -> Vec<FieldDescriptor> {
    let mut fields = Vec::new();

    let phone = extract_phone_fields(driver, pass);
    let text = extract_text_fields(driver, pass);
    let dropdowns = extract_dropdowns(driver, pass);
    let files = extract_file_fields(driver, pass);
    let textareas = extract_textareas(driver, pass);
    let checkboxes = merge_checkbox_groups(extract_checkbox_groups(driver, pass));
    debug!(
        phone = phone.len(),
        text = text.len(),
        dropdowns = dropdowns.len(),
        files = files.len(),
        textareas = textareas.len(),
        checkbox_groups = checkboxes.len(),
        "extractor yields"
    );

    fields.extend(phone);
    fields.extend(text);
    fields.extend(dropdowns);
    fields.extend(files);
    fields.extend(textareas);
    fields.extend(checkboxes);

    if fields.is_empty() {
        warn!("no fields from the extractors, falling back to a basic scan");
        fields = fallback_fields(driver, pass);
    }
    fields
}

fn fallback_selectors() -> SelectorList {
    SelectorList::of([Selector::tag("input"), Selector::tag("textarea"), Selector::tag("select")])
}

const SKIPPED_INPUT_TYPES: &[&str] = &[
    "hidden", "submit", "button", "reset", "image", "checkbox", "radio", "file",
];

/// Basic fields for every visible labelled control with an id or name.
pub fn fallback_fields<D: Driver + ?Sized>(driver: &mut D, pass: &mut ExtractionPass) -> Vec<FieldDescriptor> {
    let controls = match driver.query_all(pass.scope.container, &fallback_selectors()) {
        Ok(nodes) => nodes,
        Err(e) => {
            warn!(error = %e, "fallback scan failed");
            return Vec::new();
        }
    };
    controls
        .into_iter()
        .filter_map(|node| match fallback_field(driver, pass, node) {
            Ok(field) => field,
            Err(e) => {
                debug!(node = node.0, error = %e, "fallback control skipped");
                None
            }
        })
        .collect()
}

fn fallback_field<D: Driver + ?Sized>(
    driver: &mut D,
    pass: &mut ExtractionPass,
    node: NodeId,
) -> Result<Option<FieldDescriptor>, FormError> {
    if !driver.is_visible(node) {
        return Ok(None);
    }
    let tag = driver.tag_name(node)?;
    let input_type = driver.attr_or_empty(node, "type").to_lowercase();
    if tag == "input" && SKIPPED_INPUT_TYPES.contains(&input_type.as_str()) {
        return Ok(None);
    }
    let id = driver.attr_or_empty(node, "id");
    let name = driver.attr_or_empty(node, "name");
    if id.is_empty() && name.is_empty() {
        return Ok(None);
    }
    let Some(label) = resolve_label(driver, pass, node)? else {
        return Ok(None);
    };
    let required = is_required(driver, pass.scope.document, node)?;

    let field = match tag.as_str() {
        "select" => FieldDescriptor::new(&id, &name, &label, FieldType::Dropdown, required)
            .with_options(native_options(driver, node)?, false),
        "textarea" => FieldDescriptor::new(&id, &name, &label, FieldType::Textarea, required),
        _ => FieldDescriptor::new(&id, &name, &label, classify_text_type(&input_type, &label), required),
    };
    Ok(Some(field))
}
