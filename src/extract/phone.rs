//! Phone inputs, with or without a country-code selector beside them.

use tracing::{debug, warn};

use crate::browser::driver::{Driver, NodeId, Scope};
use crate::browser::selector::{Selector, SelectorList};
use crate::extract::context::ExtractionPass;
use crate::extract::label::{is_required, resolve_label};
use crate::extract::options::extract_options;
use crate::form::error::FormError;
use crate::form::field_model::{FieldDescriptor, FieldType};
use crate::form::fingerprint::Fingerprint;
use crate::form::normalize::clean_label;

const COUNTRY_SEARCH_DEPTH: usize = 4;
const MAX_COUNTRY_OPTIONS: usize = 10;
const COUNTRY_MARKERS: &[&str] = &["country", "+1", "+44", "+49", "+353", "selected country", "dial code"];

fn phone_input_selectors() -> SelectorList {
    SelectorList::of([
        Selector::tag("input").attr_eq("type", "tel"),
        Selector::tag("input").attr_eq("type", "text"),
        Selector::tag("input").without("type"),
    ])
}

fn country_selector_candidates() -> SelectorList {
    SelectorList::of([Selector::any().role("combobox"), Selector::tag("select")])
}

/// Composite phone fields first, then standalone `tel` inputs.
pub fn extract_phone_fields<D: Driver + ?Sized>(driver: &mut D, pass: &mut ExtractionPass) -> Vec<FieldDescriptor> {
    let candidates = match driver.query_all(pass.scope.container, &phone_input_selectors()) {
        Ok(nodes) => nodes,
        Err(e) => {
            warn!(error = %e, "phone field scan failed");
            return Vec::new();
        }
    };

    let mut fields = Vec::new();
    for node in candidates {
        match phone_field(driver, pass, node) {
            Ok(Some(field)) => fields.push(field),
            Ok(None) => {}
            Err(e) => debug!(node = node.0, error = %e, "phone field skipped"),
        }
    }
    fields
}

fn phone_field<D: Driver + ?Sized>(
    driver: &mut D,
    pass: &mut ExtractionPass,
    node: NodeId,
) -> Result<Option<FieldDescriptor>, FormError> {
    let input_type = driver.attr_or_empty(node, "type").to_lowercase();
    if input_type != "tel" && !looks_like_phone(driver, node) {
        return Ok(None);
    }
    let fingerprint = Fingerprint::of(driver, node)?;
    if pass.is_claimed(&fingerprint) || !driver.is_visible(node) {
        return Ok(None);
    }

    let Some((selector, holder)) = find_country_selector(driver, node)? else {
        if input_type != "tel" {
            // Plain text inputs named "phone" are left to the text pass.
            return Ok(None);
        }
        return standalone_phone(driver, pass, node, fingerprint).map(Some);
    };

    let id = driver.attr_or_empty(node, "id");
    let name = driver.attr_or_empty(node, "name");
    let label = match resolve_label(driver, pass, node)? {
        Some(label) => label,
        None => holder_label(driver, holder)?.unwrap_or_else(|| "Phone".to_string()),
    };
    let required = is_required(driver, pass.scope.document, node)?;

    let selector_fp = Fingerprint::of(driver, selector)?;
    let country_options = match extract_options(driver, pass, selector) {
        Ok(harvest) => harvest.options.into_iter().take(MAX_COUNTRY_OPTIONS).collect(),
        Err(e) => {
            warn!(label = %label, error = %e, "country options unavailable");
            Vec::new()
        }
    };

    pass.claim(fingerprint);
    pass.claim(selector_fp);
    pass.mark_phone_country_claimed();

    let mut field = FieldDescriptor::new(&id, &name, &label, FieldType::Phone, required);
    field.country_selector = Some(true);
    field.country_options = country_options;
    Ok(Some(field))
}

fn standalone_phone<D: Driver + ?Sized>(
    driver: &mut D,
    pass: &mut ExtractionPass,
    node: NodeId,
    fingerprint: Fingerprint,
) -> Result<FieldDescriptor, FormError> {
    let id = driver.attr_or_empty(node, "id");
    let name = driver.attr_or_empty(node, "name");
    let Some(label) = resolve_label(driver, pass, node)? else {
        return Err(FormError::LabelNotResolved {
            element: format!("tel input {}", fingerprint),
        });
    };
    let required = is_required(driver, pass.scope.document, node)?;
    pass.claim(fingerprint);

    let mut field = FieldDescriptor::new(&id, &name, &label, FieldType::Phone, required);
    field.country_selector = Some(false);
    Ok(field)
}

fn looks_like_phone<D: Driver + ?Sized>(driver: &mut D, node: NodeId) -> bool {
    let haystack = format!(
        "{} {} {}",
        driver.attr_or_empty(node, "name"),
        driver.attr_or_empty(node, "id"),
        driver.attr_or_empty(node, "placeholder")
    )
    .to_lowercase();
    haystack.contains("phone") || haystack.contains("mobile") || haystack.contains("tel")
}

/// Walk up from the phone input looking for a sibling country selector.
/// Returns the selector and the ancestor that holds both.
fn find_country_selector<D: Driver + ?Sized>(
    driver: &mut D,
    input: NodeId,
) -> Result<Option<(NodeId, NodeId)>, FormError> {
    let candidates = country_selector_candidates();
    for ancestor in driver.ancestors(input, COUNTRY_SEARCH_DEPTH) {
        for candidate in driver.query_all(Scope::Element(ancestor), &candidates)? {
            if candidate != input && is_country_selector(driver, candidate)? {
                return Ok(Some((candidate, ancestor)));
            }
        }
    }
    Ok(None)
}

/// A select or combobox whose text or attributes mention a country or a
/// dial code.
pub fn is_country_selector<D: Driver + ?Sized>(driver: &mut D, node: NodeId) -> Result<bool, FormError> {
    let mut haystack = driver.text_content(node)?;
    for attr in ["name", "id", "aria-label"] {
        haystack.push(' ');
        haystack.push_str(&driver.attr_or_empty(node, attr));
    }
    let lower = haystack.to_lowercase();
    Ok(COUNTRY_MARKERS.iter().any(|m| lower.contains(m)))
}

/// First short line of the holder that names a phone.
fn holder_label<D: Driver + ?Sized>(driver: &mut D, holder: NodeId) -> Result<Option<String>, FormError> {
    let text = driver.text_content(holder)?;
    let label = text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .take(3)
        .find(|l| {
            let lower = l.to_lowercase();
            l.chars().count() < 50
                && (lower.contains("phone") || lower.contains("mobile") || lower.contains("telephone"))
        })
        .map(clean_label);
    Ok(label)
}
