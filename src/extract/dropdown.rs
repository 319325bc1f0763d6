use std::collections::HashSet;

use tracing::{debug, warn};

use crate::browser::driver::{Driver, NodeId};
use crate::browser::selector::{Selector, SelectorList};
use crate::extract::context::ExtractionPass;
use crate::extract::label::{Proximity, is_required, nearest_text, resolve_structural, synthesize_label};
use crate::extract::options::{OptionHarvest, extract_options};
use crate::extract::phone::is_country_selector;
use crate::form::error::FormError;
use crate::form::field_model::{FieldDescriptor, FieldType};
use crate::form::fingerprint::Fingerprint;

fn dropdown_selectors() -> SelectorList {
    SelectorList::of([
        Selector::tag("select"),
        Selector::any().role("combobox"),
        Selector::tag("div").attr_eq("aria-haspopup", "listbox"),
        Selector::tag("div").attr("aria-expanded"),
        Selector::any().class("custom-select"),
        Selector::any().class("form-select"),
    ])
}

/// Native selects and custom combobox widgets.
pub fn extract_dropdowns<D: Driver + ?Sized>(driver: &mut D, pass: &mut ExtractionPass) -> Vec<FieldDescriptor> {
    let candidates = match driver.query_all(pass.scope.container, &dropdown_selectors()) {
        Ok(nodes) => nodes,
        Err(e) => {
            warn!(error = %e, "dropdown scan failed");
            return Vec::new();
        }
    };

    let mut seen = HashSet::new();
    let mut fields = Vec::new();
    for node in candidates {
        match dropdown_field(driver, pass, node, &mut seen) {
            Ok(Some(field)) => fields.push(field),
            Ok(None) => {}
            Err(e) if e.is_fatal() => {
                warn!(error = %e, "dropdown scan aborted");
                break;
            }
            Err(e) => debug!(node = node.0, error = %e, "dropdown skipped"),
        }
    }
    fields
}

fn dropdown_field<D: Driver + ?Sized>(
    driver: &mut D,
    pass: &mut ExtractionPass,
    node: NodeId,
    seen: &mut HashSet<Fingerprint>,
) -> Result<Option<FieldDescriptor>, FormError> {
    if !driver.is_visible(node) {
        return Ok(None);
    }
    let fingerprint = Fingerprint::of(driver, node)?;
    if pass.is_claimed(&fingerprint) || !seen.insert(fingerprint.clone()) {
        return Ok(None);
    }
    if pass.phone_country_claimed() && is_country_selector(driver, node)? {
        return Ok(None);
    }

    let id = driver.attr_or_empty(node, "id");
    let name = driver.attr_or_empty(node, "name");
    let label = match resolve_structural(driver, pass, node)? {
        Some(label) => Some(label),
        None => match nearest_text(driver, pass, node, Proximity::aligned(100.0))? {
            Some(label) => Some(label),
            None => synthesize_label(&id, &name),
        },
    };
    let Some(label) = label else {
        return Err(FormError::LabelNotResolved {
            element: format!("dropdown {}", fingerprint),
        });
    };
    let required = is_required(driver, pass.scope.document, node)?;

    let harvest = match extract_options(driver, pass, node) {
        Ok(harvest) => harvest,
        Err(e) if e.is_fatal() => return Err(e),
        Err(e) => {
            warn!(label = %label, error = %e, "options unavailable, field kept as free text");
            OptionHarvest::default()
        }
    };
    debug!(label = %label, options = harvest.options.len(), dynamic = harvest.dynamic, "dropdown");

    pass.claim(fingerprint);
    Ok(Some(
        FieldDescriptor::new(&id, &name, &label, FieldType::Dropdown, required)
            .with_options(harvest.options, harvest.dynamic),
    ))
}
