use tracing::{debug, warn};

use crate::browser::driver::{Driver, NodeId};
use crate::browser::selector::{Selector, SelectorList};
use crate::extract::context::ExtractionPass;
use crate::extract::label::{is_required, resolve_label};
use crate::form::error::FormError;
use crate::form::field_model::{FieldDescriptor, FieldType};
use crate::form::fingerprint::Fingerprint;

pub fn extract_textareas<D: Driver + ?Sized>(driver: &mut D, pass: &mut ExtractionPass) -> Vec<FieldDescriptor> {
    let selector = SelectorList::from(Selector::tag("textarea"));
    let candidates = match driver.query_all(pass.scope.container, &selector) {
        Ok(nodes) => nodes,
        Err(e) => {
            warn!(error = %e, "textarea scan failed");
            return Vec::new();
        }
    };
    let mut fields = Vec::new();
    for node in candidates {
        match textarea_field(driver, pass, node) {
            Ok(Some(field)) => fields.push(field),
            Ok(None) => {}
            Err(e) => debug!(node = node.0, error = %e, "textarea skipped"),
        }
    }
    fields
}

fn textarea_field<D: Driver + ?Sized>(
    driver: &mut D,
    pass: &mut ExtractionPass,
    node: NodeId,
) -> Result<Option<FieldDescriptor>, FormError> {
    let fingerprint = Fingerprint::of(driver, node)?;
    if pass.is_claimed(&fingerprint) {
        return Ok(None);
    }
    let id = driver.attr_or_empty(node, "id");
    let name = driver.attr_or_empty(node, "name");
    if id.is_empty() && name.is_empty() {
        return Ok(None);
    }
    let Some(label) = resolve_label(driver, pass, node)? else {
        return Err(FormError::LabelNotResolved {
            element: format!("textarea {}", fingerprint),
        });
    };
    let required = is_required(driver, pass.scope.document, node)?;
    pass.claim(fingerprint);
    Ok(Some(FieldDescriptor::new(&id, &name, &label, FieldType::Textarea, required)))
}
