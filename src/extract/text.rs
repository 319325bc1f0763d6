use tracing::{debug, warn};

use crate::browser::driver::{BoundingBox, Driver, NodeId, Scope};
use crate::browser::selector::{Selector, SelectorList};
use crate::extract::context::ExtractionPass;
use crate::extract::label::{Proximity, is_required, nearest_text, resolve_structural, synthesize_label};
use crate::form::error::FormError;
use crate::form::field_model::{FieldDescriptor, FieldType};
use crate::form::fingerprint::Fingerprint;
use crate::form::normalize::clean_label;

/// Helper inputs rendered next to a combobox sit this close to it.
const SHADOW_INPUT_DISTANCE: f64 = 50.0;
const MAX_UNNAMED_LABEL_CHARS: usize = 100;

fn text_selectors() -> SelectorList {
    SelectorList::of([
        Selector::tag("input").attr_eq("type", "text"),
        Selector::tag("input").attr_eq("type", "email"),
        Selector::tag("input").attr_eq("type", "tel"),
        Selector::tag("input").attr_eq("type", "url"),
        Selector::tag("input").without("type"),
        Selector::any().attr_eq("contenteditable", "true"),
    ])
}

fn combobox_selectors() -> SelectorList {
    SelectorList::of([Selector::tag("select"), Selector::any().role("combobox")])
}

/// Text, email, url and tel inputs plus contenteditable regions.
pub fn extract_text_fields<D: Driver + ?Sized>(driver: &mut D, pass: &mut ExtractionPass) -> Vec<FieldDescriptor> {
    let candidates = match driver.query_all(pass.scope.container, &text_selectors()) {
        Ok(nodes) => nodes,
        Err(e) => {
            warn!(error = %e, "text field scan failed");
            return Vec::new();
        }
    };
    let comboboxes = combobox_rects(driver, pass.scope.document);

    let mut fields = Vec::new();
    for node in candidates {
        match text_field(driver, pass, node, &comboboxes) {
            Ok(Some(field)) => fields.push(field),
            Ok(None) => {}
            Err(e) => debug!(node = node.0, error = %e, "text field skipped"),
        }
    }
    fields
}

fn combobox_rects<D: Driver + ?Sized>(driver: &mut D, document: Scope) -> Vec<BoundingBox> {
    let nodes = driver.query_all(document, &combobox_selectors()).unwrap_or_default();
    nodes
        .into_iter()
        .filter_map(|n| driver.bounding_box(n).ok().flatten())
        .collect()
}

fn text_field<D: Driver + ?Sized>(
    driver: &mut D,
    pass: &mut ExtractionPass,
    node: NodeId,
    comboboxes: &[BoundingBox],
) -> Result<Option<FieldDescriptor>, FormError> {
    if driver.attribute(node, "role")?.as_deref() == Some("combobox") {
        return Ok(None);
    }
    let fingerprint = Fingerprint::of(driver, node)?;
    if pass.is_claimed(&fingerprint) {
        return Ok(None);
    }
    let Some(rect) = driver.bounding_box(node)? else {
        return Ok(None);
    };
    if rect.width <= 1.0 || rect.height <= 1.0 {
        return Ok(None);
    }
    let _ = driver.scroll_into_view(node);

    let id = driver.attr_or_empty(node, "id");
    let name = driver.attr_or_empty(node, "name");
    let input_type = driver.attr_or_empty(node, "type").to_lowercase();

    let label = match resolve_structural(driver, pass, node)? {
        Some(label) => Some(label),
        None => {
            let placeholder = clean_label(&driver.attr_or_empty(node, "placeholder"));
            if !placeholder.is_empty() {
                Some(placeholder)
            } else {
                match nearest_text(driver, pass, node, Proximity::aligned(150.0))? {
                    Some(label) => Some(label),
                    None => synthesize_label(&id, &name),
                }
            }
        }
    };
    let Some(label) = label else {
        return Err(FormError::LabelNotResolved {
            element: format!("text input {}", fingerprint),
        });
    };

    if id.is_empty() && name.is_empty() && label.chars().count() > MAX_UNNAMED_LABEL_CHARS {
        return Ok(None);
    }
    if inside_dropdown_widget(driver, node)? {
        return Ok(None);
    }
    if comboboxes.iter().any(|c| c.manhattan(&rect) < SHADOW_INPUT_DISTANCE) {
        debug!(label = %label, "input next to a combobox treated as helper");
        return Ok(None);
    }

    let field_type = classify_text_type(&input_type, &label);
    let required = is_required(driver, pass.scope.document, node)?;
    pass.claim(fingerprint);
    Ok(Some(FieldDescriptor::new(&id, &name, &label, field_type, required)))
}

fn inside_dropdown_widget<D: Driver + ?Sized>(driver: &mut D, node: NodeId) -> Result<bool, FormError> {
    let Some(parent) = driver.parent(node)? else {
        return Ok(false);
    };
    let class = driver.attr_or_empty(parent, "class").to_lowercase();
    Ok(["dropdown", "select", "combobox"].iter().any(|k| class.contains(k)))
}

/// Subtype from the `type` attribute, else from label keywords.
pub fn classify_text_type(input_type: &str, label: &str) -> FieldType {
    match input_type {
        "email" => return FieldType::Email,
        "tel" => return FieldType::Phone,
        "url" => return FieldType::Url,
        _ => {}
    }
    let lower = label.to_lowercase();
    if lower.contains("email") {
        FieldType::Email
    } else if lower.contains("phone") || lower.contains("mobile") {
        FieldType::Phone
    } else if ["linkedin", "website", "url", "portfolio", "github"]
        .iter()
        .any(|k| lower.contains(k))
    {
        FieldType::Url
    } else {
        FieldType::Text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_attribute_wins_over_label() {
        assert_eq!(classify_text_type("email", "Contact"), FieldType::Email);
        assert_eq!(classify_text_type("tel", "Contact"), FieldType::Phone);
    }

    #[test]
    fn label_keywords_classify_plain_inputs() {
        assert_eq!(classify_text_type("text", "Email address"), FieldType::Email);
        assert_eq!(classify_text_type("", "Mobile number"), FieldType::Phone);
        assert_eq!(classify_text_type("text", "LinkedIn Profile"), FieldType::Url);
        assert_eq!(classify_text_type("text", "First Name"), FieldType::Text);
    }
}
