use std::fmt;

use crate::browser::driver::{Driver, NodeId};
use crate::browser::error::DriverError;
use crate::form::normalize::text_fingerprint;

/// Stable structural identity of a control within one pass: `id:…`, else
/// `name:…`, else `pos:x,y`, else `class:…`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn of<D: Driver + ?Sized>(driver: &mut D, node: NodeId) -> Result<Self, DriverError> {
        if let Some(id) = driver.attribute(node, "id")?.filter(|v| !v.is_empty()) {
            return Ok(Fingerprint(format!("id:{}", id)));
        }
        if let Some(name) = driver.attribute(node, "name")?.filter(|v| !v.is_empty()) {
            // Choices of one group share a name; their value tells them apart.
            let input_type = driver.attr_or_empty(node, "type").to_lowercase();
            let value = driver.attr_or_empty(node, "value");
            if matches!(input_type.as_str(), "checkbox" | "radio") && !value.is_empty() {
                return Ok(Fingerprint(format!("name:{}={}", name, value)));
            }
            return Ok(Fingerprint(format!("name:{}", name)));
        }
        if let Some(rect) = driver.bounding_box(node)? {
            return Ok(Fingerprint(format!("pos:{},{}", rect.x.round(), rect.y.round())));
        }
        if let Some(class) = driver.attribute(node, "class")?.filter(|v| !v.is_empty()) {
            return Ok(Fingerprint(format!("class:{}", class)));
        }
        Ok(Fingerprint(format!("node:{}", node.0)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Digest identifying a clickable control by tag, structure and text, used
/// to click each control at most once.
pub fn control_identity<D: Driver + ?Sized>(driver: &mut D, node: NodeId) -> Result<String, DriverError> {
    let tag = driver.tag_name(node)?;
    let fingerprint = Fingerprint::of(driver, node)?;
    let text = driver.text_content(node)?;
    Ok(text_fingerprint(&format!("{}|{}|{}", tag, fingerprint, text.trim())))
}
