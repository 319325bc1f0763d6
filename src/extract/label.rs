//! Label resolution shared by every extractor.
//!
//! Strategies run in order and the first plausible hit wins:
//! explicit `label[for]` association, nearest text above or to the left,
//! a `label`/`fieldset` ancestor, and finally a title-cased id or name.

use tracing::trace;

use crate::browser::driver::{BoundingBox, Driver, NodeId, Scope};
use crate::browser::error::DriverError;
use crate::browser::selector::{Selector, SelectorList};
use crate::extract::context::ExtractionPass;
use crate::extract::vocabulary::{LABEL_JUNK, is_answer_text, is_placeholder};
use crate::form::normalize::{clean_label, contains_any, title_case_identifier};

const MAX_LABEL_CHARS: usize = 200;
const ANCESTOR_DEPTH: usize = 3;

/// Geometry accepted by the nearest-text strategy.
#[derive(Debug, Clone, Copy)]
pub struct Proximity {
    /// Largest gap between the text's bottom edge and the control's top.
    pub max_gap_above: f64,
    /// Largest horizontal offset for text above; None requires overlap.
    pub max_dx_above: Option<f64>,
    /// Vertical tolerance for text to the left.
    pub max_dy_left: f64,
    pub max_gap_left: f64,
}

impl Proximity {
    /// Used by the resolver itself: text above must overlap horizontally.
    pub const LABEL: Proximity = Proximity {
        max_gap_above: 200.0,
        max_dx_above: None,
        max_dy_left: 30.0,
        max_gap_left: 200.0,
    };

    /// Looser lookup used after placeholders, aligned by left edge.
    pub const fn aligned(max_dx: f64) -> Proximity {
        Proximity {
            max_gap_above: 200.0,
            max_dx_above: Some(max_dx),
            max_dy_left: 30.0,
            max_gap_left: 200.0,
        }
    }
}

/// Full resolver chain, including the id/name synthesis fallback.
pub fn resolve_label<D: Driver + ?Sized>(
    driver: &mut D,
    pass: &mut ExtractionPass,
    node: NodeId,
) -> Result<Option<String>, DriverError> {
    if let Some(label) = resolve_structural(driver, pass, node)? {
        return Ok(Some(label));
    }
    let id = driver.attr_or_empty(node, "id");
    let name = driver.attr_or_empty(node, "name");
    Ok(synthesize_label(&id, &name))
}

/// Strategies 1–3: association, nearest text, ancestor.
pub fn resolve_structural<D: Driver + ?Sized>(
    driver: &mut D,
    pass: &mut ExtractionPass,
    node: NodeId,
) -> Result<Option<String>, DriverError> {
    let id = driver.attr_or_empty(node, "id");
    if let Some(label) = label_for_id(driver, pass.scope.document, &id)? {
        return Ok(Some(label));
    }
    if let Some(label) = nearest_text(driver, pass, node, Proximity::LABEL)? {
        return Ok(Some(label));
    }
    ancestor_label(driver, node)
}

/// Text of `label[for=id]`, cleaned.
pub fn label_for_id<D: Driver + ?Sized>(
    driver: &mut D,
    document: Scope,
    id: &str,
) -> Result<Option<String>, DriverError> {
    if id.is_empty() {
        return Ok(None);
    }
    let selector = SelectorList::from(Selector::tag("label").attr_eq("for", id));
    let Some(label) = driver.query(document, &selector)? else {
        return Ok(None);
    };
    let text = clean_label(&driver.text_content(label)?);
    Ok((!text.is_empty()).then_some(text))
}

/// Closest plausible text block above or to the left of the control.
pub fn nearest_text<D: Driver + ?Sized>(
    driver: &mut D,
    pass: &mut ExtractionPass,
    node: NodeId,
    proximity: Proximity,
) -> Result<Option<String>, DriverError> {
    let Some(rect) = driver.bounding_box(node)? else {
        return Ok(None);
    };
    let blocks = pass.text_blocks(driver)?;

    let mut best: Option<(f64, String)> = None;
    for block in blocks {
        let Some(distance) = placement_distance(&block.rect, &rect, proximity) else {
            continue;
        };
        if best.as_ref().is_some_and(|(d, _)| *d <= distance) {
            continue;
        }
        let cleaned = clean_label(&block.text);
        if is_plausible_label(&cleaned) {
            best = Some((distance, cleaned));
        }
    }
    if let Some((distance, label)) = &best {
        trace!(label = %label, distance, "label from nearby text");
    }
    Ok(best.map(|(_, label)| label))
}

/// Distance of a text box placed above or left of `control`, or None when
/// it is in neither position.
fn placement_distance(text: &BoundingBox, control: &BoundingBox, p: Proximity) -> Option<f64> {
    let gap_above = control.y - text.bottom();
    if gap_above >= -5.0 && gap_above <= p.max_gap_above {
        let aligned = match p.max_dx_above {
            None => text.horizontal_overlap(control) > 0.0,
            Some(max_dx) => (text.x - control.x).abs() < max_dx,
        };
        if aligned {
            return Some(gap_above.max(0.0) + (text.x - control.x).abs() * 0.1);
        }
    }
    let gap_left = control.x - text.right();
    if gap_left >= -5.0 && gap_left <= p.max_gap_left && (text.y - control.y).abs() <= p.max_dy_left {
        return Some(gap_left.max(0.0) + 10.0);
    }
    None
}

/// Text of the nearest `label` or `fieldset` among the first ancestors.
pub fn ancestor_label<D: Driver + ?Sized>(driver: &mut D, node: NodeId) -> Result<Option<String>, DriverError> {
    for ancestor in driver.ancestors(node, ANCESTOR_DEPTH) {
        let tag = driver.tag_name(ancestor)?;
        let text = match tag.as_str() {
            "label" => driver.text_content(ancestor)?,
            "fieldset" => {
                let legend = SelectorList::from(Selector::tag("legend"));
                match driver.query(Scope::Element(ancestor), &legend)? {
                    Some(legend) => driver.text_content(legend)?,
                    None => first_line(&driver.text_content(ancestor)?),
                }
            }
            _ => continue,
        };
        let cleaned = clean_label(&text);
        if is_plausible_label(&cleaned) {
            return Ok(Some(cleaned));
        }
    }
    Ok(None)
}

/// Title-cased label built from the id, else the name.
pub fn synthesize_label(id: &str, name: &str) -> Option<String> {
    [id, name]
        .into_iter()
        .map(title_case_identifier)
        .find(|label| label.chars().count() >= 2)
}

/// Length within bounds, not helper text, not an answer choice.
pub fn is_plausible_label(text: &str) -> bool {
    let len = text.chars().count();
    if !(3..=MAX_LABEL_CHARS).contains(&len) {
        return false;
    }
    if is_placeholder(text) {
        return false;
    }
    let lower = text.to_lowercase();
    if contains_any(&lower, LABEL_JUNK) {
        return false;
    }
    !is_answer_text(text)
}

pub fn first_line(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or_default()
        .to_string()
}

/// `required`/`aria-required`, an asterisk in the associated label, or an
/// asterisk in a short ancestor.
pub fn is_required<D: Driver + ?Sized>(
    driver: &mut D,
    document: Scope,
    node: NodeId,
) -> Result<bool, DriverError> {
    if driver.attribute(node, "required")?.is_some() {
        return Ok(true);
    }
    if driver.attribute(node, "aria-required")?.as_deref() == Some("true") {
        return Ok(true);
    }
    let id = driver.attr_or_empty(node, "id");
    if !id.is_empty() {
        let selector = SelectorList::from(Selector::tag("label").attr_eq("for", &id));
        if let Some(label) = driver.query(document, &selector)? {
            if driver.text_content(label)?.contains('*') {
                return Ok(true);
            }
        }
    }
    for ancestor in driver.ancestors(node, ANCESTOR_DEPTH) {
        let text = driver.text_content(ancestor)?;
        if text.chars().count() <= MAX_LABEL_CHARS && text.contains('*') {
            return Ok(true);
        }
    }
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_above_with_overlap_is_accepted() {
        let control = BoundingBox::new(100.0, 200.0, 300.0, 30.0);
        let above = BoundingBox::new(100.0, 170.0, 80.0, 20.0);
        assert!(placement_distance(&above, &control, Proximity::LABEL).is_some());
        let far_right = BoundingBox::new(600.0, 170.0, 80.0, 20.0);
        assert!(placement_distance(&far_right, &control, Proximity::LABEL).is_none());
    }

    #[test]
    fn text_left_within_tolerance_is_accepted() {
        let control = BoundingBox::new(300.0, 200.0, 200.0, 30.0);
        let left = BoundingBox::new(120.0, 205.0, 150.0, 20.0);
        assert!(placement_distance(&left, &control, Proximity::LABEL).is_some());
        let low = BoundingBox::new(120.0, 260.0, 150.0, 20.0);
        assert!(placement_distance(&low, &control, Proximity::LABEL).is_none());
    }

    #[test]
    fn plausibility_filters_helpers_and_answers() {
        assert!(is_plausible_label("First Name"));
        assert!(!is_plausible_label("Attach"));
        assert!(!is_plausible_label("Yes"));
        assert!(!is_plausible_label("Select..."));
        assert!(!is_plausible_label("ab"));
    }

    #[test]
    fn synthesized_label_prefers_id() {
        assert_eq!(synthesize_label("first_name", "fname"), Some("First Name".into()));
        assert_eq!(synthesize_label("", "last-name"), Some("Last Name".into()));
        assert_eq!(synthesize_label("", ""), None);
    }
}
