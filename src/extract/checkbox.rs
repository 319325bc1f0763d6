//! Checkbox and radio groups, emitted as dropdowns whose options are the
//! individual choices.

use std::collections::{HashMap, HashSet};

use tracing::{debug, warn};

use crate::browser::driver::{Driver, NodeId, Scope};
use crate::browser::selector::{Selector, SelectorList};
use crate::extract::context::ExtractionPass;
use crate::extract::label::{is_required, label_for_id};
use crate::extract::vocabulary::{infer_group_question, is_demographics_question};
use crate::form::error::FormError;
use crate::form::field_model::{FieldDescriptor, FieldOption, FieldType};
use crate::form::fingerprint::Fingerprint;
use crate::form::normalize::{clean_label, slugify};

const MIN_GROUP: usize = 2;
const MAX_GROUP: usize = 15;
const SAME_ROW_BAND: f64 = 200.0;
const QUESTION_DEPTH: usize = 3;
const QUESTION_LINES: usize = 10;
const OPTION_TEXT_REACH: f64 = 200.0;
const OPTION_TEXT_DY: f64 = 30.0;

fn choice_selectors() -> SelectorList {
    SelectorList::of([
        Selector::tag("input").attr_eq("type", "checkbox"),
        Selector::tag("input").attr_eq("type", "radio"),
        Selector::any().role("checkbox"),
        Selector::any().role("radio"),
    ])
}

struct Choice {
    node: NodeId,
    fingerprint: Fingerprint,
    name_prefix: String,
    y: f64,
}

fn name_prefix(name: &str) -> String {
    name.split('[').next().unwrap_or_default().to_string()
}

/// Groups of 2–15 related choices that govern a recognisable question.
pub fn extract_checkbox_groups<D: Driver + ?Sized>(driver: &mut D, pass: &mut ExtractionPass) -> Vec<FieldDescriptor> {
    let groups = match group_choices(driver, pass) {
        Ok(groups) => groups,
        Err(e) => {
            warn!(error = %e, "checkbox scan failed");
            return Vec::new();
        }
    };

    let mut ids: HashMap<String, usize> = HashMap::new();
    let mut fields = Vec::new();
    for members in groups {
        match group_field(driver, pass, &members) {
            Ok(Some(mut field)) => {
                let seen = ids.entry(field.id.clone()).or_insert(0);
                *seen += 1;
                if *seen > 1 {
                    field.id = format!("{}_{}", field.id, seen);
                }
                fields.push(field);
            }
            Ok(None) => {}
            Err(e) => debug!(error = %e, "checkbox group skipped"),
        }
    }
    fields
}

fn read_choice<D: Driver + ?Sized>(driver: &mut D, node: NodeId) -> Result<Choice, FormError> {
    let fingerprint = Fingerprint::of(driver, node)?;
    let name = driver.attr_or_empty(node, "name");
    let y = driver.bounding_box(node)?.map(|r| r.y).unwrap_or_default();
    Ok(Choice {
        node,
        fingerprint,
        name_prefix: name_prefix(&name),
        y,
    })
}

/// Cluster each control with the siblings under its grandparent that share
/// its name prefix or sit within the same vertical band.
fn group_choices<D: Driver + ?Sized>(driver: &mut D, pass: &ExtractionPass) -> Result<Vec<Vec<Choice>>, FormError> {
    let selector = choice_selectors();
    let controls = driver.query_all(pass.scope.container, &selector)?;
    let mut processed: HashSet<Fingerprint> = HashSet::new();
    let mut groups = Vec::new();

    for control in controls {
        let anchor = read_choice(driver, control)?;
        if processed.contains(&anchor.fingerprint) || pass.is_claimed(&anchor.fingerprint) {
            continue;
        }
        let Some(&grandparent) = driver.ancestors(control, 2).get(1) else {
            continue;
        };

        let mut members = Vec::new();
        for other in driver.query_all(Scope::Element(grandparent), &selector)? {
            if other == control {
                continue;
            }
            let choice = read_choice(driver, other)?;
            if processed.contains(&choice.fingerprint) || choice.fingerprint == anchor.fingerprint {
                continue;
            }
            let same_name = !anchor.name_prefix.is_empty() && choice.name_prefix == anchor.name_prefix;
            if same_name || (choice.y - anchor.y).abs() < SAME_ROW_BAND {
                members.push(choice);
            }
        }
        members.insert(0, anchor);

        if (MIN_GROUP..=MAX_GROUP).contains(&members.len()) {
            for member in &members {
                processed.insert(member.fingerprint.clone());
            }
            groups.push(members);
        }
    }
    Ok(groups)
}

fn group_field<D: Driver + ?Sized>(
    driver: &mut D,
    pass: &mut ExtractionPass,
    members: &[Choice],
) -> Result<Option<FieldDescriptor>, FormError> {
    let mut options: Vec<FieldOption> = Vec::new();
    for member in members {
        let Some(text) = choice_label(driver, pass, member.node)? else {
            continue;
        };
        let value = driver
            .attribute(member.node, "value")?
            .filter(|v| !v.is_empty() && v != "on" && v != "true")
            .unwrap_or_else(|| slugify(&text));
        if options.iter().all(|o| o.text != text) {
            options.push(FieldOption { text, value });
        }
    }
    if options.len() < MIN_GROUP {
        return Ok(None);
    }

    let question = match governing_question(driver, members[0].node)? {
        Some(question) => question,
        None => {
            let texts: Vec<String> = options.iter().map(|o| o.text.clone()).collect();
            match infer_group_question(&texts) {
                Some(question) => question.to_string(),
                None => {
                    debug!(options = ?texts, "checkbox group without a question discarded");
                    return Ok(None);
                }
            }
        }
    };

    let mut required = false;
    for member in members {
        if is_required(driver, pass.scope.document, member.node)? {
            required = true;
            break;
        }
    }
    for member in members {
        pass.claim(member.fingerprint.clone());
    }

    let mut field = FieldDescriptor::new(
        &slugify(&question),
        &members[0].name_prefix,
        &question,
        FieldType::Dropdown,
        required,
    )
    .with_options(options, false);
    field.original_type = Some(FieldType::CheckboxGroup);
    Ok(Some(field))
}

/// `label[for]`, a wrapping label, `aria-label`, then text just to the right.
fn choice_label<D: Driver + ?Sized>(
    driver: &mut D,
    pass: &mut ExtractionPass,
    node: NodeId,
) -> Result<Option<String>, FormError> {
    let id = driver.attr_or_empty(node, "id");
    if let Some(label) = label_for_id(driver, pass.scope.document, &id)? {
        return Ok(Some(label));
    }
    for ancestor in driver.ancestors(node, 2) {
        if driver.tag_name(ancestor)? == "label" {
            let text = clean_label(&driver.text_content(ancestor)?);
            if !text.is_empty() {
                return Ok(Some(text));
            }
        }
    }
    let aria = clean_label(&driver.attr_or_empty(node, "aria-label"));
    if !aria.is_empty() {
        return Ok(Some(aria));
    }

    let Some(rect) = driver.bounding_box(node)? else {
        return Ok(None);
    };
    let blocks = pass.text_blocks(driver)?;
    let nearest = blocks
        .iter()
        .filter_map(|block| {
            let gap = block.rect.x - rect.right();
            let dy = (block.rect.y - rect.y).abs();
            let text = clean_label(&block.text);
            ((-5.0..=OPTION_TEXT_REACH).contains(&gap) && dy < OPTION_TEXT_DY && text.chars().count() >= 2)
                .then_some((gap + dy, text))
        })
        .min_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, text)| text);
    Ok(nearest)
}

/// First line of a near ancestor that reads as a demographics question.
fn governing_question<D: Driver + ?Sized>(driver: &mut D, node: NodeId) -> Result<Option<String>, FormError> {
    for ancestor in driver.ancestors(node, QUESTION_DEPTH) {
        let text = driver.text_content(ancestor)?;
        let question = text
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .take(QUESTION_LINES)
            .find(|l| is_demographics_question(l))
            .map(clean_label);
        if question.is_some() {
            return Ok(question);
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_prefix_strips_array_suffix() {
        assert_eq!(name_prefix("gender[]"), "gender");
        assert_eq!(name_prefix("race[0]"), "race");
        assert_eq!(name_prefix("consent"), "consent");
        assert_eq!(name_prefix(""), "");
    }
}
