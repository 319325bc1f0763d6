//! File uploads: resume/CV and cover-letter groups first, then any
//! remaining `input[type=file]`.

use tracing::{debug, warn};

use crate::browser::driver::{Driver, NodeId, Scope};
use crate::browser::selector::{Selector, SelectorList};
use crate::extract::context::ExtractionPass;
use crate::extract::label::{is_required, resolve_label};
use crate::extract::vocabulary::{LABEL_JUNK, mentions};
use crate::form::error::FormError;
use crate::form::field_model::{FieldDescriptor, FieldType};
use crate::form::fingerprint::Fingerprint;
use crate::form::normalize::{clean_label, collapse_whitespace, contains_any, slugify};

const UPLOAD_METHODS: &[&str] = &["Attach", "Dropbox", "Google Drive", "Enter manually"];
const MAX_GROUP_LINE_CHARS: usize = 50;

fn group_selectors() -> SelectorList {
    SelectorList::of([Selector::any().role("group"), Selector::tag("fieldset")])
}

fn file_input() -> SelectorList {
    Selector::tag("input").attr_eq("type", "file").into()
}

fn heading_selectors() -> SelectorList {
    SelectorList::of([
        Selector::tag("legend"),
        Selector::tag("h1"),
        Selector::tag("h2"),
        Selector::tag("h3"),
        Selector::tag("h4"),
        Selector::tag("h5"),
        Selector::tag("h6"),
        Selector::tag("label"),
        Selector::any().role("heading"),
    ])
}

fn upload_button_selectors() -> SelectorList {
    SelectorList::of([Selector::tag("button"), Selector::any().role("button")])
}

fn is_upload_topic(text: &str) -> bool {
    let lower = text.to_lowercase();
    lower.contains("resume") || mentions(&lower, "cv") || lower.contains("cover letter")
}

pub fn extract_file_fields<D: Driver + ?Sized>(driver: &mut D, pass: &mut ExtractionPass) -> Vec<FieldDescriptor> {
    let mut fields = match upload_groups(driver, pass) {
        Ok(fields) => fields,
        Err(e) => {
            warn!(error = %e, "upload group scan failed");
            Vec::new()
        }
    };

    let inputs = match driver.query_all(pass.scope.container, &file_input()) {
        Ok(nodes) => nodes,
        Err(e) => {
            warn!(error = %e, "file input scan failed");
            return fields;
        }
    };
    for node in inputs {
        match bare_file_input(driver, pass, node) {
            Ok(Some(field)) => fields.push(field),
            Ok(None) => {}
            Err(e) => debug!(node = node.0, error = %e, "file input skipped"),
        }
    }
    fields
}

/// Pass 1. Groups are visited innermost first so that a wrapper holding
/// several upload groups does not swallow them.
fn upload_groups<D: Driver + ?Sized>(
    driver: &mut D,
    pass: &mut ExtractionPass,
) -> Result<Vec<FieldDescriptor>, FormError> {
    let groups = driver.query_all(pass.scope.container, &group_selectors())?;
    let mut found = Vec::new();
    for group in groups.into_iter().rev() {
        let text = driver.text_content(group)?;
        if !is_upload_topic(&text) {
            continue;
        }
        let inputs = driver.query_all(Scope::Element(group), &file_input())?;
        let mut fingerprints = Vec::with_capacity(inputs.len());
        for input in &inputs {
            fingerprints.push(Fingerprint::of(driver, *input)?);
        }
        if !fingerprints.is_empty() && fingerprints.iter().all(|fp| pass.is_claimed(fp)) {
            continue;
        }

        let upload_options = upload_options(driver, group, &text)?;
        if inputs.is_empty() && upload_options.is_empty() {
            continue;
        }
        for fp in fingerprints {
            pass.claim(fp);
        }

        let label = group_label(driver, group, &text)?;
        let lower = text.to_lowercase();
        let required = text.contains('*') || lower.contains("required");
        let accepted = match accepted_types_line(&text) {
            Some(types) => Some(types),
            None => match inputs.first() {
                Some(&input) => driver.attribute(input, "accept")?.filter(|a| !a.is_empty()),
                None => None,
            },
        };

        let mut field = FieldDescriptor::new(&slugify(&label), "", &label, FieldType::File, required);
        field.upload_options = upload_options;
        field.accepted_types = accepted;
        found.push(field);
    }
    found.reverse();
    Ok(found)
}

/// aria-label, then a heading element, then the first short line, then a
/// name derived from the topic.
fn group_label<D: Driver + ?Sized>(driver: &mut D, group: NodeId, text: &str) -> Result<String, FormError> {
    let aria = clean_label(&driver.attr_or_empty(group, "aria-label"));
    if !aria.is_empty() {
        return Ok(aria);
    }
    for heading in driver.query_all(Scope::Element(group), &heading_selectors())? {
        let candidate = clean_label(&driver.text_content(heading)?);
        if !candidate.is_empty() && !contains_any(&candidate.to_lowercase(), LABEL_JUNK) {
            return Ok(candidate);
        }
    }
    let short_line = text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .take(3)
        .map(clean_label)
        .find(|l| {
            let len = l.chars().count();
            (3..MAX_GROUP_LINE_CHARS).contains(&len) && !contains_any(&l.to_lowercase(), LABEL_JUNK)
        });
    if let Some(line) = short_line {
        return Ok(line);
    }

    let lower = text.to_lowercase();
    let has_resume = lower.contains("resume");
    let has_cv = mentions(&lower, "cv");
    let label = if has_resume && has_cv {
        "Resume/CV"
    } else if has_resume {
        "Resume"
    } else if has_cv {
        "CV"
    } else if lower.contains("cover letter") {
        "Cover Letter"
    } else {
        "Attachment"
    };
    Ok(label.to_string())
}

/// Upload methods offered by buttons, plus any method named in the text.
fn upload_options<D: Driver + ?Sized>(driver: &mut D, group: NodeId, text: &str) -> Result<Vec<String>, FormError> {
    let mut methods: Vec<String> = Vec::new();
    for button in driver.query_all(Scope::Element(group), &upload_button_selectors())? {
        let label = collapse_whitespace(&driver.text_content(button)?);
        let lower = label.to_lowercase();
        let is_method = UPLOAD_METHODS.iter().any(|m| lower.contains(&m.to_lowercase()))
            || lower.contains("browse")
            || lower.contains("upload");
        if is_method && !label.is_empty() && !methods.contains(&label) {
            methods.push(label);
        }
    }
    let lower = text.to_lowercase();
    for method in UPLOAD_METHODS {
        let known = methods.iter().any(|m| m.to_lowercase().contains(&method.to_lowercase()));
        if !known && lower.contains(&method.to_lowercase()) {
            methods.push(method.to_string());
        }
    }
    Ok(methods)
}

fn accepted_types_line(text: &str) -> Option<String> {
    text.lines().find_map(|line| {
        let lower = line.to_lowercase();
        let start = lower.find("accepted file types")?;
        let rest = &lower[start..];
        let types = rest.split_once(':').map(|(_, t)| t.trim()).unwrap_or_default();
        (!types.is_empty()).then(|| types.to_string())
    })
}

/// Pass 2: a file input outside any recognised group.
fn bare_file_input<D: Driver + ?Sized>(
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
        return Ok(None);
    };
    let required = is_required(driver, pass.scope.document, node)?;
    let accepted = driver.attribute(node, "accept")?.filter(|a| !a.is_empty());
    pass.claim(fingerprint);

    let mut field = FieldDescriptor::new(&id, &name, &label, FieldType::File, required);
    field.accepted_types = accepted;
    Ok(Some(field))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepted_types_are_read_from_helper_line() {
        let text = "Resume/CV *\nAttach\nAccepted file types: pdf, doc, docx, txt, rtf";
        assert_eq!(accepted_types_line(text), Some("pdf, doc, docx, txt, rtf".into()));
        assert_eq!(accepted_types_line("Resume"), None);
    }

    #[test]
    fn upload_topics() {
        assert!(is_upload_topic("Resume/CV"));
        assert!(is_upload_topic("Upload your CV"));
        assert!(is_upload_topic("Cover Letter"));
        assert!(!is_upload_topic("Curriculum vitae builder cvs"));
    }
}
