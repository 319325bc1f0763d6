//! Put template values into the live form, one entry at a time.

use std::collections::HashSet;
use std::path::Path;

use tracing::{debug, info, warn};

use crate::browser::driver::{AriaRole, Driver, Key, NodeId, OptionPick, Scope};
use crate::browser::selector::{Selector, SelectorList};
use crate::cli::config::Timeouts;
use crate::extract::vocabulary::mentions_any;
use crate::fill::report::{FieldOutcome, FieldReport};
use crate::fill::session::SessionPhase;
use crate::form::error::FormError;
use crate::form::field_model::{FieldType, UserInputEntry};
use crate::form::fingerprint::Fingerprint;
use crate::form::normalize::{collapse_whitespace, native_option_value};
use crate::trace::event::FillEvent;
use crate::trace::logger::FillTraceLogger;

fn text_ladder(id: &str) -> Vec<SelectorList> {
    vec![
        Selector::any().id(id).into(),
        Selector::tag("input").id(id).into(),
        Selector::tag("input").attr_eq("name", id).into(),
        Selector::any().attr_eq("data-qa", id).into(),
        Selector::any().attr_eq("data-testid", id).into(),
    ]
}

fn dropdown_ladder(id: &str) -> Vec<SelectorList> {
    vec![
        Selector::any().id(id).into(),
        Selector::tag("select").id(id).into(),
        Selector::tag("select").attr_eq("name", id).into(),
        Selector::any().role("combobox").id(id).into(),
        Selector::any().attr_eq("data-qa", id).into(),
    ]
}

fn textarea_ladder(id: &str) -> Vec<SelectorList> {
    vec![
        Selector::any().id(id).into(),
        Selector::tag("textarea").id(id).into(),
        Selector::tag("textarea").attr_eq("name", id).into(),
        Selector::any().attr_eq("data-qa", id).into(),
    ]
}

fn listbox_option_selectors(value: &str) -> SelectorList {
    SelectorList::of([
        Selector::any().role("option").has_text(value),
        Selector::tag("li").has_text(value),
        Selector::any().class("option").has_text(value),
        Selector::any().attr_contains("data-value", &value.to_lowercase()),
    ])
}

fn file_input() -> SelectorList {
    Selector::tag("input").attr_eq("type", "file").into()
}

/// Fills entries against one form root.
pub struct FormFiller<'a, D: Driver + ?Sized> {
    driver: &'a mut D,
    timeouts: &'a Timeouts,
    root: Scope,
    used_file_inputs: HashSet<Fingerprint>,
}

impl<'a, D: Driver + ?Sized> FormFiller<'a, D> {
    pub fn new(driver: &'a mut D, timeouts: &'a Timeouts, root: Scope) -> Self {
        FormFiller {
            driver,
            timeouts,
            root,
            used_file_inputs: HashSet::new(),
        }
    }

    /// Fill every entry in order. Only a session-level failure stops the
    /// run; anything else is recorded against its entry.
    pub fn fill_all(
        &mut self,
        entries: &[UserInputEntry],
        trace: &FillTraceLogger,
    ) -> Result<Vec<FieldReport>, FormError> {
        let mut reports = Vec::with_capacity(entries.len());
        for (step, entry) in entries.iter().enumerate() {
            let outcome = self.fill_entry(entry)?;
            trace.log(
                &FillEvent::now(step as u64, SessionPhase::FieldsFilling)
                    .with_field(entry)
                    .with_outcome(&outcome),
            );
            reports.push(FieldReport {
                id: entry.id.clone(),
                question: entry.question.clone(),
                field_type: entry.field_type,
                outcome,
            });
        }
        Ok(reports)
    }

    /// Outcome of one entry; Err only for fatal conditions.
    pub fn fill_entry(&mut self, entry: &UserInputEntry) -> Result<FieldOutcome, FormError> {
        let value = entry.value.trim();
        if value.is_empty() {
            if entry.required {
                warn!(field = %entry.id, "required field has no value");
                return Ok(FieldOutcome::Failed("required value missing".into()));
            }
            return Ok(FieldOutcome::Skipped("no value provided".into()));
        }

        let result = if entry.original_type == Some(FieldType::CheckboxGroup) {
            self.fill_choice_group(entry, value)
        } else {
            match entry.field_type {
                t if t.is_text_like() => self.fill_text(entry, value),
                FieldType::Dropdown => self.fill_dropdown(entry, value),
                FieldType::File => self.fill_file(entry, value),
                FieldType::Textarea => self.fill_textarea(entry, value),
                _ => Err(FormError::UnsupportedField {
                    field: entry.id.clone(),
                }),
            }
        };

        match result {
            Ok(()) => {
                info!(field = %entry.id, "filled");
                Ok(FieldOutcome::Filled)
            }
            Err(e) if e.is_fatal() => Err(e),
            Err(e @ FormError::ValueMismatch { .. }) => {
                warn!(field = %entry.id, error = %e, "value not verified");
                Ok(FieldOutcome::Unverified(e.to_string()))
            }
            Err(e) => {
                warn!(field = %entry.id, error = %e, "field not filled");
                Ok(FieldOutcome::Failed(e.to_string()))
            }
        }
    }

    fn first_visible(&mut self, nodes: Vec<NodeId>) -> Option<NodeId> {
        nodes.into_iter().find(|&n| self.driver.is_visible(n))
    }

    /// First ladder step that resolves within the element wait.
    fn locate(&mut self, ladder: Vec<SelectorList>) -> Result<Option<NodeId>, FormError> {
        for selector in ladder {
            if let Some(node) = self.driver.wait_for(self.root, &selector, self.timeouts.element_wait)? {
                debug!(selector = %selector, "field located");
                return Ok(Some(node));
            }
        }
        Ok(None)
    }

    /// Accessible name, exact first; a fuzzy match only when unambiguous.
    fn by_role(&mut self, role: AriaRole, name: &str) -> Result<Option<NodeId>, FormError> {
        if name.trim().is_empty() {
            return Ok(None);
        }
        let exact = self.driver.get_by_role(self.root, role, name, true)?;
        if let Some(node) = self.first_visible(exact) {
            return Ok(Some(node));
        }
        let fuzzy = self.driver.get_by_role(self.root, role, name, false)?;
        if fuzzy.len() == 1 {
            return Ok(self.first_visible(fuzzy));
        }
        Ok(None)
    }

    fn not_found(entry: &UserInputEntry) -> FormError {
        FormError::FieldNotFound {
            field: entry.id.clone(),
        }
    }

    // ------------------------------------------------------------------
    // Text-like
    // ------------------------------------------------------------------

    fn fill_text(&mut self, entry: &UserInputEntry, value: &str) -> Result<(), FormError> {
        let mut first_error = None;
        if let Some(node) = self.by_role(AriaRole::Textbox, &entry.question)? {
            match self.set_and_verify(entry, node, value) {
                Ok(()) => return Ok(()),
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    debug!(field = %entry.id, error = %e, "role match did not take the value");
                    first_error = Some(e);
                }
            }
        }
        if !entry.control_id().is_empty() {
            if let Some(node) = self.locate(text_ladder(entry.control_id()))? {
                return self.set_and_verify(entry, node, value);
            }
        }
        Err(first_error.unwrap_or_else(|| Self::not_found(entry)))
    }

    /// Clear, type and read back.
    fn set_and_verify(&mut self, entry: &UserInputEntry, node: NodeId, value: &str) -> Result<(), FormError> {
        let _ = self.driver.scroll_into_view(node);
        if let Err(e) = self.driver.click(node, self.timeouts.interaction) {
            debug!(field = %entry.id, error = %e, "focus click failed");
        }
        self.driver.fill(node, "")?;
        self.driver.fill(node, value)?;
        let actual = self.driver.input_value(node)?;
        if actual.trim() != value.trim() {
            return Err(FormError::ValueMismatch {
                field: entry.id.clone(),
                expected: value.to_string(),
                actual,
            });
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Dropdowns
    // ------------------------------------------------------------------

    fn fill_dropdown(&mut self, entry: &UserInputEntry, value: &str) -> Result<(), FormError> {
        let node = match self.by_role(AriaRole::Combobox, &entry.question)? {
            Some(node) => Some(node),
            None if !entry.control_id().is_empty() => self.locate(dropdown_ladder(entry.control_id()))?,
            None => None,
        };
        let Some(node) = node else {
            return Err(Self::not_found(entry));
        };
        let _ = self.driver.scroll_into_view(node);

        if self.driver.tag_name(node)? == "select" {
            return self.select_native(entry, node, value);
        }
        self.select_custom(entry, node, value)
    }

    /// By visible label, then by raw value, then by the lower_underscore
    /// value used for options without one.
    fn select_native(&mut self, entry: &UserInputEntry, node: NodeId, value: &str) -> Result<(), FormError> {
        let picks = [
            OptionPick::Label(value.to_string()),
            OptionPick::Value(value.to_string()),
            OptionPick::Value(native_option_value(value)),
        ];
        let mut last = None;
        for pick in &picks {
            match self.driver.select_option(node, pick) {
                Ok(()) => return Ok(()),
                Err(e) if e.is_closed() => return Err(e.into()),
                Err(e) => last = Some(e),
            }
        }
        Err(FormError::OptionExtraction {
            field: entry.id.clone(),
            reason: last.map(|e| e.to_string()).unwrap_or_default(),
        })
    }

    /// Open the widget and click the option; exact name, then contains,
    /// then a selector search, then type the value and press Enter.
    fn select_custom(&mut self, entry: &UserInputEntry, node: NodeId, value: &str) -> Result<(), FormError> {
        if self.driver.click(node, self.timeouts.interaction).is_err() {
            self.driver.dispatch_click(node)?;
        }
        let _ = self.driver.wait(self.timeouts.medium_pause);

        let exact = self.driver.get_by_role(self.root, AriaRole::Option, value, true)?;
        let option = match self.first_visible(exact) {
            Some(option) => Some(option),
            None => {
                let fuzzy = self.driver.get_by_role(self.root, AriaRole::Option, value, false)?;
                match self.first_visible(fuzzy) {
                    Some(option) => Some(option),
                    None => {
                        let nodes = self.driver.query_all(self.root, &listbox_option_selectors(value))?;
                        self.first_visible(nodes)
                    }
                }
            }
        };
        if let Some(option) = option {
            self.driver.click(option, self.timeouts.interaction)?;
            let _ = self.driver.wait(self.timeouts.short_pause);
            return Ok(());
        }

        debug!(field = %entry.id, "no matching option, typing the value");
        let target = match self.driver.fill(node, value) {
            Ok(()) => node,
            Err(_) => {
                let inner = SelectorList::from(Selector::tag("input"));
                let Some(input) = self.driver.query(Scope::Element(node), &inner)? else {
                    return Err(FormError::OptionExtraction {
                        field: entry.id.clone(),
                        reason: format!("no option '{}' and no text input", value),
                    });
                };
                self.driver.fill(input, value)?;
                input
            }
        };
        let _ = self.driver.wait(self.timeouts.short_pause);
        self.driver.press_key(self.root, Key::Enter)?;
        debug!(field = %entry.id, node = target.0, "typed dropdown value");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Files
    // ------------------------------------------------------------------

    fn fill_file(&mut self, entry: &UserInputEntry, value: &str) -> Result<(), FormError> {
        let path = Path::new(value);
        if !path.is_file() {
            return Err(FormError::FileNotOnDisk {
                field: entry.id.clone(),
                path: path.to_path_buf(),
            });
        }

        if self.upload_via_group(entry, path)? {
            return Ok(());
        }

        let inputs = self.driver.query_all(self.root, &file_input())?;
        let question = format!("{} {}", entry.id, entry.question).to_lowercase();
        let wants_cover = question.contains("cover") || question.contains("letter");
        let wants_resume = !wants_cover && mentions_any(&question, &["resume", "cv"]);

        for &input in &inputs {
            let fingerprint = Fingerprint::of(self.driver, input)?;
            if self.used_file_inputs.contains(&fingerprint) {
                continue;
            }
            let id = self.driver.attr_or_empty(input, "id");
            let name = self.driver.attr_or_empty(input, "name");
            let attrs = format!("{} {} {}", id, name, self.driver.attr_or_empty(input, "aria-label")).to_lowercase();
            let matches = if wants_cover {
                attrs.contains("cover") || attrs.contains("letter")
            } else if wants_resume {
                mentions_any(&attrs, &["resume", "cv"])
            } else {
                id == entry.control_id() || name == entry.control_id()
            };
            if matches {
                return self.upload(input, fingerprint, path);
            }
        }

        for &input in &inputs {
            let fingerprint = Fingerprint::of(self.driver, input)?;
            if !self.used_file_inputs.contains(&fingerprint) {
                return self.upload(input, fingerprint, path);
            }
        }
        Err(Self::not_found(entry))
    }

    /// A group named after the question with an "Attach" button that opens
    /// a file chooser.
    fn upload_via_group(&mut self, entry: &UserInputEntry, path: &Path) -> Result<bool, FormError> {
        let question = entry.question.replace('*', "");
        let question = question.trim();
        if question.is_empty() {
            return Ok(false);
        }
        let groups = self.driver.get_by_role(self.root, AriaRole::Group, question, false)?;
        for group in groups {
            let buttons = self.driver.get_by_role(Scope::Element(group), AriaRole::Button, "Attach", false)?;
            let Some(button) = self.first_visible(buttons) else {
                continue;
            };
            match self.driver.click_for_file_chooser(button, path, self.timeouts.interaction) {
                Ok(()) => {
                    if let Some(input) = self.driver.query(Scope::Element(group), &file_input())? {
                        let fingerprint = Fingerprint::of(self.driver, input)?;
                        self.used_file_inputs.insert(fingerprint);
                    }
                    return Ok(true);
                }
                Err(e) if e.is_closed() => return Err(e.into()),
                Err(e) => debug!(field = %entry.id, error = %e, "file chooser did not open"),
            }
        }
        Ok(false)
    }

    fn upload(&mut self, input: NodeId, fingerprint: Fingerprint, path: &Path) -> Result<(), FormError> {
        self.driver.set_input_files(input, path)?;
        self.used_file_inputs.insert(fingerprint);
        let _ = self.driver.wait(self.timeouts.short_pause);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Textareas and choice groups
    // ------------------------------------------------------------------

    fn fill_textarea(&mut self, entry: &UserInputEntry, value: &str) -> Result<(), FormError> {
        let node = match self.locate(textarea_ladder(entry.control_id()))? {
            Some(node) => node,
            None => self
                .by_role(AriaRole::Textbox, &entry.question)?
                .ok_or_else(|| Self::not_found(entry))?,
        };
        let _ = self.driver.scroll_into_view(node);
        let _ = self.driver.click(node, self.timeouts.interaction);
        self.driver.fill(node, "")?;
        self.driver.fill(node, value)?;
        Ok(())
    }

    /// Check the checkbox or radio whose name matches the value. A value
    /// that names no single choice is split on commas.
    fn fill_choice_group(&mut self, entry: &UserInputEntry, value: &str) -> Result<(), FormError> {
        if self.check_choice(value)? {
            return Ok(());
        }
        let parts: Vec<&str> = value.split(',').map(str::trim).filter(|p| !p.is_empty()).collect();
        if parts.len() < 2 {
            return Err(Self::not_found(entry));
        }
        for part in parts {
            if !self.check_choice(part)? {
                return Err(FormError::OptionExtraction {
                    field: entry.id.clone(),
                    reason: format!("no choice named '{}'", part),
                });
            }
        }
        Ok(())
    }

    fn check_choice(&mut self, name: &str) -> Result<bool, FormError> {
        let wanted = collapse_whitespace(name);
        if wanted.is_empty() {
            return Ok(false);
        }
        let mut candidates = Vec::new();
        for role in [AriaRole::Checkbox, AriaRole::Radio] {
            for node in self.driver.get_by_role(self.root, role, &wanted, false)? {
                if self.driver.is_visible(node) {
                    let label = collapse_whitespace(&self.driver.accessible_name(node)?);
                    candidates.push((node, label));
                }
            }
        }
        let Some(node) = pick_choice(&wanted, &candidates) else {
            debug!(choice = %wanted, candidates = candidates.len(), "no unambiguous choice");
            return Ok(false);
        };
        if !self.driver.is_checked(node)? {
            self.driver.click(node, self.timeouts.interaction)?;
        }
        Ok(true)
    }
}

/// Exact name, then the same name in any case, then the one choice whose
/// name contains `wanted` as a run of whole words. "man" never picks
/// "Woman".
fn pick_choice(wanted: &str, candidates: &[(NodeId, String)]) -> Option<NodeId> {
    if let Some((node, _)) = candidates.iter().find(|(_, label)| label == wanted) {
        return Some(*node);
    }
    let lower = wanted.to_lowercase();
    if let Some((node, _)) = candidates.iter().find(|(_, label)| label.to_lowercase() == lower) {
        return Some(*node);
    }
    let needle = words(&lower);
    if needle.is_empty() {
        return None;
    }
    let mut hits = candidates
        .iter()
        .filter(|(_, label)| words(&label.to_lowercase()).windows(needle.len()).any(|w| w == needle.as_slice()));
    match (hits.next(), hits.next()) {
        (Some((node, _)), None) => Some(*node),
        _ => None,
    }
}

fn words(text: &str) -> Vec<&str> {
    text.split(|c: char| !c.is_alphanumeric()).filter(|w| !w.is_empty()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn choices(labels: &[&str]) -> Vec<(NodeId, String)> {
        labels
            .iter()
            .enumerate()
            .map(|(i, l)| (NodeId(i as u64), l.to_string()))
            .collect()
    }

    #[test]
    fn choice_prefers_exact_then_case_insensitive_name() {
        let c = choices(&["Woman", "Man", "Non-binary"]);
        assert_eq!(pick_choice("Man", &c), Some(NodeId(1)));
        assert_eq!(pick_choice("man", &c), Some(NodeId(1)));
        assert_eq!(pick_choice("NON-BINARY", &c), Some(NodeId(2)));
    }

    #[test]
    fn choice_partial_match_needs_whole_words_and_one_hit() {
        let c = choices(&["Woman", "I prefer not to say", "I don't wish to answer"]);
        assert_eq!(pick_choice("prefer not", &c), Some(NodeId(1)));
        assert_eq!(pick_choice("man", &choices(&["Woman"])), None, "substring inside a word");
        let twins = choices(&["Yes, I am a veteran", "No, I am not a veteran"]);
        assert_eq!(pick_choice("veteran", &twins), None, "ambiguous");
    }
}
