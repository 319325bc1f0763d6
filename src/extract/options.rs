//! Dropdown option harvesting with dynamic-loading detection.

use tracing::debug;

use crate::browser::driver::{BoundingBox, Driver, Key, NodeId, Scope, Script};
use crate::browser::error::DriverError;
use crate::browser::selector::{Selector, SelectorList};
use crate::extract::context::ExtractionPass;
use crate::extract::vocabulary::{is_placeholder, mentions_any};
use crate::form::error::FormError;
use crate::form::field_model::FieldOption;
use crate::form::normalize::{collapse_whitespace, native_option_value, slugify};

const MAX_OPTION_CHARS: usize = 100;
const MAX_LISTBOX_DISTANCE: f64 = 500.0;
const END_KEY_PRESSES: usize = 3;
const REFERENCE_LIST_MIN: usize = 20;
const LARGE_LIST_MIN: usize = 100;

const NAV_JUNK: &[&str] = &["see all jobs", "your settings", "view favorites", "add to favorites"];
const PAGE_LINKS: &[&str] = &["home", "about", "contact"];
const REFERENCE_VOCABULARY: &[&str] = &["university", "college", "institute", "school"];

/// Options found for one dropdown.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OptionHarvest {
    pub options: Vec<FieldOption>,
    /// Only a sample of the full option set could be observed.
    pub dynamic: bool,
}

fn listbox_selectors() -> Vec<SelectorList> {
    vec![
        Selector::any().role("listbox").into(),
        Selector::any().attr_contains("class", "dropdown").into(),
        Selector::any().attr_contains("class", "select").into(),
        Selector::any().attr_contains("class", "menu").into(),
        Selector::any().attr_contains("class", "list").into(),
        Selector::tag("ul").into(),
    ]
}

fn option_selectors() -> SelectorList {
    SelectorList::of([
        Selector::any().role("option"),
        Selector::tag("li").attr("data-value"),
        Selector::tag("option"),
        Selector::any().class("dropdown-option"),
        Selector::any().class("select-option"),
        Selector::any().attr_contains("class", "option"),
    ])
}

fn toggle_selectors() -> SelectorList {
    SelectorList::of([
        Selector::tag("svg"),
        Selector::any().attr_contains("class", "arrow"),
        Selector::any().attr_contains("class", "caret"),
        Selector::any().attr_contains("class", "chevron"),
        Selector::any().attr_contains("class", "toggle"),
        Selector::tag("button"),
    ])
}

fn counted_options() -> SelectorList {
    SelectorList::of([Selector::any().role("option"), Selector::tag("option")])
}

/// Read the options of a dropdown control. Native selects are read
/// directly; custom widgets are opened, harvested and closed again.
pub fn extract_options<D: Driver + ?Sized>(
    driver: &mut D,
    pass: &mut ExtractionPass,
    node: NodeId,
) -> Result<OptionHarvest, FormError> {
    if driver.tag_name(node)? == "select" {
        return Ok(OptionHarvest {
            options: native_options(driver, node)?,
            dynamic: false,
        });
    }
    custom_options(driver, pass, node)
}

pub fn native_options<D: Driver + ?Sized>(driver: &mut D, node: NodeId) -> Result<Vec<FieldOption>, DriverError> {
    let selector = SelectorList::from(Selector::tag("option"));
    let mut options: Vec<FieldOption> = Vec::new();
    for option in driver.query_all(Scope::Element(node), &selector)? {
        let text = collapse_whitespace(&driver.text_content(option)?);
        if text.is_empty() || is_placeholder(&text) {
            continue;
        }
        let value = driver
            .attribute(option, "value")?
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| native_option_value(&text));
        if options.iter().all(|o| o.text != text) {
            options.push(FieldOption { text, value });
        }
    }
    Ok(options)
}

fn custom_options<D: Driver + ?Sized>(
    driver: &mut D,
    pass: &mut ExtractionPass,
    node: NodeId,
) -> Result<OptionHarvest, FormError> {
    let document = pass.scope.document;
    let _ = driver.evaluate(document, &Script::CloseOpenListboxes);
    let _ = driver.scroll_into_view(node);
    let Some(trigger) = driver.bounding_box(node)? else {
        debug!(node = node.0, "dropdown not visible, options skipped");
        return Ok(OptionHarvest::default());
    };

    open_widget(driver, pass, node).map_err(|reason| FormError::OptionExtraction {
        field: format!("node {}", node.0),
        reason,
    })?;
    driver.wait(pass.timeouts.medium_pause)?;
    let options = harvest_open_options(driver, pass, &trigger)?;
    close_widget(driver, pass);

    let dynamic = probe_dynamic_loading(driver, pass, node) || looks_like_reference_list(&options);
    Ok(OptionHarvest { options, dynamic })
}

/// Direct click, then an inner arrow/caret/toggle, then a synthetic click.
fn open_widget<D: Driver + ?Sized>(driver: &mut D, pass: &ExtractionPass, node: NodeId) -> Result<(), String> {
    let direct = match driver.click(node, pass.timeouts.option_open) {
        Ok(()) => return Ok(()),
        Err(e) => e,
    };
    debug!(error = %direct, "direct click failed, trying inner toggle");

    if let Ok(toggles) = driver.query_all(Scope::Element(node), &toggle_selectors()) {
        for toggle in toggles {
            if driver.is_visible(toggle) && driver.click(toggle, pass.timeouts.option_open).is_ok() {
                return Ok(());
            }
        }
    }
    driver
        .dispatch_click(node)
        .map_err(|e| format!("could not open dropdown: {}", e))
}

fn close_widget<D: Driver + ?Sized>(driver: &mut D, pass: &ExtractionPass) {
    let document = pass.scope.document;
    if driver.press_key(document, Key::Escape).is_err() {
        let _ = driver.click_at(document, 10.0, 10.0);
    }
    let _ = driver.wait(pass.timeouts.minimal_pause);
}

fn harvest_open_options<D: Driver + ?Sized>(
    driver: &mut D,
    pass: &ExtractionPass,
    trigger: &BoundingBox,
) -> Result<Vec<FieldOption>, DriverError> {
    let document = pass.scope.document;
    let option_selector = option_selectors();

    for listbox_selector in listbox_selectors() {
        for listbox in driver.query_all(document, &listbox_selector)? {
            let Some(rect) = driver.bounding_box(listbox)? else {
                continue;
            };
            if !rect.is_visible() || rect.manhattan(trigger) > MAX_LISTBOX_DISTANCE {
                continue;
            }
            let nodes = driver.query_all(Scope::Element(listbox), &option_selector)?;
            let options = read_option_nodes(driver, &nodes, false)?;
            if !options.is_empty() {
                return Ok(options);
            }
        }
    }

    // No container matched: take loose options near the trigger.
    let mut nearby = Vec::new();
    for option in driver.query_all(document, &option_selector)? {
        if let Some(rect) = driver.bounding_box(option)? {
            if rect.manhattan(trigger) <= MAX_LISTBOX_DISTANCE {
                nearby.push(option);
            }
        }
    }
    read_option_nodes(driver, &nearby, true)
}

fn read_option_nodes<D: Driver + ?Sized>(
    driver: &mut D,
    nodes: &[NodeId],
    page_wide: bool,
) -> Result<Vec<FieldOption>, DriverError> {
    let mut options: Vec<FieldOption> = Vec::new();
    for &node in nodes {
        if !driver.is_visible(node) {
            continue;
        }
        let text = collapse_whitespace(&driver.text_content(node)?);
        if !is_option_text(&text, page_wide) {
            continue;
        }
        let mut value = None;
        for attr in ["value", "data-value", "data-option-value"] {
            if let Some(v) = driver.attribute(node, attr)?.filter(|v| !v.is_empty()) {
                value = Some(v);
                break;
            }
        }
        let value = value.unwrap_or_else(|| slugify(&text));
        if options.iter().all(|o| o.text != text) {
            options.push(FieldOption { text, value });
        }
    }
    Ok(options)
}

fn is_option_text(text: &str, page_wide: bool) -> bool {
    if text.is_empty() || text.chars().count() >= MAX_OPTION_CHARS || is_placeholder(text) {
        return false;
    }
    let lower = text.to_lowercase();
    if NAV_JUNK.contains(&lower.as_str()) || PAGE_LINKS.contains(&lower.as_str()) {
        return false;
    }
    if lower.contains("navigation") || lower.contains("menu") {
        return false;
    }
    !(page_wide && lower.contains("footer"))
}

/// Re-open the widget, press End a few times and compare option counts.
fn probe_dynamic_loading<D: Driver + ?Sized>(driver: &mut D, pass: &ExtractionPass, node: NodeId) -> bool {
    let document = pass.scope.document;
    let counted = counted_options();
    let opened = driver
        .click(node, pass.timeouts.option_open)
        .or_else(|_| driver.dispatch_click(node));
    if opened.is_err() {
        return false;
    }
    let _ = driver.wait(pass.timeouts.medium_pause);

    let before = driver.query_all(document, &counted).map(|v| v.len()).unwrap_or(0);
    for _ in 0..END_KEY_PRESSES {
        let _ = driver.press_key(document, Key::End);
        let _ = driver.wait(pass.timeouts.scroll_detection_wait);
    }
    let _ = driver.wait(pass.timeouts.dynamic_loading_wait);
    let after = driver.query_all(document, &counted).map(|v| v.len()).unwrap_or(before);
    close_widget(driver, pass);

    if after > before {
        debug!(before, after, "dropdown loads options on scroll");
        return true;
    }
    false
}

/// Large reference lists (institutions, or anything with 100+ entries)
/// are never complete in the DOM.
pub fn looks_like_reference_list(options: &[FieldOption]) -> bool {
    if options.len() >= LARGE_LIST_MIN {
        return true;
    }
    options.len() >= REFERENCE_LIST_MIN
        && options.iter().any(|o| mentions_any(&o.text, REFERENCE_VOCABULARY))
}
