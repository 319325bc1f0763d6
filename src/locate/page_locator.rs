//! Decide where the application form lives: an embedding iframe, a
//! container in the main document, or the main document itself.

use tracing::{debug, info, warn};

use crate::browser::driver::{ClickOutcome, Driver, FrameId, LoadState, NodeId, Scope};
use crate::browser::error::DriverError;
use crate::browser::selector::{Selector, SelectorList};
use crate::cli::config::AppConfig;
use crate::extract::context::ExtractionScope;
use crate::form::error::FormError;
use crate::form::field_model::FormContext;
use crate::locate::overlay::dismiss_overlays;

pub const ATS_IFRAME_TIMEOUT_MS: u64 = 8_000;
pub const JOB_IFRAME_TIMEOUT_MS: u64 = 15_000;
const ATS_MIN_CONTROLS: usize = 5;
const JOB_MIN_CONTROLS: usize = 2;
const CONTAINER_MIN_CONTROLS: usize = 3;
const MIN_IFRAME_SIDE: f64 = 100.0;

const JOB_IFRAME_KEYWORDS: &[&str] = &[
    "job", "career", "apply", "form", "workday", "lever", "talent", "recruit",
];
const KNOWN_HOSTS: &[&str] = &["greenhouse", "workday", "lever"];

/// The chosen form root and how to find it again.
#[derive(Debug, Clone, PartialEq)]
pub struct FormRoot {
    pub scope: ExtractionScope,
    pub context: FormContext,
    /// False when nothing met a threshold and the page is used as is.
    pub found: bool,
}

impl FormRoot {
    fn main_document(container: Scope, found: bool) -> Self {
        FormRoot {
            scope: ExtractionScope {
                document: Scope::Page,
                container,
            },
            context: FormContext::main_document(),
            found,
        }
    }
}

fn apply_triggers() -> Vec<SelectorList> {
    let mut out = vec![
        SelectorList::from(Selector::tag("a").attr_eq("href", "#apply")),
        SelectorList::from(Selector::tag("a").attr_eq("href", "#applynow")),
        SelectorList::from(Selector::tag("a").attr_prefix("href", "#app")),
    ];
    for text in ["Apply", "Apply now", "Start application"] {
        out.push(SelectorList::of([
            Selector::tag("button").has_text(text),
            Selector::tag("a").has_text(text),
        ]));
    }
    out.push(Selector::any().attr_contains("data-qa", "apply").into());
    out.push(Selector::any().attr_contains("data-testid", "apply").into());
    out.push(Selector::any().attr_contains("id", "apply").into());
    out
}

fn frame_indicators() -> SelectorList {
    SelectorList::of([
        Selector::tag("input"),
        Selector::tag("textarea"),
        Selector::tag("select"),
        Selector::any().role("combobox"),
        Selector::any().role("group"),
        Selector::tag("button").attr_eq("type", "submit"),
        Selector::tag("fieldset"),
    ])
}

fn container_selectors() -> SelectorList {
    SelectorList::of([
        Selector::tag("form"),
        Selector::any().attr_contains("class", "application-form"),
        Selector::any().attr_eq("id", "apply-form"),
        Selector::any().attr_contains("class", "job-form"),
        Selector::any().attr_contains("class", "apply-form"),
        Selector::any().attr_eq("id", "apply"),
        Selector::any().attr_eq("id", "applynow"),
    ])
}

fn container_controls() -> SelectorList {
    SelectorList::of([
        Selector::tag("input"),
        Selector::tag("textarea"),
        Selector::tag("select"),
        Selector::any().role("combobox"),
    ])
}

/// Find the form root. Never fails: anything unexpected degrades to the
/// main document.
pub fn locate_form<D: Driver + ?Sized>(driver: &mut D, url: &str, config: &AppConfig) -> FormRoot {
    if let Err(e) = click_apply_trigger(driver, config) {
        debug!(error = %e, "apply trigger skipped");
    }
    match scan_iframes(driver, config) {
        Ok(Some(root)) => return root,
        Ok(None) => {}
        Err(e) => warn!(error = %e, "iframe scan failed"),
    }
    match main_document_root(driver) {
        Ok(Some(root)) => root,
        Ok(None) => {
            let e = FormError::FormNotFound { url: url.to_string() };
            warn!(error = %e, "using the main document");
            FormRoot::main_document(Scope::Page, false)
        }
        Err(e) => {
            warn!(error = %e, "main document scan failed");
            FormRoot::main_document(Scope::Page, false)
        }
    }
}

/// Click the first visible "Apply" control. A popup becomes the page.
fn click_apply_trigger<D: Driver + ?Sized>(driver: &mut D, config: &AppConfig) -> Result<bool, DriverError> {
    let timeouts = &config.timeouts;
    for selector in apply_triggers() {
        for node in driver.query_all(Scope::Page, &selector)? {
            if !driver.is_visible(node) {
                continue;
            }
            let _ = driver.scroll_into_view(node);
            match driver.click_expect_popup(node, timeouts.popup) {
                Ok(ClickOutcome::Popup) => {
                    info!(selector = %selector, "apply trigger opened a new tab");
                    let _ = driver.wait_for_load(Scope::Page, LoadState::DomContentLoaded, ATS_IFRAME_TIMEOUT_MS);
                }
                Ok(ClickOutcome::SameTab) => {
                    info!(selector = %selector, "apply trigger clicked");
                    driver.wait(timeouts.post_click_settle)?;
                }
                Err(e) if e.is_closed() => return Err(e),
                Err(e) => {
                    debug!(selector = %selector, error = %e, "apply trigger click failed");
                    continue;
                }
            }
            return Ok(true);
        }
    }
    Ok(false)
}

/// Pass 1 takes ATS-hosted iframes with more than five controls; pass 2
/// takes any job-looking iframe with more than two.
fn scan_iframes<D: Driver + ?Sized>(driver: &mut D, config: &AppConfig) -> Result<Option<FormRoot>, DriverError> {
    let iframes = driver.query_all(Scope::Page, &SelectorList::from(Selector::tag("iframe")))?;
    if iframes.is_empty() {
        return Ok(None);
    }
    let sources: Vec<String> = iframes
        .iter()
        .map(|&f| driver.attr_or_empty(f, "src"))
        .collect();
    debug!(count = iframes.len(), "iframes on page");

    let mut evaluated = vec![false; iframes.len()];
    for (index, (&iframe, src)) in iframes.iter().zip(&sources).enumerate() {
        let lower = src.to_lowercase();
        let Some(fragment) = config.extraction.ats_fragments.iter().find(|f| lower.contains(f.as_str())) else {
            continue;
        };
        evaluated[index] = true;
        let Some(frame) = open_frame(driver, iframe, config, ATS_IFRAME_TIMEOUT_MS)? else {
            continue;
        };
        let controls = driver.query_all(Scope::Frame(frame), &frame_indicators())?.len();
        info!(index, src = %src, controls, "ATS iframe");
        if controls > ATS_MIN_CONTROLS {
            let selector = format!("iframe[src*=\"{}\"]", fragment);
            return Ok(Some(iframe_root(frame, src, &selector, index, ATS_IFRAME_TIMEOUT_MS)));
        }
    }

    for (index, (&iframe, src)) in iframes.iter().zip(&sources).enumerate() {
        let lower = src.to_lowercase();
        if evaluated[index] || !JOB_IFRAME_KEYWORDS.iter().any(|k| lower.contains(k)) {
            continue;
        }
        let Some(frame) = open_frame(driver, iframe, config, JOB_IFRAME_TIMEOUT_MS)? else {
            continue;
        };
        dismiss_overlays(driver, Scope::Frame(frame), &config.timeouts);
        let controls = driver.query_all(Scope::Frame(frame), &frame_indicators())?.len();
        info!(index, src = %src, controls, "job iframe");
        if controls > JOB_MIN_CONTROLS {
            let selector = iframe_selector_for(src, index);
            return Ok(Some(iframe_root(frame, src, &selector, index, JOB_IFRAME_TIMEOUT_MS)));
        }
    }
    Ok(None)
}

fn iframe_root(frame: FrameId, src: &str, selector: &str, index: usize, timeout: u64) -> FormRoot {
    FormRoot {
        scope: ExtractionScope::document(Scope::Frame(frame)),
        context: FormContext::iframe(src, selector, index, timeout),
        found: true,
    }
}

/// Bring a collapsed iframe into view, then wait for its document.
fn open_frame<D: Driver + ?Sized>(
    driver: &mut D,
    iframe: NodeId,
    config: &AppConfig,
    load_timeout: u64,
) -> Result<Option<FrameId>, DriverError> {
    let small = match driver.bounding_box(iframe)? {
        Some(rect) => rect.width < MIN_IFRAME_SIDE || rect.height < MIN_IFRAME_SIDE,
        None => true,
    };
    if small {
        let _ = driver.scroll_into_view(iframe);
        driver.wait(config.timeouts.long_pause)?;
        dismiss_overlays(driver, Scope::Page, &config.timeouts);
    }
    let Some(frame) = driver.content_frame(iframe)? else {
        return Ok(None);
    };
    if let Err(e) = driver.wait_for_load(Scope::Frame(frame), LoadState::DomContentLoaded, load_timeout) {
        if e.is_closed() {
            return Err(e);
        }
        debug!(error = %e, "iframe load wait timed out, inspecting anyway");
    }
    Ok(Some(frame))
}

/// Selector recorded for a non-ATS iframe: a known host name, else the
/// first host label, else the iframe's position.
pub fn iframe_selector_for(src: &str, index: usize) -> String {
    let host = url::Url::parse(src)
        .ok()
        .and_then(|u| u.host_str().map(str::to_lowercase));
    match host {
        Some(host) => {
            let marker = KNOWN_HOSTS
                .iter()
                .find(|h| host.contains(*h))
                .map(|h| h.to_string())
                .unwrap_or_else(|| host.split('.').next().unwrap_or_default().to_string());
            format!("iframe[src*=\"{}\"]", marker)
        }
        None => format!("iframe:nth-of-type({})", index + 1),
    }
}

/// Best form container in the main document, else the document itself if
/// it has any controls.
fn main_document_root<D: Driver + ?Sized>(driver: &mut D) -> Result<Option<FormRoot>, DriverError> {
    let controls = container_controls();
    let mut best: Option<(usize, NodeId)> = None;
    for container in driver.query_all(Scope::Page, &container_selectors())? {
        let count = driver.query_all(Scope::Element(container), &controls)?.len();
        if best.is_none_or(|(n, _)| count > n) {
            best = Some((count, container));
        }
    }
    if let Some((count, container)) = best {
        if count >= CONTAINER_MIN_CONTROLS {
            info!(controls = count, "form container in main document");
            return Ok(Some(FormRoot::main_document(Scope::Element(container), true)));
        }
    }
    if !driver.query_all(Scope::Page, &controls)?.is_empty() {
        info!("form controls on main document");
        return Ok(Some(FormRoot::main_document(Scope::Page, true)));
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn iframe_selector_uses_known_hosts_then_first_label() {
        assert_eq!(
            iframe_selector_for("https://boards.greenhouse.io/embed/job_app?for=acme", 0),
            "iframe[src*=\"greenhouse\"]"
        );
        assert_eq!(
            iframe_selector_for("https://careers.acme.com/apply", 2),
            "iframe[src*=\"careers\"]"
        );
        assert_eq!(iframe_selector_for("/relative/form", 2), "iframe:nth-of-type(3)");
    }
}
