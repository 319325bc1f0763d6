//! Get back to the form root recorded at extraction time.

use tracing::{debug, info, warn};

use crate::browser::driver::{Driver, NodeId, Scope};
use crate::browser::selector::{Selector, SelectorList};
use crate::cli::config::AppConfig;
use crate::form::error::FormError;
use crate::form::field_model::FormContext;
use crate::locate::navigation::arrive;
use crate::locate::overlay::dismiss_overlays;

/// How the root was reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RootResolution {
    MainDocument,
    Iframe,
    /// The iframe was gone, so its src was opened as the page.
    DirectNavigation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FillRoot {
    pub scope: Scope,
    pub via: RootResolution,
}

/// Navigate to the posting and wait per the recorded strategy.
pub fn open_posting<D: Driver + ?Sized>(driver: &mut D, url: &str, context: &FormContext, config: &AppConfig) -> Result<(), FormError> {
    let timeouts = &config.timeouts;
    arrive(driver, url, timeouts.navigation, config.extraction.navigation_attempts, timeouts.short_wait)?;
    let load_timeout = context.load_timeout.unwrap_or(timeouts.navigation);
    if let Err(e) = driver.wait_for_load(Scope::Page, context.wait_strategy.load_state(), load_timeout) {
        debug!(error = %e, "page load wait timed out");
    }
    let _ = driver.wait(timeouts.medium_pause);
    dismiss_overlays(driver, Scope::Page, timeouts);
    Ok(())
}

/// Resolve the form root: the main document, the recorded iframe, or the
/// iframe's src opened directly.
pub fn resolve_root<D: Driver + ?Sized>(driver: &mut D, context: &FormContext, config: &AppConfig) -> Result<FillRoot, FormError> {
    let Some(src) = context.iframe_src.as_deref().filter(|_| context.is_iframe) else {
        return Ok(FillRoot {
            scope: Scope::Page,
            via: RootResolution::MainDocument,
        });
    };
    let timeouts = &config.timeouts;
    let _ = driver.wait(timeouts.long_pause);
    let load_timeout = context.load_timeout.unwrap_or(timeouts.navigation);

    if let Some(iframe) = find_iframe(driver, src, timeouts.interaction)? {
        if let Some(frame) = driver.content_frame(iframe)? {
            if let Err(e) = driver.wait_for_load(Scope::Frame(frame), context.wait_strategy.load_state(), load_timeout) {
                debug!(error = %e, "iframe load wait timed out");
            }
            info!(src, "form iframe resolved");
            return Ok(FillRoot {
                scope: Scope::Frame(frame),
                via: RootResolution::Iframe,
            });
        }
    }

    let target = absolute_src(driver, src);
    warn!(src = %target, "form iframe not found, opening its source directly");
    arrive(driver, &target, timeouts.navigation, 1, 0)?;
    if let Err(e) = driver.wait_for_load(Scope::Page, context.wait_strategy.load_state(), load_timeout) {
        debug!(error = %e, "direct load wait timed out");
    }
    dismiss_overlays(driver, Scope::Page, timeouts);
    Ok(FillRoot {
        scope: Scope::Page,
        via: RootResolution::DirectNavigation,
    })
}

/// Exact src match, then a partial match either way, then the only iframe.
fn find_iframe<D: Driver + ?Sized>(driver: &mut D, src: &str, timeout_ms: u64) -> Result<Option<NodeId>, FormError> {
    let exact = SelectorList::from(Selector::tag("iframe").attr_eq("src", src));
    if let Some(node) = driver.wait_for(Scope::Page, &exact, timeout_ms)? {
        return Ok(Some(node));
    }
    let iframes = driver.query_all(Scope::Page, &SelectorList::from(Selector::tag("iframe")))?;
    for &iframe in &iframes {
        let candidate = driver.attr_or_empty(iframe, "src");
        if !candidate.is_empty() && (candidate.contains(src) || src.contains(&candidate)) {
            return Ok(Some(iframe));
        }
    }
    Ok(match iframes.as_slice() {
        [only] => Some(*only),
        _ => None,
    })
}

/// Resolve a relative iframe src against the current page.
fn absolute_src<D: Driver + ?Sized>(driver: &mut D, src: &str) -> String {
    if url::Url::parse(src).is_ok() {
        return src.to_string();
    }
    driver
        .current_url()
        .ok()
        .and_then(|base| url::Url::parse(&base).ok())
        .and_then(|base| base.join(src).ok())
        .map(|u| u.to_string())
        .unwrap_or_else(|| src.to_string())
}
