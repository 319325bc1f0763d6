//! Cookie banners, consent dialogs and modal masks that cover the form.

use tracing::{debug, info};

use crate::browser::driver::{Driver, Scope, Script};
use crate::browser::selector::{Selector, SelectorList};
use crate::cli::config::Timeouts;
use crate::extract::vocabulary::mentions_any;

/// Buttons with these words never dismiss anything.
const REFUSE_WORDS: &[&str] = &["reject", "decline", "deny", "submit", "apply", "next"];
const ACCEPT_WORDS: &[&str] = &["accept", "agree", "allow", "ok", "got it", "continue", "dismiss", "close"];

fn consent_selectors() -> Vec<SelectorList> {
    let within = |container: Selector| Selector::tag("button").within(container);
    let mut out: Vec<SelectorList> = ["Accept", "Accept All", "Accept Cookies", "I Agree", "Agree", "Dismiss", "OK"]
        .iter()
        .map(|text| SelectorList::from(Selector::tag("button").has_text(text)))
        .collect();
    out.extend(
        [
            within(Selector::any().attr_contains("id", "cookie")),
            within(Selector::any().attr_contains("class", "cookie")),
            within(Selector::any().attr_contains("id", "consent")),
            within(Selector::any().attr_contains("class", "consent")),
            within(Selector::any().attr_contains("aria-label", "cookie")),
            within(Selector::any().attr_contains("aria-label", "consent")),
            within(Selector::any().class("cc-compliance")),
            within(Selector::any().class("cookie-banner")),
            within(Selector::any().role("dialog")),
        ]
        .into_iter()
        .map(SelectorList::from),
    );
    out
}

fn close_selectors() -> SelectorList {
    SelectorList::of([
        Selector::any().attr_eq("aria-label", "close"),
        Selector::any().attr_eq("aria-label", "Close"),
        Selector::tag("button").attr_contains("aria-label", "close"),
        Selector::any().class("modal-close"),
        Selector::any().class("dialog-close"),
    ])
}

/// Click the first acceptable consent button, strip click-catching masks
/// and close a visible modal. Returns whether anything was clicked.
pub fn dismiss_overlays<D: Driver + ?Sized>(driver: &mut D, scope: Scope, timeouts: &Timeouts) -> bool {
    let mut dismissed = click_consent(driver, scope, timeouts);

    if let Err(e) = driver.evaluate(scope, &Script::RemoveOverlayMasks) {
        debug!(error = %e, "mask removal skipped");
    }

    let closers = driver.query_all(scope, &close_selectors()).unwrap_or_default();
    for closer in closers {
        if driver.is_visible(closer) && driver.click(closer, timeouts.interaction).is_ok() {
            info!("closed modal");
            let _ = driver.wait(timeouts.short_pause);
            dismissed = true;
            break;
        }
    }
    dismissed
}

fn click_consent<D: Driver + ?Sized>(driver: &mut D, scope: Scope, timeouts: &Timeouts) -> bool {
    for selector in consent_selectors() {
        let buttons = driver.query_all(scope, &selector).unwrap_or_default();
        for button in buttons {
            if !driver.is_visible(button) {
                continue;
            }
            let text = driver.text_content(button).unwrap_or_default();
            if mentions_any(&text, REFUSE_WORDS) || !mentions_any(&text, ACCEPT_WORDS) {
                continue;
            }
            if driver.click(button, timeouts.interaction).is_ok() {
                info!(selector = %selector, "dismissed consent overlay");
                let _ = driver.wait(timeouts.short_pause);
                return true;
            }
        }
    }
    false
}
