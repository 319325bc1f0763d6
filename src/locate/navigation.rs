use tracing::{info, warn};

use crate::browser::driver::{Driver, Scope, Script};
use crate::form::error::FormError;

/// Navigate with bounded retries. An HTTP error status is logged but
/// counts as arrival; only transport failures are retried.
pub fn navigate_with_retries<D: Driver + ?Sized>(
    driver: &mut D,
    url: &str,
    timeout_ms: u64,
    attempts: u32,
    backoff_ms: u64,
) -> Result<(), FormError> {
    let attempts = attempts.max(1);
    let mut last_error = String::new();
    for attempt in 1..=attempts {
        match driver.navigate(url, timeout_ms) {
            Ok(Some(status)) if status >= 400 => {
                warn!(url, status, "page answered with an error status");
                return Ok(());
            }
            Ok(_) => {
                info!(url, attempt, "navigated");
                return Ok(());
            }
            Err(e) if e.is_closed() => return Err(FormError::SessionClosed(e.to_string())),
            Err(e) => {
                warn!(url, attempt, error = %e, "navigation attempt failed");
                last_error = e.to_string();
                if attempt < attempts {
                    let _ = driver.wait(backoff_ms * u64::from(attempt));
                }
            }
        }
    }
    Err(FormError::NavigationFailure {
        url: url.to_string(),
        attempts,
        reason: last_error,
    })
}

/// Navigation failures are survivable; a dead page is not.
pub fn ensure_page_alive<D: Driver + ?Sized>(driver: &mut D) -> Result<(), FormError> {
    driver
        .evaluate(Scope::Page, &Script::ReadyState)
        .map(|_| ())
        .map_err(|e| FormError::SessionClosed(e.to_string()))
}

/// Navigate, and on exhausted retries carry on with whatever loaded as
/// long as the page still answers.
pub fn arrive<D: Driver + ?Sized>(
    driver: &mut D,
    url: &str,
    timeout_ms: u64,
    attempts: u32,
    backoff_ms: u64,
) -> Result<(), FormError> {
    match navigate_with_retries(driver, url, timeout_ms, attempts, backoff_ms) {
        Ok(()) => Ok(()),
        Err(e) if e.is_fatal() => Err(e),
        Err(e) => {
            warn!(error = %e, "continuing on the partially loaded page");
            ensure_page_alive(driver)
        }
    }
}
