//! Simulated device location and the post-fill "locate me" pass.

use std::collections::HashSet;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::browser::driver::{Driver, Geolocation, NodeId, Scope};
use crate::browser::selector::{Selector, SelectorList};
use crate::cli::config::{GeolocationConfig, Timeouts};
use crate::form::error::FormError;
use crate::form::field_model::UserInputEntry;
use crate::form::fingerprint::control_identity;

/// IP lookups resolve to a city at best.
const IP_LOOKUP_ACCURACY: f64 = 10_000.0;

const LOCATION_KEYWORDS: &[&str] = &["location", "city", "state", "country", "address", "zip", "postal"];
const LOCATE_PHRASES: &[&str] = &[
    "Locate me",
    "Use my location",
    "Current location",
    "Detect location",
    "Auto-detect",
];
const LOCATE_WORDS: &[&str] = &["locate", "location", "gps", "detect", "current"];

#[derive(Debug, Deserialize)]
struct IpLocation {
    lat: f64,
    lon: f64,
}

/// Coordinates to grant the page: an IP lookup when configured, else the
/// configured point.
pub fn resolve_coordinates(config: &GeolocationConfig) -> Geolocation {
    let fallback = Geolocation {
        latitude: config.latitude,
        longitude: config.longitude,
        accuracy: config.accuracy,
    };
    let Some(url) = config.lookup_url.as_deref() else {
        return fallback;
    };
    match lookup(url, config.lookup_timeout_ms) {
        Ok(found) => {
            info!(lat = found.lat, lon = found.lon, "location resolved from IP");
            Geolocation {
                latitude: found.lat,
                longitude: found.lon,
                accuracy: IP_LOOKUP_ACCURACY,
            }
        }
        Err(e) => {
            warn!(url, error = %e, "IP location lookup failed, using configured coordinates");
            fallback
        }
    }
}

fn lookup(url: &str, timeout_ms: u64) -> Result<IpLocation, reqwest::Error> {
    let client = reqwest::blocking::Client::builder()
        .timeout(Duration::from_millis(timeout_ms))
        .build()?;
    client.get(url).send()?.error_for_status()?.json()
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GeoReport {
    pub controls_clicked: usize,
    pub fields_checked: usize,
    pub fields_populated: usize,
}

fn locate_controls() -> SelectorList {
    let mut selectors = Vec::new();
    for phrase in LOCATE_PHRASES {
        selectors.push(Selector::tag("button").has_text(phrase));
        selectors.push(Selector::tag("a").has_text(phrase));
        selectors.push(Selector::any().role("button").has_text(phrase));
    }
    for class in ["locate-me", "location-btn", "geo-locate", "use-location", "detect-location", "auto-location"] {
        selectors.push(Selector::any().class(class));
    }
    selectors.push(Selector::any().id("locate-me"));
    selectors.push(Selector::any().id("location-btn"));
    for attr in ["aria-label", "title", "data-testid", "data-qa", "class"] {
        selectors.push(Selector::tag("button").attr_contains(attr, "locat"));
        selectors.push(Selector::tag("button").attr_contains(attr, "gps"));
    }
    SelectorList::of(selectors)
}

/// Whether the control reads like a locate-me affordance.
fn is_locate_control<D: Driver + ?Sized>(driver: &mut D, node: NodeId) -> Result<bool, FormError> {
    let tag = driver.tag_name(node)?;
    if matches!(tag.as_str(), "input" | "select" | "textarea") {
        return Ok(false);
    }
    let text = format!(
        "{} {} {} {} {}",
        driver.text_content(node)?,
        driver.attr_or_empty(node, "aria-label"),
        driver.attr_or_empty(node, "title"),
        driver.attr_or_empty(node, "class"),
        driver.attr_or_empty(node, "id"),
    )
    .to_lowercase();
    Ok(LOCATE_WORDS.iter().any(|w| text.contains(w)))
}

/// Click every visible locate-me control once, then check that the
/// location-like entries hold a value.
pub fn run_geolocation_pass<D: Driver + ?Sized>(
    driver: &mut D,
    root: Scope,
    entries: &[UserInputEntry],
    timeouts: &Timeouts,
) -> Result<GeoReport, FormError> {
    let mut report = GeoReport::default();
    let mut clicked: HashSet<String> = HashSet::new();

    for node in driver.query_all(root, &locate_controls())? {
        if !driver.is_visible(node) || !is_locate_control(driver, node)? {
            continue;
        }
        let identity = control_identity(driver, node)?;
        if !clicked.insert(identity) {
            continue;
        }
        let _ = driver.scroll_into_view(node);
        match driver.click(node, timeouts.interaction) {
            Ok(()) => {
                report.controls_clicked += 1;
                debug!(node = node.0, "locate control clicked");
                let _ = driver.wait(timeouts.dynamic_loading_wait);
            }
            Err(e) if e.is_closed() => return Err(e.into()),
            Err(e) => debug!(node = node.0, error = %e, "locate control click failed"),
        }
    }

    for entry in entries.iter().filter(|e| is_location_entry(e)) {
        report.fields_checked += 1;
        if location_populated(driver, root, entry.control_id())? {
            report.fields_populated += 1;
        } else {
            debug!(field = %entry.id, "location field still empty");
        }
    }

    info!(
        clicked = report.controls_clicked,
        checked = report.fields_checked,
        populated = report.fields_populated,
        "geolocation pass done"
    );
    Ok(report)
}

pub fn is_location_entry(entry: &UserInputEntry) -> bool {
    let text = format!("{} {}", entry.id, entry.question).to_lowercase();
    LOCATION_KEYWORDS.iter().any(|k| text.contains(k))
}

fn location_populated<D: Driver + ?Sized>(driver: &mut D, root: Scope, id: &str) -> Result<bool, FormError> {
    if id.is_empty() {
        return Ok(false);
    }
    let selector = SelectorList::of([
        Selector::any().id(id),
        Selector::tag("select").id(id),
        Selector::tag("input").id(id),
        Selector::any().role("combobox").id(id),
    ]);
    let Some(node) = driver.query(root, &selector)? else {
        return Ok(false);
    };
    let populated = match driver.tag_name(node)?.as_str() {
        "select" | "input" | "textarea" => !driver.input_value(node)?.trim().is_empty(),
        _ => {
            let text = driver.text_content(node)?;
            let text = text.trim();
            !text.is_empty() && !text.to_lowercase().contains("select")
        }
    };
    Ok(populated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::form::field_model::FieldType;

    #[test]
    fn location_entries_match_on_id_or_question() {
        let city = UserInputEntry::new("candidate_city", "Where are you based?", FieldType::Text, false);
        let zip = UserInputEntry::new("q7", "ZIP code", FieldType::Text, false);
        let name = UserInputEntry::new("first_name", "First Name", FieldType::Text, true);
        assert!(is_location_entry(&city));
        assert!(is_location_entry(&zip));
        assert!(!is_location_entry(&name));
    }

    #[test]
    fn no_lookup_url_uses_configured_point() {
        let config = GeolocationConfig::default();
        let point = resolve_coordinates(&config);
        assert_eq!(point.latitude, 37.7749);
        assert_eq!(point.longitude, -122.4194);
    }
}
