use std::sync::LazyLock;

use regex::Regex;

static HEX_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+[a-f0-9]{8}$").expect("valid hex-suffix pattern"));
static REQUIRED_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\s*\(required\)\s*").expect("valid required pattern"));

pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Strip asterisks, "(required)" markers and generated 8-hex-digit suffixes
/// from a label and collapse its whitespace.
pub fn clean_label(raw: &str) -> String {
    let text = raw.replace('*', "");
    let text = REQUIRED_MARKER.replace_all(&text, " ");
    let text = collapse_whitespace(&text);
    let text = HEX_SUFFIX.replace(&text, "");
    collapse_whitespace(&text)
}

/// Identity form of a label: cleaned and lowercased.
pub fn normalize_label(raw: &str) -> String {
    clean_label(raw).to_lowercase()
}

/// `First Name` → `first_name`, dropping punctuation.
pub fn slugify(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.trim().to_lowercase().chars() {
        match c {
            ' ' | '\t' | '\n' | '/' => out.push('_'),
            ',' | '(' | ')' | '.' | '?' | '\'' | '"' | '*' | ':' => {}
            other => out.push(other),
        }
    }
    out
}

/// Value used for a native `<option>` without a `value` attribute.
pub fn native_option_value(text: &str) -> String {
    text.trim().to_lowercase().replace(' ', "_")
}

/// `first_name` / `firstName-2` → `First Name 2`
pub fn title_case_identifier(identifier: &str) -> String {
    identifier
        .replace(['_', '-'], " ")
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn text_fingerprint(text: &str) -> String {
    use sha1::{Digest, Sha1};

    let mut hasher = Sha1::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

pub fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| haystack.contains(n))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_label_strips_markers() {
        assert_eq!(clean_label("First Name *"), "First Name");
        assert_eq!(clean_label("Email (required)"), "Email");
        assert_eq!(clean_label("LinkedIn  Profile 1a2b3c4d"), "LinkedIn Profile");
        assert_eq!(clean_label("  What is\n your   gender? "), "What is your gender?");
    }

    #[test]
    fn clean_label_strips_hex_suffix_behind_required_marker() {
        assert_eq!(clean_label("Portfolio 1a2b3c4d (required)"), "Portfolio");
        assert_eq!(clean_label("Portfolio 1a2b3c4d *"), "Portfolio");
    }

    #[test]
    fn slugify_drops_punctuation() {
        assert_eq!(slugify("Hispanic or Latino (any race)"), "hispanic_or_latino_any_race");
        assert_eq!(slugify("Resume/CV"), "resume_cv");
        assert_eq!(slugify("Are you a veteran?"), "are_you_a_veteran");
    }

    #[test]
    fn title_case_from_identifier() {
        assert_eq!(title_case_identifier("first_name"), "First Name");
        assert_eq!(title_case_identifier("job-title"), "Job Title");
    }
}
