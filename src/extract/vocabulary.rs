//! Keyword tables and text classifiers shared by the extractors.

const DEMOGRAPHIC_KEYWORDS: &[&str] = &[
    "gender", "race", "ethnicity", "disability", "veteran", "military", "lgbtq", "2slgbtq",
    "heritage", "identity", "colour", "color", "armed forces", "indigenous", "caucasian",
    "hispanic", "asian", "african", "pacific islander", "first nations", "métis", "inuit",
    "woman", "man", "female", "male", "non-binary", "self-identify", "sexual orientation",
    "transgender", "diverse", "minority",
];

const QUESTION_CUES: &[&str] = &[
    "?", "what is your", "do you", "are you", "which of", "please select", "please indicate",
    "identify as", "consider yourself", "describe yourself",
];

const NON_QUESTION_WORDS: &[&str] = &[
    "upload", "file", "pdf", "paste", "browse", "choose file", "attach", "document", "submit",
    "save", "cancel", "next", "previous", "continue", "back", "finish",
];

const ANSWER_EXACT: &[&str] = &[
    "yes", "no", "woman", "man", "male", "female", "non-binary", "transgender",
    "i don't wish to answer", "prefer not to answer", "prefer not to say", "decline to answer",
    "decline to self-identify", "not listed", "other", "none of the above", "select one",
    "choose one",
];

const ANSWER_PREFIXES: &[&str] = &[
    "i am ", "i have ", "i don't ", "i do not ", "i identify", "i consider", "yes -", "no -",
    "yes,", "no,",
];

const RACE_TERMS: &[&str] = &[
    "white", "black", "asian", "hispanic", "latino", "indigenous", "native", "pacific islander",
    "middle eastern", "two or more", "caucasian", "african",
];

pub const RACE_WORDS: &[&str] = &[
    "white", "black", "asian", "hispanic", "caucasian", "african", "indigenous", "race", "ethnicity",
];

pub const GENDER_WORDS: &[&str] = &[
    "woman", "man", "male", "female", "gender", "non-binary", "transgender",
];

/// Phrases that mark upload widgets and helper text rather than questions.
pub const LABEL_JUNK: &[&str] = &[
    "attach", "dropbox", "google drive", "enter manually", "accepted file types", "browse files",
    "drag and drop", "upload file",
];

pub const PLACEHOLDER_TEXTS: &[&str] = &[
    "select...", "choose...", "select", "select an option", "choose an option", "please select",
    "--", "- select -",
];

const CONTROL_WORDS: &[&str] = &["save", "submit", "cancel", "next", "previous", "continue"];
const UPLOAD_WORDS: &[&str] = &["upload pdf", "paste", "upload file", "choose file", "browse"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionCategory {
    Race,
    Gender,
}

fn tokens(text: &str) -> impl Iterator<Item = &str> {
    text.split(|c: char| !(c.is_alphanumeric() || c == '-' || c == '\''))
        .filter(|t| !t.is_empty())
}

/// Keyword match on word boundaries. Multi-word or symbolic keywords match
/// as substrings; long keywords also match inflected words.
pub fn mentions(text: &str, keyword: &str) -> bool {
    let lower = text.to_lowercase();
    if keyword.chars().any(|c| !(c.is_alphanumeric() || c == '-')) {
        return lower.contains(keyword);
    }
    tokens(&lower).any(|t| t == keyword || (keyword.chars().count() >= 5 && t.starts_with(keyword)))
}

pub fn mentions_any(text: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|k| mentions(text, k))
}

pub fn is_placeholder(text: &str) -> bool {
    let lower = text.trim().to_lowercase();
    lower.is_empty() || PLACEHOLDER_TEXTS.contains(&lower.as_str())
}

/// Text that reads like an answer choice rather than a question.
pub fn is_answer_text(text: &str) -> bool {
    let trimmed = text.trim();
    if trimmed.chars().count() > 150 {
        return true;
    }
    let lower = trimmed.to_lowercase();
    if ANSWER_EXACT.contains(&lower.as_str()) {
        return true;
    }
    if ANSWER_PREFIXES.iter().any(|p| lower.starts_with(p)) {
        return true;
    }
    let starts_with_race = RACE_TERMS.iter().any(|r| lower.starts_with(r));
    if starts_with_race
        && !lower.contains('?')
        && (lower.contains('(')
            || lower.contains(" person")
            || lower.contains("having origins")
            || lower.contains("descent")
            || lower.contains("heritage")
            || lower.contains("background")
            || lower.split_whitespace().count() <= 4)
    {
        return true;
    }
    lower.starts_with("yes, i")
        || lower.starts_with("no, i")
        || lower.contains("protected veteran")
        || lower.contains("not a veteran")
}

/// A governing question for a demographics checkbox group: mentions a
/// demographics topic, reads like a question and is not itself an answer.
pub fn is_demographics_question(text: &str) -> bool {
    let trimmed = text.trim();
    let len = trimmed.chars().count();
    if !(5..=300).contains(&len) {
        return false;
    }
    if mentions_any(trimmed, NON_QUESTION_WORDS) {
        return false;
    }
    if !mentions_any(trimmed, DEMOGRAPHIC_KEYWORDS) {
        return false;
    }
    let lower = trimmed.to_lowercase();
    if !QUESTION_CUES.iter().any(|cue| lower.contains(cue)) {
        return false;
    }
    !is_answer_text(trimmed)
}

/// Infer the question of a checkbox group from its option texts alone.
pub fn infer_group_question(option_texts: &[String]) -> Option<&'static str> {
    let joined = option_texts.join(" ").to_lowercase();
    if UPLOAD_WORDS.iter().any(|w| joined.contains(w)) || mentions_any(&joined, CONTROL_WORDS) {
        return None;
    }
    if mentions_any(&joined, &["woman", "man", "female", "male", "non-binary"]) {
        return Some("What is your gender or gender identity?");
    }
    if mentions_any(&joined, &["yes", "no"]) && joined.contains("lgbtq") {
        return Some("Do you identify as a member of the 2SLGBTQIA+ community?");
    }
    if mentions_any(&joined, &["white", "black", "asian", "hispanic", "indigenous"]) {
        return Some("Please select your race/ethnicity");
    }
    if mentions_any(&joined, &["disability", "disabled"]) {
        return Some("Do you have a disability?");
    }
    if mentions_any(&joined, &["veteran", "military", "armed forces"]) {
        return Some("Are you a veteran or military member?");
    }
    None
}

/// Category vocabulary shared by a set of option texts, if any.
pub fn option_categories(option_texts: &[String]) -> Vec<OptionCategory> {
    let joined = option_texts.join(" ");
    let mut out = Vec::new();
    if mentions_any(&joined, RACE_WORDS) {
        out.push(OptionCategory::Race);
    }
    if mentions_any(&joined, GENDER_WORDS) {
        out.push(OptionCategory::Gender);
    }
    out
}
