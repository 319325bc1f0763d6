use std::collections::{BTreeSet, HashMap};

use tracing::debug;

use crate::extract::vocabulary::{GENDER_WORDS, OptionCategory, RACE_WORDS, mentions_any, option_categories};
use crate::form::field_model::{FieldDescriptor, FieldOption};
use crate::form::normalize::normalize_label;

pub const RACE_QUESTION: &str = "What is your race or ethnicity?";
pub const GENDER_QUESTION: &str = "What is your gender or gender identity?";

const OPTION_OVERLAP: f64 = 0.3;
const LABEL_OVERLAP: f64 = 0.5;
const MIN_SHARED_LABEL_WORDS: usize = 2;

/// Words that every demographics question shares and that say nothing
/// about which question it is.
const FILLER_WORDS: &[&str] = &[
    "a", "an", "and", "any", "are", "as", "do", "does", "for", "how", "i", "identify", "is", "of",
    "or", "please", "select", "that", "the", "to", "what", "which", "you", "your", "all", "apply",
];

/// How much a descriptor says about its question; higher wins.
fn informativeness(field: &FieldDescriptor) -> (u8, bool, bool) {
    let dropdown_rank = match (field.is_dropdown(), field.has_options()) {
        (true, true) => 2,
        (true, false) => 1,
        _ => 0,
    };
    (dropdown_rank, !field.id.is_empty(), !field.upload_options.is_empty())
}

/// Collapse descriptors sharing an identity key. A later duplicate only
/// replaces the kept one when it is strictly more informative.
pub fn dedupe_fields(fields: Vec<FieldDescriptor>) -> Vec<FieldDescriptor> {
    let mut out: Vec<FieldDescriptor> = Vec::with_capacity(fields.len());
    let mut index: HashMap<String, usize> = HashMap::new();

    for field in fields {
        let key = field.identity_key();
        match index.get(&key) {
            Some(&i) => {
                if informativeness(&field) > informativeness(&out[i]) {
                    debug!(key = %key, "replacing duplicate with richer descriptor");
                    out[i] = field;
                }
            }
            None => {
                index.insert(key, out.len());
                out.push(field);
            }
        }
    }
    out
}

fn option_texts(field: &FieldDescriptor) -> Vec<String> {
    field
        .options
        .iter()
        .flatten()
        .map(|o| o.text.clone())
        .collect()
}

fn lowered_set(texts: &[String]) -> BTreeSet<String> {
    texts.iter().map(|t| t.to_lowercase()).collect()
}

fn label_words(label: &str) -> BTreeSet<String> {
    normalize_label(label)
        .split(|c: char| !c.is_alphanumeric() && c != '-')
        .filter(|w| !w.is_empty() && !FILLER_WORDS.contains(w))
        .map(str::to_string)
        .collect()
}

fn overlap_ratio(shared: usize, a: usize, b: usize) -> bool {
    let ratio = |n: usize| n > 0 && shared as f64 / n as f64 >= OPTION_OVERLAP;
    ratio(a) || ratio(b)
}

/// Why two checkbox groups are the same question, if they are.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MergeReason {
    SameLabel,
    SharedCategory(OptionCategory),
    SimilarLabel,
}

fn merge_reason(a: &FieldDescriptor, b: &FieldDescriptor) -> Option<MergeReason> {
    if normalize_label(&a.label) == normalize_label(&b.label) {
        return Some(MergeReason::SameLabel);
    }

    let (texts_a, texts_b) = (option_texts(a), option_texts(b));
    let (set_a, set_b) = (lowered_set(&texts_a), lowered_set(&texts_b));
    let shared = set_a.intersection(&set_b).count();
    if shared > 0 && overlap_ratio(shared, set_a.len(), set_b.len()) {
        let categories_b = option_categories(&texts_b);
        if let Some(category) = option_categories(&texts_a).into_iter().find(|c| categories_b.contains(c)) {
            return Some(MergeReason::SharedCategory(category));
        }
    }

    let (words_a, words_b) = (label_words(&a.label), label_words(&b.label));
    let common = words_a.intersection(&words_b).count();
    let similar = |n: usize| n > 0 && common as f64 / n as f64 >= LABEL_OVERLAP;
    if common >= MIN_SHARED_LABEL_WORDS && (similar(words_a.len()) || similar(words_b.len())) {
        return Some(MergeReason::SimilarLabel);
    }
    None
}

fn absorb(base: &mut FieldDescriptor, other: FieldDescriptor, reason: MergeReason) {
    let mut options: Vec<FieldOption> = base.options.take().unwrap_or_default();
    for option in other.options.into_iter().flatten() {
        if options.iter().all(|o| !o.text.eq_ignore_ascii_case(&option.text)) {
            options.push(option);
        }
    }
    base.options = Some(options);
    base.required |= other.required;

    if let MergeReason::SharedCategory(category) = reason {
        let (words, question) = match category {
            OptionCategory::Race => (RACE_WORDS, RACE_QUESTION),
            OptionCategory::Gender => (GENDER_WORDS, GENDER_QUESTION),
        };
        if !mentions_any(&base.label, words) {
            base.label = question.to_string();
        }
    }
}

/// Merge checkbox groups that describe the same question until no pair is
/// left to merge. Other fields pass through untouched and keep their order.
pub fn merge_checkbox_groups(fields: Vec<FieldDescriptor>) -> Vec<FieldDescriptor> {
    let (mut groups, mut out): (Vec<_>, Vec<_>) = fields.into_iter().partition(|f| f.is_checkbox_group());

    'fixpoint: loop {
        for i in 0..groups.len() {
            for j in (i + 1)..groups.len() {
                if let Some(reason) = merge_reason(&groups[i], &groups[j]) {
                    let other = groups.remove(j);
                    debug!(into = %groups[i].label, from = %other.label, ?reason, "merging checkbox groups");
                    absorb(&mut groups[i], other, reason);
                    continue 'fixpoint;
                }
            }
        }
        break;
    }

    out.extend(groups);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::form::field_model::FieldType;

    fn group(label: &str, options: &[&str]) -> FieldDescriptor {
        let options = options.iter().map(|o| FieldOption::new(o, &o.to_lowercase())).collect();
        let mut field = FieldDescriptor::new("", "", label, FieldType::Dropdown, false).with_options(options, false);
        field.original_type = Some(FieldType::CheckboxGroup);
        field
    }

    #[test]
    fn richer_duplicate_replaces_plain_one() {
        let plain = FieldDescriptor::new("degree", "", "Degree", FieldType::Text, false);
        let rich = FieldDescriptor::new("degree", "", "Degree", FieldType::Dropdown, false)
            .with_options(vec![FieldOption::new("BSc", "bsc"), FieldOption::new("MSc", "msc")], false);
        let out = dedupe_fields(vec![plain, rich.clone()]);
        assert_eq!(out, vec![rich]);
    }

    #[test]
    fn first_seen_wins_on_ties() {
        let a = FieldDescriptor::new("email", "", "Email", FieldType::Email, true);
        let b = FieldDescriptor::new("email", "", "Email address", FieldType::Email, false);
        let out = dedupe_fields(vec![a.clone(), b]);
        assert_eq!(out, vec![a]);
    }

    #[test]
    fn race_fragments_merge_and_relabel() {
        let a = group("Black or African American", &["Black", "White", "Asian"]);
        let b = group("Hispanic or Latino", &["Asian", "Hispanic"]);
        let out = merge_checkbox_groups(vec![a, b]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].options.as_ref().map(Vec::len), Some(4));
    }

    #[test]
    fn gender_and_race_questions_stay_apart() {
        let a = group("What is your gender identity?", &["Woman", "Man"]);
        let b = group("What is your race?", &["White", "Black"]);
        assert_eq!(merge_checkbox_groups(vec![a, b]).len(), 2);
    }

    #[test]
    fn relabel_keeps_category_labels() {
        let a = group("Race", &["White", "Black"]);
        let b = group("Ethnic background", &["Black", "Asian"]);
        let out = merge_checkbox_groups(vec![a, b]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].label, "Race");
    }
}
