use std::fmt;

use serde::{Deserialize, Serialize};

/// How an attribute predicate compares against the attribute value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", content = "value", rename_all = "snake_case")]
pub enum AttrOp {
    Exists,
    Absent,
    Equals(String),
    Contains(String),
    Prefix(String),
    /// Whitespace-separated word match, as used for class names.
    Word(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttrPredicate {
    pub name: String,
    pub op: AttrOp,
}

impl AttrPredicate {
    pub fn matches(&self, value: Option<&str>) -> bool {
        match (&self.op, value) {
            (AttrOp::Exists, v) => v.is_some(),
            (AttrOp::Absent, v) => v.is_none(),
            (_, None) => false,
            (AttrOp::Equals(want), Some(v)) => v == want,
            (AttrOp::Contains(want), Some(v)) => v.contains(want.as_str()),
            (AttrOp::Prefix(want), Some(v)) => v.starts_with(want.as_str()),
            (AttrOp::Word(want), Some(v)) => v.split_whitespace().any(|w| w == want),
        }
    }

    fn render(&self, out: &mut String) {
        let name = &self.name;
        match &self.op {
            AttrOp::Exists => out.push_str(&format!("[{}]", name)),
            AttrOp::Absent => out.push_str(&format!(":not([{}])", name)),
            AttrOp::Equals(v) => out.push_str(&format!("[{}=\"{}\"]", name, escape(v))),
            AttrOp::Contains(v) => out.push_str(&format!("[{}*=\"{}\"]", name, escape(v))),
            AttrOp::Prefix(v) => out.push_str(&format!("[{}^=\"{}\"]", name, escape(v))),
            AttrOp::Word(v) => out.push_str(&format!("[{}~=\"{}\"]", name, escape(v))),
        }
    }
}

/// A single compound selector: optional tag, attribute predicates, a
/// case-insensitive text constraint and an optional ancestor constraint.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Selector {
    pub tag: Option<String>,
    pub attrs: Vec<AttrPredicate>,
    pub has_text: Option<String>,
    pub within: Option<Box<Selector>>,
}

impl Selector {
    pub fn tag(tag: &str) -> Self {
        Selector {
            tag: Some(tag.to_ascii_lowercase()),
            ..Default::default()
        }
    }

    pub fn any() -> Self {
        Selector::default()
    }

    fn with(mut self, name: &str, op: AttrOp) -> Self {
        self.attrs.push(AttrPredicate {
            name: name.to_string(),
            op,
        });
        self
    }

    pub fn attr(self, name: &str) -> Self {
        self.with(name, AttrOp::Exists)
    }

    pub fn without(self, name: &str) -> Self {
        self.with(name, AttrOp::Absent)
    }

    pub fn attr_eq(self, name: &str, value: &str) -> Self {
        self.with(name, AttrOp::Equals(value.to_string()))
    }

    pub fn attr_contains(self, name: &str, value: &str) -> Self {
        self.with(name, AttrOp::Contains(value.to_string()))
    }

    pub fn attr_prefix(self, name: &str, value: &str) -> Self {
        self.with(name, AttrOp::Prefix(value.to_string()))
    }

    pub fn class(self, class: &str) -> Self {
        self.with("class", AttrOp::Word(class.to_string()))
    }

    pub fn id(self, id: &str) -> Self {
        self.attr_eq("id", id)
    }

    pub fn role(self, role: &str) -> Self {
        self.attr_eq("role", role)
    }

    pub fn has_text(mut self, text: &str) -> Self {
        self.has_text = Some(text.to_string());
        self
    }

    pub fn within(mut self, ancestor: Selector) -> Self {
        self.within = Some(Box::new(ancestor));
        self
    }

    /// Tag and attribute part of the match. Text and ancestor constraints
    /// need the tree and are checked by the caller.
    pub fn matches_local<'a>(&self, tag: &str, attr: impl Fn(&str) -> Option<&'a str>) -> bool {
        if let Some(want) = &self.tag {
            if !want.eq_ignore_ascii_case(tag) {
                return false;
            }
        }
        self.attrs.iter().all(|p| p.matches(attr(&p.name)))
    }

    /// Playwright selector string for this compound selector.
    pub fn render(&self) -> String {
        let mut out = String::new();
        if let Some(anc) = &self.within {
            out.push_str(&anc.render());
            out.push(' ');
        }
        match &self.tag {
            Some(tag) => out.push_str(tag),
            None if self.attrs.is_empty() && self.has_text.is_none() => out.push('*'),
            None => {}
        }
        for attr in &self.attrs {
            attr.render(&mut out);
        }
        if let Some(text) = &self.has_text {
            out.push_str(&format!(":has-text(\"{}\")", escape(text)));
        }
        out
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

/// Comma-separated selector group. Matches are returned in document order.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SelectorList(pub Vec<Selector>);

impl SelectorList {
    pub fn of(selectors: impl IntoIterator<Item = Selector>) -> Self {
        SelectorList(selectors.into_iter().collect())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Selector> {
        self.0.iter()
    }

    pub fn render(&self) -> String {
        self.0.iter().map(Selector::render).collect::<Vec<_>>().join(", ")
    }
}

impl From<Selector> for SelectorList {
    fn from(selector: Selector) -> Self {
        SelectorList(vec![selector])
    }
}

impl fmt::Display for SelectorList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

fn escape(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
