//! In-memory DOM driver.
//!
//! A snapshot is a serialized page tree (tags, attributes, own text, current
//! value, layout rect) with iframe documents nested under their host
//! element. [`SnapshotDom`] flattens it into an arena and answers the whole
//! [`Driver`] interface deterministically: the CLI uses it to extract forms
//! from saved pages and the test suite uses it as the browser.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::browser::driver::{
    AriaRole, BoundingBox, ClickOutcome, Driver, FrameId, Geolocation, Key, LoadState, NodeId,
    OptionPick, Scope, Script, TextBlock,
};
use crate::browser::error::DriverError;
use crate::browser::selector::{Selector, SelectorList};

const TEXT_TAGS: &[&str] = &[
    "div", "span", "p", "label", "legend", "strong", "h1", "h2", "h3", "h4", "h5", "h6",
];

fn is_false(b: &bool) -> bool {
    !*b
}

/// One element of a serialized snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SnapshotNode {
    pub tag: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attrs: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rect: Option<BoundingBox>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub hidden: bool,
    /// Not in the DOM until End is pressed while its popup is open.
    #[serde(default, skip_serializing_if = "is_false")]
    pub lazy: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<SnapshotNode>,
    /// Document loaded inside an `<iframe>`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame: Option<Box<SnapshotDocument>>,
}

impl SnapshotNode {
    pub fn new(tag: &str) -> Self {
        SnapshotNode {
            tag: tag.to_ascii_lowercase(),
            ..Default::default()
        }
    }

    pub fn attr(mut self, name: &str, value: &str) -> Self {
        self.attrs.insert(name.to_string(), value.to_string());
        self
    }

    pub fn id(self, id: &str) -> Self {
        self.attr("id", id)
    }

    pub fn text(mut self, text: &str) -> Self {
        self.text = Some(text.to_string());
        self
    }

    pub fn value(mut self, value: &str) -> Self {
        self.value = Some(value.to_string());
        self
    }

    pub fn rect(mut self, x: f64, y: f64, width: f64, height: f64) -> Self {
        self.rect = Some(BoundingBox::new(x, y, width, height));
        self
    }

    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    pub fn lazy(mut self) -> Self {
        self.lazy = true;
        self
    }

    pub fn child(mut self, child: SnapshotNode) -> Self {
        self.children.push(child);
        self
    }

    pub fn children(mut self, children: impl IntoIterator<Item = SnapshotNode>) -> Self {
        self.children.extend(children);
        self
    }

    pub fn frame(mut self, document: SnapshotDocument) -> Self {
        self.frame = Some(Box::new(document));
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotDocument {
    pub url: String,
    #[serde(default)]
    pub title: String,
    pub root: SnapshotNode,
}

impl SnapshotDocument {
    pub fn new(url: &str, title: &str, root: SnapshotNode) -> Self {
        SnapshotDocument {
            url: url.to_string(),
            title: title.to_string(),
            root,
        }
    }
}

/// Side effects observed by the snapshot, for inspection by callers.
#[derive(Debug, Clone, Default)]
pub struct InteractionLog {
    pub clicks: Vec<NodeId>,
    pub uploads: Vec<(NodeId, PathBuf)>,
    pub navigations: Vec<String>,
    pub keys: Vec<Key>,
    pub screenshots: Vec<PathBuf>,
}

#[derive(Debug, Clone)]
struct ArenaNode {
    tag: String,
    attrs: BTreeMap<String, String>,
    text: Option<String>,
    value: Option<String>,
    rect: Option<BoundingBox>,
    hidden: bool,
    /// Live checkedness; the `checked` attribute only seeds it.
    checked: bool,
    detached: bool,
    parent: Option<usize>,
    children: Vec<usize>,
    frame_doc: Option<usize>,
}

#[derive(Debug, Clone)]
struct ArenaDocument {
    url: String,
    title: String,
    root: usize,
}

pub struct SnapshotDom {
    nodes: Vec<ArenaNode>,
    documents: Vec<ArenaDocument>,
    current: usize,
    revealed: Vec<usize>,
    geolocation: Option<Geolocation>,
    log: InteractionLog,
}

impl SnapshotDom {
    /// Build a driver whose current page is `page`.
    pub fn new(page: SnapshotDocument) -> Self {
        Self::with_pages(vec![page])
    }

    /// Several navigable pages; the first one is current.
    pub fn with_pages(pages: Vec<SnapshotDocument>) -> Self {
        let mut dom = SnapshotDom {
            nodes: Vec::new(),
            documents: Vec::new(),
            current: 0,
            revealed: Vec::new(),
            geolocation: None,
            log: InteractionLog::default(),
        };
        for page in pages {
            dom.add_document(page);
        }
        dom
    }

    pub fn from_json(json: &str) -> Result<Self, DriverError> {
        let page: SnapshotDocument =
            serde_json::from_str(json).map_err(|e| DriverError::JsonParse {
                context: "DOM snapshot".into(),
                source: e,
            })?;
        Ok(Self::new(page))
    }

    pub fn load(path: &Path) -> Result<Self, DriverError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            DriverError::SessionIO(format!("failed to read snapshot {}: {}", path.display(), e))
        })?;
        Self::from_json(&content)
    }

    pub fn log(&self) -> &InteractionLog {
        &self.log
    }

    pub fn granted_geolocation(&self) -> Option<Geolocation> {
        self.geolocation
    }

    /// First element in any document whose `id` equals `id`.
    pub fn find_by_id(&self, id: &str) -> Option<NodeId> {
        self.nodes
            .iter()
            .position(|n| n.attrs.get("id").map(String::as_str) == Some(id))
            .map(|i| NodeId(i as u64))
    }

    pub fn value_of(&self, node: NodeId) -> Option<String> {
        self.nodes.get(node.0 as usize).and_then(|n| n.value.clone())
    }

    pub fn attribute_of(&self, node: NodeId, name: &str) -> Option<String> {
        self.nodes
            .get(node.0 as usize)
            .and_then(|n| n.attrs.get(name).cloned())
    }

    fn add_document(&mut self, document: SnapshotDocument) -> usize {
        let doc_index = self.documents.len();
        self.documents.push(ArenaDocument {
            url: document.url,
            title: document.title,
            root: 0,
        });
        let root = self.add_node(document.root, None);
        self.documents[doc_index].root = root;
        doc_index
    }

    fn add_node(&mut self, node: SnapshotNode, parent: Option<usize>) -> usize {
        let index = self.nodes.len();
        let checked = node.attrs.contains_key("checked");
        self.nodes.push(ArenaNode {
            tag: node.tag.to_ascii_lowercase(),
            checked,
            detached: node.lazy,
            attrs: node.attrs,
            text: node.text,
            value: node.value,
            rect: node.rect,
            hidden: node.hidden,
            parent,
            children: Vec::new(),
            frame_doc: None,
        });
        for child in node.children {
            let child_index = self.add_node(child, Some(index));
            self.nodes[index].children.push(child_index);
        }
        if let Some(frame) = node.frame {
            let doc = self.add_document(*frame);
            self.nodes[index].frame_doc = Some(doc);
        }
        index
    }

    fn node(&self, node: NodeId) -> Result<&ArenaNode, DriverError> {
        self.nodes
            .get(node.0 as usize)
            .ok_or_else(|| DriverError::ElementNotFound(format!("node {}", node.0)))
    }

    fn index(&self, node: NodeId) -> Result<usize, DriverError> {
        self.node(node).map(|_| node.0 as usize)
    }

    fn attr(&self, index: usize, name: &str) -> Option<&str> {
        self.nodes[index].attrs.get(name).map(String::as_str)
    }

    fn describe(&self, index: usize) -> String {
        let node = &self.nodes[index];
        match node.attrs.get("id") {
            Some(id) => format!("<{} id={}>", node.tag, id),
            None => format!("<{}>", node.tag),
        }
    }

    fn document_of(&self, mut index: usize) -> usize {
        while let Some(parent) = self.nodes[index].parent {
            index = parent;
        }
        self.documents
            .iter()
            .position(|d| d.root == index)
            .unwrap_or(self.current)
    }

    fn scope_roots(&self, scope: Scope) -> Result<(Vec<usize>, bool), DriverError> {
        match scope {
            Scope::Page => Ok((vec![self.documents[self.current].root], true)),
            Scope::Frame(FrameId(doc)) => self
                .documents
                .get(doc as usize)
                .map(|d| (vec![d.root], true))
                .ok_or_else(|| DriverError::PageClosed(format!("frame {} detached", doc))),
            Scope::Element(node) => Ok((vec![self.index(node)?], false)),
        }
    }

    /// Pre-order traversal of a scope, excluding nested frame documents.
    fn walk(&self, scope: Scope) -> Result<Vec<usize>, DriverError> {
        let (roots, include_root) = self.scope_roots(scope)?;
        let mut out = Vec::new();
        for root in roots {
            if include_root {
                out.push(root);
            }
            let mut stack: Vec<usize> = self.nodes[root].children.iter().rev().copied().collect();
            while let Some(index) = stack.pop() {
                if self.nodes[index].detached {
                    continue;
                }
                out.push(index);
                stack.extend(self.nodes[index].children.iter().rev().copied());
            }
        }
        Ok(out)
    }

    fn is_rendered(&self, index: usize) -> bool {
        let mut current = Some(index);
        while let Some(i) = current {
            if self.nodes[i].hidden {
                return false;
            }
            current = self.nodes[i].parent;
        }
        true
    }

    fn visible_rect(&self, index: usize) -> Option<BoundingBox> {
        if !self.is_rendered(index) {
            return None;
        }
        self.nodes[index].rect.filter(BoundingBox::is_visible)
    }

    fn rendered_text(&self, index: usize) -> String {
        let mut lines = Vec::new();
        self.collect_text(index, true, &mut lines);
        lines.join("\n")
    }

    fn collect_text(&self, index: usize, is_root: bool, lines: &mut Vec<String>) {
        let node = &self.nodes[index];
        if !is_root && node.hidden {
            return;
        }
        if let Some(text) = &node.text {
            let trimmed = text.trim();
            if !trimmed.is_empty() {
                lines.push(trimmed.to_string());
            }
        }
        for &child in &node.children {
            self.collect_text(child, false, lines);
        }
    }

    fn matches(&self, index: usize, selector: &Selector) -> bool {
        let node = &self.nodes[index];
        if !selector.matches_local(&node.tag, |name| node.attrs.get(name).map(String::as_str)) {
            return false;
        }
        if let Some(needle) = &selector.has_text {
            let haystack = normalize_ws(&self.rendered_text(index)).to_lowercase();
            if !haystack.contains(&normalize_ws(needle).to_lowercase()) {
                return false;
            }
        }
        if let Some(ancestor) = &selector.within {
            let mut current = node.parent;
            let mut found = false;
            while let Some(p) = current {
                if self.matches(p, ancestor) {
                    found = true;
                    break;
                }
                current = self.nodes[p].parent;
            }
            if !found {
                return false;
            }
        }
        true
    }

    fn matches_list(&self, index: usize, list: &SelectorList) -> bool {
        list.iter().any(|s| self.matches(index, s))
    }

    fn role_of(&self, index: usize) -> Option<AriaRole> {
        let node = &self.nodes[index];
        if let Some(role) = node.attrs.get("role") {
            return match role.split_whitespace().next().unwrap_or("") {
                "textbox" => Some(AriaRole::Textbox),
                "combobox" => Some(AriaRole::Combobox),
                "listbox" => Some(AriaRole::Listbox),
                "option" => Some(AriaRole::Option),
                "button" => Some(AriaRole::Button),
                "group" => Some(AriaRole::Group),
                "checkbox" => Some(AriaRole::Checkbox),
                "radio" => Some(AriaRole::Radio),
                "link" => Some(AriaRole::Link),
                _ => None,
            };
        }
        match node.tag.as_str() {
            "input" => match node.attrs.get("type").map(|t| t.to_ascii_lowercase()).as_deref() {
                None | Some("text") | Some("email") | Some("tel") | Some("url") | Some("search") => {
                    Some(AriaRole::Textbox)
                }
                Some("checkbox") => Some(AriaRole::Checkbox),
                Some("radio") => Some(AriaRole::Radio),
                Some("submit") | Some("button") | Some("reset") => Some(AriaRole::Button),
                _ => None,
            },
            "textarea" => Some(AriaRole::Textbox),
            "select" if node.attrs.contains_key("multiple") => Some(AriaRole::Listbox),
            "select" => Some(AriaRole::Combobox),
            "button" => Some(AriaRole::Button),
            "option" => Some(AriaRole::Option),
            "fieldset" => Some(AriaRole::Group),
            "a" if node.attrs.contains_key("href") => Some(AriaRole::Link),
            _ => None,
        }
    }

    fn name_of(&self, index: usize) -> String {
        let node = &self.nodes[index];
        if let Some(label) = node.attrs.get("aria-label").filter(|l| !l.trim().is_empty()) {
            return normalize_ws(label);
        }
        if let Some(ids) = node.attrs.get("aria-labelledby") {
            let doc = self.document_of(index);
            let names: Vec<String> = ids
                .split_whitespace()
                .filter_map(|id| self.find_in_document(doc, |n| n.attrs.get("id").map(String::as_str) == Some(id)))
                .map(|i| self.rendered_text(i))
                .collect();
            if !names.is_empty() {
                return normalize_ws(&names.join(" "));
            }
        }
        match node.tag.as_str() {
            "input" | "select" | "textarea" => {
                if let Some(id) = node.attrs.get("id") {
                    let doc = self.document_of(index);
                    if let Some(label) = self.find_in_document(doc, |n| {
                        n.tag == "label" && n.attrs.get("for") == Some(id)
                    }) {
                        return normalize_ws(&self.rendered_text(label));
                    }
                }
                let mut current = node.parent;
                while let Some(p) = current {
                    if self.nodes[p].tag == "label" {
                        return normalize_ws(&self.rendered_text(p));
                    }
                    current = self.nodes[p].parent;
                }
                node.attrs
                    .get("placeholder")
                    .or_else(|| node.attrs.get("title"))
                    .map(|s| normalize_ws(s))
                    .unwrap_or_default()
            }
            "fieldset" => node
                .children
                .iter()
                .find(|&&c| self.nodes[c].tag == "legend")
                .map(|&c| normalize_ws(&self.rendered_text(c)))
                .unwrap_or_default(),
            _ => normalize_ws(&self.rendered_text(index)),
        }
    }

    fn find_in_document(&self, doc: usize, pred: impl Fn(&ArenaNode) -> bool) -> Option<usize> {
        let root = self.documents.get(doc)?.root;
        let mut stack = vec![root];
        while let Some(index) = stack.pop() {
            if pred(&self.nodes[index]) {
                return Some(index);
            }
            stack.extend(self.nodes[index].children.iter().rev().copied());
        }
        None
    }

    fn close_revealed(&mut self) {
        for index in std::mem::take(&mut self.revealed) {
            self.nodes[index].hidden = true;
        }
        for node in &mut self.nodes {
            if node.attrs.get("aria-expanded").map(String::as_str) == Some("true") {
                node.attrs.insert("aria-expanded".into(), "false".into());
            }
        }
    }

    /// Lazy rows under an open popup join the DOM and stay.
    fn load_more(&mut self) {
        for index in 0..self.nodes.len() {
            if self.nodes[index].detached && self.under_open_popup(index) {
                self.nodes[index].detached = false;
            }
        }
    }

    fn under_open_popup(&self, index: usize) -> bool {
        let mut current = self.nodes[index].parent;
        while let Some(i) = current {
            if self.revealed.contains(&i) {
                return true;
            }
            current = self.nodes[i].parent;
        }
        false
    }

    fn apply_click(&mut self, index: usize) {
        self.log.clicks.push(NodeId(index as u64));
        let doc = self.document_of(index);

        // Popup triggers reveal the element they control.
        if let Some(target_id) = self.nodes[index].attrs.get("aria-controls").cloned() {
            if let Some(target) = self.find_in_document(doc, |n| n.attrs.get("id") == Some(&target_id)) {
                if self.nodes[target].hidden {
                    self.nodes[target].hidden = false;
                    self.revealed.push(target);
                }
                self.nodes[index].attrs.insert("aria-expanded".into(), "true".into());
            }
            return;
        }

        let tag = self.nodes[index].tag.clone();
        let input_type = self.attr(index, "type").map(str::to_ascii_lowercase);
        match (tag.as_str(), input_type.as_deref()) {
            ("input", Some("checkbox")) => {
                let node = &mut self.nodes[index];
                node.checked = !node.checked;
            }
            ("input", Some("radio")) => {
                let name = self.attr(index, "name").map(str::to_string);
                if let Some(name) = name {
                    for i in self.walk_document(doc) {
                        if self.attr(i, "type") == Some("radio") && self.attr(i, "name") == Some(name.as_str()) {
                            self.nodes[i].checked = false;
                        }
                    }
                }
                self.nodes[index].checked = true;
            }
            _ => self.choose_listbox_option(index, doc),
        }
    }

    /// Clicking an option inside a revealed listbox sets the owning
    /// trigger's value and closes the popup.
    fn choose_listbox_option(&mut self, index: usize, doc: usize) {
        let is_option = self.attr(index, "role") == Some("option") || self.nodes[index].tag == "li";
        if !is_option {
            return;
        }
        let mut current = self.nodes[index].parent;
        while let Some(p) = current {
            if let Some(listbox_id) = self.attr(p, "id").map(str::to_string) {
                let trigger = self.find_in_document(doc, |n| {
                    n.attrs.get("aria-controls") == Some(&listbox_id)
                });
                if let Some(trigger) = trigger {
                    let text = normalize_ws(&self.rendered_text(index));
                    self.nodes[trigger].value = Some(text);
                    self.close_revealed();
                    return;
                }
            }
            current = self.nodes[p].parent;
        }
    }

    fn walk_document(&self, doc: usize) -> Vec<usize> {
        self.walk(Scope::Frame(FrameId(doc as u64))).unwrap_or_default()
    }

    fn option_value(&self, index: usize) -> String {
        self.attr(index, "value")
            .map(str::to_string)
            .unwrap_or_else(|| normalize_ws(&self.rendered_text(index)))
    }
}

fn normalize_ws(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

impl Driver for SnapshotDom {
    fn query_all(&mut self, scope: Scope, selector: &SelectorList) -> Result<Vec<NodeId>, DriverError> {
        Ok(self
            .walk(scope)?
            .into_iter()
            .filter(|&i| self.matches_list(i, selector))
            .map(|i| NodeId(i as u64))
            .collect())
    }

    fn bounding_box(&mut self, node: NodeId) -> Result<Option<BoundingBox>, DriverError> {
        let index = self.index(node)?;
        Ok(self.visible_rect(index))
    }

    fn scroll_into_view(&mut self, node: NodeId) -> Result<(), DriverError> {
        self.index(node).map(|_| ())
    }

    fn evaluate(&mut self, scope: Scope, script: &Script) -> Result<Value, DriverError> {
        let root = self.scope_roots(scope)?.0[0];
        match script {
            Script::ReadyState => Ok(Value::String("complete".into())),
            Script::CloseOpenListboxes => {
                self.close_revealed();
                Ok(Value::Null)
            }
            Script::RemoveOverlayMasks => Ok(Value::Null),
            Script::SuccessTextPresent { phrases } => {
                let body = self.rendered_text(root).to_lowercase();
                Ok(Value::Bool(
                    phrases.iter().any(|p| body.contains(&p.to_lowercase())),
                ))
            }
            Script::BodyText => Ok(Value::String(self.rendered_text(root))),
        }
    }

    fn tag_name(&mut self, node: NodeId) -> Result<String, DriverError> {
        Ok(self.node(node)?.tag.clone())
    }

    fn attribute(&mut self, node: NodeId, name: &str) -> Result<Option<String>, DriverError> {
        Ok(self.node(node)?.attrs.get(name).cloned())
    }

    fn text_content(&mut self, node: NodeId) -> Result<String, DriverError> {
        let index = self.index(node)?;
        Ok(self.rendered_text(index))
    }

    fn parent(&mut self, node: NodeId) -> Result<Option<NodeId>, DriverError> {
        Ok(self.node(node)?.parent.map(|p| NodeId(p as u64)))
    }

    fn is_checked(&mut self, node: NodeId) -> Result<bool, DriverError> {
        Ok(self.node(node)?.checked)
    }

    fn accessible_name(&mut self, node: NodeId) -> Result<String, DriverError> {
        let index = self.index(node)?;
        Ok(self.name_of(index))
    }

    fn input_value(&mut self, node: NodeId) -> Result<String, DriverError> {
        let index = self.index(node)?;
        if let Some(value) = &self.nodes[index].value {
            return Ok(value.clone());
        }
        if self.nodes[index].tag == "select" {
            let first = self.nodes[index]
                .children
                .iter()
                .copied()
                .find(|&c| self.nodes[c].tag == "option");
            return Ok(first.map(|c| self.option_value(c)).unwrap_or_default());
        }
        Ok(String::new())
    }

    fn text_blocks(&mut self, scope: Scope) -> Result<Vec<TextBlock>, DriverError> {
        let mut blocks = Vec::new();
        for index in self.walk(scope)? {
            if !TEXT_TAGS.contains(&self.nodes[index].tag.as_str()) {
                continue;
            }
            let Some(rect) = self.visible_rect(index) else {
                continue;
            };
            let text = self.rendered_text(index);
            if text.trim().is_empty() {
                continue;
            }
            blocks.push(TextBlock {
                node: NodeId(index as u64),
                tag: self.nodes[index].tag.clone(),
                text,
                rect,
            });
        }
        Ok(blocks)
    }

    fn get_by_role(&mut self, scope: Scope, role: AriaRole, name: &str, exact: bool) -> Result<Vec<NodeId>, DriverError> {
        let wanted = normalize_ws(name);
        let wanted_lower = wanted.to_lowercase();
        Ok(self
            .walk(scope)?
            .into_iter()
            .filter(|&i| self.role_of(i) == Some(role) && self.is_rendered(i))
            .filter(|&i| {
                let accessible = self.name_of(i);
                if exact {
                    accessible == wanted
                } else {
                    accessible.to_lowercase().contains(&wanted_lower)
                }
            })
            .map(|i| NodeId(i as u64))
            .collect())
    }

    fn click(&mut self, node: NodeId, _timeout_ms: u64) -> Result<(), DriverError> {
        let index = self.index(node)?;
        if self.visible_rect(index).is_none() {
            return Err(DriverError::NotVisible(self.describe(index)));
        }
        self.apply_click(index);
        Ok(())
    }

    fn dispatch_click(&mut self, node: NodeId) -> Result<(), DriverError> {
        let index = self.index(node)?;
        self.apply_click(index);
        Ok(())
    }

    fn click_expect_popup(&mut self, node: NodeId, timeout_ms: u64) -> Result<ClickOutcome, DriverError> {
        self.click(node, timeout_ms)?;
        Ok(ClickOutcome::SameTab)
    }

    fn click_at(&mut self, _scope: Scope, _x: f64, _y: f64) -> Result<(), DriverError> {
        self.close_revealed();
        Ok(())
    }

    fn fill(&mut self, node: NodeId, value: &str) -> Result<(), DriverError> {
        let index = self.index(node)?;
        let tag = self.nodes[index].tag.clone();
        let fillable = match tag.as_str() {
            "textarea" => true,
            "input" => !matches!(
                self.attr(index, "type").map(str::to_ascii_lowercase).as_deref(),
                Some("checkbox") | Some("radio") | Some("file") | Some("submit") | Some("button")
            ),
            _ => self.attr(index, "contenteditable") == Some("true") || self.attr(index, "role") == Some("combobox"),
        };
        if !fillable {
            return Err(DriverError::Unsupported {
                action: "fill".into(),
                tag,
            });
        }
        self.nodes[index].value = Some(value.to_string());
        Ok(())
    }

    fn select_option(&mut self, node: NodeId, pick: &OptionPick) -> Result<(), DriverError> {
        let index = self.index(node)?;
        if self.nodes[index].tag != "select" {
            return Err(DriverError::Unsupported {
                action: "select_option".into(),
                tag: self.nodes[index].tag.clone(),
            });
        }
        let options: Vec<usize> = self
            .walk(Scope::Element(node))?
            .into_iter()
            .filter(|&i| self.nodes[i].tag == "option")
            .collect();
        let chosen = options.into_iter().find(|&o| match pick {
            OptionPick::Label(label) => normalize_ws(&self.rendered_text(o)) == normalize_ws(label),
            OptionPick::Value(value) => self.option_value(o) == *value,
        });
        match chosen {
            Some(option) => {
                let value = self.option_value(option);
                self.nodes[index].value = Some(value);
                Ok(())
            }
            None => Err(DriverError::OptionNotFound {
                element: self.describe(index),
                option: match pick {
                    OptionPick::Label(s) | OptionPick::Value(s) => s.clone(),
                },
            }),
        }
    }

    fn press_key(&mut self, _scope: Scope, key: Key) -> Result<(), DriverError> {
        self.log.keys.push(key);
        match key {
            Key::Escape => self.close_revealed(),
            Key::End => self.load_more(),
            _ => {}
        }
        Ok(())
    }

    fn set_input_files(&mut self, node: NodeId, path: &Path) -> Result<(), DriverError> {
        let index = self.index(node)?;
        if self.nodes[index].tag != "input" || self.attr(index, "type") != Some("file") {
            return Err(DriverError::Unsupported {
                action: "set_input_files".into(),
                tag: self.nodes[index].tag.clone(),
            });
        }
        self.log.uploads.push((node, path.to_path_buf()));
        Ok(())
    }

    fn click_for_file_chooser(&mut self, node: NodeId, path: &Path, timeout_ms: u64) -> Result<(), DriverError> {
        self.click(node, timeout_ms)?;
        let file_input = SelectorList::from(Selector::tag("input").attr_eq("type", "file"));
        let mut current = Some(node);
        while let Some(candidate) = current {
            if let Some(input) = self.query(Scope::Element(candidate), &file_input)? {
                self.log.uploads.push((input, path.to_path_buf()));
                return Ok(());
            }
            current = self.parent(candidate)?;
        }
        Err(DriverError::Timeout {
            what: "file chooser".into(),
            timeout_ms,
        })
    }

    fn navigate(&mut self, url: &str, _timeout_ms: u64) -> Result<Option<u16>, DriverError> {
        let wanted = url.trim_end_matches('/');
        let doc = self
            .documents
            .iter()
            .position(|d| d.url.trim_end_matches('/') == wanted)
            .ok_or_else(|| DriverError::Navigation {
                url: url.to_string(),
                reason: "no snapshot recorded for this URL".into(),
            })?;
        self.current = doc;
        self.revealed.clear();
        self.log.navigations.push(url.to_string());
        Ok(Some(200))
    }

    fn current_url(&mut self) -> Result<String, DriverError> {
        Ok(self.documents[self.current].url.clone())
    }

    fn title(&mut self) -> Result<String, DriverError> {
        Ok(self.documents[self.current].title.clone())
    }

    fn content_frame(&mut self, iframe: NodeId) -> Result<Option<FrameId>, DriverError> {
        Ok(self.node(iframe)?.frame_doc.map(|d| FrameId(d as u64)))
    }

    fn wait(&mut self, _ms: u64) -> Result<(), DriverError> {
        Ok(())
    }

    fn wait_for(&mut self, scope: Scope, selector: &SelectorList, _timeout_ms: u64) -> Result<Option<NodeId>, DriverError> {
        self.query(scope, selector)
    }

    fn wait_for_load(&mut self, scope: Scope, _state: LoadState, _timeout_ms: u64) -> Result<(), DriverError> {
        self.scope_roots(scope).map(|_| ())
    }

    fn grant_geolocation(&mut self, location: &Geolocation) -> Result<(), DriverError> {
        self.geolocation = Some(*location);
        Ok(())
    }

    fn screenshot(&mut self, path: &Path) -> Result<(), DriverError> {
        self.log.screenshots.push(path.to_path_buf());
        Ok(())
    }
}
