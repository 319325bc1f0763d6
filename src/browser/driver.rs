use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::browser::error::DriverError;
use crate::browser::selector::SelectorList;

/// Handle to an element, stable for the lifetime of a driver session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub u64);

/// Handle to a frame's document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FrameId(pub u64);

/// Where a query starts. Page and frame scopes search the whole document,
/// element scopes search descendants only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum Scope {
    Page,
    Frame(FrameId),
    Element(NodeId),
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl BoundingBox {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        BoundingBox { x, y, width, height }
    }

    pub fn is_visible(&self) -> bool {
        self.width > 0.0 && self.height > 0.0
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    /// |dx| + |dy| between top-left corners.
    pub fn manhattan(&self, other: &BoundingBox) -> f64 {
        (self.x - other.x).abs() + (self.y - other.y).abs()
    }

    /// Width of the horizontal band shared with `other`; zero or negative
    /// when the boxes do not overlap horizontally.
    pub fn horizontal_overlap(&self, other: &BoundingBox) -> f64 {
        self.right().min(other.right()) - self.x.max(other.x)
    }
}

/// A visible text-bearing node, harvested in one round trip per document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextBlock {
    pub node: NodeId,
    pub tag: String,
    pub text: String,
    pub rect: BoundingBox,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Key {
    Escape,
    End,
    Enter,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "by", content = "value", rename_all = "lowercase")]
pub enum OptionPick {
    Label(String),
    Value(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClickOutcome {
    SameTab,
    /// A new tab opened and the driver now addresses it as the page.
    Popup,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadState {
    DomContentLoaded,
    Load,
    NetworkIdle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AriaRole {
    Textbox,
    Combobox,
    Listbox,
    Option,
    Button,
    Group,
    Checkbox,
    Radio,
    Link,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Geolocation {
    pub latitude: f64,
    pub longitude: f64,
    pub accuracy: f64,
}

/// The closed set of in-page evaluations the automation needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "script", rename_all = "snake_case")]
pub enum Script {
    /// `document.readyState`; fails when the page is gone.
    ReadyState,
    /// Hide listbox popups left open by earlier interactions.
    CloseOpenListboxes,
    /// Remove select2-style click-catching masks.
    RemoveOverlayMasks,
    /// Whether the body text contains any of the phrases (case-insensitive).
    SuccessTextPresent { phrases: Vec<String> },
    BodyText,
}

/// Narrow capability interface over a browser page, its frames and elements.
///
/// Every heuristic in the crate is written against this trait, so the same
/// code runs over a live Playwright session or an in-memory snapshot.
pub trait Driver {
    fn query_all(&mut self, scope: Scope, selector: &SelectorList) -> Result<Vec<NodeId>, DriverError>;

    fn query(&mut self, scope: Scope, selector: &SelectorList) -> Result<Option<NodeId>, DriverError> {
        Ok(self.query_all(scope, selector)?.into_iter().next())
    }

    /// None when the element is not rendered.
    fn bounding_box(&mut self, node: NodeId) -> Result<Option<BoundingBox>, DriverError>;
    fn scroll_into_view(&mut self, node: NodeId) -> Result<(), DriverError>;
    fn evaluate(&mut self, scope: Scope, script: &Script) -> Result<Value, DriverError>;

    fn tag_name(&mut self, node: NodeId) -> Result<String, DriverError>;
    fn attribute(&mut self, node: NodeId, name: &str) -> Result<Option<String>, DriverError>;
    /// Rendered text of the element, one line per block.
    fn text_content(&mut self, node: NodeId) -> Result<String, DriverError>;
    fn parent(&mut self, node: NodeId) -> Result<Option<NodeId>, DriverError>;
    fn input_value(&mut self, node: NodeId) -> Result<String, DriverError>;
    /// Current checkedness of a checkbox or radio, not its markup attribute.
    fn is_checked(&mut self, node: NodeId) -> Result<bool, DriverError>;
    /// Computed accessible name, whitespace-collapsed.
    fn accessible_name(&mut self, node: NodeId) -> Result<String, DriverError>;
    fn text_blocks(&mut self, scope: Scope) -> Result<Vec<TextBlock>, DriverError>;
    fn get_by_role(&mut self, scope: Scope, role: AriaRole, name: &str, exact: bool) -> Result<Vec<NodeId>, DriverError>;

    fn click(&mut self, node: NodeId, timeout_ms: u64) -> Result<(), DriverError>;
    /// Synthetic `click` event, bypassing actionability checks.
    fn dispatch_click(&mut self, node: NodeId) -> Result<(), DriverError>;
    fn click_expect_popup(&mut self, node: NodeId, timeout_ms: u64) -> Result<ClickOutcome, DriverError>;
    fn click_at(&mut self, scope: Scope, x: f64, y: f64) -> Result<(), DriverError>;
    fn fill(&mut self, node: NodeId, value: &str) -> Result<(), DriverError>;
    fn select_option(&mut self, node: NodeId, pick: &OptionPick) -> Result<(), DriverError>;
    fn press_key(&mut self, scope: Scope, key: Key) -> Result<(), DriverError>;
    fn set_input_files(&mut self, node: NodeId, path: &Path) -> Result<(), DriverError>;
    /// Click `node` and answer the file chooser it opens with `path`.
    fn click_for_file_chooser(&mut self, node: NodeId, path: &Path, timeout_ms: u64) -> Result<(), DriverError>;

    /// Returns the HTTP status of the main response when known.
    fn navigate(&mut self, url: &str, timeout_ms: u64) -> Result<Option<u16>, DriverError>;
    fn current_url(&mut self) -> Result<String, DriverError>;
    fn title(&mut self) -> Result<String, DriverError>;
    fn content_frame(&mut self, iframe: NodeId) -> Result<Option<FrameId>, DriverError>;
    fn wait(&mut self, ms: u64) -> Result<(), DriverError>;
    fn wait_for(&mut self, scope: Scope, selector: &SelectorList, timeout_ms: u64) -> Result<Option<NodeId>, DriverError>;
    fn wait_for_load(&mut self, scope: Scope, state: LoadState, timeout_ms: u64) -> Result<(), DriverError>;
    fn grant_geolocation(&mut self, location: &Geolocation) -> Result<(), DriverError>;
    fn screenshot(&mut self, path: &Path) -> Result<(), DriverError>;

    fn is_visible(&mut self, node: NodeId) -> bool {
        matches!(self.bounding_box(node), Ok(Some(rect)) if rect.is_visible())
    }

    fn attr_or_empty(&mut self, node: NodeId, name: &str) -> String {
        self.attribute(node, name).ok().flatten().unwrap_or_default()
    }

    /// Up to `depth` ancestors, nearest first.
    fn ancestors(&mut self, node: NodeId, depth: usize) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut current = node;
        while out.len() < depth {
            match self.parent(current) {
                Ok(Some(parent)) => {
                    out.push(parent);
                    current = parent;
                }
                _ => break,
            }
        }
        out
    }
}
