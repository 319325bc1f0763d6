use std::io::{BufRead, BufReader, Write};
use std::path::Path;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::browser::driver::{
    AriaRole, BoundingBox, ClickOutcome, Driver, FrameId, Geolocation, Key, LoadState, NodeId,
    OptionPick, Scope, Script, TextBlock,
};
use crate::browser::error::DriverError;
use crate::browser::selector::SelectorList;
use crate::cli::config::DriverConfig;

/// Request sent to the browser server over stdin (one JSON line).
#[derive(Debug, Serialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum BrowserRequest {
    Launch { headless: bool },
    Navigate { url: String, timeout_ms: u64 },
    QueryAll { scope: Scope, selector: String },
    BoundingBox { node: NodeId },
    ScrollIntoView { node: NodeId },
    Evaluate { scope: Scope, script: Script },
    TagName { node: NodeId },
    Attribute { node: NodeId, name: String },
    TextContent { node: NodeId },
    Parent { node: NodeId },
    InputValue { node: NodeId },
    IsChecked { node: NodeId },
    AccessibleName { node: NodeId },
    TextBlocks { scope: Scope },
    GetByRole { scope: Scope, role: AriaRole, name: String, exact: bool },
    Click { node: NodeId, timeout_ms: u64 },
    DispatchClick { node: NodeId },
    ClickExpectPopup { node: NodeId, timeout_ms: u64 },
    ClickAt { scope: Scope, x: f64, y: f64 },
    Fill { node: NodeId, value: String },
    SelectOption { node: NodeId, pick: OptionPick },
    Press { scope: Scope, key: Key },
    SetInputFiles { node: NodeId, path: String },
    ClickForFileChooser { node: NodeId, path: String, timeout_ms: u64 },
    CurrentUrl,
    Title,
    ContentFrame { node: NodeId },
    Wait { ms: u64 },
    WaitFor { scope: Scope, selector: String, timeout_ms: u64 },
    WaitForLoad { scope: Scope, state: LoadState, timeout_ms: u64 },
    GrantGeolocation { location: Geolocation },
    Screenshot { path: String },
    Quit,
}

impl BrowserRequest {
    fn name(&self) -> &'static str {
        match self {
            BrowserRequest::Launch { .. } => "launch",
            BrowserRequest::Navigate { .. } => "navigate",
            BrowserRequest::QueryAll { .. } => "query_all",
            BrowserRequest::BoundingBox { .. } => "bounding_box",
            BrowserRequest::ScrollIntoView { .. } => "scroll_into_view",
            BrowserRequest::Evaluate { .. } => "evaluate",
            BrowserRequest::TagName { .. } => "tag_name",
            BrowserRequest::Attribute { .. } => "attribute",
            BrowserRequest::TextContent { .. } => "text_content",
            BrowserRequest::Parent { .. } => "parent",
            BrowserRequest::InputValue { .. } => "input_value",
            BrowserRequest::IsChecked { .. } => "is_checked",
            BrowserRequest::AccessibleName { .. } => "accessible_name",
            BrowserRequest::TextBlocks { .. } => "text_blocks",
            BrowserRequest::GetByRole { .. } => "get_by_role",
            BrowserRequest::Click { .. } => "click",
            BrowserRequest::DispatchClick { .. } => "dispatch_click",
            BrowserRequest::ClickExpectPopup { .. } => "click_expect_popup",
            BrowserRequest::ClickAt { .. } => "click_at",
            BrowserRequest::Fill { .. } => "fill",
            BrowserRequest::SelectOption { .. } => "select_option",
            BrowserRequest::Press { .. } => "press",
            BrowserRequest::SetInputFiles { .. } => "set_input_files",
            BrowserRequest::ClickForFileChooser { .. } => "click_for_file_chooser",
            BrowserRequest::CurrentUrl => "current_url",
            BrowserRequest::Title => "title",
            BrowserRequest::ContentFrame { .. } => "content_frame",
            BrowserRequest::Wait { .. } => "wait",
            BrowserRequest::WaitFor { .. } => "wait_for",
            BrowserRequest::WaitForLoad { .. } => "wait_for_load",
            BrowserRequest::GrantGeolocation { .. } => "grant_geolocation",
            BrowserRequest::Screenshot { .. } => "screenshot",
            BrowserRequest::Quit => "quit",
        }
    }
}

/// Response received from the browser server over stdout (one JSON line).
#[derive(Debug, Deserialize)]
pub struct BrowserResponse {
    pub ok: bool,
    #[serde(default)]
    pub error: Option<String>,
    /// Set when the failure means the page or browser is gone.
    #[serde(default)]
    pub closed: bool,
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default)]
    pub ready: Option<bool>,
}

/// A persistent browser session backed by a Node/Playwright server.
///
/// The server keeps one Chromium context open for the lifetime of the
/// session. Element handles live in the server's handle table and are
/// addressed by [`NodeId`]. Commands are NDJSON over stdin, answers are read
/// from stdout in lock-step, so there is never more than one DOM operation
/// in flight.
pub struct BrowserSession {
    child: Child,
    stdin: ChildStdin,
    reader: BufReader<ChildStdout>,
    script: String,
    closed: bool,
}

impl BrowserSession {
    /// Spawn the browser server and wait for its ready signal.
    pub fn launch(config: &DriverConfig) -> Result<Self, DriverError> {
        let mut child = Command::new(&config.node_binary)
            .arg(&config.server_script)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| DriverError::SubprocessSpawn {
                script: config.server_script.clone(),
                source: e,
            })?;

        let stdin = child.stdin.take().ok_or_else(|| {
            DriverError::SessionIO(format!("failed to capture stdin of {}", config.server_script))
        })?;
        let stdout = child.stdout.take().ok_or_else(|| {
            DriverError::SessionIO(format!("failed to capture stdout of {}", config.server_script))
        })?;

        let mut session = BrowserSession {
            child,
            stdin,
            reader: BufReader::new(stdout),
            script: config.server_script.clone(),
            closed: false,
        };

        let ready = session.read_response()?;
        if !ready.ok || ready.ready != Some(true) {
            return Err(DriverError::SessionProtocol {
                command: "launch".into(),
                error: format!("no ready signal from {}", session.script),
            });
        }
        session.send_ok(&BrowserRequest::Launch {
            headless: config.headless,
        })?;
        debug!(script = %session.script, "browser session ready");
        Ok(session)
    }

    fn read_response(&mut self) -> Result<BrowserResponse, DriverError> {
        let mut line = String::new();
        self.reader.read_line(&mut line).map_err(|e| {
            DriverError::SessionIO(format!("failed to read from {}: {}", self.script, e))
        })?;
        if line.trim().is_empty() {
            self.closed = true;
            return Err(DriverError::SessionIO(format!(
                "empty response from {} (process may have died)",
                self.script
            )));
        }
        serde_json::from_str(line.trim()).map_err(|e| DriverError::JsonParse {
            context: format!("{} response", self.script),
            source: e,
        })
    }

    fn send(&mut self, request: &BrowserRequest) -> Result<BrowserResponse, DriverError> {
        if self.closed {
            return Err(DriverError::PageClosed(format!(
                "session closed before '{}'",
                request.name()
            )));
        }
        let json = serde_json::to_string(request).map_err(|e| DriverError::JsonSerialize {
            context: "BrowserRequest".into(),
            source: e,
        })?;
        writeln!(self.stdin, "{}", json)
            .and_then(|_| self.stdin.flush())
            .map_err(|e| {
                self.closed = true;
                DriverError::SessionIO(format!("failed to write to {}: {}", self.script, e))
            })?;
        self.read_response()
    }

    fn send_ok(&mut self, request: &BrowserRequest) -> Result<Option<Value>, DriverError> {
        let response = self.send(request)?;
        if !response.ok {
            let error = response.error.unwrap_or_else(|| "unknown error".into());
            if response.closed {
                self.closed = true;
                return Err(DriverError::PageClosed(error));
            }
            return Err(DriverError::SessionProtocol {
                command: request.name().into(),
                error,
            });
        }
        Ok(response.data)
    }

    /// Send a request and decode its `data` payload.
    fn call<T: DeserializeOwned>(&mut self, request: BrowserRequest) -> Result<T, DriverError> {
        let data = self.send_ok(&request)?.unwrap_or(Value::Null);
        serde_json::from_value(data).map_err(|e| DriverError::JsonParse {
            context: format!("'{}' payload", request.name()),
            source: e,
        })
    }

    fn unit(&mut self, request: BrowserRequest) -> Result<(), DriverError> {
        self.send_ok(&request).map(|_| ())
    }

    /// Quit the browser session.
    pub fn quit(&mut self) -> Result<(), DriverError> {
        if !self.closed {
            // Best-effort: the process may already be gone.
            if let Err(e) = self.send(&BrowserRequest::Quit) {
                warn!(error = %e, "browser server did not acknowledge quit");
            }
            self.closed = true;
        }
        let _ = self.child.wait();
        Ok(())
    }
}

impl Drop for BrowserSession {
    fn drop(&mut self) {
        let _ = self.quit();
    }
}

impl Driver for BrowserSession {
    fn query_all(&mut self, scope: Scope, selector: &SelectorList) -> Result<Vec<NodeId>, DriverError> {
        self.call(BrowserRequest::QueryAll {
            scope,
            selector: selector.render(),
        })
    }

    fn bounding_box(&mut self, node: NodeId) -> Result<Option<BoundingBox>, DriverError> {
        self.call(BrowserRequest::BoundingBox { node })
    }

    fn scroll_into_view(&mut self, node: NodeId) -> Result<(), DriverError> {
        self.unit(BrowserRequest::ScrollIntoView { node })
    }

    fn evaluate(&mut self, scope: Scope, script: &Script) -> Result<Value, DriverError> {
        self.call(BrowserRequest::Evaluate {
            scope,
            script: script.clone(),
        })
    }

    fn tag_name(&mut self, node: NodeId) -> Result<String, DriverError> {
        let tag: String = self.call(BrowserRequest::TagName { node })?;
        Ok(tag.to_ascii_lowercase())
    }

    fn attribute(&mut self, node: NodeId, name: &str) -> Result<Option<String>, DriverError> {
        self.call(BrowserRequest::Attribute {
            node,
            name: name.to_string(),
        })
    }

    fn text_content(&mut self, node: NodeId) -> Result<String, DriverError> {
        let text: Option<String> = self.call(BrowserRequest::TextContent { node })?;
        Ok(text.unwrap_or_default())
    }

    fn parent(&mut self, node: NodeId) -> Result<Option<NodeId>, DriverError> {
        self.call(BrowserRequest::Parent { node })
    }

    fn input_value(&mut self, node: NodeId) -> Result<String, DriverError> {
        let value: Option<String> = self.call(BrowserRequest::InputValue { node })?;
        Ok(value.unwrap_or_default())
    }

    fn is_checked(&mut self, node: NodeId) -> Result<bool, DriverError> {
        self.call(BrowserRequest::IsChecked { node })
    }

    fn accessible_name(&mut self, node: NodeId) -> Result<String, DriverError> {
        let name: Option<String> = self.call(BrowserRequest::AccessibleName { node })?;
        Ok(name.unwrap_or_default())
    }

    fn text_blocks(&mut self, scope: Scope) -> Result<Vec<TextBlock>, DriverError> {
        self.call(BrowserRequest::TextBlocks { scope })
    }

    fn get_by_role(&mut self, scope: Scope, role: AriaRole, name: &str, exact: bool) -> Result<Vec<NodeId>, DriverError> {
        self.call(BrowserRequest::GetByRole {
            scope,
            role,
            name: name.to_string(),
            exact,
        })
    }

    fn click(&mut self, node: NodeId, timeout_ms: u64) -> Result<(), DriverError> {
        self.unit(BrowserRequest::Click { node, timeout_ms })
    }

    fn dispatch_click(&mut self, node: NodeId) -> Result<(), DriverError> {
        self.unit(BrowserRequest::DispatchClick { node })
    }

    fn click_expect_popup(&mut self, node: NodeId, timeout_ms: u64) -> Result<ClickOutcome, DriverError> {
        self.call(BrowserRequest::ClickExpectPopup { node, timeout_ms })
    }

    fn click_at(&mut self, scope: Scope, x: f64, y: f64) -> Result<(), DriverError> {
        self.unit(BrowserRequest::ClickAt { scope, x, y })
    }

    fn fill(&mut self, node: NodeId, value: &str) -> Result<(), DriverError> {
        self.unit(BrowserRequest::Fill {
            node,
            value: value.to_string(),
        })
    }

    fn select_option(&mut self, node: NodeId, pick: &OptionPick) -> Result<(), DriverError> {
        self.unit(BrowserRequest::SelectOption {
            node,
            pick: pick.clone(),
        })
    }

    fn press_key(&mut self, scope: Scope, key: Key) -> Result<(), DriverError> {
        self.unit(BrowserRequest::Press { scope, key })
    }

    fn set_input_files(&mut self, node: NodeId, path: &Path) -> Result<(), DriverError> {
        self.unit(BrowserRequest::SetInputFiles {
            node,
            path: path.display().to_string(),
        })
    }

    fn click_for_file_chooser(&mut self, node: NodeId, path: &Path, timeout_ms: u64) -> Result<(), DriverError> {
        self.unit(BrowserRequest::ClickForFileChooser {
            node,
            path: path.display().to_string(),
            timeout_ms,
        })
    }

    fn navigate(&mut self, url: &str, timeout_ms: u64) -> Result<Option<u16>, DriverError> {
        self.call(BrowserRequest::Navigate {
            url: url.to_string(),
            timeout_ms,
        })
        .map_err(|e| match e {
            DriverError::SessionProtocol { error, .. } => DriverError::Navigation {
                url: url.to_string(),
                reason: error,
            },
            other => other,
        })
    }

    fn current_url(&mut self) -> Result<String, DriverError> {
        self.call(BrowserRequest::CurrentUrl)
    }

    fn title(&mut self) -> Result<String, DriverError> {
        self.call(BrowserRequest::Title)
    }

    fn content_frame(&mut self, iframe: NodeId) -> Result<Option<FrameId>, DriverError> {
        self.call(BrowserRequest::ContentFrame { node: iframe })
    }

    fn wait(&mut self, ms: u64) -> Result<(), DriverError> {
        self.unit(BrowserRequest::Wait { ms })
    }

    fn wait_for(&mut self, scope: Scope, selector: &SelectorList, timeout_ms: u64) -> Result<Option<NodeId>, DriverError> {
        self.call(BrowserRequest::WaitFor {
            scope,
            selector: selector.render(),
            timeout_ms,
        })
    }

    fn wait_for_load(&mut self, scope: Scope, state: LoadState, timeout_ms: u64) -> Result<(), DriverError> {
        self.unit(BrowserRequest::WaitForLoad {
            scope,
            state,
            timeout_ms,
        })
    }

    fn grant_geolocation(&mut self, location: &Geolocation) -> Result<(), DriverError> {
        self.unit(BrowserRequest::GrantGeolocation {
            location: *location,
        })
    }

    fn screenshot(&mut self, path: &Path) -> Result<(), DriverError> {
        self.unit(BrowserRequest::Screenshot {
            path: path.display().to_string(),
        })
    }
}
