use thiserror::Error;

/// Errors raised by a [`Driver`](crate::browser::driver::Driver) implementation.
#[derive(Debug, Error)]
pub enum DriverError {
    /// The browser server process could not be started.
    #[error("failed to spawn {script}: {source}")]
    SubprocessSpawn {
        script: String,
        #[source]
        source: std::io::Error,
    },

    /// Reading from or writing to the browser server failed.
    #[error("browser session I/O error: {0}")]
    SessionIO(String),

    /// The browser server answered `ok: false`.
    #[error("browser command '{command}' failed: {error}")]
    SessionProtocol { command: String, error: String },

    #[error("JSON parse error ({context}): {source}")]
    JsonParse {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("JSON serialize error ({context}): {source}")]
    JsonSerialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("element not found: {0}")]
    ElementNotFound(String),

    #[error("element not visible: {0}")]
    NotVisible(String),

    #[error("option '{option}' not found in {element}")]
    OptionNotFound { element: String, option: String },

    #[error("navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    #[error("timed out after {timeout_ms}ms waiting for {what}")]
    Timeout { what: String, timeout_ms: u64 },

    #[error("action '{action}' is not supported on <{tag}>")]
    Unsupported { action: String, tag: String },

    /// The page or the whole browser went away underneath the session.
    #[error("page closed: {0}")]
    PageClosed(String),
}

impl DriverError {
    /// True when the session can no longer be used.
    pub fn is_closed(&self) -> bool {
        matches!(self, DriverError::PageClosed(_) | DriverError::SessionIO(_))
    }
}
