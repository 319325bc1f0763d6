use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

// ============================================================================
// CLI Argument Parsing (clap derive)
// ============================================================================

#[derive(Parser, Debug)]
#[command(
    name = "job-form-automator",
    version,
    about = "Discover job-application forms, extract their questions and fill them back in"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to config file (default: form-automator.yaml in current dir)
    #[arg(long, global = true)]
    pub config: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Extract application forms from one or more live job postings
    Extract {
        /// Job posting URL (repeat for a batch)
        #[arg(long = "url", required = true)]
        urls: Vec<String>,

        /// Directory for the extracted JSON files
        #[arg(short, long)]
        output_dir: Option<String>,

        /// Maximum simultaneous browser sessions
        #[arg(long)]
        concurrency: Option<usize>,
    },

    /// Extract the application form from a saved DOM snapshot
    ExtractSnapshot {
        /// Path to a snapshot JSON file
        #[arg(long)]
        snapshot: String,

        /// Directory for the extracted JSON file
        #[arg(short, long)]
        output_dir: Option<String>,
    },

    /// Fill a form from a completed extraction file
    Fill {
        /// Extraction JSON with user_input_template values filled in
        #[arg(long)]
        input: String,

        /// Return after filling instead of waiting for the manual submit
        #[arg(long, default_value_t = false)]
        no_watch: bool,

        /// Replay against a saved DOM snapshot instead of a live browser
        #[arg(long)]
        snapshot: Option<String>,
    },
}

// ============================================================================
// Config File Model (optional YAML)
// ============================================================================

/// Optional YAML config file: `form-automator.yaml`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub timeouts: Timeouts,
    #[serde(default)]
    pub extraction: ExtractionConfig,
    #[serde(default)]
    pub fill: FillConfig,
    #[serde(default)]
    pub driver: DriverConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Per-operation budgets in milliseconds. A timeout moves a heuristic on to
/// its next fallback; it never aborts the session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Timeouts {
    #[serde(default = "default_navigation")]
    pub navigation: u64,
    #[serde(default = "default_element_wait")]
    pub element_wait: u64,
    #[serde(default = "default_interaction")]
    pub interaction: u64,
    #[serde(default = "default_short_wait")]
    pub short_wait: u64,
    #[serde(default = "default_option_open")]
    pub option_open: u64,
    #[serde(default = "default_popup")]
    pub popup: u64,
    #[serde(default = "default_post_click_settle")]
    pub post_click_settle: u64,
    #[serde(default = "default_dynamic_loading_wait")]
    pub dynamic_loading_wait: u64,
    #[serde(default = "default_scroll_detection_wait")]
    pub scroll_detection_wait: u64,
    #[serde(default = "default_minimal_pause")]
    pub minimal_pause: u64,
    #[serde(default = "default_short_pause")]
    pub short_pause: u64,
    #[serde(default = "default_medium_pause")]
    pub medium_pause: u64,
    #[serde(default = "default_long_pause")]
    pub long_pause: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            navigation: 20_000,
            element_wait: 7_000,
            interaction: 3_000,
            short_wait: 2_000,
            option_open: 2_500,
            popup: 2_000,
            post_click_settle: 800,
            dynamic_loading_wait: 1_500,
            scroll_detection_wait: 500,
            minimal_pause: 75,
            short_pause: 200,
            medium_pause: 350,
            long_pause: 700,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionConfig {
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    #[serde(default = "default_output_dir")]
    pub output_dir: String,

    #[serde(default = "default_three_u32")]
    pub navigation_attempts: u32,

    /// URL fragments of applicant tracking systems that embed forms in iframes.
    #[serde(default = "default_ats_fragments")]
    pub ats_fragments: Vec<String>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            concurrency: 5,
            output_dir: default_output_dir(),
            navigation_attempts: 3,
            ats_fragments: default_ats_fragments(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FillConfig {
    #[serde(default = "default_true")]
    pub watch_submission: bool,

    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,

    /// Filling runs headed so the user can review and submit.
    #[serde(default)]
    pub headless: bool,

    #[serde(default = "default_trace_dir")]
    pub trace_dir: String,

    #[serde(default)]
    pub geolocation: GeolocationConfig,
}

impl Default for FillConfig {
    fn default() -> Self {
        Self {
            watch_submission: true,
            poll_interval_ms: 2_000,
            headless: false,
            trace_dir: default_trace_dir(),
            geolocation: GeolocationConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeolocationConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_latitude")]
    pub latitude: f64,

    #[serde(default = "default_longitude")]
    pub longitude: f64,

    #[serde(default = "default_accuracy")]
    pub accuracy: f64,

    /// IP-geolocation endpoint returning `{"lat": .., "lon": ..}`.
    pub lookup_url: Option<String>,

    #[serde(default = "default_lookup_timeout")]
    pub lookup_timeout_ms: u64,
}

impl Default for GeolocationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            latitude: default_latitude(),
            longitude: default_longitude(),
            accuracy: default_accuracy(),
            lookup_url: None,
            lookup_timeout_ms: default_lookup_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriverConfig {
    #[serde(default = "default_node")]
    pub node_binary: String,

    #[serde(default = "default_server_script")]
    pub server_script: String,

    #[serde(default = "default_true")]
    pub headless: bool,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            node_binary: default_node(),
            server_script: default_server_script(),
            headless: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_dir")]
    pub log_dir: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_dir: default_log_dir(),
        }
    }
}

// Serde default helpers
fn default_navigation() -> u64 { 20_000 }
fn default_element_wait() -> u64 { 7_000 }
fn default_interaction() -> u64 { 3_000 }
fn default_short_wait() -> u64 { 2_000 }
fn default_option_open() -> u64 { 2_500 }
fn default_popup() -> u64 { 2_000 }
fn default_post_click_settle() -> u64 { 800 }
fn default_dynamic_loading_wait() -> u64 { 1_500 }
fn default_scroll_detection_wait() -> u64 { 500 }
fn default_minimal_pause() -> u64 { 75 }
fn default_short_pause() -> u64 { 200 }
fn default_medium_pause() -> u64 { 350 }
fn default_long_pause() -> u64 { 700 }
fn default_concurrency() -> usize { 5 }
fn default_three_u32() -> u32 { 3 }
fn default_true() -> bool { true }
fn default_poll_interval() -> u64 { 2_000 }
fn default_latitude() -> f64 { 37.7749 }
fn default_longitude() -> f64 { -122.4194 }
fn default_accuracy() -> f64 { 100.0 }
fn default_lookup_timeout() -> u64 { 5_000 }
fn default_node() -> String { "node".to_string() }
fn default_server_script() -> String { "node/browser_server.js".to_string() }
fn default_output_dir() -> String { "extracted_form_data".to_string() }
fn default_trace_dir() -> String { "fill_traces".to_string() }
fn default_log_dir() -> String { "logs".to_string() }
fn default_ats_fragments() -> Vec<String> {
    vec!["greenhouse".into(), "ashbyhq".into(), "smartrecruiters".into()]
}

// ============================================================================
// Config File Loading
// ============================================================================

/// Load config from a YAML file. Returns defaults if file is missing or malformed.
pub fn load_config(path: Option<&str>) -> AppConfig {
    let config_path = path.unwrap_or("form-automator.yaml");
    match std::fs::read_to_string(config_path) {
        Ok(content) => match serde_yaml::from_str(&content) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(path = config_path, error = %e, "malformed config, using defaults");
                AppConfig::default()
            }
        },
        Err(_) => AppConfig::default(),
    }
}
