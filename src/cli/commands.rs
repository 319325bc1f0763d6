use std::path::Path;

use tracing::info;

use crate::batch::runner::{BatchReport, extract_batch};
use crate::browser::driver::Driver;
use crate::browser::session::BrowserSession;
use crate::browser::snapshot::SnapshotDom;
use crate::cli::config::AppConfig;
use crate::extract::pipeline::extract_loaded_page;
use crate::fill::report::FillReport;
use crate::fill::session::{FillSession, SessionPhase};
use crate::form::field_model::{ExtractionArtifact, FillRequest};
use crate::trace::artifact::ArtifactWriter;

// ============================================================================
// extract subcommand
// ============================================================================

/// Extract every URL with its own live browser and print the batch report.
pub fn cmd_extract(
    urls: &[String],
    output_dir: Option<&str>,
    concurrency: Option<usize>,
    config: &AppConfig,
) -> Result<BatchReport, Box<dyn std::error::Error>> {
    let mut config = config.clone();
    if let Some(n) = concurrency {
        config.extraction.concurrency = n;
    }
    let writer = ArtifactWriter::new(output_dir.unwrap_or(&config.extraction.output_dir));
    let driver_config = config.driver.clone();

    let report = extract_batch(urls, &config, &writer, || BrowserSession::launch(&driver_config))?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(report)
}

// ============================================================================
// extract-snapshot subcommand
// ============================================================================

/// Extract from a saved DOM snapshot and write the artifact.
pub fn cmd_extract_snapshot(
    snapshot: &str,
    output_dir: Option<&str>,
    config: &AppConfig,
) -> Result<ExtractionArtifact, Box<dyn std::error::Error>> {
    let mut dom = SnapshotDom::load(Path::new(snapshot))?;
    let url = dom.current_url()?;
    let artifact = extract_loaded_page(&mut dom, &url, config)?;

    let writer = ArtifactWriter::new(output_dir.unwrap_or(&config.extraction.output_dir));
    let path = writer.write_artifact(&artifact)?;
    info!(path = %path.display(), fields = artifact.total_fields, "snapshot extracted");
    println!("{}", path.display());
    Ok(artifact)
}

// ============================================================================
// fill subcommand
// ============================================================================

/// Fill the form described by a completed extraction file.
pub fn cmd_fill(
    input: &str,
    no_watch: bool,
    snapshot: Option<&str>,
    config: &AppConfig,
) -> Result<FillReport, Box<dyn std::error::Error>> {
    let json = std::fs::read_to_string(input)?;
    let request = FillRequest::from_json(&json)?;

    let mut session = FillSession::new(config);
    if no_watch || snapshot.is_some() {
        session = session.without_watch();
    }

    let report = match snapshot {
        Some(path) => {
            let mut dom = SnapshotDom::load(Path::new(path))?;
            session.run(&mut dom, &request)?
        }
        None => {
            let mut driver_config = config.driver.clone();
            driver_config.headless = config.fill.headless;
            let mut browser = BrowserSession::launch(&driver_config)?;
            let report = session.run(&mut browser, &request)?;
            if session.phase() != SessionPhase::UserClosed {
                browser.quit()?;
            }
            report
        }
    };

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(report)
}
