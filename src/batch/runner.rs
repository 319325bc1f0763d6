use rayon::prelude::*;
use serde::Serialize;
use tracing::{error, info, warn};

use crate::browser::driver::Driver;
use crate::browser::error::DriverError;
use crate::cli::config::AppConfig;
use crate::extract::pipeline::extract_form;
use crate::form::error::FormError;
use crate::trace::artifact::ArtifactWriter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchStatus {
    Success,
    Partial,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UrlStatus {
    Success,
    Error,
}

/// Per-URL result of a batch.
#[derive(Debug, Clone, Serialize)]
pub struct UrlOutcome {
    pub url: String,
    pub status: UrlStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_fields: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required_fields: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl UrlOutcome {
    fn failed(url: &str, error: impl ToString) -> Self {
        UrlOutcome {
            url: url.to_string(),
            status: UrlStatus::Error,
            output_file: None,
            job_title: None,
            company: None,
            total_fields: None,
            required_fields: None,
            error: Some(error.to_string()),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub status: BatchStatus,
    pub total_urls: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub results: Vec<UrlOutcome>,
}

impl BatchReport {
    fn from_results(results: Vec<UrlOutcome>) -> Self {
        let succeeded = results.iter().filter(|r| r.status == UrlStatus::Success).count();
        let failed = results.len() - succeeded;
        let status = match (succeeded, failed) {
            (_, 0) if succeeded > 0 => BatchStatus::Success,
            (0, _) => BatchStatus::Error,
            _ => BatchStatus::Partial,
        };
        BatchReport {
            status,
            total_urls: results.len(),
            succeeded,
            failed,
            results,
        }
    }
}

/// http(s) URLs only.
pub fn validate_url(raw: &str) -> Result<url::Url, String> {
    let parsed = url::Url::parse(raw.trim()).map_err(|e| format!("invalid URL '{}': {}", raw, e))?;
    match parsed.scheme() {
        "http" | "https" if parsed.host_str().is_some() => Ok(parsed),
        "http" | "https" => Err(format!("URL '{}' has no host", raw)),
        scheme => Err(format!("unsupported scheme '{}' in '{}'", scheme, raw)),
    }
}

/// Extract every URL on a bounded pool, one driver per URL. Results keep
/// the input order.
pub fn extract_batch<D, F>(
    urls: &[String],
    config: &AppConfig,
    writer: &ArtifactWriter,
    make_driver: F,
) -> Result<BatchReport, FormError>
where
    D: Driver,
    F: Fn() -> Result<D, DriverError> + Sync,
{
    if urls.is_empty() {
        return Ok(BatchReport::from_results(Vec::new()));
    }
    let threads = config.extraction.concurrency.clamp(1, urls.len());
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build()
        .map_err(|e| FormError::Io {
            context: "building the extraction pool".into(),
            source: std::io::Error::other(e),
        })?;
    info!(urls = urls.len(), threads, "starting batch extraction");

    let results: Vec<UrlOutcome> = pool.install(|| {
        urls.par_iter()
            .map(|url| extract_one(url, config, writer, &make_driver))
            .collect()
    });
    let report = BatchReport::from_results(results);
    info!(succeeded = report.succeeded, failed = report.failed, "batch finished");
    Ok(report)
}

fn extract_one<D, F>(url: &str, config: &AppConfig, writer: &ArtifactWriter, make_driver: &F) -> UrlOutcome
where
    D: Driver,
    F: Fn() -> Result<D, DriverError>,
{
    if let Err(reason) = validate_url(url) {
        warn!(url, %reason, "skipping URL");
        return UrlOutcome::failed(url, reason);
    }
    let mut driver = match make_driver() {
        Ok(driver) => driver,
        Err(e) => {
            error!(url, error = %e, "could not start a browser");
            return UrlOutcome::failed(url, e);
        }
    };
    let artifact = match extract_form(&mut driver, url, config) {
        Ok(artifact) => artifact,
        Err(e) => {
            error!(url, error = %e, "extraction failed");
            return UrlOutcome::failed(url, e);
        }
    };
    match writer.write_artifact(&artifact) {
        Ok(path) => UrlOutcome {
            url: url.to_string(),
            status: UrlStatus::Success,
            output_file: Some(path.display().to_string()),
            job_title: Some(artifact.job_title),
            company: Some(artifact.company),
            total_fields: Some(artifact.total_fields),
            required_fields: Some(artifact.required_fields),
            error: None,
        },
        Err(e) => {
            error!(url, error = %e, "could not write the artifact");
            UrlOutcome::failed(url, e)
        }
    }
}
