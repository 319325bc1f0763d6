use clap::Parser;
use job_form_automator::batch::runner::{BatchStatus, UrlStatus, extract_batch, validate_url};
use job_form_automator::browser::snapshot::SnapshotDom;
use job_form_automator::cli::commands::{cmd_extract_snapshot, cmd_fill};
use job_form_automator::cli::config::{AppConfig, Cli, Commands, load_config};
use job_form_automator::trace::artifact::ArtifactWriter;
use job_form_automator::{ExtractionArtifact, SessionPhase};

use crate::common::pages::{POSTING_URL, application_page};

mod common;

// ============================================================================
// CLI Argument Parsing Tests
// ============================================================================

#[test]
fn cli_parse_extract_single_url() {
    let cli = Cli::parse_from(["job-form-automator", "extract", "--url", POSTING_URL]);
    match cli.command {
        Commands::Extract {
            urls,
            output_dir,
            concurrency,
        } => {
            assert_eq!(urls, vec![POSTING_URL.to_string()]);
            assert_eq!(output_dir, None);
            assert_eq!(concurrency, None);
        }
        _ => panic!("Expected Extract command"),
    }
    assert_eq!(cli.verbose, 0);
    assert_eq!(cli.config, None);
}

#[test]
fn cli_parse_extract_batch_with_options() {
    let cli = Cli::parse_from([
        "job-form-automator",
        "-vv",
        "extract",
        "--url",
        "https://a.example/jobs/1",
        "--url",
        "https://b.example/jobs/2",
        "-o",
        "out",
        "--concurrency",
        "2",
        "--config",
        "custom.yaml",
    ]);
    match cli.command {
        Commands::Extract {
            urls,
            output_dir,
            concurrency,
        } => {
            assert_eq!(urls.len(), 2);
            assert_eq!(output_dir.as_deref(), Some("out"));
            assert_eq!(concurrency, Some(2));
        }
        _ => panic!("Expected Extract command"),
    }
    assert_eq!(cli.verbose, 2);
    assert_eq!(cli.config.as_deref(), Some("custom.yaml"), "global flag accepted after the subcommand");
}

#[test]
fn cli_extract_requires_a_url() {
    let result = Cli::try_parse_from(["job-form-automator", "extract"]);
    assert!(result.is_err(), "extract without --url must be rejected");
}

#[test]
fn cli_parse_extract_snapshot() {
    let cli = Cli::parse_from(["job-form-automator", "extract-snapshot", "--snapshot", "page.json"]);
    match cli.command {
        Commands::ExtractSnapshot { snapshot, output_dir } => {
            assert_eq!(snapshot, "page.json");
            assert_eq!(output_dir, None);
        }
        _ => panic!("Expected ExtractSnapshot command"),
    }
}

#[test]
fn cli_parse_fill_defaults_to_watching() {
    let cli = Cli::parse_from(["job-form-automator", "fill", "--input", "answers.json"]);
    match cli.command {
        Commands::Fill {
            input,
            no_watch,
            snapshot,
        } => {
            assert_eq!(input, "answers.json");
            assert!(!no_watch);
            assert_eq!(snapshot, None);
        }
        _ => panic!("Expected Fill command"),
    }
}

#[test]
fn cli_parse_fill_all_args() {
    let cli = Cli::parse_from([
        "job-form-automator",
        "fill",
        "--input",
        "answers.json",
        "--no-watch",
        "--snapshot",
        "page.json",
    ]);
    match cli.command {
        Commands::Fill { no_watch, snapshot, .. } => {
            assert!(no_watch);
            assert_eq!(snapshot.as_deref(), Some("page.json"));
        }
        _ => panic!("Expected Fill command"),
    }
}

// ============================================================================
// Config Loading Tests
// ============================================================================

#[test]
fn config_defaults() {
    let config = AppConfig::default();
    assert_eq!(config.extraction.concurrency, 5);
    assert_eq!(config.extraction.navigation_attempts, 3);
    assert_eq!(config.extraction.output_dir, "extracted_form_data");
    assert_eq!(config.fill.trace_dir, "fill_traces");
    assert!(config.fill.watch_submission);
    assert!(config.fill.geolocation.enabled);
    assert_eq!(config.fill.geolocation.lookup_url, None);
    assert_eq!(config.timeouts.navigation, 20_000);
}

#[test]
fn config_missing_file_returns_defaults() {
    let config = load_config(Some("/nonexistent/form-automator.yaml"));
    assert_eq!(config.extraction.concurrency, 5);
}

#[test]
fn config_partial_yaml_keeps_other_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("form-automator.yaml");
    std::fs::write(
        &path,
        "extraction:\n  concurrency: 2\ntimeouts:\n  navigation: 45000\nfill:\n  geolocation:\n    latitude: 51.5\n",
    )
    .unwrap();

    let config = load_config(path.to_str());
    assert_eq!(config.extraction.concurrency, 2);
    assert_eq!(config.extraction.navigation_attempts, 3);
    assert_eq!(config.timeouts.navigation, 45_000);
    assert_eq!(config.timeouts.element_wait, 7_000);
    assert_eq!(config.fill.geolocation.latitude, 51.5);
    assert_eq!(config.fill.geolocation.longitude, -122.4194);
    assert_eq!(
        config.extraction.ats_fragments,
        vec!["greenhouse".to_string(), "ashbyhq".to_string(), "smartrecruiters".to_string()]
    );
}

#[test]
fn config_malformed_yaml_returns_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.yaml");
    std::fs::write(&path, "extraction: [not, a, mapping\n").unwrap();
    let config = load_config(path.to_str());
    assert_eq!(config.extraction.concurrency, 5);
}

// ============================================================================
// URL Validation
// ============================================================================

#[test]
fn validate_url_accepts_http_and_https_only() {
    assert!(validate_url(POSTING_URL).is_ok());
    assert!(validate_url("  http://jobs.example.com/1  ").is_ok(), "surrounding whitespace is trimmed");
    let err = validate_url("ftp://jobs.example.com/1").unwrap_err();
    assert!(err.contains("unsupported scheme"), "got: {}", err);
    assert!(validate_url("jobs.example.com/1").is_err());
}

// ============================================================================
// Batch Extraction
// ============================================================================

#[test]
fn batch_keeps_input_order_and_reports_partial() {
    let dir = tempfile::tempdir().unwrap();
    let writer = ArtifactWriter::new(dir.path());
    let mut config = AppConfig::default();
    config.extraction.concurrency = 2;
    let urls = vec![
        POSTING_URL.to_string(),
        "mailto:jobs@acme.com".to_string(),
        "https://jobs.acme.com/moved".to_string(),
    ];

    let report = extract_batch(&urls, &config, &writer, || Ok(SnapshotDom::new(application_page()))).unwrap();

    assert_eq!(report.status, BatchStatus::Partial);
    assert_eq!(report.total_urls, 3);
    assert_eq!(report.succeeded, 2);
    assert_eq!(report.failed, 1);
    let urls_back: Vec<&str> = report.results.iter().map(|r| r.url.as_str()).collect();
    assert_eq!(urls_back, urls.iter().map(String::as_str).collect::<Vec<_>>());

    assert_eq!(report.results[0].status, UrlStatus::Success);
    assert_eq!(report.results[0].total_fields, Some(7));
    assert_eq!(report.results[0].job_title.as_deref(), Some("Senior Engineer"));
    assert_eq!(report.results[1].status, UrlStatus::Error);
    assert!(report.results[1].output_file.is_none());

    assert_eq!(
        std::fs::read_dir(dir.path()).unwrap().count(),
        2,
        "one artifact per successful URL"
    );
}

#[test]
fn empty_batch_is_an_error_report() {
    let dir = tempfile::tempdir().unwrap();
    let writer = ArtifactWriter::new(dir.path());
    let report = extract_batch(&[], &AppConfig::default(), &writer, || Ok(SnapshotDom::new(application_page()))).unwrap();
    assert_eq!(report.total_urls, 0);
    assert_eq!(report.status, BatchStatus::Error);
}

// ============================================================================
// Command Tests
// ============================================================================

#[test]
fn extract_snapshot_writes_an_artifact() {
    let dir = tempfile::tempdir().unwrap();
    let snapshot = dir.path().join("page.json");
    std::fs::write(&snapshot, serde_json::to_string(&application_page()).unwrap()).unwrap();
    let out = dir.path().join("out");

    let artifact = cmd_extract_snapshot(
        snapshot.to_str().unwrap(),
        out.to_str(),
        &AppConfig::default(),
    )
    .unwrap();
    assert_eq!(artifact.url, POSTING_URL);

    let files: Vec<_> = std::fs::read_dir(&out).unwrap().map(|e| e.unwrap().path()).collect();
    assert_eq!(files.len(), 1);
    let name = files[0].file_name().unwrap().to_string_lossy().to_string();
    assert!(name.starts_with("extracted_form_data_") && name.ends_with(".json"), "got {}", name);

    let written: ExtractionArtifact = serde_json::from_str(&std::fs::read_to_string(&files[0]).unwrap()).unwrap();
    assert_eq!(written, artifact);
}

#[test]
fn extract_snapshot_reports_unreadable_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    let result = cmd_extract_snapshot(
        dir.path().join("missing.json").to_str().unwrap(),
        dir.path().to_str(),
        &AppConfig::default(),
    );
    assert!(result.is_err());
}

#[test]
fn fill_replays_a_completed_artifact_against_a_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = AppConfig::default();
    config.fill.trace_dir = dir.path().join("traces").display().to_string();

    let snapshot = dir.path().join("page.json");
    std::fs::write(&snapshot, serde_json::to_string(&application_page()).unwrap()).unwrap();

    let mut artifact = cmd_extract_snapshot(snapshot.to_str().unwrap(), dir.path().join("out").to_str(), &config).unwrap();
    for entry in &mut artifact.user_input_template {
        if entry.id == "email" {
            entry.value = "ada@example.com".into();
        }
    }
    let input = dir.path().join("answers.json");
    std::fs::write(&input, serde_json::to_string_pretty(&artifact).unwrap()).unwrap();

    let report = cmd_fill(input.to_str().unwrap(), false, snapshot.to_str(), &config).unwrap();
    assert_eq!(report.phase, SessionPhase::AwaitingUserSubmit, "snapshot replays never watch");
    assert_eq!(report.filled, 1);
    assert_eq!(report.total, 7);
    assert!(report.trace_file.is_some());
}

#[test]
fn fill_rejects_an_input_without_a_template() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("answers.json");
    std::fs::write(&input, r#"{"url": "https://jobs.acme.com/1", "form_context": {"is_iframe": false, "wait_strategy": "load"}}"#)
        .unwrap();
    let result = cmd_fill(input.to_str().unwrap(), true, None, &AppConfig::default());
    assert!(result.is_err(), "a missing template is a contract violation");
}
