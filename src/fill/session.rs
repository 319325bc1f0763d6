//! The fill session: a linear state machine from navigation to the user's
//! manual submit.

use std::path::PathBuf;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::browser::driver::{Driver, Scope, Script};
use crate::cli::config::AppConfig;
use crate::fill::filler::FormFiller;
use crate::fill::geolocation::{resolve_coordinates, run_geolocation_pass};
use crate::fill::navigator::{open_posting, resolve_root};
use crate::fill::report::FillReport;
use crate::form::error::FormError;
use crate::form::field_model::FillRequest;
use crate::trace::artifact::{FILL_TRACE_PREFIX, timestamped_name};
use crate::trace::event::FillEvent;
use crate::trace::logger::FillTraceLogger;

pub const SUCCESS_PHRASES: &[&str] = &[
    "thank you",
    "application submitted",
    "successfully submitted",
    "application received",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionPhase {
    Init,
    Navigated,
    IframeResolved,
    MainDoc,
    FieldsFilling,
    GeoPass,
    AwaitingUserSubmit,
    SubmitDetected,
    UserClosed,
}

impl SessionPhase {
    /// Legal forward transitions. The browser can be closed at any point.
    pub fn can_advance_to(self, next: SessionPhase) -> bool {
        use SessionPhase::*;
        if next == UserClosed {
            return !self.is_terminal();
        }
        matches!(
            (self, next),
            (Init, Navigated)
                | (Navigated, IframeResolved)
                | (Navigated, MainDoc)
                | (IframeResolved, FieldsFilling)
                | (MainDoc, FieldsFilling)
                | (FieldsFilling, GeoPass)
                | (FieldsFilling, AwaitingUserSubmit)
                | (GeoPass, AwaitingUserSubmit)
                | (AwaitingUserSubmit, SubmitDetected)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, SessionPhase::SubmitDetected | SessionPhase::UserClosed)
    }
}

/// One fill run over one driver.
pub struct FillSession<'a> {
    config: &'a AppConfig,
    watch: bool,
    max_polls: Option<u32>,
    phase: SessionPhase,
    step: u64,
    trace: FillTraceLogger,
    trace_path: Option<PathBuf>,
}

impl<'a> FillSession<'a> {
    /// Session writing its trace into the configured trace directory.
    pub fn new(config: &'a AppConfig) -> Self {
        let dir = PathBuf::from(&config.fill.trace_dir);
        let (trace, trace_path) = match std::fs::create_dir_all(&dir) {
            Ok(()) => {
                let path = dir.join(timestamped_name(FILL_TRACE_PREFIX, "jsonl"));
                (FillTraceLogger::new(&path), Some(path))
            }
            Err(e) => {
                warn!(dir = %dir.display(), error = %e, "trace directory unavailable, tracing disabled");
                (FillTraceLogger::disabled(), None)
            }
        };
        FillSession {
            config,
            watch: config.fill.watch_submission,
            max_polls: None,
            phase: SessionPhase::Init,
            step: 0,
            trace,
            trace_path,
        }
    }

    /// Return once the fields are filled instead of watching for submit.
    pub fn without_watch(mut self) -> Self {
        self.watch = false;
        self
    }

    /// Stop watching after `polls` polls without a submission.
    pub fn with_max_polls(mut self, polls: u32) -> Self {
        self.max_polls = Some(polls);
        self
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    fn advance(&mut self, next: SessionPhase) {
        if !self.phase.can_advance_to(next) {
            warn!(from = ?self.phase, to = ?next, "unexpected phase transition");
        }
        info!(from = ?self.phase, to = ?next, "fill phase");
        self.phase = next;
        self.step += 1;
        self.trace.log(&FillEvent::now(self.step, next));
    }

    /// Validate the request, reach the form and fill every entry.
    pub fn run<D: Driver + ?Sized>(&mut self, driver: &mut D, request: &FillRequest) -> Result<FillReport, FormError> {
        request.validate()?;
        match self.drive(driver, request) {
            Err(e) if e.is_fatal() && !matches!(e, FormError::ContractViolation(_)) => {
                if !self.phase.is_terminal() {
                    self.trace.log(&FillEvent::now(self.step + 1, SessionPhase::UserClosed).with_detail(&e));
                    self.phase = SessionPhase::UserClosed;
                }
                Err(e)
            }
            other => other,
        }
    }

    fn drive<D: Driver + ?Sized>(&mut self, driver: &mut D, request: &FillRequest) -> Result<FillReport, FormError> {
        let config = self.config;
        let geo = &config.fill.geolocation;
        if geo.enabled {
            let point = resolve_coordinates(geo);
            if let Err(e) = driver.grant_geolocation(&point) {
                warn!(error = %e, "could not grant geolocation");
            }
        }

        open_posting(driver, &request.url, &request.form_context, config)?;
        self.advance(SessionPhase::Navigated);

        let root = resolve_root(driver, &request.form_context, config)?;
        self.advance(match root.scope {
            Scope::Frame(_) => SessionPhase::IframeResolved,
            _ => SessionPhase::MainDoc,
        });

        self.advance(SessionPhase::FieldsFilling);
        let fields = {
            let mut filler = FormFiller::new(driver, &config.timeouts, root.scope);
            filler.fill_all(&request.user_input_template, &self.trace)?
        };
        let filled = fields.iter().filter(|f| f.outcome.counts_as_filled()).count();
        info!(filled, total = fields.len(), "fields processed");

        let geolocation = if geo.enabled {
            self.advance(SessionPhase::GeoPass);
            Some(run_geolocation_pass(driver, root.scope, &request.user_input_template, &config.timeouts)?)
        } else {
            None
        };

        self.advance(SessionPhase::AwaitingUserSubmit);
        if self.watch {
            info!("form filled, waiting for the manual submit");
            let end = watch_for_submission(driver, config.fill.poll_interval_ms, SUCCESS_PHRASES, self.max_polls);
            if end != SessionPhase::AwaitingUserSubmit {
                self.advance(end);
            }
        }

        Ok(FillReport {
            url: request.url.clone(),
            phase: self.phase,
            filled,
            total: fields.len(),
            fields,
            geolocation,
            trace_file: self.trace_path.as_ref().map(|p| p.display().to_string()),
        })
    }
}

/// Poll until the URL changes or a success message shows. Any driver
/// failure means the user closed the browser. With `max_polls` set, gives
/// up and stays in `AwaitingUserSubmit`.
pub fn watch_for_submission<D: Driver + ?Sized>(
    driver: &mut D,
    poll_ms: u64,
    phrases: &[&str],
    max_polls: Option<u32>,
) -> SessionPhase {
    let initial = match driver.current_url() {
        Ok(url) => url,
        Err(e) => {
            debug!(error = %e, "page gone before the watch started");
            return SessionPhase::UserClosed;
        }
    };
    let script = Script::SuccessTextPresent {
        phrases: phrases.iter().map(|p| p.to_string()).collect(),
    };
    let mut polls = 0u32;
    loop {
        if max_polls.is_some_and(|max| polls >= max) {
            return SessionPhase::AwaitingUserSubmit;
        }
        polls += 1;
        if driver.wait(poll_ms).is_err() {
            return SessionPhase::UserClosed;
        }
        match driver.current_url() {
            Ok(url) if url != initial => {
                info!(url = %url, "navigation after submit detected");
                return SessionPhase::SubmitDetected;
            }
            Ok(_) => {}
            Err(_) => {
                info!("browser closed");
                return SessionPhase::UserClosed;
            }
        }
        match driver.evaluate(Scope::Page, &script) {
            Ok(value) if value.as_bool() == Some(true) => {
                info!("success message detected");
                return SessionPhase::SubmitDetected;
            }
            Ok(_) => {}
            Err(_) => {
                info!("browser closed");
                return SessionPhase::UserClosed;
            }
        }
    }
}
