use std::collections::HashSet;

use crate::browser::driver::{Driver, Scope, TextBlock};
use crate::browser::error::DriverError;
use crate::cli::config::Timeouts;
use crate::form::fingerprint::Fingerprint;

/// Where the form lives: the document used for document-wide lookups
/// (label association, listbox popups) and the container searched for
/// controls. The two coincide unless a sub-container was chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractionScope {
    pub document: Scope,
    pub container: Scope,
}

impl ExtractionScope {
    pub fn document(document: Scope) -> Self {
        ExtractionScope {
            document,
            container: document,
        }
    }
}

/// State of one extraction run, threaded explicitly through every extractor.
pub struct ExtractionPass<'a> {
    pub scope: ExtractionScope,
    pub timeouts: &'a Timeouts,
    claimed: HashSet<Fingerprint>,
    text_blocks: Option<Vec<TextBlock>>,
    phone_country_claimed: bool,
}

impl<'a> ExtractionPass<'a> {
    pub fn new(scope: ExtractionScope, timeouts: &'a Timeouts) -> Self {
        ExtractionPass {
            scope,
            timeouts,
            claimed: HashSet::new(),
            text_blocks: None,
            phone_country_claimed: false,
        }
    }

    /// Mark a control as consumed; returns false if it already was.
    pub fn claim(&mut self, fingerprint: Fingerprint) -> bool {
        self.claimed.insert(fingerprint)
    }

    pub fn is_claimed(&self, fingerprint: &Fingerprint) -> bool {
        self.claimed.contains(fingerprint)
    }

    pub fn mark_phone_country_claimed(&mut self) {
        self.phone_country_claimed = true;
    }

    /// Whether a composite phone field took a country selector.
    pub fn phone_country_claimed(&self) -> bool {
        self.phone_country_claimed
    }

    /// Visible text blocks of the document, harvested once per pass.
    pub fn text_blocks<D: Driver + ?Sized>(&mut self, driver: &mut D) -> Result<&[TextBlock], DriverError> {
        if self.text_blocks.is_none() {
            self.text_blocks = Some(driver.text_blocks(self.scope.document)?);
        }
        Ok(self.text_blocks.as_deref().unwrap_or_default())
    }
}
