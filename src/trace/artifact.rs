use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;
use tracing::info;

use crate::form::error::FormError;
use crate::form::field_model::ExtractionArtifact;

pub const ARTIFACT_PREFIX: &str = "extracted_form_data";
pub const FILL_TRACE_PREFIX: &str = "fill_trace";

/// `<prefix>_<YYYYmmdd_HHMMSS_micros>.<ext>`
pub fn timestamped_name(prefix: &str, extension: &str) -> String {
    format!(
        "{}_{}.{}",
        prefix,
        chrono::Local::now().format("%Y%m%d_%H%M%S_%6f"),
        extension
    )
}

/// Writes timestamped JSON files into one directory. An existing file is
/// never overwritten; colliding names get a sequence suffix.
pub struct ArtifactWriter {
    dir: PathBuf,
    sequence: AtomicU64,
}

impl ArtifactWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        ArtifactWriter {
            dir: dir.into(),
            sequence: AtomicU64::new(0),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn write_artifact(&self, artifact: &ExtractionArtifact) -> Result<PathBuf, FormError> {
        self.write_json(ARTIFACT_PREFIX, artifact)
    }

    pub fn write_json<T: Serialize>(&self, prefix: &str, value: &T) -> Result<PathBuf, FormError> {
        let json = serde_json::to_string_pretty(value).map_err(|source| FormError::Json {
            context: format!("serializing {}", prefix),
            source,
        })?;
        std::fs::create_dir_all(&self.dir).map_err(|source| FormError::Io {
            context: format!("creating {}", self.dir.display()),
            source,
        })?;

        let base = timestamped_name(prefix, "json");
        let mut path = self.dir.join(&base);
        loop {
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(mut file) => {
                    file.write_all(json.as_bytes()).map_err(|source| FormError::Io {
                        context: format!("writing {}", path.display()),
                        source,
                    })?;
                    info!(path = %path.display(), "wrote {}", prefix);
                    return Ok(path);
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    let n = self.sequence.fetch_add(1, Ordering::Relaxed) + 1;
                    let stem = base.trim_end_matches(".json");
                    path = self.dir.join(format!("{}_{}.json", stem, n));
                }
                Err(source) => {
                    return Err(FormError::Io {
                        context: format!("creating {}", path.display()),
                        source,
                    });
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamped_names_carry_prefix_and_extension() {
        let name = timestamped_name(ARTIFACT_PREFIX, "json");
        assert!(name.starts_with("extracted_form_data_"));
        assert!(name.ends_with(".json"));
        // prefix + '_' + 8 date + '_' + 6 time + '_' + 6 micros + ".json"
        assert_eq!(name.len(), ARTIFACT_PREFIX.len() + 1 + 8 + 1 + 6 + 1 + 6 + 5);
    }

    #[test]
    fn writes_never_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let writer = ArtifactWriter::new(dir.path());
        let a = writer.write_json("sample", &serde_json::json!({"n": 1})).unwrap();
        let b = writer.write_json("sample", &serde_json::json!({"n": 2})).unwrap();
        assert_ne!(a, b);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 2);
    }
}
