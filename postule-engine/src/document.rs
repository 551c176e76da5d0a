//! Résumé sources: grounding text for the reasoning stage and the file
//! uploaded into file controls.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::SystemTime;

use postule_config::DocumentConfig;
use tracing::{debug, warn};

/// Extractions shorter than this are treated as failed: a few dozen
/// characters of PDF artifacts cannot ground an answer.
const MIN_GROUNDING_CHARS: usize = 50;

#[derive(Default)]
struct CacheState {
    /// Extracted text keyed by the source file's modification time.
    text: Option<(SystemTime, String)>,
    warned_missing: bool,
}

/// Lazily extracts and caches the CV text, and resolves the upload path.
pub struct DocumentStore {
    cv_path: Option<PathBuf>,
    resume_path: Option<PathBuf>,
    cache: Mutex<CacheState>,
}

impl DocumentStore {
    pub fn from_config(cfg: &DocumentConfig) -> Self {
        Self {
            cv_path: cfg.cv_path.as_ref().map(PathBuf::from),
            resume_path: cfg.resume_path.as_ref().map(PathBuf::from),
            cache: Mutex::new(CacheState::default()),
        }
    }

    /// The file to feed into upload controls, if configured and present.
    pub fn resume_path(&self) -> Option<PathBuf> {
        let path = self.resume_path.as_ref()?;
        if path.is_file() {
            Some(path.clone())
        } else {
            warn!(path = %path.display(), "configured resume file does not exist");
            None
        }
    }

    /// Extracted CV text for grounding, or `None` when no usable source is
    /// configured. Re-extracts only when the file's mtime changes.
    pub fn grounding_text(&self) -> Option<String> {
        let path = match &self.cv_path {
            Some(p) => p,
            None => return None,
        };
        let mut cache = self.cache.lock().ok()?;

        let modified = match fs::metadata(path).and_then(|m| m.modified()) {
            Ok(t) => t,
            Err(e) => {
                if !cache.warned_missing {
                    warn!(path = %path.display(), error = %e, "CV file unreadable; document-grounded answers disabled");
                    cache.warned_missing = true;
                }
                return None;
            }
        };

        if let Some((cached_at, text)) = &cache.text {
            if *cached_at == modified {
                return Some(text.clone());
            }
        }

        let text = extract_text(path)?;
        debug!(path = %path.display(), chars = text.len(), "extracted CV grounding text");
        cache.text = Some((modified, text.clone()));
        Some(text)
    }
}

fn extract_text(path: &Path) -> Option<String> {
    let is_pdf = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("pdf"));
    let raw = if is_pdf {
        match pdf_extract::extract_text(path) {
            Ok(text) => text,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "PDF text extraction failed");
                return None;
            }
        }
    } else {
        match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "reading CV text failed");
                return None;
            }
        }
    };

    let trimmed = raw.trim();
    if trimmed.chars().count() < MIN_GROUNDING_CHARS {
        warn!(path = %path.display(), chars = trimmed.len(), "extracted CV text too short to ground answers");
        return None;
    }
    Some(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn store_for(cv: Option<&Path>, resume: Option<&Path>) -> DocumentStore {
        DocumentStore::from_config(&DocumentConfig {
            cv_path: cv.map(|p| p.to_string_lossy().into_owned()),
            resume_path: resume.map(|p| p.to_string_lossy().into_owned()),
        })
    }

    #[test]
    fn unconfigured_store_grounds_nothing() {
        let store = store_for(None, None);
        assert!(store.grounding_text().is_none());
        assert!(store.resume_path().is_none());
    }

    #[test]
    fn text_files_are_read_and_cached() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cv.txt");
        let body = "Senior backend engineer. Eight years of Java and Kotlin, \
                    four years of Kubernetes, fluent French and English.";
        fs::write(&path, body).unwrap();

        let store = store_for(Some(&path), None);
        assert_eq!(store.grounding_text().unwrap(), body);
        // Same mtime: second read is served from the cache.
        assert_eq!(store.grounding_text().unwrap(), body);
    }

    #[test]
    fn short_extractions_do_not_ground() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cv.txt");
        writeln!(fs::File::create(&path).unwrap(), "too short").unwrap();
        let store = store_for(Some(&path), None);
        assert!(store.grounding_text().is_none());
    }

    #[test]
    fn missing_resume_file_is_not_offered_for_upload() {
        let dir = tempfile::tempdir().unwrap();
        let present = dir.path().join("resume.pdf");
        fs::write(&present, b"%PDF-1.4").unwrap();

        let store = store_for(None, Some(&present));
        assert_eq!(store.resume_path().unwrap(), present);

        let store = store_for(None, Some(&dir.path().join("absent.pdf")));
        assert!(store.resume_path().is_none());
    }
}
