use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock};

use regex::Regex;
use serde_json::Value;

use crate::errors::{AppError, ResultExt};

/// Writes raw service responses, one file per record, for later inspection.
pub struct ResponseArchiver {
    dir: PathBuf,
    /// File stems already written by this archiver.
    claimed: Mutex<HashSet<String>>,
}

impl ResponseArchiver {
    /// Creates the archive directory if needed.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, AppError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create archive directory {}", dir.display()))?;
        Ok(Self {
            dir,
            claimed: Mutex::new(HashSet::new()),
        })
    }

    pub fn path_for(&self, record_key: &str) -> PathBuf {
        file_path(&self.dir, &normalize_key(record_key))
    }

    /// Writes `raw_response` under the record's normalized key. Keys that
    /// normalize to a name already written in this run get a `_2`, `_3`, ...
    /// suffix instead of overwriting the earlier file.
    pub fn archive(&self, record_key: &str, raw_response: &Value) -> Result<PathBuf, AppError> {
        let path = self.claim(&normalize_key(record_key));
        let body = serde_json::to_vec_pretty(raw_response)?;
        fs::write(&path, body).with_context(|| format!("Failed to archive response to {}", path.display()))?;
        tracing::debug!("Archived raw response to {}", path.display());
        Ok(path)
    }

    fn claim(&self, stem: &str) -> PathBuf {
        let mut claimed = self.claimed.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut candidate = stem.to_string();
        let mut n = 1;
        while claimed.contains(&candidate) {
            n += 1;
            candidate = format!("{}_{}", stem, n);
        }
        if n > 1 {
            tracing::warn!("Archive name {} already used, writing {} instead", stem, candidate);
        }
        let path = file_path(&self.dir, &candidate);
        claimed.insert(candidate);
        path
    }
}

fn file_path(dir: &Path, stem: &str) -> PathBuf {
    dir.join(format!("{}.json", stem))
}

fn separator_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^A-Za-z0-9\-]+").expect("valid separator regex"))
}

/// Path separators become `-`, other non-alphanumeric runs become `_`.
pub fn normalize_key(key: &str) -> String {
    let dashed = key.replace(['/', '\\'], "-");
    let normalized = separator_regex().replace_all(&dashed, "_");
    let trimmed = normalized.trim_matches('_');
    if trimmed.is_empty() {
        "record".to_string()
    } else {
        trimmed.to_string()
    }
}
