//! Durable on-disk copy of the default agent's format catalog.
//!
//! The store is best-effort: every I/O or parse failure is logged and
//! treated as a cache miss. It exists so format ids can still be resolved
//! when the agent is unreachable, and so legacy ids keep resolving after
//! the catalog moved to fully-qualified ids.
//!
//! File layout:
//!
//! ```json
//! {
//!   "formats": { "<format_id>": { ...wire spec... } },
//!   "cached_at": "2026-01-01T00:00:00Z",
//!   "agent_url": "https://creative.adcontextprotocol.org",
//!   "count": 42
//! }
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

use chrono::{DateTime, Duration, Utc};
use salesagent_core::format::FormatSpec;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Age after which a refresh is recommended on load.
const STALE_AFTER_DAYS: i64 = 7;

/// Old format ids that were renamed rather than suffixed.
const LEGACY_FORMAT_IDS: &[(&str, &str)] = &[
    ("video_640x480", "video_1280x720"),
    ("video_640x360", "video_1280x720"),
];

/// Suffixes tried in order when an id misses. First match wins.
const FALLBACK_SUFFIXES: &[&str] = &["_image", "_html", "_generative"];

/// On-disk document. Every key is optional so older files still load.
#[derive(Debug, Default, Serialize, Deserialize)]
struct CacheDocument {
    #[serde(default)]
    formats: HashMap<String, Value>,
    #[serde(default)]
    cached_at: Option<DateTime<Utc>>,
    #[serde(default)]
    agent_url: Option<String>,
    #[serde(default)]
    count: Option<usize>,
}

/// File-backed format catalog with a legacy-id fallback chain.
pub struct FormatCacheStore {
    path: PathBuf,
    /// `None` until the file has been read once.
    formats: RwLock<Option<HashMap<String, FormatSpec>>>,
}

impl FormatCacheStore {
    /// Create a store backed by `path`. Nothing is read until first use.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            formats: RwLock::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the file and replace the in-memory catalog.
    ///
    /// Returns an empty map if the file is absent or corrupt. Entries that
    /// fail to parse are skipped.
    pub fn load(&self) -> HashMap<String, FormatSpec> {
        let formats = read_document(&self.path)
            .map(|doc| {
                if let Some(cached_at) = doc.cached_at {
                    let age = Utc::now() - cached_at;
                    if age > Duration::days(STALE_AFTER_DAYS) {
                        tracing::info!(
                            path = %self.path.display(),
                            age_days = age.num_days(),
                            "Format cache is stale, refresh recommended"
                        );
                    }
                }
                let fallback_agent = doc.agent_url.unwrap_or_default();
                doc.formats
                    .into_iter()
                    .filter_map(|(id, spec)| match FormatSpec::from_wire(&spec, &fallback_agent) {
                        Ok(parsed) => Some((id, parsed)),
                        Err(e) => {
                            tracing::warn!(format_id = %id, error = %e, "Skipping cached format");
                            None
                        }
                    })
                    .collect::<HashMap<_, _>>()
            })
            .unwrap_or_default();

        let mut guard = self.formats.write().unwrap_or_else(PoisonError::into_inner);
        *guard = Some(formats.clone());
        formats
    }

    /// Overwrite the file with `formats`. Failures are logged, not returned.
    ///
    /// The document is written to a sibling temp file and renamed into
    /// place so readers never observe a partial write.
    pub fn save(&self, agent_url: &str, formats: &[FormatSpec]) {
        let document = CacheDocument {
            formats: formats
                .iter()
                .map(|f| (f.format_id.clone(), f.to_wire()))
                .collect(),
            cached_at: Some(Utc::now()),
            agent_url: Some(agent_url.to_string()),
            count: Some(formats.len()),
        };

        if let Err(e) = write_atomically(&self.path, &document) {
            tracing::warn!(path = %self.path.display(), error = %e, "Failed to write format cache");
            return;
        }

        let catalog = formats
            .iter()
            .map(|f| (f.format_id.clone(), f.clone()))
            .collect();
        let mut guard = self.formats.write().unwrap_or_else(PoisonError::into_inner);
        *guard = Some(catalog);
        tracing::debug!(path = %self.path.display(), count = formats.len(), "Format cache saved");
    }

    /// Resolve a format id: exact match, then the legacy rename table, then
    /// each fallback suffix in order.
    pub fn lookup(&self, format_id: &str) -> Option<FormatSpec> {
        self.with_catalog(|catalog| {
            if let Some(spec) = catalog.get(format_id) {
                return Some(spec.clone());
            }
            if let Some((_, renamed)) = LEGACY_FORMAT_IDS.iter().find(|(old, _)| *old == format_id)
            {
                if let Some(spec) = catalog.get(*renamed) {
                    return Some(spec.clone());
                }
            }
            FALLBACK_SUFFIXES
                .iter()
                .find_map(|suffix| catalog.get(&format!("{format_id}{suffix}")))
                .cloned()
        })
    }

    /// All cached formats, ordered by id.
    pub fn catalog(&self) -> Vec<FormatSpec> {
        let mut formats = self.with_catalog(|catalog| catalog.values().cloned().collect::<Vec<_>>());
        formats.sort_by(|a, b| a.format_id.cmp(&b.format_id));
        formats
    }

    fn with_catalog<T>(&self, f: impl FnOnce(&HashMap<String, FormatSpec>) -> T) -> T {
        {
            let guard = self.formats.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(catalog) = guard.as_ref() {
                return f(catalog);
            }
        }
        f(&self.load())
    }
}

fn read_document(path: &Path) -> Option<CacheDocument> {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Failed to read format cache");
            return None;
        }
    };
    match serde_json::from_str(&raw) {
        Ok(doc) => Some(doc),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Format cache is corrupt, ignoring");
            None
        }
    }
}

fn write_atomically(path: &Path, document: &CacheDocument) -> std::io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let bytes = serde_json::to_vec_pretty(document).map_err(std::io::Error::other)?;
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, bytes)?;
    std::fs::rename(&tmp, path)
}
