//! File-backed transaction cache.
//!
//! ```text
//! <root>/
//!   3f/
//!     a9/
//!       3fa9…e1.json     <- one file per message id
//! ```
//!
//! The file name is the SHA-256 hex digest of the message id; its first two
//! hex pairs name the bucket directories, capping fan-out at 256 entries per
//! level. Each file holds an RFC 3339 creation timestamp line followed by the
//! JSON outcome (`null` for "no transaction").

use std::fs::{self, File};
use std::io::{ErrorKind, Read, Write};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use lru::LruCache;
use sha2::{Digest, Sha256};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::error::{CheckerError, Result};
use crate::model::transaction::TransactionRecord;

use super::TransactionCache;

/// Number of nested bucket directories.
const BUCKET_DEPTH: usize = 2;

/// Extension of cache entry files.
const ENTRY_EXTENSION: &str = "json";

type Outcome = Option<TransactionRecord>;

/// A decoded entry together with the modification time of the file it came from.
#[derive(Debug, Clone)]
struct Buffered {
    modified: SystemTime,
    outcome: Outcome,
}

/// A [`TransactionCache`] storing one JSON file per message id.
///
/// `preload` decodes the requested entries into a bounded in-memory LRU. The
/// buffer only saves parsing: `has` and `get` still stat the entry file, and a
/// buffered value is used only while the file keeps the modification time it
/// was read with. Each `preload` call starts a fresh batch.
pub struct FileCache {
    root: PathBuf,
    preloaded: Option<Mutex<LruCache<String, Buffered>>>,
}

/// Summary of the files under a cache root.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub entries: u64,
    pub bytes: u64,
}

impl FileCache {
    /// Open a cache rooted at `root`. Directories are created on first save.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            preloaded: None,
        }
    }

    /// Keep up to `capacity` preloaded outcomes in memory (0 disables preloading).
    pub fn with_preload_capacity(mut self, capacity: usize) -> Self {
        self.preloaded = NonZeroUsize::new(capacity).map(|cap| Mutex::new(LruCache::new(cap)));
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Location of the entry file for `id`.
    pub fn path_for(&self, id: &str) -> PathBuf {
        let (dir, file_name) = self.locate(id);
        dir.join(file_name)
    }

    /// Bucket directory and file name for `id`.
    fn locate(&self, id: &str) -> (PathBuf, String) {
        let digest = format!("{:x}", Sha256::digest(id.as_bytes()));
        let mut dir = self.root.clone();
        for level in 0..BUCKET_DEPTH {
            dir.push(&digest[level * 2..level * 2 + 2]);
        }
        (dir, format!("{digest}.{ENTRY_EXTENSION}"))
    }

    /// Count entry files and their total size.
    pub fn stats(&self) -> Result<CacheStats> {
        let mut stats = CacheStats::default();
        if self.root.exists() {
            collect_stats(&self.root, BUCKET_DEPTH, &mut stats)?;
        }
        Ok(stats)
    }

    fn buffer(&self) -> Option<MutexGuard<'_, LruCache<String, Buffered>>> {
        self.preloaded
            .as_ref()
            .map(|m| m.lock().unwrap_or_else(PoisonError::into_inner))
    }

    /// Read and decode the entry for `id`, with the file's modification time.
    ///
    /// Metadata and contents come from the same open handle, so they describe
    /// the same file even if a writer renames a new entry into place meanwhile.
    fn read_entry(&self, id: &str) -> Result<(Option<SystemTime>, Outcome)> {
        let path = self.path_for(id);
        let mut file = File::open(&path).map_err(|e| not_found_or_io(id, &path, e))?;
        let modified = file.metadata().and_then(|m| m.modified()).ok();

        let mut contents = String::new();
        file.read_to_string(&mut contents)
            .map_err(|e| CheckerError::io(&path, e))?;
        let outcome = decode_entry(&contents)
            .map_err(|reason| CheckerError::Serialization { path, reason })?;
        Ok((modified, outcome))
    }
}

impl TransactionCache for FileCache {
    fn has(&self, id: &str) -> bool {
        self.path_for(id).is_file()
    }

    fn get(&self, id: &str) -> Result<Outcome> {
        if let Some(mut buffer) = self.buffer() {
            if let Some(entry) = buffer.get(id) {
                let path = self.path_for(id);
                let modified = fs::metadata(&path)
                    .and_then(|m| m.modified())
                    .map_err(|e| not_found_or_io(id, &path, e))?;
                if modified == entry.modified {
                    debug!(message_id = %id, "Cache entry served from preload buffer");
                    return Ok(entry.outcome.clone());
                }
                buffer.pop(id);
            }
        }
        self.read_entry(id).map(|(_, outcome)| outcome)
    }

    fn save(&self, id: &str, outcome: Option<&TransactionRecord>) -> Result<()> {
        let (dir, file_name) = self.locate(id);
        fs::create_dir_all(&dir).map_err(|e| CheckerError::io(&dir, e))?;
        let path = dir.join(file_name);

        let contents = encode_entry(outcome, Utc::now())
            .map_err(|reason| CheckerError::Serialization {
                path: path.clone(),
                reason,
            })?;

        // Readers never see a partial entry: each write gets its own temp file
        // in the bucket, renamed over the entry. A failed write drops (and so
        // removes) its temp file.
        let mut tmp = NamedTempFile::new_in(&dir).map_err(|e| CheckerError::io(&dir, e))?;
        tmp.write_all(contents.as_bytes())
            .map_err(|e| CheckerError::io(tmp.path(), e))?;
        tmp.persist(&path)
            .map_err(|e| CheckerError::io(&path, e.error))?;

        if let Some(mut buffer) = self.buffer() {
            buffer.pop(id);
        }
        debug!(message_id = %id, path = %path.display(), "Cache entry saved");
        Ok(())
    }

    fn delete(&self, id: &str) -> Result<()> {
        let path = self.path_for(id);
        if let Some(mut buffer) = self.buffer() {
            buffer.pop(id);
        }
        fs::remove_file(&path).map_err(|e| not_found_or_io(id, &path, e))
    }

    fn preload(&self, ids: &[String]) {
        match self.buffer() {
            Some(mut buffer) => buffer.clear(),
            None => return,
        }

        let mut loaded = 0usize;
        for id in ids {
            match self.read_entry(id) {
                Ok((Some(modified), outcome)) => {
                    if let Some(mut buffer) = self.buffer() {
                        buffer.put(id.clone(), Buffered { modified, outcome });
                    }
                    loaded += 1;
                }
                // No modification time to validate against; read on demand.
                Ok((None, _)) => {}
                Err(CheckerError::NotFound(_)) => {}
                Err(e) => warn!(message_id = %id, error = %e, "Skipping unreadable cache entry"),
            }
        }
        debug!(requested = ids.len(), loaded, "Preloaded cache entries");
    }
}

fn not_found_or_io(id: &str, path: &Path, e: std::io::Error) -> CheckerError {
    if e.kind() == ErrorKind::NotFound {
        CheckerError::NotFound(id.to_string())
    } else {
        CheckerError::io(path, e)
    }
}

/// Serialize an outcome as `<timestamp>\n<json>`.
fn encode_entry(
    outcome: Option<&TransactionRecord>,
    created: DateTime<Utc>,
) -> std::result::Result<String, String> {
    let json = serde_json::to_string(&outcome).map_err(|e| e.to_string())?;
    Ok(format!("{}\n{json}", created.to_rfc3339()))
}

/// Parse an entry file, with or without its timestamp line.
fn decode_entry(contents: &str) -> std::result::Result<Outcome, String> {
    let json = match contents.split_once('\n') {
        Some((stamp, rest)) if DateTime::parse_from_rfc3339(stamp.trim()).is_ok() => rest,
        _ => contents,
    };
    serde_json::from_str(json.trim()).map_err(|e| e.to_string())
}

/// Walk `depth` bucket levels below `dir`, counting entry files at the bottom.
fn collect_stats(dir: &Path, depth: usize, stats: &mut CacheStats) -> Result<()> {
    for item in fs::read_dir(dir).map_err(|e| CheckerError::io(dir, e))? {
        let item = item.map_err(|e| CheckerError::io(dir, e))?;
        let path = item.path();
        if depth > 0 {
            if path.is_dir() {
                collect_stats(&path, depth - 1, stats)?;
            }
        } else if path.extension().is_some_and(|ext| ext == ENTRY_EXTENSION) {
            stats.entries += 1;
            stats.bytes += item.metadata().map_err(|e| CheckerError::io(&path, e))?.len();
        }
    }
    Ok(())
}
