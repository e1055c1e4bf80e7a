//! On-disk cache tier.
//!
//! Keys are hashed to `hex(sha256(key))` filenames under a configured
//! directory. Each file holds the entry's creation time as a unix
//! timestamp, a newline, then the raw bytes. Expiry is evaluated lazily on
//! read against the tier's configured TTL, deleting stale files as they are
//! encountered. Writes go through a temp file and an atomic rename so
//! concurrent writers to the same key cannot leave a torn entry.

use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

/// File-backed byte cache rooted at one directory.
pub struct FileCache {
    dir: PathBuf,
    ttl: Duration,
}

impl FileCache {
    /// Creates the tier, creating `dir` if needed. Returns `None` when the
    /// directory cannot be created; the caller treats that as the tier
    /// being disabled.
    #[must_use]
    pub fn new(dir: &Path, ttl: Duration) -> Option<Self> {
        if let Err(e) = std::fs::create_dir_all(dir) {
            warn!(dir = %dir.display(), error = %e, "file cache disabled, cannot create directory");
            return None;
        }
        Some(Self {
            dir: dir.to_path_buf(),
            ttl,
        })
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        let digest = Sha256::digest(key.as_bytes());
        self.dir.join(hex::encode(digest))
    }

    /// Reads an entry, deleting it lazily when expired or malformed.
    pub fn get(&self, key: &str) -> Option<Vec<u8>> {
        let path = self.entry_path(key);
        let raw = std::fs::read(&path).ok()?;

        let newline = raw.iter().position(|&b| b == b'\n')?;
        let ts: i64 = std::str::from_utf8(&raw[..newline]).ok()?.trim().parse().ok()?;

        let now = chrono::Utc::now().timestamp();
        #[allow(clippy::cast_possible_wrap)]
        let deadline = ts.saturating_add(self.ttl.as_secs() as i64);
        if now > deadline {
            debug!(key, "file cache entry expired, removing");
            let _ = std::fs::remove_file(&path);
            return None;
        }

        Some(raw[newline + 1..].to_vec())
    }

    /// Writes an entry, best-effort. Failures are logged and swallowed.
    pub fn set(&self, key: &str, bytes: &[u8]) {
        let path = self.entry_path(key);
        let tmp = path.with_extension("tmp");

        let mut payload = chrono::Utc::now().timestamp().to_string().into_bytes();
        payload.push(b'\n');
        payload.extend_from_slice(bytes);

        if let Err(e) = std::fs::write(&tmp, &payload) {
            warn!(key, error = %e, "file cache write failed");
            return;
        }
        if let Err(e) = std::fs::rename(&tmp, &path) {
            warn!(key, error = %e, "file cache rename failed");
            let _ = std::fs::remove_file(&tmp);
        }
    }
}
