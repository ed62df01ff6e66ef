//! Content-addressed on-disk cache for upstream responses.
//!
//! Maps a deterministic request fingerprint to a previously received
//! response body. Caching is purely a performance optimization: a missing,
//! expired, or corrupted entry is always equivalent to a miss, never an
//! error, so an empty cache behaves exactly like refetching.
//!
//! Writes go through a temp file followed by an atomic rename, so
//! concurrent puts for the same fingerprint are idempotent (the body is a
//! pure function of the request) and readers never observe a torn entry.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tempfile::NamedTempFile;
use thiserror::Error;

/// Cache setup errors. Read paths never error; only opening and clearing do.
#[derive(Debug, Error)]
pub enum CacheError {
    /// The cache directory could not be created.
    #[error("failed to create cache directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Clearing the cache directory failed.
    #[error("failed to clear cache directory {path}: {source}")]
    Clear {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A deterministic digest of a normalized upstream request.
///
/// Query parameters are sorted before hashing, so semantically identical
/// requests fingerprint identically regardless of construction order.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Computes the fingerprint for a request path plus query parameters.
    #[must_use]
    pub fn for_request(path: &str, query: &[(String, String)]) -> Self {
        let mut pairs: Vec<&(String, String)> = query.iter().collect();
        pairs.sort();

        let mut hasher = Sha256::new();
        hasher.update(path.as_bytes());
        for (key, value) in pairs {
            hasher.update(b"\n");
            hasher.update(key.as_bytes());
            hasher.update(b"=");
            hasher.update(value.as_bytes());
        }
        Self(hex::encode(hasher.finalize()))
    }

    /// Hex digest string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// On-disk envelope for one cached response.
#[derive(Debug, Serialize, Deserialize)]
struct CacheEnvelope {
    fetched_at: DateTime<Utc>,
    body: serde_json::Value,
}

/// File-backed response cache.
///
/// Safe to share across fetch tasks: reads touch independent files and
/// writes are atomic per fingerprint.
#[derive(Debug)]
pub struct Cache {
    dir: PathBuf,
    ttl: Option<Duration>,
}

impl Cache {
    /// Opens (and creates if needed) the cache directory.
    ///
    /// `ttl` of `None` means entries never expire.
    pub fn open(dir: impl Into<PathBuf>, ttl: Option<Duration>) -> Result<Self, CacheError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|source| CacheError::CreateDir {
            path: dir.clone(),
            source,
        })?;
        Ok(Self { dir, ttl })
    }

    fn entry_path(&self, fingerprint: &Fingerprint) -> PathBuf {
        self.dir.join(format!("{fingerprint}.json"))
    }

    /// Looks up a cached response body.
    ///
    /// Returns `None` for missing, expired, or unreadable entries.
    /// Corruption is treated as a miss and logged at debug level only.
    #[must_use]
    pub fn get(&self, fingerprint: &Fingerprint) -> Option<serde_json::Value> {
        let path = self.entry_path(fingerprint);
        let raw = std::fs::read(&path).ok()?;
        let envelope: CacheEnvelope = match serde_json::from_slice(&raw) {
            Ok(envelope) => envelope,
            Err(err) => {
                tracing::debug!(%fingerprint, error = %err, "corrupt cache entry treated as miss");
                return None;
            }
        };

        if let Some(ttl) = self.ttl {
            let age = Utc::now().signed_duration_since(envelope.fetched_at);
            if age.to_std().is_ok_and(|age| age > ttl) {
                tracing::debug!(%fingerprint, "cache entry expired");
                return None;
            }
        }

        tracing::debug!(%fingerprint, "cache hit");
        Some(envelope.body)
    }

    /// Stores a response body under its fingerprint.
    ///
    /// Failures are logged and swallowed: the cache never fails a fetch.
    /// Each write lands in its own uniquely named temp file followed by a
    /// rename, so concurrent puts for the same fingerprint never interleave
    /// and a concurrent reader sees either the old entry or a complete new
    /// one.
    pub fn put(&self, fingerprint: &Fingerprint, body: &serde_json::Value) {
        let envelope = CacheEnvelope {
            fetched_at: Utc::now(),
            body: body.clone(),
        };
        let Ok(serialized) = serde_json::to_vec(&envelope) else {
            return;
        };

        let final_path = self.entry_path(fingerprint);
        let mut tmp = match NamedTempFile::new_in(&self.dir) {
            Ok(tmp) => tmp,
            Err(err) => {
                tracing::warn!(%fingerprint, error = %err, "cache write failed");
                return;
            }
        };
        if let Err(err) = tmp.write_all(&serialized) {
            tracing::warn!(%fingerprint, error = %err, "cache write failed");
            return;
        }
        if let Err(err) = tmp.persist(&final_path) {
            tracing::warn!(%fingerprint, error = %err, "cache rename failed");
        }
    }

    /// Removes every cache entry.
    pub fn clear(&self) -> Result<usize, CacheError> {
        let mut removed = 0;
        let entries = std::fs::read_dir(&self.dir).map_err(|source| CacheError::Clear {
            path: self.dir.clone(),
            source,
        })?;
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                if let Err(err) = std::fs::remove_file(&path) {
                    tracing::warn!(path = %path.display(), error = %err, "failed to remove cache entry");
                } else {
                    removed += 1;
                }
            }
        }
        tracing::info!(removed, dir = %self.dir.display(), "cache cleared");
        Ok(removed)
    }

    /// Timestamp of the oldest cached entry, if any.
    ///
    /// Used to warn users how stale a cache-served report might be.
    #[must_use]
    pub fn oldest_entry_at(&self) -> Option<DateTime<Utc>> {
        let entries = std::fs::read_dir(&self.dir).ok()?;
        entries
            .flatten()
            .filter(|entry| entry.path().extension().is_some_and(|ext| ext == "json"))
            .filter_map(|entry| {
                let raw = std::fs::read(entry.path()).ok()?;
                let envelope: CacheEnvelope = serde_json::from_slice(&raw).ok()?;
                Some(envelope.fetched_at)
            })
            .min()
    }

    /// The cache directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}
