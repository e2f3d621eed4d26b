//! Response cache for the external similarity service.
//!
//! Keys are SHA-256 digests of the exact fragment text sent to the service.
//! Entries live in an in-memory map and, when a database path is given, are
//! written through to SQLite so later runs can reuse them.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use sha2::{Digest, Sha256};
use tracing::warn;

use crate::errors::StdResult;
use crate::store::schema;

const DEFAULT_MAX_ENTRIES: usize = 4096;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
}

#[derive(Default)]
struct Counters {
    hits: u64,
    misses: u64,
}

pub struct SimilarityCache {
    max_entries: usize,
    entries: Mutex<IndexMap<String, f64>>,
    counters: Mutex<Counters>,
    db_path: Option<PathBuf>,
}

impl Default for SimilarityCache {
    fn default() -> Self {
        Self::in_memory()
    }
}

impl SimilarityCache {
    pub fn in_memory() -> Self {
        Self {
            max_entries: DEFAULT_MAX_ENTRIES,
            entries: Mutex::new(IndexMap::new()),
            counters: Mutex::new(Counters::default()),
            db_path: None,
        }
    }

    /// Cache backed by the SQLite file at `db_path`, created if missing.
    pub fn persistent(db_path: &Path) -> StdResult<Self> {
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(db_path)?;
        conn.execute_batch("PRAGMA journal_mode = WAL;")?;
        schema::init_schema(&conn)?;
        Ok(Self {
            db_path: Some(db_path.to_path_buf()),
            ..Self::in_memory()
        })
    }

    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = max_entries.max(1);
        self
    }

    /// Cache key for a set of fragments. Order matters.
    pub fn key(fragments: &[String]) -> String {
        let mut hasher = Sha256::new();
        for fragment in fragments {
            hasher.update(fragment.as_bytes());
            hasher.update([0x1f]);
        }
        format!("{:x}", hasher.finalize())
    }

    fn connect(&self) -> StdResult<Option<Connection>> {
        match &self.db_path {
            Some(path) => Ok(Some(Connection::open(path)?)),
            None => Ok(None),
        }
    }

    pub fn get(&self, key: &str) -> Option<f64> {
        {
            let mut entries = self.entries.lock();
            if let Some(value) = entries.shift_remove(key) {
                // Move to end for LRU
                entries.insert(key.to_string(), value);
                self.counters.lock().hits += 1;
                return Some(value);
            }
        }

        match self.load(key) {
            Ok(Some(value)) => {
                self.remember(key, value);
                self.counters.lock().hits += 1;
                Some(value)
            }
            Ok(None) => {
                self.counters.lock().misses += 1;
                None
            }
            Err(e) => {
                warn!(error = %e, "similarity cache read failed");
                self.counters.lock().misses += 1;
                None
            }
        }
    }

    /// Store a confidence. Persistence failures are logged, never raised.
    pub fn put(&self, key: &str, confidence: f64, provider: &str, model: &str) {
        self.remember(key, confidence);
        if let Err(e) = self.store(key, confidence, provider, model) {
            warn!(error = %e, "similarity cache write failed");
        }
    }

    pub fn stats(&self) -> CacheStats {
        let counters = self.counters.lock();
        CacheStats {
            entries: self.entries.lock().len(),
            hits: counters.hits,
            misses: counters.misses,
        }
    }

    fn remember(&self, key: &str, value: f64) {
        let mut entries = self.entries.lock();
        entries.insert(key.to_string(), value);
        while entries.len() > self.max_entries {
            entries.shift_remove_index(0);
        }
    }

    fn load(&self, key: &str) -> StdResult<Option<f64>> {
        let Some(conn) = self.connect()? else {
            return Ok(None);
        };
        let value: Option<f64> = conn
            .query_row(
                "SELECT confidence FROM similarity_responses WHERE key = ?1;",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        if value.is_some() {
            conn.execute(
                "UPDATE similarity_responses SET hit_count = hit_count + 1 WHERE key = ?1;",
                params![key],
            )?;
        }
        Ok(value)
    }

    fn store(&self, key: &str, confidence: f64, provider: &str, model: &str) -> StdResult<()> {
        let Some(conn) = self.connect()? else {
            return Ok(());
        };
        conn.execute(
            "INSERT INTO similarity_responses(key, confidence, provider, model) \
             VALUES (?1, ?2, ?3, ?4) \
             ON CONFLICT(key) DO UPDATE SET confidence = excluded.confidence;",
            params![key, confidence, provider, model],
        )?;
        Ok(())
    }
}
