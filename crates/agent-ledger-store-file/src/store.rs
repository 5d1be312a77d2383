// crates/agent-ledger-store-file/src/store.rs
// ============================================================================
// Module: File Event Store
// Description: Durable EventStore over rotating JSONL segments.
// Purpose: Persist the hash chain with per-record fsync and local locking.
// Dependencies: agent-ledger-core, fs2, serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! The store scans segments in numeric order on open, validates the full
//! chain (including links across segment boundaries), and caches the tail so
//! appends and tail reads stay O(1). Every append serializes one compact
//! record line, flushes, and syncs before the cache advances. A crash can
//! lose at most the record being written, never corrupt an acknowledged one.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::fs::File;
use std::fs::OpenOptions;
use std::io::BufRead;
use std::io::BufReader;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;

use agent_ledger_core::BackendError;
use agent_ledger_core::EventDraft;
use agent_ledger_core::EventStore;
use agent_ledger_core::LogRecord;
use agent_ledger_core::NoopTelemetry;
use agent_ledger_core::StoreError;
use agent_ledger_core::StoreMetric;
use agent_ledger_core::StoreTelemetry;
use agent_ledger_core::Tail;
use agent_ledger_core::seal_record;
use agent_ledger_core::verify_chain;
use fs2::FileExt;
use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Segment file name prefix.
const SEGMENT_PREFIX: &str = "segment-";
/// Segment file name suffix.
const SEGMENT_SUFFIX: &str = ".jsonl";
/// Advisory lock file name inside the ledger directory.
const LOCK_FILE: &str = "ledger.lock";

// ============================================================================
// SECTION: Config
// ============================================================================

/// File store configuration.
///
/// # Invariants
/// - A `segment_max_bytes` of zero disables rotation entirely.
/// - A `segment_max_count` of zero leaves the segment count unbounded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileStoreConfig {
    /// Ledger directory holding segments and the lock file.
    pub path: PathBuf,
    /// Rotation threshold in bytes; zero disables rotation.
    #[serde(default)]
    pub segment_max_bytes: u64,
    /// Maximum number of segments; zero disables the cap.
    #[serde(default)]
    pub segment_max_count: u64,
}

impl FileStoreConfig {
    /// Creates a config with rotation disabled.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), segment_max_bytes: 0, segment_max_count: 0 }
    }
}

// ============================================================================
// SECTION: Store State
// ============================================================================

/// Mutable store state guarded for concurrent local callers.
#[derive(Debug)]
struct Inner {
    /// Cached tail of the log.
    tail: Tail,
    /// Index of the active segment.
    active_segment: u64,
    /// Byte size of the active segment.
    active_bytes: u64,
}

/// Durable event store over rotating JSONL segments.
///
/// # Invariants
/// - At most one writer instance exists per directory (advisory lock).
/// - The cached tail always matches the last durable record.
pub struct FileEventStore {
    /// Store configuration.
    config: FileStoreConfig,
    /// Advisory lock handle; `None` for read-only stores.
    lock: Option<File>,
    /// Guarded mutable state.
    inner: Mutex<Inner>,
    /// Counter sink for store operations.
    telemetry: Arc<dyn StoreTelemetry>,
}

impl std::fmt::Debug for FileEventStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileEventStore").field("config", &self.config).finish_non_exhaustive()
    }
}

impl FileEventStore {
    /// Opens the store for writing, taking the exclusive advisory lock.
    ///
    /// The directory is created when missing; existing segments are scanned
    /// and the full chain validated before the store accepts appends.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Backend`] when the directory or lock cannot be
    /// acquired and [`StoreError::Integrity`] when the stored chain fails
    /// validation.
    pub fn open(config: FileStoreConfig) -> Result<Self, StoreError> {
        fs::create_dir_all(&config.path).map_err(io_error)?;
        let lock_path = config.path.join(LOCK_FILE);
        let lock = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&lock_path)
            .map_err(io_error)?;
        lock.try_lock_exclusive().map_err(|_| {
            StoreError::Backend(BackendError::Io(format!(
                "ledger directory {} is locked by another writer",
                config.path.display()
            )))
        })?;
        let inner = Self::scan(&config)?;
        Ok(Self {
            config,
            lock: Some(lock),
            inner: Mutex::new(inner),
            telemetry: Arc::new(NoopTelemetry),
        })
    }

    /// Replaces the telemetry sink.
    #[must_use]
    pub fn with_telemetry(mut self, telemetry: Arc<dyn StoreTelemetry>) -> Self {
        self.telemetry = telemetry;
        self
    }

    /// Opens the store for reading only, without taking the lock.
    ///
    /// Used by inspection and audit tooling running beside a live writer.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Backend`] when the directory is unreadable and
    /// [`StoreError::Integrity`] when the stored chain fails validation.
    pub fn open_read_only(config: FileStoreConfig) -> Result<Self, StoreError> {
        if !config.path.is_dir() {
            return Err(StoreError::Backend(BackendError::NoSuchBucket(format!(
                "ledger directory {} does not exist",
                config.path.display()
            ))));
        }
        let inner = Self::scan(&config)?;
        Ok(Self {
            config,
            lock: None,
            inner: Mutex::new(inner),
            telemetry: Arc::new(NoopTelemetry),
        })
    }

    /// Scans all segments, validates the chain, and rebuilds the tail cache.
    fn scan(config: &FileStoreConfig) -> Result<Inner, StoreError> {
        let segments = segment_indices(&config.path)?;
        let mut records = Vec::new();
        for index in &segments {
            read_segment(&segment_path(&config.path, *index), &mut records)?;
        }
        verify_chain(&records).map_err(|err| StoreError::from_chain(&err))?;
        let tail = records.last().map_or_else(Tail::empty, |last| Tail {
            last_seq: Some(last.event.seq),
            last_event_hash: last.event_hash.clone(),
        });
        let active_segment = segments.last().copied().unwrap_or(0);
        let active_bytes = match fs::metadata(segment_path(&config.path, active_segment)) {
            Ok(metadata) => metadata.len(),
            Err(_) => 0,
        };
        Ok(Inner { tail, active_segment, active_bytes })
    }

    /// Acquires the inner lock, mapping poisoning to a backend error.
    fn inner(&self) -> Result<MutexGuard<'_, Inner>, StoreError> {
        self.inner
            .lock()
            .map_err(|_| StoreError::Backend(BackendError::Io("store lock poisoned".to_string())))
    }

    /// Returns true when this instance may append.
    const fn writable(&self) -> bool {
        self.lock.is_some()
    }

    /// Rotates to a fresh segment when the next write would cross the
    /// threshold, returning the path to append to.
    fn rotate_if_needed(&self, inner: &mut Inner, line_bytes: u64) -> PathBuf {
        let threshold = self.config.segment_max_bytes;
        let cap = self.config.segment_max_count;
        let should_rotate = threshold > 0
            && inner.active_bytes > 0
            && inner.active_bytes + line_bytes > threshold
            && (cap == 0 || inner.active_segment + 1 < cap);
        if should_rotate {
            inner.active_segment += 1;
            inner.active_bytes = 0;
        }
        segment_path(&self.config.path, inner.active_segment)
    }
}

impl EventStore for FileEventStore {
    fn append(
        &self,
        draft: EventDraft,
        expected_prev_hash: &str,
    ) -> Result<LogRecord, StoreError> {
        if !self.writable() {
            return Err(StoreError::Backend(BackendError::Io(
                "store opened read-only".to_string(),
            )));
        }
        let mut inner = self.inner()?;
        if inner.tail.last_event_hash != expected_prev_hash {
            self.telemetry.incr(StoreMetric::AppendConflict);
            return Err(StoreError::Conflict { expected: expected_prev_hash.to_string() });
        }
        let seq = inner.tail.next_seq();
        let event = draft.into_event(seq);
        let record = seal_record(&inner.tail.last_event_hash, event)
            .map_err(|err| StoreError::from_chain(&err))?;
        let mut line = serde_json::to_string(&record)
            .map_err(|err| StoreError::Backend(BackendError::Io(err.to_string())))?;
        line.push('\n');

        let segment = self.rotate_if_needed(&mut inner, line.len() as u64);
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(segment)
            .map_err(io_error)?;
        file.write_all(line.as_bytes()).map_err(io_error)?;
        file.flush().map_err(io_error)?;
        file.sync_data().map_err(io_error)?;

        inner.active_bytes += line.len() as u64;
        inner.tail =
            Tail { last_seq: Some(seq), last_event_hash: record.event_hash.clone() };
        self.telemetry.incr(StoreMetric::AppendOk);
        Ok(record)
    }

    fn read(&self, from_seq: u64, to_seq: Option<u64>) -> Result<Vec<LogRecord>, StoreError> {
        let segments = segment_indices(&self.config.path)?;
        let mut records = Vec::new();
        for index in segments {
            read_segment(&segment_path(&self.config.path, index), &mut records)?;
        }
        if let Err(err) = verify_chain(&records) {
            self.telemetry.incr(StoreMetric::IntegrityFailure);
            return Err(StoreError::from_chain(&err));
        }
        records.retain(|record| {
            record.event.seq >= from_seq && to_seq.is_none_or(|end| record.event.seq <= end)
        });
        self.telemetry.incr(StoreMetric::ReadOk);
        Ok(records)
    }

    fn tail(&self) -> Result<Tail, StoreError> {
        Ok(self.inner()?.tail.clone())
    }
}

// ============================================================================
// SECTION: Segment Files
// ============================================================================

/// Builds the path of a segment by index.
fn segment_path(dir: &Path, index: u64) -> PathBuf {
    dir.join(format!("{SEGMENT_PREFIX}{index:06}{SEGMENT_SUFFIX}"))
}

/// Lists segment indices present in the directory, in numeric order.
fn segment_indices(dir: &Path) -> Result<Vec<u64>, StoreError> {
    let mut indices = Vec::new();
    let entries = fs::read_dir(dir).map_err(io_error)?;
    for entry in entries {
        let entry = entry.map_err(io_error)?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };
        if let Some(stem) = name.strip_prefix(SEGMENT_PREFIX)
            && let Some(digits) = stem.strip_suffix(SEGMENT_SUFFIX)
            && let Ok(index) = digits.parse::<u64>()
        {
            indices.push(index);
        }
    }
    indices.sort_unstable();
    Ok(indices)
}

/// Reads one segment file, appending parsed records in order.
fn read_segment(path: &Path, records: &mut Vec<LogRecord>) -> Result<(), StoreError> {
    let file = File::open(path).map_err(io_error)?;
    let reader = BufReader::new(file);
    for line in reader.lines() {
        let line = line.map_err(io_error)?;
        if line.trim().is_empty() {
            continue;
        }
        let record: LogRecord = serde_json::from_str(&line).map_err(|err| {
            StoreError::Integrity {
                seq: records.last().map_or(0, |last| last.event.seq + 1),
                detail: format!("malformed record line: {err}"),
            }
        })?;
        records.push(record);
    }
    Ok(())
}

/// Maps an I/O error into the backend taxonomy.
fn io_error(err: std::io::Error) -> StoreError {
    StoreError::Backend(BackendError::Io(err.to_string()))
}
