// crates/agent-ledger-store-object/src/store.rs
// ============================================================================
// Module: Object Event Store
// Description: EventStore over S3-compatible conditional-create objects.
// Purpose: Serialize multi-host appends through store-side preconditions.
// Dependencies: agent-ledger-core, aws-config, aws-sdk-s3, serde_json, tokio
// ============================================================================

//! ## Overview
//! Appends rely on the backing store's conditional create: `PutObject` with
//! `If-None-Match: *` succeeds only when the key does not exist. The head
//! object is a hint for the common path; `tail()` probes one key past the
//! hint and walks forward when the hint is stale, falling back to a full
//! paginated listing when no hint exists at all.
//!
//! Error classification is part of the contract: access denial, missing
//! bucket, and transient network failures surface with distinct
//! discriminators because they demand different operator responses;
//! precondition failures surface as retryable conflicts.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use agent_ledger_core::BackendError;
use agent_ledger_core::EventDraft;
use agent_ledger_core::EventStore;
use agent_ledger_core::LogRecord;
use agent_ledger_core::StoreError;
use agent_ledger_core::Tail;
use agent_ledger_core::seal_record;
use agent_ledger_core::verify_chain;
use aws_config::BehaviorVersion;
use aws_config::Region;
use aws_sdk_s3::Client;
use aws_sdk_s3::error::ProvideErrorMetadata;
use aws_sdk_s3::primitives::ByteStream;
use serde::Deserialize;
use serde::Serialize;
use tokio::runtime::Runtime;

use crate::keys::event_key;
use crate::keys::head_key;
use crate::keys::normalize_prefix;
use crate::keys::seq_from_key;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Page size for full listings; continuation tokens drive later pages.
const LIST_PAGE_SIZE: i32 = 1000;

// ============================================================================
// SECTION: Config
// ============================================================================

/// Object store locator.
///
/// # Invariants
/// - `bucket` must be non-empty.
/// - `credentials_ref` is an opaque reference resolved by the deployment
///   environment; the store itself never reads secrets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectStoreConfig {
    /// Bucket name.
    pub bucket: String,
    /// AWS region (optional; falls back to environment configuration).
    #[serde(default)]
    pub region: Option<String>,
    /// Optional key prefix inside the bucket.
    #[serde(default)]
    pub prefix: Option<String>,
    /// Custom endpoint URL (for S3-compatible stores).
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Force path-style addressing (for S3-compatible stores).
    #[serde(default)]
    pub force_path_style: bool,
    /// Opaque reference to the credential source for this locator.
    #[serde(default)]
    pub credentials_ref: Option<String>,
}

// ============================================================================
// SECTION: Object Store
// ============================================================================

/// Event store over one-object-per-event S3-compatible storage.
pub struct ObjectEventStore {
    /// S3 client handle.
    client: Client,
    /// Bucket name for event storage.
    bucket: String,
    /// Normalized key prefix.
    prefix: String,
    /// Tokio runtime for blocking store calls.
    runtime: Option<Arc<Runtime>>,
}

impl Drop for ObjectEventStore {
    fn drop(&mut self) {
        if let Some(runtime) = self.runtime.take() {
            let _ = std::thread::spawn(move || drop(runtime));
        }
    }
}

impl ObjectEventStore {
    /// Creates a new object event store from a locator.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Backend`] when the locator is invalid or the
    /// runtime cannot be initialized.
    pub fn new(config: &ObjectStoreConfig) -> Result<Self, StoreError> {
        if config.bucket.trim().is_empty() {
            return Err(StoreError::Backend(BackendError::Io(
                "bucket must be set".to_string(),
            )));
        }
        let prefix = normalize_prefix(config.prefix.as_deref());
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .map_err(|err| StoreError::Backend(BackendError::Io(err.to_string())))?;
        let shared_config = runtime.block_on(async {
            let mut loader = aws_config::defaults(BehaviorVersion::latest());
            if let Some(region) = &config.region {
                loader = loader.region(Region::new(region.clone()));
            }
            if let Some(endpoint) = &config.endpoint {
                loader = loader.endpoint_url(endpoint);
            }
            loader.load().await
        });
        let mut builder = aws_sdk_s3::config::Builder::from(&shared_config);
        if config.force_path_style {
            builder = builder.force_path_style(true);
        }
        let client = Client::from_conf(builder.build());
        Ok(Self {
            client,
            bucket: config.bucket.clone(),
            prefix,
            runtime: Some(Arc::new(runtime)),
        })
    }

    /// Runs a future to completion on the owned runtime.
    fn block_on<F: Future>(&self, future: F) -> Result<F::Output, StoreError> {
        let runtime = self.runtime.as_ref().ok_or_else(|| {
            StoreError::Backend(BackendError::Io("runtime already shut down".to_string()))
        })?;
        Ok(runtime.block_on(future))
    }

    /// Fetches one record by sequence number, `None` when the key is absent.
    fn get_record(&self, seq: u64) -> Result<Option<LogRecord>, StoreError> {
        let key = event_key(&self.prefix, seq);
        let outcome = self.block_on(async {
            self.client.get_object().bucket(&self.bucket).key(&key).send().await
        })?;
        let response = match outcome {
            Ok(response) => response,
            Err(err) => {
                if err.as_service_error().is_some_and(|service| service.is_no_such_key()) {
                    return Ok(None);
                }
                return Err(classify_error("get", &err));
            }
        };
        let bytes = self
            .block_on(async { response.body.collect().await })?
            .map_err(|err| StoreError::Backend(BackendError::Network(err.to_string())))?
            .into_bytes();
        let record: LogRecord = serde_json::from_slice(&bytes).map_err(|err| {
            StoreError::Integrity { seq, detail: format!("malformed record object: {err}") }
        })?;
        Ok(Some(record))
    }

    /// Reads the cached head hint, `None` when absent.
    fn get_head_hint(&self) -> Result<Option<Tail>, StoreError> {
        let key = head_key(&self.prefix);
        let outcome = self.block_on(async {
            self.client.get_object().bucket(&self.bucket).key(&key).send().await
        })?;
        let response = match outcome {
            Ok(response) => response,
            Err(err) => {
                if err.as_service_error().is_some_and(|service| service.is_no_such_key()) {
                    return Ok(None);
                }
                return Err(classify_error("get", &err));
            }
        };
        let bytes = self
            .block_on(async { response.body.collect().await })?
            .map_err(|err| StoreError::Backend(BackendError::Network(err.to_string())))?
            .into_bytes();
        // A corrupt hint is not an integrity failure; it is rebuilt below.
        Ok(serde_json::from_slice(&bytes).ok())
    }

    /// Writes the cached head hint; failures are swallowed by the caller.
    fn put_head_hint(&self, tail: &Tail) -> Result<(), StoreError> {
        let key = head_key(&self.prefix);
        let body = serde_json::to_vec(tail)
            .map_err(|err| StoreError::Backend(BackendError::Io(err.to_string())))?;
        self.block_on(async {
            self.client
                .put_object()
                .bucket(&self.bucket)
                .key(&key)
                .body(ByteStream::from(body))
                .send()
                .await
        })?
        .map_err(|err| classify_error("put", &err))?;
        Ok(())
    }

    /// Finds the highest event sequence via a full paginated listing.
    fn list_last_seq(&self) -> Result<Option<u64>, StoreError> {
        let mut last = None;
        let mut token: Option<String> = None;
        loop {
            let request = self
                .client
                .list_objects_v2()
                .bucket(&self.bucket)
                .prefix(&self.prefix)
                .max_keys(LIST_PAGE_SIZE)
                .set_continuation_token(token.clone());
            let response = self
                .block_on(async { request.send().await })?
                .map_err(|err| classify_error("list", &err))?;
            for object in response.contents() {
                if let Some(key) = object.key()
                    && let Some(seq) = seq_from_key(&self.prefix, key)
                {
                    last = Some(last.map_or(seq, |current: u64| current.max(seq)));
                }
            }
            match response.next_continuation_token() {
                Some(next) => token = Some(next.to_string()),
                None => break,
            }
        }
        Ok(last)
    }

    /// Resolves the authoritative tail, starting from the head hint.
    ///
    /// The hint is cross-checked by probing the key one past it; when stale,
    /// the store walks forward record by record until the next key is
    /// absent.
    fn resolve_tail(&self) -> Result<Tail, StoreError> {
        let hint = self.get_head_hint()?;
        let mut tail = match hint {
            Some(tail) => tail,
            None => match self.list_last_seq()? {
                None => return Ok(Tail::empty()),
                Some(last_seq) => {
                    let record = self.get_record(last_seq)?.ok_or_else(|| {
                        StoreError::Integrity {
                            seq: last_seq,
                            detail: "listed object vanished".to_string(),
                        }
                    })?;
                    Tail { last_seq: Some(last_seq), last_event_hash: record.event_hash }
                }
            },
        };
        loop {
            match self.get_record(tail.next_seq())? {
                None => return Ok(tail),
                Some(record) => {
                    tail = Tail {
                        last_seq: Some(record.event.seq),
                        last_event_hash: record.event_hash,
                    };
                }
            }
        }
    }
}

impl EventStore for ObjectEventStore {
    fn append(
        &self,
        draft: EventDraft,
        expected_prev_hash: &str,
    ) -> Result<LogRecord, StoreError> {
        let tail = self.resolve_tail()?;
        if tail.last_event_hash != expected_prev_hash {
            return Err(StoreError::Conflict { expected: expected_prev_hash.to_string() });
        }
        let seq = tail.next_seq();
        let event = draft.into_event(seq);
        let record = seal_record(expected_prev_hash, event)
            .map_err(|err| StoreError::from_chain(&err))?;
        let body = serde_json::to_vec(&record)
            .map_err(|err| StoreError::Backend(BackendError::Io(err.to_string())))?;
        let key = event_key(&self.prefix, seq);

        let outcome = self.block_on(async {
            self.client
                .put_object()
                .bucket(&self.bucket)
                .key(&key)
                .if_none_match("*")
                .body(ByteStream::from(body))
                .send()
                .await
        })?;
        if let Err(err) = outcome {
            return Err(classify_error("put", &err));
        }

        // The head hint is best-effort; the next reader rebuilds it anyway.
        let new_tail =
            Tail { last_seq: Some(seq), last_event_hash: record.event_hash.clone() };
        let _ = self.put_head_hint(&new_tail);
        Ok(record)
    }

    fn read(&self, from_seq: u64, to_seq: Option<u64>) -> Result<Vec<LogRecord>, StoreError> {
        let mut records = Vec::new();
        let mut seq = from_seq;
        loop {
            if to_seq.is_some_and(|end| seq > end) {
                break;
            }
            match self.get_record(seq)? {
                Some(record) => {
                    records.push(record);
                    seq += 1;
                }
                None => {
                    // A missing key below a higher listed key is a gap, not
                    // the tail.
                    if let Some(last) = self.list_last_seq()?
                        && last >= seq
                    {
                        return Err(StoreError::Integrity {
                            seq,
                            detail: format!("gap: object missing below last seq {last}"),
                        });
                    }
                    break;
                }
            }
        }
        verify_chain(&records).map_err(|err| StoreError::from_chain(&err))?;
        Ok(records)
    }

    fn tail(&self) -> Result<Tail, StoreError> {
        self.resolve_tail()
    }
}

// ============================================================================
// SECTION: Error Classification
// ============================================================================

/// Maps an SDK error into the store taxonomy.
///
/// Precondition failures become retryable conflicts; everything else keeps a
/// discriminator that names the operator response it demands.
fn classify_error<E, R>(operation: &str, err: &aws_sdk_s3::error::SdkError<E, R>) -> StoreError
where
    E: ProvideErrorMetadata + std::fmt::Debug,
    R: std::fmt::Debug,
{
    let code = err.code().unwrap_or_default();
    match code {
        "PreconditionFailed" | "ConditionalRequestConflict" => StoreError::Conflict {
            expected: "store-side conditional create failed".to_string(),
        },
        "AccessDenied" | "InvalidAccessKeyId" | "SignatureDoesNotMatch" => {
            StoreError::Backend(BackendError::AccessDenied(format!(
                "{operation}: {}",
                err.message().unwrap_or(code)
            )))
        }
        "NoSuchBucket" => StoreError::Backend(BackendError::NoSuchBucket(format!(
            "{operation}: {}",
            err.message().unwrap_or(code)
        ))),
        _ => StoreError::Backend(BackendError::Network(format!("{operation}: {err:?}"))),
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
