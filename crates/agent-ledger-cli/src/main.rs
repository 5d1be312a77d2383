// crates/agent-ledger-cli/src/main.rs
// ============================================================================
// Module: Agent Ledger CLI Entry Point
// Description: Command dispatcher for inspection, audit, and checkpoints.
// Purpose: Expose the verification surface with stable exit codes.
// Dependencies: agent-ledger-cli, agent-ledger-config, agent-ledger-core, agent-ledger-store-file, clap, rand, serde_json, thiserror
// ============================================================================

//! ## Overview
//! The binary parses arguments, runs the selected command from the library,
//! and maps outcomes to exit codes: `0` success, `2` any verification
//! failure (chain, pointer, proof, or checkpoint signature; the diagnostic
//! names the offending seq), any other non-zero a runtime error.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use agent_ledger_cli::ReportError;
use agent_ledger_cli::ReportFormat;
use agent_ledger_cli::build_audit_report;
use agent_ledger_cli::keyfiles::KeyfileError;
use agent_ledger_cli::load_signing_key;
use agent_ledger_cli::load_verifying_key;
use agent_ledger_cli::render_markdown;
use agent_ledger_cli::verify_pointers;
use agent_ledger_cli::write_keypair;
use agent_ledger_config::ConfigError;
use agent_ledger_config::LedgerConfig;
use agent_ledger_core::AggregateId;
use agent_ledger_core::Checkpoint;
use agent_ledger_core::CheckpointBundle;
use agent_ledger_core::CheckpointError;
use agent_ledger_core::EventStore;
use agent_ledger_core::LogRecord;
use agent_ledger_core::Reducer;
use agent_ledger_core::ReplayError;
use agent_ledger_core::StoreError;
use agent_ledger_core::replay_events;
use agent_ledger_store_file::FileEventStore;
use agent_ledger_store_file::FileStoreConfig;
use clap::Args;
use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;
use rand::RngCore;
use thiserror::Error;

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "agent-ledger", version, about = "Inspect and audit agent ledgers")]
struct Cli {
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Commands,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Dump replayed state (or one aggregate) at a sequence.
    Inspect(InspectCommand),
    /// Produce the audit bundle: chain, pointers, optional decision proof.
    AuditReport(AuditReportCommand),
    /// Verify every decision's trigger pointer.
    VerifyPointers(VerifyPointersCommand),
    /// Checkpoint creation and verification.
    Checkpoint {
        /// Selected checkpoint subcommand.
        #[command(subcommand)]
        command: CheckpointCommand,
    },
    /// Generate an Ed25519 checkpoint keypair.
    Keygen(KeygenCommand),
    /// Configuration utilities.
    Config {
        /// Selected config subcommand.
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

/// Arguments for `inspect`.
#[derive(Args, Debug)]
struct InspectCommand {
    /// Ledger directory to read.
    #[arg(long)]
    log: PathBuf,
    /// Restrict output to one aggregate id.
    #[arg(long)]
    aggregate: Option<String>,
    /// Replay only up to this sequence (inclusive).
    #[arg(long)]
    at_seq: Option<u64>,
}

/// Output formats accepted by `audit-report`.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum FormatArg {
    /// Machine-readable JSON.
    Json,
    /// Human-readable Markdown.
    Md,
}

/// Arguments for `audit-report`.
#[derive(Args, Debug)]
struct AuditReportCommand {
    /// Ledger directory to read.
    #[arg(long)]
    log: PathBuf,
    /// Output format.
    #[arg(long, value_enum, default_value = "json")]
    format: FormatArg,
    /// Emit only the summary counters.
    #[arg(long)]
    summary: bool,
    /// Recompute every decision and compare committed hashes.
    #[arg(long)]
    proof: bool,
    /// Cover only records up to this sequence (inclusive).
    #[arg(long)]
    at_seq: Option<u64>,
}

/// Arguments for `verify-pointers`.
#[derive(Args, Debug)]
struct VerifyPointersCommand {
    /// Ledger directory to read.
    #[arg(long)]
    log: PathBuf,
}

/// Checkpoint subcommands.
#[derive(Subcommand, Debug)]
enum CheckpointCommand {
    /// Create and sign a checkpoint bundle at a sequence.
    Create(CheckpointCreateCommand),
    /// Verify a checkpoint bundle against the log and a public key.
    Verify(CheckpointVerifyCommand),
}

/// Arguments for `checkpoint create`.
#[derive(Args, Debug)]
struct CheckpointCreateCommand {
    /// Ledger directory to read.
    #[arg(long)]
    log: PathBuf,
    /// Sequence to checkpoint at (inclusive).
    #[arg(long)]
    at_seq: u64,
    /// Base64 Ed25519 signing key file.
    #[arg(long)]
    signing_key: PathBuf,
    /// Output path for the checkpoint bundle.
    #[arg(long)]
    out: PathBuf,
    /// Creator identity recorded in the checkpoint.
    #[arg(long)]
    created_by: String,
    /// Creation timestamp in unix milliseconds; defaults to now.
    #[arg(long)]
    timestamp: Option<u64>,
}

/// Arguments for `checkpoint verify`.
#[derive(Args, Debug)]
struct CheckpointVerifyCommand {
    /// Ledger directory to read.
    #[arg(long)]
    log: PathBuf,
    /// Checkpoint bundle file.
    #[arg(long)]
    bundle: PathBuf,
    /// Base64 Ed25519 verifying key file.
    #[arg(long)]
    public_key: PathBuf,
}

/// Arguments for `keygen`.
#[derive(Args, Debug)]
struct KeygenCommand {
    /// Output path for the signing key; the public key gains `.pub`.
    #[arg(long)]
    out: PathBuf,
}

/// Config subcommands.
#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Load and validate a configuration file.
    Validate {
        /// Path to the TOML configuration.
        #[arg(long)]
        path: PathBuf,
    },
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error taxonomy mapped onto exit codes.
#[derive(Debug, Error)]
enum CliError {
    /// A verification failed; exits with code 2.
    #[error("verification failed: {0}")]
    Verification(String),
    /// Any other runtime failure; exits with a generic non-zero code.
    #[error("{0}")]
    Runtime(String),
}

impl From<StoreError> for CliError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Integrity { .. } => Self::Verification(err.to_string()),
            other => Self::Runtime(other.to_string()),
        }
    }
}

impl From<ReportError> for CliError {
    fn from(err: ReportError) -> Self {
        match err {
            ReportError::Verification { .. } => Self::Verification(err.to_string()),
            ReportError::Store(store) => store.into(),
            ReportError::Replay(replay) => replay_error(replay),
        }
    }
}

impl From<ReplayError> for CliError {
    fn from(err: ReplayError) -> Self {
        replay_error(err)
    }
}

impl From<CheckpointError> for CliError {
    fn from(err: CheckpointError) -> Self {
        Self::Verification(err.to_string())
    }
}

impl From<KeyfileError> for CliError {
    fn from(err: KeyfileError) -> Self {
        Self::Runtime(err.to_string())
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        Self::Runtime(err.to_string())
    }
}

/// Maps replay failures: integrity problems are verification failures.
fn replay_error(err: ReplayError) -> CliError {
    match err {
        ReplayError::Store(StoreError::Integrity { .. }) | ReplayError::Checkpoint(_) => {
            CliError::Verification(err.to_string())
        }
        other => CliError::Runtime(other.to_string()),
    }
}

// ============================================================================
// SECTION: Entry Point
// ============================================================================

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(CliError::Verification(message)) => {
            let _ = writeln!(std::io::stderr(), "agent-ledger: {message}");
            ExitCode::from(2)
        }
        Err(CliError::Runtime(message)) => {
            let _ = writeln!(std::io::stderr(), "agent-ledger: {message}");
            ExitCode::FAILURE
        }
    }
}

/// Dispatches the parsed command.
fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Commands::Inspect(command) => run_inspect(&command),
        Commands::AuditReport(command) => run_audit_report(&command),
        Commands::VerifyPointers(command) => run_verify_pointers(&command),
        Commands::Checkpoint { command } => match command {
            CheckpointCommand::Create(create) => run_checkpoint_create(&create),
            CheckpointCommand::Verify(verify) => run_checkpoint_verify(&verify),
        },
        Commands::Keygen(command) => run_keygen(&command),
        Commands::Config { command } => match command {
            ConfigCommand::Validate { path } => {
                LedgerConfig::load(&path)?;
                emit("configuration valid")
            }
        },
    }
}

// ============================================================================
// SECTION: Command Implementations
// ============================================================================

/// Reads and chain-validates the covered record range.
fn read_records(log: &std::path::Path, at_seq: Option<u64>) -> Result<Vec<LogRecord>, CliError> {
    let store = FileEventStore::open_read_only(FileStoreConfig::new(log))?;
    Ok(store.read(0, at_seq)?)
}

/// Writes one line to stdout.
fn emit(message: &str) -> Result<(), CliError> {
    writeln!(std::io::stdout(), "{message}")
        .map_err(|err| CliError::Runtime(err.to_string()))
}

fn run_inspect(command: &InspectCommand) -> Result<(), CliError> {
    let records = read_records(&command.log, command.at_seq)?;
    let state = replay_events(&records, &Reducer::engine())?;
    let output = match &command.aggregate {
        None => serde_json::to_value(&state)
            .map_err(|err| CliError::Runtime(err.to_string()))?,
        Some(aggregate) => {
            let id = AggregateId::new(aggregate.clone());
            let mut found = serde_json::Map::new();
            for namespace in state.aggregates().keys() {
                if let Some(value) = state.get_aggregate(namespace, &id) {
                    found.insert(namespace.clone(), value.clone());
                }
            }
            if found.is_empty() {
                return Err(CliError::Runtime(format!("aggregate {aggregate} not found")));
            }
            serde_json::Value::Object(found)
        }
    };
    let rendered = serde_json::to_string_pretty(&output)
        .map_err(|err| CliError::Runtime(err.to_string()))?;
    emit(&rendered)
}

fn run_audit_report(command: &AuditReportCommand) -> Result<(), CliError> {
    let records = read_records(&command.log, command.at_seq)?;
    let mut report = build_audit_report(&records, &Reducer::engine(), command.proof)?;
    if command.summary {
        report.pointers.clear();
        report.proofs.clear();
    }
    let format = match command.format {
        FormatArg::Json => ReportFormat::Json,
        FormatArg::Md => ReportFormat::Markdown,
    };
    let rendered = match format {
        ReportFormat::Json => serde_json::to_string_pretty(&report)
            .map_err(|err| CliError::Runtime(err.to_string()))?,
        ReportFormat::Markdown => render_markdown(&report),
    };
    emit(&rendered)
}

fn run_verify_pointers(command: &VerifyPointersCommand) -> Result<(), CliError> {
    let records = read_records(&command.log, None)?;
    let checks = verify_pointers(&records)?;
    emit(&format!("verified {} trigger pointer(s)", checks.len()))
}

fn run_checkpoint_create(command: &CheckpointCreateCommand) -> Result<(), CliError> {
    let records = read_records(&command.log, Some(command.at_seq))?;
    let last = records.last().ok_or_else(|| {
        CliError::Runtime(format!("log has no record at seq {}", command.at_seq))
    })?;
    if last.event.seq != command.at_seq {
        return Err(CliError::Runtime(format!(
            "log ends at seq {} before requested seq {}",
            last.event.seq, command.at_seq
        )));
    }
    let state = replay_events(&records, &Reducer::engine())?;
    let signing_key = load_signing_key(&command.signing_key)?;
    let timestamp = match command.timestamp {
        Some(explicit) => explicit,
        None => unix_millis_now()?,
    };
    let checkpoint = Checkpoint::create(
        &state,
        command.at_seq,
        last.event_hash.clone(),
        &signing_key,
        timestamp,
        command.created_by.clone(),
    )?;
    let bundle = CheckpointBundle { checkpoint, state };
    let rendered = serde_json::to_string_pretty(&bundle)
        .map_err(|err| CliError::Runtime(err.to_string()))?;
    std::fs::write(&command.out, rendered)
        .map_err(|err| CliError::Runtime(err.to_string()))?;
    emit(&format!(
        "checkpoint {} written to {}",
        bundle.checkpoint.checkpoint_id,
        command.out.display()
    ))
}

fn run_checkpoint_verify(command: &CheckpointVerifyCommand) -> Result<(), CliError> {
    let raw = std::fs::read_to_string(&command.bundle)
        .map_err(|err| CliError::Runtime(err.to_string()))?;
    let bundle: CheckpointBundle =
        serde_json::from_str(&raw).map_err(|err| CliError::Runtime(err.to_string()))?;
    let verifying_key = load_verifying_key(&command.public_key)?;
    bundle.verify(&verifying_key)?;

    // Independent confirmation: re-replay the log to the checkpoint seq.
    let at_seq = bundle.checkpoint.at_seq;
    let records = read_records(&command.log, Some(at_seq))?;
    let last = records.last().ok_or_else(|| {
        CliError::Verification(format!("log has no record at seq {at_seq}"))
    })?;
    if last.event.seq != at_seq || last.event_hash != bundle.checkpoint.log_hash {
        return Err(CliError::Verification(format!(
            "log hash mismatch at seq {at_seq}"
        )));
    }
    let state = replay_events(&records, &Reducer::engine())?;
    let state_hash =
        state.state_hash().map_err(|err| CliError::Runtime(err.to_string()))?;
    if state_hash != bundle.checkpoint.state_hash {
        return Err(CliError::Verification(format!(
            "state hash mismatch at seq {at_seq}"
        )));
    }
    emit(&format!("checkpoint {} verified", bundle.checkpoint.checkpoint_id))
}

fn run_keygen(command: &KeygenCommand) -> Result<(), CliError> {
    let mut seed = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut seed);
    let public_path = write_keypair(&command.out, &seed)?;
    emit(&format!(
        "signing key written to {}; public key at {}",
        command.out.display(),
        public_path.display()
    ))
}

/// Returns the current unix time in milliseconds.
fn unix_millis_now() -> Result<u64, CliError> {
    let elapsed = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|err| CliError::Runtime(err.to_string()))?;
    u64::try_from(elapsed.as_millis())
        .map_err(|err| CliError::Runtime(err.to_string()))
}
