use clap::{Parser, Subcommand, ValueEnum};
use miette::{IntoDiagnostic, Result};
use scanpass::application::engine::RedemptionEngine;
use scanpass::application::intake;
use scanpass::application::status::RecordStatus;
use scanpass::config::{DEFAULT_THRESHOLD, ServiceConfig};
use scanpass::domain::ports::{Page, PaymentStoreBox};
use scanpass::domain::rejection::{Decision, Rejection};
use scanpass::domain::student::{Amount, StudentId};
use scanpass::infrastructure::in_memory::InMemoryPaymentStore;
use scanpass::infrastructure::sqlite::SqlitePaymentStore;
use scanpass::interfaces::csv::payment_reader::PaymentReader;
use scanpass::interfaces::response::Envelope;
use scanpass::observability::{LogFormat, init_logging};
use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

/// Exit code for a request the engine turned down (not found, underpaid,
/// already validated, malformed identifier).
const EXIT_REJECTED: u8 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Backend {
    Sqlite,
    Rocksdb,
}

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to persistent database (optional). Without it, records only live for this run.
    #[arg(long, env = "SCANPASS_DB_PATH", global = true)]
    db_path: Option<PathBuf>,

    /// Storage engine used for --db-path.
    #[arg(long, value_enum, env = "SCANPASS_BACKEND", default_value_t = Backend::Sqlite, global = true)]
    backend: Backend,

    /// Payments CSV loaded into the store before the command runs.
    #[arg(long, global = true)]
    seed: Option<PathBuf>,

    /// Minimum paid amount required for validation.
    #[arg(long, env = "SCANPASS_THRESHOLD", default_value_t = DEFAULT_THRESHOLD.value(), global = true)]
    threshold: u64,

    #[arg(long, value_enum, env = "SCANPASS_LOG_FORMAT", default_value_t = LogFormat::Pretty, global = true)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Check whether a scanned student may be validated, without validating
    Check { id: String },
    /// Validate a scanned student; succeeds at most once per student
    Redeem { id: String },
    /// Show a student's payment and validation state
    Status { id: String },
    /// List validated students, most recently registered first
    List {
        #[arg(long, allow_negative_numbers = true)]
        limit: Option<i64>,
        #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
        offset: i64,
    },
    /// Import payment records (id, first_name, last_name, amount[, created_at])
    Import { input: PathBuf },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_logging(cli.log_format);

    let config = ServiceConfig::new(Amount::new(cli.threshold));
    let store = open_store(cli.db_path.as_deref(), cli.backend)?;
    let engine = RedemptionEngine::new(store, config);

    if let Some(seed) = &cli.seed {
        import_file(&engine, seed).await?;
    }

    let envelope = run(&engine, cli.command).await?;

    let mut stdout = io::stdout().lock();
    writeln!(
        stdout,
        "{}",
        serde_json::to_string_pretty(&envelope).into_diagnostic()?
    )
    .into_diagnostic()?;

    Ok(match envelope.status {
        200 => ExitCode::SUCCESS,
        500 => ExitCode::FAILURE,
        _ => ExitCode::from(EXIT_REJECTED),
    })
}

async fn run(engine: &RedemptionEngine, command: Command) -> Result<Envelope> {
    let threshold = engine.threshold();
    let envelope = match command {
        Command::Check { id } => {
            let decision = match StudentId::new(id) {
                Ok(id) => engine
                    .evaluate(&id)
                    .await
                    .map(|record| RecordStatus::project(&record, threshold)),
                Err(e) => Err(Rejection::from(e)),
            };
            Envelope::from_decision(&decision, "Student eligible for validation", threshold)
        }
        Command::Redeem { id } => {
            let decision = match StudentId::new(id) {
                Ok(id) => engine
                    .redeem(&id)
                    .await
                    .map(|record| RecordStatus::project(&record, threshold)),
                Err(e) => Err(Rejection::from(e)),
            };
            Envelope::from_decision(&decision, "Student validated successfully", threshold)
        }
        Command::Status { id } => {
            let decision: Decision<RecordStatus> = match StudentId::new(id) {
                Ok(id) => engine.status(&id).await,
                Err(e) => Err(Rejection::from(e)),
            };
            Envelope::from_decision(&decision, "Status retrieved", threshold)
        }
        Command::List { limit, offset } => {
            let limit = limit.unwrap_or_else(|| {
                i64::try_from(engine.config().default_limit).unwrap_or(i64::MAX)
            });
            let decision = engine.list_redeemed(Page::new(limit, offset)).await;
            Envelope::from_decision(&decision, "Validated students retrieved", threshold)
        }
        Command::Import { input } => {
            let summary = import_file(engine, &input).await?;
            Envelope::success("Payments imported", &summary)
        }
    };
    Ok(envelope)
}

async fn import_file(engine: &RedemptionEngine, path: &Path) -> Result<intake::ImportSummary> {
    let file = File::open(path).into_diagnostic()?;
    let reader = PaymentReader::new(file);
    intake::import(engine, reader.payments())
        .await
        .into_diagnostic()
}

fn open_store(db_path: Option<&Path>, backend: Backend) -> Result<PaymentStoreBox> {
    let Some(path) = db_path else {
        return Ok(Box::new(InMemoryPaymentStore::new()));
    };
    match backend {
        Backend::Sqlite => Ok(Box::new(SqlitePaymentStore::open(path).into_diagnostic()?)),
        Backend::Rocksdb => open_rocksdb(path),
    }
}

#[cfg(feature = "storage-rocksdb")]
fn open_rocksdb(path: &Path) -> Result<PaymentStoreBox> {
    use scanpass::infrastructure::rocksdb::RocksDBStore;
    Ok(Box::new(RocksDBStore::open(path).into_diagnostic()?))
}

#[cfg(not(feature = "storage-rocksdb"))]
fn open_rocksdb(_path: &Path) -> Result<PaymentStoreBox> {
    Err(miette::miette!(
        "RocksDB backend needs the 'storage-rocksdb' feature"
    ))
}
