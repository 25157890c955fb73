use crate::domain::ports::{Page, PaymentStore, RedeemedPage};
use crate::domain::student::{
    Amount, PaymentRecord, StudentId, StudentRecord, ValidationState,
};
use crate::error::{Result, ScanPassError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{Connection, Row, TransactionBehavior, params};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// How long a connection waits on a locked database before giving up.
const BUSY_TIMEOUT: Duration = Duration::from_millis(5_000);

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS students (
    id           TEXT PRIMARY KEY NOT NULL,
    first_name   TEXT NOT NULL,
    last_name    TEXT NOT NULL,
    created_at   INTEGER NOT NULL,
    validated    INTEGER NOT NULL DEFAULT 0 CHECK (validated IN (0, 1)),
    validated_at INTEGER
);
CREATE TABLE IF NOT EXISTS payments (
    student_id TEXT PRIMARY KEY NOT NULL REFERENCES students (id),
    amount     INTEGER NOT NULL CHECK (amount >= 0)
);
CREATE INDEX IF NOT EXISTS students_roster
    ON students (validated, created_at DESC, id DESC);
";

const SELECT_JOINED: &str = "
SELECT s.id, s.first_name, s.last_name, p.amount, s.created_at, s.validated, s.validated_at
FROM students s
JOIN payments p ON p.student_id = s.id";

/// A relational payment store backed by SQLite.
///
/// Students and payments live in separate tables joined on the identifier.
/// Each operation opens its own connection on a blocking thread, so several
/// processes (or tasks) can share one database file; the conditional redeem
/// is a single `UPDATE ... WHERE validated = 0` whose change count is the
/// result.
#[derive(Clone)]
pub struct SqlitePaymentStore {
    path: Arc<PathBuf>,
}

impl SqlitePaymentStore {
    /// Opens or creates the database at `path` and ensures the schema exists.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let conn = Self::connect(&path)?;
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| {
            row.get::<_, String>(0)
        })?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            path: Arc::new(path),
        })
    }

    fn connect(path: &Path) -> Result<Connection> {
        let conn = Connection::open(path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(conn)
    }

    async fn with_connection<T, F>(&self, work: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
    {
        let path = Arc::clone(&self.path);
        tokio::task::spawn_blocking(move || {
            let mut conn = Self::connect(&path)?;
            work(&mut conn)
        })
        .await
        .map_err(|e| ScanPassError::InternalError(Box::new(e)))?
    }
}

/// Raw column values of one joined row, converted outside the row closure so
/// domain validation errors are not squeezed into `rusqlite::Error`.
struct StudentRow {
    id: String,
    first_name: String,
    last_name: String,
    amount: i64,
    created_at: i64,
    validated: bool,
    validated_at: Option<i64>,
}

impl StudentRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            first_name: row.get(1)?,
            last_name: row.get(2)?,
            amount: row.get(3)?,
            created_at: row.get(4)?,
            validated: row.get(5)?,
            validated_at: row.get(6)?,
        })
    }

    fn into_record(self) -> Result<StudentRecord> {
        let state = match (self.validated, self.validated_at) {
            (false, _) => ValidationState::Unredeemed,
            (true, Some(micros)) => ValidationState::Redeemed {
                at: timestamp(micros)?,
            },
            (true, None) => {
                return Err(ScanPassError::internal(format!(
                    "Student {} is validated without a validation time",
                    self.id
                )));
            }
        };
        Ok(StudentRecord {
            payment: PaymentRecord {
                id: StudentId::new(&self.id)?,
                first_name: self.first_name,
                last_name: self.last_name,
                amount: Amount::try_from(self.amount)?,
                created_at: timestamp(self.created_at)?,
            },
            state,
        })
    }
}

fn timestamp(micros: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp_micros(micros)
        .ok_or_else(|| ScanPassError::internal(format!("Invalid stored timestamp: {micros}")))
}

fn to_sql_int(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

#[async_trait]
impl PaymentStore for SqlitePaymentStore {
    async fn insert(&self, record: PaymentRecord) -> Result<bool> {
        let amount = i64::try_from(record.amount.value()).map_err(|_| {
            ScanPassError::ValidationError(format!("Amount {} is too large", record.amount))
        })?;
        self.with_connection(move |conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let inserted = tx.execute(
                "INSERT OR IGNORE INTO students (id, first_name, last_name, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    record.id.as_str(),
                    record.first_name,
                    record.last_name,
                    record.created_at.timestamp_micros(),
                ],
            )?;
            if inserted == 0 {
                return Ok(false);
            }
            tx.execute(
                "INSERT INTO payments (student_id, amount) VALUES (?1, ?2)",
                params![record.id.as_str(), amount],
            )?;
            tx.commit()?;
            Ok(true)
        })
        .await
    }

    async fn fetch(&self, id: &StudentId) -> Result<Option<StudentRecord>> {
        let id = id.clone();
        self.with_connection(move |conn| {
            let mut stmt = conn.prepare_cached(&format!("{SELECT_JOINED} WHERE s.id = ?1"))?;
            let mut rows = stmt.query_map(params![id.as_str()], StudentRow::from_row)?;
            match rows.next() {
                Some(row) => Ok(Some(row?.into_record()?)),
                None => Ok(None),
            }
        })
        .await
    }

    async fn redeem_if_unredeemed(&self, id: &StudentId, at: DateTime<Utc>) -> Result<u64> {
        let id = id.clone();
        self.with_connection(move |conn| {
            let changed = conn.execute(
                "UPDATE students SET validated = 1, validated_at = ?2
                 WHERE id = ?1 AND validated = 0",
                params![id.as_str(), at.timestamp_micros()],
            )?;
            Ok(changed as u64)
        })
        .await
    }

    async fn list_redeemed(&self, page: Page) -> Result<RedeemedPage> {
        self.with_connection(move |conn| {
            // Count and window come from the same read snapshot
            let tx = conn.transaction()?;
            let total: i64 = tx.query_row(
                "SELECT COUNT(*) FROM students s
                 JOIN payments p ON p.student_id = s.id
                 WHERE s.validated = 1",
                [],
                |row| row.get(0),
            )?;
            let rows = {
                let mut stmt = tx.prepare(&format!(
                    "{SELECT_JOINED}
                     WHERE s.validated = 1
                     ORDER BY s.created_at DESC, s.id DESC
                     LIMIT ?1 OFFSET ?2"
                ))?;
                stmt.query_map(
                    params![to_sql_int(page.limit), to_sql_int(page.offset)],
                    StudentRow::from_row,
                )?
                .collect::<rusqlite::Result<Vec<_>>>()?
            };
            tx.commit()?;

            let records = rows
                .into_iter()
                .map(StudentRow::into_record)
                .collect::<Result<Vec<_>>>()?;
            Ok(RedeemedPage {
                records,
                total: u64::try_from(total).unwrap_or_default(),
            })
        })
        .await
    }
}
