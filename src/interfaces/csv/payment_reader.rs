use crate::domain::student::{Amount, PaymentRecord, StudentId};
use crate::error::{Result, ScanPassError};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::io::Read;

/// One intake row: `id, first_name, last_name, amount[, created_at]`.
#[derive(Debug, Deserialize)]
struct PaymentRow {
    id: String,
    first_name: String,
    last_name: String,
    amount: u64,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
}

impl PaymentRow {
    fn into_record(self, received_at: DateTime<Utc>) -> Result<PaymentRecord> {
        Ok(PaymentRecord::new(
            StudentId::new(&self.id)?,
            self.first_name,
            self.last_name,
            Amount::new(self.amount),
            self.created_at.unwrap_or(received_at),
        ))
    }
}

/// Reads payment records from a CSV source.
///
/// This reader wraps `csv::Reader` and provides an iterator over `Result<PaymentRecord>`.
/// It handles whitespace trimming and a missing trailing `created_at` column.
/// Rows without a creation time are stamped with the time the reader was built.
pub struct PaymentReader<R: Read> {
    reader: csv::Reader<R>,
    received_at: DateTime<Utc>,
}

impl<R: Read> PaymentReader<R> {
    /// Creates a new `PaymentReader` from any `Read` source (e.g., File, Stdin).
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self {
            reader,
            received_at: Utc::now(),
        }
    }

    /// Returns an iterator that lazily reads and converts payment rows.
    pub fn payments(self) -> impl Iterator<Item = Result<PaymentRecord>> {
        let received_at = self.received_at;
        self.reader.into_deserialize().map(move |row| {
            row.map_err(ScanPassError::from)
                .and_then(|row: PaymentRow| row.into_record(received_at))
        })
    }
}
