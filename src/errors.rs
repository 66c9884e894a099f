// Error taxonomy for the reconciliation engine.
//
// Per-record failures (an unresolved candidate) are NOT errors - they are
// ordinary outcomes accumulated in MatchStats. Errors here are era-scoped
// or structural.

use chrono::NaiveDate;
use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReconcileError {
    /// An election date falls outside every known representation order.
    /// Always reported, never silently defaulted.
    #[error("no era contains election date {0}")]
    NoEraFound(NaiveDate),

    /// Province code outside the 0..=12 table.
    #[error("unknown province code {0}")]
    UnknownProvince(u8),

    /// Boundary dataset has no usable coordinate reference system.
    /// Fatal for that era's export only.
    #[error("era {era}: unsupported source CRS: {detail}")]
    UnsupportedCrs { era: u16, detail: String },

    /// A malformed substitution-cache line. Skipped with a warning.
    #[error("cache line {line_no}: {reason}")]
    CacheParse { line_no: usize, reason: String },

    /// Dataset file name does not carry an era year at the expected offset.
    #[error("cannot read era year from dataset name '{0}'")]
    BadDatasetName(String),

    /// Election date string in none of the accepted formats.
    #[error("unparseable election date '{0}'")]
    BadDate(String),

    #[error(transparent)]
    Io(#[from] io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ReconcileError>;
