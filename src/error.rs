use thiserror::Error;

use crate::schema::PeriodKey;

/// Errors surfaced by the pool and its collaborators.
#[derive(Error, Debug)]
pub enum PoolError {
    /// No filing exists for the requested company and period. Range fetches
    /// tolerate this: the period is skipped and the range continues.
    #[error("No filing for company {company} in period {period}")]
    MissingFiling { company: String, period: PeriodKey },

    /// Two statements of the same filing disclose one code under different
    /// label pairs. Fatal for that filing's merge only.
    #[error("Conflicting labels for item {code}: '{existing}' vs '{incoming}'")]
    ConflictingCode {
        code: String,
        existing: String,
        incoming: String,
    },

    /// `extend` was asked to combine value sequences that do not line up
    /// cell-for-cell across (company, period).
    #[error("Misaligned series for item {code}: {details}")]
    MisalignedSeries { code: String, details: String },

    /// `extend` referenced an item with no rows in the flat series.
    #[error("No flat-series rows for item '{0}'")]
    UnknownItem(String),

    #[error("Invalid season {0}: must be between 1 and 4")]
    InvalidSeason(u8),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, PoolError>;
