//! # Financial Report Pool
//!
//! A library for pooling quarterly financial filings (balance sheet,
//! comprehensive income statement, statement of cash flows), reconciling
//! cumulative disclosures into quarter-only figures, deriving the standard
//! ratio set, and flattening everything into a long-format
//! (company × period × item) series.
//!
//! ## Core concepts
//!
//! - **Point-in-time items**: balance-sheet figures valid as of the filing
//!   date. Emitted as disclosed.
//! - **Cumulative-flow items**: income-statement and cash-flow figures
//!   disclosed cumulatively from the fiscal-year start through the filing
//!   season. Reconciled into quarter-only increments before they reach the
//!   flat series.
//! - **Fallback tags**: when no clean increment can be computed, the
//!   cumulative value is emitted under `acc_<code>` (mid-year, prior season
//!   missing) or `y_<code>` (annual filing without a through-season-3
//!   comparative) instead of failing the series.
//! - **Derived metrics**: ROA, ROE, margins, debt burden ratio and
//!   inventory turnover, written back into each filing as synthetic items.
//! - **Flat series**: the de-duplicated long-format table downstream
//!   consumers query, export and chart.
//!
//! ## Example
//!
//! ```rust,ignore
//! use financial_report_pool::{collect_range, PeriodKey};
//!
//! let start = PeriodKey::new(2020, 1)?;
//! let end = PeriodKey::new(2021, 4)?;
//! let pool = collect_range(&source, &["2605", "2330"], start, end)?;
//!
//! for row in pool.flat_series() {
//!     println!("{} {} {} = {}", row.company_code, row.period, row.item_code, row.value);
//! }
//! ```

pub mod catalog;
pub mod error;
pub mod merge;
pub mod metrics;
pub mod pool;
pub mod reconcile;
pub mod schema;
pub mod source;
pub mod utils;

pub use catalog::{CatalogEntry, ItemCatalog};
pub use error::{PoolError, Result};
pub use merge::{audit_balance_sheet, merge_statements};
pub use metrics::{derive_metrics, derived};
pub use pool::{CompanySeries, ReportPool};
pub use reconcile::{
    quarter_value, reconcile_filing, ReconciledItem, Resolution, ACCUMULATED_PREFIX,
    FULL_YEAR_PREFIX,
};
pub use schema::*;
pub use source::{fetch_filing, MemorySource, StatementSource};
pub use utils::*;

use log::info;

/// Builds an assembled pool for several companies over one period range.
///
/// Missing filings and merge conflicts are tolerated per filing; see
/// [`ReportPool::fetch_range`].
pub fn collect_range<S>(
    source: &S,
    company_codes: &[&str],
    start: PeriodKey,
    end: PeriodKey,
) -> Result<ReportPool>
where
    S: StatementSource + ?Sized,
{
    info!(
        "collecting filings for {} companies, {} through {}",
        company_codes.len(),
        start,
        end
    );

    let mut pool = ReportPool::new();
    for company_code in company_codes {
        pool.fetch_range(source, company_code, start, end)?;
    }
    pool.assemble();
    Ok(pool)
}
