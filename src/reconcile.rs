//! Reconciliation of cumulative flow disclosures into quarter-only figures.
//!
//! Flow statements report cumulatively from the fiscal-year start. Season 1
//! needs no work, seasons 2 and 3 subtract the prior season's cumulative,
//! and season 4 subtracts the through-season-3 comparative the annual
//! filing itself discloses. When no clean increment can be computed the
//! cumulative is emitted under a prefixed code instead of failing, so one
//! gappy series never aborts the rest.
//!
//! Reconciliation is a pure view over the disclosed values; filings keep
//! their raw cumulatives, which is what makes re-running it idempotent.

use log::debug;

use crate::schema::{codes, Filing, ItemClass, LineItem};

/// Prefix for a cumulative value emitted because no prior-season figure was
/// available to difference against.
pub const ACCUMULATED_PREFIX: &str = "acc_";

/// Prefix for a full-year total emitted because the annual filing carried
/// no through-season-3 comparative.
pub const FULL_YEAR_PREFIX: &str = "y_";

/// How a flow item's output figure was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// A clean quarter-only increment.
    Quarter,
    /// Still the year-to-date cumulative; code re-keyed `acc_<code>`.
    Accumulated,
    /// Still the full-year total; code re-keyed `y_<code>`.
    FullYear,
}

impl Resolution {
    fn rekey(self, code: &str) -> String {
        match self {
            Self::Quarter => code.to_string(),
            Self::Accumulated => format!("{}{}", ACCUMULATED_PREFIX, code),
            Self::FullYear => format!("{}{}", FULL_YEAR_PREFIX, code),
        }
    }
}

/// One reconciled output item.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconciledItem {
    /// The disclosed code, re-keyed with a fallback prefix when no clean
    /// increment existed.
    pub code: String,
    pub label_zh: String,
    pub label_en: String,
    pub value: f64,
    pub resolution: Resolution,
}

/// Reconciles every cumulative-flow item of a filing into the rows the flat
/// series will expose. Point-in-time and derived items are not touched
/// here.
///
/// `prev` is the same company's filing for `(year, season - 1)`, when the
/// pool holds one; only seasons 2 and 3 consult it.
pub fn reconcile_filing(filing: &Filing, prev: Option<&Filing>) -> Vec<ReconciledItem> {
    let season = filing.key.season();
    let mut out = Vec::new();

    for item in filing.items.values() {
        if item.class != ItemClass::CumulativeFlow {
            continue;
        }

        let (value, resolution) = if season == 4 && is_eps_code(&item.code) {
            reconcile_annual_eps(filing, item)
        } else {
            reconcile_flow_value(item, season, prev)
        };

        if resolution != Resolution::Quarter {
            debug!(
                "{} {}: no clean increment for {}, emitting {}",
                filing.company_code,
                filing.key,
                item.code,
                resolution.rekey(&item.code)
            );
        }

        out.push(ReconciledItem {
            code: resolution.rekey(&item.code),
            label_zh: item.label_zh.clone(),
            label_en: item.label_en.clone(),
            value,
            resolution,
        });
    }

    out
}

/// The clean quarter figure for a code, or `None` when only a tagged
/// fallback could be produced. Point-in-time and derived codes pass through
/// unchanged; this is what the metrics engine consumes.
pub fn quarter_value(filing: &Filing, prev: Option<&Filing>, code: &str) -> Option<f64> {
    let item = filing.items.get(code)?;
    match item.class {
        ItemClass::PointInTime | ItemClass::Derived => Some(item.current()),
        ItemClass::CumulativeFlow => {
            let (value, resolution) = reconcile_flow_value(item, filing.key.season(), prev);
            (resolution == Resolution::Quarter).then_some(value)
        }
    }
}

fn reconcile_flow_value(item: &LineItem, season: u8, prev: Option<&Filing>) -> (f64, Resolution) {
    match season {
        1 => (item.current(), Resolution::Quarter),
        2 | 3 => match prev.and_then(|filing| filing.items.get(&item.code)) {
            Some(prior) => (item.current() - prior.current(), Resolution::Quarter),
            None => (item.current(), Resolution::Accumulated),
        },
        _ => match item.through_season_3() {
            Some(through_q3) => (item.current() - through_q3, Resolution::Quarter),
            None => (item.current(), Resolution::FullYear),
        },
    }
}

fn is_eps_code(code: &str) -> bool {
    code == codes::BASIC_EPS || code == codes::DILUTED_EPS
}

/// Earnings per share are not additive across quarters, so the annual
/// figure cannot be differenced like the other flow items. Recompute it as
/// the reconciled quarter profit over the share base (`3100` for basic,
/// `3110` for diluted, both at par 10).
fn reconcile_annual_eps(filing: &Filing, item: &LineItem) -> (f64, Resolution) {
    let shares_code = if item.code == codes::BASIC_EPS {
        codes::CAPITAL_STOCK
    } else {
        codes::COMMON_STOCK
    };

    let quarter_profit = filing
        .items
        .get(codes::NET_INCOME)
        .and_then(|net| net.through_season_3().map(|through_q3| net.current() - through_q3));

    match (quarter_profit, filing.value(shares_code)) {
        (Some(profit), Some(shares)) if shares != 0.0 => {
            (profit / (shares / 10.0), Resolution::Quarter)
        }
        _ => (item.current(), Resolution::FullYear),
    }
}
