//! Ratio derivation over reconciled quarter figures.
//!
//! Every ratio is written back into the filing as a [`ItemClass::Derived`]
//! line item with a bilingual label pair, so the assembler emits it exactly
//! like a disclosed item. A ratio whose inputs are undisclosed, or whose
//! flow inputs could not be cleanly reconciled, is omitted for that period;
//! it never fails the record.

use crate::reconcile::quarter_value;
use crate::schema::{codes, Filing, ItemClass, LineItem};
use crate::utils::{pct, round2};

/// Codes of the derived metrics written back into each filing.
pub mod derived {
    /// Return on assets, per quarter.
    pub const ROA: &str = "s_roa";
    /// Return on equity, per quarter.
    pub const ROE: &str = "s_roe";
    /// Gross margin, per quarter.
    pub const GROSS_MARGIN: &str = "s_gross_margin";
    /// Operating margin, per quarter.
    pub const OPERATING_MARGIN: &str = "s_operating_margin";
    /// Net profit margin, per quarter.
    pub const NET_PROFIT_MARGIN: &str = "s_net_profit_margin";
    /// Debt burden ratio; point-in-time, available every season.
    pub const DEBT_BURDEN_RATIO: &str = "dbr";
    /// Inventory turnover, per quarter.
    pub const INVENTORY_TURNOVER: &str = "s_it";
    /// Days of inventory at the quarter's turnover rate.
    pub const INVENTORY_TURNOVER_DAYS: &str = "s_it_days";
}

/// Derives every computable ratio for `filing` and writes each one back as
/// a derived line item, overwriting earlier computations.
///
/// `prev_in_year` is the `(y, s-1)` filing used to reconcile flow inputs.
/// `prev_rolling` is the rolling prior quarter — `(y-1, 4)` at season 1 —
/// whose closing inventory the turnover average spans; without that filing
/// the turnover metrics are omitted.
pub fn derive_metrics(
    filing: &mut Filing,
    prev_in_year: Option<&Filing>,
    prev_rolling: Option<&Filing>,
) {
    let assets = filing.value(codes::TOTAL_ASSETS);
    let liabilities = filing.value(codes::TOTAL_LIABILITIES);
    let equity = filing.value(codes::TOTAL_EQUITY);

    let profit = quarter_value(filing, prev_in_year, codes::NET_INCOME);
    let revenue = quarter_value(filing, prev_in_year, codes::OPERATING_REVENUE);
    let gross_profit = quarter_value(filing, prev_in_year, codes::GROSS_PROFIT);
    let operating_income = quarter_value(filing, prev_in_year, codes::OPERATING_INCOME);

    let mut out: Vec<(&str, &str, &str, f64)> = Vec::new();

    if let (Some(profit), Some(assets)) = (profit, assets) {
        out.push((derived::ROA, "ROA(季)", "ROA(Season)", pct(profit, assets)));
    }
    if let (Some(profit), Some(equity)) = (profit, equity) {
        out.push((derived::ROE, "ROE(季)", "ROE(Season)", pct(profit, equity)));
    }
    if let (Some(gross_profit), Some(revenue)) = (gross_profit, revenue) {
        out.push((
            derived::GROSS_MARGIN,
            "毛利率(季)",
            "Gross Margin(Season)",
            pct(gross_profit, revenue),
        ));
    }
    if let (Some(operating_income), Some(revenue)) = (operating_income, revenue) {
        out.push((
            derived::OPERATING_MARGIN,
            "營業利益率(季)",
            "Operating Margin(Season)",
            pct(operating_income, revenue),
        ));
    }
    if let (Some(profit), Some(revenue)) = (profit, revenue) {
        out.push((
            derived::NET_PROFIT_MARGIN,
            "淨利率(季)",
            "Net Profit Margin(Season)",
            pct(profit, revenue),
        ));
    }
    if let (Some(liabilities), Some(assets)) = (liabilities, assets) {
        out.push((
            derived::DEBT_BURDEN_RATIO,
            "負債比率",
            "Debt Burden Ratio",
            pct(liabilities, assets),
        ));
    }
    if let Some((turnover, days)) = inventory_turnover(filing, prev_in_year, prev_rolling) {
        out.push((
            derived::INVENTORY_TURNOVER,
            "s_it",
            "s_inventory_turnover",
            turnover,
        ));
        out.push((
            derived::INVENTORY_TURNOVER_DAYS,
            "s_it_days",
            "s_inventory_turnover_days",
            days,
        ));
    }

    for (code, label_zh, label_en, value) in out {
        filing.items.insert(
            code.to_string(),
            LineItem {
                code: code.to_string(),
                label_zh: label_zh.to_string(),
                label_en: label_en.to_string(),
                values: vec![value],
                unit_scale: 1,
                class: ItemClass::Derived,
            },
        );
    }
}

/// Average inventory spans the current closing balance and the rolling
/// prior quarter's. Days divide 90 by the already-rounded turnover, and a
/// zero average or zero turnover yields the sentinel 0 rather than a fault.
fn inventory_turnover(
    filing: &Filing,
    prev_in_year: Option<&Filing>,
    prev_rolling: Option<&Filing>,
) -> Option<(f64, f64)> {
    let prev = prev_rolling?;
    let current_inventory = filing.value(codes::INVENTORIES)?;
    let prior_inventory = prev.value(codes::INVENTORIES).unwrap_or(0.0);
    let average = (current_inventory + prior_inventory) / 2.0;

    let costs = quarter_value(filing, prev_in_year, codes::OPERATING_COSTS)?;

    let turnover = if average == 0.0 {
        0.0
    } else {
        round2(costs / average)
    };
    let days = if turnover == 0.0 {
        0.0
    } else {
        round2(90.0 / turnover)
    };
    Some((turnover, days))
}
