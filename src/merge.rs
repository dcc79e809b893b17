use std::collections::BTreeMap;

use log::warn;

use crate::error::{PoolError, Result};
use crate::schema::{codes, Filing, LineItem, StatementSheet};

/// Merges one balance sheet, one comprehensive-income statement and one
/// cash-flow statement parsed from the same filing into a single record.
///
/// The merge is a key-union; no arithmetic happens here. Codes must not
/// collide across statements with different label pairs — that fails with
/// [`PoolError::ConflictingCode`]. A collision with identical labels
/// collapses silently (values are assumed identical, the later statement
/// wins).
pub fn merge_statements(
    balance: &StatementSheet,
    income: &StatementSheet,
    cash_flows: &StatementSheet,
) -> Result<Filing> {
    let key = balance.key()?;
    let mut items: BTreeMap<String, LineItem> = BTreeMap::new();

    for sheet in [balance, income, cash_flows] {
        for item in sheet.line_items() {
            if let Some(existing) = items.get(&item.code) {
                if existing.label_zh != item.label_zh || existing.label_en != item.label_en {
                    return Err(PoolError::ConflictingCode {
                        code: item.code,
                        existing: format!("{} / {}", existing.label_zh, existing.label_en),
                        incoming: format!("{} / {}", item.label_zh, item.label_en),
                    });
                }
            }
            items.insert(item.code.clone(), item);
        }
    }

    let filing = Filing {
        company_code: balance.company_code.clone(),
        company_name: balance.company_name.clone(),
        key,
        items,
    };
    audit_balance_sheet(&filing);
    Ok(filing)
}

/// Checks `assets ≈ liabilities + equity` when all three totals are
/// disclosed. A violation is logged and the filing still enters the pool;
/// callers decide what to make of it.
pub fn audit_balance_sheet(filing: &Filing) {
    let (Some(assets), Some(liabilities), Some(equity)) = (
        filing.value(codes::TOTAL_ASSETS),
        filing.value(codes::TOTAL_LIABILITIES),
        filing.value(codes::TOTAL_EQUITY),
    ) else {
        return;
    };

    let difference = (assets - (liabilities + equity)).abs();
    let tolerance = assets.abs().max(1.0) * 1e-4;
    if difference > tolerance {
        warn!(
            "{} {}: assets ({}) != liabilities ({}) + equity ({})",
            filing.company_code, filing.key, assets, liabilities, equity
        );
    }
}
