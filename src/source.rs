use std::collections::BTreeMap;

use crate::error::{PoolError, Result};
use crate::merge::merge_statements;
use crate::schema::{Filing, PeriodKey, StatementKind, StatementSheet};

/// A source of parsed statements.
///
/// Implementations wrap whatever actually produces them — a scraper, a disk
/// cache of parsed filings, a test fixture. Fetching is synchronous; a
/// filing that does not exist for a period is `Ok(None)`, never an error.
pub trait StatementSource {
    fn fetch_statement(
        &self,
        kind: StatementKind,
        company_code: &str,
        year: i32,
        season: u8,
    ) -> Result<Option<StatementSheet>>;
}

/// Fetches and merges the three statements of one filing.
///
/// Any absent statement means the filing as a whole is absent for that
/// period and surfaces as [`PoolError::MissingFiling`].
pub fn fetch_filing<S>(source: &S, company_code: &str, key: PeriodKey) -> Result<Filing>
where
    S: StatementSource + ?Sized,
{
    let fetch = |kind| -> Result<StatementSheet> {
        source
            .fetch_statement(kind, company_code, key.year(), key.season())?
            .ok_or_else(|| PoolError::MissingFiling {
                company: company_code.to_string(),
                period: key,
            })
    };

    let balance = fetch(StatementKind::BalanceSheet)?;
    let income = fetch(StatementKind::ComprehensiveIncome)?;
    let cash_flows = fetch(StatementKind::CashFlows)?;
    merge_statements(&balance, &income, &cash_flows)
}

/// In-memory source backed by pre-parsed sheets. Used by tests and demos;
/// also the natural shape for anything that loads parsed filings in bulk.
#[derive(Debug, Default)]
pub struct MemorySource {
    sheets: BTreeMap<(String, i32, StatementKind), StatementSheet>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a sheet, replacing any earlier sheet for the same
    /// (company, period, statement).
    pub fn insert(&mut self, sheet: StatementSheet) {
        let encoded = sheet.year * 10 + i32::from(sheet.season);
        self.sheets
            .insert((sheet.company_code.clone(), encoded, sheet.kind), sheet);
    }

    pub fn len(&self) -> usize {
        self.sheets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sheets.is_empty()
    }
}

impl StatementSource for MemorySource {
    fn fetch_statement(
        &self,
        kind: StatementKind,
        company_code: &str,
        year: i32,
        season: u8,
    ) -> Result<Option<StatementSheet>> {
        let key = (company_code.to_string(), year * 10 + i32::from(season), kind);
        Ok(self.sheets.get(&key).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::SheetItem;

    fn sheet(kind: StatementKind, code: &str, label: &str, value: f64) -> StatementSheet {
        let mut items = BTreeMap::new();
        items.insert(
            code.to_string(),
            SheetItem {
                label_zh: label.to_string(),
                label_en: label.to_string(),
                values: vec![value],
            },
        );
        StatementSheet {
            kind,
            company_code: "2605".to_string(),
            company_name: "Test Marine".to_string(),
            year: 2021,
            season: 1,
            unit_scale: 1000,
            items,
        }
    }

    #[test]
    fn test_memory_source_roundtrip() {
        let mut source = MemorySource::new();
        source.insert(sheet(StatementKind::BalanceSheet, "1XXX", "資產總計", 5000.0));
        assert_eq!(source.len(), 1);

        let hit = source
            .fetch_statement(StatementKind::BalanceSheet, "2605", 2021, 1)
            .unwrap();
        assert!(hit.is_some());

        let miss = source
            .fetch_statement(StatementKind::CashFlows, "2605", 2021, 1)
            .unwrap();
        assert!(miss.is_none());
    }

    #[test]
    fn test_fetch_filing_requires_all_three_statements() {
        let mut source = MemorySource::new();
        source.insert(sheet(StatementKind::BalanceSheet, "1XXX", "資產總計", 5000.0));
        source.insert(sheet(StatementKind::ComprehensiveIncome, "8200", "本期淨利", 400.0));

        let key = PeriodKey::new(2021, 1).unwrap();
        let err = fetch_filing(&source, "2605", key).unwrap_err();
        assert!(matches!(err, PoolError::MissingFiling { .. }));

        source.insert(sheet(StatementKind::CashFlows, "A00010", "稅前淨利", 450.0));
        let filing = fetch_filing(&source, "2605", key).unwrap();
        assert_eq!(filing.items.len(), 3);
    }
}
