//! The pool: per-company filing series, reconciliation and metrics
//! orchestration, and the flat long-format series downstream consumers
//! query.

use std::collections::{BTreeMap, BTreeSet};

use log::{debug, info, warn};

use crate::error::{PoolError, Result};
use crate::metrics::derive_metrics;
use crate::reconcile::reconcile_filing;
use crate::schema::{Filing, FlatRow, ItemClass, PeriodKey};
use crate::source::{fetch_filing, StatementSource};

/// Per-company series of filings, keyed by the encoded period.
pub type CompanySeries = BTreeMap<i32, Filing>;

/// De-duplication key of a flat row: (company, encoded period, item).
type RowKey = (String, i32, String);

#[derive(Debug, Default)]
pub struct ReportPool {
    /// Company code → period series. Single writer; partition by company
    /// code if callers want to parallelize upstream work.
    series: BTreeMap<String, CompanySeries>,
    /// Company code → company name, populated on first sight of a code.
    names: BTreeMap<String, String>,
    /// The assembled flat series, keyed for de-duplication.
    rows: BTreeMap<RowKey, FlatRow>,
}

impl ReportPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of filings across all companies.
    pub fn filing_count(&self) -> usize {
        self.series.values().map(BTreeMap::len).sum()
    }

    /// Every filing in the pool, in (company, period) order.
    pub fn filings(&self) -> impl Iterator<Item = &Filing> + '_ {
        self.series.values().flat_map(BTreeMap::values)
    }

    /// The series for one company, if any of its filings were added.
    pub fn company_series(&self, company_code: &str) -> Option<&CompanySeries> {
        self.series.get(company_code)
    }

    /// Company names seen so far, keyed by company code.
    pub fn company_names(&self) -> &BTreeMap<String, String> {
        &self.names
    }

    /// Adds one merged filing, replacing any earlier filing for the same
    /// company and period. Call [`assemble`](Self::assemble) afterwards to
    /// refresh the flat series.
    pub fn add_filing(&mut self, filing: Filing) {
        self.names
            .entry(filing.company_code.clone())
            .or_insert_with(|| filing.company_name.clone());
        debug!("adding filing {} {}", filing.company_code, filing.key);
        self.series
            .entry(filing.company_code.clone())
            .or_default()
            .insert(filing.key.encoded(), filing);
    }

    /// Fetches and adds every filing for `company_code` from `start`
    /// through `end` inclusive.
    ///
    /// A missing filing is skipped and a filing whose statements conflict
    /// is excluded; neither stops the range or other companies. Any other
    /// source error propagates.
    pub fn fetch_range<S>(
        &mut self,
        source: &S,
        company_code: &str,
        start: PeriodKey,
        end: PeriodKey,
    ) -> Result<()>
    where
        S: StatementSource + ?Sized,
    {
        let mut key = start;
        while key <= end {
            match fetch_filing(source, company_code, key) {
                Ok(filing) => self.add_filing(filing),
                Err(PoolError::MissingFiling { .. }) => {
                    debug!("no filing for {} {}", company_code, key);
                }
                Err(err @ PoolError::ConflictingCode { .. }) => {
                    warn!("excluding filing {} {}: {}", company_code, key, err);
                }
                Err(err) => return Err(err),
            }
            key = key.next();
        }
        Ok(())
    }

    /// Rebuilds the flat series: derives metrics for every filing, then
    /// emits one row per (company, period, item) — point-in-time and
    /// derived codes as-is, flow codes reconciled into quarter figures
    /// (re-keyed `acc_`/`y_` where no clean increment existed).
    ///
    /// Safe to re-run at any time: raw disclosed values are never mutated,
    /// derived codes are overwritten, and rows colliding on
    /// (company, period, item) collapse to the latest value.
    pub fn assemble(&mut self) {
        info!(
            "assembling {} filings across {} companies",
            self.filing_count(),
            self.series.len()
        );

        let mut new_rows: Vec<(i32, FlatRow)> = Vec::new();

        for (company_code, series) in &mut self.series {
            let display_name = match self.names.get(company_code) {
                Some(name) => format!("{}-{}", company_code, name),
                None => company_code.clone(),
            };

            let encoded_keys: Vec<i32> = series.keys().copied().collect();
            for encoded in encoded_keys {
                let Some(mut filing) = series.remove(&encoded) else {
                    continue;
                };

                {
                    let prev_in_year = filing
                        .key
                        .prev_in_year()
                        .and_then(|key| series.get(&key.encoded()));
                    let prev_rolling = series.get(&filing.key.prev_rolling().encoded());
                    derive_metrics(&mut filing, prev_in_year, prev_rolling);

                    for item in filing.items.values() {
                        match item.class {
                            ItemClass::PointInTime | ItemClass::Derived => {
                                new_rows.push((
                                    encoded,
                                    FlatRow {
                                        company_code: company_code.clone(),
                                        company_name: display_name.clone(),
                                        period: encoded.to_string(),
                                        item_code: item.code.clone(),
                                        label_zh: item.label_zh.clone(),
                                        label_en: item.label_en.clone(),
                                        value: item.current(),
                                    },
                                ));
                            }
                            ItemClass::CumulativeFlow => {}
                        }
                    }

                    for reconciled in reconcile_filing(&filing, prev_in_year) {
                        new_rows.push((
                            encoded,
                            FlatRow {
                                company_code: company_code.clone(),
                                company_name: display_name.clone(),
                                period: encoded.to_string(),
                                item_code: reconciled.code,
                                label_zh: reconciled.label_zh,
                                label_en: reconciled.label_en,
                                value: reconciled.value,
                            },
                        ));
                    }
                }

                series.insert(encoded, filing);
            }
        }

        for (encoded, row) in new_rows {
            self.insert_row(encoded, row);
        }
    }

    /// The assembled series, ordered by (company, period, item).
    pub fn flat_series(&self) -> impl Iterator<Item = &FlatRow> + '_ {
        self.rows.values()
    }

    /// Rows for one item code, in (company, period) order.
    pub fn rows_for_item<'a>(&'a self, code: &'a str) -> impl Iterator<Item = &'a FlatRow> + 'a {
        self.rows
            .iter()
            .filter(move |((_, _, item_code), _)| item_code.as_str() == code)
            .map(|(_, row)| row)
    }

    /// De-duplicated (code, label_zh, label_en) triples across the series.
    pub fn list_items(&self) -> Vec<(String, String, String)> {
        let set: BTreeSet<(String, String, String)> = self
            .rows
            .values()
            .map(|row| (row.item_code.clone(), row.label_zh.clone(), row.label_en.clone()))
            .collect();
        set.into_iter().collect()
    }

    /// Derives a brand-new synthetic item across the whole series by
    /// applying `combine` cell-wise over the aligned value sequences of
    /// `source_codes` (one input slot per source code, in order).
    ///
    /// Every source item must cover exactly the same (company, period)
    /// cells; otherwise the call fails with
    /// [`PoolError::MisalignedSeries`] and the series is left untouched.
    /// Prior rows for `new_code` are replaced.
    pub fn extend<F>(
        &mut self,
        source_codes: &[&str],
        combine: F,
        new_code: &str,
        label_zh: &str,
        label_en: &str,
    ) -> Result<()>
    where
        F: Fn(&[f64]) -> f64,
    {
        let Some(&first_code) = source_codes.first() else {
            return Err(PoolError::MisalignedSeries {
                code: new_code.to_string(),
                details: "no source items given".to_string(),
            });
        };

        let template: Vec<(i32, FlatRow)> = self
            .rows
            .iter()
            .filter(|((_, _, item_code), _)| item_code.as_str() == first_code)
            .map(|((_, encoded, _), row)| (*encoded, row.clone()))
            .collect();
        if template.is_empty() {
            return Err(PoolError::UnknownItem(first_code.to_string()));
        }

        let mut columns: Vec<Vec<f64>> = vec![template.iter().map(|(_, row)| row.value).collect()];

        for &code in &source_codes[1..] {
            let rows: Vec<(&RowKey, &FlatRow)> = self
                .rows
                .iter()
                .filter(|((_, _, item_code), _)| item_code.as_str() == code)
                .collect();
            if rows.is_empty() {
                return Err(PoolError::UnknownItem(code.to_string()));
            }
            if rows.len() != template.len() {
                return Err(PoolError::MisalignedSeries {
                    code: code.to_string(),
                    details: format!(
                        "{} points, but '{}' has {}",
                        rows.len(),
                        first_code,
                        template.len()
                    ),
                });
            }
            for ((encoded, row), ((company, row_encoded, _), _)) in template.iter().zip(&rows) {
                if row.company_code != *company || encoded != row_encoded {
                    return Err(PoolError::MisalignedSeries {
                        code: code.to_string(),
                        details: format!(
                            "cell ({}, {}) does not align with '{}' at ({}, {})",
                            company, row_encoded, first_code, row.company_code, encoded
                        ),
                    });
                }
            }
            columns.push(rows.iter().map(|(_, row)| row.value).collect());
        }

        let new_rows: Vec<(i32, FlatRow)> = template
            .iter()
            .enumerate()
            .map(|(cell, (encoded, row))| {
                let inputs: Vec<f64> = columns.iter().map(|column| column[cell]).collect();
                (
                    *encoded,
                    FlatRow {
                        company_code: row.company_code.clone(),
                        company_name: row.company_name.clone(),
                        period: row.period.clone(),
                        item_code: new_code.to_string(),
                        label_zh: label_zh.to_string(),
                        label_en: label_en.to_string(),
                        value: combine(&inputs),
                    },
                )
            })
            .collect();

        self.rows
            .retain(|(_, _, item_code), _| item_code.as_str() != new_code);
        for (encoded, row) in new_rows {
            self.insert_row(encoded, row);
        }
        Ok(())
    }

    fn insert_row(&mut self, encoded: i32, row: FlatRow) {
        let key = (row.company_code.clone(), encoded, row.item_code.clone());
        self.rows.insert(key, row);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ItemClass, LineItem};
    use std::collections::BTreeMap as Map;

    fn filing(
        company: &str,
        year: i32,
        season: u8,
        items: &[(&str, ItemClass, &[f64])],
    ) -> Filing {
        let mut map = Map::new();
        for (code, class, values) in items {
            map.insert(
                code.to_string(),
                LineItem {
                    code: code.to_string(),
                    label_zh: code.to_string(),
                    label_en: code.to_string(),
                    values: values.to_vec(),
                    unit_scale: 1000,
                    class: *class,
                },
            );
        }
        Filing {
            company_code: company.to_string(),
            company_name: format!("Company {}", company),
            key: PeriodKey::new(year, season).unwrap(),
            items: map,
        }
    }

    fn row_value(pool: &ReportPool, company: &str, period: &str, code: &str) -> Option<f64> {
        pool.flat_series()
            .find(|row| {
                row.company_code == company && row.period == period && row.item_code == code
            })
            .map(|row| row.value)
    }

    #[test]
    fn test_assemble_reconciles_and_derives() {
        let mut pool = ReportPool::new();
        pool.add_filing(filing(
            "2605",
            2020,
            4,
            &[
                ("8200", ItemClass::CumulativeFlow, &[1000.0, 950.0, 700.0]),
                ("1XXX", ItemClass::PointInTime, &[4000.0]),
            ],
        ));
        pool.add_filing(filing(
            "2605",
            2021,
            1,
            &[
                ("8200", ItemClass::CumulativeFlow, &[400.0]),
                ("1XXX", ItemClass::PointInTime, &[5000.0]),
            ],
        ));
        pool.assemble();

        assert_eq!(row_value(&pool, "2605", "20204", "8200"), Some(300.0));
        assert_eq!(row_value(&pool, "2605", "20211", "8200"), Some(400.0));
        assert_eq!(row_value(&pool, "2605", "20211", "s_roa"), Some(8.0));
        assert_eq!(row_value(&pool, "2605", "20211", "1XXX"), Some(5000.0));
    }

    #[test]
    fn test_assemble_is_idempotent() {
        let mut pool = ReportPool::new();
        pool.add_filing(filing(
            "2605",
            2021,
            2,
            &[("8200", ItemClass::CumulativeFlow, &[900.0])],
        ));
        pool.add_filing(filing(
            "2605",
            2021,
            1,
            &[("8200", ItemClass::CumulativeFlow, &[400.0])],
        ));

        pool.assemble();
        let first: Vec<FlatRow> = pool.flat_series().cloned().collect();
        pool.assemble();
        let second: Vec<FlatRow> = pool.flat_series().cloned().collect();
        assert_eq!(first, second);
        assert_eq!(row_value(&pool, "2605", "20212", "8200"), Some(500.0));
    }

    #[test]
    fn test_replaced_filing_wins() {
        let mut pool = ReportPool::new();
        pool.add_filing(filing(
            "2605",
            2021,
            1,
            &[("1XXX", ItemClass::PointInTime, &[5000.0])],
        ));
        pool.assemble();
        assert_eq!(row_value(&pool, "2605", "20211", "1XXX"), Some(5000.0));

        pool.add_filing(filing(
            "2605",
            2021,
            1,
            &[("1XXX", ItemClass::PointInTime, &[6000.0])],
        ));
        pool.assemble();
        assert_eq!(row_value(&pool, "2605", "20211", "1XXX"), Some(6000.0));
        assert_eq!(pool.flat_series().count(), 1);
    }

    #[test]
    fn test_companies_stay_isolated() {
        let mut pool = ReportPool::new();
        pool.add_filing(filing(
            "2605",
            2021,
            2,
            &[("8200", ItemClass::CumulativeFlow, &[900.0])],
        ));
        // the other company has the prior season; it must not leak over
        pool.add_filing(filing(
            "2330",
            2021,
            1,
            &[("8200", ItemClass::CumulativeFlow, &[400.0])],
        ));
        pool.assemble();

        assert_eq!(row_value(&pool, "2605", "20212", "acc_8200"), Some(900.0));
        assert_eq!(row_value(&pool, "2330", "20211", "8200"), Some(400.0));
    }

    #[test]
    fn test_list_items_deduplicates() {
        let mut pool = ReportPool::new();
        pool.add_filing(filing(
            "2605",
            2021,
            1,
            &[("1XXX", ItemClass::PointInTime, &[5000.0])],
        ));
        pool.add_filing(filing(
            "2605",
            2021,
            2,
            &[("1XXX", ItemClass::PointInTime, &[5100.0])],
        ));
        pool.assemble();

        let items = pool.list_items();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].0, "1XXX");
    }

    #[test]
    fn test_extend_derives_a_new_item() {
        let mut pool = ReportPool::new();
        for (season, liabilities, assets) in [(1, 2000.0, 5000.0), (2, 2500.0, 5000.0)] {
            pool.add_filing(filing(
                "2605",
                2021,
                season,
                &[
                    ("1XXX", ItemClass::PointInTime, &[assets]),
                    ("2XXX", ItemClass::PointInTime, &[liabilities]),
                ],
            ));
        }
        pool.assemble();

        pool.extend(
            &["1XXX", "2XXX"],
            |values| values[0] - values[1],
            "net_assets",
            "淨資產",
            "Net Assets",
        )
        .unwrap();

        assert_eq!(row_value(&pool, "2605", "20211", "net_assets"), Some(3000.0));
        assert_eq!(row_value(&pool, "2605", "20212", "net_assets"), Some(2500.0));

        // re-running replaces, not duplicates
        pool.extend(
            &["1XXX", "2XXX"],
            |values| values[0] - values[1],
            "net_assets",
            "淨資產",
            "Net Assets",
        )
        .unwrap();
        assert_eq!(pool.rows_for_item("net_assets").count(), 2);
    }

    #[test]
    fn test_extend_misaligned_leaves_series_untouched() {
        let mut pool = ReportPool::new();
        pool.add_filing(filing(
            "2605",
            2021,
            1,
            &[
                ("1XXX", ItemClass::PointInTime, &[5000.0]),
                ("2XXX", ItemClass::PointInTime, &[2000.0]),
            ],
        ));
        pool.add_filing(filing(
            "2605",
            2021,
            2,
            &[("1XXX", ItemClass::PointInTime, &[5100.0])],
        ));
        pool.assemble();
        let before: Vec<FlatRow> = pool.flat_series().cloned().collect();

        let err = pool
            .extend(
                &["1XXX", "2XXX"],
                |values| values[0] - values[1],
                "net_assets",
                "淨資產",
                "Net Assets",
            )
            .unwrap_err();
        assert!(matches!(err, PoolError::MisalignedSeries { .. }));

        let after: Vec<FlatRow> = pool.flat_series().cloned().collect();
        assert_eq!(before, after);
    }

    #[test]
    fn test_extend_unknown_item() {
        let mut pool = ReportPool::new();
        pool.add_filing(filing(
            "2605",
            2021,
            1,
            &[("1XXX", ItemClass::PointInTime, &[5000.0])],
        ));
        pool.assemble();

        let err = pool
            .extend(&["9999"], |values| values[0], "copy", "複製", "Copy")
            .unwrap_err();
        assert!(matches!(err, PoolError::UnknownItem(ref code) if code == "9999"));
    }
}
