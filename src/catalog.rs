use std::collections::BTreeSet;

use serde::Serialize;

use crate::pool::ReportPool;
use crate::reconcile::{ACCUMULATED_PREFIX, FULL_YEAR_PREFIX};
use crate::schema::ItemClass;

/// One catalogued item code with its label pair.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct CatalogEntry {
    pub code: String,
    pub label_zh: String,
    pub label_en: String,
}

/// Every item the pool has seen, grouped for human inspection.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ItemCatalog {
    pub point_in_time: Vec<CatalogEntry>,
    pub cumulative_flow: Vec<CatalogEntry>,
    pub derived: Vec<CatalogEntry>,
    /// `acc_`/`y_` re-keyed rows that reached the flat series.
    pub fallback_tagged: Vec<CatalogEntry>,
}

impl ItemCatalog {
    pub fn from_pool(pool: &ReportPool) -> Self {
        let mut point_in_time = BTreeSet::new();
        let mut cumulative_flow = BTreeSet::new();
        let mut derived = BTreeSet::new();
        let mut fallback_tagged = BTreeSet::new();

        for filing in pool.filings() {
            for item in filing.items.values() {
                let entry = CatalogEntry {
                    code: item.code.clone(),
                    label_zh: item.label_zh.clone(),
                    label_en: item.label_en.clone(),
                };
                match item.class {
                    ItemClass::PointInTime => point_in_time.insert(entry),
                    ItemClass::CumulativeFlow => cumulative_flow.insert(entry),
                    ItemClass::Derived => derived.insert(entry),
                };
            }
        }

        for row in pool.flat_series() {
            if row.item_code.starts_with(ACCUMULATED_PREFIX)
                || row.item_code.starts_with(FULL_YEAR_PREFIX)
            {
                fallback_tagged.insert(CatalogEntry {
                    code: row.item_code.clone(),
                    label_zh: row.label_zh.clone(),
                    label_en: row.label_en.clone(),
                });
            }
        }

        Self {
            point_in_time: point_in_time.into_iter().collect(),
            cumulative_flow: cumulative_flow.into_iter().collect(),
            derived: derived.into_iter().collect(),
            fallback_tagged: fallback_tagged.into_iter().collect(),
        }
    }

    pub fn total_items(&self) -> usize {
        self.point_in_time.len()
            + self.cumulative_flow.len()
            + self.derived.len()
            + self.fallback_tagged.len()
    }

    pub fn to_markdown(&self) -> String {
        let mut output = String::new();
        output.push_str("# Item catalog\n\n");

        let sections = [
            ("Point-in-time", &self.point_in_time),
            ("Cumulative flow", &self.cumulative_flow),
            ("Derived", &self.derived),
            ("Fallback-tagged", &self.fallback_tagged),
        ];
        for (title, entries) in sections {
            output.push_str(&format!("## {}\n\n", title));
            for entry in entries {
                output.push_str(&format!(
                    "- `{}` — {} / {}\n",
                    entry.code, entry.label_zh, entry.label_en
                ));
            }
            output.push('\n');
        }

        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Filing, LineItem, PeriodKey};
    use std::collections::BTreeMap;

    fn filing(season: u8, items: &[(&str, ItemClass, &[f64])]) -> Filing {
        let mut map = BTreeMap::new();
        for (code, class, values) in items {
            map.insert(
                code.to_string(),
                LineItem {
                    code: code.to_string(),
                    label_zh: format!("{}-zh", code),
                    label_en: format!("{}-en", code),
                    values: values.to_vec(),
                    unit_scale: 1000,
                    class: *class,
                },
            );
        }
        Filing {
            company_code: "2605".to_string(),
            company_name: "Test Marine".to_string(),
            key: PeriodKey::new(2021, season).unwrap(),
            items: map,
        }
    }

    #[test]
    fn test_catalog_groups_by_class() {
        let mut pool = ReportPool::new();
        pool.add_filing(filing(
            1,
            &[
                ("1XXX", ItemClass::PointInTime, &[5000.0]),
                ("8200", ItemClass::CumulativeFlow, &[400.0]),
            ],
        ));
        // season 3 with no prior filing ends up acc_-tagged
        pool.add_filing(filing(
            3,
            &[("8200", ItemClass::CumulativeFlow, &[900.0])],
        ));
        pool.assemble();

        let catalog = ItemCatalog::from_pool(&pool);
        assert_eq!(catalog.point_in_time.len(), 1);
        assert_eq!(catalog.cumulative_flow.len(), 1);
        assert!(catalog.derived.iter().any(|entry| entry.code == "s_roa"));
        assert!(catalog
            .fallback_tagged
            .iter()
            .any(|entry| entry.code == "acc_8200"));
    }

    #[test]
    fn test_catalog_markdown() {
        let mut pool = ReportPool::new();
        pool.add_filing(filing(1, &[("1XXX", ItemClass::PointInTime, &[5000.0])]));
        pool.assemble();

        let markdown = ItemCatalog::from_pool(&pool).to_markdown();
        assert!(markdown.contains("# Item catalog"));
        assert!(markdown.contains("## Point-in-time"));
        assert!(markdown.contains("`1XXX`"));
    }
}
