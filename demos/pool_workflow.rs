//! End-to-end walkthrough: build an in-memory source with two years of
//! filings for one company, pool them, and dump the flat series to CSV.
//!
//! Run with: `cargo run --example pool_workflow`

use std::collections::BTreeMap;

use anyhow::Result;
use financial_report_pool::{
    collect_range, ItemCatalog, MemorySource, PeriodKey, SheetItem, StatementKind, StatementSheet,
};

fn sheet(
    kind: StatementKind,
    year: i32,
    season: u8,
    items: &[(&str, &str, &str, &[f64])],
) -> StatementSheet {
    let items: BTreeMap<String, SheetItem> = items
        .iter()
        .map(|(code, zh, en, values)| {
            (
                code.to_string(),
                SheetItem {
                    label_zh: zh.to_string(),
                    label_en: en.to_string(),
                    values: values.to_vec(),
                },
            )
        })
        .collect();
    StatementSheet {
        kind,
        company_code: "2605".to_string(),
        company_name: "Example Marine".to_string(),
        year,
        season,
        unit_scale: 1000,
        items,
    }
}

fn main() -> Result<()> {
    let mut source = MemorySource::new();

    // 2020: four seasons of cumulative disclosures
    let revenue = [900.0, 1900.0, 3000.0, 4400.0];
    let costs = [600.0, 1250.0, 1950.0, 2850.0];
    let profit = [90.0, 200.0, 330.0, 500.0];
    let inventory = [240.0, 260.0, 250.0, 280.0];
    for season in 1..=4u8 {
        let idx = usize::from(season) - 1;
        let (rev, cost, prof): (Vec<f64>, Vec<f64>, Vec<f64>) = if season == 4 {
            (
                vec![revenue[3], 4000.0, revenue[2]],
                vec![costs[3], 2600.0, costs[2]],
                vec![profit[3], 430.0, profit[2]],
            )
        } else {
            (vec![revenue[idx]], vec![costs[idx]], vec![profit[idx]])
        };

        source.insert(sheet(
            StatementKind::BalanceSheet,
            2020,
            season,
            &[
                ("1XXX", "資產總計", "Total assets", &[5000.0 + 100.0 * f64::from(season)]),
                ("2XXX", "負債總計", "Total liabilities", &[2000.0]),
                ("3XXX", "權益總計", "Total equity", &[3000.0 + 100.0 * f64::from(season)]),
                ("130X", "存貨", "Inventories", &[inventory[idx]]),
            ],
        ));
        source.insert(sheet(
            StatementKind::ComprehensiveIncome,
            2020,
            season,
            &[
                ("4000", "營業收入", "Total operating revenue", rev.as_slice()),
                ("5000", "營業成本", "Total operating costs", cost.as_slice()),
                ("8200", "本期淨利", "Profit", prof.as_slice()),
            ],
        ));
        source.insert(sheet(StatementKind::CashFlows, 2020, season, &[]));
    }

    let start = PeriodKey::new(2020, 1)?;
    let end = PeriodKey::new(2020, 4)?;
    let mut pool = collect_range(&source, &["2605"], start, end)?;

    // a synthetic item over two existing ones
    pool.extend(
        &["4000", "5000"],
        |values| values[0] - values[1],
        "gross",
        "毛利",
        "Gross profit",
    )?;

    println!("{}", ItemCatalog::from_pool(&pool).to_markdown());

    let mut writer = csv::Writer::from_path("flat_series.csv")?;
    for row in pool.flat_series() {
        writer.serialize(row)?;
    }
    writer.flush()?;
    println!(
        "wrote {} rows to flat_series.csv",
        pool.flat_series().count()
    );

    Ok(())
}
