use std::collections::BTreeMap;
use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::{PoolError, Result};

/// Well-known item codes shared across the engines.
pub mod codes {
    /// Total assets (balance sheet).
    pub const TOTAL_ASSETS: &str = "1XXX";
    /// Total liabilities (balance sheet).
    pub const TOTAL_LIABILITIES: &str = "2XXX";
    /// Total equity (balance sheet).
    pub const TOTAL_EQUITY: &str = "3XXX";
    /// Capital stock (balance sheet), the basic-EPS share base.
    pub const CAPITAL_STOCK: &str = "3100";
    /// Common stock (balance sheet), the diluted-EPS share base.
    pub const COMMON_STOCK: &str = "3110";
    /// Closing inventories (balance sheet).
    pub const INVENTORIES: &str = "130X";
    /// Total operating revenue (comprehensive income).
    pub const OPERATING_REVENUE: &str = "4000";
    /// Total operating costs (comprehensive income).
    pub const OPERATING_COSTS: &str = "5000";
    /// Gross profit (comprehensive income).
    pub const GROSS_PROFIT: &str = "5900";
    /// Net operating income (comprehensive income).
    pub const OPERATING_INCOME: &str = "6900";
    /// Profit for the period (comprehensive income).
    pub const NET_INCOME: &str = "8200";
    /// Basic earnings per share.
    pub const BASIC_EPS: &str = "9750";
    /// Diluted earnings per share.
    pub const DILUTED_EPS: &str = "9850";
}

/// The three statements a quarterly filing is made of.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "PascalCase")]
pub enum StatementKind {
    BalanceSheet,
    ComprehensiveIncome,
    CashFlows,
}

impl StatementKind {
    /// Which partition the codes disclosed by this statement belong to.
    pub fn item_class(self) -> ItemClass {
        match self {
            Self::BalanceSheet => ItemClass::PointInTime,
            Self::ComprehensiveIncome | Self::CashFlows => ItemClass::CumulativeFlow,
        }
    }
}

/// Partition tag of an item code.
///
/// Assigned when a parsed sheet is materialized, from the statement kind the
/// code came from. Nothing in this crate infers the partition from numeric
/// code ranges.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "PascalCase")]
pub enum ItemClass {
    /// Balance-sheet figure, valid as of the filing date. Never reconciled.
    PointInTime,

    /// Income-statement or cash-flow figure, reported cumulative from the
    /// fiscal-year start through the filing season.
    CumulativeFlow,

    /// Synthetic metric written back by the metrics engine. Never
    /// reconciled; overwritten on recompute.
    Derived,
}

/// A fiscal (year, season) pair, totally ordered.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
pub struct PeriodKey {
    year: i32,
    season: u8,
}

impl PeriodKey {
    pub fn new(year: i32, season: u8) -> Result<Self> {
        if !(1..=4).contains(&season) {
            return Err(PoolError::InvalidSeason(season));
        }
        Ok(Self { year, season })
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn season(&self) -> u8 {
        self.season
    }

    /// `year * 10 + season`, the encoding used for series lookups and row
    /// keys.
    pub fn encoded(&self) -> i32 {
        self.year * 10 + i32::from(self.season)
    }

    pub fn from_encoded(encoded: i32) -> Result<Self> {
        Self::new(encoded / 10, (encoded % 10) as u8)
    }

    /// The previous season within the same fiscal year, if any.
    pub fn prev_in_year(&self) -> Option<Self> {
        (self.season > 1).then(|| Self {
            year: self.year,
            season: self.season - 1,
        })
    }

    /// The rolling prior quarter; crosses the fiscal-year boundary at
    /// season 1.
    pub fn prev_rolling(&self) -> Self {
        if self.season == 1 {
            Self {
                year: self.year - 1,
                season: 4,
            }
        } else {
            Self {
                year: self.year,
                season: self.season - 1,
            }
        }
    }

    /// The next season, for range iteration.
    pub fn next(&self) -> Self {
        if self.season == 4 {
            Self {
                year: self.year + 1,
                season: 1,
            }
        } else {
            Self {
                year: self.year,
                season: self.season + 1,
            }
        }
    }
}

impl fmt::Display for PeriodKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.encoded())
    }
}

/// One disclosed (or derived) line item of a filing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    /// Item code as printed in the filing, e.g. `1XXX` or `8200`.
    pub code: String,
    /// Local-language label.
    pub label_zh: String,
    /// English label.
    pub label_en: String,
    /// Disclosure-ordered figures: index 0 is the current figure (a closing
    /// balance for point-in-time codes, a year-to-date cumulative for flow
    /// codes), index 1 the filing's comparative prior-year figure, index 2
    /// the comparative cumulative through season 3 where the filing carries
    /// one. Never empty for a code that exists.
    pub values: Vec<f64>,
    /// Multiplier for the disclosed unit (1000 for "in thousands").
    pub unit_scale: u32,
    /// Which partition the code belongs to.
    pub class: ItemClass,
}

impl LineItem {
    /// The current-period figure.
    pub fn current(&self) -> f64 {
        self.values.first().copied().unwrap_or_default()
    }

    /// The comparative cumulative through season 3, when disclosed.
    pub fn through_season_3(&self) -> Option<f64> {
        self.values.get(2).copied()
    }
}

/// The label pair and values of one code within a parsed statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SheetItem {
    /// Local-language label as printed in the statement.
    pub label_zh: String,
    /// English label as printed in the statement.
    pub label_en: String,
    /// Disclosure-ordered figures; see [`LineItem::values`].
    pub values: Vec<f64>,
}

/// One parsed statement, as handed over by the external document parser.
///
/// Parsing HTML tables is a collaborator's concern, not this crate's;
/// [`StatementSheet::schema_as_json`] publishes the JSON shape that
/// collaborator must produce.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct StatementSheet {
    pub kind: StatementKind,
    /// Stock code of the filing company, e.g. `2605`.
    pub company_code: String,
    /// Company name as printed in the filing header.
    pub company_name: String,
    pub year: i32,
    /// Fiscal season, 1 through 4.
    pub season: u8,
    /// Unit multiplier stated in the statement header (1000 for "in
    /// thousands").
    pub unit_scale: u32,
    /// Item code → labels and disclosure-ordered values.
    pub items: BTreeMap<String, SheetItem>,
}

impl StatementSheet {
    pub fn key(&self) -> Result<PeriodKey> {
        PeriodKey::new(self.year, self.season)
    }

    /// Materializes the store as classified line items.
    pub fn line_items(&self) -> impl Iterator<Item = LineItem> + '_ {
        let class = self.kind.item_class();
        self.items.iter().map(move |(code, item)| LineItem {
            code: code.clone(),
            label_zh: item.label_zh.clone(),
            label_en: item.label_en.clone(),
            values: item.values.clone(),
            unit_scale: self.unit_scale,
            class,
        })
    }

    pub fn generate_json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(StatementSheet)
    }

    pub fn schema_as_json() -> Result<String> {
        Ok(serde_json::to_string_pretty(&Self::generate_json_schema())?)
    }
}

/// One merged filing: every disclosed code of the three statements for a
/// single (company, year, season), plus any derived codes written back by
/// the metrics engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Filing {
    pub company_code: String,
    pub company_name: String,
    pub key: PeriodKey,
    pub items: BTreeMap<String, LineItem>,
}

impl Filing {
    /// The current-period figure for `code`, if disclosed.
    pub fn value(&self, code: &str) -> Option<f64> {
        self.items.get(code).map(LineItem::current)
    }
}

/// One row of the long-format output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlatRow {
    pub company_code: String,
    /// `code-name` display form, e.g. `2605-Example Marine`.
    pub company_name: String,
    /// Encoded period key as a string, e.g. `20204`.
    pub period: String,
    pub item_code: String,
    pub label_zh: String,
    pub label_en: String,
    pub value: f64,
}
