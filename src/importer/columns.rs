// src/importer/columns.rs
use super::ImportError;

pub const TICKER_COLUMNS: &[&str] = &["symbol", "ticker", "stock symbol", "instrument"];
pub const QUANTITY_COLUMNS: &[&str] = &["quantity", "shares", "qty", "units", "amount"];
pub const COST_COLUMNS: &[&str] = &[
    "average cost",
    "avg cost",
    "avg_cost_basis",
    "cost basis",
    "cost per share",
    "average price",
    "purchase price",
    "price",
];

/// Resolved positions of the logical columns within a header row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnMap {
    pub ticker: usize,
    pub quantity: usize,
    pub cost: Option<usize>,
}

impl ColumnMap {
    /// Resolves columns in order ticker, quantity, cost. Cost is optional.
    pub fn resolve<S: AsRef<str>>(headers: &[S]) -> Result<Self, ImportError> {
        let normalized: Vec<String> = headers.iter().map(|h| normalize(h.as_ref())).collect();

        let ticker = find_column(&normalized, TICKER_COLUMNS).ok_or(ImportError::MissingColumn {
            column: "ticker/symbol",
            candidates: TICKER_COLUMNS,
        })?;
        let quantity =
            find_column(&normalized, QUANTITY_COLUMNS).ok_or(ImportError::MissingColumn {
                column: "quantity",
                candidates: QUANTITY_COLUMNS,
            })?;
        let cost = find_column(&normalized, COST_COLUMNS);

        Ok(ColumnMap {
            ticker,
            quantity,
            cost,
        })
    }

    /// Minimum number of fields a row needs to reach every resolved column.
    pub fn required_width(&self) -> usize {
        self.ticker.max(self.quantity).max(self.cost.unwrap_or(0)) + 1
    }
}

pub fn normalize(name: &str) -> String {
    name.trim().to_lowercase().replace(['_', '-'], " ")
}

// Candidate order decides ties; the first matching header wins for a candidate.
fn find_column(normalized: &[String], candidates: &[&str]) -> Option<usize> {
    candidates.iter().find_map(|candidate| {
        let candidate = normalize(candidate);
        normalized.iter().position(|h| *h == candidate)
    })
}
