// src/importer/reconcile.rs
use crate::models::{
    Holding, HoldingImportItem, HoldingImportPreview, HoldingImportResult, ImportStatus,
    ParsedHoldingRow,
};
use std::collections::HashMap;
use std::fmt::Display;

/// Cost basis differences up to and including this amount are not a change.
pub const COST_TOLERANCE: f64 = 0.01;

// absorbs binary representation error so that e.g. 100.01 - 100.00 sits on the boundary
const FLOAT_SLACK: f64 = 1e-9;

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Create,
    /// Carries the stored holding as it was before the import.
    Update(Holding),
    Skip(Holding),
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlannedRow {
    pub row: ParsedHoldingRow,
    pub action: Action,
}

impl PlannedRow {
    pub fn status(&self) -> ImportStatus {
        match self.action {
            Action::Create => ImportStatus::New,
            Action::Update(_) => ImportStatus::Update,
            Action::Skip(_) => ImportStatus::Skip,
        }
    }

    pub fn message(&self) -> Option<String> {
        match &self.action {
            Action::Create => None,
            // Debug keeps a trailing `.0` on whole quantities ("20.0 shares")
            Action::Update(existing) => Some(format!(
                "Current: {:?} shares @ ${:.2}",
                existing.quantity, existing.avg_cost_basis
            )),
            Action::Skip(_) => Some("Already exists with same values".to_string()),
        }
    }

    fn to_item(&self) -> HoldingImportItem {
        HoldingImportItem {
            ticker: self.row.ticker.clone(),
            quantity: self.row.quantity,
            avg_cost_basis: self.row.avg_cost_basis,
            status: self.status(),
            message: self.message(),
        }
    }
}

pub fn differs(existing: &Holding, row: &ParsedHoldingRow) -> bool {
    existing.quantity != row.quantity
        || (existing.avg_cost_basis - row.avg_cost_basis).abs() - COST_TOLERANCE > FLOAT_SLACK
}

/// Classifies each consolidated row against the caller's current holdings.
/// Preview and apply both go through here.
pub fn reconcile(rows: &[ParsedHoldingRow], existing: &[Holding]) -> Vec<PlannedRow> {
    let by_ticker: HashMap<&str, &Holding> =
        existing.iter().map(|h| (h.ticker.as_str(), h)).collect();

    rows.iter()
        .map(|row| {
            let action = match by_ticker.get(row.ticker.as_str()) {
                None => Action::Create,
                Some(holding) if differs(holding, row) => Action::Update((*holding).clone()),
                Some(holding) => Action::Skip((*holding).clone()),
            };
            PlannedRow {
                row: row.clone(),
                action,
            }
        })
        .collect()
}

pub fn preview(plan: &[PlannedRow], errors: Vec<String>) -> HoldingImportPreview {
    let count = |status: ImportStatus| plan.iter().filter(|p| p.status() == status).count();
    HoldingImportPreview {
        holdings: plan.iter().map(PlannedRow::to_item).collect(),
        total_new: count(ImportStatus::New),
        total_update: count(ImportStatus::Update),
        total_skip: count(ImportStatus::Skip),
        errors,
    }
}

/// Running totals for an apply pass. Starts from the parse errors so that
/// processing failures land after them.
#[derive(Debug, Default)]
pub struct ImportTally {
    result: HoldingImportResult,
}

impl ImportTally {
    pub fn new(parse_errors: Vec<String>) -> Self {
        ImportTally {
            result: HoldingImportResult {
                errors: parse_errors,
                ..Default::default()
            },
        }
    }

    pub fn record<E: Display>(&mut self, ticker: &str, outcome: Result<ImportStatus, E>) {
        match outcome {
            Ok(ImportStatus::New) => self.result.imported += 1,
            Ok(ImportStatus::Update) => self.result.updated += 1,
            Ok(ImportStatus::Skip) => self.result.skipped += 1,
            Err(e) => self
                .result
                .errors
                .push(format!("Failed to process {}: {}", ticker, e)),
        }
    }

    pub fn finish(self) -> HoldingImportResult {
        self.result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(ticker: &str, quantity: f64, cost: f64) -> ParsedHoldingRow {
        ParsedHoldingRow {
            ticker: ticker.to_string(),
            quantity,
            avg_cost_basis: cost,
        }
    }

    fn holding(ticker: &str, quantity: f64, cost: f64) -> Holding {
        Holding::new("user-1", ticker, quantity, cost)
    }

    #[test]
    fn unseen_ticker_is_new() {
        let plan = reconcile(&[row("AAPL", 10.0, 150.0)], &[holding("MSFT", 1.0, 1.0)]);
        assert_eq!(plan[0].action, Action::Create);
        assert_eq!(plan[0].message(), None);
    }

    #[test]
    fn matching_values_skip_and_quantity_change_updates() {
        let existing = vec![holding("MSFT", 20.0, 300.0)];
        let same = reconcile(&[row("MSFT", 20.0, 300.0)], &existing);
        assert_eq!(same[0].status(), ImportStatus::Skip);
        assert_eq!(
            same[0].message().as_deref(),
            Some("Already exists with same values")
        );

        let more = reconcile(&[row("MSFT", 25.0, 300.0)], &existing);
        assert_eq!(more[0].status(), ImportStatus::Update);
        assert_eq!(
            more[0].message().as_deref(),
            Some("Current: 20.0 shares @ $300.00")
        );

        let fractional = vec![holding("VTI", 2.5, 10.126)];
        let plan = reconcile(&[row("VTI", 3.0, 10.126)], &fractional);
        assert_eq!(
            plan[0].message().as_deref(),
            Some("Current: 2.5 shares @ $10.13")
        );
    }

    #[test]
    fn cost_tolerance_boundary_is_strict() {
        let existing = vec![holding("AAPL", 10.0, 100.0)];
        assert_eq!(
            reconcile(&[row("AAPL", 10.0, 100.01)], &existing)[0].status(),
            ImportStatus::Skip
        );
        assert_eq!(
            reconcile(&[row("AAPL", 10.0, 99.99)], &existing)[0].status(),
            ImportStatus::Skip
        );
        assert_eq!(
            reconcile(&[row("AAPL", 10.0, 100.011)], &existing)[0].status(),
            ImportStatus::Update
        );
    }

    #[test]
    fn preview_counts_each_status() {
        let existing = vec![holding("MSFT", 20.0, 300.0), holding("GOOG", 1.0, 90.0)];
        let plan = reconcile(
            &[
                row("AAPL", 1.0, 1.0),
                row("MSFT", 20.0, 300.0),
                row("GOOG", 2.0, 90.0),
            ],
            &existing,
        );
        let preview = preview(&plan, vec!["Row 5: Empty ticker symbol".to_string()]);
        assert_eq!(
            (preview.total_new, preview.total_update, preview.total_skip),
            (1, 1, 1)
        );
        assert_eq!(preview.holdings.len(), 3);
        assert_eq!(preview.holdings[2].status, ImportStatus::Update);
        assert_eq!(preview.errors.len(), 1);
    }

    #[test]
    fn tally_appends_failures_after_parse_errors() {
        let mut tally = ImportTally::new(vec!["Row 2: Not enough columns".to_string()]);
        tally.record::<String>("AAPL", Ok(ImportStatus::New));
        tally.record::<String>("MSFT", Ok(ImportStatus::Update));
        tally.record::<String>("GOOG", Ok(ImportStatus::Skip));
        tally.record("TSLA", Err("connection reset"));
        let result = tally.finish();
        assert_eq!((result.imported, result.updated, result.skipped), (1, 1, 1));
        assert_eq!(
            result.errors,
            vec![
                "Row 2: Not enough columns".to_string(),
                "Failed to process TSLA: connection reset".to_string(),
            ]
        );
    }
}
