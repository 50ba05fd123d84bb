// src/importer/consolidate.rs
use super::parse::RowAccumulator;
use crate::models::ParsedHoldingRow;
use log::warn;
use std::collections::HashMap;

struct Lot {
    ticker: String,
    quantity: f64,
    cost_total: f64,
    first_cost: f64,
    rows: usize,
}

/// Merges rows sharing a ticker into one quantity-weighted row, keeping first-seen order.
///
/// A ticker whose combined quantity or cost leaves the `f64` range is dropped
/// and reported in `errors`.
pub fn consolidate(rows: Vec<ParsedHoldingRow>) -> RowAccumulator {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut lots: Vec<Lot> = Vec::new();

    for row in rows {
        match index.get(&row.ticker) {
            Some(&i) => {
                let lot = &mut lots[i];
                lot.quantity += row.quantity;
                lot.cost_total += row.quantity * row.avg_cost_basis;
                lot.rows += 1;
            }
            None => {
                index.insert(row.ticker.clone(), lots.len());
                lots.push(Lot {
                    cost_total: row.quantity * row.avg_cost_basis,
                    first_cost: row.avg_cost_basis,
                    quantity: row.quantity,
                    ticker: row.ticker,
                    rows: 1,
                });
            }
        }
    }

    lots.into_iter()
        .fold(RowAccumulator::default(), |mut acc, lot| {
            // a single lot keeps its cost exactly as parsed
            let avg_cost_basis = if lot.rows == 1 {
                lot.first_cost
            } else {
                round_cents(lot.cost_total / lot.quantity)
            };
            if lot.quantity.is_finite() && avg_cost_basis.is_finite() {
                acc.rows.push(ParsedHoldingRow {
                    ticker: lot.ticker,
                    quantity: lot.quantity,
                    avg_cost_basis,
                });
            } else {
                warn!("Dropping {}: combined {} rows overflow", lot.ticker, lot.rows);
                acc.errors.push(format!(
                    "Invalid combined quantity or cost for {}",
                    lot.ticker
                ));
            }
            acc
        })
}

fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
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

    #[test]
    fn merges_lots_with_weighted_cost() {
        let merged = consolidate(vec![row("AAPL", 10.0, 150.0), row("AAPL", 5.0, 180.0)]);
        assert!(merged.errors.is_empty());
        assert_eq!(merged.rows, vec![row("AAPL", 15.0, 160.0)]);
    }

    #[test]
    fn weighted_mean_is_order_independent() {
        let lots = vec![
            row("VTI", 3.0, 201.17),
            row("VTI", 7.5, 210.33),
            row("VTI", 1.25, 188.90),
        ];
        let forward = consolidate(lots.clone()).rows;
        let mut reversed = lots.clone();
        reversed.reverse();
        let backward = consolidate(reversed).rows;
        let rotated = consolidate(vec![lots[1].clone(), lots[2].clone(), lots[0].clone()]).rows;

        assert_eq!(forward, backward);
        assert_eq!(forward, rotated);
        assert_eq!(forward[0].quantity, 11.75);
    }

    #[test]
    fn keeps_first_occurrence_order() {
        let merged = consolidate(vec![
            row("MSFT", 1.0, 300.0),
            row("AAPL", 1.0, 150.0),
            row("MSFT", 1.0, 310.0),
            row("GOOG", 2.0, 100.0),
        ])
        .rows;
        let tickers: Vec<&str> = merged.iter().map(|r| r.ticker.as_str()).collect();
        assert_eq!(tickers, vec!["MSFT", "AAPL", "GOOG"]);
        assert_eq!(merged[0], row("MSFT", 2.0, 305.0));
    }

    #[test]
    fn single_rows_pass_through_unrounded() {
        let merged = consolidate(vec![row("AAPL", 10.0, 150.1234), row("MSFT", 20.0, 300.0)]).rows;
        assert_eq!(merged, vec![row("AAPL", 10.0, 150.1234), row("MSFT", 20.0, 300.0)]);
    }

    #[test]
    fn merged_cost_is_rounded_to_cents() {
        let merged = consolidate(vec![row("X", 1.0, 1.0), row("X", 2.0, 2.0)]).rows;
        // 5 / 3 = 1.666..
        assert_eq!(merged[0].avg_cost_basis, 1.67);
    }

    #[test]
    fn empty_input_yields_nothing() {
        let merged = consolidate(Vec::new());
        assert!(merged.rows.is_empty());
        assert!(merged.errors.is_empty());
    }

    #[test]
    fn overflowing_merge_is_reported_not_kept() {
        let merged = consolidate(vec![
            row("A", 1e308, 1.0),
            row("B", 2.0, 10.0),
            row("A", 1e308, 2.0),
            row("C", 1e200, 1e200),
            row("C", 1.0, 1.0),
        ]);
        assert_eq!(merged.rows, vec![row("B", 2.0, 10.0)]);
        assert_eq!(
            merged.errors,
            vec![
                "Invalid combined quantity or cost for A".to_string(),
                "Invalid combined quantity or cost for C".to_string(),
            ]
        );
    }
}
