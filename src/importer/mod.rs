// src/importer/mod.rs
//! Brokerage CSV import.
//!
//! Turns decoded CSV text into consolidated holding rows and classifies them
//! against a user's current holdings. Nothing here performs I/O; the service
//! layer loads holdings before and persists the outcome after.

pub mod columns;
pub mod consolidate;
pub mod dialect;
pub mod parse;
pub mod reconcile;

use crate::models::ParsedHoldingRow;
use columns::ColumnMap;
use log::info;
use thiserror::Error;

/// Errors that abort a whole parse.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ImportError {
    #[error("CSV file must have a header row and at least one data row")]
    EmptyFile,
    #[error(
        "Could not find {column} column. Expected one of: {}",
        .candidates.join(", ")
    )]
    MissingColumn {
        column: &'static str,
        candidates: &'static [&'static str],
    },
    #[error("Failed to parse CSV: {0}")]
    Malformed(String),
}

/// Output of a parse: one row per distinct ticker plus row-level diagnostics.
#[derive(Debug, Default)]
pub struct ParsedHoldings {
    pub holdings: Vec<ParsedHoldingRow>,
    pub errors: Vec<String>,
}

impl From<ImportError> for ParsedHoldings {
    fn from(e: ImportError) -> Self {
        ParsedHoldings {
            holdings: Vec::new(),
            errors: vec![e.to_string()],
        }
    }
}

/// Parses and consolidates. Fatal errors become the single entry of `errors`.
pub fn parse_holdings(content: &str) -> ParsedHoldings {
    try_parse_holdings(content).unwrap_or_else(ParsedHoldings::from)
}

pub fn try_parse_holdings(content: &str) -> Result<ParsedHoldings, ImportError> {
    let dialect = dialect::detect(content);
    let records = parse::read_records(content, dialect)?;

    let (headers, data) = match records.split_first() {
        Some((headers, data)) if !data.is_empty() => (headers, data),
        _ => return Err(ImportError::EmptyFile),
    };

    let columns = ColumnMap::resolve(headers)?;
    let parsed = parse::parse_rows(data, &columns);
    let merged = consolidate::consolidate(parsed.rows);
    let mut errors = parsed.errors;
    errors.extend(merged.errors);

    info!(
        "Parsed {} data rows into {} holdings ({} row errors)",
        data.len(),
        merged.rows.len(),
        errors.len()
    );

    Ok(ParsedHoldings {
        holdings: merged.rows,
        errors,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn consolidates_duplicate_lots() {
        let parsed = parse_holdings("Symbol,Shares,Avg Cost\nAAPL,10,150.00\nAAPL,5,180.00\n");
        assert!(parsed.errors.is_empty());
        assert_eq!(
            parsed.holdings,
            vec![ParsedHoldingRow {
                ticker: "AAPL".to_string(),
                quantity: 15.0,
                avg_cost_basis: 160.0,
            }]
        );
    }

    #[test]
    fn cash_line_contributes_nothing() {
        let parsed = parse_holdings("Symbol,Shares,Avg Cost\nCASH,1000,1.00\nMSFT,2,300\n");
        assert!(parsed.errors.is_empty());
        assert_eq!(parsed.holdings.len(), 1);
        assert_eq!(parsed.holdings[0].ticker, "MSFT");
    }

    #[test]
    fn header_only_is_empty_file() {
        let err = try_parse_holdings("Symbol,Shares\n").unwrap_err();
        assert_eq!(err, ImportError::EmptyFile);

        let parsed = parse_holdings("Symbol,Shares\n");
        assert!(parsed.holdings.is_empty());
        assert_eq!(
            parsed.errors,
            vec!["CSV file must have a header row and at least one data row".to_string()]
        );
        assert_eq!(try_parse_holdings("").unwrap_err(), ImportError::EmptyFile);
    }

    #[test]
    fn unknown_headers_report_ticker_aliases() {
        let err = try_parse_holdings("Date,Amount\n2024-01-01,5\n").unwrap_err();
        assert!(matches!(
            err,
            ImportError::MissingColumn {
                column: "ticker/symbol",
                ..
            }
        ));
        let parsed = parse_holdings("Date,Amount\n2024-01-01,5\n");
        assert_eq!(parsed.errors.len(), 1);
        assert!(parsed.errors[0].contains("symbol, ticker, stock symbol, instrument"));
    }

    #[test]
    fn missing_cost_column_defaults_to_zero() {
        let parsed = parse_holdings("Ticker,Quantity\nnvda,4\n");
        assert_eq!(parsed.holdings[0].avg_cost_basis, 0.0);
        assert_eq!(parsed.holdings[0].ticker, "NVDA");
    }

    #[test]
    fn well_formed_rows_are_lossless() {
        let csv = "Symbol,Quantity,Price\n aapl ,10,150.5\nmsft,2,300.25\nGoog,1.5,99\n";
        let parsed = parse_holdings(csv);
        assert!(parsed.errors.is_empty());
        let tickers: Vec<&str> = parsed.holdings.iter().map(|h| h.ticker.as_str()).collect();
        assert_eq!(tickers, vec!["AAPL", "MSFT", "GOOG"]);
        assert_eq!(parsed.holdings[0].avg_cost_basis, 150.5);
        assert_eq!(parsed.holdings[2].quantity, 1.5);
    }

    #[test]
    fn semicolon_export_with_currency_values() {
        let csv = "Instrument;Units;Purchase Price\nVTI;\"1,200\";\"$210.50\"\nBND;3;$72\n";
        let parsed = parse_holdings(csv);
        assert!(parsed.errors.is_empty(), "{:?}", parsed.errors);
        assert_eq!(parsed.holdings[0].quantity, 1200.0);
        assert_eq!(parsed.holdings[0].avg_cost_basis, 210.5);
        assert_eq!(parsed.holdings[1].avg_cost_basis, 72.0);
    }

    #[test]
    fn row_errors_accumulate_alongside_valid_data() {
        let csv = "Symbol,Shares,Avg Cost\nAAPL,10,150\n,3,1\nMSFT,abc,2\nTSLA\nGOOG,2,100\n";
        let parsed = parse_holdings(csv);
        assert_eq!(
            parsed.errors,
            vec![
                "Row 3: Empty ticker symbol".to_string(),
                "Row 4: Invalid quantity for MSFT".to_string(),
                "Row 5: Not enough columns".to_string(),
            ]
        );
        assert_eq!(parsed.holdings.len(), 2);
    }

    #[test]
    fn blank_lines_keep_row_numbers_aligned() {
        let expected = vec![
            "Row 3: Not enough columns".to_string(),
            "Row 4: Invalid quantity for MSFT".to_string(),
        ];
        let parsed = parse_holdings("Symbol,Shares\nAAPL,1\n\nMSFT,x\n");
        assert_eq!(parsed.errors, expected);
        assert_eq!(parsed.holdings.len(), 1);

        let parsed = parse_holdings("Symbol,Shares\r\nAAPL,1\r\n\r\nMSFT,x\r\n");
        assert_eq!(parsed.errors, expected);
    }

    #[test]
    fn overflowing_duplicate_lots_become_an_error() {
        let parsed = parse_holdings("Symbol,Shares,Avg Cost\nA,1e308,1\nMSFT,x,1\nA,1e308,2\nB,1,5\n");
        assert_eq!(
            parsed.errors,
            vec![
                "Row 3: Invalid quantity for MSFT".to_string(),
                "Invalid combined quantity or cost for A".to_string(),
            ]
        );
        assert_eq!(parsed.holdings.len(), 1);
        assert_eq!(parsed.holdings[0].ticker, "B");
        assert!(parsed.holdings.iter().all(|h| h.quantity.is_finite()));
    }

    #[test]
    fn trailing_blank_line_is_a_short_row() {
        let parsed = parse_holdings("Symbol,Shares\nAAPL,1\n\n");
        assert_eq!(parsed.holdings.len(), 1);
        assert_eq!(parsed.errors, vec!["Row 3: Not enough columns".to_string()]);
    }
}
