// src/importer/parse.rs
use super::columns::ColumnMap;
use super::dialect::Dialect;
use super::ImportError;
use crate::models::ParsedHoldingRow;
use csv::{ReaderBuilder, StringRecord};
use log::debug;

/// Tickers that brokerages use for non-stock lines.
const RESERVED_TICKERS: &[&str] = &["CASH", "PENDING", "N/A", ""];

/// Rows that parsed cleanly plus diagnostics for the ones that did not.
#[derive(Debug, Default)]
pub struct RowAccumulator {
    pub rows: Vec<ParsedHoldingRow>,
    pub errors: Vec<String>,
}

/// Reads every record of `content` as raw fields.
///
/// Blank lines come back as empty records so that row numbers match the
/// lines of the file; the `csv` reader itself skips them.
pub fn read_records(content: &str, dialect: Dialect) -> Result<Vec<Vec<String>>, ImportError> {
    let mut reader = ReaderBuilder::new()
        .delimiter(dialect.delimiter)
        .quote(dialect.quote)
        .has_headers(false)
        .flexible(true)
        .from_reader(content.as_bytes());

    let bytes = content.as_bytes();
    let mut records = Vec::new();
    let mut record = StringRecord::new();
    let mut consumed = 0;
    loop {
        let more = reader
            .read_record(&mut record)
            .map_err(|e| ImportError::Malformed(e.to_string()))?;
        let end = if more {
            reader.position().byte() as usize
        } else {
            bytes.len()
        };

        // Whatever the reader skipped before this record is blank lines.
        let blanks = leading_blank_lines(bytes, consumed, end);
        records.extend(std::iter::repeat_with(Vec::new).take(blanks));

        if !more {
            break;
        }
        records.push(record.iter().map(str::to_string).collect());
        consumed = end;
    }

    Ok(records)
}

/// Counts the empty lines opening `bytes[start..end]`.
///
/// A record ended by `\r\n` is returned once the `\r` is read, so a `\n`
/// right after a `\r` belongs to the previous record.
fn leading_blank_lines(bytes: &[u8], start: usize, end: usize) -> usize {
    let mut rest = &bytes[start..end];
    if start > 0 && bytes[start - 1] == b'\r' {
        rest = rest.strip_prefix(b"\n").unwrap_or(rest);
    }

    let mut count = 0;
    loop {
        rest = match rest {
            [b'\r', b'\n', tail @ ..] | [b'\n', tail @ ..] | [b'\r', tail @ ..] => tail,
            _ => return count,
        };
        count += 1;
    }
}

/// Parses data rows. `rows` excludes the header; the first data row is reported as "Row 2".
pub fn parse_rows(rows: &[Vec<String>], columns: &ColumnMap) -> RowAccumulator {
    rows.iter()
        .enumerate()
        .fold(RowAccumulator::default(), |mut acc, (idx, row)| {
            match parse_row(row, columns, idx + 2) {
                Ok(Some(parsed)) => acc.rows.push(parsed),
                Ok(None) => {}
                Err(message) => acc.errors.push(message),
            }
            acc
        })
}

fn parse_row(
    row: &[String],
    columns: &ColumnMap,
    row_number: usize,
) -> Result<Option<ParsedHoldingRow>, String> {
    if row.len() < columns.required_width() {
        return Err(format!("Row {}: Not enough columns", row_number));
    }

    let ticker = row[columns.ticker].trim().to_uppercase();
    if ticker.is_empty() {
        return Err(format!("Row {}: Empty ticker symbol", row_number));
    }
    if RESERVED_TICKERS.contains(&ticker.as_str()) {
        debug!("Row {}: skipping non-stock line {}", row_number, ticker);
        return Ok(None);
    }

    let quantity = match parse_number(&row[columns.quantity]) {
        Some(q) if q > 0.0 => q,
        _ => return Err(format!("Row {}: Invalid quantity for {}", row_number, ticker)),
    };

    let avg_cost_basis = columns
        .cost
        .and_then(|idx| parse_number(&row[idx]))
        .unwrap_or(0.0);

    Ok(Some(ParsedHoldingRow {
        ticker,
        quantity,
        avg_cost_basis,
    }))
}

/// Parses a number after dropping currency symbols, thousands separators and whitespace.
pub fn parse_number(value: &str) -> Option<f64> {
    let cleaned: String = value
        .chars()
        .filter(|c| *c != '$' && *c != ',' && !c.is_whitespace())
        .collect();
    if cleaned.is_empty() || cleaned == "-" {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|n| n.is_finite())
}
