// src/importer/dialect.rs
//! Delimiter and quote detection for uploaded brokerage exports.

/// Number of leading characters inspected when sniffing.
pub const SAMPLE_CHARS: usize = 2048;

const DELIMITER_CANDIDATES: [u8; 4] = [b',', b';', b'\t', b'|'];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dialect {
    pub delimiter: u8,
    pub quote: u8,
}

impl Default for Dialect {
    fn default() -> Self {
        Dialect {
            delimiter: b',',
            quote: b'"',
        }
    }
}

/// Detects the dialect from the head of `content`, falling back to comma/double-quote.
pub fn detect(content: &str) -> Dialect {
    sniff(leading_sample(content)).unwrap_or_default()
}

fn leading_sample(content: &str) -> &str {
    match content.char_indices().nth(SAMPLE_CHARS) {
        Some((end, _)) => &content[..end],
        None => content,
    }
}

/// Picks the delimiter whose per-line count is highest and most consistent.
/// Returns `None` when no candidate appears in the first line.
pub fn sniff(sample: &str) -> Option<Dialect> {
    let lines: Vec<&str> = sample
        .lines()
        .filter(|l| !l.trim().is_empty())
        .take(10)
        .collect();
    if lines.is_empty() {
        return None;
    }

    let quote = detect_quote(sample);
    let mut best: Option<(u8, usize)> = None;
    for delimiter in DELIMITER_CANDIDATES {
        let score = score_delimiter(&lines, delimiter, quote);
        if score > 0 && best.map_or(true, |(_, s)| score > s) {
            best = Some((delimiter, score));
        }
    }

    best.map(|(delimiter, _)| Dialect { delimiter, quote })
}

fn score_delimiter(lines: &[&str], delimiter: u8, quote: u8) -> usize {
    let counts: Vec<usize> = lines
        .iter()
        .map(|line| count_unquoted(line, delimiter, quote))
        .collect();

    let first = counts[0];
    if first == 0 {
        return 0;
    }
    let consistent = counts.iter().filter(|&&c| c == first).count();
    first * consistent
}

fn count_unquoted(line: &str, delimiter: u8, quote: u8) -> usize {
    let mut in_quotes = false;
    let mut count = 0;
    for b in line.bytes() {
        if b == quote {
            in_quotes = !in_quotes;
        } else if b == delimiter && !in_quotes {
            count += 1;
        }
    }
    count
}

// Single quotes only win when they wrap a whole field and double quotes never appear.
fn detect_quote(sample: &str) -> u8 {
    if sample.contains('"') {
        return b'"';
    }
    let wraps_single = sample.lines().any(|line| {
        line.split(|c: char| c == ',' || c == ';' || c == '\t' || c == '|')
            .map(str::trim)
            .any(|field| field.len() >= 2 && field.starts_with('\'') && field.ends_with('\''))
    });
    if wraps_single {
        b'\''
    } else {
        b'"'
    }
}
