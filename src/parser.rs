//! Line-level normalization of the raw CSV feeds.
//!
//! The feeds are loosely structured: different delimiters, inconsistent
//! column counts, embedded quoting. Individual malformed lines are dropped
//! silently; only a file whose overall shape is wrong fails the source.

use chrono::{SecondsFormat, Utc};
use std::collections::HashMap;

use crate::model::{RateSnapshot, StockRecord};

/// Parsing rules for a stock feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockVariant {
    /// `;`-delimited listing: name, ISIN, symbol, market, currency, then
    /// open/high/low/last price columns. Fields may carry `"` quoting.
    Semicolon,
    /// `,`-delimited listing with a `Symbol,Name,...` header row and a
    /// `$`-prefixed last-sale column. No ISIN column.
    Comma,
}

/// Errors returned when a whole file cannot be parsed.
#[derive(Debug)]
pub enum ParseError {
    UnsupportedSource(String),
    /// No line in the file contained the source's required delimiter.
    NoDelimitedLines { source: String, delimiter: char },
    /// Rates file without at least a header line and one data line.
    MalformedRates,
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnsupportedSource(name) => write!(f, "Unsupported stock file: {name}"),
            Self::NoDelimitedLines { source, delimiter } => {
                write!(f, "Invalid or empty {source}: no '{delimiter}'-delimited lines")
            }
            Self::MalformedRates => {
                write!(f, "Invalid rates file: requires header and data lines.")
            }
        }
    }
}

impl std::error::Error for ParseError {}

fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn strip_quotes(field: &str) -> String {
    field.replace('"', "")
}

/// Parse one stock feed into normalized records.
///
/// Lines missing the delimiter or failing the variant's column checks are
/// dropped; the call fails only when no delimited line exists at all.
pub fn parse_stocks(
    variant: StockVariant,
    source_name: &str,
    content: &str,
) -> Result<Vec<StockRecord>, ParseError> {
    match variant {
        StockVariant::Semicolon => parse_semicolon(source_name, content),
        StockVariant::Comma => parse_comma(source_name, content),
    }
}

fn parse_semicolon(source_name: &str, content: &str) -> Result<Vec<StockRecord>, ParseError> {
    let lines: Vec<&str> = content.lines().filter(|l| l.contains(';')).collect();
    if lines.is_empty() {
        return Err(ParseError::NoDelimitedLines {
            source: source_name.to_string(),
            delimiter: ';',
        });
    }

    let upload_date = now_rfc3339();
    let mut records = Vec::new();
    for line in lines {
        let columns: Vec<&str> = line.split(';').collect();
        if columns.len() <= 3 || columns[0].is_empty() || columns[1].is_empty() || columns[2].is_empty()
        {
            continue;
        }

        let isin = strip_quotes(columns[1]);
        let currency = columns
            .get(4)
            .filter(|c| !c.is_empty())
            .map(|c| strip_quotes(c))
            .unwrap_or_else(|| "N/A".to_string());
        let last_price = columns
            .get(8)
            .filter(|c| !c.is_empty())
            .map(|c| strip_quotes(c).trim().to_string())
            .unwrap_or_else(|| "0".to_string());

        records.push(StockRecord {
            name: strip_quotes(columns[0]),
            isin: (!isin.is_empty()).then_some(isin),
            symbol: strip_quotes(columns[2]),
            currency,
            last_price,
            upload_date: upload_date.clone(),
            datasource_name: source_name.to_string(),
        });
    }
    Ok(records)
}

fn parse_comma(source_name: &str, content: &str) -> Result<Vec<StockRecord>, ParseError> {
    let lines: Vec<&str> = content.lines().filter(|l| l.contains(',')).collect();
    if lines.is_empty() {
        return Err(ParseError::NoDelimitedLines {
            source: source_name.to_string(),
            delimiter: ',',
        });
    }

    let upload_date = now_rfc3339();
    let mut records = Vec::new();
    for line in lines.iter().filter(|l| !l.starts_with("Symbol,Name,")) {
        let mut columns = line.split(',');
        let symbol = columns.next().unwrap_or("");
        let name = columns.next().unwrap_or("");
        let last_sale = columns.next().unwrap_or("");
        if symbol.is_empty() || name.is_empty() || last_sale.is_empty() {
            continue;
        }

        records.push(StockRecord {
            name: name.to_string(),
            isin: None,
            symbol: symbol.to_string(),
            currency: "USD".to_string(),
            last_price: last_sale.replace('$', ""),
            upload_date: upload_date.clone(),
            datasource_name: source_name.to_string(),
        });
    }
    Ok(records)
}

/// Parse an ECB-style rates file into a full replacement snapshot.
///
/// The header and the first data line are zipped positionally; every header
/// except the literal `Date` column becomes a currency code. Rows past the
/// first data row are ignored, as are fields that do not parse as a float.
pub fn parse_rates(source_name: &str, content: &str) -> Result<RateSnapshot, ParseError> {
    let lines: Vec<&str> = content.lines().filter(|l| l.contains(',')).collect();
    if lines.len() < 2 {
        return Err(ParseError::MalformedRates);
    }

    let values: Vec<&str> = lines[1].split(',').map(str::trim).collect();
    let mut rates = HashMap::new();
    for (index, header) in lines[0].split(',').map(str::trim).enumerate() {
        if header.is_empty() || header == "Date" {
            continue;
        }
        let Some(raw) = values.get(index).filter(|v| !v.is_empty()) else {
            continue;
        };
        if let Ok(value) = raw.parse::<f64>() {
            rates.insert(header.to_string(), value);
        }
    }

    Ok(RateSnapshot {
        rates,
        upload_date: now_rfc3339(),
        datasource_name: source_name.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const EURONEXT_SOURCE: &str = "euronext.csv";
    const US_SOURCE: &str = "us.csv";

    #[test]
    fn semicolon_lines_strip_quotes_from_every_field() {
        let content = "\"ACME HOLDING\";\"FR0000000001\";\"ACM\";\"XPAR\";\"EUR\";12.0;13.0;11.5;\"12.75\"\n";
        let records = parse_stocks(StockVariant::Semicolon, EURONEXT_SOURCE, content).unwrap();

        assert_eq!(records.len(), 1);
        let rec = &records[0];
        assert_eq!(rec.name, "ACME HOLDING");
        assert_eq!(rec.isin.as_deref(), Some("FR0000000001"));
        assert_eq!(rec.symbol, "ACM");
        assert_eq!(rec.currency, "EUR");
        assert_eq!(rec.last_price, "12.75");
        assert_eq!(rec.datasource_name, EURONEXT_SOURCE);
    }

    #[test]
    fn semicolon_currency_and_price_default_when_absent() {
        let content = "ACME;FR0000000001;ACM;XPAR\n";
        let records = parse_stocks(StockVariant::Semicolon, EURONEXT_SOURCE, content).unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].currency, "N/A");
        assert_eq!(records[0].last_price, "0");
    }

    #[test]
    fn semicolon_drops_malformed_lines_and_keeps_neighbors() {
        let content = "\
AAA CORP;FR0000000001;AAA;XPAR;EUR;1;2;3;4
;;missing leading fields
not delimited at all
BBB CORP;FR0000000002;BBB;XPAR;EUR;5;6;7;8
";
        let records = parse_stocks(StockVariant::Semicolon, EURONEXT_SOURCE, content).unwrap();

        let symbols: Vec<&str> = records.iter().map(|r| r.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["AAA", "BBB"]);
    }

    #[test]
    fn semicolon_file_without_delimiter_fails() {
        let err = parse_stocks(StockVariant::Semicolon, EURONEXT_SOURCE, "a,b,c\n").unwrap_err();
        assert!(matches!(err, ParseError::NoDelimitedLines { delimiter: ';', .. }));
    }

    #[test]
    fn comma_skips_header_and_strips_dollar_sign() {
        let content = "\
Symbol,Name,Last Sale,Net Change
AAPL,Apple Inc. Common Stock,$195.83,+1.02
MSFT,Microsoft Corporation,$420.55,-0.44
";
        let records = parse_stocks(StockVariant::Comma, US_SOURCE, content).unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].symbol, "AAPL");
        assert_eq!(records[0].last_price, "195.83");
        assert_eq!(records[0].currency, "USD");
        assert_eq!(records[0].isin, None);
        assert_eq!(records[1].symbol, "MSFT");
    }

    #[test]
    fn comma_requires_symbol_name_and_last_sale() {
        let content = "\
Symbol,Name,Last Sale
,Nameless Corp,$1.00
GOOD,Good Corp,$2.00
NOPRICE,No Price Corp,
";
        let records = parse_stocks(StockVariant::Comma, US_SOURCE, content).unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].symbol, "GOOD");
    }

    #[test]
    fn rates_zip_header_with_first_data_row_only() {
        let content = "Date,USD,GBP\n2024-01-01,1.10,0.85\n2023-12-31,1.09,0.84\n";
        let snapshot = parse_rates("eurofxref.csv", content).unwrap();

        assert_eq!(snapshot.rates.len(), 2);
        assert_eq!(snapshot.rates["USD"], 1.10);
        assert_eq!(snapshot.rates["GBP"], 0.85);
        assert_eq!(snapshot.datasource_name, "eurofxref.csv");
    }

    #[test]
    fn rates_skip_date_column_and_unparsable_fields() {
        let content = "Date,USD,JPY, \n2024-01-01,1.10,not-a-number,9.9\n";
        let snapshot = parse_rates("eurofxref.csv", content).unwrap();

        assert_eq!(snapshot.rates.len(), 1);
        assert_eq!(snapshot.rates["USD"], 1.10);
        assert!(!snapshot.rates.contains_key("Date"));
        assert!(!snapshot.rates.contains_key("JPY"));
    }

    #[test]
    fn rates_file_without_data_row_fails() {
        let err = parse_rates("eurofxref.csv", "Date,USD\n").unwrap_err();
        assert!(matches!(err, ParseError::MalformedRates));
    }

    #[test]
    fn reparsing_identical_content_yields_identical_records_modulo_timestamp() {
        let content = "ACME;FR0000000001;ACM;XPAR;EUR;1;2;3;4\n";
        let mut first = parse_stocks(StockVariant::Semicolon, EURONEXT_SOURCE, content).unwrap();
        let mut second = parse_stocks(StockVariant::Semicolon, EURONEXT_SOURCE, content).unwrap();

        for rec in first.iter_mut().chain(second.iter_mut()) {
            rec.upload_date.clear();
        }
        assert_eq!(first, second);
    }
}
