//! Registry of the known data sources.
//!
//! Each feed is addressed two ways: by its canonical file name (uploads and
//! the startup scan) and by a short refresh alias (the `/refresh/{source}`
//! path segment). Unrecognized names are rejected by the callers.

use crate::parser::StockVariant;

/// What a source's content parses into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Stocks(StockVariant),
    Rates,
}

/// Static description of one feed.
#[derive(Debug)]
pub struct SourceSpec {
    /// Canonical file name under the data directory.
    pub file_name: &'static str,
    /// Path segment accepted by `POST /refresh/{source}`.
    pub alias: &'static str,
    pub kind: SourceKind,
    /// Environment variable holding the remote URL, when the source is
    /// remote-refreshable at all.
    pub url_env: Option<&'static str>,
}

/// Canonical name the active rate snapshot is committed under, regardless of
/// the uploaded file's name.
pub const RATES_FILE: &str = "eurofxref.csv";

pub static SPECS: &[SourceSpec] = &[
    SourceSpec {
        file_name: "euronext.csv",
        alias: "euronext",
        kind: SourceKind::Stocks(StockVariant::Semicolon),
        url_env: Some("EURONEXT_DATA_URL"),
    },
    SourceSpec {
        file_name: "us.csv",
        alias: "us",
        kind: SourceKind::Stocks(StockVariant::Comma),
        url_env: None,
    },
    SourceSpec {
        file_name: RATES_FILE,
        alias: "rates",
        kind: SourceKind::Rates,
        url_env: Some("EURFX_RATES_URL"),
    },
];

pub fn by_file_name(file_name: &str) -> Option<&'static SourceSpec> {
    SPECS.iter().find(|s| s.file_name == file_name)
}

pub fn by_alias(alias: &str) -> Option<&'static SourceSpec> {
    SPECS.iter().find(|s| s.alias == alias)
}

pub fn rates_spec() -> &'static SourceSpec {
    by_file_name(RATES_FILE).expect("rates source is registered")
}
