//! Read side: wildcard stock search and `EUR_XXX` rate lookup, both over a
//! consistent store snapshot.

use regex::{Regex, RegexBuilder};
use serde::Serialize;
use std::sync::LazyLock;

use crate::model::StockRecord;
use crate::store::DataStore;

static RATE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^EUR_(\w{3})$").unwrap());

/// Errors surfaced by lookups.
#[derive(Debug)]
pub enum QueryError {
    InvalidPattern(String),
    NotFound(String),
}

impl std::fmt::Display for QueryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidPattern(msg) | Self::NotFound(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for QueryError {}

/// Successful rate lookup.
#[derive(Debug, Clone, Serialize)]
pub struct RateResult {
    pub pair: String,
    pub value: f64,
    pub upload_date: String,
    pub datasource_name: String,
}

/// Compile the user's query into a case-insensitive matcher.
///
/// The text is escaped first (user input never reaches the regex engine
/// raw) and `%` is the only wildcard, translated to `.*`. Matching is
/// substring-anywhere, not full-field.
fn build_matcher(query: &str) -> Regex {
    let pattern = regex::escape(query).replace('%', ".*");
    RegexBuilder::new(&pattern)
        .case_insensitive(true)
        .build()
        .expect("escaped pattern always compiles")
}

/// Search the merged stock view. An empty or absent query returns everything.
pub async fn search_stocks(store: &DataStore, query: Option<&str>) -> Vec<StockRecord> {
    let tables = store.stock_snapshots().await;
    let all = tables.iter().flat_map(|records| records.iter());

    match query.filter(|q| !q.is_empty()) {
        None => all.cloned().collect(),
        Some(q) => {
            let matcher = build_matcher(q);
            all.filter(|stock| {
                matcher.is_match(&stock.name)
                    || matcher.is_match(&stock.symbol)
                    || stock
                        .isin
                        .as_deref()
                        .is_some_and(|isin| matcher.is_match(isin))
            })
            .cloned()
            .collect()
        }
    }
}

/// Look up one `EUR_XXX` pair in the active rate snapshot.
pub async fn lookup_rate(store: &DataStore, pattern: &str) -> Result<RateResult, QueryError> {
    let captures = RATE_PATTERN.captures(pattern).ok_or_else(|| {
        QueryError::InvalidPattern("Invalid pattern. Use format EUR_{CURRENCY}.".to_string())
    })?;
    let code = &captures[1];

    let not_found = || QueryError::NotFound(format!("Currency '{code}' not found."));
    let snapshot = store.rates_snapshot().await.ok_or_else(not_found)?;
    let value = snapshot.rates.get(code).copied().ok_or_else(not_found)?;

    Ok(RateResult {
        pair: pattern.to_string(),
        value,
        upload_date: snapshot.upload_date.clone(),
        datasource_name: snapshot.datasource_name.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::RateSnapshot;
    use std::collections::HashMap;

    fn record(symbol: &str, name: &str, isin: Option<&str>) -> StockRecord {
        StockRecord {
            name: name.to_string(),
            isin: isin.map(str::to_string),
            symbol: symbol.to_string(),
            currency: "EUR".to_string(),
            last_price: "1.00".to_string(),
            upload_date: "2024-01-01T00:00:00.000Z".to_string(),
            datasource_name: "euronext.csv".to_string(),
        }
    }

    async fn seeded_store() -> DataStore {
        let store = DataStore::new();
        store
            .replace_source(
                "euronext.csv",
                vec![
                    record("APPLE", "Apple Distribution", Some("FR0000000001")),
                    record("AP", "AP Group", Some("FR0000000002")),
                    record("MAP", "Map Services", Some("FR0000000003")),
                ],
            )
            .await;
        store
    }

    async fn seeded_rates() -> DataStore {
        let store = DataStore::new();
        let mut rates = HashMap::new();
        rates.insert("USD".to_string(), 1.10);
        rates.insert("GBP".to_string(), 0.85);
        store
            .replace_rates(RateSnapshot {
                rates,
                upload_date: "2024-01-01T00:00:00.000Z".to_string(),
                datasource_name: "eurofxref.csv".to_string(),
            })
            .await;
        store
    }

    #[tokio::test]
    async fn empty_query_returns_everything() {
        let store = seeded_store().await;
        assert_eq!(search_stocks(&store, None).await.len(), 3);
        assert_eq!(search_stocks(&store, Some("")).await.len(), 3);
    }

    #[tokio::test]
    async fn wildcard_matches_substring_anywhere() {
        let store = seeded_store().await;

        // `AP%` carries no anchor: AP anywhere in a field qualifies, so
        // APPLE, AP, and MAP (substring at offset 1) all match.
        let symbols: Vec<String> = search_stocks(&store, Some("AP%"))
            .await
            .into_iter()
            .map(|r| r.symbol)
            .collect();
        assert_eq!(symbols, vec!["APPLE", "AP", "MAP"]);

        // Anchoring the wildcard on both sides narrows nothing further:
        // substring semantics make `%AP%` equivalent to `AP`.
        assert_eq!(search_stocks(&store, Some("%AP%")).await.len(), 3);
    }

    #[tokio::test]
    async fn match_is_case_insensitive_over_name_symbol_and_isin() {
        let store = seeded_store().await;

        assert_eq!(search_stocks(&store, Some("apple")).await.len(), 1);
        assert_eq!(search_stocks(&store, Some("fr00000000")).await.len(), 3);
        assert_eq!(search_stocks(&store, Some("group")).await.len(), 1);
    }

    #[tokio::test]
    async fn records_without_isin_are_skipped_for_isin_matching() {
        let store = DataStore::new();
        store
            .replace_source("us.csv", vec![record("AAPL", "Apple Inc.", None)])
            .await;

        assert!(search_stocks(&store, Some("FR0000")).await.is_empty());
        assert_eq!(search_stocks(&store, Some("AAPL")).await.len(), 1);
    }

    #[tokio::test]
    async fn regex_metacharacters_in_queries_are_literal() {
        let store = DataStore::new();
        store
            .replace_source(
                "euronext.csv",
                vec![record("DOT", "A.B Holdings", Some("FR0000000009"))],
            )
            .await;

        // `.` must not act as a regex wildcard.
        assert_eq!(search_stocks(&store, Some("A.B")).await.len(), 1);
        assert!(search_stocks(&store, Some("AXB")).await.is_empty());
        // Pathological pattern input is inert after escaping.
        assert!(search_stocks(&store, Some("(a+)+$")).await.is_empty());
    }

    #[tokio::test]
    async fn rate_lookup_returns_value_and_snapshot_metadata() {
        let store = seeded_rates().await;

        let usd = lookup_rate(&store, "EUR_USD").await.unwrap();
        assert_eq!(usd.value, 1.10);
        assert_eq!(usd.pair, "EUR_USD");
        assert_eq!(usd.datasource_name, "eurofxref.csv");

        let gbp = lookup_rate(&store, "EUR_GBP").await.unwrap();
        assert_eq!(gbp.value, 0.85);
    }

    #[tokio::test]
    async fn unknown_currency_and_empty_store_are_not_found() {
        let store = seeded_rates().await;
        let err = lookup_rate(&store, "EUR_XYZ").await.unwrap_err();
        assert!(matches!(err, QueryError::NotFound(_)));

        let empty = DataStore::new();
        let err = lookup_rate(&empty, "EUR_USD").await.unwrap_err();
        assert!(matches!(err, QueryError::NotFound(_)));
    }

    #[tokio::test]
    async fn malformed_pairs_are_invalid_patterns() {
        let store = seeded_rates().await;
        for pattern in ["USD_EUR", "EURUSD", "EUR_US", "EUR_USDX", "eur_usd"] {
            let err = lookup_rate(&store, pattern).await.unwrap_err();
            assert!(
                matches!(err, QueryError::InvalidPattern(_)),
                "expected InvalidPattern for {pattern}",
            );
        }
    }
}
