use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One normalized stock listing, produced from a single line of a stock feed.
///
/// Records are immutable once parsed and are kept per source in file order;
/// overlapping symbols across feeds are deliberately not deduplicated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockRecord {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub isin: Option<String>,
    pub symbol: String,
    pub currency: String,
    /// Last traded price, kept as the feed's decimal text (never re-rounded).
    pub last_price: String,
    pub upload_date: String,
    pub datasource_name: String,
}

/// Full replacement unit for the currency table: one active snapshot at a time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateSnapshot {
    /// 3-letter currency code → EUR exchange rate.
    pub rates: HashMap<String, f64>,
    pub upload_date: String,
    pub datasource_name: String,
}

/// What a completed refresh actually did.
#[derive(Debug, Clone, PartialEq)]
pub enum RefreshOutcome {
    Stocks { records_loaded: usize },
    Rates { currencies_loaded: usize },
    /// Remote refresh with no configured URL: a no-op, not a failure.
    Skipped { reason: String },
}
