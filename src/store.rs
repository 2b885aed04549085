//! In-memory data store: the only shared mutable resource in the process.
//!
//! All mutation goes through whole-snapshot swaps. Readers clone `Arc`
//! handles under a read lock, so a concurrent refresh is either fully
//! visible or not at all, never a torn mix, and long-running work
//! (fetching, parsing) never holds a lock a query needs.

use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::model::{RateSnapshot, StockRecord};

#[derive(Default)]
pub struct DataStore {
    stocks: RwLock<BTreeMap<String, Arc<Vec<StockRecord>>>>,
    rates: RwLock<Option<Arc<RateSnapshot>>>,
}

impl DataStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomically replace the record list for one source.
    pub async fn replace_source(&self, source_name: &str, records: Vec<StockRecord>) {
        let records = Arc::new(records);
        self.stocks
            .write()
            .await
            .insert(source_name.to_string(), records);
    }

    /// Atomically replace the single active rate snapshot.
    pub async fn replace_rates(&self, snapshot: RateSnapshot) {
        *self.rates.write().await = Some(Arc::new(snapshot));
    }

    /// Point-in-time view of every source's current records, in stable
    /// source-name order. Sources refreshed at different times may coexist;
    /// no single source is ever observed half-replaced.
    pub async fn stock_snapshots(&self) -> Vec<Arc<Vec<StockRecord>>> {
        self.stocks.read().await.values().cloned().collect()
    }

    pub async fn rates_snapshot(&self) -> Option<Arc<RateSnapshot>> {
        self.rates.read().await.clone()
    }

    pub async fn source_count(&self) -> usize {
        self.stocks.read().await.len()
    }

    pub async fn stock_record_count(&self) -> usize {
        self.stocks.read().await.values().map(|v| v.len()).sum()
    }
}
