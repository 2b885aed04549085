use std::sync::Arc;

use crate::config::Config;
use crate::refresh::Refresher;
use crate::store::DataStore;

/// Shared application state, passed to all route handlers via
/// `axum::extract::State`. The store is the single owner of the in-memory
/// snapshots; nothing is held in process-wide globals.
pub struct AppState {
    pub config: Config,
    pub store: Arc<DataStore>,
    pub refresher: Refresher,
}

impl AppState {
    pub fn new(config: Config) -> Arc<Self> {
        let store = Arc::new(DataStore::new());
        let refresher = Refresher::new(&config, Arc::clone(&store));
        Arc::new(Self {
            config,
            store,
            refresher,
        })
    }
}
