pub mod handlers;
pub mod routes;

pub use routes::*;

use crate::indexer::Indexer;
use crate::search::TownSearch;
use crate::towns::TownService;
use std::sync::Arc;
use std::time::Instant;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub towns: TownService,
    pub search: Arc<TownSearch>,
    pub indexer: Arc<Indexer>,
    pub started_at: Instant,
    pub prometheus_enabled: bool,
}

impl AppState {
    pub fn new(towns: TownService, search: Arc<TownSearch>, indexer: Arc<Indexer>) -> Self {
        Self {
            towns,
            search,
            indexer,
            started_at: Instant::now(),
            prometheus_enabled: true,
        }
    }

    pub fn with_prometheus(mut self, enabled: bool) -> Self {
        self.prometheus_enabled = enabled;
        self
    }
}
