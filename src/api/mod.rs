pub mod rest;

use crate::config::Config;
use crate::resolver::{AcceptAll, PathFilter};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    /// Shared connection pool. Credentials are still minted per request.
    pub http: reqwest::Client,
    /// Pluggable mirror filter; the default accepts every path.
    pub filter: Arc<dyn PathFilter>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
            filter: Arc::new(AcceptAll),
        }
    }
}
