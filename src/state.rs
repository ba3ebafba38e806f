//! Application state shared by the web handlers and the CLI.

use std::sync::Arc;

use crate::lectures::{Aggregator, DayLimits};

#[derive(Clone)]
pub struct AppState {
    pub aggregator: Arc<Aggregator>,
    pub limits: DayLimits,
}

impl AppState {
    pub fn new(aggregator: Arc<Aggregator>, limits: DayLimits) -> Self {
        Self { aggregator, limits }
    }
}
