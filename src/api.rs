//! HTTP API for the debate service

mod handlers;
mod types;

pub use handlers::create_router;

use crate::debate::DebateService;
use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub debate: Arc<DebateService>,
}

impl AppState {
    pub fn new(debate: DebateService) -> Self {
        Self {
            debate: Arc::new(debate),
        }
    }
}
