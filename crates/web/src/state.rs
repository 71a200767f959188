//! Shared handler state.

use std::sync::Arc;

use crate::service::FinetuneService;

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<FinetuneService>,
}

impl AppState {
    pub fn new(service: FinetuneService) -> Self {
        Self {
            service: Arc::new(service),
        }
    }
}
