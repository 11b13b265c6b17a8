use std::sync::Arc;

use crate::services::Recommender;

/// Shared application state
///
/// Everything here is immutable after startup, so no locking is needed.
#[derive(Clone)]
pub struct AppState {
    pub recommender: Arc<Recommender>,
    /// Result size used when a request does not specify one
    pub default_top_k: usize,
}

impl AppState {
    pub fn new(recommender: Arc<Recommender>, default_top_k: usize) -> Self {
        Self {
            recommender,
            default_top_k,
        }
    }
}
