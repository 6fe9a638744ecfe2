use std::sync::Arc;

use crate::infra::{aliases::DbPool, tokens::TokenKeys};

/// Shared state handed to every route.
#[derive(Clone)]
pub struct AppState {
    pub db_pool: DbPool,
    pub tokens: Arc<TokenKeys>,
}

impl AppState {
    pub fn new(db_pool: DbPool, tokens: TokenKeys) -> Self {
        Self {
            db_pool,
            tokens: Arc::new(tokens),
        }
    }
}
