use std::sync::Arc;

use axum::extract::FromRef;
use sqlx::PgPool;

pub mod config;
pub mod error;
pub mod media;
pub mod player;
pub mod response;
pub mod stories;

use media::MediaResolver;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub media: Arc<dyn MediaResolver>,
}

impl FromRef<AppState> for PgPool {
    fn from_ref(app_state: &AppState) -> PgPool {
        app_state.pool.clone()
    }
}
