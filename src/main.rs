use std::sync::Arc;

use axum::{
    routing::{get, patch},
    Json, Router,
};
use dotenv::dotenv;
use serde_json::json;
use sqlx::postgres::PgPoolOptions;
use tracing::info;

use webstories_backend::{
    config::settings::Settings,
    media::{CloudinaryResolver, MediaResolver, NoopResolver},
    stories, AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt::init();

    let settings = Settings::new();

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&settings.database_url)
        .await?;

    sqlx::migrate!().run(&pool).await?;

    info!("database connected");

    let media: Arc<dyn MediaResolver> = match settings.cloudinary.clone() {
        Some(cloudinary) => Arc::new(CloudinaryResolver::new(cloudinary)),
        None => Arc::new(NoopResolver),
    };

    let app_state = AppState { pool, media };

    let story_router = Router::new()
        .route(
            "/",
            get(stories::handler::list_stories).post(stories::handler::create_story),
        )
        .route("/popular", get(stories::handler::get_popular_stories))
        .route("/categories", get(stories::handler::get_categories))
        .route(
            "/category/:category",
            get(stories::handler::get_stories_by_category),
        )
        .route("/search/:query", get(stories::handler::search_stories))
        .route(
            "/:id",
            get(stories::handler::get_story)
                .put(stories::handler::update_story)
                .delete(stories::handler::delete_story),
        )
        .route("/:id/like", patch(stories::handler::like_story))
        .route("/:id/view", patch(stories::handler::increment_views));

    let app = Router::new()
        .route(
            "/",
            get(|| async {
                Json(json!({
                    "message": "Web Stories Backend API",
                    "version": env!("CARGO_PKG_VERSION"),
                    "endpoints": {
                        "stories": "/api/stories",
                        "health": "/api/health"
                    }
                }))
            }),
        )
        .route(
            "/api/health",
            get(|| async {
                Json(json!({
                    "status": "OK",
                    "message": "Web Stories Backend is running",
                    "timestamp": chrono::Utc::now().to_rfc3339()
                }))
            }),
        )
        .nest("/api/stories", story_router)
        .with_state(app_state);

    info!("Server running on http://localhost:{}", settings.port);

    let listener = tokio::net::TcpListener::bind(settings.addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
