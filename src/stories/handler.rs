use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    error::AppError,
    response::{ApiResponse, EmptyData},
    stories::{repository, CreateStory, StoryResponse, UpdateStory},
    AppState,
};

/// Ids arrive as path strings and are parsed here so a malformed id gets the
/// 400 envelope instead of a framework rejection.
fn parse_story_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw).map_err(|_| AppError::BadRequest("Invalid story ID".to_string()))
}

fn to_responses(stories: Vec<crate::stories::Story>) -> Vec<StoryResponse> {
    stories.into_iter().map(StoryResponse::from).collect()
}

pub async fn list_stories(State(pool): State<PgPool>) -> Result<impl IntoResponse, AppError> {
    let stories = repository::list(&pool).await?;
    Ok(ApiResponse::collection(to_responses(stories)))
}

pub async fn get_story(
    State(pool): State<PgPool>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_story_id(&id)?;
    let story = repository::get(&pool, id).await?;
    Ok(ApiResponse::success(StoryResponse::from(story)))
}

pub async fn create_story(
    State(pool): State<PgPool>,
    Json(payload): Json<CreateStory>,
) -> Result<impl IntoResponse, AppError> {
    let new_story = payload.into_new_story().map_err(AppError::Validation)?;
    let story = repository::create(&pool, new_story).await?;

    Ok(ApiResponse::success_with_message(
        "Story created successfully".to_string(),
        StoryResponse::from(story),
    )
    .created())
}

pub async fn update_story(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<UpdateStory>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_story_id(&id)?;
    let patch = payload.into_patch().map_err(AppError::Validation)?;
    let story = repository::update(&state.pool, state.media.as_ref(), id, patch).await?;

    Ok(ApiResponse::success_with_message(
        "Story updated successfully".to_string(),
        StoryResponse::from(story),
    ))
}

pub async fn delete_story(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_story_id(&id)?;
    repository::delete(&state.pool, state.media.as_ref(), id).await?;
    Ok(ApiResponse::<EmptyData>::ok(
        "Story deleted successfully".to_string(),
    ))
}

pub async fn get_stories_by_category(
    State(pool): State<PgPool>,
    Path(category): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let stories = repository::find_by_category(&pool, &category).await?;
    Ok(ApiResponse::collection(to_responses(stories)))
}

pub async fn get_categories(State(pool): State<PgPool>) -> Result<impl IntoResponse, AppError> {
    let categories = repository::list_categories(&pool).await?;
    Ok(ApiResponse::collection(categories))
}

#[derive(Debug, Deserialize)]
pub struct PopularQuery {
    /// Kept as a raw string so a malformed value gets the 400 envelope
    /// instead of the framework's plain-text query rejection.
    pub limit: Option<String>,
}

impl PopularQuery {
    fn limit(&self) -> Result<i64, AppError> {
        match &self.limit {
            Some(raw) => raw
                .parse::<i64>()
                .map_err(|_| AppError::BadRequest("Invalid limit".to_string())),
            None => Ok(repository::DEFAULT_POPULAR_LIMIT),
        }
    }
}

pub async fn get_popular_stories(
    State(pool): State<PgPool>,
    Query(query): Query<PopularQuery>,
) -> Result<impl IntoResponse, AppError> {
    let stories = repository::get_popular(&pool, query.limit()?).await?;
    Ok(ApiResponse::collection(to_responses(stories)))
}

#[derive(Debug, Serialize)]
pub struct LikeCount {
    pub likes: i64,
}

pub async fn like_story(
    State(pool): State<PgPool>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_story_id(&id)?;
    let likes = repository::increment_likes(&pool, id).await?;
    Ok(ApiResponse::success_with_message(
        "Story liked successfully".to_string(),
        LikeCount { likes },
    ))
}

#[derive(Debug, Serialize)]
pub struct ViewCount {
    pub views: i64,
}

pub async fn increment_views(
    State(pool): State<PgPool>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_story_id(&id)?;
    let views = repository::increment_views(&pool, id).await?;
    Ok(ApiResponse::success_with_message(
        "View count updated".to_string(),
        ViewCount { views },
    ))
}

pub async fn search_stories(
    State(pool): State<PgPool>,
    Path(query): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let stories = repository::search(&pool, &query).await?;
    Ok(ApiResponse::collection(to_responses(stories)))
}
