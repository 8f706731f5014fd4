use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    error::AppError,
    media::MediaResolver,
    stories::{NewStory, Slide, Story, StoryPatch},
};

pub const DEFAULT_POPULAR_LIMIT: i64 = 10;

pub async fn list(pool: &PgPool) -> Result<Vec<Story>, AppError> {
    sqlx::query_as::<_, Story>("SELECT * FROM stories ORDER BY created_at DESC")
        .fetch_all(pool)
        .await
        .map_err(|e| AppError::storage("Error fetching stories", e))
}

pub async fn get(pool: &PgPool, id: Uuid) -> Result<Story, AppError> {
    sqlx::query_as::<_, Story>("SELECT * FROM stories WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(|e| AppError::storage("Error fetching story", e))?
        .ok_or_else(|| AppError::NotFound("Story not found".to_string()))
}

pub async fn create(pool: &PgPool, story: NewStory) -> Result<Story, AppError> {
    sqlx::query_as::<_, Story>(
        r#"
        INSERT INTO stories (id, title, category, description, slides, is_published, published_at)
        VALUES ($1, $2, $3, $4, $5, $6, NOW())
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(&story.title)
    .bind(&story.category)
    .bind(&story.description)
    .bind(sqlx::types::Json(&story.slides))
    .bind(story.is_published)
    .fetch_one(pool)
    .await
    .map_err(|e| AppError::storage("Error creating story", e))
}

/// Fetch-modify-write in one transaction. A provided slide sequence fully
/// replaces the stored one; media refs only the old sequence held are
/// released before the commit, so a resolver failure leaves the story
/// untouched. `published_at` is refreshed only on a false -> true flip of
/// `is_published`.
pub async fn update(
    pool: &PgPool,
    media: &dyn MediaResolver,
    id: Uuid,
    patch: StoryPatch,
) -> Result<Story, AppError> {
    let mut tx = pool
        .begin()
        .await
        .map_err(|e| AppError::storage("Error updating story", e))?;

    let current = sqlx::query_as::<_, Story>("SELECT * FROM stories WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| AppError::storage("Error updating story", e))?
        .ok_or_else(|| AppError::NotFound("Story not found".to_string()))?;

    let is_published = patch.is_published.unwrap_or(current.is_published);
    let published_at = if is_published && !current.is_published {
        Utc::now()
    } else {
        current.published_at
    };

    let slides = match patch.slides {
        Some(replacement) => {
            for dropped in dropped_media_refs(&current.slides.0, &replacement) {
                media.delete(&dropped).await?;
            }
            replacement
        }
        None => current.slides.0,
    };

    let story = sqlx::query_as::<_, Story>(
        r#"
        UPDATE stories
        SET title = $2, category = $3, description = $4, slides = $5,
            is_published = $6, published_at = $7, updated_at = NOW()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(patch.title.unwrap_or(current.title))
    .bind(patch.category.unwrap_or(current.category))
    .bind(patch.description.unwrap_or(current.description))
    .bind(sqlx::types::Json(&slides))
    .bind(is_published)
    .bind(published_at)
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| AppError::storage("Error updating story", e))?;

    tx.commit()
        .await
        .map_err(|e| AppError::storage("Error updating story", e))?;

    Ok(story)
}

/// Releases every media ref the story's slides hold, then removes the row.
/// A resolver failure aborts before the row is touched.
pub async fn delete(pool: &PgPool, media: &dyn MediaResolver, id: Uuid) -> Result<(), AppError> {
    let story = get(pool, id).await?;

    for slide in &story.slides.0 {
        if let Some(ref_id) = &slide.media_ref_id {
            media.delete(ref_id).await?;
        }
    }

    sqlx::query("DELETE FROM stories WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await
        .map_err(|e| AppError::storage("Error deleting story", e))?;

    Ok(())
}

pub async fn find_by_category(pool: &PgPool, category: &str) -> Result<Vec<Story>, AppError> {
    sqlx::query_as::<_, Story>(
        r#"
        SELECT * FROM stories
        WHERE category = $1 AND is_published = TRUE
        ORDER BY created_at DESC
        "#,
    )
    .bind(category)
    .fetch_all(pool)
    .await
    .map_err(|e| AppError::storage("Error fetching stories by category", e))
}

pub async fn list_categories(pool: &PgPool) -> Result<Vec<String>, AppError> {
    sqlx::query_scalar::<_, String>(
        "SELECT DISTINCT category FROM stories WHERE is_published = TRUE ORDER BY category",
    )
    .fetch_all(pool)
    .await
    .map_err(|e| AppError::storage("Error fetching categories", e))
}

pub async fn get_popular(pool: &PgPool, limit: i64) -> Result<Vec<Story>, AppError> {
    sqlx::query_as::<_, Story>(
        r#"
        SELECT * FROM stories
        WHERE is_published = TRUE
        ORDER BY views DESC, likes DESC
        LIMIT $1
        "#,
    )
    .bind(limit.max(0))
    .fetch_all(pool)
    .await
    .map_err(|e| AppError::storage("Error fetching popular stories", e))
}

/// Single-statement increment so concurrent callers never lose an update.
pub async fn increment_views(pool: &PgPool, id: Uuid) -> Result<i64, AppError> {
    sqlx::query_scalar::<_, i64>(
        "UPDATE stories SET views = views + 1, updated_at = NOW() WHERE id = $1 RETURNING views",
    )
    .bind(id)
    .fetch_optional(pool)
    .await
    .map_err(|e| AppError::storage("Error updating view count", e))?
    .ok_or_else(|| AppError::NotFound("Story not found".to_string()))
}

pub async fn increment_likes(pool: &PgPool, id: Uuid) -> Result<i64, AppError> {
    sqlx::query_scalar::<_, i64>(
        "UPDATE stories SET likes = likes + 1, updated_at = NOW() WHERE id = $1 RETURNING likes",
    )
    .bind(id)
    .fetch_optional(pool)
    .await
    .map_err(|e| AppError::storage("Error liking story", e))?
    .ok_or_else(|| AppError::NotFound("Story not found".to_string()))
}

pub async fn search(pool: &PgPool, query: &str) -> Result<Vec<Story>, AppError> {
    let pattern = format!("%{}%", escape_like(query));
    sqlx::query_as::<_, Story>(
        r#"
        SELECT * FROM stories
        WHERE is_published = TRUE
          AND (title ILIKE $1 OR category ILIKE $1 OR description ILIKE $1)
        ORDER BY created_at DESC
        "#,
    )
    .bind(pattern)
    .fetch_all(pool)
    .await
    .map_err(|e| AppError::storage("Error searching stories", e))
}

/// Neutralizes LIKE metacharacters so the search query matches literally.
fn escape_like(query: &str) -> String {
    query
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

/// Media refs present in `old` but absent from `new`, i.e. assets the
/// replacement sequence no longer references.
fn dropped_media_refs(old: &[Slide], new: &[Slide]) -> Vec<String> {
    old.iter()
        .filter_map(|slide| slide.media_ref_id.as_deref())
        .filter(|ref_id| {
            !new.iter()
                .any(|slide| slide.media_ref_id.as_deref() == Some(*ref_id))
        })
        .map(str::to_string)
        .collect()
}
