//! Repository tests against a real Postgres. They skip (with a note) when
//! DATABASE_URL is not set so the unit suite stays runnable anywhere.

use std::sync::Mutex;

use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use uuid::Uuid;

use webstories_backend::error::AppError;
use webstories_backend::media::{MediaError, MediaResolver, MediaUpload, NoopResolver};
use webstories_backend::stories::{
    repository, NewStory, Slide, SlideAnimation, SlideType, StoryPatch,
};

async fn test_pool() -> Option<PgPool> {
    let url = match std::env::var("DATABASE_URL") {
        Ok(url) => url,
        Err(_) => {
            eprintln!("skipping: DATABASE_URL not set");
            return None;
        }
    };
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&url)
        .await
        .expect("failed to connect to test database");
    sqlx::migrate!()
        .run(&pool)
        .await
        .expect("failed to run migrations");
    Some(pool)
}

/// Records deletions so tests can assert which refs were released.
#[derive(Default)]
struct RecordingResolver {
    deleted: Mutex<Vec<String>>,
}

#[async_trait]
impl MediaResolver for RecordingResolver {
    async fn upload(
        &self,
        _file: Vec<u8>,
        _file_name: &str,
        _folder: &str,
    ) -> Result<MediaUpload, MediaError> {
        Err(MediaError::new("upload not expected in these tests"))
    }

    async fn delete(&self, public_id: &str) -> Result<(), MediaError> {
        self.deleted.lock().unwrap().push(public_id.to_string());
        Ok(())
    }
}

fn slide(url: &str, order: i64, media_ref_id: Option<&str>) -> Slide {
    Slide {
        slide_type: SlideType::Image,
        url: url.to_string(),
        duration_ms: 5_000,
        animation: SlideAnimation::Fade,
        order,
        media_ref_id: media_ref_id.map(str::to_string),
    }
}

fn new_story(category: &str, slides: Vec<Slide>) -> NewStory {
    NewStory {
        title: "A day at the coast".to_string(),
        category: category.to_string(),
        description: String::new(),
        is_published: true,
        slides,
    }
}

fn empty_patch() -> StoryPatch {
    StoryPatch {
        title: None,
        category: None,
        description: None,
        is_published: None,
        slides: None,
    }
}

fn unique(tag: &str) -> String {
    format!("{tag}-{}", Uuid::new_v4())
}

#[tokio::test]
async fn create_then_get_roundtrips() {
    let Some(pool) = test_pool().await else { return };
    let category = unique("travel");

    let created = repository::create(
        &pool,
        new_story(
            &category,
            vec![slide("https://cdn.example/a.jpg", 0, None), slide("https://cdn.example/b.jpg", 1, None)],
        ),
    )
    .await
    .unwrap();

    assert_eq!(created.views, 0);
    assert_eq!(created.likes, 0);
    assert!(created.is_published);

    let fetched = repository::get(&pool, created.id).await.unwrap();
    assert_eq!(fetched.title, "A day at the coast");
    assert_eq!(fetched.slides.0.len(), 2);
    assert_eq!(fetched.slides.0[1].order, 1);
}

#[tokio::test]
async fn get_missing_story_is_not_found() {
    let Some(pool) = test_pool().await else { return };
    let result = repository::get(&pool, Uuid::new_v4()).await;
    assert!(matches!(result, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn partial_update_keeps_omitted_fields() {
    let Some(pool) = test_pool().await else { return };
    let category = unique("food");

    let mut story = new_story(&category, vec![slide("https://cdn.example/a.jpg", 0, None)]);
    story.description = "original description".to_string();
    let created = repository::create(&pool, story).await.unwrap();

    let patch = StoryPatch {
        title: Some("Renamed".to_string()),
        ..empty_patch()
    };
    let updated = repository::update(&pool, &NoopResolver, created.id, patch)
        .await
        .unwrap();

    assert_eq!(updated.title, "Renamed");
    assert_eq!(updated.description, "original description");
    assert_eq!(updated.category, category);
    assert!(updated.updated_at >= created.updated_at);
}

#[tokio::test]
async fn slide_replacement_is_total_and_releases_dropped_refs() {
    let Some(pool) = test_pool().await else { return };
    let category = unique("travel");
    let resolver = RecordingResolver::default();

    let created = repository::create(
        &pool,
        new_story(
            &category,
            vec![
                slide("https://cdn.example/a.jpg", 0, Some("webstories/a")),
                slide("https://cdn.example/b.jpg", 1, Some("webstories/b")),
            ],
        ),
    )
    .await
    .unwrap();

    let patch = StoryPatch {
        slides: Some(vec![slide("https://cdn.example/b.jpg", 0, Some("webstories/b"))]),
        ..empty_patch()
    };
    let updated = repository::update(&pool, &resolver, created.id, patch)
        .await
        .unwrap();

    assert_eq!(updated.slides.0.len(), 1);
    assert_eq!(updated.slides.0[0].url, "https://cdn.example/b.jpg");
    assert_eq!(*resolver.deleted.lock().unwrap(), vec!["webstories/a"]);
}

#[tokio::test]
async fn publishing_refreshes_published_at_only_on_a_real_flip() {
    let Some(pool) = test_pool().await else { return };
    let category = unique("news");

    let mut story = new_story(&category, vec![slide("https://cdn.example/a.jpg", 0, None)]);
    story.is_published = false;
    let created = repository::create(&pool, story).await.unwrap();

    let before_flip = chrono::Utc::now();
    let patch = StoryPatch {
        is_published: Some(true),
        ..empty_patch()
    };
    let published = repository::update(&pool, &NoopResolver, created.id, patch)
        .await
        .unwrap();
    assert!(published.is_published);
    assert!(published.published_at >= before_flip);

    // true -> true is a no-op for the timestamp.
    let patch = StoryPatch {
        is_published: Some(true),
        ..empty_patch()
    };
    let republished = repository::update(&pool, &NoopResolver, created.id, patch)
        .await
        .unwrap();
    assert_eq!(republished.published_at, published.published_at);
}

#[tokio::test]
async fn delete_removes_the_story_and_releases_media() {
    let Some(pool) = test_pool().await else { return };
    let category = unique("travel");
    let resolver = RecordingResolver::default();

    let created = repository::create(
        &pool,
        new_story(
            &category,
            vec![slide("https://cdn.example/a.jpg", 0, Some("webstories/a"))],
        ),
    )
    .await
    .unwrap();

    repository::delete(&pool, &resolver, created.id).await.unwrap();
    assert_eq!(*resolver.deleted.lock().unwrap(), vec!["webstories/a"]);

    let result = repository::get(&pool, created.id).await;
    assert!(matches!(result, Err(AppError::NotFound(_))));

    let result = repository::delete(&pool, &resolver, created.id).await;
    assert!(matches!(result, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn category_queries_only_see_published_stories() {
    let Some(pool) = test_pool().await else { return };
    let category = unique("sports");

    let first = repository::create(
        &pool,
        new_story(&category, vec![slide("https://cdn.example/a.jpg", 0, None)]),
    )
    .await
    .unwrap();
    let second = repository::create(
        &pool,
        new_story(&category, vec![slide("https://cdn.example/b.jpg", 0, None)]),
    )
    .await
    .unwrap();
    let mut hidden = new_story(&category, vec![slide("https://cdn.example/c.jpg", 0, None)]);
    hidden.is_published = false;
    repository::create(&pool, hidden).await.unwrap();

    let found = repository::find_by_category(&pool, &category).await.unwrap();
    let ids: Vec<Uuid> = found.iter().map(|s| s.id).collect();
    // Creation time descending, unpublished excluded.
    assert_eq!(ids, vec![second.id, first.id]);

    let categories = repository::list_categories(&pool).await.unwrap();
    assert!(categories.contains(&category));
}

#[tokio::test]
async fn unpublished_categories_are_not_listed() {
    let Some(pool) = test_pool().await else { return };
    let category = unique("drafts");

    let mut hidden = new_story(&category, vec![slide("https://cdn.example/a.jpg", 0, None)]);
    hidden.is_published = false;
    repository::create(&pool, hidden).await.unwrap();

    let categories = repository::list_categories(&pool).await.unwrap();
    assert!(!categories.contains(&category));
}

#[tokio::test]
async fn popular_orders_by_views_then_likes() {
    let Some(pool) = test_pool().await else { return };
    let category = unique("ranked");

    let mut ids = Vec::new();
    for views in [10_i64, 30, 20] {
        let story = repository::create(
            &pool,
            new_story(&category, vec![slide("https://cdn.example/a.jpg", 0, None)]),
        )
        .await
        .unwrap();
        for _ in 0..views {
            repository::increment_views(&pool, story.id).await.unwrap();
        }
        ids.push(story.id);
    }

    let popular = repository::get_popular(&pool, i64::MAX).await.unwrap();
    let ours: Vec<Uuid> = popular
        .iter()
        .map(|s| s.id)
        .filter(|id| ids.contains(id))
        .collect();
    assert_eq!(ours, vec![ids[1], ids[2], ids[0]]);
}

#[tokio::test]
async fn concurrent_likes_are_never_lost() {
    let Some(pool) = test_pool().await else { return };
    let category = unique("likes");

    let story = repository::create(
        &pool,
        new_story(&category, vec![slide("https://cdn.example/a.jpg", 0, None)]),
    )
    .await
    .unwrap();

    let (a, b) = tokio::join!(
        repository::increment_likes(&pool, story.id),
        repository::increment_likes(&pool, story.id),
    );
    a.unwrap();
    b.unwrap();

    let fetched = repository::get(&pool, story.id).await.unwrap();
    assert_eq!(fetched.likes, story.likes + 2);
}

#[tokio::test]
async fn increment_on_missing_story_is_not_found() {
    let Some(pool) = test_pool().await else { return };
    let result = repository::increment_likes(&pool, Uuid::new_v4()).await;
    assert!(matches!(result, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn search_matches_descriptions_of_published_stories_only() {
    let Some(pool) = test_pool().await else { return };
    let category = unique("searchable");
    let token = format!("needle{}", Uuid::new_v4().simple());

    let mut visible = new_story(&category, vec![slide("https://cdn.example/a.jpg", 0, None)]);
    visible.description = format!("contains the {token} here");
    let visible = repository::create(&pool, visible).await.unwrap();

    let mut hidden = new_story(&category, vec![slide("https://cdn.example/b.jpg", 0, None)]);
    hidden.description = format!("also holds the {token}");
    hidden.is_published = false;
    repository::create(&pool, hidden).await.unwrap();

    // Case-insensitive substring match.
    let found = repository::search(&pool, &token.to_uppercase()).await.unwrap();
    let ids: Vec<Uuid> = found.iter().map(|s| s.id).collect();
    assert_eq!(ids, vec![visible.id]);
}

#[tokio::test]
async fn search_treats_like_metacharacters_literally() {
    let Some(pool) = test_pool().await else { return };
    let category = unique("escaped");
    let token = format!("100%_{}", Uuid::new_v4().simple());

    let mut story = new_story(&category, vec![slide("https://cdn.example/a.jpg", 0, None)]);
    story.description = format!("progress at {token}");
    let story = repository::create(&pool, story).await.unwrap();

    let found = repository::search(&pool, &token).await.unwrap();
    assert_eq!(found.iter().map(|s| s.id).collect::<Vec<_>>(), vec![story.id]);

    // A pattern that only matches via wildcards must not match literally.
    let miss = repository::search(&pool, &format!("100x_{}", Uuid::new_v4().simple())).await.unwrap();
    assert!(miss.is_empty());
}
