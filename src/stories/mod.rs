use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

pub mod handler;
pub mod repository;

pub const MIN_SLIDE_DURATION_MS: i64 = 1_000;
pub const MAX_SLIDE_DURATION_MS: i64 = 30_000;
pub const DEFAULT_SLIDE_DURATION_MS: i64 = 5_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SlideType {
    Image,
    Video,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SlideAnimation {
    Fade,
    Slide,
    Zoom,
    None,
}

/// One timed media unit inside a story. Slides have no lifecycle of their
/// own; they live in the `slides` jsonb column of their story row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Slide {
    #[serde(rename = "type")]
    pub slide_type: SlideType,
    pub url: String,
    pub duration_ms: i64,
    pub animation: SlideAnimation,
    pub order: i64,
    #[serde(default)]
    pub media_ref_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct Story {
    pub id: Uuid,
    pub title: String,
    pub category: String,
    pub description: String,
    pub slides: sqlx::types::Json<Vec<Slide>>,
    pub is_published: bool,
    pub published_at: chrono::DateTime<chrono::Utc>,
    pub views: i64,
    pub likes: i64,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

/// Wire shape of a story, with the derived `slideCount` and `totalDuration`
/// fields clients render in listings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoryResponse {
    pub id: Uuid,
    pub title: String,
    pub category: String,
    pub description: String,
    pub slides: Vec<Slide>,
    pub is_published: bool,
    pub published_at: chrono::DateTime<chrono::Utc>,
    pub views: i64,
    pub likes: i64,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
    pub slide_count: usize,
    pub total_duration: i64,
}

impl From<Story> for StoryResponse {
    fn from(story: Story) -> Self {
        let slides = story.slides.0;
        StoryResponse {
            id: story.id,
            title: story.title,
            category: story.category,
            description: story.description,
            slide_count: slides.len(),
            total_duration: slides.iter().map(|slide| slide.duration_ms).sum(),
            slides,
            is_published: story.is_published,
            published_at: story.published_at,
            views: story.views,
            likes: story.likes,
            created_at: story.created_at,
            updated_at: story.updated_at,
        }
    }
}

/// Slide as submitted by clients. Everything except position defaults is
/// checked in [`SlideInput::into_slide`] so one bad payload reports every
/// violated field at once.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlideInput {
    #[serde(rename = "type")]
    pub slide_type: Option<SlideType>,
    pub url: Option<String>,
    pub duration_ms: Option<i64>,
    pub animation: Option<SlideAnimation>,
    pub order: Option<i64>,
    pub media_ref_id: Option<String>,
}

impl SlideInput {
    /// `index` is the slide's 0-based position in the submitted sequence,
    /// used to fill `order` when the caller did not supply one. Explicit
    /// `order` values are kept as-is, duplicates and gaps included.
    fn into_slide(self, index: usize) -> Result<Slide, Vec<String>> {
        let mut errors = Vec::new();

        let url = self
            .url
            .map(|url| url.trim().to_string())
            .unwrap_or_default();
        if url.is_empty() {
            errors.push("Media URL is required".to_string());
        }

        let duration_ms = self.duration_ms.unwrap_or(DEFAULT_SLIDE_DURATION_MS);
        if duration_ms < MIN_SLIDE_DURATION_MS {
            errors.push("Duration must be at least 1000ms".to_string());
        }
        if duration_ms > MAX_SLIDE_DURATION_MS {
            errors.push("Duration cannot exceed 30000ms".to_string());
        }

        let order = self.order.unwrap_or(index as i64);
        if order < 0 {
            errors.push("Slide order cannot be negative".to_string());
        }

        match self.slide_type {
            Some(slide_type) if errors.is_empty() => Ok(Slide {
                slide_type,
                url,
                duration_ms,
                animation: self.animation.unwrap_or(SlideAnimation::Fade),
                order,
                media_ref_id: self.media_ref_id,
            }),
            Some(_) => Err(errors),
            None => {
                errors.push("Slide type is required".to_string());
                Err(errors)
            }
        }
    }
}

/// Validates a submitted slide sequence, filling omitted `order` values from
/// submission position. Collects every violation rather than stopping at the
/// first.
pub fn validate_slides(inputs: Vec<SlideInput>) -> Result<Vec<Slide>, Vec<String>> {
    if inputs.is_empty() {
        return Err(vec!["At least one slide is required".to_string()]);
    }

    let mut errors = Vec::new();
    let mut slides = Vec::with_capacity(inputs.len());
    for (index, input) in inputs.into_iter().enumerate() {
        match input.into_slide(index) {
            Ok(slide) => slides.push(slide),
            Err(mut slide_errors) => errors.append(&mut slide_errors),
        }
    }

    if errors.is_empty() {
        Ok(slides)
    } else {
        Err(errors)
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateStory {
    #[validate(length(max = 100, message = "Title cannot exceed 100 characters"))]
    pub title: Option<String>,
    #[validate(length(max = 50, message = "Category cannot exceed 50 characters"))]
    pub category: Option<String>,
    #[validate(length(max = 500, message = "Description cannot exceed 500 characters"))]
    pub description: Option<String>,
    pub is_published: Option<bool>,
    pub slides: Option<Vec<SlideInput>>,
}

/// A fully validated create payload, ready to persist.
#[derive(Debug)]
pub struct NewStory {
    pub title: String,
    pub category: String,
    pub description: String,
    pub is_published: bool,
    pub slides: Vec<Slide>,
}

impl CreateStory {
    pub fn into_new_story(self) -> Result<NewStory, Vec<String>> {
        let mut errors = Vec::new();
        if let Err(validation) = self.validate() {
            errors.extend(flatten_messages(validation));
        }

        let title = self.title.map(|t| t.trim().to_string()).unwrap_or_default();
        if title.is_empty() {
            errors.push("Story title is required".to_string());
        }

        let category = self
            .category
            .map(|c| c.trim().to_string())
            .unwrap_or_default();
        if category.is_empty() {
            errors.push("Story category is required".to_string());
        }

        let slides = match validate_slides(self.slides.unwrap_or_default()) {
            Ok(slides) => slides,
            Err(mut slide_errors) => {
                errors.append(&mut slide_errors);
                Vec::new()
            }
        };

        if errors.is_empty() {
            Ok(NewStory {
                title,
                category,
                description: self
                    .description
                    .map(|d| d.trim().to_string())
                    .unwrap_or_default(),
                is_published: self.is_published.unwrap_or(true),
                slides,
            })
        } else {
            Err(errors)
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStory {
    #[validate(length(max = 100, message = "Title cannot exceed 100 characters"))]
    pub title: Option<String>,
    #[validate(length(max = 50, message = "Category cannot exceed 50 characters"))]
    pub category: Option<String>,
    #[validate(length(max = 500, message = "Description cannot exceed 500 characters"))]
    pub description: Option<String>,
    pub is_published: Option<bool>,
    pub slides: Option<Vec<SlideInput>>,
}

/// Validated partial update. `None` fields keep the stored value; a provided
/// slide sequence fully replaces the prior one.
#[derive(Debug)]
pub struct StoryPatch {
    pub title: Option<String>,
    pub category: Option<String>,
    pub description: Option<String>,
    pub is_published: Option<bool>,
    pub slides: Option<Vec<Slide>>,
}

impl UpdateStory {
    pub fn into_patch(self) -> Result<StoryPatch, Vec<String>> {
        let mut errors = Vec::new();
        if let Err(validation) = self.validate() {
            errors.extend(flatten_messages(validation));
        }

        // Provided fields get the same trim treatment as create; a
        // whitespace-only title or category is a blank, not a value.
        let title = self.title.map(|t| t.trim().to_string());
        if matches!(&title, Some(t) if t.is_empty()) {
            errors.push("Story title is required".to_string());
        }

        let category = self.category.map(|c| c.trim().to_string());
        if matches!(&category, Some(c) if c.is_empty()) {
            errors.push("Story category is required".to_string());
        }

        let description = self.description.map(|d| d.trim().to_string());

        let slides = match self.slides {
            Some(inputs) => match validate_slides(inputs) {
                Ok(slides) => Some(slides),
                Err(mut slide_errors) => {
                    errors.append(&mut slide_errors);
                    None
                }
            },
            None => None,
        };

        if errors.is_empty() {
            Ok(StoryPatch {
                title,
                category,
                description,
                is_published: self.is_published,
                slides,
            })
        } else {
            Err(errors)
        }
    }
}

fn flatten_messages(errors: validator::ValidationErrors) -> Vec<String> {
    let mut messages = Vec::new();
    for (field, field_errors) in errors.field_errors() {
        for error in field_errors {
            match &error.message {
                Some(message) => messages.push(message.to_string()),
                None => messages.push(format!("Invalid value for {field}")),
            }
        }
    }
    messages
}
