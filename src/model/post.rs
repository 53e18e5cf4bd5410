use crate::model::tag::Tag;
use crate::model::validator::validate_not_blank;
use crate::util::maybe::MaybeAbsent;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::{Validate, ValidationError, ValidationErrors};

pub const TITLE_MAX_LENGTH: u64 = 70;
pub const EXCERPT_MAX_LENGTH: u64 = 200;

// A post joined with the names of its category and author.
// Timestamps are epoch milliseconds.
#[derive(Debug, Serialize, FromRow, Clone)]
pub struct PostRow {
    pub id: i64,
    pub title: String,
    pub body: String,
    pub excerpt: String,
    pub created_time: i64,
    pub modified_time: i64,
    pub category_id: i64,
    pub category_name: String,
    pub author_id: i64,
    pub author_name: String,
}

#[derive(Debug, Serialize, Clone)]
pub struct Post {
    #[serde(flatten)]
    pub row: PostRow,

    pub tags: Vec<Tag>,
}

impl From<PostRow> for Post {
    fn from(row: PostRow) -> Self {
        Self { row, tags: vec![] }
    }
}

/// Narrows a post listing. Every listing is ordered by descending
/// creation time.
#[derive(Debug, Default, Clone)]
pub struct PostFilter {
    pub category_id: Option<i64>,
    pub tag_id: Option<i64>,
    /// Half-open `[start, end)` range of `created_time`.
    pub created_between: Option<(i64, i64)>,
    pub limit: Option<i64>,
}

impl PostFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn by_category(category_id: i64) -> Self {
        Self {
            category_id: Some(category_id),
            ..Self::default()
        }
    }

    pub fn by_tag(tag_id: i64) -> Self {
        Self {
            tag_id: Some(tag_id),
            ..Self::default()
        }
    }

    pub fn created_between(start: i64, end: i64) -> Self {
        Self {
            created_between: Some((start, end)),
            ..Self::default()
        }
    }

    pub fn recent(limit: i64) -> Self {
        Self {
            limit: Some(limit),
            ..Self::default()
        }
    }
}

#[derive(Debug, Serialize, FromRow, Clone, PartialEq)]
pub struct ArchiveMonth {
    pub year: i64,
    pub month: i64,
    pub post_count: i64,
}

#[derive(Debug, Deserialize)]
pub struct Id {
    pub id: i64,
}

#[derive(Debug, Deserialize, Validate, Default)]
#[serde(default)]
#[validate(schema(function = "validate_archive_month"))]
pub struct FilterPostRequest {
    pub category_id: Option<i64>,
    pub tag_id: Option<i64>,
    #[validate(range(min = 1, max = 9999, message = "must be between 1 and 9999"))]
    pub year: Option<i32>,
    #[validate(range(min = 1, max = 12, message = "must be between 1 and 12"))]
    pub month: Option<u32>,
}

fn validate_archive_month(request: &FilterPostRequest) -> Result<(), ValidationError> {
    if request.year.is_some() != request.month.is_some() {
        let mut error = ValidationError::new("archive_month");
        error.message = Some("year and month must be given together".into());
        return Err(error);
    }
    Ok(())
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreatePostRequest {
    #[validate(
        length(min = 1, max = 70, message = "must be 1 to 70 characters"),
        custom(function = "validate_not_blank")
    )]
    pub title: String,
    #[validate(custom(function = "validate_not_blank"))]
    pub body: String,
    /// Left empty, the excerpt is derived from the body.
    #[serde(default)]
    #[validate(length(max = 200, message = "must be at most 200 characters"))]
    pub excerpt: String,
    /// Defaults to the time of the request.
    pub created_time: Option<i64>,
    pub category_id: i64,
    pub author_id: i64,
    #[serde(default)]
    pub tag_ids: Vec<i64>,
}

#[derive(Debug, Deserialize)]
pub struct UpdatePostRequest {
    pub id: i64,

    #[serde(default)]
    pub title: MaybeAbsent<String>,
    #[serde(default)]
    pub body: MaybeAbsent<String>,
    #[serde(default)]
    pub excerpt: MaybeAbsent<String>,
    #[serde(default)]
    pub created_time: MaybeAbsent<i64>,
    #[serde(default)]
    pub category_id: MaybeAbsent<i64>,
    #[serde(default)]
    pub author_id: MaybeAbsent<i64>,
    #[serde(default)]
    pub tag_ids: MaybeAbsent<Vec<i64>>,
}

// The derive cannot see through `MaybeAbsent`, so the rules of
// `CreatePostRequest` are repeated for the fields that are present.
impl Validate for UpdatePostRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if let Some(title) = self.title.as_option() {
            let length = title.chars().count() as u64;
            if length == 0 || length > TITLE_MAX_LENGTH {
                errors.add("title", length_error("must be 1 to 70 characters"));
            } else if let Err(error) = validate_not_blank(title) {
                errors.add("title", error);
            }
        }

        if let Some(body) = self.body.as_option() {
            if let Err(error) = validate_not_blank(body) {
                errors.add("body", error);
            }
        }

        if let Some(excerpt) = self.excerpt.as_option() {
            if excerpt.chars().count() as u64 > EXCERPT_MAX_LENGTH {
                errors.add("excerpt", length_error("must be at most 200 characters"));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

fn length_error(message: &'static str) -> ValidationError {
    let mut error = ValidationError::new("length");
    error.message = Some(message.into());
    error
}

#[derive(Debug, Serialize)]
pub struct SaveResponse {
    pub id: i64,
    pub excerpt: String,
    pub created_time: i64,
    pub modified_time: i64,
}

#[derive(Debug, Serialize)]
pub struct BlogStats {
    pub post_count: i64,
    pub category_count: i64,
    pub tag_count: i64,
}

#[derive(Debug, Deserialize)]
pub struct RenderRequest {
    pub body: String,
}

#[derive(Debug, Serialize)]
pub struct RenderResponse {
    pub html: String,
    pub toc: String,
    pub excerpt: String,
}
