use crate::model::validator::validate_not_blank;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

#[derive(Debug, Serialize, FromRow, Clone, PartialEq)]
pub struct Tag {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Serialize, FromRow)]
pub struct TagWithPostCount {
    pub id: i64,
    pub name: String,
    pub post_count: i64,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateTagRequest {
    #[validate(
        length(min = 1, max = 100, message = "must be 1 to 100 characters"),
        custom(function = "validate_not_blank")
    )]
    pub name: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct RenameTagRequest {
    pub id: i64,
    #[validate(
        length(min = 1, max = 100, message = "must be 1 to 100 characters"),
        custom(function = "validate_not_blank")
    )]
    pub name: String,
}
