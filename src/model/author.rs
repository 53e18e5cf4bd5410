use crate::model::validator::validate_not_blank;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// The writer a post is attributed to. There is no login, so an author is
/// only a name.
#[derive(Debug, Serialize, FromRow, Clone, PartialEq)]
pub struct Author {
    pub id: i64,
    pub username: String,
    pub created_time: i64,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateAuthorRequest {
    #[validate(
        length(min = 1, max = 150, message = "must be 1 to 150 characters"),
        custom(function = "validate_not_blank")
    )]
    pub username: String,
}
