use crate::util::extractor::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use serde::Serialize;
use sqlx::error::ErrorKind;
use std::error::Error;
use std::fmt;
use std::fmt::Debug;
use tracing::error;
use validator::ValidationErrors;

pub type ApiResult<T> = Result<T, ApiError>;

pub type PageResult<T> = Result<T, PageError>;

#[derive(Serialize, Debug)]
pub struct ErrorMessage {
    pub code: u16,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Errors of the JSON editing API, rendered as `{code, error, message}`.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),

    QueryRejection(QueryRejection),
    JsonRejection(JsonRejection),

    ValidationError(ValidationErrors),

    Sqlx(sqlx::Error),

    Anyhow(anyhow::Error),

    Any(ErrorMessage),
}

impl ApiError {
    fn code(&self) -> u16 {
        use ApiError::*;

        match self {
            BadRequest(_) => 400,
            NotFound(_) => 404,
            QueryRejection(_) | JsonRejection(_) | ValidationError(_) => 400,
            Sqlx(_) | Anyhow(_) => 500,
            Any(message) => message.code,
        }
    }

    fn reason(&self) -> &str {
        StatusCode::from_u16(self.code())
            .ok()
            .and_then(|status| status.canonical_reason())
            .unwrap_or("Unknown error")
    }

    fn message(&self) -> Option<String> {
        use ApiError::*;

        match self {
            BadRequest(msg) | NotFound(msg) => Some(msg.clone()),
            QueryRejection(error) => Some(error.body_text()),
            JsonRejection(error) => Some(error.body_text()),
            Sqlx(_) | Anyhow(_) => None,
            ValidationError(err) => Some(err.to_string().replace('\n', "; ")),
            Any(msg) => msg.message.clone(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        match self {
            ApiError::NotFound(_) => true,
            ApiError::Sqlx(sqlx::Error::RowNotFound) => true,
            ApiError::Any(msg) => msg.code == 404,
            _ => false,
        }
    }

    fn to_default_json(&self) -> Response {
        self.to_json(self.code(), self.reason(), self.message().as_deref())
    }

    fn to_json(&self, code: u16, error: &str, message: Option<&str>) -> Response {
        let status = StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (
            status,
            Json(ErrorMessage {
                code: status.as_u16(),
                error: error.to_string(),
                message: message.map(String::from),
            }),
        )
            .into_response()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        use ApiError::*;
        use ErrorKind::*;

        match self {
            Sqlx(ref error) => {
                error!("sqlx error: {:?}", error);
                match error {
                    // SQLite reports no constraint name, so match on the kind alone.
                    sqlx::Error::Database(dbe) => match dbe.kind() {
                        UniqueViolation => {
                            self.to_json(409, "Conflict", Some("Unique value already in use"))
                        }
                        ForeignKeyViolation => {
                            self.to_json(400, "Bad Request", Some("Missing related record"))
                        }
                        NotNullViolation => {
                            self.to_json(400, "Bad Request", Some("Missing required field"))
                        }
                        CheckViolation => {
                            self.to_json(400, "Bad Request", Some("Invalid input value"))
                        }
                        _ => self.to_default_json(),
                    },
                    sqlx::Error::RowNotFound => {
                        self.to_json(404, "Not Found", Some("Data not found"))
                    }
                    _ => self.to_default_json(),
                }
            }
            Anyhow(ref error) => {
                error!("generic error: {:?}", error);
                self.to_default_json()
            }
            _ => self.to_default_json(),
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.message() {
            Some(message) => write!(f, "{}: {}", self.reason(), message),
            None => write!(f, "{}", self.reason()),
        }
    }
}

impl Error for ApiError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        use ApiError::*;

        match self {
            QueryRejection(err) => Some(err),
            JsonRejection(err) => Some(err),
            ValidationError(err) => Some(err),
            Sqlx(err) => Some(err),
            Anyhow(err) => err.source(),
            _ => None,
        }
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        ApiError::Sqlx(err)
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError::Anyhow(err)
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::QueryRejection(rejection)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::JsonRejection(rejection)
    }
}

impl From<ValidationErrors> for ApiError {
    fn from(err: ValidationErrors) -> Self {
        ApiError::ValidationError(err)
    }
}

pub fn bad_request(msg: &str) -> ApiError {
    ApiError::BadRequest(msg.to_string())
}

pub fn not_found(msg: &str) -> ApiError {
    ApiError::NotFound(msg.to_string())
}

pub fn any_error(code: u16, error: &str, message: Option<&str>) -> ApiError {
    ApiError::Any(ErrorMessage {
        code,
        error: error.to_string(),
        message: message.map(String::from),
    })
}

/// Errors of the HTML pages, rendered with the static 404/500 pages.
#[derive(Debug)]
pub enum PageError {
    NotFound,
    MethodNotAllowed,
    TemplateError(minijinja::Error),
    SqlxError(sqlx::Error),
    Anyhow(anyhow::Error),
}

impl From<sqlx::Error> for PageError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => PageError::NotFound,
            err => PageError::SqlxError(err),
        }
    }
}

impl From<minijinja::Error> for PageError {
    fn from(err: minijinja::Error) -> Self {
        PageError::TemplateError(err)
    }
}

impl From<anyhow::Error> for PageError {
    fn from(err: anyhow::Error) -> Self {
        PageError::Anyhow(err)
    }
}

// Services speak `ApiError`; a page only cares whether the record exists.
impl From<ApiError> for PageError {
    fn from(err: ApiError) -> Self {
        if err.is_not_found() {
            return PageError::NotFound;
        }
        match err {
            ApiError::Sqlx(err) => PageError::SqlxError(err),
            ApiError::Anyhow(err) => PageError::Anyhow(err),
            err => PageError::Anyhow(anyhow::anyhow!("{}", err)),
        }
    }
}

impl IntoResponse for PageError {
    fn into_response(self) -> Response {
        match self {
            PageError::NotFound => (StatusCode::NOT_FOUND, Html(PAGE_404)).into_response(),
            PageError::MethodNotAllowed => {
                (StatusCode::METHOD_NOT_ALLOWED, Html(PAGE_405)).into_response()
            }
            PageError::TemplateError(err) => {
                error!("template error: {:?}", err);
                (StatusCode::INTERNAL_SERVER_ERROR, Html(PAGE_500)).into_response()
            }
            PageError::SqlxError(err) => {
                error!("sqlx error: {:?}", err);
                (StatusCode::INTERNAL_SERVER_ERROR, Html(PAGE_500)).into_response()
            }
            PageError::Anyhow(err) => {
                error!("generic error: {:?}", err);
                (StatusCode::INTERNAL_SERVER_ERROR, Html(PAGE_500)).into_response()
            }
        }
    }
}

pub static PAGE_404: &str = include_str!("../templates/404.html");
pub static PAGE_405: &str = include_str!("../templates/405.html");
pub static PAGE_500: &str = include_str!("../templates/500.html");
