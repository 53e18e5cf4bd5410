use crate::service::render_service::{MarkdownRenderer, DEFAULT_THEME};
use crate::util::env::{
    get_bool_from_env_or, get_env_or, get_size_from_env_or, get_vec_from_env_or, load_dotenv,
};
use anyhow::{bail, Result};
use axum::http::{HeaderName, HeaderValue, Method};
use std::str::FromStr;
use std::time::Duration;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, Any, CorsLayer};
use tracing::warn;

pub mod db;

#[derive(Debug, Clone)]
pub struct AppConfig {
    // Basic app info
    pub app_name: String,
    pub app_version: String,

    pub static_url: String,
    pub static_path: String,

    pub site: SiteConfig,
    pub http: HTTPConfig,
    pub db: DBConfig,
    pub log: LogConfig,
}

/// How posts are presented.
#[derive(Debug, Clone)]
pub struct SiteConfig {
    pub title: String,
    /// Characters kept in an excerpt derived from a post body.
    pub excerpt_length: usize,
    /// Minutes east of UTC, decides which month a post is archived under.
    pub utc_offset_minutes: i32,
    pub highlight_theme: String,
    pub recent_posts: i64,
}

#[derive(Debug, Clone)]
pub struct HTTPConfig {
    pub ip: String,
    pub port: u16,
    pub max_body_size: u64,
    pub request_timeout_secs: u64,
    pub cors: CORSConfig,
}

#[derive(Debug, Clone)]
pub struct DBConfig {
    pub url: String,
    pub pool_size: u32,
    pub auto_migrate: bool,
}

#[derive(Debug, Clone)]
pub struct CORSConfig {
    pub allowed_origins: Vec<String>,
    pub allowed_methods: Vec<String>,
    pub allowed_headers: Vec<String>,
    pub allow_credentials: bool,
    pub max_age: u64,
}

#[derive(Debug, Clone)]
pub struct LogConfig {
    pub log_requests: bool,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        load_dotenv();

        Ok(AppConfig {
            app_name: get_env_or("APP_NAME", "Scribe".to_string())?,
            app_version: get_env_or("APP_VERSION", env!("CARGO_PKG_VERSION").to_string())?,

            static_url: get_env_or("STATIC_URL", "/static".to_string())?,
            static_path: get_env_or("STATIC_PATH", "./static".to_string())?,

            site: SiteConfig::from_env()?,
            http: HTTPConfig::from_env()?,
            db: DBConfig::from_env()?,
            log: LogConfig::from_env()?,
        })
    }

    /// Rejects settings the application cannot start with.
    pub fn validate(&self) -> Result<()> {
        if self.site.excerpt_length == 0 {
            bail!("EXCERPT_LENGTH must be greater than 0");
        }
        if self.site.utc_offset_minutes.abs() >= 1440 {
            bail!("SITE_UTC_OFFSET must be strictly between -1440 and 1440 minutes");
        }
        if self.site.recent_posts < 0 {
            bail!("RECENT_POSTS must not be negative");
        }
        if self.db.url.trim().is_empty() {
            bail!("DATABASE_URL must not be empty");
        }
        if self.db.pool_size == 0 {
            bail!("DATABASE_POOL_SIZE must be greater than 0");
        }
        if !self.static_url.starts_with('/') || self.static_url.trim_end_matches('/').is_empty() {
            bail!("STATIC_URL must be an absolute path below '/'");
        }
        if !MarkdownRenderer::theme_names().contains(&self.site.highlight_theme) {
            warn!(
                "HIGHLIGHT_THEME {:?} is unknown, {} will be used",
                self.site.highlight_theme, DEFAULT_THEME
            );
        }
        Ok(())
    }
}

impl SiteConfig {
    pub fn from_env() -> Result<Self> {
        load_dotenv();

        Ok(SiteConfig {
            title: get_env_or("SITE_TITLE", "My Blog".to_string())?,
            excerpt_length: get_env_or("EXCERPT_LENGTH", 54)?,
            utc_offset_minutes: get_env_or("SITE_UTC_OFFSET", 0)?,
            highlight_theme: get_env_or("HIGHLIGHT_THEME", DEFAULT_THEME.to_string())?,
            recent_posts: get_env_or("RECENT_POSTS", 5)?,
        })
    }
}

impl HTTPConfig {
    pub fn from_env() -> Result<Self> {
        load_dotenv();

        Ok(HTTPConfig {
            ip: get_env_or("HTTP_IP", "127.0.0.1".to_string())?,
            port: get_env_or("HTTP_PORT", 8000)?,
            max_body_size: get_size_from_env_or("HTTP_MAX_BODY_SIZE", 2 * 1024 * 1024)?,
            request_timeout_secs: get_env_or("HTTP_REQUEST_TIMEOUT_SECS", 30)?,
            cors: CORSConfig::from_env()?,
        })
    }
}

impl DBConfig {
    pub fn from_env() -> Result<Self> {
        load_dotenv();

        Ok(DBConfig {
            url: get_env_or("DATABASE_URL", "sqlite://blog.db".to_string())?,
            pool_size: get_env_or("DATABASE_POOL_SIZE", 5)?,
            auto_migrate: get_bool_from_env_or("DATABASE_AUTO_MIGRATE", true)?,
        })
    }
}

impl CORSConfig {
    pub fn from_env() -> Result<Self> {
        load_dotenv();

        Ok(CORSConfig {
            allowed_origins: get_vec_from_env_or("CORS_ALLOWED_ORIGINS", vec![])?,
            allowed_methods: get_vec_from_env_or(
                "CORS_ALLOWED_METHODS",
                strs_to_strings(&["GET", "POST", "OPTIONS"]),
            )?,
            allowed_headers: get_vec_from_env_or(
                "CORS_ALLOWED_HEADERS",
                strs_to_strings(&["Content-Type"]),
            )?,
            allow_credentials: get_bool_from_env_or("CORS_ALLOW_CREDENTIALS", false)?,
            max_age: get_env_or("CORS_MAX_AGE", 86400)?,
        })
    }

    pub fn into_layer(self) -> Result<CorsLayer> {
        let wildcard = |values: &[String]| values.iter().any(|v| v == "*");

        if self.allow_credentials
            && (wildcard(&self.allowed_origins)
                || wildcard(&self.allowed_methods)
                || wildcard(&self.allowed_headers))
        {
            bail!("CORS_ALLOW_CREDENTIALS cannot be combined with '*'");
        }

        let mut cors = CorsLayer::new();

        cors = if wildcard(&self.allowed_origins) {
            cors.allow_origin(Any)
        } else {
            cors.allow_origin(AllowOrigin::list(parse_all::<HeaderValue>(&self.allowed_origins)?))
        };

        cors = if wildcard(&self.allowed_methods) {
            cors.allow_methods(Any)
        } else {
            cors.allow_methods(AllowMethods::list(parse_all::<Method>(&self.allowed_methods)?))
        };

        cors = if wildcard(&self.allowed_headers) {
            cors.allow_headers(Any)
        } else {
            cors.allow_headers(AllowHeaders::list(parse_all::<HeaderName>(
                &self.allowed_headers,
            )?))
        };

        Ok(cors
            .allow_credentials(self.allow_credentials)
            .max_age(Duration::from_secs(self.max_age)))
    }
}

impl LogConfig {
    pub fn from_env() -> Result<Self> {
        load_dotenv();

        Ok(LogConfig {
            log_requests: get_bool_from_env_or("LOG_REQUESTS", false)?,
        })
    }
}

fn strs_to_strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}

fn parse_all<T>(values: &[String]) -> Result<Vec<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    values
        .iter()
        .map(|s| {
            s.parse()
                .map_err(|e| anyhow::anyhow!("Invalid CORS value {:?}: {}", s, e))
        })
        .collect()
}
