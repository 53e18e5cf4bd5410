use anyhow::{anyhow, Context, Result};
use dotenvy::dotenv;
use std::env;
use std::path::Path;
use std::str::FromStr;
use std::sync::OnceLock;

// Ensures the dotenv files are read only once per process.
static LOAD_ENV: OnceLock<()> = OnceLock::new();

/// Loads environment variables from `.env` and environment-specific files.
///
/// Files are read in this order, earlier values are never overwritten:
/// 1. `.env`
/// 2. `.env.dev` in debug builds, `.env.prod` in release builds
/// 3. `.env.local`
pub fn load_dotenv() {
    LOAD_ENV.get_or_init(|| {
        dotenv().ok();

        let env_file = if cfg!(debug_assertions) {
            ".env.dev"
        } else {
            ".env.prod"
        };

        for file in [env_file, ".env.local"] {
            if Path::new(file).exists() {
                dotenvy::from_filename(file).ok();
            }
        }
    });
}

/// Reads `key` and parses it into `T`, or returns `default` when unset.
pub fn get_env_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Debug,
{
    match env::var(key) {
        Ok(val) => val
            .trim()
            .parse()
            .map_err(|e| anyhow!("Failed to parse {} env var: {:?}", key, e)),
        Err(_) => Ok(default),
    }
}

/// Reads a comma separated list from `key`, or returns `default` when unset.
pub fn get_vec_from_env_or<T>(key: &str, default: Vec<T>) -> Result<Vec<T>>
where
    T: FromStr,
    T::Err: Into<anyhow::Error>,
{
    match env::var(key) {
        Ok(val) => val
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| {
                s.parse()
                    .map_err(Into::into)
                    .with_context(|| format!("Failed to parse {} env var", key))
            })
            .collect(),
        Err(_) => Ok(default),
    }
}

/// Reads a byte size from `key`, accepting K, M and G suffixes (case-insensitive).
pub fn get_size_from_env_or(key: &str, default: u64) -> Result<u64> {
    match env::var(key) {
        Ok(val) => parse_size(&val).ok_or_else(|| anyhow!("Failed to parse {} env var", key)),
        Err(_) => Ok(default),
    }
}

/// Reads a flag from `key`.
/// `true`, `1`, `yes`, `on` and `false`, `0`, `no`, `off` are recognized.
pub fn get_bool_from_env_or(key: &str, default: bool) -> Result<bool> {
    match env::var(key) {
        Ok(value) => parse_bool(&value)
            .ok_or_else(|| anyhow!("Failed to parse {} env var as `bool`", key)),
        Err(_) => Ok(default),
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Converts a size string such as `10M` to a number of bytes.
pub fn parse_size(size_str: &str) -> Option<u64> {
    if size_str.is_empty() {
        return None;
    }

    let size_str = size_str.to_lowercase();

    let (num_part, unit_multiplier) = match size_str.chars().last() {
        Some('k') => (&size_str[..size_str.len() - 1], 1024u64),
        Some('m') => (&size_str[..size_str.len() - 1], 1024u64 * 1024),
        Some('g') => (&size_str[..size_str.len() - 1], 1024u64 * 1024 * 1024),
        _ => (size_str.as_str(), 1),
    };

    num_part
        .parse::<u64>()
        .ok()
        .and_then(|num| num.checked_mul(unit_multiplier))
}
