/// Configuration management for reels-service
///
/// Loads configuration from environment variables with sensible defaults.
use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;
use std::str::FromStr;

use crate::models::ActionClass;

#[derive(Clone, Debug, Deserialize)]
pub struct Config {
    pub app: AppConfig,
    pub media: MediaConfig,
    pub rate_limit: RateLimitConfig,
    pub feed: FeedConfig,
}

#[derive(Clone, Debug, Deserialize)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub env: String,
    pub workers: Option<usize>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct MediaConfig {
    /// Directory uploads and processed outputs are written to
    pub storage_dir: PathBuf,
    /// URL prefix under which `storage_dir` is served
    pub public_base_url: String,
    pub max_video_bytes: usize,
    pub max_image_bytes: usize,
    /// Library of music tracks that can be mixed into a reel
    pub music_dir: PathBuf,
    pub ffmpeg_path: String,
    pub processing_workers: usize,
    pub queue_capacity: usize,
    /// Reject reels whose video URL was not produced by this service
    pub require_local_urls: bool,
}

/// Quota for one action class
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
pub struct RateLimitRule {
    pub max_requests: u32,
    pub window_ms: u64,
}

#[derive(Clone, Debug, Deserialize)]
pub struct RateLimitConfig {
    pub rules: HashMap<ActionClass, RateLimitRule>,
    pub sweep_interval_secs: u64,
}

#[derive(Clone, Debug, Deserialize)]
pub struct FeedConfig {
    pub default_page_size: usize,
    pub max_page_size: usize,
    pub trending_window_hours: i64,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, String> {
        Ok(Config {
            app: AppConfig {
                host: env_or("REELS_SERVICE_HOST", "0.0.0.0".to_string()),
                port: env_parse("REELS_SERVICE_PORT", 8090)?,
                env: env_or("APP_ENV", "development".to_string()),
                workers: std::env::var("HTTP_WORKERS")
                    .ok()
                    .and_then(|v| v.parse().ok()),
            },
            media: MediaConfig {
                storage_dir: PathBuf::from(env_or("MEDIA_STORAGE_DIR", "./uploads".to_string())),
                public_base_url: env_or("MEDIA_PUBLIC_BASE_URL", "/media".to_string()),
                max_video_bytes: env_parse("MEDIA_MAX_VIDEO_BYTES", 100 * 1024 * 1024)?,
                max_image_bytes: env_parse("MEDIA_MAX_IMAGE_BYTES", 8 * 1024 * 1024)?,
                music_dir: PathBuf::from(env_or("MEDIA_MUSIC_DIR", "./music".to_string())),
                ffmpeg_path: env_or("FFMPEG_PATH", "ffmpeg".to_string()),
                processing_workers: env_parse("MEDIA_PROCESSING_WORKERS", 2)?,
                queue_capacity: env_parse("MEDIA_PROCESSING_QUEUE_CAPACITY", 64)?,
                require_local_urls: env_flag("MEDIA_REQUIRE_LOCAL_URLS", false),
            },
            rate_limit: RateLimitConfig::from_env()?,
            feed: FeedConfig {
                default_page_size: env_parse("FEED_DEFAULT_PAGE_SIZE", 20)?,
                max_page_size: env_parse("FEED_MAX_PAGE_SIZE", 50)?,
                trending_window_hours: env_parse("FEED_TRENDING_WINDOW_HOURS", 168)?,
            },
        })
    }
}

impl RateLimitConfig {
    fn from_env() -> Result<Self, String> {
        let mut rules = HashMap::new();
        for class in ActionClass::ALL {
            let defaults = class.default_rule();
            let prefix = format!("RATE_LIMIT_{}", class.as_str().to_ascii_uppercase());
            let rule = RateLimitRule {
                max_requests: env_parse(&format!("{prefix}_MAX"), defaults.max_requests)?,
                window_ms: env_parse(&format!("{prefix}_WINDOW_MS"), defaults.window_ms)?,
            };
            if rule.max_requests == 0 || rule.window_ms == 0 {
                return Err(format!("{prefix}_MAX and {prefix}_WINDOW_MS must be > 0"));
            }
            rules.insert(class, rule);
        }

        Ok(Self {
            rules,
            sweep_interval_secs: env_parse("RATE_LIMIT_SWEEP_INTERVAL_SECS", 60)?,
        })
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            rules: ActionClass::ALL
                .iter()
                .map(|class| (*class, class.default_rule()))
                .collect(),
            sweep_interval_secs: 60,
        }
    }
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            default_page_size: 20,
            max_page_size: 50,
            trending_window_hours: 168,
        }
    }
}

impl MediaConfig {
    /// Defaults rooted at `storage_dir`, used by tests and local tooling
    pub fn with_storage_dir(storage_dir: impl Into<PathBuf>) -> Self {
        let storage_dir = storage_dir.into();
        Self {
            music_dir: storage_dir.join("music"),
            storage_dir,
            public_base_url: "/media".to_string(),
            max_video_bytes: 100 * 1024 * 1024,
            max_image_bytes: 8 * 1024 * 1024,
            ffmpeg_path: "ffmpeg".to_string(),
            processing_workers: 2,
            queue_capacity: 64,
            require_local_urls: false,
        }
    }
}

fn env_or(key: &str, default: String) -> String {
    std::env::var(key).unwrap_or(default)
}

fn env_flag(key: &str, default: bool) -> bool {
    std::env::var(key)
        .map(|val| val == "1" || val.eq_ignore_ascii_case("true"))
        .unwrap_or(default)
}

fn env_parse<T: FromStr>(key: &str, default: T) -> Result<T, String> {
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| format!("{key} has an invalid value: {raw:?}")),
        Err(_) => Ok(default),
    }
}
