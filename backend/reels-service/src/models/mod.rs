/// Data models for reels-service
///
/// This module defines structures for:
/// - Reel: Short-form video content and its enriched feed projection
/// - Comment: Threaded comments with per-comment likes
/// - ProcessingJob: Asynchronous trim/filter/music-mix jobs
/// - ActionClass: Admission-control buckets
///
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;
use validator::Validate;

use crate::config::RateLimitRule;

/// Maximum caption / comment length in characters
pub const MAX_TEXT_LENGTH: usize = 2200;

/// Maximum number of hashtags kept on a reel
pub const MAX_HASHTAGS: usize = 30;

// ========================================
// Admission Control Models
// ========================================

/// Rate-limited action class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionClass {
    Likes,
    Comments,
    Views,
    Uploads,
    General,
}

impl ActionClass {
    pub const ALL: [ActionClass; 5] = [
        ActionClass::Likes,
        ActionClass::Comments,
        ActionClass::Views,
        ActionClass::Uploads,
        ActionClass::General,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Likes => "likes",
            Self::Comments => "comments",
            Self::Views => "views",
            Self::Uploads => "uploads",
            Self::General => "general",
        }
    }

    /// Built-in quota used when no override is configured
    pub fn default_rule(&self) -> RateLimitRule {
        let (max_requests, window_ms) = match self {
            Self::Likes => (100, 60_000),
            Self::Comments => (30, 60_000),
            Self::Views => (200, 60_000),
            Self::Uploads => (20, 3_600_000),
            Self::General => (60, 60_000),
        };
        RateLimitRule {
            max_requests,
            window_ms,
        }
    }
}

// ========================================
// User Models
// ========================================

/// User record as known to the service (populated from gateway identity)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: Uuid,
    pub username: String,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl UserProfile {
    pub fn new(id: Uuid, username: impl Into<String>) -> Self {
        Self {
            id,
            username: username.into(),
            display_name: None,
            avatar_url: None,
            created_at: Utc::now(),
        }
    }

    /// Username used when the gateway does not forward one
    pub fn placeholder_username(id: Uuid) -> String {
        let simple = id.simple().to_string();
        format!("user_{}", &simple[..8])
    }
}

/// Author summary embedded in enriched responses
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorSummary {
    pub id: Uuid,
    pub username: String,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
}

impl From<&UserProfile> for AuthorSummary {
    fn from(user: &UserProfile) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            display_name: user.display_name.clone(),
            avatar_url: user.avatar_url.clone(),
        }
    }
}

// ========================================
// Reel Models
// ========================================

/// Reel (short-form video) entity
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reel {
    pub id: Uuid,
    pub author_id: Uuid,
    pub video_url: String,
    pub thumbnail_url: Option<String>,
    pub caption: Option<String>,
    pub hashtags: Vec<String>,
    pub category: Option<String>,
    pub duration_seconds: Option<u32>,
    pub match_id: Option<String>,
    pub team_id: Option<String>,
    pub player_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Create reel request payload
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateReelRequest {
    pub video_url: Option<String>,
    #[validate(length(max = 2048))]
    pub thumbnail_url: Option<String>,
    #[validate(length(max = 2200))]
    pub caption: Option<String>,
    #[serde(default)]
    pub hashtags: Vec<String>,
    #[validate(length(min = 1, max = 50))]
    pub category: Option<String>,
    #[validate(range(min = 1, max = 600))]
    pub duration_seconds: Option<u32>,
    #[validate(length(max = 64))]
    pub match_id: Option<String>,
    #[validate(length(max = 64))]
    pub team_id: Option<String>,
    #[validate(length(max = 64))]
    pub player_id: Option<String>,
}

/// Live engagement counters plus the viewer's own state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngagementView {
    pub like_count: u64,
    pub comment_count: u64,
    pub view_count: u64,
    pub is_liked: bool,
    pub is_saved: bool,
}

impl EngagementView {
    /// Ranking score used by trending mode
    pub fn engagement_score(&self) -> u64 {
        self.like_count + self.comment_count
    }
}

/// Reel as returned by every read endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichedReel {
    #[serde(flatten)]
    pub reel: Reel,
    pub author: Option<AuthorSummary>,
    #[serde(flatten)]
    pub engagement: EngagementView,
}

/// Feed composition mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedMode {
    /// Reels from followed authors (and the viewer), newest first
    Following,
    /// Recent reels ranked by likes + comments
    Trending,
    /// Reels from authors the viewer does not follow, newest first
    Explore,
    /// A single author's reels, newest first
    ByAuthor(Uuid),
}

impl FeedMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Following => "following",
            Self::Trending => "trending",
            Self::Explore => "explore",
            Self::ByAuthor(_) => "by_author",
        }
    }
}

/// Pagination query parameters (`?page=&limit=`)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageParams {
    pub page: Option<usize>,
    pub limit: Option<usize>,
}

/// Like/save mutation response
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToggleResponse {
    pub active: bool,
    pub count: u64,
}

// ========================================
// Comment Models
// ========================================

/// Comment entity
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: Uuid,
    pub post_id: Uuid,
    pub author_id: Uuid,
    pub content: String,
    pub parent_id: Option<Uuid>,
    pub like_count: u64,
    pub created_at: DateTime<Utc>,
}

/// Create comment / reply payload
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateCommentRequest {
    #[validate(length(min = 1, max = 2200))]
    pub content: String,
}

/// Comment as rendered to a viewer
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentView {
    #[serde(flatten)]
    pub comment: Comment,
    pub author: Option<AuthorSummary>,
    pub mentions: Vec<String>,
    pub is_liked: bool,
    pub replies: Vec<CommentView>,
}

// ========================================
// Media Processing Models
// ========================================

/// Uploaded media response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub video_url: String,
    pub thumbnail_url: Option<String>,
    pub filename: String,
}

/// Colour filter applied during processing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoFilter {
    None,
    Grayscale,
    Sepia,
    Vintage,
    Vivid,
    Cool,
    Warm,
}

impl VideoFilter {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Grayscale => "grayscale",
            Self::Sepia => "sepia",
            Self::Vintage => "vintage",
            Self::Vivid => "vivid",
            Self::Cool => "cool",
            Self::Warm => "warm",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "none" | "" => Some(Self::None),
            "grayscale" | "greyscale" => Some(Self::Grayscale),
            "sepia" => Some(Self::Sepia),
            "vintage" => Some(Self::Vintage),
            "vivid" => Some(Self::Vivid),
            "cool" => Some(Self::Cool),
            "warm" => Some(Self::Warm),
            _ => None,
        }
    }
}

/// Transform options for a processing job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProcessingOptions {
    pub trim_start: Option<f64>,
    pub trim_end: Option<f64>,
    pub filter: VideoFilter,
    pub music_track: Option<String>,
    pub original_volume: f32,
    pub music_volume: f32,
}

impl Default for ProcessingOptions {
    fn default() -> Self {
        Self {
            trim_start: None,
            trim_end: None,
            filter: VideoFilter::None,
            music_track: None,
            original_volume: 1.0,
            music_volume: 1.0,
        }
    }
}

impl ProcessingOptions {
    /// Check option bounds before a job is queued
    pub fn validate(&self) -> Result<(), String> {
        if let Some(start) = self.trim_start {
            if !start.is_finite() || start < 0.0 {
                return Err("trimStart must be a non-negative number of seconds".into());
            }
        }
        if let Some(end) = self.trim_end {
            if !end.is_finite() || end <= 0.0 {
                return Err("trimEnd must be a positive number of seconds".into());
            }
            if end <= self.trim_start.unwrap_or(0.0) {
                return Err("trimEnd must be greater than trimStart".into());
            }
        }
        for (name, volume) in [
            ("originalVolume", self.original_volume),
            ("musicVolume", self.music_volume),
        ] {
            if !(0.0..=2.0).contains(&volume) {
                return Err(format!("{name} must be between 0.0 and 2.0"));
            }
        }
        if let Some(track) = &self.music_track {
            if track.is_empty()
                || track.contains('/')
                || track.contains('\\')
                || track.contains("..")
            {
                return Err("musicTrack must be a plain file name".into());
            }
        }
        Ok(())
    }
}

/// Processing job lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Running,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Monotonic queued -> running -> {completed | failed}
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (Self::Queued, Self::Running)
                | (Self::Queued, Self::Failed)
                | (Self::Running, Self::Completed)
                | (Self::Running, Self::Failed)
        )
    }
}

/// Output of a completed job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobOutput {
    pub video_url: String,
    pub thumbnail_url: Option<String>,
}

/// Asynchronous processing job
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingJob {
    pub id: Uuid,
    pub owner_id: Uuid,
    #[serde(skip)]
    pub source_path: PathBuf,
    pub source_url: String,
    pub options: ProcessingOptions,
    pub status: JobStatus,
    pub result: Option<JobOutput>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

/// Response of `POST /reels/process`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessResponse {
    pub job_id: Option<Uuid>,
    pub video_url: String,
    pub processing: String,
}
