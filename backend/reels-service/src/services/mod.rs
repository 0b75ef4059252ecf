/// Service layer for reels-service
///
/// This module provides business logic for:
/// - Admission control: per-user fixed-window rate limiting
/// - Media: upload policy, storage, transcoding and the processing queue
/// - Feed composition: candidate selection, moderation, enrichment, ranking
/// - Engagement: reels, comments, mentions
pub mod comments;
pub mod feed;
pub mod media_storage;
pub mod mention_parser;
pub mod moderation;
pub mod notifications;
pub mod processing;
pub mod rate_limiter;
pub mod reels;
pub mod transcoder;

pub use comments::CommentService;
pub use feed::{FeedComposer, Page};
pub use media_storage::{LocalMediaStorage, MediaKind, MediaStorage, StoredMedia, UploadPolicy};
pub use mention_parser::{extract_mentions, normalize_hashtags};
pub use moderation::ModerationFilter;
pub use notifications::{LogMentionNotifier, MentionNotifier};
pub use processing::MediaProcessingQueue;
pub use rate_limiter::{AdmissionController, RateLimitDecision};
pub use reels::ReelService;
pub use transcoder::{DisabledTranscoder, FfmpegTranscoder, Transcoder};
