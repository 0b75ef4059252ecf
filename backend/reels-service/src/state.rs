/// Shared application state
///
/// Built once at startup and handed to every actix worker as `web::Data`.
use std::sync::Arc;

use crate::config::Config;
use crate::error::Result;
use crate::services::{
    AdmissionController, CommentService, DisabledTranscoder, FeedComposer, FfmpegTranscoder,
    LocalMediaStorage, LogMentionNotifier, MediaProcessingQueue, MediaStorage, ModerationFilter,
    ReelService, Transcoder,
};
use crate::storage::{FollowGraph, MemoryStore, UserDirectory};

pub struct AppState {
    pub config: Config,
    pub users: Arc<dyn UserDirectory>,
    pub follows: Arc<dyn FollowGraph>,
    pub admission: Arc<AdmissionController>,
    pub moderation: Arc<ModerationFilter>,
    pub feed: Arc<FeedComposer>,
    pub reels: Arc<ReelService>,
    pub comments: Arc<CommentService>,
    pub media: Arc<MediaProcessingQueue>,
}

impl AppState {
    /// Probe ffmpeg and build the state
    pub async fn build(config: Config) -> Result<Self> {
        let probed = FfmpegTranscoder::probe(&config.media.ffmpeg_path).await;
        let transcoder: Arc<dyn Transcoder> = if probed.is_available() {
            Arc::new(probed)
        } else {
            tracing::warn!("Transcoder unavailable, uploads will be stored as-is");
            Arc::new(DisabledTranscoder)
        };
        Self::with_transcoder(config, transcoder).await
    }

    /// Build the state around an explicit transcoder
    pub async fn with_transcoder(config: Config, transcoder: Arc<dyn Transcoder>) -> Result<Self> {
        let store = Arc::new(MemoryStore::new());
        let media_storage: Arc<dyn MediaStorage> = Arc::new(
            LocalMediaStorage::new(&config.media.storage_dir, &config.media.public_base_url)
                .await?,
        );

        let admission = Arc::new(AdmissionController::new(&config.rate_limit));
        let moderation = Arc::new(ModerationFilter::new(store.clone()));
        let feed = Arc::new(FeedComposer::new(
            store.clone(),
            store.clone(),
            store.clone(),
            store.clone(),
            moderation.clone(),
            config.feed.clone(),
        ));
        let reels = Arc::new(ReelService::new(
            store.clone(),
            store.clone(),
            moderation.clone(),
            media_storage.clone(),
            feed.clone(),
            config.media.require_local_urls,
        ));
        let comments = Arc::new(CommentService::new(
            store.clone(),
            store.clone(),
            store.clone(),
            moderation.clone(),
            Arc::new(LogMentionNotifier),
        ));
        let media = Arc::new(MediaProcessingQueue::start(
            &config.media,
            media_storage,
            transcoder,
        ));

        Ok(Self {
            config,
            users: store.clone(),
            follows: store,
            admission,
            moderation,
            feed,
            reels,
            comments,
            media,
        })
    }
}
