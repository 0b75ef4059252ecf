/// Reel lifecycle and engagement mutations
use chrono::Utc;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, Result};
use crate::models::{CreateReelRequest, EnrichedReel, Reel, ToggleResponse};
use crate::services::feed::FeedComposer;
use crate::services::media_storage::MediaStorage;
use crate::services::mention_parser::normalize_hashtags;
use crate::services::moderation::ModerationFilter;
use crate::storage::{ContentStore, EngagementStore};

pub struct ReelService {
    content: Arc<dyn ContentStore>,
    engagement: Arc<dyn EngagementStore>,
    moderation: Arc<ModerationFilter>,
    media: Arc<dyn MediaStorage>,
    feed: Arc<FeedComposer>,
    require_local_urls: bool,
}

impl ReelService {
    pub fn new(
        content: Arc<dyn ContentStore>,
        engagement: Arc<dyn EngagementStore>,
        moderation: Arc<ModerationFilter>,
        media: Arc<dyn MediaStorage>,
        feed: Arc<FeedComposer>,
        require_local_urls: bool,
    ) -> Self {
        Self {
            content,
            engagement,
            moderation,
            media,
            feed,
            require_local_urls,
        }
    }

    /// Create a reel from already-uploaded media
    ///
    /// The video may still be going through a processing job; the reel is
    /// visible immediately with whatever URL the client supplies.
    pub async fn create_reel(
        &self,
        author_id: Uuid,
        request: CreateReelRequest,
    ) -> Result<EnrichedReel> {
        request.validate()?;

        let video_url = request
            .video_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .ok_or_else(|| AppError::Validation("videoUrl is required".into()))?
            .to_string();

        if !self.media.is_local_url(&video_url) {
            if self.require_local_urls {
                return Err(AppError::Validation(
                    "videoUrl must reference media uploaded to this service".into(),
                ));
            }
            warn!(author_id = %author_id, video_url = %video_url, "Reel references external media");
        }

        let reel = Reel {
            id: Uuid::new_v4(),
            author_id,
            video_url,
            thumbnail_url: non_empty(request.thumbnail_url),
            caption: non_empty(request.caption),
            hashtags: normalize_hashtags(&request.hashtags),
            category: non_empty(request.category),
            duration_seconds: request.duration_seconds,
            match_id: non_empty(request.match_id),
            team_id: non_empty(request.team_id),
            player_id: non_empty(request.player_id),
            created_at: Utc::now(),
        };

        let reel = self.content.insert_reel(reel).await?;
        info!(reel_id = %reel.id, author_id = %author_id, "Reel created");
        Ok(self.feed.enrich_one(Some(author_id), reel).await)
    }

    /// Single enriched reel; hidden (404) when the viewer blocked its author
    pub async fn get_reel(&self, viewer: Option<Uuid>, reel_id: Uuid) -> Result<EnrichedReel> {
        let reel = self.visible_reel(viewer, reel_id).await?;
        Ok(self.feed.enrich_one(viewer, reel).await)
    }

    /// Delete a reel and everything attached to it; author only
    pub async fn delete_reel(&self, user_id: Uuid, reel_id: Uuid) -> Result<()> {
        let reel = self.require_reel(reel_id).await?;
        if reel.author_id != user_id {
            return Err(AppError::Forbidden(
                "Only the author can delete this reel".into(),
            ));
        }
        self.content.delete_reel(reel_id).await?;
        self.engagement.purge_reel(reel_id).await?;
        info!(reel_id = %reel_id, "Reel deleted");
        Ok(())
    }

    pub async fn like(&self, user_id: Uuid, reel_id: Uuid) -> Result<ToggleResponse> {
        self.visible_reel(Some(user_id), reel_id).await?;
        let count = self.engagement.like_reel(user_id, reel_id).await?;
        Ok(ToggleResponse {
            active: true,
            count,
        })
    }

    pub async fn unlike(&self, user_id: Uuid, reel_id: Uuid) -> Result<ToggleResponse> {
        self.require_reel(reel_id).await?;
        let count = self.engagement.unlike_reel(user_id, reel_id).await?;
        Ok(ToggleResponse {
            active: false,
            count,
        })
    }

    pub async fn save(&self, user_id: Uuid, reel_id: Uuid) -> Result<ToggleResponse> {
        self.visible_reel(Some(user_id), reel_id).await?;
        self.engagement.save_reel(user_id, reel_id).await?;
        Ok(ToggleResponse {
            active: true,
            count: 1,
        })
    }

    pub async fn unsave(&self, user_id: Uuid, reel_id: Uuid) -> Result<ToggleResponse> {
        self.require_reel(reel_id).await?;
        self.engagement.unsave_reel(user_id, reel_id).await?;
        Ok(ToggleResponse {
            active: false,
            count: 0,
        })
    }

    /// Record a view, returning the new view count
    pub async fn record_view(&self, user_id: Uuid, reel_id: Uuid) -> Result<u64> {
        self.visible_reel(Some(user_id), reel_id).await?;
        self.engagement.record_view(user_id, reel_id).await
    }

    async fn require_reel(&self, reel_id: Uuid) -> Result<Reel> {
        self.content
            .get_reel(reel_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Reel not found".into()))
    }

    async fn visible_reel(&self, viewer: Option<Uuid>, reel_id: Uuid) -> Result<Reel> {
        let reel = self.require_reel(reel_id).await?;
        if let Some(viewer) = viewer {
            if self.moderation.is_blocked(viewer, reel.author_id) {
                return Err(AppError::NotFound("Reel not found".into()));
            }
        }
        Ok(reel)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
