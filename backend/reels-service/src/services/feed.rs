/// Feed Composer
///
/// Every mode runs the same pipeline:
/// 1. Over-fetch `page * page_size` candidates, newest first
/// 2. Drop reels whose author the viewer blocked
/// 3. Slice out the requested page (a short page is fine)
/// 4. Enrich each reel concurrently (author, counts, viewer state)
/// 5. Trending only: rank the enriched page by likes + comments
///
/// A failed enrichment lookup degrades that field to its default instead
/// of failing the page.
use chrono::{Duration, Utc};
use futures::future::join_all;
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::FeedConfig;
use crate::error::Result;
use crate::metrics;
use crate::models::{AuthorSummary, EngagementView, EnrichedReel, FeedMode, Reel};
use crate::services::moderation::ModerationFilter;
use crate::storage::{ContentQuery, ContentStore, EngagementStore, FollowGraph, UserDirectory};

/// Resolved pagination window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    /// 1-based page number
    pub number: usize,
    pub size: usize,
}

impl Page {
    pub fn offset(&self) -> usize {
        self.number.saturating_sub(1).saturating_mul(self.size)
    }

    /// Candidates needed to fill this page before filtering
    pub fn fetch_limit(&self) -> usize {
        self.number.saturating_mul(self.size)
    }
}

pub struct FeedComposer {
    content: Arc<dyn ContentStore>,
    users: Arc<dyn UserDirectory>,
    follows: Arc<dyn FollowGraph>,
    engagement: Arc<dyn EngagementStore>,
    moderation: Arc<ModerationFilter>,
    config: FeedConfig,
}

impl FeedComposer {
    pub fn new(
        content: Arc<dyn ContentStore>,
        users: Arc<dyn UserDirectory>,
        follows: Arc<dyn FollowGraph>,
        engagement: Arc<dyn EngagementStore>,
        moderation: Arc<ModerationFilter>,
        config: FeedConfig,
    ) -> Self {
        Self {
            content,
            users,
            follows,
            engagement,
            moderation,
            config,
        }
    }

    /// Clamp client pagination to the configured bounds
    pub fn page(&self, page: Option<usize>, limit: Option<usize>) -> Page {
        let size = limit
            .unwrap_or(self.config.default_page_size)
            .clamp(1, self.config.max_page_size.max(1));
        // keep number * size representable
        let last_page = usize::MAX / size;
        Page {
            number: page.unwrap_or(1).clamp(1, last_page),
            size,
        }
    }

    pub async fn get_feed(
        &self,
        viewer: Option<Uuid>,
        page: Page,
        mode: FeedMode,
    ) -> Result<Vec<EnrichedReel>> {
        metrics::record_feed_request(mode.as_str());

        let Some(query) = self.candidate_query(viewer, page, mode).await? else {
            return Ok(Vec::new());
        };
        let candidates = self.content.list_reels(&query).await?;
        let fetched = candidates.len();

        let visible = self
            .moderation
            .filter_visible(viewer, candidates, |reel| reel.author_id);
        let page_items: Vec<Reel> = visible
            .into_iter()
            .skip(page.offset())
            .take(page.size)
            .collect();

        debug!(
            mode = mode.as_str(),
            page = page.number,
            fetched,
            returned = page_items.len(),
            "Feed composed"
        );

        let mut enriched = self.enrich(viewer, page_items).await;
        if mode == FeedMode::Trending {
            rank_by_engagement(&mut enriched);
        }
        Ok(enriched)
    }

    /// Viewer's saved reels, most recently saved first
    pub async fn get_saved(&self, viewer: Uuid, page: Page) -> Result<Vec<EnrichedReel>> {
        let saved_ids = self.engagement.saved_reels(viewer).await?;

        let mut reels = Vec::new();
        for id in saved_ids.into_iter().take(page.fetch_limit()) {
            if let Some(reel) = self.content.get_reel(id).await? {
                reels.push(reel);
            }
        }

        let visible = self
            .moderation
            .filter_visible(Some(viewer), reels, |reel| reel.author_id);
        let page_items = visible
            .into_iter()
            .skip(page.offset())
            .take(page.size)
            .collect();
        Ok(self.enrich(Some(viewer), page_items).await)
    }

    async fn candidate_query(
        &self,
        viewer: Option<Uuid>,
        page: Page,
        mode: FeedMode,
    ) -> Result<Option<ContentQuery>> {
        let mut query = ContentQuery::recent(page.fetch_limit());

        match mode {
            FeedMode::Following => {
                if let Some(viewer) = viewer {
                    let mut authors = self.follows.following(viewer).await?;
                    if !authors.is_empty() {
                        authors.insert(viewer);
                        query.authors = Some(authors);
                    }
                }
            }
            FeedMode::Trending => {
                query.created_after =
                    Some(Utc::now() - Duration::hours(self.config.trending_window_hours));
            }
            FeedMode::Explore => {
                if let Some(viewer) = viewer {
                    query.exclude_authors = self.follows.following(viewer).await?;
                    query.exclude_authors.insert(viewer);
                }
            }
            FeedMode::ByAuthor(author) => {
                if let Some(viewer) = viewer {
                    if self.moderation.is_blocked(viewer, author) {
                        return Ok(None);
                    }
                }
                query.authors = Some([author].into_iter().collect());
            }
        }

        Ok(Some(query))
    }

    /// Enrich reels concurrently, preserving input order
    pub async fn enrich(&self, viewer: Option<Uuid>, reels: Vec<Reel>) -> Vec<EnrichedReel> {
        join_all(reels.into_iter().map(|reel| self.enrich_one(viewer, reel))).await
    }

    pub async fn enrich_one(&self, viewer: Option<Uuid>, reel: Reel) -> EnrichedReel {
        let reel_id = reel.id;
        let (author, like_count, comment_count, view_count, viewer_state) = futures::join!(
            self.users.get_user(reel.author_id),
            self.engagement.like_count(reel_id),
            self.engagement.comment_count(reel_id),
            self.engagement.view_count(reel_id),
            async {
                match viewer {
                    Some(viewer) => self.engagement.viewer_state(reel_id, viewer).await,
                    None => Ok((false, false)),
                }
            }
        );

        let author = match author {
            Ok(Some(user)) => Some(AuthorSummary::from(&user)),
            Ok(None) => {
                metrics::record_enrichment_failure("author");
                None
            }
            Err(e) => {
                enrichment_failed(reel_id, "author", &e);
                None
            }
        };
        let (is_liked, is_saved) = or_default(reel_id, "viewer_state", viewer_state);

        EnrichedReel {
            engagement: EngagementView {
                like_count: or_default(reel_id, "like_count", like_count),
                comment_count: or_default(reel_id, "comment_count", comment_count),
                view_count: or_default(reel_id, "view_count", view_count),
                is_liked,
                is_saved,
            },
            author,
            reel,
        }
    }
}

/// Likes + comments descending, newer first on ties
pub fn rank_by_engagement(items: &mut [EnrichedReel]) {
    items.sort_by(|a, b| {
        b.engagement
            .engagement_score()
            .cmp(&a.engagement.engagement_score())
            .then_with(|| b.reel.created_at.cmp(&a.reel.created_at))
    });
}

fn or_default<T: Default>(reel_id: Uuid, field: &'static str, value: Result<T>) -> T {
    match value {
        Ok(value) => value,
        Err(e) => {
            enrichment_failed(reel_id, field, &e);
            T::default()
        }
    }
}

fn enrichment_failed(reel_id: Uuid, field: &'static str, error: &dyn std::fmt::Display) {
    metrics::record_enrichment_failure(field);
    warn!(reel_id = %reel_id, field, error = %error, "Enrichment lookup failed, using default");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::models::UserProfile;
    use crate::storage::MemoryStore;
    use async_trait::async_trait;

    struct Fixture {
        store: Arc<MemoryStore>,
        moderation: Arc<ModerationFilter>,
        composer: FeedComposer,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let moderation = Arc::new(ModerationFilter::new(store.clone()));
        let composer = FeedComposer::new(
            store.clone(),
            store.clone(),
            store.clone(),
            store.clone(),
            moderation.clone(),
            FeedConfig::default(),
        );
        Fixture {
            store,
            moderation,
            composer,
        }
    }

    async fn user(store: &MemoryStore, name: &str) -> Uuid {
        let id = Uuid::new_v4();
        store.upsert_user(UserProfile::new(id, name)).await.unwrap();
        id
    }

    async fn post(store: &MemoryStore, author: Uuid, age_minutes: i64) -> Reel {
        store
            .insert_reel(Reel {
                id: Uuid::new_v4(),
                author_id: author,
                video_url: "/media/clip.mp4".into(),
                thumbnail_url: None,
                caption: None,
                hashtags: vec![],
                category: None,
                duration_seconds: None,
                match_id: None,
                team_id: None,
                player_id: None,
                created_at: Utc::now() - Duration::minutes(age_minutes),
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_blocked_author_hidden_for_blocker_only() {
        let f = fixture();
        let a = user(&f.store, "alice").await;
        let b = user(&f.store, "bob").await;
        post(&f.store, b, 1).await;
        post(&f.store, a, 2).await;

        f.moderation.block(a, b).await.unwrap();
        let page = f.composer.page(None, None);

        let feed_a = f
            .composer
            .get_feed(Some(a), page, FeedMode::Trending)
            .await
            .unwrap();
        assert!(feed_a.iter().all(|item| item.reel.author_id != b));

        let feed_b = f
            .composer
            .get_feed(Some(b), page, FeedMode::Trending)
            .await
            .unwrap();
        assert_eq!(feed_b.len(), 2);

        let by_author = f
            .composer
            .get_feed(Some(a), page, FeedMode::ByAuthor(b))
            .await
            .unwrap();
        assert!(by_author.is_empty());
    }

    #[tokio::test]
    async fn test_trending_ranks_by_likes_plus_comments() {
        let f = fixture();
        let author = user(&f.store, "author").await;
        let popular_likes = post(&f.store, author, 10).await;
        let popular_comments = post(&f.store, author, 20).await;

        for _ in 0..10 {
            f.store
                .like_reel(Uuid::new_v4(), popular_likes.id)
                .await
                .unwrap();
        }
        for _ in 0..5 {
            add_comment(&f.store, popular_likes.id).await;
        }
        for _ in 0..3 {
            f.store
                .like_reel(Uuid::new_v4(), popular_comments.id)
                .await
                .unwrap();
        }
        for _ in 0..20 {
            add_comment(&f.store, popular_comments.id).await;
        }

        let feed = f
            .composer
            .get_feed(None, f.composer.page(None, None), FeedMode::Trending)
            .await
            .unwrap();
        assert_eq!(feed[0].reel.id, popular_comments.id);
        assert_eq!(feed[0].engagement.engagement_score(), 23);
        assert_eq!(feed[1].reel.id, popular_likes.id);
    }

    #[tokio::test]
    async fn test_trending_ties_newest_first() {
        let f = fixture();
        let author = user(&f.store, "author").await;
        let older = post(&f.store, author, 30).await;
        let newer = post(&f.store, author, 5).await;

        let feed = f
            .composer
            .get_feed(None, f.composer.page(None, None), FeedMode::Trending)
            .await
            .unwrap();
        assert_eq!(feed[0].reel.id, newer.id);
        assert_eq!(feed[1].reel.id, older.id);
    }

    #[tokio::test]
    async fn test_following_and_explore_partition() {
        let f = fixture();
        let viewer = user(&f.store, "viewer").await;
        let followed = user(&f.store, "followed").await;
        let stranger = user(&f.store, "stranger").await;
        post(&f.store, followed, 1).await;
        post(&f.store, stranger, 2).await;
        post(&f.store, viewer, 3).await;
        f.store.follow(viewer, followed).await.unwrap();

        let page = f.composer.page(None, None);
        let following = f
            .composer
            .get_feed(Some(viewer), page, FeedMode::Following)
            .await
            .unwrap();
        let authors: Vec<Uuid> = following.iter().map(|r| r.reel.author_id).collect();
        assert_eq!(authors, vec![followed, viewer]);

        let explore = f
            .composer
            .get_feed(Some(viewer), page, FeedMode::Explore)
            .await
            .unwrap();
        assert_eq!(explore.len(), 1);
        assert_eq!(explore[0].reel.author_id, stranger);
    }

    #[tokio::test]
    async fn test_pagination_slices_pages() {
        let f = fixture();
        let author = user(&f.store, "author").await;
        for age in 0..5 {
            post(&f.store, author, age).await;
        }

        let second = f
            .composer
            .get_feed(None, f.composer.page(Some(2), Some(2)), FeedMode::Following)
            .await
            .unwrap();
        assert_eq!(second.len(), 2);

        let third = f
            .composer
            .get_feed(None, f.composer.page(Some(3), Some(2)), FeedMode::Following)
            .await
            .unwrap();
        assert_eq!(third.len(), 1);

        assert_eq!(f.composer.page(Some(0), Some(1000)).size, 50);
        assert_eq!(f.composer.page(Some(0), None).number, 1);
    }

    #[tokio::test]
    async fn test_huge_page_number_is_empty_not_overflow() {
        let f = fixture();
        let author = user(&f.store, "author").await;
        post(&f.store, author, 0).await;

        let page = f.composer.page(Some(usize::MAX), Some(50));
        assert!(page.number.checked_mul(page.size).is_some());
        assert_eq!(page.offset(), (page.number - 1) * 50);

        for mode in [FeedMode::Following, FeedMode::Trending, FeedMode::Explore] {
            let reels = f.composer.get_feed(None, page, mode).await.unwrap();
            assert!(reels.is_empty());
        }

        let unclamped = Page {
            number: usize::MAX,
            size: usize::MAX,
        };
        assert_eq!(unclamped.fetch_limit(), usize::MAX);
        assert_eq!(unclamped.offset(), usize::MAX);
    }

    #[tokio::test]
    async fn test_viewer_state_reflected() {
        let f = fixture();
        let author = user(&f.store, "author").await;
        let viewer = user(&f.store, "viewer").await;
        let reel = post(&f.store, author, 1).await;
        f.store.like_reel(viewer, reel.id).await.unwrap();
        f.store.save_reel(viewer, reel.id).await.unwrap();

        let item = f.composer.enrich_one(Some(viewer), reel.clone()).await;
        assert!(item.engagement.is_liked && item.engagement.is_saved);
        assert_eq!(item.engagement.like_count, 1);
        assert_eq!(item.author.unwrap().username, "author");

        let anonymous = f.composer.enrich_one(None, reel).await;
        assert!(!anonymous.engagement.is_liked);
    }

    async fn add_comment(store: &MemoryStore, post_id: Uuid) {
        store
            .add_comment(crate::models::Comment {
                id: Uuid::new_v4(),
                post_id,
                author_id: Uuid::new_v4(),
                content: "wow".into(),
                parent_id: None,
                like_count: 0,
                created_at: Utc::now(),
            })
            .await
            .unwrap();
    }

    /// Engagement backend whose count lookups always fail
    struct BrokenCounts(MemoryStore);

    #[async_trait]
    impl EngagementStore for BrokenCounts {
        async fn like_reel(&self, u: Uuid, r: Uuid) -> Result<u64> {
            self.0.like_reel(u, r).await
        }
        async fn unlike_reel(&self, u: Uuid, r: Uuid) -> Result<u64> {
            self.0.unlike_reel(u, r).await
        }
        async fn save_reel(&self, u: Uuid, r: Uuid) -> Result<()> {
            self.0.save_reel(u, r).await
        }
        async fn unsave_reel(&self, u: Uuid, r: Uuid) -> Result<()> {
            self.0.unsave_reel(u, r).await
        }
        async fn record_view(&self, u: Uuid, r: Uuid) -> Result<u64> {
            self.0.record_view(u, r).await
        }
        async fn like_count(&self, _: Uuid) -> Result<u64> {
            Err(AppError::Storage("counter backend down".into()))
        }
        async fn comment_count(&self, _: Uuid) -> Result<u64> {
            Err(AppError::Storage("counter backend down".into()))
        }
        async fn view_count(&self, r: Uuid) -> Result<u64> {
            self.0.view_count(r).await
        }
        async fn viewer_state(&self, r: Uuid, v: Uuid) -> Result<(bool, bool)> {
            self.0.viewer_state(r, v).await
        }
        async fn saved_reels(&self, u: Uuid) -> Result<Vec<Uuid>> {
            self.0.saved_reels(u).await
        }
        async fn purge_reel(&self, r: Uuid) -> Result<()> {
            self.0.purge_reel(r).await
        }
        async fn add_comment(&self, c: crate::models::Comment) -> Result<crate::models::Comment> {
            self.0.add_comment(c).await
        }
        async fn get_comment(&self, id: Uuid) -> Result<Option<crate::models::Comment>> {
            self.0.get_comment(id).await
        }
        async fn list_comments(&self, r: Uuid) -> Result<Vec<crate::models::Comment>> {
            self.0.list_comments(r).await
        }
        async fn delete_comment(&self, id: Uuid) -> Result<Option<crate::models::Comment>> {
            self.0.delete_comment(id).await
        }
        async fn like_comment(&self, u: Uuid, c: Uuid) -> Result<u64> {
            self.0.like_comment(u, c).await
        }
        async fn unlike_comment(&self, u: Uuid, c: Uuid) -> Result<u64> {
            self.0.unlike_comment(u, c).await
        }
        async fn comment_like_state(&self, c: Uuid, v: Uuid) -> Result<bool> {
            self.0.comment_like_state(c, v).await
        }
    }

    #[tokio::test]
    async fn test_partial_enrichment_failure_renders_defaults() {
        let store = Arc::new(MemoryStore::new());
        let moderation = Arc::new(ModerationFilter::new(store.clone()));
        let composer = FeedComposer::new(
            store.clone(),
            store.clone(),
            store.clone(),
            Arc::new(BrokenCounts(MemoryStore::new())),
            moderation,
            FeedConfig::default(),
        );
        let author = user(&store, "author").await;
        post(&store, author, 1).await;
        // author without a directory entry
        post(&store, Uuid::new_v4(), 2).await;

        let feed = composer
            .get_feed(None, composer.page(None, None), FeedMode::Explore)
            .await
            .unwrap();
        assert_eq!(feed.len(), 2);
        assert!(feed.iter().all(|item| item.engagement.like_count == 0));
        assert!(feed[0].author.is_some());
        assert!(feed[1].author.is_none());
    }
}
