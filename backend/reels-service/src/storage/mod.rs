/// Storage capability interfaces
///
/// The feed core composes against these traits and never owns persistence.
/// `MemoryStore` is the single-process implementation used by the service
/// binary and the test-suite.
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use uuid::Uuid;

use crate::error::Result;
use crate::models::{Comment, Reel, UserProfile};

pub mod memory;

pub use memory::MemoryStore;

/// Filter for listing reels, results are newest first
#[derive(Debug, Clone, Default)]
pub struct ContentQuery {
    /// Restrict to these authors (`None` = any author)
    pub authors: Option<HashSet<Uuid>>,
    pub exclude_authors: HashSet<Uuid>,
    pub created_after: Option<DateTime<Utc>>,
    pub limit: usize,
}

impl ContentQuery {
    pub fn recent(limit: usize) -> Self {
        Self {
            limit,
            ..Default::default()
        }
    }

    pub fn matches(&self, reel: &Reel) -> bool {
        if let Some(authors) = &self.authors {
            if !authors.contains(&reel.author_id) {
                return false;
            }
        }
        if self.exclude_authors.contains(&reel.author_id) {
            return false;
        }
        match self.created_after {
            Some(after) => reel.created_at >= after,
            None => true,
        }
    }
}

#[async_trait]
pub trait ContentStore: Send + Sync {
    async fn insert_reel(&self, reel: Reel) -> Result<Reel>;
    async fn get_reel(&self, id: Uuid) -> Result<Option<Reel>>;
    /// Remove a reel, returning it when it existed
    async fn delete_reel(&self, id: Uuid) -> Result<Option<Reel>>;
    async fn list_reels(&self, query: &ContentQuery) -> Result<Vec<Reel>>;
}

#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Insert or refresh a user; an existing profile keeps its `created_at`
    async fn upsert_user(&self, user: UserProfile) -> Result<UserProfile>;
    async fn get_user(&self, id: Uuid) -> Result<Option<UserProfile>>;
    /// Case-insensitive username lookup
    async fn find_by_username(&self, username: &str) -> Result<Option<UserProfile>>;
    async fn get_users(&self, ids: &[Uuid]) -> Result<Vec<UserProfile>>;
}

#[async_trait]
pub trait FollowGraph: Send + Sync {
    async fn follow(&self, follower: Uuid, followee: Uuid) -> Result<()>;
    async fn unfollow(&self, follower: Uuid, followee: Uuid) -> Result<()>;
    async fn following(&self, user: Uuid) -> Result<HashSet<Uuid>>;
}

/// Likes, saves, views and comments per reel
///
/// Boolean relations reject double application with `AppError::Conflict`.
#[async_trait]
pub trait EngagementStore: Send + Sync {
    /// Returns the new like count
    async fn like_reel(&self, user: Uuid, reel: Uuid) -> Result<u64>;
    async fn unlike_reel(&self, user: Uuid, reel: Uuid) -> Result<u64>;
    async fn save_reel(&self, user: Uuid, reel: Uuid) -> Result<()>;
    async fn unsave_reel(&self, user: Uuid, reel: Uuid) -> Result<()>;
    /// Returns the new view count
    async fn record_view(&self, user: Uuid, reel: Uuid) -> Result<u64>;

    async fn like_count(&self, reel: Uuid) -> Result<u64>;
    async fn comment_count(&self, reel: Uuid) -> Result<u64>;
    async fn view_count(&self, reel: Uuid) -> Result<u64>;
    /// `(is_liked, is_saved)` for the viewer
    async fn viewer_state(&self, reel: Uuid, viewer: Uuid) -> Result<(bool, bool)>;
    /// Reels saved by the user, most recently saved first
    async fn saved_reels(&self, user: Uuid) -> Result<Vec<Uuid>>;
    /// Drop every relation and comment attached to a reel
    async fn purge_reel(&self, reel: Uuid) -> Result<()>;

    async fn add_comment(&self, comment: Comment) -> Result<Comment>;
    async fn get_comment(&self, id: Uuid) -> Result<Option<Comment>>;
    /// Comments on a reel, oldest first
    async fn list_comments(&self, reel: Uuid) -> Result<Vec<Comment>>;
    /// Remove a comment and its replies, returning the removed comment
    async fn delete_comment(&self, id: Uuid) -> Result<Option<Comment>>;

    /// Returns the new comment like count
    async fn like_comment(&self, user: Uuid, comment: Uuid) -> Result<u64>;
    async fn unlike_comment(&self, user: Uuid, comment: Uuid) -> Result<u64>;
    async fn comment_like_state(&self, comment: Uuid, viewer: Uuid) -> Result<bool>;
}
