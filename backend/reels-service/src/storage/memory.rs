/// In-memory storage backend
///
/// Every mutation runs inside a single DashMap shard guard, so each call is
/// one atomic step. Guards from different maps are never held at the same
/// time.
use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::HashSet;
use uuid::Uuid;

use super::{ContentQuery, ContentStore, EngagementStore, FollowGraph, UserDirectory};
use crate::error::{AppError, Result};
use crate::models::{Comment, Reel, UserProfile};

#[derive(Debug, Default)]
struct ReelEngagement {
    likes: HashSet<Uuid>,
    saves: HashSet<Uuid>,
    views: u64,
    comments: Vec<Uuid>,
}

#[derive(Debug)]
struct CommentRecord {
    comment: Comment,
    likers: HashSet<Uuid>,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    reels: DashMap<Uuid, Reel>,
    users: DashMap<Uuid, UserProfile>,
    /// lowercase username -> user id
    usernames: DashMap<String, Uuid>,
    follows: DashMap<Uuid, HashSet<Uuid>>,
    engagement: DashMap<Uuid, ReelEngagement>,
    comments: DashMap<Uuid, CommentRecord>,
    /// user -> saved reels in save order
    saved: DashMap<Uuid, Vec<Uuid>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ContentStore for MemoryStore {
    async fn insert_reel(&self, reel: Reel) -> Result<Reel> {
        self.reels.insert(reel.id, reel.clone());
        Ok(reel)
    }

    async fn get_reel(&self, id: Uuid) -> Result<Option<Reel>> {
        Ok(self.reels.get(&id).map(|r| r.value().clone()))
    }

    async fn delete_reel(&self, id: Uuid) -> Result<Option<Reel>> {
        Ok(self.reels.remove(&id).map(|(_, reel)| reel))
    }

    async fn list_reels(&self, query: &ContentQuery) -> Result<Vec<Reel>> {
        let mut reels: Vec<Reel> = self
            .reels
            .iter()
            .filter(|entry| query.matches(entry.value()))
            .map(|entry| entry.value().clone())
            .collect();

        reels.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        reels.truncate(query.limit);
        Ok(reels)
    }
}

#[async_trait]
impl UserDirectory for MemoryStore {
    async fn upsert_user(&self, mut user: UserProfile) -> Result<UserProfile> {
        let previous_username = if let Some(existing) = self.users.get(&user.id) {
            user.created_at = existing.created_at;
            if user.display_name.is_none() {
                user.display_name = existing.display_name.clone();
            }
            if user.avatar_url.is_none() {
                user.avatar_url = existing.avatar_url.clone();
            }
            Some(existing.username.to_lowercase())
        } else {
            None
        };

        let key = user.username.to_lowercase();
        if let Some(previous) = previous_username {
            if previous != key {
                self.usernames.remove_if(&previous, |_, id| *id == user.id);
            }
        }
        self.usernames.insert(key, user.id);
        self.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn get_user(&self, id: Uuid) -> Result<Option<UserProfile>> {
        Ok(self.users.get(&id).map(|u| u.value().clone()))
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<UserProfile>> {
        let id = match self.usernames.get(&username.to_lowercase()) {
            Some(id) => *id,
            None => return Ok(None),
        };
        self.get_user(id).await
    }

    async fn get_users(&self, ids: &[Uuid]) -> Result<Vec<UserProfile>> {
        Ok(ids
            .iter()
            .filter_map(|id| self.users.get(id).map(|u| u.value().clone()))
            .collect())
    }
}

#[async_trait]
impl FollowGraph for MemoryStore {
    async fn follow(&self, follower: Uuid, followee: Uuid) -> Result<()> {
        if follower == followee {
            return Err(AppError::SelfAction("Cannot follow yourself".into()));
        }
        if !self.follows.entry(follower).or_default().insert(followee) {
            return Err(AppError::Conflict("Already following this user".into()));
        }
        Ok(())
    }

    async fn unfollow(&self, follower: Uuid, followee: Uuid) -> Result<()> {
        let removed = self
            .follows
            .get_mut(&follower)
            .map(|mut set| set.remove(&followee))
            .unwrap_or(false);
        if !removed {
            return Err(AppError::Conflict("Not following this user".into()));
        }
        Ok(())
    }

    async fn following(&self, user: Uuid) -> Result<HashSet<Uuid>> {
        Ok(self
            .follows
            .get(&user)
            .map(|set| set.clone())
            .unwrap_or_default())
    }
}

#[async_trait]
impl EngagementStore for MemoryStore {
    async fn like_reel(&self, user: Uuid, reel: Uuid) -> Result<u64> {
        let mut entry = self.engagement.entry(reel).or_default();
        if !entry.likes.insert(user) {
            return Err(AppError::Conflict("Reel already liked".into()));
        }
        Ok(entry.likes.len() as u64)
    }

    async fn unlike_reel(&self, user: Uuid, reel: Uuid) -> Result<u64> {
        let mut entry = self.engagement.entry(reel).or_default();
        if !entry.likes.remove(&user) {
            return Err(AppError::Conflict("Reel is not liked".into()));
        }
        Ok(entry.likes.len() as u64)
    }

    async fn save_reel(&self, user: Uuid, reel: Uuid) -> Result<()> {
        let inserted = self.engagement.entry(reel).or_default().saves.insert(user);
        if !inserted {
            return Err(AppError::Conflict("Reel already saved".into()));
        }
        self.saved.entry(user).or_default().push(reel);
        Ok(())
    }

    async fn unsave_reel(&self, user: Uuid, reel: Uuid) -> Result<()> {
        let removed = self
            .engagement
            .get_mut(&reel)
            .map(|mut e| e.saves.remove(&user))
            .unwrap_or(false);
        if !removed {
            return Err(AppError::Conflict("Reel is not saved".into()));
        }
        if let Some(mut list) = self.saved.get_mut(&user) {
            list.retain(|id| *id != reel);
        }
        Ok(())
    }

    async fn record_view(&self, _user: Uuid, reel: Uuid) -> Result<u64> {
        let mut entry = self.engagement.entry(reel).or_default();
        entry.views += 1;
        Ok(entry.views)
    }

    async fn like_count(&self, reel: Uuid) -> Result<u64> {
        Ok(self
            .engagement
            .get(&reel)
            .map(|e| e.likes.len() as u64)
            .unwrap_or(0))
    }

    async fn comment_count(&self, reel: Uuid) -> Result<u64> {
        Ok(self
            .engagement
            .get(&reel)
            .map(|e| e.comments.len() as u64)
            .unwrap_or(0))
    }

    async fn view_count(&self, reel: Uuid) -> Result<u64> {
        Ok(self.engagement.get(&reel).map(|e| e.views).unwrap_or(0))
    }

    async fn viewer_state(&self, reel: Uuid, viewer: Uuid) -> Result<(bool, bool)> {
        Ok(self
            .engagement
            .get(&reel)
            .map(|e| (e.likes.contains(&viewer), e.saves.contains(&viewer)))
            .unwrap_or((false, false)))
    }

    async fn saved_reels(&self, user: Uuid) -> Result<Vec<Uuid>> {
        Ok(self
            .saved
            .get(&user)
            .map(|list| list.iter().rev().copied().collect())
            .unwrap_or_default())
    }

    async fn purge_reel(&self, reel: Uuid) -> Result<()> {
        let Some((_, engagement)) = self.engagement.remove(&reel) else {
            return Ok(());
        };
        for comment_id in &engagement.comments {
            self.comments.remove(comment_id);
        }
        for user in &engagement.saves {
            if let Some(mut list) = self.saved.get_mut(user) {
                list.retain(|id| *id != reel);
            }
        }
        Ok(())
    }

    async fn add_comment(&self, comment: Comment) -> Result<Comment> {
        self.comments.insert(
            comment.id,
            CommentRecord {
                comment: comment.clone(),
                likers: HashSet::new(),
            },
        );
        self.engagement
            .entry(comment.post_id)
            .or_default()
            .comments
            .push(comment.id);
        Ok(comment)
    }

    async fn get_comment(&self, id: Uuid) -> Result<Option<Comment>> {
        Ok(self.comments.get(&id).map(|r| r.comment.clone()))
    }

    async fn list_comments(&self, reel: Uuid) -> Result<Vec<Comment>> {
        let ids = self
            .engagement
            .get(&reel)
            .map(|e| e.comments.clone())
            .unwrap_or_default();

        let mut comments: Vec<Comment> = ids
            .iter()
            .filter_map(|id| self.comments.get(id).map(|r| r.comment.clone()))
            .collect();
        comments.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(comments)
    }

    async fn delete_comment(&self, id: Uuid) -> Result<Option<Comment>> {
        let Some((_, record)) = self.comments.remove(&id) else {
            return Ok(None);
        };
        let removed = record.comment;

        // every descendant goes with it
        let mut removed_ids = HashSet::from([id]);
        let mut frontier = vec![id];
        while !frontier.is_empty() {
            let children: Vec<Uuid> = self
                .comments
                .iter()
                .filter(|r| {
                    r.comment
                        .parent_id
                        .is_some_and(|parent| frontier.contains(&parent))
                })
                .map(|r| r.comment.id)
                .collect();
            for child in &children {
                self.comments.remove(child);
            }
            removed_ids.extend(children.iter().copied());
            frontier = children;
        }

        if let Some(mut engagement) = self.engagement.get_mut(&removed.post_id) {
            engagement.comments.retain(|c| !removed_ids.contains(c));
        }
        Ok(Some(removed))
    }

    async fn like_comment(&self, user: Uuid, comment: Uuid) -> Result<u64> {
        let mut record = self
            .comments
            .get_mut(&comment)
            .ok_or_else(|| AppError::NotFound("Comment not found".into()))?;
        if !record.likers.insert(user) {
            return Err(AppError::Conflict("Comment already liked".into()));
        }
        record.comment.like_count += 1;
        Ok(record.comment.like_count)
    }

    async fn unlike_comment(&self, user: Uuid, comment: Uuid) -> Result<u64> {
        let mut record = self
            .comments
            .get_mut(&comment)
            .ok_or_else(|| AppError::NotFound("Comment not found".into()))?;
        if !record.likers.remove(&user) {
            return Err(AppError::Conflict("Comment is not liked".into()));
        }
        record.comment.like_count = record.comment.like_count.saturating_sub(1);
        Ok(record.comment.like_count)
    }

    async fn comment_like_state(&self, comment: Uuid, viewer: Uuid) -> Result<bool> {
        Ok(self
            .comments
            .get(&comment)
            .map(|r| r.likers.contains(&viewer))
            .unwrap_or(false))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn reel(author: Uuid, age_minutes: i64) -> Reel {
        Reel {
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
        }
    }

    fn comment(post: Uuid, parent: Option<Uuid>) -> Comment {
        Comment {
            id: Uuid::new_v4(),
            post_id: post,
            author_id: Uuid::new_v4(),
            content: "nice".into(),
            parent_id: parent,
            like_count: 0,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_list_reels_newest_first_with_filters() {
        let store = MemoryStore::new();
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();
        let old = store.insert_reel(reel(alice, 30)).await.unwrap();
        let new = store.insert_reel(reel(alice, 1)).await.unwrap();
        store.insert_reel(reel(bob, 5)).await.unwrap();

        let all = store.list_reels(&ContentQuery::recent(10)).await.unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].id, new.id);
        assert_eq!(all[2].id, old.id);

        let query = ContentQuery {
            exclude_authors: HashSet::from([alice]),
            limit: 10,
            ..Default::default()
        };
        let without_alice = store.list_reels(&query).await.unwrap();
        assert!(without_alice.iter().all(|r| r.author_id == bob));

        let limited = store.list_reels(&ContentQuery::recent(1)).await.unwrap();
        assert_eq!(limited.len(), 1);
    }

    #[tokio::test]
    async fn test_double_like_and_unlike_rejected() {
        let store = MemoryStore::new();
        let user = Uuid::new_v4();
        let reel = Uuid::new_v4();

        assert_eq!(store.like_reel(user, reel).await.unwrap(), 1);
        assert!(matches!(
            store.like_reel(user, reel).await,
            Err(AppError::Conflict(_))
        ));
        assert_eq!(store.unlike_reel(user, reel).await.unwrap(), 0);
        assert!(matches!(
            store.unlike_reel(user, reel).await,
            Err(AppError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn test_saved_reels_most_recent_first() {
        let store = MemoryStore::new();
        let user = Uuid::new_v4();
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();

        store.save_reel(user, first).await.unwrap();
        store.save_reel(user, second).await.unwrap();
        assert_eq!(store.saved_reels(user).await.unwrap(), vec![second, first]);

        store.unsave_reel(user, second).await.unwrap();
        assert_eq!(store.saved_reels(user).await.unwrap(), vec![first]);
        assert_eq!(store.viewer_state(second, user).await.unwrap(), (false, false));
    }

    #[tokio::test]
    async fn test_comment_likes_move_by_one() {
        let store = MemoryStore::new();
        let viewer = Uuid::new_v4();
        let c = store.add_comment(comment(Uuid::new_v4(), None)).await.unwrap();

        assert_eq!(store.like_comment(viewer, c.id).await.unwrap(), 1);
        assert!(store.like_comment(viewer, c.id).await.is_err());
        assert!(store.comment_like_state(c.id, viewer).await.unwrap());
        assert_eq!(store.unlike_comment(viewer, c.id).await.unwrap(), 0);
        assert!(store.unlike_comment(viewer, c.id).await.is_err());
    }

    #[tokio::test]
    async fn test_delete_comment_removes_replies() {
        let store = MemoryStore::new();
        let post = Uuid::new_v4();
        let parent = store.add_comment(comment(post, None)).await.unwrap();
        store
            .add_comment(comment(post, Some(parent.id)))
            .await
            .unwrap();
        let other = store.add_comment(comment(post, None)).await.unwrap();
        assert_eq!(store.comment_count(post).await.unwrap(), 3);

        store.delete_comment(parent.id).await.unwrap();
        let remaining = store.list_comments(post).await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, other.id);
        assert_eq!(store.comment_count(post).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_delete_comment_removes_nested_thread() {
        let store = MemoryStore::new();
        let post = Uuid::new_v4();
        let viewer = Uuid::new_v4();
        let root = store.add_comment(comment(post, None)).await.unwrap();
        let r1 = store
            .add_comment(comment(post, Some(root.id)))
            .await
            .unwrap();
        let r2 = store
            .add_comment(comment(post, Some(r1.id)))
            .await
            .unwrap();
        assert_eq!(store.comment_count(post).await.unwrap(), 3);

        store.delete_comment(root.id).await.unwrap();
        assert_eq!(store.comment_count(post).await.unwrap(), 0);
        assert!(store.get_comment(r2.id).await.unwrap().is_none());
        assert!(matches!(
            store.like_comment(viewer, r2.id).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_upsert_user_keeps_created_at_and_reindexes() {
        let store = MemoryStore::new();
        let id = Uuid::new_v4();
        let first = store
            .upsert_user(UserProfile::new(id, "Alice"))
            .await
            .unwrap();
        let renamed = store
            .upsert_user(UserProfile::new(id, "alice_2"))
            .await
            .unwrap();

        assert_eq!(renamed.created_at, first.created_at);
        assert!(store.find_by_username("ALICE").await.unwrap().is_none());
        assert_eq!(
            store.find_by_username("Alice_2").await.unwrap().map(|u| u.id),
            Some(id)
        );
    }

    #[tokio::test]
    async fn test_follow_rules() {
        let store = MemoryStore::new();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        assert!(matches!(
            store.follow(a, a).await,
            Err(AppError::SelfAction(_))
        ));
        store.follow(a, b).await.unwrap();
        assert!(store.follow(a, b).await.is_err());
        assert!(store.following(a).await.unwrap().contains(&b));
        assert!(store.following(b).await.unwrap().is_empty());
        store.unfollow(a, b).await.unwrap();
        assert!(store.unfollow(a, b).await.is_err());
    }
}
