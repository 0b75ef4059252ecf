/// Moderation Filter
///
/// Directed block relation. `block(A, B)` hides B's content from A only;
/// B's view of A is unaffected.
use dashmap::DashMap;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::models::AuthorSummary;
use crate::storage::UserDirectory;

pub struct ModerationFilter {
    /// blocker -> blocked users
    blocks: DashMap<Uuid, HashSet<Uuid>>,
    users: Arc<dyn UserDirectory>,
}

impl ModerationFilter {
    pub fn new(users: Arc<dyn UserDirectory>) -> Self {
        Self {
            blocks: DashMap::new(),
            users,
        }
    }

    pub async fn block(&self, blocker: Uuid, blocked: Uuid) -> Result<()> {
        if blocker == blocked {
            return Err(AppError::SelfAction("Cannot block yourself".into()));
        }
        if self.users.get_user(blocked).await?.is_none() {
            return Err(AppError::NotFound("User not found".into()));
        }
        if !self.blocks.entry(blocker).or_default().insert(blocked) {
            return Err(AppError::Conflict("User is already blocked".into()));
        }

        info!(blocker_id = %blocker, blocked_id = %blocked, "User blocked");
        Ok(())
    }

    pub async fn unblock(&self, blocker: Uuid, blocked: Uuid) -> Result<()> {
        if blocker == blocked {
            return Err(AppError::SelfAction("Cannot unblock yourself".into()));
        }
        let removed = self
            .blocks
            .get_mut(&blocker)
            .map(|mut set| set.remove(&blocked))
            .unwrap_or(false);
        if !removed {
            return Err(AppError::Conflict("User is not blocked".into()));
        }

        info!(blocker_id = %blocker, blocked_id = %blocked, "User unblocked");
        Ok(())
    }

    pub fn is_blocked(&self, blocker: Uuid, blocked: Uuid) -> bool {
        self.blocks
            .get(&blocker)
            .map(|set| set.contains(&blocked))
            .unwrap_or(false)
    }

    /// Snapshot of everyone `viewer` has blocked
    pub fn blocked_set(&self, viewer: Uuid) -> HashSet<Uuid> {
        self.blocks
            .get(&viewer)
            .map(|set| set.clone())
            .unwrap_or_default()
    }

    pub async fn list_blocked(&self, viewer: Uuid) -> Result<Vec<AuthorSummary>> {
        let ids: Vec<Uuid> = self.blocked_set(viewer).into_iter().collect();
        let mut users: Vec<AuthorSummary> = self
            .users
            .get_users(&ids)
            .await?
            .iter()
            .map(AuthorSummary::from)
            .collect();
        users.sort_by(|a, b| a.username.cmp(&b.username));
        Ok(users)
    }

    /// Drop items whose author the viewer has blocked
    pub fn filter_visible<T>(
        &self,
        viewer: Option<Uuid>,
        items: Vec<T>,
        author_of: impl Fn(&T) -> Uuid,
    ) -> Vec<T> {
        let Some(viewer) = viewer else {
            return items;
        };
        let blocked = self.blocked_set(viewer);
        if blocked.is_empty() {
            return items;
        }
        items
            .into_iter()
            .filter(|item| !blocked.contains(&author_of(item)))
            .collect()
    }
}
