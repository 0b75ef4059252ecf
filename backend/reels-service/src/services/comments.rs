/// Comment threads, replies and per-comment likes
use chrono::Utc;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, Result};
use crate::models::{AuthorSummary, Comment, CommentView, CreateCommentRequest, ToggleResponse};
use crate::services::mention_parser::extract_mentions;
use crate::services::moderation::ModerationFilter;
use crate::services::notifications::{mention_recipients, MentionNotifier};
use crate::storage::{ContentStore, EngagementStore, UserDirectory};

pub struct CommentService {
    content: Arc<dyn ContentStore>,
    users: Arc<dyn UserDirectory>,
    engagement: Arc<dyn EngagementStore>,
    moderation: Arc<ModerationFilter>,
    notifier: Arc<dyn MentionNotifier>,
}

impl CommentService {
    pub fn new(
        content: Arc<dyn ContentStore>,
        users: Arc<dyn UserDirectory>,
        engagement: Arc<dyn EngagementStore>,
        moderation: Arc<ModerationFilter>,
        notifier: Arc<dyn MentionNotifier>,
    ) -> Self {
        Self {
            content,
            users,
            engagement,
            moderation,
            notifier,
        }
    }

    /// Top-level comment on a reel
    pub async fn add_comment(
        &self,
        author_id: Uuid,
        post_id: Uuid,
        request: CreateCommentRequest,
    ) -> Result<CommentView> {
        let content = validated_content(request)?;
        self.ensure_reel(post_id).await?;
        self.insert(author_id, post_id, None, content).await
    }

    /// Reply to `parent_id`, which must be a comment on the same reel
    pub async fn reply(
        &self,
        author_id: Uuid,
        post_id: Uuid,
        parent_id: Uuid,
        request: CreateCommentRequest,
    ) -> Result<CommentView> {
        let content = validated_content(request)?;
        self.ensure_reel(post_id).await?;
        self.comment_on(post_id, parent_id).await?;
        self.insert(author_id, post_id, Some(parent_id), content)
            .await
    }

    /// Comments on a reel as a thread tree, oldest first at each level
    ///
    /// Comments by authors the viewer blocked are dropped with their replies.
    pub async fn list_comments(
        &self,
        viewer: Option<Uuid>,
        post_id: Uuid,
    ) -> Result<Vec<CommentView>> {
        self.ensure_reel(post_id).await?;
        let comments = self.engagement.list_comments(post_id).await?;
        let visible = self
            .moderation
            .filter_visible(viewer, comments, |c| c.author_id);

        let author_ids: Vec<Uuid> = visible
            .iter()
            .map(|c| c.author_id)
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        let authors: HashMap<Uuid, AuthorSummary> = self
            .users
            .get_users(&author_ids)
            .await?
            .iter()
            .map(|u| (u.id, AuthorSummary::from(u)))
            .collect();

        let mut liked = HashSet::new();
        if let Some(viewer) = viewer {
            for comment in &visible {
                if self.engagement.comment_like_state(comment.id, viewer).await? {
                    liked.insert(comment.id);
                }
            }
        }

        let views = visible
            .into_iter()
            .map(|comment| CommentView {
                author: authors.get(&comment.author_id).cloned(),
                mentions: extract_mentions(&comment.content),
                is_liked: liked.contains(&comment.id),
                replies: Vec::new(),
                comment,
            })
            .collect();
        Ok(build_thread(views))
    }

    /// Delete a comment (and its replies); only its author may do so
    pub async fn delete_comment(&self, user_id: Uuid, post_id: Uuid, comment_id: Uuid) -> Result<()> {
        let comment = self.comment_on(post_id, comment_id).await?;
        if comment.author_id != user_id {
            return Err(AppError::Forbidden(
                "Only the author can delete this comment".into(),
            ));
        }
        self.engagement.delete_comment(comment_id).await?;
        info!(comment_id = %comment_id, post_id = %post_id, "Comment deleted");
        Ok(())
    }

    pub async fn like_comment(
        &self,
        user_id: Uuid,
        post_id: Uuid,
        comment_id: Uuid,
    ) -> Result<ToggleResponse> {
        self.comment_on(post_id, comment_id).await?;
        let count = self.engagement.like_comment(user_id, comment_id).await?;
        Ok(ToggleResponse {
            active: true,
            count,
        })
    }

    pub async fn unlike_comment(
        &self,
        user_id: Uuid,
        post_id: Uuid,
        comment_id: Uuid,
    ) -> Result<ToggleResponse> {
        self.comment_on(post_id, comment_id).await?;
        let count = self.engagement.unlike_comment(user_id, comment_id).await?;
        Ok(ToggleResponse {
            active: false,
            count,
        })
    }

    async fn insert(
        &self,
        author_id: Uuid,
        post_id: Uuid,
        parent_id: Option<Uuid>,
        content: String,
    ) -> Result<CommentView> {
        let comment = self
            .engagement
            .add_comment(Comment {
                id: Uuid::new_v4(),
                post_id,
                author_id,
                content,
                parent_id,
                like_count: 0,
                created_at: Utc::now(),
            })
            .await?;

        let mentions = extract_mentions(&comment.content);
        self.notify_mentions(&comment, &mentions).await?;

        let author = self
            .users
            .get_user(author_id)
            .await?
            .as_ref()
            .map(AuthorSummary::from);
        Ok(CommentView {
            comment,
            author,
            mentions,
            is_liked: false,
            replies: Vec::new(),
        })
    }

    async fn notify_mentions(&self, comment: &Comment, mentions: &[String]) -> Result<()> {
        if mentions.is_empty() {
            return Ok(());
        }
        let mut resolved = Vec::with_capacity(mentions.len());
        for username in mentions {
            match self.users.find_by_username(username).await? {
                Some(user) => resolved.push(user),
                None => debug!(username = %username, "Mentioned user not found"),
            }
        }
        let recipients = mention_recipients(comment.author_id, resolved);
        if !recipients.is_empty() {
            self.notifier.notify_mentioned(comment, &recipients).await;
        }
        Ok(())
    }

    async fn ensure_reel(&self, post_id: Uuid) -> Result<()> {
        match self.content.get_reel(post_id).await? {
            Some(_) => Ok(()),
            None => Err(AppError::NotFound("Reel not found".into())),
        }
    }

    /// The comment, provided it belongs to `post_id`
    async fn comment_on(&self, post_id: Uuid, comment_id: Uuid) -> Result<Comment> {
        match self.engagement.get_comment(comment_id).await? {
            Some(comment) if comment.post_id == post_id => Ok(comment),
            _ => Err(AppError::NotFound("Comment not found".into())),
        }
    }
}

fn validated_content(request: CreateCommentRequest) -> Result<String> {
    request.validate()?;
    let content = request.content.trim().to_string();
    if content.is_empty() {
        return Err(AppError::Validation("Comment content cannot be empty".into()));
    }
    Ok(content)
}

/// Nest replies under their parents; replies whose parent is gone are dropped
fn build_thread(views: Vec<CommentView>) -> Vec<CommentView> {
    let mut children: HashMap<Uuid, Vec<CommentView>> = HashMap::new();
    let mut roots = Vec::new();
    for view in views {
        match view.comment.parent_id {
            Some(parent) => children.entry(parent).or_default().push(view),
            None => roots.push(view),
        }
    }

    fn attach(
        mut view: CommentView,
        children: &mut HashMap<Uuid, Vec<CommentView>>,
    ) -> CommentView {
        if let Some(replies) = children.remove(&view.comment.id) {
            view.replies = replies
                .into_iter()
                .map(|reply| attach(reply, children))
                .collect();
        }
        view
    }

    roots
        .into_iter()
        .map(|root| attach(root, &mut children))
        .collect()
}
