/// Mention notification fan-out
use async_trait::async_trait;
use tracing::info;
use uuid::Uuid;

use crate::models::{Comment, UserProfile};

/// Delivers "you were mentioned" notifications
#[async_trait]
pub trait MentionNotifier: Send + Sync {
    async fn notify_mentioned(&self, comment: &Comment, recipients: &[UserProfile]);
}

/// Emits one structured log event per recipient
#[derive(Debug, Default, Clone)]
pub struct LogMentionNotifier;

#[async_trait]
impl MentionNotifier for LogMentionNotifier {
    async fn notify_mentioned(&self, comment: &Comment, recipients: &[UserProfile]) {
        for recipient in recipients {
            info!(
                event = "comment_mention",
                comment_id = %comment.id,
                post_id = %comment.post_id,
                author_id = %comment.author_id,
                recipient_id = %recipient.id,
                "User mentioned in comment"
            );
        }
    }
}

/// Recipients for a comment: resolved users minus the comment's author
pub fn mention_recipients(author_id: Uuid, resolved: Vec<UserProfile>) -> Vec<UserProfile> {
    resolved
        .into_iter()
        .filter(|user| user.id != author_id)
        .collect()
}
