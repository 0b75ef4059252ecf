/// HTTP handlers for reels-service
///
/// - Reels: create, fetch, delete, per-author listing
/// - Feed: following, trending, explore, saved
/// - Engagement: likes, saves, views
/// - Comments: threads, replies, comment likes
/// - Users: block and follow relations
/// - Uploads: multipart intake and processing jobs
use actix_web::{guard, web};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::middleware::RateLimit;
use crate::models::ActionClass;
use crate::services::AdmissionController;

pub mod comments;
pub mod engagement;
pub mod feed;
pub mod health;
pub mod reels;
pub mod uploads;
pub mod users;

pub use health::{health_check, liveness_check, readiness_check};

/// Parse a path segment as a UUID
pub(crate) fn parse_id(raw: &str, what: &str) -> Result<Uuid> {
    Uuid::parse_str(raw).map_err(|_| AppError::Validation(format!("Invalid {what} ID")))
}

/// Register the `/reels` scope
///
/// Every resource is wrapped with the rate class it consumes. Static
/// segments are registered before `/{id}` so they are not captured by it.
pub fn configure(cfg: &mut web::ServiceConfig, admission: Arc<AdmissionController>) {
    let limit = |class: ActionClass| RateLimit::new(admission.clone(), class);

    cfg.service(
        web::scope("/reels")
            .service(
                web::resource("")
                    .wrap(limit(ActionClass::General))
                    .route(web::post().to(reels::create_reel)),
            )
            .service(
                web::resource("/upload")
                    .wrap(limit(ActionClass::Uploads))
                    .route(web::post().to(uploads::upload_media)),
            )
            .service(
                web::resource("/process")
                    .wrap(limit(ActionClass::Uploads))
                    .route(web::post().to(uploads::process_media)),
            )
            .service(
                web::resource("/process/{job_id}")
                    .wrap(limit(ActionClass::General))
                    .route(web::get().to(uploads::get_job_status)),
            )
            .service(
                web::resource("/feed")
                    .wrap(limit(ActionClass::General))
                    .route(web::get().to(feed::following_feed)),
            )
            .service(
                web::resource("/trending")
                    .wrap(limit(ActionClass::General))
                    .route(web::get().to(feed::trending_feed)),
            )
            .service(
                web::resource("/explore")
                    .wrap(limit(ActionClass::General))
                    .route(web::get().to(feed::explore_feed)),
            )
            .service(
                web::resource("/saved")
                    .wrap(limit(ActionClass::General))
                    .route(web::get().to(feed::saved_reels)),
            )
            .service(
                web::resource("/users/blocked")
                    .wrap(limit(ActionClass::General))
                    .route(web::get().to(users::list_blocked)),
            )
            .service(
                web::resource("/users/{user_id}/block")
                    .wrap(limit(ActionClass::General))
                    .route(web::post().to(users::block_user))
                    .route(web::delete().to(users::unblock_user)),
            )
            .service(
                web::resource("/users/{user_id}/follow")
                    .wrap(limit(ActionClass::General))
                    .route(web::post().to(users::follow_user))
                    .route(web::delete().to(users::unfollow_user)),
            )
            .service(
                web::resource("/users/{user_id}/reels")
                    .wrap(limit(ActionClass::General))
                    .route(web::get().to(reels::list_user_reels)),
            )
            .service(
                web::resource("/{id}")
                    .wrap(limit(ActionClass::General))
                    .route(web::get().to(reels::get_reel))
                    .route(web::delete().to(reels::delete_reel)),
            )
            .service(
                web::resource("/{id}/like")
                    .wrap(limit(ActionClass::Likes))
                    .route(web::post().to(engagement::like_reel))
                    .route(web::delete().to(engagement::unlike_reel)),
            )
            .service(
                web::resource("/{id}/save")
                    .wrap(limit(ActionClass::Likes))
                    .route(web::post().to(engagement::save_reel))
                    .route(web::delete().to(engagement::unsave_reel)),
            )
            .service(
                web::resource("/{id}/view")
                    .wrap(limit(ActionClass::Views))
                    .route(web::post().to(engagement::record_view)),
            )
            // same path, different class per method
            .service(
                web::resource("/{id}/comments")
                    .guard(guard::Post())
                    .wrap(limit(ActionClass::Comments))
                    .route(web::post().to(comments::add_comment)),
            )
            .service(
                web::resource("/{id}/comments")
                    .wrap(limit(ActionClass::General))
                    .route(web::get().to(comments::list_comments)),
            )
            .service(
                web::resource("/{id}/comments/{comment_id}")
                    .wrap(limit(ActionClass::General))
                    .route(web::delete().to(comments::delete_comment)),
            )
            .service(
                web::resource("/{id}/comments/{comment_id}/reply")
                    .wrap(limit(ActionClass::Comments))
                    .route(web::post().to(comments::reply_to_comment)),
            )
            .service(
                web::resource("/{id}/comments/{comment_id}/like")
                    .wrap(limit(ActionClass::Likes))
                    .route(web::post().to(comments::like_comment))
                    .route(web::delete().to(comments::unlike_comment)),
            ),
    );
}
