/// Reel handlers - HTTP endpoints for reel operations
use actix_web::{web, HttpResponse};

use super::parse_id;
use crate::error::Result;
use crate::middleware::UserId;
use crate::models::{CreateReelRequest, FeedMode, PageParams};
use crate::state::AppState;

/// Create a reel from already-uploaded media
pub async fn create_reel(
    state: web::Data<AppState>,
    user: UserId,
    payload: web::Json<CreateReelRequest>,
) -> Result<HttpResponse> {
    let reel = state.reels.create_reel(user.0, payload.into_inner()).await?;
    Ok(HttpResponse::Created().json(reel))
}

/// Get a specific reel by ID
pub async fn get_reel(
    state: web::Data<AppState>,
    viewer: Option<UserId>,
    reel_id: web::Path<String>,
) -> Result<HttpResponse> {
    let reel_id = parse_id(&reel_id, "reel")?;
    let reel = state
        .reels
        .get_reel(viewer.map(|u| u.0), reel_id)
        .await?;
    Ok(HttpResponse::Ok().json(reel))
}

/// Delete a reel (author only)
pub async fn delete_reel(
    state: web::Data<AppState>,
    user: UserId,
    reel_id: web::Path<String>,
) -> Result<HttpResponse> {
    let reel_id = parse_id(&reel_id, "reel")?;
    state.reels.delete_reel(user.0, reel_id).await?;
    Ok(HttpResponse::NoContent().finish())
}

/// A single author's reels, newest first
pub async fn list_user_reels(
    state: web::Data<AppState>,
    viewer: Option<UserId>,
    author_id: web::Path<String>,
    query: web::Query<PageParams>,
) -> Result<HttpResponse> {
    let author_id = parse_id(&author_id, "user")?;
    let page = state.feed.page(query.page, query.limit);
    let reels = state
        .feed
        .get_feed(viewer.map(|u| u.0), page, FeedMode::ByAuthor(author_id))
        .await?;
    Ok(HttpResponse::Ok().json(reels))
}
