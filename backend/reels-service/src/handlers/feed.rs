/// Feed handlers
use actix_web::{web, HttpResponse};

use crate::error::Result;
use crate::middleware::UserId;
use crate::models::{FeedMode, PageParams};
use crate::state::AppState;

async fn render(
    state: &AppState,
    viewer: Option<UserId>,
    query: &PageParams,
    mode: FeedMode,
) -> Result<HttpResponse> {
    let page = state.feed.page(query.page, query.limit);
    let reels = state
        .feed
        .get_feed(viewer.map(|u| u.0), page, mode)
        .await?;
    Ok(HttpResponse::Ok().json(reels))
}

/// GET /reels/feed - followed authors, newest first
pub async fn following_feed(
    state: web::Data<AppState>,
    viewer: Option<UserId>,
    query: web::Query<PageParams>,
) -> Result<HttpResponse> {
    render(&state, viewer, &query, FeedMode::Following).await
}

/// GET /reels/trending
pub async fn trending_feed(
    state: web::Data<AppState>,
    viewer: Option<UserId>,
    query: web::Query<PageParams>,
) -> Result<HttpResponse> {
    render(&state, viewer, &query, FeedMode::Trending).await
}

/// GET /reels/explore
pub async fn explore_feed(
    state: web::Data<AppState>,
    viewer: Option<UserId>,
    query: web::Query<PageParams>,
) -> Result<HttpResponse> {
    render(&state, viewer, &query, FeedMode::Explore).await
}

/// GET /reels/saved
pub async fn saved_reels(
    state: web::Data<AppState>,
    user: UserId,
    query: web::Query<PageParams>,
) -> Result<HttpResponse> {
    let page = state.feed.page(query.page, query.limit);
    let reels = state.feed.get_saved(user.0, page).await?;
    Ok(HttpResponse::Ok().json(reels))
}
