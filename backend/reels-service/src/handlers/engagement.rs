/// Like, save and view endpoints
use actix_web::{web, HttpResponse};
use serde_json::json;

use super::parse_id;
use crate::error::Result;
use crate::middleware::UserId;
use crate::state::AppState;

pub async fn like_reel(
    state: web::Data<AppState>,
    user: UserId,
    reel_id: web::Path<String>,
) -> Result<HttpResponse> {
    let reel_id = parse_id(&reel_id, "reel")?;
    let result = state.reels.like(user.0, reel_id).await?;
    Ok(HttpResponse::Ok().json(result))
}

pub async fn unlike_reel(
    state: web::Data<AppState>,
    user: UserId,
    reel_id: web::Path<String>,
) -> Result<HttpResponse> {
    let reel_id = parse_id(&reel_id, "reel")?;
    let result = state.reels.unlike(user.0, reel_id).await?;
    Ok(HttpResponse::Ok().json(result))
}

pub async fn save_reel(
    state: web::Data<AppState>,
    user: UserId,
    reel_id: web::Path<String>,
) -> Result<HttpResponse> {
    let reel_id = parse_id(&reel_id, "reel")?;
    let result = state.reels.save(user.0, reel_id).await?;
    Ok(HttpResponse::Ok().json(result))
}

pub async fn unsave_reel(
    state: web::Data<AppState>,
    user: UserId,
    reel_id: web::Path<String>,
) -> Result<HttpResponse> {
    let reel_id = parse_id(&reel_id, "reel")?;
    let result = state.reels.unsave(user.0, reel_id).await?;
    Ok(HttpResponse::Ok().json(result))
}

pub async fn record_view(
    state: web::Data<AppState>,
    user: UserId,
    reel_id: web::Path<String>,
) -> Result<HttpResponse> {
    let reel_id = parse_id(&reel_id, "reel")?;
    let views = state.reels.record_view(user.0, reel_id).await?;
    Ok(HttpResponse::Ok().json(json!({ "viewCount": views })))
}
