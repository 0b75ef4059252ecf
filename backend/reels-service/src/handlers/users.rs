/// Block and follow relations between users
use actix_web::{web, HttpResponse};
use serde_json::json;

use super::parse_id;
use crate::error::{AppError, Result};
use crate::middleware::UserId;
use crate::state::AppState;

pub async fn block_user(
    state: web::Data<AppState>,
    user: UserId,
    target: web::Path<String>,
) -> Result<HttpResponse> {
    let target = parse_id(&target, "user")?;
    state.moderation.block(user.0, target).await?;
    Ok(HttpResponse::Ok().json(json!({ "blocked": true, "userId": target })))
}

pub async fn unblock_user(
    state: web::Data<AppState>,
    user: UserId,
    target: web::Path<String>,
) -> Result<HttpResponse> {
    let target = parse_id(&target, "user")?;
    state.moderation.unblock(user.0, target).await?;
    Ok(HttpResponse::Ok().json(json!({ "blocked": false, "userId": target })))
}

/// GET /reels/users/blocked
pub async fn list_blocked(state: web::Data<AppState>, user: UserId) -> Result<HttpResponse> {
    let blocked = state.moderation.list_blocked(user.0).await?;
    Ok(HttpResponse::Ok().json(blocked))
}

pub async fn follow_user(
    state: web::Data<AppState>,
    user: UserId,
    target: web::Path<String>,
) -> Result<HttpResponse> {
    let target = parse_id(&target, "user")?;
    if state.users.get_user(target).await?.is_none() {
        return Err(AppError::NotFound("User not found".into()));
    }
    state.follows.follow(user.0, target).await?;
    Ok(HttpResponse::Ok().json(json!({ "following": true, "userId": target })))
}

pub async fn unfollow_user(
    state: web::Data<AppState>,
    user: UserId,
    target: web::Path<String>,
) -> Result<HttpResponse> {
    let target = parse_id(&target, "user")?;
    state.follows.unfollow(user.0, target).await?;
    Ok(HttpResponse::Ok().json(json!({ "following": false, "userId": target })))
}
