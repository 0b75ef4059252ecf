/// Comment thread endpoints
use actix_web::{web, HttpResponse};

use super::parse_id;
use crate::error::Result;
use crate::middleware::UserId;
use crate::models::CreateCommentRequest;
use crate::state::AppState;

pub async fn list_comments(
    state: web::Data<AppState>,
    viewer: Option<UserId>,
    reel_id: web::Path<String>,
) -> Result<HttpResponse> {
    let reel_id = parse_id(&reel_id, "reel")?;
    let comments = state
        .comments
        .list_comments(viewer.map(|u| u.0), reel_id)
        .await?;
    Ok(HttpResponse::Ok().json(comments))
}

pub async fn add_comment(
    state: web::Data<AppState>,
    user: UserId,
    reel_id: web::Path<String>,
    payload: web::Json<CreateCommentRequest>,
) -> Result<HttpResponse> {
    let reel_id = parse_id(&reel_id, "reel")?;
    let comment = state
        .comments
        .add_comment(user.0, reel_id, payload.into_inner())
        .await?;
    Ok(HttpResponse::Created().json(comment))
}

/// POST /reels/{id}/comments/{comment_id}/reply
pub async fn reply_to_comment(
    state: web::Data<AppState>,
    user: UserId,
    path: web::Path<(String, String)>,
    payload: web::Json<CreateCommentRequest>,
) -> Result<HttpResponse> {
    let reel_id = parse_id(&path.0, "reel")?;
    let parent_id = parse_id(&path.1, "comment")?;
    let reply = state
        .comments
        .reply(user.0, reel_id, parent_id, payload.into_inner())
        .await?;
    Ok(HttpResponse::Created().json(reply))
}

pub async fn delete_comment(
    state: web::Data<AppState>,
    user: UserId,
    path: web::Path<(String, String)>,
) -> Result<HttpResponse> {
    let reel_id = parse_id(&path.0, "reel")?;
    let comment_id = parse_id(&path.1, "comment")?;
    state
        .comments
        .delete_comment(user.0, reel_id, comment_id)
        .await?;
    Ok(HttpResponse::NoContent().finish())
}

pub async fn like_comment(
    state: web::Data<AppState>,
    user: UserId,
    path: web::Path<(String, String)>,
) -> Result<HttpResponse> {
    let reel_id = parse_id(&path.0, "reel")?;
    let comment_id = parse_id(&path.1, "comment")?;
    let result = state
        .comments
        .like_comment(user.0, reel_id, comment_id)
        .await?;
    Ok(HttpResponse::Ok().json(result))
}

pub async fn unlike_comment(
    state: web::Data<AppState>,
    user: UserId,
    path: web::Path<(String, String)>,
) -> Result<HttpResponse> {
    let reel_id = parse_id(&path.0, "reel")?;
    let comment_id = parse_id(&path.1, "comment")?;
    let result = state
        .comments
        .unlike_comment(user.0, reel_id, comment_id)
        .await?;
    Ok(HttpResponse::Ok().json(result))
}
