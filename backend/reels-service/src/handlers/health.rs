/// Health endpoints
use actix_web::{web, HttpResponse};
use serde_json::json;

use crate::state::AppState;

pub async fn health_check() -> HttpResponse {
    HttpResponse::Ok().json(json!({ "status": "ok" }))
}

pub async fn liveness_check() -> HttpResponse {
    HttpResponse::Ok().finish()
}

/// Ready as soon as the state is built; reports the transcoder capability
pub async fn readiness_check(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "status": "ready",
        "transcoder": state.media.transcoder_available(),
    }))
}
