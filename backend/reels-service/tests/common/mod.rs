//! Shared fixtures for the HTTP integration tests
#![allow(dead_code)]

use actix_web::web;
use std::path::Path;
use std::sync::Arc;

use reels_service::config::{AppConfig, Config, FeedConfig, MediaConfig, RateLimitConfig};
use reels_service::services::{DisabledTranscoder, Transcoder};
use reels_service::AppState;

pub const BOUNDARY: &str = "reels-test-boundary";

pub fn test_config(storage_dir: &Path) -> Config {
    Config {
        app: AppConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            env: "test".to_string(),
            workers: None,
        },
        media: MediaConfig::with_storage_dir(storage_dir),
        rate_limit: RateLimitConfig::default(),
        feed: FeedConfig::default(),
    }
}

pub async fn state_with(config: Config, transcoder: Arc<dyn Transcoder>) -> web::Data<AppState> {
    web::Data::new(
        AppState::with_transcoder(config, transcoder)
            .await
            .expect("state should build"),
    )
}

pub async fn test_state(storage_dir: &Path) -> web::Data<AppState> {
    state_with(test_config(storage_dir), Arc::new(DisabledTranscoder)).await
}

/// Build the full `/api/v1` app around a state
macro_rules! test_app {
    ($state:expr) => {{
        let state = $state.clone();
        let admission = state.admission.clone();
        actix_web::test::init_service(
            actix_web::App::new()
                .app_data(state.clone())
                .wrap(reels_service::middleware::IdentityMiddleware::new(
                    state.users.clone(),
                ))
                .service(
                    actix_web::web::scope("/api/v1")
                        .configure(|cfg| reels_service::handlers::configure(cfg, admission)),
                ),
        )
        .await
    }};
}

pub struct Part<'a> {
    pub name: &'a str,
    pub filename: Option<&'a str>,
    pub content_type: Option<&'a str>,
    pub data: Vec<u8>,
}

impl<'a> Part<'a> {
    pub fn file(name: &'a str, filename: &'a str, content_type: &'a str, data: Vec<u8>) -> Self {
        Self {
            name,
            filename: Some(filename),
            content_type: Some(content_type),
            data,
        }
    }

    pub fn text(name: &'a str, value: &str) -> Self {
        Self {
            name,
            filename: None,
            content_type: None,
            data: value.as_bytes().to_vec(),
        }
    }
}

/// Encode parts as a `multipart/form-data` body; returns (content type, body)
pub fn multipart(parts: &[Part<'_>]) -> (String, Vec<u8>) {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        let mut disposition = format!("Content-Disposition: form-data; name=\"{}\"", part.name);
        if let Some(filename) = part.filename {
            disposition.push_str(&format!("; filename=\"{filename}\""));
        }
        body.extend_from_slice(disposition.as_bytes());
        body.extend_from_slice(b"\r\n");
        if let Some(content_type) = part.content_type {
            body.extend_from_slice(format!("Content-Type: {content_type}\r\n").as_bytes());
        }
        body.extend_from_slice(b"\r\n");
        body.extend_from_slice(&part.data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    (format!("multipart/form-data; boundary={BOUNDARY}"), body)
}
