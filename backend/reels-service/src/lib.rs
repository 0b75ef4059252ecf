//! Reels Service
//!
//! Short-form video feed: uploads and processing, feed composition,
//! engagement, comment threads, moderation and per-user admission control.

pub mod config;
pub mod error;
pub mod handlers;
pub mod jobs;
pub mod metrics;
pub mod middleware;
pub mod models;
pub mod services;
pub mod state;
pub mod storage;

// Public re-exports
pub use config::Config;
pub use error::{AppError, Result};
pub use state::AppState;
