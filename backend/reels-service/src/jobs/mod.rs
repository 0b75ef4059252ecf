//! Background jobs for reels-service

pub mod rate_limit_sweeper;

pub use rate_limit_sweeper::RateLimitSweeper;
