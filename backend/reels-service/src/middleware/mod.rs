/// HTTP middleware for reels-service
///
/// - `IdentityMiddleware`: gateway identity headers -> `UserId`
/// - `RateLimit`: per-route admission control
pub mod identity;
pub mod rate_limit;

pub use identity::{IdentityMiddleware, UserId, USERNAME_HEADER, USER_ID_HEADER};
pub use rate_limit::RateLimit;
