/// Admission Controller
///
/// Fixed-window request counter per `(action class, user)`.
///
/// # Algorithm
/// - First request in a window creates an entry with `count = 1` and
///   `window_reset_at = now + window_ms`
/// - Later requests in the same window are allowed while `count < max_requests`
/// - Once `now >= window_reset_at` the next request opens a fresh window
///
/// The check-and-increment runs under the DashMap shard lock of the key, so
/// concurrent workers can never push a user past the configured quota.
use chrono::Utc;
use dashmap::DashMap;
use std::collections::HashMap;
use tracing::debug;
use uuid::Uuid;

use crate::config::{RateLimitConfig, RateLimitRule};
use crate::metrics;
use crate::models::ActionClass;

#[derive(Debug, Clone, Copy)]
struct RateLimitEntry {
    count: u32,
    /// Epoch milliseconds
    window_reset_at: u64,
}

/// Outcome of one admission check, plus the metadata surfaced as headers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    /// Epoch seconds at which the current window ends
    pub reset_at: u64,
    /// Seconds until the window ends, at least 1
    pub retry_after_secs: u64,
}

pub struct AdmissionController {
    rules: HashMap<ActionClass, RateLimitRule>,
    entries: DashMap<(ActionClass, Uuid), RateLimitEntry>,
}

impl AdmissionController {
    pub fn new(config: &RateLimitConfig) -> Self {
        Self {
            rules: config.rules.clone(),
            entries: DashMap::new(),
        }
    }

    pub fn rule_for(&self, class: ActionClass) -> RateLimitRule {
        self.rules
            .get(&class)
            .copied()
            .unwrap_or_else(|| class.default_rule())
    }

    pub fn check_and_consume(&self, class: ActionClass, user_id: Uuid) -> RateLimitDecision {
        self.check_and_consume_at(class, user_id, now_millis())
    }

    pub fn check_and_consume_at(
        &self,
        class: ActionClass,
        user_id: Uuid,
        now_ms: u64,
    ) -> RateLimitDecision {
        let rule = self.rule_for(class);

        let (allowed, entry) = {
            let mut entry = self
                .entries
                .entry((class, user_id))
                .or_insert(RateLimitEntry {
                    count: 0,
                    window_reset_at: now_ms + rule.window_ms,
                });

            if now_ms >= entry.window_reset_at {
                entry.count = 0;
                entry.window_reset_at = now_ms + rule.window_ms;
            }

            let allowed = entry.count < rule.max_requests;
            if allowed {
                entry.count += 1;
            }
            (allowed, *entry)
        };

        metrics::record_rate_limit_decision(class.as_str(), allowed);
        if !allowed {
            debug!(
                user_id = %user_id,
                class = class.as_str(),
                "Rate limit exceeded"
            );
        }

        let remaining_ms = entry.window_reset_at.saturating_sub(now_ms);
        RateLimitDecision {
            allowed,
            limit: rule.max_requests,
            remaining: rule.max_requests.saturating_sub(entry.count),
            reset_at: entry.window_reset_at.div_ceil(1000),
            retry_after_secs: remaining_ms.div_ceil(1000).max(1),
        }
    }

    /// Purge entries whose window has ended
    pub fn sweep_expired(&self) -> usize {
        self.sweep_expired_at(now_millis())
    }

    /// Snapshot expired keys, then delete each one only if it is still
    /// expired, so windows opened after the scan survive.
    pub fn sweep_expired_at(&self, now_ms: u64) -> usize {
        let expired: Vec<(ActionClass, Uuid)> = self
            .entries
            .iter()
            .filter(|entry| now_ms >= entry.value().window_reset_at)
            .map(|entry| *entry.key())
            .collect();

        let mut removed = 0;
        for key in expired {
            if self
                .entries
                .remove_if(&key, |_, entry| now_ms >= entry.window_reset_at)
                .is_some()
            {
                removed += 1;
            }
        }

        metrics::set_rate_limit_entries(self.entries.len());
        removed
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn now_millis() -> u64 {
    Utc::now().timestamp_millis().max(0) as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn controller(max_requests: u32, window_ms: u64) -> AdmissionController {
        let mut config = RateLimitConfig::default();
        config.rules.insert(
            ActionClass::Likes,
            RateLimitRule {
                max_requests,
                window_ms,
            },
        );
        AdmissionController::new(&config)
    }

    #[test]
    fn test_allows_up_to_limit_then_rejects() {
        let limiter = controller(3, 60_000);
        let user = Uuid::new_v4();
        let now = 1_000_000;

        for expected_remaining in [2, 1, 0] {
            let decision = limiter.check_and_consume_at(ActionClass::Likes, user, now);
            assert!(decision.allowed);
            assert_eq!(decision.remaining, expected_remaining);
            assert_eq!(decision.limit, 3);
        }

        let rejected = limiter.check_and_consume_at(ActionClass::Likes, user, now + 15_000);
        assert!(!rejected.allowed);
        assert_eq!(rejected.remaining, 0);
        assert_eq!(rejected.retry_after_secs, 45);
    }

    #[test]
    fn test_window_resets_after_expiry() {
        let limiter = controller(1, 1_000);
        let user = Uuid::new_v4();

        assert!(limiter.check_and_consume_at(ActionClass::Likes, user, 0).allowed);
        assert!(!limiter.check_and_consume_at(ActionClass::Likes, user, 999).allowed);
        let fresh = limiter.check_and_consume_at(ActionClass::Likes, user, 1_000);
        assert!(fresh.allowed);
        assert_eq!(fresh.reset_at, 2);
    }

    #[test]
    fn test_classes_and_users_are_independent() {
        let limiter = controller(1, 60_000);
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();

        assert!(limiter.check_and_consume_at(ActionClass::Likes, alice, 0).allowed);
        assert!(!limiter.check_and_consume_at(ActionClass::Likes, alice, 1).allowed);
        assert!(limiter.check_and_consume_at(ActionClass::Likes, bob, 1).allowed);
        assert!(limiter.check_and_consume_at(ActionClass::Comments, alice, 1).allowed);
    }

    #[test]
    fn test_sweep_removes_only_expired_entries() {
        let limiter = controller(5, 1_000);
        let stale = Uuid::new_v4();
        let fresh = Uuid::new_v4();

        limiter.check_and_consume_at(ActionClass::Likes, stale, 0);
        limiter.check_and_consume_at(ActionClass::Likes, fresh, 900);

        assert_eq!(limiter.sweep_expired_at(1_500), 1);
        assert_eq!(limiter.len(), 1);

        // the surviving window still counts
        let decision = limiter.check_and_consume_at(ActionClass::Likes, fresh, 1_600);
        assert_eq!(decision.remaining, 3);
    }

    #[test]
    fn test_sweep_keeps_window_reopened_after_scan() {
        let limiter = controller(5, 1_000);
        let user = Uuid::new_v4();
        limiter.check_and_consume_at(ActionClass::Likes, user, 0);

        // window reopened at t=2000 before the delete pass runs at t=1500
        limiter.check_and_consume_at(ActionClass::Likes, user, 2_000);
        assert_eq!(limiter.sweep_expired_at(1_500), 0);
        assert!(!limiter.is_empty());
    }
}
