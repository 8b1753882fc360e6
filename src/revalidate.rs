use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use axum::http::{header::IF_NONE_MATCH, HeaderMap};
use sha2::{Digest, Sha256};
use tracing::debug;
use uuid::Uuid;

/// Page paths whose data a mutation can make stale.
pub mod paths {
    pub const DASHBOARD: &str = "/dashboard";
    pub const EXERCISES: &str = "/exercises";
    pub const WORKOUTS: &str = "/workouts";
    pub const PLANS: &str = "/workouts/plans";
    pub const CALENDAR: &str = "/workouts/calendar";
    pub const HISTORY: &str = "/workouts/history";

    /// Exercise names show up on every page.
    pub const EXERCISE_PAGES: &[&str] = &[DASHBOARD, EXERCISES, WORKOUTS, PLANS, CALENDAR, HISTORY];
    pub const PLAN_PAGES: &[&str] = &[DASHBOARD, WORKOUTS, PLANS, CALENDAR];
    pub const SESSION_PAGES: &[&str] = &[DASHBOARD, WORKOUTS, CALENDAR, HISTORY];
}

/// Per-user generation counters for page paths. Every mutation bumps the
/// paths it affects; list endpoints derive a weak ETag from the counter.
#[derive(Clone)]
pub struct Revalidator {
    boot_id: Uuid,
    generations: Arc<RwLock<HashMap<(Uuid, &'static str), u64>>>,
}

impl Default for Revalidator {
    fn default() -> Self {
        Self::new()
    }
}

impl Revalidator {
    pub fn new() -> Self {
        Self {
            boot_id: Uuid::new_v4(),
            generations: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn invalidate(&self, user_id: Uuid, paths: &[&'static str]) {
        let mut generations = self
            .generations
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        for path in paths {
            *generations.entry((user_id, *path)).or_insert(0) += 1;
        }
        debug!("Revalidated {:?} for user {}", paths, user_id);
    }

    pub fn generation(&self, user_id: Uuid, path: &'static str) -> u64 {
        self.generations
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(&(user_id, path))
            .copied()
            .unwrap_or(0)
    }

    /// Weak validator for `path` as seen by `user_id`; `variant` distinguishes
    /// query strings served from the same path.
    pub fn etag(&self, user_id: Uuid, path: &'static str, variant: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.boot_id.as_bytes());
        hasher.update(user_id.as_bytes());
        hasher.update(path.as_bytes());
        hasher.update(self.generation(user_id, path).to_be_bytes());
        hasher.update(variant.as_bytes());
        let digest = hasher.finalize();
        format!("W/\"{}\"", hex::encode(&digest[..12]))
    }
}

/// `If-None-Match` already names the current validator.
pub fn is_fresh(headers: &HeaderMap, etag: &str) -> bool {
    headers
        .get(IF_NONE_MATCH)
        .and_then(|v| v.to_str().ok())
        .map_or(false, |value| {
            value
                .split(',')
                .map(str::trim)
                .any(|candidate| candidate == etag || candidate == "*")
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn invalidation_changes_the_etag() {
        let revalidator = Revalidator::new();
        let user = Uuid::new_v4();
        let before = revalidator.etag(user, paths::EXERCISES, "");
        assert_eq!(before, revalidator.etag(user, paths::EXERCISES, ""));

        revalidator.invalidate(user, paths::EXERCISE_PAGES);
        assert_ne!(before, revalidator.etag(user, paths::EXERCISES, ""));
        assert_eq!(revalidator.generation(user, paths::PLANS), 1);
    }

    #[test]
    fn users_do_not_share_generations() {
        let revalidator = Revalidator::new();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        revalidator.invalidate(a, &[paths::PLANS]);
        assert_eq!(revalidator.generation(b, paths::PLANS), 0);
        assert_ne!(
            revalidator.etag(a, paths::PLANS, ""),
            revalidator.etag(b, paths::PLANS, "")
        );
    }

    #[test]
    fn if_none_match_is_parsed_as_a_list() {
        let mut headers = HeaderMap::new();
        headers.insert(IF_NONE_MATCH, HeaderValue::from_static("W/\"a\", W/\"b\""));
        assert!(is_fresh(&headers, "W/\"b\""));
        assert!(!is_fresh(&headers, "W/\"c\""));
        assert!(!is_fresh(&HeaderMap::new(), "W/\"a\""));
    }
}
