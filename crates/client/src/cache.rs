//! Time-bounded local cache for the signed-in administrator's profile.
//!
//! One entry at a time: `adminProfile` (JSON) plus `profileTimestamp`
//! (epoch milliseconds). An entry is valid while `now - written_at < ttl`;
//! anything else (expired, orphaned, unparsable, stamped in the future) is
//! purged on read and reported as a miss. Nothing here returns an error to
//! the caller.

use chrono::{DateTime, Duration, Utc};

use adminpanel_auth::Profile;
use adminpanel_core::{Clock, SystemClock};

use crate::storage::{KeyValueStorage, keys};

/// Default lifetime of a cached profile.
pub const PROFILE_TTL_MINUTES: i64 = 10;

#[derive(Debug)]
pub struct ProfileCache<S, C = SystemClock> {
    storage: S,
    clock: C,
    ttl: Duration,
}

impl<S: KeyValueStorage, C: Clock> ProfileCache<S, C> {
    pub fn new(storage: S, clock: C) -> Self {
        Self {
            storage,
            clock,
            ttl: Duration::minutes(PROFILE_TTL_MINUTES),
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Cached profile, if one was written less than `ttl` ago.
    pub fn read(&self) -> Option<Profile> {
        let raw = self.storage.get(keys::ADMIN_PROFILE);
        let stamp = self.storage.get(keys::PROFILE_TIMESTAMP);

        let (raw, stamp) = match (raw, stamp) {
            (Some(raw), Some(stamp)) => (raw, stamp),
            (None, None) => return None,
            _ => {
                tracing::warn!("profile cache entry is incomplete; purging");
                self.clear();
                return None;
            }
        };

        let Some(written_at) = parse_timestamp(&stamp) else {
            tracing::warn!(stamp = %stamp, "profile cache timestamp is unreadable; purging");
            self.clear();
            return None;
        };

        let age = self.clock.now().signed_duration_since(written_at);
        if age < Duration::zero() {
            tracing::warn!(%written_at, "profile cache timestamp is in the future; purging");
            self.clear();
            return None;
        }
        if age >= self.ttl {
            tracing::debug!(age_secs = age.num_seconds(), "profile cache expired");
            self.clear();
            return None;
        }

        match serde_json::from_str(&raw) {
            Ok(profile) => {
                tracing::debug!("profile cache hit");
                Some(profile)
            }
            Err(err) => {
                tracing::warn!("profile cache entry is unreadable; purging: {err}");
                self.clear();
                None
            }
        }
    }

    /// Replace the cached entry with `profile`, stamped with the current time.
    pub fn write(&self, profile: &Profile) {
        let payload = match serde_json::to_string(profile) {
            Ok(payload) => payload,
            Err(err) => {
                tracing::error!("failed to serialize profile for cache: {err}");
                return;
            }
        };
        let stamp = self.clock.now().timestamp_millis().to_string();

        let written = self
            .storage
            .set(keys::ADMIN_PROFILE, &payload)
            .and_then(|()| self.storage.set(keys::PROFILE_TIMESTAMP, &stamp));

        if let Err(err) = written {
            tracing::error!("failed to write profile cache: {err}");
            self.clear();
        }
    }

    /// Remove the entry. Idempotent.
    pub fn clear(&self) {
        for key in [keys::ADMIN_PROFILE, keys::PROFILE_TIMESTAMP] {
            if let Err(err) = self.storage.remove(key) {
                tracing::error!(key, "failed to clear profile cache: {err}");
            }
        }
    }
}

fn parse_timestamp(stamp: &str) -> Option<DateTime<Utc>> {
    let millis: i64 = stamp.trim().parse().ok()?;
    DateTime::from_timestamp_millis(millis)
}
