//! Shared "last activity" marker with expiry

use std::sync::atomic::{AtomicI64, Ordering};

use crate::config::INACTIVITY_DELAY_MS;

const UNSET: i64 = i64::MIN;

/// Time of the most recent journaled edit.
///
/// The value expires `ttl_millis` after it was written, mirroring a timed
/// cache entry. Expiry is inclusive of the boundary: at exactly
/// `written + ttl` the value is still readable, matching the gate's
/// `now - last <= delay` comparison so the two signals never disagree.
#[derive(Debug)]
pub struct ActivityMarker {
    last_edit_at: AtomicI64,
    ttl_millis: i64,
}

impl Default for ActivityMarker {
    fn default() -> Self {
        Self::new()
    }
}

impl ActivityMarker {
    /// Marker expiring after the inactivity delay
    pub const fn new() -> Self {
        Self::with_ttl(INACTIVITY_DELAY_MS)
    }

    pub const fn with_ttl(ttl_millis: i64) -> Self {
        Self {
            last_edit_at: AtomicI64::new(UNSET),
            ttl_millis,
        }
    }

    /// Record activity at `now_millis`, replacing any previous value
    pub fn touch(&self, now_millis: i64) {
        self.last_edit_at.store(now_millis, Ordering::SeqCst);
    }

    /// Last activity time, or `None` when never written or expired
    pub fn last_edit_at(&self, now_millis: i64) -> Option<i64> {
        let last = self.last_edit_at.load(Ordering::SeqCst);
        if last == UNSET || now_millis.saturating_sub(last) > self.ttl_millis {
            return None;
        }
        Some(last)
    }
}
