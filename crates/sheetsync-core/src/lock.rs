//! Deadline-bounded mutual exclusion for journal writes

use std::time::Duration;

use tokio::sync::{Mutex, MutexGuard};

use crate::error::{Error, Result};

/// Exclusive lock shared by every journal writer.
///
/// Acquisition waits at most a caller-supplied deadline; the returned guard
/// releases on drop.
#[derive(Debug, Default)]
pub struct ScriptLock {
    inner: Mutex<()>,
}

/// Held [`ScriptLock`]; released when dropped
#[derive(Debug)]
pub struct ScriptLockGuard<'a> {
    _guard: MutexGuard<'a, ()>,
}

impl ScriptLock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait up to `wait` for the lock
    pub async fn acquire(&self, wait: Duration) -> Result<ScriptLockGuard<'_>> {
        if let Ok(guard) = tokio::time::timeout(wait, self.inner.lock()).await {
            Ok(ScriptLockGuard { _guard: guard })
        } else {
            let waited_ms = u64::try_from(wait.as_millis()).unwrap_or(u64::MAX);
            tracing::warn!(waited_ms, "Journal lock wait expired");
            Err(Error::LockTimeout { waited_ms })
        }
    }

    /// Whether some writer currently holds the lock
    pub fn is_locked(&self) -> bool {
        self.inner.try_lock().is_err()
    }
}
