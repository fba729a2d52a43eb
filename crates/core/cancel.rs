//! Cooperative cancellation of viewport queries.
//!
//! A caller that abandons a request cancels its token; the query notices at
//! its next checkpoint and returns [`PitchmapError::Cancelled`]. Checkpoints
//! sit between the index scan and aggregation, never inside index mutation.

use crate::error::{PitchmapError, Result};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Shared cancellation flag. Clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// `Err(Cancelled)` once the token has been cancelled.
    #[inline]
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(PitchmapError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Guard that cancels this token when dropped, unless disarmed first.
    ///
    /// Held by a request future so that dropping the future stops the query
    /// running on its behalf.
    pub fn drop_guard(&self) -> CancelOnDrop {
        CancelOnDrop {
            token: Some(self.clone()),
        }
    }
}

#[derive(Debug)]
pub struct CancelOnDrop {
    token: Option<CancelToken>,
}

impl CancelOnDrop {
    /// Keep the token alive without cancelling it on drop.
    pub fn disarm(mut self) -> CancelToken {
        self.token.take().unwrap_or_default()
    }
}

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        if let Some(token) = self.token.take() {
            token.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_flag() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(token.check().is_ok());
        clone.cancel();
        assert!(token.is_cancelled());
        assert_eq!(token.check(), Err(PitchmapError::Cancelled));
    }

    #[test]
    fn test_drop_guard_cancels() {
        let token = CancelToken::new();
        {
            let _guard = token.drop_guard();
        }
        assert!(token.is_cancelled());
    }

    #[test]
    fn test_disarmed_guard_does_not_cancel() {
        let token = CancelToken::new();
        let guard = token.drop_guard();
        let kept = guard.disarm();
        assert!(!token.is_cancelled());
        assert!(!kept.is_cancelled());
    }
}
