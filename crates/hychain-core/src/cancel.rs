//! Cooperative cancellation.
//!
//! A token is an observable boolean plus a notification channel. Operations
//! check it before every suspension point and after any suspension that can
//! produce a side effect; a tripped token surfaces as `ERR_TOKEN_CANCELLED`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::Notify;

use crate::error::{ChainError, Result};

#[derive(Debug, Default)]
struct Inner {
    cancelled: AtomicBool,
    notify: Notify,
}

/// Cloneable cancellation handle.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    inner: Arc<Inner>,
}

impl CancellationToken {
    /// A fresh, un-cancelled token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation and wake all waiters. Idempotent.
    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::SeqCst);
        self.inner.notify.notify_waiters();
    }

    /// Whether cancellation has been requested.
    pub fn is_cancellation_requested(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// Resolve once cancellation is requested.
    pub async fn cancelled(&self) {
        loop {
            if self.is_cancellation_requested() {
                return;
            }
            let notified = self.inner.notify.notified();
            // Re-check to close the gap between the flag store and notify.
            if self.is_cancellation_requested() {
                return;
            }
            notified.await;
        }
    }
}

/// Fail with `ERR_TOKEN_CANCELLED` if the token has tripped.
pub fn ensure_active(token: &CancellationToken) -> Result<()> {
    if token.is_cancellation_requested() {
        return Err(ChainError::TokenCancelled(
            "operation cancelled by token".into(),
        ));
    }
    Ok(())
}
