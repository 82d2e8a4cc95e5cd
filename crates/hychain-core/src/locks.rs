//! Named-mutex registry.
//!
//! The registry is the only process-wide state the library keeps. It maps
//! string keys to async mutexes so callers can serialize work by name; the
//! block pipeline uses it to hold the single-writer invariant per chain.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex as StdMutex, OnceLock};
use std::sync::Arc;

use tokio::sync::Mutex;

/// Registry of named async mutexes.
#[derive(Debug, Default)]
pub struct LockRegistry {
    locks: StdMutex<HashMap<String, Arc<Mutex<()>>>>,
    debug: AtomicBool,
}

static GLOBAL: OnceLock<LockRegistry> = OnceLock::new();

impl LockRegistry {
    /// The process-wide registry, created on first use.
    pub fn global() -> &'static LockRegistry {
        GLOBAL.get_or_init(LockRegistry::default)
    }

    /// Fetch (or create) the mutex registered under `name`.
    pub fn acquire(&self, name: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().expect("lock registry poisoned");
        let entry = locks
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        if self.debug.load(Ordering::Relaxed) {
            tracing::trace!(name, "named mutex handle issued");
        }
        entry
    }

    /// Enable or disable lock tracing.
    pub fn set_debug(&self, enabled: bool) {
        self.debug.store(enabled, Ordering::Relaxed);
    }

    /// Whether lock tracing is enabled.
    pub fn debug_enabled(&self) -> bool {
        self.debug.load(Ordering::Relaxed)
    }

    /// Drop every registered mutex. Outstanding handles stay valid; new
    /// acquisitions of the same names get fresh mutexes.
    pub fn reset(&self) {
        self.locks.lock().expect("lock registry poisoned").clear();
    }

    /// Number of names currently registered.
    pub fn len(&self) -> usize {
        self.locks.lock().expect("lock registry poisoned").len()
    }

    /// Whether the registry holds no mutexes.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_name_same_mutex() {
        let registry = LockRegistry::default();
        let a = registry.acquire("writer:test");
        let b = registry.acquire("writer:test");
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_distinct_names_distinct_mutexes() {
        let registry = LockRegistry::default();
        let a = registry.acquire("one");
        let b = registry.acquire("two");
        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_reset_clears_registrations() {
        let registry = LockRegistry::default();
        let before = registry.acquire("chain");
        registry.reset();
        assert!(registry.is_empty());
        let after = registry.acquire("chain");
        assert!(!Arc::ptr_eq(&before, &after));
    }

    #[test]
    fn test_debug_flag() {
        let registry = LockRegistry::default();
        assert!(!registry.debug_enabled());
        registry.set_debug(true);
        assert!(registry.debug_enabled());
        registry.set_debug(false);
        assert!(!registry.debug_enabled());
    }

    #[tokio::test]
    async fn test_mutex_serializes_holders() {
        let registry = LockRegistry::default();
        let mutex = registry.acquire("serial");
        let guard = mutex.lock().await;
        assert!(mutex.try_lock().is_err());
        drop(guard);
        assert!(mutex.try_lock().is_ok());
    }
}
