//! In-memory implementation of the store trait.
//!
//! The reference backend: same semantics a disk-backed store must honor,
//! with everything held in two lock-step maps behind an `RwLock`.

use std::collections::{BTreeMap, HashMap};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::RwLock;

use async_trait::async_trait;

use hychain_core::{validate_block, Block, ChainError, Result, ToValue};

use crate::traits::{ChainStore, DisposeCallback};

/// In-memory dual-indexed block store.
pub struct MemoryStore<P> {
    inner: RwLock<MemoryStoreInner<P>>,
}

struct MemoryStoreInner<P> {
    /// Blocks indexed by opaque `_id`.
    blocks: HashMap<String, Block<P>>,
    /// Blocks indexed by chain sequence.
    sequences: BTreeMap<u32, Block<P>>,
    /// Callbacks to run on disposal.
    callbacks: Vec<DisposeCallback>,
    disposed: bool,
}

impl<P> MemoryStore<P> {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(MemoryStoreInner {
                blocks: HashMap::new(),
                sequences: BTreeMap::new(),
                callbacks: Vec::new(),
                disposed: false,
            }),
        }
    }
}

impl<P> Default for MemoryStore<P> {
    fn default() -> Self {
        Self::new()
    }
}

fn ensure_alive<P>(inner: &MemoryStoreInner<P>) -> Result<()> {
    if inner.disposed {
        return Err(ChainError::ResourceDisposed(
            "operation on disposed store".into(),
        ));
    }
    Ok(())
}

#[async_trait]
impl<P> ChainStore<P> for MemoryStore<P>
where
    P: ToValue + Clone + Send + Sync,
{
    async fn put_block(&self, block: Block<P>) -> Result<bool> {
        let mut inner = self.inner.write().expect("store lock poisoned");
        ensure_alive(&inner)?;

        if let Err(reason) = validate_block(&block) {
            tracing::debug!(%reason, "rejecting structurally invalid block");
            return Ok(false);
        }
        if inner.blocks.contains_key(&block.id) {
            return Ok(false);
        }
        // A second block at an existing sequence would split the indexes.
        if inner.sequences.contains_key(&block.sequence) {
            tracing::debug!(
                sequence = block.sequence,
                "rejecting block at an occupied sequence"
            );
            return Ok(false);
        }

        inner.sequences.insert(block.sequence, block.clone());
        inner.blocks.insert(block.id.clone(), block);
        Ok(true)
    }

    async fn get_block(&self, id: &str) -> Result<Option<Block<P>>> {
        let inner = self.inner.read().expect("store lock poisoned");
        ensure_alive(&inner)?;
        Ok(inner.blocks.get(id).cloned())
    }

    async fn has_block(&self, id: &str) -> Result<bool> {
        let inner = self.inner.read().expect("store lock poisoned");
        ensure_alive(&inner)?;
        Ok(inner.blocks.contains_key(id))
    }

    async fn get_block_by_sequence(&self, sequence: u32) -> Result<Option<Block<P>>> {
        let inner = self.inner.read().expect("store lock poisoned");
        ensure_alive(&inner)?;
        Ok(inner.sequences.get(&sequence).cloned())
    }

    async fn get_latest_block(&self) -> Result<Option<Block<P>>> {
        let inner = self.inner.read().expect("store lock poisoned");
        ensure_alive(&inner)?;
        Ok(inner
            .sequences
            .last_key_value()
            .map(|(_, block)| block.clone()))
    }

    async fn get_all_blocks(&self) -> Result<Vec<Block<P>>> {
        let inner = self.inner.read().expect("store lock poisoned");
        ensure_alive(&inner)?;
        Ok(inner.sequences.values().cloned().collect())
    }

    async fn dispose(&self) -> Result<()> {
        let callbacks = {
            let mut inner = self.inner.write().expect("store lock poisoned");
            if inner.disposed {
                return Ok(());
            }
            inner.disposed = true;
            inner.blocks.clear();
            inner.sequences.clear();
            std::mem::take(&mut inner.callbacks)
        };
        for callback in callbacks {
            // Dispose callbacks are best-effort; a panicking callback
            // must not stop the rest.
            let _ = catch_unwind(AssertUnwindSafe(callback));
        }
        Ok(())
    }

    fn on_dispose(&self, callback: DisposeCallback) -> Result<()> {
        let mut inner = self.inner.write().expect("store lock poisoned");
        ensure_alive(&inner)?;
        inner.callbacks.push(callback);
        Ok(())
    }
}
