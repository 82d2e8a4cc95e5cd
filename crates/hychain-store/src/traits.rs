//! Store trait: the abstract interface for block persistence.
//!
//! The trait keeps the pipeline storage-agnostic. The reference backend is
//! in-memory; disk-backed implementations plug in behind the same surface.

use async_trait::async_trait;

use hychain_core::{Block, Result, ToValue};

/// Callback invoked when a store is disposed.
pub type DisposeCallback = Box<dyn FnOnce() + Send + Sync>;

/// Async interface for block persistence.
///
/// # Design Notes
///
/// - **Dual index**: blocks are reachable by opaque `_id` and by sequence;
///   the two indexes always agree. `put_block` is atomic: both indexes
///   gain the entry or neither does.
/// - **Rejection is not an error**: `put_block` returns `false` for a
///   duplicate `_id` or a block that fails structural validation; errors
///   are reserved for the store itself (disposal, backend faults).
/// - **Disposal lifecycle**: every operation fails with
///   `ERR_RESOURCE_DISPOSED` after `dispose`; registered callbacks run
///   best-effort on the first disposal, and disposal is idempotent.
#[async_trait]
pub trait ChainStore<P>: Send + Sync
where
    P: ToValue + Clone + Send + Sync,
{
    /// Insert a block. Returns `true` when the block was newly inserted,
    /// `false` when its `_id` already exists or validation rejects it.
    async fn put_block(&self, block: Block<P>) -> Result<bool>;

    /// Fetch a block by its opaque `_id`.
    async fn get_block(&self, id: &str) -> Result<Option<Block<P>>>;

    /// Whether a block with the given `_id` exists.
    async fn has_block(&self, id: &str) -> Result<bool>;

    /// Fetch a block by its chain sequence.
    async fn get_block_by_sequence(&self, sequence: u32) -> Result<Option<Block<P>>>;

    /// The block with the highest sequence, if any.
    async fn get_latest_block(&self) -> Result<Option<Block<P>>>;

    /// All blocks, ordered by ascending sequence.
    async fn get_all_blocks(&self) -> Result<Vec<Block<P>>>;

    /// Release the store. Idempotent; runs registered callbacks once.
    async fn dispose(&self) -> Result<()>;

    /// Register a callback to run on disposal. Callback panics are
    /// swallowed.
    fn on_dispose(&self, callback: DisposeCallback) -> Result<()>;
}
