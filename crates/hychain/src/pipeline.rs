//! Block assembly pipeline.
//!
//! The factory composes a block from a transaction, computes the Merkle
//! root of the payload, signs the content and the canonicalized record,
//! and commits to the store. The whole sequence runs under the chain's
//! named writer mutex, which is what holds the single-writer invariant;
//! the guard is the scoped handle released at the end of the pipeline.

use std::marker::PhantomData;
use std::sync::Arc;

use hychain_core::{
    create_root, ensure_active, long_id, now_millis, public_block_id, serialize, sign,
    validate_block, Block, BlockHeaders, CancellationToken, ChainError, HashEntity, LockRegistry,
    Metadata, Result, SignatureAlgorithm, ToValue, Transaction,
};
use hychain_core::genesis_previous_hash;
use hychain_keys::KeyObject;
use hychain_store::ChainStore;

/// Configuration for a block factory.
#[derive(Debug, Clone)]
pub struct ChainConfig {
    /// Name of the chain; keys the single-writer mutex.
    pub name: String,
    /// Whether to structurally validate blocks before committing.
    pub validate_on_commit: bool,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            name: "hychain".to_string(),
            validate_on_commit: true,
        }
    }
}

/// Assembles and commits blocks against a storage backend.
pub struct BlockFactory<P, S> {
    store: Arc<S>,
    config: ChainConfig,
    _payload: PhantomData<fn() -> P>,
}

impl<P, S> BlockFactory<P, S>
where
    P: ToValue + Clone + Send + Sync,
    S: ChainStore<P>,
{
    /// Create a factory over a storage backend.
    pub fn new(store: S, config: ChainConfig) -> Self {
        Self {
            store: Arc::new(store),
            config,
            _payload: PhantomData,
        }
    }

    /// The storage backend.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Produce and commit the genesis block.
    ///
    /// The genesis block has sequence 0 and the zero-character previous
    /// hash.
    pub async fn create_genesis_block(
        &self,
        transaction: Transaction<P>,
        sign_key: &mut KeyObject,
        metadata: Option<Metadata>,
        token: &CancellationToken,
    ) -> Result<Block<P>> {
        self.commit_block(transaction, sign_key, metadata, None, token)
            .await
    }

    /// Produce and commit the next block after the current chain head.
    ///
    /// Fails with `ERR_MISSING_OBJECT` when the chain has no genesis
    /// block yet.
    pub async fn append_block(
        &self,
        transaction: Transaction<P>,
        sign_key: &mut KeyObject,
        metadata: Option<Metadata>,
        token: &CancellationToken,
    ) -> Result<Block<P>> {
        let previous = self
            .store
            .get_latest_block()
            .await?
            .ok_or_else(|| ChainError::MissingObject("chain has no genesis block".into()))?;
        self.commit_block(transaction, sign_key, metadata, Some(previous), token)
            .await
    }

    async fn commit_block(
        &self,
        transaction: Transaction<P>,
        sign_key: &mut KeyObject,
        metadata: Option<Metadata>,
        previous: Option<Block<P>>,
        token: &CancellationToken,
    ) -> Result<Block<P>> {
        // The writer guard is the scoped storage handle for this commit.
        let writer = LockRegistry::global().acquire(&self.config.name);
        let guard = writer.lock().await;

        ensure_active(token)?;
        let ts = now_millis();
        let key_bytes = sign_key.master()?;

        let merkle_root = create_root(&transaction.to_value())?;
        let mut headers = BlockHeaders::new(ts, merkle_root);

        let payload_bytes = serialize(&transaction.payload.to_value())?;
        headers.content_length = payload_bytes.len() as u32;

        let content_signature = sign(
            SignatureAlgorithm::Ed25519,
            payload_bytes,
            &key_bytes,
            true,
            token,
        )
        .await?;

        let (sequence, previous_hash) = match &previous {
            None => (0, genesis_previous_hash()),
            Some(prev) => (prev.sequence + 1, prev.block_signature.clone()),
        };

        let mut block = Block {
            id: long_id(),
            public_block_id: public_block_id(),
            previous_hash,
            sequence,
            transaction,
            headers,
            metadata: metadata.unwrap_or_default(),
            content_signature,
            block_signature: HashEntity::empty(),
        };

        let canonical = block.canonical_bytes()?;
        block.block_signature = sign(
            SignatureAlgorithm::EcdsaSha512,
            canonical,
            &key_bytes,
            false,
            token,
        )
        .await?;

        ensure_active(token)?;
        if self.config.validate_on_commit {
            validate_block(&block)?;
        }

        if !self.store.put_block(block.clone()).await? {
            return Err(ChainError::Unknown(
                "chain storage rejected the block write".into(),
            ));
        }
        tracing::debug!(
            chain = %self.config.name,
            sequence = block.sequence,
            block_id = %block.id,
            "block committed"
        );

        drop(guard);
        Ok(block)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hychain_core::verify_chain;
    use hychain_keys::{Algorithm, KeyDetails, OsEntropy};
    use hychain_store::MemoryStore;

    async fn signing_key() -> KeyObject {
        KeyObject::generate_symmetric(
            Algorithm::named("SHA512").unwrap(),
            KeyDetails {
                label: "chain signer".into(),
                user_id: None,
            },
            &OsEntropy,
            &CancellationToken::new(),
        )
        .await
        .unwrap()
    }

    fn factory(name: &str) -> BlockFactory<String, MemoryStore<String>> {
        BlockFactory::new(
            MemoryStore::new(),
            ChainConfig {
                name: name.to_string(),
                validate_on_commit: true,
            },
        )
    }

    #[tokio::test]
    async fn test_genesis_block_shape() {
        let factory = factory("genesis-shape");
        let mut key = signing_key().await;
        let token = CancellationToken::new();

        let block = factory
            .create_genesis_block(
                Transaction::new("x".to_string(), 0),
                &mut key,
                None,
                &token,
            )
            .await
            .unwrap();

        assert_eq!(block.sequence, 0);
        assert!(block.is_genesis());
        assert!(block
            .previous_hash
            .buffer()
            .unwrap()
            .iter()
            .all(|&b| b == b'0'));
        assert_eq!(block.previous_hash.byte_length().unwrap(), 64);
        // String tag ‖ VQL(1) ‖ 'x'.
        assert_eq!(block.headers.content_length, 3);
        assert!(block.content_signature.byte_length().unwrap() > 0);
        assert!(block.block_signature.byte_length().unwrap() > 0);
        assert_eq!(block.public_block_id.len(), 32);
    }

    #[tokio::test]
    async fn test_append_links_to_previous_signature() {
        let factory = factory("append-links");
        let mut key = signing_key().await;
        let token = CancellationToken::new();

        let genesis = factory
            .create_genesis_block(
                Transaction::new("first".to_string(), 0),
                &mut key,
                None,
                &token,
            )
            .await
            .unwrap();

        let second = factory
            .append_block(
                Transaction::new("second".to_string(), 1),
                &mut key,
                None,
                &token,
            )
            .await
            .unwrap();

        assert_eq!(second.sequence, 1);
        assert_eq!(second.previous_hash, genesis.block_signature);

        let chain = factory.store().get_all_blocks().await.unwrap();
        verify_chain(&chain).unwrap();
    }

    #[tokio::test]
    async fn test_append_without_genesis_fails() {
        let factory = factory("no-genesis");
        let mut key = signing_key().await;
        let result = factory
            .append_block(
                Transaction::new("orphan".to_string(), 1),
                &mut key,
                None,
                &CancellationToken::new(),
            )
            .await;
        assert!(matches!(result, Err(ChainError::MissingObject(_))));
    }

    #[tokio::test]
    async fn test_precancelled_token_commits_nothing() {
        let factory = factory("cancelled");
        let mut key = signing_key().await;
        let cancelled = CancellationToken::new();
        cancelled.cancel();

        let result = factory
            .create_genesis_block(
                Transaction::new("x".to_string(), 0),
                &mut key,
                None,
                &cancelled,
            )
            .await;
        assert!(matches!(result, Err(ChainError::TokenCancelled(_))));
        assert!(factory.store().get_latest_block().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_metadata_travels_with_block() {
        let factory = factory("metadata");
        let mut key = signing_key().await;
        let mut metadata = Metadata::new();
        metadata.insert("source".to_string(), serde_json::Value::from("ingest"));

        let block = factory
            .create_genesis_block(
                Transaction::new("x".to_string(), 0),
                &mut key,
                Some(metadata),
                &CancellationToken::new(),
            )
            .await
            .unwrap();
        assert_eq!(block.metadata["source"], "ingest");
    }

    #[tokio::test]
    async fn test_rejected_write_surfaces_as_error() {
        let factory = factory("rejected-write");
        let mut key = signing_key().await;
        let token = CancellationToken::new();

        factory
            .create_genesis_block(
                Transaction::new("first".to_string(), 0),
                &mut key,
                None,
                &token,
            )
            .await
            .unwrap();

        // A second genesis targets the occupied sequence 0.
        let result = factory
            .create_genesis_block(
                Transaction::new("second".to_string(), 0),
                &mut key,
                None,
                &token,
            )
            .await;
        assert!(matches!(result, Err(ChainError::Unknown(_))));
    }
}
