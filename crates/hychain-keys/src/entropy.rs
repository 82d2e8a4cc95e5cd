//! Random-bytes provider.
//!
//! The key factories consume this contract: produce N uniformly random
//! bytes, observing the cancellation token before and after acquisition.

use async_trait::async_trait;
use bytes::Bytes;
use rand::rngs::OsRng;
use rand::RngCore;

use hychain_core::{ensure_active, CancellationToken, Result};

/// A cancellable source of uniformly random bytes.
#[async_trait]
pub trait EntropySource: Send + Sync {
    async fn random_bytes(&self, n: usize, token: &CancellationToken) -> Result<Bytes>;
}

/// The default entropy source, backed by the operating system RNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsEntropy;

#[async_trait]
impl EntropySource for OsEntropy {
    async fn random_bytes(&self, n: usize, token: &CancellationToken) -> Result<Bytes> {
        ensure_active(token)?;
        let mut buf = vec![0u8; n];
        OsRng.fill_bytes(&mut buf);
        ensure_active(token)?;
        Ok(buf.into())
    }
}
