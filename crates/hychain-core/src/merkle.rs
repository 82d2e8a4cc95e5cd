//! Merkle digest engine: root construction, proof generation, verification.
//!
//! Leaves are SHA-384 digests. Levels pair adjacent elements, duplicating
//! the last element of an odd level; a single input leaf is paired with
//! itself, so the root of `[h]` is `H(h ‖ h)`. Proof steps record which
//! side their sibling lies on so verification is sound at every leaf index.

use bytes::Bytes;

use crate::codec::{serialize, Value};
use crate::error::{ChainError, Result};
use crate::hash::{hash_data, HashAlgorithm, HashEntity};

/// Payload chunk size used by [`create_root`].
pub const CHUNK_SIZE: usize = 1024;

/// Which side of the running hash a proof sibling joins on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

/// One step of a Merkle inclusion proof.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProofStep {
    pub sibling: HashEntity,
    pub side: Side,
}

fn hash_pair(left: &[u8], right: &[u8]) -> Result<Bytes> {
    let mut joined = Vec::with_capacity(left.len() + right.len());
    joined.extend_from_slice(left);
    joined.extend_from_slice(right);
    hash_data(&joined, HashAlgorithm::default(), None)?.buffer()
}

fn next_level(level: &[Bytes]) -> Result<Vec<Bytes>> {
    let mut next = Vec::with_capacity((level.len() + 1) / 2);
    for pair in level.chunks(2) {
        let right = pair.get(1).unwrap_or(&pair[0]);
        next.push(hash_pair(&pair[0], right)?);
    }
    Ok(next)
}

/// Pairwise-hash an ordered list of leaf digests up to a single root.
///
/// An empty list hashes to the digest of the empty byte sequence.
pub fn compute_root(leaves: &[HashEntity]) -> Result<HashEntity> {
    if leaves.is_empty() {
        return hash_data(b"", HashAlgorithm::default(), None);
    }

    let mut level: Vec<Bytes> = leaves
        .iter()
        .map(|leaf| leaf.buffer())
        .collect::<Result<_>>()?;

    loop {
        level = next_level(&level)?;
        if level.len() == 1 {
            return Ok(HashEntity::new(level.remove(0)));
        }
    }
}

/// Compute the Merkle root of a payload: serialize it under the canonical
/// codec, chunk the bytes into [`CHUNK_SIZE`] segments (one empty chunk for
/// an empty payload), digest each chunk, and build the tree.
pub fn create_root(payload: &Value) -> Result<HashEntity> {
    let bytes = serialize(payload)?;
    let chunks: Vec<&[u8]> = if bytes.is_empty() {
        vec![&[]]
    } else {
        bytes.chunks(CHUNK_SIZE).collect()
    };
    let leaves = chunks
        .into_iter()
        .map(|chunk| hash_data(chunk, HashAlgorithm::default(), None))
        .collect::<Result<Vec<_>>>()?;
    compute_root(&leaves)
}

/// Build an inclusion proof for `target` within `leaves`.
///
/// Fails with `ERR_MISSING_OBJECT` when the target is not a leaf. The last
/// element of an odd level serves as its own sibling.
pub fn generate_proof(leaves: &[HashEntity], target: &HashEntity) -> Result<Vec<ProofStep>> {
    let mut index = leaves
        .iter()
        .position(|leaf| leaf == target)
        .ok_or_else(|| ChainError::MissingObject("target digest is not a leaf".into()))?;

    let mut level: Vec<Bytes> = leaves
        .iter()
        .map(|leaf| leaf.buffer())
        .collect::<Result<_>>()?;
    let mut proof = Vec::new();

    loop {
        let (sibling, side) = if index % 2 == 0 {
            (level.get(index + 1).unwrap_or(&level[index]), Side::Right)
        } else {
            (&level[index - 1], Side::Left)
        };
        proof.push(ProofStep {
            sibling: HashEntity::new(sibling.clone()),
            side,
        });

        level = next_level(&level)?;
        if level.len() == 1 {
            return Ok(proof);
        }
        index /= 2;
    }
}

/// Fold the proof over `target` and compare against `root` byte-for-byte.
///
/// A mismatch is reported as `false`, never as an error.
pub fn verify_proof(target: &HashEntity, proof: &[ProofStep], root: &HashEntity) -> Result<bool> {
    let mut current = target.buffer()?;
    for step in proof {
        let sibling = step.sibling.buffer()?;
        current = match step.side {
            Side::Left => hash_pair(&sibling, &current)?,
            Side::Right => hash_pair(&current, &sibling)?,
        };
    }
    Ok(current == root.buffer()?)
}
