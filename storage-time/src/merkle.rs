//! Binary Merkle tree over 32-byte leaf digests.
//!
//! The tree stores every layer, leaves first. Each parent is
//! `SHA-256(left || right)`; a level with an odd number of nodes pairs its
//! last node with a copy of itself, both when building and when producing
//! proofs. A single-leaf tree's root is the leaf itself. An empty tree has
//! no root and cannot produce proofs.
//!
//! Inclusion paths are ordered leaf to root. Each [`PathStep`] records the
//! sibling digest and whether the *current* node is the left child.
//! [`MerkleTree::verify_proof`] only needs the leaf, the path and the
//! expected root, never the tree itself.

use serde::{Deserialize, Serialize};

use crate::error::ProtocolError;
use crate::types::{HASH_LEN, Hash256};

/// Encoded size of one path level: sibling digest plus one side byte.
pub const PATH_STEP_LEN: usize = HASH_LEN + 1;

/// One level of an inclusion path.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct PathStep {
    /// Digest of the sibling at this level.
    pub sibling: Hash256,
    /// `true` if the node being proven is the left child at this level.
    pub is_left: bool,
}

/// Inclusion path from a leaf up to (but excluding) the root.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct MerklePath(pub Vec<PathStep>);

impl MerklePath {
    pub fn steps(&self) -> &[PathStep] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Encodes the path as `sibling || side` per level, side `1` = left.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.0.len() * PATH_STEP_LEN);
        for step in &self.0 {
            out.extend_from_slice(step.sibling.as_bytes());
            out.push(u8::from(step.is_left));
        }
        out
    }

    /// Decodes a path produced by [`MerklePath::encode`].
    ///
    /// Returns `None` if the length is not a multiple of
    /// [`PATH_STEP_LEN`] or a side byte is neither `0` nor `1`.
    pub fn decode(bytes: &[u8]) -> Option<Self> {
        if bytes.len() % PATH_STEP_LEN != 0 {
            return None;
        }

        bytes
            .chunks_exact(PATH_STEP_LEN)
            .map(|chunk| {
                let mut sibling = [0u8; HASH_LEN];
                sibling.copy_from_slice(&chunk[..HASH_LEN]);
                let is_left = match chunk[HASH_LEN] {
                    0 => false,
                    1 => true,
                    _ => return None,
                };
                Some(PathStep {
                    sibling: Hash256(sibling),
                    is_left,
                })
            })
            .collect::<Option<Vec<_>>>()
            .map(MerklePath)
    }

    /// Leaf index implied by the side bits (bit `i` set = right child at
    /// level `i`), or `None` if the path is deeper than 64 levels.
    pub fn leaf_index(&self) -> Option<u64> {
        if self.0.len() > 64 {
            return None;
        }
        Some(
            self.0
                .iter()
                .enumerate()
                .filter(|(_, step)| !step.is_left)
                .fold(0u64, |acc, (level, _)| acc | (1u64 << level)),
        )
    }
}

/// Hashes an ordered pair of child digests into their parent.
pub fn hash_pair(left: &Hash256, right: &Hash256) -> Hash256 {
    let mut combined = [0u8; 2 * HASH_LEN];
    combined[..HASH_LEN].copy_from_slice(left.as_bytes());
    combined[HASH_LEN..].copy_from_slice(right.as_bytes());
    Hash256::sha256(&combined)
}

/// Merkle tree keeping every layer (layer 0 = leaves).
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct MerkleTree {
    layers: Vec<Vec<Hash256>>,
}

impl MerkleTree {
    /// Builds a tree over `leaves` in the given order.
    pub fn new(leaves: Vec<Hash256>) -> Self {
        if leaves.is_empty() {
            return Self::default();
        }

        let mut layers = vec![leaves];
        loop {
            let top = &layers[layers.len() - 1];
            if top.len() <= 1 {
                break;
            }
            let next = Self::parent_layer(top);
            layers.push(next);
        }

        Self { layers }
    }

    fn parent_layer(layer: &[Hash256]) -> Vec<Hash256> {
        layer
            .chunks(2)
            .map(|pair| match pair {
                [left, right] => hash_pair(left, right),
                [only] => hash_pair(only, only),
                _ => unreachable!("chunks(2) yields one or two nodes"),
            })
            .collect()
    }

    /// Root digest, or `None` for an empty tree.
    pub fn root(&self) -> Option<Hash256> {
        self.layers.last().and_then(|top| top.first()).copied()
    }

    /// Number of leaves.
    pub fn leaf_count(&self) -> usize {
        self.layers.first().map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Number of levels an inclusion path has for this tree.
    pub fn depth(&self) -> usize {
        self.layers.len().saturating_sub(1)
    }

    /// Leaf digest at `index`, if present.
    pub fn leaf(&self, index: usize) -> Option<&Hash256> {
        self.layers.first()?.get(index)
    }

    /// Produces the inclusion path for the leaf at `leaf_index`.
    pub fn get_proof(&self, leaf_index: usize) -> Result<MerklePath, ProtocolError> {
        if self.is_empty() {
            return Err(ProtocolError::EmptyTree);
        }
        if leaf_index >= self.leaf_count() {
            return Err(ProtocolError::LeafIndexOutOfRange {
                index: leaf_index,
                leaves: self.leaf_count(),
            });
        }

        let mut steps = Vec::with_capacity(self.depth());
        let mut idx = leaf_index;

        for layer in &self.layers[..self.depth()] {
            let is_left = idx % 2 == 0;
            let sibling_idx = if is_left { idx + 1 } else { idx - 1 };
            // An unpaired last node was hashed with itself.
            let sibling = layer.get(sibling_idx).unwrap_or(&layer[idx]);
            steps.push(PathStep {
                sibling: *sibling,
                is_left,
            });
            idx /= 2;
        }

        Ok(MerklePath(steps))
    }

    /// Recomputes the root from `leaf` and `path` and compares it to `root`.
    pub fn verify_proof(leaf: &Hash256, path: &MerklePath, root: &Hash256) -> bool {
        let computed = path.steps().iter().fold(*leaf, |current, step| {
            if step.is_left {
                hash_pair(&current, &step.sibling)
            } else {
                hash_pair(&step.sibling, &current)
            }
        });
        computed == *root
    }
}
