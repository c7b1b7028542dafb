//! Block storage.
//!
//! The protocol only needs indexed access to encrypted blocks and their
//! count; persistence belongs to the embedding service.
//!
//! - [`BlockStore`]: storage abstraction,
//! - [`mem::InMemoryBlockStore`]: vector-backed store for tests and
//!   simulations,
//! - [`build_merkle_tree`]: data tree over a store's block digests.

pub mod mem;

pub use mem::InMemoryBlockStore;

use crate::error::ProtocolError;
use crate::merkle::MerkleTree;
use crate::types::EncryptedBlock;

/// Abstract storage interface for encrypted blocks.
pub trait BlockStore {
    /// Returns the block at `index`, if present.
    fn get_block(&self, index: u32) -> Option<EncryptedBlock>;

    /// Number of stored blocks; valid indices are `0..block_count()`.
    fn block_count(&self) -> u32;

    /// Appends a block and returns its index.
    fn put_block(&mut self, block: EncryptedBlock) -> u32;
}

/// Builds the data tree over the leaf digests of every stored block, in
/// index order.
pub fn build_merkle_tree<S: BlockStore + ?Sized>(store: &S) -> Result<MerkleTree, ProtocolError> {
    let count = store.block_count();
    if count == 0 {
        return Err(ProtocolError::NoBlocks);
    }

    let leaves = (0..count)
        .map(|i| {
            store
                .get_block(i)
                .map(|block| block.leaf_digest())
                .ok_or(ProtocolError::LeafIndexOutOfRange {
                    index: i as usize,
                    leaves: count as usize,
                })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(MerkleTree::new(leaves))
}
