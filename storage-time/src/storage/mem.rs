//! In-memory block store.
//!
//! Keeps blocks in a `Vec` in insertion order. Useful for unit tests,
//! simulations and small deployments.

use super::BlockStore;
use crate::types::EncryptedBlock;

/// In-memory implementation of [`BlockStore`].
#[derive(Clone, Debug, Default)]
pub struct InMemoryBlockStore {
    blocks: Vec<EncryptedBlock>,
}

impl InMemoryBlockStore {
    /// Creates a new, empty in-memory block store.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

impl FromIterator<EncryptedBlock> for InMemoryBlockStore {
    fn from_iter<I: IntoIterator<Item = EncryptedBlock>>(iter: I) -> Self {
        Self {
            blocks: iter.into_iter().collect(),
        }
    }
}

impl BlockStore for InMemoryBlockStore {
    fn get_block(&self, index: u32) -> Option<EncryptedBlock> {
        self.blocks.get(index as usize).cloned()
    }

    fn block_count(&self) -> u32 {
        u32::try_from(self.blocks.len()).unwrap_or(u32::MAX)
    }

    fn put_block(&mut self, block: EncryptedBlock) -> u32 {
        let index = self.block_count();
        self.blocks.push(block);
        index
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProtocolError;
    use crate::merkle::MerkleTree;
    use crate::storage::build_merkle_tree;
    use crate::types::block::{IV_LEN, TAG_LEN};

    fn dummy_block(fill: u8) -> EncryptedBlock {
        EncryptedBlock::new(vec![fill; 64], [fill; IV_LEN], [0x33; TAG_LEN])
    }

    #[test]
    fn put_and_get_block_roundtrip() {
        let mut store = InMemoryBlockStore::new();
        assert_eq!(store.put_block(dummy_block(1)), 0);
        assert_eq!(store.put_block(dummy_block(2)), 1);

        let fetched = store.get_block(1).expect("block should be present");
        assert_eq!(fetched, dummy_block(2));
        assert_eq!(store.block_count(), 2);
        assert!(store.get_block(2).is_none());
    }

    #[test]
    fn data_tree_uses_block_leaf_digests() {
        let store: InMemoryBlockStore = (0..5).map(dummy_block).collect();
        let tree = build_merkle_tree(&store).unwrap();

        assert_eq!(tree.leaf_count(), 5);
        for i in 0..5u32 {
            let leaf = store.get_block(i).unwrap().leaf_digest();
            assert_eq!(tree.leaf(i as usize), Some(&leaf));
            let path = tree.get_proof(i as usize).unwrap();
            assert!(MerkleTree::verify_proof(&leaf, &path, &tree.root().unwrap()));
        }
    }

    #[test]
    fn empty_store_has_no_data_tree() {
        let err = build_merkle_tree(&InMemoryBlockStore::new()).unwrap_err();
        assert!(matches!(err, ProtocolError::NoBlocks));
    }
}
