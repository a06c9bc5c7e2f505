use crate::core::Block;

/// Append-only sequence of blocks. Index 0 is always the genesis block.
///
/// No validation happens here; the ledger checks linkage and difficulty
/// before it calls [`Chain::add`].
#[derive(Debug, Clone, PartialEq)]
pub struct Chain {
    genesis: Block,
    blocks: Vec<Block>,
    network_id: u64,
}

impl Chain {
    pub fn new(network_id: u64) -> Chain {
        Chain {
            genesis: Block::genesis(),
            blocks: Vec::new(),
            network_id,
        }
    }

    pub fn add(&mut self, block: Block) {
        self.blocks.push(block);
    }

    pub fn get(&self, index: usize) -> Option<&Block> {
        match index {
            0 => Some(&self.genesis),
            i => self.blocks.get(i - 1),
        }
    }

    pub fn last(&self) -> &Block {
        self.blocks.last().unwrap_or(&self.genesis)
    }

    pub fn size(&self) -> usize {
        self.blocks.len() + 1
    }

    pub fn network_id(&self) -> u64 {
        self.network_id
    }

    /// Blocks from genesis to tail. The iterator is `Clone`, so a consumer
    /// can restart it without touching the chain.
    pub fn iter(&self) -> impl Iterator<Item = &Block> + Clone + '_ {
        std::iter::once(&self.genesis).chain(self.blocks.iter())
    }
}

impl<'a> IntoIterator for &'a Chain {
    type Item = &'a Block;
    type IntoIter = std::iter::Chain<std::iter::Once<&'a Block>, std::slice::Iter<'a, Block>>;

    fn into_iter(self) -> Self::IntoIter {
        std::iter::once(&self.genesis).chain(self.blocks.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::Hash;

    #[test]
    fn test_new_chain_has_only_genesis() {
        let chain = Chain::new(1);
        assert_eq!(chain.size(), 1);
        assert_eq!(chain.network_id(), 1);
        assert!(chain.last().is_genesis());
        assert!(chain.get(0).unwrap().is_genesis());
        assert!(chain.get(1).is_none());
    }

    #[test]
    fn test_add_appends_in_order() {
        let mut chain = Chain::new(7);
        let first = Block::with_timestamp(Vec::new(), Hash([1u8; 32]), 1);
        let second = Block::with_timestamp(Vec::new(), Hash([2u8; 32]), 2);
        chain.add(first.clone());
        chain.add(second.clone());

        assert_eq!(chain.size(), 3);
        assert_eq!(chain.get(1), Some(&first));
        assert_eq!(chain.last(), &second);

        let timestamps: Vec<i64> = chain.iter().map(|b| b.get_timestamp()).collect();
        assert_eq!(timestamps, vec![0, 1, 2]);
    }

    #[test]
    fn test_iteration_is_restartable() {
        let mut chain = Chain::new(1);
        chain.add(Block::with_timestamp(Vec::new(), Hash::zero(), 5));
        let iter = chain.iter();
        assert_eq!(iter.clone().count(), 2);
        assert_eq!(iter.count(), 2);
        assert_eq!((&chain).into_iter().count(), 2);
    }
}
