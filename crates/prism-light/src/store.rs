//! The store capability: persistence for already-finalized trusted blocks.
//!
//! The client only ever writes blocks that survived full verification and
//! witness cross-checking; no partial or uncommitted state reaches a store.

use std::collections::BTreeMap;
use std::sync::RwLock;

use thiserror::Error;

use prism_core::LightBlock;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("light block at height {height} not in store")]
    NotFound { height: i64 },

    #[error("store backend error: {0}")]
    Backend(String),
}

/// Persistence boundary for verified light blocks.
pub trait Store: Send + Sync {
    fn save_light_block(&self, block: &LightBlock) -> Result<(), StoreError>;

    fn light_block(&self, height: i64) -> Result<LightBlock, StoreError>;

    /// Height of the newest stored block, if any.
    fn latest_height(&self) -> Result<Option<i64>, StoreError>;

    /// Drop all blocks below `retain_height`.
    fn prune(&self, retain_height: i64) -> Result<(), StoreError>;
}

/// In-memory store backend.
#[derive(Default)]
pub struct MemoryStore {
    blocks: RwLock<BTreeMap<i64, LightBlock>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Store for MemoryStore {
    fn save_light_block(&self, block: &LightBlock) -> Result<(), StoreError> {
        self.blocks
            .write()
            .unwrap()
            .insert(block.height(), block.clone());
        Ok(())
    }

    fn light_block(&self, height: i64) -> Result<LightBlock, StoreError> {
        self.blocks
            .read()
            .unwrap()
            .get(&height)
            .cloned()
            .ok_or(StoreError::NotFound { height })
    }

    fn latest_height(&self) -> Result<Option<i64>, StoreError> {
        Ok(self.blocks.read().unwrap().keys().next_back().copied())
    }

    fn prune(&self, retain_height: i64) -> Result<(), StoreError> {
        let mut blocks = self.blocks.write().unwrap();
        *blocks = blocks.split_off(&retain_height);
        Ok(())
    }
}
