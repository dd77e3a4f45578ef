//! Reads and cascading deletion of brackets and their blocks.

use super::errors::{BracketError, BracketResult};
use super::models::{Block, BlockFilter, BlockId, BlockState, Bracket, BracketId, BracketView};
use crate::db::{BlockRepository, BracketRepository};

pub struct BracketLifecycle<'a> {
    blocks: &'a dyn BlockRepository,
    brackets: &'a dyn BracketRepository,
}

impl<'a> BracketLifecycle<'a> {
    pub fn new(blocks: &'a dyn BlockRepository, brackets: &'a dyn BracketRepository) -> Self {
        Self { blocks, brackets }
    }

    pub async fn get(&self, bracket_id: BracketId) -> BracketResult<Bracket> {
        self.brackets
            .get_bracket(bracket_id)
            .await?
            .ok_or(BracketError::BracketNotFound(bracket_id))
    }

    /// Bracket plus its blocks, in enumeration order
    pub async fn view(&self, bracket_id: BracketId) -> BracketResult<BracketView> {
        let bracket = self.get(bracket_id).await?;
        let blocks = self
            .blocks
            .find_blocks(&BlockFilter::Ids(bracket.blocks.clone()))
            .await?;

        if blocks.len() != bracket.blocks.len() {
            log::warn!(
                "Bracket {} references {} blocks, {} found",
                bracket_id,
                bracket.blocks.len(),
                blocks.len()
            );
        }

        Ok(BracketView { bracket, blocks })
    }

    pub async fn get_block(&self, block_id: BlockId) -> BracketResult<Block> {
        self.blocks
            .get_block(block_id)
            .await?
            .ok_or(BracketError::BlockNotFound(block_id))
    }

    /// Delete a block if it is still `Scheduled`.
    ///
    /// Blocks that are `OnGoing` or `Completed` are left in place and the
    /// call still returns `Ok(())`.
    pub async fn delete_block(&self, block_id: BlockId) -> BracketResult<()> {
        let block = self.get_block(block_id).await?;

        if block.state != BlockState::Scheduled {
            log::debug!(
                "Block {} is {}, keeping it",
                block_id,
                block.state
            );
            return Ok(());
        }

        if !self.blocks.delete_block(block_id).await? {
            log::warn!("Block {} vanished before it could be deleted", block_id);
        }
        Ok(())
    }

    /// Delete every block of the bracket, then the bracket record.
    ///
    /// Best effort and not transactional: blocks already missing are
    /// skipped, and blocks that are no longer `Scheduled` survive the
    /// cascade like any other [`Self::delete_block`] call.
    pub async fn delete(&self, bracket_id: BracketId) -> BracketResult<()> {
        let bracket = self.get(bracket_id).await?;

        for &block_id in &bracket.blocks {
            match self.delete_block(block_id).await {
                Ok(()) => {}
                Err(BracketError::BlockNotFound(_)) => {
                    log::warn!(
                        "Block {} of bracket {} already gone, skipping",
                        block_id,
                        bracket_id
                    );
                }
                Err(e) => return Err(e),
            }
        }

        if !self.brackets.delete_bracket(bracket_id).await? {
            return Err(BracketError::Unacknowledged(format!(
                "deletion of bracket {bracket_id}"
            )));
        }

        log::info!("Deleted bracket {}", bracket_id);
        Ok(())
    }
}
