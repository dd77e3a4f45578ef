//! Single-elimination brackets.
//!
//! A bracket is an m-ary tree of blocks (match slots) stored as a flat set of
//! records with parent links. Participants are seeded into the leaves, and
//! each round the highest score of every match moves up one level until the
//! root holds the champion.
//!
//! # Example
//!
//! ```
//! use ko_bracket::bracket::BracketManager;
//! use ko_bracket::db::MemoryStore;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let manager = BracketManager::with_store(Arc::new(MemoryStore::new()));
//!
//!     // 8 entrants, 2 per match: 3 rounds, 15 blocks
//!     let bracket = manager.create_bracket(8, 2).await?;
//!     assert_eq!(bracket.blocks.len(), 15);
//!     assert_eq!(bracket.current_depth, 3);
//!
//!     manager.seed_bracket(bracket.id, &[1, 2, 3, 4, 5, 6, 7, 8]).await?;
//!     Ok(())
//! }
//! ```

pub mod advance;
pub mod errors;
pub mod lifecycle;
pub mod manager;
pub mod models;
pub mod scoring;
pub mod seeder;
pub mod topology;

pub use advance::{Match, RoundAdvancer, group_matches};
pub use errors::{BracketError, BracketResult, ErrorKind};
pub use lifecycle::BracketLifecycle;
pub use manager::BracketManager;
pub use models::{
    Block, BlockFilter, BlockId, BlockResult, BlockState, BlockUpdate, Bracket, BracketId,
    BracketUpdate, BracketView, NewBlock, NewBracket, ParticipantId, UnknownVariant,
};
pub use scoring::ScoreRecorder;
pub use seeder::{Seeder, shuffle_participants};
pub use topology::{MAX_REDUCTION_STEPS, TopologyBuilder, expected_block_count, rounds_for};
