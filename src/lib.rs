//! # KO Bracket
//!
//! Single-elimination tournament brackets on top of pluggable storage.
//!
//! A bracket for `N = m^k` participants with `m` participants per match is
//! stored as `1 + m + ... + m^k` blocks linked to their parent. Participants
//! are shuffled into the leaves, scores are recorded per block, and every
//! round advance moves the unique highest score of each match one level up
//! until the root holds the champion.
//!
//! ## Core Modules
//!
//! - [`bracket`]: Bracket model, construction, seeding, scoring and advancement
//! - [`db`]: Configuration, PostgreSQL pool and repositories, in-memory store
//! - [`tournament`]: Tournaments wrapping one bracket each
//!
//! ## Concurrency
//!
//! Nothing in this crate locks a bracket. Callers must serialize mutating
//! operations per bracket id.

/// Bracket model and round state machine.
pub mod bracket;
pub use bracket::{
    Block, BlockId, BlockResult, BlockState, Bracket, BracketError, BracketId, BracketManager,
    BracketResult, BracketView, ErrorKind, ParticipantId,
};

/// Storage configuration and repositories.
pub mod db;

/// Tournaments built around one bracket.
pub mod tournament;
pub use tournament::{TournamentConfig, TournamentError, TournamentManager, TournamentState};
