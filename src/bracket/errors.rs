//! Bracket error types.

use super::models::{BlockId, BlockState, BracketId, UnknownVariant};
use thiserror::Error;

/// Coarse classification of a [`BracketError`] for the calling layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    StateConflict,
    Persistence,
}

/// Bracket errors
#[derive(Debug, Error)]
pub enum BracketError {
    /// Required input missing or zero
    #[error("Missing required input: {0}")]
    MissingInput(&'static str),

    /// Participant count is not an integer power of the branching factor
    #[error("{total} participants is not a valid power of {per_match} participants per match")]
    NotAValidPower { total: u32, per_match: u32 },

    #[error("Bracket not found: {0}")]
    BracketNotFound(BracketId),

    #[error("Block not found: {0}")]
    BlockNotFound(BlockId),

    /// Two or more blocks share the highest score of a match
    #[error("Match below block {parent:?} is tied at score {score}")]
    TiedMatch { parent: Option<BlockId>, score: i64 },

    /// Block is not in the state the operation requires
    #[error("Block {block} must be {expected}, but is {actual}")]
    InvalidBlockState {
        block: BlockId,
        expected: BlockState,
        actual: BlockState,
    },

    /// Not every block of a match is completed yet
    #[error("Match of block {0} is not completed")]
    MatchIncomplete(BlockId),

    /// The block has no siblings to be compared with
    #[error("Block {0} is not part of a match")]
    NotInMatch(BlockId),

    /// The champion already occupies the root
    #[error("Bracket {0} is already decided")]
    BracketDecided(BracketId),

    /// Store did not acknowledge a write
    #[error("Write not acknowledged: {0}")]
    Unacknowledged(String),

    /// Stored record could not be decoded
    #[error("Corrupt record: {0}")]
    CorruptRecord(#[from] UnknownVariant),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl BracketError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            BracketError::MissingInput(_) | BracketError::NotAValidPower { .. } => {
                ErrorKind::Validation
            }
            BracketError::BracketNotFound(_) | BracketError::BlockNotFound(_) => {
                ErrorKind::NotFound
            }
            BracketError::TiedMatch { .. }
            | BracketError::InvalidBlockState { .. }
            | BracketError::MatchIncomplete(_)
            | BracketError::NotInMatch(_)
            | BracketError::BracketDecided(_) => ErrorKind::StateConflict,
            BracketError::Unacknowledged(_)
            | BracketError::CorruptRecord(_)
            | BracketError::Database(_)
            | BracketError::Serialization(_) => ErrorKind::Persistence,
        }
    }

    /// Get a client-safe error message
    ///
    /// Storage failures are collapsed into a generic message so that no
    /// query or schema details leave the process.
    pub fn client_message(&self) -> String {
        match self.kind() {
            ErrorKind::Persistence => "Internal server error".to_string(),
            _ => self.to_string(),
        }
    }
}

/// Result type for bracket operations
pub type BracketResult<T> = Result<T, BracketError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds() {
        assert_eq!(
            BracketError::NotAValidPower {
                total: 5,
                per_match: 2
            }
            .kind(),
            ErrorKind::Validation
        );
        assert_eq!(BracketError::BlockNotFound(3).kind(), ErrorKind::NotFound);
        assert_eq!(
            BracketError::TiedMatch {
                parent: Some(1),
                score: 0
            }
            .kind(),
            ErrorKind::StateConflict
        );
        assert_eq!(
            BracketError::Unacknowledged("bracket 1".to_string()).kind(),
            ErrorKind::Persistence
        );
    }

    #[test]
    fn test_client_message_hides_storage_details() {
        let err = BracketError::Unacknowledged("UPDATE brackets ...".to_string());
        assert_eq!(err.client_message(), "Internal server error");

        let err = BracketError::NotAValidPower {
            total: 5,
            per_match: 2,
        };
        assert!(err.client_message().contains("not a valid power"));
    }
}
