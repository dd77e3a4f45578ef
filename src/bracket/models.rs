//! Bracket data models: match slots (blocks), the bracket aggregate and the
//! partial-update records the stores accept.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Bracket ID type
pub type BracketId = i64;

/// Block ID type
pub type BlockId = i64;

/// Participant (user) ID type
pub type ParticipantId = i64;

/// Lifecycle of a single match slot.
///
/// Moves forward only: `Scheduled -> OnGoing -> Completed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BlockState {
    /// Waiting for an occupant
    Scheduled,
    /// Occupied and accepting scores
    OnGoing,
    /// Match decided
    Completed,
}

impl BlockState {
    pub fn as_str(&self) -> &'static str {
        match self {
            BlockState::Scheduled => "scheduled",
            BlockState::OnGoing => "on_going",
            BlockState::Completed => "completed",
        }
    }
}

impl fmt::Display for BlockState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BlockState {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "scheduled" => Ok(BlockState::Scheduled),
            "on_going" => Ok(BlockState::OnGoing),
            "completed" => Ok(BlockState::Completed),
            other => Err(UnknownVariant(other.to_string())),
        }
    }
}

/// Outcome of a match slot. Leaves `NotDecided` only once the slot is completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BlockResult {
    Winner,
    Loser,
    NotDecided,
}

impl BlockResult {
    pub fn as_str(&self) -> &'static str {
        match self {
            BlockResult::Winner => "winner",
            BlockResult::Loser => "loser",
            BlockResult::NotDecided => "not_decided",
        }
    }
}

impl fmt::Display for BlockResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BlockResult {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "winner" => Ok(BlockResult::Winner),
            "loser" => Ok(BlockResult::Loser),
            "not_decided" => Ok(BlockResult::NotDecided),
            other => Err(UnknownVariant(other.to_string())),
        }
    }
}

/// Stored enum value that does not name a known variant
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown variant: {0}")]
pub struct UnknownVariant(pub String);

/// One slot in the match tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    pub id: BlockId,
    /// Slot one level closer to the root; `None` only for the root
    pub next: Option<BlockId>,
    /// 0 at the root, `rounds` at the leaves
    pub depth: u32,
    pub participant: Option<ParticipantId>,
    /// Denormalized display name of the participant
    pub participant_name: Option<String>,
    pub score: i64,
    pub state: BlockState,
    pub result: BlockResult,
}

impl Block {
    pub fn is_root(&self) -> bool {
        self.next.is_none()
    }
}

/// Fields a store needs to create a block. Everything else takes its default.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewBlock {
    pub next: Option<BlockId>,
    pub depth: u32,
}

impl NewBlock {
    pub fn root() -> Self {
        Self {
            next: None,
            depth: 0,
        }
    }

    pub fn child_of(parent: BlockId, depth: u32) -> Self {
        Self {
            next: Some(parent),
            depth,
        }
    }
}

/// Merge-only partial update of a block.
///
/// `None` leaves the stored field untouched; no field can be cleared through
/// an update.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlockUpdate {
    pub participant: Option<ParticipantId>,
    pub participant_name: Option<String>,
    pub score: Option<i64>,
    pub state: Option<BlockState>,
    pub result: Option<BlockResult>,
}

impl BlockUpdate {
    /// Places an occupant in the slot
    pub fn occupant(participant: Option<ParticipantId>, name: Option<String>) -> Self {
        Self {
            participant,
            participant_name: name,
            ..Default::default()
        }
    }

    pub fn state(state: BlockState) -> Self {
        Self {
            state: Some(state),
            ..Default::default()
        }
    }

    pub fn score(score: i64) -> Self {
        Self {
            score: Some(score),
            ..Default::default()
        }
    }

    /// Completes the slot with the given outcome
    pub fn decided(result: BlockResult) -> Self {
        Self {
            state: Some(BlockState::Completed),
            result: Some(result),
            ..Default::default()
        }
    }

    pub fn with_state(mut self, state: BlockState) -> Self {
        self.state = Some(state);
        self
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// Merge this update into a block
    pub fn apply(&self, block: &mut Block) {
        if let Some(participant) = self.participant {
            block.participant = Some(participant);
        }
        if let Some(name) = &self.participant_name {
            block.participant_name = Some(name.clone());
        }
        if let Some(score) = self.score {
            block.score = score;
        }
        if let Some(state) = self.state {
            block.state = state;
        }
        if let Some(result) = self.result {
            block.result = result;
        }
    }
}

/// Block store query filters
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockFilter {
    /// Blocks with these ids, returned in the order given
    Ids(Vec<BlockId>),
    /// Blocks occupied by `participant` at `depth`
    ParticipantAtDepth {
        participant: ParticipantId,
        depth: u32,
    },
    /// Children of a block
    Parent(BlockId),
}

/// A single-elimination tree instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bracket {
    pub id: BracketId,
    pub total_participants: u32,
    /// Branching factor of the tree
    pub participants_per_match: u32,
    /// Block ids, root first, in construction order
    pub blocks: Vec<BlockId>,
    /// Depth of the round currently being played; 0 once decided
    pub current_depth: u32,
}

impl Bracket {
    /// Whether the champion already occupies the root
    pub fn is_decided(&self) -> bool {
        self.current_depth == 0
    }

    pub fn contains_block(&self, block_id: BlockId) -> bool {
        self.blocks.contains(&block_id)
    }
}

/// Fields a store needs to create a bracket
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBracket {
    pub total_participants: u32,
    pub participants_per_match: u32,
    pub blocks: Vec<BlockId>,
    pub current_depth: u32,
}

/// Merge-only partial update of a bracket
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BracketUpdate {
    pub current_depth: Option<u32>,
}

/// A bracket together with all of its blocks in enumeration order
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BracketView {
    pub bracket: Bracket,
    pub blocks: Vec<Block>,
}

impl BracketView {
    pub fn blocks_at_depth(&self, depth: u32) -> impl Iterator<Item = &Block> {
        self.blocks.iter().filter(move |b| b.depth == depth)
    }

    pub fn root(&self) -> Option<&Block> {
        self.blocks.iter().find(|b| b.is_root())
    }

    /// Root occupant once the bracket is decided
    pub fn champion(&self) -> Option<ParticipantId> {
        if !self.bracket.is_decided() {
            return None;
        }
        self.root().and_then(|root| root.participant)
    }
}
