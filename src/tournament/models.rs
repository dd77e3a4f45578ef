//! Tournament data models.

use super::manager::{TournamentError, TournamentResult};
use crate::bracket::{BracketId, BracketView, ParticipantId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Tournament ID type
pub type TournamentId = i64;

/// Shortest accepted tournament name
pub const MIN_NAME_LEN: usize = 3;

/// Tournament state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TournamentState {
    /// Accepting participants
    SignUpPhase,
    /// Roster complete, bracket seeded
    DrawPhase,
    /// Rounds being played
    OnGoing,
    /// Champion decided
    Completed,
    /// Abandoned
    Discarded,
}

impl TournamentState {
    pub fn as_str(&self) -> &'static str {
        match self {
            TournamentState::SignUpPhase => "sign_up_phase",
            TournamentState::DrawPhase => "draw_phase",
            TournamentState::OnGoing => "on_going",
            TournamentState::Completed => "completed",
            TournamentState::Discarded => "discarded",
        }
    }
}

impl fmt::Display for TournamentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TournamentState {
    type Err = TournamentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sign_up_phase" => Ok(TournamentState::SignUpPhase),
            "draw_phase" => Ok(TournamentState::DrawPhase),
            "on_going" => Ok(TournamentState::OnGoing),
            "completed" => Ok(TournamentState::Completed),
            "discarded" => Ok(TournamentState::Discarded),
            other => Err(TournamentError::UnknownState(other.to_string())),
        }
    }
}

/// Tournament configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TournamentConfig {
    /// Tournament name
    pub name: String,
    /// Free-form description
    pub description: String,
    /// Listed publicly
    pub public: bool,
    /// Search tags
    pub tags: Vec<String>,
    /// Bracket size; must be a power of `participants_per_match`
    pub total_participants: u32,
    /// Branching factor of the bracket
    pub participants_per_match: u32,
    /// Planned start
    pub start_date: Option<DateTime<Utc>>,
}

impl TournamentConfig {
    /// Create a public knockout configuration with no description or tags
    pub fn knockout(name: String, total_participants: u32, participants_per_match: u32) -> Self {
        Self {
            name,
            description: String::new(),
            public: true,
            tags: Vec::new(),
            total_participants,
            participants_per_match,
            start_date: None,
        }
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    pub fn private(mut self) -> Self {
        self.public = false;
        self
    }

    /// Check the fields owned by the tournament itself.
    ///
    /// Bracket sizes are validated by the bracket builder.
    pub fn validate(&self) -> TournamentResult<()> {
        if self.name.trim().chars().count() < MIN_NAME_LEN {
            return Err(TournamentError::InvalidName(self.name.clone()));
        }
        if self.total_participants == 0 {
            return Err(TournamentError::MissingField("total_participants"));
        }
        if self.participants_per_match == 0 {
            return Err(TournamentError::MissingField("participants_per_match"));
        }
        Ok(())
    }
}

/// Tournament record
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tournament {
    pub id: TournamentId,
    pub config: TournamentConfig,
    pub state: TournamentState,
    pub admins: Vec<ParticipantId>,
    /// Registered participants in sign-up order
    pub participants: Vec<ParticipantId>,
    pub bracket_id: BracketId,
    pub created_at: DateTime<Utc>,
}

impl Tournament {
    pub fn is_full(&self) -> bool {
        self.participants.len() >= self.config.total_participants as usize
    }

    pub fn is_admin(&self, user_id: ParticipantId) -> bool {
        self.admins.contains(&user_id)
    }

    pub fn is_participant(&self, user_id: ParticipantId) -> bool {
        self.participants.contains(&user_id)
    }
}

/// Fields a store needs to create a tournament
#[derive(Debug, Clone)]
pub struct NewTournament {
    pub config: TournamentConfig,
    pub admins: Vec<ParticipantId>,
    pub bracket_id: BracketId,
}

/// Editable tournament details; `None` keeps the stored value
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TournamentDetails {
    pub description: Option<String>,
    pub public: Option<bool>,
    pub tags: Option<Vec<String>>,
    pub state: Option<TournamentState>,
    pub start_date: Option<DateTime<Utc>>,
}

/// Merge-only partial update of a tournament record
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TournamentUpdate {
    pub details: TournamentDetails,
    pub admins: Option<Vec<ParticipantId>>,
    pub participants: Option<Vec<ParticipantId>>,
}

impl TournamentUpdate {
    pub fn state(state: TournamentState) -> Self {
        Self {
            details: TournamentDetails {
                state: Some(state),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    pub fn apply(&self, tournament: &mut Tournament) {
        let details = &self.details;
        if let Some(description) = &details.description {
            tournament.config.description = description.clone();
        }
        if let Some(public) = details.public {
            tournament.config.public = public;
        }
        if let Some(tags) = &details.tags {
            tournament.config.tags = tags.clone();
        }
        if let Some(start_date) = details.start_date {
            tournament.config.start_date = Some(start_date);
        }
        if let Some(state) = details.state {
            tournament.state = state;
        }
        if let Some(admins) = &self.admins {
            tournament.admins = admins.clone();
        }
        if let Some(participants) = &self.participants {
            tournament.participants = participants.clone();
        }
    }
}

/// Tournament listing filters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TournamentFilter {
    Public,
    Admin(ParticipantId),
    Participant(ParticipantId),
}

impl TournamentFilter {
    pub fn matches(&self, tournament: &Tournament) -> bool {
        match self {
            TournamentFilter::Public => tournament.config.public,
            TournamentFilter::Admin(user_id) => tournament.is_admin(*user_id),
            TournamentFilter::Participant(user_id) => tournament.is_participant(*user_id),
        }
    }
}

/// Registered participant with the name shown for them
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterEntry {
    pub id: ParticipantId,
    pub display_name: Option<String>,
}

/// Tournament together with its roster, bracket and blocks
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteTournament {
    pub tournament: Tournament,
    /// In registration order
    pub participants: Vec<RosterEntry>,
    pub bracket: BracketView,
}
