//! Tournament manager for knockout tournaments built around one bracket.

use super::models::{
    CompleteTournament, NewTournament, RosterEntry, Tournament, TournamentConfig, TournamentDetails,
    TournamentFilter, TournamentId, TournamentState, TournamentUpdate,
};
use crate::bracket::{BracketError, BracketManager, ErrorKind, ParticipantId};
use crate::db::{
    BlockRepository, BracketRepository, ParticipantDirectory, PgBracketStore,
    PgTournamentRepository, TournamentRepository,
};
use sqlx::PgPool;
use std::sync::Arc;
use thiserror::Error;

/// Tournament errors
#[derive(Debug, Error)]
pub enum TournamentError {
    #[error("Tournament not found: {0}")]
    NotFound(TournamentId),

    #[error("Tournament is full")]
    TournamentFull,

    #[error("Participant already registered")]
    AlreadyRegistered,

    #[error("User is already an admin")]
    AlreadyAdmin,

    #[error("Unknown user: {0}")]
    UnknownUser(ParticipantId),

    #[error("Tournament not in correct state: expected {expected:?}, got {actual:?}")]
    InvalidState {
        expected: TournamentState,
        actual: TournamentState,
    },

    #[error("Tournament cannot advance while {actual:?}: it must be drawn or ongoing")]
    NotPlayable { actual: TournamentState },

    #[error("Tournament name must be at least 3 characters: {0:?}")]
    InvalidName(String),

    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Unknown tournament state: {0}")]
    UnknownState(String),

    #[error("Write not acknowledged: {0}")]
    Unacknowledged(String),

    #[error(transparent)]
    Bracket(#[from] BracketError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl TournamentError {
    /// Get a client-safe error message
    pub fn client_message(&self) -> String {
        match self {
            TournamentError::Bracket(e) => e.client_message(),
            TournamentError::UnknownState(_)
            | TournamentError::Unacknowledged(_)
            | TournamentError::Database(_)
            | TournamentError::Serialization(_) => "Internal server error".to_string(),
            _ => self.to_string(),
        }
    }

    /// Whether the error comes from bracket validation
    pub fn is_bracket_validation(&self) -> bool {
        matches!(self, TournamentError::Bracket(e) if e.kind() == ErrorKind::Validation)
    }
}

pub type TournamentResult<T> = Result<T, TournamentError>;

/// Tournament manager
#[derive(Clone)]
pub struct TournamentManager {
    tournaments: Arc<dyn TournamentRepository>,
    directory: Arc<dyn ParticipantDirectory>,
    brackets: BracketManager,
}

impl TournamentManager {
    /// Create a new tournament manager
    pub fn new(
        tournaments: Arc<dyn TournamentRepository>,
        directory: Arc<dyn ParticipantDirectory>,
        brackets: BracketManager,
    ) -> Self {
        Self {
            tournaments,
            directory,
            brackets,
        }
    }

    /// Create a tournament manager over one store implementing every repository
    pub fn with_store<S>(store: Arc<S>) -> Self
    where
        S: BlockRepository
            + BracketRepository
            + ParticipantDirectory
            + TournamentRepository
            + 'static,
    {
        let tournaments: Arc<dyn TournamentRepository> = store.clone();
        let directory: Arc<dyn ParticipantDirectory> = store.clone();
        Self::new(tournaments, directory, BracketManager::with_store(store))
    }

    /// Create a tournament manager backed by PostgreSQL
    pub fn postgres(pool: PgPool) -> Self {
        let store = Arc::new(PgBracketStore::new(pool.clone()));
        Self::new(
            Arc::new(PgTournamentRepository::new(pool)),
            store.clone(),
            BracketManager::with_store(store),
        )
    }

    /// Bracket operations of this manager
    pub fn brackets(&self) -> &BracketManager {
        &self.brackets
    }

    /// Create a new tournament together with its bracket
    ///
    /// # Arguments
    ///
    /// * `config` - Tournament configuration
    /// * `admin` - Creator, becomes the first admin
    ///
    /// # Returns
    ///
    /// * `TournamentResult<Tournament>` - The stored tournament in sign-up phase
    pub async fn create_tournament(
        &self,
        config: TournamentConfig,
        admin: ParticipantId,
    ) -> TournamentResult<Tournament> {
        config.validate()?;

        let bracket = self
            .brackets
            .create_bracket(config.total_participants, config.participants_per_match)
            .await?;

        let name = config.name.clone();
        let new_tournament = NewTournament {
            config,
            admins: vec![admin],
            bracket_id: bracket.id,
        };

        let tournament_id = match self.tournaments.create_tournament(&new_tournament).await {
            Ok(id) => id,
            Err(e) => {
                log::warn!(
                    "Storing tournament '{}' failed, discarding bracket {}: {}",
                    name,
                    bracket.id,
                    e
                );
                if let Err(cleanup) = self.brackets.delete_bracket(bracket.id).await {
                    log::error!("Failed to discard bracket {}: {}", bracket.id, cleanup);
                }
                return Err(e);
            }
        };

        log::info!(
            "Created tournament {} '{}' with bracket {}",
            tournament_id,
            name,
            bracket.id
        );

        self.get_tournament(tournament_id).await
    }

    pub async fn get_tournament(&self, tournament_id: TournamentId) -> TournamentResult<Tournament> {
        self.tournaments
            .get_tournament(tournament_id)
            .await?
            .ok_or(TournamentError::NotFound(tournament_id))
    }

    /// Tournament with its named roster, its bracket and all blocks
    pub async fn get_complete_tournament(
        &self,
        tournament_id: TournamentId,
    ) -> TournamentResult<CompleteTournament> {
        let tournament = self.get_tournament(tournament_id).await?;
        let bracket = self.brackets.get_bracket_view(tournament.bracket_id).await?;

        let mut participants = Vec::with_capacity(tournament.participants.len());
        for &id in &tournament.participants {
            participants.push(RosterEntry {
                id,
                display_name: self.directory.display_name(id).await?,
            });
        }

        Ok(CompleteTournament {
            tournament,
            participants,
            bracket,
        })
    }

    pub async fn list_public_tournaments(&self) -> TournamentResult<Vec<Tournament>> {
        self.tournaments
            .list_tournaments(TournamentFilter::Public)
            .await
    }

    pub async fn tournaments_for_admin(
        &self,
        user_id: ParticipantId,
    ) -> TournamentResult<Vec<Tournament>> {
        self.tournaments
            .list_tournaments(TournamentFilter::Admin(user_id))
            .await
    }

    pub async fn tournaments_for_participant(
        &self,
        user_id: ParticipantId,
    ) -> TournamentResult<Vec<Tournament>> {
        self.tournaments
            .list_tournaments(TournamentFilter::Participant(user_id))
            .await
    }

    /// Register a participant.
    ///
    /// The registration that fills the roster seeds the bracket and moves
    /// the tournament to the draw phase.
    pub async fn add_participant(
        &self,
        tournament_id: TournamentId,
        user_id: ParticipantId,
    ) -> TournamentResult<Tournament> {
        let mut tournament = self.get_tournament(tournament_id).await?;

        expect_state(&tournament, TournamentState::SignUpPhase)?;
        if tournament.is_full() {
            return Err(TournamentError::TournamentFull);
        }
        if tournament.is_participant(user_id) {
            return Err(TournamentError::AlreadyRegistered);
        }
        self.expect_known_user(user_id).await?;

        let mut participants = tournament.participants.clone();
        participants.push(user_id);
        let fills_roster = participants.len() >= tournament.config.total_participants as usize;

        // A stored full roster always has a drawn bracket
        if fills_roster {
            self.brackets
                .seed_bracket(tournament.bracket_id, &participants)
                .await?;
        }

        let mut update = TournamentUpdate {
            participants: Some(participants),
            ..Default::default()
        };
        if fills_roster {
            update.details.state = Some(TournamentState::DrawPhase);
        }
        self.write(tournament_id, &update).await?;
        update.apply(&mut tournament);

        log::info!(
            "Participant {} joined tournament {} ({}/{})",
            user_id,
            tournament_id,
            tournament.participants.len(),
            tournament.config.total_participants
        );
        if fills_roster {
            log::info!("Tournament {} is full, bracket drawn", tournament_id);
        }

        Ok(tournament)
    }

    /// Grant admin rights on a tournament
    pub async fn add_admin(
        &self,
        tournament_id: TournamentId,
        user_id: ParticipantId,
    ) -> TournamentResult<Tournament> {
        let mut tournament = self.get_tournament(tournament_id).await?;

        if tournament.is_admin(user_id) {
            return Err(TournamentError::AlreadyAdmin);
        }
        self.expect_known_user(user_id).await?;

        let mut admins = tournament.admins.clone();
        admins.push(user_id);
        let update = TournamentUpdate {
            admins: Some(admins),
            ..Default::default()
        };
        self.write(tournament_id, &update).await?;
        update.apply(&mut tournament);

        Ok(tournament)
    }

    /// Merge the given details into the tournament
    pub async fn update_tournament(
        &self,
        tournament_id: TournamentId,
        details: TournamentDetails,
    ) -> TournamentResult<Tournament> {
        let mut tournament = self.get_tournament(tournament_id).await?;

        let update = TournamentUpdate {
            details,
            ..Default::default()
        };
        self.write(tournament_id, &update).await?;
        update.apply(&mut tournament);

        Ok(tournament)
    }

    /// Play out the current bracket round.
    ///
    /// The first round moves a drawn tournament to `OnGoing`; the round that
    /// decides the bracket completes it.
    pub async fn advance_round(&self, tournament_id: TournamentId) -> TournamentResult<Tournament> {
        let mut tournament = self.get_tournament(tournament_id).await?;

        match tournament.state {
            TournamentState::DrawPhase | TournamentState::OnGoing => {}
            actual => return Err(TournamentError::NotPlayable { actual }),
        }

        let bracket = self.brackets.advance_round(tournament.bracket_id).await?;

        let next_state = if bracket.is_decided() {
            TournamentState::Completed
        } else {
            TournamentState::OnGoing
        };
        if next_state != tournament.state {
            let update = TournamentUpdate::state(next_state);
            self.write(tournament_id, &update).await?;
            update.apply(&mut tournament);
            log::info!("Tournament {} is now {}", tournament_id, next_state);
        }

        Ok(tournament)
    }

    /// Delete a tournament that has not left the sign-up phase, and its bracket
    pub async fn delete_tournament(&self, tournament_id: TournamentId) -> TournamentResult<()> {
        let tournament = self.get_tournament(tournament_id).await?;
        expect_state(&tournament, TournamentState::SignUpPhase)?;

        self.brackets.delete_bracket(tournament.bracket_id).await?;
        if !self.tournaments.delete_tournament(tournament_id).await? {
            return Err(TournamentError::NotFound(tournament_id));
        }

        log::info!("Deleted tournament {}", tournament_id);
        Ok(())
    }

    async fn expect_known_user(&self, user_id: ParticipantId) -> TournamentResult<()> {
        match self.directory.display_name(user_id).await? {
            Some(_) => Ok(()),
            None => Err(TournamentError::UnknownUser(user_id)),
        }
    }

    async fn write(
        &self,
        tournament_id: TournamentId,
        update: &TournamentUpdate,
    ) -> TournamentResult<()> {
        if self.tournaments.update_tournament(tournament_id, update).await? {
            Ok(())
        } else {
            Err(TournamentError::NotFound(tournament_id))
        }
    }
}

fn expect_state(tournament: &Tournament, expected: TournamentState) -> TournamentResult<()> {
    if tournament.state == expected {
        Ok(())
    } else {
        Err(TournamentError::InvalidState {
            expected,
            actual: tournament.state,
        })
    }
}
