//! Knockout tournaments.
//!
//! A tournament owns exactly one bracket, created together with it. This
//! module covers:
//! - Tournament creation and configuration
//! - Participant and admin registration
//! - Drawing the bracket once the roster is full
//! - Playing rounds until a champion is decided
//!
//! ## Example
//!
//! ```no_run
//! use ko_bracket::db::{Database, DatabaseConfig};
//! use ko_bracket::tournament::TournamentConfig;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::new(&DatabaseConfig::from_env()?).await?;
//!     let tournament_mgr = db.tournament_manager();
//!
//!     // 16 entrants, head-to-head matches
//!     let config = TournamentConfig::knockout("Spring Open".to_string(), 16, 2);
//!
//!     let tournament = tournament_mgr.create_tournament(config, 1).await?;
//!     println!("Created tournament: {}", tournament.id);
//!
//!     Ok(())
//! }
//! ```

pub mod manager;
pub mod models;

pub use manager::{TournamentError, TournamentManager, TournamentResult};
pub use models::{
    CompleteTournament, MIN_NAME_LEN, NewTournament, RosterEntry, Tournament, TournamentConfig,
    TournamentDetails, TournamentFilter, TournamentId, TournamentState, TournamentUpdate,
};
