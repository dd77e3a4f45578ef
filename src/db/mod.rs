//! Storage for brackets, blocks and tournaments.
//!
//! The core talks to storage only through the repository traits in
//! [`repository`]. Two backends implement them: PostgreSQL (`Pg*` types,
//! pooled through [`Database`]) and [`MemoryStore`].

use crate::bracket::BracketManager;
use crate::tournament::TournamentManager;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;

pub mod config;
pub mod memory;
pub mod repository;

pub use config::{ConfigError, DatabaseConfig};
pub use memory::MemoryStore;
pub use repository::{
    BlockRepository, BracketRepository, ParticipantDirectory, PgBracketStore,
    PgTournamentRepository, TournamentRepository,
};

/// Bundled schema; every statement is idempotent
const SCHEMA: &str = include_str!("../../migrations/20250101000000_brackets.sql");

/// PostgreSQL pool shared by the bracket and tournament stores
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Open a pool sized and timed by `config`
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use ko_bracket::db::{Database, DatabaseConfig};
    ///
    /// #[tokio::main]
    /// async fn main() -> Result<(), Box<dyn std::error::Error>> {
    ///     let db = Database::new(&DatabaseConfig::from_env()?).await?;
    ///     db.ensure_schema().await?;
    ///
    ///     let brackets = db.bracket_manager();
    ///     let bracket = brackets.create_bracket(32, 2).await?;
    ///     println!("bracket {} has {} blocks", bracket.id, bracket.blocks.len());
    ///     Ok(())
    /// }
    /// ```
    pub async fn new(config: &DatabaseConfig) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.connection_timeout_secs))
            .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
            .max_lifetime(Duration::from_secs(config.max_lifetime_secs))
            .connect(&config.database_url)
            .await?;

        log::info!(
            "Connected to bracket database (pool {}..{})",
            config.min_connections,
            config.max_connections
        );
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Create the `blocks`, `brackets` and `tournaments` tables if missing.
    ///
    /// The `users` table read by the participant directory belongs to the
    /// account system and is not created here.
    pub async fn ensure_schema(&self) -> Result<(), sqlx::Error> {
        sqlx::raw_sql(SCHEMA).execute(&self.pool).await?;
        log::info!("Bracket schema ensured");
        Ok(())
    }

    /// Bracket manager over this pool
    pub fn bracket_manager(&self) -> BracketManager {
        BracketManager::postgres(self.pool.clone())
    }

    /// Tournament manager over this pool
    pub fn tournament_manager(&self) -> TournamentManager {
        TournamentManager::postgres(self.pool.clone())
    }

    pub async fn health_check(&self) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    pub async fn close(self) {
        self.pool.close().await;
    }
}
