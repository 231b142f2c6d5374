use anyhow::Result;
use compute::{CoordinatorSettings, RecomputeCoordinator};
use migration::{Migrator, MigratorTrait};
use sea_orm::{Database, DatabaseConnection};
use std::time::Duration;
use tracing::{debug, error, info, trace};

use crate::schemas::AppState;

/// Connect to the database named by `database_url`
pub async fn connect(database_url: &str) -> Result<DatabaseConnection> {
    trace!("Attempting to connect to database");
    match Database::connect(database_url).await {
        Ok(connection) => {
            info!("Successfully connected to database");
            debug!("Database connection established");
            Ok(connection)
        }
        Err(e) => {
            error!("Failed to connect to database '{}': {}", database_url, e);
            Err(e.into())
        }
    }
}

/// Apply every pending migration
pub async fn run_migrations(db: &DatabaseConnection) -> Result<()> {
    info!("Running database migrations");
    trace!("Executing migration up command");
    match Migrator::up(db, None).await {
        Ok(_) => {
            info!("Database migrations completed successfully");
            debug!("All pending migrations have been applied");
            Ok(())
        }
        Err(e) => {
            error!("Failed to run database migrations: {}", e);
            Err(e.into())
        }
    }
}

/// Coordinator limits from the millisecond values given on the command line
pub fn coordinator_settings(lock_timeout_ms: u64, mutation_timeout_ms: u64) -> CoordinatorSettings {
    CoordinatorSettings {
        lock_timeout: Duration::from_millis(lock_timeout_ms),
        mutation_timeout: Duration::from_millis(mutation_timeout_ms),
    }
}

/// Initialize application state for an already connected database
pub fn initialize_app_state(db: DatabaseConnection, settings: CoordinatorSettings) -> AppState {
    debug!(
        "Ledger lock timeout: {:?}, mutation timeout: {:?}",
        settings.lock_timeout, settings.mutation_timeout
    );
    AppState::new(RecomputeCoordinator::new(db, settings))
}
