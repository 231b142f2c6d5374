use anyhow::Result;
use tracing::{debug, info, trace};

use crate::config::{connect, run_migrations};

pub async fn init_database(database_url: &str) -> Result<()> {
    trace!("Entering init_database function");
    info!("Initializing database");
    debug!("Database URL: {}", database_url);

    let db = connect(database_url).await?;
    run_migrations(&db).await?;

    info!("Database initialization completed successfully!");
    trace!("init_database function completed");

    Ok(())
}
