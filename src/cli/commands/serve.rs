use anyhow::Result;
use compute::CoordinatorSettings;
use tokio::net::TcpListener;
use tracing::{debug, error, info, trace};

use crate::config::{connect, initialize_app_state, run_migrations};
use crate::router::create_router;

/// Everything the `serve` command needs to start the API
#[derive(Debug, Clone)]
pub struct ServeOptions {
    pub database_url: String,
    pub bind_address: String,
    pub settings: CoordinatorSettings,
    /// Apply pending migrations before accepting requests
    pub migrate: bool,
}

pub async fn serve(options: ServeOptions) -> Result<()> {
    trace!("Entering serve function");
    info!("Bandfund application starting up");
    debug!("Database URL: {}", options.database_url);
    debug!("Bind address: {}", options.bind_address);

    let db = connect(&options.database_url).await?;
    if options.migrate {
        run_migrations(&db).await?;
    }

    // Initialize application state
    trace!("Initializing application state");
    let state = initialize_app_state(db, options.settings);

    // Create router
    trace!("Creating application router");
    let app = create_router(state);
    debug!("Router created successfully");

    // Start server
    info!("Starting server on {}", options.bind_address);
    trace!("Attempting to bind TCP listener to {}", options.bind_address);
    let listener = match TcpListener::bind(&options.bind_address).await {
        Ok(listener) => {
            debug!("Successfully bound to address: {}", options.bind_address);
            listener
        }
        Err(e) => {
            error!("Failed to bind to address {}: {}", options.bind_address, e);
            return Err(e.into());
        }
    };

    info!("Bandfund API server running on http://{}", options.bind_address);
    info!("Swagger UI available at http://{}/swagger-ui", options.bind_address);

    trace!("Starting axum server");
    if let Err(e) = axum::serve(listener, app).await {
        error!("Server error: {}", e);
        return Err(e.into());
    }

    info!("Server shutdown gracefully");
    Ok(())
}
