use anyhow::Result;
use compute::CoordinatorSettings;
use tracing::{debug, error, info, trace};

use crate::config::{connect, initialize_app_state};

/// Rebuild the settlement cache of one fund, or of every fund when `fund_id` is `None`
pub async fn recompute(database_url: &str, fund_id: Option<i32>, settings: CoordinatorSettings) -> Result<()> {
    trace!("Entering recompute function");
    debug!("Database URL: {}", database_url);

    let db = connect(database_url).await?;
    let state = initialize_app_state(db, settings);

    match fund_id {
        Some(fund_id) => {
            info!("Recomputing fund {}", fund_id);
            match state.coordinator.recompute(fund_id).await {
                Ok(settlement) => {
                    let stats = &settlement.stats;
                    info!(
                        "Fund {}: balance {}, paid {}, unpaid {}",
                        fund_id, stats.balance, stats.total_paid, stats.total_unpaid
                    );
                }
                Err(e) => {
                    error!("Failed to recompute fund {}: {}", fund_id, e);
                    return Err(e.into());
                }
            }
        }
        None => {
            info!("Recomputing every fund");
            match state.coordinator.recompute_all().await {
                Ok(fund_ids) => info!("Recomputed {} funds", fund_ids.len()),
                Err(e) => {
                    error!("Failed to recompute funds: {}", e);
                    return Err(e.into());
                }
            }
        }
    }

    trace!("recompute function completed");
    Ok(())
}
