use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::sync::Arc;

use crate::config::GatewayConfig;
use crate::gateway::hub::HubHandle;

#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub hub: HubHandle,
    pub gateway: Arc<GatewayConfig>,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    /// Start a hub and bundle it with the directory pool.
    pub fn new(db: SqlitePool, gateway: GatewayConfig) -> Self {
        let hub = crate::gateway::hub::Hub::spawn(gateway.command_capacity);
        Self {
            db,
            hub,
            gateway: Arc::new(gateway),
            started_at: Utc::now(),
        }
    }
}
