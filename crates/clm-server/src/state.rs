//! Shared application state

use std::sync::Arc;

use clm_core::ports::HealthCheck;
use clm_core::{ClmError, ContractService};

use crate::config::ServerConfig;
use crate::error::AppError;

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<ContractService>,
    pub health: Arc<dyn HealthCheck>,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    pub fn new(
        service: Arc<ContractService>,
        health: Arc<dyn HealthCheck>,
        config: ServerConfig,
    ) -> Self {
        Self {
            service,
            health,
            config: Arc::new(config),
        }
    }

    pub fn expose_details(&self) -> bool {
        !self.config.is_production()
    }

    /// Error mapper for one endpoint: `context` is the 500 message.
    pub fn fail(&self, context: &'static str) -> impl Fn(ClmError) -> AppError {
        let expose = self.expose_details();
        move |err| AppError::from_clm(err, context, expose)
    }
}
