use serde::Serialize;

use crate::constants::server::SERVICE_NAME;

pub const HEALTHY: &str = "healthy";

#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub status: String,
    pub service: String,
    pub version: String,
}

/// Liveness report of the guard itself, the registry is not consulted
#[derive(Debug, Clone, Default)]
pub struct HealthService;

impl HealthService {
    pub fn new() -> Self {
        Self
    }

    pub fn check_health(&self) -> HealthStatus {
        HealthStatus {
            status: HEALTHY.to_string(),
            service: SERVICE_NAME.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}
