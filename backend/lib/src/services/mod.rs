//! Services module for the wallet guard

pub mod auth;
pub mod health;

use std::sync::Arc;

use crate::{config::Config, data::registry::AuthorizationRegistry, error::Error};

#[derive(Clone)]
pub struct Services {
    pub auth: Arc<auth::AuthService>,
    pub health: Arc<health::HealthService>,
    pub registry: Arc<dyn AuthorizationRegistry>,
}

impl Services {
    /// Build the services from a validated configuration
    pub fn new(config: &Config, registry: Arc<dyn AuthorizationRegistry>) -> Result<Self, Error> {
        let auth = Arc::new(auth::AuthService::new(config, registry.clone())?);
        let health = Arc::new(health::HealthService::new());

        Ok(Self {
            auth,
            health,
            registry,
        })
    }
}

#[cfg(feature = "mocks")]
impl Services {
    /// Create services backed by an empty [`MockRegistry`](crate::data::registry::MockRegistry)
    /// and the development signing key
    pub fn mocks() -> Self {
        Self::mocks_with_registry(Arc::new(crate::data::registry::MockRegistry::new()))
    }

    /// Same as [`Services::mocks`], sharing the given registry
    pub fn mocks_with_registry(registry: Arc<crate::data::registry::MockRegistry>) -> Self {
        let mut config = Config::default();
        config.auth.signing_key = crate::constants::test::DEV_SIGNING_KEY.to_string();

        Self::new(&config, registry).expect("development configuration is valid")
    }
}
