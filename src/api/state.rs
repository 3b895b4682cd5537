//! Application state - Dependency injection container.
//!
//! Provides centralized access to all application services and infrastructure.

use std::sync::Arc;

use crate::config::Config;
use crate::infra::UnitOfWork;
use crate::services::{ServiceContainer, Services};

/// Application state shared by every handler.
#[derive(Clone)]
pub struct AppState {
    /// All application services
    pub services: Arc<dyn ServiceContainer>,
    /// Store access for health checks
    pub uow: Arc<dyn UnitOfWork>,
    pub config: Config,
}

impl AppState {
    /// Build the full service container over the given unit of work.
    pub fn from_config(uow: Arc<dyn UnitOfWork>, config: Config) -> Self {
        let services = Arc::new(Services::from_unit_of_work(uow.clone(), config.clone()));
        Self::new(services, uow, config)
    }

    /// Create application state with manually injected services.
    pub fn new(services: Arc<dyn ServiceContainer>, uow: Arc<dyn UnitOfWork>, config: Config) -> Self {
        Self {
            services,
            uow,
            config,
        }
    }
}
