//! Service container for dependency injection
//!
//! Wires up all services with their dependencies.

use std::sync::Arc;
use std::time::Duration;

use crate::application::services::{NavigatorService, ReconciliationService};
use crate::config::Settings;
use crate::infrastructure::http::HttpRegionSource;
use crate::infrastructure::traits::RegionSource;
use crate::infrastructure::InfraResult;

/// Container holding the settings and the data source.
pub struct ServiceContainer {
    /// Application settings
    pub settings: Arc<Settings>,

    /// Statistics data source
    pub source: Arc<dyn RegionSource>,
}

impl ServiceContainer {
    /// Create a new service container backed by the HTTP data source.
    pub fn new(settings: Settings) -> InfraResult<Self> {
        let source = HttpRegionSource::new(&settings.source)?;
        Ok(Self::with_source(settings, Arc::new(source)))
    }

    /// Create a service container with a custom data source (for testing).
    pub fn with_source(settings: Settings, source: Arc<dyn RegionSource>) -> Self {
        let settings = Arc::new(settings);

        Self { settings, source }
    }

    pub fn reconciliation(&self) -> ReconciliationService {
        ReconciliationService::new(self.source.clone(), self.settings.display.year)
    }

    /// A fresh navigator with an empty tree.
    pub fn navigator(&self) -> NavigatorService {
        NavigatorService::new(
            self.source.clone(),
            self.reconciliation(),
            Duration::from_millis(self.settings.navigator.reload_retry_delay_ms),
        )
    }
}
