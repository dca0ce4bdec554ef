use std::path::Path;
use std::sync::Arc;

use envpin_domain::InstalledSet;

use crate::config::Config;
use crate::error::PinError;
use crate::inspect::CondaManager;
use crate::lock::CondaLock;

/// Read-only view of a materialized package environment.
pub trait EnvironmentManager: Send + Sync {
    /// Packages installed by the environment manager itself.
    fn list_packages(&self, env: &str) -> Result<InstalledSet, PinError>;
    /// Packages installed by pip inside the same environment.
    fn freeze_secondary(&self, env: &str) -> Result<InstalledSet, PinError>;
}

pub trait LockGenerator: Send + Sync {
    /// Produce an explicit lock for `platform` at `dest`, or leave `dest`
    /// untouched on failure.
    fn generate(&self, manifest: &Path, platform: &str, dest: &Path) -> Result<(), PinError>;
}

pub trait Effects: Send + Sync {
    fn manager(&self) -> &dyn EnvironmentManager;
    fn locker(&self) -> &dyn LockGenerator;
}

pub struct SystemEffects {
    manager: Arc<CondaManager>,
    locker: Arc<CondaLock>,
}

impl SystemEffects {
    #[must_use]
    pub fn new(config: &Config) -> Self {
        Self {
            manager: Arc::new(CondaManager::new(config.tools().clone())),
            locker: Arc::new(CondaLock::new(config.tools().clone())),
        }
    }
}

impl Effects for SystemEffects {
    fn manager(&self) -> &dyn EnvironmentManager {
        self.manager.as_ref()
    }

    fn locker(&self) -> &dyn LockGenerator {
        self.locker.as_ref()
    }
}
