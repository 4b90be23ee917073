//! Runtime Module - entry point tying configuration to the runtime parts
//!
//! A [`Runtime`] owns a validated [`VhConfig`] and the system class loader,
//! and hands out loaders, dispatch sites, retry policies and reclamation
//! probes configured from it.

pub mod probe;

pub use probe::{LoaderWatch, ReclaimProbe};

use crate::access::{Access, MethodType};
use crate::class::ClassLoader;
use crate::config::VhConfig;
use crate::error::Result;
use crate::site::AccessSite;
use crate::util::RetryPolicy;
use std::sync::Arc;

/// Configured runtime
#[derive(Debug, Clone)]
pub struct Runtime {
    config: VhConfig,
    system_loader: Arc<ClassLoader>,
}

impl Runtime {
    /// Create a runtime; fails when the configuration is invalid
    pub fn new(config: VhConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            system_loader: ClassLoader::new("system", None),
        })
    }

    pub fn config(&self) -> &VhConfig {
        &self.config
    }

    /// Root loader of the runtime
    pub fn system_loader(&self) -> &Arc<ClassLoader> {
        &self.system_loader
    }

    /// New loader delegating to the system loader
    pub fn new_loader(&self, name: &str) -> Arc<ClassLoader> {
        ClassLoader::new(name, Some(Arc::clone(&self.system_loader)))
    }

    /// Dispatch site sized by the configuration
    pub fn access_site(&self, access: Access, call_type: Option<MethodType>) -> AccessSite {
        AccessSite::with_capacity(access, call_type, self.config.site_cache_capacity)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::from_config(&self.config)
    }

    pub fn reclaim_probe(&self) -> ReclaimProbe {
        ReclaimProbe::from_config(&self.config)
    }
}
