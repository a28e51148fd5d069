//! Command implementations
//!
//! - `plan` / `apply` - reconcile the remote platform with the manifest
//! - `status` - per-kind drift overview
//! - `query` - REST read queries over registered models

pub mod query;
pub mod status;
pub mod sync;

use anyhow::{Result, bail};
use reconcile::ResourceRegistry;

use crate::Context;
use crate::config::{Config, DeploymentTarget};
use crate::manifest;
use crate::remote::pg_meta::PgMetaClient;

/// Config and declared resources of the current project
pub struct Project {
    pub config: Config,
    pub registry: ResourceRegistry,
}

impl Project {
    /// Load the config file and its manifest
    pub fn load(ctx: &Context) -> Result<Self> {
        let config = Config::load(ctx.config.as_deref())?;
        let registry = manifest::load_registry(&config.manifest_path())?;
        log::info!(
            "Loaded {} declared resources from {}",
            registry.len(),
            config.manifest_path().display()
        );
        Ok(Self { config, registry })
    }

    /// Client for the platform's metadata API
    pub fn connect(&self, ctx: &Context) -> Result<PgMetaClient> {
        if self.config.deployment_target == DeploymentTarget::Cloud && ctx.access_token.is_none()
        {
            bail!("An access token is required for cloud deployments (set DBSYNC_ACCESS_TOKEN)");
        }
        Ok(PgMetaClient::new(
            self.config.meta_url(),
            ctx.access_token.clone(),
        ))
    }

    /// Whether native records may be deleted
    pub fn include_native(&self, flag: bool) -> bool {
        flag || self.config.include_native
    }
}
