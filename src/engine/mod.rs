//! Execution engine for dbsync
//!
//! The engine orchestrates:
//! 1. Observing - Fetch every kind from the remote platform
//! 2. Planning - Reconcile observed state against the registry
//! 3. Executing - Apply changes in dependency order

pub mod differ;
pub mod executor;

use anyhow::{Context, Result};
use reconcile::{Plan, ResourceRegistry};

use crate::config::Config;
use crate::remote::{self, RemoteApi};

pub use executor::{ExecuteOptions, execute};

/// Fetch remote state and plan the targeted kinds against the registry
pub fn build_plan(
    registry: &ResourceRegistry,
    remote: &dyn RemoteApi,
    config: &Config,
    include_native: bool,
    target: Option<&str>,
) -> Result<Plan> {
    let observed = remote::fetch_observed(remote, &config.native_catalog(), &config.schemas)
        .context("Failed to fetch remote state")?;

    let plan = Plan::build_target(registry, &observed, include_native, target)?;
    log::debug!("plan: {:?}", plan.summary());
    Ok(plan)
}
