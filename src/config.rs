//! dbsync configuration (`dbsync.toml`)
//!
//! # Lookup Priority
//!
//! 1. `--config` flag (or `DBSYNC_CONFIG`, handled by clap)
//! 2. `./dbsync.toml`
//! 3. `{config_dir}/dbsync/config.toml`
//!    - Windows: `%APPDATA%\dbsync\config.toml`
//!    - macOS: `~/Library/Application Support/dbsync/config.toml`
//!    - Linux: `~/.config/dbsync/config.toml`

use anyhow::{Context, Result, bail};
use reconcile::NativeCatalog;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Config file name looked up in the working directory
pub const LOCAL_CONFIG_FILE: &str = "dbsync.toml";

/// Where the platform is hosted
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeploymentTarget {
    /// Managed platform, reached through the management API
    #[default]
    Cloud,
    /// Self-hosted stack exposing pg-meta directly
    SelfHosted,
}

/// Extra names treated as platform-owned
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeOverrides {
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default)]
    pub schemas: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub deployment_target: DeploymentTarget,

    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Required for cloud deployments
    #[serde(default)]
    pub project_id: Option<String>,

    /// pg-meta mount point on a self-hosted stack
    #[serde(default = "default_meta_base_path")]
    pub meta_base_path: String,

    /// Public REST endpoint, derived from the project id on cloud
    #[serde(default)]
    pub public_url: Option<String>,

    /// Schemas under management
    #[serde(default = "default_schemas")]
    pub schemas: Vec<String>,

    /// Declared resources, relative to the config file
    #[serde(default = "default_manifest")]
    pub manifest: String,

    /// Allow deleting platform-owned records
    #[serde(default)]
    pub include_native: bool,

    #[serde(default)]
    pub native: NativeOverrides,

    /// Directory of the loaded config file
    #[serde(skip)]
    pub base_dir: PathBuf,
}

fn default_api_url() -> String {
    "https://api.supabase.com".to_string()
}

fn default_meta_base_path() -> String {
    "/pg-meta".to_string()
}

fn default_schemas() -> Vec<String> {
    vec!["public".to_string()]
}

fn default_manifest() -> String {
    "resources.toml".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            deployment_target: DeploymentTarget::default(),
            api_url: default_api_url(),
            project_id: None,
            meta_base_path: default_meta_base_path(),
            public_url: None,
            schemas: default_schemas(),
            manifest: default_manifest(),
            include_native: false,
            native: NativeOverrides::default(),
            base_dir: PathBuf::from("."),
        }
    }
}

impl Config {
    /// Find and load the config file
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let cwd = std::env::current_dir().context("Could not determine current directory")?;
        let global = dirs::config_dir().map(|d| d.join("dbsync").join("config.toml"));

        let Some(path) = locate(explicit, &cwd, global.as_deref()) else {
            bail!(
                "No {} found (looked in {} and the user config directory)",
                LOCAL_CONFIG_FILE,
                cwd.display()
            );
        };

        Self::load_from(&path)
    }

    /// Load a specific config file
    pub fn load_from(path: &Path) -> Result<Self> {
        log::debug!("Loading config from {}", path.display());
        let content = fs::read_to_string(path)
            .with_context(|| format!("Could not read {}", path.display()))?;
        let mut config: Self = toml::from_str(&content)
            .with_context(|| format!("Invalid config format in {}", path.display()))?;

        config.base_dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
        config.validate()?;
        Ok(config)
    }

    /// Check fields that have no usable default
    pub fn validate(&self) -> Result<()> {
        if self.api_url.trim().is_empty() {
            bail!("api_url must not be empty");
        }
        if self.deployment_target == DeploymentTarget::Cloud
            && self.project_id.as_deref().is_none_or(str::is_empty)
        {
            bail!("project_id is required for cloud deployments");
        }
        if self.schemas.is_empty() {
            bail!("at least one schema must be managed");
        }
        Ok(())
    }

    /// Base URL of the pg-meta endpoints
    pub fn meta_url(&self) -> String {
        let api = self.api_url.trim_end_matches('/');
        match self.deployment_target {
            DeploymentTarget::Cloud => format!(
                "{api}/platform/pg-meta/{}",
                self.project_id.as_deref().unwrap_or_default()
            ),
            DeploymentTarget::SelfHosted => {
                let base = self.meta_base_path.trim_end_matches('/');
                if base.is_empty() || base.starts_with('/') {
                    format!("{api}{base}")
                } else {
                    format!("{api}/{base}")
                }
            }
        }
    }

    /// Public URL used for REST read queries
    pub fn public_url(&self) -> Result<String> {
        if let Some(url) = self.public_url.as_deref().filter(|u| !u.is_empty()) {
            return Ok(url.trim_end_matches('/').to_string());
        }
        match (self.deployment_target, self.project_id.as_deref()) {
            (DeploymentTarget::Cloud, Some(id)) if !id.is_empty() => {
                Ok(format!("https://{id}.supabase.co"))
            }
            _ => bail!("public_url is required for self-hosted deployments"),
        }
    }

    /// Platform defaults plus configured extras
    pub fn native_catalog(&self) -> NativeCatalog {
        let mut catalog = NativeCatalog::default();
        catalog.extend(&self.native.roles, &self.native.schemas);
        catalog
    }

    /// Resolved manifest path
    pub fn manifest_path(&self) -> PathBuf {
        let expanded = shellexpand::tilde(&self.manifest);
        let path = PathBuf::from(expanded.as_ref());
        if path.is_absolute() {
            path
        } else {
            self.base_dir.join(path)
        }
    }
}

/// Pick the config file to load
fn locate(explicit: Option<&Path>, cwd: &Path, global: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        let expanded = shellexpand::tilde(&path.to_string_lossy()).into_owned();
        return Some(PathBuf::from(expanded));
    }

    let local = cwd.join(LOCAL_CONFIG_FILE);
    if local.exists() {
        return Some(local);
    }

    global.filter(|p| p.exists()).map(Path::to_path_buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_load_cloud_config() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "dbsync.toml",
            r#"
project_id = "abcd1234"
schemas = ["public", "billing"]

[native]
roles = ["ops"]
"#,
        );

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.deployment_target, DeploymentTarget::Cloud);
        assert_eq!(
            config.meta_url(),
            "https://api.supabase.com/platform/pg-meta/abcd1234"
        );
        assert_eq!(config.public_url().unwrap(), "https://abcd1234.supabase.co");
        assert_eq!(config.schemas, vec!["public", "billing"]);
        assert_eq!(config.manifest_path(), dir.path().join("resources.toml"));

        let catalog = config.native_catalog();
        assert!(catalog.is_native_role("ops"));
        assert!(catalog.is_native_role("postgres"));
    }

    #[test]
    fn test_load_self_hosted_config() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "dbsync.toml",
            r#"
deployment_target = "self_hosted"
api_url = "http://localhost:8000/"
meta_base_path = "/pg/meta"
public_url = "http://localhost:8000/"
manifest = "db/resources.toml"
"#,
        );

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.meta_url(), "http://localhost:8000/pg/meta");
        assert_eq!(config.public_url().unwrap(), "http://localhost:8000");
        assert_eq!(
            config.manifest_path(),
            dir.path().join("db").join("resources.toml")
        );
    }

    #[test]
    fn test_cloud_requires_project_id() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "dbsync.toml", "schemas = [\"public\"]\n");
        let err = Config::load_from(&path).unwrap_err();
        assert!(err.to_string().contains("project_id"));
    }

    #[test]
    fn test_self_hosted_needs_public_url_for_queries() {
        let config = Config {
            deployment_target: DeploymentTarget::SelfHosted,
            ..Default::default()
        };
        assert!(config.validate().is_ok());
        assert!(config.public_url().is_err());
    }

    #[test]
    fn test_invalid_toml() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "dbsync.toml", "project_id = [");
        assert!(Config::load_from(&path).is_err());
    }

    #[test]
    fn test_locate_priority() {
        let dir = TempDir::new().unwrap();
        let global = write(&dir, "global.toml", "");
        let explicit = dir.path().join("custom.toml");

        assert_eq!(
            locate(Some(&explicit), dir.path(), Some(&global)),
            Some(explicit)
        );
        assert_eq!(locate(None, dir.path(), Some(&global)), Some(global.clone()));

        let local = write(&dir, LOCAL_CONFIG_FILE, "");
        assert_eq!(locate(None, dir.path(), Some(&global)), Some(local));

        let empty = TempDir::new().unwrap();
        assert_eq!(locate(None, empty.path(), None), None);
    }
}
