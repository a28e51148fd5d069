//! Declared resources (`resources.toml`)
//!
//! Each entry implements the matching capability trait of the engine and is
//! registered into a [`ResourceRegistry`].
//!
//! ```toml
//! [[roles]]
//! name = "analyst"
//! can_login = true
//! valid_until = "2030-01-01T00:00:00Z"
//!
//! [[tables]]
//! name = "posts"
//! model = "Post"
//! primary_keys = ["id"]
//! columns = [
//!     { name = "id", type = "bigint", nullable = false, identity = true },
//!     { name = "title", type = "text" },
//! ]
//!
//! [[policies]]
//! name = "read posts"
//! table = "posts"
//! command = "SELECT"
//! roles = ["authenticated"]
//! using = "true"
//!
//! [[rpcs]]
//! name = "recent_posts"
//! return_type = "setof posts"
//! language = "sql"
//! behavior = "STABLE"
//! definition = "select * from posts order by id desc limit p_limit"
//! params = [{ name = "p_limit", type = "integer" }]
//! ```

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Utc};
use reconcile::{
    ColumnDef, Declared, FunctionBehavior, ParamMode, Policy, PolicyCommand, ResourceRegistry,
    Role, Rpc, RpcParam, Table,
};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::sync::Arc;

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    #[serde(default)]
    pub roles: Vec<RoleEntry>,
    #[serde(default)]
    pub tables: Vec<TableEntry>,
    #[serde(default)]
    pub policies: Vec<PolicyEntry>,
    #[serde(default)]
    pub rpcs: Vec<RpcEntry>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RoleEntry {
    pub name: String,
    #[serde(default = "unlimited")]
    pub connection_limit: i32,
    #[serde(default = "yes")]
    pub inherit_role: bool,
    #[serde(default)]
    pub is_replication_role: bool,
    #[serde(default)]
    pub can_bypass_rls: bool,
    #[serde(default)]
    pub can_create_db: bool,
    #[serde(default)]
    pub can_create_role: bool,
    #[serde(default)]
    pub can_login: bool,
    #[serde(default)]
    pub valid_until: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ColumnEntry {
    pub name: String,
    #[serde(rename = "type")]
    pub data_type: String,
    #[serde(default = "yes")]
    pub nullable: bool,
    #[serde(default)]
    pub default: Option<String>,
    #[serde(default)]
    pub unique: bool,
    #[serde(default)]
    pub identity: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TableEntry {
    pub name: String,
    /// Registry name for relation paths, defaults to `name`
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default = "public")]
    pub schema: String,
    #[serde(default)]
    pub columns: Vec<ColumnEntry>,
    #[serde(default)]
    pub primary_keys: Vec<String>,
    #[serde(default = "yes")]
    pub rls_enabled: bool,
    #[serde(default)]
    pub rls_forced: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PolicyEntry {
    pub name: String,
    #[serde(default = "public")]
    pub schema: String,
    pub table: String,
    #[serde(default)]
    pub command: PolicyCommand,
    #[serde(default = "yes")]
    pub permissive: bool,
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default)]
    pub using: Option<String>,
    #[serde(default)]
    pub check: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ParamEntry {
    pub name: String,
    #[serde(rename = "type")]
    pub data_type: String,
    #[serde(default)]
    pub mode: ParamMode,
    #[serde(default)]
    pub has_default: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RpcEntry {
    pub name: String,
    #[serde(default = "public")]
    pub schema: String,
    #[serde(default)]
    pub params: Vec<ParamEntry>,
    pub return_type: String,
    #[serde(default = "plpgsql")]
    pub language: String,
    pub definition: String,
    #[serde(default)]
    pub behavior: FunctionBehavior,
    #[serde(default)]
    pub security_definer: bool,
}

fn unlimited() -> i32 {
    -1
}

fn yes() -> bool {
    true
}

fn public() -> String {
    "public".to_string()
}

fn plpgsql() -> String {
    "plpgsql".to_string()
}

impl Manifest {
    /// Load and validate a manifest file
    pub fn load(path: &Path) -> Result<Self> {
        log::debug!("Loading manifest from {}", path.display());
        let content = fs::read_to_string(path)
            .with_context(|| format!("Could not read {}", path.display()))?;
        let manifest = Self::parse(&content)
            .with_context(|| format!("Invalid manifest {}", path.display()))?;
        Ok(manifest)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let manifest: Self = toml::from_str(content)?;
        manifest.validate()?;
        Ok(manifest)
    }

    /// Reject declarations the platform would refuse
    fn validate(&self) -> Result<()> {
        for policy in &self.policies {
            if policy.using.is_some() && !policy.command.accepts_using() {
                bail!(
                    "policy '{}' on {}: {:?} policies take no USING expression",
                    policy.name,
                    policy.table,
                    policy.command
                );
            }
            if policy.check.is_some() && !policy.command.accepts_check() {
                bail!(
                    "policy '{}' on {}: {:?} policies take no WITH CHECK expression",
                    policy.name,
                    policy.table,
                    policy.command
                );
            }
        }

        for table in &self.tables {
            if let Some(pk) = table
                .primary_keys
                .iter()
                .find(|pk| !table.columns.iter().any(|c| &c.name == *pk))
            {
                bail!("table '{}': primary key '{pk}' is not a declared column", table.name);
            }
        }

        Ok(())
    }

    /// Freeze the declarations into a registry
    pub fn into_registry(self) -> Result<ResourceRegistry> {
        let mut builder = ResourceRegistry::builder();
        for role in self.roles {
            builder = builder.role(Arc::new(DeclaredRole(role)));
        }
        for table in self.tables {
            builder = builder.table(Arc::new(DeclaredTable::from(table)));
        }
        for policy in self.policies {
            builder = builder.policy(Arc::new(DeclaredPolicy(policy)));
        }
        for rpc in self.rpcs {
            builder = builder.rpc(Arc::new(DeclaredRpc::from(rpc)));
        }
        Ok(builder.build()?)
    }
}

/// Load the manifest at `path` into a registry
pub fn load_registry(path: &Path) -> Result<ResourceRegistry> {
    Manifest::load(path)?.into_registry()
}

// ============================================================================
// Capability implementations
// ============================================================================

#[derive(Debug)]
struct DeclaredRole(RoleEntry);

impl Declared for DeclaredRole {
    fn name(&self) -> &str {
        &self.0.name
    }
}

impl Role for DeclaredRole {
    fn connection_limit(&self) -> i32 {
        self.0.connection_limit
    }

    fn inherit_role(&self) -> bool {
        self.0.inherit_role
    }

    fn is_replication_role(&self) -> bool {
        self.0.is_replication_role
    }

    fn can_bypass_rls(&self) -> bool {
        self.0.can_bypass_rls
    }

    fn can_create_db(&self) -> bool {
        self.0.can_create_db
    }

    fn can_create_role(&self) -> bool {
        self.0.can_create_role
    }

    fn can_login(&self) -> bool {
        self.0.can_login
    }

    fn valid_until(&self) -> Option<DateTime<Utc>> {
        self.0.valid_until
    }
}

#[derive(Debug)]
struct DeclaredTable {
    entry: TableEntry,
    columns: Vec<ColumnDef>,
}

impl From<TableEntry> for DeclaredTable {
    fn from(entry: TableEntry) -> Self {
        let columns = entry
            .columns
            .iter()
            .map(|c| ColumnDef {
                name: c.name.clone(),
                data_type: c.data_type.clone(),
                nullable: c.nullable,
                default_value: c.default.clone(),
                is_unique: c.unique,
                is_identity: c.identity,
            })
            .collect();
        Self { entry, columns }
    }
}

impl Declared for DeclaredTable {
    fn name(&self) -> &str {
        &self.entry.name
    }
}

impl Table for DeclaredTable {
    fn model_name(&self) -> &str {
        self.entry.model.as_deref().unwrap_or(&self.entry.name)
    }

    fn schema(&self) -> &str {
        &self.entry.schema
    }

    fn columns(&self) -> &[ColumnDef] {
        &self.columns
    }

    fn primary_keys(&self) -> &[String] {
        &self.entry.primary_keys
    }

    fn rls_enabled(&self) -> bool {
        self.entry.rls_enabled
    }

    fn rls_forced(&self) -> bool {
        self.entry.rls_forced
    }
}

#[derive(Debug)]
struct DeclaredPolicy(PolicyEntry);

impl Declared for DeclaredPolicy {
    fn name(&self) -> &str {
        &self.0.name
    }
}

impl Policy for DeclaredPolicy {
    fn schema(&self) -> &str {
        &self.0.schema
    }

    fn table(&self) -> &str {
        &self.0.table
    }

    fn command(&self) -> PolicyCommand {
        self.0.command
    }

    fn permissive(&self) -> bool {
        self.0.permissive
    }

    fn roles(&self) -> &[String] {
        &self.0.roles
    }

    fn using_expression(&self) -> Option<&str> {
        self.0.using.as_deref()
    }

    fn check_expression(&self) -> Option<&str> {
        self.0.check.as_deref()
    }
}

#[derive(Debug)]
struct DeclaredRpc {
    entry: RpcEntry,
    params: Vec<RpcParam>,
}

impl From<RpcEntry> for DeclaredRpc {
    fn from(entry: RpcEntry) -> Self {
        let params = entry
            .params
            .iter()
            .map(|p| RpcParam {
                name: p.name.clone(),
                data_type: p.data_type.clone(),
                mode: p.mode,
                has_default: p.has_default,
            })
            .collect();
        Self { entry, params }
    }
}

impl Declared for DeclaredRpc {
    fn name(&self) -> &str {
        &self.entry.name
    }
}

impl Rpc for DeclaredRpc {
    fn schema(&self) -> &str {
        &self.entry.schema
    }

    fn params(&self) -> &[RpcParam] {
        &self.params
    }

    fn return_type(&self) -> &str {
        &self.entry.return_type
    }

    fn language(&self) -> &str {
        &self.entry.language
    }

    fn definition(&self) -> &str {
        &self.entry.definition
    }

    fn behavior(&self) -> FunctionBehavior {
        self.entry.behavior
    }

    fn security_definer(&self) -> bool {
        self.entry.security_definer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reconcile::ResourceKind;

    const SAMPLE: &str = r#"
[[roles]]
name = "analyst"
can_login = true
valid_until = "2030-01-01T00:00:00Z"

[[tables]]
name = "posts"
model = "Post"
primary_keys = ["id"]
columns = [
    { name = "id", type = "bigint", nullable = false, identity = true },
    { name = "title", type = "text" },
]

[[tables]]
name = "authors"

[[policies]]
name = "read posts"
table = "posts"
command = "SELECT"
roles = ["authenticated"]
using = "true"

[[rpcs]]
name = "recent_posts"
return_type = "setof posts"
language = "sql"
behavior = "STABLE"
definition = "select * from posts limit p_limit"
params = [{ name = "p_limit", type = "integer" }]
"#;

    #[test]
    fn test_parse_sample() {
        let manifest = Manifest::parse(SAMPLE).unwrap();
        assert_eq!(manifest.roles.len(), 1);
        assert_eq!(manifest.roles[0].connection_limit, -1);
        assert!(manifest.roles[0].inherit_role);
        assert!(manifest.roles[0].valid_until.is_some());
        assert_eq!(manifest.tables[0].columns.len(), 2);
        assert!(!manifest.tables[0].columns[0].nullable);
        assert!(manifest.tables[0].columns[1].nullable);
        assert_eq!(manifest.policies[0].command, PolicyCommand::Select);
        assert_eq!(manifest.rpcs[0].behavior, FunctionBehavior::Stable);
        assert_eq!(manifest.rpcs[0].params[0].mode, ParamMode::In);
    }

    #[test]
    fn test_into_registry() {
        let registry = Manifest::parse(SAMPLE).unwrap().into_registry().unwrap();
        assert_eq!(registry.count(ResourceKind::Role), 1);
        assert_eq!(registry.count(ResourceKind::Table), 2);
        assert_eq!(registry.count(ResourceKind::Policy), 1);
        assert_eq!(registry.count(ResourceKind::Function), 1);

        let posts = registry.find_model("Post").unwrap();
        assert_eq!(posts.name(), "posts");
        assert_eq!(posts.primary_keys(), ["id".to_string()]);
        assert!(registry.find_model("authors").is_some());

        let rpc = &registry.rpcs()[0];
        assert_eq!(rpc.language(), "sql");
        assert_eq!(rpc.params()[0].data_type, "integer");
    }

    #[test]
    fn test_rejects_using_on_insert_policy() {
        let err = Manifest::parse(
            r#"
[[policies]]
name = "insert posts"
table = "posts"
command = "INSERT"
using = "true"
"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("USING"));
    }

    #[test]
    fn test_rejects_unknown_primary_key() {
        let err = Manifest::parse(
            r#"
[[tables]]
name = "posts"
primary_keys = ["id"]
"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("primary key"));
    }

    #[test]
    fn test_rejects_unknown_fields() {
        assert!(Manifest::parse("[[roles]]\nname = \"a\"\nsuperuser = true\n").is_err());
    }

    #[test]
    fn test_duplicate_models_fail_registry() {
        let manifest = Manifest::parse(
            r#"
[[tables]]
name = "posts"
model = "Post"

[[tables]]
name = "old_posts"
model = "Post"
"#,
        )
        .unwrap();
        assert!(manifest.into_registry().is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("resources.toml");
        fs::write(&path, SAMPLE).unwrap();
        let registry = load_registry(&path).unwrap();
        assert_eq!(registry.len(), 5);

        assert!(load_registry(&dir.path().join("missing.toml")).is_err());
    }
}
