//! Native-protection policy
//!
//! Platform-owned records (built-in roles, system schemas) must never be
//! deleted by a reconciliation run unless the caller opts in explicitly.

use crate::model::Observed;
use serde::{Deserialize, Serialize};

/// Roles created by the platform itself.
pub const DEFAULT_NATIVE_ROLES: &[&str] = &[
    "anon",
    "authenticated",
    "authenticator",
    "dashboard_user",
    "pgbouncer",
    "pgsodium_keyholder",
    "pgsodium_keyiduser",
    "pgsodium_keymaker",
    "postgres",
    "service_role",
    "supabase_admin",
    "supabase_auth_admin",
    "supabase_functions_admin",
    "supabase_read_only_user",
    "supabase_realtime_admin",
    "supabase_replication_admin",
    "supabase_storage_admin",
];

/// Schemas managed by the platform.
pub const DEFAULT_NATIVE_SCHEMAS: &[&str] = &[
    "auth",
    "extensions",
    "graphql",
    "graphql_public",
    "information_schema",
    "net",
    "pg_catalog",
    "pgbouncer",
    "pgsodium",
    "pgsodium_masks",
    "realtime",
    "storage",
    "supabase_functions",
    "supabase_migrations",
    "vault",
];

/// Whether an observed record must be left out of the delete set.
pub fn is_protected<O: Observed + ?Sized>(record: &O, include_native_in_delete: bool) -> bool {
    record.is_native() && !include_native_in_delete
}

/// Catalog of platform-owned names, used by fetch layers to flag records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeCatalog {
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default)]
    pub schemas: Vec<String>,
}

impl Default for NativeCatalog {
    fn default() -> Self {
        Self {
            roles: DEFAULT_NATIVE_ROLES.iter().map(|s| (*s).to_string()).collect(),
            schemas: DEFAULT_NATIVE_SCHEMAS
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
        }
    }
}

impl NativeCatalog {
    /// A catalog with no native records at all
    pub fn empty() -> Self {
        Self {
            roles: Vec::new(),
            schemas: Vec::new(),
        }
    }

    /// Add extra names on top of this catalog
    pub fn extend(&mut self, roles: &[String], schemas: &[String]) {
        for role in roles {
            if !self.roles.contains(role) {
                self.roles.push(role.clone());
            }
        }
        for schema in schemas {
            if !self.schemas.contains(schema) {
                self.schemas.push(schema.clone());
            }
        }
    }

    /// Built-in roles, including Postgres' own `pg_*` roles
    pub fn is_native_role(&self, name: &str) -> bool {
        name.starts_with("pg_") || self.roles.iter().any(|r| r == name)
    }

    /// Tables, policies and functions living in a platform schema
    pub fn is_native_schema(&self, schema: &str) -> bool {
        self.schemas.iter().any(|s| s == schema)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::RoleState;
    use crate::objects;

    fn role(name: &str, is_native: bool) -> RoleState {
        RoleState {
            role: objects::Role {
                name: name.to_string(),
                ..Default::default()
            },
            is_native,
        }
    }

    #[test]
    fn test_is_protected() {
        assert!(is_protected(&role("postgres", true), false));
        assert!(!is_protected(&role("postgres", true), true));
        assert!(!is_protected(&role("analyst", false), false));
        assert!(!is_protected(&role("analyst", false), true));
    }

    #[test]
    fn test_catalog_defaults() {
        let catalog = NativeCatalog::default();
        assert!(catalog.is_native_role("service_role"));
        assert!(catalog.is_native_role("pg_read_all_data"));
        assert!(!catalog.is_native_role("analyst"));
        assert!(catalog.is_native_schema("auth"));
        assert!(!catalog.is_native_schema("public"));
    }

    #[test]
    fn test_catalog_extend_skips_duplicates() {
        let mut catalog = NativeCatalog::empty();
        catalog.extend(&["ops".to_string(), "ops".to_string()], &["audit".to_string()]);
        assert_eq!(catalog.roles, vec!["ops".to_string()]);
        assert!(catalog.is_native_schema("audit"));
        assert!(!catalog.is_native_role("postgres"));
    }
}
