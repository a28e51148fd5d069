//! Resource model: declared capability traits and observed state records
//!
//! A declared resource is authored by the application and exposes a fixed
//! capability set per kind. An observed record is the remote platform's
//! current representation, plus a flag marking platform-owned instances.

use crate::objects;
use crate::types::{FunctionBehavior, ParamMode, PolicyCommand};
use chrono::{DateTime, Utc};
use std::borrow::Cow;
use std::fmt;

/// Identity shared by every declared resource
pub trait Declared: Send + Sync + fmt::Debug {
    /// Resource name
    fn name(&self) -> &str;
}

/// Capability set of a declared database role
pub trait Role: Declared {
    /// Maximum concurrent connections, `-1` for unlimited
    fn connection_limit(&self) -> i32 {
        -1
    }

    fn inherit_role(&self) -> bool {
        true
    }

    fn is_replication_role(&self) -> bool {
        false
    }

    fn can_bypass_rls(&self) -> bool {
        false
    }

    fn can_create_db(&self) -> bool {
        false
    }

    fn can_create_role(&self) -> bool {
        false
    }

    fn can_login(&self) -> bool {
        false
    }

    fn valid_until(&self) -> Option<DateTime<Utc>> {
        None
    }
}

/// A column declaration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDef {
    pub name: String,
    pub data_type: String,
    pub nullable: bool,
    pub default_value: Option<String>,
    pub is_unique: bool,
    pub is_identity: bool,
}

impl ColumnDef {
    /// A nullable column with no default
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            nullable: true,
            default_value: None,
            is_unique: false,
            is_identity: false,
        }
    }
}

/// Capability set of a declared table
pub trait Table: Declared {
    /// Name the table is registered under for relation lookups
    fn model_name(&self) -> &str {
        self.name()
    }

    fn schema(&self) -> &str {
        "public"
    }

    fn columns(&self) -> &[ColumnDef];

    fn primary_keys(&self) -> &[String] {
        &[]
    }

    fn rls_enabled(&self) -> bool {
        true
    }

    fn rls_forced(&self) -> bool {
        false
    }
}

/// Capability set of a declared row-level-security policy
pub trait Policy: Declared {
    fn schema(&self) -> &str {
        "public"
    }

    /// Table the policy is attached to
    fn table(&self) -> &str;

    fn command(&self) -> PolicyCommand;

    fn permissive(&self) -> bool {
        true
    }

    fn roles(&self) -> &[String];

    fn using_expression(&self) -> Option<&str> {
        None
    }

    fn check_expression(&self) -> Option<&str> {
        None
    }
}

/// A function parameter declaration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RpcParam {
    pub name: String,
    pub data_type: String,
    pub mode: ParamMode,
    pub has_default: bool,
}

impl RpcParam {
    /// An input parameter without default
    pub fn input(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            mode: ParamMode::In,
            has_default: false,
        }
    }
}

/// Capability set of a declared remote-procedure function
pub trait Rpc: Declared {
    fn schema(&self) -> &str {
        "public"
    }

    fn params(&self) -> &[RpcParam];

    fn return_type(&self) -> &str;

    fn language(&self) -> &str {
        "plpgsql"
    }

    /// Function body
    fn definition(&self) -> &str;

    fn behavior(&self) -> FunctionBehavior {
        FunctionBehavior::Volatile
    }

    fn security_definer(&self) -> bool {
        false
    }
}

/// Identity and ownership of an observed record
pub trait Observed {
    /// Bare name as reported by the platform
    fn name(&self) -> &str;

    /// Matching key against declared resources
    fn identity(&self) -> Cow<'_, str>;

    /// Whether the platform itself owns this record
    fn is_native(&self) -> bool {
        false
    }
}

/// Observed role
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleState {
    pub role: objects::Role,
    pub is_native: bool,
}

impl Observed for RoleState {
    fn name(&self) -> &str {
        &self.role.name
    }

    fn identity(&self) -> Cow<'_, str> {
        Cow::Borrowed(&self.role.name)
    }

    fn is_native(&self) -> bool {
        self.is_native
    }
}

/// Observed table
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableState {
    pub table: objects::Table,
    pub is_native: bool,
}

impl Observed for TableState {
    fn name(&self) -> &str {
        &self.table.name
    }

    fn identity(&self) -> Cow<'_, str> {
        Cow::Owned(qualified_name(&self.table.schema, &self.table.name))
    }

    fn is_native(&self) -> bool {
        self.is_native
    }
}

/// Observed policy
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PolicyState {
    pub policy: objects::Policy,
    pub is_native: bool,
}

impl Observed for PolicyState {
    fn name(&self) -> &str {
        &self.policy.name
    }

    fn identity(&self) -> Cow<'_, str> {
        Cow::Owned(policy_identity(
            &self.policy.schema,
            &self.policy.table,
            &self.policy.name,
        ))
    }

    fn is_native(&self) -> bool {
        self.is_native
    }
}

/// Observed function
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FunctionState {
    pub function: objects::Function,
    pub is_native: bool,
}

impl Observed for FunctionState {
    fn name(&self) -> &str {
        &self.function.name
    }

    fn identity(&self) -> Cow<'_, str> {
        Cow::Owned(function_identity(
            &self.function.schema,
            &self.function.name,
            &self.function.identity_argument_types,
        ))
    }

    fn is_native(&self) -> bool {
        self.is_native
    }
}

/// `schema.name`, the identity of a table
pub fn qualified_name(schema: &str, name: &str) -> String {
    format!("{schema}.{name}")
}

/// Policy names are unique per table only
pub fn policy_identity(schema: &str, table: &str, name: &str) -> String {
    format!("{schema}.{table}.{name}")
}

/// Functions are keyed by signature, so overloads stay distinct
///
/// `arguments` is the identity argument list as Postgres prints it, e.g.
/// `q text, lim integer`.
pub fn function_identity(schema: &str, name: &str, arguments: &str) -> String {
    format!("{schema}.{name}({arguments})")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct ReadPosts;

    impl Declared for ReadPosts {
        fn name(&self) -> &str {
            "read"
        }
    }

    impl Policy for ReadPosts {
        fn table(&self) -> &str {
            "posts"
        }

        fn command(&self) -> PolicyCommand {
            PolicyCommand::Select
        }

        fn roles(&self) -> &[String] {
            &[]
        }
    }

    #[test]
    fn test_policy_identity_is_table_scoped() {
        let observed = PolicyState {
            policy: objects::Policy {
                schema: "public".into(),
                table: "posts".into(),
                name: "read".into(),
                ..Default::default()
            },
            is_native: false,
        };
        let declared = ReadPosts;
        assert_eq!(
            observed.identity(),
            policy_identity(declared.schema(), declared.table(), declared.name())
        );
        assert_eq!(observed.identity(), "public.posts.read");
    }

    #[test]
    fn test_table_identity_includes_schema() {
        let table = |schema: &str| TableState {
            table: objects::Table {
                schema: schema.into(),
                name: "users".into(),
                ..Default::default()
            },
            is_native: false,
        };
        assert_eq!(table("public").identity(), "public.users");
        assert_ne!(table("public").identity(), table("app").identity());
    }

    #[test]
    fn test_function_overloads_have_distinct_identities() {
        let function = |args: &str| FunctionState {
            function: objects::Function {
                schema: "public".into(),
                name: "search".into(),
                identity_argument_types: args.into(),
                ..Default::default()
            },
            is_native: false,
        };
        assert_eq!(function("q text").identity(), "public.search(q text)");
        assert_eq!(
            function("q text, lim integer").identity(),
            "public.search(q text, lim integer)"
        );
        assert_eq!(function("").identity(), "public.search()");
    }

    #[test]
    fn test_observed_native_flag() {
        let state = RoleState {
            role: objects::Role {
                name: "postgres".into(),
                ..Default::default()
            },
            is_native: true,
        };
        assert!(state.is_native());
        assert_eq!(state.identity(), "postgres");
    }
}
