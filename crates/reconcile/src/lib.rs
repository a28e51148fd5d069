//! # Reconcile
//!
//! Reconciliation engine for declared database resources.
//!
//! Given the resources an application declares (roles, tables, row-level
//! security policies and remote-procedure functions) and the state a remote
//! managed-database platform reports, this crate computes which resources to
//! create, update and delete, while keeping platform-owned records out of
//! the delete set. It also resolves relation paths between registered models
//! into nested embed expressions for read queries.
//!
//! The crate performs no I/O. Fetching observed state and applying plans is
//! left to the caller.
//!
//! ## Core Concepts
//!
//! - **Declared resource**: a value implementing [`Role`], [`Table`],
//!   [`Policy`] or [`Rpc`]
//! - **Observed record**: a wire object from [`objects`] wrapped with its
//!   native flag ([`RoleState`], [`TableState`], ...)
//! - **Identity**: the key declared and observed resources match on. Roles
//!   use their name, tables `schema.name`, policies `schema.table.name` and
//!   functions `schema.name(arguments)` so overloads stay distinct
//! - **ExtractResult**: the three-way partition of one kind
//! - **Plan**: create/update/delete operations for all kinds
//!
//! ## Example
//!
//! ```ignore
//! use reconcile::{extract_roles, Declared, Role, RoleState};
//! use std::sync::Arc;
//!
//! #[derive(Debug)]
//! struct Analyst;
//!
//! impl Declared for Analyst {
//!     fn name(&self) -> &str { "analyst" }
//! }
//!
//! impl Role for Analyst {
//!     fn can_login(&self) -> bool { true }
//! }
//!
//! let declared: Vec<Arc<dyn Role>> = vec![Arc::new(Analyst)];
//! let result = extract_roles(&observed, &declared, false)?;
//! for role in &result.delete {
//!     println!("would drop {}", role.role.name);
//! }
//! ```

pub mod bind;
pub mod error;
pub mod extract;
pub mod kind;
pub mod model;
pub mod objects;
pub mod plan;
pub mod protection;
pub mod query;
pub mod registry;
pub mod relation;
pub mod types;

// Re-export main types at crate root
pub use bind::{
    bind_function, bind_new, bind_policy, bind_role, bind_table, build_from_observed,
    build_function_from_observed, build_policy_from_observed, build_role_from_observed,
    build_table_from_observed, identity_arguments,
};
pub use error::{ConfigurationError, Error, ErrorCategory, Result};
pub use extract::{
    ExtractPolicyResult, ExtractResult, ExtractRoleResult, ExtractRpcResult, ExtractTableResult,
    extract, extract_policies, extract_roles, extract_rpcs, extract_tables,
};
pub use kind::Kind;
pub use model::{
    ColumnDef, Declared, FunctionState, Observed, Policy, PolicyState, Role, RoleState, Rpc,
    RpcParam, Table, TableState, function_identity, policy_identity, qualified_name,
};
pub use plan::{
    KindFailure, KindPlan, ObservedState, Operation, Plan, PlanSummary, plan_functions, plan_kind,
    plan_policies, plan_roles, plan_tables,
};
pub use protection::{NativeCatalog, is_protected};
pub use query::{Operator, Query};
pub use registry::{RegistryBuilder, ResourceRegistry};
pub use relation::resolve;
pub use types::{FunctionBehavior, ParamMode, PolicyAction, PolicyCommand, ResourceKind};
