//! Core types shared by declared resources and wire objects

use serde::{Deserialize, Serialize};
use std::fmt;

/// The resource kinds managed by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Role,
    Table,
    Policy,
    Function,
}

impl ResourceKind {
    /// All kinds, in create/update application order.
    pub const ALL: [ResourceKind; 4] = [Self::Role, Self::Table, Self::Function, Self::Policy];

    /// Singular name, used in messages
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Role => "role",
            Self::Table => "table",
            Self::Policy => "policy",
            Self::Function => "function",
        }
    }

    /// Plural name, used for endpoints and target filters
    pub fn plural(&self) -> &'static str {
        match self {
            Self::Role => "roles",
            Self::Table => "tables",
            Self::Policy => "policies",
            Self::Function => "functions",
        }
    }

    /// Parse a kind from a target filter, accepting common aliases.
    pub fn from_target(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "role" | "roles" => Some(Self::Role),
            "table" | "tables" | "models" => Some(Self::Table),
            "policy" | "policies" | "rls" => Some(Self::Policy),
            "function" | "functions" | "rpc" => Some(Self::Function),
            _ => None,
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Command a row-level-security policy applies to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PolicyCommand {
    #[default]
    All,
    Select,
    Insert,
    Update,
    Delete,
}

impl PolicyCommand {
    /// Whether the policy takes a `WITH CHECK` expression
    pub fn accepts_check(&self) -> bool {
        matches!(self, Self::All | Self::Insert | Self::Update)
    }

    /// Whether the policy takes a `USING` expression
    pub fn accepts_using(&self) -> bool {
        !matches!(self, Self::Insert)
    }
}

/// Whether a policy is combined with OR (permissive) or AND (restrictive).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PolicyAction {
    #[default]
    Permissive,
    Restrictive,
}

/// Volatility of a function.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FunctionBehavior {
    Immutable,
    Stable,
    #[default]
    Volatile,
}

/// Mode of a function argument.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamMode {
    #[default]
    In,
    Out,
    Inout,
    Variadic,
    Table,
}
