//! Wire objects exchanged with the remote metadata API
//!
//! These mirror the JSON shapes served by pg-meta. They are used both as
//! observed state (what the platform reports) and as request payloads for
//! create/update calls.

use crate::types::{FunctionBehavior, ParamMode, PolicyAction, PolicyCommand};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A database role.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    #[serde(default)]
    pub id: i64,
    pub name: String,
    #[serde(default = "unlimited_connections")]
    pub connection_limit: i32,
    #[serde(default)]
    pub inherit_role: bool,
    #[serde(default)]
    pub is_replication_role: bool,
    #[serde(default)]
    pub is_superuser: bool,
    #[serde(default)]
    pub can_bypass_rls: bool,
    #[serde(default)]
    pub can_create_db: bool,
    #[serde(default)]
    pub can_create_role: bool,
    #[serde(default)]
    pub can_login: bool,
    #[serde(default, with = "supabase_time")]
    pub valid_until: Option<DateTime<Utc>>,
}

fn unlimited_connections() -> i32 {
    -1
}

/// A table column.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    /// `"{table_id}.{ordinal_position}"`, assigned by the server
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub table_id: i64,
    #[serde(default)]
    pub schema: String,
    #[serde(default)]
    pub table: String,
    #[serde(default)]
    pub ordinal_position: i32,
    pub name: String,
    pub data_type: String,
    #[serde(default)]
    pub format: String,
    #[serde(default)]
    pub default_value: Option<String>,
    #[serde(default)]
    pub is_identity: bool,
    #[serde(default = "default_true")]
    pub is_nullable: bool,
    #[serde(default)]
    pub is_unique: bool,
}

fn default_true() -> bool {
    true
}

/// A primary key column reference.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrimaryKey {
    pub schema: String,
    pub table_name: String,
    pub name: String,
    #[serde(default)]
    pub table_id: i64,
}

/// A table with its columns.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    #[serde(default)]
    pub id: i64,
    pub schema: String,
    pub name: String,
    #[serde(default)]
    pub rls_enabled: bool,
    #[serde(default)]
    pub rls_forced: bool,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub primary_keys: Vec<PrimaryKey>,
    #[serde(default)]
    pub columns: Vec<Column>,
}

/// A row-level-security policy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Policy {
    #[serde(default)]
    pub id: i64,
    pub schema: String,
    pub table: String,
    #[serde(default)]
    pub table_id: i64,
    pub name: String,
    #[serde(default)]
    pub action: PolicyAction,
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default)]
    pub command: PolicyCommand,
    /// `USING` expression
    #[serde(default)]
    pub definition: Option<String>,
    /// `WITH CHECK` expression
    #[serde(default)]
    pub check: Option<String>,
}

/// A function argument as reported by the server.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionArg {
    #[serde(default)]
    pub mode: ParamMode,
    pub name: String,
    #[serde(default)]
    pub type_id: i64,
    #[serde(default)]
    pub has_default: bool,
}

/// A remote-procedure function.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Function {
    #[serde(default)]
    pub id: i64,
    pub schema: String,
    pub name: String,
    #[serde(default)]
    pub language: String,
    #[serde(default)]
    pub definition: String,
    #[serde(default)]
    pub args: Vec<FunctionArg>,
    /// Rendered argument list, e.g. `"p_id uuid, p_limit integer"`
    #[serde(default)]
    pub argument_types: String,
    /// Rendered input arguments only
    #[serde(default)]
    pub identity_argument_types: String,
    #[serde(default)]
    pub return_type: String,
    #[serde(default)]
    pub behavior: FunctionBehavior,
    #[serde(default)]
    pub security_definer: bool,
}

/// Timestamps as served by the platform.
///
/// Accepts RFC 3339 as well as the Postgres text form
/// (`2024-01-31 10:00:00+00`); `infinity` reads as no expiry.
pub mod supabase_time {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    const PG_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f%#z", "%Y-%m-%d %H:%M:%S%#z"];

    pub fn serialize<S>(value: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(ts) => serializer.serialize_str(&ts.to_rfc3339()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        match raw {
            None => Ok(None),
            Some(s) => parse(&s).map_err(serde::de::Error::custom),
        }
    }

    /// Parse a platform timestamp.
    pub fn parse(s: &str) -> Result<Option<DateTime<Utc>>, String> {
        let s = s.trim();
        if s.is_empty() || s.eq_ignore_ascii_case("infinity") {
            return Ok(None);
        }
        if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
            return Ok(Some(ts.with_timezone(&Utc)));
        }
        for format in PG_FORMATS {
            if let Ok(ts) = DateTime::parse_from_str(s, format) {
                return Ok(Some(ts.with_timezone(&Utc)));
            }
        }
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
            .map(|naive| Some(naive.and_utc()))
            .map_err(|e| format!("invalid timestamp {s:?}: {e}"))
    }
}
