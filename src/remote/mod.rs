//! Remote platform access
//!
//! [`RemoteApi`] abstracts the metadata endpoints of the managed platform:
//! listing roles, tables, policies and functions, and applying single
//! create/update/delete requests. [`pg_meta::PgMetaClient`] talks HTTP;
//! tests use the in-memory `mock::MockRemote`.

pub mod pg_meta;

#[cfg(test)]
pub mod mock;

use reconcile::objects;
use reconcile::{
    FunctionState, NativeCatalog, ObservedState, PolicyState, ResourceKind, RoleState,
    TableState,
};
use serde_json::Value;
use std::fmt;
use thiserror::Error;

/// Errors from the remote platform
#[derive(Debug, Error)]
pub enum RemoteError {
    /// The server answered with an error status
    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },

    /// The request never completed
    #[error("request to {url} failed: {message}")]
    Transport { url: String, message: String },

    /// The response body could not be decoded
    #[error("invalid response from {url}: {message}")]
    InvalidResponse { url: String, message: String },

    /// An update or delete targets a record without a server id
    #[error("{kind} {name} has no server id")]
    MissingId { kind: ResourceKind, name: String },
}

impl RemoteError {
    pub(crate) fn from_ureq(url: &str, err: ureq::Error) -> Self {
        match err {
            ureq::Error::StatusCode(status) => Self::Status {
                status,
                url: url.to_string(),
            },
            ureq::Error::Json(e) => Self::InvalidResponse {
                url: url.to_string(),
                message: e.to_string(),
            },
            other => Self::Transport {
                url: url.to_string(),
                message: other.to_string(),
            },
        }
    }

    /// HTTP status, when the server answered
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// HTTP verb of a change request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Post,
    Patch,
    Delete,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Post => "POST",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        })
    }
}

/// A single change against the metadata API
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub method: Method,
    pub kind: ResourceKind,
    /// Resource identity, for display
    pub name: String,
    /// Server id of the target, for PATCH and DELETE
    pub id: Option<i64>,
    pub body: Option<Value>,
}

impl Request {
    /// Endpoint path below the metadata base URL
    pub fn path(&self) -> String {
        match self.id {
            Some(id) => format!("/{}/{id}", self.kind.plural()),
            None => format!("/{}", self.kind.plural()),
        }
    }
}

/// Metadata endpoints of the remote platform
pub trait RemoteApi: Send + Sync {
    fn fetch_roles(&self) -> Result<Vec<objects::Role>, RemoteError>;

    fn fetch_tables(&self) -> Result<Vec<objects::Table>, RemoteError>;

    fn fetch_policies(&self) -> Result<Vec<objects::Policy>, RemoteError>;

    fn fetch_functions(&self) -> Result<Vec<objects::Function>, RemoteError>;

    /// Apply one change request
    fn apply(&self, request: &Request) -> Result<(), RemoteError>;
}

/// Fetch every kind concurrently and flag platform-owned records
///
/// Tables, policies and functions outside `schemas` are not under
/// management and are dropped.
pub fn fetch_observed(
    api: &dyn RemoteApi,
    catalog: &NativeCatalog,
    schemas: &[String],
) -> Result<ObservedState, RemoteError> {
    let ((roles, tables), (policies, functions)) = rayon::join(
        || rayon::join(|| api.fetch_roles(), || api.fetch_tables()),
        || rayon::join(|| api.fetch_policies(), || api.fetch_functions()),
    );

    let managed = |schema: &str| schemas.iter().any(|s| s == schema);

    let observed = ObservedState {
        roles: roles?
            .into_iter()
            .map(|role| RoleState {
                is_native: catalog.is_native_role(&role.name),
                role,
            })
            .collect(),
        tables: tables?
            .into_iter()
            .filter(|t| managed(&t.schema))
            .map(|table| TableState {
                is_native: catalog.is_native_schema(&table.schema),
                table,
            })
            .collect(),
        policies: policies?
            .into_iter()
            .filter(|p| managed(&p.schema))
            .map(|policy| PolicyState {
                is_native: catalog.is_native_schema(&policy.schema),
                policy,
            })
            .collect(),
        functions: functions?
            .into_iter()
            .filter(|f| managed(&f.schema))
            .map(|function| FunctionState {
                is_native: catalog.is_native_schema(&function.schema),
                function,
            })
            .collect(),
    };

    log::debug!(
        "observed {} roles, {} tables, {} policies, {} functions",
        observed.roles.len(),
        observed.tables.len(),
        observed.policies.len(),
        observed.functions.len()
    );

    Ok(observed)
}
