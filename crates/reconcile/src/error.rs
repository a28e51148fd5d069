//! Error types for reconciliation.
//!
//! Errors fall into two categories. Data errors come from malformed inputs
//! (duplicate declared names, observed records without an identity) and abort
//! reconciliation of a single resource kind. Configuration errors come from
//! defects in the application's static declarations (invalid relation paths,
//! unregistered names) and are meant to stop the process.

use crate::types::ResourceKind;
use thiserror::Error;

/// Categories of reconciliation errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Malformed declared or observed input for one resource kind
    Data,
    /// Defect in the static resource declarations
    Configuration,
}

impl ErrorCategory {
    /// Whether errors of this category should halt the process.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Configuration)
    }

    /// Get a user-friendly description of this error category.
    pub fn description(&self) -> &'static str {
        match self {
            Self::Data => "Invalid resource data",
            Self::Configuration => "Invalid resource configuration",
        }
    }
}

/// Misconfiguration detected while resolving relation paths.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    /// The relation path is empty
    #[error("relation path is empty")]
    EmptyRelationPath,

    /// The relation path contains an empty segment (e.g. `a..b`)
    #[error("invalid relation path: {path}")]
    InvalidRelationPath {
        /// The offending path
        path: String,
    },

    /// More than the supported number of nested relations
    #[error("unsupported nested relations more than {max} levels: {path}")]
    RelationTooDeep {
        /// The offending path
        path: String,
        /// Maximum supported depth
        max: usize,
    },

    /// A path segment does not name a registered resource
    #[error("invalid model name: {name}")]
    UnregisteredResource {
        /// The unknown name
        name: String,
    },
}

/// Errors that can occur during reconciliation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// Two declared resources of the same kind share an identity
    #[error("duplicate declared {kind} name: {name}")]
    DuplicateName {
        /// Resource kind being reconciled
        kind: ResourceKind,
        /// The duplicated identity
        name: String,
    },

    /// An observed record cannot be matched reliably
    #[error("malformed observed {kind} record: {message}")]
    MalformedRecord {
        /// Resource kind being reconciled
        kind: ResourceKind,
        /// What is wrong with the record
        message: String,
    },

    /// Static declarations are inconsistent
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
}

impl Error {
    /// Get the error category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::DuplicateName { .. } | Error::MalformedRecord { .. } => ErrorCategory::Data,
            Error::Configuration(_) => ErrorCategory::Configuration,
        }
    }

    /// Whether this error should halt the process.
    pub fn is_fatal(&self) -> bool {
        self.category().is_fatal()
    }
}

/// Result type for reconciliation operations.
pub type Result<T> = std::result::Result<T, Error>;
