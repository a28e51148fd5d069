//! Extraction: partition declared and observed resources
//!
//! Every observed record and every declared resource of one kind lands in
//! exactly one of `existing`, `new` or `delete`, except native records that
//! are protected from deletion.

use crate::error::{Error, Result};
use crate::kind::{Functions, Kind, Policies, Roles, Tables};
use crate::model::{self, FunctionState, Observed, PolicyState, RoleState, TableState};
use crate::protection::is_protected;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

/// Three-way partition of one resource kind
pub struct ExtractResult<O, D: ?Sized> {
    /// Observed records with a matching declaration
    pub existing: Vec<O>,
    /// Declarations with no observed record
    pub new: Vec<Arc<D>>,
    /// Observed records with no declaration
    pub delete: Vec<O>,
    /// Native records kept out of `delete`
    pub protected: Vec<O>,
}

pub type ExtractRoleResult = ExtractResult<RoleState, dyn model::Role>;
pub type ExtractTableResult = ExtractResult<TableState, dyn model::Table>;
pub type ExtractPolicyResult = ExtractResult<PolicyState, dyn model::Policy>;
pub type ExtractRpcResult = ExtractResult<FunctionState, dyn model::Rpc>;

impl<O, D: ?Sized> ExtractResult<O, D> {
    /// Whether nothing needs to be created, kept or deleted
    pub fn is_empty(&self) -> bool {
        self.existing.is_empty() && self.new.is_empty() && self.delete.is_empty()
    }
}

impl<O: Observed, D: ?Sized> ExtractResult<O, D> {
    /// Records scheduled for deletion, keyed by identity
    pub fn delete_map(&self) -> HashMap<String, &O> {
        self.delete
            .iter()
            .map(|r| (r.identity().into_owned(), r))
            .collect()
    }

    /// How many of `records` are scheduled for deletion
    pub fn count_scheduled_deletes(&self, records: &[O]) -> usize {
        let scheduled = self.delete_map();
        records
            .iter()
            .filter(|r| scheduled.contains_key(r.identity().as_ref()))
            .count()
    }
}

impl<O: Clone, D: ?Sized> Clone for ExtractResult<O, D> {
    fn clone(&self) -> Self {
        Self {
            existing: self.existing.clone(),
            new: self.new.clone(),
            delete: self.delete.clone(),
            protected: self.protected.clone(),
        }
    }
}

impl<O: fmt::Debug, D: fmt::Debug + ?Sized> fmt::Debug for ExtractResult<O, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractResult")
            .field("existing", &self.existing)
            .field("new", &self.new)
            .field("delete", &self.delete)
            .field("protected", &self.protected)
            .finish()
    }
}

/// Partition observed records against declared resources of kind `K`
///
/// `existing`, `delete` and `protected` keep the order of `observed`; `new`
/// keeps the order of `declared`.
pub fn extract<K: Kind>(
    observed: &[K::Observed],
    declared: &[Arc<K::Declared>],
    include_native_in_delete: bool,
) -> Result<ExtractResult<K::Observed, K::Declared>> {
    let mut declared_names: HashSet<String> = HashSet::with_capacity(declared.len());
    for resource in declared {
        let name = K::declared_identity(resource).into_owned();
        if !declared_names.insert(name.clone()) {
            return Err(Error::DuplicateName {
                kind: K::KIND,
                name,
            });
        }
    }

    let mut observed_names: HashSet<String> = HashSet::with_capacity(observed.len());
    for record in observed {
        if record.name().is_empty() {
            return Err(Error::MalformedRecord {
                kind: K::KIND,
                message: "record has no name".to_string(),
            });
        }
        let name = record.identity();
        if !observed_names.insert(name.clone().into_owned()) {
            return Err(Error::MalformedRecord {
                kind: K::KIND,
                message: format!("{name} is reported more than once"),
            });
        }
    }

    let mut result = ExtractResult {
        existing: Vec::new(),
        new: Vec::new(),
        delete: Vec::new(),
        protected: Vec::new(),
    };

    for record in observed {
        if declared_names.contains(record.identity().as_ref()) {
            result.existing.push(record.clone());
        } else if is_protected(record, include_native_in_delete) {
            result.protected.push(record.clone());
        } else {
            result.delete.push(record.clone());
        }
    }

    for resource in declared {
        if !observed_names.contains(K::declared_identity(resource).as_ref()) {
            result.new.push(Arc::clone(resource));
        }
    }

    log::debug!(
        "extracted {}: {} existing, {} new, {} delete, {} protected",
        K::KIND.plural(),
        result.existing.len(),
        result.new.len(),
        result.delete.len(),
        result.protected.len()
    );

    Ok(result)
}

pub fn extract_roles(
    observed: &[RoleState],
    declared: &[Arc<dyn model::Role>],
    include_native_in_delete: bool,
) -> Result<ExtractRoleResult> {
    extract::<Roles>(observed, declared, include_native_in_delete)
}

pub fn extract_tables(
    observed: &[TableState],
    declared: &[Arc<dyn model::Table>],
    include_native_in_delete: bool,
) -> Result<ExtractTableResult> {
    extract::<Tables>(observed, declared, include_native_in_delete)
}

pub fn extract_policies(
    observed: &[PolicyState],
    declared: &[Arc<dyn model::Policy>],
    include_native_in_delete: bool,
) -> Result<ExtractPolicyResult> {
    extract::<Policies>(observed, declared, include_native_in_delete)
}

pub fn extract_rpcs(
    observed: &[FunctionState],
    declared: &[Arc<dyn model::Rpc>],
    include_native_in_delete: bool,
) -> Result<ExtractRpcResult> {
    extract::<Functions>(observed, declared, include_native_in_delete)
}
