//! Planner - turns extraction results into create/update/delete operations

use crate::bind::{bind_new, build_from_observed};
use crate::error::{Error, Result};
use crate::extract::extract;
use crate::kind::{Functions, Kind, Policies, Roles, Tables};
use crate::model::{FunctionState, Observed, PolicyState, RoleState, TableState};
use crate::objects;
use crate::registry::ResourceRegistry;
use crate::types::ResourceKind;
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

/// A single change to apply remotely
#[derive(Debug, Clone, PartialEq)]
pub enum Operation<P> {
    /// Resource is declared but absent
    Create { name: String, payload: P },
    /// Resource exists but differs from its declaration
    Update {
        name: String,
        current: P,
        desired: P,
        /// Top-level payload fields that differ
        changes: Vec<String>,
    },
    /// Resource exists but is no longer declared
    Delete { name: String, payload: P },
}

impl<P> Operation<P> {
    /// Identity of the affected resource
    pub fn name(&self) -> &str {
        match self {
            Self::Create { name, .. } | Self::Update { name, .. } | Self::Delete { name, .. } => {
                name
            }
        }
    }

    pub fn is_create(&self) -> bool {
        matches!(self, Self::Create { .. })
    }

    pub fn is_update(&self) -> bool {
        matches!(self, Self::Update { .. })
    }

    pub fn is_delete(&self) -> bool {
        matches!(self, Self::Delete { .. })
    }

    /// Verb used in plan output
    pub fn verb(&self) -> &'static str {
        match self {
            Self::Create { .. } => "create",
            Self::Update { .. } => "update",
            Self::Delete { .. } => "delete",
        }
    }
}

/// Planned operations for one resource kind
#[derive(Debug, Clone, PartialEq)]
pub struct KindPlan<P> {
    pub kind: ResourceKind,
    pub operations: Vec<Operation<P>>,
    /// Declared resources already in sync
    pub unchanged: Vec<String>,
    /// Native records left alone
    pub protected: Vec<String>,
}

impl<P> KindPlan<P> {
    pub fn empty(kind: ResourceKind) -> Self {
        Self {
            kind,
            operations: Vec::new(),
            unchanged: Vec::new(),
            protected: Vec::new(),
        }
    }

    /// Whether there is nothing to apply
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    pub fn creates(&self) -> impl Iterator<Item = &Operation<P>> {
        self.operations.iter().filter(|op| op.is_create())
    }

    pub fn updates(&self) -> impl Iterator<Item = &Operation<P>> {
        self.operations.iter().filter(|op| op.is_update())
    }

    pub fn deletes(&self) -> impl Iterator<Item = &Operation<P>> {
        self.operations.iter().filter(|op| op.is_delete())
    }

    fn summarize(&self, summary: &mut PlanSummary) {
        for op in &self.operations {
            match op {
                Operation::Create { .. } => summary.creates += 1,
                Operation::Update { .. } => summary.updates += 1,
                Operation::Delete { .. } => summary.deletes += 1,
            }
        }
        summary.unchanged += self.unchanged.len();
        summary.protected += self.protected.len();
    }

    fn retain_matching(&mut self, pattern: &str) {
        let kind = self.kind;
        self.operations.retain(|op| name_matches(kind, op.name(), pattern));
        self.unchanged.retain(|n| name_matches(kind, n, pattern));
        self.protected.retain(|n| name_matches(kind, n, pattern));
    }
}

/// Whether an identity is selected by a target name
///
/// The name must equal the identity, or the identity without its schema, or
/// for functions the name without the argument list. A trailing `*` turns
/// the name into a prefix.
fn name_matches(kind: ResourceKind, identity: &str, pattern: &str) -> bool {
    let mut forms = vec![identity];
    if kind != ResourceKind::Role
        && let Some((_, unqualified)) = identity.split_once('.')
    {
        forms.push(unqualified);
    }
    if kind == ResourceKind::Function {
        let bare: Vec<&str> = forms
            .iter()
            .copied()
            .filter_map(|f| f.split_once('(').map(|(name, _)| name))
            .collect();
        forms.extend(bare);
    }

    match pattern.strip_suffix('*') {
        Some(prefix) => forms.iter().any(|f| f.starts_with(prefix)),
        None => forms.iter().any(|f| *f == pattern),
    }
}

/// Plan one resource kind
///
/// Operations are ordered creates, updates, deletes. Creates follow the
/// declared order; updates and deletes follow the observed order.
pub fn plan_kind<K: Kind>(
    observed: &[K::Observed],
    declared: &[Arc<K::Declared>],
    include_native_in_delete: bool,
) -> Result<KindPlan<K::Payload>> {
    let extracted = extract::<K>(observed, declared, include_native_in_delete)?;

    let templates: HashMap<String, &Arc<K::Declared>> = declared
        .iter()
        .map(|d| (K::declared_identity(d).into_owned(), d))
        .collect();

    let mut plan = KindPlan::empty(K::KIND);

    for resource in &extracted.new {
        plan.operations.push(Operation::Create {
            name: K::declared_identity(resource).into_owned(),
            payload: bind_new::<K>(resource),
        });
    }

    for record in &extracted.existing {
        let name = record.identity().into_owned();
        // existing records always have a template
        let Some(template) = templates.get(&name) else {
            continue;
        };
        let current = K::payload_of(record);
        let desired = build_from_observed::<K>(record, template);
        if &desired == current {
            plan.unchanged.push(name);
        } else {
            let changes = changed_fields(current, &desired);
            plan.operations.push(Operation::Update {
                name,
                current: current.clone(),
                desired,
                changes,
            });
        }
    }

    for record in &extracted.delete {
        plan.operations.push(Operation::Delete {
            name: record.identity().into_owned(),
            payload: K::payload_of(record).clone(),
        });
    }

    for record in &extracted.protected {
        log::warn!(
            "skipping native {} {}",
            K::KIND.as_str(),
            record.identity()
        );
        plan.protected.push(record.identity().into_owned());
    }

    Ok(plan)
}

pub fn plan_roles(
    observed: &[RoleState],
    declared: &[Arc<dyn crate::model::Role>],
    include_native_in_delete: bool,
) -> Result<KindPlan<objects::Role>> {
    plan_kind::<Roles>(observed, declared, include_native_in_delete)
}

pub fn plan_tables(
    observed: &[TableState],
    declared: &[Arc<dyn crate::model::Table>],
    include_native_in_delete: bool,
) -> Result<KindPlan<objects::Table>> {
    plan_kind::<Tables>(observed, declared, include_native_in_delete)
}

pub fn plan_policies(
    observed: &[PolicyState],
    declared: &[Arc<dyn crate::model::Policy>],
    include_native_in_delete: bool,
) -> Result<KindPlan<objects::Policy>> {
    plan_kind::<Policies>(observed, declared, include_native_in_delete)
}

pub fn plan_functions(
    observed: &[FunctionState],
    declared: &[Arc<dyn crate::model::Rpc>],
    include_native_in_delete: bool,
) -> Result<KindPlan<objects::Function>> {
    plan_kind::<Functions>(observed, declared, include_native_in_delete)
}

/// Top-level fields whose serialized values differ
///
/// Payloads that do not serialize to JSON objects report no field names.
pub fn changed_fields<P: Serialize>(current: &P, desired: &P) -> Vec<String> {
    let (Ok(serde_json::Value::Object(current)), Ok(serde_json::Value::Object(desired))) =
        (serde_json::to_value(current), serde_json::to_value(desired))
    else {
        return Vec::new();
    };

    let keys: BTreeSet<&String> = current.keys().chain(desired.keys()).collect();
    keys.into_iter()
        .filter(|k| current.get(*k) != desired.get(*k))
        .cloned()
        .collect()
}

/// Everything the remote platform reports, per kind
#[derive(Debug, Clone, Default)]
pub struct ObservedState {
    pub roles: Vec<RoleState>,
    pub tables: Vec<TableState>,
    pub policies: Vec<PolicyState>,
    pub functions: Vec<FunctionState>,
}

/// A kind whose planning failed on malformed data
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KindFailure {
    pub kind: ResourceKind,
    pub error: Error,
}

/// Plans for all resource kinds
#[derive(Debug, Clone, PartialEq)]
pub struct Plan {
    pub roles: KindPlan<objects::Role>,
    pub tables: KindPlan<objects::Table>,
    pub policies: KindPlan<objects::Policy>,
    pub functions: KindPlan<objects::Function>,
    /// Kinds left out because their data could not be reconciled
    pub failures: Vec<KindFailure>,
}

impl Plan {
    /// Plan every kind in parallel
    pub fn build(
        registry: &ResourceRegistry,
        observed: &ObservedState,
        include_native_in_delete: bool,
    ) -> Result<Self> {
        Self::build_target(registry, observed, include_native_in_delete, None)
    }

    /// Plan the kinds and names selected by a target pattern
    ///
    /// Target format: "kind" or "kind.name", e.g. `roles` or
    /// `policies.posts.read`. Kind aliases (`models`, `rls`, `rpc`) are
    /// accepted. Names match the identity exactly, with or without its
    /// schema; a trailing `*` matches by prefix. An unknown kind yields an
    /// empty plan.
    ///
    /// Kinds outside the target are never planned. A data error in one kind
    /// is recorded in `failures` and leaves that kind empty; the other kinds
    /// are still planned. Configuration errors abort the whole plan.
    pub fn build_target(
        registry: &ResourceRegistry,
        observed: &ObservedState,
        include_native_in_delete: bool,
        target: Option<&str>,
    ) -> Result<Self> {
        let (kind, name) = match target {
            Some(target) => parse_target(target),
            None => (None, None),
        };
        let selected = |k: ResourceKind| target.is_none() || kind == Some(k);
        let include = include_native_in_delete;

        let ((roles, tables), (functions, policies)) = rayon::join(
            || {
                rayon::join(
                    || {
                        selected(ResourceKind::Role)
                            .then(|| plan_roles(&observed.roles, registry.roles(), include))
                    },
                    || {
                        selected(ResourceKind::Table)
                            .then(|| plan_tables(&observed.tables, registry.tables(), include))
                    },
                )
            },
            || {
                rayon::join(
                    || {
                        selected(ResourceKind::Function).then(|| {
                            plan_functions(&observed.functions, registry.rpcs(), include)
                        })
                    },
                    || {
                        selected(ResourceKind::Policy).then(|| {
                            plan_policies(&observed.policies, registry.policies(), include)
                        })
                    },
                )
            },
        );

        let mut failures = Vec::new();
        let mut plan = Self {
            roles: settle(ResourceKind::Role, roles, &mut failures)?,
            tables: settle(ResourceKind::Table, tables, &mut failures)?,
            functions: settle(ResourceKind::Function, functions, &mut failures)?,
            policies: settle(ResourceKind::Policy, policies, &mut failures)?,
            failures,
        };

        if let Some(name) = name {
            plan.roles.retain_matching(name);
            plan.tables.retain_matching(name);
            plan.functions.retain_matching(name);
            plan.policies.retain_matching(name);
        }

        Ok(plan)
    }

    /// Counts across all kinds
    pub fn summary(&self) -> PlanSummary {
        let mut summary = PlanSummary::default();
        self.roles.summarize(&mut summary);
        self.tables.summarize(&mut summary);
        self.functions.summarize(&mut summary);
        self.policies.summarize(&mut summary);
        summary
    }

    pub fn is_empty(&self) -> bool {
        self.roles.is_empty()
            && self.tables.is_empty()
            && self.functions.is_empty()
            && self.policies.is_empty()
    }

    /// Whether every planned kind reconciled cleanly
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Turn one kind's outcome into a plan, recording data errors
fn settle<P>(
    kind: ResourceKind,
    outcome: Option<Result<KindPlan<P>>>,
    failures: &mut Vec<KindFailure>,
) -> Result<KindPlan<P>> {
    match outcome {
        None => Ok(KindPlan::empty(kind)),
        Some(Ok(plan)) => Ok(plan),
        Some(Err(error)) if error.is_fatal() => Err(error),
        Some(Err(error)) => {
            log::warn!("not planning {}: {error}", kind.plural());
            failures.push(KindFailure { kind, error });
            Ok(KindPlan::empty(kind))
        }
    }
}

/// Parse a target string like "kind.name" into (kind, name)
fn parse_target(target: &str) -> (Option<ResourceKind>, Option<&str>) {
    match target.split_once('.') {
        Some((kind, name)) => (ResourceKind::from_target(kind), Some(name)),
        None => (ResourceKind::from_target(target), None),
    }
}

/// Plan summary statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlanSummary {
    pub creates: usize,
    pub updates: usize,
    pub deletes: usize,
    pub unchanged: usize,
    pub protected: usize,
}

impl PlanSummary {
    /// Total number of changes
    pub fn total(&self) -> usize {
        self.creates + self.updates + self.deletes
    }

    pub fn has_changes(&self) -> bool {
        self.total() > 0
    }
}
