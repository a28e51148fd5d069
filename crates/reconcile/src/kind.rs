//! Per-kind parameterization of the generic engine
//!
//! Each resource kind ties together its declared capability trait, its
//! observed record type and its wire payload, along with the field mapping
//! between them. The extractor and planner are written once against [`Kind`].

use crate::bind;
use crate::model::{self, Declared, FunctionState, Observed, PolicyState, RoleState, TableState};
use crate::objects;
use crate::types::ResourceKind;
use serde::Serialize;
use std::borrow::Cow;

/// A resource kind managed by the engine
pub trait Kind {
    /// Which kind this is
    const KIND: ResourceKind;

    /// Declared capability trait object
    type Declared: Declared + ?Sized;

    /// Observed record
    type Observed: Observed + Clone + Send + Sync;

    /// Wire payload for create/update requests
    type Payload: Clone + Default + PartialEq + Serialize + Send + Sync;

    /// Matching key of a declared resource
    fn declared_identity(declared: &Self::Declared) -> Cow<'_, str> {
        Cow::Borrowed(declared.name())
    }

    /// Copy every capability field of `source` into `target`
    fn bind(target: &mut Self::Payload, source: &Self::Declared);

    /// Wire object carried by an observed record
    fn payload_of(observed: &Self::Observed) -> &Self::Payload;
}

/// Database roles
pub struct Roles;

/// Tables
pub struct Tables;

/// Row-level-security policies
pub struct Policies;

/// Remote-procedure functions
pub struct Functions;

impl Kind for Roles {
    const KIND: ResourceKind = ResourceKind::Role;
    type Declared = dyn model::Role;
    type Observed = RoleState;
    type Payload = objects::Role;

    fn bind(target: &mut Self::Payload, source: &Self::Declared) {
        bind::bind_role(target, source);
    }

    fn payload_of(observed: &Self::Observed) -> &Self::Payload {
        &observed.role
    }
}

impl Kind for Tables {
    const KIND: ResourceKind = ResourceKind::Table;
    type Declared = dyn model::Table;
    type Observed = TableState;
    type Payload = objects::Table;

    fn declared_identity(declared: &Self::Declared) -> Cow<'_, str> {
        Cow::Owned(model::qualified_name(
            model::Table::schema(declared),
            declared.name(),
        ))
    }

    fn bind(target: &mut Self::Payload, source: &Self::Declared) {
        bind::bind_table(target, source);
    }

    fn payload_of(observed: &Self::Observed) -> &Self::Payload {
        &observed.table
    }
}

impl Kind for Policies {
    const KIND: ResourceKind = ResourceKind::Policy;
    type Declared = dyn model::Policy;
    type Observed = PolicyState;
    type Payload = objects::Policy;

    fn declared_identity(declared: &Self::Declared) -> Cow<'_, str> {
        Cow::Owned(model::policy_identity(
            model::Policy::schema(declared),
            model::Policy::table(declared),
            declared.name(),
        ))
    }

    fn bind(target: &mut Self::Payload, source: &Self::Declared) {
        bind::bind_policy(target, source);
    }

    fn payload_of(observed: &Self::Observed) -> &Self::Payload {
        &observed.policy
    }
}

impl Kind for Functions {
    const KIND: ResourceKind = ResourceKind::Function;
    type Declared = dyn model::Rpc;
    type Observed = FunctionState;
    type Payload = objects::Function;

    fn declared_identity(declared: &Self::Declared) -> Cow<'_, str> {
        Cow::Owned(model::function_identity(
            model::Rpc::schema(declared),
            declared.name(),
            &bind::identity_arguments(model::Rpc::params(declared)),
        ))
    }

    fn bind(target: &mut Self::Payload, source: &Self::Declared) {
        bind::bind_function(target, source);
    }

    fn payload_of(observed: &Self::Observed) -> &Self::Payload {
        &observed.function
    }
}
