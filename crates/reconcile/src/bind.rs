//! Binders between declared resources and wire payloads
//!
//! Direction A (`bind_*`) copies every capability field of a declared
//! resource into a payload. Direction B (`build_*_from_observed`) starts from
//! the observed wire object, keeping server-assigned fields, and overlays the
//! declared fields to describe what the remote state should become.

use crate::kind::{Functions, Kind, Policies, Roles, Tables};
use crate::model::{self, Declared, FunctionState, PolicyState, RoleState, RpcParam, TableState};
use crate::objects;
use crate::types::{ParamMode, PolicyAction};

/// Copy a declared role into a role payload
pub fn bind_role(target: &mut objects::Role, source: &dyn model::Role) {
    target.name = source.name().to_string();
    target.connection_limit = source.connection_limit();
    target.inherit_role = source.inherit_role();
    target.is_replication_role = source.is_replication_role();
    target.can_bypass_rls = source.can_bypass_rls();
    target.can_create_db = source.can_create_db();
    target.can_create_role = source.can_create_role();
    target.can_login = source.can_login();
    target.valid_until = source.valid_until();
}

/// Copy a declared table into a table payload
///
/// Columns already present in `target` keep their server-assigned ids and
/// positions; columns not declared are dropped.
pub fn bind_table(target: &mut objects::Table, source: &dyn model::Table) {
    target.name = source.name().to_string();
    target.schema = source.schema().to_string();
    target.rls_enabled = source.rls_enabled();
    target.rls_forced = source.rls_forced();

    let current = std::mem::take(&mut target.columns);
    target.columns = source
        .columns()
        .iter()
        .map(|def| {
            let mut column = current
                .iter()
                .find(|c| c.name == def.name)
                .cloned()
                .unwrap_or_else(|| objects::Column {
                    table_id: target.id,
                    format: def.data_type.clone(),
                    ..Default::default()
                });
            column.schema = target.schema.clone();
            column.table = target.name.clone();
            column.name = def.name.clone();
            column.data_type = def.data_type.clone();
            column.default_value = def.default_value.clone();
            column.is_nullable = def.nullable;
            column.is_unique = def.is_unique;
            column.is_identity = def.is_identity;
            column
        })
        .collect();

    target.primary_keys = source
        .primary_keys()
        .iter()
        .map(|name| objects::PrimaryKey {
            schema: target.schema.clone(),
            table_name: target.name.clone(),
            name: name.clone(),
            table_id: target.id,
        })
        .collect();
}

/// Copy a declared policy into a policy payload
pub fn bind_policy(target: &mut objects::Policy, source: &dyn model::Policy) {
    target.name = source.name().to_string();
    target.schema = source.schema().to_string();
    target.table = source.table().to_string();
    target.command = source.command();
    target.action = if source.permissive() {
        PolicyAction::Permissive
    } else {
        PolicyAction::Restrictive
    };
    target.roles = source.roles().to_vec();
    target.definition = source.using_expression().map(str::to_string);
    target.check = source.check_expression().map(str::to_string);
}

/// Copy a declared function into a function payload
pub fn bind_function(target: &mut objects::Function, source: &dyn model::Rpc) {
    target.name = source.name().to_string();
    target.schema = source.schema().to_string();
    target.language = source.language().to_string();
    target.definition = source.definition().to_string();
    target.return_type = source.return_type().to_string();
    target.behavior = source.behavior();
    target.security_definer = source.security_definer();

    let params = source.params();
    let current = std::mem::take(&mut target.args);
    target.args = params
        .iter()
        .map(|p| objects::FunctionArg {
            mode: p.mode,
            name: p.name.clone(),
            type_id: current
                .iter()
                .find(|a| a.name == p.name)
                .map(|a| a.type_id)
                .unwrap_or_default(),
            has_default: p.has_default,
        })
        .collect();
    target.argument_types = render_arguments(params.iter());
    target.identity_argument_types = identity_arguments(params);
}

/// Argument list that identifies a function among its overloads
///
/// Output-only parameters are not part of a function's signature.
pub fn identity_arguments(params: &[RpcParam]) -> String {
    render_arguments(
        params
            .iter()
            .filter(|p| !matches!(p.mode, ParamMode::Out | ParamMode::Table)),
    )
}

/// Render parameters the way Postgres prints an argument list
fn render_arguments<'a>(params: impl Iterator<Item = &'a RpcParam>) -> String {
    params
        .map(|p| {
            let prefix = match p.mode {
                ParamMode::In | ParamMode::Table => "",
                ParamMode::Out => "OUT ",
                ParamMode::Inout => "INOUT ",
                ParamMode::Variadic => "VARIADIC ",
            };
            format!("{prefix}{} {}", p.name, p.data_type)
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Build a fresh payload for a resource that does not exist remotely yet
pub fn bind_new<K: Kind>(source: &K::Declared) -> K::Payload {
    let mut payload = K::Payload::default();
    K::bind(&mut payload, source);
    payload
}

/// Reconcile an observed record with its declared template
pub fn build_from_observed<K: Kind>(observed: &K::Observed, template: &K::Declared) -> K::Payload {
    let mut payload = K::payload_of(observed).clone();
    K::bind(&mut payload, template);
    payload
}

pub fn build_role_from_observed(
    observed: &RoleState,
    template: &(dyn model::Role + 'static),
) -> objects::Role {
    build_from_observed::<Roles>(observed, template)
}

pub fn build_table_from_observed(
    observed: &TableState,
    template: &(dyn model::Table + 'static),
) -> objects::Table {
    build_from_observed::<Tables>(observed, template)
}

pub fn build_policy_from_observed(
    observed: &PolicyState,
    template: &(dyn model::Policy + 'static),
) -> objects::Policy {
    build_from_observed::<Policies>(observed, template)
}

pub fn build_function_from_observed(
    observed: &FunctionState,
    template: &(dyn model::Rpc + 'static),
) -> objects::Function {
    build_from_observed::<Functions>(observed, template)
}
