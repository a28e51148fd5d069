//! Plan application against the remote platform

use anyhow::Result;
use colored::Colorize;
use reconcile::{KindPlan, Operation, Plan, ResourceKind, objects};
use serde::Serialize;
use serde_json::Value;

use super::differ::display_plan;
use crate::remote::{Method, RemoteApi, Request};
use crate::ui;

/// Options for execution
#[derive(Debug, Clone, Default)]
pub struct ExecuteOptions {
    /// Don't make changes, just show what would happen
    pub dry_run: bool,
    /// Skip confirmation prompts
    pub yes: bool,
    /// Verbose output
    pub verbose: bool,
}

/// Summary of execution results
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ExecuteSummary {
    pub created: usize,
    pub modified: usize,
    pub removed: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl ExecuteSummary {
    pub fn total_changes(&self) -> usize {
        self.created + self.modified + self.removed
    }

    pub fn is_success(&self) -> bool {
        self.failed == 0
    }
}

/// Wire payloads that carry a server-assigned id
pub trait ServerRecord: Serialize {
    fn server_id(&self) -> i64;
}

impl ServerRecord for objects::Role {
    fn server_id(&self) -> i64 {
        self.id
    }
}

impl ServerRecord for objects::Table {
    fn server_id(&self) -> i64 {
        self.id
    }
}

impl ServerRecord for objects::Policy {
    fn server_id(&self) -> i64 {
        self.id
    }
}

impl ServerRecord for objects::Function {
    fn server_id(&self) -> i64 {
        self.id
    }
}

/// Requests for a plan, in dependency order
///
/// Creates and updates go roles, tables, functions, policies; deletes go
/// the other way round so dependents disappear first.
pub fn ordered_requests(plan: &Plan) -> Result<Vec<Request>> {
    let mut requests = Vec::new();

    upsert_requests(&plan.roles, &mut requests)?;
    upsert_requests(&plan.tables, &mut requests)?;
    upsert_requests(&plan.functions, &mut requests)?;
    upsert_requests(&plan.policies, &mut requests)?;

    delete_requests(&plan.policies, &mut requests);
    delete_requests(&plan.functions, &mut requests);
    delete_requests(&plan.tables, &mut requests);
    delete_requests(&plan.roles, &mut requests);

    Ok(requests)
}

fn upsert_requests<P: ServerRecord>(plan: &KindPlan<P>, out: &mut Vec<Request>) -> Result<()> {
    for op in &plan.operations {
        match op {
            Operation::Create { name, payload } => {
                let mut body = serde_json::to_value(payload)?;
                if let Value::Object(map) = &mut body {
                    map.remove("id");
                }
                out.push(request(Method::Post, plan.kind, name, None, Some(body)));
            }
            Operation::Update {
                name,
                current,
                desired,
                changes,
            } => {
                let body = match serde_json::to_value(desired)? {
                    Value::Object(map) => Value::Object(
                        map.into_iter()
                            .filter(|(k, _)| changes.contains(k))
                            .collect(),
                    ),
                    other => other,
                };
                out.push(request(
                    Method::Patch,
                    plan.kind,
                    name,
                    Some(current.server_id()),
                    Some(body),
                ));
            }
            Operation::Delete { .. } => {}
        }
    }
    Ok(())
}

fn delete_requests<P: ServerRecord>(plan: &KindPlan<P>, out: &mut Vec<Request>) {
    for op in plan.deletes() {
        if let Operation::Delete { name, payload } = op {
            out.push(request(
                Method::Delete,
                plan.kind,
                name,
                Some(payload.server_id()),
                None,
            ));
        }
    }
}

fn request(
    method: Method,
    kind: ResourceKind,
    name: &str,
    id: Option<i64>,
    body: Option<Value>,
) -> Request {
    Request {
        method,
        kind,
        name: name.to_string(),
        id,
        body,
    }
}

/// Display, confirm and apply a plan
pub fn execute(plan: &Plan, remote: &dyn RemoteApi, opts: &ExecuteOptions) -> Result<ExecuteSummary> {
    // 1. Display what will change
    display_plan(plan, opts.verbose);

    let requests = ordered_requests(plan)?;
    if requests.is_empty() {
        return Ok(ExecuteSummary::default());
    }

    if opts.dry_run {
        println!();
        println!("  {} Dry run - no changes made", "ℹ".blue());
        return Ok(ExecuteSummary::default());
    }

    // 2. Confirm (unless --yes); deletions default to "no"
    let has_deletes = requests.iter().any(|r| r.method == Method::Delete);
    if !opts.yes && !ui::confirm("Apply these changes?", !has_deletes)? {
        println!();
        println!("  {} Aborted", "✗".red());
        return Ok(ExecuteSummary {
            skipped: requests.len(),
            ..Default::default()
        });
    }

    // 3. Apply in order
    let summary = apply_requests(&requests, remote);
    print_summary(&summary);

    Ok(summary)
}

/// Apply requests sequentially, stopping at the first failure
///
/// Later requests may depend on earlier ones, so everything after a failure
/// is counted as skipped. Nothing already applied is rolled back.
pub fn apply_requests(requests: &[Request], remote: &dyn RemoteApi) -> ExecuteSummary {
    let pb = ui::progress_bar(requests.len() as u64, "Applying");
    let mut summary = ExecuteSummary::default();

    for (i, request) in requests.iter().enumerate() {
        pb.set_message(format!("{} {}", request.kind, request.name));

        match remote.apply(request) {
            Ok(()) => {
                log::info!("{} {} {}", request.method, request.kind, request.name);
                match request.method {
                    Method::Post => summary.created += 1,
                    Method::Patch => summary.modified += 1,
                    Method::Delete => summary.removed += 1,
                }
                pb.inc(1);
            }
            Err(e) => {
                pb.suspend(|| {
                    ui::error(&format!("{} {} {}: {e}", request.method, request.kind, request.name));
                    if matches!(e.status(), Some(401 | 403)) {
                        ui::dim("Check the access token (DBSYNC_ACCESS_TOKEN)");
                    }
                });
                summary.failed += 1;
                summary.skipped = requests.len() - i - 1;
                break;
            }
        }
    }

    pb.finish_and_clear();
    summary
}

/// Print final summary
fn print_summary(summary: &ExecuteSummary) {
    println!();
    if summary.is_success() {
        println!("  {} Remote state updated", "✓".green().bold());
    } else {
        println!("  {} Remote state partially updated", "⚠".yellow().bold());
    }

    if summary.created > 0 {
        println!("    • {} resources created", summary.created);
    }
    if summary.modified > 0 {
        println!("    • {} resources modified", summary.modified);
    }
    if summary.removed > 0 {
        println!("    • {} resources removed", summary.removed);
    }
    if summary.skipped > 0 {
        println!("    • {} resources skipped", summary.skipped);
    }
    if summary.failed > 0 {
        println!("    • {} {} failed", summary.failed, "resources".red());
    }
}
