//! `plan` and `apply`

use anyhow::{Result, bail};
use reconcile::Plan;

use super::Project;
use crate::Context;
use crate::cli::{ApplyArgs, PlanArgs, TargetArgs};
use crate::engine::{self, ExecuteOptions, differ};
use crate::remote::RemoteApi;
use crate::ui;

/// Exit status of `plan --detailed-exitcode` when changes are pending
pub const EXIT_CHANGES_PENDING: i32 = 3;

pub fn plan(ctx: &Context, args: &PlanArgs) -> Result<i32> {
    let project = Project::load(ctx)?;
    let client = project.connect(ctx)?;
    let plan = target_plan(&project, &client, &args.target)?;

    differ::display_plan(&plan, ctx.verbose > 0);
    ensure_complete(&plan)?;

    if args.detailed_exitcode && !plan.is_empty() {
        return Ok(EXIT_CHANGES_PENDING);
    }
    Ok(0)
}

pub fn apply(ctx: &Context, args: &ApplyArgs) -> Result<i32> {
    let project = Project::load(ctx)?;
    let client = project.connect(ctx)?;
    let plan = target_plan(&project, &client, &args.target)?;

    let opts = ExecuteOptions {
        dry_run: args.dry_run,
        yes: args.yes,
        verbose: ctx.verbose > 0,
    };
    let summary = engine::execute(&plan, &client, &opts)?;

    if !summary.is_success() {
        bail!("{} change(s) failed, {} skipped", summary.failed, summary.skipped);
    }
    if summary.total_changes() > 0 && !ctx.quiet {
        ui::success(&format!("Applied {} change(s)", summary.total_changes()));
    }
    ensure_complete(&plan)?;
    Ok(0)
}

/// Fail once the healthy kinds are handled if any kind could not be planned
fn ensure_complete(plan: &Plan) -> Result<()> {
    if !plan.is_complete() {
        let kinds: Vec<&str> = plan.failures.iter().map(|f| f.kind.plural()).collect();
        bail!("could not plan {}", kinds.join(", "));
    }
    Ok(())
}

fn target_plan(project: &Project, remote: &dyn RemoteApi, target: &TargetArgs) -> Result<Plan> {
    let include_native = project.include_native(target.include_native);
    if include_native {
        ui::warn("Native records are included in deletions");
    }

    engine::build_plan(
        &project.registry,
        remote,
        &project.config,
        include_native,
        target.target.as_deref(),
    )
}
