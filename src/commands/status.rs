use anyhow::Result;
use colored::Colorize;
use reconcile::{KindPlan, Plan, PlanSummary, ResourceKind, ResourceRegistry};

use super::Project;
use crate::Context;
use crate::cli::TargetArgs;
use crate::engine::{self, differ};
use crate::ui;

/// Drift counts for one kind
#[derive(Debug, Default, PartialEq, Eq)]
pub struct KindStatus {
    pub declared: usize,
    pub in_sync: usize,
    pub missing: usize,
    pub drifted: usize,
    pub undeclared: usize,
    pub native: usize,
}

impl KindStatus {
    fn from_plan<P>(declared: usize, plan: &KindPlan<P>) -> Self {
        Self {
            declared,
            in_sync: plan.unchanged.len(),
            missing: plan.creates().count(),
            drifted: plan.updates().count(),
            undeclared: plan.deletes().count(),
            native: plan.protected.len(),
        }
    }

    pub fn is_clean(&self) -> bool {
        self.missing == 0 && self.drifted == 0 && self.undeclared == 0
    }
}

/// Status rows in application order
pub fn collect(registry: &ResourceRegistry, plan: &Plan) -> Vec<(ResourceKind, KindStatus)> {
    ResourceKind::ALL
        .iter()
        .map(|&kind| {
            let declared = registry.count(kind);
            let status = match kind {
                ResourceKind::Role => KindStatus::from_plan(declared, &plan.roles),
                ResourceKind::Table => KindStatus::from_plan(declared, &plan.tables),
                ResourceKind::Function => KindStatus::from_plan(declared, &plan.functions),
                ResourceKind::Policy => KindStatus::from_plan(declared, &plan.policies),
            };
            (kind, status)
        })
        .collect()
}

pub fn run(ctx: &Context, args: &TargetArgs) -> Result<()> {
    let project = Project::load(ctx)?;
    let client = project.connect(ctx)?;
    let include_native = project.include_native(args.include_native);

    let plan = engine::build_plan(
        &project.registry,
        &client,
        &project.config,
        include_native,
        args.target.as_deref(),
    )?;

    ui::header("Remote Status");
    ui::kv("Metadata API", client.base_url());
    ui::kv("Manifest", &project.config.manifest_path().display().to_string());
    ui::kv("Schemas", &project.config.schemas.join(", "));
    println!();

    println!(
        "  {} {} {} {} {} {}",
        ui::pad("", 10),
        ui::pad("declared", 9),
        ui::pad("in sync", 8),
        ui::pad("missing", 8),
        ui::pad("drifted", 8),
        "undeclared".dimmed()
    );

    for (kind, status) in collect(&project.registry, &plan) {
        let symbol = if status.is_clean() {
            "✓".green()
        } else {
            "⚠".yellow()
        };
        println!(
            "{} {} {} {} {} {} {}",
            symbol,
            ui::pad(kind.plural(), 10).bold(),
            ui::pad(&status.declared.to_string(), 9),
            ui::pad(&status.in_sync.to_string(), 8).green(),
            ui::pad(&status.missing.to_string(), 8).yellow(),
            ui::pad(&status.drifted.to_string(), 8).yellow(),
            status.undeclared.to_string().red()
        );
        if status.native > 0 && ctx.verbose > 0 {
            ui::dim(&format!("{} native {} kept", status.native, kind.plural()));
        }
    }

    differ::display_failures(&plan);
    print_hint(&plan.summary());
    Ok(())
}

fn print_hint(summary: &PlanSummary) {
    println!();
    if summary.has_changes() {
        ui::info(&format!(
            "{} change(s) pending. Run: dbsync plan",
            summary.total()
        ));
    } else {
        ui::success("Remote state matches the manifest");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reconcile::ObservedState;
    use reconcile::{RoleState, objects};

    #[test]
    fn test_collect_counts() {
        let registry = crate::manifest::Manifest::parse(
            r#"
[[roles]]
name = "analyst"

[[roles]]
name = "writer"

[[tables]]
name = "posts"
"#,
        )
        .unwrap()
        .into_registry()
        .unwrap();

        let role = |name: &str, is_native: bool| RoleState {
            role: objects::Role {
                name: name.to_string(),
                connection_limit: -1,
                inherit_role: true,
                ..Default::default()
            },
            is_native,
        };
        let observed = ObservedState {
            roles: vec![role("analyst", false), role("postgres", true), role("old", false)],
            ..Default::default()
        };
        let plan = Plan::build(&registry, &observed, false).unwrap();
        let rows = collect(&registry, &plan);

        assert_eq!(rows[0].0, ResourceKind::Role);
        assert_eq!(
            rows[0].1,
            KindStatus {
                declared: 2,
                in_sync: 1,
                missing: 1,
                drifted: 0,
                undeclared: 1,
                native: 1,
            }
        );
        assert!(!rows[0].1.is_clean());

        assert_eq!(rows[1].0, ResourceKind::Table);
        assert_eq!(rows[1].1.missing, 1);
        assert!(rows[2].1.is_clean());
        assert!(rows[3].1.is_clean());
    }
}
