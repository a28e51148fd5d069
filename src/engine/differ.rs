//! Plan display

use colored::Colorize;
use reconcile::{KindFailure, KindPlan, Operation, Plan, PlanSummary};

use crate::ui;
use serde::Serialize;

/// Display a plan grouped by kind, in application order
pub fn display_plan(plan: &Plan, verbose: bool) {
    display_changes(plan, verbose);
    display_failures(plan);
}

fn display_changes(plan: &Plan, verbose: bool) {
    let summary = plan.summary();
    if !summary.has_changes() {
        println!();
        println!("  {} No changes needed", "✓".green());
        if summary.protected > 0 {
            println!("  {}", format!("{} native records kept", summary.protected).dimmed());
        }
        return;
    }

    println!();
    println!(
        "┌─ {} ─────────────────────────────────────────┐",
        "Remote Changes".bold()
    );
    println!("│");

    display_kind(&plan.roles, verbose);
    display_kind(&plan.tables, verbose);
    display_kind(&plan.functions, verbose);
    display_kind(&plan.policies, verbose);

    println!("├─────────────────────────────────────────────────────┤");
    println!("│ {}", summary_line(&summary));
    println!("└─────────────────────────────────────────────────────┘");
}

/// Kinds that were left out of the plan
pub fn display_failures(plan: &Plan) {
    if plan.is_complete() {
        return;
    }
    println!();
    for failure in &plan.failures {
        ui::error(&failure_line(failure));
    }
}

fn failure_line(failure: &KindFailure) -> String {
    format!(
        "{} not planned. {}: {}",
        capitalize(failure.kind.plural()),
        failure.error.category().description(),
        failure.error
    )
}

fn display_kind<P: Serialize>(plan: &KindPlan<P>, verbose: bool) {
    if plan.operations.is_empty() && plan.protected.is_empty() {
        return;
    }

    println!("│ {}", capitalize(plan.kind.plural()).bold());

    for op in &plan.operations {
        match op {
            Operation::Create { name, .. } => {
                println!("│   {} {:<30} {}", "+".green(), name, "(create)".dimmed());
            }
            Operation::Update {
                name,
                current,
                desired,
                changes,
            } => {
                println!(
                    "│   {} {:<30} {}",
                    "~".yellow(),
                    name,
                    changes.join(", ").dimmed()
                );
                if verbose {
                    for line in render_update_diff(current, desired) {
                        println!("│       {line}");
                    }
                }
            }
            Operation::Delete { name, .. } => {
                println!("│   {} {:<30} {}", "-".red(), name, "(will remove)".dimmed());
            }
        }
    }

    if verbose {
        for name in &plan.protected {
            println!("│   {} {:<30} {}", "⊘".dimmed(), name, "(native, kept)".dimmed());
        }
    }
    println!("│");
}

/// Changed lines between the pretty-printed payloads
pub fn render_update_diff<P: Serialize>(current: &P, desired: &P) -> Vec<String> {
    let (Ok(old), Ok(new)) = (
        serde_json::to_string_pretty(current),
        serde_json::to_string_pretty(desired),
    ) else {
        return Vec::new();
    };

    let diff = similar::TextDiff::from_lines(&old, &new);
    diff.iter_all_changes()
        .filter_map(|change| {
            let line = change.value().trim_end().to_string();
            match change.tag() {
                similar::ChangeTag::Delete => Some(format!("- {line}").red().to_string()),
                similar::ChangeTag::Insert => Some(format!("+ {line}").green().to_string()),
                similar::ChangeTag::Equal => None,
            }
        })
        .collect()
}

/// One-line summary of a plan
pub fn summary_line(summary: &PlanSummary) -> String {
    let mut line = format!(
        "Summary: {} to create, {} to update, {} to delete",
        summary.creates.to_string().green(),
        summary.updates.to_string().yellow(),
        summary.deletes.to_string().red()
    );
    if summary.protected > 0 {
        line.push_str(&format!(", {} native kept", summary.protected));
    }
    line
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reconcile::{ResourceKind, objects};

    #[test]
    fn test_render_update_diff() {
        colored::control::set_override(false);
        let current = objects::Role {
            name: "analyst".into(),
            ..Default::default()
        };
        let desired = objects::Role {
            can_login: true,
            ..current.clone()
        };

        let lines = render_update_diff(&current, &desired);
        assert_eq!(
            lines,
            vec![
                "-   \"can_login\": false,".to_string(),
                "+   \"can_login\": true,".to_string()
            ]
        );
        assert!(render_update_diff(&current, &current).is_empty());
    }

    #[test]
    fn test_failure_line() {
        let failure = KindFailure {
            kind: ResourceKind::Function,
            error: reconcile::Error::MalformedRecord {
                kind: ResourceKind::Function,
                message: "public.search() is reported more than once".into(),
            },
        };
        assert_eq!(
            failure_line(&failure),
            "Functions not planned. Invalid resource data: malformed observed function \
             record: public.search() is reported more than once"
        );
    }

    #[test]
    fn test_capitalize() {
        assert_eq!(capitalize("roles"), "Roles");
        assert_eq!(capitalize(""), "");
    }
}
