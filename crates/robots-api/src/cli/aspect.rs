//! Fleet-wide aspect commands: add-aspect, remove-aspect.

use anyhow::Result;
use console::style;
use dialoguer::Confirm;

use robots_core::aspect::AspectReport;

use crate::state::AppState;

/// Add an aspect to every robot.
pub async fn add_aspect(
    state: &AppState,
    name: &str,
    default: Option<&str>,
    json: bool,
) -> Result<()> {
    let report = state.fleet_manager.add_aspect(name, default).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    print_report(&report, "Added", "to");
    if report.updated > 0 {
        if let Some(default) = default {
            println!("  Default value set to: {}", style(default).cyan());
        }
    }
    println!();

    Ok(())
}

/// Remove an aspect from every robot after confirmation.
pub async fn remove_aspect(state: &AppState, name: &str, force: bool, json: bool) -> Result<()> {
    if !force && !json {
        let confirmed = Confirm::new()
            .with_prompt(format!(
                "Remove aspect '{}' from every robot? This cannot be undone",
                style(name).red().bold()
            ))
            .default(false)
            .interact()?;

        if !confirmed {
            println!("  Operation cancelled.");
            return Ok(());
        }
    }

    let report = state.fleet_manager.remove_aspect(name).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    print_report(&report, "Removed", "from");
    println!();

    Ok(())
}

fn print_report(report: &AspectReport, verb: &str, preposition: &str) {
    println!();
    for failure in &report.failures {
        println!(
            "  {} {}: {}",
            style("✗").red(),
            style(&failure.robot).bold(),
            failure.reason
        );
    }

    let mark = if report.updated > 0 {
        style("✓").green().bold()
    } else {
        style("i").blue().bold()
    };
    println!(
        "  {mark} {verb} aspect '{}' {preposition} {} {}",
        style(&report.aspect).cyan(),
        report.updated,
        if report.updated == 1 { "robot" } else { "robots" }
    );
}
