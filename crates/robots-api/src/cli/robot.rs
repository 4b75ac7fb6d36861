//! Robot CLI commands: create, inspect, status, list, edit, delete.

use std::collections::BTreeMap;

use anyhow::{Result, bail};
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;
use dialoguer::Confirm;

use robots_core::query::RobotTable;
use robots_core::service::manager::ListRequest;
use robots_types::error::FleetError;
use robots_types::robot::{AttributeValue, CreateRobotRequest};

use crate::state::AppState;

/// Register a new robot.
pub async fn create_robot(
    state: &AppState,
    request: CreateRobotRequest,
    json: bool,
) -> Result<()> {
    let robot = state.fleet_manager.create_robot(request).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&robot)?);
        return Ok(());
    }

    println!();
    println!(
        "  {} Robot '{}' created",
        style("✓").green().bold(),
        style(robot.name()).cyan()
    );
    println!("  {}  {}", style("Model:").bold(), robot.model);
    println!(
        "  {}  {}",
        style("Hostname:").bold(),
        robot.hostname.as_deref().unwrap_or("-")
    );
    if let Some(location) = &robot.location {
        println!("  {}  {}", style("Location:").bold(), location);
    }
    println!();

    Ok(())
}

/// Print every attribute and aspect of a robot.
pub async fn inspect_robot(state: &AppState, name: &str, json: bool) -> Result<()> {
    let record = state.fleet_manager.inspect_robot(name).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&record)?);
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Aspect").fg(Color::White),
        Cell::new("Value").fg(Color::White),
    ]);

    for (key, value) in record.iter() {
        table.add_row(vec![Cell::new(key), value_cell(value)]);
    }

    println!();
    println!("  {} {}", style("Configuration of").bold(), style(name).cyan());
    println!("{table}");
    println!();

    Ok(())
}

/// Print a robot's status (and location when set).
pub async fn robot_status(state: &AppState, name: &str, json: bool) -> Result<()> {
    let status = state.fleet_manager.get_status(name).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    println!();
    println!("  {}    {}", style("Robot:").bold(), style(&status.name).cyan());
    println!("  {}   {}", style("Status:").bold(), status.status);
    if let Some(location) = &status.location {
        println!("  {} {}", style("Location:").bold(), location);
    }
    println!();

    Ok(())
}

/// List robots in a table. Deployed robots are green, the rest grey.
pub async fn list_robots(state: &AppState, request: ListRequest, json: bool) -> Result<()> {
    let listing = match state.fleet_manager.list_robots(&request).await {
        Ok(listing) => listing,
        Err(e @ (FleetError::NoRobots | FleetError::NoMatches)) => {
            return print_empty_listing(&e, json);
        }
        Err(e) => return Err(e.into()),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&listing)?);
        return Ok(());
    }

    for warning in &listing.warnings {
        eprintln!("  {} {warning}", style("!").yellow().bold());
    }

    println!();
    println!("{}", render_table(&listing.table));
    println!();

    Ok(())
}

fn print_empty_listing(err: &FleetError, json: bool) -> Result<()> {
    if json {
        let code = match err {
            FleetError::NoRobots => "no_robots",
            _ => "no_matches",
        };
        println!(
            "{}",
            serde_json::json!({"robots": [], "reason": code, "message": err.to_string()})
        );
        return Ok(());
    }

    println!();
    match err {
        FleetError::NoRobots => println!(
            "  {} No robots registered. Create one with: {}",
            style("i").blue().bold(),
            style("robots create NAME MODEL HOSTNAME").yellow()
        ),
        _ => println!(
            "  {} No robots match the specified filters",
            style("i").blue().bold()
        ),
    }
    println!();
    Ok(())
}

/// Render a listing with comfy-table.
pub fn render_table(listing: &RobotTable) -> Table {
    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(
        listing
            .headers
            .iter()
            .map(|h| Cell::new(title_case(h)).fg(Color::White)),
    );

    for row in &listing.rows {
        let color = if row.deployed {
            Color::Green
        } else {
            Color::DarkGrey
        };
        table.add_row(row.cells.iter().map(|c| Cell::new(c).fg(color)));
    }

    table
}

fn title_case(header: &str) -> String {
    let mut chars = header.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn value_cell(value: &AttributeValue) -> Cell {
    match value {
        AttributeValue::Bool(true) => Cell::new("true").fg(Color::Green),
        AttributeValue::Bool(false) => Cell::new("false").fg(Color::DarkGrey),
        AttributeValue::Null => Cell::new("-").fg(Color::DarkGrey),
        AttributeValue::Text(s) => Cell::new(s),
    }
}

/// Apply attribute updates to one robot.
pub async fn edit_robot(
    state: &AppState,
    name: &str,
    updates: BTreeMap<String, String>,
    json: bool,
) -> Result<()> {
    if updates.is_empty() {
        bail!("nothing to change: pass at least one attribute flag or --aspect NAME VALUE");
    }

    let robot = state.fleet_manager.edit_robot(name, updates.clone()).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&robot)?);
        return Ok(());
    }

    println!();
    println!(
        "  {} Robot '{}' updated",
        style("✓").green().bold(),
        style(robot.name()).cyan()
    );
    for key in updates.keys() {
        let value = robot
            .get_attribute(key)
            .map(|v| v.to_string())
            .unwrap_or_default();
        println!("    {} {key} = {value}", style("•").dim());
    }
    println!();

    Ok(())
}

/// Delete a robot after confirmation.
pub async fn delete_robot(state: &AppState, name: &str, force: bool, json: bool) -> Result<()> {
    // Resolve first so a typo fails before the prompt.
    state.fleet_manager.get_status(name).await?;

    if !force && !json {
        let confirmed = Confirm::new()
            .with_prompt(format!(
                "Permanently delete robot '{}'?",
                style(name).red().bold()
            ))
            .default(false)
            .interact()?;

        if !confirmed {
            println!("  Cancelled.");
            return Ok(());
        }
    }

    state.fleet_manager.delete_robot(name).await?;

    if json {
        println!("{}", serde_json::json!({"deleted": true, "name": name}));
    } else {
        println!("  {} Robot '{}' deleted", style("✓").green().bold(), name);
    }

    Ok(())
}
