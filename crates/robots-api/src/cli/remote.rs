//! Remote access commands: connect, push, pull.
//!
//! The manager resolves `name -> hostname`; the transport does the rest.

use anyhow::Result;
use console::style;

use robots_core::transport::{TransferDirection, Transport};

use crate::state::AppState;

/// Open an ssh session on a robot, or run a single command there.
pub async fn connect(state: &AppState, name: &str, command: Option<&str>, quiet: bool) -> Result<()> {
    let hostname = state.fleet_manager.resolve_hostname(name).await?;

    if !quiet {
        eprintln!(
            "  {} Connecting to {} via {}...",
            style("→").cyan().bold(),
            style(name).cyan(),
            style(&hostname).dim()
        );
        if let Some(command) = command {
            eprintln!("  Running command: {}", style(command).yellow());
        }
    }

    state.transport.connect(&hostname, command).await?;
    Ok(())
}

/// Copy files to or from a robot.
pub async fn transfer(
    state: &AppState,
    name: &str,
    source: &str,
    dest: &str,
    direction: TransferDirection,
    quiet: bool,
) -> Result<()> {
    let hostname = state.fleet_manager.resolve_hostname(name).await?;

    if !quiet {
        eprintln!(
            "  {} Transferring files {} {}...",
            style("→").cyan().bold(),
            direction.preposition(),
            style(&hostname).cyan()
        );
    }

    state
        .transport
        .transfer(&hostname, source, dest, direction)
        .await?;

    if !quiet {
        eprintln!("  {} Transfer complete", style("✓").green().bold());
    }
    Ok(())
}
