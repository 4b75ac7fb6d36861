//! Robots fleet CLI and REST API entry point.
//!
//! Binary name: `robots`
//!
//! Parses CLI arguments, loads configuration, opens the fleet store, then
//! dispatches to the appropriate command handler or starts the REST API
//! server.

mod cli;
mod http;
mod state;

use clap::Parser;
use clap_complete::generate;

use cli::{Cli, Commands, pairs_to_map};
use robots_core::service::manager::ListRequest;
use robots_core::transport::TransferDirection;
use robots_observe::tracing_setup;
use robots_types::robot::CreateRobotRequest;
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Shell completions don't need tracing or app state
    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = <Cli as clap::CommandFactory>::command();
        generate(*shell, &mut cmd, "robots", &mut std::io::stdout());
        return Ok(());
    }

    let filter = tracing_setup::default_directive(cli.verbose, cli.quiet);
    tracing_setup::init_tracing(filter, cli.otel)
        .map_err(|e| anyhow::anyhow!("failed to initialize tracing: {e}"))?;

    let result = run(cli).await;
    tracing_setup::shutdown_tracing();
    result
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let state = AppState::init(cli.data_dir.clone()).await?;
    let json = cli.json;

    match cli.command {
        Commands::Create {
            name,
            model,
            hostname,
            location,
        } => {
            let request = CreateRobotRequest {
                name,
                model,
                hostname,
                location,
            };
            cli::robot::create_robot(&state, request, json).await?;
        }

        Commands::Inspect { name } => {
            cli::robot::inspect_robot(&state, &name, json).await?;
        }

        Commands::Status { name } => {
            cli::robot::robot_status(&state, &name, json).await?;
        }

        Commands::List {
            filter,
            detailed,
            sort,
        } => {
            let request = ListRequest {
                filters: pairs_to_map(filter),
                detailed,
                sort_by: sort,
            };
            cli::robot::list_robots(&state, request, json).await?;
        }

        Commands::Edit {
            name,
            model,
            status,
            hostname,
            deployed,
            location,
            aspects,
        } => {
            let mut updates = pairs_to_map(aspects);
            let core = [
                ("model", model),
                ("status", status),
                ("hostname", hostname),
                ("deployed", deployed),
                ("location", location),
            ];
            for (key, value) in core {
                if let Some(value) = value {
                    updates.insert(key.to_string(), value);
                }
            }
            cli::robot::edit_robot(&state, &name, updates, json).await?;
        }

        Commands::AddAspect { name, default } => {
            cli::aspect::add_aspect(&state, &name, default.as_deref(), json).await?;
        }

        Commands::RemoveAspect { name, force } => {
            cli::aspect::remove_aspect(&state, &name, force, json).await?;
        }

        Commands::Delete { name, force } => {
            cli::robot::delete_robot(&state, &name, force, json).await?;
        }

        Commands::Connect { name, command } => {
            cli::remote::connect(&state, &name, command.as_deref(), cli.quiet).await?;
        }

        Commands::Push { name, source, dest } => {
            cli::remote::transfer(
                &state,
                &name,
                &source,
                &dest,
                TransferDirection::Push,
                cli.quiet,
            )
            .await?;
        }

        Commands::Pull { name, source, dest } => {
            cli::remote::transfer(
                &state,
                &name,
                &source,
                &dest,
                TransferDirection::Pull,
                cli.quiet,
            )
            .await?;
        }

        Commands::Serve { port, host } => {
            let addr = format!("{host}:{port}");
            let listener = tokio::net::TcpListener::bind(&addr).await?;

            println!(
                "  {} Robots API listening on {} ({} store in {})",
                console::style("⚡").bold(),
                console::style(format!("http://{addr}")).cyan(),
                state.config.storage.backend,
                state.data_dir.display()
            );
            println!("  {}", console::style("Press Ctrl+C to stop").dim());

            let router = http::router::build_router(state);

            axum::serve(listener, router)
                .with_graceful_shutdown(shutdown_signal())
                .await?;

            println!("\n  Server stopped.");
        }

        Commands::Completions { .. } => unreachable!("handled in main"),
    }

    Ok(())
}

/// Wait for Ctrl+C or SIGTERM for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
