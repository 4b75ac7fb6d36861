//! CLI command definitions for the `robots` binary.
//!
//! Uses clap derive macros for argument parsing. Commands follow the
//! `robots <verb> <robot> [args]` shape (e.g. `robots inspect atlas`).

pub mod aspect;
pub mod remote;
pub mod robot;

use std::collections::BTreeMap;
use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};
use clap_complete::Shell;

/// Manage your robot fleet.
#[derive(Parser)]
#[command(name = "robots", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress all output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for verbose, -vv for debug/trace).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Export tracing spans through OpenTelemetry (stdout exporter).
    #[arg(long, global = true)]
    pub otel: bool,

    /// Data directory holding the fleet store and fleet-config.toml.
    #[arg(long, global = true, env = "ROBOTS_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Register a new robot.
    Create {
        /// Unique robot name.
        name: String,
        /// Hardware model.
        model: String,
        /// Network hostname used by connect/push/pull.
        hostname: Option<String>,
        /// Physical location.
        #[arg(long)]
        location: Option<String>,
    },

    /// Show every attribute and aspect of a robot.
    Inspect {
        /// Robot name.
        name: String,
    },

    /// Show a robot's status and location.
    Status {
        /// Robot name.
        name: String,
    },

    /// List robots, optionally filtered and sorted.
    #[command(alias = "ls")]
    List {
        /// Only robots whose ATTR equals VALUE (repeatable, all must match).
        #[arg(short, long = "filter", num_args = 2, value_names = ["ATTR", "VALUE"], action = ArgAction::Append)]
        filter: Vec<String>,

        /// Include every aspect as a column.
        #[arg(short, long)]
        detailed: bool,

        /// Sort by an attribute or aspect.
        #[arg(short, long)]
        sort: Option<String>,
    },

    /// Change attributes or aspects of one robot.
    Edit {
        /// Robot name.
        name: String,
        #[arg(long)]
        model: Option<String>,
        #[arg(long)]
        status: Option<String>,
        #[arg(long)]
        hostname: Option<String>,
        /// true or false.
        #[arg(long)]
        deployed: Option<String>,
        #[arg(long)]
        location: Option<String>,
        /// Set aspect NAME to VALUE (repeatable).
        #[arg(short = 'a', long = "aspect", num_args = 2, value_names = ["NAME", "VALUE"], action = ArgAction::Append)]
        aspects: Vec<String>,
    },

    /// Add an aspect to every robot.
    #[command(name = "add-aspect")]
    AddAspect {
        /// Aspect name.
        name: String,
        /// Initial value for every robot (null when omitted).
        #[arg(long)]
        default: Option<String>,
    },

    /// Remove an aspect from every robot.
    #[command(name = "remove-aspect")]
    RemoveAspect {
        /// Aspect name.
        name: String,
        /// Skip confirmation prompt.
        #[arg(short, long)]
        force: bool,
    },

    /// Permanently delete a robot.
    #[command(alias = "rm")]
    Delete {
        /// Robot name.
        name: String,
        /// Skip confirmation prompt.
        #[arg(short, long)]
        force: bool,
    },

    /// Open an ssh session on a robot, or run one command there.
    Connect {
        /// Robot name.
        name: String,
        /// Command to run on the robot.
        #[arg(short = 'c', long = "remote-command")]
        command: Option<String>,
    },

    /// Copy local files to a robot with rsync.
    Push {
        /// Robot name.
        name: String,
        /// Local source path.
        source: String,
        /// Destination path on the robot.
        dest: String,
    },

    /// Copy files from a robot with rsync.
    Pull {
        /// Robot name.
        name: String,
        /// Source path on the robot.
        source: String,
        /// Local destination path.
        dest: String,
    },

    /// Start the REST API server.
    Serve {
        /// Port to listen on.
        #[arg(short, long, default_value = "3000")]
        port: u16,

        /// Host to bind to.
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
    },

    /// Generate shell completions.
    Completions {
        /// Shell to generate completions for.
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Turn clap's flat `[k1, v1, k2, v2, ...]` into a map. Later pairs win.
pub fn pairs_to_map(flat: Vec<String>) -> BTreeMap<String, String> {
    let mut map = BTreeMap::new();
    let mut iter = flat.into_iter();
    while let (Some(key), Some(value)) = (iter.next(), iter.next()) {
        map.insert(key, value);
    }
    map
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("robots").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_list_collects_filter_pairs() {
        let cli = parse(&["list", "-f", "status", "online", "-f", "zone", "1", "-d", "-s", "name"]);
        match cli.command {
            Commands::List { filter, detailed, sort } => {
                let map = pairs_to_map(filter);
                assert_eq!(map.get("status").map(String::as_str), Some("online"));
                assert_eq!(map.get("zone").map(String::as_str), Some("1"));
                assert!(detailed);
                assert_eq!(sort.as_deref(), Some("name"));
            }
            _ => panic!("expected list"),
        }
    }

    #[test]
    fn test_edit_collects_aspects() {
        let cli = parse(&["edit", "atlas", "--deployed", "true", "-a", "color", "red"]);
        match cli.command {
            Commands::Edit { name, deployed, aspects, .. } => {
                assert_eq!(name, "atlas");
                assert_eq!(deployed.as_deref(), Some("true"));
                assert_eq!(aspects, vec!["color", "red"]);
            }
            _ => panic!("expected edit"),
        }
    }

    #[test]
    fn test_create_hostname_is_optional() {
        let cli = parse(&["create", "atlas", "mk2", "--location", "bay 3", "--json"]);
        assert!(cli.json);
        match cli.command {
            Commands::Create { hostname, location, .. } => {
                assert!(hostname.is_none());
                assert_eq!(location.as_deref(), Some("bay 3"));
            }
            _ => panic!("expected create"),
        }
    }

    #[test]
    fn test_connect_remote_command() {
        let cli = parse(&["connect", "atlas", "-c", "uptime"]);
        assert!(matches!(cli.command, Commands::Connect { command: Some(c), .. } if c == "uptime"));
    }

    #[test]
    fn test_pairs_to_map_later_pairs_win() {
        let map = pairs_to_map(vec!["a".into(), "1".into(), "a".into(), "2".into()]);
        assert_eq!(map.get("a").map(String::as_str), Some("2"));
    }
}
