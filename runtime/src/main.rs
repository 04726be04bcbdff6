// Copyright 2026 Reviewtrack Contributors
// SPDX-License-Identifier: Apache-2.0

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use tracing_subscriber::EnvFilter;

use reviewtrack_runtime::cli::{self, output};

#[derive(Parser)]
#[command(
    name = "reviewtrack",
    about = "reviewtrack: watch public business reviews and report what changed",
    version,
    after_help = "Configuration is read from REVIEWTRACK_* environment variables.\nRun 'reviewtrack <command> --help' for details on each command."
)]
struct Cli {
    /// Output results as JSON (machine-readable)
    #[arg(long, global = true)]
    json: bool,

    /// Suppress non-essential output
    #[arg(long, short, global = true)]
    quiet: bool,

    /// Enable verbose/debug logging
    #[arg(long, short, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the scheduler in the foreground
    Run {
        /// Also serve the HTTP REST API on this port
        #[arg(long)]
        http_port: Option<u16>,
    },
    /// Run one check cycle now and print the changes
    Check,
    /// Manage monitored entities
    Entities {
        #[command(subcommand)]
        action: EntitiesAction,
    },
    /// Show stored baselines (all, or one entity in detail)
    Baselines {
        /// Entity id
        id: Option<String>,
    },
    /// Show past snapshots of one entity
    History {
        /// Entity id
        id: String,
        /// Maximum number of snapshots
        #[arg(long, default_value = "10")]
        limit: usize,
    },
    /// Generate shell completion scripts
    Completions {
        /// Shell type (bash, zsh, fish, powershell)
        shell: Shell,
    },
}

#[derive(Subcommand)]
enum EntitiesAction {
    /// List configured entities
    List,
    /// Add or update an entity
    Add {
        /// Stable identifier
        id: String,
        /// Display name
        name: String,
        /// Places API place_id
        #[arg(long)]
        place_id: Option<String>,
        /// Public listing page URL
        #[arg(long)]
        page_url: Option<String>,
    },
    /// Resume checks for an entity
    Enable { id: String },
    /// Pause checks for an entity
    Disable { id: String },
}

fn init_tracing(verbose: bool, json: bool) {
    let default = if verbose {
        "reviewtrack=debug,reviewtrack_runtime=debug"
    } else {
        "reviewtrack=info,reviewtrack_runtime=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.json_logs);
    output::init(output::OutputMode {
        json: cli.json,
        quiet: cli.quiet,
    });

    let result = match cli.command {
        Commands::Run { http_port } => cli::run_cmd::run(http_port).await,
        Commands::Check => cli::check_cmd::run().await,
        Commands::Entities { action } => match action {
            EntitiesAction::List => cli::entities_cmd::run_list(),
            EntitiesAction::Add {
                id,
                name,
                place_id,
                page_url,
            } => cli::entities_cmd::run_add(&id, &name, place_id.as_deref(), page_url.as_deref()),
            EntitiesAction::Enable { id } => cli::entities_cmd::run_set_active(&id, true),
            EntitiesAction::Disable { id } => cli::entities_cmd::run_set_active(&id, false),
        },
        Commands::Baselines { id } => cli::baselines_cmd::run_show(id.as_deref()),
        Commands::History { id, limit } => cli::baselines_cmd::run_history(&id, limit),
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "reviewtrack", &mut std::io::stdout());
            Ok(())
        }
    };

    // Consistent exit codes: 0=success, 1=error
    if let Err(e) = &result {
        if output::is_json() {
            output::print_json(&serde_json::json!({
                "error": true,
                "message": format!("{e:#}"),
            }));
        } else if !output::is_quiet() {
            eprintln!("  Error: {e:#}");
        }
        std::process::exit(1);
    }

    result
}
