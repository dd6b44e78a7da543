//! Hearth CLI - operator tool for the assistant proposal and trust engine.
//!
//! Every command opens the configured store, builds an engine over it, runs
//! one operation for one household, and exits. With the `surrealkv` backend,
//! proposals, trust rows and the audit log persist between invocations.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};
use hearth_config::Config;
use hearth_core::RiskLevel;
use hearth_telemetry::{LogConfig, LogFormat, RequestContext, RequestGuard};
use tracing::Instrument as _;

mod commands;
mod context;
mod formatter;
mod theme;

use commands::{audit, config, functions, intents, proposals, trust};
use context::{CliContext, ContextOptions};
use formatter::OutputFormat;

/// Hearth - household assistant proposal and trust engine
#[derive(Parser)]
#[command(name = "hearth")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output format: pretty (default) or json
    #[arg(long, global = true, default_value = "pretty")]
    format: String,

    /// Path to an explicit configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Directory of the persistent store
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Household id (defaults to the store's default household)
    #[arg(long, global = true, env = "HEARTH_HOUSEHOLD")]
    household: Option<String>,

    /// Acting member's user id
    #[arg(long, global = true, env = "HEARTH_USER")]
    user: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List catalog functions with their effective risk
    Functions,

    /// Check whether an intent would run without confirmation
    Evaluate {
        /// Function name
        function: String,
        /// JSON arguments
        arguments: Option<String>,
    },

    /// Run an intent: execute it if trusted, otherwise propose it
    Run {
        /// Function name
        function: String,
        /// JSON arguments
        arguments: Option<String>,
        /// Assistant session id
        #[arg(long)]
        session: Option<String>,
    },

    /// Propose one or more intents for approval
    Propose {
        /// JSON intent or array of intents (`{"name": ..., "arguments": {...}}`)
        intents: String,
        /// Assistant session id
        #[arg(long)]
        session: Option<String>,
        /// Summary shown to members
        #[arg(long)]
        summary: Option<String>,
    },

    /// Inspect and decide proposals
    Proposals {
        #[command(subcommand)]
        command: ProposalCommands,
    },

    /// Execute an approved proposal
    Execute {
        /// Proposal id
        id: String,
    },

    /// Undo an executed action
    Undo {
        /// Audit entry id
        id: String,
    },

    /// View the AI audit log
    Audit {
        #[command(subcommand)]
        command: AuditCommands,
    },

    /// View and change household trust settings
    Trust {
        #[command(subcommand)]
        command: TrustCommands,
    },

    /// View and validate configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum ProposalCommands {
    /// List pending proposals
    List {
        /// Include resolved proposals
        #[arg(long)]
        all: bool,
    },
    /// Show a proposal
    Show {
        /// Proposal id
        id: String,
    },
    /// Approve a proposal, optionally only some actions
    Approve {
        /// Proposal id
        id: String,
        /// Action ids to keep
        #[arg(long, num_args = 1..)]
        select: Vec<String>,
    },
    /// Reject a proposal
    Reject {
        /// Proposal id
        id: String,
    },
    /// Delete resolved proposals older than N seconds
    Purge {
        /// Minimum age in seconds (default: one day)
        #[arg(long, default_value = "86400")]
        older_than: u64,
    },
}

#[derive(Subcommand)]
enum AuditCommands {
    /// List audit entries
    List {
        /// Only entries that can still be undone
        #[arg(long)]
        undoable: bool,
    },
    /// Show one audit entry
    Show {
        /// Audit entry id
        id: String,
    },
}

#[derive(Subcommand)]
enum TrustCommands {
    /// Show trust settings
    Show,
    /// Change trust settings
    Set {
        /// Highest risk level executed without confirmation
        #[arg(long)]
        threshold: Option<RiskLevel>,
        /// Executions allowed per window
        #[arg(long)]
        max_actions: Option<u32>,
        /// Window length in seconds
        #[arg(long)]
        window_secs: Option<u64>,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show resolved configuration with source annotations
    Show {
        /// Show only a specific section (e.g. trust, assistant)
        #[arg(short, long)]
        section: Option<String>,
    },
    /// Validate the current configuration
    Validate,
}

impl Commands {
    fn operation(&self) -> &'static str {
        match self {
            Self::Functions => "functions",
            Self::Evaluate { .. } => "evaluate",
            Self::Run { .. } => "run",
            Self::Propose { .. } => "propose",
            Self::Proposals { .. } => "proposals",
            Self::Execute { .. } => "execute",
            Self::Undo { .. } => "undo",
            Self::Audit { .. } => "audit",
            Self::Trust { .. } => "trust",
            Self::Config { .. } => "config",
        }
    }
}

fn init_logging(config: Option<&Config>, verbose: bool) {
    let log_config = config
        .and_then(|cfg| LogConfig::from_config(&cfg.logging).ok())
        .unwrap_or_else(|| LogConfig::new("warn").with_format(LogFormat::Compact));
    let log_config = if verbose {
        LogConfig {
            level: "debug".to_owned(),
            ..log_config
        }
    } else {
        log_config
    };
    if let Err(e) = hearth_telemetry::setup_logging(&log_config) {
        eprintln!("Failed to initialize logging: {e}");
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let format = OutputFormat::from_flag(&cli.format);

    let resolved = Config::load(cli.config.as_deref());
    init_logging(resolved.as_ref().ok().map(|r| &r.config), cli.verbose);

    let command = cli.command;
    if let Commands::Config { command } = command {
        let _guard = RequestGuard::new(RequestContext::new("cli").with_operation("config"));
        return handle_config(command, cli.config.as_deref(), format);
    }

    let config = resolved.context("failed to load configuration")?.config;
    let options = ContextOptions {
        data_dir: cli.data_dir.as_deref(),
        household: cli.household.as_deref(),
        user: cli.user.as_deref(),
        format,
    };
    let ctx = CliContext::open(&config, &options).await?;

    let mut request = RequestContext::new("cli")
        .with_household(ctx.household)
        .with_operation(command.operation());
    if let Some(user) = ctx.actor {
        request = request.with_user(user);
    }
    let result = dispatch(&ctx, command, cli.config.as_deref())
        .instrument(request.span())
        .await;
    tracing::debug!(
        elapsed_ms = request.elapsed_ms(),
        ok = result.is_ok(),
        "command finished"
    );

    ctx.close().await?;
    result
}

async fn dispatch(ctx: &CliContext, command: Commands, explicit: Option<&Path>) -> Result<()> {
    match command {
        Commands::Functions => functions::list_functions(ctx),
        Commands::Evaluate {
            function,
            arguments,
        } => intents::evaluate(ctx, &function, arguments.as_deref()).await,
        Commands::Run {
            function,
            arguments,
            session,
        } => intents::run(ctx, &function, arguments.as_deref(), session.as_deref()).await,
        Commands::Propose {
            intents,
            session,
            summary,
        } => proposals::propose(ctx, session.as_deref(), &intents, summary).await,
        Commands::Proposals { command } => handle_proposals(ctx, command).await,
        Commands::Execute { id } => proposals::execute(ctx, &id).await,
        Commands::Undo { id } => audit::undo(ctx, &id).await,
        Commands::Audit { command } => match command {
            AuditCommands::List { undoable } => audit::list_entries(ctx, undoable).await,
            AuditCommands::Show { id } => audit::show_entry(ctx, &id).await,
        },
        Commands::Trust { command } => match command {
            TrustCommands::Show => trust::show_trust(ctx).await,
            TrustCommands::Set {
                threshold,
                max_actions,
                window_secs,
            } => trust::set_trust(ctx, threshold, max_actions, window_secs).await,
        },
        Commands::Config { command } => handle_config(command, explicit, ctx.format),
    }
}

async fn handle_proposals(ctx: &CliContext, command: ProposalCommands) -> Result<()> {
    match command {
        ProposalCommands::List { all } => proposals::list_proposals(ctx, all).await,
        ProposalCommands::Show { id } => proposals::show_proposal(ctx, &id).await,
        ProposalCommands::Approve { id, select } => proposals::approve(ctx, &id, &select).await,
        ProposalCommands::Reject { id } => proposals::reject(ctx, &id).await,
        ProposalCommands::Purge { older_than } => proposals::purge(ctx, older_than).await,
    }
}

fn handle_config(
    command: ConfigCommands,
    explicit: Option<&Path>,
    format: OutputFormat,
) -> Result<()> {
    match command {
        ConfigCommands::Show { section } => {
            let as_format = if format.is_json() { "json" } else { "toml" };
            config::show_config(explicit, as_format, section.as_deref())
        },
        ConfigCommands::Validate => config::validate_config(explicit),
    }
}
