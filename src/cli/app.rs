//! Main CLI application structure

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use super::output::{Output, OutputFormat};
use super::{eval_cmd, group_cmd};
use crate::query::UngroupedPlacement;
use crate::storage::Config;

/// Environment variable holding the log filter used with `--verbose`
pub const LOG_ENV: &str = "TASKFN_LOG";

#[derive(Parser)]
#[command(name = "taskfn")]
#[command(author, version, about = "Group, sort and filter tasks with single-line expressions")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output format (defaults to the configured format, then text)
    #[arg(long, short = 'f', global = true)]
    pub format: Option<OutputFormat>,

    /// Enable verbose output for debugging
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Filter, sort and group tasks
    Group {
        /// YAML or JSON task file
        #[arg(long, short = 't')]
        tasks: PathBuf,

        /// Group by the result of an expression (repeatable, outermost first)
        #[arg(long = "group", short = 'g', value_name = "EXPR")]
        groups: Vec<String>,

        /// Sort by the result of an expression (repeatable)
        #[arg(long = "sort", short = 's', value_name = "EXPR")]
        sorts: Vec<String>,

        /// Keep tasks for which the expression is true (repeatable)
        #[arg(long = "filter", value_name = "EXPR")]
        filters: Vec<String>,

        /// Query file with `group by function`, `sort by function` and
        /// `filter by function` lines, applied before the flags
        #[arg(long, short = 'q')]
        query: Option<PathBuf>,

        /// Evaluation time, e.g. `2023-06-10 20:00` (defaults to now)
        #[arg(long)]
        now: Option<String>,

        /// Where tasks without a heading go
        #[arg(long, value_enum)]
        ungrouped: Option<UngroupedPlacement>,
    },

    /// Print an expression's value for every task
    Eval {
        /// YAML or JSON task file
        #[arg(long, short = 't')]
        tasks: PathBuf,

        /// Expression to evaluate
        expression: String,

        /// Evaluation time, e.g. `2023-06-10 20:00` (defaults to now)
        #[arg(long)]
        now: Option<String>,
    },

    /// Compile expressions without evaluating them
    Check {
        /// Expressions to compile
        #[arg(required = true)]
        expressions: Vec<String>,
    },
}

/// Installs a stderr log subscriber when `--verbose` is set
fn init_tracing(verbose: bool) {
    if !verbose {
        return;
    }
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("taskfn=debug"));
    // A subscriber may already be installed when embedded.
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(filter)
        .try_init();
}

/// Main entry point for the CLI
pub fn run() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = Config::load()?;
    let format = cli.format.unwrap_or_else(|| config.default_format.into());
    let output = Output::new(format, cli.verbose);

    output.verbose("taskfn starting");
    if let Some(root) = &config.project_root {
        output.verbose_ctx("config", &format!("Using project at: {}", root.display()));
    }

    match cli.command {
        Commands::Group {
            tasks,
            groups,
            sorts,
            filters,
            query,
            now,
            ungrouped,
        } => {
            let request = group_cmd::GroupRequest {
                tasks,
                groups,
                sorts,
                filters,
                query,
                now,
                ungrouped: ungrouped.unwrap_or(config.ungrouped),
            };
            group_cmd::run(&request, &config, &output)?
        }

        Commands::Eval {
            tasks,
            expression,
            now,
        } => eval_cmd::eval(&tasks, &expression, now.as_deref(), &config, &output)?,

        Commands::Check { expressions } => eval_cmd::check(&expressions, &output)?,
    }

    Ok(())
}
