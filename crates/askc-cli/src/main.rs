mod ask_cmd;
mod config;
mod editor;
mod logs_cmd;
mod render;
mod script;
mod usage_cmd;

#[cfg(test)]
mod test_util;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use askc_db::pool;

use ask_cmd::AskFlags;
use config::{AskcConfig, CliOverrides};

#[derive(Parser)]
#[command(
    name = "askc",
    about = "Ask a question from the terminal and get an answer from an AI agent CLI"
)]
struct Cli {
    /// Backend to ask: claude, gemini, or opencode (overrides ASKC_BACKEND)
    #[arg(long)]
    backend: Option<String>,

    /// Print the answer only: no status lines, cost, or suggestion prompt
    #[arg(short = 'p', long = "print")]
    print: bool,

    /// Echo every raw backend record to stderr
    #[arg(long)]
    debug: bool,

    /// Kill the backend if it has not finished after this many seconds
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,

    /// Query log database path (overrides ASKC_DATABASE_PATH)
    #[arg(long, global = true, value_name = "PATH")]
    database: Option<PathBuf>,

    /// The question. Opens $EDITOR when omitted. Flags go before it.
    #[arg(trailing_var_arg = true)]
    question: Vec<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show recently asked questions
    Logs {
        /// Number of queries to show
        #[arg(short = 'n', default_value_t = 5)]
        n: u32,
        /// Show one query in full
        #[arg(long)]
        id: Option<i64>,
    },
    /// Show cost per day for the last week and the 30-day total
    Usage,
    /// Write an askc config file with the defaults spelled out
    Init {
        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },
}

/// Execute the `askc init` command: write config file.
fn cmd_init(force: bool) -> anyhow::Result<()> {
    let path = config::config_path();

    if path.exists() && !force {
        anyhow::bail!(
            "config file already exists at {}\nUse --force to overwrite.",
            path.display()
        );
    }

    let cfg = config::ConfigFile::starter();
    config::save_config_to(&path, &cfg)?;

    println!("Config written to {}", path.display());
    if let Some(default) = &cfg.backend.default {
        println!("  backend.default = {default}");
    }
    if let Some(db_path) = &cfg.database.path {
        println!("  database.path = {}", db_path.display());
    }

    Ok(())
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let overrides = CliOverrides {
        backend: cli.backend.as_deref(),
        timeout_secs: cli.timeout,
        database: cli.database.as_deref(),
    };

    match cli.command {
        Some(Commands::Init { force }) => cmd_init(force),
        Some(Commands::Logs { n, id }) => {
            let resolved = AskcConfig::resolve(&overrides);
            let db_pool = pool::open(&resolved.db_config).await?;
            let result = logs_cmd::run_logs(&db_pool, n, id).await;
            db_pool.close().await;
            result
        }
        Some(Commands::Usage) => {
            let resolved = AskcConfig::resolve(&overrides);
            let db_pool = pool::open(&resolved.db_config).await?;
            let result = usage_cmd::run_usage(&db_pool).await;
            db_pool.close().await;
            result
        }
        None => {
            let question = if cli.question.is_empty() {
                match editor::question_from_editor().await? {
                    Some(question) => question,
                    None => return Ok(()),
                }
            } else {
                cli.question.join(" ")
            };

            let resolved = AskcConfig::resolve(&overrides);
            let flags = AskFlags {
                print: cli.print,
                debug: cli.debug,
            };
            ask_cmd::run_ask(&resolved, &question, flags).await
        }
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("{e:#}");
        std::process::exit(1);
    }
}
