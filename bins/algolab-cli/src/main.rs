mod commands;
mod render;

use algolab_common::config::ClientConfig;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "algolab")]
#[command(about = "algolab CLI - Run and submit solutions, manage your session", long_about = None)]
struct Cli {
    /// JSON config file (api_url, poll_interval_ms, request_timeout_ms, state_dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the API base URL
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Emit logs as JSON lines
    #[arg(long, global = true, default_value = "false")]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in with email and password
    Login {
        #[arg(short, long)]
        email: String,

        /// Password (prompted when omitted)
        #[arg(short, long)]
        password: Option<String>,
    },

    /// Finish a sign-in that requires a verification code
    Mfa {
        #[arg(short, long)]
        code: String,
    },

    /// Sign out and clear local session data
    Logout,

    /// Show the current session state
    Whoami,

    /// List problems
    Problems {
        /// Match against title or slug
        #[arg(short, long)]
        search: Option<String>,

        /// easy, medium or hard
        #[arg(short, long)]
        difficulty: Option<String>,

        #[arg(short, long)]
        tag: Option<String>,

        #[arg(long, default_value = "1")]
        page: usize,

        #[arg(long, default_value = "20")]
        per_page: usize,

        /// Ignore the local cache
        #[arg(long, default_value = "false")]
        refresh: bool,
    },

    /// Run code against a problem's sample testcases
    Run {
        /// Problem slug
        #[arg(short, long)]
        problem: String,

        /// Source file
        #[arg(short, long)]
        file: PathBuf,

        /// Give up after this many seconds
        #[arg(long)]
        timeout: Option<u64>,
    },

    /// Submit code for grading
    Submit {
        /// Problem slug
        #[arg(short, long)]
        problem: String,

        /// Source file
        #[arg(short, long)]
        file: PathBuf,

        /// Language (inferred from the file extension when omitted)
        #[arg(short, long)]
        language: Option<String>,

        /// Give up after this many seconds
        #[arg(long)]
        timeout: Option<u64>,
    },
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));

    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
    }
}

fn load_config(cli: &Cli) -> Result<ClientConfig> {
    let mut config = match &cli.config {
        Some(path) => ClientConfig::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => ClientConfig::from_env().context("Invalid ALGOLAB_* environment")?,
    };
    if let Some(url) = &cli.api_url {
        config.api_url = url.clone();
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.json);

    let config = load_config(&cli)?;
    tracing::debug!(api_url = %config.api_url, state_dir = %config.state_dir.display(), "Configuration loaded");

    let mut ctx = commands::Context::open(config)?;

    let success = match cli.command {
        Commands::Login { email, password } => {
            commands::login(&mut ctx, &email, password).await?;
            true
        }
        Commands::Mfa { code } => {
            commands::verify_mfa(&mut ctx, &code).await?;
            true
        }
        Commands::Logout => {
            commands::logout(&mut ctx).await?;
            true
        }
        Commands::Whoami => {
            commands::whoami(&ctx);
            true
        }
        Commands::Problems {
            search,
            difficulty,
            tag,
            page,
            per_page,
            refresh,
        } => {
            commands::list_problems(
                &ctx,
                search,
                difficulty.as_deref(),
                tag,
                page,
                per_page,
                refresh,
            )
            .await?;
            true
        }
        Commands::Run {
            problem,
            file,
            timeout,
        } => commands::run(&ctx, &problem, &file, timeout.map(Duration::from_secs)).await?,
        Commands::Submit {
            problem,
            file,
            language,
            timeout,
        } => {
            commands::submit(
                &ctx,
                &problem,
                &file,
                language.as_deref(),
                timeout.map(Duration::from_secs),
            )
            .await?
        }
    };

    if !success {
        std::process::exit(1);
    }

    Ok(())
}
