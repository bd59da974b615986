//! voicecoach CLI: practice roles, dashboard statistics and session start.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "voicecoach", version, about = "Voice interview practice dashboard")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List practice roles
    Roles {
        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Show dashboard statistics across every role
    Stats {
        /// User email (defaults to `user_email` from config)
        #[arg(long)]
        user: Option<String>,

        /// Fetch all evaluations in one request instead of one per role
        #[arg(long)]
        combined: bool,

        /// Output format: text, json, markdown, html
        #[arg(long, default_value = "text")]
        format: String,

        /// Write the report into this directory instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,

        /// Write the report into `output_dir` from config
        #[arg(long)]
        save: bool,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Show one role's evaluation history, newest first
    History {
        /// Role id
        #[arg(long)]
        role: String,

        /// User email (defaults to `user_email` from config)
        #[arg(long)]
        user: Option<String>,

        /// Output format: text, json, markdown
        #[arg(long, default_value = "text")]
        format: String,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Practice session commands
    Session {
        #[command(subcommand)]
        action: SessionCommand,
    },

    /// Create a starter config
    Init,
}

#[derive(Subcommand)]
enum SessionCommand {
    /// Ask the backend to prepare a new practice session
    Start {
        /// Role id
        #[arg(long)]
        role: String,

        /// Candidate name used in the scenario
        #[arg(long)]
        candidate: String,

        /// User email (defaults to `user_email` from config)
        #[arg(long)]
        user: Option<String>,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    let filter = tracing_subscriber::EnvFilter::from_default_env();
    let filter = match "voicecoach=info".parse() {
        Ok(directive) => filter.add_directive(directive),
        Err(_) => filter,
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Roles { config } => commands::roles::execute(config).await,
        Commands::Stats {
            user,
            combined,
            format,
            output,
            save,
            config,
        } => commands::stats::execute(user, combined, format, output, save, config).await,
        Commands::History {
            role,
            user,
            format,
            config,
        } => commands::history::execute(role, user, format, config).await,
        Commands::Session { action } => match action {
            SessionCommand::Start {
                role,
                candidate,
                user,
                config,
            } => commands::session::start(role, candidate, user, config).await,
        },
        Commands::Init => commands::init::execute(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
