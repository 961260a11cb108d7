//! docassist CLI — the main entry point.
//!
//! Commands:
//! - `onboard`    — Write a default config file
//! - `chat`       — Interactive chat or single-message mode
//! - `scenarios`  — Run the built-in check scenarios
//! - `docs`       — Browse the document collection without a model
//! - `sessions`   — Inspect and prune stored sessions

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "docassist",
    about = "Document assistant for invoices, contracts and reports",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Keep session state in memory instead of the SQLite checkpoint file
    #[arg(long, global = true)]
    ephemeral: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default configuration file
    Onboard,

    /// Chat with the document assistant
    Chat {
        /// Send a single message instead of entering interactive mode
        #[arg(short, long)]
        message: Option<String>,

        /// Resume an existing session instead of starting a new one
        #[arg(long)]
        session: Option<String>,

        /// User id recorded on new sessions
        #[arg(long, default_value = "default_user", env = "DOCASSIST_USER")]
        user: String,
    },

    /// Run the calculator, retrieval and (with an API key) conversation scenarios
    Scenarios,

    /// Browse the document collection
    Docs {
        #[command(subcommand)]
        action: DocsAction,
    },

    /// Inspect stored sessions
    Sessions {
        #[command(subcommand)]
        action: SessionsAction,
    },
}

#[derive(Subcommand)]
enum DocsAction {
    /// List every document
    List,
    /// Search documents by keyword, type or amount
    Search {
        /// Keyword, or document type with --by type
        query: Option<String>,
        /// keyword, type or amount
        #[arg(long, default_value = "keyword")]
        by: String,
        #[arg(long)]
        min: Option<f64>,
        #[arg(long)]
        max: Option<f64>,
        #[arg(short = 'k', long)]
        top_k: Option<usize>,
    },
    /// Print one document
    Read { id: String },
    /// Collection statistics
    Stats,
}

#[derive(Subcommand)]
enum SessionsAction {
    /// List stored sessions
    List,
    /// Show the latest state of a session
    Show {
        id: String,
        /// Print the raw state as JSON
        #[arg(long)]
        json: bool,
    },
    /// Keep only the newest checkpoints of a session
    Prune {
        id: String,
        #[arg(long, default_value_t = 1)]
        keep: usize,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // A missing .env is fine
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    let opts = commands::GlobalOpts {
        verbose: cli.verbose,
        ephemeral: cli.ephemeral,
    };

    match cli.command {
        Commands::Onboard => commands::onboard::run().await?,
        Commands::Chat {
            message,
            session,
            user,
        } => commands::chat::run(opts, message, session, user).await?,
        Commands::Scenarios => commands::scenarios::run(opts).await?,
        Commands::Docs { action } => match action {
            DocsAction::List => commands::docs::list()?,
            DocsAction::Search {
                query,
                by,
                min,
                max,
                top_k,
            } => commands::docs::search(query.as_deref(), &by, min, max, top_k)?,
            DocsAction::Read { id } => commands::docs::read(&id)?,
            DocsAction::Stats => commands::docs::stats()?,
        },
        Commands::Sessions { action } => match action {
            SessionsAction::List => commands::sessions::list(opts).await?,
            SessionsAction::Show { id, json } => commands::sessions::show(opts, &id, json).await?,
            SessionsAction::Prune { id, keep } => {
                commands::sessions::prune(opts, &id, keep).await?
            }
        },
    }

    Ok(())
}
