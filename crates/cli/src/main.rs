//! Gongbu CLI — the main entry point.
//!
//! Commands:
//! - `init-config` — Write a default config file
//! - `serve`       — Start the HTTP API
//! - `guide`       — Generate a study guide, optionally continuing into chat
//! - `chat`        — Talk to the tutor without a guide
//! - `collect`     — Admin content and concept collection
//! - `migrate`     — Create the database schema
//! - `role`        — Show or set a user's role
//! - `doctor`      — Diagnose configuration and connectivity

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "gongbu",
    about = "Gongbu — AI study guides for Korean middle and high school exams",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default config file
    InitConfig {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },

    /// Start the HTTP API server
    Serve {
        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Generate a study guide for a unit range
    Guide {
        /// Subject, e.g. 과학
        #[arg(short, long)]
        subject: String,

        /// School level: middle or high
        #[arg(short, long, default_value = "middle")]
        level: String,

        /// Grade, e.g. 2
        #[arg(short, long)]
        grade: String,

        /// Unit range, e.g. "1-3" or "2단원"
        #[arg(short, long)]
        unit: String,

        /// Textbook publisher
        #[arg(short, long)]
        publisher: Option<String>,

        /// Print the raw JSON result instead of a summary
        #[arg(long)]
        json: bool,

        /// Continue into a tutor chat about the generated guide
        #[arg(long)]
        chat: bool,
    },

    /// Chat with the tutor
    Chat {
        /// Send a single message instead of entering interactive mode
        #[arg(short, long)]
        message: Option<String>,

        /// Override the tutor's system instruction
        #[arg(long)]
        system: Option<String>,
    },

    /// Collect textbook content or concepts (admin)
    Collect {
        #[command(subcommand)]
        action: commands::collect::CollectAction,
    },

    /// Create the database schema
    Migrate {
        /// Database URL; defaults to the configured one
        #[arg(long, env = "GONGBU_DATABASE_URL")]
        database_url: Option<String>,
    },

    /// Show or set a user's role
    Role {
        /// User id as sent in the x-user-id header
        user_id: String,

        /// New role: student or admin
        #[arg(long)]
        set: Option<String>,
    },

    /// Diagnose configuration and connectivity
    Doctor,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    match cli.command {
        Commands::InitConfig { force } => commands::init_config::run(force).await?,
        Commands::Serve { port } => commands::serve::run(port).await?,
        Commands::Guide {
            subject,
            level,
            grade,
            unit,
            publisher,
            json,
            chat,
        } => {
            let args = commands::guide::GuideArgs {
                subject,
                level,
                grade,
                unit,
                publisher,
                json,
                chat,
            };
            commands::guide::run(args).await?
        }
        Commands::Chat { message, system } => commands::chat::run(message, system).await?,
        Commands::Collect { action } => commands::collect::run(action).await?,
        Commands::Migrate { database_url } => commands::migrate::run(database_url).await?,
        Commands::Role { user_id, set } => commands::role::run(user_id, set).await?,
        Commands::Doctor => commands::doctor::run().await?,
    }

    Ok(())
}
