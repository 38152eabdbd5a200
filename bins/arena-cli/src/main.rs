mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "arena-cli")]
#[command(about = "Arena CLI - Manage problems, users, and submissions", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add a problem from a JSON document
    AddProblem {
        /// Path to the problem JSON file
        #[arg(short, long)]
        file: String,

        /// Id of the admin creating the problem
        #[arg(short, long)]
        creator: Uuid,

        /// Store without running reference solutions through Judge0
        #[arg(long)]
        skip_verify: bool,
    },

    /// Replace a stored problem, re-verifying its reference solutions
    UpdateProblem {
        /// Id of the problem to replace
        #[arg(short, long)]
        id: Uuid,

        /// Path to the replacement problem JSON file
        #[arg(short, long)]
        file: String,

        /// Store without running reference solutions through Judge0
        #[arg(long)]
        skip_verify: bool,
    },

    /// Register a user
    AddUser {
        /// First name
        #[arg(short, long)]
        first_name: String,

        /// Email address (stored lowercase)
        #[arg(short, long)]
        email: String,

        /// Last name (optional)
        #[arg(short, long)]
        last_name: Option<String>,

        /// Grant the admin role
        #[arg(long)]
        admin: bool,

        /// Linked Google account id (optional)
        #[arg(long)]
        google_id: Option<String>,
    },

    /// List all stored problems
    ListProblems,

    /// List supported languages and their Judge0 ids
    ListLangs,

    /// Show a user's submissions for a problem, newest first
    Submissions {
        /// User id
        #[arg(short, long)]
        user: Uuid,

        /// Problem id
        #[arg(short, long)]
        problem: Uuid,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Library logs stay quiet unless RUST_LOG asks for them
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::AddProblem {
            file,
            creator,
            skip_verify,
        } => {
            commands::add_problem(&file, creator, !skip_verify).await?;
        }
        Commands::UpdateProblem {
            id,
            file,
            skip_verify,
        } => {
            commands::update_problem(&file, id, !skip_verify).await?;
        }
        Commands::AddUser {
            first_name,
            email,
            last_name,
            admin,
            google_id,
        } => {
            commands::add_user(&first_name, &email, last_name, admin, google_id).await?;
        }
        Commands::ListProblems => {
            commands::list_problems().await?;
        }
        Commands::ListLangs => {
            commands::list_languages();
        }
        Commands::Submissions { user, problem } => {
            commands::show_submissions(user, problem).await?;
        }
    }

    Ok(())
}
