use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use rollcall_store::{SqliteStore, SqliteStoreConfig};
use tracing_subscriber::EnvFilter;

mod commands;
mod config;

use commands::Ctx;
use config::CtlConfig;

#[derive(Parser)]
#[command(name = "rollcall")]
#[command(about = "Attendance, leave, and productivity tracker", long_about = None)]
struct Cli {
    /// Alternate config file path.
    #[arg(short, long, global = true)]
    config: Option<std::path::PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start a work session.
    CheckIn {
        user_id: String,
    },

    /// End the open work session and classify the day.
    CheckOut {
        user_id: String,
        #[arg(short, long, help = "What was worked on today")]
        description: Option<String>,
        #[arg(short, long, help = "Activity score 0-100")]
        activity: Option<u32>,
    },

    /// Attendance statistics for one user.
    Stats {
        user_id: String,
        #[command(subcommand)]
        period: StatsPeriod,
    },

    /// Current-month summary across all users.
    Summary,

    /// Hero of the week.
    Hero,

    /// System activity trend over the trailing week.
    Trend,

    /// Task-based productivity rating.
    Rating {
        user_id: String,
        #[arg(short, long, default_value_t = 30)]
        days: u64,
        #[arg(short, long, help = "Persist the rating on the user record")]
        write: bool,
    },

    User {
        #[command(subcommand)]
        action: UserAction,
    },
}

#[derive(Subcommand)]
enum StatsPeriod {
    /// Calendar month containing today.
    Month,
    /// Financial year containing today.
    Year,
}

#[derive(Subcommand)]
enum UserAction {
    Add {
        id: String,
        name: String,
    },
    List,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => CtlConfig::load_from_path(path)?,
        None => CtlConfig::load()?,
    };

    let store =
        Arc::new(SqliteStore::new(SqliteStoreConfig { path: config.store.path.clone() }).await?);
    let ctx = Ctx { store, policy: config.policy };

    match cli.command {
        Commands::CheckIn { user_id } => commands::attendance::check_in(&ctx, &user_id).await?,
        Commands::CheckOut { user_id, description, activity } => {
            commands::attendance::check_out(&ctx, &user_id, description, activity).await?
        }
        Commands::Stats { user_id, period } => match period {
            StatsPeriod::Month => commands::stats::month(&ctx, &user_id).await?,
            StatsPeriod::Year => commands::stats::year(&ctx, &user_id).await?,
        },
        Commands::Summary => commands::stats::summary(&ctx).await?,
        Commands::Hero => commands::stats::hero(&ctx).await?,
        Commands::Trend => commands::stats::trend(&ctx).await?,
        Commands::Rating { user_id, days, write } => {
            commands::stats::rating(&ctx, &user_id, days, write).await?
        }
        Commands::User { action } => match action {
            UserAction::Add { id, name } => commands::user::add(&ctx, &id, &name).await?,
            UserAction::List => commands::user::list(&ctx).await?,
        },
    }

    Ok(())
}
