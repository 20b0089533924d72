use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use gator_core::{storage::Database, Config};

mod commands;

#[derive(Parser)]
#[command(name = "gator")]
#[command(author, version, about = "A command-line RSS feed aggregator")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a user and log in as them
    Register {
        name: String,
    },
    /// Switch to an existing user
    Login {
        name: String,
    },
    /// Delete every user, feed and post
    Reset,
    /// List users
    Users,
    /// Collect feeds forever, one feed per interval (e.g. 30s, 1m, 1h30m)
    Agg {
        time_between_reqs: String,
    },
    /// Add a feed and follow it
    #[command(name = "addfeed")]
    AddFeed {
        name: String,
        url: String,
    },
    /// List all feeds (requires login)
    Feeds,
    /// Follow an existing feed by URL
    Follow {
        url: String,
    },
    /// Stop following a feed
    Unfollow {
        url: String,
    },
    /// List the feeds you follow
    Following,
    /// Show the latest posts from the feeds you follow
    Browse {
        #[arg(default_value_t = 2)]
        limit: u32,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let cli = Cli::parse();

    // Load configuration
    let mut config = Config::load()?;

    // Initialize database
    let db = Database::new(&config).await?;

    match cli.command {
        Commands::Register { name } => commands::users::register(&db, &mut config, &name).await,
        Commands::Login { name } => commands::users::login(&db, &mut config, &name).await,
        Commands::Reset => commands::users::reset(&db).await,
        Commands::Users => commands::users::list(&db, &config).await,
        Commands::Agg { time_between_reqs } => commands::agg::run(db, &time_between_reqs).await,
        Commands::AddFeed { name, url } => commands::feeds::add(&db, &config, &name, &url).await,
        Commands::Feeds => commands::feeds::list(&db, &config).await,
        Commands::Follow { url } => commands::follows::follow(&db, &config, &url).await,
        Commands::Unfollow { url } => commands::follows::unfollow(&db, &config, &url).await,
        Commands::Following => commands::follows::following(&db, &config).await,
        Commands::Browse { limit } => commands::browse::run(&db, &config, limit).await,
    }
}
