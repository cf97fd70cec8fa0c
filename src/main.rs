use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use skymark::app::AppContext;
use skymark::cli::{commands, Cli, Commands};
use skymark::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let mut config = Config::load()?;

    match cli.command {
        Commands::Login { code } => {
            let ctx = AppContext::new(config)?;
            commands::login(&ctx, code.as_deref()).await?;
        }
        Commands::Logout => {
            let ctx = AppContext::new(config)?;
            commands::logout(&ctx)?;
        }
        Commands::Once { dry_run, dump_feed } => {
            config.poll.dry_run |= dry_run;
            config.poll.dump_feed |= dump_feed;
            let ctx = AppContext::new(config)?;
            commands::run_once(&ctx).await?;
        }
        Commands::Run { interval, dry_run } => {
            config.poll.dry_run |= dry_run;
            let ctx = AppContext::new(config)?;
            commands::run_scheduler(Arc::new(ctx), interval.as_deref()).await?;
        }
        Commands::Status => {
            let ctx = AppContext::new(config)?;
            commands::status(&ctx)?;
        }
        Commands::Check => {
            let ctx = AppContext::new(config)?;
            commands::check(&ctx).await?;
        }
    }

    Ok(())
}
