use std::io::{self, BufRead, Write};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::app::{AppContext, Result, SkymarkError};
use crate::bsky::session;
use crate::daemon::{self, Scheduler, SchedulerConfig};
use crate::delivery::{Bookmarker, DeliveryOutcome};

pub async fn login(ctx: &AppContext, code: Option<&str>) -> Result<()> {
    let identifier = &ctx.config.bluesky.identifier;
    let password = &ctx.config.bluesky.password;
    if password.is_empty() {
        return Err(SkymarkError::Config("bluesky.password is not set".into()));
    }

    let session = match ctx.client.login(identifier, password, code).await {
        Ok(session) => session,
        Err(SkymarkError::AuthFactorRequired) => {
            // One interactive retry with the emailed code, then give up.
            let code = prompt("A sign-in code was emailed to the account. Enter it: ")?;
            ctx.client
                .login(identifier, password, Some(code.trim()))
                .await?
        }
        Err(e) => return Err(e),
    };

    session::save_session(ctx.store.as_ref(), ctx.namespace(), &session)?;
    println!("Signed in as @{} ({})", session.handle, session.did);
    Ok(())
}

pub fn logout(ctx: &AppContext) -> Result<()> {
    session::clear_session(ctx.store.as_ref(), ctx.namespace())?;
    println!("Session cleared");
    Ok(())
}

pub async fn run_once(ctx: &AppContext) -> Result<()> {
    let delivered = ctx.run_cycle(&CancellationToken::new()).await?;
    println!("Delivered {} new posts", delivered);
    Ok(())
}

pub async fn run_scheduler(ctx: Arc<AppContext>, interval: Option<&str>) -> Result<()> {
    let mut config = SchedulerConfig {
        interval_secs: ctx.config.poll.interval_secs,
        ..SchedulerConfig::default()
    };
    if let Some(value) = interval {
        config.interval_secs =
            SchedulerConfig::parse_interval(value).map_err(SkymarkError::Config)?;
    }

    let scheduler = Scheduler::new(ctx, config);
    daemon::cancel_on_signals(scheduler.cancel_token());
    scheduler.run().await;
    Ok(())
}

pub fn status(ctx: &AppContext) -> Result<()> {
    match session::load_session(ctx.store.as_ref(), ctx.namespace())? {
        Some(session) => println!("Session: @{} ({})", session.handle, session.did),
        None => println!("Session: none (run `skymark login`)"),
    }

    println!(
        "Polling every {}, thread depth {}",
        SchedulerConfig::format_interval(ctx.config.poll.interval_secs),
        ctx.config.poll.thread_depth
    );
    if ctx.config.poll.dry_run {
        println!("Dry run is enabled in the config");
    }
    Ok(())
}

pub async fn check(ctx: &AppContext) -> Result<()> {
    match ctx.bookmarker.ping().await? {
        DeliveryOutcome::Accepted => println!("Bookmarking endpoint OK"),
        DeliveryOutcome::Rejected(status) => {
            println!("Bookmarking endpoint rejected the ping (HTTP {status})")
        }
    }
    Ok(())
}

fn prompt(message: &str) -> Result<String> {
    print!("{message}");
    io::stdout().flush()?;

    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line)
}
