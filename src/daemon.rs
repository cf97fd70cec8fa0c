//! Poll scheduler driving delivery cycles on a fixed interval.
//!
//! A cycle that fails is logged at this boundary and the next one is still
//! scheduled; transient failures must not kill the long-running agent.
//! Shutdown is cooperative: it interrupts the inter-cycle sleep immediately
//! and is otherwise honored at the pipeline's per-post yield points.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::app::AppContext;

/// Scheduler configuration.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Seconds between cycles.
    pub interval_secs: u64,
    /// Whether to run a cycle immediately on start.
    pub run_on_start: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval_secs: 60,
            run_on_start: true,
        }
    }
}

impl SchedulerConfig {
    /// Parse an interval string like "60s", "5m", "1h", "1d".
    pub fn parse_interval(s: &str) -> Result<u64, String> {
        let s = s.trim().to_lowercase();

        if let Some(hours) = s.strip_suffix('h') {
            hours
                .parse::<u64>()
                .map(|h| h * 3600)
                .map_err(|_| format!("Invalid hours: {}", hours))
        } else if let Some(minutes) = s.strip_suffix('m') {
            minutes
                .parse::<u64>()
                .map(|m| m * 60)
                .map_err(|_| format!("Invalid minutes: {}", minutes))
        } else if let Some(days) = s.strip_suffix('d') {
            days.parse::<u64>()
                .map(|d| d * 86400)
                .map_err(|_| format!("Invalid days: {}", days))
        } else if let Some(secs) = s.strip_suffix('s') {
            secs.parse::<u64>()
                .map_err(|_| format!("Invalid seconds: {}", secs))
        } else {
            s.parse::<u64>()
                .map_err(|_| format!("Invalid interval: {}. Use format like '60s', '5m', '1h'", s))
        }
    }

    /// Format an interval for display.
    pub fn format_interval(secs: u64) -> String {
        if secs >= 86400 && secs % 86400 == 0 {
            format!("{}d", secs / 86400)
        } else if secs >= 3600 && secs % 3600 == 0 {
            format!("{}h", secs / 3600)
        } else if secs >= 60 && secs % 60 == 0 {
            format!("{}m", secs / 60)
        } else {
            format!("{}s", secs)
        }
    }
}

/// Drives delivery cycles until the cancellation token fires.
pub struct Scheduler {
    ctx: Arc<AppContext>,
    config: SchedulerConfig,
    cancel: CancellationToken,
}

impl Scheduler {
    pub fn new(ctx: Arc<AppContext>, config: SchedulerConfig) -> Self {
        Self {
            ctx,
            config,
            cancel: CancellationToken::new(),
        }
    }

    /// Token observed by the loop and handed to the pipeline.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Runs until cancelled. Returns the number of cycles run.
    pub async fn run(&self) -> u64 {
        info!(
            interval = %SchedulerConfig::format_interval(self.config.interval_secs),
            "scheduler started"
        );

        let cycles = run_loop(
            &self.cancel,
            Duration::from_secs(self.config.interval_secs),
            self.config.run_on_start,
            || self.run_cycle_guarded(),
        )
        .await;

        info!(cycles, "scheduler stopped");
        cycles
    }

    async fn run_cycle_guarded(&self) {
        match self.ctx.run_cycle(&self.cancel).await {
            Ok(count) => {
                if count > 0 {
                    info!(count, "delivery cycle complete");
                }
            }
            Err(e) => error!(error = %e, "delivery cycle failed"),
        }
    }
}

/// The cycle/sleep state machine, separated from the context wiring so the
/// loop semantics are testable with a plain closure.
async fn run_loop<F, Fut>(
    cancel: &CancellationToken,
    interval: Duration,
    run_on_start: bool,
    mut cycle: F,
) -> u64
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ()>,
{
    let mut cycles = 0u64;

    if cancel.is_cancelled() {
        return cycles;
    }

    if run_on_start {
        cycle().await;
        cycles += 1;
    }

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(interval) => {}
        }
        cycle().await;
        cycles += 1;
    }

    cycles
}

/// Cancels the token on SIGINT or SIGTERM.
pub fn cancel_on_signals(cancel: CancellationToken) {
    tokio::spawn(async move {
        let ctrl_c = tokio::signal::ctrl_c();

        #[cfg(unix)]
        {
            let mut sigterm =
                tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                    .expect("Failed to set up SIGTERM handler");
            tokio::select! {
                _ = ctrl_c => {},
                _ = sigterm.recv() => {},
            }
        }

        #[cfg(not(unix))]
        {
            let _ = ctrl_c.await;
        }

        info!("shutdown signal received");
        cancel.cancel();
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};

    #[test]
    fn test_parse_interval() {
        assert_eq!(SchedulerConfig::parse_interval("1h").unwrap(), 3600);
        assert_eq!(SchedulerConfig::parse_interval("30m").unwrap(), 1800);
        assert_eq!(SchedulerConfig::parse_interval("1d").unwrap(), 86400);
        assert_eq!(SchedulerConfig::parse_interval("60s").unwrap(), 60);
        assert_eq!(SchedulerConfig::parse_interval("3600").unwrap(), 3600);
        assert!(SchedulerConfig::parse_interval("invalid").is_err());
    }

    #[test]
    fn test_format_interval() {
        assert_eq!(SchedulerConfig::format_interval(3600), "1h");
        assert_eq!(SchedulerConfig::format_interval(1800), "30m");
        assert_eq!(SchedulerConfig::format_interval(86400), "1d");
        assert_eq!(SchedulerConfig::format_interval(90), "90s");
        assert_eq!(SchedulerConfig::format_interval(60), "1m");
    }

    #[tokio::test]
    async fn test_precancelled_loop_runs_no_cycles() {
        let cancel = CancellationToken::new();
        cancel.cancel();

        let runs = AtomicU64::new(0);
        let cycles = run_loop(&cancel, Duration::from_millis(1), true, || async {
            runs.fetch_add(1, Ordering::SeqCst);
        })
        .await;

        assert_eq!(cycles, 0);
        assert_eq!(runs.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_cancellation_during_cycle_stops_the_loop() {
        let cancel = CancellationToken::new();
        let runs = AtomicU64::new(0);

        let cycles = run_loop(&cancel, Duration::from_millis(1), true, || async {
            if runs.fetch_add(1, Ordering::SeqCst) + 1 == 3 {
                cancel.cancel();
            }
        })
        .await;

        assert_eq!(cycles, 3);
        assert_eq!(runs.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_loop_without_initial_run_waits_for_interval() {
        let cancel = CancellationToken::new();
        let runs = AtomicU64::new(0);

        let cycles = run_loop(&cancel, Duration::from_millis(1), false, || async {
            runs.fetch_add(1, Ordering::SeqCst);
            cancel.cancel();
        })
        .await;

        assert_eq!(cycles, 1);
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }
}
