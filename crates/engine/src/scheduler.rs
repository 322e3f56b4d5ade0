//! Periodic interest accrual driver.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::time::interval;

use crate::Engine;

/// Drives interest accrual for every account on a fixed interval.
///
/// The driver keeps no bookkeeping of its own: idempotence comes entirely
/// from `last_interest_at` on each account, so the check may run arbitrarily
/// often without double-applying interest. One check runs immediately at
/// startup to cover downtime; the interval only bounds how late a due period
/// can be applied.
pub struct InterestScheduler {
    engine: Arc<Engine>,
    check_interval: Duration,
}

impl InterestScheduler {
    pub fn new(engine: Arc<Engine>, check_interval: Duration) -> Self {
        Self {
            engine,
            check_interval,
        }
    }

    /// Runs the check loop forever. The first tick completes immediately.
    pub async fn run(self) {
        tracing::info!(
            "interest scheduler started (checks every {}s)",
            self.check_interval.as_secs()
        );

        let mut ticks = interval(self.check_interval);
        loop {
            ticks.tick().await;
            match self.engine.accrue_all(Utc::now()).await {
                Ok(applied) if !applied.is_empty() => {
                    tracing::info!("applied {} interest transaction(s)", applied.len());
                }
                Ok(_) => {}
                Err(err) => tracing::error!("interest check failed: {err}"),
            }
        }
    }
}
