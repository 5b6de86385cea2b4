// src/pipeline/monitor.rs

//! Loop controller.
//!
//! Alternates between a fetching cycle and a timed sleep until Ctrl-C.
//! A failed cycle is logged and retried after a growing delay instead of
//! ending the process.

use std::future::Future;
use std::time::Duration;

use crate::error::Result;
use crate::models::MonitorConfig;
use crate::pipeline::cycle::{Cycle, CycleReport};

/// Runs [`Cycle`]s on a fixed cadence.
pub struct Monitor<'a> {
    cycle: Cycle<'a>,
    consecutive_failures: u32,
}

impl<'a> Monitor<'a> {
    pub fn new(cycle: Cycle<'a>) -> Self {
        Self {
            cycle,
            consecutive_failures: 0,
        }
    }

    fn settings(&self) -> &MonitorConfig {
        &self.cycle.config.monitor
    }

    /// Run one cycle and return how long to wait before the next one.
    pub async fn tick(&mut self) -> Duration {
        match self.cycle.run().await {
            Ok(report) => {
                self.consecutive_failures = 0;
                log_report(&report);
                self.settings().interval()
            }
            Err(error) => {
                self.consecutive_failures += 1;
                let delay = self.settings().failure_delay(self.consecutive_failures);
                log::error!(
                    "Cycle failed ({} in a row): {}. Retrying in {:?}",
                    self.consecutive_failures,
                    error,
                    delay
                );
                delay
            }
        }
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    /// Run until interrupted by Ctrl-C.
    pub async fn run_forever(&mut self) -> Result<()> {
        self.run_until(tokio::signal::ctrl_c()).await
    }

    /// Run until `shutdown` resolves, whether mid-cycle or asleep.
    ///
    /// An interrupted cycle is dropped where it stands; writes already made
    /// are kept.
    pub async fn run_until<S>(&mut self, shutdown: S) -> Result<()>
    where
        S: Future<Output = std::io::Result<()>>,
    {
        log::info!(
            "Monitoring {} every {}s",
            self.cycle.config.site.base_url,
            self.settings().interval_secs
        );

        tokio::pin!(shutdown);

        loop {
            let delay = tokio::select! {
                delay = self.tick() => delay,
                signal = &mut shutdown => {
                    signal?;
                    log::info!("Interrupted during a cycle, stopping monitor");
                    return Ok(());
                }
            };
            log::debug!("Sleeping for {:?}", delay);

            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                signal = &mut shutdown => {
                    signal?;
                    log::info!("Interrupted, stopping monitor");
                    return Ok(());
                }
            }
        }
    }
}

fn log_report(report: &CycleReport) {
    log::info!(
        "Cycle complete: {} bounties, {} differences, {} untracked, {} sent, {} failed{}",
        report.bounty_count,
        report.difference_count,
        report.new_project_count,
        report.notifications_sent,
        report.notifications_failed,
        if report.initialized { " (store initialized)" } else { "" }
    );
}
