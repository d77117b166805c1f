//! Background reset of conversations that have gone quiet.

use std::time::Duration;

use chrono::{DateTime, Utc};
use log::{debug, info};
use tokio::{task::JoinHandle, time::MissedTickBehavior};

use crate::conversation::Personas;

const DEFAULT_PERIOD: Duration = Duration::from_secs(2);

/// Periodically clears every persona idle for longer than the threshold.
pub struct IdleReaper {
    personas: Personas,
    idle_threshold: Duration,
    period: Duration,
}

impl IdleReaper {
    #[must_use]
    pub fn new(personas: Personas, idle_threshold: Duration) -> Self {
        Self {
            personas,
            idle_threshold,
            period: DEFAULT_PERIOD,
        }
    }

    #[must_use]
    pub fn with_period(mut self, period: Duration) -> Self {
        self.period = period;
        self
    }

    /// Check every persona once. Returns how many were reset.
    pub fn tick(&self, now: DateTime<Utc>) -> usize {
        self.personas
            .iter()
            .filter(|engine| engine.reset_if_idle(now, self.idle_threshold))
            .count()
    }

    /// Run for the rest of the process lifetime.
    pub fn spawn(self) -> JoinHandle<()> {
        info!(
            "Idle reaper started (threshold {}s, every {}ms)",
            self.idle_threshold.as_secs(),
            self.period.as_millis()
        );
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(self.period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                let reset = self.tick(Utc::now());
                if reset > 0 {
                    debug!("Idle reaper reset {reset} persona(s)");
                }
            }
        })
    }
}
