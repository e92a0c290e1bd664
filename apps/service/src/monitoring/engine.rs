//! The monitoring engine: two independent timers (sweep, rotation) driving
//! per-check evaluation pipelines.
//!
//! Every failure is contained within a single check's (or single log's)
//! pipeline; nothing here may interrupt the timers or sibling pipelines.

use std::collections::HashSet;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::sync::watch;
use tokio::time::{MissedTickBehavior, interval};

use super::evaluator;
use super::prober::Prober;
use super::types::ProbeOutcome;
use super::validation::{self, ValidationError};
use crate::audit::{AuditLogger, LogRecord, LogRotator};
use crate::models::Check;
use crate::notifier::Notifier;
use crate::store::{Store, StoreError};

/// Entity kind under which checks are stored
pub const CHECKS_KIND: &str = "checks";

/// Wall-clock source, injected so tests can pin time
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// The system wall clock
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Timer periods for the two engine loops
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub sweep_interval: Duration,
    pub rotation_interval: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sweep_interval: Duration::from_secs(60),
            rotation_interval: Duration::from_secs(60 * 60 * 24),
        }
    }
}

#[derive(Debug, Error)]
enum PipelineError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("serializing updated check: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Drives the validate -> probe -> evaluate -> persist -> log -> notify
/// pipeline for every registered check, on a recurring sweep timer, and
/// rotates audit logs on an independent rotation timer.
pub struct Engine {
    store: Arc<dyn Store>,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
    prober: Prober,
    audit: AuditLogger,
    rotator: LogRotator,
    config: EngineConfig,
    // Checks whose previous pipeline has not finished; a new sweep skips
    // them rather than racing a probe already in flight.
    in_flight: StdMutex<HashSet<String>>,
}

impl Engine {
    pub fn new(
        store: Arc<dyn Store>,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
        audit: AuditLogger,
        config: EngineConfig,
    ) -> Result<Self, reqwest::Error> {
        Ok(Self {
            store,
            notifier,
            clock,
            prober: Prober::new()?,
            rotator: LogRotator::new(audit.clone()),
            audit,
            config,
            in_flight: StdMutex::new(HashSet::new()),
        })
    }

    /// Run until the shutdown signal flips.
    ///
    /// Both timers fire immediately on startup, then recur at their
    /// configured periods. The loops are independent: a slow sweep never
    /// delays rotation and vice versa.
    pub async fn run(self: Arc<Self>, shutdown: watch::Receiver<bool>) {
        let sweeper = {
            let engine = self.clone();
            let mut shutdown = shutdown.clone();
            tokio::spawn(async move {
                let mut timer = interval(engine.config.sweep_interval);
                timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
                loop {
                    tokio::select! {
                        _ = timer.tick() => engine.sweep().await,
                        _ = shutdown.changed() => break,
                    }
                }
            })
        };

        let rotator = {
            let engine = self.clone();
            let mut shutdown = shutdown.clone();
            tokio::spawn(async move {
                let mut timer = interval(engine.config.rotation_interval);
                timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
                loop {
                    tokio::select! {
                        _ = timer.tick() => engine.rotate().await,
                        _ = shutdown.changed() => break,
                    }
                }
            })
        };

        let _ = tokio::join!(sweeper, rotator);
        tracing::info!("monitoring engine stopped");
    }

    /// One full pass over every registered check. Per-check pipelines run
    /// concurrently; a failure in one never aborts the rest.
    pub async fn sweep(self: &Arc<Self>) {
        let ids = match self.store.list(CHECKS_KIND).await {
            Ok(ids) => ids,
            Err(StoreError::NotFound(_)) => {
                tracing::info!("no checks to process");
                return;
            }
            Err(err) => {
                tracing::error!(error = %err, "could not enumerate checks");
                return;
            }
        };

        let mut pipelines = Vec::with_capacity(ids.len());
        for id in ids {
            if !self.begin(&id) {
                tracing::debug!(check_id = %id, "previous evaluation still in flight, skipping");
                continue;
            }

            let engine = self.clone();
            pipelines.push(tokio::spawn(async move {
                if let Err(err) = engine.process_check(&id).await {
                    tracing::warn!(check_id = %id, error = %err, "check skipped this sweep");
                }
                engine.finish(&id);
            }));
        }

        for pipeline in pipelines {
            let _ = pipeline.await;
        }
    }

    /// One rotation pass over all live audit logs.
    pub async fn rotate(&self) {
        if let Err(err) = self.rotator.rotate_all(self.clock.now()).await {
            tracing::error!(error = %err, "log rotation pass failed");
        }
    }

    async fn process_check(&self, id: &str) -> Result<(), PipelineError> {
        let raw = self.store.read(CHECKS_KIND, id).await?;
        let check = validation::validate_check(&raw)?;

        let outcome = self.prober.probe(&check).await;
        let evaluation = evaluator::evaluate(&check, &outcome);

        let now = self.clock.now();
        let updated = evaluation.apply(&check, now);
        let record = serde_json::to_value(&updated)?;
        self.store.update(CHECKS_KIND, id, &record).await?;

        self.log_evaluation(&updated, outcome, evaluation.alert_warranted, now)
            .await;

        if evaluation.alert_warranted {
            self.alert_status_change(&updated).await;
        } else {
            tracing::debug!(check_id = %id, state = %evaluation.state, "state unchanged");
        }

        Ok(())
    }

    /// Best-effort: an audit failure never blocks the rest of the pipeline.
    async fn log_evaluation(
        &self,
        check: &Check,
        outcome: ProbeOutcome,
        alert: bool,
        time: DateTime<Utc>,
    ) {
        let record = LogRecord {
            check: check.clone(),
            outcome,
            state: check.state,
            alert,
            time,
        };

        if let Err(err) = self.audit.append(&record).await {
            tracing::warn!(check_id = %check.id, error = %err, "audit append failed");
        }
    }

    /// SMS the check's owner about a state transition. Delivery failure is
    /// reported only; the alert counts as attempted either way.
    async fn alert_status_change(&self, check: &Check) {
        let message = format!(
            "Alert: Your check for {} {} is currently {}",
            check.method.as_str(),
            check.target(),
            check.state,
        );

        match self.notifier.send(&check.user_phone, &message).await {
            Ok(()) => {
                tracing::info!(check_id = %check.id, %message, "user alerted to status change");
            }
            Err(err) => {
                tracing::warn!(check_id = %check.id, error = %err, "could not deliver status change alert");
            }
        }
    }

    fn begin(&self, id: &str) -> bool {
        self.in_flight
            .lock()
            .expect("in-flight registry poisoned")
            .insert(id.to_string())
    }

    fn finish(&self, id: &str) {
        self.in_flight
            .lock()
            .expect("in-flight registry poisoned")
            .remove(id);
    }
}
