//! Background retry worker
//!
//! Polls the ledger for failed deliveries whose `next_retry` has passed and
//! resends the stored bytes. The same loop purges expired history.

use super::delivery::DeliveryEngine;
use super::ledger::DeliveryLedger;
use super::registry::WebhookRegistry;
use super::types::WebhookDelivery;
use crate::config::WebhooksConfig;
use crate::utils::error::{Result, WebhookError};
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

/// Counters for one pass over the due deliveries
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RetryRunReport {
    pub attempted: usize,
    pub succeeded: usize,
    pub rescheduled: usize,
    pub exhausted: usize,
    /// Due deliveries whose webhook is gone or inactive
    pub parked: usize,
}

impl RetryRunReport {
    fn record(&mut self, outcome: RetryOutcome) {
        match outcome {
            RetryOutcome::Parked => self.parked += 1,
            RetryOutcome::Succeeded => {
                self.attempted += 1;
                self.succeeded += 1;
            }
            RetryOutcome::Rescheduled => {
                self.attempted += 1;
                self.rescheduled += 1;
            }
            RetryOutcome::Exhausted => {
                self.attempted += 1;
                self.exhausted += 1;
            }
        }
    }
}

/// What happened to a single due delivery
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RetryOutcome {
    Parked,
    Succeeded,
    Rescheduled,
    Exhausted,
}

#[derive(Clone)]
pub struct RetryWorker {
    registry: WebhookRegistry,
    engine: DeliveryEngine,
    ledger: DeliveryLedger,
    policy: WebhooksConfig,
}

impl RetryWorker {
    pub fn new(
        registry: WebhookRegistry,
        engine: DeliveryEngine,
        ledger: DeliveryLedger,
        policy: WebhooksConfig,
    ) -> Self {
        Self {
            registry,
            engine,
            ledger,
            policy,
        }
    }

    /// Resend everything due at `now`, at most `retry_concurrency` at a time
    pub async fn run_once(&self, now: DateTime<Utc>) -> Result<RetryRunReport> {
        let due = self.ledger.due_retries(now).await?;
        let mut report = RetryRunReport::default();
        if due.is_empty() {
            return Ok(report);
        }
        debug!("{} deliveries due for retry", due.len());

        let outcomes: Vec<Option<RetryOutcome>> = stream::iter(due)
            .map(|delivery| async move {
                match self.retry_one(&delivery).await {
                    Ok(outcome) => Some(outcome),
                    Err(e) => {
                        error!("Retry of delivery {} failed: {}", delivery.id, e);
                        None
                    }
                }
            })
            .buffer_unordered(self.policy.retry_concurrency.max(1))
            .collect()
            .await;

        for outcome in outcomes.into_iter().flatten() {
            report.record(outcome);
        }

        info!(
            "Retry pass: {} attempted, {} succeeded, {} rescheduled, {} exhausted, {} parked",
            report.attempted, report.succeeded, report.rescheduled, report.exhausted, report.parked
        );
        Ok(report)
    }

    async fn retry_one(&self, delivery: &WebhookDelivery) -> Result<RetryOutcome> {
        let webhook = match self.registry.get(delivery.webhook_id).await {
            Ok(webhook) if webhook.active => webhook,
            Ok(_) | Err(WebhookError::NotFound(_)) => {
                debug!(
                    "Parking delivery {}: webhook {} is inactive or gone",
                    delivery.id, delivery.webhook_id
                );
                self.ledger.park(delivery).await?;
                return Ok(RetryOutcome::Parked);
            }
            Err(e) => return Err(e),
        };

        let signature = delivery.stored_signature();
        let result = self
            .engine
            .send(&webhook, &delivery.event_type, &delivery.payload, signature.as_deref())
            .await;

        self.ledger.record_attempt(delivery.id, &result, None).await?;
        if result.success() {
            return Ok(RetryOutcome::Succeeded);
        }

        // attempts already counts the send that just failed
        if delivery.attempts <= webhook.retry_count as i32 {
            let next = Utc::now() + self.policy.retry_backoff();
            self.ledger.schedule_retry_at(delivery.id, next).await?;
            Ok(RetryOutcome::Rescheduled)
        } else {
            warn!(
                "Delivery {} to webhook {} exhausted its {} retries",
                delivery.id, webhook.id, webhook.retry_count
            );
            Ok(RetryOutcome::Exhausted)
        }
    }

    /// Spawn the poll loop and the retention cleanup on the current runtime
    pub fn start(self) -> JoinHandle<()> {
        info!(
            "Starting webhook retry worker (every {}s, cleanup every {}h)",
            self.policy.retry_poll_interval_seconds, self.policy.cleanup_interval_hours
        );

        tokio::spawn(async move {
            let mut retry_tick = tokio::time::interval(self.policy.poll_interval());
            retry_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut cleanup_tick = tokio::time::interval(self.policy.cleanup_interval());
            cleanup_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = retry_tick.tick() => {
                        if let Err(e) = self.run_once(Utc::now()).await {
                            error!("Error processing webhook retries: {}", e);
                        }
                    }
                    _ = cleanup_tick.tick() => {
                        if let Err(e) = self.ledger.purge_expired(Utc::now()).await {
                            error!("Error purging expired deliveries: {}", e);
                        }
                    }
                }
            }
        })
    }
}
