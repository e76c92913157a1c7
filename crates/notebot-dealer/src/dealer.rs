// SPDX-FileCopyrightText: 2026 Notebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The Dealer poll loop and per-event outcome handling.
//!
//! Each cycle claims every eligible event, groups the batch by owner, and
//! appends each group to that user's lane. One worker drains a lane serially;
//! different users' lanes run concurrently on the Tokio runtime.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::FutureExt;
use notebot_config::model::DealerConfig;
use notebot_core::{ChatClient, ClaimRequest, Event, FailureSink, NotebotError};
use notebot_handlers::{HandlerChain, HandlerContext};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::lanes::{Lanes, partition_by_user};
use crate::status;

/// Pause after a failed poll before touching the store again.
const ERROR_BACKOFF: Duration = Duration::from_secs(1);

/// Claims are renewed this many times per claim timeout while a handler runs.
const RENEWALS_PER_TIMEOUT: u32 = 3;

/// How an event left the live queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Saved,
    TokenExpired,
    DeadLettered,
    /// Another consumer reclaimed the event.
    ClaimLost,
}

impl Outcome {
    fn label(self) -> &'static str {
        match self {
            Outcome::Saved => "success",
            Outcome::TokenExpired => "token_expired",
            Outcome::DeadLettered => "failed",
            Outcome::ClaimLost => "claim_lost",
        }
    }
}

struct Worker {
    ctx: HandlerContext,
    failures: Arc<dyn FailureSink>,
    chat: Arc<dyn ChatClient>,
    claim_token: String,
    heartbeat: Duration,
    lanes: Lanes,
}

/// Claims events and drives their handlers.
pub struct Dealer {
    worker: Arc<Worker>,
    poll_interval: Duration,
    claim_timeout: Duration,
    shutdown_grace: Duration,
}

impl Dealer {
    pub fn new(
        ctx: HandlerContext,
        failures: Arc<dyn FailureSink>,
        chat: Arc<dyn ChatClient>,
        config: &DealerConfig,
    ) -> Self {
        Self {
            worker: Arc::new(Worker {
                ctx,
                failures,
                chat,
                claim_token: format!("dealer-{}", uuid::Uuid::new_v4()),
                heartbeat: (config.claim_timeout() / RENEWALS_PER_TIMEOUT)
                    .max(Duration::from_millis(10)),
                lanes: Lanes::new(),
            }),
            poll_interval: config.poll_interval(),
            claim_timeout: config.claim_timeout(),
            shutdown_grace: config.shutdown_grace(),
        }
    }

    pub fn claim_token(&self) -> &str {
        &self.worker.claim_token
    }

    /// Runs until `cancel` fires, then drains in-flight lanes for up to the
    /// shutdown grace period.
    ///
    /// Store failures inside the loop are logged and retried.
    pub async fn run(&self, cancel: CancellationToken) -> Result<(), NotebotError> {
        info!(token = %self.worker.claim_token, "dealer started");
        let mut lanes: JoinSet<()> = JoinSet::new();

        loop {
            while let Some(joined) = lanes.try_join_next() {
                log_join(joined);
            }
            if cancel.is_cancelled() {
                break;
            }

            let pause = match self.poll(&mut lanes).await {
                Ok(0) => Some(self.poll_interval),
                Ok(_) => None,
                Err(e) => {
                    error!(error = %e, "event poll failed");
                    Some(ERROR_BACKOFF)
                }
            };

            if let Some(pause) = pause {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(pause) => {}
                }
            }
        }

        self.drain(lanes).await;
        info!("dealer stopped");
        Ok(())
    }

    /// One poll cycle: claims eligible events and queues them on their
    /// owners' lanes, starting workers for idle lanes.
    ///
    /// Returns the number of events claimed.
    async fn poll(&self, lanes: &mut JoinSet<()>) -> Result<usize, NotebotError> {
        let request = ClaimRequest {
            token: self.worker.claim_token.clone(),
            limit: None,
            stale_after: self.claim_timeout,
        };
        let events = self.worker.ctx.store.claim_events(&request).await?;
        let claimed = events.len();
        if claimed == 0 {
            return Ok(0);
        }
        debug!(count = claimed, "claimed events");

        for (user_id, group) in partition_by_user(events) {
            if self.worker.lanes.push(user_id, group) {
                let worker = Arc::clone(&self.worker);
                lanes.spawn(async move { worker.drain_lane(user_id).await });
            }
        }
        notebot_prometheus::set_active_users(self.worker.lanes.active() as f64);
        Ok(claimed)
    }

    async fn drain(&self, mut lanes: JoinSet<()>) {
        if lanes.is_empty() {
            return;
        }
        info!(
            lanes = lanes.len(),
            grace_secs = self.shutdown_grace.as_secs(),
            "waiting for in-flight events"
        );
        let drained = tokio::time::timeout(self.shutdown_grace, async {
            while let Some(joined) = lanes.join_next().await {
                log_join(joined);
            }
        })
        .await;
        if drained.is_err() {
            // Unfinished claims go stale and are picked up after restart.
            warn!(remaining = lanes.len(), "shutdown grace elapsed, abandoning in-flight events");
            lanes.abort_all();
        }
    }
}

fn log_join(joined: Result<(), tokio::task::JoinError>) {
    if let Err(e) = joined {
        if !e.is_cancelled() {
            error!(error = %e, "user lane task failed");
        }
    }
}

impl Worker {
    async fn drain_lane(&self, user_id: i64) {
        while let Some(event) = self.lanes.next(user_id) {
            let event_id = event.id;
            self.process(event).await;
            self.lanes.release(event_id);
        }
        notebot_prometheus::set_active_users(self.lanes.active() as f64);
        debug!(user_id, "lane drained");
    }

    /// Runs one event to a terminal outcome, then cleans up after it.
    async fn process(&self, event: Event) -> Outcome {
        let started = Instant::now();
        let kind = event.kind;

        let handler = HandlerChain::for_kind(kind);
        let result = if self.renew(&event).await {
            self.execute_while_renewing(handler, &event).await
        } else {
            None
        };
        let Some(result) = result else {
            // The new holder owns the event and its staged files now.
            warn!(event_id = event.id, "claim lost to another consumer, abandoning event");
            notebot_prometheus::record_event(&kind.to_string(), Outcome::ClaimLost.label());
            return Outcome::ClaimLost;
        };

        let outcome = match result {
            Ok(()) => {
                self.finish(&event).await;
                self.report(&event, &status::saved(kind, started.elapsed())).await;
                info!(
                    event_id = event.id,
                    user_id = event.owner_user_id,
                    kind = %kind,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "event saved"
                );
                Outcome::Saved
            }
            Err(e) if e.is_credential_failure() => {
                self.finish(&event).await;
                self.report(&event, status::TOKEN_EXPIRED).await;
                info!(
                    event_id = event.id,
                    user_id = event.owner_user_id,
                    "note store token expired, event dropped"
                );
                Outcome::TokenExpired
            }
            Err(e) => {
                error!(
                    event_id = event.id,
                    user_id = event.owner_user_id,
                    kind = %kind,
                    error = %e,
                    "event failed"
                );
                match self.failures.dead_letter(&event, &e.to_string()).await {
                    Ok(record_id) => debug!(event_id = event.id, record_id, "event dead-lettered"),
                    Err(store_err) => error!(
                        event_id = event.id,
                        error = %store_err,
                        "failed to dead-letter event; it will be reclaimed"
                    ),
                }
                self.report(&event, status::FAILED).await;
                Outcome::DeadLettered
            }
        };

        handler.cleanup(&self.ctx, &event).await;

        notebot_prometheus::record_event(&kind.to_string(), outcome.label());
        notebot_prometheus::record_event_latency(started.elapsed().as_secs_f64());
        outcome
    }

    /// Refreshes the claim. False only when another consumer holds it.
    async fn renew(&self, event: &Event) -> bool {
        match self.ctx.store.renew_event_claim(event.id, &self.claim_token).await {
            Ok(held) => held,
            Err(e) => {
                warn!(event_id = event.id, error = %e, "claim renewal failed, keeping the event");
                true
            }
        }
    }

    /// Runs the handler, renewing the claim until it finishes.
    ///
    /// Returns `None` when the claim was lost mid-way; the handler future is
    /// dropped at that point.
    async fn execute_while_renewing(
        &self,
        handler: HandlerChain,
        event: &Event,
    ) -> Option<Result<(), NotebotError>> {
        let work = AssertUnwindSafe(self.execute(handler, event)).catch_unwind();
        tokio::pin!(work);
        let mut beat =
            tokio::time::interval_at(tokio::time::Instant::now() + self.heartbeat, self.heartbeat);
        beat.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                result = &mut work => {
                    return Some(result.unwrap_or_else(|_| {
                        Err(NotebotError::Internal("handler panicked".into()))
                    }));
                }
                _ = beat.tick() => {
                    if !self.renew(event).await {
                        return None;
                    }
                }
            }
        }
    }

    async fn execute(&self, handler: HandlerChain, event: &Event) -> Result<(), NotebotError> {
        let user = self.ctx.users.resolve_user(event.owner_user_id).await?;
        handler.execute(&self.ctx, &user, event).await
    }

    async fn finish(&self, event: &Event) {
        if let Err(e) = self.ctx.store.delete_event(event.id).await {
            error!(event_id = event.id, error = %e, "failed to delete finished event");
        }
    }

    /// Edits the status message; failures never change the outcome.
    async fn report(&self, event: &Event, text: &str) {
        if let Err(e) = self.chat.edit_message_text(&event.status_message, text).await {
            warn!(event_id = event.id, error = %e, "failed to update status message");
        }
    }
}
