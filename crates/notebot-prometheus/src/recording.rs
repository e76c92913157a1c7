// SPDX-FileCopyrightText: 2026 Notebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Metric registration and recording helpers.
//!
//! Uses the metrics-rs facade; without an installed recorder every call is
//! a no-op, so consumers record unconditionally.

use metrics::{describe_counter, describe_gauge, describe_histogram};

/// Register all Notebot metric descriptions.
///
/// Called once at startup after the recorder is installed.
pub fn register_metrics() {
    describe_counter!(
        "notebot_events_total",
        "Events reaching a terminal outcome, by kind and outcome"
    );
    describe_histogram!(
        "notebot_event_latency_seconds",
        "Time from claim to terminal outcome per event"
    );
    describe_counter!(
        "notebot_downloads_total",
        "Download tasks finished, by outcome"
    );
    describe_counter!(
        "notebot_download_bytes_total",
        "Bytes written to the download directory"
    );
    describe_gauge!(
        "notebot_active_users",
        "Users with an event currently in flight"
    );
}

/// Record an event's terminal outcome.
pub fn record_event(kind: &str, outcome: &'static str) {
    metrics::counter!("notebot_events_total", "kind" => kind.to_string(), "outcome" => outcome)
        .increment(1);
}

/// Record per-event processing latency.
pub fn record_event_latency(seconds: f64) {
    metrics::histogram!("notebot_event_latency_seconds").record(seconds);
}

/// Record a finished download.
pub fn record_download(outcome: &'static str, bytes: u64) {
    metrics::counter!("notebot_downloads_total", "outcome" => outcome).increment(1);
    if bytes > 0 {
        metrics::counter!("notebot_download_bytes_total").increment(bytes);
    }
}

/// Set the number of users with work in flight.
pub fn set_active_users(count: f64) {
    metrics::gauge!("notebot_active_users").set(count);
}
