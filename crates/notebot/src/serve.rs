// SPDX-FileCopyrightText: 2026 Notebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `notebot serve`, `notebot dealer`, and `notebot downloader`.
//!
//! All three share one startup path: tracing, the SQLite work store, the
//! Telegram client, the optional Prometheus exporter, and the signal
//! handler. They differ only in which consumers run. Several processes may
//! share one database; the work store's atomic claims keep them apart.

use std::sync::Arc;

use notebot_config::model::NotebotConfig;
use notebot_core::{
    ChatClient, HealthStatus, NoteStore, NotebotError, PluginAdapter, StorageAdapter,
};
use notebot_dealer::Dealer;
use notebot_downloader::FetchWorker;
use notebot_handlers::HandlerContext;
use notebot_storage::SqliteStorage;
use notebot_telegram::TelegramClient;
use tracing::{error, info, warn};

use crate::local_notes::LocalNoteStore;
use crate::shutdown;

/// Which consumers a process runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    All,
    Dealer,
    Downloader,
}

impl Role {
    fn runs_dealer(self) -> bool {
        matches!(self, Role::All | Role::Dealer)
    }

    fn runs_downloader(self) -> bool {
        matches!(self, Role::All | Role::Downloader)
    }
}

/// Initializes the tracing subscriber. `RUST_LOG` wins over the config level.
pub fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("notebot={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}

async fn report_health(adapter: &dyn PluginAdapter) {
    match adapter.health_check().await {
        Ok(HealthStatus::Healthy) => info!(adapter = adapter.name(), "adapter healthy"),
        Ok(HealthStatus::Degraded(reason)) => {
            warn!(adapter = adapter.name(), %reason, "adapter degraded")
        }
        Ok(HealthStatus::Unhealthy(reason)) => {
            warn!(adapter = adapter.name(), %reason, "adapter unhealthy")
        }
        Err(e) => warn!(adapter = adapter.name(), error = %e, "health check failed"),
    }
}

/// Runs the consumers selected by `role` until SIGINT or SIGTERM.
pub async fn run_serve(config: NotebotConfig, role: Role) -> Result<(), NotebotError> {
    init_tracing(&config.service.log_level);
    info!(service = %config.service.name, ?role, "starting notebot");

    let storage = SqliteStorage::new(config.storage.clone());
    storage.initialize().await?;
    let storage = Arc::new(storage);

    let telegram = TelegramClient::new(&config.telegram).inspect_err(|_| {
        eprintln!(
            "error: Telegram bot token required. Set telegram.bot_token in notebot.toml \
             or the NOTEBOT_TELEGRAM_BOT_TOKEN env var"
        );
    })?;
    report_health(&telegram).await;
    let chat: Arc<dyn ChatClient> = Arc::new(telegram);

    let _prometheus = if config.prometheus.enabled {
        match notebot_prometheus::PrometheusAdapter::install(&config.prometheus.listen_address) {
            Ok(adapter) => {
                info!(address = %config.prometheus.listen_address, "prometheus metrics enabled");
                Some(adapter)
            }
            Err(e) => {
                warn!(error = %e, "prometheus initialization failed, continuing without metrics");
                None
            }
        }
    } else {
        None
    };

    let cancel = shutdown::install_signal_handler();

    let dealer = if role.runs_dealer() {
        let notes = LocalNoteStore::new(&config.notes.notes_dir, config.notes.title_prefix.clone());
        report_health(&notes).await;
        let notes: Arc<dyn NoteStore> = Arc::new(notes);
        let ctx = HandlerContext::new(
            storage.clone(),
            storage.clone(),
            notes,
            config.notes.clone(),
            config.dealer.asset_wait(),
        );
        Some(Dealer::new(ctx, storage.clone(), chat.clone(), &config.dealer))
    } else {
        None
    };

    let downloader = if role.runs_downloader() {
        Some(FetchWorker::new(storage.clone(), chat.clone(), &config.downloader)?)
    } else {
        None
    };

    // A consumer that fails stops the other, so the process exits.
    let dealer_run = async {
        let result = match &dealer {
            Some(dealer) => dealer.run(cancel.clone()).await,
            None => Ok(()),
        };
        stop_on_error(&cancel, "dealer", result)
    };
    let downloader_run = async {
        let result = match &downloader {
            Some(worker) => worker.run(cancel.clone()).await,
            None => Ok(()),
        };
        stop_on_error(&cancel, "downloader", result)
    };
    let (dealer_result, downloader_result) = tokio::join!(dealer_run, downloader_run);

    if let Err(e) = storage.close().await {
        warn!(error = %e, "failed to checkpoint database on shutdown");
    }
    info!("notebot stopped");
    dealer_result.and(downloader_result)
}

fn stop_on_error(
    cancel: &tokio_util::sync::CancellationToken,
    consumer: &str,
    result: Result<(), NotebotError>,
) -> Result<(), NotebotError> {
    if let Err(e) = &result {
        error!(consumer, error = %e, "consumer stopped with an error");
        cancel.cancel();
    }
    result
}
