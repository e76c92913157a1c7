// SPDX-FileCopyrightText: 2026 Notebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Notebot pipeline.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Top-level Notebot configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct NotebotConfig {
    /// Service identity and logging.
    #[serde(default)]
    pub service: ServiceConfig,

    /// Telegram Bot API credentials.
    #[serde(default)]
    pub telegram: TelegramConfig,

    /// Work store database settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Event dispatcher settings.
    #[serde(default)]
    pub dealer: DealerConfig,

    /// Attachment fetcher settings.
    #[serde(default)]
    pub downloader: DownloaderConfig,

    /// Note layout and the local note store.
    #[serde(default)]
    pub notes: NotesConfig,

    /// Prometheus exporter settings.
    #[serde(default)]
    pub prometheus: PrometheusConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    #[serde(default = "default_service_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: default_service_name(),
            log_level: default_log_level(),
        }
    }
}

fn default_service_name() -> String {
    "notebot".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TelegramConfig {
    /// Telegram Bot API token. Required by every command that talks to Telegram.
    #[serde(default)]
    pub bot_token: Option<String>,

    /// Alternate Bot API server, e.g. a self-hosted one.
    #[serde(default)]
    pub api_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn data_path(file: &str) -> String {
    dirs::data_dir()
        .map(|p| p.join("notebot").join(file))
        .unwrap_or_else(|| std::path::PathBuf::from(file))
        .to_string_lossy()
        .into_owned()
}

fn default_database_path() -> String {
    data_path("notebot.db")
}

fn default_wal_mode() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DealerConfig {
    /// Sleep between polls that claim nothing.
    #[serde(default = "default_dealer_poll_ms")]
    pub poll_interval_ms: u64,

    /// Claims older than this are treated as abandoned and reclaimed.
    #[serde(default = "default_claim_timeout_secs")]
    pub claim_timeout_secs: u64,

    /// How long a file event waits for its download before failing.
    #[serde(default = "default_asset_wait_secs")]
    pub asset_wait_secs: u64,

    /// How long shutdown waits for in-flight users to finish.
    #[serde(default = "default_shutdown_grace_secs")]
    pub shutdown_grace_secs: u64,
}

impl Default for DealerConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_dealer_poll_ms(),
            claim_timeout_secs: default_claim_timeout_secs(),
            asset_wait_secs: default_asset_wait_secs(),
            shutdown_grace_secs: default_shutdown_grace_secs(),
        }
    }
}

impl DealerConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn claim_timeout(&self) -> Duration {
        Duration::from_secs(self.claim_timeout_secs)
    }

    pub fn asset_wait(&self) -> Duration {
        Duration::from_secs(self.asset_wait_secs)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }
}

fn default_dealer_poll_ms() -> u64 {
    100
}

fn default_claim_timeout_secs() -> u64 {
    300
}

fn default_asset_wait_secs() -> u64 {
    30
}

fn default_shutdown_grace_secs() -> u64 {
    30
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DownloaderConfig {
    /// Directory downloaded files are written to.
    #[serde(default = "default_download_dir")]
    pub download_dir: String,

    #[serde(default = "default_downloader_poll_ms")]
    pub poll_interval_ms: u64,

    /// Size of the blocking pool used for disk writes.
    #[serde(default = "default_write_workers")]
    pub write_workers: usize,

    /// Upper bound on simultaneous network fetches.
    #[serde(default = "default_max_concurrent_fetches")]
    pub max_concurrent_fetches: usize,

    #[serde(default = "default_claim_timeout_secs")]
    pub claim_timeout_secs: u64,
}

impl Default for DownloaderConfig {
    fn default() -> Self {
        Self {
            download_dir: default_download_dir(),
            poll_interval_ms: default_downloader_poll_ms(),
            write_workers: default_write_workers(),
            max_concurrent_fetches: default_max_concurrent_fetches(),
            claim_timeout_secs: default_claim_timeout_secs(),
        }
    }
}

impl DownloaderConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn claim_timeout(&self) -> Duration {
        Duration::from_secs(self.claim_timeout_secs)
    }
}

fn default_download_dir() -> String {
    data_path("downloads")
}

fn default_downloader_poll_ms() -> u64 {
    1000
}

fn default_write_workers() -> usize {
    10
}

fn default_max_concurrent_fetches() -> usize {
    32
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct NotesConfig {
    /// Prefix for titles of notes created per event.
    #[serde(default = "default_title_prefix")]
    pub title_prefix: String,

    /// Title of a pinned note created in one-note mode.
    #[serde(default = "default_pinned_note_title")]
    pub pinned_note_title: String,

    /// Title of the side note that holds one-note mode attachments.
    #[serde(default = "default_files_note_title")]
    pub files_note_title: String,

    /// Root directory of the local note store.
    #[serde(default = "default_notes_dir")]
    pub notes_dir: String,

    /// Voice transcoder, invoked as `<command> <input> <output>`.
    #[serde(default = "default_transcode_command")]
    pub transcode_command: String,
}

impl Default for NotesConfig {
    fn default() -> Self {
        Self {
            title_prefix: default_title_prefix(),
            pinned_note_title: default_pinned_note_title(),
            files_note_title: default_files_note_title(),
            notes_dir: default_notes_dir(),
            transcode_command: default_transcode_command(),
        }
    }
}

fn default_title_prefix() -> String {
    "[BOT]".to_string()
}

fn default_pinned_note_title() -> String {
    "Note for Notebot".to_string()
}

fn default_files_note_title() -> String {
    "[Files]".to_string()
}

fn default_notes_dir() -> String {
    data_path("notes")
}

fn default_transcode_command() -> String {
    "opusdec".to_string()
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PrometheusConfig {
    #[serde(default)]
    pub enabled: bool,

    /// Address of the scrape endpoint.
    #[serde(default = "default_prometheus_address")]
    pub listen_address: String,
}

impl Default for PrometheusConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            listen_address: default_prometheus_address(),
        }
    }
}

fn default_prometheus_address() -> String {
    "127.0.0.1:9464".to_string()
}
