// SPDX-FileCopyrightText: 2026 Notebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.

use crate::diagnostic::ConfigError;
use crate::model::NotebotConfig;

/// Validates semantic constraints, collecting every failure instead of stopping at the first.
pub fn validate_config(config: &NotebotConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    for (key, value) in [
        ("storage.database_path", &config.storage.database_path),
        ("downloader.download_dir", &config.downloader.download_dir),
        ("notes.notes_dir", &config.notes.notes_dir),
        ("notes.transcode_command", &config.notes.transcode_command),
    ] {
        if value.trim().is_empty() {
            errors.push(ConfigError::validation(format!("{key} must not be empty")));
        }
    }

    for (key, value) in [
        ("dealer.poll_interval_ms", config.dealer.poll_interval_ms),
        ("downloader.poll_interval_ms", config.downloader.poll_interval_ms),
        ("dealer.claim_timeout_secs", config.dealer.claim_timeout_secs),
        ("downloader.claim_timeout_secs", config.downloader.claim_timeout_secs),
    ] {
        if value == 0 {
            errors.push(ConfigError::validation(format!("{key} must be greater than 0")));
        }
    }

    if config.downloader.write_workers == 0 {
        errors.push(ConfigError::validation(
            "downloader.write_workers must be at least 1",
        ));
    }

    if config.downloader.max_concurrent_fetches == 0 {
        errors.push(ConfigError::validation(
            "downloader.max_concurrent_fetches must be at least 1",
        ));
    }

    // A claim must outlive the wait for its download, or the event is reclaimed mid-wait.
    if config.dealer.asset_wait_secs >= config.dealer.claim_timeout_secs
        && config.dealer.claim_timeout_secs > 0
    {
        errors.push(ConfigError::validation(format!(
            "dealer.asset_wait_secs ({}) must be less than dealer.claim_timeout_secs ({})",
            config.dealer.asset_wait_secs, config.dealer.claim_timeout_secs
        )));
    }

    if config.prometheus.enabled
        && config
            .prometheus
            .listen_address
            .parse::<std::net::SocketAddr>()
            .is_err()
    {
        errors.push(ConfigError::validation(format!(
            "prometheus.listen_address `{}` is not a valid socket address",
            config.prometheus.listen_address
        )));
    }

    if let Some(token) = &config.telegram.bot_token
        && token.trim().is_empty()
    {
        errors.push(ConfigError::validation(
            "telegram.bot_token must not be empty when set",
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn has_error(errors: &[ConfigError], needle: &str) -> bool {
        errors
            .iter()
            .any(|e| matches!(e, ConfigError::Validation { message } if message.contains(needle)))
    }

    #[test]
    fn default_config_validates() {
        assert!(validate_config(&NotebotConfig::default()).is_ok());
    }

    #[test]
    fn empty_paths_fail_validation() {
        let mut config = NotebotConfig::default();
        config.storage.database_path = String::new();
        config.downloader.download_dir = "  ".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(has_error(&errors, "storage.database_path"));
        assert!(has_error(&errors, "downloader.download_dir"));
    }

    #[test]
    fn zero_workers_and_intervals_fail_validation() {
        let mut config = NotebotConfig::default();
        config.downloader.write_workers = 0;
        config.dealer.poll_interval_ms = 0;
        let errors = validate_config(&config).unwrap_err();
        assert!(has_error(&errors, "write_workers"));
        assert!(has_error(&errors, "dealer.poll_interval_ms"));
    }

    #[test]
    fn asset_wait_must_fit_inside_claim_timeout() {
        let mut config = NotebotConfig::default();
        config.dealer.claim_timeout_secs = 10;
        config.dealer.asset_wait_secs = 10;
        let errors = validate_config(&config).unwrap_err();
        assert!(has_error(&errors, "asset_wait_secs"));
    }

    #[test]
    fn prometheus_address_checked_only_when_enabled() {
        let mut config = NotebotConfig::default();
        config.prometheus.listen_address = "not an address".to_string();
        assert!(validate_config(&config).is_ok());

        config.prometheus.enabled = true;
        let errors = validate_config(&config).unwrap_err();
        assert!(has_error(&errors, "prometheus.listen_address"));
    }
}
