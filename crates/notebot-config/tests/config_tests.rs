// SPDX-FileCopyrightText: 2026 Notebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the Notebot configuration system.

use notebot_config::diagnostic::ConfigError;
use notebot_config::model::NotebotConfig;
use notebot_config::{load_and_validate_str, load_config_from_str};

/// Valid TOML with every section deserializes.
#[test]
fn valid_toml_deserializes_into_notebot_config() {
    let toml = r#"
[service]
name = "notes-prod"
log_level = "debug"

[telegram]
bot_token = "123:ABC"

[storage]
database_path = "/tmp/notebot.db"
wal_mode = false

[dealer]
poll_interval_ms = 50
claim_timeout_secs = 120
asset_wait_secs = 15

[downloader]
download_dir = "/tmp/downloads"
write_workers = 4
max_concurrent_fetches = 8

[notes]
title_prefix = "[NB]"
transcode_command = "ffmpeg-wrap"

[prometheus]
enabled = true
listen_address = "0.0.0.0:9000"
"#;

    let config = load_and_validate_str(toml).expect("valid TOML should load");
    assert_eq!(config.service.name, "notes-prod");
    assert_eq!(config.service.log_level, "debug");
    assert_eq!(config.telegram.bot_token.as_deref(), Some("123:ABC"));
    assert_eq!(config.storage.database_path, "/tmp/notebot.db");
    assert!(!config.storage.wal_mode);
    assert_eq!(config.dealer.poll_interval().as_millis(), 50);
    assert_eq!(config.dealer.claim_timeout().as_secs(), 120);
    assert_eq!(config.dealer.asset_wait().as_secs(), 15);
    assert_eq!(config.downloader.download_dir, "/tmp/downloads");
    assert_eq!(config.downloader.write_workers, 4);
    assert_eq!(config.downloader.max_concurrent_fetches, 8);
    assert_eq!(config.notes.title_prefix, "[NB]");
    assert_eq!(config.notes.transcode_command, "ffmpeg-wrap");
    assert!(config.prometheus.enabled);
}

/// Unspecified sections fall back to defaults.
#[test]
fn defaults_are_sensible() {
    let config = NotebotConfig::default();
    assert_eq!(config.service.name, "notebot");
    assert_eq!(config.service.log_level, "info");
    assert!(config.telegram.bot_token.is_none());
    assert_eq!(config.dealer.poll_interval_ms, 100);
    assert_eq!(config.downloader.poll_interval_ms, 1000);
    assert_eq!(config.downloader.write_workers, 10);
    assert_eq!(config.notes.files_note_title, "[Files]");
    assert_eq!(config.notes.transcode_command, "opusdec");
    assert!(config.storage.database_path.ends_with("notebot.db"));
    assert!(!config.prometheus.enabled);
}

/// An empty document is a valid config.
#[test]
fn empty_toml_uses_defaults() {
    let config = load_config_from_str("").expect("empty config should load");
    assert_eq!(config.dealer.claim_timeout_secs, 300);
}

/// Unknown keys are rejected with a suggestion.
#[test]
fn unknown_key_gets_a_suggestion() {
    let toml = r#"
[downloader]
write_worker = 3
"#;

    let errors = load_and_validate_str(toml).expect_err("typo must be rejected");
    let found = errors.iter().any(|e| {
        matches!(
            e,
            ConfigError::UnknownKey { key, suggestion: Some(s), .. }
                if key == "write_worker" && s == "write_workers"
        )
    });
    assert!(found, "expected an unknown-key suggestion, got {errors:?}");
}

/// Unknown sections are rejected too.
#[test]
fn unknown_section_is_rejected() {
    let toml = r#"
[evernote]
token = "x"
"#;
    assert!(load_config_from_str(toml).is_err());
}

/// Wrong value types surface as errors.
#[test]
fn wrong_type_is_rejected() {
    let toml = r#"
[dealer]
poll_interval_ms = "fast"
"#;
    let errors = load_and_validate_str(toml).expect_err("string for integer must fail");
    assert!(!errors.is_empty());
}

/// Semantic validation runs after a successful parse.
#[test]
fn validation_errors_are_collected() {
    let toml = r#"
[downloader]
write_workers = 0
max_concurrent_fetches = 0
"#;
    let errors = load_and_validate_str(toml).expect_err("zero workers must fail");
    assert_eq!(
        errors
            .iter()
            .filter(|e| matches!(e, ConfigError::Validation { .. }))
            .count(),
        2
    );
}

/// Config round-trips through TOML serialization.
#[test]
fn serialized_defaults_parse_back() {
    let rendered = toml::to_string(&NotebotConfig::default()).expect("defaults serialize");
    let parsed: NotebotConfig = toml::from_str(&rendered).expect("rendered defaults parse");
    assert_eq!(parsed.downloader.write_workers, 10);
}

/// Diagnostics render through miette without panicking.
#[test]
fn diagnostics_render() {
    let errors = load_and_validate_str("[notes]\ntitle_prefx = \"x\"\n").unwrap_err();
    let handler = miette::GraphicalReportHandler::new();
    for error in &errors {
        let mut buf = String::new();
        handler.render_report(&mut buf, error).expect("render");
        assert!(buf.contains("title_prefx"));
    }
}
