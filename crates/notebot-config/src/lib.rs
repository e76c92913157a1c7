// SPDX-FileCopyrightText: 2026 Notebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration system for the Notebot pipeline.
//!
//! TOML files in the XDG hierarchy, `NOTEBOT_*` environment overrides,
//! strict unknown-key rejection, and miette diagnostics with typo suggestions.
//!
//! # Usage
//!
//! ```no_run
//! use notebot_config::load_and_validate;
//!
//! let config = load_and_validate().expect("config errors");
//! println!("downloads go to {}", config.downloader.download_dir);
//! ```

pub mod diagnostic;
pub mod loader;
pub mod model;
pub mod validation;

pub use diagnostic::{render_errors, ConfigError};
pub use loader::{load_config, load_config_from_path, load_config_from_str};
pub use model::NotebotConfig;

/// Loads configuration from the standard hierarchy and validates it.
pub fn load_and_validate() -> Result<NotebotConfig, Vec<ConfigError>> {
    finish(loader::load_config(), collect_toml_sources)
}

/// Loads configuration from an explicit file (plus env overrides) and validates it.
pub fn load_and_validate_path(path: &std::path::Path) -> Result<NotebotConfig, Vec<ConfigError>> {
    finish(loader::load_config_from_path(path), || {
        std::fs::read_to_string(path)
            .map(|content| vec![(path.display().to_string(), content)])
            .unwrap_or_default()
    })
}

/// Loads configuration from a TOML string and validates it.
pub fn load_and_validate_str(toml_content: &str) -> Result<NotebotConfig, Vec<ConfigError>> {
    finish(loader::load_config_from_str(toml_content), || {
        vec![("<inline>".to_string(), toml_content.to_string())]
    })
}

fn finish(
    loaded: Result<NotebotConfig, figment::Error>,
    sources: impl FnOnce() -> Vec<(String, String)>,
) -> Result<NotebotConfig, Vec<ConfigError>> {
    match loaded {
        Ok(config) => {
            validation::validate_config(&config)?;
            Ok(config)
        }
        Err(err) => Err(diagnostic::figment_to_config_errors(err, &sources())),
    }
}

/// Reads the TOML files that may have contributed to the config, for error spans.
fn collect_toml_sources() -> Vec<(String, String)> {
    let local = std::env::current_dir()
        .map(|d| d.join(loader::LOCAL_FILE))
        .unwrap_or_else(|_| loader::LOCAL_FILE.into());

    [local, loader::user_file(), loader::SYSTEM_FILE.into()]
        .into_iter()
        .filter_map(|path| {
            std::fs::read_to_string(&path)
                .ok()
                .map(|content| (path.display().to_string(), content))
        })
        .collect()
}
