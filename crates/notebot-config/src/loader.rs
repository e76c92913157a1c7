// SPDX-FileCopyrightText: 2026 Notebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Layered config loading with Figment.
//!
//! Lookup order: `./notebot.toml` > `~/.config/notebot/notebot.toml` >
//! `/etc/notebot/notebot.toml`, with `NOTEBOT_*` environment overrides on top.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::NotebotConfig;

/// Config sections, used to map env var names onto dotted keys.
const SECTIONS: &[&str] = &[
    "service",
    "telegram",
    "storage",
    "dealer",
    "downloader",
    "notes",
    "prometheus",
];

pub(crate) const LOCAL_FILE: &str = "notebot.toml";
pub(crate) const SYSTEM_FILE: &str = "/etc/notebot/notebot.toml";

pub(crate) fn user_file() -> PathBuf {
    dirs::config_dir()
        .map(|d| d.join("notebot/notebot.toml"))
        .unwrap_or_default()
}

/// Load configuration from the standard hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/notebot/notebot.toml`
/// 3. `~/.config/notebot/notebot.toml`
/// 4. `./notebot.toml`
/// 5. `NOTEBOT_*` environment variables
pub fn load_config() -> Result<NotebotConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no file lookup, no env).
pub fn load_config_from_str(toml_content: &str) -> Result<NotebotConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(NotebotConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from an explicit file with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<NotebotConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(NotebotConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// The Figment behind [`load_config`], before extraction.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(NotebotConfig::default()))
        .merge(Toml::file(SYSTEM_FILE))
        .merge(Toml::file(user_file()))
        .merge(Toml::file(LOCAL_FILE))
        .merge(env_provider())
}

/// Maps `NOTEBOT_<SECTION>_<KEY>` to `<section>.<key>`.
///
/// Only the section prefix is split off, so `NOTEBOT_DEALER_CLAIM_TIMEOUT_SECS`
/// becomes `dealer.claim_timeout_secs` rather than `dealer.claim.timeout.secs`.
pub(crate) fn env_key(key: &str) -> String {
    for section in SECTIONS {
        if let Some(rest) = key
            .strip_prefix(section)
            .and_then(|rest| rest.strip_prefix('_'))
        {
            return format!("{section}.{rest}");
        }
    }
    key.to_string()
}

fn env_provider() -> Env {
    Env::prefixed("NOTEBOT_").map(|key| env_key(key.as_str()).into())
}
