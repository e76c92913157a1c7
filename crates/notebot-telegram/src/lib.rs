// SPDX-FileCopyrightText: 2026 Notebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Telegram chat client for the Notebot pipeline.
//!
//! Implements [`ChatClient`] over the Telegram Bot API via teloxide: status
//! messages are sent and edited in place, and file references are resolved
//! to download URLs for the FetchWorker.

pub mod files;

use async_trait::async_trait;
use notebot_config::model::TelegramConfig;
use notebot_core::{
    AdapterType, ChatClient, HealthStatus, NotebotError, PluginAdapter, StatusMessageRef,
};
use teloxide::prelude::*;
use teloxide::types::{ChatId, FileId, MessageId};
use tracing::debug;

/// Telegram implementation of [`ChatClient`].
#[derive(Clone)]
pub struct TelegramClient {
    bot: Bot,
}

impl TelegramClient {
    /// Requires `config.bot_token` to be set.
    pub fn new(config: &TelegramConfig) -> Result<Self, NotebotError> {
        let token = config.bot_token.as_deref().ok_or_else(|| {
            NotebotError::Config("telegram.bot_token is required for the Telegram client".into())
        })?;

        if token.is_empty() {
            return Err(NotebotError::Config(
                "telegram.bot_token cannot be empty".into(),
            ));
        }

        let mut bot = Bot::new(token);
        if let Some(api_url) = config.api_url.as_deref() {
            let url = reqwest::Url::parse(api_url).map_err(|e| {
                NotebotError::Config(format!("telegram.api_url is not a valid URL: {e}"))
            })?;
            bot = bot.set_api_url(url);
        }

        Ok(Self { bot })
    }

    /// Returns a reference to the underlying teloxide Bot.
    pub fn bot(&self) -> &Bot {
        &self.bot
    }
}

fn message_id(message: &StatusMessageRef) -> Result<MessageId, NotebotError> {
    i32::try_from(message.message_id)
        .map(MessageId)
        .map_err(|e| NotebotError::Channel {
            message: format!("invalid message_id {}: {e}", message.message_id),
            source: None,
        })
}

#[async_trait]
impl PluginAdapter for TelegramClient {
    fn name(&self) -> &str {
        "telegram"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Chat
    }

    async fn health_check(&self) -> Result<HealthStatus, NotebotError> {
        match self.bot.get_me().await {
            Ok(_) => Ok(HealthStatus::Healthy),
            Err(e) => Ok(HealthStatus::Unhealthy(format!(
                "Telegram bot unreachable: {e}"
            ))),
        }
    }

    async fn shutdown(&self) -> Result<(), NotebotError> {
        debug!("Telegram client shutting down");
        Ok(())
    }
}

#[async_trait]
impl ChatClient for TelegramClient {
    async fn send_message(&self, chat_id: i64, text: &str) -> Result<StatusMessageRef, NotebotError> {
        let sent = self
            .bot
            .send_message(ChatId(chat_id), text)
            .await
            .map_err(|e| NotebotError::Channel {
                message: format!("failed to send message: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(StatusMessageRef {
            chat_id,
            message_id: i64::from(sent.id.0),
        })
    }

    async fn edit_message_text(
        &self,
        message: &StatusMessageRef,
        text: &str,
    ) -> Result<(), NotebotError> {
        let msg_id = message_id(message)?;
        match self
            .bot
            .edit_message_text(ChatId(message.chat_id), msg_id, text)
            .await
        {
            Ok(_) => Ok(()),
            // Editing to identical text is not a failure.
            Err(e) if e.to_string().contains("message is not modified") => Ok(()),
            Err(e) => Err(NotebotError::Channel {
                message: format!("failed to edit message: {e}"),
                source: Some(Box::new(e)),
            }),
        }
    }

    async fn resolve_file_url(&self, file_ref: &str) -> Result<String, NotebotError> {
        let file = self
            .bot
            .get_file(FileId(file_ref.to_string()))
            .await
            .map_err(|e| NotebotError::Channel {
                message: format!("failed to get file info: {e}"),
                source: Some(Box::new(e)),
            })?;

        debug!(file_id = file_ref, size = file.size, "resolved file path");
        Ok(files::file_download_url(
            self.bot.api_url().as_str(),
            self.bot.token(),
            &file.path,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(token: Option<&str>) -> TelegramConfig {
        TelegramConfig {
            bot_token: token.map(str::to_string),
            api_url: None,
        }
    }

    #[test]
    fn new_requires_bot_token() {
        assert!(TelegramClient::new(&config(None)).is_err());
    }

    #[test]
    fn new_rejects_empty_token() {
        assert!(TelegramClient::new(&config(Some(""))).is_err());
    }

    #[test]
    fn new_accepts_valid_token() {
        assert!(TelegramClient::new(&config(Some("123456:ABC-DEF1234ghIkl-zyx57W2v1u123ew11"))).is_ok());
    }

    #[test]
    fn new_rejects_malformed_api_url() {
        let mut config = config(Some("test:token"));
        config.api_url = Some("not a url".into());
        assert!(matches!(
            TelegramClient::new(&config),
            Err(NotebotError::Config(_))
        ));
    }

    #[test]
    fn api_url_override_is_applied() {
        let mut config = config(Some("test:token"));
        config.api_url = Some("http://localhost:8081/".into());
        let client = TelegramClient::new(&config).unwrap();
        assert_eq!(client.bot().api_url().as_str(), "http://localhost:8081/");
    }

    #[test]
    fn message_ids_outside_i32_are_rejected() {
        let status = StatusMessageRef {
            chat_id: 1,
            message_id: i64::from(i32::MAX) + 1,
        };
        assert!(message_id(&status).is_err());
    }

    #[test]
    fn plugin_adapter_metadata() {
        let client = TelegramClient::new(&config(Some("test:token"))).unwrap();
        assert_eq!(client.name(), "telegram");
        assert_eq!(client.version(), semver::Version::new(0, 1, 0));
        assert_eq!(client.adapter_type(), AdapterType::Chat);
    }
}
