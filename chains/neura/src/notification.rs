use crate::config::TelegramConfig;
use anyhow::{Error, Result};
use async_trait::async_trait;
use fleet_core::FleetNotifier;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, error};

/// Posts one message per processed wallet to a Telegram chat.
pub struct TelegramNotifier {
    config: TelegramConfig,
    client: Client,
}

impl TelegramNotifier {
    pub fn new(config: TelegramConfig) -> Self {
        Self {
            config,
            client: Client::new(),
        }
    }

    /// Send a message to Telegram
    pub async fn send_message(&self, message: &str) -> Result<()> {
        let url = format!(
            "https://api.telegram.org/bot{}/sendMessage",
            self.config.bot_token
        );

        let payload = serde_json::json!({
            "chat_id": self.config.chat_id,
            "text": message,
            "parse_mode": "Markdown",
            "disable_notification": false,
        });

        let response = self
            .client
            .post(&url)
            .json(&payload)
            .timeout(Duration::from_secs(30))
            .send()
            .await
            // reqwest errors carry the URL, which contains the bot token
            .map_err(|e| Error::new(e.without_url()).context("Failed to send Telegram request"))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            error!("Telegram API error: {} - {}", status, text);
            return Err(Error::msg(format!(
                "Telegram API error: {} - {}",
                status, text
            )));
        }

        debug!("Telegram notification sent");
        Ok(())
    }
}

/// Only the ordinal and the public address ever leave the process.
pub fn format_processed(ordinal: u64, address: &str) -> String {
    format!("✅ Wallet #{} processed\n`{}`", ordinal, address)
}

#[async_trait]
impl FleetNotifier for TelegramNotifier {
    async fn notify(&self, ordinal: u64, address: &str) -> Result<()> {
        self.send_message(&format_processed(ordinal, address)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_has_ordinal_and_address() {
        let msg = format_processed(7, "0xAbC");
        assert!(msg.contains("#7"));
        assert!(msg.contains("`0xAbC`"));
    }
}
