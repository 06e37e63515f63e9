//! # Feature: WhatsApp Outbound
//!
//! Best-effort text delivery through the WhatsApp Cloud API. There is no
//! retry or backoff anywhere in this module; a failed send is logged by the
//! caller and the message is gone.
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.1.0
//! - **Toggleable**: false

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use log::debug;
use reqwest::Url;
use std::time::Duration;

/// Outbound message delivery seam.
///
/// The dispatcher and the command layer only know "send text to identity";
/// tests substitute a recording implementation.
#[async_trait]
pub trait OutboundSender: Send + Sync {
    /// Attempt delivery once. No contract beyond "attempted".
    async fn send(&self, identity: &str, text: &str) -> Result<()>;
}

/// WhatsApp Cloud API sender.
#[derive(Clone)]
pub struct WhatsAppSender {
    http: reqwest::Client,
    access_token: String,
    phone_number_id: String,
}

impl WhatsAppSender {
    pub fn new(access_token: &str, phone_number_id: &str) -> Result<Self> {
        let access_token = access_token.trim();
        if access_token.is_empty() {
            return Err(anyhow!("whatsapp access token is required"));
        }
        let phone_number_id = phone_number_id.trim();
        if phone_number_id.is_empty() {
            return Err(anyhow!("whatsapp phone number id is required"));
        }
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(20))
            .build()?;
        Ok(WhatsAppSender {
            http,
            access_token: access_token.to_string(),
            phone_number_id: phone_number_id.to_string(),
        })
    }

    fn messages_url(&self) -> Result<Url> {
        Url::parse(&format!(
            "https://graph.facebook.com/v20.0/{}/messages",
            self.phone_number_id
        ))
        .map_err(|e| anyhow!("invalid whatsapp graph API URL: {e}"))
    }
}

#[async_trait]
impl OutboundSender for WhatsAppSender {
    async fn send(&self, identity: &str, text: &str) -> Result<()> {
        let to = identity.trim();
        if to.is_empty() {
            return Err(anyhow!("recipient identity is required"));
        }

        debug!("📱 Sending WhatsApp message to {to} ({} chars)", text.len());

        let payload = serde_json::json!({
            "messaging_product": "whatsapp",
            "to": to,
            "text": { "body": text }
        });

        let response = self
            .http
            .post(self.messages_url()?)
            .bearer_auth(&self.access_token)
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("whatsapp send failed: status={status} body={body}"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_rejects_blank_credentials() {
        assert!(WhatsAppSender::new("", "12345").is_err());
        assert!(WhatsAppSender::new("token", "   ").is_err());
    }

    #[test]
    fn test_messages_url_embeds_phone_number_id() {
        let sender = WhatsAppSender::new("token", "109876").unwrap();
        assert_eq!(
            sender.messages_url().unwrap().as_str(),
            "https://graph.facebook.com/v20.0/109876/messages"
        );
    }
}
