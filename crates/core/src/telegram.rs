//! Telegram Bot API Gateway
//!
//! Second chat front-end next to WhatsApp. Updates arrive as webhook POSTs,
//! replies go out through `sendMessage`. The chat id plays the role of the
//! sender identifier.

use anyhow::{anyhow, Context, Result};
use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::TelegramConfig;
use crate::error::Error;
use crate::processor::MessageSender;
use crate::types::InboundMessage;

const BOT_API_BASE: &str = "https://api.telegram.org";

pub const SECRET_TOKEN_HEADER: &str = "x-telegram-bot-api-secret-token";

/// Sends text replies through the Bot API
pub struct TelegramClient {
    client: Client,
    send_url: String,
}

// The send URL embeds the bot token
impl std::fmt::Debug for TelegramClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramClient").finish_non_exhaustive()
    }
}

impl TelegramClient {
    pub fn new(bot_token: &str) -> Result<Self> {
        Self::with_base(BOT_API_BASE, bot_token)
    }

    pub fn with_base(base: &str, bot_token: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(20))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            send_url: format!("{}/bot{}/sendMessage", base.trim_end_matches('/'), bot_token),
        })
    }

    pub fn from_config(config: &TelegramConfig) -> Result<Self> {
        let token = config
            .bot_token()
            .ok_or(Error::MissingCredential("TELEGRAM_BOT_TOKEN"))?;
        Self::new(&token)
    }

    pub fn send_url(&self) -> &str {
        &self.send_url
    }
}

#[derive(Debug, Deserialize)]
struct SendReply {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    result: Option<SentMessage>,
}

#[derive(Debug, Deserialize)]
struct SentMessage {
    message_id: i64,
}

/// Message id from a `sendMessage` reply body
fn decode_send_reply(body: &str) -> Result<String> {
    let reply: SendReply =
        serde_json::from_str(body).context("Failed to parse Telegram response")?;
    if !reply.ok {
        return Err(anyhow!(
            "Telegram rejected message: {}",
            reply.description.unwrap_or_else(|| "no description".to_string())
        ));
    }
    Ok(reply
        .result
        .map(|m| m.message_id.to_string())
        .unwrap_or_else(|| "unknown".to_string()))
}

impl MessageSender for TelegramClient {
    fn send(&self, to: &str, body: &str) -> Result<String> {
        debug!(chat_id = to, "sending Telegram message");

        let response = self
            .client
            .post(&self.send_url)
            .json(&json!({ "chat_id": to, "text": body }))
            .send()
            .context("Failed to reach Telegram Bot API")?;

        let status = response.status();
        let text = response.text().context("Failed to read Telegram response")?;
        if !status.is_success() {
            warn!(%status, "Telegram send rejected");
            return Err(anyhow!("HTTP {} - {}", status, text));
        }

        let id = decode_send_reply(&text)?;
        info!(message_id = %id, "Telegram message accepted");
        Ok(id)
    }
}

// ============================================================================
// Inbound
// ============================================================================

#[derive(Debug, Deserialize)]
struct Update {
    #[serde(default)]
    message: Option<WireMessage>,
    #[serde(default)]
    edited_message: Option<WireMessage>,
}

#[derive(Debug, Deserialize)]
struct WireMessage {
    chat: Chat,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    photo: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct Chat {
    id: i64,
}

/// The message carried by one webhook update, if any.
///
/// Edited messages are answered like new ones. Callback queries and other
/// update kinds carry nothing to answer.
pub fn parse_update(body: &str) -> Result<Option<InboundMessage>> {
    let update: Update =
        serde_json::from_str(body).context("Telegram update is not valid JSON")?;

    let Some(message) = update.message.or(update.edited_message) else {
        debug!("update without a message");
        return Ok(None);
    };

    let (text, kind) = match (message.text, message.photo) {
        (Some(text), _) => (text.trim().to_string(), "text"),
        (None, Some(_)) => (String::new(), "photo"),
        (None, None) => (String::new(), "other"),
    };

    Ok(Some(InboundMessage {
        from: message.chat.id.to_string(),
        text,
        kind: kind.to_string(),
    }))
}

/// Check the `X-Telegram-Bot-Api-Secret-Token` header.
/// With no secret configured every update is accepted.
pub fn verify_secret_token(expected: Option<&str>, header: Option<&str>) -> bool {
    match expected {
        Some(secret) if !secret.is_empty() => header == Some(secret),
        _ => true,
    }
}

// ============================================================================
// Tests
// ============================================================================
