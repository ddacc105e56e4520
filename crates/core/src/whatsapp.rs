//! WhatsApp Cloud API Gateway
//!
//! Everything between the router and Meta's WhatsApp Cloud API:
//! - Outbound text messages (`WhatsAppClient`, a `MessageSender`)
//! - Webhook envelope parsing into `InboundMessage`s
//! - The `hub.*` subscription handshake
//! - `X-Hub-Signature-256` payload signatures

use anyhow::{anyhow, Context, Result};
use hmac::{Hmac, Mac};
use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::json;
use sha2::Sha256;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::WhatsAppConfig;
use crate::error::Error;
use crate::processor::MessageSender;
use crate::types::InboundMessage;

const GRAPH_API_BASE: &str = "https://graph.facebook.com";

pub const SIGNATURE_HEADER: &str = "x-hub-signature-256";

// ============================================================================
// Outbound
// ============================================================================

/// Sends text replies through the Cloud API
pub struct WhatsAppClient {
    client: Client,
    access_token: String,
    messages_url: String,
}

impl std::fmt::Debug for WhatsAppClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WhatsAppClient")
            .field("messages_url", &self.messages_url)
            .finish_non_exhaustive()
    }
}

impl WhatsAppClient {
    pub fn new(access_token: &str, phone_number_id: &str, api_version: &str) -> Result<Self> {
        Self::with_base(GRAPH_API_BASE, access_token, phone_number_id, api_version)
    }

    /// Client against a non-default Graph API host
    pub fn with_base(
        base: &str,
        access_token: &str,
        phone_number_id: &str,
        api_version: &str,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            access_token: access_token.to_string(),
            messages_url: format!(
                "{}/{}/{}/messages",
                base.trim_end_matches('/'),
                api_version,
                phone_number_id
            ),
        })
    }

    /// Build from configuration; both the token and the phone number id are required
    pub fn from_config(config: &WhatsAppConfig) -> Result<Self> {
        let token = config
            .access_token()
            .ok_or(Error::MissingCredential("WHATSAPP_ACCESS_TOKEN"))?;
        let phone_id = config
            .phone_number_id()
            .ok_or(Error::MissingCredential("WHATSAPP_PHONE_NUMBER_ID"))?;
        Self::new(&token, &phone_id, &config.api_version)
    }

    pub fn messages_url(&self) -> &str {
        &self.messages_url
    }
}

#[derive(Debug, Deserialize)]
struct SendResponse {
    #[serde(default)]
    messages: Vec<SentMessage>,
}

#[derive(Debug, Deserialize)]
struct SentMessage {
    id: String,
}

impl MessageSender for WhatsAppClient {
    fn send(&self, to: &str, body: &str) -> Result<String> {
        let payload = json!({
            "messaging_product": "whatsapp",
            "to": to,
            "type": "text",
            "text": { "body": body }
        });

        debug!(url = %self.messages_url, to, "sending WhatsApp message");

        let response = self
            .client
            .post(&self.messages_url)
            .bearer_auth(&self.access_token)
            .json(&payload)
            .send()
            .context("Failed to reach WhatsApp Cloud API")?;

        let status = response.status();
        let text = response.text().context("Failed to read WhatsApp response")?;
        if !status.is_success() {
            warn!(%status, "WhatsApp send rejected");
            return Err(anyhow!("HTTP {} - {}", status, text));
        }

        let parsed: SendResponse =
            serde_json::from_str(&text).context("Failed to parse WhatsApp response")?;
        let id = parsed
            .messages
            .into_iter()
            .next()
            .map(|m| m.id)
            .unwrap_or_else(|| "unknown".to_string());

        info!(message_id = %id, "WhatsApp message accepted");
        Ok(id)
    }
}

// ============================================================================
// Inbound
// ============================================================================

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    entry: Vec<Entry>,
}

#[derive(Debug, Deserialize)]
struct Entry {
    #[serde(default)]
    changes: Vec<Change>,
}

#[derive(Debug, Deserialize)]
struct Change {
    #[serde(default)]
    field: String,
    #[serde(default)]
    value: ChangeValue,
}

#[derive(Debug, Default, Deserialize)]
struct ChangeValue {
    #[serde(default)]
    messages: Vec<WireMessage>,
}

#[derive(Debug, Deserialize)]
struct WireMessage {
    #[serde(default)]
    from: String,
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(default)]
    text: Option<WireText>,
}

#[derive(Debug, Deserialize)]
struct WireText {
    #[serde(default)]
    body: String,
}

/// Flatten a webhook POST body into the messages it carries.
///
/// Only `messages` changes are read; status updates and other fields yield
/// nothing. A body that is not JSON is an error.
pub fn parse_webhook(body: &str) -> Result<Vec<InboundMessage>> {
    let envelope: Envelope =
        serde_json::from_str(body).context("Webhook body is not valid JSON")?;

    let messages: Vec<InboundMessage> = envelope
        .entry
        .into_iter()
        .flat_map(|entry| entry.changes)
        .filter(|change| change.field == "messages")
        .flat_map(|change| change.value.messages)
        .map(|m| InboundMessage {
            from: m.from,
            text: m.text.map(|t| t.body.trim().to_string()).unwrap_or_default(),
            kind: m.kind.unwrap_or_else(|| "text".to_string()),
        })
        .collect();

    debug!(count = messages.len(), "parsed webhook");
    Ok(messages)
}

/// Subscription handshake: echo the challenge when mode and token check out
pub fn verify_subscription(
    mode: Option<&str>,
    token: Option<&str>,
    challenge: Option<&str>,
    expected_token: Option<&str>,
) -> Option<String> {
    match (mode, token, expected_token) {
        (Some("subscribe"), Some(given), Some(expected))
            if !expected.is_empty() && given == expected =>
        {
            info!("webhook subscription verified");
            Some(challenge.unwrap_or_default().to_string())
        }
        _ => {
            warn!("webhook subscription verification failed");
            None
        }
    }
}

/// Check an `X-Hub-Signature-256` header against the raw body.
///
/// With no app secret configured every payload is accepted. With a secret,
/// a missing header is a rejection and a header that is not `sha256=<hex>`
/// is an error.
pub fn verify_signature(
    secret: Option<&str>,
    body: &[u8],
    header: Option<&str>,
) -> Result<bool, Error> {
    let secret = match secret {
        Some(s) if !s.is_empty() => s,
        _ => return Ok(true),
    };
    let header = match header {
        Some(h) if !h.is_empty() => h,
        _ => return Ok(false),
    };

    let expected = header
        .strip_prefix("sha256=")
        .and_then(|digest| hex::decode(digest).ok())
        .ok_or_else(|| Error::MalformedSignature(header.to_string()))?;

    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
        .map_err(|_| Error::MalformedSignature(header.to_string()))?;
    mac.update(body);
    Ok(mac.verify_slice(&expected).is_ok())
}

/// `sha256=<hex>` signature for `body`, as Meta sends it
pub fn sign(secret: &str, body: &[u8]) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
        .expect("HMAC accepts any key length");
    mac.update(body);
    format!("sha256={}", hex::encode(mac.finalize().into_bytes()))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const WEBHOOK: &str = r#"{
        "object": "whatsapp_business_account",
        "entry": [{
            "id": "1234",
            "changes": [
                {
                    "field": "messages",
                    "value": {
                        "messaging_product": "whatsapp",
                        "messages": [
                            {
                                "from": "919800000001", "id": "wamid.A", "type": "text",
                                "text": {"body": "  weather in 390001 "}
                            },
                            {
                                "from": "919800000002", "id": "wamid.B", "type": "image",
                                "image": {"id": "img"}
                            }
                        ]
                    }
                },
                {
                    "field": "message_template_status_update",
                    "value": {"messages": [
                        {"from": "ignored", "type": "text", "text": {"body": "x"}}
                    ]}
                }
            ]
        }]
    }"#;

    #[test]
    fn test_parse_webhook() {
        let messages = parse_webhook(WEBHOOK).unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0], InboundMessage::text("919800000001", "weather in 390001"));
        assert_eq!(messages[1].kind, "image");
        assert_eq!(messages[1].text, "");
    }

    #[test]
    fn test_parse_status_only_webhook() {
        let body = r#"{"entry": [{"changes": [
            {"field": "messages", "value": {"statuses": [{"id": "x"}]}}
        ]}]}"#;
        assert!(parse_webhook(body).unwrap().is_empty());
        assert!(parse_webhook("{}").unwrap().is_empty());
        assert!(parse_webhook("not json").is_err());
    }

    #[test]
    fn test_verify_subscription() {
        assert_eq!(
            verify_subscription(Some("subscribe"), Some("tok"), Some("1158201444"), Some("tok")),
            Some("1158201444".to_string())
        );
        assert_eq!(
            verify_subscription(Some("subscribe"), Some("wrong"), Some("1"), Some("tok")),
            None
        );
        assert_eq!(
            verify_subscription(Some("unsubscribe"), Some("tok"), Some("1"), Some("tok")),
            None
        );
        assert_eq!(verify_subscription(Some("subscribe"), Some(""), Some("1"), Some("")), None);
        assert_eq!(verify_subscription(Some("subscribe"), Some("tok"), Some("1"), None), None);
    }

    #[test]
    fn test_signature_roundtrip_and_tamper() {
        let body = WEBHOOK.as_bytes();
        let header = sign("app-secret", body);
        assert!(header.starts_with("sha256="));
        assert_eq!(header.len(), "sha256=".len() + 64);

        assert!(verify_signature(Some("app-secret"), body, Some(&header)).unwrap());
        assert!(!verify_signature(Some("other-secret"), body, Some(&header)).unwrap());
        assert!(!verify_signature(Some("app-secret"), b"tampered", Some(&header)).unwrap());
    }

    #[test]
    fn test_sign_known_vector() {
        // RFC-style HMAC-SHA256 reference pair
        let body = b"The quick brown fox jumps over the lazy dog";
        let header = sign("key", body);
        assert_eq!(
            header,
            "sha256=f7bc83f430538424b13298e6aa6fb143ef4d59a14946175997479dbc2d1a3cd8"
        );

        // Hex digests are accepted in either case
        let upper = format!("sha256={}", header["sha256=".len()..].to_uppercase());
        assert!(verify_signature(Some("key"), body, Some(&upper)).unwrap());
    }

    #[test]
    fn test_signature_policy_edges() {
        // No secret configured: accepted regardless of header
        assert!(verify_signature(None, b"{}", None).unwrap());
        assert!(verify_signature(Some(""), b"{}", Some("garbage")).unwrap());

        // Secret configured, header missing
        assert!(!verify_signature(Some("s"), b"{}", None).unwrap());

        assert!(matches!(
            verify_signature(Some("s"), b"{}", Some("md5=abcd")),
            Err(Error::MalformedSignature(_))
        ));
        assert!(matches!(
            verify_signature(Some("s"), b"{}", Some("sha256=zz")),
            Err(Error::MalformedSignature(_))
        ));
    }

    #[test]
    fn test_from_config_requires_credentials() {
        let config = WhatsAppConfig {
            access_token: Some("token".to_string()),
            phone_number_id: Some(String::new()),
            ..Default::default()
        };
        let err = WhatsAppClient::from_config(&config).unwrap_err();
        assert!(err.to_string().contains("WHATSAPP_PHONE_NUMBER_ID"));

        let config = WhatsAppConfig {
            access_token: Some("token".to_string()),
            phone_number_id: Some("1055".to_string()),
            ..Default::default()
        };
        let client = WhatsAppClient::from_config(&config).unwrap();
        assert_eq!(
            client.messages_url(),
            "https://graph.facebook.com/v22.0/1055/messages"
        );
    }
}
