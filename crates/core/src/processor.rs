//! Message Processing
//!
//! One inbound chat message in, at most one reply out:
//! classify → dispatch → send. Failures are logged and reported in the
//! outcome; nothing here returns an error to the gateway.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::advisory::Advisor;
use crate::format::Texts;
use crate::intent::IntentRouter;
use crate::router::Dispatcher;
use crate::types::{InboundMessage, ParsedMessage};

/// Delivers reply text to a chat user
pub trait MessageSender {
    /// Send `body` to `to`, returning the gateway's message id
    fn send(&self, to: &str, body: &str) -> Result<String>;
}

impl<S: MessageSender + ?Sized> MessageSender for Box<S> {
    fn send(&self, to: &str, body: &str) -> Result<String> {
        (**self).send(to, body)
    }
}

/// Sender that only logs; used when replies should not leave the machine
#[derive(Debug, Clone, Copy, Default)]
pub struct DryRunSender;

impl MessageSender for DryRunSender {
    fn send(&self, to: &str, body: &str) -> Result<String> {
        info!(to, chars = body.chars().count(), "dry run, reply not sent");
        Ok("dry-run".to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessStatus {
    Success,
    /// Message kind the bot does not answer (images, reactions, ...)
    Skipped,
    Error,
}

/// What happened to one inbound message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessOutcome {
    pub status: ProcessStatus,
    pub response_sent: bool,
    pub message: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply: Option<String>,
}

/// Classifies, answers and replies to inbound messages
pub struct MessageProcessor<A: Advisor, S: MessageSender> {
    router: IntentRouter,
    dispatcher: Dispatcher<A>,
    sender: S,
}

impl<A: Advisor, S: MessageSender> MessageProcessor<A, S> {
    /// The reply texts follow the router's table version
    pub fn new(router: IntentRouter, advisor: A, sender: S) -> Self {
        let texts = Texts::for_version(router.table().version);
        Self {
            router,
            dispatcher: Dispatcher::new(advisor).with_texts(texts),
            sender,
        }
    }

    pub fn router(&self) -> &IntentRouter {
        &self.router
    }

    pub fn sender(&self) -> &S {
        &self.sender
    }

    pub fn classify(&self, text: &str) -> ParsedMessage {
        self.router.classify(text)
    }

    /// Reply text for `text`, without sending anything
    pub fn reply(&self, text: &str) -> String {
        let parsed = self.router.classify(text);
        self.dispatcher.respond(&parsed)
    }

    /// Handle one inbound message end to end
    pub fn process(&self, message: &InboundMessage) -> ProcessOutcome {
        if message.kind != "text" {
            debug!(from = %message.from, kind = %message.kind, "skipping non-text message");
            return ProcessOutcome {
                status: ProcessStatus::Skipped,
                response_sent: false,
                message: format!("Unsupported message type: {}", message.kind),
                message_id: None,
                reply: None,
            };
        }

        info!(from = %message.from, "processing message");
        let reply = self.reply(&message.text);

        match self.sender.send(&message.from, &reply) {
            Ok(id) => {
                info!(to = %message.from, message_id = %id, "reply sent");
                ProcessOutcome {
                    status: ProcessStatus::Success,
                    response_sent: true,
                    message: "Response sent successfully".to_string(),
                    message_id: Some(id),
                    reply: Some(reply),
                }
            }
            Err(e) => {
                warn!(to = %message.from, error = %format!("{:#}", e), "failed to send reply");
                ProcessOutcome {
                    status: ProcessStatus::Error,
                    response_sent: false,
                    message: format!("{:#}", e),
                    message_id: None,
                    reply: Some(reply),
                }
            }
        }
    }

    /// Handle a batch, one outcome per message; a failure never stops the batch
    pub fn process_all(&self, messages: &[InboundMessage]) -> Vec<ProcessOutcome> {
        messages.iter().map(|m| self.process(m)).collect()
    }
}

// ============================================================================
// Tests
// ============================================================================
