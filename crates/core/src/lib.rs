//! Smart Crop Advisory Core Library
//!
//! This crate provides the core functionality for the crop advisory chat bot:
//! - Intent classification against a versioned pattern table
//! - Dispatch to the advisory collaborators (HTTP backend or local tables)
//! - Reply formatting
//! - Inbound message processing with WhatsApp Cloud API and Telegram gateways
//! - TOML configuration

pub mod error;
pub mod types;

pub mod advisory;
pub mod config;
pub mod format;
pub mod intent;
pub mod patterns;
pub mod processor;
pub mod router;
pub mod telegram;
pub mod whatsapp;

// Re-export commonly used types at crate root
pub use error::Error;
pub use types::{
    Arg, FallbackHint, InboundMessage, Intent, MatchSource, ParsedMessage, Resolution,
    SoilReading,
};

pub use advisory::{Advisor, AdvisoryResponse, HttpAdvisor, LocalAdvisor};
pub use config::AppConfig;
pub use intent::IntentRouter;
pub use patterns::{FaqMatch, PatternTable, TableVersion};
pub use processor::{
    DryRunSender, MessageProcessor, MessageSender, ProcessOutcome, ProcessStatus,
};
pub use router::Dispatcher;
pub use telegram::TelegramClient;
pub use whatsapp::WhatsAppClient;
