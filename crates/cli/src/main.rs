//! Smart Crop Advisory CLI
//!
//! A thin wrapper around crop-advisory-core: classify and answer messages,
//! replay WhatsApp webhook bodies or Telegram updates, and run the
//! subscription handshake.

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

use crop_advisory_core::{
    telegram, whatsapp, AppConfig, DryRunSender, InboundMessage, MessageProcessor, MessageSender,
    TelegramClient, WhatsAppClient,
};

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "crop-advisory")]
#[command(about = "Route farmer chat messages to crop advisory answers")]
struct Args {
    /// Path to config.toml (defaults to <config dir>/crop-advisory/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose debug output
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the classification of a message as JSON
    Classify {
        /// Message text as a farmer would send it
        text: String,
    },

    /// Print the reply the bot would send for a message
    Reply {
        text: String,

        /// Answer from the built-in demo tables instead of the backend
        #[arg(long)]
        local: bool,
    },

    /// Process a WhatsApp webhook body (file path or "-" for stdin)
    Webhook {
        input: String,

        /// Value of the X-Hub-Signature-256 header
        #[arg(long)]
        signature: Option<String>,

        /// Send replies through WhatsApp instead of printing them
        #[arg(long)]
        send: bool,

        /// Answer from the built-in demo tables instead of the backend
        #[arg(long)]
        local: bool,
    },

    /// Process one Telegram update (file path or "-" for stdin)
    Telegram {
        input: String,

        /// Value of the X-Telegram-Bot-Api-Secret-Token header
        #[arg(long)]
        secret_token: Option<String>,

        /// Send the reply through the Bot API instead of printing it
        #[arg(long)]
        send: bool,

        /// Answer from the built-in demo tables instead of the backend
        #[arg(long)]
        local: bool,
    },

    /// Answer a webhook subscription handshake
    Verify {
        #[arg(long)]
        mode: String,
        #[arg(long)]
        token: String,
        #[arg(long)]
        challenge: String,
    },

    /// Send one text message
    Send {
        /// Phone number (WhatsApp) or chat id (Telegram)
        to: String,
        body: String,

        #[arg(long, value_enum, default_value_t = Channel::Whatsapp)]
        via: Channel,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum Channel {
    Whatsapp,
    Telegram,
}

// ============================================================================
// Setup
// ============================================================================

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    // A second init (tests) is harmless
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

fn read_input(input: &str) -> Result<String> {
    if input == "-" {
        let mut body = String::new();
        io::stdin()
            .read_to_string(&mut body)
            .context("Failed to read request body from stdin")?;
        Ok(body)
    } else {
        fs::read_to_string(Path::new(input))
            .with_context(|| format!("Failed to read request body: {}", input))
    }
}

// ============================================================================
// Commands
// ============================================================================

fn run_webhook(
    config: &AppConfig,
    body: &str,
    signature: Option<&str>,
    send: bool,
    local: bool,
) -> Result<String> {
    let secret = config.whatsapp.app_secret();
    if !whatsapp::verify_signature(secret.as_deref(), body.as_bytes(), signature)? {
        return Err(anyhow!("Invalid webhook signature"));
    }

    let messages = whatsapp::parse_webhook(body)?;
    debug!(count = messages.len(), "webhook messages");

    let sender: Box<dyn MessageSender> = if send {
        Box::new(WhatsAppClient::from_config(&config.whatsapp)?)
    } else {
        Box::new(DryRunSender)
    };
    process_report(config, &messages, sender, local)
}

fn run_telegram(
    config: &AppConfig,
    body: &str,
    secret_token: Option<&str>,
    send: bool,
    local: bool,
) -> Result<String> {
    let expected = config.telegram.webhook_secret();
    if !telegram::verify_secret_token(expected.as_deref(), secret_token) {
        return Err(anyhow!("Invalid Telegram secret token"));
    }

    let messages: Vec<InboundMessage> = telegram::parse_update(body)?.into_iter().collect();

    let sender: Box<dyn MessageSender> = if send {
        Box::new(TelegramClient::from_config(&config.telegram)?)
    } else {
        Box::new(DryRunSender)
    };
    process_report(config, &messages, sender, local)
}

/// Run inbound messages through the processor and report outcomes as JSON
fn process_report(
    config: &AppConfig,
    messages: &[InboundMessage],
    sender: Box<dyn MessageSender>,
    local: bool,
) -> Result<String> {
    let router = config.build_router()?;
    let advisor = config.build_advisor(local)?;

    let processor = MessageProcessor::new(router, advisor, sender);
    let outcomes = processor.process_all(messages);
    Ok(serde_json::to_string_pretty(&outcomes)?)
}

fn run(args: Args) -> Result<()> {
    let config = AppConfig::load(args.config.as_deref())?;

    match args.command {
        Command::Classify { text } => {
            let router = config.build_router()?;
            let parsed = router.classify(&text);
            println!("{}", serde_json::to_string_pretty(&parsed)?);
        }

        Command::Reply { text, local } => {
            let processor = MessageProcessor::new(
                config.build_router()?,
                config.build_advisor(local)?,
                DryRunSender,
            );
            println!("{}", processor.reply(&text));
        }

        Command::Webhook {
            input,
            signature,
            send,
            local,
        } => {
            let body = read_input(&input)?;
            let report = run_webhook(&config, &body, signature.as_deref(), send, local)?;
            println!("{}", report);
        }

        Command::Telegram {
            input,
            secret_token,
            send,
            local,
        } => {
            let body = read_input(&input)?;
            let report = run_telegram(&config, &body, secret_token.as_deref(), send, local)?;
            println!("{}", report);
        }

        Command::Verify {
            mode,
            token,
            challenge,
        } => {
            let expected = config.whatsapp.verify_token();
            match whatsapp::verify_subscription(
                Some(mode.as_str()),
                Some(token.as_str()),
                Some(challenge.as_str()),
                expected.as_deref(),
            ) {
                Some(echo) => println!("{}", echo),
                None => return Err(anyhow!("Verification failed")),
            }
        }

        Command::Send { to, body, via } => {
            let client: Box<dyn MessageSender> = match via {
                Channel::Whatsapp => Box::new(WhatsAppClient::from_config(&config.whatsapp)?),
                Channel::Telegram => Box::new(TelegramClient::from_config(&config.telegram)?),
            };
            let id = client.send(&to, &body)?;
            println!("{}", id);
        }
    }

    Ok(())
}

// ============================================================================
// Main
// ============================================================================

fn main() -> Result<()> {
    // Load environment variables from .env file (if present)
    dotenvy::dotenv().ok();

    let args = Args::parse();
    init_tracing(args.verbose);

    run(args).map_err(|e| {
        warn!(error = %format!("{:#}", e), "command failed");
        e
    })
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use crop_advisory_core::config::AdvisoryMode;

    fn local_config() -> AppConfig {
        let mut config = AppConfig::default();
        config.advisory.mode = AdvisoryMode::Local;
        config.whatsapp.app_secret = Some("test-secret".to_string());
        config.telegram.webhook_secret = Some("tg-secret".to_string());
        config
    }

    const BODY: &str = r#"{"entry": [{"changes": [{"field": "messages", "value": {"messages": [
        {"from": "919800000001", "type": "text", "text": {"body": "!market rice"}}
    ]}}]}]}"#;

    #[test]
    fn test_cli_definition() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_parse_subcommands() {
        let args = Args::parse_from(["crop-advisory", "-v", "reply", "--local", "hi"]);
        assert!(args.verbose);
        assert!(matches!(args.command, Command::Reply { local: true, .. }));

        let args = Args::parse_from([
            "crop-advisory",
            "verify",
            "--mode",
            "subscribe",
            "--token",
            "t",
            "--challenge",
            "42",
        ]);
        assert!(matches!(args.command, Command::Verify { .. }));

        let args = Args::parse_from(["crop-advisory", "send", "--via", "telegram", "42", "hi"]);
        assert!(matches!(
            args.command,
            Command::Send {
                via: Channel::Telegram,
                ..
            }
        ));
    }

    #[test]
    fn test_webhook_signed_dry_run() {
        let config = local_config();
        let signature = whatsapp::sign("test-secret", BODY.as_bytes());
        let report = run_webhook(&config, BODY, Some(&signature), false, false).unwrap();

        assert!(report.contains("\"status\": \"success\""));
        assert!(report.contains("Market Prices for Rice"));
    }

    #[test]
    fn test_webhook_rejects_bad_signature() {
        let config = local_config();
        let signature = whatsapp::sign("wrong-secret", BODY.as_bytes());
        let err = run_webhook(&config, BODY, Some(&signature), false, false).unwrap_err();
        assert!(err.to_string().contains("Invalid webhook signature"));
    }

    const UPDATE: &str = r#"{"update_id": 7, "message": {
        "message_id": 3, "chat": {"id": 5550001}, "text": "fertilizer for wheat"
    }}"#;

    #[test]
    fn test_telegram_update_dry_run() {
        let config = local_config();
        let report = run_telegram(&config, UPDATE, Some("tg-secret"), false, false).unwrap();

        assert!(report.contains("\"status\": \"success\""));
        assert!(report.contains("Fertilizer Guide for Wheat"));
    }

    #[test]
    fn test_telegram_rejects_bad_secret_and_ignores_empty_update() {
        let config = local_config();
        let err = run_telegram(&config, UPDATE, Some("nope"), false, false).unwrap_err();
        assert!(err.to_string().contains("Invalid Telegram secret token"));

        let report =
            run_telegram(&config, r#"{"update_id": 8}"#, Some("tg-secret"), false, false).unwrap();
        assert_eq!(report.trim(), "[]");
    }
}
