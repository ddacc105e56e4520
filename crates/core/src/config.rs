//! Configuration
//!
//! Loaded from TOML (explicit path, else `<config_dir>/crop-advisory/config.toml`,
//! else built-in defaults). String credentials may hold `${VAR}` placeholders
//! that are expanded from the environment when read, so a `.env` file loaded
//! with `dotenvy` is enough to run without a config file at all.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;
use tracing::debug;

use crate::advisory::{Advisor, HttpAdvisor, LocalAdvisor};
use crate::intent::IntentRouter;
use crate::patterns::{FaqMatch, PatternRow, PatternTable, TableVersion};

const CONFIG_SUBDIR: &str = "crop-advisory";
const CONFIG_FILE: &str = "config.toml";

// ============================================================================
// Sections
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub router: RouterConfig,
    pub advisory: AdvisoryConfig,
    pub whatsapp: WhatsAppConfig,
    pub telegram: TelegramConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    pub version: TableVersion,
    pub faq_match: FaqMatch,
    /// Extra rows appended after the built-in patterns of their intent
    pub patterns: Vec<PatternRow>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdvisoryMode {
    #[default]
    Http,
    Local,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdvisoryConfig {
    pub mode: AdvisoryMode,
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for AdvisoryConfig {
    fn default() -> Self {
        Self {
            mode: AdvisoryMode::Http,
            base_url: "http://localhost:8000".to_string(),
            timeout_secs: 10,
        }
    }
}

/// WhatsApp Cloud API settings. Values are kept as written and expanded on read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WhatsAppConfig {
    pub access_token: Option<String>,
    pub phone_number_id: Option<String>,
    pub verify_token: Option<String>,
    pub app_secret: Option<String>,
    pub api_version: String,
}

impl Default for WhatsAppConfig {
    fn default() -> Self {
        Self {
            access_token: Some("${WHATSAPP_ACCESS_TOKEN}".to_string()),
            phone_number_id: Some("${WHATSAPP_PHONE_NUMBER_ID}".to_string()),
            verify_token: Some("${WHATSAPP_VERIFY_TOKEN}".to_string()),
            app_secret: Some("${WHATSAPP_APP_SECRET}".to_string()),
            api_version: "v22.0".to_string(),
        }
    }
}

impl WhatsAppConfig {
    pub fn access_token(&self) -> Option<String> {
        resolve(&self.access_token)
    }

    pub fn phone_number_id(&self) -> Option<String> {
        resolve(&self.phone_number_id)
    }

    pub fn verify_token(&self) -> Option<String> {
        resolve(&self.verify_token)
    }

    pub fn app_secret(&self) -> Option<String> {
        resolve(&self.app_secret)
    }
}

/// Telegram Bot API settings, expanded on read like the WhatsApp ones
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelegramConfig {
    pub bot_token: Option<String>,
    /// Expected `X-Telegram-Bot-Api-Secret-Token`; unset accepts every update
    pub webhook_secret: Option<String>,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: Some("${TELEGRAM_BOT_TOKEN}".to_string()),
            webhook_secret: Some("${TELEGRAM_WEBHOOK_SECRET}".to_string()),
        }
    }
}

impl TelegramConfig {
    pub fn bot_token(&self) -> Option<String> {
        resolve(&self.bot_token)
    }

    pub fn webhook_secret(&self) -> Option<String> {
        resolve(&self.webhook_secret)
    }
}

/// Expand a configured value; unset variables and empty results read as unset
fn resolve(value: &Option<String>) -> Option<String> {
    let raw = value.as_deref()?;
    match substitute_env(raw) {
        Ok(s) if !s.trim().is_empty() => Some(s),
        Ok(_) => None,
        Err(e) => {
            debug!(error = %e, "config value left unset");
            None
        }
    }
}

/// Substitute ${ENV_VAR} placeholders from environment
pub fn substitute_env(template: &str) -> Result<String> {
    static PLACEHOLDER: OnceLock<regex::Regex> = OnceLock::new();
    let re = PLACEHOLDER
        .get_or_init(|| regex::Regex::new(r"\$\{(\w+)\}").expect("Invalid regex"));

    let mut result = template.to_string();
    for cap in re.captures_iter(template) {
        let full_match = &cap[0];
        let var_name = &cap[1];

        let value = env::var(var_name)
            .with_context(|| format!("Missing environment variable: {}", var_name))?;

        result = result.replace(full_match, &value);
    }

    Ok(result)
}

// ============================================================================
// Loading
// ============================================================================

/// `<config_dir>/crop-advisory/config.toml`, when the platform has a config dir
pub fn default_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(CONFIG_SUBDIR).join(CONFIG_FILE))
}

impl AppConfig {
    /// Load from `path`, or the default location, or fall back to defaults.
    ///
    /// An explicit path must exist; the default location is optional.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::from_file(p),
            None => match default_path() {
                Some(p) if p.exists() => Self::from_file(&p),
                _ => {
                    debug!("no config file, using defaults");
                    Ok(Self::default())
                }
            },
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config = Self::from_toml(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).context("Invalid TOML")
    }

    /// The pattern table this configuration describes; bad rows are fatal
    pub fn build_table(&self) -> Result<PatternTable> {
        let table = PatternTable::for_version(self.router.version)
            .with_faq_match(self.router.faq_match)
            .with_rows(&self.router.patterns)
            .context("Invalid [[router.patterns]] entry")?;
        Ok(table)
    }

    pub fn build_router(&self) -> Result<IntentRouter> {
        Ok(IntentRouter::new(self.build_table()?))
    }

    /// The advisor selected by `[advisory] mode`, or the local one when forced
    pub fn build_advisor(&self, force_local: bool) -> Result<Box<dyn Advisor>> {
        if force_local || self.advisory.mode == AdvisoryMode::Local {
            return Ok(Box::new(LocalAdvisor::new()));
        }
        let advisor = HttpAdvisor::new(
            &self.advisory.base_url,
            Duration::from_secs(self.advisory.timeout_secs),
        )?;
        Ok(Box::new(advisor))
    }
}

// ============================================================================
// Tests
// ============================================================================
