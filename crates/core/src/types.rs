//! Domain models shared by the router, dispatcher and gateway
//!
//! This module contains the core types used throughout the crate, including:
//! - Intent identifiers and typed arguments
//! - The per-message classification result (`ParsedMessage`)
//! - Soil readings handed to the crop advisor
//! - The inbound chat message shape

use serde::{Deserialize, Serialize};

use crate::error::Error;

// ============================================================================
// Intents
// ============================================================================

/// Intents a chat message can be classified into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    Weather,
    CropRecommendation,
    Fertilizer,
    Market,
    Greeting,
    Help,
    FarmingFaq,
    Unrecognized,
}

impl Intent {
    /// Stable snake_case name, matching the serde representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::Weather => "weather",
            Intent::CropRecommendation => "crop_recommendation",
            Intent::Fertilizer => "fertilizer",
            Intent::Market => "market",
            Intent::Greeting => "greeting",
            Intent::Help => "help",
            Intent::FarmingFaq => "farming_faq",
            Intent::Unrecognized => "unrecognized",
        }
    }

    /// Resolve a name from configuration. Accepts the short command names too.
    pub fn from_name(name: &str) -> Result<Self, Error> {
        match name.trim().to_lowercase().as_str() {
            "weather" => Ok(Intent::Weather),
            "crop" | "crop_recommendation" => Ok(Intent::CropRecommendation),
            "fertilizer" => Ok(Intent::Fertilizer),
            "market" => Ok(Intent::Market),
            "greeting" => Ok(Intent::Greeting),
            "help" => Ok(Intent::Help),
            "faq" | "farming_faq" => Ok(Intent::FarmingFaq),
            other => Err(Error::UnknownIntent(other.to_string())),
        }
    }

    /// Number of arguments a complete request for this intent carries
    pub fn arity(&self) -> usize {
        match self {
            Intent::Weather | Intent::Fertilizer | Intent::Market => 1,
            Intent::CropRecommendation => 5,
            _ => 0,
        }
    }
}

// ============================================================================
// Arguments
// ============================================================================

/// A captured argument, re-typed when the capture scheme asks for a number
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Arg {
    Number(f64),
    Text(String),
}

impl Arg {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Arg::Text(s) => Some(s),
            Arg::Number(_) => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Arg::Number(n) => Some(*n),
            Arg::Text(_) => None,
        }
    }
}

impl From<&str> for Arg {
    fn from(s: &str) -> Self {
        Arg::Text(s.to_string())
    }
}

impl From<f64> for Arg {
    fn from(n: f64) -> Self {
        Arg::Number(n)
    }
}

// ============================================================================
// Classification Result
// ============================================================================

/// Which part of the router produced the classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchSource {
    /// A full extraction pattern matched
    Pattern,
    /// Only the intent's trigger matched; arguments are incomplete
    Trigger,
    /// FAQ vocabulary lookup
    Keyword,
    /// `!command arg ...` syntax
    Command,
    /// Nothing matched
    None,
}

/// Shapes the fallback text of an unrecognized message. Never changes the intent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum FallbackHint {
    /// The message contains digits
    Numbers,
    /// The message mentions a known crop
    Crop(String),
    /// `!name` with a name no command answers to
    UnknownCommand(String),
    Generic,
}

/// How the router resolved the chosen intent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Resolution {
    /// All arguments the intent needs are present and typed
    Complete,
    /// The intent was recognised but its arguments are missing or malformed
    Usage,
    /// Canned guidance for a farming keyword
    Faq { keyword: String, answer: String },
    Fallback { hint: FallbackHint },
}

/// Result of matching one inbound message against the pattern table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedMessage {
    pub intent: Intent,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<Arg>,

    pub resolution: Resolution,

    pub source: MatchSource,

    /// The message exactly as received
    pub raw: String,
}

impl ParsedMessage {
    pub fn complete(intent: Intent, args: Vec<Arg>, source: MatchSource, raw: &str) -> Self {
        Self {
            intent,
            args,
            resolution: Resolution::Complete,
            source,
            raw: raw.to_string(),
        }
    }

    pub fn usage(intent: Intent, source: MatchSource, raw: &str) -> Self {
        Self {
            intent,
            args: Vec::new(),
            resolution: Resolution::Usage,
            source,
            raw: raw.to_string(),
        }
    }

    pub fn faq(keyword: &str, answer: &str, raw: &str) -> Self {
        Self {
            intent: Intent::FarmingFaq,
            args: Vec::new(),
            resolution: Resolution::Faq {
                keyword: keyword.to_string(),
                answer: answer.to_string(),
            },
            source: MatchSource::Keyword,
            raw: raw.to_string(),
        }
    }

    pub fn unrecognized(hint: FallbackHint, source: MatchSource, raw: &str) -> Self {
        Self {
            intent: Intent::Unrecognized,
            args: Vec::new(),
            resolution: Resolution::Fallback { hint },
            source,
            raw: raw.to_string(),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.resolution == Resolution::Complete
    }

    /// Text argument at `index`, if present and textual
    pub fn text_arg(&self, index: usize) -> Option<&str> {
        self.args.get(index).and_then(Arg::as_text)
    }
}

// ============================================================================
// Advisory Requests
// ============================================================================

/// Soil readings for a crop recommendation, in N, P, K, pH, rainfall order
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SoilReading {
    #[serde(rename = "nitrogen")]
    pub n: f64,
    #[serde(rename = "phosphorus")]
    pub p: f64,
    #[serde(rename = "potassium")]
    pub k: f64,
    pub ph: f64,
    pub rainfall: f64,
}

impl SoilReading {
    /// Build from the five numeric arguments of a crop recommendation
    pub fn from_args(args: &[Arg]) -> Option<Self> {
        let nums: Vec<f64> = args.iter().filter_map(Arg::as_number).collect();
        match nums.as_slice() {
            [n, p, k, ph, rainfall, ..] => Some(Self {
                n: *n,
                p: *p,
                k: *k,
                ph: *ph,
                rainfall: *rainfall,
            }),
            _ => None,
        }
    }
}

// ============================================================================
// Inbound Messages
// ============================================================================

/// One chat message handed over by the delivery gateway
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InboundMessage {
    /// Sender identifier (phone number for WhatsApp)
    pub from: String,

    #[serde(default)]
    pub text: String,

    #[serde(rename = "type", default = "default_kind")]
    pub kind: String,
}

fn default_kind() -> String {
    "text".to_string()
}

impl InboundMessage {
    pub fn text(from: &str, text: &str) -> Self {
        Self {
            from: from.to_string(),
            text: text.to_string(),
            kind: default_kind(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intent_names() {
        assert_eq!(Intent::CropRecommendation.as_str(), "crop_recommendation");
        assert_eq!(Intent::from_name("crop").unwrap(), Intent::CropRecommendation);
        assert_eq!(Intent::from_name(" Market ").unwrap(), Intent::Market);
        assert!(Intent::from_name("irrigation").is_err());
    }

    #[test]
    fn test_intent_arity() {
        assert_eq!(Intent::Weather.arity(), 1);
        assert_eq!(Intent::CropRecommendation.arity(), 5);
        assert_eq!(Intent::Greeting.arity(), 0);
    }

    #[test]
    fn test_soil_reading_from_args() {
        let args: Vec<Arg> = [90.0, 42.0, 43.0, 6.5, 120.0].into_iter().map(Arg::from).collect();
        let soil = SoilReading::from_args(&args).unwrap();
        assert_eq!(soil.ph, 6.5);
        assert_eq!(soil.rainfall, 120.0);

        assert!(SoilReading::from_args(&args[..4]).is_none());
    }

    #[test]
    fn test_soil_reading_serializes_long_names() {
        let soil = SoilReading { n: 1.0, p: 2.0, k: 3.0, ph: 6.5, rainfall: 100.0 };
        let json = serde_json::to_value(soil).unwrap();
        assert_eq!(json["nitrogen"], 1.0);
        assert_eq!(json["potassium"], 3.0);
    }

    #[test]
    fn test_parsed_message_json_shape() {
        let parsed = ParsedMessage::complete(
            Intent::Weather,
            vec![Arg::from("390001")],
            MatchSource::Pattern,
            "weather 390001",
        );
        let json = serde_json::to_value(&parsed).unwrap();
        assert_eq!(json["intent"], "weather");
        assert_eq!(json["args"][0], "390001");
        assert_eq!(json["resolution"]["type"], "complete");

        let fallback = ParsedMessage::unrecognized(
            FallbackHint::Crop("rice".into()),
            MatchSource::None,
            "rice?",
        );
        let json = serde_json::to_value(&fallback).unwrap();
        assert_eq!(json["resolution"]["hint"]["kind"], "crop");
        assert_eq!(json["resolution"]["hint"]["value"], "rice");
        assert!(json.get("args").is_none());
    }

    #[test]
    fn test_inbound_message_defaults_to_text() {
        let msg: InboundMessage =
            serde_json::from_str(r#"{"from": "919900000000", "text": "hi"}"#).unwrap();
        assert_eq!(msg.kind, "text");
        assert_eq!(msg, InboundMessage::text("919900000000", "hi"));
    }
}
