//! Intent Pattern Table
//!
//! The router's knowledge lives here as data: an ordered list of intent rules,
//! each with extraction patterns tried in declaration order and an optional
//! trigger that recognises the intent when its arguments are incomplete.
//!
//! Two table versions exist. `Enhanced` understands natural language and
//! farming keywords; `Legacy` answers only exact greetings, `help` and
//! `!command` syntax, as the first bot did.

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::types::{Arg, Intent};

// ============================================================================
// Captures
// ============================================================================

/// How one regex group becomes an argument
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capture {
    /// Six-digit area code, kept as text
    Code,
    /// Parsed as f64
    Number,
    /// A single crop-like token; stopwords reject the pattern
    Word,
}

impl Capture {
    pub fn from_name(name: &str) -> Result<Self, Error> {
        match name.trim().to_lowercase().as_str() {
            "code" => Ok(Capture::Code),
            "number" => Ok(Capture::Number),
            "word" => Ok(Capture::Word),
            other => Err(Error::UnknownCapture(other.to_string())),
        }
    }
}

/// Outcome of running one pattern against normalized text
#[derive(Debug, Clone, PartialEq)]
pub enum Extraction {
    /// Every capture converted cleanly
    Args(Vec<Arg>),
    /// The pattern matched but a capture failed to convert
    Malformed,
}

// ============================================================================
// Patterns and Rules
// ============================================================================

/// A compiled regex and the capture scheme for its groups
#[derive(Debug, Clone)]
pub struct Pattern {
    regex: Regex,
    captures: Vec<Capture>,
}

impl Pattern {
    pub fn new(intent: Intent, source: &str, captures: &[Capture]) -> Result<Self, Error> {
        let regex = RegexBuilder::new(source)
            .case_insensitive(true)
            .build()
            .map_err(|e| Error::InvalidPattern {
                intent: intent.as_str().to_string(),
                pattern: source.to_string(),
                source: e,
            })?;

        let groups = regex.captures_len() - 1;
        if groups != captures.len() {
            return Err(Error::CaptureMismatch {
                intent: intent.as_str().to_string(),
                pattern: source.to_string(),
                groups,
                declared: captures.len(),
            });
        }

        Ok(Self {
            regex,
            captures: captures.to_vec(),
        })
    }

    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }

    /// Run the pattern against already-normalized text.
    ///
    /// Returns `None` when the regex does not match or a word capture lands on
    /// a stopword, so the caller moves on to the next pattern.
    pub fn extract(&self, text: &str, stopwords: &[String]) -> Option<Extraction> {
        let caps = self.regex.captures(text)?;
        let mut args = Vec::with_capacity(self.captures.len());

        for (i, capture) in self.captures.iter().enumerate() {
            let value = caps.get(i + 1).map(|m| m.as_str()).unwrap_or("");
            match capture {
                Capture::Code => {
                    if value.len() != 6 || !value.bytes().all(|b| b.is_ascii_digit()) {
                        return Some(Extraction::Malformed);
                    }
                    args.push(Arg::from(value));
                }
                Capture::Number => match value.parse::<f64>() {
                    Ok(n) if n.is_finite() => args.push(Arg::Number(n)),
                    _ => return Some(Extraction::Malformed),
                },
                Capture::Word => {
                    if value.is_empty() || stopwords.iter().any(|s| s == value) {
                        return None;
                    }
                    args.push(Arg::from(value));
                }
            }
        }

        Some(Extraction::Args(args))
    }
}

/// An intent with its patterns, in priority order within the table
#[derive(Debug, Clone)]
pub struct IntentRule {
    pub intent: Intent,
    pub patterns: Vec<Pattern>,
    pub trigger: Option<Regex>,
}

impl IntentRule {
    /// First pattern that yields an extraction wins
    pub fn extract(&self, text: &str, stopwords: &[String]) -> Option<Extraction> {
        self.patterns.iter().find_map(|p| p.extract(text, stopwords))
    }

    pub fn triggered(&self, text: &str) -> bool {
        self.trigger.as_ref().is_some_and(|t| t.is_match(text))
    }
}

// ============================================================================
// FAQ Vocabulary
// ============================================================================

/// How FAQ keywords are located in a message
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FaqMatch {
    /// Raw containment: "pricey" hits "price"
    #[default]
    Substring,
    /// Whole words only
    Word,
}

#[derive(Debug, Clone)]
pub struct FaqEntry {
    pub keyword: String,
    pub answer: String,
    word: Regex,
}

impl FaqEntry {
    fn new(keyword: &str, answer: &str) -> Self {
        let word = Regex::new(&format!(r"\b{}\b", regex::escape(keyword)))
            .expect("escaped keyword is a valid regex");
        Self {
            keyword: keyword.to_string(),
            answer: answer.to_string(),
            word,
        }
    }

    pub fn hits(&self, text: &str, policy: FaqMatch) -> bool {
        match policy {
            FaqMatch::Substring => text.contains(&self.keyword),
            FaqMatch::Word => self.word.is_match(text),
        }
    }
}

// ============================================================================
// Pattern Table
// ============================================================================

/// Which generation of the bot the table reproduces
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableVersion {
    #[default]
    Enhanced,
    Legacy,
}

/// A user-supplied pattern row, appended after the built-ins for its intent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternRow {
    pub intent: String,
    pub regex: String,
    #[serde(default)]
    pub captures: Vec<String>,
}

/// Immutable routing table. Built once, then shared by reference.
#[derive(Debug, Clone)]
pub struct PatternTable {
    pub version: TableVersion,
    /// Evaluated in this order; the first full match wins
    pub rules: Vec<IntentRule>,
    pub faq: Vec<FaqEntry>,
    pub faq_match: FaqMatch,
    /// Crop names recognised by the unrecognized-message fallback
    pub crops: Vec<String>,
    /// Tokens a word capture may never take
    pub stopwords: Vec<String>,
    /// Whether `!command` syntax is understood
    pub commands: bool,
    /// Whether unrecognized messages get content-dependent hints
    pub smart_fallback: bool,
}

const NUM: &str = r"(\d+(?:\.\d+)?)";
const PH: &str = r"([\d.]+)";

const PRIORITY: [Intent; 6] = [
    Intent::Greeting,
    Intent::Help,
    Intent::Weather,
    Intent::CropRecommendation,
    Intent::Fertilizer,
    Intent::Market,
];

const CROPS: [&str; 9] = [
    "wheat", "rice", "corn", "tomato", "potato", "onion", "cotton", "sugarcane", "soybean",
];

const STOPWORDS: [&str; 40] = [
    "a", "an", "the", "is", "are", "it", "this", "that", "i", "me", "my", "you", "can", "do",
    "does", "should", "to", "for", "of", "in", "on", "with", "what", "which", "how", "much",
    "use", "best", "good", "now", "today", "current", "please", "price", "prices", "market",
    "crop", "crops", "fertilizer", "weather",
];

const FAQ: [(&str, &str); 7] = [
    (
        "soil",
        "🌱 For soil questions I can recommend a crop from your soil test. \
         Send: !crop [N] [P] [K] [pH] [rainfall]",
    ),
    (
        "disease",
        "🦠 For plant diseases, take a clear photo of the affected leaves. \
         Photo diagnosis is coming soon!",
    ),
    (
        "irrigation",
        "💧 For irrigation planning, check the weather first with !weather [pincode]. \
         Rainfall and humidity guide watering.",
    ),
    (
        "seeds",
        "🌰 For seed choice, send your soil values with !crop \
         and I will suggest the best crop for your field.",
    ),
    (
        "pest",
        "🐛 For pest control, crop-specific advice comes with !fertilizer [crop], \
         including general pest management tips.",
    ),
    (
        "organic",
        "🌿 For organic farming, !fertilizer [crop] lists organic options \
         alongside chemical fertilizers.",
    ),
    (
        "price",
        "💰 For current mandi prices, send !market [crop].",
    ),
];

fn compile(source: &str) -> Regex {
    RegexBuilder::new(source)
        .case_insensitive(true)
        .build()
        .expect("built-in regex is valid")
}

fn builtin(intent: Intent, rows: &[(&str, &[Capture])]) -> Vec<Pattern> {
    rows.iter()
        .map(|(source, captures)| {
            Pattern::new(intent, source, captures).expect("built-in pattern is valid")
        })
        .collect()
}

fn crop_pattern(lead: &str) -> String {
    format!(r"{lead}{NUM}\s+{NUM}\s+{NUM}\s+{PH}\s+{NUM}")
}

impl PatternTable {
    pub fn for_version(version: TableVersion) -> Self {
        match version {
            TableVersion::Enhanced => Self::enhanced(),
            TableVersion::Legacy => Self::legacy(),
        }
    }

    /// Natural-language table
    pub fn enhanced() -> Self {
        use Capture::*;

        let crop_direct = crop_pattern(r"crop\s+");
        let crop_recommend = crop_pattern(r"recommend\s+crop\b.*?\b");
        let crop_what = crop_pattern(r"what\s+crop\b.*?\b");
        let crop_which = crop_pattern(r"which\s+crop\b.*?\b");
        let five: &[Capture] = &[Number, Number, Number, Number, Number];

        let rules = PRIORITY
            .iter()
            .map(|&intent| {
                let (patterns, trigger) = match intent {
                    Intent::Greeting => (
                        builtin(
                            intent,
                            &[
                                (r"\b(?:hi|hello|hey|namaste|namaskar|start|begin)\b", &[]),
                                (r"\bgood\s+(?:morning|evening|afternoon)\b", &[]),
                            ],
                        ),
                        None,
                    ),
                    Intent::Help => (
                        builtin(
                            intent,
                            &[
                                (r"\b(?:help|commands|instructions|menu|options)\b", &[]),
                                (r"\bwhat\s+can\s+you\s+do\b", &[]),
                                (r"\bhow\s+to\s+use\b", &[]),
                            ],
                        ),
                        None,
                    ),
                    Intent::Weather => (
                        builtin(
                            intent,
                            &[
                                (r"weather\s+(\d{6})\b", &[Code]),
                                (r"weather\s+in\s+(\d{6})\b", &[Code]),
                                (r"weather\s+for\s+(\d{6})\b", &[Code]),
                                (r"what.*weather.*\b(\d{6})\b", &[Code]),
                                (r"how.*weather.*\b(\d{6})\b", &[Code]),
                                (r"weather\s+today\s+(\d{6})\b", &[Code]),
                                (r"\b(\d{6})\s+weather", &[Code]),
                                (r"weather\b.*?\b(\d{6})\b", &[Code]),
                            ],
                        ),
                        Some(compile(r"\bweather\b")),
                    ),
                    Intent::CropRecommendation => (
                        builtin(
                            intent,
                            &[
                                (crop_direct.as_str(), five),
                                (crop_recommend.as_str(), five),
                                (crop_what.as_str(), five),
                                (crop_which.as_str(), five),
                            ],
                        ),
                        Some(compile(r"^crop\b|\b(?:recommend|what|which)\s+crop\b")),
                    ),
                    Intent::Fertilizer => (
                        builtin(
                            intent,
                            &[
                                (r"fertilizer\s+for\s+(\w+)", &[Word]),
                                (r"fertilizer\s+(\w+)", &[Word]),
                                (r"what\s+fertilizer\b.*\b(\w+)", &[Word]),
                                (r"which\s+fertilizer\b.*\b(\w+)", &[Word]),
                                (r"(\w+)\s+fertilizer", &[Word]),
                            ],
                        ),
                        Some(compile(r"\bfertili[sz]er\b")),
                    ),
                    Intent::Market => (
                        builtin(
                            intent,
                            &[
                                (r"market\s+prices?\s+(?:(?:for|of)\s+)?(\w+)", &[Word]),
                                (r"market\s+(\w+)", &[Word]),
                                (r"prices?\s+(?:of|for)\s+(\w+)", &[Word]),
                                (r"(\w+)\s+price", &[Word]),
                                (r"what.*price.*\b(\w+)", &[Word]),
                                (r"how\s+much.*\b(\w+)", &[Word]),
                                (r"(\w+)\s+market", &[Word]),
                            ],
                        ),
                        Some(compile(r"\bmarket\b")),
                    ),
                    _ => (Vec::new(), None),
                };
                IntentRule {
                    intent,
                    patterns,
                    trigger,
                }
            })
            .collect();

        Self {
            version: TableVersion::Enhanced,
            rules,
            faq: FAQ.iter().map(|(k, a)| FaqEntry::new(k, a)).collect(),
            faq_match: FaqMatch::default(),
            crops: CROPS.iter().map(|c| c.to_string()).collect(),
            stopwords: STOPWORDS.iter().map(|s| s.to_string()).collect(),
            commands: true,
            smart_fallback: true,
        }
    }

    /// Exact-keyword table of the first bot generation
    pub fn legacy() -> Self {
        let rules = PRIORITY
            .iter()
            .map(|&intent| {
                let patterns = match intent {
                    Intent::Greeting => builtin(intent, &[(r"^(?:hi|hello|start|hey)$", &[])]),
                    Intent::Help => builtin(intent, &[(r"^help$", &[])]),
                    _ => Vec::new(),
                };
                IntentRule {
                    intent,
                    patterns,
                    trigger: None,
                }
            })
            .collect();

        Self {
            version: TableVersion::Legacy,
            rules,
            faq: Vec::new(),
            faq_match: FaqMatch::default(),
            crops: CROPS.iter().map(|c| c.to_string()).collect(),
            stopwords: STOPWORDS.iter().map(|s| s.to_string()).collect(),
            commands: true,
            smart_fallback: false,
        }
    }

    pub fn with_faq_match(mut self, policy: FaqMatch) -> Self {
        self.faq_match = policy;
        self
    }

    /// Append configured rows after the built-in patterns of their intent
    pub fn with_rows(mut self, rows: &[PatternRow]) -> Result<Self, Error> {
        for row in rows {
            let intent = Intent::from_name(&row.intent)?;
            let captures = row
                .captures
                .iter()
                .map(|c| Capture::from_name(c))
                .collect::<Result<Vec<_>, _>>()?;
            let pattern = Pattern::new(intent, &row.regex, &captures)?;

            let rule = self
                .rules
                .iter_mut()
                .find(|r| r.intent == intent)
                .ok_or_else(|| Error::UnknownIntent(row.intent.clone()))?;
            rule.patterns.push(pattern);
        }
        Ok(self)
    }

    pub fn rule(&self, intent: Intent) -> Option<&IntentRule> {
        self.rules.iter().find(|r| r.intent == intent)
    }

    pub fn faq_hit(&self, text: &str) -> Option<&FaqEntry> {
        self.faq.iter().find(|e| e.hits(text, self.faq_match))
    }

    /// First known crop (in table order) contained in the text
    pub fn crop_mention(&self, text: &str) -> Option<&str> {
        self.crops
            .iter()
            .find(|c| text.contains(c.as_str()))
            .map(String::as_str)
    }
}

impl Default for PatternTable {
    fn default() -> Self {
        Self::enhanced()
    }
}

// ============================================================================
// Tests
// ============================================================================
