//! Reply Formatting
//!
//! Turns a classification and, for completed advisory intents, the
//! collaborator's answer into the single chat message sent back.
//! - Static texts: welcome, help, per-intent usage, fallbacks, apologies
//! - Advisory renderers with capped lists and timestamp footers
//! - Error-shaped answers render as `❌ <msg>` verbatim

use chrono::{DateTime, Local};

use crate::advisory::{AdvisoryResponse, CropAdvice, FertilizerGuide, MarketQuote, WeatherReport};
use crate::patterns::TableVersion;
use crate::types::{FallbackHint, Intent, ParsedMessage, Resolution, SoilReading};

pub const FAILURE_MARKER: &str = "❌ ";

const MAX_ALERTS: usize = 3;
const MAX_TIPS: usize = 3;
const MAX_FERTILIZERS: usize = 3;
const MAX_ORGANIC: usize = 2;
const MAX_MARKETS: usize = 3;

// ============================================================================
// Static Texts
// ============================================================================

pub const WELCOME: &str = "🌾 *नमस्ते! Welcome to Smart Crop Advisory Bot* 🌾

I'm here to help farmers with:

🌤️ *Weather & Alerts*
• Real-time weather updates
• Farming condition alerts

🌱 *Crop Guidance*
• Crop recommendations
• Fertilizer advice

💰 *Market Intelligence*
• Current crop prices
• Market trends

*Quick Start:*
• Type \"weather 390001\" for weather
• Type \"fertilizer wheat\" for advice
• Type \"rice prices\" for market info
• Type \"help\" for all commands

How can I help your farming today? 🚜";

pub const HELP: &str = "🌾 *Smart Crop Advisory Bot - Help Guide*

*🔥 NATURAL LANGUAGE COMMANDS:*
Just talk to me naturally! I understand:
• \"Weather in 390001\"
• \"Fertilizer for wheat\"
• \"Rice market prices\"
• \"What crop should I grow with 90 42 43 6.5 120\"

*⚡ QUICK COMMANDS:*
• `!weather [pincode]` - Weather alerts & farming conditions
• `!crop [N] [P] [K] [pH] [rainfall]` - Crop recommendations
• `!fertilizer [crop]` - Fertilizer guidance
• `!market [crop]` - Current market prices

*📍 EXAMPLES:*
• `!weather 390001` - Weather for pincode 390001
• `!crop 90 42 43 6.5 120` - Crop suggestion for soil values
• `!fertilizer wheat` - Fertilizer advice for wheat
• `!market tomato` - Current tomato prices

Type any command or question to get started! 🚀";

const WEATHER_USAGE: &str = "🌤️ *Weather Information*

Please provide your pincode:
`!weather [pincode]` or just \"weather [pincode]\"

Example: `!weather 390001` or \"weather in 390001\"

I'll provide current weather, alerts, and farming recommendations for your area.";

const CROP_USAGE: &str = "🌱 *Crop Recommendation*

Please provide soil parameters:
`!crop [N] [P] [K] [pH] [rainfall]`

Example: `!crop 90 42 43 6.5 120`
• N = Nitrogen level
• P = Phosphorus level
• K = Potassium level
• pH = Soil pH value
• Rainfall = Annual rainfall (mm)

I'll recommend the best crops for your soil conditions.";

const FERTILIZER_USAGE: &str = "🌿 *Fertilizer Guidance*

Please specify the crop:
`!fertilizer [crop]` or \"fertilizer for [crop]\"

Example: `!fertilizer wheat`

Popular crops: wheat, rice, corn, tomato, potato, cotton, sugarcane";

const MARKET_USAGE: &str = "💰 *Market Prices*

Please specify the crop:
`!market [crop]` or \"[crop] prices\"

Example: `!market tomato`

Popular crops: wheat, rice, tomato, onion, potato, cotton, sugarcane";

const NUMBERS_HINT: &str = "🤔 I see you mentioned some numbers. Are you trying to:

• Get weather info? Try: `!weather [pincode]`
• Get crop advice? Try: `!crop [N] [P] [K] [pH] [rainfall]`
• Check prices? Try: `!market [crop name]`

Type `!help` to see all commands.";

const UNKNOWN_COMMAND: &str = "❓ Unknown command. Type `!help` to see available commands.";

const GENERIC_HINT: &str = "🌾 I'm your Smart Crop Advisory Bot!

I can help with:
• Weather forecasts and farming alerts
• Crop recommendations based on soil conditions
• Fertilizer guidance for specific crops
• Current market prices

Type `!help` to see all commands or just ask me naturally:
• \"weather in 390001\"
• \"fertilizer for wheat\"
• \"rice market prices\"

How can I assist you today?";

const LEGACY_WELCOME: &str = "🌾 *Welcome to Smart Crop Advisory!*

I'm here to help you with:
• 🌱 Crop recommendations
• 🧪 Fertilizer guidance
• 🌤️ Weather alerts
• 💰 Market prices
• 🦠 Disease detection

Type `!help` to see all commands.

Example: `!crop 90 42 43 6.5 120` or `!weather 390001`";

const LEGACY_HELP: &str = "🌾 *Smart Crop Advisory Bot Commands*

*Available Commands:*
• `!crop N P K pH rainfall` - Get crop recommendation
  Example: `!crop 90 42 43 6.5 120`

• `!weather [pincode]` - Get weather alerts
  Example: `!weather 390001`

• `!fertilizer [crop]` - Get fertilizer guidance
  Example: `!fertilizer wheat`

• `!market [crop]` - Get market prices
  Example: `!market wheat`

• `!help` - Show this help message

*Quick Commands:*
• Type \"hi\" for welcome message
• Send plant image for disease detection (coming soon)";

const LEGACY_GENERIC: &str = "I didn't understand that command. 🤔

Try these:
• Type `!help` for all commands
• `!crop 90 42 43 6.5 120` for a crop recommendation
• `!weather [your pincode]` for weather alerts
• `!market wheat` for market prices

I'm here to help with your farming needs! 🌾";

/// Welcome, help and generic fallback texts of one table version
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Texts {
    pub welcome: &'static str,
    pub help: &'static str,
    pub generic: &'static str,
}

impl Texts {
    pub fn for_version(version: TableVersion) -> Self {
        match version {
            TableVersion::Enhanced => Self {
                welcome: WELCOME,
                help: HELP,
                generic: GENERIC_HINT,
            },
            // The command-only bot never advertises natural language
            TableVersion::Legacy => Self {
                welcome: LEGACY_WELCOME,
                help: LEGACY_HELP,
                generic: LEGACY_GENERIC,
            },
        }
    }
}

impl Default for Texts {
    fn default() -> Self {
        Self::for_version(TableVersion::Enhanced)
    }
}

/// How to use an intent whose arguments were missing or malformed
pub fn usage(intent: Intent) -> &'static str {
    match intent {
        Intent::Weather => WEATHER_USAGE,
        Intent::CropRecommendation => CROP_USAGE,
        Intent::Fertilizer => FERTILIZER_USAGE,
        Intent::Market => MARKET_USAGE,
        _ => HELP,
    }
}

pub fn fallback(hint: &FallbackHint) -> String {
    fallback_with(&Texts::default(), hint)
}

fn fallback_with(texts: &Texts, hint: &FallbackHint) -> String {
    match hint {
        FallbackHint::Numbers => NUMBERS_HINT.to_string(),
        FallbackHint::Crop(crop) => format!(
            "🌾 I see you mentioned {crop}. Here's what I can help with:

• `!fertilizer {crop}` - Get fertilizer recommendations
• `!market {crop}` - Check current market prices
• `!weather [your pincode]` - Weather conditions for {crop} farming

Type `!help` for all available commands."
        ),
        FallbackHint::UnknownCommand(_) => UNKNOWN_COMMAND.to_string(),
        FallbackHint::Generic => texts.generic.to_string(),
    }
}

/// Reply used when the advisory collaborator for `intent` could not answer
pub fn apology(intent: Intent) -> String {
    let subject = match intent {
        Intent::Weather => "weather data",
        Intent::CropRecommendation => "crop recommendation",
        Intent::Fertilizer => "fertilizer information",
        Intent::Market => "market prices",
        _ => "a response",
    };
    format!("{}Unable to get {}. Please try again.", FAILURE_MARKER, subject)
}

// ============================================================================
// Advisory Renderers
// ============================================================================

/// A collaborator answer for one completed advisory intent
#[derive(Debug, Clone, PartialEq)]
pub enum Advice {
    Weather(AdvisoryResponse<WeatherReport>),
    Crop {
        soil: SoilReading,
        response: AdvisoryResponse<CropAdvice>,
    },
    Fertilizer {
        crop: String,
        response: AdvisoryResponse<FertilizerGuide>,
    },
    Market {
        crop: String,
        response: AdvisoryResponse<MarketQuote>,
    },
}

/// Render the reply for a classified message.
///
/// `advice` is the collaborator answer when the message resolved to a complete
/// advisory intent; everything else renders from static text.
pub fn render(parsed: &ParsedMessage, advice: Option<&Advice>, now: &DateTime<Local>) -> String {
    render_with(&Texts::default(), parsed, advice, now)
}

/// `render` with the static texts of a specific table version
pub fn render_with(
    texts: &Texts,
    parsed: &ParsedMessage,
    advice: Option<&Advice>,
    now: &DateTime<Local>,
) -> String {
    if let Some(advice) = advice {
        return match advice {
            Advice::Weather(resp) => weather(resp, now),
            Advice::Crop { soil, response } => crop(soil, response),
            Advice::Fertilizer { crop, response } => fertilizer(crop, response),
            Advice::Market { crop, response } => market(crop, response, now),
        };
    }

    match &parsed.resolution {
        Resolution::Faq { answer, .. } => answer.clone(),
        Resolution::Fallback { hint } => fallback_with(texts, hint),
        Resolution::Usage => usage(parsed.intent).to_string(),
        Resolution::Complete => match parsed.intent {
            Intent::Greeting => texts.welcome.to_string(),
            Intent::Help => texts.help.to_string(),
            // An advisory intent without an answer to render
            other => apology(other),
        },
    }
}

fn failure(msg: &str) -> String {
    format!("{}{}", FAILURE_MARKER, msg)
}

fn bullets(out: &mut String, items: &[String], cap: usize) {
    for item in items.iter().take(cap) {
        out.push_str("• ");
        out.push_str(item);
        out.push('\n');
    }
}

fn or_na<T: std::fmt::Display>(value: Option<T>) -> String {
    value.map_or_else(|| "N/A".to_string(), |v| v.to_string())
}

fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

pub fn weather(resp: &AdvisoryResponse<WeatherReport>, now: &DateTime<Local>) -> String {
    let report = match resp {
        AdvisoryResponse::Failed { error } => return failure(error),
        AdvisoryResponse::Ready(report) => report,
    };
    let current = &report.current_weather;

    let mut out = format!(
        "🌤️ *Weather for {}*\n\n*Current Conditions:*\n\
         • Temperature: {}°C\n• Humidity: {}%\n• Wind: {} m/s\n• Conditions: {}",
        report.location,
        or_na(current.temperature),
        or_na(current.humidity),
        or_na(current.wind_speed),
        or_na(current.description.as_deref()),
    );

    if !report.alerts.is_empty() {
        out.push_str("\n\n*⚠️ Alerts:*\n");
        bullets(&mut out, &report.alerts, MAX_ALERTS);
    }

    if !report.agricultural_recommendations.is_empty() {
        out.push_str("\n*📋 Farming Tips:*\n");
        bullets(&mut out, &report.agricultural_recommendations, MAX_TIPS);
    }

    if let Some(conditions) = &report.farming_conditions {
        out.push_str("\n*🌾 Farming Conditions:*\n");
        out.push_str(&format!("• Overall: {}\n", or_na(conditions.overall.as_deref())));
        out.push_str(&format!(
            "• Best Hours: {}",
            or_na(conditions.best_farming_hours.as_deref())
        ));
    }

    out.push_str(&format!("\n\n📅 *Updated:* {}", now.format("%I:%M %p")));
    out
}

pub fn crop(soil: &SoilReading, resp: &AdvisoryResponse<CropAdvice>) -> String {
    let advice = match resp {
        AdvisoryResponse::Failed { error } => return failure(error),
        AdvisoryResponse::Ready(advice) => advice,
    };
    let name = &advice.recommended_crop;

    format!(
        "🌱 *Crop Recommendation*

*🎯 Recommended Crop:* *{title}*
*📊 Confidence:* {confidence:.1}%

*📋 Your Soil Analysis:*
• Nitrogen (N): {n}
• Phosphorus (P): {p}
• Potassium (K): {k}
• pH Level: {ph}
• Rainfall: {rainfall}mm

*📞 Next Steps:*
• `!fertilizer {name}` - Get fertilizer advice
• `!weather [pincode]` - Check farming conditions
• `!market {name}` - Check current prices",
        title = title_case(name),
        confidence = advice.confidence * 100.0,
        n = soil.n,
        p = soil.p,
        k = soil.k,
        ph = soil.ph,
        rainfall = soil.rainfall,
    )
}

pub fn fertilizer(crop: &str, resp: &AdvisoryResponse<FertilizerGuide>) -> String {
    let guide = match resp {
        AdvisoryResponse::Failed { error } => return failure(error),
        AdvisoryResponse::Ready(guide) => guide,
    };

    let mut out = format!(
        "🌿 *Fertilizer Guide for {}*\n\n*🧪 Recommended Fertilizers:*\n",
        title_case(crop)
    );
    bullets(&mut out, &guide.fertilizers, MAX_FERTILIZERS);

    if !guide.organic_options.is_empty() {
        out.push_str("\n*🌱 Organic Options:*\n");
        bullets(&mut out, &guide.organic_options, MAX_ORGANIC);
    }

    if let Some(timing) = &guide.application_timing {
        out.push_str(&format!("\n*📅 Best Application Time:*\n{}", timing));
    }

    if let Some(dosage) = &guide.dosage {
        out.push_str(&format!("\n*⚖️ Recommended Dosage:*\n{}", dosage));
    }

    out.push_str("\n\n*💡 Tip:* Always test soil before applying fertilizers for best results.");
    out
}

pub fn market(crop: &str, resp: &AdvisoryResponse<MarketQuote>, now: &DateTime<Local>) -> String {
    let quote = match resp {
        AdvisoryResponse::Failed { error } => return failure(error),
        AdvisoryResponse::Ready(quote) => quote,
    };

    let mut out = format!(
        "💰 *Market Prices for {}*

*📊 Current Prices:*
• Minimum: ₹{} per quintal
• Maximum: ₹{} per quintal
• Average: ₹{} per quintal

*📈 Market Trend:* {}

*📍 Major Markets:*
",
        title_case(crop),
        or_na(quote.min_price),
        or_na(quote.max_price),
        or_na(quote.avg_price),
        quote.trend.as_deref().unwrap_or("Stable"),
    );

    for listing in quote.markets.iter().take(MAX_MARKETS) {
        out.push_str(&format!("• {}: ₹{}/quintal\n", listing.name, or_na(listing.price)));
    }

    if let Some(rec) = &quote.recommendation {
        out.push_str(&format!("\n*💡 Recommendation:*\n{}", rec));
    }

    out.push_str(&format!(
        "\n\n📅 *Last Updated:* {}",
        now.format("%d %b %Y, %I:%M %p")
    ));
    out
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::advisory::{CurrentWeather, FarmingConditions, MarketListing};
    use crate::types::MatchSource;
    use chrono::TimeZone;

    fn fixed_now() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 3, 5, 14, 7, 0).unwrap()
    }

    fn lines(n: usize, prefix: &str) -> Vec<String> {
        (1..=n).map(|i| format!("{} {}", prefix, i)).collect()
    }

    #[test]
    fn test_weather_caps_and_footer() {
        let report = WeatherReport {
            location: "Vadodara".to_string(),
            current_weather: CurrentWeather {
                temperature: Some(36.5),
                humidity: None,
                wind_speed: Some(4.0),
                description: Some("clear sky".to_string()),
            },
            alerts: lines(5, "alert"),
            agricultural_recommendations: lines(4, "tip"),
            farming_conditions: Some(FarmingConditions {
                overall: Some("Moderate".to_string()),
                ..Default::default()
            }),
        };
        let text = weather(&AdvisoryResponse::Ready(report), &fixed_now());

        assert!(text.starts_with("🌤️ *Weather for Vadodara*"));
        assert!(text.contains("• Temperature: 36.5°C"));
        assert!(text.contains("• Humidity: N/A%"));
        assert!(text.contains("• alert 3"));
        assert!(!text.contains("• alert 4"));
        assert!(text.contains("• tip 3"));
        assert!(!text.contains("• tip 4"));
        assert!(text.contains("• Overall: Moderate"));
        assert!(text.contains("• Best Hours: N/A"));
        assert!(text.ends_with("📅 *Updated:* 02:07 PM"));
    }

    #[test]
    fn test_error_shape_renders_verbatim() {
        let msg = "Weather disabled. Set OPENWEATHER_API_KEY env var.";
        let text = weather(&AdvisoryResponse::failed(msg), &fixed_now());
        assert_eq!(text, format!("❌ {}", msg));

        let text = market("banana", &AdvisoryResponse::failed("not available"), &fixed_now());
        assert_eq!(text, "❌ not available");
    }

    #[test]
    fn test_crop_rendering() {
        let soil = SoilReading { n: 90.0, p: 42.0, k: 43.0, ph: 6.5, rainfall: 120.0 };
        let advice = CropAdvice {
            recommended_crop: "wheat".to_string(),
            confidence: 0.75,
            note: None,
        };
        let text = crop(&soil, &AdvisoryResponse::Ready(advice));
        assert!(text.contains("*Wheat*"));
        assert!(text.contains("75.0%"));
        assert!(text.contains("• pH Level: 6.5"));
        assert!(text.contains("• Rainfall: 120mm"));
        assert!(text.contains("`!market wheat`"));
    }

    #[test]
    fn test_fertilizer_caps() {
        let guide = FertilizerGuide {
            fertilizers: lines(4, "fert"),
            organic_options: lines(3, "organic"),
            application_timing: Some("At sowing".to_string()),
            dosage: None,
        };
        let text = fertilizer("rice", &AdvisoryResponse::Ready(guide));
        assert!(text.starts_with("🌿 *Fertilizer Guide for Rice*"));
        assert!(text.contains("• fert 3"));
        assert!(!text.contains("• fert 4"));
        assert!(text.contains("• organic 2"));
        assert!(!text.contains("• organic 3"));
        assert!(text.contains("At sowing"));
        assert!(!text.contains("Recommended Dosage"));
    }

    #[test]
    fn test_market_caps_and_footer() {
        let quote = MarketQuote {
            min_price: Some(2200.0),
            max_price: Some(2600.0),
            avg_price: None,
            trend: None,
            markets: (1..=4)
                .map(|i| MarketListing { name: format!("Mandi {}", i), price: Some(2400.0) })
                .collect(),
            recommendation: None,
        };
        let text = market("rice", &AdvisoryResponse::Ready(quote), &fixed_now());
        assert!(text.contains("• Minimum: ₹2200 per quintal"));
        assert!(text.contains("• Average: ₹N/A per quintal"));
        assert!(text.contains("*📈 Market Trend:* Stable"));
        assert!(text.contains("• Mandi 3: ₹2400/quintal"));
        assert!(!text.contains("Mandi 4"));
        assert!(text.ends_with("📅 *Last Updated:* 05 Mar 2024, 02:07 PM"));
    }

    #[test]
    fn test_static_replies() {
        let now = fixed_now();
        let greeting =
            ParsedMessage::complete(Intent::Greeting, vec![], MatchSource::Pattern, "hi");
        assert_eq!(render(&greeting, None, &now), WELCOME);

        let usage_msg = ParsedMessage::usage(Intent::Weather, MatchSource::Trigger, "weather");
        assert_eq!(render(&usage_msg, None, &now), WEATHER_USAGE);

        let faq = ParsedMessage::faq("soil", "Test your soil.", "soil?");
        assert_eq!(render(&faq, None, &now), "Test your soil.");

        let unknown = ParsedMessage::unrecognized(
            FallbackHint::UnknownCommand("foo".to_string()),
            MatchSource::Command,
            "!foo",
        );
        assert!(render(&unknown, None, &now).starts_with("❓ Unknown command"));
    }

    #[test]
    fn test_legacy_texts_stay_command_only() {
        let now = fixed_now();
        let legacy = Texts::for_version(TableVersion::Legacy);

        let greeting =
            ParsedMessage::complete(Intent::Greeting, vec![], MatchSource::Pattern, "hi");
        let welcome = render_with(&legacy, &greeting, None, &now);
        assert_eq!(welcome, LEGACY_WELCOME);
        assert!(!welcome.contains("weather 390001\""));

        let help = ParsedMessage::complete(Intent::Help, vec![], MatchSource::Pattern, "help");
        let text = render_with(&legacy, &help, None, &now);
        assert!(text.contains("`!crop N P K pH rainfall`"));
        assert!(!text.contains("NATURAL LANGUAGE"));

        let generic =
            ParsedMessage::unrecognized(FallbackHint::Generic, MatchSource::None, "tell me");
        assert!(render_with(&legacy, &generic, None, &now)
            .starts_with("I didn't understand that command."));
        assert_eq!(render(&generic, None, &now), GENERIC_HINT);

        // Usage texts are shared
        let usage_msg = ParsedMessage::usage(Intent::Market, MatchSource::Command, "!market");
        assert_eq!(render_with(&legacy, &usage_msg, None, &now), MARKET_USAGE);
    }

    #[test]
    fn test_crop_hint_names_crop() {
        let text = fallback(&FallbackHint::Crop("cotton".to_string()));
        assert!(text.contains("I see you mentioned cotton"));
        assert!(text.contains("`!market cotton`"));
    }

    #[test]
    fn test_apology() {
        assert_eq!(
            apology(Intent::Market),
            "❌ Unable to get market prices. Please try again."
        );
    }
}
