//! Intent Classification
//!
//! Turns one free-text chat message into exactly one intent plus typed
//! arguments. Classification is total and pure: the only input besides the
//! text is the immutable pattern table.

use tracing::debug;

use crate::patterns::{Extraction, PatternTable};
use crate::types::{Arg, FallbackHint, Intent, MatchSource, ParsedMessage};

/// Command sentinel kept for compatibility with earlier bot versions
pub const COMMAND_PREFIX: char = '!';

/// Classifies messages against a pattern table
#[derive(Debug, Clone, Default)]
pub struct IntentRouter {
    table: PatternTable,
}

impl IntentRouter {
    pub fn new(table: PatternTable) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &PatternTable {
        &self.table
    }

    /// Classify one message. Never fails; the worst case is `Unrecognized`.
    pub fn classify(&self, raw: &str) -> ParsedMessage {
        let text = raw.trim().to_lowercase();
        let parsed = self.classify_normalized(&text, raw);
        debug!(
            intent = parsed.intent.as_str(),
            source = ?parsed.source,
            args = parsed.args.len(),
            "classified message"
        );
        parsed
    }

    fn classify_normalized(&self, text: &str, raw: &str) -> ParsedMessage {
        let stopwords = &self.table.stopwords;
        let command = if self.table.commands {
            text.strip_prefix(COMMAND_PREFIX)
        } else {
            None
        };

        // Full extraction, highest priority first. `!name args` is positional
        // and takes over once the conversational rules have had their turn.
        for rule in &self.table.rules {
            if let Some(body) = command {
                if !matches!(rule.intent, Intent::Greeting | Intent::Help) {
                    return self.classify_command(body, raw);
                }
            }
            match rule.extract(text, stopwords) {
                Some(Extraction::Args(args)) => {
                    return ParsedMessage::complete(rule.intent, args, MatchSource::Pattern, raw)
                }
                Some(Extraction::Malformed) => {
                    return ParsedMessage::usage(rule.intent, MatchSource::Pattern, raw)
                }
                None => {}
            }
        }

        if let Some(body) = command {
            return self.classify_command(body, raw);
        }

        // Intent asked for, arguments missing
        if let Some(rule) = self.table.rules.iter().find(|r| r.triggered(text)) {
            return ParsedMessage::usage(rule.intent, MatchSource::Trigger, raw);
        }

        if let Some(entry) = self.table.faq_hit(text) {
            return ParsedMessage::faq(&entry.keyword, &entry.answer, raw);
        }

        ParsedMessage::unrecognized(self.fallback_hint(text), MatchSource::None, raw)
    }

    /// `!name arg ...`: positional arguments validated like the natural path
    fn classify_command(&self, body: &str, raw: &str) -> ParsedMessage {
        let mut tokens = body.split_whitespace();
        let name = tokens.next().unwrap_or("");
        let rest: Vec<&str> = tokens.collect();

        let intent = match name {
            "help" => {
                return ParsedMessage::complete(Intent::Help, Vec::new(), MatchSource::Command, raw)
            }
            "weather" => Intent::Weather,
            "crop" => Intent::CropRecommendation,
            "fertilizer" => Intent::Fertilizer,
            "market" => Intent::Market,
            other => {
                return ParsedMessage::unrecognized(
                    FallbackHint::UnknownCommand(other.to_string()),
                    MatchSource::Command,
                    raw,
                )
            }
        };

        match command_args(intent, &rest) {
            Some(args) => ParsedMessage::complete(intent, args, MatchSource::Command, raw),
            None => ParsedMessage::usage(intent, MatchSource::Command, raw),
        }
    }

    /// Shapes the fallback text only; the intent stays `Unrecognized`
    fn fallback_hint(&self, text: &str) -> FallbackHint {
        if !self.table.smart_fallback {
            return FallbackHint::Generic;
        }
        if text.chars().any(|c| c.is_ascii_digit()) {
            return FallbackHint::Numbers;
        }
        match self.table.crop_mention(text) {
            Some(crop) => FallbackHint::Crop(crop.to_string()),
            None => FallbackHint::Generic,
        }
    }
}

/// Check count and parseability of positional command arguments.
/// Extra trailing tokens are ignored.
fn command_args(intent: Intent, tokens: &[&str]) -> Option<Vec<Arg>> {
    if tokens.len() < intent.arity() {
        return None;
    }
    let tokens = &tokens[..intent.arity()];

    match intent {
        Intent::Weather => {
            let code = tokens[0];
            (code.len() == 6 && code.bytes().all(|b| b.is_ascii_digit()))
                .then(|| vec![Arg::from(code)])
        }
        Intent::CropRecommendation => tokens
            .iter()
            .map(|t| t.parse::<f64>().ok().filter(|n| n.is_finite()).map(Arg::Number))
            .collect(),
        Intent::Fertilizer | Intent::Market => {
            let word = tokens[0];
            word.chars()
                .all(|c| c.is_alphanumeric() || c == '_')
                .then(|| vec![Arg::from(word)])
        }
        _ => Some(Vec::new()),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patterns::{FaqMatch, TableVersion};
    use crate::types::Resolution;

    fn classify(text: &str) -> ParsedMessage {
        IntentRouter::default().classify(text)
    }

    fn text_args(values: &[&str]) -> Vec<Arg> {
        values.iter().map(|v| Arg::from(*v)).collect()
    }

    #[test]
    fn test_weather_in_scenario() {
        let parsed = classify("weather in 390001");
        assert_eq!(parsed.intent, Intent::Weather);
        assert_eq!(parsed.args, text_args(&["390001"]));
        assert!(parsed.is_complete());
    }

    #[test]
    fn test_weather_surface_forms_agree() {
        for text in [
            "weather 390001",
            "weather in 390001",
            "weather for 390001",
            "what is the weather like at 390001",
            "how's the weather near 390001",
            "weather today 390001",
            "390001 weather",
        ] {
            let parsed = classify(text);
            assert_eq!(parsed.intent, Intent::Weather, "{}", text);
            assert_eq!(parsed.args, text_args(&["390001"]), "{}", text);
        }
    }

    #[test]
    fn test_crop_scenario() {
        let parsed = classify("what crop should i grow with 90 42 43 6.5 120");
        assert_eq!(parsed.intent, Intent::CropRecommendation);
        assert_eq!(
            parsed.args,
            vec![
                Arg::Number(90.0),
                Arg::Number(42.0),
                Arg::Number(43.0),
                Arg::Number(6.5),
                Arg::Number(120.0),
            ]
        );
    }

    #[test]
    fn test_fertilizer_scenario() {
        let parsed = classify("fertilizer for wheat");
        assert_eq!(parsed.intent, Intent::Fertilizer);
        assert_eq!(parsed.args, text_args(&["wheat"]));
    }

    #[test]
    fn test_fertilizer_surface_forms_agree() {
        for text in [
            "fertilizer for wheat",
            "fertilizer wheat",
            "what fertilizer is good for wheat",
            "which fertilizer should i use on wheat",
            "wheat fertilizer",
        ] {
            let parsed = classify(text);
            assert_eq!(parsed.intent, Intent::Fertilizer, "{}", text);
            assert_eq!(parsed.args, text_args(&["wheat"]), "{}", text);
        }
    }

    #[test]
    fn test_market_surface_forms_agree() {
        for text in [
            "market price rice",
            "market rice",
            "price of rice",
            "rice price",
            "what price will rice",
            "how much for rice",
        ] {
            let parsed = classify(text);
            assert_eq!(parsed.intent, Intent::Market, "{}", text);
            assert_eq!(parsed.args, text_args(&["rice"]), "{}", text);
        }
    }

    #[test]
    fn test_market_command_scenario() {
        let parsed = classify("!market rice");
        assert_eq!(parsed.intent, Intent::Market);
        assert_eq!(parsed.args, text_args(&["rice"]));
        assert_eq!(parsed.source, MatchSource::Command);
    }

    #[test]
    fn test_commands_use_positional_args() {
        let parsed = classify("!market the rice");
        assert_eq!(parsed.args, text_args(&["the"]));
        assert_eq!(parsed.source, MatchSource::Command);

        let parsed = classify("!crop 90 42 43 x 120");
        assert_eq!(parsed.intent, Intent::CropRecommendation);
        assert_eq!(parsed.resolution, Resolution::Usage);
        assert_eq!(parsed.source, MatchSource::Command);

        let parsed = classify("!weather 390001");
        assert_eq!(parsed.args, text_args(&["390001"]));
        assert_eq!(parsed.source, MatchSource::Command);
    }

    #[test]
    fn test_command_keeps_greeting_priority() {
        assert_eq!(classify("!hello").intent, Intent::Greeting);
        assert_eq!(classify("!help").source, MatchSource::Pattern);
    }

    #[test]
    fn test_weather_code_after_other_lead_in() {
        let parsed = classify("check weather at 390001");
        assert_eq!(parsed.intent, Intent::Weather);
        assert_eq!(parsed.args, text_args(&["390001"]));
        assert!(parsed.is_complete());
    }

    #[test]
    fn test_unrecognized_generic_scenario() {
        let parsed = classify("asdkj random text");
        assert_eq!(parsed.intent, Intent::Unrecognized);
        assert_eq!(
            parsed.resolution,
            Resolution::Fallback { hint: FallbackHint::Generic }
        );
        assert_eq!(parsed.raw, "asdkj random text");
    }

    #[test]
    fn test_case_insensitive_and_trimmed() {
        let upper = classify("WEATHER 390001");
        let lower = classify("weather 390001");
        assert_eq!(upper.intent, lower.intent);
        assert_eq!(upper.args, lower.args);
        assert_eq!(classify("   Fertilizer For Wheat  ").args, text_args(&["wheat"]));
    }

    #[test]
    fn test_greeting_wins_over_crop() {
        let parsed = classify("hi, what crop for 90 42 43 6.5 120");
        assert_eq!(parsed.intent, Intent::Greeting);
        assert!(parsed.args.is_empty());
    }

    #[test]
    fn test_help_keywords() {
        for text in ["help", "what can you do?", "show me the menu", "!help"] {
            assert_eq!(classify(text).intent, Intent::Help, "{}", text);
        }
    }

    #[test]
    fn test_numbers_without_trigger_are_unrecognized() {
        let parsed = classify("90 42 43 6.5 120");
        assert_eq!(parsed.intent, Intent::Unrecognized);
        assert_eq!(
            parsed.resolution,
            Resolution::Fallback { hint: FallbackHint::Numbers }
        );
    }

    #[test]
    fn test_missing_crop_numbers_show_usage() {
        let parsed = classify("which crop should i grow");
        assert_eq!(parsed.intent, Intent::CropRecommendation);
        assert_eq!(parsed.resolution, Resolution::Usage);
        assert_eq!(parsed.source, MatchSource::Trigger);

        let partial = classify("!crop 90 42 43");
        assert_eq!(partial.intent, Intent::CropRecommendation);
        assert_eq!(partial.resolution, Resolution::Usage);
    }

    #[test]
    fn test_unparseable_number_shows_usage() {
        let parsed = classify("crop 90 42 43 6..5 120");
        assert_eq!(parsed.intent, Intent::CropRecommendation);
        assert_eq!(parsed.resolution, Resolution::Usage);
        assert_eq!(parsed.source, MatchSource::Pattern);
    }

    #[test]
    fn test_weather_without_code_shows_usage() {
        for text in ["weather", "!weather", "weather in 3900"] {
            let parsed = classify(text);
            assert_eq!(parsed.intent, Intent::Weather, "{}", text);
            assert_eq!(parsed.resolution, Resolution::Usage, "{}", text);
        }
    }

    #[test]
    fn test_faq_keyword() {
        let parsed = classify("my plants have a disease");
        assert_eq!(parsed.intent, Intent::FarmingFaq);
        match parsed.resolution {
            Resolution::Faq { keyword, .. } => assert_eq!(keyword, "disease"),
            other => panic!("Expected Faq resolution, got {:?}", other),
        }
    }

    #[test]
    fn test_faq_substring_quirk_is_preserved() {
        let parsed = classify("that is pricey");
        assert_eq!(parsed.intent, Intent::FarmingFaq);

        let strict = IntentRouter::new(PatternTable::enhanced().with_faq_match(FaqMatch::Word));
        assert_eq!(strict.classify("that is pricey").intent, Intent::Unrecognized);
    }

    #[test]
    fn test_unknown_command() {
        let parsed = classify("!sell wheat");
        assert_eq!(parsed.intent, Intent::Unrecognized);
        assert_eq!(parsed.source, MatchSource::Command);
        assert_eq!(
            parsed.resolution,
            Resolution::Fallback { hint: FallbackHint::UnknownCommand("sell".into()) }
        );
    }

    #[test]
    fn test_crop_mention_fallback() {
        let parsed = classify("tell me about cotton");
        assert_eq!(
            parsed.resolution,
            Resolution::Fallback { hint: FallbackHint::Crop("cotton".into()) }
        );
    }

    #[test]
    fn test_command_args_validation() {
        assert_eq!(
            command_args(Intent::Weather, &["390001", "extra"]),
            Some(text_args(&["390001"]))
        );
        assert_eq!(command_args(Intent::Weather, &["abc"]), None);
        assert_eq!(command_args(Intent::CropRecommendation, &["1", "2", "3", "x", "5"]), None);
        assert_eq!(command_args(Intent::Market, &[]), None);
        assert_eq!(command_args(Intent::Fertilizer, &["wheat"]), Some(text_args(&["wheat"])));
    }

    #[test]
    fn test_legacy_table() {
        let router = IntentRouter::new(PatternTable::for_version(TableVersion::Legacy));
        assert_eq!(router.classify("Hello").intent, Intent::Greeting);
        assert_eq!(router.classify("help").intent, Intent::Help);
        assert_eq!(router.classify("weather in 390001").intent, Intent::Unrecognized);
        assert_eq!(
            router.classify("tell me about rice").resolution,
            Resolution::Fallback { hint: FallbackHint::Generic }
        );

        let parsed = router.classify("!weather 390001");
        assert_eq!(parsed.intent, Intent::Weather);
        assert_eq!(parsed.source, MatchSource::Command);
        assert_eq!(parsed.args, text_args(&["390001"]));
    }

    #[test]
    fn test_classify_is_total_and_idempotent() {
        let router = IntentRouter::default();
        for text in [
            "",
            "   ",
            "!",
            "!!!",
            "€uro ñandú 🌾",
            "weather weather weather",
            "crop crop 1 2 3 4",
            "0000000000000000000000000",
            "how much",
            "what",
        ] {
            let first = router.classify(text);
            let second = router.classify(text);
            assert_eq!(first, second, "{:?}", text);
        }
    }
}
