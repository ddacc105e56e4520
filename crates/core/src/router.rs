//! Advisory Dispatch
//!
//! Routes a classified message to the advisory collaborator for its intent
//! and renders the reply. Messages that did not resolve to a complete
//! advisory intent are answered from static text without any call.

use chrono::{DateTime, Local};
use tracing::{debug, warn};

use crate::advisory::Advisor;
use crate::format::{self, Advice, Texts};
use crate::types::{Intent, ParsedMessage, SoilReading};

/// Dispatches classified messages to an advisor
pub struct Dispatcher<A: Advisor> {
    advisor: A,
    texts: Texts,
}

impl<A: Advisor> Dispatcher<A> {
    pub fn new(advisor: A) -> Self {
        Self {
            advisor,
            texts: Texts::default(),
        }
    }

    /// Use the welcome, help and fallback texts of another table version
    pub fn with_texts(mut self, texts: Texts) -> Self {
        self.texts = texts;
        self
    }

    pub fn advisor(&self) -> &A {
        &self.advisor
    }

    /// Reply text for one classified message
    pub fn respond(&self, parsed: &ParsedMessage) -> String {
        self.respond_at(parsed, &Local::now())
    }

    /// Same as `respond`, with the clock used for reply footers supplied
    pub fn respond_at(&self, parsed: &ParsedMessage, now: &DateTime<Local>) -> String {
        if !parsed.is_complete() {
            return format::render_with(&self.texts, parsed, None, now);
        }

        match self.consult(parsed) {
            Some(Ok(advice)) => format::render_with(&self.texts, parsed, Some(&advice), now),
            Some(Err(e)) => {
                warn!(
                    intent = parsed.intent.as_str(),
                    error = %format!("{:#}", e),
                    "advisory call failed"
                );
                format::apology(parsed.intent)
            }
            None => format::render_with(&self.texts, parsed, None, now),
        }
    }

    /// Call the collaborator for a complete advisory intent.
    /// `None` means the intent needs no call (greeting, help).
    fn consult(&self, parsed: &ParsedMessage) -> Option<anyhow::Result<Advice>> {
        let advice = match parsed.intent {
            Intent::Weather => {
                let code = parsed.text_arg(0)?;
                debug!(code, "dispatching weather");
                self.advisor.weather(code).map(Advice::Weather)
            }

            Intent::CropRecommendation => {
                let soil = SoilReading::from_args(&parsed.args)?;
                debug!(?soil, "dispatching crop recommendation");
                self.advisor
                    .recommend_crop(&soil)
                    .map(|response| Advice::Crop { soil, response })
            }

            Intent::Fertilizer => {
                let crop = parsed.text_arg(0)?;
                debug!(crop, "dispatching fertilizer");
                self.advisor.fertilizer(crop).map(|response| Advice::Fertilizer {
                    crop: crop.to_string(),
                    response,
                })
            }

            Intent::Market => {
                let crop = parsed.text_arg(0)?;
                debug!(crop, "dispatching market");
                self.advisor.market(crop).map(|response| Advice::Market {
                    crop: crop.to_string(),
                    response,
                })
            }

            Intent::Greeting | Intent::Help | Intent::FarmingFaq | Intent::Unrecognized => {
                return None
            }
        };
        Some(advice)
    }
}

// ============================================================================
// Tests
// ============================================================================
