//! Advisory Collaborators
//!
//! The four functions the router dispatches to after classification:
//! weather by area code, crop by soil readings, fertilizer by crop, and
//! market prices by crop. Two implementations ship:
//! - `HttpAdvisor` calls the advisory backend over HTTP
//! - `LocalAdvisor` answers from in-process demo tables

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::types::SoilReading;

pub mod http;
pub mod local;

pub use http::HttpAdvisor;
pub use local::LocalAdvisor;

// ============================================================================
// Response Contract
// ============================================================================

/// A collaborator reply: either the payload or an error-shaped `{"error": msg}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AdvisoryResponse<T> {
    Failed { error: String },
    Ready(T),
}

impl<T> AdvisoryResponse<T> {
    pub fn failed(msg: impl Into<String>) -> Self {
        AdvisoryResponse::Failed { error: msg.into() }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CurrentWeather {
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub wind_speed: Option<f64>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FarmingConditions {
    pub overall: Option<String>,
    pub best_farming_hours: Option<String>,
    pub spraying: Option<String>,
    pub harvesting: Option<String>,
    pub irrigation: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeatherReport {
    pub location: String,
    pub current_weather: CurrentWeather,
    pub alerts: Vec<String>,
    pub agricultural_recommendations: Vec<String>,
    pub farming_conditions: Option<FarmingConditions>,
}

impl Default for WeatherReport {
    fn default() -> Self {
        Self {
            location: "Unknown".to_string(),
            current_weather: CurrentWeather::default(),
            alerts: Vec::new(),
            agricultural_recommendations: Vec::new(),
            farming_conditions: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CropAdvice {
    #[serde(alias = "crop")]
    pub recommended_crop: String,
    pub confidence: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl Default for CropAdvice {
    fn default() -> Self {
        Self {
            recommended_crop: "Unknown".to_string(),
            confidence: 0.0,
            note: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FertilizerGuide {
    pub fertilizers: Vec<String>,
    pub organic_options: Vec<String>,
    pub application_timing: Option<String>,
    pub dosage: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketListing {
    pub name: String,
    pub price: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketQuote {
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub avg_price: Option<f64>,
    pub trend: Option<String>,
    pub markets: Vec<MarketListing>,
    pub recommendation: Option<String>,
}

// ============================================================================
// Advisor Trait
// ============================================================================

/// The downstream advisory functions. `Err` means the collaborator could not
/// be reached or answered garbage; an error-shaped reply is `Ok(Failed)`.
pub trait Advisor {
    fn weather(&self, area_code: &str) -> Result<AdvisoryResponse<WeatherReport>>;

    fn recommend_crop(&self, soil: &SoilReading) -> Result<AdvisoryResponse<CropAdvice>>;

    fn fertilizer(&self, crop: &str) -> Result<AdvisoryResponse<FertilizerGuide>>;

    fn market(&self, crop: &str) -> Result<AdvisoryResponse<MarketQuote>>;
}

impl<A: Advisor + ?Sized> Advisor for Box<A> {
    fn weather(&self, area_code: &str) -> Result<AdvisoryResponse<WeatherReport>> {
        (**self).weather(area_code)
    }

    fn recommend_crop(&self, soil: &SoilReading) -> Result<AdvisoryResponse<CropAdvice>> {
        (**self).recommend_crop(soil)
    }

    fn fertilizer(&self, crop: &str) -> Result<AdvisoryResponse<FertilizerGuide>> {
        (**self).fertilizer(crop)
    }

    fn market(&self, crop: &str) -> Result<AdvisoryResponse<MarketQuote>> {
        (**self).market(crop)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_shaped_body_is_failed() {
        let body = r#"{"error": "Weather disabled. Set OPENWEATHER_API_KEY env var."}"#;
        let resp: AdvisoryResponse<WeatherReport> = serde_json::from_str(body).unwrap();
        assert_eq!(
            resp,
            AdvisoryResponse::failed("Weather disabled. Set OPENWEATHER_API_KEY env var.")
        );
    }

    #[test]
    fn test_partial_weather_body_uses_defaults() {
        let resp: AdvisoryResponse<WeatherReport> = serde_json::from_str(
            r#"{"location": "Vadodara", "current_weather": {"temperature": 31.5}}"#,
        )
        .unwrap();
        match resp {
            AdvisoryResponse::Ready(report) => {
                assert_eq!(report.location, "Vadodara");
                assert_eq!(report.current_weather.temperature, Some(31.5));
                assert!(report.alerts.is_empty());
                assert!(report.farming_conditions.is_none());
            }
            other => panic!("Expected Ready, got {:?}", other),
        }
    }

    #[test]
    fn test_crop_advice_accepts_short_field_name() {
        let advice: CropAdvice =
            serde_json::from_str(r#"{"crop": "wheat", "confidence": 0.75}"#).unwrap();
        assert_eq!(advice.recommended_crop, "wheat");
        assert_eq!(advice.confidence, 0.75);
    }
}
