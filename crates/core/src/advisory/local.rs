//! In-process demo advisor
//!
//! Answers all four advisory calls from static tables and threshold rules,
//! so the bot can run without the backend. Readings for a weather report are
//! derived from the area code so different codes give different reports.

use anyhow::Result;

use super::{
    Advisor, AdvisoryResponse, CropAdvice, CurrentWeather, FarmingConditions, FertilizerGuide,
    MarketListing, MarketQuote, WeatherReport,
};
use crate::types::SoilReading;

/// kg/acre of (urea, DAP, MOP); the last row is the fallback for unknown crops
const FERTILIZER_GUIDE: [(&str, f64, f64, f64); 4] = [
    ("rice", 50.0, 40.0, 20.0),
    ("wheat", 45.0, 35.0, 25.0),
    ("maize", 55.0, 45.0, 25.0),
    ("*", 40.0, 30.0, 20.0),
];

/// kg/ha nutrient ranges (N, P, K)
const DOSAGE: [(&str, &str, &str, &str); 5] = [
    ("wheat", "120-150", "60-80", "40-60"),
    ("rice", "100-120", "50-60", "30-40"),
    ("corn", "150-200", "80-100", "60-80"),
    ("maize", "150-200", "80-100", "60-80"),
    ("*", "100-120", "60-80", "40-60"),
];

const ORGANIC_OPTIONS: [&str; 3] = [
    "Farmyard manure: 4-5 tonnes/acre before sowing",
    "Vermicompost: 1-2 tonnes/acre",
    "Neem cake: 80-100 kg/acre (also deters soil pests)",
];

struct PriceRow {
    crop: &'static str,
    min: f64,
    max: f64,
    trend: &'static str,
    markets: &'static [(&'static str, f64)],
}

const PRICES: [PriceRow; 7] = [
    PriceRow {
        crop: "wheat",
        min: 2100.0,
        max: 2450.0,
        trend: "Stable",
        markets: &[
            ("Ahmedabad (APMC)", 2250.0),
            ("Indore (APMC)", 2320.0),
        ],
    },
    PriceRow {
        crop: "rice",
        min: 2200.0,
        max: 2600.0,
        trend: "Rising",
        markets: &[
            ("Raipur (APMC)", 2400.0),
            ("Karnal (APMC)", 2550.0),
        ],
    },
    PriceRow {
        crop: "corn",
        min: 2000.0,
        max: 2400.0,
        trend: "Stable",
        markets: &[("Davangere (APMC)", 2150.0)],
    },
    PriceRow {
        crop: "maize",
        min: 2000.0,
        max: 2400.0,
        trend: "Stable",
        markets: &[("Davangere (APMC)", 2150.0)],
    },
    PriceRow {
        crop: "cotton",
        min: 6200.0,
        max: 6900.0,
        trend: "Rising",
        markets: &[
            ("Surat (APMC)", 6500.0),
            ("Rajkot (APMC)", 6650.0),
        ],
    },
    PriceRow {
        crop: "tomato",
        min: 900.0,
        max: 1600.0,
        trend: "Volatile",
        markets: &[
            ("Pune (APMC)", 1200.0),
            ("Kolar (APMC)", 1100.0),
            ("Nashik (APMC)", 1350.0),
            ("Azadpur (APMC)", 1500.0),
        ],
    },
    PriceRow {
        crop: "soybean",
        min: 4500.0,
        max: 5100.0,
        trend: "Falling",
        markets: &[
            ("Indore (APMC)", 4800.0),
            ("Latur (APMC)", 4750.0),
        ],
    },
];

/// Demo advisor backed by static tables
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalAdvisor;

impl LocalAdvisor {
    pub fn new() -> Self {
        Self
    }
}

/// Readings derived from the area code.
/// Temperature 18 to 39 °C, humidity 25 to 94 %, wind 0 to 17 m/s.
fn readings_for(code: &str) -> (f64, f64, f64) {
    let digits: Vec<u32> = code.chars().filter_map(|c| c.to_digit(10)).collect();
    let sum: u32 = digits.iter().sum();
    let tail = digits.iter().rev().take(2).fold(0, |acc, d| acc * 10 + d);
    let temp = 18.0 + f64::from(sum % 22);
    let humidity = 25.0 + f64::from(tail % 70);
    let wind = f64::from((sum * 7 + tail) % 18);
    (temp, humidity, wind)
}

fn weather_alerts(temp: f64, humidity: f64, wind: f64) -> Vec<String> {
    let mut alerts = Vec::new();

    if wind >= 15.0 {
        alerts.push("💨 High wind: avoid pesticide spraying and work on tall crops.".to_string());
    } else if wind >= 10.0 {
        alerts.push("🌬️ Moderate wind: take care with spray applications.".to_string());
    }

    if temp >= 38.0 {
        alerts.push("🔥 Heat alert: irrigate only in the evening or early morning.".to_string());
    } else if temp >= 35.0 {
        alerts.push("☀️ Hot weather: increase irrigation frequency.".to_string());
    }

    if humidity <= 30.0 {
        alerts.push(
            "🏜️ Low humidity: increase irrigation and watch for pest stress.".to_string(),
        );
    } else if humidity >= 85.0 {
        alerts.push("💧 High humidity: watch for fungal diseases.".to_string());
    }

    alerts
}

fn weather_tips(temp: f64, humidity: f64, wind: f64) -> Vec<String> {
    let mut tips = Vec::new();

    if temp > 35.0 {
        tips.push("Avoid harvesting wheat or barley during peak heat".to_string());
        tips.push("Shade vegetable beds at midday".to_string());
    }
    if wind > 12.0 {
        tips.push("Postpone drone and aerial spraying".to_string());
        tips.push("Stake tall crops against lodging".to_string());
    }
    if humidity > 80.0 {
        tips.push("High disease risk: scout for blight and fungus".to_string());
    } else if humidity < 40.0 {
        tips.push("Increase irrigation frequency".to_string());
    }

    tips
}

fn rating(poor: bool, moderate: bool) -> &'static str {
    if poor {
        "poor"
    } else if moderate {
        "moderate"
    } else {
        "good"
    }
}

fn farming_conditions(temp: f64, humidity: f64, wind: f64) -> FarmingConditions {
    let spraying = rating(wind > 10.0 || temp > 35.0, wind > 6.0 || temp > 30.0);
    let harvesting = rating(temp > 38.0 || wind > 15.0, temp > 32.0);
    let irrigation = if temp > 35.0 || humidity < 40.0 {
        "high"
    } else if temp < 20.0 && humidity > 70.0 {
        "low"
    } else {
        "moderate"
    };

    let overall = if spraying == "poor" || harvesting == "poor" {
        "Poor"
    } else if spraying == "moderate" || harvesting == "moderate" {
        "Moderate"
    } else {
        "Good"
    };

    let best_hours = if temp > 35.0 {
        "5:00 AM - 8:00 AM and after 6:00 PM"
    } else if temp > 30.0 {
        "6:00 AM - 10:00 AM and 4:00 PM - 7:00 PM"
    } else {
        "7:00 AM - 11:00 AM and 2:00 PM - 5:00 PM"
    };

    FarmingConditions {
        overall: Some(overall.to_string()),
        best_farming_hours: Some(best_hours.to_string()),
        spraying: Some(spraying.to_string()),
        harvesting: Some(harvesting.to_string()),
        irrigation: Some(irrigation.to_string()),
    }
}

fn guide_row<'a, T>(
    table: &'a [(&'static str, T, T, T)],
    crop: &str,
) -> &'a (&'static str, T, T, T) {
    table
        .iter()
        .find(|row| row.0 == crop)
        .unwrap_or(&table[table.len() - 1])
}

impl Advisor for LocalAdvisor {
    fn weather(&self, area_code: &str) -> Result<AdvisoryResponse<WeatherReport>> {
        if area_code.len() != 6 || !area_code.bytes().all(|b| b.is_ascii_digit()) {
            return Ok(AdvisoryResponse::failed(format!(
                "Invalid pincode: {}",
                area_code
            )));
        }

        let (temp, humidity, wind) = readings_for(area_code);
        let description = if humidity >= 85.0 {
            "light rain"
        } else if humidity >= 60.0 {
            "partly cloudy"
        } else {
            "clear sky"
        };

        Ok(AdvisoryResponse::Ready(WeatherReport {
            location: format!("Pincode {}", area_code),
            current_weather: CurrentWeather {
                temperature: Some(temp),
                humidity: Some(humidity),
                wind_speed: Some(wind),
                description: Some(description.to_string()),
            },
            alerts: weather_alerts(temp, humidity, wind),
            agricultural_recommendations: weather_tips(temp, humidity, wind),
            farming_conditions: Some(farming_conditions(temp, humidity, wind)),
        }))
    }

    fn recommend_crop(&self, soil: &SoilReading) -> Result<AdvisoryResponse<CropAdvice>> {
        let crop = if (6.0..=7.5).contains(&soil.ph) {
            if soil.n > 80.0 {
                "wheat"
            } else if soil.p > 40.0 {
                "corn"
            } else {
                "rice"
            }
        } else if soil.ph < 6.0 {
            "rice"
        } else {
            "maize"
        };

        Ok(AdvisoryResponse::Ready(CropAdvice {
            recommended_crop: crop.to_string(),
            confidence: 0.75,
            note: Some("Rule-based recommendation from pH, nitrogen and phosphorus".to_string()),
        }))
    }

    fn fertilizer(&self, crop: &str) -> Result<AdvisoryResponse<FertilizerGuide>> {
        let crop = crop.to_lowercase();
        let (_, urea, dap, mop) = *guide_row(&FERTILIZER_GUIDE, &crop);
        let (_, n, p, k) = *guide_row(&DOSAGE, &crop);

        Ok(AdvisoryResponse::Ready(FertilizerGuide {
            fertilizers: vec![
                format!("Urea: {} kg/acre", urea),
                format!("DAP: {} kg/acre", dap),
                format!("MOP: {} kg/acre", mop),
            ],
            organic_options: ORGANIC_OPTIONS.iter().map(|s| s.to_string()).collect(),
            application_timing: Some(
                "Split nitrogen into 2-3 doses: at sowing, tillering and flowering.".to_string(),
            ),
            dosage: Some(format!("N {} kg/ha, P {} kg/ha, K {} kg/ha", n, p, k)),
        }))
    }

    fn market(&self, crop: &str) -> Result<AdvisoryResponse<MarketQuote>> {
        let crop = crop.to_lowercase();
        let Some(row) = PRICES.iter().find(|r| r.crop == crop) else {
            return Ok(AdvisoryResponse::failed(format!(
                "Market price information not available for {}. \
                 Try common crops like wheat, rice, tomato.",
                crop
            )));
        };

        let recommendation = match row.trend {
            "Rising" => "Prices are rising; holding stock for a few days may pay off.",
            "Falling" => "Prices are falling; consider selling soon.",
            "Volatile" => "Prices swing daily; compare nearby mandis before selling.",
            _ => "Prices are steady; sell when convenient.",
        };

        Ok(AdvisoryResponse::Ready(MarketQuote {
            min_price: Some(row.min),
            max_price: Some(row.max),
            avg_price: Some((row.min + row.max) / 2.0),
            trend: Some(row.trend.to_string()),
            markets: row
                .markets
                .iter()
                .map(|(name, price)| MarketListing {
                    name: name.to_string(),
                    price: Some(*price),
                })
                .collect(),
            recommendation: Some(recommendation.to_string()),
        }))
    }
}

// ============================================================================
// Tests
// ============================================================================
