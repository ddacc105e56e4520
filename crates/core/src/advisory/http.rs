//! HTTP Advisory Client
//!
//! Calls the advisory backend's REST endpoints with a blocking client.
//! Non-2xx statuses and undecodable bodies are errors; bodies carrying an
//! `error` key are returned as `AdvisoryResponse::Failed`.

use anyhow::{anyhow, Context, Result};
use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use tracing::debug;

use super::{Advisor, AdvisoryResponse, CropAdvice, FertilizerGuide, MarketQuote, WeatherReport};
use crate::types::SoilReading;

const WEATHER_PATH: &str = "/weather";
const CROP_PATH: &str = "/api/crop/recommend";
const FERTILIZER_PATH: &str = "/fertilizer";
const MARKET_PATH: &str = "/market";

/// Advisory backend reached over HTTP
pub struct HttpAdvisor {
    client: Client,
    base_url: String,
}

impl HttpAdvisor {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<AdvisoryResponse<T>> {
        let url = self.url(path);
        debug!(%url, ?query, "advisory GET");

        let response = self
            .client
            .get(&url)
            .query(query)
            .send()
            .with_context(|| format!("GET {} failed", url))?;

        let status = response.status();
        let body = response.text().context("Failed to read response body")?;
        decode_body(status, &body)
    }

    fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        payload: &B,
    ) -> Result<AdvisoryResponse<T>> {
        let url = self.url(path);
        debug!(%url, "advisory POST");

        let response = self
            .client
            .post(&url)
            .json(payload)
            .send()
            .with_context(|| format!("POST {} failed", url))?;

        let status = response.status();
        let body = response.text().context("Failed to read response body")?;
        decode_body(status, &body)
    }
}

/// Map an HTTP status and body onto the advisory contract
fn decode_body<T: DeserializeOwned>(status: StatusCode, body: &str) -> Result<AdvisoryResponse<T>> {
    if !status.is_success() {
        return Err(anyhow!("HTTP {} - {}", status, body));
    }
    serde_json::from_str(body).context("Response is not valid JSON")
}

impl Advisor for HttpAdvisor {
    fn weather(&self, area_code: &str) -> Result<AdvisoryResponse<WeatherReport>> {
        self.get(WEATHER_PATH, &[("pincode", area_code)])
    }

    fn recommend_crop(&self, soil: &SoilReading) -> Result<AdvisoryResponse<CropAdvice>> {
        self.post(CROP_PATH, soil)
    }

    fn fertilizer(&self, crop: &str) -> Result<AdvisoryResponse<FertilizerGuide>> {
        self.get(FERTILIZER_PATH, &[("crop", crop)])
    }

    fn market(&self, crop: &str) -> Result<AdvisoryResponse<MarketQuote>> {
        self.get(MARKET_PATH, &[("crop", crop)])
    }
}

// ============================================================================
// Tests
// ============================================================================
