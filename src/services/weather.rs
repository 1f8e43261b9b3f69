//! Daily forecast lookup.
//!
//! Talks to an Open-Meteo-compatible endpoint over blocking HTTP with an
//! explicit timeout. The forecast only feeds pace adjustment, so callers
//! treat any failure as "no forecast available" after one retry.

use crate::error::ServiceError;
use crate::services::with_retry;
use chrono::NaiveDate;
use reqwest::blocking::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_ENDPOINT: &str = "https://api.open-meteo.com/v1/forecast";
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 10;

/// One day of forecast, already reduced to what pace adjustment needs
#[derive(Debug, Clone, PartialEq)]
pub struct DailyForecast {
    pub date: NaiveDate,
    pub high_f: f64,
    pub low_f: f64,
    pub humidity_pct: f64,
}

pub struct WeatherClient {
    client: Client,
    endpoint: String,
    timeout: Duration,
}

#[derive(Deserialize)]
struct ForecastResponse {
    daily: DailyBlock,
}

#[derive(Deserialize)]
struct DailyBlock {
    time: Vec<String>,
    temperature_2m_max: Vec<f64>,
    temperature_2m_min: Vec<f64>,
    relative_humidity_2m_mean: Vec<f64>,
}

impl WeatherClient {
    pub fn new(endpoint: String, timeout_seconds: u64) -> Result<Self, ServiceError> {
        let timeout = Duration::from_secs(timeout_seconds);
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ServiceError::Transport(e.to_string()))?;
        Ok(WeatherClient {
            client,
            endpoint,
            timeout,
        })
    }

    /// Fetch the forecast for one date at a location. Retries once on
    /// transient failures.
    pub fn forecast(
        &self,
        latitude: f64,
        longitude: f64,
        date: NaiveDate,
    ) -> Result<DailyForecast, ServiceError> {
        with_retry(|| self.fetch(latitude, longitude, date))
    }

    fn fetch(
        &self,
        latitude: f64,
        longitude: f64,
        date: NaiveDate,
    ) -> Result<DailyForecast, ServiceError> {
        let day = date.format("%Y-%m-%d").to_string();
        debug!(%day, latitude, longitude, "requesting forecast");

        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("latitude", latitude.to_string()),
                ("longitude", longitude.to_string()),
                ("start_date", day.clone()),
                ("end_date", day.clone()),
                (
                    "daily",
                    "temperature_2m_max,temperature_2m_min,relative_humidity_2m_mean".to_string(),
                ),
                ("temperature_unit", "fahrenheit".to_string()),
                ("timezone", "auto".to_string()),
            ])
            .send()
            .map_err(classify_request_error(self.timeout))?;

        let status = response.status();
        if status.as_u16() == 429 {
            return Err(ServiceError::Quota);
        }
        if !status.is_success() {
            return Err(ServiceError::Http {
                status: status.as_u16(),
            });
        }

        let body: ForecastResponse = response
            .json()
            .map_err(|e| ServiceError::BadResponse(e.to_string()))?;

        extract_day(&body, date)
    }
}

fn classify_request_error(timeout: Duration) -> impl Fn(reqwest::Error) -> ServiceError {
    move |e| {
        if e.is_timeout() {
            ServiceError::Timeout {
                seconds: timeout.as_secs(),
            }
        } else {
            ServiceError::Transport(e.to_string())
        }
    }
}

fn extract_day(body: &ForecastResponse, date: NaiveDate) -> Result<DailyForecast, ServiceError> {
    let day = date.format("%Y-%m-%d").to_string();
    let index = body
        .daily
        .time
        .iter()
        .position(|t| *t == day)
        .ok_or_else(|| ServiceError::BadResponse(format!("no entry for {day}")))?;

    let high_f = copied_at(&body.daily.temperature_2m_max, index)?;
    let low_f = copied_at(&body.daily.temperature_2m_min, index)?;
    let humidity_pct = copied_at(&body.daily.relative_humidity_2m_mean, index)?;

    Ok(DailyForecast {
        date,
        high_f,
        low_f,
        humidity_pct,
    })
}

fn copied_at(values: &[f64], index: usize) -> Result<f64, ServiceError> {
    values
        .get(index)
        .copied()
        .ok_or_else(|| ServiceError::BadResponse("ragged daily arrays".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body() -> ForecastResponse {
        ForecastResponse {
            daily: DailyBlock {
                time: vec!["2025-06-01".to_string(), "2025-06-02".to_string()],
                temperature_2m_max: vec![88.0, 91.5],
                temperature_2m_min: vec![70.0, 73.0],
                relative_humidity_2m_mean: vec![65.0, 72.0],
            },
        }
    }

    #[test]
    fn test_extracts_requested_date() {
        let date = NaiveDate::from_ymd_opt(2025, 6, 2).unwrap();
        let forecast = extract_day(&body(), date).unwrap();
        assert_eq!(forecast.high_f, 91.5);
        assert_eq!(forecast.low_f, 73.0);
        assert_eq!(forecast.humidity_pct, 72.0);
    }

    #[test]
    fn test_missing_date_is_bad_response() {
        let date = NaiveDate::from_ymd_opt(2025, 7, 1).unwrap();
        let err = extract_day(&body(), date).unwrap_err();
        assert!(matches!(err, ServiceError::BadResponse(_)));
    }

    #[test]
    fn test_ragged_arrays_are_bad_response() {
        let mut malformed = body();
        malformed.daily.relative_humidity_2m_mean.truncate(1);
        let date = NaiveDate::from_ymd_opt(2025, 6, 2).unwrap();
        assert!(extract_day(&malformed, date).is_err());
    }
}
