//! Current-weather client with geocoding fallback

use super::{GeoCoordinate, GeocodingClient, WeatherError, WeatherLookup, WeatherReport, title_case};
use crate::config::WeatherConfig;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;

const WEATHER_PATH: &str = "/data/2.5/weather";

#[derive(Debug, Deserialize)]
struct OwMain {
    temp: f64,
    feels_like: f64,
    humidity: i64,
}

#[derive(Debug, Deserialize)]
struct OwCondition {
    description: String,
}

#[derive(Debug, Deserialize)]
struct OwWind {
    speed: f64,
}

#[derive(Debug, Deserialize)]
struct OwCurrentResponse {
    main: OwMain,
    weather: Vec<OwCondition>,
    wind: OwWind,
}

/// Outcome of a single upstream call, before fallback handling
enum Lookup {
    Found(OwCurrentResponse),
    NotFound,
}

/// Client for the OpenWeatherMap current-weather endpoint
///
/// Holds only immutable settings and a pooled HTTP client, so one instance
/// is shared by all requests.
#[derive(Debug, Clone)]
pub struct WeatherClient {
    http: Client,
    base_url: String,
    api_key: Option<String>,
    api_key_env: String,
    timeout: Duration,
    geocoder: Option<GeocodingClient>,
}

impl WeatherClient {
    /// Create a weather client from configuration and a resolved API key
    ///
    /// A missing key is not an error here: lookups report
    /// [`WeatherError::MissingCredential`] without touching the network.
    pub fn new(config: &WeatherConfig, api_key: Option<String>) -> Self {
        let http = Client::new();
        let timeout = Duration::from_secs(config.timeout_seconds());
        let base_url = config.base_url().trim_end_matches('/').to_string();
        let geocoder = api_key
            .clone()
            .map(|key| GeocodingClient::new(http.clone(), &base_url, key, timeout));

        Self {
            http,
            base_url,
            api_key,
            api_key_env: config.api_key_env().to_string(),
            timeout,
            geocoder,
        }
    }

    async fn lookup(&self, params: &[(&str, &str)]) -> Result<Lookup, WeatherError> {
        let url = format!("{}{}", self.base_url, WEATHER_PATH);

        let response = self
            .http
            .get(&url)
            .query(params)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(Lookup::NotFound);
        }
        if !status.is_success() {
            return Err(WeatherError::Status(status.as_u16()));
        }

        let body = response.text().await.map_err(transport_error)?;
        let parsed: OwCurrentResponse = serde_json::from_str(&body)
            .map_err(|e| WeatherError::InvalidResponse(e.to_string()))?;
        Ok(Lookup::Found(parsed))
    }

    async fn fetch_by_coordinates(
        &self,
        api_key: &str,
        coord: &GeoCoordinate,
    ) -> Result<Lookup, WeatherError> {
        let lat = coord.latitude.to_string();
        let lon = coord.longitude.to_string();
        match self
            .lookup(&[
                ("lat", lat.as_str()),
                ("lon", lon.as_str()),
                ("appid", api_key),
                ("units", "metric"),
            ])
            .await
        {
            // Any rejected status on the retry means the city stays unresolved
            Err(WeatherError::Status(status)) => {
                tracing::debug!(
                    resolved_name = %coord.resolved_name,
                    status,
                    "Coordinate lookup rejected"
                );
                Ok(Lookup::NotFound)
            }
            other => other,
        }
    }

    async fn fetch_with_fallback(
        &self,
        api_key: &str,
        city: &str,
    ) -> Result<WeatherReport, WeatherError> {
        let direct = self
            .lookup(&[("q", city), ("appid", api_key), ("units", "metric")])
            .await?;

        if let Lookup::Found(parsed) = direct {
            return build_report(city.to_string(), parsed);
        }

        tracing::info!(city = %city, "City not found by name, trying geocoding fallback");

        let coord = match &self.geocoder {
            Some(geocoder) => geocoder.resolve(city).await,
            None => None,
        };
        let Some(coord) = coord else {
            return Err(WeatherError::CityNotFound(city.to_string()));
        };

        match self.fetch_by_coordinates(api_key, &coord).await? {
            Lookup::Found(parsed) => build_report(coord.resolved_name, parsed),
            Lookup::NotFound => Err(WeatherError::CityNotFound(city.to_string())),
        }
    }
}

#[async_trait]
impl WeatherLookup for WeatherClient {
    async fn fetch(&self, city: &str) -> Result<WeatherReport, WeatherError> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Err(WeatherError::MissingCredential {
                variable: self.api_key_env.clone(),
            });
        };

        let result = self.fetch_with_fallback(api_key, city).await;

        match &result {
            Ok(report) => tracing::info!(
                city = %report.city,
                temperature_c = report.temperature_c,
                "Weather lookup succeeded"
            ),
            Err(e) => tracing::warn!(city = %city, kind = e.kind(), error = %e, "Weather lookup failed"),
        }

        result
    }
}

fn build_report(city: String, parsed: OwCurrentResponse) -> Result<WeatherReport, WeatherError> {
    let condition = parsed
        .weather
        .into_iter()
        .next()
        .ok_or_else(|| WeatherError::InvalidResponse("no weather conditions in response".to_string()))?;

    Ok(WeatherReport {
        city,
        temperature_c: parsed.main.temp,
        feels_like_c: parsed.main.feels_like,
        humidity_pct: parsed.main.humidity,
        condition: title_case(&condition.description),
        wind_speed_mps: parsed.wind.speed,
    })
}

fn transport_error(e: reqwest::Error) -> WeatherError {
    if e.is_timeout() {
        WeatherError::Timeout
    } else {
        WeatherError::Connection(e.to_string())
    }
}
