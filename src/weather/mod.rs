//! Live weather lookups
//!
//! [`WeatherClient`] queries the OpenWeatherMap current-weather endpoint by
//! city name and falls back to [`GeocodingClient`] coordinates when the name
//! is unknown to the weather API.

pub mod client;
pub mod geocoding;

pub use client::WeatherClient;
pub use geocoding::GeocodingClient;

use async_trait::async_trait;
use std::fmt;
use thiserror::Error;

/// Current conditions for one place
///
/// Only ever built from a successful upstream response carrying every field.
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherReport {
    pub city: String,
    pub temperature_c: f64,
    pub feels_like_c: f64,
    pub humidity_pct: i64,
    pub condition: String,
    pub wind_speed_mps: f64,
}

impl fmt::Display for WeatherReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Weather in {}:\n\
             - Temperature: {}°C (Feels like: {}°C)\n\
             - Condition: {}\n\
             - Humidity: {}%\n\
             - Wind Speed: {} m/s",
            self.city,
            self.temperature_c,
            self.feels_like_c,
            self.condition,
            self.humidity_pct,
            self.wind_speed_mps
        )
    }
}

/// A geocoded place
#[derive(Debug, Clone, PartialEq)]
pub struct GeoCoordinate {
    pub latitude: f64,
    pub longitude: f64,
    pub resolved_name: String,
}

/// Why a weather lookup produced no report
///
/// `Display` renders the sentence shown to the user.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WeatherError {
    #[error("Weather API key not found. Please set {variable}.")]
    MissingCredential { variable: String },

    #[error("City '{0}' not found. Please check the spelling.")]
    CityNotFound(String),

    #[error("Weather API request timed out. Please try again.")]
    Timeout,

    #[error("Error connecting to Weather API: {0}")]
    Connection(String),

    #[error("Could not fetch weather data. Error code: {0}")]
    Status(u16),

    #[error("Error getting weather: {0}")]
    InvalidResponse(String),
}

impl WeatherError {
    /// Short label for metrics and logs
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MissingCredential { .. } => "missing_credential",
            Self::CityNotFound(_) => "city_not_found",
            Self::Timeout => "timeout",
            Self::Connection(_) => "connection",
            Self::Status(_) => "status",
            Self::InvalidResponse(_) => "invalid_response",
        }
    }
}

/// Anything that can look up the weather for a city name
///
/// Implemented by [`WeatherClient`]; routers depend on this trait so tests
/// can substitute canned lookups.
#[async_trait]
pub trait WeatherLookup: Send + Sync {
    /// Fetch current conditions for `city`
    async fn fetch(&self, city: &str) -> Result<WeatherReport, WeatherError>;

    /// Fetch and render as the text handed to users or to the model
    ///
    /// Success renders the report summary, failure renders the error sentence.
    async fn fetch_text(&self, city: &str) -> String {
        match self.fetch(city).await {
            Ok(report) => report.to_string(),
            Err(e) => e.to_string(),
        }
    }
}

/// Uppercase each letter that follows a non-letter, lowercase the rest
///
/// `"new york"` becomes `"New York"`, `"light rain"` becomes `"Light Rain"`.
pub fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut previous_is_letter = false;
    for c in text.chars() {
        if c.is_alphabetic() {
            if previous_is_letter {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            previous_is_letter = true;
        } else {
            out.push(c);
            previous_is_letter = false;
        }
    }
    out
}
