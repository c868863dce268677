//! Direct geocoding of place names
//!
//! Used only as a fallback when the weather endpoint does not recognise a
//! city by name. Every failure collapses to `None`.

use super::GeoCoordinate;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

const GEOCODING_PATH: &str = "/geo/1.0/direct";

#[derive(Debug, Deserialize)]
struct GeoMatch {
    name: String,
    lat: f64,
    lon: f64,
}

/// Client for the OpenWeatherMap direct geocoding endpoint
#[derive(Debug, Clone)]
pub struct GeocodingClient {
    http: Client,
    base_url: String,
    api_key: String,
    timeout: Duration,
}

impl GeocodingClient {
    /// Create a geocoding client sharing `http`'s connection pool
    pub fn new(http: Client, base_url: &str, api_key: String, timeout: Duration) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            timeout,
        }
    }

    /// Resolve `city` to the single best matching coordinate
    ///
    /// Returns `None` on an empty result set, a non-2xx status, a transport
    /// error or an undecodable body.
    pub async fn resolve(&self, city: &str) -> Option<GeoCoordinate> {
        let url = format!("{}{}", self.base_url, GEOCODING_PATH);

        let response = match self
            .http
            .get(&url)
            .query(&[("q", city), ("limit", "1"), ("appid", self.api_key.as_str())])
            .timeout(self.timeout)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(city = %city, error = %e, "Geocoding request failed");
                return None;
            }
        };

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(
                city = %city,
                status = status.as_u16(),
                "Geocoding endpoint returned non-success status"
            );
            return None;
        }

        let matches: Vec<GeoMatch> = match response.json().await {
            Ok(matches) => matches,
            Err(e) => {
                tracing::warn!(city = %city, error = %e, "Geocoding response was not decodable");
                return None;
            }
        };

        let first = matches.into_iter().next()?;
        tracing::debug!(
            city = %city,
            resolved_name = %first.name,
            latitude = first.lat,
            longitude = first.lon,
            "Geocoded city"
        );

        Some(GeoCoordinate {
            latitude: first.lat,
            longitude: first.lon,
            resolved_name: first.name,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> GeocodingClient {
        GeocodingClient::new(
            Client::new(),
            &server.uri(),
            "test-key".to_string(),
            Duration::from_secs(5),
        )
    }

    #[tokio::test]
    async fn test_resolve_returns_first_match() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/geo/1.0/direct"))
            .and(query_param("q", "Kyiv"))
            .and(query_param("limit", "1"))
            .and(query_param("appid", "test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"name": "Kyiv", "lat": 50.45, "lon": 30.52, "country": "UA"}
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let coord = client(&server).resolve("Kyiv").await.expect("should resolve");
        assert_eq!(coord.resolved_name, "Kyiv");
        assert_eq!(coord.latitude, 50.45);
        assert_eq!(coord.longitude, 30.52);
    }

    #[tokio::test]
    async fn test_resolve_empty_results_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/geo/1.0/direct"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
            .mount(&server)
            .await;

        assert!(client(&server).resolve("Nowhere").await.is_none());
    }

    #[tokio::test]
    async fn test_resolve_error_status_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/geo/1.0/direct"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        assert!(client(&server).resolve("Kyiv").await.is_none());
    }

    #[tokio::test]
    async fn test_resolve_malformed_body_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/geo/1.0/direct"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        assert!(client(&server).resolve("Kyiv").await.is_none());
    }

    #[tokio::test]
    async fn test_resolve_unreachable_host_is_none() {
        let geocoder = GeocodingClient::new(
            Client::new(),
            "http://127.0.0.1:9",
            "test-key".to_string(),
            Duration::from_secs(1),
        );
        assert!(geocoder.resolve("Kyiv").await.is_none());
    }
}
