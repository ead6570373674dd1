use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::{
    config::WeatherApiConfig,
    error::WeatherError,
    model::{ForecastResult, WeatherResult, coerce_chance, forecast_days_for, rain_flag, will_rain},
};

use super::WeatherProvider;

const CURRENT_PATH: &str = "/v1/current.json";
const FORECAST_PATH: &str = "/v1/forecast.json";

#[derive(Debug, Clone)]
pub struct WeatherApiProvider {
    config: WeatherApiConfig,
    http: Client,
}

impl WeatherApiProvider {
    pub fn new(config: WeatherApiConfig) -> Result<Self, WeatherError> {
        let http = Client::builder().timeout(config.timeout()).build()?;
        Ok(Self { config, http })
    }

    fn api_key(&self) -> Result<&str, WeatherError> {
        self.config.api_key().ok_or(WeatherError::MissingApiKey)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    /// Sends a GET and returns the body of a successful response.
    async fn get(&self, path: &str, query: &[(&str, &str)]) -> Result<String, WeatherError> {
        let res = self.http.get(self.url(path)).query(query).send().await?;
        debug!(url = %redact_key(res.url()), "WeatherAPI request sent");

        let status = res.status();
        if !status.is_success() {
            return Err(status_error(status.as_u16(), res.text().await));
        }

        Ok(res.text().await?)
    }
}

/// Error for a non-2xx response. The status is kept even if the body
/// could not be read.
fn status_error<E>(status: u16, body: Result<String, E>) -> WeatherError {
    let body = body.map(|b| truncate_body(&b)).unwrap_or_default();
    WeatherError::Status { status, body }
}

#[derive(Debug, Deserialize)]
struct WaLocation {
    name: Option<String>,
    region: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WaCondition {
    text: String,
}

#[derive(Debug, Deserialize)]
struct WaCurrent {
    temp_c: f64,
    humidity: Option<i64>,
    wind_kph: Option<f64>,
    condition: WaCondition,
}

#[derive(Debug, Deserialize)]
struct WaResponse {
    location: Option<WaLocation>,
    current: WaCurrent,
}

#[derive(Debug, Deserialize)]
struct WaDayCondition {
    text: Option<String>,
}

/// Rain fields are kept as raw JSON: the provider sends them as numbers in
/// some responses and as strings in others.
#[derive(Debug, Deserialize)]
struct WaDay {
    daily_will_it_rain: Option<Value>,
    daily_chance_of_rain: Option<Value>,
    condition: Option<WaDayCondition>,
}

#[derive(Debug, Deserialize)]
struct WaForecastDay {
    day: WaDay,
}

#[derive(Debug, Default, Deserialize)]
struct WaForecast {
    #[serde(default)]
    forecastday: Vec<WaForecastDay>,
}

#[derive(Debug, Deserialize)]
struct WaForecastResponse {
    #[serde(default)]
    forecast: WaForecast,
}

#[async_trait]
impl WeatherProvider for WeatherApiProvider {
    async fn current_conditions(&self, location: &str) -> Result<WeatherResult, WeatherError> {
        let key = self.api_key()?;
        let body = self.get(CURRENT_PATH, &[("key", key), ("q", location)]).await?;
        let parsed: WaResponse = serde_json::from_str(&body)?;

        let (name, region) = match parsed.location {
            Some(loc) => (loc.name, loc.region),
            None => (None, None),
        };

        Ok(WeatherResult {
            location_name: name.unwrap_or_else(|| location.to_string()),
            region,
            condition: parsed.current.condition.text,
            temperature_c: parsed.current.temp_c,
            humidity_pct: parsed.current.humidity,
            wind_kph: parsed.current.wind_kph,
        })
    }

    async fn rain_forecast(
        &self,
        location: &str,
        day_offset: u32,
    ) -> Result<ForecastResult, WeatherError> {
        let key = self.api_key()?;
        let days = forecast_days_for(day_offset).to_string();
        let query = [("key", key), ("q", location), ("days", days.as_str())];
        let body = self.get(FORECAST_PATH, &query).await?;
        let parsed: WaForecastResponse = serde_json::from_str(&body)?;

        let target = parsed.forecast.forecastday.into_iter().nth(day_offset as usize).ok_or_else(
            || WeatherError::ForecastUnavailable { location: location.to_string(), day_offset },
        )?;

        let day = target.day;
        let flag = rain_flag(day.daily_will_it_rain.as_ref());
        let chance = coerce_chance(day.daily_chance_of_rain.as_ref());
        let condition =
            day.condition.and_then(|c| c.text).unwrap_or_else(|| "no data".to_string());

        Ok(ForecastResult {
            location: location.to_string(),
            day_offset,
            will_rain: will_rain(flag, chance),
            chance_of_rain_pct: chance,
            condition,
        })
    }
}

/// Request URL with the `key` parameter masked, safe for logs.
fn redact_key(url: &reqwest::Url) -> String {
    let mut url = url.clone();
    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| {
            let v = if k == "key" { "***".to_string() } else { v.into_owned() };
            (k.into_owned(), v)
        })
        .collect();
    url.query_pairs_mut().clear().extend_pairs(pairs);
    url.to_string()
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn provider_for(server: &mockito::ServerGuard) -> WeatherApiProvider {
        let config = WeatherApiConfig {
            api_key: Some("test-key".to_string()),
            base_url: server.url(),
            timeout_secs: 10,
        };
        WeatherApiProvider::new(config).expect("client builds")
    }

    #[tokio::test]
    async fn current_weather_sentence_includes_region_humidity_and_wind() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/v1/current.json")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("key".into(), "test-key".into()),
                Matcher::UrlEncoded("q".into(), "Paris, France".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{
                    "location": {"name": "Paris", "region": "Ile-de-France", "country": "France"},
                    "current": {"temp_c": 18.0, "humidity": 62, "wind_kph": 11.2,
                                "condition": {"text": "Partly cloudy"}}
                }"#,
            )
            .create_async()
            .await;

        let reply = provider_for(&server).fetch_current("Paris, France").await;

        mock.assert_async().await;
        assert_eq!(
            reply,
            "The weather in Paris, Ile-de-France is Partly cloudy with a temperature of 18.0°C. \
             Humidity 62%. Wind 11.2 kph."
        );
    }

    #[tokio::test]
    async fn current_weather_missing_key_skips_network() {
        let mut server = mockito::Server::new_async().await;
        let mock = server.mock("GET", Matcher::Any).expect(0).create_async().await;

        let config = WeatherApiConfig { api_key: None, base_url: server.url(), timeout_secs: 10 };
        let provider = WeatherApiProvider::new(config).expect("client builds");

        assert_eq!(provider.fetch_current("Paris").await, "WeatherAPI key is missing");
        assert_eq!(provider.fetch_forecast("Paris", 1).await, "WeatherAPI key is missing");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn current_weather_failure_names_location() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/v1/current.json")
            .match_query(Matcher::Any)
            .with_status(500)
            .with_body("Internal Server Error")
            .create_async()
            .await;

        let reply = provider_for(&server).fetch_current("Atlantis").await;
        assert_eq!(reply, "Sorry, I couldn't get the weather for Atlantis.");
    }

    #[tokio::test]
    async fn current_weather_malformed_json_is_an_apology() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/v1/current.json")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body("not json at all")
            .create_async()
            .await;

        let provider = provider_for(&server);
        let err = provider.current_conditions("Lima").await.unwrap_err();
        assert!(matches!(err, WeatherError::Parse(_)));
        assert_eq!(
            provider.fetch_current("Lima").await,
            "Sorry, I couldn't get the weather for Lima."
        );
    }

    #[tokio::test]
    async fn unreachable_host_is_an_apology() {
        let config = WeatherApiConfig {
            api_key: Some("k".into()),
            base_url: "http://127.0.0.1:1".into(),
            timeout_secs: 1,
        };
        let provider = WeatherApiProvider::new(config).expect("client builds");

        assert_eq!(
            provider.fetch_current("Quito").await,
            "Sorry, I couldn't get the weather for Quito."
        );
        assert_eq!(
            provider.fetch_forecast("Quito", 0).await,
            "Sorry, I could not retrieve the rain forecast for Quito."
        );
    }

    #[tokio::test]
    async fn forecast_requests_offset_plus_one_days_and_uses_chance_threshold() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/v1/forecast.json")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("q".into(), "Boston".into()),
                Matcher::UrlEncoded("days".into(), "2".into()),
            ]))
            .with_status(200)
            .with_body(
                r#"{"forecast": {"forecastday": [
                    {"day": {"daily_will_it_rain": 0, "daily_chance_of_rain": 0,
                             "condition": {"text": "Sunny"}}},
                    {"day": {"daily_will_it_rain": 0, "daily_chance_of_rain": "45",
                             "condition": {"text": "Patchy rain possible"}}}
                ]}}"#,
            )
            .create_async()
            .await;

        let reply = provider_for(&server).fetch_forecast("Boston", 1).await;

        mock.assert_async().await;
        assert_eq!(
            reply,
            "Yes, it looks like it will rain in Boston tomorrow. Forecast: Patchy rain possible. \
             Chance of rain: 45%."
        );
    }

    #[tokio::test]
    async fn forecast_today_without_chance_says_no() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/v1/forecast.json")
            .match_query(Matcher::UrlEncoded("days".into(), "1".into()))
            .with_status(200)
            .with_body(
                r#"{"forecast": {"forecastday": [
                    {"day": {"daily_will_it_rain": 0, "condition": {"text": "Clear"}}}
                ]}}"#,
            )
            .create_async()
            .await;

        let reply = provider_for(&server).fetch_forecast("Cairo", 0).await;

        mock.assert_async().await;
        assert_eq!(reply, "No, it doesn't look like it will rain in Cairo today. Forecast: Clear.");
    }

    #[tokio::test]
    async fn forecast_shorter_than_offset_is_unavailable() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/v1/forecast.json")
            .match_query(Matcher::UrlEncoded("days".into(), "6".into()))
            .with_status(200)
            .with_body(
                r#"{"forecast": {"forecastday": [
                    {"day": {"daily_will_it_rain": 1, "condition": {"text": "Rain"}}},
                    {"day": {"daily_will_it_rain": 1, "condition": {"text": "Rain"}}},
                    {"day": {"daily_will_it_rain": 1, "condition": {"text": "Rain"}}}
                ]}}"#,
            )
            .create_async()
            .await;

        let reply = provider_for(&server).fetch_forecast("Oslo", 5).await;

        mock.assert_async().await;
        assert_eq!(reply, "Sorry, I don't have forecast data that far ahead for Oslo.");
    }

    #[tokio::test]
    async fn forecast_bad_request_and_unauthorized() {
        let mut server = mockito::Server::new_async().await;
        let _bad = server
            .mock("GET", "/v1/forecast.json")
            .match_query(Matcher::UrlEncoded("q".into(), "Xyzzy".into()))
            .with_status(400)
            .with_body(r#"{"error": {"code": 1006, "message": "No matching location found."}}"#)
            .create_async()
            .await;
        let _unauthorized = server
            .mock("GET", "/v1/forecast.json")
            .match_query(Matcher::UrlEncoded("q".into(), "Paris".into()))
            .with_status(401)
            .with_body(r#"{"error": {"code": 2006, "message": "API key is invalid."}}"#)
            .create_async()
            .await;

        let provider = provider_for(&server);
        assert_eq!(provider.fetch_forecast("Xyzzy", 1).await, "Bad request for location Xyzzy.");
        assert_eq!(
            provider.fetch_forecast("Paris", 1).await,
            "Unauthorized: check your WeatherAPI key."
        );
    }

    #[test]
    fn redacts_key_from_logged_url() {
        let url =
            reqwest::Url::parse("http://api.weatherapi.com/v1/current.json?key=SECRET&q=Paris")
                .expect("valid url");
        let shown = redact_key(&url);

        assert!(!shown.contains("SECRET"));
        assert!(shown.contains("q=Paris"));
    }

    #[test]
    fn unreadable_error_body_keeps_status() {
        let err = status_error(401, Err::<String, _>("connection reset"));

        assert_eq!(err.status(), Some(401));
        assert_eq!(
            crate::provider::forecast_apology("Paris", &err),
            "Unauthorized: check your WeatherAPI key."
        );

        let err = status_error(400, Err::<String, _>(()));
        assert_eq!(
            crate::provider::forecast_apology("Xyzzy", &err),
            "Bad request for location Xyzzy."
        );
    }

    #[test]
    fn truncates_long_bodies() {
        let long = "x".repeat(500);
        assert_eq!(truncate_body(&long).len(), 203);
        assert_eq!(truncate_body("short"), "short");
    }
}
