use crate::{
    WeatherApiConfig,
    error::WeatherError,
    model::{ForecastResult, WeatherResult},
    provider::weatherapi::WeatherApiProvider,
};
use async_trait::async_trait;
use std::{fmt::Debug, sync::Arc};
use tracing::warn;

pub mod weatherapi;

/// Source of weather data.
///
/// The typed methods may fail; `fetch_current` and `fetch_forecast` are the
/// user-facing operations and always resolve to a sentence that can be
/// spoken, apology included.
#[async_trait]
pub trait WeatherProvider: Send + Sync + Debug {
    async fn current_conditions(&self, location: &str) -> Result<WeatherResult, WeatherError>;

    async fn rain_forecast(
        &self,
        location: &str,
        day_offset: u32,
    ) -> Result<ForecastResult, WeatherError>;

    async fn fetch_current(&self, location: &str) -> String {
        match self.current_conditions(location).await {
            Ok(result) => result.to_sentence(),
            Err(err) => {
                warn!(location, error = %err, "current weather lookup failed");
                current_apology(location, &err)
            }
        }
    }

    async fn fetch_forecast(&self, location: &str, day_offset: u32) -> String {
        match self.rain_forecast(location, day_offset).await {
            Ok(result) => result.to_sentence(),
            Err(err) => {
                warn!(
                    location,
                    day_offset,
                    status = ?err.status(),
                    error = %err,
                    "rain forecast lookup failed"
                );
                forecast_apology(location, &err)
            }
        }
    }
}

pub fn current_apology(location: &str, err: &WeatherError) -> String {
    match err {
        WeatherError::MissingApiKey => err.to_string(),
        _ => format!("Sorry, I couldn't get the weather for {location}."),
    }
}

pub fn forecast_apology(location: &str, err: &WeatherError) -> String {
    match (err, err.status()) {
        (WeatherError::MissingApiKey, _) => err.to_string(),
        (WeatherError::ForecastUnavailable { .. }, _) => {
            format!("Sorry, I don't have forecast data that far ahead for {location}.")
        }
        (_, Some(400)) => format!("Bad request for location {location}."),
        (_, Some(401)) => "Unauthorized: check your WeatherAPI key.".to_string(),
        (_, Some(_)) => format!("Sorry, I couldn't get the forecast for {location}."),
        (_, None) => format!("Sorry, I could not retrieve the rain forecast for {location}."),
    }
}

/// Construct the WeatherAPI.com provider from its configuration.
pub fn provider_from_config(config: &WeatherApiConfig) -> anyhow::Result<Arc<dyn WeatherProvider>> {
    let provider = WeatherApiProvider::new(config.clone())?;
    Ok(Arc::new(provider))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct FailingProvider(fn() -> WeatherError);

    #[async_trait]
    impl WeatherProvider for FailingProvider {
        async fn current_conditions(&self, _: &str) -> Result<WeatherResult, WeatherError> {
            Err((self.0)())
        }

        async fn rain_forecast(&self, _: &str, _: u32) -> Result<ForecastResult, WeatherError> {
            Err((self.0)())
        }
    }

    fn status(code: u16) -> WeatherError {
        WeatherError::Status { status: code, body: String::new() }
    }

    #[test]
    fn forecast_status_codes_have_distinct_messages() {
        assert_eq!(forecast_apology("Nowhere", &status(400)), "Bad request for location Nowhere.");
        assert_eq!(
            forecast_apology("Paris", &status(401)),
            "Unauthorized: check your WeatherAPI key."
        );
        assert_eq!(
            forecast_apology("Paris", &status(503)),
            "Sorry, I couldn't get the forecast for Paris."
        );
    }

    #[test]
    fn forecast_unavailable_and_missing_key_messages() {
        let far = WeatherError::ForecastUnavailable { location: "Oslo".into(), day_offset: 20 };
        assert_eq!(
            forecast_apology("Oslo", &far),
            "Sorry, I don't have forecast data that far ahead for Oslo."
        );
        let missing = WeatherError::MissingApiKey;
        assert_eq!(forecast_apology("Oslo", &missing), "WeatherAPI key is missing");
        assert_eq!(current_apology("Oslo", &missing), "WeatherAPI key is missing");
    }

    #[tokio::test]
    async fn string_operations_never_fail_and_name_the_location() {
        let parse_err = || WeatherError::Parse(serde_json::from_str::<u8>("nope").unwrap_err());
        let provider = FailingProvider(parse_err);

        let current = provider.fetch_current("Reykjavik").await;
        assert_eq!(current, "Sorry, I couldn't get the weather for Reykjavik.");

        let forecast = provider.fetch_forecast("Reykjavik", 2).await;
        assert_eq!(forecast, "Sorry, I could not retrieve the rain forecast for Reykjavik.");
    }

    #[test]
    fn provider_from_config_works_without_key() {
        let provider = provider_from_config(&WeatherApiConfig::default());
        assert!(provider.is_ok());
    }
}
