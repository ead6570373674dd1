//! Function tools exposed to the hosted LLM.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::provider::WeatherProvider;

/// A function the LLM may call. Tools answer with text to be spoken and
/// never fail.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// JSON schema of the tool's arguments.
    fn input_schema(&self) -> Value;

    async fn execute(&self, input: Value) -> String;
}

/// Both weather tools, ready to hand to the session.
pub fn weather_tools(weather: Arc<dyn WeatherProvider>) -> Vec<Arc<dyn Tool>> {
    vec![
        Arc::new(GetWeatherTool::new(weather.clone())),
        Arc::new(GetForecastTool::new(weather)),
    ]
}

#[derive(Debug, Deserialize)]
struct GetWeatherInput {
    location: String,
}

#[derive(Debug, Deserialize)]
struct GetForecastInput {
    location: String,
    #[serde(default)]
    day: i64,
}

pub struct GetWeatherTool {
    weather: Arc<dyn WeatherProvider>,
}

impl GetWeatherTool {
    pub fn new(weather: Arc<dyn WeatherProvider>) -> Self {
        Self { weather }
    }
}

#[async_trait]
impl Tool for GetWeatherTool {
    fn name(&self) -> &str {
        "getweather"
    }

    fn description(&self) -> &str {
        "Return current weather from WeatherAPI for a city."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "location": {
                    "type": "string",
                    "description": "City or place name, e.g. \"Paris, France\""
                }
            },
            "required": ["location"]
        })
    }

    async fn execute(&self, input: Value) -> String {
        let input: GetWeatherInput = match serde_json::from_value(input) {
            Ok(input) => input,
            Err(e) => {
                warn!(tool = self.name(), error = %e, "invalid tool input");
                return "Sorry, I need a location to look up the weather.".to_string();
            }
        };

        debug!(tool = self.name(), location = %input.location, "tool called");
        self.weather.fetch_current(&input.location).await
    }
}

pub struct GetForecastTool {
    weather: Arc<dyn WeatherProvider>,
}

impl GetForecastTool {
    pub fn new(weather: Arc<dyn WeatherProvider>) -> Self {
        Self { weather }
    }
}

#[async_trait]
impl Tool for GetForecastTool {
    fn name(&self) -> &str {
        "getForecast"
    }

    fn description(&self) -> &str {
        "Check if it will rain in the given location in `day` days. \
         day=0 is today, day=1 is tomorrow."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "location": {
                    "type": "string",
                    "description": "City or place name"
                },
                "day": {
                    "type": "integer",
                    "description": "Days from today (0 = today, 1 = tomorrow)",
                    "minimum": 0
                }
            },
            "required": ["location", "day"]
        })
    }

    async fn execute(&self, input: Value) -> String {
        let input: GetForecastInput = match serde_json::from_value(input) {
            Ok(input) => input,
            Err(e) => {
                warn!(tool = self.name(), error = %e, "invalid tool input");
                return "Sorry, I need a location and a day to check the forecast.".to_string();
            }
        };

        let day = u32::try_from(input.day.max(0)).unwrap_or(u32::MAX);
        debug!(tool = self.name(), location = %input.location, day, "tool called");
        self.weather.fetch_forecast(&input.location, day).await
    }
}
