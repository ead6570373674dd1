use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Placeholder used when no location could be extracted from an utterance.
pub const FALLBACK_LOCATION: &str = "your location";

/// Chance of rain (percent) at or above which the answer is "yes" even when
/// the provider's rain flag is off. Tunable heuristic.
pub const RAIN_CHANCE_THRESHOLD: i64 = 30;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeatherQuery {
    pub location: String,
    pub day_offset: Option<u32>,
}

impl WeatherQuery {
    /// Builds a query, substituting [`FALLBACK_LOCATION`] for a missing or
    /// blank location.
    pub fn new(location: Option<String>, day_offset: Option<u32>) -> Self {
        let location = location
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty())
            .unwrap_or_else(|| FALLBACK_LOCATION.to_string());

        Self { location, day_offset }
    }
}

/// Number of forecast days to request so that `day_offset` is covered.
pub fn forecast_days_for(day_offset: u32) -> u32 {
    day_offset.saturating_add(1).max(1)
}

/// Current conditions at a location.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WeatherResult {
    pub location_name: String,
    pub region: Option<String>,
    pub condition: String,
    pub temperature_c: f64,
    pub humidity_pct: Option<i64>,
    pub wind_kph: Option<f64>,
}

impl WeatherResult {
    pub fn to_sentence(&self) -> String {
        let region = match self.region.as_deref() {
            Some(r) if !r.is_empty() => format!(", {r}"),
            _ => String::new(),
        };

        let mut out = format!(
            "The weather in {}{} is {} with a temperature of {}°C.",
            self.location_name,
            region,
            self.condition,
            format_reading(self.temperature_c)
        );
        if let Some(h) = self.humidity_pct {
            out.push_str(&format!(" Humidity {h}%."));
        }
        if let Some(w) = self.wind_kph {
            out.push_str(&format!(" Wind {} kph.", format_reading(w)));
        }
        out
    }
}

/// Measurements keep at least one decimal place, so 18 reads as "18.0".
fn format_reading(value: f64) -> String {
    if value.fract() == 0.0 && value.is_finite() {
        format!("{value:.1}")
    } else {
        value.to_string()
    }
}

/// Rain outlook for one forecast day.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ForecastResult {
    pub location: String,
    pub day_offset: u32,
    pub will_rain: bool,
    pub chance_of_rain_pct: Option<i64>,
    pub condition: String,
}

impl ForecastResult {
    pub fn day_label(&self) -> String {
        day_label(self.day_offset)
    }

    pub fn to_sentence(&self) -> String {
        let chance = self
            .chance_of_rain_pct
            .map(|c| format!(" Chance of rain: {c}%."))
            .unwrap_or_default();

        if self.will_rain {
            format!(
                "Yes, it looks like it will rain in {} {}. Forecast: {}.{}",
                self.location,
                self.day_label(),
                self.condition,
                chance
            )
        } else {
            format!(
                "No, it doesn't look like it will rain in {} {}. Forecast: {}.{}",
                self.location,
                self.day_label(),
                self.condition,
                chance
            )
        }
    }
}

pub fn day_label(day_offset: u32) -> String {
    match day_offset {
        0 => "today".to_string(),
        1 => "tomorrow".to_string(),
        n => format!("in {n} days"),
    }
}

/// Rain is expected if the provider says so, or the chance reaches
/// [`RAIN_CHANCE_THRESHOLD`].
pub fn will_rain(flag: bool, chance_pct: Option<i64>) -> bool {
    flag || chance_pct.is_some_and(|c| c >= RAIN_CHANCE_THRESHOLD)
}

/// Reads the provider's rain flag, which arrives as `0`/`1` or a boolean.
pub fn rain_flag(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64() == Some(1.0),
        _ => false,
    }
}

/// Coerces a chance-of-rain value to a whole percentage.
///
/// Accepts integers, decimals and their string forms; decimals are truncated.
/// Anything else is unknown.
pub fn coerce_chance(value: Option<&Value>) -> Option<i64> {
    match value? {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.trunc() as i64)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>().ok().or_else(|| {
                s.parse::<f64>()
                    .ok()
                    .filter(|f| f.is_finite())
                    .map(|f| f.trunc() as i64)
            })
        }
        _ => None,
    }
}
