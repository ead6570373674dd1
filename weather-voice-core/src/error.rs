use thiserror::Error;

/// Failures of a single WeatherAPI.com call.
///
/// None of these escape the string-returning client operations; they are
/// mapped to apology strings at that boundary.
#[derive(Error, Debug)]
pub enum WeatherError {
    #[error("WeatherAPI key is missing")]
    MissingApiKey,

    #[error("WeatherAPI request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("WeatherAPI request failed with status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Failed to parse WeatherAPI JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("No forecast data {day_offset} day(s) ahead for {location}")]
    ForecastUnavailable { location: String, day_offset: u32 },
}

impl WeatherError {
    /// HTTP status of the failed response, if the provider answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            WeatherError::Status { status, .. } => Some(*status),
            WeatherError::Http(err) => err.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("Session does not support {0}")]
    Unsupported(&'static str),

    #[error("Session is closed")]
    Closed,

    #[error("Failed to deliver reply: {0}")]
    Delivery(String),

    #[error("Failed to start session: {0}")]
    Start(String),

    #[error("Transient session error: {0}")]
    Transient(String),
}
