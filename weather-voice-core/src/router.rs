//! Regex-driven fallback path that answers weather and rain questions
//! straight from transcript events, independent of the LLM's tool calls.

use chrono::{Datelike, Utc, Weekday};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::{
    intent::{extract_day_offset_from, extract_location_match},
    model::WeatherQuery,
    provider::WeatherProvider,
    session::{TranscriptEvent, VoiceSession},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    RainForecast,
    CurrentWeather,
}

/// Rain is checked before weather: "will the weather bring rain" is a
/// forecast question.
pub fn classify(text: &str) -> Option<Intent> {
    let lower = text.to_lowercase();
    if lower.contains("rain") {
        Some(Intent::RainForecast)
    } else if lower.contains("weather") {
        Some(Intent::CurrentWeather)
    } else {
        None
    }
}

/// How a reply reached the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    AssistantMessage,
    GeneratedReply,
    Dropped,
}

pub struct TranscriptRouter {
    weather: Arc<dyn WeatherProvider>,
    weekday_override: Option<Weekday>,
}

impl TranscriptRouter {
    pub fn new(weather: Arc<dyn WeatherProvider>) -> Self {
        Self { weather, weekday_override: None }
    }

    /// Pin "today" for weekday arithmetic instead of reading the clock.
    pub fn with_today(mut self, today: Weekday) -> Self {
        self.weekday_override = Some(today);
        self
    }

    fn today(&self) -> Weekday {
        self.weekday_override.unwrap_or_else(|| Utc::now().weekday())
    }

    /// Builds the query for `text` under `intent`.
    pub fn query_for(&self, intent: Intent, text: &str) -> WeatherQuery {
        let found = extract_location_match(text);
        if let Some(m) = found.as_ref().filter(|m| m.is_low_confidence()) {
            debug!(location = %m.location, "location taken from capitalized fallback");
        }
        let location = found.map(|m| m.location);

        match intent {
            Intent::RainForecast => {
                WeatherQuery::new(location, Some(extract_day_offset_from(text, self.today())))
            }
            Intent::CurrentWeather => WeatherQuery::new(location, None),
        }
    }

    /// Reply text for `text`, or `None` when it is not a weather question.
    pub async fn reply_for(&self, text: &str) -> Option<String> {
        let intent = classify(text)?;
        let query = self.query_for(intent, text);
        info!(
            ?intent,
            location = %query.location,
            day_offset = ?query.day_offset,
            "weather intent"
        );

        let reply = match intent {
            Intent::RainForecast => {
                self.weather
                    .fetch_forecast(&query.location, query.day_offset.unwrap_or_default())
                    .await
            }
            Intent::CurrentWeather => self.weather.fetch_current(&query.location).await,
        };
        Some(reply)
    }

    /// Answers one transcript event. Returns `None` when no reply was due.
    pub async fn handle(
        &self,
        session: &dyn VoiceSession,
        event: &TranscriptEvent,
    ) -> Option<Delivery> {
        let text = event.text()?;
        let reply = self.reply_for(text).await?;
        Some(deliver(session, &reply).await)
    }
}

/// Speaks `reply` directly, falling back to a generated reply seeded with
/// it. If both channels fail the reply is dropped.
pub async fn deliver(session: &dyn VoiceSession, reply: &str) -> Delivery {
    match session.send_assistant_message(reply).await {
        Ok(()) => return Delivery::AssistantMessage,
        Err(e) => warn!(error = %e, "send_assistant_message failed, trying generate_reply"),
    }

    match session.generate_reply(reply).await {
        Ok(()) => Delivery::GeneratedReply,
        Err(e) => {
            error!(error = %e, reply, "failed to deliver weather reply");
            Delivery::Dropped
        }
    }
}
