//! Core library for the weather voice agent.
//!
//! This crate defines:
//! - Configuration & credentials handling
//! - The WeatherAPI.com client and its spoken replies
//! - Location/day extraction and the transcript router
//! - The contract with the hosted voice-session runtime, and its bootstrap
//!
//! It is used by `weather-voice-agent`, but any runtime adapter implementing
//! [`VoiceSession`] can drive it.

pub mod bootstrap;
pub mod config;
pub mod error;
pub mod intent;
pub mod model;
pub mod provider;
pub mod router;
pub mod session;
pub mod tools;

pub use bootstrap::{ListenerMechanism, SessionBootstrap};
pub use config::{Config, SessionConfig, WeatherApiConfig};
pub use error::{SessionError, WeatherError};
pub use model::{ForecastResult, WeatherQuery, WeatherResult};
pub use provider::{WeatherProvider, provider_from_config};
pub use router::{Delivery, Intent, TranscriptRouter};
pub use session::{SessionOptions, TranscriptEvent, TranscriptListener, VoiceSession};
pub use tools::Tool;
