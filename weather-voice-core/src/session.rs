//! Contract with the hosted voice-session runtime.
//!
//! The runtime owns speech recognition, the LLM, speech synthesis and the
//! room connection. Adapters implement [`VoiceSession`]; each transcript
//! mechanism is optional and defaults to [`SessionError::Unsupported`].

use async_trait::async_trait;
use serde::Deserialize;
use std::{fmt, sync::Arc};
use tokio::sync::broadcast;

use crate::{config::SessionConfig, error::SessionError, tools::Tool};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParticipantKind {
    Standard,
    /// Telephony participant bridged over SIP.
    Sip,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoiseCancellation {
    Bvc,
    BvcTelephony,
}

pub fn noise_cancellation_for(kind: ParticipantKind) -> NoiseCancellation {
    match kind {
        ParticipantKind::Sip => NoiseCancellation::BvcTelephony,
        ParticipantKind::Standard => NoiseCancellation::Bvc,
    }
}

#[derive(Debug, Clone, Copy)]
pub struct AudioInputOptions {
    pub noise_cancellation: fn(ParticipantKind) -> NoiseCancellation,
}

impl Default for AudioInputOptions {
    fn default() -> Self {
        Self { noise_cancellation: noise_cancellation_for }
    }
}

/// Everything the runtime needs to start a session.
#[derive(Clone)]
pub struct SessionOptions {
    pub stt: String,
    pub llm: String,
    pub tts: String,
    pub vad: String,
    pub turn_detection: String,
    pub instructions: String,
    pub tools: Vec<Arc<dyn Tool>>,
    pub audio_input: AudioInputOptions,
}

impl SessionOptions {
    pub fn from_config(config: &SessionConfig, tools: Vec<Arc<dyn Tool>>) -> Self {
        Self {
            stt: config.stt.clone(),
            llm: config.llm.clone(),
            tts: config.tts.clone(),
            vad: config.vad.clone(),
            turn_detection: config.turn_detection.clone(),
            instructions: config.instructions.clone(),
            tools,
            audio_input: AudioInputOptions::default(),
        }
    }

    pub fn tool_names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name()).collect()
    }
}

impl fmt::Debug for SessionOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionOptions")
            .field("stt", &self.stt)
            .field("llm", &self.llm)
            .field("tts", &self.tts)
            .field("vad", &self.vad)
            .field("turn_detection", &self.turn_detection)
            .field("tools", &self.tool_names())
            .finish_non_exhaustive()
    }
}

/// A unit of recognized speech. Runtimes label the text either `text` or
/// `transcript`; only that field is read.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct TranscriptEvent {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    transcript: Option<String>,
}

impl TranscriptEvent {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: Some(text.into()), transcript: None }
    }

    /// The recognized text, if any non-empty text was delivered.
    pub fn text(&self) -> Option<&str> {
        self.text
            .as_deref()
            .filter(|t| !t.is_empty())
            .or_else(|| self.transcript.as_deref().filter(|t| !t.is_empty()))
    }
}

impl From<&str> for TranscriptEvent {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

#[async_trait]
pub trait TranscriptListener: Send + Sync {
    async fn on_transcript(&self, event: TranscriptEvent);
}

#[async_trait]
pub trait VoiceSession: Send + Sync {
    async fn start(&self, options: &SessionOptions) -> Result<(), SessionError>;

    /// Speak `text` verbatim as the assistant.
    async fn send_assistant_message(&self, text: &str) -> Result<(), SessionError>;

    /// Ask the LLM to produce the next reply following `instructions`.
    async fn generate_reply(&self, instructions: &str) -> Result<(), SessionError>;

    /// Event-subscription mechanism.
    fn subscribe(&self) -> Result<broadcast::Receiver<TranscriptEvent>, SessionError> {
        Err(SessionError::Unsupported("transcript subscription"))
    }

    /// Listener-registration mechanism.
    fn add_transcript_listener(
        &self,
        _listener: Arc<dyn TranscriptListener>,
    ) -> Result<(), SessionError> {
        Err(SessionError::Unsupported("transcript listeners"))
    }

    /// Polling mechanism. Returns [`SessionError::Closed`] once no more
    /// events will arrive.
    async fn receive(&self) -> Result<TranscriptEvent, SessionError> {
        Err(SessionError::Unsupported("receive"))
    }

    async fn wait_until_closed(&self) -> Result<(), SessionError> {
        Err(SessionError::Unsupported("wait_until_closed"))
    }

    fn is_closed(&self) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sip_participants_get_telephony_filter() {
        let select = AudioInputOptions::default().noise_cancellation;
        assert_eq!(select(ParticipantKind::Sip), NoiseCancellation::BvcTelephony);
        assert_eq!(select(ParticipantKind::Standard), NoiseCancellation::Bvc);
    }

    #[test]
    fn transcript_event_reads_text_or_transcript() {
        let ev: TranscriptEvent = serde_json::from_str(r#"{"text": "hello"}"#).unwrap();
        assert_eq!(ev.text(), Some("hello"));

        let ev: TranscriptEvent =
            serde_json::from_str(r#"{"transcript": "rain in Oslo", "is_final": true}"#).unwrap();
        assert_eq!(ev.text(), Some("rain in Oslo"));

        let ev: TranscriptEvent =
            serde_json::from_str(r#"{"text": "", "transcript": "hi"}"#).unwrap();
        assert_eq!(ev.text(), Some("hi"));

        assert_eq!(TranscriptEvent::default().text(), None);
        assert_eq!(TranscriptEvent::from("").text(), None);
    }

    #[test]
    fn options_copy_provider_identifiers() {
        let options = SessionOptions::from_config(&SessionConfig::default(), Vec::new());
        assert_eq!(options.stt, "assemblyai/universal-streaming:en");
        assert!(options.tool_names().is_empty());
    }
}
