//! Starts a voice session and wires the transcript router into it.

use async_trait::async_trait;
use std::{
    sync::{Arc, Weak},
    time::Duration,
};
use tokio::sync::broadcast::error::RecvError;
use tokio_util::{sync::CancellationToken, task::TaskTracker};
use tracing::{debug, error, info, warn};

use crate::{
    config::Config,
    error::SessionError,
    provider::WeatherProvider,
    router::TranscriptRouter,
    session::{SessionOptions, TranscriptEvent, TranscriptListener, VoiceSession},
    tools::weather_tools,
};

/// Pause after a failed `receive` before polling again.
pub const POLL_RETRY_DELAY: Duration = Duration::from_millis(200);
/// Interval for checking `is_closed` when the session cannot signal closure.
pub const CLOSED_CHECK_INTERVAL: Duration = Duration::from_secs(1);

/// Transcript mechanism the router ended up attached through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerMechanism {
    EventSubscription,
    ListenerRegistration,
    Polling,
}

pub struct SessionBootstrap {
    options: SessionOptions,
    greeting: String,
    router: Arc<TranscriptRouter>,
    cancel: CancellationToken,
    tasks: TaskTracker,
}

impl SessionBootstrap {
    pub fn new(config: &Config, weather: Arc<dyn WeatherProvider>) -> Self {
        let tools = weather_tools(weather.clone());
        let options = SessionOptions::from_config(&config.session, tools);
        let greeting = config.session.greeting.clone();
        Self::with_router(options, greeting, TranscriptRouter::new(weather))
    }

    pub fn with_router(
        options: SessionOptions,
        greeting: String,
        router: TranscriptRouter,
    ) -> Self {
        Self {
            options,
            greeting,
            router: Arc::new(router),
            cancel: CancellationToken::new(),
            tasks: TaskTracker::new(),
        }
    }

    /// Cancelling this token stops background listeners and ends [`run`](Self::run).
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Starts the session, attaches the router, greets the user and waits
    /// for the session to close.
    pub async fn run(
        &self,
        session: Arc<dyn VoiceSession>,
    ) -> Result<ListenerMechanism, SessionError> {
        info!(options = ?self.options, "starting voice session");
        session.start(&self.options).await?;

        let mechanism = self.attach_listener(&session);
        info!(?mechanism, "transcript router attached");

        if let Err(e) = session.generate_reply(&self.greeting).await {
            warn!(error = %e, "initial greeting failed");
        }

        self.wait_until_closed(session.as_ref()).await;
        info!("voice session closed");

        self.shutdown().await;
        Ok(mechanism)
    }

    /// Tries each transcript mechanism in order and keeps the first that
    /// works. Polling is the last resort; its first `receive` decides
    /// whether it is supported, and an unsupported poller stops at once.
    pub fn attach_listener(&self, session: &Arc<dyn VoiceSession>) -> ListenerMechanism {
        match session.subscribe() {
            Ok(events) => {
                self.spawn_subscription(session, events);
                return ListenerMechanism::EventSubscription;
            }
            Err(e) => debug!(error = %e, "event subscription unavailable"),
        }

        let listener = Arc::new(RoutingListener {
            router: self.router.clone(),
            session: Arc::downgrade(session),
        });
        match session.add_transcript_listener(listener) {
            Ok(()) => return ListenerMechanism::ListenerRegistration,
            Err(e) => debug!(error = %e, "listener registration unavailable"),
        }

        self.spawn_poller(session);
        ListenerMechanism::Polling
    }

    fn spawn_subscription(
        &self,
        session: &Arc<dyn VoiceSession>,
        mut events: tokio::sync::broadcast::Receiver<TranscriptEvent>,
    ) {
        let router = self.router.clone();
        let session = Arc::downgrade(session);
        let cancel = self.cancel.clone();

        self.tasks.spawn(async move {
            loop {
                let event = tokio::select! {
                    _ = cancel.cancelled() => break,
                    event = events.recv() => event,
                };
                match event {
                    Ok(event) => {
                        let Some(session) = session.upgrade() else { break };
                        router.handle(session.as_ref(), &event).await;
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "transcript subscription lagged");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
            debug!("transcript subscription ended");
        });
    }

    fn spawn_poller(&self, session: &Arc<dyn VoiceSession>) {
        let router = self.router.clone();
        let session = Arc::downgrade(session);
        let cancel = self.cancel.clone();

        self.tasks.spawn(async move {
            loop {
                let Some(active) = session.upgrade() else { break };
                let received = tokio::select! {
                    _ = cancel.cancelled() => break,
                    received = active.receive() => received,
                };
                match received {
                    Ok(event) => {
                        router.handle(active.as_ref(), &event).await;
                    }
                    Err(SessionError::Closed) => break,
                    Err(e @ SessionError::Unsupported(_)) => {
                        error!(error = %e, "session offers no transcript mechanism");
                        break;
                    }
                    Err(e) => {
                        debug!(error = %e, "receive failed, retrying");
                        drop(active);
                        tokio::select! {
                            _ = cancel.cancelled() => break,
                            _ = tokio::time::sleep(POLL_RETRY_DELAY) => {}
                        }
                    }
                }
            }
            debug!("transcript poller stopped");
        });
    }

    async fn wait_until_closed(&self, session: &dyn VoiceSession) {
        let signalled = tokio::select! {
            _ = self.cancel.cancelled() => return,
            res = session.wait_until_closed() => res,
        };
        if let Err(e) = signalled {
            debug!(error = %e, "closure signal unavailable, polling is_closed");
            while !session.is_closed() {
                tokio::select! {
                    _ = self.cancel.cancelled() => return,
                    _ = tokio::time::sleep(CLOSED_CHECK_INTERVAL) => {}
                }
            }
        }
    }

    /// Stops background listeners and waits for them to finish.
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        self.tasks.close();
        self.tasks.wait().await;
    }
}

struct RoutingListener {
    router: Arc<TranscriptRouter>,
    session: Weak<dyn VoiceSession>,
}

#[async_trait]
impl TranscriptListener for RoutingListener {
    async fn on_transcript(&self, event: TranscriptEvent) {
        if let Some(session) = self.session.upgrade() {
            self.router.handle(session.as_ref(), &event).await;
        }
    }
}
