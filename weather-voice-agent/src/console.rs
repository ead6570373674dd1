//! Terminal stand-in for the hosted voice runtime: typed lines play the role
//! of speech transcripts and replies are printed instead of spoken.

use async_trait::async_trait;
use std::{
    io::{self, BufRead, Write},
    sync::Mutex,
    thread,
};
use tokio::sync::{mpsc, watch};
use tracing::debug;
use weather_voice_core::{SessionError, SessionOptions, TranscriptEvent, VoiceSession};

const QUIT_WORDS: [&str; 2] = ["quit", "exit"];

pub struct ConsoleSession {
    lines: tokio::sync::Mutex<mpsc::Receiver<String>>,
    out: Mutex<Box<dyn Write + Send>>,
    closed: watch::Sender<bool>,
}

impl ConsoleSession {
    pub fn new(lines: mpsc::Receiver<String>, out: Box<dyn Write + Send>) -> Self {
        Self {
            lines: tokio::sync::Mutex::new(lines),
            out: Mutex::new(out),
            closed: watch::Sender::new(false),
        }
    }

    /// Session over the process's stdin and stdout.
    ///
    /// Stdin is read on a plain thread so a pending read never holds up
    /// runtime shutdown.
    pub fn stdio() -> Self {
        let (tx, rx) = mpsc::channel(16);
        thread::spawn(move || {
            for line in io::stdin().lock().lines() {
                let Ok(line) = line else { break };
                if tx.blocking_send(line).is_err() {
                    break;
                }
            }
        });
        Self::new(rx, Box::new(io::stdout()))
    }

    fn print(&self, line: &str) -> Result<(), SessionError> {
        let mut out = self
            .out
            .lock()
            .map_err(|_| SessionError::Delivery("console poisoned".into()))?;
        writeln!(out, "{line}")
            .and_then(|_| out.flush())
            .map_err(|e| SessionError::Delivery(e.to_string()))
    }

    fn close(&self) {
        self.closed.send_replace(true);
    }
}

#[async_trait]
impl VoiceSession for ConsoleSession {
    async fn start(&self, options: &SessionOptions) -> Result<(), SessionError> {
        self.print(&format!(
            "console session (llm {}, tools: {})",
            options.llm,
            options.tool_names().join(", ")
        ))
        .map_err(|e| SessionError::Start(e.to_string()))?;
        self.print("Ask about the weather or rain. Type `quit` or press Ctrl-D to leave.")
            .map_err(|e| SessionError::Start(e.to_string()))
    }

    async fn send_assistant_message(&self, text: &str) -> Result<(), SessionError> {
        if self.is_closed() {
            return Err(SessionError::Closed);
        }
        self.print(&format!("assistant: {text}"))
    }

    async fn generate_reply(&self, instructions: &str) -> Result<(), SessionError> {
        if self.is_closed() {
            return Err(SessionError::Closed);
        }
        self.print(&format!("assistant (llm, instructed): {instructions}"))
    }

    async fn receive(&self) -> Result<TranscriptEvent, SessionError> {
        if self.is_closed() {
            return Err(SessionError::Closed);
        }

        let mut lines = self.lines.lock().await;
        match lines.recv().await {
            Some(line) if QUIT_WORDS.contains(&line.trim().to_lowercase().as_str()) => {
                self.close();
                Err(SessionError::Closed)
            }
            Some(line) => {
                debug!(line = %line, "console transcript");
                Ok(TranscriptEvent::new(line.trim()))
            }
            None => {
                self.close();
                Err(SessionError::Closed)
            }
        }
    }

    async fn wait_until_closed(&self) -> Result<(), SessionError> {
        let mut rx = self.closed.subscribe();
        rx.wait_for(|closed| *closed).await.map_err(|_| SessionError::Closed)?;
        Ok(())
    }

    fn is_closed(&self) -> bool {
        *self.closed.borrow()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl SharedBuf {
        fn contents(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    fn console() -> (ConsoleSession, mpsc::Sender<String>, SharedBuf) {
        let (tx, rx) = mpsc::channel(4);
        let buf = SharedBuf::default();
        (ConsoleSession::new(rx, Box::new(buf.clone())), tx, buf)
    }

    #[tokio::test]
    async fn lines_become_transcripts_until_eof() {
        let (session, tx, _) = console();
        tx.send("  rain in Oslo ".into()).await.unwrap();
        drop(tx);

        let event = session.receive().await.unwrap();
        assert_eq!(event.text(), Some("rain in Oslo"));

        assert_eq!(session.receive().await, Err(SessionError::Closed));
        assert!(session.is_closed());
        session.wait_until_closed().await.unwrap();
    }

    #[tokio::test]
    async fn quit_closes_session() {
        let (session, tx, _) = console();
        tx.send("Quit".into()).await.unwrap();

        assert_eq!(session.receive().await, Err(SessionError::Closed));
        assert_eq!(session.send_assistant_message("late").await, Err(SessionError::Closed));
    }

    #[tokio::test]
    async fn replies_are_printed() {
        let (session, _tx, buf) = console();

        session.send_assistant_message("It is sunny.").await.unwrap();
        session.generate_reply("Greet the user").await.unwrap();

        let printed = buf.contents();
        assert!(printed.contains("assistant: It is sunny.\n"));
        assert!(printed.contains("assistant (llm, instructed): Greet the user\n"));
    }

    #[tokio::test]
    async fn only_polling_is_supported() {
        let (session, _tx, _) = console();
        assert!(session.subscribe().is_err());
    }
}
