//! Transcript stream types and text-level helpers
//!
//! The recognition engine itself is an external process; this module
//! defines the events it produces, the source abstraction the engine
//! consumes them through, and the pure text utilities applied to them.

mod debounce;
mod matcher;
mod normalizer;

pub use debounce::DebounceTracker;
pub use matcher::{matches_any, PhraseMatcher};
pub use normalizer::TranscriptNormalizer;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tracing::{trace, warn};

/// A fragment of recognized speech
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptEvent {
    /// Recognized text, possibly still in progress
    pub text: String,
    /// End-of-utterance as detected by the recognizer's endpointing
    pub is_final: bool,
}

impl TranscriptEvent {
    pub fn partial(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_final: false,
        }
    }

    pub fn final_(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_final: true,
        }
    }
}

/// Asynchronous stream of transcript events from a recognition engine
#[async_trait]
pub trait TranscriptSource: Send {
    /// Next transcript event; `None` when the stream has ended
    async fn next_event(&mut self) -> Option<TranscriptEvent>;

    /// Discard in-flight recognition state
    ///
    /// Called after a hotword match or a forced finalize so stale partials
    /// do not bleed into the next utterance.
    fn reset(&mut self);
}

/// Transcript source reading JSON lines from standard input
///
/// Each line is either a serialized [`TranscriptEvent`] or bare text,
/// which is treated as a final transcript. This matches piping a
/// recognizer process into the daemon.
pub struct StdinTranscriptSource {
    lines: Lines<BufReader<Stdin>>,
}

impl StdinTranscriptSource {
    pub fn new() -> Self {
        Self {
            lines: BufReader::new(tokio::io::stdin()).lines(),
        }
    }
}

impl Default for StdinTranscriptSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TranscriptSource for StdinTranscriptSource {
    async fn next_event(&mut self) -> Option<TranscriptEvent> {
        loop {
            match self.lines.next_line().await {
                Ok(Some(line)) => {
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }
                    let event = match serde_json::from_str::<TranscriptEvent>(line) {
                        Ok(event) => event,
                        // Malformed structured input is not fatal; bare text
                        // is accepted as a final transcript.
                        Err(_) if !line.starts_with('{') => TranscriptEvent::final_(line),
                        Err(e) => {
                            warn!(?e, line, "ignoring malformed transcript line");
                            continue;
                        }
                    };
                    return Some(event);
                }
                Ok(None) => return None,
                Err(e) => {
                    warn!(?e, "stdin read error");
                    return None;
                }
            }
        }
    }

    fn reset(&mut self) {
        // Stdin carries no recognizer state to discard.
        trace!("transcript source reset");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_json_roundtrip() {
        let event = TranscriptEvent::partial("turn on the");
        let json = serde_json::to_string(&event).unwrap();
        let back: TranscriptEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
        assert!(!back.is_final);
    }

    #[test]
    fn test_event_deserializes_wire_shape() {
        let event: TranscriptEvent =
            serde_json::from_str(r#"{"text":"hey felix","is_final":true}"#).unwrap();
        assert_eq!(event.text, "hey felix");
        assert!(event.is_final);
    }
}
