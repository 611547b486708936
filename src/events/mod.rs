//! Outbound event vocabulary and the sink the state machine writes to
//!
//! Every reaction of the assistant is announced as a named event with an
//! optional payload. The desktop shell subscribes to these over IPC and
//! renders them; the daemon never waits for acknowledgment.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::debug;

/// Notifications emitted by the conversation state machine
///
/// Serialized as `{ "name": ..., "value": ... }`, the wire shape the
/// desktop shell consumes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "name", content = "value", rename_all = "snake_case")]
pub enum AssistantEvent {
    /// Activation phrase recognized, question capture begins
    VoiceInputStart,

    /// A completed question, about to be sent to the answering service
    Question(String),

    /// The answering service request is in flight
    GptStart,

    /// Answer text received from the answering service
    Answer(String),

    /// Synthesized speech is ready, playback starting
    Tts,

    /// Playback of the synthesized answer finished
    TtsEnd,

    /// Stop phrase recognized, capture or playback abandoned
    Stop,

    /// Meme trigger phrase recognized, meme loop entered
    MemeHotword,

    /// A meme was fetched; payload is its URL
    Meme(String),

    /// Meme loop left via the stop phrase
    MemeStop,

    /// A collaborator call failed; payload describes the failure
    Error(String),

    /// Raw transcript passthrough, only emitted when diagnostics are enabled
    VoiceInputDebug { text: String, is_final: bool },
}

impl AssistantEvent {
    /// Wire name of the event, as the UI sees it
    pub fn name(&self) -> &'static str {
        match self {
            AssistantEvent::VoiceInputStart => "voice_input_start",
            AssistantEvent::Question(_) => "question",
            AssistantEvent::GptStart => "gpt_start",
            AssistantEvent::Answer(_) => "answer",
            AssistantEvent::Tts => "tts",
            AssistantEvent::TtsEnd => "tts_end",
            AssistantEvent::Stop => "stop",
            AssistantEvent::MemeHotword => "meme_hotword",
            AssistantEvent::Meme(_) => "meme",
            AssistantEvent::MemeStop => "meme_stop",
            AssistantEvent::Error(_) => "error",
            AssistantEvent::VoiceInputDebug { .. } => "voice_input_debug",
        }
    }
}

impl std::fmt::Display for AssistantEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AssistantEvent::Question(text) | AssistantEvent::Answer(text) => {
                write!(f, "{} ({})", self.name(), text)
            }
            AssistantEvent::Meme(url) => write!(f, "{} ({})", self.name(), url),
            AssistantEvent::Error(message) => write!(f, "{} ({})", self.name(), message),
            other => write!(f, "{}", other.name()),
        }
    }
}

/// Fire-and-forget, emission-ordered channel for [`AssistantEvent`]s
///
/// Wraps a broadcast sender so the IPC server and the status tracker can
/// subscribe independently. A send with no live receivers is not an error.
#[derive(Clone)]
pub struct EventSink {
    tx: broadcast::Sender<AssistantEvent>,
}

impl EventSink {
    /// Create a sink together with an initial receiver
    pub fn new(capacity: usize) -> (Self, broadcast::Receiver<AssistantEvent>) {
        let (tx, rx) = broadcast::channel(capacity);
        (Self { tx }, rx)
    }

    /// Wrap an existing broadcast sender
    pub fn from_sender(tx: broadcast::Sender<AssistantEvent>) -> Self {
        Self { tx }
    }

    /// Emit an event to all current subscribers
    pub fn emit(&self, event: AssistantEvent) {
        debug!(name = event.name(), %event, "emitting event");
        let _ = self.tx.send(event);
    }

    /// Open an additional subscription
    pub fn subscribe(&self) -> broadcast::Receiver<AssistantEvent> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serialization() {
        let event = AssistantEvent::Question("what is the weather".to_string());
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains(r#""name":"question""#));
        assert!(json.contains("what is the weather"));
    }

    #[test]
    fn test_unit_event_serialization() {
        let json = serde_json::to_string(&AssistantEvent::TtsEnd).unwrap();
        assert!(json.contains(r#""name":"tts_end""#));
    }

    #[test]
    fn test_event_deserialization() {
        let json = r#"{"name":"meme","value":"https://example.com/a.jpg"}"#;
        let event: AssistantEvent = serde_json::from_str(json).unwrap();
        assert_eq!(
            event,
            AssistantEvent::Meme("https://example.com/a.jpg".to_string())
        );
    }

    #[test]
    fn test_sink_delivers_in_order() {
        let (sink, mut rx) = EventSink::new(16);
        sink.emit(AssistantEvent::VoiceInputStart);
        sink.emit(AssistantEvent::GptStart);
        assert_eq!(rx.try_recv().unwrap(), AssistantEvent::VoiceInputStart);
        assert_eq!(rx.try_recv().unwrap(), AssistantEvent::GptStart);
    }

    #[test]
    fn test_sink_without_receivers_does_not_panic() {
        let (sink, rx) = EventSink::new(4);
        drop(rx);
        sink.emit(AssistantEvent::Stop);
    }
}
