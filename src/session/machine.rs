//! Conversation state machine
//!
//! Decides, for every incoming transcript fragment, whether it is noise,
//! a hotword, a completed command, a continuation command, or a stop
//! request. The machine is a pure transition core: it takes transcript
//! events and collaborator signals and returns effects, but performs no
//! I/O itself. The [`Engine`](super::Engine) executes the effects.
//!
//! Three independently gated checks run against every transcript event:
//! hotword matching while listening, question capture while a question is
//! awaited, and stop-phrase barge-in while input is suppressed. They are
//! deliberately not branches of one dispatch; the session therefore keeps
//! a primary mode plus two orthogonal flags instead of one flat state.

use std::time::Duration;

use tracing::{debug, info, trace};

use crate::config::Config;
use crate::events::AssistantEvent;
use crate::services::AudioHandle;
use crate::transcript::{DebounceTracker, PhraseMatcher, TranscriptEvent, TranscriptNormalizer};

use super::cooldown::CooldownSlot;

/// Primary mode of the conversation session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Passive matching of activation and meme phrases
    #[default]
    Listening,
    /// Activation matched, capturing the spoken question
    AwaitingQuestion,
    /// Question sent, waiting for the answering service
    AwaitingAnswer,
    /// Answer playback in progress
    Speaking,
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Mode::Listening => write!(f, "Listening"),
            Mode::AwaitingQuestion => write!(f, "AwaitingQuestion"),
            Mode::AwaitingAnswer => write!(f, "AwaitingAnswer"),
            Mode::Speaking => write!(f, "Speaking"),
        }
    }
}

/// Mutable session record, owned exclusively by the state machine
#[derive(Debug, Default)]
pub struct Session {
    mode: Mode,
    meme_loop_active: bool,
    input_suppressed: bool,
    continuation_token: Option<String>,
}

/// Stage of the answer pipeline a failure occurred in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Answering,
    Synthesis,
    Playback,
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelineStage::Answering => write!(f, "answering"),
            PipelineStage::Synthesis => write!(f, "synthesis"),
            PipelineStage::Playback => write!(f, "playback"),
        }
    }
}

/// Asynchronous results fed back into the machine by the engine
#[derive(Debug)]
pub enum Signal {
    /// The answering service replied
    AnswerReady {
        generation: u64,
        text: String,
        continuation_token: String,
    },
    /// Synthesized audio is ready to play
    SynthesisReady {
        generation: u64,
        audio: AudioHandle,
    },
    /// Answer playback completed
    PlaybackFinished { generation: u64 },
    /// A pipeline stage failed
    PipelineFailed {
        generation: u64,
        stage: PipelineStage,
        message: String,
    },
    /// A meme fetch completed
    MemeFetched { url: String },
    /// A meme fetch failed
    MemeFetchFailed { message: String },
    /// A suppression window elapsed
    CooldownExpired(CooldownSlot),
}

/// Side effects requested by a transition
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Notify the UI
    Emit(AssistantEvent),
    /// Discard in-flight recognition state
    ResetSource,
    /// Send a question to the answering service
    Ask {
        generation: u64,
        question: String,
        continuation: Option<String>,
    },
    /// Synthesize answer text
    Synthesize { generation: u64, text: String },
    /// Play synthesized audio
    Play { generation: u64, audio: AudioHandle },
    /// Request a meme from the provider
    FetchMeme,
    /// Play the meme acknowledgment clip
    PlayAcknowledgment,
    /// Arm a suppression window; replaces any pending one in the slot
    StartCooldown { slot: CooldownSlot, duration: Duration },
    /// Cancel a pending suppression window
    CancelCooldown(CooldownSlot),
}

/// Tunables of the transition core, taken from [`Config`]
#[derive(Debug, Clone)]
pub struct MachineParams {
    pub min_question_chars: usize,
    pub min_question_words: usize,
    pub stop_partial_max_chars: usize,
    pub stop_final_max_chars: usize,
    pub hotword_cooldown: Duration,
    pub meme_cooldown: Duration,
    pub continuation_cooldown: Duration,
    pub debug_transcripts: bool,
}

impl From<&Config> for MachineParams {
    fn from(config: &Config) -> Self {
        Self {
            min_question_chars: config.min_question_chars,
            min_question_words: config.min_question_words,
            stop_partial_max_chars: config.stop_partial_max_chars,
            stop_final_max_chars: config.stop_final_max_chars,
            hotword_cooldown: Duration::from_millis(config.hotword_cooldown_ms),
            meme_cooldown: Duration::from_millis(config.meme_cooldown_ms),
            continuation_cooldown: Duration::from_millis(config.continuation_cooldown_ms),
            debug_transcripts: config.debug_transcripts,
        }
    }
}

/// The conversation state machine
pub struct ConversationStateMachine {
    session: Session,
    normalizer: TranscriptNormalizer,
    matcher: PhraseMatcher,
    debounce: DebounceTracker,
    params: MachineParams,
    /// Monotonic pipeline generation; bumping it discards in-flight results
    generation: u64,
}

impl ConversationStateMachine {
    pub fn new(config: &Config) -> Self {
        Self {
            session: Session::default(),
            normalizer: TranscriptNormalizer::new(
                &config.filler_prefixes,
                &config.self_echo_phrases,
            ),
            matcher: PhraseMatcher::new(config),
            debounce: DebounceTracker::new(config.debounce_threshold),
            params: MachineParams::from(config),
            generation: 0,
        }
    }

    pub fn mode(&self) -> Mode {
        self.session.mode
    }

    pub fn meme_loop_active(&self) -> bool {
        self.session.meme_loop_active
    }

    pub fn input_suppressed(&self) -> bool {
        self.session.input_suppressed
    }

    /// Ingest one transcript event and return the effects to execute
    pub fn on_transcript(&mut self, event: &TranscriptEvent) -> Vec<Effect> {
        let mut effects = Vec::new();

        if self.params.debug_transcripts {
            effects.push(Effect::Emit(AssistantEvent::VoiceInputDebug {
                text: event.text.clone(),
                is_final: event.is_final,
            }));
        }

        let text = self.normalizer.normalize(&event.text);
        if text.is_empty() {
            return effects;
        }

        // While suppressed the recognizer keeps accumulating the
        // assistant's own speech; keep discarding it.
        if self.session.input_suppressed {
            effects.push(Effect::ResetSource);
        }

        self.check_hotwords(&text, &mut effects);
        self.capture_question(&text, event.is_final, &mut effects);
        self.check_barge_in(&text, &mut effects);

        effects
    }

    /// Activation, meme trigger, continuation and meme-stop checks
    ///
    /// All four are evaluated against the same listening snapshot, so a
    /// single transcript may fire more than one trigger.
    fn check_hotwords(&mut self, text: &str, effects: &mut Vec<Effect>) {
        if self.session.mode != Mode::Listening || self.session.input_suppressed {
            return;
        }

        if self.matcher.matches_activation(text) {
            info!(text, "activation phrase matched");
            self.transition(Mode::AwaitingQuestion);
            self.debounce.reset();
            self.session.input_suppressed = true;
            effects.push(Effect::Emit(AssistantEvent::VoiceInputStart));
            effects.push(Effect::ResetSource);
            effects.push(Effect::StartCooldown {
                slot: CooldownSlot::Hotword,
                duration: self.params.hotword_cooldown,
            });
        }

        if self.matcher.matches_meme_trigger(text) {
            info!(text, "meme trigger matched");
            self.session.meme_loop_active = true;
            self.session.input_suppressed = true;
            effects.push(Effect::Emit(AssistantEvent::MemeHotword));
            effects.push(Effect::ResetSource);
            effects.push(Effect::FetchMeme);
            effects.push(Effect::PlayAcknowledgment);
            effects.push(Effect::StartCooldown {
                slot: CooldownSlot::Meme,
                duration: self.params.meme_cooldown,
            });
        }

        if self.session.meme_loop_active && self.matcher.matches_continuation(text) {
            debug!(text, "meme continuation matched");
            self.session.input_suppressed = true;
            effects.push(Effect::FetchMeme);
            effects.push(Effect::StartCooldown {
                slot: CooldownSlot::Meme,
                duration: self.params.continuation_cooldown,
            });
        }

        if self.session.meme_loop_active && self.matcher.matches_stop(text) {
            info!("meme loop stopped");
            self.session.meme_loop_active = false;
            effects.push(Effect::Emit(AssistantEvent::MemeStop));
            effects.push(Effect::ResetSource);
        }
    }

    /// Question capture while `AwaitingQuestion`
    fn capture_question(&mut self, text: &str, is_final: bool, effects: &mut Vec<Effect>) {
        if self.session.mode != Mode::AwaitingQuestion || self.session.input_suppressed {
            return;
        }

        // A short stop utterance abandons capture even mid-utterance.
        if self.matcher.matches_stop(text)
            && text.chars().count() <= self.params.stop_partial_max_chars
        {
            info!("capture aborted by stop phrase");
            self.abandon_capture(effects);
            return;
        }

        let too_short = text.chars().count() < self.params.min_question_chars;
        let too_few_words = text.split_whitespace().count() < self.params.min_question_words;
        if too_short || too_few_words {
            trace!(text, "transcript filtered as noise");
            return;
        }

        let forced = !is_final && self.debounce.observe(text);
        if !is_final && !forced {
            return;
        }

        if self.matcher.matches_stop(text)
            && text.chars().count() <= self.params.stop_final_max_chars
        {
            info!("final transcript was a stop request");
            self.abandon_capture(effects);
            return;
        }

        if forced {
            debug!(text, "debounce forced finalize");
        }

        self.debounce.reset();
        self.generation += 1;
        info!(question = text, generation = self.generation, "question captured");

        effects.push(Effect::Emit(AssistantEvent::Question(text.to_string())));
        effects.push(Effect::Emit(AssistantEvent::GptStart));
        effects.push(Effect::ResetSource);
        effects.push(Effect::Ask {
            generation: self.generation,
            question: text.to_string(),
            continuation: self.session.continuation_token.clone(),
        });
        self.transition(Mode::AwaitingAnswer);
    }

    /// Stop-phrase barge-in, the only check that stays active while suppressed
    fn check_barge_in(&mut self, text: &str, effects: &mut Vec<Effect>) {
        let interruptible = self.session.input_suppressed
            || matches!(self.session.mode, Mode::AwaitingAnswer | Mode::Speaking);
        if !interruptible || !self.matcher.matches_stop(text) {
            return;
        }

        info!(mode = %self.session.mode, "barge-in stop");
        // Discard whatever the pipeline is still producing.
        self.generation += 1;
        self.session.input_suppressed = false;
        self.debounce.reset();
        self.transition(Mode::Listening);

        effects.push(Effect::CancelCooldown(CooldownSlot::Hotword));
        effects.push(Effect::CancelCooldown(CooldownSlot::Meme));
        effects.push(Effect::ResetSource);
        effects.push(Effect::Emit(AssistantEvent::Stop));
    }

    /// Feed back an asynchronous collaborator result
    pub fn on_signal(&mut self, signal: Signal) -> Vec<Effect> {
        let mut effects = Vec::new();

        match signal {
            Signal::AnswerReady {
                generation,
                text,
                continuation_token,
            } => {
                if generation != self.generation || self.session.mode != Mode::AwaitingAnswer {
                    trace!(generation, "stale answer dropped");
                    return effects;
                }
                self.session.continuation_token = Some(continuation_token);
                effects.push(Effect::Emit(AssistantEvent::Answer(text.clone())));
                effects.push(Effect::Synthesize { generation, text });
            }

            Signal::SynthesisReady { generation, audio } => {
                if generation != self.generation || self.session.mode != Mode::AwaitingAnswer {
                    trace!(generation, "stale synthesis dropped");
                    return effects;
                }
                self.session.input_suppressed = true;
                self.transition(Mode::Speaking);
                effects.push(Effect::Emit(AssistantEvent::Tts));
                effects.push(Effect::Play { generation, audio });
            }

            Signal::PlaybackFinished { generation } => {
                if generation != self.generation || self.session.mode != Mode::Speaking {
                    trace!(generation, "stale playback completion dropped");
                    return effects;
                }
                self.transition(Mode::Listening);
                effects.push(Effect::Emit(AssistantEvent::TtsEnd));
                // Post-speech grace period so the tail of our own audio
                // cannot re-trigger matching.
                effects.push(Effect::StartCooldown {
                    slot: CooldownSlot::Hotword,
                    duration: self.params.hotword_cooldown,
                });
            }

            Signal::PipelineFailed {
                generation,
                stage,
                message,
            } => {
                if generation != self.generation {
                    trace!(generation, "stale pipeline failure dropped");
                    return effects;
                }
                self.session.input_suppressed = false;
                self.transition(Mode::Listening);
                effects.push(Effect::Emit(AssistantEvent::Error(format!(
                    "{stage} failed: {message}"
                ))));
            }

            Signal::MemeFetched { url } => {
                effects.push(Effect::Emit(AssistantEvent::Meme(url)));
            }

            Signal::MemeFetchFailed { message } => {
                effects.push(Effect::Emit(AssistantEvent::Error(format!(
                    "meme fetch failed: {message}"
                ))));
            }

            Signal::CooldownExpired(slot) => {
                debug!(?slot, "cooldown expired, input re-enabled");
                self.session.input_suppressed = false;
            }
        }

        effects
    }

    fn abandon_capture(&mut self, effects: &mut Vec<Effect>) {
        self.debounce.reset();
        self.transition(Mode::Listening);
        effects.push(Effect::Emit(AssistantEvent::Stop));
        effects.push(Effect::ResetSource);
    }

    fn transition(&mut self, new_mode: Mode) {
        if self.session.mode != new_mode {
            info!(from = %self.session.mode, to = %new_mode, "mode transition");
            self.session.mode = new_mode;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcript::TranscriptEvent as T;

    fn machine() -> ConversationStateMachine {
        let mut config = Config::default();
        config.fill_language_defaults();
        ConversationStateMachine::new(&config)
    }

    fn emitted(effects: &[Effect]) -> Vec<&AssistantEvent> {
        effects
            .iter()
            .filter_map(|e| match e {
                Effect::Emit(event) => Some(event),
                _ => None,
            })
            .collect()
    }

    fn activate(m: &mut ConversationStateMachine) {
        m.on_transcript(&T::partial("hey felix"));
        m.on_signal(Signal::CooldownExpired(CooldownSlot::Hotword));
        assert_eq!(m.mode(), Mode::AwaitingQuestion);
        assert!(!m.input_suppressed());
    }

    /// Drive a captured question up to the `Ask` effect and return its generation
    fn capture(m: &mut ConversationStateMachine, question: &str) -> u64 {
        let effects = m.on_transcript(&T::final_(question));
        effects
            .iter()
            .find_map(|e| match e {
                Effect::Ask { generation, .. } => Some(*generation),
                _ => None,
            })
            .expect("question was not captured")
    }

    #[test]
    fn test_activation_enters_question_capture() {
        let mut m = machine();
        let effects = m.on_transcript(&T::partial("hey felix"));

        assert_eq!(emitted(&effects), vec![&AssistantEvent::VoiceInputStart]);
        assert_eq!(m.mode(), Mode::AwaitingQuestion);
        assert!(m.input_suppressed());
        assert!(effects.iter().any(|e| matches!(
            e,
            Effect::StartCooldown {
                slot: CooldownSlot::Hotword,
                ..
            }
        )));
    }

    #[test]
    fn test_noise_in_listening_is_ignored() {
        let mut m = machine();
        let effects = m.on_transcript(&T::final_("irgendwas anderes"));
        assert!(effects.is_empty());
        assert_eq!(m.mode(), Mode::Listening);
    }

    #[test]
    fn test_short_transcripts_never_become_questions() {
        let mut m = machine();
        activate(&mut m);

        // under 6 chars
        let effects = m.on_transcript(&T::final_("wievi"));
        assert!(emitted(&effects).is_empty());
        // under 3 words
        let effects = m.on_transcript(&T::final_("wetter morgen"));
        assert!(emitted(&effects).is_empty());
        assert_eq!(m.mode(), Mode::AwaitingQuestion);
    }

    #[test]
    fn test_full_question_answer_cycle() {
        let mut m = machine();
        activate(&mut m);

        let effects = m.on_transcript(&T::final_("was ist das wetter heute"));
        let events = emitted(&effects);
        assert_eq!(
            events,
            vec![
                &AssistantEvent::Question("was ist das wetter heute".to_string()),
                &AssistantEvent::GptStart,
            ]
        );
        assert_eq!(m.mode(), Mode::AwaitingAnswer);
        let generation = match effects.iter().find(|e| matches!(e, Effect::Ask { .. })) {
            Some(Effect::Ask {
                generation,
                continuation,
                ..
            }) => {
                assert!(continuation.is_none());
                *generation
            }
            other => panic!("expected Ask effect, got {other:?}"),
        };

        let effects = m.on_signal(Signal::AnswerReady {
            generation,
            text: "sonnig".to_string(),
            continuation_token: "resp_1".to_string(),
        });
        assert_eq!(
            emitted(&effects),
            vec![&AssistantEvent::Answer("sonnig".to_string())]
        );
        assert!(effects
            .iter()
            .any(|e| matches!(e, Effect::Synthesize { .. })));

        let effects = m.on_signal(Signal::SynthesisReady {
            generation,
            audio: AudioHandle::new("/tmp/a.mp3"),
        });
        assert_eq!(emitted(&effects), vec![&AssistantEvent::Tts]);
        assert_eq!(m.mode(), Mode::Speaking);
        assert!(m.input_suppressed());

        let effects = m.on_signal(Signal::PlaybackFinished { generation });
        assert_eq!(emitted(&effects), vec![&AssistantEvent::TtsEnd]);
        assert_eq!(m.mode(), Mode::Listening);

        m.on_signal(Signal::CooldownExpired(CooldownSlot::Hotword));
        assert!(!m.input_suppressed());
    }

    #[test]
    fn test_continuation_token_threaded_into_next_question() {
        let mut m = machine();
        activate(&mut m);
        let generation = capture(&mut m, "was ist das wetter heute");
        m.on_signal(Signal::AnswerReady {
            generation,
            text: "sonnig".to_string(),
            continuation_token: "resp_42".to_string(),
        });
        m.on_signal(Signal::SynthesisReady {
            generation,
            audio: AudioHandle::new("/tmp/a.mp3"),
        });
        m.on_signal(Signal::PlaybackFinished { generation });
        m.on_signal(Signal::CooldownExpired(CooldownSlot::Hotword));

        activate(&mut m);
        let effects = m.on_transcript(&T::final_("und wie wird es morgen"));
        match effects.iter().find(|e| matches!(e, Effect::Ask { .. })) {
            Some(Effect::Ask { continuation, .. }) => {
                assert_eq!(continuation.as_deref(), Some("resp_42"));
            }
            other => panic!("expected Ask effect, got {other:?}"),
        }
    }

    #[test]
    fn test_debounce_forces_finalize_on_sixth_identical_partial() {
        let mut m = machine();
        activate(&mut m);

        for _ in 0..5 {
            let effects = m.on_transcript(&T::partial("mach das licht an"));
            assert!(emitted(&effects).is_empty());
        }
        let effects = m.on_transcript(&T::partial("mach das licht an"));
        assert_eq!(
            emitted(&effects)[0],
            &AssistantEvent::Question("mach das licht an".to_string())
        );
        assert_eq!(m.mode(), Mode::AwaitingAnswer);
    }

    #[test]
    fn test_short_stop_utterance_abandons_capture() {
        let mut m = machine();
        activate(&mut m);

        let effects = m.on_transcript(&T::partial("stop"));
        assert_eq!(emitted(&effects), vec![&AssistantEvent::Stop]);
        assert_eq!(m.mode(), Mode::Listening);
    }

    #[test]
    fn test_long_stop_final_is_still_a_stop() {
        let mut m = machine();
        activate(&mut m);

        // 3 words, >= 6 chars, contains stop, <= 20 chars total
        let effects = m.on_transcript(&T::final_("bitte stop jetzt"));
        assert_eq!(emitted(&effects), vec![&AssistantEvent::Stop]);
        assert_eq!(m.mode(), Mode::Listening);
    }

    #[test]
    fn test_meme_trigger_enters_loop_and_continuation_refetches() {
        let mut m = machine();

        let effects = m.on_transcript(&T::final_("zeig mir ein listiges bild"));
        assert_eq!(emitted(&effects), vec![&AssistantEvent::MemeHotword]);
        assert!(m.meme_loop_active());
        assert!(m.input_suppressed());
        assert!(effects.iter().any(|e| matches!(e, Effect::FetchMeme)));
        assert!(effects
            .iter()
            .any(|e| matches!(e, Effect::PlayAcknowledgment)));

        let effects = m.on_signal(Signal::MemeFetched {
            url: "https://i.redd.it/meme1.jpg".to_string(),
        });
        assert_eq!(
            emitted(&effects),
            vec![&AssistantEvent::Meme("https://i.redd.it/meme1.jpg".to_string())]
        );

        m.on_signal(Signal::CooldownExpired(CooldownSlot::Meme));

        let effects = m.on_transcript(&T::final_("nochmal"));
        assert!(effects.iter().any(|e| matches!(e, Effect::FetchMeme)));
        // No second meme_hotword for a continuation.
        assert!(emitted(&effects).is_empty());
        assert!(m.meme_loop_active());
    }

    #[test]
    fn test_continuation_without_meme_loop_is_ignored() {
        let mut m = machine();
        let effects = m.on_transcript(&T::final_("nochmal"));
        assert!(!effects.iter().any(|e| matches!(e, Effect::FetchMeme)));
    }

    #[test]
    fn test_stop_leaves_meme_loop() {
        let mut m = machine();
        m.on_transcript(&T::final_("zeig mir ein listiges bild"));
        m.on_signal(Signal::CooldownExpired(CooldownSlot::Meme));

        let effects = m.on_transcript(&T::final_("stop"));
        assert_eq!(emitted(&effects), vec![&AssistantEvent::MemeStop]);
        assert!(!m.meme_loop_active());
    }

    #[test]
    fn test_suppressed_input_only_reacts_to_stop() {
        let mut m = machine();
        m.on_transcript(&T::partial("hey felix")); // suppressed now

        let effects = m.on_transcript(&T::partial("hey felix"));
        assert!(emitted(&effects).is_empty());
        let effects = m.on_transcript(&T::final_("listiges bild"));
        assert!(emitted(&effects).is_empty());
        assert!(!m.meme_loop_active());

        let effects = m.on_transcript(&T::partial("stop"));
        assert_eq!(emitted(&effects), vec![&AssistantEvent::Stop]);
        assert_eq!(m.mode(), Mode::Listening);
        assert!(!m.input_suppressed());
    }

    #[test]
    fn test_barge_in_during_speaking_discards_pipeline() {
        let mut m = machine();
        activate(&mut m);
        let generation = capture(&mut m, "was ist das wetter heute");
        m.on_signal(Signal::AnswerReady {
            generation,
            text: "sonnig".to_string(),
            continuation_token: "resp_1".to_string(),
        });
        m.on_signal(Signal::SynthesisReady {
            generation,
            audio: AudioHandle::new("/tmp/a.mp3"),
        });
        assert_eq!(m.mode(), Mode::Speaking);

        let effects = m.on_transcript(&T::partial("stop"));
        assert!(emitted(&effects).contains(&&AssistantEvent::Stop));
        assert_eq!(m.mode(), Mode::Listening);
        assert!(!m.input_suppressed());

        // The in-flight playback completion is now stale.
        let effects = m.on_signal(Signal::PlaybackFinished { generation });
        assert!(effects.is_empty());
    }

    #[test]
    fn test_barge_in_keeps_meme_loop() {
        let mut m = machine();
        m.on_transcript(&T::final_("zeig mir ein listiges bild"));
        assert!(m.input_suppressed());

        let effects = m.on_transcript(&T::final_("stop"));
        assert!(emitted(&effects).contains(&&AssistantEvent::Stop));
        assert!(m.meme_loop_active());
        assert_eq!(m.mode(), Mode::Listening);
    }

    #[test]
    fn test_answerer_failure_recovers_to_listening() {
        let mut m = machine();
        activate(&mut m);
        let generation = capture(&mut m, "was ist das wetter heute");
        assert_eq!(m.mode(), Mode::AwaitingAnswer);

        let effects = m.on_signal(Signal::PipelineFailed {
            generation,
            stage: PipelineStage::Answering,
            message: "connection refused".to_string(),
        });
        match emitted(&effects).as_slice() {
            [AssistantEvent::Error(message)] => {
                assert!(message.contains("answering"));
            }
            other => panic!("expected error event, got {other:?}"),
        }
        assert_eq!(m.mode(), Mode::Listening);
        assert!(!m.input_suppressed());
    }

    #[test]
    fn test_self_echo_never_matches() {
        let mut m = machine();
        activate(&mut m);
        // The echo phrase alone normalizes to nothing.
        let effects = m.on_transcript(&T::final_("wie kann ich helfen"));
        assert!(effects.is_empty());
        assert_eq!(m.mode(), Mode::AwaitingQuestion);
    }

    #[test]
    fn test_debug_transcripts_emit_raw_text() {
        let mut config = Config {
            debug_transcripts: true,
            ..Config::default()
        };
        config.fill_language_defaults();
        let mut m = ConversationStateMachine::new(&config);

        let effects = m.on_transcript(&T::partial("Rauschen"));
        assert_eq!(
            emitted(&effects),
            vec![&AssistantEvent::VoiceInputDebug {
                text: "Rauschen".to_string(),
                is_final: false
            }]
        );
    }
}
