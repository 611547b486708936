//! Async driver around the conversation state machine
//!
//! Owns the collaborators and the cooldown timers, feeds transcript
//! events and collaborator results into the machine, and executes the
//! effects it returns. Transcript events are processed to completion one
//! at a time; collaborator calls run on spawned tasks and report back as
//! signals tagged with the pipeline generation that requested them.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::config::Config;
use crate::events::EventSink;
use crate::services::{
    AudioHandle, MemeProvider, PlaybackController, QuestionAnswerer, SpeechSynthesizer,
};
use crate::transcript::TranscriptSource;

use super::cooldown::{CooldownSlot, CooldownTimers};
use super::machine::{ConversationStateMachine, Effect, PipelineStage, Signal};

/// Capacity for the internal signal channels
const CHANNEL_CAPACITY: usize = 32;

/// Drives one conversation session for the process lifetime
pub struct Engine {
    machine: ConversationStateMachine,
    source: Box<dyn TranscriptSource>,
    answerer: Arc<dyn QuestionAnswerer>,
    synthesizer: Arc<dyn SpeechSynthesizer>,
    playback: Arc<dyn PlaybackController>,
    memes: Arc<dyn MemeProvider>,
    sink: EventSink,
    timers: CooldownTimers,
    signal_tx: mpsc::Sender<Signal>,
    signal_rx: mpsc::Receiver<Signal>,
    expiry_rx: mpsc::Receiver<(CooldownSlot, u64)>,
    ack_sound: Option<AudioHandle>,
}

impl Engine {
    pub fn new(
        config: &Config,
        source: Box<dyn TranscriptSource>,
        answerer: Arc<dyn QuestionAnswerer>,
        synthesizer: Arc<dyn SpeechSynthesizer>,
        playback: Arc<dyn PlaybackController>,
        memes: Arc<dyn MemeProvider>,
        sink: EventSink,
    ) -> Self {
        let (signal_tx, signal_rx) = mpsc::channel(CHANNEL_CAPACITY);
        let (expiry_tx, expiry_rx) = mpsc::channel(CHANNEL_CAPACITY);

        Self {
            machine: ConversationStateMachine::new(config),
            source,
            answerer,
            synthesizer,
            playback,
            memes,
            sink,
            timers: CooldownTimers::new(expiry_tx),
            signal_tx,
            signal_rx,
            expiry_rx,
            ack_sound: config.meme_ack_sound.as_ref().map(AudioHandle::new),
        }
    }

    /// Run the session until the transcript stream ends
    pub async fn run(mut self) {
        info!("conversation engine started, listening");

        loop {
            tokio::select! {
                event = self.source.next_event() => {
                    let Some(event) = event else {
                        info!("transcript stream ended");
                        break;
                    };
                    let effects = self.machine.on_transcript(&event);
                    self.apply(effects);
                }

                Some(signal) = self.signal_rx.recv() => {
                    let effects = self.machine.on_signal(signal);
                    self.apply(effects);
                }

                Some((slot, generation)) = self.expiry_rx.recv() => {
                    if self.timers.is_current(slot, generation) {
                        let effects = self.machine.on_signal(Signal::CooldownExpired(slot));
                        self.apply(effects);
                    }
                }
            }
        }

        info!("conversation engine stopped");
    }

    fn apply(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::Emit(event) => self.sink.emit(event),

                Effect::ResetSource => self.source.reset(),

                Effect::Ask {
                    generation,
                    question,
                    continuation,
                } => {
                    let answerer = Arc::clone(&self.answerer);
                    let tx = self.signal_tx.clone();
                    tokio::spawn(async move {
                        let signal = match answerer.ask(&question, continuation.as_deref()).await
                        {
                            Ok(reply) => Signal::AnswerReady {
                                generation,
                                text: reply.text,
                                continuation_token: reply.continuation_token,
                            },
                            Err(e) => Signal::PipelineFailed {
                                generation,
                                stage: PipelineStage::Answering,
                                message: e.to_string(),
                            },
                        };
                        let _ = tx.send(signal).await;
                    });
                }

                Effect::Synthesize { generation, text } => {
                    let synthesizer = Arc::clone(&self.synthesizer);
                    let tx = self.signal_tx.clone();
                    tokio::spawn(async move {
                        let signal = match synthesizer.synthesize(&text).await {
                            Ok(audio) => Signal::SynthesisReady { generation, audio },
                            Err(e) => Signal::PipelineFailed {
                                generation,
                                stage: PipelineStage::Synthesis,
                                message: e.to_string(),
                            },
                        };
                        let _ = tx.send(signal).await;
                    });
                }

                Effect::Play { generation, audio } => {
                    let playback = Arc::clone(&self.playback);
                    let tx = self.signal_tx.clone();
                    tokio::spawn(async move {
                        let signal = match playback.play(&audio).await {
                            Ok(()) => Signal::PlaybackFinished { generation },
                            Err(e) => Signal::PipelineFailed {
                                generation,
                                stage: PipelineStage::Playback,
                                message: e.to_string(),
                            },
                        };
                        let _ = tx.send(signal).await;
                    });
                }

                Effect::FetchMeme => {
                    let memes = Arc::clone(&self.memes);
                    let tx = self.signal_tx.clone();
                    tokio::spawn(async move {
                        let signal = match memes.fetch_one().await {
                            Ok(url) => Signal::MemeFetched { url },
                            Err(e) => Signal::MemeFetchFailed {
                                message: e.to_string(),
                            },
                        };
                        let _ = tx.send(signal).await;
                    });
                }

                Effect::PlayAcknowledgment => {
                    let Some(audio) = self.ack_sound.clone() else {
                        continue;
                    };
                    let playback = Arc::clone(&self.playback);
                    tokio::spawn(async move {
                        if let Err(e) = playback.play(&audio).await {
                            warn!(?e, "acknowledgment playback failed");
                        }
                    });
                }

                Effect::StartCooldown { slot, duration } => {
                    self.timers.schedule(slot, duration);
                }

                Effect::CancelCooldown(slot) => {
                    self.timers.cancel(slot);
                }
            }
        }
    }
}
