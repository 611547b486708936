//! felix-daemon: background daemon for a voice-first desktop assistant
//!
//! The daemon ingests a transcript stream, runs the conversation state
//! machine (hotword activation, question capture, answer playback, meme
//! loop), and notifies the desktop shell of everything it does:
//! - explicit state machine with listening/question/answer/speaking modes
//! - cancelable cooldown windows so the assistant never hears itself
//! - collaborator backends for answering, synthesis, playback, memes
//! - IPC server for shell status queries and event subscriptions

mod config;
mod events;
mod ipc;
mod lifecycle;
mod services;
mod session;
mod transcript;

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::broadcast;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::events::{AssistantEvent, EventSink};
use crate::ipc::Server;
use crate::lifecycle::ShutdownSignal;
use crate::services::{CommandPlayback, GoogleSynthesizer, MemeApiProvider, OpenAiAnswerer};
use crate::session::{Engine, Mode};
use crate::transcript::StdinTranscriptSource;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!(version = env!("CARGO_PKG_VERSION"), "felix-daemon starting");

    // Load configuration
    let config = Config::load()?;
    config.ensure_dirs()?;
    info!(?config.socket_path, language = config.language.bcp47(), "configuration loaded");

    // Required backends; without them the core must not start.
    let openai_key = std::env::var("OPENAI_API_KEY").context("OPENAI_API_KEY is not set")?;
    let google_key =
        std::env::var("GOOGLE_TTS_API_KEY").context("GOOGLE_TTS_API_KEY is not set")?;

    // Event channel: state machine -> IPC server / status tracker
    let (event_tx, _) = broadcast::channel::<AssistantEvent>(64);
    let sink = EventSink::from_sender(event_tx.clone());

    let engine = Engine::new(
        &config,
        Box::new(StdinTranscriptSource::new()),
        Arc::new(OpenAiAnswerer::new(openai_key, &config)),
        Arc::new(GoogleSynthesizer::new(google_key, &config)),
        Arc::new(CommandPlayback::new(&config.player_command).context("invalid player command")?),
        Arc::new(MemeApiProvider::new()),
        sink.clone(),
    );

    // IPC server with event subscription
    let server = Server::new(&config.socket_path, event_tx)?;

    let shutdown = ShutdownSignal::new();
    let mut status_rx = sink.subscribe();
    let server_for_status = &server;

    info!("daemon initialized, entering main loop");

    tokio::select! {
        // Run the conversation engine (processes the transcript stream)
        _ = engine.run() => {
            info!("conversation engine exited");
        }

        // Run the IPC server (accepts shell connections)
        result = server.run() => {
            if let Err(e) = result {
                error!(?e, "IPC server error");
            }
        }

        // Mirror assistant events into the IPC status snapshot
        _ = async {
            let mut meme_loop = false;
            loop {
                match status_rx.recv().await {
                    Ok(event) => {
                        let (mode, suppressed) = match &event {
                            AssistantEvent::VoiceInputStart => (Mode::AwaitingQuestion, true),
                            AssistantEvent::GptStart => (Mode::AwaitingAnswer, false),
                            AssistantEvent::Tts => (Mode::Speaking, true),
                            AssistantEvent::TtsEnd
                            | AssistantEvent::Stop
                            | AssistantEvent::Error(_) => (Mode::Listening, false),
                            AssistantEvent::MemeHotword => {
                                meme_loop = true;
                                (Mode::Listening, true)
                            }
                            AssistantEvent::MemeStop => {
                                meme_loop = false;
                                (Mode::Listening, false)
                            }
                            _ => continue,
                        };
                        server_for_status.set_status(mode, meme_loop, suppressed).await;
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!(skipped = n, "status tracker lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        break;
                    }
                }
            }
        } => {
            info!("status tracker exited");
        }

        // Wait for shutdown signal
        result = shutdown.wait() => {
            if let Err(e) = result {
                error!(?e, "signal handler error");
            }
            info!("shutdown signal received");
        }
    }

    info!("shutting down...");
    server.shutdown().await;
    info!("felix-daemon stopped");

    Ok(())
}
