//! External collaborator interfaces
//!
//! The state machine only knows these traits; concrete backends live in
//! the submodules and can be swapped without touching the core.

mod google_tts;
mod meme;
mod openai;
mod playback;

pub use google_tts::GoogleSynthesizer;
pub use meme::MemeApiProvider;
pub use openai::OpenAiAnswerer;
pub use playback::CommandPlayback;

use std::path::PathBuf;

use async_trait::async_trait;

/// Errors from collaborator calls
///
/// All of these are recoverable: the engine reports them as an `error`
/// event and returns the session to listening.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("playback failed: {0}")]
    Playback(String),
}

/// Reply from the answering service
#[derive(Debug, Clone)]
pub struct AnswerReply {
    /// Answer text to speak back
    pub text: String,
    /// Token threaded into the next request to preserve multi-turn context
    pub continuation_token: String,
}

/// Opaque handle to playable audio
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioHandle {
    pub path: PathBuf,
}

impl AudioHandle {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

/// Question-answering backend with multi-turn context
#[async_trait]
pub trait QuestionAnswerer: Send + Sync {
    async fn ask(
        &self,
        question: &str,
        continuation: Option<&str>,
    ) -> Result<AnswerReply, ServiceError>;
}

/// Text-to-speech backend
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn synthesize(&self, text: &str) -> Result<AudioHandle, ServiceError>;
}

/// Plays audio and resolves when playback completes
#[async_trait]
pub trait PlaybackController: Send + Sync {
    async fn play(&self, audio: &AudioHandle) -> Result<(), ServiceError>;
}

/// Fetches a meme URL for the meme loop
#[async_trait]
pub trait MemeProvider: Send + Sync {
    async fn fetch_one(&self) -> Result<String, ServiceError>;
}
