//! Audio playback through an external player process
//!
//! The daemon does not touch audio hardware itself; it spawns the
//! configured player and treats child exit as the completion signal.

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use super::{AudioHandle, PlaybackController, ServiceError};

/// Playback controller shelling out to a configured player command
pub struct CommandPlayback {
    program: String,
    args: Vec<String>,
}

impl CommandPlayback {
    /// Create a playback controller from a command line like `mpv --no-video`
    ///
    /// The audio file path is appended as the final argument.
    pub fn new(command: &str) -> Result<Self, ServiceError> {
        let mut parts = command.split_whitespace().map(str::to_string);
        let program = parts
            .next()
            .ok_or_else(|| ServiceError::Playback("empty player command".to_string()))?;

        Ok(Self {
            program,
            args: parts.collect(),
        })
    }
}

#[async_trait]
impl PlaybackController for CommandPlayback {
    async fn play(&self, audio: &AudioHandle) -> Result<(), ServiceError> {
        debug!(player = %self.program, path = %audio.path.display(), "starting playback");

        let status = Command::new(&self.program)
            .args(&self.args)
            .arg(&audio.path)
            .status()
            .await?;

        if !status.success() {
            return Err(ServiceError::Playback(format!(
                "{} exited with {status}",
                self.program
            )));
        }

        Ok(())
    }
}
