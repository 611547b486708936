//! Speech synthesis via the Google Cloud Text-to-Speech REST API
//!
//! The synthesized MP3 is written into the sounds directory and handed
//! back as a playable file path.

use std::path::PathBuf;

use async_trait::async_trait;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use crate::config::Config;

use super::{AudioHandle, ServiceError, SpeechSynthesizer};

const DEFAULT_ENDPOINT: &str = "https://texttospeech.googleapis.com/v1/text:synthesize";
const ANSWER_FILE: &str = "gpt_answer.mp3";

#[derive(Serialize)]
struct SynthesizeRequest<'a> {
    input: Input<'a>,
    voice: Voice<'a>,
    #[serde(rename = "audioConfig")]
    audio_config: serde_json::Value,
}

#[derive(Serialize)]
struct Input<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct Voice<'a> {
    #[serde(rename = "languageCode")]
    language_code: &'a str,
    name: &'a str,
}

#[derive(Deserialize)]
struct SynthesizeResponse {
    #[serde(rename = "audioContent")]
    audio_content: String,
}

/// Synthesizer backend talking to Google Cloud Text-to-Speech
pub struct GoogleSynthesizer {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    language_code: String,
    voice: String,
    sounds_dir: PathBuf,
}

impl GoogleSynthesizer {
    pub fn new(api_key: String, config: &Config) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            api_key,
            language_code: config.language.bcp47().to_string(),
            voice: config.voice.clone(),
            sounds_dir: config.sounds_dir.clone(),
        }
    }
}

#[async_trait]
impl SpeechSynthesizer for GoogleSynthesizer {
    async fn synthesize(&self, text: &str) -> Result<AudioHandle, ServiceError> {
        let request = SynthesizeRequest {
            input: Input { text },
            voice: Voice {
                language_code: &self.language_code,
                name: &self.voice,
            },
            audio_config: json!({ "audioEncoding": "MP3" }),
        };

        debug!(chars = text.len(), voice = %self.voice, "synthesizing speech");

        let response: SynthesizeResponse = self
            .client
            .post(&self.endpoint)
            .query(&[("key", self.api_key.as_str())])
            .json(&request)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let audio = base64::engine::general_purpose::STANDARD
            .decode(response.audio_content.as_bytes())
            .map_err(|e| ServiceError::UnexpectedResponse(format!("invalid audio: {e}")))?;

        let path = self.sounds_dir.join(ANSWER_FILE);
        tokio::fs::write(&path, &audio).await?;

        Ok(AudioHandle::new(path))
    }
}
