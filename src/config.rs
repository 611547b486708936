//! Configuration loading and management
//!
//! Settings come from an optional JSON file (path via `FELIX_CONFIG`,
//! default `~/.config/felix/config.json`) merged over per-language
//! defaults. API keys are read from the environment only.

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Languages the assistant understands and answers in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    De,
    En,
}

impl Language {
    /// BCP-47 code used by the recognition and synthesis services
    pub fn bcp47(&self) -> &'static str {
        match self {
            Language::De => "de-DE",
            Language::En => "en-US",
        }
    }

    /// Default synthesis voice for the language
    pub fn default_voice(&self) -> &'static str {
        match self {
            Language::De => "de-DE-Neural2-B",
            Language::En => "en-US-Neural2-I",
        }
    }

    /// Phrase that continues the meme loop
    pub fn continuation_phrase(&self) -> &'static str {
        match self {
            Language::De => "nochmal",
            Language::En => "next",
        }
    }

    /// Leading filler words the recognizer tends to prepend
    pub fn filler_prefixes(&self) -> Vec<String> {
        let fillers: &[&str] = match self {
            Language::De => &["einen"],
            Language::En => &["a", "please", "the"],
        };
        fillers.iter().map(|f| (*f).to_string()).collect()
    }

    /// Fragments the assistant's own voice causes the recognizer to hallucinate
    pub fn self_echo_phrases(&self) -> Vec<String> {
        let phrases: &[&str] = match self {
            Language::De => &["wie kann ich helfen"],
            Language::En => &["how can i help"],
        };
        phrases.iter().map(|p| (*p).to_string()).collect()
    }

    /// Hint appended to every question, asking for a bounded answer length
    pub fn answer_length_hint(&self, word_limit: usize) -> String {
        match self {
            Language::De => format!("Antworte in unter {word_limit} Wörtern, wenn möglich."),
            Language::En => format!("Answer in less than {word_limit} words if possible."),
        }
    }
}

fn default_assistant_name() -> String {
    "Felix".to_string()
}

fn default_activation_prefixes() -> Vec<String> {
    ["hey", "he", "hi", "the", ""]
        .iter()
        .map(|p| (*p).to_string())
        .collect()
}

fn default_meme_trigger() -> String {
    "listiges bild".to_string()
}

fn default_stop_phrase() -> String {
    "stop".to_string()
}

fn default_min_question_chars() -> usize {
    6
}

fn default_min_question_words() -> usize {
    3
}

fn default_debounce_threshold() -> u32 {
    5
}

fn default_hotword_cooldown_ms() -> u64 {
    300
}

fn default_meme_cooldown_ms() -> u64 {
    5000
}

fn default_continuation_cooldown_ms() -> u64 {
    1000
}

fn default_stop_partial_max_chars() -> usize {
    10
}

fn default_stop_final_max_chars() -> usize {
    20
}

fn default_answer_word_limit() -> usize {
    30
}

fn default_player_command() -> String {
    "mpv --no-video".to_string()
}

/// Daemon configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct Config {
    /// Name the activation phrases are built from ("hey felix", ...)
    pub assistant_name: String,

    /// Language used for recognition, answers, and synthesis
    pub language: Language,

    /// Greeting prefixes combined with the assistant name; "" means the bare name
    pub activation_prefixes: Vec<String>,

    /// Phrase that enters the meme loop
    pub meme_trigger: String,

    /// Phrase that continues the meme loop; empty means language default
    pub continuation_phrase: String,

    /// Phrase that aborts capture, playback, and the meme loop
    pub stop_phrase: String,

    /// Leading fillers stripped during normalization; empty means language default
    pub filler_prefixes: Vec<String>,

    /// Self-echo fragments removed during normalization; empty means language default
    pub self_echo_phrases: Vec<String>,

    /// Minimum characters for a transcript to count as a question
    pub min_question_chars: usize,

    /// Minimum words for a transcript to count as a question
    pub min_question_words: usize,

    /// Identical partials tolerated before force-finalizing an utterance
    pub debounce_threshold: u32,

    /// Suppression window after an activation match and after playback
    pub hotword_cooldown_ms: u64,

    /// Suppression window after entering the meme loop
    pub meme_cooldown_ms: u64,

    /// Suppression window after a meme continuation
    pub continuation_cooldown_ms: u64,

    /// A partial containing the stop phrase aborts capture up to this length
    pub stop_partial_max_chars: usize,

    /// A final containing the stop phrase aborts capture up to this length
    pub stop_final_max_chars: usize,

    /// Word limit requested from the answering service
    pub answer_word_limit: usize,

    /// System message for the answering service; empty means a generated default
    pub system_message: String,

    /// Synthesis voice; empty means language default
    pub voice: String,

    /// Directory for synthesized and acknowledgment sounds
    pub sounds_dir: PathBuf,

    /// Command used to play audio files; the file path is appended
    pub player_command: String,

    /// Acknowledgment clip played when the meme loop is entered
    pub meme_ack_sound: Option<PathBuf>,

    /// Emit raw transcripts as `voice_input_debug` events
    pub debug_transcripts: bool,

    /// Path to the Unix domain socket for IPC
    pub socket_path: PathBuf,

    /// Directory for runtime data
    pub data_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs_data_dir();
        Self {
            assistant_name: default_assistant_name(),
            language: Language::default(),
            activation_prefixes: default_activation_prefixes(),
            meme_trigger: default_meme_trigger(),
            continuation_phrase: String::new(),
            stop_phrase: default_stop_phrase(),
            filler_prefixes: Vec::new(),
            self_echo_phrases: Vec::new(),
            min_question_chars: default_min_question_chars(),
            min_question_words: default_min_question_words(),
            debounce_threshold: default_debounce_threshold(),
            hotword_cooldown_ms: default_hotword_cooldown_ms(),
            meme_cooldown_ms: default_meme_cooldown_ms(),
            continuation_cooldown_ms: default_continuation_cooldown_ms(),
            stop_partial_max_chars: default_stop_partial_max_chars(),
            stop_final_max_chars: default_stop_final_max_chars(),
            answer_word_limit: default_answer_word_limit(),
            system_message: String::new(),
            voice: String::new(),
            sounds_dir: data_dir.join("sounds"),
            player_command: default_player_command(),
            meme_ack_sound: None,
            debug_transcripts: false,
            socket_path: data_dir.join("daemon.sock"),
            data_dir,
        }
    }
}

fn dirs_data_dir() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    PathBuf::from(home).join(".local").join("share").join("felix")
}

impl Config {
    /// Load configuration from the config file, falling back to defaults
    pub fn load() -> Result<Self> {
        let path = match std::env::var("FELIX_CONFIG") {
            Ok(p) => PathBuf::from(p),
            Err(_) => {
                let home = std::env::var("HOME").context("HOME is not set")?;
                PathBuf::from(home)
                    .join(".config")
                    .join("felix")
                    .join("config.json")
            }
        };

        let mut config = if path.exists() {
            let raw = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config file {}", path.display()))?;
            serde_json::from_str(&raw)
                .with_context(|| format!("failed to parse config file {}", path.display()))?
        } else {
            Self::default()
        };

        config.fill_language_defaults();
        Ok(config)
    }

    /// Fill fields left empty with per-language defaults
    pub fn fill_language_defaults(&mut self) {
        if self.continuation_phrase.is_empty() {
            self.continuation_phrase = self.language.continuation_phrase().to_string();
        }
        if self.filler_prefixes.is_empty() {
            self.filler_prefixes = self.language.filler_prefixes();
        }
        if self.self_echo_phrases.is_empty() {
            self.self_echo_phrases = self.language.self_echo_phrases();
        }
        if self.voice.is_empty() {
            self.voice = self.language.default_voice().to_string();
        }
        if self.system_message.is_empty() {
            self.system_message = format!(
                "You are a virtual voice assistant. Your name is {}. \
                 You give short concrete answers.",
                self.assistant_name
            );
        }
    }

    /// Ensure runtime directories exist
    pub fn ensure_dirs(&self) -> Result<()> {
        std::fs::create_dir_all(&self.data_dir)?;
        std::fs::create_dir_all(&self.sounds_dir)?;
        Ok(())
    }
}
