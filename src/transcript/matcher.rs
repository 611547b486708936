//! Phrase matching against configured trigger sets
//!
//! Matching is plain substring containment, not tokenized, to tolerate
//! recognizer noise around the phrases.

use crate::config::Config;

/// True if `text` contains any of the given phrases
pub fn matches_any(text: &str, phrases: &[String]) -> bool {
    phrases
        .iter()
        .any(|p| !p.is_empty() && text.contains(p.as_str()))
}

/// Stateless matcher for the four configured phrase sets
///
/// Check order per incoming event is fixed: activation, meme trigger,
/// continuation, stop. The checks are independent triggers; more than one
/// may fire for the same transcript.
#[derive(Debug, Clone)]
pub struct PhraseMatcher {
    activation: Vec<String>,
    meme_trigger: String,
    continuation: String,
    stop: String,
}

impl PhraseMatcher {
    /// Build the matcher from configuration
    ///
    /// Activation phrases combine each greeting prefix with the lowercased
    /// assistant name; the empty prefix yields the bare name.
    pub fn new(config: &Config) -> Self {
        let name = config.assistant_name.to_lowercase();
        let activation = config
            .activation_prefixes
            .iter()
            .map(|prefix| {
                if prefix.is_empty() {
                    name.clone()
                } else {
                    format!("{prefix} {name}")
                }
            })
            .collect();

        Self {
            activation,
            meme_trigger: config.meme_trigger.to_lowercase(),
            continuation: config.continuation_phrase.to_lowercase(),
            stop: config.stop_phrase.to_lowercase(),
        }
    }

    pub fn matches_activation(&self, text: &str) -> bool {
        matches_any(text, &self.activation)
    }

    pub fn matches_meme_trigger(&self, text: &str) -> bool {
        !self.meme_trigger.is_empty() && text.contains(self.meme_trigger.as_str())
    }

    pub fn matches_continuation(&self, text: &str) -> bool {
        !self.continuation.is_empty() && text.contains(self.continuation.as_str())
    }

    pub fn matches_stop(&self, text: &str) -> bool {
        text.contains(self.stop.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matcher() -> PhraseMatcher {
        let mut config = Config::default();
        config.fill_language_defaults();
        PhraseMatcher::new(&config)
    }

    #[test]
    fn test_activation_with_prefixes() {
        let m = matcher();
        assert!(m.matches_activation("hey felix"));
        assert!(m.matches_activation("hi felix wie spät ist es"));
        assert!(m.matches_activation("felix"));
        assert!(!m.matches_activation("hey fritz"));
    }

    #[test]
    fn test_activation_tolerates_surrounding_noise() {
        let m = matcher();
        assert!(m.matches_activation("ähm hey felix bitte"));
    }

    #[test]
    fn test_meme_trigger() {
        let m = matcher();
        assert!(m.matches_meme_trigger("zeig mir ein listiges bild"));
        assert!(!m.matches_meme_trigger("zeig mir ein bild"));
    }

    #[test]
    fn test_continuation_and_stop() {
        let m = matcher();
        assert!(m.matches_continuation("nochmal bitte"));
        assert!(m.matches_stop("stop"));
        assert!(m.matches_stop("bitte stoppen"));
        assert!(!m.matches_stop("weiter"));
    }

    #[test]
    fn test_matches_any_ignores_empty_phrases() {
        assert!(!matches_any("anything", &[String::new()]));
    }
}
