//! Transcript text cleanup
//!
//! Recognizers prepend filler words and occasionally transcribe the
//! assistant's own voice. Normalization strips both so the phrase checks
//! downstream see stable text.

/// Pure, idempotent transcript cleanup
#[derive(Debug, Clone)]
pub struct TranscriptNormalizer {
    filler_prefixes: Vec<String>,
    self_echo_phrases: Vec<String>,
}

impl TranscriptNormalizer {
    /// Create a normalizer for the configured filler and self-echo strings
    ///
    /// Both lists are lowercased once here so `normalize` can compare
    /// directly against case-folded input.
    pub fn new(filler_prefixes: &[String], self_echo_phrases: &[String]) -> Self {
        Self {
            filler_prefixes: filler_prefixes.iter().map(|p| p.to_lowercase()).collect(),
            self_echo_phrases: self_echo_phrases
                .iter()
                .map(|p| p.to_lowercase())
                .collect(),
        }
    }

    /// Trim, case-fold, strip self-echo fragments and leading fillers
    ///
    /// Runs to a fixpoint, so `normalize(normalize(x)) == normalize(x)`.
    pub fn normalize(&self, raw: &str) -> String {
        let mut text = raw.trim().to_lowercase();

        loop {
            let before = text.clone();

            for phrase in &self.self_echo_phrases {
                if text.contains(phrase.as_str()) {
                    text = text.replace(phrase.as_str(), "");
                }
            }

            text = text.trim().to_string();

            for prefix in &self.filler_prefixes {
                if text == *prefix {
                    text.clear();
                } else if let Some(rest) = text.strip_prefix(&format!("{prefix} ")) {
                    text = rest.trim_start().to_string();
                }
            }

            if text == before {
                return text;
            }
        }
    }
}
