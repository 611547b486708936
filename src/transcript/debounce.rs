//! Repeated-partial debouncing
//!
//! Some recognizers stall on an unchanging partial result without ever
//! signaling end-of-speech. The tracker counts consecutive identical
//! partials and signals when the utterance should be finalized anyway.

/// Tracks repeated identical partial transcripts
#[derive(Debug, Clone)]
pub struct DebounceTracker {
    threshold: u32,
    last_seen: String,
    repeat_count: u32,
}

impl DebounceTracker {
    /// Create a tracker that fires once a partial repeats past `threshold`
    pub fn new(threshold: u32) -> Self {
        Self {
            threshold,
            last_seen: String::new(),
            repeat_count: 0,
        }
    }

    /// Observe a partial transcript; true means force-finalize now
    ///
    /// The counter resets whenever the text changes. With the default
    /// threshold of 5 the sixth consecutive identical observation fires.
    pub fn observe(&mut self, partial: &str) -> bool {
        if partial.is_empty() {
            return false;
        }

        if partial == self.last_seen {
            self.repeat_count += 1;
        } else {
            self.last_seen = partial.to_string();
            self.repeat_count = 1;
        }

        self.repeat_count > self.threshold
    }

    /// Forget the tracked partial, used when an utterance completes or aborts
    pub fn reset(&mut self) {
        self.last_seen.clear();
        self.repeat_count = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fires_on_exactly_the_sixth_observation() {
        let mut tracker = DebounceTracker::new(5);
        for i in 1..=5 {
            assert!(!tracker.observe("turn on the"), "fired early at {i}");
        }
        assert!(tracker.observe("turn on the"));
    }

    #[test]
    fn test_changed_text_resets_counter() {
        let mut tracker = DebounceTracker::new(5);
        for _ in 0..5 {
            tracker.observe("turn on");
        }
        assert!(!tracker.observe("turn on the"));
        for _ in 0..4 {
            assert!(!tracker.observe("turn on the"));
        }
        assert!(tracker.observe("turn on the"));
    }

    #[test]
    fn test_empty_partials_are_ignored() {
        let mut tracker = DebounceTracker::new(1);
        assert!(!tracker.observe(""));
        assert!(!tracker.observe(""));
        assert!(!tracker.observe("hello"));
        assert!(tracker.observe("hello"));
    }

    #[test]
    fn test_reset() {
        let mut tracker = DebounceTracker::new(2);
        tracker.observe("abc");
        tracker.observe("abc");
        tracker.reset();
        assert!(!tracker.observe("abc"));
        assert!(!tracker.observe("abc"));
        assert!(tracker.observe("abc"));
    }
}
