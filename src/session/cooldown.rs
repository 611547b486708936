//! Cancelable suppression windows
//!
//! Each slot holds at most one pending expiry. Scheduling replaces any
//! pending timer in the slot and bumps its generation, so an expiry that
//! was already in flight when it was superseded is recognizably stale.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::trace;

/// Independent timer slots; hotword and meme cooldowns never replace each other
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CooldownSlot {
    Hotword,
    Meme,
}

#[derive(Default)]
struct SlotState {
    generation: u64,
    handle: Option<JoinHandle<()>>,
}

/// Manager for the per-slot cooldown timers
pub struct CooldownTimers {
    expiry_tx: mpsc::Sender<(CooldownSlot, u64)>,
    hotword: SlotState,
    meme: SlotState,
}

impl CooldownTimers {
    /// Create the manager; expiries arrive as `(slot, generation)` messages
    pub fn new(expiry_tx: mpsc::Sender<(CooldownSlot, u64)>) -> Self {
        Self {
            expiry_tx,
            hotword: SlotState::default(),
            meme: SlotState::default(),
        }
    }

    fn slot_mut(&mut self, slot: CooldownSlot) -> &mut SlotState {
        match slot {
            CooldownSlot::Hotword => &mut self.hotword,
            CooldownSlot::Meme => &mut self.meme,
        }
    }

    fn slot(&self, slot: CooldownSlot) -> &SlotState {
        match slot {
            CooldownSlot::Hotword => &self.hotword,
            CooldownSlot::Meme => &self.meme,
        }
    }

    /// Arm the slot, canceling and replacing any pending expiry
    pub fn schedule(&mut self, slot: CooldownSlot, duration: Duration) {
        let tx = self.expiry_tx.clone();
        let state = self.slot_mut(slot);

        if let Some(handle) = state.handle.take() {
            handle.abort();
        }
        state.generation += 1;
        let generation = state.generation;

        trace!(?slot, ?duration, generation, "cooldown armed");
        state.handle = Some(tokio::spawn(async move {
            tokio::time::sleep(duration).await;
            let _ = tx.send((slot, generation)).await;
        }));
    }

    /// Cancel any pending expiry in the slot; idempotent
    pub fn cancel(&mut self, slot: CooldownSlot) {
        let state = self.slot_mut(slot);
        if let Some(handle) = state.handle.take() {
            handle.abort();
        }
        // Bump so an expiry already sent before the abort is stale.
        state.generation += 1;
    }

    /// True if a received expiry belongs to the currently armed timer
    pub fn is_current(&self, slot: CooldownSlot, generation: u64) -> bool {
        self.slot(slot).generation == generation
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_expiry_arrives_with_current_generation() {
        let (tx, mut rx) = mpsc::channel(4);
        let mut timers = CooldownTimers::new(tx);

        timers.schedule(CooldownSlot::Hotword, Duration::from_millis(5));
        let (slot, generation) = rx.recv().await.unwrap();
        assert_eq!(slot, CooldownSlot::Hotword);
        assert!(timers.is_current(slot, generation));
    }

    #[tokio::test]
    async fn test_reschedule_supersedes_pending_expiry() {
        let (tx, mut rx) = mpsc::channel(4);
        let mut timers = CooldownTimers::new(tx);

        timers.schedule(CooldownSlot::Meme, Duration::from_millis(50));
        timers.schedule(CooldownSlot::Meme, Duration::from_millis(5));

        let (slot, generation) = rx.recv().await.unwrap();
        assert_eq!(slot, CooldownSlot::Meme);
        assert!(timers.is_current(slot, generation));
        // The first timer was aborted, nothing further arrives.
        tokio::time::sleep(Duration::from_millis(80)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_cancel_is_idempotent_and_staleness_detected() {
        let (tx, mut rx) = mpsc::channel(4);
        let mut timers = CooldownTimers::new(tx);

        timers.schedule(CooldownSlot::Hotword, Duration::from_millis(1));
        // Give the timer time to fire, then cancel.
        tokio::time::sleep(Duration::from_millis(20)).await;
        timers.cancel(CooldownSlot::Hotword);
        timers.cancel(CooldownSlot::Hotword);

        if let Ok((slot, generation)) = rx.try_recv() {
            assert!(!timers.is_current(slot, generation));
        }
    }

    #[tokio::test]
    async fn test_slots_are_independent() {
        let (tx, mut rx) = mpsc::channel(4);
        let mut timers = CooldownTimers::new(tx);

        timers.schedule(CooldownSlot::Hotword, Duration::from_millis(5));
        timers.schedule(CooldownSlot::Meme, Duration::from_millis(5));

        let mut seen = Vec::new();
        seen.push(rx.recv().await.unwrap().0);
        seen.push(rx.recv().await.unwrap().0);
        assert!(seen.contains(&CooldownSlot::Hotword));
        assert!(seen.contains(&CooldownSlot::Meme));
    }
}
