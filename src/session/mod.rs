//! Conversation session management
//!
//! The state machine is a pure transition core over one session record;
//! the engine wraps it with the async collaborators and cancelable
//! cooldown timers.

mod cooldown;
mod engine;
mod machine;

pub use cooldown::{CooldownSlot, CooldownTimers};
pub use engine::Engine;
pub use machine::{ConversationStateMachine, Effect, Mode, PipelineStage, Signal};
