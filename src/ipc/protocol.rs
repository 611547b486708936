//! IPC message protocol definitions
//!
//! All messages are JSON-encoded, prefixed with a 4-byte little-endian
//! length. After subscribing, a client additionally receives every
//! assistant event as a push message, in emission order.

use serde::{Deserialize, Serialize};

use crate::events::AssistantEvent;
use crate::session::Mode;

/// Requests from the desktop shell to the daemon
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Request {
    /// Ping to check connectivity
    Ping,

    /// Request current daemon status
    GetStatus,

    /// Subscribe to assistant event notifications
    Subscribe,
}

/// Responses and push notifications from the daemon
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    /// Pong response to ping
    Pong,

    /// Current daemon status
    Status(DaemonStatus),

    /// Subscription confirmed
    Subscribed,

    /// Pushed assistant event (subscribed clients only)
    Event(AssistantEvent),

    /// Error response
    Error { code: String, message: String },
}

/// Full daemon status snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonStatus {
    /// Daemon version
    pub version: String,

    /// Current conversation mode
    pub mode: Mode,

    /// Whether the meme loop is active
    pub meme_loop_active: bool,

    /// Whether input matching is currently suppressed
    pub input_suppressed: bool,

    /// Uptime in seconds
    pub uptime_secs: u64,
}

impl Default for DaemonStatus {
    fn default() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            mode: Mode::default(),
            meme_loop_active: false,
            input_suppressed: false,
            uptime_secs: 0,
        }
    }
}
