//! IPC module for daemon to desktop-shell communication

mod protocol;
mod server;

pub use protocol::{DaemonStatus, Request, Response};
pub use server::Server;
