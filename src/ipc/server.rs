//! Unix domain socket server for IPC
//!
//! Provides request-response communication with the desktop shell and
//! pushes assistant events to subscribed clients.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::unix::OwnedWriteHalf;
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::{broadcast, mpsc, RwLock};
use tracing::{debug, error, info, warn};

use crate::events::AssistantEvent;
use crate::session::Mode;

use super::protocol::{DaemonStatus, Request, Response};

/// Largest accepted request frame
const MAX_MESSAGE_BYTES: usize = 1024 * 1024;

/// IPC server handling shell connections
pub struct Server {
    socket_path: PathBuf,
    listener: Option<UnixListener>,
    state: Arc<RwLock<ServerState>>,
    event_tx: broadcast::Sender<AssistantEvent>,
    shutdown_tx: broadcast::Sender<()>,
}

/// Shared server state
struct ServerState {
    status: DaemonStatus,
    start_time: std::time::Instant,
}

impl Server {
    /// Create a new IPC server bound to `socket_path`
    ///
    /// Subscribed clients receive events from `event_tx` subscriptions.
    pub fn new(socket_path: &Path, event_tx: broadcast::Sender<AssistantEvent>) -> Result<Self> {
        if let Some(parent) = socket_path.parent() {
            std::fs::create_dir_all(parent).context("failed to create socket directory")?;
        }

        // Remove stale socket if it exists
        if socket_path.exists() {
            std::fs::remove_file(socket_path).context("failed to remove stale socket")?;
        }

        let listener = UnixListener::bind(socket_path).context("failed to bind Unix socket")?;

        // Owner-only socket (0600)
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(socket_path, std::fs::Permissions::from_mode(0o600))?;
        }

        let (shutdown_tx, _) = broadcast::channel(1);

        let state = Arc::new(RwLock::new(ServerState {
            status: DaemonStatus::default(),
            start_time: std::time::Instant::now(),
        }));

        info!(?socket_path, "IPC server listening");

        Ok(Self {
            socket_path: socket_path.to_owned(),
            listener: Some(listener),
            state,
            event_tx,
            shutdown_tx,
        })
    }

    /// Update the status snapshot served to `get_status` requests
    pub async fn set_status(&self, mode: Mode, meme_loop_active: bool, input_suppressed: bool) {
        let mut state = self.state.write().await;
        if state.status.mode != mode {
            debug!(from = %state.status.mode, to = %mode, "IPC status: mode updated");
        }
        state.status.mode = mode;
        state.status.meme_loop_active = meme_loop_active;
        state.status.input_suppressed = input_suppressed;
    }

    /// Run the server, accepting connections
    pub async fn run(&self) -> Result<()> {
        let listener = self.listener.as_ref().context("server not initialized")?;

        loop {
            match listener.accept().await {
                Ok((stream, _addr)) => {
                    debug!("client connected");
                    let state = Arc::clone(&self.state);
                    let event_tx = self.event_tx.clone();
                    let mut shutdown_rx = self.shutdown_tx.subscribe();

                    tokio::spawn(async move {
                        tokio::select! {
                            result = Self::handle_client(stream, state, event_tx) => {
                                if let Err(e) = result {
                                    warn!(?e, "client handler error");
                                }
                            }
                            _ = shutdown_rx.recv() => {
                                debug!("client handler shutting down");
                            }
                        }
                    });
                }
                Err(e) => {
                    error!(?e, "accept error");
                }
            }
        }
    }

    /// Handle a single client connection
    async fn handle_client(
        stream: UnixStream,
        state: Arc<RwLock<ServerState>>,
        event_tx: broadcast::Sender<AssistantEvent>,
    ) -> Result<()> {
        let (mut reader, writer) = stream.into_split();

        // All outgoing frames go through one writer task so pushed events
        // never interleave with responses.
        let (out_tx, out_rx) = mpsc::channel::<Response>(64);
        let writer_task = tokio::spawn(Self::write_loop(writer, out_rx));
        let mut is_subscribed = false;

        let mut len_buf = [0u8; 4];
        loop {
            match reader.read_exact(&mut len_buf).await {
                Ok(_) => {}
                Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                    debug!("client disconnected");
                    break;
                }
                Err(e) => {
                    writer_task.abort();
                    return Err(e.into());
                }
            }

            let len = u32::from_le_bytes(len_buf) as usize;
            if len > MAX_MESSAGE_BYTES {
                warn!(len, "message too large, disconnecting");
                break;
            }

            let mut msg_buf = vec![0u8; len];
            reader.read_exact(&mut msg_buf).await?;

            // A malformed request is logged and answered with an error,
            // never propagated as a crash or a disconnect.
            let request: Request = match serde_json::from_slice(&msg_buf) {
                Ok(request) => request,
                Err(e) => {
                    warn!(?e, "ignoring malformed request");
                    let _ = out_tx
                        .send(Response::Error {
                            code: "bad_request".to_string(),
                            message: e.to_string(),
                        })
                        .await;
                    continue;
                }
            };

            debug!(?request, "received request");

            let response = match request {
                Request::Ping => Response::Pong,

                Request::GetStatus => {
                    let state = state.read().await;
                    let mut status = state.status.clone();
                    status.uptime_secs = state.start_time.elapsed().as_secs();
                    Response::Status(status)
                }

                Request::Subscribe => {
                    if !is_subscribed {
                        is_subscribed = true;
                        tokio::spawn(Self::forward_events(
                            event_tx.subscribe(),
                            out_tx.clone(),
                        ));
                        debug!("client subscribed to events");
                    }
                    Response::Subscribed
                }
            };

            if out_tx.send(response).await.is_err() {
                break;
            }
        }

        writer_task.abort();
        Ok(())
    }

    /// Serialize and frame outgoing messages for one client
    async fn write_loop(mut writer: OwnedWriteHalf, mut out_rx: mpsc::Receiver<Response>) {
        while let Some(message) = out_rx.recv().await {
            if let Err(e) = Self::send_message(&mut writer, &message).await {
                debug!(?e, "client write failed");
                break;
            }
        }
    }

    /// Forward broadcast events to one subscribed client
    async fn forward_events(
        mut event_rx: broadcast::Receiver<AssistantEvent>,
        out_tx: mpsc::Sender<Response>,
    ) {
        loop {
            match event_rx.recv().await {
                Ok(event) => {
                    if out_tx.send(Response::Event(event)).await.is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!(skipped = n, "event subscriber lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    }

    /// Send a length-prefixed JSON message
    async fn send_message<T: serde::Serialize>(
        writer: &mut OwnedWriteHalf,
        msg: &T,
    ) -> Result<()> {
        let msg_bytes = serde_json::to_vec(msg)?;
        let msg_len = (msg_bytes.len() as u32).to_le_bytes();

        writer.write_all(&msg_len).await?;
        writer.write_all(&msg_bytes).await?;

        Ok(())
    }

    /// Gracefully shutdown the server
    pub async fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());

        if self.socket_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.socket_path) {
                warn!(?e, "failed to remove socket file");
            }
        }

        info!("IPC server shutdown complete");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn send_request(stream: &mut UnixStream, request: &Request) {
        let bytes = serde_json::to_vec(request).unwrap();
        stream
            .write_all(&(bytes.len() as u32).to_le_bytes())
            .await
            .unwrap();
        stream.write_all(&bytes).await.unwrap();
    }

    async fn read_response(stream: &mut UnixStream) -> Response {
        let mut len_buf = [0u8; 4];
        stream.read_exact(&mut len_buf).await.unwrap();
        let len = u32::from_le_bytes(len_buf) as usize;
        let mut buf = vec![0u8; len];
        stream.read_exact(&mut buf).await.unwrap();
        serde_json::from_slice(&buf).unwrap()
    }

    fn test_server(dir: &tempfile::TempDir) -> (Arc<Server>, broadcast::Sender<AssistantEvent>) {
        let (event_tx, _) = broadcast::channel(16);
        let socket = dir.path().join("test.sock");
        let server = Arc::new(Server::new(&socket, event_tx.clone()).unwrap());
        (server, event_tx)
    }

    #[tokio::test]
    async fn test_ping_pong() {
        let dir = tempfile::tempdir().unwrap();
        let (server, _event_tx) = test_server(&dir);
        let socket = server.socket_path.clone();

        let runner = Arc::clone(&server);
        tokio::spawn(async move {
            let _ = runner.run().await;
        });

        let mut client = UnixStream::connect(&socket).await.unwrap();
        send_request(&mut client, &Request::Ping).await;
        assert!(matches!(read_response(&mut client).await, Response::Pong));
    }

    #[tokio::test]
    async fn test_status_reflects_updates() {
        let dir = tempfile::tempdir().unwrap();
        let (server, _event_tx) = test_server(&dir);
        let socket = server.socket_path.clone();

        server.set_status(Mode::Speaking, true, true).await;
        let runner = Arc::clone(&server);
        tokio::spawn(async move {
            let _ = runner.run().await;
        });

        let mut client = UnixStream::connect(&socket).await.unwrap();
        send_request(&mut client, &Request::GetStatus).await;
        match read_response(&mut client).await {
            Response::Status(status) => {
                assert_eq!(status.mode, Mode::Speaking);
                assert!(status.meme_loop_active);
                assert!(status.input_suppressed);
            }
            other => panic!("expected status, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_subscribed_client_receives_events() {
        let dir = tempfile::tempdir().unwrap();
        let (server, event_tx) = test_server(&dir);
        let socket = server.socket_path.clone();

        let runner = Arc::clone(&server);
        tokio::spawn(async move {
            let _ = runner.run().await;
        });

        let mut client = UnixStream::connect(&socket).await.unwrap();
        send_request(&mut client, &Request::Subscribe).await;
        assert!(matches!(
            read_response(&mut client).await,
            Response::Subscribed
        ));

        event_tx.send(AssistantEvent::GptStart).unwrap();
        match read_response(&mut client).await {
            Response::Event(event) => assert_eq!(event, AssistantEvent::GptStart),
            other => panic!("expected event push, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_malformed_request_gets_error_not_disconnect() {
        let dir = tempfile::tempdir().unwrap();
        let (server, _event_tx) = test_server(&dir);
        let socket = server.socket_path.clone();

        let runner = Arc::clone(&server);
        tokio::spawn(async move {
            let _ = runner.run().await;
        });

        let mut client = UnixStream::connect(&socket).await.unwrap();
        let garbage = b"{not json";
        client
            .write_all(&(garbage.len() as u32).to_le_bytes())
            .await
            .unwrap();
        client.write_all(garbage).await.unwrap();

        assert!(matches!(
            read_response(&mut client).await,
            Response::Error { .. }
        ));

        // Connection is still usable.
        send_request(&mut client, &Request::Ping).await;
        assert!(matches!(read_response(&mut client).await, Response::Pong));
    }
}
