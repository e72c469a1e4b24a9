//
// Copyright 2017-2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! Command server implementation
//!
//! The [`CommandServer`] owns the listening socket and the accept loop. Every
//! admitted connection becomes a [`Session`] running on its own tracked task;
//! admission is bounded by a semaphore sized to `max_sessions`.

use crate::{
    AdmissionPolicy, CommandHandler, Result, SecurityHandler, ServerConfig, ServerMetrics,
    ServerSnapshot, ServiceError, Session, SessionId, SessionInfo, SessionState, encode_text,
};
use bytes::Bytes;
use dashmap::DashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, instrument, warn};

/// Upper bound for writing the busy message to a rejected connection
const REJECT_TIMEOUT: Duration = Duration::from_secs(1);

/// Collects the parts of a [`CommandServer`] and validates them
///
/// # Example
///
/// ```no_run
/// use linegate_service::{FnCommandHandler, ServerBuilder, ServerConfig, respond_utf8};
/// use std::sync::Arc;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let handler = FnCommandHandler::new("demo", "session:exit", |_: &[u8]| {
///         respond_utf8("What did you say?", true)
///     });
///
///     let server = ServerBuilder::new(ServerConfig::new(9876, 2))
///         .with_command_handler(Arc::new(handler))
///         .build()?;
///
///     server.start().await?;
///     tokio::signal::ctrl_c().await?;
///     server.stop(false).await?;
///     Ok(())
/// }
/// ```
#[derive(Default)]
pub struct ServerBuilder {
    config: ServerConfig,
    commands: Option<Arc<dyn CommandHandler>>,
    security: Option<Arc<dyn SecurityHandler>>,
}

impl ServerBuilder {
    /// Start building a server with the given configuration
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config,
            commands: None,
            security: None,
        }
    }

    /// Set the command handler shared by every session (required)
    pub fn with_command_handler(mut self, handler: Arc<dyn CommandHandler>) -> Self {
        self.commands = Some(handler);
        self
    }

    /// Gate every session behind the given security handler
    pub fn with_security_handler(mut self, handler: Arc<dyn SecurityHandler>) -> Self {
        self.security = Some(handler);
        self
    }

    /// Validate the configuration and create the server
    ///
    /// Nothing is bound yet; that happens in [`CommandServer::start`].
    pub fn build(self) -> Result<CommandServer> {
        self.config.validate().map_err(ServiceError::InvalidConfig)?;
        let commands = self.commands.ok_or(ServiceError::MissingCommandHandler)?;
        Ok(CommandServer::new(self.config, commands, self.security))
    }
}

impl std::fmt::Debug for ServerBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerBuilder")
            .field("config", &self.config)
            .field("has_command_handler", &self.commands.is_some())
            .field("has_security_handler", &self.security.is_some())
            .finish()
    }
}

/// Live session as seen from the server
struct SessionEntry {
    peer_addr: SocketAddr,
    state: Arc<AtomicU8>,
    created_at: Instant,
}

/// State shared between the server handle, the accept loop and session tasks
struct Shared {
    config: ServerConfig,
    commands: Arc<dyn CommandHandler>,
    security: Option<Arc<dyn SecurityHandler>>,
    metrics: Arc<ServerMetrics>,
    /// Live sessions (lock-free concurrent map)
    sessions: DashMap<SessionId, SessionEntry>,
    /// Next session ID (monotonically increasing)
    next_id: AtomicU64,
    /// One permit per session slot
    slots: Arc<Semaphore>,
    /// Connections waiting for a slot
    pending: AtomicUsize,
    tracker: TaskTracker,
    busy_message: Bytes,
}

impl Shared {
    fn admit(self: &Arc<Self>, stream: TcpStream, peer_addr: SocketAddr, cancel: &CancellationToken) {
        if let Ok(permit) = self.slots.clone().try_acquire_owned() {
            self.tracker
                .spawn(self.clone().run_session(stream, peer_addr, permit, cancel.clone()));
            return;
        }

        match self.config.admission {
            AdmissionPolicy::Queue { max_pending }
                if self.pending.load(Ordering::Acquire) < max_pending =>
            {
                self.pending.fetch_add(1, Ordering::AcqRel);
                debug!(%peer_addr, "All session slots taken, queueing connection");
                let shared = self.clone();
                let cancel = cancel.clone();
                self.tracker.spawn(async move {
                    let permit = tokio::select! {
                        _ = cancel.cancelled() => None,
                        permit = shared.slots.clone().acquire_owned() => permit.ok(),
                    };
                    shared.pending.fetch_sub(1, Ordering::AcqRel);
                    match permit {
                        Some(permit) => shared.run_session(stream, peer_addr, permit, cancel).await,
                        None => debug!(%peer_addr, "Dropping queued connection"),
                    }
                });
            }
            _ => self.reject(stream, peer_addr),
        }
    }

    fn reject(&self, stream: TcpStream, peer_addr: SocketAddr) {
        warn!(
            %peer_addr,
            max_sessions = self.config.max_sessions,
            "Session limit reached, rejecting connection"
        );
        self.metrics.connection_rejected();

        let message = self.busy_message.clone();
        self.tracker.spawn(async move {
            match timeout(REJECT_TIMEOUT, send_busy(stream, message)).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => debug!(%peer_addr, error = %e, "Failed to send busy message"),
                Err(_) => debug!(%peer_addr, "Timed out sending busy message"),
            }
        });
    }

    async fn run_session(
        self: Arc<Self>,
        stream: TcpStream,
        peer_addr: SocketAddr,
        _permit: OwnedSemaphorePermit,
        cancel: CancellationToken,
    ) {
        let id = SessionId::new(self.next_id.fetch_add(1, Ordering::Relaxed));
        let (reader, writer) = stream.into_split();

        let mut session = Session::new(id, reader, writer, self.commands.clone())
            .with_line_limit(self.config.line_limit)
            .with_metrics(self.metrics.clone());
        if let Some(security) = &self.security {
            session = session.with_security_handler(security.clone());
        }

        let _guard = SessionGuard::register(&self, id, peer_addr, session.state_handle());
        info!(session_id = %id, %peer_addr, "Session started");

        let outcome = session.run(cancel).await;
        info!(session_id = %id, ?outcome, "Session ended");
    }
}

async fn send_busy(mut stream: TcpStream, message: Bytes) -> std::io::Result<()> {
    stream.write_all(&message).await?;
    stream.shutdown().await
}

/// Keeps a session in the registry for as long as its task is alive
///
/// Cleanup lives in `Drop` so a panicking command handler still releases the
/// registry entry and the metrics gauge.
struct SessionGuard {
    shared: Arc<Shared>,
    id: SessionId,
    created_at: Instant,
}

impl SessionGuard {
    fn register(
        shared: &Arc<Shared>,
        id: SessionId,
        peer_addr: SocketAddr,
        state: Arc<AtomicU8>,
    ) -> Self {
        let created_at = Instant::now();
        shared.sessions.insert(
            id,
            SessionEntry {
                peer_addr,
                state,
                created_at,
            },
        );
        shared.metrics.session_opened();
        Self {
            shared: shared.clone(),
            id,
            created_at,
        }
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        if std::thread::panicking() {
            error!(session_id = %self.id, "Session task panicked");
            self.shared.metrics.session_failed();
        }
        self.shared.sessions.remove(&self.id);
        self.shared.metrics.session_closed(self.created_at.elapsed());
    }
}

/// Per-start control handles
#[derive(Clone)]
struct Control {
    /// Stops the accept loop
    accept_cancel: CancellationToken,
    /// Aborts in-flight sessions on a forceful stop
    session_cancel: CancellationToken,
    /// Cancelled once the accept loop has exited, for any reason
    loop_done: CancellationToken,
    local_addr: SocketAddr,
}

/// Line-oriented TCP command server
///
/// Build one with [`ServerBuilder`]. The server can be started, stopped and
/// started again; sessions are numbered across restarts.
pub struct CommandServer {
    shared: Arc<Shared>,
    /// Running flag
    running: Arc<AtomicBool>,
    control: Mutex<Option<Control>>,
    /// Accept loop task handle
    accept_handle: tokio::sync::Mutex<Option<JoinHandle<Result<()>>>>,
}

impl CommandServer {
    fn new(
        config: ServerConfig,
        commands: Arc<dyn CommandHandler>,
        security: Option<Arc<dyn SecurityHandler>>,
    ) -> Self {
        let busy_message = encode_text(&config.busy_message, config.encoding);
        let slots = Arc::new(Semaphore::new(config.max_sessions));
        Self {
            shared: Arc::new(Shared {
                config,
                commands,
                security,
                metrics: Arc::new(ServerMetrics::new()),
                sessions: DashMap::new(),
                next_id: AtomicU64::new(1),
                slots,
                pending: AtomicUsize::new(0),
                tracker: TaskTracker::new(),
                busy_message,
            }),
            running: Arc::new(AtomicBool::new(false)),
            control: Mutex::new(None),
            accept_handle: tokio::sync::Mutex::new(None),
        }
    }

    /// Shortcut for [`ServerBuilder::new`]
    pub fn builder(config: ServerConfig) -> ServerBuilder {
        ServerBuilder::new(config)
    }

    fn control(&self) -> MutexGuard<'_, Option<Control>> {
        self.control.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Bind the listener and start accepting connections
    ///
    /// Returns once the socket is bound, with the actual local address. Bind
    /// failures are returned here rather than from the accept loop.
    pub async fn start(&self) -> Result<SocketAddr> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(ServiceError::ServerAlreadyRunning);
        }

        let bind_address = self.shared.config.bind_address();
        let (listener, local_addr) = match bind(bind_address).await {
            Ok(bound) => bound,
            Err(e) => {
                error!(%bind_address, error = %e, "Failed to bind command server");
                self.running.store(false, Ordering::SeqCst);
                return Err(e.into());
            }
        };
        info!(%local_addr, "Command server listening");

        // A control left behind by a failed accept loop still owns the
        // sessions admitted before the failure; keep their token.
        let session_cancel = self
            .control()
            .take()
            .map_or_else(CancellationToken::new, |stale| stale.session_cancel);
        let control = Control {
            accept_cancel: CancellationToken::new(),
            session_cancel,
            loop_done: CancellationToken::new(),
            local_addr,
        };
        self.shared.tracker.reopen();

        let handle = tokio::spawn(accept_loop(
            listener,
            self.shared.clone(),
            self.running.clone(),
            control.clone(),
        ));
        *self.control() = Some(control);
        *self.accept_handle.lock().await = Some(handle);

        Ok(local_addr)
    }

    /// Stop accepting connections
    ///
    /// A graceful stop (`forceful == false`) leaves in-flight sessions running;
    /// use [`wait_for_sessions`](Self::wait_for_sessions) to await them. A
    /// forceful stop cancels them and waits up to the configured shutdown
    /// timeout for their cleanup. Either way the accept loop has terminated
    /// when this returns.
    pub async fn stop(&self, forceful: bool) -> Result<()> {
        let Some(control) = self.control().take() else {
            return Err(ServiceError::ServerNotRunning);
        };
        self.running.store(false, Ordering::SeqCst);
        info!(forceful, "Stopping command server");

        control.accept_cancel.cancel();
        control.loop_done.cancelled().await;
        self.shared.tracker.close();

        if forceful {
            control.session_cancel.cancel();
            if timeout(self.shared.config.shutdown_timeout, self.shared.tracker.wait())
                .await
                .is_err()
            {
                warn!(
                    remaining = self.session_count(),
                    "Sessions still running after shutdown timeout"
                );
            }
        }

        info!("Command server stopped");
        Ok(())
    }

    /// Wait for the accept loop to exit and surface its fatal error, if any
    pub async fn wait(&self) -> Result<()> {
        let Some(handle) = self.accept_handle.lock().await.take() else {
            return Err(ServiceError::ServerNotRunning);
        };
        match handle.await {
            Ok(result) => result,
            Err(e) => Err(ServiceError::AcceptLoop(e.to_string())),
        }
    }

    /// Wait until every session task has finished
    ///
    /// Meant to follow a graceful [`stop`](Self::stop).
    pub async fn wait_for_sessions(&self) {
        self.shared.tracker.close();
        self.shared.tracker.wait().await;
    }

    /// Check if the server is accepting connections
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Get the bound address while the accept loop is alive
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.control()
            .as_ref()
            .filter(|control| !control.loop_done.is_cancelled())
            .map(|control| control.local_addr)
    }

    /// Get the number of live sessions
    pub fn session_count(&self) -> usize {
        self.shared.sessions.len()
    }

    /// List the live sessions, ordered by ID
    pub fn sessions(&self) -> Vec<SessionInfo> {
        let mut sessions: Vec<SessionInfo> = self
            .shared
            .sessions
            .iter()
            .map(|entry| SessionInfo {
                id: *entry.key(),
                peer_addr: entry.peer_addr,
                state: SessionState::from_u8(entry.state.load(Ordering::Acquire)),
                created_at: entry.created_at,
            })
            .collect();
        sessions.sort_by_key(|info| info.id);
        sessions
    }

    /// Get a snapshot of the server state
    pub fn snapshot(&self) -> ServerSnapshot {
        ServerSnapshot {
            running: self.is_running(),
            active_sessions: self.session_count(),
            total_sessions: self.shared.metrics.total_sessions(),
            rejected_connections: self.shared.metrics.rejected_connections(),
            bind_address: self.local_addr(),
        }
    }

    /// Get the server metrics
    pub fn metrics(&self) -> Arc<ServerMetrics> {
        self.shared.metrics.clone()
    }

    /// Get the server configuration
    pub fn config(&self) -> &ServerConfig {
        &self.shared.config
    }
}

async fn bind(address: SocketAddr) -> std::io::Result<(TcpListener, SocketAddr)> {
    let listener = TcpListener::bind(address).await?;
    let local_addr = listener.local_addr()?;
    Ok((listener, local_addr))
}

#[instrument(name = "accept_loop", skip_all, fields(local_addr = %control.local_addr))]
async fn accept_loop(
    listener: TcpListener,
    shared: Arc<Shared>,
    running: Arc<AtomicBool>,
    control: Control,
) -> Result<()> {
    let _done = control.loop_done.clone().drop_guard();

    loop {
        let (stream, peer_addr) = tokio::select! {
            biased;
            _ = control.accept_cancel.cancelled() => break,
            accepted = listener.accept() => match accepted {
                Ok(accepted) => accepted,
                Err(e) => {
                    error!(error = %e, "Accept failed, command server stopping");
                    running.store(false, Ordering::SeqCst);
                    return Err(ServiceError::AcceptLoop(e.to_string()));
                }
            },
        };
        debug!(%peer_addr, "Accepted connection");
        shared.admit(stream, peer_addr, &control.session_cancel);
    }

    // Close the socket before the done guard fires
    drop(listener);
    info!("Accept loop terminated");
    Ok(())
}

impl std::fmt::Debug for CommandServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandServer")
            .field("local_addr", &self.local_addr())
            .field("running", &self.is_running())
            .field("session_count", &self.session_count())
            .finish()
    }
}

impl Drop for CommandServer {
    fn drop(&mut self) {
        if let Some(control) = self.control().take() {
            if self.running.load(Ordering::SeqCst) {
                warn!("CommandServer dropped while still running");
            }
            self.running.store(false, Ordering::SeqCst);
            control.accept_cancel.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FnCommandHandler;

    fn handler() -> Arc<dyn CommandHandler> {
        Arc::new(FnCommandHandler::new("test", "quit", |_: &[u8]| None))
    }

    fn local_config() -> ServerConfig {
        ServerConfig::new(free_port(), 2).with_bind_host([127, 0, 0, 1].into())
    }

    fn free_port() -> u16 {
        std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port()
    }

    #[test]
    fn test_builder_requires_command_handler() {
        let result = ServerBuilder::new(ServerConfig::new(9876, 2)).build();
        assert!(matches!(result, Err(ServiceError::MissingCommandHandler)));
    }

    #[test]
    fn test_builder_validates_config() {
        let result = ServerBuilder::new(ServerConfig::new(0, 2))
            .with_command_handler(handler())
            .build();
        assert!(result.unwrap_err().is_config_error());

        let result = CommandServer::builder(ServerConfig::new(9876, 0))
            .with_command_handler(handler())
            .build();
        assert!(matches!(result, Err(ServiceError::InvalidConfig(_))));
    }

    #[tokio::test]
    async fn test_server_lifecycle() {
        let server = ServerBuilder::new(local_config())
            .with_command_handler(handler())
            .build()
            .unwrap();
        assert!(!server.is_running());
        assert_eq!(server.local_addr(), None);

        let addr = server.start().await.unwrap();
        assert!(server.is_running());
        assert_eq!(server.local_addr(), Some(addr));

        server.stop(false).await.unwrap();
        assert!(!server.is_running());
        assert!(server.wait().await.is_ok());
    }

    #[tokio::test]
    async fn test_server_double_start() {
        let server = ServerBuilder::new(local_config())
            .with_command_handler(handler())
            .build()
            .unwrap();
        server.start().await.unwrap();

        // Second start should fail
        let result = server.start().await;
        assert!(matches!(result, Err(ServiceError::ServerAlreadyRunning)));

        server.stop(true).await.unwrap();
    }

    #[tokio::test]
    async fn test_server_stop_when_not_running() {
        let server = ServerBuilder::new(local_config())
            .with_command_handler(handler())
            .build()
            .unwrap();
        assert!(matches!(
            server.stop(false).await,
            Err(ServiceError::ServerNotRunning)
        ));
    }

    #[tokio::test]
    async fn test_server_snapshot() {
        let server = ServerBuilder::new(local_config())
            .with_command_handler(handler())
            .build()
            .unwrap();
        let snapshot = server.snapshot();

        assert!(!snapshot.running);
        assert_eq!(snapshot.active_sessions, 0);
        assert_eq!(snapshot.total_sessions, 0);
        assert_eq!(snapshot.bind_address, None);
    }

    #[tokio::test]
    async fn test_restart_after_accept_failure_keeps_sessions_cancellable() {
        use tokio::io::AsyncReadExt;

        let server = ServerBuilder::new(local_config())
            .with_command_handler(handler())
            .build()
            .unwrap();
        let addr = server.start().await.unwrap();

        let mut client = TcpStream::connect(addr).await.unwrap();
        let mut prompt = [0u8; 6];
        client.read_exact(&mut prompt).await.unwrap();
        assert_eq!(&prompt, b"test> ");

        // Leave the server in the state a fatal accept error does: loop gone,
        // running flag cleared, control still in place
        let stale = server.control().clone().unwrap();
        stale.accept_cancel.cancel();
        stale.loop_done.cancelled().await;
        server.running.store(false, Ordering::SeqCst);
        assert_eq!(server.local_addr(), None);
        assert!(!server.snapshot().running);

        server.start().await.unwrap();
        assert_eq!(server.session_count(), 1);

        timeout(Duration::from_secs(1), server.stop(true))
            .await
            .expect("session admitted before the failure was not cancelled")
            .unwrap();
        assert_eq!(server.session_count(), 0);
        assert!(stale.session_cancel.is_cancelled());
    }

    #[tokio::test]
    async fn test_wait_surfaces_accept_loop_failure() {
        let server = ServerBuilder::new(local_config())
            .with_command_handler(handler())
            .build()
            .unwrap();
        assert!(matches!(
            server.wait().await,
            Err(ServiceError::ServerNotRunning)
        ));

        *server.accept_handle.lock().await = Some(tokio::spawn(async {
            Err(ServiceError::AcceptLoop("too many open files".to_string()))
        }));
        match server.wait().await {
            Err(ServiceError::AcceptLoop(message)) => assert_eq!(message, "too many open files"),
            other => panic!("expected accept loop failure, got {other:?}"),
        }
    }
}
