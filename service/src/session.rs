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

//! Per-connection protocol state machine
//!
//! A [`Session`] owns one connection from the moment it is admitted until its
//! streams are shut down:
//!
//! ```text
//! INIT ──▶ HANDSHAKE ──▶ OPENER ──▶ COMMAND_LOOP ──▶ CLOSED
//!   │          │                        ▲   │
//!   │          └──▶ DENIED ──▶ CLOSED   └───┘ prompt / read / handle
//!   └─────────────────────▶ OPENER (no security handler)
//! ```
//!
//! Sessions are generic over their streams so the same code drives a TCP
//! socket in production and an in-memory duplex pipe in tests.

use crate::{
    CloseReason, CommandHandler, Result, SecurityHandler, ServerMetrics, SessionId,
    SessionOutcome, SessionState,
};
use bytes::{BufMut, Bytes, BytesMut};
use linegate_telnetcodec::{DEFAULT_LINE_LIMIT, read_line};
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// Suffix written after the application name to form the prompt
const PROMPT_SUFFIX: &[u8] = b"> ";

/// Upper bound for the best-effort stream shutdown on close
const CLOSE_TIMEOUT: Duration = Duration::from_secs(1);

/// One connection's full protocol lifecycle
pub struct Session<R, W> {
    /// Session ID
    id: SessionId,
    /// Buffered input stream
    reader: BufReader<R>,
    /// Output stream
    writer: W,
    /// Shared command handler
    commands: Arc<dyn CommandHandler>,
    /// Shared security handler, if the server gates sessions
    security: Option<Arc<dyn SecurityHandler>>,
    /// Buffer size for the line reader
    line_limit: usize,
    /// Current state (atomic for lock-free access)
    state: Arc<AtomicU8>,
    /// Metrics sink
    metrics: Arc<ServerMetrics>,
}

impl<R, W> Session<R, W>
where
    R: AsyncRead + Send + Unpin,
    W: AsyncWrite + Send + Unpin,
{
    /// Create a new session over the given streams
    pub fn new(id: SessionId, reader: R, writer: W, commands: Arc<dyn CommandHandler>) -> Self {
        Self {
            id,
            reader: BufReader::new(reader),
            writer,
            commands,
            security: None,
            line_limit: DEFAULT_LINE_LIMIT,
            state: Arc::new(AtomicU8::new(SessionState::Init.as_u8())),
            metrics: Arc::new(ServerMetrics::new()),
        }
    }

    /// Gate the session behind a security handshake
    pub fn with_security_handler(mut self, security: Arc<dyn SecurityHandler>) -> Self {
        self.security = Some(security);
        self
    }

    /// Set the line reader buffer size
    pub fn with_line_limit(mut self, limit: usize) -> Self {
        self.line_limit = limit;
        self
    }

    /// Record into the given metrics instead of a private one
    pub fn with_metrics(mut self, metrics: Arc<ServerMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Get the session ID
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Get the current state
    pub fn state(&self) -> SessionState {
        SessionState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Shared handle to the state, readable after the session moved into its task
    pub fn state_handle(&self) -> Arc<AtomicU8> {
        self.state.clone()
    }

    fn set_state(&self, state: SessionState) {
        debug!(%state, "Session state changed");
        self.state.store(state.as_u8(), Ordering::Release);
    }

    /// Drive the session until it closes
    ///
    /// Never returns an error: failures are logged and reported as
    /// [`SessionOutcome::Failed`]. The streams are shut down on every path,
    /// including cancellation.
    #[instrument(name = "session", skip_all, fields(session_id = %self.id))]
    pub async fn run(mut self, cancel: CancellationToken) -> SessionOutcome {
        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                info!("Session cancelled");
                SessionOutcome::Closed(CloseReason::Cancelled)
            }
            result = self.lifecycle() => match result {
                Ok(outcome) => outcome,
                Err(e) => {
                    warn!(error = %e, "Session aborted");
                    self.metrics.session_failed();
                    SessionOutcome::Failed(e)
                }
            },
        };

        self.close().await;
        outcome
    }

    async fn lifecycle(&mut self) -> Result<SessionOutcome> {
        if let Some(security) = self.security.clone() {
            self.set_state(SessionState::Handshake);
            let accepted = security
                .handshake(&mut self.reader, &mut self.writer)
                .await?;
            if !accepted {
                self.set_state(SessionState::Denied);
                self.metrics.handshake_denied();
                info!("Handshake denied");
                self.writer.write_all(&security.deny_message()).await?;
                self.writer.flush().await?;
                return Ok(SessionOutcome::Denied);
            }
            debug!("Handshake accepted");
        }

        self.set_state(SessionState::Opener);
        if let Some(opener) = self.commands.opener() {
            self.writer.write_all(&opener).await?;
        }

        self.set_state(SessionState::CommandLoop);
        let prompt = self.prompt();
        let escape = self.commands.escape_sequence();
        loop {
            self.writer.write_all(&prompt).await?;
            self.writer.flush().await?;

            let Some(line) = read_line(&mut self.reader, self.line_limit).await? else {
                info!("Peer disconnected");
                return Ok(SessionOutcome::Closed(CloseReason::PeerDisconnected));
            };
            if line == escape {
                info!("Escape sequence received");
                return Ok(SessionOutcome::Closed(CloseReason::EscapeSequence));
            }

            self.metrics.command_handled();
            if let Some(response) = self.commands.handle(&line).await {
                self.writer.write_all(&response).await?;
            }
        }
    }

    fn prompt(&self) -> Bytes {
        let name = self.commands.app_name();
        let mut prompt = BytesMut::with_capacity(name.len() + PROMPT_SUFFIX.len());
        prompt.put_slice(&name);
        prompt.put_slice(PROMPT_SUFFIX);
        prompt.freeze()
    }

    async fn close(&mut self) {
        match timeout(CLOSE_TIMEOUT, self.writer.shutdown()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => debug!(error = %e, "Failed to shut down output stream"),
            Err(_) => debug!("Timed out shutting down output stream"),
        }
        self.set_state(SessionState::Closed);
    }
}

impl<R, W> std::fmt::Debug for Session<R, W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field(
                "state",
                &SessionState::from_u8(self.state.load(Ordering::Acquire)),
            )
            .field("line_limit", &self.line_limit)
            .field("secured", &self.security.is_some())
            .finish()
    }
}
