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

//! Core types for the Linegate command server

use crate::ServiceError;
use std::fmt;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

/// Unique identifier for a session (monotonically increasing, never reused)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(u64);

impl SessionId {
    /// Create a new session ID
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the underlying u64 value
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sess-{}", self.0)
    }
}

/// Protocol state of a session (stored as atomic u8 for lock-free reads)
///
/// ```text
/// Init -> Handshake (optional) -> Denied
///                              -> Opener -> CommandLoop -> Closed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SessionState {
    /// Session created, nothing exchanged yet
    Init = 0,
    /// Security handshake in progress
    Handshake = 1,
    /// Handshake rejected the peer
    Denied = 2,
    /// Writing the opener
    Opener = 3,
    /// Prompting for and dispatching commands
    CommandLoop = 4,
    /// Streams closed
    Closed = 5,
}

impl SessionState {
    /// Convert from u8 (for atomic operations)
    pub fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Init,
            1 => Self::Handshake,
            2 => Self::Denied,
            3 => Self::Opener,
            4 => Self::CommandLoop,
            _ => Self::Closed,
        }
    }

    /// Convert to u8 (for atomic operations)
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Check if the session reached a terminal state
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Denied | Self::Closed)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Init => write!(f, "init"),
            Self::Handshake => write!(f, "handshake"),
            Self::Denied => write!(f, "denied"),
            Self::Opener => write!(f, "opener"),
            Self::CommandLoop => write!(f, "command-loop"),
            Self::Closed => write!(f, "closed"),
        }
    }
}

/// Why a session left the command loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// The peer closed its side of the connection
    PeerDisconnected,
    /// The peer sent the escape sequence
    EscapeSequence,
    /// The server stopped forcefully
    Cancelled,
}

/// How a session ended
#[derive(Debug)]
pub enum SessionOutcome {
    /// The security handshake rejected the peer
    Denied,
    /// The session closed normally
    Closed(CloseReason),
    /// The session aborted on an error
    Failed(ServiceError),
}

impl SessionOutcome {
    /// Check if the session ended without an error
    pub fn is_clean(&self) -> bool {
        !matches!(self, SessionOutcome::Failed(_))
    }
}

/// Session information snapshot (for non-blocking queries)
#[derive(Debug, Clone)]
pub struct SessionInfo {
    /// Session ID
    pub id: SessionId,
    /// Peer address
    pub peer_addr: SocketAddr,
    /// Current state
    pub state: SessionState,
    /// When the connection was accepted
    pub created_at: Instant,
}

impl SessionInfo {
    /// Get the session duration
    pub fn duration(&self) -> Duration {
        self.created_at.elapsed()
    }
}

/// Server snapshot for non-blocking debug information
#[derive(Debug, Clone)]
pub struct ServerSnapshot {
    /// Whether the accept loop is running
    pub running: bool,
    /// Number of live sessions
    pub active_sessions: usize,
    /// Total sessions since server start
    pub total_sessions: u64,
    /// Connections turned away by admission control
    pub rejected_connections: u64,
    /// Server bind address, once started
    pub bind_address: Option<SocketAddr>,
}

impl fmt::Display for ServerSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let addr = self
            .bind_address
            .map_or_else(|| "unbound".to_string(), |addr| addr.to_string());
        write!(
            f,
            "CommandServer {{ running: {}, active: {}, total: {}, rejected: {}, addr: {} }}",
            self.running,
            self.active_sessions,
            self.total_sessions,
            self.rejected_connections,
            addr
        )
    }
}
