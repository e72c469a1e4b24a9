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

//! Server configuration

use encoding_rs::{Encoding, UTF_8};
use linegate_telnetcodec::DEFAULT_LINE_LIMIT;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

/// What to do with a connection accepted while every session slot is taken
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AdmissionPolicy {
    /// Send the busy message and close the connection right away
    #[default]
    Reject,
    /// Park up to `max_pending` connections until a slot frees up, reject the rest
    Queue {
        /// Maximum number of connections waiting for a slot
        max_pending: usize,
    },
}

/// Server configuration
///
/// This structure contains all configuration options for the command server.
/// Use the builder pattern methods to customize the configuration.
///
/// # Example
///
/// ```
/// use linegate_service::{AdmissionPolicy, ServerConfig};
/// use std::time::Duration;
///
/// let config = ServerConfig::new(9876, 4)
///     .with_encoding(encoding_rs::WINDOWS_1252)
///     .with_admission(AdmissionPolicy::Queue { max_pending: 8 })
///     .with_shutdown_timeout(Duration::from_secs(10));
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port to listen on, must be positive
    pub port: u16,

    /// Maximum number of sessions running at the same time
    pub max_sessions: usize,

    /// Interface to bind to
    pub bind_host: IpAddr,

    /// Text encoding for every string to byte conversion
    ///
    /// Only encodings in which `NUL`, `CR` and `LF` never occur inside a
    /// multi-byte sequence are safe for the line reader.
    pub encoding: &'static Encoding,

    /// Buffer size handed to the line reader, one more than the longest line
    pub line_limit: usize,

    /// Policy for connections arriving while all session slots are taken
    pub admission: AdmissionPolicy,

    /// How long a forceful stop waits for cancelled sessions to clean up
    pub shutdown_timeout: Duration,

    /// Text sent to a connection that is rejected by admission control
    pub busy_message: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 9876,
            max_sessions: 16,
            bind_host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            encoding: UTF_8,
            line_limit: DEFAULT_LINE_LIMIT,
            admission: AdmissionPolicy::Reject,
            shutdown_timeout: Duration::from_secs(5),
            busy_message: "Server busy, try again later.\n".to_string(),
        }
    }
}

impl ServerConfig {
    /// Create a new configuration for the given port and session limit
    ///
    /// All other settings will use their default values.
    pub fn new(port: u16, max_sessions: usize) -> Self {
        Self {
            port,
            max_sessions,
            ..Default::default()
        }
    }

    /// Set the interface to bind to
    pub fn with_bind_host(mut self, host: IpAddr) -> Self {
        self.bind_host = host;
        self
    }

    /// Set the text encoding
    pub fn with_encoding(mut self, encoding: &'static Encoding) -> Self {
        self.encoding = encoding;
        self
    }

    /// Set the line reader buffer size
    pub fn with_line_limit(mut self, limit: usize) -> Self {
        self.line_limit = limit;
        self
    }

    /// Set the admission policy
    pub fn with_admission(mut self, admission: AdmissionPolicy) -> Self {
        self.admission = admission;
        self
    }

    /// Set the shutdown timeout duration
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    /// Set the message sent to rejected connections
    pub fn with_busy_message(mut self, message: impl Into<String>) -> Self {
        self.busy_message = message.into();
        self
    }

    /// The socket address the server binds to
    pub fn bind_address(&self) -> SocketAddr {
        SocketAddr::new(self.bind_host, self.port)
    }

    /// Validate the configuration
    ///
    /// Returns an error if the configuration is invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.port == 0 {
            return Err("port must be greater than 0".to_string());
        }

        if self.max_sessions == 0 {
            return Err("max_sessions must be greater than 0".to_string());
        }

        if self.line_limit < 2 {
            return Err("line_limit must be at least 2".to_string());
        }

        if self.shutdown_timeout.is_zero() {
            return Err("shutdown_timeout must be greater than 0".to_string());
        }

        if let AdmissionPolicy::Queue { max_pending: 0 } = self.admission {
            return Err("max_pending must be greater than 0, use Reject instead".to_string());
        }

        Ok(())
    }
}
