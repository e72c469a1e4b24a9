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

//! Error types for the Linegate command server

use thiserror::Error;

/// Result type for operations
pub type Result<T> = std::result::Result<T, ServiceError>;

/// Command server error types
#[derive(Debug, Error)]
pub enum ServiceError {
    /// I/O error from the underlying TCP stream
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Error from the telnet codec or line reader
    #[error("Codec error: {0}")]
    Codec(#[from] linegate_telnetcodec::CodecError),

    /// The server configuration failed validation
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The server was built without a command handler
    #[error("Command handler is required")]
    MissingCommandHandler,

    /// `start()` was called on a running server
    #[error("Server already running")]
    ServerAlreadyRunning,

    /// Server is not running
    #[error("Server not running")]
    ServerNotRunning,

    /// The accept loop terminated abnormally
    #[error("Accept loop failed: {0}")]
    AcceptLoop(String),

    /// Generic error with a message
    #[error("{0}")]
    Other(String),
}

impl ServiceError {
    /// Check if the error was raised while constructing the server
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            ServiceError::InvalidConfig(_) | ServiceError::MissingCommandHandler
        )
    }

    /// Check if the error is a connection error
    ///
    /// Connection errors end a single session and never the server.
    pub fn is_connection_error(&self) -> bool {
        match self {
            ServiceError::Io(_) => true,
            ServiceError::Codec(err) => err.is_io(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use linegate_telnetcodec::CodecError;

    #[test]
    fn test_error_is_config_error() {
        assert!(ServiceError::MissingCommandHandler.is_config_error());
        assert!(ServiceError::InvalidConfig("port".into()).is_config_error());
        assert!(!ServiceError::ServerNotRunning.is_config_error());
    }

    #[test]
    fn test_error_is_connection_error() {
        let io = std::io::Error::from(std::io::ErrorKind::BrokenPipe);
        assert!(ServiceError::Io(io).is_connection_error());

        let codec = CodecError::Io(std::io::ErrorKind::UnexpectedEof.into());
        assert!(ServiceError::Codec(codec).is_connection_error());

        let codec = CodecError::MissingCommand { index: 0 };
        assert!(!ServiceError::Codec(codec).is_connection_error());
        assert!(!ServiceError::ServerAlreadyRunning.is_connection_error());
    }

    #[test]
    fn test_error_display() {
        let err = ServiceError::InvalidConfig("port must be greater than 0".to_string());
        assert_eq!(
            err.to_string(),
            "Invalid configuration: port must be greater than 0"
        );
        assert_eq!(
            ServiceError::MissingCommandHandler.to_string(),
            "Command handler is required"
        );
    }
}
