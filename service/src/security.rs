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

//! Username/password handshake over telnet
//!
//! The exchange, as seen on the wire:
//!
//! ```text
//! server: "user : "
//! client: <username> LF
//! server: "password : " IAC WILL ECHO
//! client: <3 octet reply, usually IAC DO ECHO>
//! client: <password> LF
//! server: IAC WONT ECHO
//! client: <3 octet reply, usually IAC DONT ECHO>
//! server: LF
//! ```
//!
//! The echo replies are consumed and logged but not validated.

use crate::handler::{HandshakeReader, HandshakeWriter};
use crate::response::encode_text;
use crate::{Result, SecurityHandler, ServiceError};
use async_trait::async_trait;
use bytes::Bytes;
use encoding_rs::Encoding;
use linegate_telnetcodec::{
    DEFAULT_LINE_LIMIT, WILL_ECHO, WONT_ECHO, consts, read_line, to_display_string,
};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::debug;

/// Length of the peer's answer to an echo toggle.
const ECHO_REPLY_LEN: usize = 3;

/// Security handler checking a single username/password pair
///
/// Both credentials are converted with the configured encoding once, at
/// construction, and compared octet by octet against what the peer types.
///
/// # Example
///
/// ```
/// use linegate_service::TelnetCredentialsHandler;
///
/// let security = TelnetCredentialsHandler::new("admin", "secret", encoding_rs::UTF_8);
/// ```
#[derive(Clone)]
pub struct TelnetCredentialsHandler {
    username: Bytes,
    password: Bytes,
    encoding: &'static Encoding,
    line_limit: usize,
}

impl TelnetCredentialsHandler {
    /// Create a handler accepting exactly `username` and `password`
    pub fn new(username: &str, password: &str, encoding: &'static Encoding) -> Self {
        Self {
            username: encode_text(username, encoding),
            password: encode_text(password, encoding),
            encoding,
            line_limit: DEFAULT_LINE_LIMIT,
        }
    }

    /// Set the line reader buffer size used for both credentials
    ///
    /// Independent of `ServerConfig::line_limit`, which only applies to
    /// command lines. Limits below 2 cannot hold a single octet and are
    /// rejected with [`ServiceError::InvalidConfig`].
    pub fn with_line_limit(mut self, limit: usize) -> Result<Self> {
        if limit < 2 {
            return Err(ServiceError::InvalidConfig(format!(
                "credential line_limit must be at least 2, got {limit}"
            )));
        }
        self.line_limit = limit;
        Ok(self)
    }

    /// Encoding used for prompts and credentials
    pub fn encoding(&self) -> &'static Encoding {
        self.encoding
    }

    async fn prompt(&self, output: &mut HandshakeWriter<'_>, text: &str) -> Result<()> {
        output.write_all(&encode_text(text, self.encoding)).await?;
        Ok(())
    }

    async fn read_echo_reply(input: &mut HandshakeReader<'_>) -> Result<()> {
        let mut reply = [0u8; ECHO_REPLY_LEN];
        input.read_exact(&mut reply).await?;
        debug!(reply = %to_display_string(&reply), "Client answered echo toggle");
        Ok(())
    }
}

#[async_trait]
impl SecurityHandler for TelnetCredentialsHandler {
    async fn handshake(
        &self,
        input: &mut HandshakeReader<'_>,
        output: &mut HandshakeWriter<'_>,
    ) -> Result<bool> {
        self.prompt(output, "user : ").await?;
        output.flush().await?;
        let Some(username) = read_line(input, self.line_limit).await? else {
            debug!("Peer closed the connection before sending a username");
            return Ok(false);
        };

        self.prompt(output, "password : ").await?;
        output.write_all(&WILL_ECHO).await?;
        output.flush().await?;
        Self::read_echo_reply(input).await?;
        let password = read_line(input, self.line_limit).await?;

        output.write_all(&WONT_ECHO).await?;
        output.flush().await?;
        Self::read_echo_reply(input).await?;
        output.write_all(&[consts::LF]).await?;
        output.flush().await?;

        let accepted = username == self.username && password.as_ref() == Some(&self.password);
        debug!(accepted, "Credentials checked");
        Ok(accepted)
    }

    fn deny_message(&self) -> Bytes {
        encode_text("Authentication failed!\n", self.encoding)
    }
}

impl std::fmt::Debug for TelnetCredentialsHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelnetCredentialsHandler")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("encoding", &self.encoding.name())
            .field("line_limit", &self.line_limit)
            .finish()
    }
}
