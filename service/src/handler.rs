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

//! Capability traits supplied by the embedding application
//!
//! A [`CommandHandler`] and an optional [`SecurityHandler`] are shared by every
//! session of a server and invoked from many tasks at once. The server never
//! locks around them and never mutates them; any interior state they keep is
//! theirs to synchronize.

use crate::Result;
use async_trait::async_trait;
use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncWrite};

/// Reader half handed to a [`SecurityHandler`]
pub type HandshakeReader<'a> = dyn AsyncRead + Send + Unpin + 'a;

/// Writer half handed to a [`SecurityHandler`]
pub type HandshakeWriter<'a> = dyn AsyncWrite + Send + Unpin + 'a;

/// Application side of a command session
///
/// # Example
///
/// ```no_run
/// use async_trait::async_trait;
/// use bytes::Bytes;
/// use linegate_service::CommandHandler;
///
/// struct Shouter;
///
/// #[async_trait]
/// impl CommandHandler for Shouter {
///     fn app_name(&self) -> Bytes {
///         Bytes::from_static(b"shout")
///     }
///
///     async fn handle(&self, command: &[u8]) -> Option<Bytes> {
///         let mut reply = command.to_ascii_uppercase();
///         reply.push(b'\n');
///         Some(reply.into())
///     }
///
///     fn escape_sequence(&self) -> Bytes {
///         Bytes::from_static(b"quit")
///     }
/// }
/// ```
#[async_trait]
pub trait CommandHandler: Send + Sync + 'static {
    /// Greeting written once before the first prompt, `None` for no greeting
    fn opener(&self) -> Option<Bytes> {
        None
    }

    /// Application name, written in front of every `"> "` prompt
    fn app_name(&self) -> Bytes;

    /// Handle one command line and optionally produce a response
    ///
    /// The response is written verbatim, so it should carry its own line
    /// terminator.
    async fn handle(&self, command: &[u8]) -> Option<Bytes>;

    /// Exact line that ends the session instead of being handled
    fn escape_sequence(&self) -> Bytes;
}

/// Pre-session authentication exchange
///
/// Implementations must consume and produce only the bytes that belong to
/// their own handshake, the command loop continues on the same streams.
#[async_trait]
pub trait SecurityHandler: Send + Sync + 'static {
    /// Run the handshake, returning `Ok(true)` when the peer may proceed
    ///
    /// A rejected peer is a normal outcome and reported as `Ok(false)`;
    /// errors are reserved for transport failures.
    async fn handshake(
        &self,
        input: &mut HandshakeReader<'_>,
        output: &mut HandshakeWriter<'_>,
    ) -> Result<bool>;

    /// Message written to the peer when the handshake fails
    fn deny_message(&self) -> Bytes;
}

/// Closure-backed command handler
///
/// This provides a way to implement a handler with a closure instead of
/// implementing the [`CommandHandler`] trait.
///
/// # Example
///
/// ```
/// use linegate_service::{FnCommandHandler, respond_utf8};
///
/// let handler = FnCommandHandler::new("demo", "session:exit", |_command: &[u8]| {
///     respond_utf8("What did you say?", true)
/// })
/// .with_opener("Hello there\n");
/// ```
pub struct FnCommandHandler<F> {
    app_name: Bytes,
    escape_sequence: Bytes,
    opener: Option<Bytes>,
    handle: F,
}

impl<F> FnCommandHandler<F>
where
    F: Fn(&[u8]) -> Option<Bytes> + Send + Sync + 'static,
{
    /// Create a handler with the given name, escape sequence and callback
    pub fn new(app_name: impl Into<Bytes>, escape_sequence: impl Into<Bytes>, handle: F) -> Self {
        Self {
            app_name: app_name.into(),
            escape_sequence: escape_sequence.into(),
            opener: None,
            handle,
        }
    }

    /// Set the greeting sent when a session starts
    pub fn with_opener(mut self, opener: impl Into<Bytes>) -> Self {
        self.opener = Some(opener.into());
        self
    }
}

#[async_trait]
impl<F> CommandHandler for FnCommandHandler<F>
where
    F: Fn(&[u8]) -> Option<Bytes> + Send + Sync + 'static,
{
    fn opener(&self) -> Option<Bytes> {
        self.opener.clone()
    }

    fn app_name(&self) -> Bytes {
        self.app_name.clone()
    }

    async fn handle(&self, command: &[u8]) -> Option<Bytes> {
        (self.handle)(command)
    }

    fn escape_sequence(&self) -> Bytes {
        self.escape_sequence.clone()
    }
}

impl<F> std::fmt::Debug for FnCommandHandler<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnCommandHandler")
            .field("app_name", &self.app_name)
            .field("escape_sequence", &self.escape_sequence)
            .field("opener", &self.opener)
            .finish_non_exhaustive()
    }
}
