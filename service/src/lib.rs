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

//! Line-Oriented Command Server
//!
//! This crate provides an embeddable TCP command server: it accepts text
//! commands, one per line, and dispatches them to an application supplied
//! [`CommandHandler`], optionally gated by a [`SecurityHandler`] handshake.
//!
//! - One tokio task per session, bounded by `max_sessions`
//! - Explicit admission policy when every session slot is taken
//! - Graceful and forceful shutdown with guaranteed stream cleanup
//! - Lock-free metrics and a live session registry
//!
//! # Architecture
//!
//! ```text
//! CommandServer ── accept loop ── admission (semaphore)
//!     ↓
//! Session (one task per connection)
//!     ↓
//! SecurityHandler? → opener → prompt / read_line / CommandHandler
//! ```
//!
//! # Example
//!
//! ```no_run
//! use linegate_service::{CommandServer, FnCommandHandler, ServerConfig, respond_utf8};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let handler = FnCommandHandler::new("demo", "session:exit", |command: &[u8]| {
//!         respond_utf8(&String::from_utf8_lossy(command), true)
//!     })
//!     .with_opener("Hello there\n");
//!
//!     let server = CommandServer::builder(ServerConfig::new(9876, 2))
//!         .with_command_handler(Arc::new(handler))
//!         .build()?;
//!     server.start().await?;
//!     server.wait().await?;
//!     Ok(())
//! }
//! ```

mod config;
mod error;
mod handler;
mod metrics;
mod response;
mod security;
mod server;
mod session;
mod types;

pub use self::metrics::{MetricsSnapshot, ServerMetrics};
pub use config::{AdmissionPolicy, ServerConfig};
pub use error::{Result, ServiceError};
pub use handler::{
    CommandHandler, FnCommandHandler, HandshakeReader, HandshakeWriter, SecurityHandler,
};
pub use response::{encode_text, respond, respond_utf8};
pub use security::TelnetCredentialsHandler;
pub use server::{CommandServer, ServerBuilder};
pub use session::Session;
pub use types::{
    CloseReason, ServerSnapshot, SessionId, SessionInfo, SessionOutcome, SessionState,
};
