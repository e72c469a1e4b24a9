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

//! Command Server Example
//!
//! Two session slots, a greeting and a handler that answers every command
//! with the same question. Setting both `LINEGATE_USER` and
//! `LINEGATE_PASSWORD` puts the telnet username/password handshake in front
//! of every session.
//!
//! ## Usage
//!
//! ```bash
//! cargo run --example command_server -- 9876
//! ```
//!
//! Then connect with:
//! ```bash
//! telnet localhost 9876
//! ```
//!
//! Type `session:exit` to leave, press Ctrl+C on the server to stop it.

use linegate_service::{
    CommandServer, FnCommandHandler, ServerConfig, TelnetCredentialsHandler, respond_utf8,
};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let port = match std::env::args().nth(1) {
        Some(port) => port.parse()?,
        None => 9876,
    };
    let config = ServerConfig::new(port, 2);

    let handler = FnCommandHandler::new("linegate", "session:exit", |command: &[u8]| {
        tracing::info!(command = %String::from_utf8_lossy(command), "Command received");
        respond_utf8("What did you say?", true)
    })
    .with_opener("Hello there\n");

    let mut builder = CommandServer::builder(config.clone()).with_command_handler(Arc::new(handler));
    if let (Ok(user), Ok(password)) = (
        std::env::var("LINEGATE_USER"),
        std::env::var("LINEGATE_PASSWORD"),
    ) {
        tracing::info!(%user, "Sessions require a login");
        builder = builder.with_security_handler(Arc::new(TelnetCredentialsHandler::new(
            &user,
            &password,
            config.encoding,
        )));
    }

    let server = builder.build()?;
    let addr = server.start().await?;
    println!("Command server running on {addr}");
    println!("Press Ctrl+C to stop");

    tokio::select! {
        result = server.wait() => result?,
        signal = tokio::signal::ctrl_c() => {
            signal?;
            server.stop(false).await?;
            server.wait_for_sessions().await;
        }
    }

    Ok(())
}
