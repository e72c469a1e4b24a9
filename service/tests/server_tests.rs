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

//! Server lifecycle, admission and isolation tests over real sockets

use linegate_service::{
    AdmissionPolicy, CommandHandler, CommandServer, FnCommandHandler, ServerConfig, ServiceError,
    SessionState, TelnetCredentialsHandler, respond_utf8,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::{sleep, timeout};

const PROMPT: &[u8] = b"demo> ";

fn free_port() -> u16 {
    std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port()
}

fn local_config(max_sessions: usize) -> ServerConfig {
    ServerConfig::new(free_port(), max_sessions)
        .with_bind_host([127, 0, 0, 1].into())
        .with_shutdown_timeout(Duration::from_secs(2))
}

fn demo_handler() -> Arc<dyn CommandHandler> {
    Arc::new(
        FnCommandHandler::new("demo", "session:exit", |command: &[u8]| {
            if command == b"boom" {
                panic!("handler exploded");
            }
            respond_utf8("What did you say?", true)
        })
        .with_opener("Hello there\n"),
    )
}

async fn start_server(config: ServerConfig) -> (CommandServer, SocketAddr) {
    let server = CommandServer::builder(config)
        .with_command_handler(demo_handler())
        .build()
        .unwrap();
    let addr = server.start().await.unwrap();
    (server, addr)
}

/// Read until `needle` shows up in the stream
async fn read_until(stream: &mut TcpStream, needle: &[u8]) -> Vec<u8> {
    let mut received = Vec::new();
    let mut chunk = [0u8; 256];
    timeout(Duration::from_secs(5), async {
        while !received.windows(needle.len()).any(|w| w == needle) {
            let n = stream.read(&mut chunk).await.unwrap();
            assert!(n > 0, "stream closed before {:?}", String::from_utf8_lossy(needle));
            received.extend_from_slice(&chunk[..n]);
        }
    })
    .await
    .expect("timed out waiting for server output");
    received
}

/// Read until the server closes the connection, tolerating resets
async fn read_to_close(stream: &mut TcpStream) -> Vec<u8> {
    let mut received = Vec::new();
    let mut chunk = [0u8; 256];
    timeout(Duration::from_secs(5), async {
        loop {
            match stream.read(&mut chunk).await {
                Ok(0) | Err(_) => break,
                Ok(n) => received.extend_from_slice(&chunk[..n]),
            }
        }
    })
    .await
    .expect("server did not close the connection");
    received
}

async fn wait_for_session_count(server: &CommandServer, count: usize) {
    timeout(Duration::from_secs(5), async {
        while server.session_count() != count {
            sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("session count never settled");
}

#[tokio::test]
async fn test_command_round_trip() {
    let (server, addr) = start_server(local_config(2)).await;

    let mut client = TcpStream::connect(addr).await.unwrap();
    let greeting = read_until(&mut client, PROMPT).await;
    assert_eq!(greeting, b"Hello there\ndemo> ");

    client.write_all(b"anything\r\n").await.unwrap();
    let reply = read_until(&mut client, PROMPT).await;
    assert_eq!(reply, b"What did you say?\ndemo> ");

    client.write_all(b"session:exit\n").await.unwrap();
    assert!(read_to_close(&mut client).await.is_empty());

    wait_for_session_count(&server, 0).await;
    assert_eq!(server.metrics().snapshot().commands_handled, 1);

    server.stop(false).await.unwrap();
}

#[tokio::test]
async fn test_sessions_listing() {
    let (server, addr) = start_server(local_config(2)).await;

    let mut client = TcpStream::connect(addr).await.unwrap();
    read_until(&mut client, PROMPT).await;

    let sessions = server.sessions();
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0].id.to_string(), "sess-1");
    assert_eq!(sessions[0].state, SessionState::CommandLoop);
    assert_eq!(sessions[0].peer_addr, client.local_addr().unwrap());

    let snapshot = server.snapshot();
    assert!(snapshot.running);
    assert_eq!(snapshot.active_sessions, 1);
    assert_eq!(snapshot.bind_address, Some(addr));

    server.stop(true).await.unwrap();
}

#[tokio::test]
async fn test_forceful_stop_interrupts_blocked_read() {
    let (server, addr) = start_server(local_config(2)).await;

    let mut client = TcpStream::connect(addr).await.unwrap();
    read_until(&mut client, PROMPT).await;

    // The session is now parked on a line read that will never complete
    timeout(Duration::from_secs(1), server.stop(true))
        .await
        .expect("forceful stop blocked on the session")
        .unwrap();

    assert!(!server.is_running());
    assert_eq!(server.session_count(), 0);
    assert!(read_to_close(&mut client).await.is_empty());

    // A requested stop is a clean exit of the accept loop
    assert!(server.wait().await.is_ok());
    assert!(matches!(
        server.wait().await,
        Err(ServiceError::ServerNotRunning)
    ));
}

#[tokio::test]
async fn test_graceful_stop_lets_sessions_finish() {
    let (server, addr) = start_server(local_config(2)).await;

    let mut client = TcpStream::connect(addr).await.unwrap();
    read_until(&mut client, PROMPT).await;

    server.stop(false).await.unwrap();
    assert!(!server.is_running());

    // The listener is gone
    assert!(TcpStream::connect(addr).await.is_err());

    // The running session is not
    client.write_all(b"still there?\n").await.unwrap();
    let reply = read_until(&mut client, PROMPT).await;
    assert_eq!(reply, b"What did you say?\ndemo> ");

    client.write_all(b"session:exit\n").await.unwrap();
    timeout(Duration::from_secs(5), server.wait_for_sessions())
        .await
        .expect("sessions did not drain");
    assert_eq!(server.session_count(), 0);
}

#[tokio::test]
async fn test_reject_when_full() {
    let config = local_config(1).with_busy_message("busy\n");
    let (server, addr) = start_server(config).await;

    let mut first = TcpStream::connect(addr).await.unwrap();
    read_until(&mut first, PROMPT).await;

    let mut second = TcpStream::connect(addr).await.unwrap();
    assert_eq!(read_to_close(&mut second).await, b"busy\n");
    assert_eq!(server.metrics().rejected_connections(), 1);

    // The first session is unaffected
    first.write_all(b"hi\n").await.unwrap();
    read_until(&mut first, PROMPT).await;

    server.stop(true).await.unwrap();
}

#[tokio::test]
async fn test_queue_when_full() {
    let config = local_config(1).with_admission(AdmissionPolicy::Queue { max_pending: 1 });
    let (server, addr) = start_server(config).await;

    let mut first = TcpStream::connect(addr).await.unwrap();
    read_until(&mut first, PROMPT).await;

    let mut second = TcpStream::connect(addr).await.unwrap();
    let mut byte = [0u8; 1];
    assert!(
        timeout(Duration::from_millis(200), second.read(&mut byte))
            .await
            .is_err(),
        "queued connection was served while the slot was taken"
    );

    // Beyond max_pending the policy falls back to rejecting
    let mut third = TcpStream::connect(addr).await.unwrap();
    assert!(!read_to_close(&mut third).await.is_empty());

    first.write_all(b"session:exit\n").await.unwrap();
    let greeting = read_until(&mut second, PROMPT).await;
    assert_eq!(greeting, b"Hello there\ndemo> ");

    server.stop(true).await.unwrap();
}

#[tokio::test]
async fn test_handler_panic_is_isolated() {
    let (server, addr) = start_server(local_config(2)).await;

    let mut victim = TcpStream::connect(addr).await.unwrap();
    read_until(&mut victim, PROMPT).await;
    let mut bystander = TcpStream::connect(addr).await.unwrap();
    read_until(&mut bystander, PROMPT).await;

    victim.write_all(b"boom\n").await.unwrap();
    read_to_close(&mut victim).await;
    wait_for_session_count(&server, 1).await;
    assert_eq!(server.metrics().snapshot().failed_sessions, 1);

    bystander.write_all(b"anything\n").await.unwrap();
    let reply = read_until(&mut bystander, PROMPT).await;
    assert_eq!(reply, b"What did you say?\ndemo> ");

    // The freed slot is usable again
    let mut newcomer = TcpStream::connect(addr).await.unwrap();
    read_until(&mut newcomer, PROMPT).await;

    server.stop(true).await.unwrap();
}

#[tokio::test]
async fn test_secured_server() {
    let config = local_config(2);
    let security = Arc::new(TelnetCredentialsHandler::new("user", "pass", config.encoding));
    let server = CommandServer::builder(config)
        .with_command_handler(demo_handler())
        .with_security_handler(security)
        .build()
        .unwrap();
    let addr = server.start().await.unwrap();

    let mut client = TcpStream::connect(addr).await.unwrap();
    read_until(&mut client, b"user : ").await;
    client.write_all(b"user\r\n").await.unwrap();
    read_until(&mut client, &[0xff, 0xfb, 0x01]).await;
    client.write_all(b"\xff\xfd\x01pass\r\n\xff\xfe\x01").await.unwrap();
    let greeting = read_until(&mut client, PROMPT).await;
    assert!(greeting.ends_with(b"\nHello there\ndemo> "));

    let mut intruder = TcpStream::connect(addr).await.unwrap();
    intruder
        .write_all(b"user\n\xff\xfd\x01guess\n\xff\xfe\x01")
        .await
        .unwrap();
    let output = read_to_close(&mut intruder).await;
    assert!(output.ends_with(b"Authentication failed!\n"));
    assert_eq!(server.metrics().snapshot().denied_handshakes, 1);

    server.stop(true).await.unwrap();
}

#[tokio::test]
async fn test_bind_failure_surfaces_from_start() {
    let occupied = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = occupied.local_addr().unwrap().port();

    let server = CommandServer::builder(
        ServerConfig::new(port, 1).with_bind_host([127, 0, 0, 1].into()),
    )
    .with_command_handler(demo_handler())
    .build()
    .unwrap();

    let result = server.start().await;
    assert!(matches!(result, Err(ServiceError::Io(_))));
    assert!(!server.is_running());
}

#[tokio::test]
async fn test_restart_after_stop() {
    let (server, addr) = start_server(local_config(1)).await;
    server.stop(false).await.unwrap();

    let restarted = server.start().await.unwrap();
    assert_eq!(restarted.port(), addr.port());

    let mut client = TcpStream::connect(restarted).await.unwrap();
    read_until(&mut client, PROMPT).await;

    server.stop(true).await.unwrap();
}
