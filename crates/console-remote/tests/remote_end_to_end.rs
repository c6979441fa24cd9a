//! The remote client against a real host on loopback.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::{Duration, Instant};

use console_core::assert::CapturingAssert;
use console_core::output::{LogSink, OutputFrame};
use console_host::application::console_app::ConsoleApp;
use console_host::infrastructure::network::ConsoleServer;
use console_host::infrastructure::storage::config::NetworkConfig;
use console_remote::application::{ConnectionStatus, RemoteEvent};
use console_remote::infrastructure::network::{drive, RemoteClient, RemoteConfig};

const WAIT: Duration = Duration::from_secs(3);

fn start_host(identity: &str) -> (ConsoleApp, SocketAddr) {
    let config = NetworkConfig {
        bind_address: "127.0.0.1".into(),
        port: 0,
        ..NetworkConfig::default()
    };
    let server = ConsoleServer::start(&config, identity).expect("host starts");
    let addr = server.local_addr();
    let app = ConsoleApp::new(Box::new(LogSink), Box::new(CapturingAssert::new()))
        .with_transport(Box::new(server));
    (app, addr)
}

fn remote_for(host: SocketAddr) -> RemoteClient {
    let config = RemoteConfig {
        port: host.port(),
        broadcast: IpAddr::V4(Ipv4Addr::LOCALHOST),
        discover_timeout: Duration::from_millis(500),
        ..RemoteConfig::default()
    };
    RemoteClient::bind(SocketAddr::from(([127, 0, 0, 1], 0)), config).expect("client binds")
}

/// Connects `remote` to the host, ticking the host alongside.
async fn connect(app: &mut ConsoleApp, remote: &mut RemoteClient, host: SocketAddr) -> ConnectionStatus {
    remote.connect(host, Instant::now()).expect("connect sent");
    drive(remote, WAIT, |c, _| {
        app.update(0.01);
        c.status() != ConnectionStatus::Connecting
    })
    .await;
    remote.status()
}

#[tokio::test]
async fn test_discover_finds_host_identity_and_endpoint() {
    // Arrange
    let (mut app, host) = start_host("E2E Host");
    let mut remote = remote_for(host);

    // Act
    remote.discover(Instant::now()).expect("broadcast");
    let mut found = Vec::new();
    drive(&mut remote, WAIT, |_, events| {
        app.update(0.01);
        for event in events {
            if let RemoteEvent::ServerDiscovered(server) = event {
                found.push(server);
            }
        }
        !found.is_empty()
    })
    .await;

    // Assert
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].identity, "E2E Host");
    assert_eq!(found[0].endpoint, host);
}

#[tokio::test]
async fn test_command_output_reaches_remote() {
    // Arrange
    let (mut app, host) = start_host("E2E Host");
    let mut remote = remote_for(host);
    assert_eq!(connect(&mut app, &mut remote, host).await, ConnectionStatus::Connected);

    // Act
    remote
        .send_command("echo first && echo second", true, Instant::now())
        .expect("send");
    let mut frames = Vec::new();
    drive(&mut remote, WAIT, |c, events| {
        app.update(0.01);
        for event in events {
            if let RemoteEvent::Output(frame) = event {
                frames.push(frame);
            }
        }
        c.pending_commands() == 0 && frames.len() >= 3
    })
    .await;

    // Assert
    assert_eq!(
        frames,
        vec![
            OutputFrame::line("> echo first && echo second"),
            OutputFrame::line("first"),
            OutputFrame::line("second"),
        ]
    );
}

#[tokio::test]
async fn test_second_remote_is_refused_while_first_is_connected() {
    // Arrange
    let (mut app, host) = start_host("E2E Host");
    let mut first = remote_for(host);
    let mut second = remote_for(host);
    assert_eq!(connect(&mut app, &mut first, host).await, ConnectionStatus::Connected);

    // Act
    let status = connect(&mut app, &mut second, host).await;

    // Assert
    assert_eq!(status, ConnectionStatus::Disconnected);
    assert!(second.target().is_none());
}

#[tokio::test]
async fn test_disconnect_frees_the_host_for_another_remote() {
    // Arrange
    let (mut app, host) = start_host("E2E Host");
    let mut first = remote_for(host);
    let mut second = remote_for(host);
    connect(&mut app, &mut first, host).await;

    // Act
    first.disconnect(Instant::now());
    let status = connect(&mut app, &mut second, host).await;

    // Assert
    assert_eq!(status, ConnectionStatus::Connected);
}
