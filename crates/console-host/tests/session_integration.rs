//! Loopback UDP tests: a real `ConsoleServer` inside a `ConsoleApp`, driven
//! by a raw socket playing the remote tool.

use std::net::{SocketAddr, UdpSocket};
use std::time::{Duration, Instant};

use console_core::assert::CapturingAssert;
use console_core::output::{LogSink, OutputFrame};
use console_core::protocol::{
    decode_message, encode_message, CommandMessage, ConsoleMessage, APP_IDENTIFIER,
};
use console_host::application::console_app::ConsoleApp;
use console_host::infrastructure::network::ConsoleServer;
use console_host::infrastructure::storage::config::NetworkConfig;

const IDENTITY: &str = "Loopback Host";

fn start_app() -> (ConsoleApp, SocketAddr) {
    let config = NetworkConfig {
        bind_address: "127.0.0.1".into(),
        port: 0,
        ..NetworkConfig::default()
    };
    let server = ConsoleServer::start(&config, IDENTITY).expect("server starts");
    let addr = server.local_addr();
    let app = ConsoleApp::new(Box::new(LogSink), Box::new(CapturingAssert::new()))
        .with_transport(Box::new(server));
    (app, addr)
}

fn client() -> UdpSocket {
    let socket = UdpSocket::bind("127.0.0.1:0").expect("client bind");
    socket
        .set_read_timeout(Some(Duration::from_millis(20)))
        .expect("timeout");
    socket
}

fn send(socket: &UdpSocket, to: SocketAddr, sequence: u64, message: ConsoleMessage) {
    let bytes = encode_message(&message, sequence).expect("encode");
    socket.send_to(&bytes, to).expect("send");
}

fn drain(socket: &UdpSocket, into: &mut Vec<ConsoleMessage>) {
    let mut buf = [0u8; 2048];
    while let Ok((len, _)) = socket.recv_from(&mut buf) {
        let mut datagram = &buf[..len];
        while let Ok((envelope, used)) = decode_message(datagram) {
            into.push(envelope.message);
            datagram = &datagram[used..];
            if datagram.is_empty() {
                break;
            }
        }
    }
}

/// Ticks the app and collects what `socket` receives until `done` holds or
/// two seconds pass.
fn tick_until(
    app: &mut Option<&mut ConsoleApp>,
    socket: &UdpSocket,
    done: impl Fn(&[ConsoleMessage]) -> bool,
) -> Vec<ConsoleMessage> {
    let deadline = Instant::now() + Duration::from_secs(2);
    let mut received = Vec::new();
    while Instant::now() < deadline {
        if let Some(app) = app.as_mut() {
            app.update(0.016);
        }
        drain(socket, &mut received);
        if done(&received) {
            break;
        }
    }
    received
}

fn connect(app: &mut ConsoleApp, socket: &UdpSocket, server: SocketAddr, name: &str) -> ConsoleMessage {
    send(
        socket,
        server,
        0,
        ConsoleMessage::Connect {
            client_name: name.into(),
        },
    );
    let received = tick_until(&mut Some(app), socket, |m| {
        m.iter().any(|m| matches!(m, ConsoleMessage::ConnectAck { .. }))
    });
    received
        .into_iter()
        .find(|m| matches!(m, ConsoleMessage::ConnectAck { .. }))
        .expect("connect ack")
}

#[test]
fn test_discovery_request_is_answered_with_identity_and_port() {
    // Arrange
    let (_app, server) = start_app();
    let socket = client();

    // Act
    send(
        &socket,
        server,
        0,
        ConsoleMessage::DiscoveryRequest {
            app_id: APP_IDENTIFIER.into(),
        },
    );
    let received = tick_until(&mut None, &socket, |m| !m.is_empty());

    // Assert
    assert_eq!(
        received,
        vec![ConsoleMessage::DiscoveryResponse {
            identity: IDENTITY.into(),
            port: server.port(),
        }]
    );
}

#[test]
fn test_discovery_for_another_application_is_ignored() {
    let (_app, server) = start_app();
    let socket = client();

    send(
        &socket,
        server,
        0,
        ConsoleMessage::DiscoveryRequest {
            app_id: "someone.else".into(),
        },
    );
    let deadline = Instant::now() + Duration::from_millis(300);
    let mut received = Vec::new();
    while Instant::now() < deadline {
        drain(&socket, &mut received);
    }

    assert!(received.is_empty());
}

#[test]
fn test_remote_command_output_returns_to_sender() {
    // Arrange
    let (mut app, server) = start_app();
    let socket = client();
    let ack = connect(&mut app, &socket, server, "tester");
    assert_eq!(
        ack,
        ConsoleMessage::ConnectAck {
            accepted: true,
            reason: String::new()
        }
    );

    // Act
    send(
        &socket,
        server,
        0,
        ConsoleMessage::Command(CommandMessage {
            line: "echo over the wire".into(),
            manual: false,
        }),
    );
    let received = tick_until(&mut Some(&mut app), &socket, |m| {
        m.contains(&ConsoleMessage::Ack { sequence: 0 })
            && m.iter().any(|m| matches!(m, ConsoleMessage::Output(_)))
    });

    // Assert
    assert!(received.contains(&ConsoleMessage::Ack { sequence: 0 }));
    assert!(received.contains(&ConsoleMessage::Output(OutputFrame::line("over the wire"))));
}

#[test]
fn test_retransmitted_command_runs_once() {
    // Arrange
    let (mut app, server) = start_app();
    let socket = client();
    connect(&mut app, &socket, server, "tester");
    let command = ConsoleMessage::Command(CommandMessage {
        line: "echo once".into(),
        manual: false,
    });

    // Act
    send(&socket, server, 0, command.clone());
    send(&socket, server, 0, command);
    let received = tick_until(&mut Some(&mut app), &socket, |m| {
        m.iter()
            .filter(|m| matches!(m, ConsoleMessage::Ack { sequence: 0 }))
            .count()
            == 2
    });

    // Assert
    let outputs = received
        .iter()
        .filter(|m| matches!(m, ConsoleMessage::Output(_)))
        .count();
    assert_eq!(outputs, 1, "duplicate is acked but not executed");
}

#[test]
fn test_second_client_is_told_busy() {
    // Arrange
    let (mut app, server) = start_app();
    let first = client();
    let second = client();
    connect(&mut app, &first, server, "first");

    // Act
    let ack = connect(&mut app, &second, server, "second");

    // Assert
    assert_eq!(
        ack,
        ConsoleMessage::ConnectAck {
            accepted: false,
            reason: "busy".into()
        }
    );
}

#[test]
fn test_ping_is_answered_with_pong() {
    let (mut app, server) = start_app();
    let socket = client();
    connect(&mut app, &socket, server, "tester");

    send(&socket, server, 1, ConsoleMessage::Ping(77));
    let received = tick_until(&mut Some(&mut app), &socket, |m| !m.is_empty());

    assert_eq!(received, vec![ConsoleMessage::Pong(77)]);
}

#[test]
fn test_shutdown_says_goodbye_to_the_session() {
    // Arrange
    let (mut app, server) = start_app();
    let socket = client();
    connect(&mut app, &socket, server, "tester");

    // Act
    app.shutdown();
    let received = tick_until(&mut None, &socket, |m| !m.is_empty());

    // Assert
    assert_eq!(
        received,
        vec![ConsoleMessage::Disconnect {
            reason: "goodbye".into()
        }]
    );
}
