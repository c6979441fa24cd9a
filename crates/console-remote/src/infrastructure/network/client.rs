//! UDP client for the remote console.
//!
//! # How the pieces fit (for beginners)
//!
//! [`RemoteClient`] is driven by its owner calling [`RemoteClient::update`]
//! regularly (the CLI does it every 10 ms).  Nothing in the client blocks:
//!
//! - A background thread blocks in `recv_from` with a short read timeout,
//!   decodes each datagram and forwards it through a bounded channel.
//! - `update(now)` drains that channel, advances the connection state
//!   machine, retransmits unacknowledged commands, sends keep-alive pings and
//!   returns the [`RemoteEvent`]s that happened.
//!
//! Commands travel through a [`ReliableSender`]: each gets the next reliable
//! sequence number and is resent every `resend_interval` until the host acks
//! it.  If a command is still unacknowledged after `max_attempts` sends the
//! session is treated as lost.

use std::net::{IpAddr, Ipv4Addr, SocketAddr, UdpSocket};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use console_core::protocol::{
    decode_message, encode_message, CommandMessage, ConsoleMessage, Envelope, ProtocolError,
    ReliabilityConfig, ReliableSender, SequenceCounter, APP_IDENTIFIER, DEFAULT_PORT,
};
use thiserror::Error;
use tokio::sync::mpsc::{self, error::TryRecvError, error::TrySendError};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::application::{ConnectionStatus, RemoteEvent, ServerInfo, ServerList};

const READ_TIMEOUT: Duration = Duration::from_millis(100);
const INBOUND_CAPACITY: usize = 256;
const RECV_BUFFER_SIZE: usize = 65_535;

/// Errors that can occur in the remote client.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// The local UDP socket could not be bound.
    #[error("failed to bind client socket on {addr}: {source}")]
    BindFailed {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// The receive thread could not be started.
    #[error("failed to spawn receive thread: {0}")]
    Spawn(#[source] std::io::Error),

    /// Socket configuration or a send failed.
    #[error("socket error: {0}")]
    Io(#[from] std::io::Error),

    /// A message could not be encoded.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),
}

/// Settings for [`RemoteClient`].
#[derive(Debug, Clone)]
pub struct RemoteConfig {
    /// Port hosts listen on for discovery.
    pub port: u16,
    /// Address discovery requests are sent to.
    pub broadcast: IpAddr,
    /// Name announced in `Connect`.
    pub client_name: String,
    /// How long `Discovering` lasts before falling back to `Disconnected`.
    pub discover_timeout: Duration,
    /// How long to wait for `ConnectAck`.
    pub connect_timeout: Duration,
    /// Keep-alive period while connected.
    pub ping_interval: Duration,
    pub reliability: ReliabilityConfig,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        let short_id = Uuid::new_v4().simple().to_string();
        Self {
            port: DEFAULT_PORT,
            broadcast: IpAddr::V4(Ipv4Addr::BROADCAST),
            client_name: format!("devconsole-remote-{}", &short_id[..8]),
            discover_timeout: Duration::from_secs(1),
            connect_timeout: Duration::from_secs(3),
            ping_interval: Duration::from_secs(2),
            reliability: ReliabilityConfig::default(),
        }
    }
}

#[derive(Debug)]
struct Inbound {
    from: SocketAddr,
    envelope: Envelope,
}

/// Remote end of the developer console.
pub struct RemoteClient {
    config: RemoteConfig,
    socket: Arc<UdpSocket>,
    running: Arc<AtomicBool>,
    inbound: mpsc::Receiver<Inbound>,
    thread: Option<JoinHandle<()>>,

    status: ConnectionStatus,
    servers: ServerList,
    target: Option<SocketAddr>,
    status_since: Instant,
    commands: ReliableSender,
    sequence: SequenceCounter,
    last_ping: Option<Instant>,
    ping_sent: Option<(u64, Instant)>,
    latency: Option<Duration>,
    events: Vec<RemoteEvent>,
}

impl RemoteClient {
    /// Binds an ephemeral UDP port on all interfaces and starts receiving.
    ///
    /// # Errors
    ///
    /// See [`bind`](Self::bind).
    pub fn start(config: RemoteConfig) -> Result<Self, RemoteError> {
        Self::bind(SocketAddr::from(([0, 0, 0, 0], 0)), config)
    }

    /// Binds `local` and starts the receive thread.
    ///
    /// # Errors
    ///
    /// [`RemoteError::BindFailed`] if the address is unavailable,
    /// [`RemoteError::Spawn`] if the thread cannot start.
    pub fn bind(local: SocketAddr, config: RemoteConfig) -> Result<Self, RemoteError> {
        let socket = UdpSocket::bind(local).map_err(|source| RemoteError::BindFailed { addr: local, source })?;
        socket.set_broadcast(true)?;
        socket.set_read_timeout(Some(READ_TIMEOUT))?;
        let socket = Arc::new(socket);

        let running = Arc::new(AtomicBool::new(true));
        let (tx, rx) = mpsc::channel(INBOUND_CAPACITY);
        let thread_socket = Arc::clone(&socket);
        let thread_running = Arc::clone(&running);
        let thread = std::thread::Builder::new()
            .name("devconsole-remote-recv".to_string())
            .spawn(move || receive_loop(thread_socket, tx, thread_running))
            .map_err(RemoteError::Spawn)?;

        debug!("remote client bound to {}", socket.local_addr()?);
        Ok(Self {
            commands: ReliableSender::new(config.reliability),
            config,
            socket,
            running,
            inbound: rx,
            thread: Some(thread),
            status: ConnectionStatus::Disconnected,
            servers: ServerList::new(),
            target: None,
            status_since: Instant::now(),
            sequence: SequenceCounter::new(),
            last_ping: None,
            ping_sent: None,
            latency: None,
            events: Vec::new(),
        })
    }

    pub fn status(&self) -> ConnectionStatus {
        self.status
    }

    pub fn servers(&self) -> &ServerList {
        &self.servers
    }

    /// Host of the current (or attempted) session.
    pub fn target(&self) -> Option<SocketAddr> {
        self.target
    }

    /// Round-trip time of the last answered ping.
    pub fn latency(&self) -> Option<Duration> {
        self.latency
    }

    /// Commands sent but not yet acknowledged.
    pub fn pending_commands(&self) -> usize {
        self.commands.in_flight()
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    // ── Operations ────────────────────────────────────────────────────────────

    /// Clears the server list and broadcasts a discovery request.
    ///
    /// # Errors
    ///
    /// [`RemoteError::Io`] if the broadcast cannot be sent.
    pub fn discover(&mut self, now: Instant) -> Result<(), RemoteError> {
        self.servers.clear();
        let destination = SocketAddr::new(self.config.broadcast, self.config.port);
        let request = ConsoleMessage::DiscoveryRequest {
            app_id: APP_IDENTIFIER.to_string(),
        };
        self.send_unreliable(destination, &request)?;
        info!("discovering console hosts via {destination}");
        if self.status == ConnectionStatus::Disconnected {
            self.set_status(ConnectionStatus::Discovering, now);
        }
        Ok(())
    }

    /// Opens a session with `endpoint`.  An existing session is closed first.
    ///
    /// # Errors
    ///
    /// [`RemoteError::Io`] if the `Connect` cannot be sent.
    pub fn connect(&mut self, endpoint: SocketAddr, now: Instant) -> Result<(), RemoteError> {
        if self.target.is_some_and(|t| t != endpoint) {
            self.disconnect(now);
        }
        self.commands.reset();
        self.ping_sent = None;
        self.latency = None;
        self.target = Some(endpoint);

        let connect = ConsoleMessage::Connect {
            client_name: self.config.client_name.clone(),
        };
        if let Err(e) = self.send_unreliable(endpoint, &connect) {
            self.target = None;
            self.set_status(ConnectionStatus::Disconnected, now);
            return Err(e);
        }
        info!("connecting to {endpoint}");
        self.set_status(ConnectionStatus::Connecting, now);
        Ok(())
    }

    /// Connects to a server from the discovery list.
    ///
    /// # Errors
    ///
    /// See [`connect`](Self::connect).
    pub fn connect_to(&mut self, server: &ServerInfo, now: Instant) -> Result<(), RemoteError> {
        self.connect(server.endpoint, now)
    }

    /// Ends the session, telling the host when one is open.
    pub fn disconnect(&mut self, now: Instant) {
        if let Some(target) = self.target.take() {
            if matches!(self.status, ConnectionStatus::Connected | ConnectionStatus::Connecting) {
                let goodbye = ConsoleMessage::Disconnect {
                    reason: "goodbye".to_string(),
                };
                if let Err(e) = self.send_unreliable(target, &goodbye) {
                    debug!("goodbye to {target} not sent: {e}");
                }
                info!("disconnected from {target}");
            }
        }
        self.commands.reset();
        self.set_status(ConnectionStatus::Disconnected, now);
    }

    /// Submits a command line to the host.
    ///
    /// Returns the reliable sequence number, or `None` when nothing was sent
    /// because the line is blank or there is no session.
    ///
    /// # Errors
    ///
    /// [`RemoteError::Protocol`] if the line is too long to encode,
    /// [`RemoteError::Io`] if the first send fails.
    pub fn send_command(&mut self, line: &str, manual: bool, now: Instant) -> Result<Option<u64>, RemoteError> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }
        let Some(target) = self.target.filter(|_| self.status == ConnectionStatus::Connected) else {
            debug!("not connected; dropping command '{line}'");
            return Ok(None);
        };

        let message = ConsoleMessage::Command(CommandMessage {
            line: line.to_string(),
            manual,
        });
        let (sequence, bytes) = self.commands.send(&message, now)?;
        self.socket.send_to(&bytes, target)?;
        debug!("sent command {sequence} to {target}: {line}");
        Ok(Some(sequence))
    }

    /// Processes everything received since the last call and runs timers.
    pub fn update(&mut self, now: Instant) -> Vec<RemoteEvent> {
        loop {
            match self.inbound.try_recv() {
                Ok(Inbound { from, envelope }) => self.handle(from, envelope.message, now),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    warn!("receive thread has stopped");
                    break;
                }
            }
        }
        self.run_timers(now);
        std::mem::take(&mut self.events)
    }

    fn handle(&mut self, from: SocketAddr, message: ConsoleMessage, now: Instant) {
        if let ConsoleMessage::DiscoveryResponse { identity, port } = message {
            let server = ServerInfo {
                identity,
                endpoint: SocketAddr::new(from.ip(), port),
            };
            if self.servers.insert(server.clone()) {
                info!("discovered {server}");
                self.events.push(RemoteEvent::ServerDiscovered(server));
            }
            return;
        }

        if self.target != Some(from) {
            debug!("ignoring {:?} from {from}", message.message_type());
            return;
        }

        match message {
            ConsoleMessage::ConnectAck { accepted, reason } => {
                if self.status != ConnectionStatus::Connecting {
                    return;
                }
                if accepted {
                    info!("connected to {from}");
                    self.last_ping = Some(now);
                    self.set_status(ConnectionStatus::Connected, now);
                } else {
                    warn!("{from} refused the connection: {reason}");
                    self.target = None;
                    self.set_status(ConnectionStatus::Disconnected, now);
                }
            }
            ConsoleMessage::Ack { sequence } => {
                if !self.commands.acknowledge(sequence) {
                    debug!("stale ack {sequence}");
                }
            }
            ConsoleMessage::Output(frame) => {
                if self.status == ConnectionStatus::Connected {
                    self.events.push(RemoteEvent::Output(frame));
                }
            }
            ConsoleMessage::Pong(token) => {
                if let Some((sent_token, sent_at)) = self.ping_sent {
                    if sent_token == token {
                        self.latency = Some(now.saturating_duration_since(sent_at));
                        self.ping_sent = None;
                    }
                }
            }
            ConsoleMessage::Disconnect { reason } => {
                info!("{from} closed the session ({reason})");
                self.target = None;
                self.commands.reset();
                self.set_status(ConnectionStatus::Disconnected, now);
            }
            other => debug!("unexpected {:?} from {from}", other.message_type()),
        }
    }

    fn run_timers(&mut self, now: Instant) {
        let elapsed = now.saturating_duration_since(self.status_since);
        match self.status {
            ConnectionStatus::Discovering if elapsed >= self.config.discover_timeout => {
                debug!("discovery finished with {} server(s)", self.servers.len());
                self.set_status(ConnectionStatus::Disconnected, now);
            }
            ConnectionStatus::Connecting if elapsed >= self.config.connect_timeout => {
                warn!("no answer from {:?} within {:?}", self.target, self.config.connect_timeout);
                self.target = None;
                self.set_status(ConnectionStatus::Disconnected, now);
            }
            ConnectionStatus::Connected => self.run_session_timers(now),
            _ => {}
        }
    }

    fn run_session_timers(&mut self, now: Instant) {
        let Some(target) = self.target else {
            return;
        };

        match self.commands.poll(now) {
            Ok(resends) => {
                for bytes in resends {
                    if let Err(e) = self.socket.send_to(&bytes, target) {
                        debug!("resend to {target} failed: {e}");
                    }
                }
            }
            Err(e) => {
                warn!("session with {target} lost: {e}");
                self.disconnect(now);
                return;
            }
        }

        let due = self
            .last_ping
            .map_or(true, |last| now.saturating_duration_since(last) >= self.config.ping_interval);
        if due {
            let token = self.sequence.current();
            self.last_ping = Some(now);
            self.ping_sent = Some((token, now));
            if let Err(e) = self.send_unreliable(target, &ConsoleMessage::Ping(token)) {
                debug!("ping to {target} failed: {e}");
            }
        }
    }

    fn send_unreliable(&self, to: SocketAddr, message: &ConsoleMessage) -> Result<(), RemoteError> {
        let bytes = encode_message(message, self.sequence.next())?;
        self.socket.send_to(&bytes, to)?;
        Ok(())
    }

    fn set_status(&mut self, status: ConnectionStatus, now: Instant) {
        self.status_since = now;
        if self.status != status {
            debug!("status {} -> {status}", self.status);
            self.status = status;
            self.events.push(RemoteEvent::StatusChanged(status));
        }
    }
}

impl Drop for RemoteClient {
    fn drop(&mut self) {
        if self.status == ConnectionStatus::Connected {
            self.disconnect(Instant::now());
        }
        self.running.store(false, Ordering::Relaxed);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

// ── Receive thread ────────────────────────────────────────────────────────────

fn receive_loop(socket: Arc<UdpSocket>, tx: mpsc::Sender<Inbound>, running: Arc<AtomicBool>) {
    let mut buf = vec![0u8; RECV_BUFFER_SIZE];

    while running.load(Ordering::Relaxed) {
        let (len, from) = match socket.recv_from(&mut buf) {
            Ok(pair) => pair,
            Err(e) if is_timeout_error(&e) => continue,
            Err(e) => {
                debug!("remote recv error: {e}");
                continue;
            }
        };

        let mut datagram = &buf[..len];
        while !datagram.is_empty() {
            match decode_message(datagram) {
                Ok((envelope, consumed)) => {
                    datagram = &datagram[consumed..];
                    match tx.try_send(Inbound { from, envelope }) {
                        Ok(()) => {}
                        Err(TrySendError::Full(_)) => warn!("inbound queue full; dropped datagram from {from}"),
                        Err(TrySendError::Closed(_)) => return,
                    }
                }
                Err(e) => {
                    debug!("dropping malformed datagram from {from}: {e}");
                    break;
                }
            }
        }
    }
}

/// Returns `true` for OS timeout / would-block errors that should be retried.
fn is_timeout_error(e: &std::io::Error) -> bool {
    matches!(
        e.kind(),
        std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut
    )
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    /// A raw socket standing in for a host.
    struct FakeHost {
        socket: UdpSocket,
    }

    impl FakeHost {
        fn new() -> Self {
            let socket = UdpSocket::bind("127.0.0.1:0").unwrap();
            socket.set_read_timeout(Some(Duration::from_millis(500))).unwrap();
            Self { socket }
        }

        fn addr(&self) -> SocketAddr {
            self.socket.local_addr().unwrap()
        }

        fn recv(&self) -> (Envelope, SocketAddr) {
            let mut buf = [0u8; 2048];
            let (len, from) = self.socket.recv_from(&mut buf).expect("datagram");
            (decode_message(&buf[..len]).expect("decode").0, from)
        }

        fn send(&self, to: SocketAddr, message: ConsoleMessage) {
            let bytes = encode_message(&message, 0).unwrap();
            self.socket.send_to(&bytes, to).unwrap();
        }
    }

    fn client_for(host: &FakeHost) -> RemoteClient {
        let config = RemoteConfig {
            port: host.addr().port(),
            broadcast: IpAddr::V4(Ipv4Addr::LOCALHOST),
            reliability: ReliabilityConfig {
                resend_interval: Duration::from_millis(10),
                max_attempts: 3,
            },
            ..RemoteConfig::default()
        };
        RemoteClient::bind(SocketAddr::from(([127, 0, 0, 1], 0)), config).unwrap()
    }

    /// Polls `client` until `done` holds or a second passes.
    fn update_until(client: &mut RemoteClient, done: impl Fn(&[RemoteEvent]) -> bool) -> Vec<RemoteEvent> {
        let deadline = Instant::now() + Duration::from_secs(1);
        let mut events = Vec::new();
        while Instant::now() < deadline && !done(&events) {
            events.extend(client.update(Instant::now()));
            std::thread::sleep(Duration::from_millis(5));
        }
        events
    }

    fn connected_client(host: &FakeHost) -> (RemoteClient, SocketAddr) {
        let mut client = client_for(host);
        client.connect(host.addr(), Instant::now()).unwrap();
        let (_, client_addr) = host.recv();
        host.send(
            client_addr,
            ConsoleMessage::ConnectAck {
                accepted: true,
                reason: String::new(),
            },
        );
        update_until(&mut client, |e| {
            e.contains(&RemoteEvent::StatusChanged(ConnectionStatus::Connected))
        });
        (client, client_addr)
    }

    #[test]
    fn test_is_timeout_error_recognises_would_block() {
        let e = std::io::Error::new(std::io::ErrorKind::WouldBlock, "would block");
        assert!(is_timeout_error(&e));
    }

    #[test]
    fn test_discover_sends_request_and_lists_each_server_once() {
        // Arrange
        let host = FakeHost::new();
        let mut client = client_for(&host);

        // Act
        client.discover(Instant::now()).unwrap();
        let (request, client_addr) = host.recv();
        for _ in 0..2 {
            host.send(
                client_addr,
                ConsoleMessage::DiscoveryResponse {
                    identity: "Arena".into(),
                    port: 4000,
                },
            );
        }
        let events = update_until(&mut client, |e| e.len() >= 2);
        std::thread::sleep(Duration::from_millis(50));
        let late = client.update(Instant::now());

        // Assert
        assert_eq!(
            request.message,
            ConsoleMessage::DiscoveryRequest {
                app_id: APP_IDENTIFIER.into()
            }
        );
        let expected = ServerInfo {
            identity: "Arena".into(),
            endpoint: SocketAddr::from(([127, 0, 0, 1], 4000)),
        };
        assert_eq!(
            events,
            vec![
                RemoteEvent::StatusChanged(ConnectionStatus::Discovering),
                RemoteEvent::ServerDiscovered(expected),
            ]
        );
        assert!(late.iter().all(|e| !matches!(e, RemoteEvent::ServerDiscovered(_))));
        assert_eq!(client.servers().len(), 1);
    }

    #[test]
    fn test_discovery_times_out_to_disconnected() {
        let host = FakeHost::new();
        let mut client = client_for(&host);
        let start = Instant::now();

        client.discover(start).unwrap();
        client.update(start);
        let events = client.update(start + Duration::from_secs(2));

        assert_eq!(events, vec![RemoteEvent::StatusChanged(ConnectionStatus::Disconnected)]);
    }

    #[test]
    fn test_connect_accepted_moves_to_connected() {
        // Arrange
        let host = FakeHost::new();

        // Act
        let (client, _) = connected_client(&host);

        // Assert
        assert_eq!(client.status(), ConnectionStatus::Connected);
        assert_eq!(client.target(), Some(host.addr()));
    }

    #[test]
    fn test_refused_connect_moves_to_disconnected() {
        // Arrange
        let host = FakeHost::new();
        let mut client = client_for(&host);
        client.connect(host.addr(), Instant::now()).unwrap();
        let (connect, client_addr) = host.recv();

        // Act
        host.send(
            client_addr,
            ConsoleMessage::ConnectAck {
                accepted: false,
                reason: "busy".into(),
            },
        );
        let events = update_until(&mut client, |e| {
            e.contains(&RemoteEvent::StatusChanged(ConnectionStatus::Disconnected))
        });

        // Assert
        assert!(matches!(connect.message, ConsoleMessage::Connect { .. }));
        assert_eq!(
            events,
            vec![
                RemoteEvent::StatusChanged(ConnectionStatus::Connecting),
                RemoteEvent::StatusChanged(ConnectionStatus::Disconnected),
            ]
        );
        assert!(client.target().is_none());
    }

    #[test]
    fn test_connect_without_answer_times_out() {
        let host = FakeHost::new();
        let mut client = client_for(&host);
        let start = Instant::now();

        client.connect(host.addr(), start).unwrap();
        client.update(start);
        let events = client.update(start + Duration::from_secs(5));

        assert_eq!(events, vec![RemoteEvent::StatusChanged(ConnectionStatus::Disconnected)]);
    }

    #[test]
    fn test_send_command_skips_blank_lines_and_requires_session() {
        // Arrange
        let host = FakeHost::new();
        let mut idle = client_for(&host);
        let (mut connected, _) = connected_client(&host);

        // Act
        let not_connected = idle.send_command("echo hi", true, Instant::now()).unwrap();
        let blank = connected.send_command("   ", true, Instant::now()).unwrap();

        // Assert
        assert_eq!(not_connected, None);
        assert_eq!(blank, None);
        assert_eq!(connected.pending_commands(), 0);
    }

    #[test]
    fn test_command_is_resent_until_acked() {
        // Arrange
        let host = FakeHost::new();
        let (mut client, client_addr) = connected_client(&host);
        let start = Instant::now();

        // Act
        let sequence = client.send_command("echo hi", true, start).unwrap();
        client.update(start + Duration::from_millis(20));
        let mut commands = Vec::new();
        while commands.len() < 2 {
            let (envelope, _) = host.recv();
            if let ConsoleMessage::Command(command) = envelope.message {
                commands.push((envelope.sequence, command));
            }
        }
        host.send(client_addr, ConsoleMessage::Ack { sequence: 0 });
        let deadline = Instant::now() + Duration::from_secs(1);
        while client.pending_commands() > 0 && Instant::now() < deadline {
            client.update(start + Duration::from_millis(25));
            std::thread::sleep(Duration::from_millis(5));
        }

        // Assert
        assert_eq!(sequence, Some(0));
        assert_eq!(commands[0], commands[1]);
        assert_eq!(commands[0].1.line, "echo hi");
        assert!(commands[0].1.manual);
        assert_eq!(client.pending_commands(), 0);
    }

    #[test]
    fn test_exhausted_retries_drop_the_session() {
        // Arrange
        let host = FakeHost::new();
        let (mut client, _) = connected_client(&host);
        let start = Instant::now();
        client.send_command("echo lost", false, start).unwrap();

        // Act
        let mut events = Vec::new();
        for step in 1..=5 {
            events.extend(client.update(start + Duration::from_millis(20 * step)));
        }

        // Assert
        assert!(events.contains(&RemoteEvent::StatusChanged(ConnectionStatus::Disconnected)));
        assert_eq!(client.pending_commands(), 0);
    }

    #[test]
    fn test_output_from_host_becomes_event() {
        let host = FakeHost::new();
        let (mut client, client_addr) = connected_client(&host);

        host.send(client_addr, ConsoleMessage::Output(console_core::output::OutputFrame::line("hi")));
        let events = update_until(&mut client, |e| !e.is_empty());

        assert_eq!(
            events,
            vec![RemoteEvent::Output(console_core::output::OutputFrame::line("hi"))]
        );
    }

    #[test]
    fn test_host_disconnect_moves_to_disconnected() {
        let host = FakeHost::new();
        let (mut client, client_addr) = connected_client(&host);

        host.send(client_addr, ConsoleMessage::Disconnect { reason: "goodbye".into() });
        let events = update_until(&mut client, |e| !e.is_empty());

        assert_eq!(events, vec![RemoteEvent::StatusChanged(ConnectionStatus::Disconnected)]);
        assert!(client.target().is_none());
    }
}
