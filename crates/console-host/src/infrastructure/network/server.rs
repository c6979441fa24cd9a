//! UDP console server: discovery responder plus the single remote session.
//!
//! # Threads (for beginners)
//!
//! The server binds one UDP socket and uses it from two places:
//!
//! 1. A background **network thread** blocks in `recv_from` (with a 500 ms
//!    read timeout so it notices shutdown).  It decodes every datagram,
//!    answers `DiscoveryRequest`s itself, and forwards everything else to
//!    the frame loop through a bounded `tokio::sync::mpsc` channel.  If the
//!    channel is full the datagram is dropped and counted; the thread never
//!    waits for the frame loop.
//!
//! 2. The **frame loop** calls [`ConsoleTransport::pump`] once per tick.
//!    `pump` drains the channel without blocking and runs the session rules
//!    (see [`SessionManager`]).  Replies and console output are collected in
//!    an outbox and only hit the socket in [`ConsoleTransport::flush`], at the
//!    end of the tick.
//!
//! Discovery lives on the network thread so a host stuck in a long frame is
//! still visible to remote tools.

use std::net::{IpAddr, SocketAddr, UdpSocket};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use console_core::output::OutputFrame;
use console_core::protocol::{
    decode_message, encode_message, ConsoleMessage, Envelope, SequenceCounter, APP_IDENTIFIER,
};
use thiserror::Error;
use tokio::sync::mpsc::{self, error::TryRecvError, error::TrySendError};
use tracing::{debug, error, info, warn};

use super::session::SessionManager;
use crate::application::{ConsoleTransport, TransportEvent};
use crate::infrastructure::storage::config::NetworkConfig;

const READ_TIMEOUT: Duration = Duration::from_millis(500);

/// Error type for console server start-up.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The UDP socket could not be bound.
    #[error("failed to bind console socket on {addr}: {source}")]
    BindFailed {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// `bind_address` is not an IP address.
    #[error("invalid bind address '{0}'")]
    InvalidAddress(String),

    /// The network thread could not be started.
    #[error("failed to spawn network thread: {0}")]
    Spawn(#[source] std::io::Error),

    /// Socket configuration failed after binding.
    #[error("socket error: {0}")]
    Io(#[from] std::io::Error),
}

/// A decoded datagram on its way from the network thread to the frame loop.
#[derive(Debug)]
struct Inbound {
    peer: SocketAddr,
    envelope: Envelope,
}

/// Handle to the running server.  Implements [`ConsoleTransport`].
pub struct ConsoleServer {
    socket: Arc<UdpSocket>,
    local_addr: SocketAddr,
    running: Arc<AtomicBool>,
    dropped: Arc<AtomicU64>,
    inbound: mpsc::Receiver<Inbound>,
    thread: Option<JoinHandle<()>>,
    sessions: SessionManager,
    outbox: Vec<(SocketAddr, ConsoleMessage)>,
    /// Shared with the network thread, which stamps discovery responses.
    sequence: Arc<SequenceCounter>,
    max_datagram_size: usize,
}

impl ConsoleServer {
    /// Binds the socket described by `config` and starts the network thread.
    ///
    /// Port `0` picks a free port; [`local_addr`](Self::local_addr) reports it.
    ///
    /// # Errors
    ///
    /// [`ServerError::InvalidAddress`] for an unparsable bind address,
    /// [`ServerError::BindFailed`] if the port is taken and
    /// [`ServerError::Spawn`] if the thread cannot start.
    pub fn start(config: &NetworkConfig, identity: &str) -> Result<Self, ServerError> {
        let ip: IpAddr = config
            .bind_address
            .parse()
            .map_err(|_| ServerError::InvalidAddress(config.bind_address.clone()))?;
        let addr = SocketAddr::new(ip, config.port);

        let socket = UdpSocket::bind(addr).map_err(|source| ServerError::BindFailed { addr, source })?;
        socket.set_read_timeout(Some(READ_TIMEOUT))?;
        let local_addr = socket.local_addr()?;
        let socket = Arc::new(socket);

        let running = Arc::new(AtomicBool::new(true));
        let dropped = Arc::new(AtomicU64::new(0));
        let (tx, rx) = mpsc::channel(config.pump_queue_capacity.max(1));
        let sequence = Arc::new(SequenceCounter::new());

        let responder = Responder {
            socket: Arc::clone(&socket),
            identity: identity.to_string(),
            port: local_addr.port(),
            sequence: Arc::clone(&sequence),
            buffer_size: config.max_datagram_size,
        };
        let thread_running = Arc::clone(&running);
        let thread_dropped = Arc::clone(&dropped);
        let thread = std::thread::Builder::new()
            .name("devconsole-net".to_string())
            .spawn(move || responder.run(tx, thread_running, thread_dropped))
            .map_err(ServerError::Spawn)?;

        info!("console server '{identity}' listening on UDP {local_addr}");
        Ok(Self {
            socket,
            local_addr,
            running,
            dropped,
            inbound: rx,
            thread: Some(thread),
            sessions: SessionManager::new(config.session_timeout()),
            outbox: Vec::new(),
            sequence,
            max_datagram_size: config.max_datagram_size,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Datagrams dropped because the frame loop fell behind.
    pub fn dropped_datagrams(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub fn session_peer(&self) -> Option<SocketAddr> {
        self.sessions.peer()
    }

    fn send_now(&self, peer: SocketAddr, message: &ConsoleMessage) {
        let bytes = match encode_message(message, self.sequence.next()) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("dropping {:?} for {peer}: {e}", message.message_type());
                return;
            }
        };
        if bytes.len() > self.max_datagram_size {
            warn!(
                "dropping {:?} for {peer}: {} bytes exceeds the {} byte limit",
                message.message_type(),
                bytes.len(),
                self.max_datagram_size
            );
            return;
        }
        if let Err(e) = self.socket.send_to(&bytes, peer) {
            warn!("send to {peer} failed: {e}");
        }
    }
}

impl ConsoleTransport for ConsoleServer {
    fn pump(&mut self, now: Instant) -> Vec<TransportEvent> {
        let mut events = Vec::new();
        loop {
            match self.inbound.try_recv() {
                Ok(Inbound { peer, envelope }) => {
                    let outcome = self.sessions.handle(peer, envelope, now);
                    self.outbox.extend(outcome.replies);
                    events.extend(outcome.events);
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    debug!("network thread has stopped");
                    break;
                }
            }
        }
        events.extend(self.sessions.check_timeout(now));
        events
    }

    fn queue_output(&mut self, peer: SocketAddr, frame: OutputFrame) {
        // Output for a session that ended mid-command has nowhere to go.
        if self.sessions.peer() == Some(peer) {
            self.outbox.push((peer, ConsoleMessage::Output(frame)));
        }
    }

    fn flush(&mut self) {
        let outbox = std::mem::take(&mut self.outbox);
        for (peer, message) in &outbox {
            self.send_now(*peer, message);
        }
    }

    fn shutdown(&mut self) {
        if let Some((peer, goodbye)) = self.sessions.close() {
            self.outbox.push((peer, goodbye));
        }
        self.flush();

        self.running.store(false, Ordering::Relaxed);
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                error!("network thread panicked");
            }
            info!("console server on {} stopped", self.local_addr);
        }
    }
}

impl Drop for ConsoleServer {
    fn drop(&mut self) {
        self.shutdown();
    }
}

// ── Network thread ────────────────────────────────────────────────────────────

struct Responder {
    socket: Arc<UdpSocket>,
    identity: String,
    port: u16,
    sequence: Arc<SequenceCounter>,
    buffer_size: usize,
}

impl Responder {
    fn run(self, tx: mpsc::Sender<Inbound>, running: Arc<AtomicBool>, dropped: Arc<AtomicU64>) {
        let mut buf = vec![0u8; self.buffer_size.max(1)];

        while running.load(Ordering::Relaxed) {
            let (len, src) = match self.socket.recv_from(&mut buf) {
                Ok(pair) => pair,
                Err(e) if is_timeout_error(&e) => continue,
                Err(e) => {
                    // ICMP port-unreachable from a vanished peer surfaces here on some platforms.
                    debug!("console recv error: {e}");
                    continue;
                }
            };

            let mut datagram = &buf[..len];
            while !datagram.is_empty() {
                let (envelope, consumed) = match decode_message(datagram) {
                    Ok(decoded) => decoded,
                    Err(e) => {
                        debug!("dropping malformed datagram from {src}: {e}");
                        break;
                    }
                };
                datagram = &datagram[consumed..];

                if let ConsoleMessage::DiscoveryRequest { app_id } = &envelope.message {
                    self.answer_discovery(app_id, src);
                    continue;
                }
                match tx.try_send(Inbound { peer: src, envelope }) {
                    Ok(()) => {}
                    Err(TrySendError::Full(_)) => {
                        let total = dropped.fetch_add(1, Ordering::Relaxed) + 1;
                        warn!("pump queue full; dropped datagram from {src} ({total} so far)");
                    }
                    Err(TrySendError::Closed(_)) => {
                        info!("console server stopped");
                        return;
                    }
                }
            }
        }

        info!("console server stopped");
    }

    fn answer_discovery(&self, app_id: &str, src: SocketAddr) {
        if app_id != APP_IDENTIFIER {
            debug!("ignoring discovery for '{app_id}' from {src}");
            return;
        }
        let response = ConsoleMessage::DiscoveryResponse {
            identity: self.identity.clone(),
            port: self.port,
        };
        match encode_message(&response, self.sequence.next()) {
            Ok(bytes) => {
                if let Err(e) = self.socket.send_to(&bytes, src) {
                    warn!("failed to answer discovery from {src}: {e}");
                } else {
                    debug!("answered discovery from {src}");
                }
            }
            Err(e) => error!("failed to encode DiscoveryResponse: {e}"),
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
