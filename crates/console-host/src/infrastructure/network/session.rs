//! Single-session bookkeeping for the console server.
//!
//! [`SessionManager`] is pure state: it is fed decoded envelopes and the
//! current time, and answers with the replies to send and the
//! [`TransportEvent`]s for the application.  It never touches a socket, which
//! keeps the accept / busy / timeout rules testable without the network.
//!
//! # Rules
//!
//! - A `Connect` is accepted when no session is active, when the active
//!   session's peer reconnects, or when the active session has timed out.
//!   Anyone else gets `ConnectAck { accepted: false, reason: "busy" }`.
//! - Every datagram from the session peer refreshes its activity time.
//! - Commands from the session peer go through a [`ReliableReceiver`]: every
//!   copy inside the window is acknowledged, and commands are released in
//!   sequence order.  Commands from other peers are ignored (and not acked).

use std::net::SocketAddr;
use std::time::{Duration, Instant};

use console_core::protocol::{CommandMessage, ConsoleMessage, Envelope, Receipt, ReliableReceiver};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::application::TransportEvent;

/// Reason sent when a second peer tries to connect.
pub const BUSY_REASON: &str = "busy";
/// Reason reported when a session goes silent.
pub const TIMEOUT_REASON: &str = "timeout";
/// Reason sent when either side ends the session normally.
pub const GOODBYE_REASON: &str = "goodbye";

#[derive(Debug)]
struct Session {
    id: Uuid,
    peer: SocketAddr,
    client_name: String,
    last_seen: Instant,
    commands: ReliableReceiver<CommandMessage>,
}

/// What handling one envelope produced.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SessionOutcome {
    /// Messages to send, in order.
    pub replies: Vec<(SocketAddr, ConsoleMessage)>,
    /// Events for the application layer, in order.
    pub events: Vec<TransportEvent>,
}

impl SessionOutcome {
    fn reply(&mut self, peer: SocketAddr, message: ConsoleMessage) {
        self.replies.push((peer, message));
    }
}

#[derive(Debug)]
pub struct SessionManager {
    active: Option<Session>,
    timeout: Duration,
}

impl SessionManager {
    pub fn new(timeout: Duration) -> Self {
        Self {
            active: None,
            timeout,
        }
    }

    /// Peer of the active session.
    pub fn peer(&self) -> Option<SocketAddr> {
        self.active.as_ref().map(|s| s.peer)
    }

    pub fn session_id(&self) -> Option<Uuid> {
        self.active.as_ref().map(|s| s.id)
    }

    pub fn client_name(&self) -> Option<&str> {
        self.active.as_ref().map(|s| s.client_name.as_str())
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    /// Processes one envelope received from `peer` at `now`.
    pub fn handle(&mut self, peer: SocketAddr, envelope: Envelope, now: Instant) -> SessionOutcome {
        let mut outcome = SessionOutcome::default();

        if let ConsoleMessage::Connect { client_name } = envelope.message {
            self.handle_connect(peer, client_name, now, &mut outcome);
            return outcome;
        }

        let Some(session) = self.active.as_mut().filter(|s| s.peer == peer) else {
            debug!(%peer, "ignoring {:?} from a peer without a session", envelope.message.message_type());
            return outcome;
        };
        session.last_seen = now;

        match envelope.message {
            ConsoleMessage::Ping(token) => outcome.reply(peer, ConsoleMessage::Pong(token)),
            ConsoleMessage::Command(command) => {
                let receipt = session.commands.accept(envelope.sequence, command);
                if receipt.should_ack() {
                    outcome.reply(
                        peer,
                        ConsoleMessage::Ack {
                            sequence: envelope.sequence,
                        },
                    );
                }
                match receipt {
                    Receipt::Deliver(commands) => {
                        outcome.events.extend(
                            commands
                                .into_iter()
                                .map(|command| TransportEvent::Command { peer, command }),
                        );
                    }
                    Receipt::Buffered => debug!(%peer, "buffered out-of-order command {}", envelope.sequence),
                    Receipt::Duplicate => debug!(%peer, "duplicate command {}", envelope.sequence),
                    Receipt::TooNew => warn!(%peer, "command {} is outside the receive window", envelope.sequence),
                }
            }
            ConsoleMessage::Disconnect { reason } => {
                if let Some(session) = self.active.take() {
                    info!(%peer, session = %session.id, "session closed by remote ({reason})");
                }
                outcome
                    .events
                    .push(TransportEvent::Disconnected { peer, reason });
            }
            // Keep-alive only.
            ConsoleMessage::Pong(_) | ConsoleMessage::Ack { .. } => {}
            other => debug!(%peer, "unexpected {:?} in session", other.message_type()),
        }
        outcome
    }

    fn handle_connect(
        &mut self,
        peer: SocketAddr,
        client_name: String,
        now: Instant,
        outcome: &mut SessionOutcome,
    ) {
        if let Some(current) = &self.active {
            let expired = now.saturating_duration_since(current.last_seen) >= self.timeout;
            if current.peer != peer && !expired {
                info!(%peer, "refusing connection: session with {} is active", current.peer);
                outcome.reply(
                    peer,
                    ConsoleMessage::ConnectAck {
                        accepted: false,
                        reason: BUSY_REASON.to_string(),
                    },
                );
                return;
            }
            if current.peer != peer {
                outcome.events.push(TransportEvent::Disconnected {
                    peer: current.peer,
                    reason: TIMEOUT_REASON.to_string(),
                });
            }
        }

        let session = Session {
            id: Uuid::new_v4(),
            peer,
            client_name: client_name.clone(),
            last_seen: now,
            commands: ReliableReceiver::new(),
        };
        info!(%peer, session = %session.id, "session opened for '{client_name}'");
        self.active = Some(session);

        outcome.reply(
            peer,
            ConsoleMessage::ConnectAck {
                accepted: true,
                reason: String::new(),
            },
        );
        outcome
            .events
            .push(TransportEvent::Connected { peer, client_name });
    }

    /// Drops the session if it has been silent for the timeout.
    pub fn check_timeout(&mut self, now: Instant) -> Option<TransportEvent> {
        let session = self.active.as_ref()?;
        if now.saturating_duration_since(session.last_seen) < self.timeout {
            return None;
        }
        let session = self.active.take()?;
        info!(peer = %session.peer, session = %session.id, "session timed out");
        Some(TransportEvent::Disconnected {
            peer: session.peer,
            reason: TIMEOUT_REASON.to_string(),
        })
    }

    /// Ends the session from this side.  Returns the goodbye to send.
    pub fn close(&mut self) -> Option<(SocketAddr, ConsoleMessage)> {
        let session = self.active.take()?;
        info!(peer = %session.peer, session = %session.id, "closing session");
        Some((
            session.peer,
            ConsoleMessage::Disconnect {
                reason: GOODBYE_REASON.to_string(),
            },
        ))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
