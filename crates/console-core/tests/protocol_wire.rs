//! Wire-level tests: the codec, the reliability layer and the sequence
//! counter exercised together through the public API, the way the host and
//! the remote tool use them.

use std::time::{Duration, Instant};

use console_core::output::OutputFrame;
use console_core::protocol::{
    decode_message, encode_message, CommandMessage, ConsoleMessage, Receipt, ReliabilityConfig,
    ReliableReceiver, ReliableSender, SequenceCounter, APP_IDENTIFIER, HEADER_SIZE,
};

fn command(line: &str) -> ConsoleMessage {
    ConsoleMessage::Command(CommandMessage {
        line: line.to_string(),
        manual: true,
    })
}

/// Decodes a datagram and feeds it to the receiver, returning delivered lines.
fn receive(receiver: &mut ReliableReceiver<String>, datagram: &[u8]) -> (Vec<String>, bool) {
    let (envelope, _) = decode_message(datagram).expect("decode must succeed");
    let ConsoleMessage::Command(cmd) = envelope.message else {
        panic!("expected a command");
    };
    let receipt = receiver.accept(envelope.sequence, cmd.line);
    let ack = receipt.should_ack();
    match receipt {
        Receipt::Deliver(lines) => (lines, ack),
        _ => (Vec::new(), ack),
    }
}

#[test]
fn test_commands_arrive_once_and_in_order_despite_loss_and_reordering() {
    // Arrange
    let config = ReliabilityConfig {
        resend_interval: Duration::from_millis(50),
        max_attempts: 5,
    };
    let mut sender = ReliableSender::new(config);
    let mut receiver = ReliableReceiver::new();
    let start = Instant::now();
    let (_, first) = sender.send(&command("one"), start).unwrap();
    let (_, second) = sender.send(&command("two"), start).unwrap();
    let (_, third) = sender.send(&command("three"), start).unwrap();
    let mut delivered = Vec::new();

    // Act: "one" is lost, "three" arrives before "two"
    drop(first);
    for datagram in [&third, &second] {
        let (lines, ack) = receive(&mut receiver, datagram);
        assert!(ack);
        delivered.extend(lines);
    }
    sender.acknowledge(1);
    sender.acknowledge(2);
    let resent = sender.poll(start + Duration::from_millis(50)).unwrap();
    for datagram in &resent {
        delivered.extend(receive(&mut receiver, datagram).0);
    }
    // a late duplicate of "two" changes nothing
    delivered.extend(receive(&mut receiver, &second).0);

    // Assert
    assert_eq!(resent.len(), 1);
    assert_eq!(delivered, vec!["one", "two", "three"]);
}

#[test]
fn test_unreliable_frames_are_stamped_from_shared_counter() {
    let counter = SequenceCounter::new();
    let frames = [
        ConsoleMessage::Output(OutputFrame::line("a")),
        ConsoleMessage::Output(OutputFrame::Table(vec!["x".into(), "y".into()])),
        ConsoleMessage::Ack { sequence: 9 },
    ];

    let sequences: Vec<u64> = frames
        .iter()
        .map(|m| {
            let bytes = encode_message(m, counter.next()).unwrap();
            decode_message(&bytes).unwrap().0.sequence
        })
        .collect();

    assert_eq!(sequences, vec![0, 1, 2]);
}

#[test]
fn test_discovery_request_fits_in_one_small_datagram() {
    let bytes = encode_message(
        &ConsoleMessage::DiscoveryRequest {
            app_id: APP_IDENTIFIER.to_string(),
        },
        0,
    )
    .unwrap();
    assert_eq!(bytes.len(), HEADER_SIZE + 2 + APP_IDENTIFIER.len());
}

#[test]
fn test_concatenated_datagrams_decode_one_at_a_time() {
    // Arrange
    let mut stream = encode_message(&ConsoleMessage::Ping(1), 0).unwrap();
    stream.extend(encode_message(&ConsoleMessage::Pong(1), 1).unwrap());

    // Act
    let (first, used) = decode_message(&stream).unwrap();
    let (second, _) = decode_message(&stream[used..]).unwrap();

    // Assert
    assert_eq!(first.message, ConsoleMessage::Ping(1));
    assert_eq!(second.message, ConsoleMessage::Pong(1));
}
