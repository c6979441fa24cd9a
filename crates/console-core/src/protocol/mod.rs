//! Wire protocol: message types, the binary codec, sequence numbering and
//! the reliable-ordered layer used for command submission.

pub mod codec;
pub mod messages;
pub mod reliable;
pub mod sequence;

pub use codec::{decode_header, decode_message, encode_message, ProtocolError};
pub use messages::*;
pub use reliable::{Receipt, ReliabilityConfig, ReliabilityError, ReliableReceiver, ReliableSender};
pub use sequence::SequenceCounter;
