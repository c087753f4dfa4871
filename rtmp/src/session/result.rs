use super::events::SessionEvent;
use crate::chunk::Packet;
use crate::messages::MessagePayload;

/// One output of feeding bytes (or an accept/reject decision) into a
/// session.
#[derive(Debug, PartialEq)]
pub enum SessionResult {
    /// Bytes to write to the peer.  Always write these in the order they
    /// were produced, and before the next read is processed; chunk header
    /// compression and command ordering both depend on it.
    OutboundResponse(Packet),

    /// An event for the embedding application
    RaisedEvent(SessionEvent),

    /// A complete message the session has no interpretation for, in case
    /// the application wants to inspect it
    UnhandleableMessageReceived(MessagePayload),
}
