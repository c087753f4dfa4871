//! A sans-io implementation of the server half of the RTMP protocol, layered
//! the way the wire format is: the handshake, the chunk codec, the message
//! layer, and a server session that interprets control and command messages
//! far enough to admit a publisher and hand its audio/video/data messages to
//! the embedding application.
//!
//! Nothing in this crate performs I/O.  Bytes read from a transport are fed
//! in, and every layer hands back the bytes (or events) the caller must
//! deliver, in order.  See `inlet-server` for a tokio TCP front end.

pub mod chunk;
pub mod handshake;
pub mod messages;
pub mod session;
pub mod time;
