//! The server side of the plain RTMP handshake (the "version 3, zero epoch"
//! variant; digest handshakes are not supported).
//!
//! The wire schedule is three exchanges: the client sends a version byte
//! (c0) and a 1536 byte packet of `time || zeros || random` (c1); we answer
//! with our own version byte and packet (s0, s1) plus an echo of the
//! client's packet (s2); the client finishes by echoing our packet back
//! (c2), which must match what we sent byte for byte.
//!
//! Like the rest of the engine this is sans-io: feed whatever bytes arrive
//! into [`Handshake::process_bytes`] and write the returned response bytes
//! to the peer.  Bytes the client sends after its echo belong to the chunk
//! stream and are handed back untouched on completion.

mod errors;

pub use self::errors::HandshakeError;

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use rand::Rng;
use std::io::{Cursor, Read, Write};
use tracing::warn;

const RTMP_VERSION: u8 = 3;
const RANDOM_SIZE: usize = 1528;
const PACKET_SIZE: usize = 8 + RANDOM_SIZE;

/// Where the handshake currently stands.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum HandshakeState {
    /// Nothing received yet; waiting on the client's version byte
    Uninitialized,
    /// Version byte accepted and s0 + s1 emitted; waiting on c1
    VersionSent,
    /// c1 acknowledged with s2; waiting on the client's echo
    AckSent,
    /// Echo verified; the connection is in chunked mode from here on
    Done,
}

/// The outcome of feeding bytes into the handshake.
#[derive(PartialEq, Debug)]
pub enum HandshakeOutcome {
    /// More bytes are needed.  `response` (possibly empty) must be written
    /// to the peer before reading again.
    InProgress { response: Vec<u8> },

    /// The handshake finished.  `response` must still be written, and
    /// `remaining` holds any surplus bytes that already belong to the chunk
    /// layer.
    Done {
        response: Vec<u8>,
        remaining: Vec<u8>,
    },
}

/// Server handshake state machine.
pub struct Handshake {
    state: HandshakeState,
    epoch: u32,
    random: [u8; RANDOM_SIZE],
    buffer: Vec<u8>,
}

impl Handshake {
    pub fn new() -> Self {
        let mut random = [0_u8; RANDOM_SIZE];
        rand::thread_rng().fill(&mut random[..]);

        Handshake {
            state: HandshakeState::Uninitialized,
            epoch: 0,
            random,
            buffer: Vec::new(),
        }
    }

    pub fn state(&self) -> HandshakeState {
        self.state
    }

    /// Consumes bytes from the peer, advancing the state machine as far as
    /// the buffered data allows.
    pub fn process_bytes(&mut self, input: &[u8]) -> Result<HandshakeOutcome, HandshakeError> {
        if self.state == HandshakeState::Done {
            return Err(HandshakeError::AlreadyCompleted);
        }

        self.buffer.extend_from_slice(input);
        let mut response = Vec::new();

        loop {
            let made_progress = match self.state {
                HandshakeState::Uninitialized => self.read_c0(&mut response)?,
                HandshakeState::VersionSent => self.read_c1(&mut response)?,
                HandshakeState::AckSent => self.read_c2()?,
                HandshakeState::Done => {
                    let remaining = std::mem::take(&mut self.buffer);
                    return Ok(HandshakeOutcome::Done {
                        response,
                        remaining,
                    });
                }
            };

            if !made_progress {
                return Ok(HandshakeOutcome::InProgress { response });
            }
        }
    }

    fn read_c0(&mut self, response: &mut Vec<u8>) -> Result<bool, HandshakeError> {
        if self.buffer.is_empty() {
            return Ok(false);
        }

        let version = self.buffer.remove(0);
        if version != RTMP_VERSION {
            return Err(HandshakeError::VersionMismatch { version });
        }

        response.push(RTMP_VERSION);
        response.extend(packet_bytes(self.epoch, 0, &self.random)?);
        self.state = HandshakeState::VersionSent;
        Ok(true)
    }

    fn read_c1(&mut self, response: &mut Vec<u8>) -> Result<bool, HandshakeError> {
        let (time, zeros, random) = match self.take_packet()? {
            Some(parts) => parts,
            None => return Ok(false),
        };

        if zeros != 0 {
            // Some encoders stamp a flash version into the field that should
            // hold zeros.  Not fatal.
            warn!(value = zeros, "second time field of client handshake packet was not zero");
        }

        // The echo repeats the client's time in both time fields.
        response.extend(packet_bytes(time, time, &random)?);
        self.state = HandshakeState::AckSent;
        Ok(true)
    }

    fn read_c2(&mut self) -> Result<bool, HandshakeError> {
        let (time, zeros, random) = match self.take_packet()? {
            Some(parts) => parts,
            None => return Ok(false),
        };

        if time != self.epoch || zeros != 0 || random != self.random {
            return Err(HandshakeError::EchoMismatch);
        }

        self.state = HandshakeState::Done;
        Ok(true)
    }

    fn take_packet(&mut self) -> Result<Option<(u32, u32, [u8; RANDOM_SIZE])>, HandshakeError> {
        if self.buffer.len() < PACKET_SIZE {
            return Ok(None);
        }

        let packet: Vec<u8> = self.buffer.drain(..PACKET_SIZE).collect();
        let mut cursor = Cursor::new(packet);
        let time = cursor.read_u32::<BigEndian>()?;
        let zeros = cursor.read_u32::<BigEndian>()?;
        let mut random = [0_u8; RANDOM_SIZE];
        cursor.read_exact(&mut random)?;

        Ok(Some((time, zeros, random)))
    }
}

impl Default for Handshake {
    fn default() -> Self {
        Handshake::new()
    }
}

fn packet_bytes(
    time1: u32,
    time2: u32,
    random: &[u8; RANDOM_SIZE],
) -> Result<Vec<u8>, HandshakeError> {
    let mut cursor = Cursor::new(Vec::with_capacity(PACKET_SIZE));
    cursor.write_u32::<BigEndian>(time1)?;
    cursor.write_u32::<BigEndian>(time2)?;
    cursor.write_all(random)?;
    Ok(cursor.into_inner())
}
