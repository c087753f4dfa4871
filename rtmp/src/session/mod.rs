//! The server session: everything above the chunk layer for one connection.
//!
//! A [`ServerSession`] owns the chunk reader/writer, the message assembler,
//! and the NetConnection/NetStream state machine.  It consumes the raw bytes
//! that follow the handshake and produces, in order, the bytes to write
//! back and the events the embedding application reacts to.  Requests that
//! need an application decision (connect, publish, play) are raised as
//! events carrying a request id and answered through
//! [`ServerSession::accept_request`] / [`ServerSession::reject_request`].

mod config;
mod errors;
mod events;
mod metadata;
mod requests;
mod result;
mod stream;

pub use self::config::SessionConfig;
pub use self::errors::SessionError;
pub use self::events::SessionEvent;
pub use self::metadata::StreamMetadata;
pub use self::result::SessionResult;
pub use self::stream::PublishMode;

use self::requests::PendingRequest;
use self::stream::{ActiveStream, StreamState};
use crate::chunk::{ChunkReader, ChunkWriter};
use crate::messages::{
    Message, MessageAssembler, MessagePayload, PeerBandwidthLimit, UserControlEvent,
};
use crate::time::Timestamp;
use bytes::Bytes;
use inlet_amf0::Amf0Value;
use std::collections::HashMap;
use std::time::SystemTime;
use tracing::{debug, trace, warn};

#[derive(Eq, PartialEq, Debug)]
enum ConnectionState {
    /// Waiting for a `connect` command to be received and accepted
    Connecting,
    /// `connect` accepted; streams can be created and used
    Connected,
}

/// The server side of one RTMP connection, from the first post-handshake
/// byte onward.
///
/// All bytes received from the peer must go through `handle_input` on the
/// same session, and every `OutboundResponse` it returns must reach the
/// peer in order before the next read is processed.  Chunk header
/// compression makes the stream stateful in both directions; skipping or
/// reordering output is unrecoverable.
pub struct ServerSession {
    config: SessionConfig,
    start_time: SystemTime,
    reader: ChunkReader,
    writer: ChunkWriter,
    assembler: MessageAssembler,

    state: ConnectionState,
    connected_app: Option<String>,
    object_encoding: f64,

    pending_requests: HashMap<u32, PendingRequest>,
    next_request_id: u32,
    active_streams: HashMap<u32, ActiveStream>,
    next_stream_id: u32,

    /// Window size the peer advertised; we owe an acknowledgement each time
    /// this many bytes arrive
    ack_window_in: u32,
    bytes_received: u64,
    bytes_since_last_ack: u64,
    last_peer_acknowledgement: Option<u32>,
    peer_bandwidth: Option<(u32, PeerBandwidthLimit)>,
    buffer_lengths: HashMap<u32, u32>,
    outstanding_ping: Option<Timestamp>,
}

impl ServerSession {
    /// Creates a session and the initial output raising the outbound chunk
    /// size to the configured value.
    pub fn new(config: SessionConfig) -> Result<(ServerSession, Vec<SessionResult>), SessionError> {
        let mut session = ServerSession {
            start_time: SystemTime::now(),
            reader: ChunkReader::new(),
            writer: ChunkWriter::new(),
            assembler: MessageAssembler::new(),
            state: ConnectionState::Connecting,
            connected_app: None,
            object_encoding: 0.0,
            pending_requests: HashMap::new(),
            next_request_id: 0,
            active_streams: HashMap::new(),
            next_stream_id: 1,
            ack_window_in: 0,
            bytes_received: 0,
            bytes_since_last_ack: 0,
            last_peer_acknowledgement: None,
            peer_bandwidth: None,
            buffer_lengths: HashMap::new(),
            outstanding_ping: None,
            config,
        };

        let chunk_size_packet = session.writer.set_chunk_size(session.config.chunk_size)?;
        Ok((
            session,
            vec![SessionResult::OutboundResponse(chunk_size_packet)],
        ))
    }

    /// Feeds bytes received from the peer through the chunk and message
    /// layers and dispatches every completed message.
    pub fn handle_input(&mut self, bytes: &[u8]) -> Result<Vec<SessionResult>, SessionError> {
        self.bytes_received = self.bytes_received.wrapping_add(bytes.len() as u64);
        self.bytes_since_last_ack += bytes.len() as u64;

        let mut results = Vec::new();
        let mut input = bytes;

        while let Some(chunk) = self.reader.read_chunk(input)? {
            input = &[];
            for payload in self.assembler.push(chunk) {
                let mut outputs = self.dispatch(payload)?;
                results.append(&mut outputs);
            }
        }

        self.maybe_acknowledge(&mut results)?;
        Ok(results)
    }

    /// Answers an outstanding connect/publish/play request positively,
    /// producing the replies the protocol owes the client.
    pub fn accept_request(&mut self, request_id: u32) -> Result<Vec<SessionResult>, SessionError> {
        let request = self
            .pending_requests
            .remove(&request_id)
            .ok_or(SessionError::UnknownRequestId(request_id))?;

        match request {
            PendingRequest::Connect {
                app_name,
                transaction_id,
            } => self.accept_connect(app_name, transaction_id),

            PendingRequest::Publish {
                stream_key,
                mode,
                stream_id,
            } => self.accept_publish(stream_key, mode, stream_id),

            PendingRequest::Play {
                stream_key,
                stream_id,
            } => self.accept_play(stream_key, stream_id),
        }
    }

    /// Answers an outstanding request negatively.  The client is told with
    /// the appropriate `_error`/`onStatus` and the connection stays usable.
    pub fn reject_request(&mut self, request_id: u32) -> Result<Vec<SessionResult>, SessionError> {
        let request = self
            .pending_requests
            .remove(&request_id)
            .ok_or(SessionError::UnknownRequestId(request_id))?;

        match request {
            PendingRequest::Connect { transaction_id, .. } => {
                let packet = self.error_command(
                    transaction_id,
                    "NetConnection.Connect.Rejected",
                    "Connection rejected.",
                    0,
                )?;
                Ok(vec![packet])
            }

            PendingRequest::Publish {
                stream_key,
                stream_id,
                ..
            } => {
                let status = self.on_status(
                    "error",
                    "NetStream.Publish.BadName",
                    &format!("Publishing of {} rejected.", stream_key),
                    stream_id,
                )?;
                Ok(vec![status])
            }

            PendingRequest::Play {
                stream_key,
                stream_id,
            } => {
                let status = self.on_status(
                    "error",
                    "NetStream.Play.Failed",
                    &format!("Playback of {} rejected.", stream_key),
                    stream_id,
                )?;
                Ok(vec![status])
            }
        }
    }

    /// Sends a ping carrying the current stream time.  The response clears
    /// [`ServerSession::awaiting_ping`].
    pub fn send_ping(&mut self) -> Result<Vec<SessionResult>, SessionError> {
        let timestamp = self.stream_time();
        self.outstanding_ping = Some(timestamp);
        Ok(vec![self.send(
            Message::UserControl(UserControlEvent::PingRequest { timestamp }),
            0,
            false,
        )?])
    }

    /// True while a ping sent with [`ServerSession::send_ping`] has not been
    /// answered.
    pub fn awaiting_ping(&self) -> bool {
        self.outstanding_ping.is_some()
    }

    /// The bandwidth limit the peer last announced with SET_PEER_BANDWIDTH.
    pub fn peer_bandwidth(&self) -> Option<(u32, PeerBandwidthLimit)> {
        self.peer_bandwidth
    }

    /// The sequence number of the peer's last ACKNOWLEDGEMENT.
    pub fn last_acknowledged_sequence(&self) -> Option<u32> {
        self.last_peer_acknowledgement
    }

    /// The buffer length the peer requested for a stream, in milliseconds.
    pub fn buffer_length(&self, stream_id: u32) -> Option<u32> {
        self.buffer_lengths.get(&stream_id).copied()
    }

    fn dispatch(&mut self, payload: MessagePayload) -> Result<Vec<SessionResult>, SessionError> {
        let message = match payload.to_message() {
            Ok(message) => message,
            Err(error) if payload.type_id == 17 || payload.type_id == 20 => {
                // A garbled command is the peer's problem, not a framing
                // problem; answer in-band and carry on.
                warn!(error = %error, "failed to decode command message");
                let packet = self.error_command(
                    0.0,
                    "NetConnection.Call.Failed",
                    "Could not decode the command.",
                    payload.message_stream_id,
                )?;
                return Ok(vec![packet]);
            }
            Err(error) => return Err(error.into()),
        };

        let results = match message {
            Message::SetChunkSize { size } => {
                let effective = self.reader.set_chunk_size(size)?;
                vec![SessionResult::RaisedEvent(
                    SessionEvent::ClientChunkSizeChanged {
                        new_chunk_size: effective,
                    },
                )]
            }

            Message::Abort { csid } => {
                debug!(csid, "peer aborted chunk stream");
                self.reader.abort(csid);
                self.assembler.discard(csid);
                Vec::new()
            }

            Message::Acknowledgement { sequence_number } => {
                self.last_peer_acknowledgement = Some(sequence_number);
                vec![SessionResult::RaisedEvent(
                    SessionEvent::AcknowledgementReceived {
                        bytes_received: sequence_number,
                    },
                )]
            }

            Message::UserControl(event) => self.handle_user_control(event)?,

            Message::WindowAckSize { size } => {
                self.ack_window_in = size;
                Vec::new()
            }

            Message::SetPeerBandwidth { size, limit_type } => {
                self.peer_bandwidth = Some((size, limit_type));
                // The expected reply is a window acknowledgement of the
                // same size.
                vec![self.send(Message::WindowAckSize { size }, 0, false)?]
            }

            Message::Audio { data } => self.handle_media(payload.message_stream_id, data, payload.timestamp, true),

            Message::Video { data } => self.handle_media(payload.message_stream_id, data, payload.timestamp, false),

            Message::Command {
                name,
                transaction_id,
                object,
                args,
            } => self.handle_command(payload.message_stream_id, name, transaction_id, object, args)?,

            Message::Data { values } => {
                self.handle_data(values, payload.message_stream_id, payload.timestamp)?
            }

            Message::Unknown { type_id: 16, .. } | Message::Unknown { type_id: 19, .. } => {
                debug!("ignoring shared object message");
                Vec::new()
            }

            Message::Unknown { .. } => vec![SessionResult::UnhandleableMessageReceived(payload)],
        };

        Ok(results)
    }

    fn handle_user_control(
        &mut self,
        event: UserControlEvent,
    ) -> Result<Vec<SessionResult>, SessionError> {
        let results = match event {
            UserControlEvent::PingRequest { timestamp } => {
                vec![self.send(
                    Message::UserControl(UserControlEvent::PingResponse { timestamp }),
                    0,
                    false,
                )?]
            }

            UserControlEvent::PingResponse { timestamp } => {
                self.outstanding_ping = None;
                vec![SessionResult::RaisedEvent(
                    SessionEvent::PingResponseReceived { timestamp },
                )]
            }

            UserControlEvent::SetBufferLength {
                stream_id,
                buffer_length,
            } => {
                self.buffer_lengths.insert(stream_id, buffer_length);
                Vec::new()
            }

            other => {
                debug!(event = ?other, "user control event noted");
                Vec::new()
            }
        };

        Ok(results)
    }

    fn handle_media(
        &mut self,
        stream_id: u32,
        data: Bytes,
        timestamp: Timestamp,
        is_audio: bool,
    ) -> Vec<SessionResult> {
        let (app_name, stream_key) = match self.publishing_stream(stream_id) {
            Some(names) => names,
            None => {
                trace!(stream_id, "media message outside a publishing stream dropped");
                return Vec::new();
            }
        };

        let event = if is_audio {
            SessionEvent::AudioDataReceived {
                app_name,
                stream_key,
                data,
                timestamp,
            }
        } else {
            SessionEvent::VideoDataReceived {
                app_name,
                stream_key,
                data,
                timestamp,
            }
        };

        vec![SessionResult::RaisedEvent(event)]
    }

    fn handle_command(
        &mut self,
        stream_id: u32,
        name: String,
        transaction_id: f64,
        object: Amf0Value,
        args: Vec<Amf0Value>,
    ) -> Result<Vec<SessionResult>, SessionError> {
        match name.as_str() {
            "connect" => self.command_connect(transaction_id, object),
            "createStream" => self.command_create_stream(transaction_id),
            "releaseStream" | "FCPublish" | "FCUnpublish" => {
                Ok(vec![self.result_command(
                    transaction_id,
                    Amf0Value::Null,
                    vec![Amf0Value::Null],
                    0,
                )?])
            }
            "publish" => self.command_publish(stream_id, transaction_id, args),
            "play" => self.command_play(stream_id, transaction_id, args),
            "deleteStream" => self.command_delete_stream(args),
            "closeStream" => self.command_close_stream(stream_id),
            _ => Ok(vec![SessionResult::RaisedEvent(
                SessionEvent::UnhandleableAmf0Command {
                    command_name: name,
                    transaction_id,
                    command_object: object,
                    additional_values: args,
                },
            )]),
        }
    }

    fn command_connect(
        &mut self,
        transaction_id: f64,
        object: Amf0Value,
    ) -> Result<Vec<SessionResult>, SessionError> {
        if self.state != ConnectionState::Connecting {
            let packet = self.error_command(
                transaction_id,
                "NetConnection.Connect.Failed",
                "Already connected.",
                0,
            )?;
            return Ok(vec![packet]);
        }

        let properties = match object {
            Amf0Value::Object(properties) => properties,
            _ => {
                let packet = self.error_command(
                    transaction_id,
                    "NetConnection.Connect.Failed",
                    "No command object supplied.",
                    0,
                )?;
                return Ok(vec![packet]);
            }
        };

        let mut app_name = None;
        let mut tc_url = None;
        for (key, value) in properties {
            match key.as_str() {
                "app" => app_name = value.get_string(),
                "tcUrl" => tc_url = value.get_string(),
                "objectEncoding" => {
                    self.object_encoding = value.get_number().unwrap_or(0.0);
                }
                _ => (),
            }
        }

        let app_name = match app_name {
            Some(app_name) if !app_name.is_empty() => app_name,
            _ => {
                let packet = self.error_command(
                    transaction_id,
                    "NetConnection.Connect.Failed",
                    "No app name supplied.",
                    0,
                )?;
                return Ok(vec![packet]);
            }
        };

        let request_id = self.queue_request(PendingRequest::Connect {
            app_name: app_name.clone(),
            transaction_id,
        });

        Ok(vec![SessionResult::RaisedEvent(
            SessionEvent::ConnectionRequested {
                request_id,
                app_name,
                tc_url,
                object_encoding: self.object_encoding,
            },
        )])
    }

    fn command_create_stream(
        &mut self,
        transaction_id: f64,
    ) -> Result<Vec<SessionResult>, SessionError> {
        if self.state != ConnectionState::Connected {
            let packet = self.error_command(
                transaction_id,
                "NetConnection.Call.Failed",
                "Cannot create a stream before connecting.",
                0,
            )?;
            return Ok(vec![packet]);
        }

        let stream_id = self.next_stream_id;
        self.next_stream_id += 1;
        self.active_streams.insert(
            stream_id,
            ActiveStream {
                state: StreamState::Created,
            },
        );

        Ok(vec![self.result_command(
            transaction_id,
            Amf0Value::Null,
            vec![Amf0Value::Number(stream_id as f64)],
            0,
        )?])
    }

    fn command_publish(
        &mut self,
        stream_id: u32,
        transaction_id: f64,
        mut args: Vec<Amf0Value>,
    ) -> Result<Vec<SessionResult>, SessionError> {
        if self.state != ConnectionState::Connected || self.connected_app.is_none() {
            let packet = self.error_command(
                transaction_id,
                "NetStream.Publish.BadName",
                "Cannot publish before connecting.",
                stream_id,
            )?;
            return Ok(vec![packet]);
        }

        if args.is_empty() {
            let packet = self.error_command(
                transaction_id,
                "NetStream.Publish.BadName",
                "No stream key supplied.",
                stream_id,
            )?;
            return Ok(vec![packet]);
        }

        let stream_key = match args.remove(0) {
            Amf0Value::Utf8String(stream_key) => stream_key,
            _ => {
                let packet = self.error_command(
                    transaction_id,
                    "NetStream.Publish.BadName",
                    "Stream key was not a string.",
                    stream_id,
                )?;
                return Ok(vec![packet]);
            }
        };

        // Publish type defaults to live when absent; OBS always sends it.
        let mode = match args.first() {
            None => PublishMode::Live,
            Some(Amf0Value::Utf8String(raw)) => match raw.as_str() {
                "live" => PublishMode::Live,
                "record" => PublishMode::Record,
                "append" => PublishMode::Append,
                _ => {
                    let packet = self.error_command(
                        transaction_id,
                        "NetStream.Publish.BadName",
                        "Invalid publish type.",
                        stream_id,
                    )?;
                    return Ok(vec![packet]);
                }
            },
            Some(_) => {
                let packet = self.error_command(
                    transaction_id,
                    "NetStream.Publish.BadName",
                    "Invalid publish type.",
                    stream_id,
                )?;
                return Ok(vec![packet]);
            }
        };

        match self.active_streams.get(&stream_id).map(|s| &s.state) {
            Some(StreamState::Created) => (),
            _ => {
                let packet = self.error_command(
                    transaction_id,
                    "NetStream.Publish.BadName",
                    "Publish attempted on an unavailable stream.",
                    stream_id,
                )?;
                return Ok(vec![packet]);
            }
        }

        let app_name = self.connected_app.clone().unwrap_or_default();
        let request_id = self.queue_request(PendingRequest::Publish {
            stream_key: stream_key.clone(),
            mode,
            stream_id,
        });

        Ok(vec![SessionResult::RaisedEvent(
            SessionEvent::PublishStreamRequested {
                request_id,
                app_name,
                stream_key,
                mode,
                stream_id,
            },
        )])
    }

    fn command_play(
        &mut self,
        stream_id: u32,
        transaction_id: f64,
        mut args: Vec<Amf0Value>,
    ) -> Result<Vec<SessionResult>, SessionError> {
        if self.state != ConnectionState::Connected || self.connected_app.is_none() {
            let packet = self.error_command(
                transaction_id,
                "NetStream.Play.Failed",
                "Cannot play before connecting.",
                stream_id,
            )?;
            return Ok(vec![packet]);
        }

        let stream_key = match args.is_empty() {
            false => match args.remove(0) {
                Amf0Value::Utf8String(stream_key) => stream_key,
                _ => {
                    let packet = self.error_command(
                        transaction_id,
                        "NetStream.Play.Failed",
                        "Stream key was not a string.",
                        stream_id,
                    )?;
                    return Ok(vec![packet]);
                }
            },
            true => {
                let packet = self.error_command(
                    transaction_id,
                    "NetStream.Play.Failed",
                    "No stream key supplied.",
                    stream_id,
                )?;
                return Ok(vec![packet]);
            }
        };

        match self.active_streams.get(&stream_id).map(|s| &s.state) {
            Some(StreamState::Created) => (),
            _ => {
                let packet = self.error_command(
                    transaction_id,
                    "NetStream.Play.Failed",
                    "Play attempted on an unavailable stream.",
                    stream_id,
                )?;
                return Ok(vec![packet]);
            }
        }

        let app_name = self.connected_app.clone().unwrap_or_default();
        let request_id = self.queue_request(PendingRequest::Play {
            stream_key: stream_key.clone(),
            stream_id,
        });

        Ok(vec![SessionResult::RaisedEvent(
            SessionEvent::PlayStreamRequested {
                request_id,
                app_name,
                stream_key,
                stream_id,
            },
        )])
    }

    fn command_delete_stream(
        &mut self,
        args: Vec<Amf0Value>,
    ) -> Result<Vec<SessionResult>, SessionError> {
        let stream_id = match args.into_iter().next().and_then(|v| v.get_number()) {
            Some(id) => id as u32,
            None => {
                debug!("deleteStream without a stream id ignored");
                return Ok(Vec::new());
            }
        };

        Ok(self.release_stream(stream_id))
    }

    fn command_close_stream(&mut self, stream_id: u32) -> Result<Vec<SessionResult>, SessionError> {
        Ok(self.release_stream(stream_id))
    }

    /// Tears a stream down; no reply is owed, but the application hears
    /// about finished publishes and plays.
    fn release_stream(&mut self, stream_id: u32) -> Vec<SessionResult> {
        let app_name = self.connected_app.clone().unwrap_or_default();
        let stream = match self.active_streams.remove(&stream_id) {
            Some(stream) => stream,
            None => return Vec::new(),
        };

        self.buffer_lengths.remove(&stream_id);
        debug!(stream_id, "stream released");

        match stream.state {
            StreamState::Publishing { stream_key, .. } => vec![SessionResult::RaisedEvent(
                SessionEvent::PublishStreamFinished {
                    app_name,
                    stream_key,
                },
            )],
            StreamState::Playing { stream_key } => vec![SessionResult::RaisedEvent(
                SessionEvent::PlayStreamFinished {
                    app_name,
                    stream_key,
                },
            )],
            StreamState::Created => Vec::new(),
        }
    }

    fn handle_data(
        &mut self,
        mut values: Vec<Amf0Value>,
        stream_id: u32,
        timestamp: Timestamp,
    ) -> Result<Vec<SessionResult>, SessionError> {
        if values.is_empty() {
            return Ok(Vec::new());
        }

        let (app_name, stream_key) = match self.publishing_stream(stream_id) {
            Some(names) => names,
            None => {
                trace!(stream_id, "data message outside a publishing stream dropped");
                return Ok(Vec::new());
            }
        };

        // OBS and FFmpeg wrap metadata in @setDataFrame; some encoders send
        // onMetaData bare.
        if matches!(&values[0], Amf0Value::Utf8String(s) if s == "@setDataFrame") {
            values.remove(0);
        }

        if matches!(values.first(), Some(Amf0Value::Utf8String(s)) if s == "onMetaData") {
            if values.len() < 2 {
                return Ok(Vec::new());
            }

            let properties = match values.remove(1).get_object_properties() {
                Some(properties) => properties,
                None => return Ok(Vec::new()),
            };

            return Ok(vec![SessionResult::RaisedEvent(
                SessionEvent::StreamMetadataChanged {
                    app_name,
                    stream_key,
                    metadata: StreamMetadata::from_properties(properties),
                },
            )]);
        }

        // Anything else a publisher scripts into the stream still belongs
        // to the consumer.
        Ok(vec![SessionResult::RaisedEvent(
            SessionEvent::StreamDataReceived {
                app_name,
                stream_key,
                timestamp,
                values,
            },
        )])
    }

    fn accept_connect(
        &mut self,
        app_name: String,
        transaction_id: f64,
    ) -> Result<Vec<SessionResult>, SessionError> {
        self.state = ConnectionState::Connected;
        self.connected_app = Some(app_name);

        let window = self.send(
            Message::WindowAckSize {
                size: self.config.window_ack_size,
            },
            0,
            true,
        )?;

        let bandwidth = self.send(
            Message::SetPeerBandwidth {
                size: self.config.peer_bandwidth,
                limit_type: self.config.peer_bandwidth_limit,
            },
            0,
            true,
        )?;

        let begin = self.send(
            Message::UserControl(UserControlEvent::StreamBegin { stream_id: 0 }),
            0,
            true,
        )?;

        let command_object = Amf0Value::Object(vec![
            (
                "fmsVer".to_string(),
                Amf0Value::Utf8String(self.config.fms_version.clone()),
            ),
            ("capabilities".to_string(), Amf0Value::Number(31.0)),
            ("mode".to_string(), Amf0Value::Number(1.0)),
        ]);

        let info = Amf0Value::Object(vec![
            (
                "level".to_string(),
                Amf0Value::Utf8String("status".to_string()),
            ),
            (
                "code".to_string(),
                Amf0Value::Utf8String("NetConnection.Connect.Success".to_string()),
            ),
            (
                "description".to_string(),
                Amf0Value::Utf8String("Connection succeeded.".to_string()),
            ),
            (
                "objectEncoding".to_string(),
                Amf0Value::Number(self.object_encoding),
            ),
        ]);

        let result = self.result_command(transaction_id, command_object, vec![info], 0)?;
        Ok(vec![window, bandwidth, begin, result])
    }

    fn accept_publish(
        &mut self,
        stream_key: String,
        mode: PublishMode,
        stream_id: u32,
    ) -> Result<Vec<SessionResult>, SessionError> {
        if let Some(stream) = self.active_streams.get_mut(&stream_id) {
            stream.state = StreamState::Publishing {
                stream_key: stream_key.clone(),
                mode,
            };
        }

        let begin = self.send(
            Message::UserControl(UserControlEvent::StreamBegin { stream_id }),
            0,
            false,
        )?;

        let status = self.on_status_with_details(
            "status",
            "NetStream.Publish.Start",
            &format!("Started publishing {}.", stream_key),
            Some(&stream_key),
            stream_id,
        )?;

        Ok(vec![begin, status])
    }

    fn accept_play(
        &mut self,
        stream_key: String,
        stream_id: u32,
    ) -> Result<Vec<SessionResult>, SessionError> {
        if let Some(stream) = self.active_streams.get_mut(&stream_id) {
            stream.state = StreamState::Playing {
                stream_key: stream_key.clone(),
            };
        }

        let begin = self.send(
            Message::UserControl(UserControlEvent::StreamBegin { stream_id }),
            0,
            false,
        )?;

        let status = self.on_status(
            "status",
            "NetStream.Play.Start",
            &format!("Started playing {}.", stream_key),
            stream_id,
        )?;

        Ok(vec![begin, status])
    }

    /// Finds the app and stream key behind a message stream id, if that
    /// stream is currently publishing.
    fn publishing_stream(&self, stream_id: u32) -> Option<(String, String)> {
        let app_name = self.connected_app.clone()?;
        match self.active_streams.get(&stream_id).map(|s| &s.state) {
            Some(StreamState::Publishing { stream_key, .. }) => {
                Some((app_name, stream_key.clone()))
            }
            _ => None,
        }
    }

    fn queue_request(&mut self, request: PendingRequest) -> u32 {
        let request_id = self.next_request_id;
        self.next_request_id += 1;
        self.pending_requests.insert(request_id, request);
        request_id
    }

    fn maybe_acknowledge(&mut self, results: &mut Vec<SessionResult>) -> Result<(), SessionError> {
        if self.ack_window_in == 0 || self.bytes_since_last_ack < self.ack_window_in as u64 {
            return Ok(());
        }

        let sequence_number = self.bytes_received as u32;
        results.push(self.send(Message::Acknowledgement { sequence_number }, 0, false)?);
        self.bytes_since_last_ack = 0;
        Ok(())
    }

    fn send(
        &mut self,
        message: Message,
        stream_id: u32,
        force_uncompressed: bool,
    ) -> Result<SessionResult, SessionError> {
        let payload = message.into_payload(self.stream_time(), stream_id)?;
        let packet = self.writer.write(&payload, force_uncompressed)?;
        Ok(SessionResult::OutboundResponse(packet))
    }

    fn result_command(
        &mut self,
        transaction_id: f64,
        object: Amf0Value,
        args: Vec<Amf0Value>,
        stream_id: u32,
    ) -> Result<SessionResult, SessionError> {
        self.send(
            Message::Command {
                name: "_result".to_string(),
                transaction_id,
                object,
                args,
            },
            stream_id,
            false,
        )
    }

    fn error_command(
        &mut self,
        transaction_id: f64,
        code: &str,
        description: &str,
        stream_id: u32,
    ) -> Result<SessionResult, SessionError> {
        self.send(
            Message::Command {
                name: "_error".to_string(),
                transaction_id,
                object: Amf0Value::Null,
                args: vec![status_object("error", code, description, None)],
            },
            stream_id,
            false,
        )
    }

    /// Server-initiated notifications carry transaction id 0 and a null
    /// command object.
    fn on_status(
        &mut self,
        level: &str,
        code: &str,
        description: &str,
        stream_id: u32,
    ) -> Result<SessionResult, SessionError> {
        self.on_status_with_details(level, code, description, None, stream_id)
    }

    fn on_status_with_details(
        &mut self,
        level: &str,
        code: &str,
        description: &str,
        details: Option<&str>,
        stream_id: u32,
    ) -> Result<SessionResult, SessionError> {
        self.send(
            Message::Command {
                name: "onStatus".to_string(),
                transaction_id: 0.0,
                object: Amf0Value::Null,
                args: vec![status_object(level, code, description, details)],
            },
            stream_id,
            false,
        )
    }

    fn stream_time(&self) -> Timestamp {
        match self.start_time.elapsed() {
            Ok(duration) => Timestamp::new(duration.as_millis() as u32),
            Err(_) => Timestamp::new(0),
        }
    }
}

fn status_object(level: &str, code: &str, description: &str, details: Option<&str>) -> Amf0Value {
    let mut properties = vec![
        (
            "level".to_string(),
            Amf0Value::Utf8String(level.to_string()),
        ),
        ("code".to_string(), Amf0Value::Utf8String(code.to_string())),
        (
            "description".to_string(),
            Amf0Value::Utf8String(description.to_string()),
        ),
    ];

    if let Some(details) = details {
        properties.push((
            "details".to_string(),
            Amf0Value::Utf8String(details.to_string()),
        ));
    }

    Amf0Value::Object(properties)
}
