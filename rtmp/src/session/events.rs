use super::metadata::StreamMetadata;
use super::stream::PublishMode;
use crate::time::Timestamp;
use bytes::Bytes;
use inlet_amf0::Amf0Value;

/// Something the session wants the embedding application to know about or
/// decide on.
///
/// Events carrying a `request_id` are questions: the application must answer
/// with `accept_request` or `reject_request` before the client hears back.
#[derive(Debug, PartialEq, Clone)]
pub enum SessionEvent {
    /// The peer announced a new maximum size for the chunks it sends
    ClientChunkSizeChanged {
        new_chunk_size: u32,
    },

    /// The client asked to connect to an application name
    ConnectionRequested {
        request_id: u32,
        app_name: String,
        tc_url: Option<String>,
        object_encoding: f64,
    },

    /// The client asked to publish on a stream key
    PublishStreamRequested {
        request_id: u32,
        app_name: String,
        stream_key: String,
        mode: PublishMode,
        stream_id: u32,
    },

    /// A publishing stream was torn down
    PublishStreamFinished {
        app_name: String,
        stream_key: String,
    },

    /// The client asked for playback of a stream key
    PlayStreamRequested {
        request_id: u32,
        app_name: String,
        stream_key: String,
        stream_id: u32,
    },

    /// A playing stream was torn down
    PlayStreamFinished {
        app_name: String,
        stream_key: String,
    },

    /// The publisher sent or updated its stream metadata
    StreamMetadataChanged {
        app_name: String,
        stream_key: String,
        metadata: StreamMetadata,
    },

    /// A data message other than metadata arrived on a publishing stream
    /// (cue points, onTextData, and whatever else the encoder emits)
    StreamDataReceived {
        app_name: String,
        stream_key: String,
        timestamp: Timestamp,
        values: Vec<Amf0Value>,
    },

    /// An audio message arrived on a publishing stream
    AudioDataReceived {
        app_name: String,
        stream_key: String,
        data: Bytes,
        timestamp: Timestamp,
    },

    /// A video message arrived on a publishing stream
    VideoDataReceived {
        app_name: String,
        stream_key: String,
        data: Bytes,
        timestamp: Timestamp,
    },

    /// The peer acknowledged this many received bytes
    AcknowledgementReceived {
        bytes_received: u32,
    },

    /// The peer answered a ping
    PingResponseReceived {
        timestamp: Timestamp,
    },

    /// A command this session has no handling for
    UnhandleableAmf0Command {
        command_name: String,
        transaction_id: f64,
        command_object: Amf0Value,
        additional_values: Vec<Amf0Value>,
    },
}
