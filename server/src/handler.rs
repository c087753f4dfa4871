use bytes::Bytes;
use inlet_amf0::Amf0Value;
use inlet_rtmp::session::{PublishMode, StreamMetadata};
use inlet_rtmp::time::Timestamp;

/// The application's answer to a connect/publish/play request.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum Decision {
    Accept,
    Reject,
}

#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum MediaKind {
    Audio,
    Video,
}

/// One audio or video message from a publishing stream.
#[derive(Debug, Clone)]
pub struct MediaFrame {
    pub kind: MediaKind,
    pub stream_key: String,
    pub timestamp: Timestamp,
    pub data: Bytes,
}

/// What the embedding application plugs into the server: admission control
/// for publishers and the stream of everything they send.
///
/// Callbacks run synchronously on the connection's task, between a read and
/// the next one.  A handler that blocks stalls that connection's reads and
/// nothing else; TCP backpressure does the rest.  Handlers are shared
/// across connections, so state they keep must be internally synchronized.
pub trait IngestHandler: Send + Sync + 'static {
    /// A client issued `connect`.  Rejecting sends
    /// `NetConnection.Connect.Rejected` and leaves the connection open.
    fn on_connect(
        &self,
        connection_id: u64,
        app_name: &str,
        tc_url: Option<&str>,
        object_encoding: f64,
    ) -> Decision {
        let _ = (connection_id, app_name, tc_url, object_encoding);
        Decision::Accept
    }

    /// A client issued `publish`.  Rejecting sends
    /// `NetStream.Publish.BadName`.
    fn on_publish(
        &self,
        connection_id: u64,
        app_name: &str,
        stream_key: &str,
        mode: PublishMode,
    ) -> Decision {
        let _ = (connection_id, app_name, stream_key, mode);
        Decision::Accept
    }

    /// A client issued `play`.  Rejecting sends `NetStream.Play.Failed`.
    fn on_play(&self, connection_id: u64, app_name: &str, stream_key: &str) -> Decision {
        let _ = (connection_id, app_name, stream_key);
        Decision::Accept
    }

    /// An audio or video message arrived on an accepted publish.
    fn on_media(&self, connection_id: u64, frame: &MediaFrame) {
        let _ = (connection_id, frame);
    }

    /// The publisher sent or updated its `onMetaData`.
    fn on_metadata(
        &self,
        connection_id: u64,
        app_name: &str,
        stream_key: &str,
        metadata: &StreamMetadata,
    ) {
        let _ = (connection_id, app_name, stream_key, metadata);
    }

    /// A scripted data message other than metadata arrived on an accepted
    /// publish (cue points, `onTextData`, and the like).
    fn on_data(&self, connection_id: u64, stream_key: &str, values: &[Amf0Value]) {
        let _ = (connection_id, stream_key, values);
    }

    /// The connection went away, normally or otherwise.
    fn on_close(&self, connection_id: u64, reason: &str) {
        let _ = (connection_id, reason);
    }
}
