use super::stream::PublishMode;

/// A client request the application has not yet accepted or rejected.  The
/// transaction id and stream id are kept so the eventual reply lands on the
/// right command and message stream.
pub enum PendingRequest {
    Connect {
        app_name: String,
        transaction_id: f64,
    },

    Publish {
        stream_key: String,
        mode: PublishMode,
        stream_id: u32,
    },

    Play {
        stream_key: String,
        stream_id: u32,
    },
}
