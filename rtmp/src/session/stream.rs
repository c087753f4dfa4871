/// The kind of publishing a client asked for.
#[derive(Eq, PartialEq, Clone, Copy, Debug)]
pub enum PublishMode {
    /// Live data, not recorded anywhere
    Live,
    /// Record to a new file
    Record,
    /// Append to an existing recording
    Append,
}

/// What a message stream created by `createStream` is currently doing.
#[derive(Debug, Clone)]
pub enum StreamState {
    Created,
    Publishing {
        stream_key: String,
        mode: PublishMode,
    },
    Playing {
        stream_key: String,
    },
}

#[derive(Debug)]
pub struct ActiveStream {
    pub state: StreamState,
}
