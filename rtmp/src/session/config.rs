use crate::messages::PeerBandwidthLimit;

/// Tunables for a server session.
#[derive(Clone, Debug)]
pub struct SessionConfig {
    /// Version string advertised in the connect `_result`
    pub fms_version: String,

    /// Outbound chunk size, announced with SET_CHUNK_SIZE as soon as the
    /// session starts.  Must be at least the protocol default of 128.
    pub chunk_size: u32,

    /// Window size advertised to the peer on connect
    pub window_ack_size: u32,

    /// Peer bandwidth advertised on connect
    pub peer_bandwidth: u32,

    /// How strictly the advertised bandwidth is meant
    pub peer_bandwidth_limit: PeerBandwidthLimit,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            fms_version: "FMS/3,0,1,123".to_string(),
            chunk_size: 4096,
            window_ack_size: 2_500_000,
            peer_bandwidth: 2_500_000,
            peer_bandwidth_limit: PeerBandwidthLimit::Dynamic,
        }
    }
}
