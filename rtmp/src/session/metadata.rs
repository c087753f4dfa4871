use inlet_amf0::Amf0Value;

/// Stream properties a publisher advertises via `onMetaData`.  Everything is
/// optional; encoders send whatever subset they feel like.
#[derive(PartialEq, Debug, Clone, Default)]
pub struct StreamMetadata {
    pub video_width: Option<u32>,
    pub video_height: Option<u32>,
    pub video_codec: Option<String>,
    pub video_frame_rate: Option<f32>,
    pub video_bitrate_kbps: Option<u32>,
    pub audio_codec: Option<String>,
    pub audio_bitrate_kbps: Option<u32>,
    pub audio_sample_rate: Option<u32>,
    pub audio_channels: Option<u32>,
    pub audio_is_stereo: Option<bool>,
    pub encoder: Option<String>,
}

impl StreamMetadata {
    /// Picks the known properties out of a decoded metadata object.
    pub fn from_properties(properties: Vec<(String, Amf0Value)>) -> StreamMetadata {
        let mut metadata = StreamMetadata::default();

        for (key, value) in properties {
            match key.as_str() {
                "width" => metadata.video_width = value.get_number().map(|x| x as u32),
                "height" => metadata.video_height = value.get_number().map(|x| x as u32),
                "videocodecid" => metadata.video_codec = value.get_string(),
                "videodatarate" => {
                    metadata.video_bitrate_kbps = value.get_number().map(|x| x as u32)
                }
                "framerate" => metadata.video_frame_rate = value.get_number().map(|x| x as f32),
                "audiocodecid" => metadata.audio_codec = value.get_string(),
                "audiodatarate" => {
                    metadata.audio_bitrate_kbps = value.get_number().map(|x| x as u32)
                }
                "audiosamplerate" => {
                    metadata.audio_sample_rate = value.get_number().map(|x| x as u32)
                }
                "audiochannels" => metadata.audio_channels = value.get_number().map(|x| x as u32),
                "stereo" => metadata.audio_is_stereo = value.get_boolean(),
                "encoder" => metadata.encoder = value.get_string(),
                _ => (),
            }
        }

        metadata
    }
}
