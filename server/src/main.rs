use inlet_server::{IngestHandler, IngestServer, MediaFrame, ServerConfig};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Accepts every stream and logs what flows through; the seam where a real
/// deployment forwards frames onward.
struct LogEverything;

impl IngestHandler for LogEverything {
    fn on_media(&self, connection_id: u64, frame: &MediaFrame) {
        tracing::trace!(
            connection_id,
            stream_key = frame.stream_key.as_str(),
            kind = ?frame.kind,
            bytes = frame.data.len(),
            timestamp = frame.timestamp.value,
            "media frame"
        );
    }

    fn on_close(&self, connection_id: u64, reason: &str) {
        info!(connection_id, reason, "publisher disconnected");
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let mut config = ServerConfig::default();
    if let Some(bind_addr) = std::env::args().nth(1) {
        config.bind_addr = bind_addr;
    }

    let server = IngestServer::bind(config).await?;
    server.run(Arc::new(LogEverything)).await?;
    Ok(())
}
