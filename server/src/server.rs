use crate::config::ServerConfig;
use crate::connection;
use crate::handler::IngestHandler;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};

/// The listening endpoint.  Bind it, then hand `run` a handler; every
/// accepted connection gets its own task and its own session, with no
/// state shared between connections.
pub struct IngestServer {
    listener: TcpListener,
    config: ServerConfig,
}

impl IngestServer {
    pub async fn bind(config: ServerConfig) -> io::Result<IngestServer> {
        let listener = TcpListener::bind(&config.bind_addr).await?;
        Ok(IngestServer { listener, config })
    }

    /// The bound address; useful when the configuration asked for port 0.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accepts connections forever.
    pub async fn run<H: IngestHandler>(self, handler: Arc<H>) -> io::Result<()> {
        info!(addr = %self.local_addr()?, "listening for RTMP connections");

        let mut next_connection_id: u64 = 0;
        loop {
            let (stream, peer_addr) = self.listener.accept().await?;
            let connection_id = next_connection_id;
            next_connection_id += 1;
            info!(connection_id, peer = %peer_addr, "connection accepted");

            let config = self.config.clone();
            let handler = Arc::clone(&handler);
            tokio::spawn(async move {
                let reason = match connection::serve(
                    connection_id,
                    stream,
                    config,
                    Arc::clone(&handler),
                )
                .await
                {
                    Ok(()) => "closed by peer".to_string(),
                    Err(error) => {
                        warn!(connection_id, error = %error, "connection failed");
                        error.to_string()
                    }
                };

                handler.on_close(connection_id, &reason);
                info!(connection_id, reason = reason.as_str(), "connection finished");
            });
        }
    }
}
