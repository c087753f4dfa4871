use crate::config::ServerConfig;
use crate::error::ConnectionError;
use crate::handler::{Decision, IngestHandler, MediaFrame, MediaKind};
use inlet_rtmp::handshake::{Handshake, HandshakeOutcome};
use inlet_rtmp::session::{ServerSession, SessionEvent, SessionResult};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{debug, trace, warn};

const READ_BUFFER_SIZE: usize = 4096;

/// Drives one accepted socket from handshake to close.  Returns `Ok` on a
/// normal peer disconnect.
pub(crate) async fn serve<H: IngestHandler>(
    connection_id: u64,
    mut stream: TcpStream,
    config: ServerConfig,
    handler: Arc<H>,
) -> Result<(), ConnectionError> {
    let remaining = run_handshake(&mut stream, config.read_timeout).await?;
    debug!(connection_id, "handshake complete");

    let (mut session, initial_results) = ServerSession::new(config.session.clone())?;
    let mut driver = Driver {
        connection_id,
        handler,
    };

    driver
        .process_results(&mut session, &mut stream, initial_results)
        .await?;

    // Bytes the client sent on the heels of its handshake echo.
    let results = session.handle_input(&remaining)?;
    driver.process_results(&mut session, &mut stream, results).await?;

    let mut buffer = [0_u8; READ_BUFFER_SIZE];
    loop {
        let bytes_read = read_with_timeout(&mut stream, &mut buffer, config.read_timeout).await?;
        if bytes_read == 0 {
            // EOF after the handshake is an orderly goodbye.
            return Ok(());
        }

        let results = session.handle_input(&buffer[..bytes_read])?;
        driver.process_results(&mut session, &mut stream, results).await?;
    }
}

async fn run_handshake(
    stream: &mut TcpStream,
    read_timeout: Option<Duration>,
) -> Result<Vec<u8>, ConnectionError> {
    let mut handshake = Handshake::new();
    let mut buffer = [0_u8; READ_BUFFER_SIZE];

    loop {
        let bytes_read = read_with_timeout(stream, &mut buffer, read_timeout).await?;
        if bytes_read == 0 {
            return Err(ConnectionError::ClosedDuringHandshake);
        }

        match handshake.process_bytes(&buffer[..bytes_read])? {
            HandshakeOutcome::InProgress { response } => {
                if !response.is_empty() {
                    stream.write_all(&response).await?;
                }
            }

            HandshakeOutcome::Done {
                response,
                remaining,
            } => {
                if !response.is_empty() {
                    stream.write_all(&response).await?;
                }
                return Ok(remaining);
            }
        }
    }
}

async fn read_with_timeout(
    stream: &mut TcpStream,
    buffer: &mut [u8],
    read_timeout: Option<Duration>,
) -> Result<usize, ConnectionError> {
    let read = stream.read(buffer);
    match read_timeout {
        None => Ok(read.await?),
        Some(limit) => match tokio::time::timeout(limit, read).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(ConnectionError::Timeout),
        },
    }
}

struct Driver<H> {
    connection_id: u64,
    handler: Arc<H>,
}

impl<H: IngestHandler> Driver<H> {
    /// Writes outbound packets and feeds events to the handler, keeping the
    /// wire order: replies generated by an accept/reject go out before any
    /// result queued after the event that triggered them.
    async fn process_results(
        &mut self,
        session: &mut ServerSession,
        stream: &mut TcpStream,
        results: Vec<SessionResult>,
    ) -> Result<(), ConnectionError> {
        let mut queue: VecDeque<SessionResult> = results.into();

        while let Some(result) = queue.pop_front() {
            match result {
                SessionResult::OutboundResponse(packet) => {
                    stream.write_all(&packet.bytes).await?;
                }

                SessionResult::RaisedEvent(event) => {
                    let follow_up = self.handle_event(session, event)?;
                    for result in follow_up.into_iter().rev() {
                        queue.push_front(result);
                    }
                }

                SessionResult::UnhandleableMessageReceived(payload) => {
                    debug!(
                        connection_id = self.connection_id,
                        type_id = payload.type_id,
                        "unhandleable message received"
                    );
                }
            }
        }

        Ok(())
    }

    fn handle_event(
        &mut self,
        session: &mut ServerSession,
        event: SessionEvent,
    ) -> Result<Vec<SessionResult>, ConnectionError> {
        let results = match event {
            SessionEvent::ConnectionRequested {
                request_id,
                app_name,
                tc_url,
                object_encoding,
            } => {
                let decision = self.handler.on_connect(
                    self.connection_id,
                    &app_name,
                    tc_url.as_deref(),
                    object_encoding,
                );
                self.answer(session, request_id, decision, "connect", &app_name)?
            }

            SessionEvent::PublishStreamRequested {
                request_id,
                app_name,
                stream_key,
                mode,
                ..
            } => {
                let decision =
                    self.handler
                        .on_publish(self.connection_id, &app_name, &stream_key, mode);
                self.answer(session, request_id, decision, "publish", &stream_key)?
            }

            SessionEvent::PlayStreamRequested {
                request_id,
                app_name,
                stream_key,
                ..
            } => {
                let decision = self
                    .handler
                    .on_play(self.connection_id, &app_name, &stream_key);
                self.answer(session, request_id, decision, "play", &stream_key)?
            }

            SessionEvent::AudioDataReceived {
                stream_key,
                data,
                timestamp,
                ..
            } => {
                let frame = MediaFrame {
                    kind: MediaKind::Audio,
                    stream_key,
                    timestamp,
                    data,
                };
                self.handler.on_media(self.connection_id, &frame);
                Vec::new()
            }

            SessionEvent::VideoDataReceived {
                stream_key,
                data,
                timestamp,
                ..
            } => {
                let frame = MediaFrame {
                    kind: MediaKind::Video,
                    stream_key,
                    timestamp,
                    data,
                };
                self.handler.on_media(self.connection_id, &frame);
                Vec::new()
            }

            SessionEvent::StreamMetadataChanged {
                app_name,
                stream_key,
                metadata,
            } => {
                self.handler
                    .on_metadata(self.connection_id, &app_name, &stream_key, &metadata);
                Vec::new()
            }

            SessionEvent::StreamDataReceived {
                stream_key, values, ..
            } => {
                self.handler
                    .on_data(self.connection_id, &stream_key, &values);
                Vec::new()
            }

            SessionEvent::PublishStreamFinished {
                app_name,
                stream_key,
            } => {
                debug!(
                    connection_id = self.connection_id,
                    app_name, stream_key, "publish finished"
                );
                Vec::new()
            }

            SessionEvent::PlayStreamFinished {
                app_name,
                stream_key,
            } => {
                debug!(
                    connection_id = self.connection_id,
                    app_name, stream_key, "play finished"
                );
                Vec::new()
            }

            SessionEvent::UnhandleableAmf0Command { command_name, .. } => {
                debug!(
                    connection_id = self.connection_id,
                    command = command_name.as_str(),
                    "unhandled command"
                );
                Vec::new()
            }

            other => {
                trace!(connection_id = self.connection_id, event = ?other, "session event");
                Vec::new()
            }
        };

        Ok(results)
    }

    fn answer(
        &self,
        session: &mut ServerSession,
        request_id: u32,
        decision: Decision,
        what: &str,
        name: &str,
    ) -> Result<Vec<SessionResult>, ConnectionError> {
        match decision {
            Decision::Accept => Ok(session.accept_request(request_id)?),
            Decision::Reject => {
                warn!(
                    connection_id = self.connection_id,
                    what, name, "request rejected by handler"
                );
                Ok(session.reject_request(request_id)?)
            }
        }
    }
}
