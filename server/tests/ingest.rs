//! End-to-end exercises over a loopback socket: a hand-rolled RTMP client
//! performs the handshake and drives the command flow a real publisher
//! would.

use bytes::Bytes;
use inlet_amf0::Amf0Value;
use inlet_rtmp::chunk::{ChunkReader, ChunkWriter};
use inlet_rtmp::messages::{Message, MessageAssembler, UserControlEvent};
use inlet_rtmp::session::PublishMode;
use inlet_rtmp::time::Timestamp;
use inlet_server::{Decision, IngestHandler, IngestServer, MediaFrame, ServerConfig};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::timeout;

const WAIT: Duration = Duration::from_secs(5);

struct RecordingHandler {
    events: mpsc::UnboundedSender<String>,
    accept_publish: bool,
}

impl IngestHandler for RecordingHandler {
    fn on_connect(
        &self,
        _connection_id: u64,
        app_name: &str,
        tc_url: Option<&str>,
        _object_encoding: f64,
    ) -> Decision {
        let _ = self
            .events
            .send(format!("connect:{}:{}", app_name, tc_url.unwrap_or("-")));
        Decision::Accept
    }

    fn on_publish(
        &self,
        _connection_id: u64,
        app_name: &str,
        stream_key: &str,
        mode: PublishMode,
    ) -> Decision {
        let _ = self
            .events
            .send(format!("publish:{}:{}:{:?}", app_name, stream_key, mode));
        if self.accept_publish {
            Decision::Accept
        } else {
            Decision::Reject
        }
    }

    fn on_media(&self, _connection_id: u64, frame: &MediaFrame) {
        let _ = self.events.send(format!(
            "media:{:?}:{}:{}",
            frame.kind,
            frame.stream_key,
            frame.data.len()
        ));
    }

    fn on_close(&self, _connection_id: u64, reason: &str) {
        let _ = self.events.send(format!("close:{}", reason));
    }
}

async fn start_server(
    accept_publish: bool,
) -> (std::net::SocketAddr, mpsc::UnboundedReceiver<String>) {
    let (sender, receiver) = mpsc::unbounded_channel();
    let handler = Arc::new(RecordingHandler {
        events: sender,
        accept_publish,
    });

    let server = IngestServer::bind(ServerConfig {
        bind_addr: "127.0.0.1:0".to_string(),
        ..ServerConfig::default()
    })
    .await
    .unwrap();
    let addr = server.local_addr().unwrap();

    tokio::spawn(async move {
        let _ = server.run(handler).await;
    });

    (addr, receiver)
}

/// The test's publisher: handshake plus a chunk codec of its own.
struct TestPublisher {
    stream: TcpStream,
    reader: ChunkReader,
    assembler: MessageAssembler,
    writer: ChunkWriter,
    queue: VecDeque<Message>,
}

impl TestPublisher {
    async fn connect(addr: std::net::SocketAddr) -> TestPublisher {
        let mut stream = TcpStream::connect(addr).await.unwrap();

        // c0 + an all-zero c1.
        let mut hello = vec![3_u8];
        hello.extend([0_u8; 1536]);
        stream.write_all(&hello).await.unwrap();

        // s0 + s1 + s2 arrive together once c1 lands.
        let mut response = [0_u8; 1537 + 1536];
        timeout(WAIT, stream.read_exact(&mut response))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(response[0], 3, "server must answer with version 3");

        let s2 = &response[1537..];
        assert!(
            s2.iter().all(|&b| b == 0),
            "s2 must echo our all-zero c1"
        );

        // c2 echoes s1 verbatim.
        let s1 = response[1..1537].to_vec();
        stream.write_all(&s1).await.unwrap();

        TestPublisher {
            stream,
            reader: ChunkReader::new(),
            assembler: MessageAssembler::new(),
            writer: ChunkWriter::new(),
            queue: VecDeque::new(),
        }
    }

    async fn send(&mut self, message: Message, stream_id: u32) {
        let payload = message.into_payload(Timestamp::new(0), stream_id).unwrap();
        let packet = self.writer.write(&payload, false).unwrap();
        self.stream.write_all(&packet.bytes).await.unwrap();
    }

    async fn next_message(&mut self) -> Message {
        loop {
            if let Some(message) = self.queue.pop_front() {
                return message;
            }

            let mut buffer = [0_u8; 4096];
            let bytes_read = timeout(WAIT, self.stream.read(&mut buffer))
                .await
                .expect("timed out waiting for the server")
                .unwrap();
            assert!(bytes_read > 0, "server closed the connection unexpectedly");

            let mut input: &[u8] = &buffer[..bytes_read];
            while let Some(chunk) = self.reader.read_chunk(input).unwrap() {
                input = &[];
                for payload in self.assembler.push(chunk) {
                    let message = payload.to_message().unwrap();
                    if let Message::SetChunkSize { size } = &message {
                        self.reader.set_chunk_size(*size).unwrap();
                    }
                    self.queue.push_back(message);
                }
            }
        }
    }

    /// Skips ahead to the next command message.
    async fn next_command(&mut self) -> (String, f64, Amf0Value, Vec<Amf0Value>) {
        loop {
            if let Message::Command {
                name,
                transaction_id,
                object,
                args,
            } = self.next_message().await
            {
                return (name, transaction_id, object, args);
            }
        }
    }
}

fn connect_command(app: &str) -> Message {
    Message::Command {
        name: "connect".to_string(),
        transaction_id: 1.0,
        object: Amf0Value::Object(vec![
            (
                "app".to_string(),
                Amf0Value::Utf8String(app.to_string()),
            ),
            (
                "tcUrl".to_string(),
                Amf0Value::Utf8String(format!("rtmp://127.0.0.1/{}", app)),
            ),
            ("objectEncoding".to_string(), Amf0Value::Number(0.0)),
        ]),
        args: vec![],
    }
}

#[tokio::test]
async fn publisher_can_connect_publish_and_send_media() {
    let (addr, mut events) = start_server(true).await;
    let mut publisher = TestPublisher::connect(addr).await;

    // connect
    publisher.send(connect_command("live"), 0).await;
    let (name, transaction_id, object, args) = publisher.next_command().await;
    assert_eq!(name, "_result");
    assert_eq!(transaction_id, 1.0);
    match object {
        Amf0Value::Object(properties) => {
            assert!(properties
                .iter()
                .any(|(k, v)| k == "capabilities" && *v == Amf0Value::Number(31.0)));
        }
        x => panic!("Expected command object, got {:?}", x),
    }
    match &args[0] {
        Amf0Value::Object(properties) => {
            assert!(properties.iter().any(|(k, v)| {
                k == "code"
                    && *v == Amf0Value::Utf8String("NetConnection.Connect.Success".to_string())
            }));
        }
        x => panic!("Expected info object, got {:?}", x),
    }

    let event = timeout(WAIT, events.recv()).await.unwrap().unwrap();
    assert_eq!(event, "connect:live:rtmp://127.0.0.1/live");

    // createStream
    publisher
        .send(
            Message::Command {
                name: "createStream".to_string(),
                transaction_id: 2.0,
                object: Amf0Value::Null,
                args: vec![],
            },
            0,
        )
        .await;
    let (name, transaction_id, _, args) = publisher.next_command().await;
    assert_eq!(name, "_result");
    assert_eq!(transaction_id, 2.0);
    let stream_id = match args[0] {
        Amf0Value::Number(id) => id as u32,
        ref x => panic!("Expected stream id, got {:?}", x),
    };
    assert_eq!(stream_id, 1);

    // publish
    publisher
        .send(
            Message::Command {
                name: "publish".to_string(),
                transaction_id: 3.0,
                object: Amf0Value::Null,
                args: vec![
                    Amf0Value::Utf8String("mystream".to_string()),
                    Amf0Value::Utf8String("live".to_string()),
                ],
            },
            stream_id,
        )
        .await;

    let begin = publisher.next_message().await;
    assert_eq!(
        begin,
        Message::UserControl(UserControlEvent::StreamBegin { stream_id })
    );

    let (name, _, _, args) = publisher.next_command().await;
    assert_eq!(name, "onStatus");
    match &args[0] {
        Amf0Value::Object(properties) => {
            assert!(properties.iter().any(|(k, v)| {
                k == "code" && *v == Amf0Value::Utf8String("NetStream.Publish.Start".to_string())
            }));
        }
        x => panic!("Expected status object, got {:?}", x),
    }

    let event = timeout(WAIT, events.recv()).await.unwrap().unwrap();
    assert_eq!(event, "publish:live:mystream:Live");

    // media
    publisher
        .send(
            Message::Audio {
                data: Bytes::from(vec![0xaf; 100]),
            },
            stream_id,
        )
        .await;

    let event = timeout(WAIT, events.recv()).await.unwrap().unwrap();
    assert_eq!(event, "media:Audio:mystream:100");
}

#[tokio::test]
async fn rejected_publish_reaches_the_client_as_bad_name() {
    let (addr, mut events) = start_server(false).await;
    let mut publisher = TestPublisher::connect(addr).await;

    publisher.send(connect_command("live"), 0).await;
    let (name, ..) = publisher.next_command().await;
    assert_eq!(name, "_result");

    publisher
        .send(
            Message::Command {
                name: "createStream".to_string(),
                transaction_id: 2.0,
                object: Amf0Value::Null,
                args: vec![],
            },
            0,
        )
        .await;
    let _ = publisher.next_command().await;

    publisher
        .send(
            Message::Command {
                name: "publish".to_string(),
                transaction_id: 3.0,
                object: Amf0Value::Null,
                args: vec![
                    Amf0Value::Utf8String("secret".to_string()),
                    Amf0Value::Utf8String("live".to_string()),
                ],
            },
            1,
        )
        .await;

    let (name, _, _, args) = publisher.next_command().await;
    assert_eq!(name, "onStatus");
    match &args[0] {
        Amf0Value::Object(properties) => {
            assert!(properties.iter().any(|(k, v)| {
                k == "code" && *v == Amf0Value::Utf8String("NetStream.Publish.BadName".to_string())
            }));
        }
        x => panic!("Expected status object, got {:?}", x),
    }

    let mut saw_publish_event = false;
    while let Ok(Some(event)) = timeout(WAIT, events.recv()).await {
        if event.starts_with("publish:") {
            saw_publish_event = true;
            break;
        }
    }
    assert!(saw_publish_event, "handler should have been consulted");
}

#[tokio::test]
async fn corrupted_handshake_echo_closes_the_connection() {
    let (addr, _events) = start_server(true).await;
    let mut stream = TcpStream::connect(addr).await.unwrap();

    let mut hello = vec![3_u8];
    hello.extend([0_u8; 1536]);
    stream.write_all(&hello).await.unwrap();

    let mut response = [0_u8; 1537 + 1536];
    timeout(WAIT, stream.read_exact(&mut response))
        .await
        .unwrap()
        .unwrap();

    // Echo s1 with one byte flipped.
    let mut echo = response[1..1537].to_vec();
    echo[200] ^= 0xff;
    stream.write_all(&echo).await.unwrap();

    // The server must drop the connection rather than proceed.
    let mut buffer = [0_u8; 64];
    let result = timeout(WAIT, stream.read(&mut buffer)).await.unwrap();
    assert_eq!(result.unwrap(), 0, "expected EOF after a bad echo");
}
