use super::MessagePayload;
use crate::chunk::Chunk;
use bytes::BytesMut;
use std::collections::HashMap;
use tracing::warn;

/// A message being collected from its chunks on one chunk stream.
struct PartialMessage {
    payload: MessagePayload,
    length: u32,
    collected: BytesMut,
}

/// Reassembles chunks into messages, one accumulator per chunk stream.
///
/// Messages are emitted the moment their final chunk arrives, so emission
/// order across chunk streams is completion order.
pub struct MessageAssembler {
    partials: HashMap<u32, PartialMessage>,
}

impl MessageAssembler {
    pub fn new() -> MessageAssembler {
        MessageAssembler {
            partials: HashMap::new(),
        }
    }

    /// Feeds one chunk in.  Usually returns zero or one message; two when a
    /// chunk restarts its stream and the interrupted message is flushed
    /// ahead of a completed new one.
    pub fn push(&mut self, chunk: Chunk) -> Vec<MessagePayload> {
        let mut completed = Vec::new();

        if chunk.starts_message {
            if let Some(interrupted) = self.partials.remove(&chunk.csid) {
                if !interrupted.collected.is_empty() {
                    warn!(
                        csid = chunk.csid,
                        collected = interrupted.collected.len(),
                        expected = interrupted.length,
                        "flushing interrupted message"
                    );
                    completed.push(finish(interrupted));
                }
            }

            let mut collected = BytesMut::with_capacity(chunk.message_length as usize);
            collected.extend_from_slice(&chunk.payload);
            let partial = PartialMessage {
                payload: MessagePayload {
                    timestamp: chunk.timestamp,
                    type_id: chunk.message_type_id,
                    message_stream_id: chunk.message_stream_id,
                    data: Default::default(),
                },
                length: chunk.message_length,
                collected,
            };
            self.partials.insert(chunk.csid, partial);
        } else {
            match self.partials.get_mut(&chunk.csid) {
                Some(partial) => partial.collected.extend_from_slice(&chunk.payload),
                None => {
                    // Continuation of a message that was aborted; nothing to
                    // attach it to.
                    warn!(csid = chunk.csid, "dropping continuation chunk with no message");
                    return completed;
                }
            }
        }

        let done = self
            .partials
            .get(&chunk.csid)
            .map(|partial| partial.collected.len() >= partial.length as usize)
            .unwrap_or(false);

        if done {
            let partial = self.partials.remove(&chunk.csid).unwrap();
            completed.push(finish(partial));
        }

        completed
    }

    /// Drops any message under reassembly on the chunk stream (ABORT).
    pub fn discard(&mut self, csid: u32) {
        self.partials.remove(&csid);
    }
}

impl Default for MessageAssembler {
    fn default() -> Self {
        MessageAssembler::new()
    }
}

fn finish(partial: PartialMessage) -> MessagePayload {
    let mut payload = partial.payload;
    payload.data = partial.collected.freeze();
    payload
}
