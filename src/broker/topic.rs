use crate::Message;
use bytes::Bytes;
use parking_lot::{Mutex, MutexGuard};
use tracing::debug;

/// Append-only message log for one named stream.
///
/// The offset of a message is its index in the log. Every operation on the
/// topic goes through a single mutex, so appends are linearizable and the
/// assigned offsets are gap-free.
pub struct Topic {
    name: String,
    log: Mutex<Log>,
}

#[derive(Default)]
struct Log {
    messages: Vec<Message>,
    payload_bytes: u64,
}

/// Exclusive access to a topic's log, held for the duration of a compound
/// broker operation (cursor lookup, read, cursor update).
pub(crate) struct TopicGuard<'a> {
    name: &'a str,
    log: MutexGuard<'a, Log>,
}

impl Topic {
    pub fn new(name: String) -> Self {
        debug!("Initializing log for topic '{}'", name);
        Self {
            name,
            log: Mutex::new(Log::default()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn append(&self, payload: Bytes) -> u64 {
        self.lock().append(payload)
    }

    pub fn read(&self, offset: u64) -> Option<Message> {
        self.lock().read(offset)
    }

    pub fn size(&self) -> u64 {
        self.lock().size()
    }

    pub fn stats(&self) -> TopicStats {
        let log = self.log.lock();
        TopicStats {
            name: self.name.clone(),
            message_count: log.messages.len() as u64,
            payload_bytes: log.payload_bytes,
        }
    }

    pub(crate) fn lock(&self) -> TopicGuard<'_> {
        TopicGuard {
            name: &self.name,
            log: self.log.lock(),
        }
    }
}

impl TopicGuard<'_> {
    pub(crate) fn append(&mut self, payload: Bytes) -> u64 {
        let offset = self.log.messages.len() as u64;
        self.log.payload_bytes += payload.len() as u64;
        self.log.messages.push(Message::new(offset, payload));

        debug!("Topic '{}' appended message at offset {}", self.name, offset);
        offset
    }

    pub(crate) fn read(&self, offset: u64) -> Option<Message> {
        let index = usize::try_from(offset).ok();
        match index.and_then(|i| self.log.messages.get(i)) {
            Some(message) => Some(message.clone()),
            None => {
                debug!(
                    "Topic '{}' offset {} beyond available messages ({})",
                    self.name,
                    offset,
                    self.log.messages.len()
                );
                None
            }
        }
    }

    pub(crate) fn size(&self) -> u64 {
        self.log.messages.len() as u64
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicStats {
    pub name: String,
    pub message_count: u64,
    pub payload_bytes: u64,
}
