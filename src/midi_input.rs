use std::sync::Arc;

use midir::{Ignore, MidiInput, MidiInputConnection};
use parking_lot::Mutex;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::midi_message::Message;

const CLIENT_NAME: &str = "midi-keys input";
const PORT_NAME: &str = "midi-keys-read-input";

/// Unbounded queue shared between the driver callback (producer) and the
/// frame loop (consumer). The lock is only held for a push or a drain.
#[derive(Clone, Default)]
pub struct MessageQueue {
    messages: Arc<Mutex<Vec<Message>>>,
}

impl MessageQueue {
    pub fn new() -> MessageQueue {
        MessageQueue::default()
    }

    pub fn push(&self, message: Message) {
        self.messages.lock().push(message);
    }

    /// Move everything queued so far into `out`, oldest first.
    pub fn drain_into(&self, out: &mut Vec<Message>) {
        let mut messages = self.messages.lock();
        out.append(&mut messages);
    }

    pub fn clear(&self) {
        self.messages.lock().clear();
    }

    pub fn is_empty(&self) -> bool {
        self.messages.lock().is_empty()
    }
}

/// Index of the first name containing `name`, ignoring case.
pub fn position_of(names: &[String], name: &str) -> Option<usize> {
    let needle = name.to_lowercase();
    names
        .iter()
        .position(|candidate| candidate.to_lowercase().contains(&needle))
}

// Callback side: anything that is not a short channel message is dropped
pub fn accept(stamp_us: u64, bytes: &[u8]) -> Option<Message> {
    Message::from_bytes(bytes, stamp_us / 1000).filter(Message::is_channel_message)
}

/// Something the frame loop can open and drain MIDI messages from.
pub trait MidiSource {
    fn open(&mut self, device_index: usize) -> Result<()>;
    fn close(&mut self);
    fn is_open(&self) -> bool;
    fn poll(&mut self, out: &mut Vec<Message>);

    /// Index of the first device whose name contains `name`.
    fn find_device(&self, _name: &str) -> Option<usize> {
        None
    }
}

/// Hardware MIDI input backed by a midir connection.
pub struct MidiInputChannel {
    connection: Option<MidiInputConnection<()>>,
    queue: MessageQueue,
    device_name: Option<String>,
}

impl MidiInputChannel {
    pub fn new() -> MidiInputChannel {
        MidiInputChannel {
            connection: None,
            queue: MessageQueue::new(),
            device_name: None,
        }
    }

    /// Name of the device currently open, if any.
    pub fn connected_device(&self) -> Option<&str> {
        self.device_name.as_deref()
    }

    pub fn device_count(&self) -> usize {
        MidiInput::new(CLIENT_NAME)
            .map(|midi_in| midi_in.port_count())
            .unwrap_or(0)
    }

    pub fn device_name(&self, index: usize) -> String {
        let Ok(midi_in) = MidiInput::new(CLIENT_NAME) else {
            return String::new();
        };

        midi_in
            .ports()
            .get(index)
            .and_then(|port| midi_in.port_name(port).ok())
            .unwrap_or_default()
    }

    pub fn device_names(&self) -> Vec<String> {
        let Ok(midi_in) = MidiInput::new(CLIENT_NAME) else {
            return Vec::new();
        };

        midi_in
            .ports()
            .iter()
            .map(|port| midi_in.port_name(port).unwrap_or_default())
            .collect()
    }
}

impl Default for MidiInputChannel {
    fn default() -> Self {
        MidiInputChannel::new()
    }
}

impl MidiSource for MidiInputChannel {
    fn open(&mut self, device_index: usize) -> Result<()> {
        self.close();

        let mut midi_in = MidiInput::new(CLIENT_NAME)?;
        midi_in.ignore(Ignore::All);

        let ports = midi_in.ports();
        if ports.is_empty() {
            return Err(Error::NoDevices);
        }

        let port = ports.get(device_index).ok_or(Error::DeviceOutOfRange {
            index: device_index,
            count: ports.len(),
        })?;

        let name = midi_in.port_name(port).unwrap_or_default();
        let queue = self.queue.clone();

        // The connection must be kept alive for as long as messages should arrive.
        // The callback runs on the driver thread and only pushes, never logs.
        let connection = midi_in.connect(
            port,
            PORT_NAME,
            move |stamp, bytes, _| {
                if let Some(message) = accept(stamp, bytes) {
                    queue.push(message);
                }
            },
            (),
        )?;

        info!(device = %name, index = device_index, "MIDI input opened");

        self.connection = Some(connection);
        self.device_name = Some(name);
        Ok(())
    }

    fn close(&mut self) {
        if let Some(connection) = self.connection.take() {
            // Blocks until the driver has stopped calling back
            connection.close();
            info!("MIDI input closed");
        }

        self.queue.clear();
        self.device_name = None;
    }

    fn is_open(&self) -> bool {
        self.connection.is_some()
    }

    fn poll(&mut self, out: &mut Vec<Message>) {
        let before = out.len();
        self.queue.drain_into(out);

        if out.len() > before {
            debug!(count = out.len() - before, "polled MIDI messages");
        }
    }

    fn find_device(&self, name: &str) -> Option<usize> {
        position_of(&self.device_names(), name)
    }
}

impl Drop for MidiInputChannel {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn drain_is_exhaustive_and_ordered() {
        let queue = MessageQueue::new();
        let m1 = Message::new(0x90, 60, 100, 1);
        let m2 = Message::new(0xB0, 7, 64, 2);
        let m3 = Message::new(0x80, 60, 0, 3);

        queue.push(m1);
        queue.push(m2);
        queue.push(m3);

        let mut out = Vec::new();
        queue.drain_into(&mut out);
        assert_eq!(out, vec![m1, m2, m3]);
        assert!(queue.is_empty());

        let mut again = Vec::new();
        queue.drain_into(&mut again);
        assert!(again.is_empty());
    }

    #[test]
    fn drain_appends_to_existing_buffer() {
        let queue = MessageQueue::new();
        let existing = Message::new(0x90, 1, 1, 0);
        let queued = Message::new(0x90, 2, 1, 0);
        queue.push(queued);

        let mut out = vec![existing];
        queue.drain_into(&mut out);
        assert_eq!(out, vec![existing, queued]);
    }

    #[test]
    fn producer_thread_and_consumer_share_queue() {
        let queue = MessageQueue::new();
        let producer = queue.clone();

        let handle = thread::spawn(move || {
            for note in 0..100u8 {
                producer.push(Message::new(0x90, note, 100, note as u64));
            }
        });

        let mut out = Vec::new();
        while out.len() < 100 {
            queue.drain_into(&mut out);
            thread::yield_now();
        }
        handle.join().unwrap();

        let notes: Vec<u8> = out.iter().map(Message::note).collect();
        assert_eq!(notes, (0..100u8).collect::<Vec<_>>());
    }

    #[test]
    fn accept_filters_non_channel_traffic() {
        assert!(accept(5_000, &[0x90, 60, 100]).is_some());
        assert_eq!(accept(5_000, &[0x90, 60, 100]).unwrap().timestamp_ms, 5);
        assert!(accept(0, &[0xF8]).is_none());
        assert!(accept(0, &[0xF0, 0x01, 0x02, 0xF7]).is_none());
        assert!(accept(0, &[0x40, 0x01]).is_none());
    }

    #[test]
    fn closed_channel_polls_nothing() {
        let mut channel = MidiInputChannel::new();
        assert!(!channel.is_open());

        channel.close();

        let mut out = Vec::new();
        channel.poll(&mut out);
        assert!(out.is_empty());
    }

    #[test]
    fn close_discards_pending_messages() {
        let mut channel = MidiInputChannel::new();
        channel.queue.push(Message::new(0x90, 60, 100, 0));
        channel.queue.push(Message::new(0x80, 60, 0, 1));

        channel.close();
        assert!(channel.queue.is_empty());

        let mut out = Vec::new();
        channel.poll(&mut out);
        assert!(out.is_empty());
    }

    #[test]
    fn device_lookup_ignores_case() {
        let names = vec!["Midi Through Port-0".to_string(), "Arturia MiniLab mkII".to_string()];

        assert_eq!(position_of(&names, "minilab"), Some(1));
        assert_eq!(position_of(&names, "MIDI THROUGH"), Some(0));
        assert_eq!(position_of(&names, "Keystation"), None);
        assert_eq!(position_of(&[], "minilab"), None);
    }
}
