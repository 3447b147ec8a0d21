use tracing::{debug, warn};

use crate::config::Config;
use crate::dispatch::{Dispatcher, Transition};
use crate::error::Result;
use crate::key_simulator::KeySimulator;
use crate::mapping_table::MappingTable;
use crate::midi_input::MidiSource;
use crate::midi_message::Message;

/*
    Frame loop state. Everything in here is only touched from the frame loop;
    the MIDI callback thread only ever sees the source's queue.
*/
pub struct State {
    pub mappings: MappingTable,
    pub dispatcher: Dispatcher,
    device_index: usize,
    device_name: Option<String>,
    reconnect_cooldown: u32,
    frames_until_retry: u32,
    polled: Vec<Message>,
}

impl State {
    pub fn new(config: &Config) -> State {
        State {
            mappings: MappingTable::new(),
            dispatcher: Dispatcher::new(),
            device_index: config.device_index,
            device_name: config.device_name.clone(),
            reconnect_cooldown: config.reconnect_cooldown_frames,
            frames_until_retry: 0,
            polled: Vec::new(),
        }
    }

    /// Try to open the source if it is closed and the cooldown has run out.
    /// Returns the outcome when an attempt was made this frame.
    pub fn maintain_connection<S: MidiSource + ?Sized>(&mut self, source: &mut S) -> Option<Result<()>> {
        if source.is_open() {
            return None;
        }

        if self.frames_until_retry > 0 {
            self.frames_until_retry -= 1;
            return None;
        }

        // One attempt every `reconnect_cooldown` frames, this one included
        self.frames_until_retry = self.reconnect_cooldown.saturating_sub(1);

        let index = self
            .device_name
            .as_deref()
            .and_then(|name| source.find_device(name))
            .unwrap_or(self.device_index);

        let result = source.open(index);
        if let Err(e) = &result {
            debug!(index, "MIDI connect attempt failed: {}", e);
        }

        Some(result)
    }

    /// Drain the source and advance the listen state by one frame.
    pub fn frame<S, K>(&mut self, source: &mut S, keys: &mut K) -> Option<Transition>
    where
        S: MidiSource + ?Sized,
        K: KeySimulator + ?Sized,
    {
        self.polled.clear();
        source.poll(&mut self.polled);

        self.dispatcher.step(&self.polled, &mut self.mappings, keys)
    }

    /// Close the source; the next attempt waits a full cooldown.
    pub fn disconnect<S: MidiSource + ?Sized>(&mut self, source: &mut S) {
        source.close();
        self.frames_until_retry = self.reconnect_cooldown;
    }

    pub fn replace_mappings(&mut self, mappings: MappingTable) {
        if !self.dispatcher.is_idle() {
            warn!("Replacing mappings while listening");
        }
        self.mappings = mappings;
    }
}
