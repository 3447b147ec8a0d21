use tracing::{debug, info};

use crate::key_simulator::KeySimulator;
use crate::mapping_table::{MappingEntry, MappingTable};
use crate::midi_message::{Message, MessageKind};

/// What the frame loop is currently doing with incoming input.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ListenState {
    /// Mapped notes are played as key presses.
    #[default]
    Idle,
    /// Waiting for a note-on to map.
    AwaitingNote,
    /// Note captured, waiting for the key it maps to.
    AwaitingKey { note: u8, note_name: String },
}

/// Reported to the frontend when the listen state moves on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    NoteCaptured { note: u8, note_name: String },
    MappingAdded(MappingEntry),
}

#[derive(Debug, Default)]
pub struct Dispatcher {
    state: ListenState,
}

impl Dispatcher {
    pub fn new() -> Dispatcher {
        Dispatcher::default()
    }

    pub fn state(&self) -> &ListenState {
        &self.state
    }

    pub fn is_idle(&self) -> bool {
        self.state == ListenState::Idle
    }

    /// Start capturing a new mapping. Only possible from Idle.
    pub fn start_listening(&mut self) -> bool {
        if !self.is_idle() {
            return false;
        }

        info!("Listening for a MIDI note");
        self.state = ListenState::AwaitingNote;
        true
    }

    /// Abandon a capture that has not received its note yet.
    pub fn cancel(&mut self) -> bool {
        if self.state != ListenState::AwaitingNote {
            return false;
        }

        info!("Stopped listening");
        self.state = ListenState::Idle;
        true
    }

    /// Advance one frame with the messages polled for it.
    pub fn step<K: KeySimulator + ?Sized>(
        &mut self,
        messages: &[Message],
        table: &mut MappingTable,
        keys: &mut K,
    ) -> Option<Transition> {
        match &self.state {
            ListenState::AwaitingNote => {
                // First note-on wins, the rest of the batch is dropped
                let message = messages.iter().find(|message| message.is_note_on())?;
                let note = message.note();
                let note_name = message.note_name();

                info!(note, %note_name, "Captured note");

                self.state = ListenState::AwaitingKey {
                    note,
                    note_name: note_name.clone(),
                };
                Some(Transition::NoteCaptured { note, note_name })
            }
            ListenState::AwaitingKey { note, note_name } => {
                let key = keys.currently_pressed_key()?;

                let entry = MappingEntry {
                    note: *note,
                    note_name: note_name.clone(),
                    key,
                    key_name: keys.key_name(key),
                };

                info!(note = entry.note, key, key_name = %entry.key_name, "Mapping added");

                table.push(entry.clone());
                self.state = ListenState::Idle;
                Some(Transition::MappingAdded(entry))
            }
            ListenState::Idle => {
                play(messages, table, keys);
                None
            }
        }
    }
}

fn play<K: KeySimulator + ?Sized>(messages: &[Message], table: &MappingTable, keys: &mut K) {
    for message in messages {
        for entry in table.matching(message.note()) {
            match message.kind() {
                MessageKind::NoteOn { .. } => {
                    debug!(note = entry.note, key = entry.key, "press");
                    keys.press(entry.key);
                }
                MessageKind::NoteOff { .. } => {
                    debug!(note = entry.note, key = entry.key, "release");
                    keys.release(entry.key);
                }
                _ => {}
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::key_simulator;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum KeyAction {
        Press(u16),
        Release(u16),
    }

    /// Records injected keys and reports a scripted physical key.
    #[derive(Default)]
    pub struct RecordingKeys {
        pub actions: Vec<KeyAction>,
        pub held: Option<u16>,
        pub scans: usize,
    }

    impl KeySimulator for RecordingKeys {
        fn press(&mut self, key: u16) {
            self.actions.push(KeyAction::Press(key));
        }

        fn release(&mut self, key: u16) {
            self.actions.push(KeyAction::Release(key));
        }

        fn currently_pressed_key(&mut self) -> Option<u16> {
            self.scans += 1;
            self.held
        }
    }

    fn note_on(note: u8) -> Message {
        Message::new(0x90, note, 100, 0)
    }

    fn note_off(note: u8) -> Message {
        Message::new(0x80, note, 0, 0)
    }

    fn table(mappings: &[(u8, u16)]) -> MappingTable {
        let mut table = MappingTable::new();
        for (note, key) in mappings {
            table.push(MappingEntry::new(*note, *key, key_simulator::key_name(*key)));
        }
        table
    }

    #[test]
    fn capture_note_then_key() {
        let mut dispatcher = Dispatcher::new();
        let mut mappings = MappingTable::new();
        let mut keys = RecordingKeys::default();

        assert!(dispatcher.start_listening());
        assert_eq!(dispatcher.state(), &ListenState::AwaitingNote);

        // Nothing held yet, nothing arrives
        assert_eq!(dispatcher.step(&[], &mut mappings, &mut keys), None);

        let transition = dispatcher.step(&[note_on(60)], &mut mappings, &mut keys);
        assert_eq!(
            transition,
            Some(Transition::NoteCaptured { note: 60, note_name: "C4".to_string() })
        );
        assert_eq!(
            dispatcher.state(),
            &ListenState::AwaitingKey { note: 60, note_name: "C4".to_string() }
        );

        assert_eq!(dispatcher.step(&[], &mut mappings, &mut keys), None);
        assert!(mappings.is_empty());

        keys.held = Some(30);
        let transition = dispatcher.step(&[], &mut mappings, &mut keys);

        let expected = MappingEntry {
            note: 60,
            note_name: "C4".to_string(),
            key: 30,
            key_name: "A".to_string(),
        };
        assert_eq!(transition, Some(Transition::MappingAdded(expected.clone())));
        assert!(dispatcher.is_idle());
        assert_eq!(mappings.iter().cloned().collect::<Vec<_>>(), vec![expected]);
        assert!(keys.actions.is_empty());
    }

    #[test]
    fn first_note_on_in_batch_wins() {
        let mut dispatcher = Dispatcher::new();
        let mut mappings = MappingTable::new();
        let mut keys = RecordingKeys::default();
        dispatcher.start_listening();

        let batch = [note_off(50), Message::new(0xB0, 1, 2, 0), note_on(62), note_on(64)];
        dispatcher.step(&batch, &mut mappings, &mut keys);

        assert_eq!(
            dispatcher.state(),
            &ListenState::AwaitingKey { note: 62, note_name: "D4".to_string() }
        );
        assert_eq!(keys.scans, 0);
    }

    #[test]
    fn no_playback_while_listening() {
        let mut dispatcher = Dispatcher::new();
        let mut mappings = table(&[(60, 30)]);
        let mut keys = RecordingKeys::default();
        dispatcher.start_listening();

        dispatcher.step(&[note_on(60)], &mut mappings, &mut keys);
        dispatcher.step(&[note_off(60), note_on(60)], &mut mappings, &mut keys);

        assert!(keys.actions.is_empty());
        assert_eq!(keys.scans, 1);
    }

    #[test]
    fn note_on_then_off_presses_then_releases() {
        let mut dispatcher = Dispatcher::new();
        let mut mappings = table(&[(60, 30)]);
        let mut keys = RecordingKeys::default();

        let transition = dispatcher.step(&[note_on(60), note_off(60)], &mut mappings, &mut keys);

        assert_eq!(transition, None);
        assert_eq!(keys.actions, vec![KeyAction::Press(30), KeyAction::Release(30)]);
    }

    #[test]
    fn zero_velocity_note_on_releases() {
        let mut dispatcher = Dispatcher::new();
        let mut mappings = table(&[(60, 30)]);
        let mut keys = RecordingKeys::default();

        dispatcher.step(&[note_on(60), Message::new(0x90, 60, 0, 0)], &mut mappings, &mut keys);

        assert_eq!(keys.actions, vec![KeyAction::Press(30), KeyAction::Release(30)]);
    }

    #[test]
    fn duplicate_notes_fan_out_in_table_order() {
        let mut dispatcher = Dispatcher::new();
        let mut mappings = table(&[(60, 30), (61, 40), (60, 31)]);
        let mut keys = RecordingKeys::default();

        dispatcher.step(&[note_on(60)], &mut mappings, &mut keys);

        assert_eq!(keys.actions, vec![KeyAction::Press(30), KeyAction::Press(31)]);
    }

    #[test]
    fn other_messages_do_not_fire() {
        let mut dispatcher = Dispatcher::new();
        let mut mappings = table(&[(60, 30)]);
        let mut keys = RecordingKeys::default();

        let batch = [
            Message::new(0xB0, 60, 127, 0),
            Message::new(0xA0, 60, 90, 0),
            Message::new(0xE0, 60, 64, 0),
        ];
        dispatcher.step(&batch, &mut mappings, &mut keys);

        assert!(keys.actions.is_empty());
    }

    #[test]
    fn retriggers_are_not_debounced() {
        let mut dispatcher = Dispatcher::new();
        let mut mappings = table(&[(60, 30)]);
        let mut keys = RecordingKeys::default();

        let batch = [note_on(60), note_off(60), note_on(60), note_off(60)];
        dispatcher.step(&batch, &mut mappings, &mut keys);

        assert_eq!(keys.actions.len(), 4);
    }

    #[test]
    fn listening_only_starts_from_idle_and_cancels_before_note() {
        let mut dispatcher = Dispatcher::new();
        let mut mappings = MappingTable::new();
        let mut keys = RecordingKeys::default();

        assert!(!dispatcher.cancel());
        assert!(dispatcher.start_listening());
        assert!(!dispatcher.start_listening());
        assert!(dispatcher.cancel());
        assert!(dispatcher.is_idle());

        dispatcher.start_listening();
        dispatcher.step(&[note_on(60)], &mut mappings, &mut keys);
        assert!(!dispatcher.start_listening());
        assert!(!dispatcher.cancel());
    }
}
