/*
    CHARTING:

    short message structure: [status, data1, data2]
        - status high nibble is the message type, low nibble the channel
        - note off:          0x80, note, velocity
        - note on:           0x90, note, velocity (velocity 0 means note off)
        - aftertouch:        0xA0, note, pressure
        - control change:    0xB0, control, value
        - program change:    0xC0, program
        - channel pressure:  0xD0, pressure
        - pitch bend:        0xE0, lsb, msb (14 bits, 8192 = center)
    anything at 0xF0 and up is system traffic and decodes as Other
*/

use crate::midi_translation;
use crate::util;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    NoteOn { note: u8, velocity: u8 },
    NoteOff { note: u8, velocity: u8 },
    Aftertouch { note: u8, pressure: u8 },
    ControlChange { control: u8, value: u8 },
    ProgramChange { program: u8 },
    ChannelPressure { pressure: u8 },
    PitchBend { value: u16 },
    Other,
}

impl MessageKind {
    pub fn decode(status: u8, data1: u8, data2: u8) -> MessageKind {
        match status & 0xF0 {
            0x80 => MessageKind::NoteOff { note: data1, velocity: data2 },
            0x90 if data2 == 0 => MessageKind::NoteOff { note: data1, velocity: 0 },
            0x90 => MessageKind::NoteOn { note: data1, velocity: data2 },
            0xA0 => MessageKind::Aftertouch { note: data1, pressure: data2 },
            0xB0 => MessageKind::ControlChange { control: data1, value: data2 },
            0xC0 => MessageKind::ProgramChange { program: data1 },
            0xD0 => MessageKind::ChannelPressure { pressure: data1 },
            0xE0 => MessageKind::PitchBend { value: util::join_14bit(data1, data2) },
            _ => MessageKind::Other,
        }
    }
}

/// A decoded short MIDI message as delivered by an input device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Message {
    pub status: u8,
    pub data1: u8,
    pub data2: u8,
    /// Milliseconds as reported by the input backend.
    pub timestamp_ms: u64,
    kind: MessageKind,
}

impl Message {
    pub fn new(status: u8, data1: u8, data2: u8, timestamp_ms: u64) -> Message {
        Message {
            status,
            data1,
            data2,
            timestamp_ms,
            kind: MessageKind::decode(status, data1, data2),
        }
    }

    /// Decode a raw message slice. Short messages may omit their trailing data
    /// bytes; empty and long (system exclusive) payloads give `None`.
    pub fn from_bytes(bytes: &[u8], timestamp_ms: u64) -> Option<Message> {
        match *bytes {
            [status] => Some(Message::new(status, 0, 0, timestamp_ms)),
            [status, data1] => Some(Message::new(status, data1, 0, timestamp_ms)),
            [status, data1, data2] => Some(Message::new(status, data1, data2, timestamp_ms)),
            _ => None,
        }
    }

    pub fn kind(&self) -> MessageKind {
        self.kind
    }

    pub fn channel(&self) -> u8 {
        self.status & 0x0F
    }

    pub fn type_byte(&self) -> u8 {
        self.status & 0xF0
    }

    /// True for the channel voice range 0x80..=0xEF.
    pub fn is_channel_message(&self) -> bool {
        (0x80..=0xE0).contains(&self.type_byte())
    }

    pub fn is_note_on(&self) -> bool {
        matches!(self.kind, MessageKind::NoteOn { .. })
    }

    pub fn is_note_off(&self) -> bool {
        matches!(self.kind, MessageKind::NoteOff { .. })
    }

    pub fn is_control_change(&self) -> bool {
        matches!(self.kind, MessageKind::ControlChange { .. })
    }

    pub fn is_pitch_bend(&self) -> bool {
        matches!(self.kind, MessageKind::PitchBend { .. })
    }

    pub fn is_program_change(&self) -> bool {
        matches!(self.kind, MessageKind::ProgramChange { .. })
    }

    pub fn is_aftertouch(&self) -> bool {
        matches!(self.kind, MessageKind::Aftertouch { .. })
    }

    pub fn is_channel_pressure(&self) -> bool {
        matches!(self.kind, MessageKind::ChannelPressure { .. })
    }

    // Notes

    pub fn note(&self) -> u8 {
        self.data1
    }

    pub fn note_name(&self) -> String {
        midi_translation::note_name(self.note())
    }

    pub fn velocity(&self) -> u8 {
        self.data2
    }

    pub fn velocity_norm(&self) -> f32 {
        util::midi_to_unit(self.data2)
    }

    // Control change

    pub fn control(&self) -> u8 {
        self.data1
    }

    pub fn control_value(&self) -> u8 {
        self.data2
    }

    pub fn control_norm(&self) -> f32 {
        util::midi_to_unit(self.data2)
    }

    // Pitch bend

    pub fn pitch_bend_value(&self) -> u16 {
        util::join_14bit(self.data1, self.data2)
    }

    pub fn pitch_bend_norm(&self) -> f32 {
        util::bend_to_unit(self.pitch_bend_value())
    }

    pub fn pitch_bend_centered(&self) -> f32 {
        util::bend_to_centered(self.pitch_bend_value())
    }

    // Program change

    pub fn program_number(&self) -> u8 {
        self.data1
    }

    // Aftertouch (polyphonic)

    pub fn aftertouch_pressure(&self) -> u8 {
        self.data2
    }

    pub fn aftertouch_norm(&self) -> f32 {
        util::midi_to_unit(self.data2)
    }

    // Channel pressure carries its value in the first data byte

    pub fn channel_pressure(&self) -> u8 {
        self.data1
    }

    pub fn channel_pressure_norm(&self) -> f32 {
        util::midi_to_unit(self.data1)
    }
}
