const MIDI_RANGE: f32 = 127.0;
const BEND_RANGE: f32 = 16383.0;
const BEND_CENTER: i32 = 8192;

// 7-bit data byte to 0.0..=1.0
pub fn midi_to_unit(value: u8) -> f32 {
    value as f32 / MIDI_RANGE
}

// 14-bit value from two 7-bit bytes, lsb first as sent on the wire
pub fn join_14bit(lsb: u8, msb: u8) -> u16 {
    ((msb as u16) << 7) | lsb as u16
}

pub fn bend_to_unit(value: u16) -> f32 {
    value as f32 / BEND_RANGE
}

// 8192 is the wheel at rest; the top end falls just short of +1.0
pub fn bend_to_centered(value: u16) -> f32 {
    (value as i32 - BEND_CENTER) as f32 / BEND_CENTER as f32
}
