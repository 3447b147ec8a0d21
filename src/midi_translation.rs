const NOTE_NAMES: [&str; 12] = ["C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B"];

/// Scientific pitch name for a MIDI note, e.g. 60 => "C4".
pub fn note_name(note: u8) -> String {
    let letter = NOTE_NAMES[(note % 12) as usize];
    let octave = (note / 12) as i32 - 1;

    format!("{}{}", letter, octave)
}
