use std::fs;
use std::path::Path;

use itertools::Itertools;
use tracing::{info, warn};

use crate::error::Result;
use crate::midi_translation;

pub const MAX_NOTE: i64 = 127;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappingEntry {
    pub note: u8,
    pub note_name: String,
    pub key: u16,
    pub key_name: String,
}

impl MappingEntry {
    pub fn new(note: u8, key: u16, key_name: String) -> MappingEntry {
        MappingEntry {
            note,
            note_name: midi_translation::note_name(note),
            key,
            key_name,
        }
    }
}

/// Note to key mappings in insertion order. Several entries may share a note.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MappingTable {
    entries: Vec<MappingEntry>,
}

impl MappingTable {
    pub fn new() -> MappingTable {
        MappingTable::default()
    }

    pub fn push(&mut self, entry: MappingEntry) {
        self.entries.push(entry);
    }

    pub fn remove(&mut self, index: usize) -> Option<MappingEntry> {
        (index < self.entries.len()).then(|| self.entries.remove(index))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&MappingEntry> {
        self.entries.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &MappingEntry> {
        self.entries.iter()
    }

    pub fn matching(&self, note: u8) -> impl Iterator<Item = &MappingEntry> {
        self.entries.iter().filter(move |entry| entry.note == note)
    }

    /// One "<note> <key>" line per entry.
    pub fn to_text(&self) -> String {
        self.entries
            .iter()
            .map(|entry| format!("{} {}\n", entry.note, entry.key))
            .join("")
    }

    /// Parse the saved format. Names are rebuilt from the numbers; lines with a
    /// note outside 0..=127 or that do not hold two integers are skipped.
    pub fn from_text(text: &str, key_name: impl Fn(u16) -> String) -> MappingTable {
        let mut table = MappingTable::new();

        for (line_number, line) in text.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }

            let Some((note, key)) = parse_line(line) else {
                warn!(line = line_number + 1, "Skipping malformed mapping line: {:?}", line);
                continue;
            };

            if !(0..=MAX_NOTE).contains(&note) {
                continue;
            }

            let Ok(key) = u16::try_from(key) else {
                warn!(line = line_number + 1, key, "Skipping mapping with invalid key code");
                continue;
            };

            table.push(MappingEntry::new(note as u8, key, key_name(key)));
        }

        table
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        fs::write(path, self.to_text())?;
        info!(path = %path.display(), entries = self.len(), "Saved mappings");
        Ok(())
    }

    pub fn load(path: &Path, key_name: impl Fn(u16) -> String) -> Result<MappingTable> {
        let text = fs::read_to_string(path)?;
        let table = MappingTable::from_text(&text, key_name);
        info!(path = %path.display(), entries = table.len(), "Loaded mappings");
        Ok(table)
    }
}

fn parse_line(line: &str) -> Option<(i64, i64)> {
    let (note, key) = line.split_whitespace().collect_tuple()?;
    Some((note.parse().ok()?, key.parse().ok()?))
}
