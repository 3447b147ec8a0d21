use std::thread::sleep;
use std::time::{Duration, Instant};

use notcurses::*;
use tracing::{info, warn};

use crate::config::Config;
use crate::dispatch::{ListenState, Transition};
use crate::key_simulator::{self, EvdevKeyboard};
use crate::mapping_table::MappingTable;
use crate::midi_input::{MidiInputChannel, MidiSource};
use crate::state::State;

// The key that completed a mapping also reaches the terminal; ignore it
const INPUT_MUTE_AFTER_CAPTURE: Duration = Duration::from_millis(300);

const HELP: &str = "F01 quit | F02 listen/cancel | F03 save | F04 load | F05 disconnect | \
F06 devices | F07 mappings | Up/Down select | Del remove";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Listen,
    Save,
    Load,
    Disconnect,
    ListDevices,
    ShowMappings,
    SelectPrevious,
    SelectNext,
    RemoveSelected,
}

fn command_for(event: &Input) -> Option<Command> {
    let bindings = [
        (Key::F02, Command::Listen),
        (Key::F03, Command::Save),
        (Key::F04, Command::Load),
        (Key::F05, Command::Disconnect),
        (Key::F06, Command::ListDevices),
        (Key::F07, Command::ShowMappings),
        (Key::Up, Command::SelectPrevious),
        (Key::Down, Command::SelectNext),
        (Key::Del, Command::RemoveSelected),
    ];

    for (key, command) in bindings {
        if event.is_key(key) {
            return Some(command);
        }
    }

    None
}

pub struct NcursesDaemon {
    config: Config,
    state: State,
    source: MidiInputChannel,
    keys: EvdevKeyboard,
    selected: usize,
    muted_until: Instant,
}

impl NcursesDaemon {
    pub fn new(config: Config, source: MidiInputChannel, keys: EvdevKeyboard) -> NcursesDaemon {
        NcursesDaemon {
            state: State::new(&config),
            config,
            source,
            keys,
            selected: 0,
            muted_until: Instant::now(),
        }
    }

    pub fn begin(mut self) -> NotcursesResult<()> {
        let mut nc = Notcurses::new()?;
        let mut plane = Plane::new(&mut nc)?;
        plane.set_scrolling(true);

        putstrln!(+render plane,
            "\n{0}\nMIDI to keyboard\n{1}\n{0}\n",
            "-".repeat(50),
            HELP
        )?;

        let frame_interval = self.config.frame_interval();

        'frames: loop {
            let frame_start = Instant::now();

            // Drain terminal input for this frame
            loop {
                let event = nc.poll_event()?;

                if !event.received() {
                    break;
                }

                if event.is_key(Key::F01) {
                    break 'frames;
                }

                if event.is_release() || Instant::now() < self.muted_until {
                    continue;
                }

                // Keyboard input belongs to the key capture while it runs
                if matches!(self.state.dispatcher.state(), ListenState::AwaitingKey { .. }) {
                    continue;
                }

                if let Some(command) = command_for(&event) {
                    for line in self.run(command) {
                        putstrln!(+render plane, "{}", line)?;
                    }
                }
            }

            if let Some(result) = self.state.maintain_connection(&mut self.source) {
                let line = match result {
                    Ok(()) => format!(
                        "Connected to {}",
                        self.source.connected_device().unwrap_or("MIDI device")
                    ),
                    Err(e) => format!("Trying to connect... ({})", e),
                };
                putstrln!(+render plane, "{}", line)?;
            }

            if let Some(transition) = self.state.frame(&mut self.source, &mut self.keys) {
                let line = match transition {
                    Transition::NoteCaptured { note_name, .. } => {
                        format!("Got {}, press a key to map it to...", note_name)
                    }
                    Transition::MappingAdded(entry) => {
                        self.muted_until = Instant::now() + INPUT_MUTE_AFTER_CAPTURE;
                        format!("Mapped {} -> {}", entry.note_name, entry.key_name)
                    }
                };
                putstrln!(+render plane, "{}", line)?;
            }

            if let Some(rest) = frame_interval.checked_sub(frame_start.elapsed()) {
                sleep(rest);
            }
        }

        info!("Exiting");
        Ok(())
    }

    fn run(&mut self, command: Command) -> Vec<String> {
        let dispatcher = &mut self.state.dispatcher;

        match command {
            Command::Listen => {
                if dispatcher.cancel() {
                    vec!["Stopped listening".to_string()]
                } else if !self.source.is_open() {
                    vec!["No MIDI device connected".to_string()]
                } else if dispatcher.start_listening() {
                    vec!["Play a MIDI note...".to_string()]
                } else {
                    Vec::new()
                }
            }
            // The table is only swapped out while idle
            _ if !dispatcher.is_idle() => vec!["Finish listening first (F02 cancels)".to_string()],
            Command::Save => {
                let path = &self.config.mapping_file;
                match self.state.mappings.save(path) {
                    Ok(()) => vec![format!("Saved {} mappings to {}", self.state.mappings.len(), path.display())],
                    Err(e) => {
                        warn!("Save failed: {}", e);
                        vec![format!("Could not save {}: {}", path.display(), e)]
                    }
                }
            }
            Command::Load => {
                let path = &self.config.mapping_file;
                match MappingTable::load(path, key_simulator::key_name) {
                    Ok(mappings) => {
                        self.state.replace_mappings(mappings);
                        self.selected = 0;
                        let mut lines = vec![format!("Loaded {}", path.display())];
                        lines.extend(self.describe_mappings());
                        lines
                    }
                    Err(e) => {
                        warn!("Load failed: {}", e);
                        vec![format!("Could not load {}: {}", path.display(), e)]
                    }
                }
            }
            Command::Disconnect => {
                self.state.disconnect(&mut self.source);
                vec!["Disconnected MIDI".to_string()]
            }
            Command::ListDevices => {
                let count = self.source.device_count();
                if count == 0 {
                    return vec!["No MIDI input devices".to_string()];
                }
                (0..count)
                    .map(|index| format!("  [{}] {}", index, self.source.device_name(index)))
                    .collect()
            }
            Command::ShowMappings => self.describe_mappings(),
            Command::SelectPrevious => {
                self.selected = self.selected.saturating_sub(1);
                self.describe_selected()
            }
            Command::SelectNext => {
                if self.selected + 1 < self.state.mappings.len() {
                    self.selected += 1;
                }
                self.describe_selected()
            }
            Command::RemoveSelected => match self.state.mappings.remove(self.selected) {
                Some(entry) => {
                    self.selected = self.selected.min(self.state.mappings.len().saturating_sub(1));
                    let mut lines = vec![format!("Removed {} -> {}", entry.note_name, entry.key_name)];
                    lines.extend(self.describe_mappings());
                    lines
                }
                None => vec!["Nothing to remove".to_string()],
            },
        }
    }

    fn describe_mappings(&self) -> Vec<String> {
        if self.state.mappings.is_empty() {
            return vec!["No mappings".to_string()];
        }

        self.state
            .mappings
            .iter()
            .enumerate()
            .map(|(index, entry)| {
                let marker = if index == self.selected { '>' } else { ' ' };
                format!("{} Note: {:<4} Map to: {}", marker, entry.note_name, entry.key_name)
            })
            .collect()
    }

    fn describe_selected(&self) -> Vec<String> {
        match self.state.mappings.get(self.selected) {
            Some(entry) => vec![format!(
                "Selected #{} {} -> {}",
                self.selected + 1,
                entry.note_name,
                entry.key_name
            )],
            None => vec!["No mappings".to_string()],
        }
    }
}
