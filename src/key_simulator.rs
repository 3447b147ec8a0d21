use std::path::PathBuf;

use evdev::uinput::VirtualDevice;
use evdev::{AttributeSet, Device, EventType, InputEvent, KeyCode};
use tracing::{info, warn};

use crate::error::{Error, Result};

const VIRTUAL_DEVICE_NAME: &str = "midi-keys virtual keyboard";

// Key codes below this are scanned and can be injected
const KEY_SCAN_END: u16 = 0x300;

const PRESSED: i32 = 1;
const RELEASED: i32 = 0;

/// Synthetic keyboard output plus a view of the physical keyboard state.
pub trait KeySimulator {
    fn press(&mut self, key: u16);

    fn release(&mut self, key: u16);

    fn press_and_release(&mut self, key: u16) {
        self.press(key);
        self.release(key);
    }

    /// Lowest key code currently held on a physical keyboard.
    fn currently_pressed_key(&mut self) -> Option<u16>;

    fn key_name(&self, key: u16) -> String {
        key_name(key)
    }
}

/// Readable name for a Linux input key code, e.g. 30 => "A". Buttons keep
/// their prefix (272 => "BTN_LEFT"). Empty if unknown.
pub fn key_name(key: u16) -> String {
    let raw = format!("{:?}", KeyCode::new(key));

    if let Some(name) = raw.strip_prefix("KEY_") {
        name.to_string()
    } else if raw.starts_with("BTN_") {
        raw
    } else {
        String::new()
    }
}

pub struct EvdevKeyboard {
    output: VirtualDevice,
    keyboards: Vec<Device>,
}

impl EvdevKeyboard {
    /// Watch the given keyboards, or every device that looks like one when
    /// `paths` is empty, and create the virtual device used for output.
    pub fn new(paths: &[PathBuf]) -> Result<EvdevKeyboard> {
        // Discover before the virtual device exists so it never watches itself
        let keyboards = if paths.is_empty() {
            discover_keyboards()
        } else {
            paths
                .iter()
                .map(|path| Device::open(path).map_err(|e| keyboard_error(path, e)))
                .collect::<Result<Vec<_>>>()?
        };

        if keyboards.is_empty() {
            warn!("No physical keyboards found, key capture will not work");
        }

        for keyboard in &keyboards {
            info!(name = keyboard.name().unwrap_or("unnamed"), "Watching keyboard");
        }

        let mut keys = AttributeSet::<KeyCode>::new();
        for code in 1..KEY_SCAN_END {
            keys.insert(KeyCode::new(code));
        }

        let output = VirtualDevice::builder()?
            .name(VIRTUAL_DEVICE_NAME)
            .with_keys(&keys)?
            .build()?;

        Ok(EvdevKeyboard { output, keyboards })
    }

    fn emit(&mut self, key: u16, value: i32) {
        let event = InputEvent::new(EventType::KEY.0, key, value);

        if let Err(e) = self.output.emit(&[event]) {
            warn!(key, value, "Failed to emit key event: {}", e);
        }
    }
}

fn keyboard_error(path: &std::path::Path, e: std::io::Error) -> Error {
    Error::Keyboard(format!("{}: {}", path.display(), e))
}

fn discover_keyboards() -> Vec<Device> {
    evdev::enumerate()
        .map(|(_, device)| device)
        .filter(|device| device.name() != Some(VIRTUAL_DEVICE_NAME))
        .filter(|device| {
            device.supported_keys().is_some_and(|keys| {
                keys.contains(KeyCode::KEY_A) && keys.contains(KeyCode::KEY_ENTER)
            })
        })
        .collect()
}

impl KeySimulator for EvdevKeyboard {
    fn press(&mut self, key: u16) {
        self.emit(key, PRESSED);
    }

    fn release(&mut self, key: u16) {
        self.emit(key, RELEASED);
    }

    fn currently_pressed_key(&mut self) -> Option<u16> {
        self.keyboards
            .iter()
            .filter_map(|keyboard| match keyboard.get_key_state() {
                Ok(state) => state
                    .iter()
                    .map(|key| key.code())
                    .find(|code| (1..KEY_SCAN_END).contains(code)),
                Err(e) => {
                    warn!("Failed to read keyboard state: {}", e);
                    None
                }
            })
            .min()
    }
}
