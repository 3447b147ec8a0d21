//! MIDI note to keyboard key remapping.
//!
//! A midir callback thread queues decoded messages, a frame loop drains them
//! once per frame and either captures a new mapping or plays mapped notes as
//! synthetic key presses through a uinput virtual keyboard.

pub mod config;
pub mod dispatch;
pub mod error;
pub mod key_simulator;
pub mod mapping_table;
pub mod midi_input;
pub mod midi_message;
pub mod midi_translation;
pub mod ncurses_daemon;
pub mod state;
pub mod util;

pub use error::{Error, Result};
