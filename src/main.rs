use std::env;
use std::error::Error;
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;

use tracing::info;

use midi_keys::config::Config;
use midi_keys::key_simulator::EvdevKeyboard;
use midi_keys::midi_input::MidiInputChannel;
use midi_keys::ncurses_daemon::NcursesDaemon;

fn main() {
    match run() {
        Ok(_) => (),
        Err(err) => println!("Error: {}", err),
    }
}

fn run() -> Result<(), Box<dyn Error>> {
    let config_path = env::args().nth(1).map(PathBuf::from);
    let config = Config::load(config_path.as_deref())?;

    // The terminal belongs to notcurses, so logs go to a file
    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&config.log_file)?;

    tracing_subscriber::fmt()
        .with_max_level(config.level())
        .with_ansi(false)
        .with_writer(Mutex::new(log_file))
        .init();

    info!(?config, "Starting");

    // Needs write access to /dev/uinput and read access to the keyboards
    let keys = EvdevKeyboard::new(&config.keyboard_devices)?;

    NcursesDaemon::new(config, MidiInputChannel::new(), keys)
        .begin()
        .map_err(|err| format!("terminal error: {:?}", err))?;

    Ok(())
}
