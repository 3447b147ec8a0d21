use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("No MIDI input devices available")]
    NoDevices,

    #[error("MIDI device {index} out of range ({count} available)")]
    DeviceOutOfRange { index: usize, count: usize },

    #[error("MIDI init error: {0}")]
    MidiInit(String),

    #[error("MIDI connect error: {0}")]
    MidiConnect(String),

    #[error("Invalid config: {0}")]
    Config(#[from] toml::de::Error),

    #[error("Keyboard device error: {0}")]
    Keyboard(String),
}

impl From<midir::InitError> for Error {
    fn from(e: midir::InitError) -> Self {
        Error::MidiInit(e.to_string())
    }
}

impl From<midir::ConnectError<midir::MidiInput>> for Error {
    fn from(e: midir::ConnectError<midir::MidiInput>) -> Self {
        Error::MidiConnect(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
