use thiserror::Error as ThisError;

/// Failure of a command sent to the hub.
///
/// Cloned to every caller whose write was coalesced into the same debounced
/// send, so all of them observe the same outcome.
#[derive(ThisError, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error("Hub rejected command: {0}")]
    Transport(String),

    #[error("Command dispatcher dropped before the command was sent")]
    Dropped,
}

#[derive(ThisError, Debug)]
pub enum BridgeError {
    #[error("Unknown device: {0}")]
    UnknownDevice(String),

    #[error("Service {service} not found on device {device_id}")]
    UnknownService { device_id: String, service: String },

    #[error("Characteristic {characteristic} not found on service {service}")]
    UnknownCharacteristic {
        service: String,
        characteristic: String,
    },

    #[error("Characteristic {0} is read-only")]
    ReadOnly(String),

    #[error("Invalid value for {characteristic}: {reason}")]
    InvalidValue {
        characteristic: String,
        reason: String,
    },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Command(#[from] CommandError),

    #[error(transparent)]
    IoError(#[from] std::io::Error),

    #[error(transparent)]
    SerdeJsonError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, BridgeError>;
