use std::fmt;
use std::net::SocketAddr;

/// Main error type for the murmur chat node
#[derive(Debug)]
pub enum MurmurError {
    /// Configuration or CLI argument errors
    Config(String),

    /// Malformed user input (bad address, port or command)
    Input(String),

    /// Wire payloads that do not decode into a valid message
    Message(String),

    /// A direct message addressed to someone who is not a neighbor
    UnknownNeighbor(SocketAddr),

    /// A datagram could not be handed to the transport
    NeighborUnreachable {
        address: SocketAddr,
        source: std::io::Error,
    },

    /// Transport layer errors not tied to one peer
    Transport(String),

    /// System I/O errors
    Io(std::io::Error),

    /// Serialization/deserialization errors
    Serialization(SerializationError),
}

/// Serialization related errors
#[derive(Debug)]
pub enum SerializationError {
    /// JSON serialization/deserialization errors
    Json(serde_json::Error),
}

impl fmt::Display for MurmurError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MurmurError::Config(msg) => write!(f, "Configuration error: {}", msg),
            MurmurError::Input(msg) => write!(f, "Invalid input: {}", msg),
            MurmurError::Message(msg) => write!(f, "Malformed message: {}", msg),
            MurmurError::UnknownNeighbor(addr) => write!(f, "Not a neighbor: {}", addr),
            MurmurError::NeighborUnreachable { address, source } => {
                write!(f, "Neighbor unreachable at {}: {}", address, source)
            }
            MurmurError::Transport(msg) => write!(f, "Transport error: {}", msg),
            MurmurError::Io(err) => write!(f, "I/O error: {}", err),
            MurmurError::Serialization(err) => write!(f, "Serialization error: {}", err),
        }
    }
}

impl fmt::Display for SerializationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SerializationError::Json(err) => write!(f, "JSON: {}", err),
        }
    }
}

impl std::error::Error for MurmurError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            MurmurError::Io(err) => Some(err),
            MurmurError::NeighborUnreachable { source, .. } => Some(source),
            MurmurError::Serialization(SerializationError::Json(err)) => Some(err),
            _ => None,
        }
    }
}

impl std::error::Error for SerializationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SerializationError::Json(err) => Some(err),
        }
    }
}

// Convenient type alias for Results using our error type
pub type Result<T> = std::result::Result<T, MurmurError>;

impl MurmurError {
    /// Errors that end the process under the default fail-fast policy
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            MurmurError::NeighborUnreachable { .. } | MurmurError::Transport(_) | MurmurError::Io(_)
        )
    }
}

// Conversions from common error types
impl From<std::io::Error> for MurmurError {
    fn from(err: std::io::Error) -> Self {
        MurmurError::Io(err)
    }
}

impl From<serde_json::Error> for MurmurError {
    fn from(err: serde_json::Error) -> Self {
        MurmurError::Serialization(SerializationError::Json(err))
    }
}

impl From<SerializationError> for MurmurError {
    fn from(err: SerializationError) -> Self {
        MurmurError::Serialization(err)
    }
}

// Helper macros for common error construction patterns
#[macro_export]
macro_rules! config_error {
    ($msg:expr) => {
        $crate::error::MurmurError::Config($msg.to_string())
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::error::MurmurError::Config(format!($fmt, $($arg)*))
    };
}

#[macro_export]
macro_rules! input_error {
    ($msg:expr) => {
        $crate::error::MurmurError::Input($msg.to_string())
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::error::MurmurError::Input(format!($fmt, $($arg)*))
    };
}

#[macro_export]
macro_rules! message_error {
    ($msg:expr) => {
        $crate::error::MurmurError::Message($msg.to_string())
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::error::MurmurError::Message(format!($fmt, $($arg)*))
    };
}
