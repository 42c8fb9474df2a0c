// MIT License - Copyright (c) 2024 paradox-link contributors

/// All errors that can occur in the paradox-link library.
#[derive(Debug, thiserror::Error)]
pub enum PanelError {
    /// A frame matched a known shape but its trailing checksum byte does not
    /// cover the preceding bytes. Never silently accepted.
    #[error("checksum mismatch: expected {expected:#04x}, got {got:#04x}")]
    ChecksumMismatch { expected: u8, got: u8 },

    /// A frame matched a known shape but the buffer is too short to hold it.
    #[error("short frame: need {needed} bytes, got {got}")]
    ShortFrame { needed: usize, got: usize },

    /// A catalog lookup was made for a message name that does not exist.
    #[error("unknown message: {name}")]
    UnknownMessage { name: String },

    /// A request was built from a descriptor that cannot accept the given
    /// arguments (e.g. a response-only message).
    #[error("cannot build a request for message: {name}")]
    UnbuildableRequest { name: &'static str },

    /// The transport produced no reply at all while reading panel memory.
    /// Aborts the current label load; labels already collected are kept.
    #[error("no reply from panel while reading address {address:#06x}")]
    NoReply { address: u16 },
}

pub type Result<T> = std::result::Result<T, PanelError>;
