// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Crate-wide error types.
//!
//! Every fallible operation returns a typed error; nothing in the receive
//! path panics or aborts (spec §7). Errors are plain enums with manual
//! `Display`/`std::error::Error` impls, following the layered structure of
//! the wire codec: [`WireError`] at the byte-stream seam, [`CodecError`] at
//! the PDU-layer seam, [`MessageError`] at the message-assembly seam, all
//! folded into the top-level [`Error`].

use std::fmt;

/// Errors from the byte-stream cursor (push/pop past the end of a buffer).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireError {
    /// A pop would read past the end of the buffer.
    Truncated { offset: usize, needed: usize, len: usize },
    /// A push would write past the end of the buffer.
    Overflow { offset: usize, needed: usize, len: usize },
}

impl fmt::Display for WireError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WireError::Truncated { offset, needed, len } => write!(
                f,
                "truncated read at offset {offset}: needed {needed} bytes, buffer has {len}"
            ),
            WireError::Overflow { offset, needed, len } => write!(
                f,
                "buffer overflow at offset {offset}: needed {needed} bytes, buffer has {len}"
            ),
        }
    }
}

impl std::error::Error for WireError {}

/// Errors decoding or validating a single PDU layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    Wire(WireError),
    /// The fixed OTP-E1.59 preamble did not match.
    BadPreamble,
    /// A layer's Vector field was not one of its allowed values.
    BadVector { layer: &'static str, vector: u16 },
    /// A field was outside its declared range (spec §3).
    FieldOutOfRange { layer: &'static str, field: &'static str },
    /// `PDULength` did not equal the encoded size minus the layer's length offset.
    LengthMismatch { layer: &'static str, expected: u16, actual: u16 },
    /// Page exceeded LastPage, or some other structural inconsistency.
    Malformed { layer: &'static str, reason: &'static str },
    /// Message carried a reserved priority value and must be discarded (spec §3).
    ReservedPriority { priority: u8 },
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodecError::Wire(e) => write!(f, "{e}"),
            CodecError::BadPreamble => write!(f, "OTP preamble mismatch"),
            CodecError::BadVector { layer, vector } => {
                write!(f, "{layer}: unexpected vector {vector:#06x}")
            }
            CodecError::FieldOutOfRange { layer, field } => {
                write!(f, "{layer}: field {field} out of range")
            }
            CodecError::LengthMismatch { layer, expected, actual } => write!(
                f,
                "{layer}: PDULength mismatch, expected {expected}, got {actual}"
            ),
            CodecError::Malformed { layer, reason } => write!(f, "{layer}: {reason}"),
            CodecError::ReservedPriority { priority } => {
                write!(f, "reserved priority {priority} MUST be discarded")
            }
        }
    }
}

impl std::error::Error for CodecError {}

impl From<WireError> for CodecError {
    fn from(e: WireError) -> Self {
        CodecError::Wire(e)
    }
}

/// Errors assembling or paging a multi-layer message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageError {
    Codec(CodecError),
    /// Adding an item would push the encoded message past its protocol maximum.
    MessageTooBig { max: usize },
    /// A list (module-adv, name-adv, system-adv) is already at its maximum payload.
    ListFull { max: usize },
}

impl fmt::Display for MessageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageError::Codec(e) => write!(f, "{e}"),
            MessageError::MessageTooBig { max } => {
                write!(f, "message would exceed maximum size of {max} octets")
            }
            MessageError::ListFull { max } => {
                write!(f, "list would exceed maximum payload of {max} octets")
            }
        }
    }
}

impl std::error::Error for MessageError {}

impl From<CodecError> for MessageError {
    fn from(e: CodecError) -> Self {
        MessageError::Codec(e)
    }
}

impl From<WireError> for MessageError {
    fn from(e: WireError) -> Self {
        MessageError::Codec(CodecError::Wire(e))
    }
}

/// Top-level crate error, unifying the layered errors above for the public API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    Message(MessageError),
    /// The datagram was discarded as malformed (spec §7, `MalformedDatagram`).
    MalformedDatagram(CodecError),
    /// The datagram's folio was stale and was discarded (spec §7, `StaleFolio`).
    StaleFolio,
    /// A requested CID rename target was already in use.
    CidInUse,
    /// The underlying transport failed.
    Transport(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Message(e) => write!(f, "{e}"),
            Error::MalformedDatagram(e) => write!(f, "malformed datagram: {e}"),
            Error::StaleFolio => write!(f, "stale folio discarded"),
            Error::CidInUse => write!(f, "target CID already in use"),
            Error::Transport(reason) => write!(f, "transport error: {reason}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<MessageError> for Error {
    fn from(e: MessageError) -> Self {
        Error::Message(e)
    }
}

impl From<CodecError> for Error {
    fn from(e: CodecError) -> Self {
        Error::MalformedDatagram(e)
    }
}

impl From<WireError> for Error {
    fn from(e: WireError) -> Self {
        Error::MalformedDatagram(CodecError::Wire(e))
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_error_display() {
        let e = WireError::Truncated { offset: 4, needed: 2, len: 4 };
        assert_eq!(
            format!("{e}"),
            "truncated read at offset 4: needed 2 bytes, buffer has 4"
        );
    }

    #[test]
    fn error_conversion_chain() {
        let wire = WireError::Overflow { offset: 0, needed: 4, len: 2 };
        let codec: CodecError = wire.into();
        let msg: MessageError = codec.into();
        let top: Error = msg.into();
        assert!(matches!(top, Error::MalformedDatagram(_)));
    }
}
