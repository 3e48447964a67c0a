//! State Space Representation (SSR) correction messages.
use thiserror::Error;

use crate::prelude::Constellation;

mod assembler;
mod bits;
mod compact;
mod decoder;
mod frame;
mod message;
mod rtcm;
mod signal;

pub use assembler::{SequenceAssembler, SequenceKey};
pub use bits::{BitError, BitReader, BitWriter, Field, Mark, Sentinel};
pub use compact::{CompactHeader, CompactMask, CompactMessage, GnssMask, NetworkMask};
pub use decoder::{Decoded, Decoder};
pub use frame::{crc24q, encode_frame, Frame, PREAMBLE};
pub use message::{
    ClockCorrection, CodeBias, HighRateClock, Message, MessageKind, OrbitCorrection, PhaseBias,
    SatelliteCodeBias, SatellitePhaseBias, SsrBody, SsrFamily, SsrHeader, SsrMessage,
    UpdateInterval, UraCorrection, UraIndex, UPDATE_INTERVALS_S,
};
pub use signal::SignalTable;

/// Message number of IGS-SSR messages
pub const IGS_SSR_MESSAGE: u16 = 4076;

/// Message number of Compact SSR messages
pub const COMPACT_SSR_MESSAGE: u16 = 4073;

/// Errors while decoding (or encoding) correction messages.
/// The faulty message is dropped, the stream goes on.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DecodingError {
    #[error("message truncated")]
    Truncated,
    #[error("bit field error: {0}")]
    Bits(BitError),
    #[error("{expected} satellites declared but only {found} decodable")]
    LengthMismatch { expected: usize, found: usize },
    #[error("iod ssr {found} does not match active mask iod {expected}")]
    IodMismatch { expected: u8, found: u8 },
    #[error("no compact ssr mask received yet")]
    MissingMask,
    #[error("frame checksum error")]
    Checksum,
    #[error("invalid frame preamble")]
    Preamble,
    #[error("unknown {constellation} signal identifier {id}")]
    UnknownSignal {
        constellation: Constellation,
        id: u8,
    },
    #[error("{0} signal has no ssr identifier")]
    UnmappedSignal(crate::carrier::Signal),
    #[error("unknown message type {0}")]
    UnknownMessage(u16),
    #[error("unknown message {message} subtype {subtype}")]
    UnknownSubtype { message: u16, subtype: u8 },
    #[error("unknown compact ssr gnss id {0}")]
    UnknownGnssId(u8),
    #[error("constellation {0} not supported")]
    UnsupportedConstellation(Constellation),
    #[error("invalid satellite {0}")]
    InvalidSatellite(crate::prelude::SV),
    #[error("too many entries: {0}")]
    TooManyEntries(usize),
}

impl From<BitError> for DecodingError {
    fn from(e: BitError) -> Self {
        match e {
            BitError::OutOfRange { .. } => Self::Truncated,
            e => Self::Bits(e),
        }
    }
}
