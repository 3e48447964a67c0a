//! RTCM3 transport frame: preamble, 10-bit length, payload, CRC-24Q.
use crate::ssr::DecodingError;

/// RTCM3 frame preamble
pub const PREAMBLE: u8 = 0xD3;

const MAX_PAYLOAD_LEN: usize = 1023;

const CRC24Q_POLY: u32 = 0x1864CFB;

/// CRC-24Q (Qualcomm) checksum, as used by RTCM3 frames.
pub fn crc24q(data: &[u8]) -> u32 {
    let mut crc = 0u32;
    for byte in data.iter() {
        crc ^= (*byte as u32) << 16;
        for _ in 0..8 {
            crc <<= 1;
            if crc & 0x100_0000 != 0 {
                crc ^= CRC24Q_POLY;
            }
        }
    }
    crc & 0xFF_FFFF
}

/// Verified RTCM3 [Frame]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frame<'a> {
    pub payload: &'a [u8],
}

impl<'a> Frame<'a> {
    /// Decodes the [Frame] starting at the first byte of `buf`.
    /// Returns the [Frame] and the total number of bytes it spans.
    pub fn decode(buf: &'a [u8]) -> Result<(Self, usize), DecodingError> {
        if buf.len() < 3 {
            return Err(DecodingError::Truncated);
        }
        if buf[0] != PREAMBLE {
            return Err(DecodingError::Preamble);
        }

        let len = (((buf[1] & 0x03) as usize) << 8) | buf[2] as usize;
        let total = 3 + len + 3;

        if buf.len() < total {
            return Err(DecodingError::Truncated);
        }

        let crc = ((buf[total - 3] as u32) << 16)
            | ((buf[total - 2] as u32) << 8)
            | buf[total - 1] as u32;

        if crc24q(&buf[..total - 3]) != crc {
            return Err(DecodingError::Checksum);
        }

        Ok((
            Self {
                payload: &buf[3..3 + len],
            },
            total,
        ))
    }

    /// Message number carried by this [Frame]
    pub fn message_number(&self) -> Option<u16> {
        if self.payload.len() < 2 {
            return None;
        }
        Some(((self.payload[0] as u16) << 4) | (self.payload[1] as u16 >> 4))
    }
}

/// Wraps a message payload into an RTCM3 frame.
pub fn encode_frame(payload: &[u8]) -> Result<Vec<u8>, DecodingError> {
    if payload.len() > MAX_PAYLOAD_LEN {
        return Err(DecodingError::TooManyEntries(payload.len()));
    }

    let mut frame = Vec::with_capacity(payload.len() + 6);
    frame.push(PREAMBLE);
    frame.push((payload.len() >> 8) as u8 & 0x03);
    frame.push((payload.len() & 0xff) as u8);
    frame.extend_from_slice(payload);

    let crc = crc24q(&frame);
    frame.push((crc >> 16) as u8);
    frame.push((crc >> 8) as u8);
    frame.push(crc as u8);
    Ok(frame)
}
