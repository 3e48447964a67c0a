//! Bit level cursor and writer, MSB first, as used by every SSR format.
use num_traits::NumCast;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum BitError {
    #[error("bit span {offset}+{nbits} exceeds buffer length ({len} bits)")]
    OutOfRange {
        offset: usize,
        nbits: usize,
        len: usize,
    },
    #[error("invalid field width: {0} bits")]
    InvalidWidth(usize),
    #[error("value does not fit in the requested field")]
    Overflow,
    #[error("field has no reserved pattern to encode a missing value")]
    NoSentinel,
}

/// Reserved raw pattern, denoting "value not provided".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sentinel {
    /// Every raw pattern is a valid value
    None,
    /// Most negative two's complement value: 1 followed by zeros.
    SignedMin,
    /// All bits set
    AllOnes,
    /// Specific raw pattern
    Raw(u64),
}

impl Sentinel {
    fn raw(&self, nbits: usize) -> Option<u64> {
        match self {
            Self::None => None,
            Self::SignedMin => Some(1u64 << (nbits - 1)),
            Self::AllOnes => Some(mask(nbits)),
            Self::Raw(raw) => Some(*raw),
        }
    }
}

/// Numeric field description: width, resolution and reserved pattern.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Field {
    pub nbits: usize,
    pub scale: f64,
    pub signed: bool,
    pub sentinel: Sentinel,
}

impl Field {
    /// Two's complement field, the most negative value being reserved.
    pub const fn signed(nbits: usize, scale: f64) -> Self {
        Self {
            nbits,
            scale,
            signed: true,
            sentinel: Sentinel::SignedMin,
        }
    }

    /// Unsigned field without reserved pattern.
    pub const fn unsigned(nbits: usize, scale: f64) -> Self {
        Self {
            nbits,
            scale,
            signed: false,
            sentinel: Sentinel::None,
        }
    }

    /// Copies [Field] with another [Sentinel]
    pub const fn with_sentinel(mut self, sentinel: Sentinel) -> Self {
        self.sentinel = sentinel;
        self
    }
}

const fn mask(nbits: usize) -> u64 {
    if nbits >= 64 {
        u64::MAX
    } else {
        (1u64 << nbits) - 1
    }
}

fn sign_extend(raw: u64, nbits: usize) -> i64 {
    if nbits == 0 {
        0
    } else if nbits >= 64 {
        raw as i64
    } else if raw & (1u64 << (nbits - 1)) != 0 {
        (raw | (u64::MAX << nbits)) as i64
    } else {
        raw as i64
    }
}

/// Saved [BitReader] position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mark(usize);

/// [BitReader] is a cursor over an immutable byte buffer.
#[derive(Debug, Clone)]
pub struct BitReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> BitReader<'a> {
    /// Creates a new [BitReader] positioned on the first bit.
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Current cursor position, in bits.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Total buffer length, in bits.
    pub fn len(&self) -> usize {
        self.buf.len() * 8
    }

    /// True if the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Number of bits left to consume.
    pub fn remaining(&self) -> usize {
        self.len().saturating_sub(self.pos)
    }

    /// Saves current position, to come back to it with [Self::reset]
    pub fn mark(&self) -> Mark {
        Mark(self.pos)
    }

    /// Rewinds to a previously saved [Mark]
    pub fn reset(&mut self, mark: Mark) {
        self.pos = mark.0;
    }

    fn check(&self, nbits: usize) -> Result<(), BitError> {
        if nbits > 64 {
            return Err(BitError::InvalidWidth(nbits));
        }
        if self.pos + nbits > self.len() {
            return Err(BitError::OutOfRange {
                offset: self.pos,
                nbits,
                len: self.len(),
            });
        }
        Ok(())
    }

    /// Skips `nbits`.
    pub fn skip(&mut self, nbits: usize) -> Result<(), BitError> {
        if self.pos + nbits > self.len() {
            return Err(BitError::OutOfRange {
                offset: self.pos,
                nbits,
                len: self.len(),
            });
        }
        self.pos += nbits;
        Ok(())
    }

    /// Reads an unsigned field of `nbits` (up to 64).
    pub fn read_u64(&mut self, nbits: usize) -> Result<u64, BitError> {
        self.check(nbits)?;

        let mut value = 0u64;
        let mut left = nbits;

        while left > 0 {
            let byte = self.buf[self.pos / 8];
            let avail = 8 - self.pos % 8;
            let take = avail.min(left);
            let chunk = (byte >> (avail - take)) as u64 & mask(take);
            value = if take == 64 { chunk } else { (value << take) | chunk };
            self.pos += take;
            left -= take;
        }

        Ok(value)
    }

    /// Reads a two's complement field of `nbits` (up to 64).
    pub fn read_i64(&mut self, nbits: usize) -> Result<i64, BitError> {
        let raw = self.read_u64(nbits)?;
        Ok(sign_extend(raw, nbits))
    }

    /// Reads a single bit flag.
    pub fn read_bool(&mut self) -> Result<bool, BitError> {
        Ok(self.read_u64(1)? == 1)
    }

    /// Reads an unsigned field and converts it to desired integer type.
    pub fn read_as<T: NumCast>(&mut self, nbits: usize) -> Result<T, BitError> {
        let raw = self.read_u64(nbits)?;
        T::from(raw).ok_or(BitError::Overflow)
    }

    /// Reads a two's complement field scaled by `scale`.
    /// Returns `None` when the raw content matches the [Sentinel].
    pub fn read_scaled(
        &mut self,
        nbits: usize,
        scale: f64,
        sentinel: Sentinel,
    ) -> Result<Option<f64>, BitError> {
        self.read_field(&Field {
            nbits,
            scale,
            signed: true,
            sentinel,
        })
    }

    /// Reads a described [Field]. Returns `None` when not provided.
    pub fn read_field(&mut self, field: &Field) -> Result<Option<f64>, BitError> {
        if field.nbits == 0 {
            return Err(BitError::InvalidWidth(0));
        }

        let raw = self.read_u64(field.nbits)?;

        if field.sentinel.raw(field.nbits) == Some(raw) {
            return Ok(None);
        }

        let value = if field.signed {
            sign_extend(raw, field.nbits) as f64
        } else {
            raw as f64
        };

        Ok(Some(value * field.scale))
    }
}

/// [BitWriter] packs fields MSB first into a growing byte buffer.
#[derive(Debug, Clone, Default)]
pub struct BitWriter {
    buf: Vec<u8>,
    pos: usize,
}

impl BitWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of bits written so far.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Writes the `nbits` LSB of `value`.
    pub fn write_u64(&mut self, value: u64, nbits: usize) -> Result<(), BitError> {
        if nbits > 64 {
            return Err(BitError::InvalidWidth(nbits));
        }
        if value & !mask(nbits) != 0 {
            return Err(BitError::Overflow);
        }

        for i in (0..nbits).rev() {
            if self.pos % 8 == 0 {
                self.buf.push(0);
            }
            if (value >> i) & 1 == 1 {
                let last = self.buf.len() - 1;
                self.buf[last] |= 0x80 >> (self.pos % 8);
            }
            self.pos += 1;
        }

        Ok(())
    }

    /// Writes a two's complement value on `nbits`.
    pub fn write_i64(&mut self, value: i64, nbits: usize) -> Result<(), BitError> {
        if nbits == 0 || nbits > 64 {
            return Err(BitError::InvalidWidth(nbits));
        }
        if nbits < 64 {
            let min = -(1i64 << (nbits - 1));
            let max = (1i64 << (nbits - 1)) - 1;
            if value < min || value > max {
                return Err(BitError::Overflow);
            }
        }
        self.write_u64(value as u64 & mask(nbits), nbits)
    }

    /// Writes a single bit flag.
    pub fn write_bool(&mut self, flag: bool) -> Result<(), BitError> {
        self.write_u64(flag as u64, 1)
    }

    /// Writes a described [Field]. `None` is encoded with its [Sentinel].
    pub fn write_field(&mut self, field: &Field, value: Option<f64>) -> Result<(), BitError> {
        let sentinel = field.sentinel.raw(field.nbits);

        let raw = match value {
            None => sentinel.ok_or(BitError::NoSentinel)?,
            Some(value) => {
                let scaled = (value / field.scale).round();
                if !scaled.is_finite() {
                    return Err(BitError::Overflow);
                }
                let raw = if field.signed {
                    let scaled = scaled as i64;
                    if field.nbits < 64 {
                        let min = -(1i64 << (field.nbits - 1));
                        let max = (1i64 << (field.nbits - 1)) - 1;
                        if scaled < min || scaled > max {
                            return Err(BitError::Overflow);
                        }
                    }
                    scaled as u64 & mask(field.nbits)
                } else {
                    if scaled < 0.0 || scaled as u64 > mask(field.nbits) {
                        return Err(BitError::Overflow);
                    }
                    scaled as u64
                };
                if sentinel == Some(raw) {
                    return Err(BitError::Overflow);
                }
                raw
            },
        };

        self.write_u64(raw, field.nbits)
    }

    /// Returns the packed bytes, last byte zero padded.
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}
