use crate::{constants::SPEED_OF_LIGHT_M_S, prelude::Constellation};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, PartialOrd, Eq, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Carrier {
    /// L1 (GPS/QZSS/SBAS) same frequency as E1 and B1aB1c
    #[default]
    L1,
    /// L2 (GPS/QZSS)
    L2,
    /// L5 (GPS/QZSS/SBAS) same frequency as E5A and B2A
    L5,
    /// L6 (QZSS) same frequency as E6
    L6,
    /// E1 (Galileo)
    E1,
    /// E5 (Galileo) same frequency as B2
    E5,
    /// E5A (Galileo) same frequency as L5
    E5A,
    /// E5B (Galileo) same frequency as B2iB2b
    E5B,
    /// E6 (Galileo) same frequency as L6
    E6,
    /// B1aB1c (BDS) same frequency as L1
    B1aB1c,
    /// B1I (BDS)
    B1I,
    /// B2I/B2B (BDS) same frequency as E5b
    B2iB2b,
    /// B2 (BDS) same frequency as E5
    B2,
    /// B2A (BDS) same frequency as L5 and E5A
    B2A,
    /// B3 (BDS)
    B3,
    /// G1 (Glonass FDMA)
    G1,
    /// G1a (Glonass CDMA)
    G1a,
    /// G2 (Glonass FDMA)
    G2,
    /// G2a (Glonass CDMA)
    G2a,
    /// G3 (Glonass CDMA)
    G3,
}

impl std::fmt::Display for Carrier {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> Result<(), std::fmt::Error> {
        match self {
            Self::L1 => write!(f, "L1"),
            Self::L2 => write!(f, "L2"),
            Self::L5 => write!(f, "L5"),
            Self::L6 => write!(f, "L6"),
            Self::E1 => write!(f, "E1"),
            Self::E5 => write!(f, "E5"),
            Self::E5A => write!(f, "E5A"),
            Self::E5B => write!(f, "E5B"),
            Self::E6 => write!(f, "E6"),
            Self::B1I => write!(f, "B1I"),
            Self::B1aB1c => write!(f, "B1A/B1C"),
            Self::B2iB2b => write!(f, "B2I/B2B"),
            Self::B2 => write!(f, "B2"),
            Self::B3 => write!(f, "B3"),
            Self::B2A => write!(f, "B2A"),
            Self::G1 => write!(f, "G1"),
            Self::G1a => write!(f, "G1a"),
            Self::G2 => write!(f, "G2"),
            Self::G2a => write!(f, "G2a"),
            Self::G3 => write!(f, "G3"),
        }
    }
}

impl Carrier {
    /// Nominal frequency in Hz. Glonass FDMA carriers are expressed for channel 0.
    pub fn frequency(&self) -> f64 {
        match self {
            Self::L1 | Self::E1 | Self::B1aB1c => 1575.42E6_f64,
            Self::L2 => 1227.60E6_f64,
            Self::L5 | Self::E5A | Self::B2A => 1176.45E6_f64,
            Self::E5 | Self::B2 => 1191.795E6_f64,
            Self::L6 | Self::E6 => 1278.750E6_f64,
            Self::B3 => 1268.52E6_f64,
            Self::E5B | Self::B2iB2b => 1207.14E6_f64,
            Self::B1I => 1561.098E6_f64,
            Self::G1 => 1602.0E6_f64,
            Self::G1a => 1600.995E6_f64,
            Self::G2 => 1246.0E6_f64,
            Self::G2a => 1248.06E6_f64,
            Self::G3 => 1202.025E6_f64,
        }
    }

    /// Frequency in Hz, taking the Glonass FDMA channel number into account.
    pub fn channel_frequency(&self, channel: i8) -> f64 {
        match self {
            Self::G1 => self.frequency() + channel as f64 * 0.5625E6,
            Self::G2 => self.frequency() + channel as f64 * 0.4375E6,
            _ => self.frequency(),
        }
    }

    pub fn wavelength(&self) -> f64 {
        SPEED_OF_LIGHT_M_S / self.frequency()
    }

    /// Wavelength in meters, taking the Glonass FDMA channel number into account.
    pub fn channel_wavelength(&self, channel: i8) -> f64 {
        SPEED_OF_LIGHT_M_S / self.channel_frequency(channel)
    }

    /// RINEX frequency band number
    pub fn band(&self) -> u8 {
        match self {
            Self::L1 | Self::E1 | Self::B1aB1c | Self::G1 => 1,
            Self::L2 | Self::B1I | Self::G2 => 2,
            Self::G3 => 3,
            Self::G1a => 4,
            Self::L5 | Self::E5A | Self::B2A => 5,
            Self::L6 | Self::E6 | Self::B3 | Self::G2a => 6,
            Self::E5B | Self::B2iB2b => 7,
            Self::E5 | Self::B2 => 8,
        }
    }

    /// Identifies the [Carrier] from the RINEX band number,
    /// which is [Constellation] dependent.
    pub fn from_band(constellation: Constellation, band: u8) -> Option<Self> {
        match constellation {
            Constellation::GPS | Constellation::QZSS => match band {
                1 => Some(Self::L1),
                2 => Some(Self::L2),
                5 => Some(Self::L5),
                6 => Some(Self::L6),
                _ => None,
            },
            Constellation::Galileo => match band {
                1 => Some(Self::E1),
                5 => Some(Self::E5A),
                6 => Some(Self::E6),
                7 => Some(Self::E5B),
                8 => Some(Self::E5),
                _ => None,
            },
            Constellation::BeiDou => match band {
                1 => Some(Self::B1aB1c),
                2 => Some(Self::B1I),
                5 => Some(Self::B2A),
                6 => Some(Self::B3),
                7 => Some(Self::B2iB2b),
                8 => Some(Self::B2),
                _ => None,
            },
            Constellation::Glonass => match band {
                1 => Some(Self::G1),
                2 => Some(Self::G2),
                3 => Some(Self::G3),
                4 => Some(Self::G1a),
                6 => Some(Self::G2a),
                _ => None,
            },
            Constellation::SBAS => match band {
                1 => Some(Self::L1),
                5 => Some(Self::L5),
                _ => None,
            },
            _ => None,
        }
    }
}

/// Tracked [Signal]: a [Carrier] and a RINEX tracking code attribute
/// (for example 'C', 'W', 'Q' or 'X').
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Signal {
    pub carrier: Carrier,
    pub attribute: char,
}

impl std::fmt::Display for Signal {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "L{}{}", self.carrier.band(), self.attribute)
    }
}

impl Signal {
    pub fn new(carrier: Carrier, attribute: char) -> Self {
        Self { carrier, attribute }
    }

    /// Builds a [Signal] from a RINEX observable code like "1C" or "5Q".
    pub fn from_rinex(constellation: Constellation, code: &str) -> Option<Self> {
        let mut chars = code.trim().chars();
        let band = chars.next()?.to_digit(10)? as u8;
        let attribute = chars.next()?;
        if chars.next().is_some() {
            return None;
        }
        let carrier = Carrier::from_band(constellation, band)?;
        Some(Self::new(carrier, attribute))
    }

    pub fn frequency(&self, glonass_channel: i8) -> f64 {
        self.carrier.channel_frequency(glonass_channel)
    }

    pub fn wavelength(&self, glonass_channel: i8) -> f64 {
        self.carrier.channel_wavelength(glonass_channel)
    }
}
