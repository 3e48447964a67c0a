//! Decoded SSR message content, shared by all supported families.
use hifitime::Duration;

use crate::{
    carrier::Signal,
    prelude::{Constellation, SV},
    ssr::compact::CompactMessage,
};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Update interval (DF391) in seconds, indexed by the 4-bit field value.
pub const UPDATE_INTERVALS_S: [u32; 16] = [
    1, 2, 5, 10, 15, 30, 60, 120, 240, 300, 600, 900, 1800, 3600, 7200, 10800,
];

/// SSR update interval, as broadcasted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct UpdateInterval(pub u8);

impl UpdateInterval {
    pub fn seconds(&self) -> u32 {
        UPDATE_INTERVALS_S[(self.0 & 0x0f) as usize]
    }

    pub fn duration(&self) -> Duration {
        Duration::from_seconds(self.seconds() as f64)
    }
}

/// Content type of an SSR message
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MessageKind {
    Orbit,
    Clock,
    Combined,
    HighRateClock,
    CodeBias,
    PhaseBias,
    Ura,
}

impl std::fmt::Display for MessageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::Orbit => write!(f, "orbit"),
            Self::Clock => write!(f, "clock"),
            Self::Combined => write!(f, "orbit+clock"),
            Self::HighRateClock => write!(f, "high-rate clock"),
            Self::CodeBias => write!(f, "code bias"),
            Self::PhaseBias => write!(f, "phase bias"),
            Self::Ura => write!(f, "ura"),
        }
    }
}

/// RTCM-SSR and IGS-SSR message header
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SsrHeader {
    /// Epoch time tag: time of week (s), or Glonass time of day for RTCM Glonass messages.
    pub epoch_s: u32,
    pub update_interval: UpdateInterval,
    /// More messages follow for this epoch and message type
    pub multiple_message: bool,
    /// Satellite reference datum (orbit and combined messages only): false is ITRF.
    pub reference_datum: bool,
    /// Issue of data SSR (4 bits)
    pub iod_ssr: u8,
    pub provider_id: u16,
    pub solution_id: u8,
}

/// Orbit correction, in the radial / along-track / cross-track frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrbitCorrection {
    pub sv: SV,
    /// Issue of data of the broadcast ephemeris this correction applies to.
    pub iode: u32,
    pub radial_m: Option<f64>,
    pub along_m: Option<f64>,
    pub cross_m: Option<f64>,
    pub radial_rate_m_s: Option<f64>,
    pub along_rate_m_s: Option<f64>,
    pub cross_rate_m_s: Option<f64>,
}

/// Clock correction polynomial
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClockCorrection {
    pub sv: SV,
    pub c0_m: Option<f64>,
    pub c1_m_s: Option<f64>,
    pub c2_m_s2: Option<f64>,
}

/// High-rate clock term, added to the polynomial constant term.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HighRateClock {
    pub sv: SV,
    pub c0_m: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CodeBias {
    pub signal: Signal,
    pub bias_m: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SatelliteCodeBias {
    pub sv: SV,
    pub biases: Vec<CodeBias>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhaseBias {
    pub signal: Signal,
    /// Signal is integer ambiguity compatible
    pub integer: bool,
    /// Wide lane integer indicator
    pub wide_lane: u8,
    /// Discontinuity counter. A change means the bias jumped.
    pub discontinuity: u8,
    pub bias_m: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SatellitePhaseBias {
    pub sv: SV,
    /// Yaw angle, in semicircles
    pub yaw_semicircles: Option<f64>,
    /// Yaw rate, in semicircles per second
    pub yaw_rate_semicircles_s: Option<f64>,
    pub biases: Vec<PhaseBias>,
}

/// User range accuracy index (DF389): 3 bit class and 3 bit value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct UraIndex(pub u8);

impl UraIndex {
    pub fn class(&self) -> u8 {
        (self.0 >> 3) & 0x07
    }

    pub fn value(&self) -> u8 {
        self.0 & 0x07
    }

    /// Accuracy in meters, `None` when undefined.
    pub fn meters(&self) -> Option<f64> {
        match self.0 & 0x3f {
            0 => None,
            63 => Some(5.4665),
            _ => {
                let (class, value) = (self.class() as i32, self.value() as f64);
                let mm = 3.0_f64.powi(class) * (1.0 + value / 4.0) - 1.0;
                Some(mm * 1.0E-3)
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UraCorrection {
    pub sv: SV,
    pub ura: UraIndex,
}

/// RTCM-SSR or IGS-SSR
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SsrFamily {
    /// RTCM 10403 SSR messages
    Rtcm,
    /// IGS-SSR messages, carried by message 4076
    Igs { version: u8 },
}

#[derive(Debug, Clone, PartialEq)]
pub enum SsrBody {
    Orbit(Vec<OrbitCorrection>),
    Clock(Vec<ClockCorrection>),
    Combined(Vec<(OrbitCorrection, ClockCorrection)>),
    HighRateClock(Vec<HighRateClock>),
    CodeBias(Vec<SatelliteCodeBias>),
    PhaseBias {
        /// Dispersive bias consistency indicator
        dispersive: bool,
        /// Melbourne-Wübbena consistency indicator
        mw_consistency: bool,
        satellites: Vec<SatellitePhaseBias>,
    },
    Ura(Vec<UraCorrection>),
}

impl SsrBody {
    pub fn kind(&self) -> MessageKind {
        match self {
            Self::Orbit(_) => MessageKind::Orbit,
            Self::Clock(_) => MessageKind::Clock,
            Self::Combined(_) => MessageKind::Combined,
            Self::HighRateClock(_) => MessageKind::HighRateClock,
            Self::CodeBias(_) => MessageKind::CodeBias,
            Self::PhaseBias { .. } => MessageKind::PhaseBias,
            Self::Ura(_) => MessageKind::Ura,
        }
    }

    /// Number of satellites described
    pub fn len(&self) -> usize {
        match self {
            Self::Orbit(v) => v.len(),
            Self::Clock(v) => v.len(),
            Self::Combined(v) => v.len(),
            Self::HighRateClock(v) => v.len(),
            Self::CodeBias(v) => v.len(),
            Self::PhaseBias { satellites, .. } => satellites.len(),
            Self::Ura(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// RTCM-SSR or IGS-SSR message
#[derive(Debug, Clone, PartialEq)]
pub struct SsrMessage {
    pub family: SsrFamily,
    pub constellation: Constellation,
    pub header: SsrHeader,
    pub body: SsrBody,
}

impl SsrMessage {
    pub fn kind(&self) -> MessageKind {
        self.body.kind()
    }
}

/// Any supported correction message
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Ssr(SsrMessage),
    Compact(CompactMessage),
}

#[cfg(test)]
mod test {
    use super::{UpdateInterval, UraIndex};

    #[test]
    fn update_intervals() {
        assert_eq!(UpdateInterval(0).seconds(), 1);
        assert_eq!(UpdateInterval(2).seconds(), 5);
        assert_eq!(UpdateInterval(15).seconds(), 10800);
    }

    #[test]
    fn ura_quality_index() {
        assert_eq!(UraIndex(0).meters(), None);
        assert_eq!(UraIndex(63).meters(), Some(5.4665));

        // class 0, value 1: 0.25 mm
        let ura = UraIndex(1).meters().unwrap();
        assert!((ura - 0.25E-3).abs() < 1.0E-12);

        // class 2, value 4: 9 * 2 - 1 = 17 mm
        let ura = UraIndex(0b010_100).meters().unwrap();
        assert!((ura - 17.0E-3).abs() < 1.0E-12);
    }
}
