use hifitime::{Duration, Epoch};
use nalgebra::Vector3;

use crate::{carrier::Signal, prelude::SV};

/// Type of correction
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CorrectionKind {
    Orbit,
    Clock,
    HighRateClock,
    CodeBias,
    PhaseBias,
    Ura,
}

impl std::fmt::Display for CorrectionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::Orbit => write!(f, "orbit"),
            Self::Clock => write!(f, "clock"),
            Self::HighRateClock => write!(f, "hr-clock"),
            Self::CodeBias => write!(f, "code-bias"),
            Self::PhaseBias => write!(f, "phase-bias"),
            Self::Ura => write!(f, "ura"),
        }
    }
}

/// Identity of a stored correction. Only biases are signal specific.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CorrectionKey {
    pub sv: SV,
    pub signal: Option<Signal>,
    pub kind: CorrectionKind,
}

impl CorrectionKey {
    pub fn new(sv: SV, kind: CorrectionKind) -> Self {
        Self {
            sv,
            signal: None,
            kind,
        }
    }

    pub fn with_signal(sv: SV, signal: Signal, kind: CorrectionKind) -> Self {
        Self {
            sv,
            signal: Some(signal),
            kind,
        }
    }
}

impl std::fmt::Display for CorrectionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self.signal {
            Some(signal) => write!(f, "{}({}) {}", self.sv, signal, self.kind),
            None => write!(f, "{} {}", self.sv, self.kind),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Correction {
    /// Radial, along-track and cross-track delta (m), and their rates (m.s⁻¹)
    Orbit {
        iode: u32,
        delta_m: Vector3<f64>,
        rate_m_s: Option<Vector3<f64>>,
    },
    /// Clock polynomial
    Clock {
        c0_m: f64,
        c1_m_s: Option<f64>,
        c2_m_s2: Option<f64>,
    },
    /// Added to the polynomial constant term
    HighRateClock { c0_m: f64 },
    /// Added to the observed pseudo range
    CodeBias { bias_m: f64 },
    /// Added to the observed phase range
    PhaseBias {
        bias_m: f64,
        integer: bool,
        discontinuity: u8,
    },
    /// User range accuracy (m)
    Ura { ura_m: f64 },
}

impl Correction {
    pub fn kind(&self) -> CorrectionKind {
        match self {
            Self::Orbit { .. } => CorrectionKind::Orbit,
            Self::Clock { .. } => CorrectionKind::Clock,
            Self::HighRateClock { .. } => CorrectionKind::HighRateClock,
            Self::CodeBias { .. } => CorrectionKind::CodeBias,
            Self::PhaseBias { .. } => CorrectionKind::PhaseBias,
            Self::Ura { .. } => CorrectionKind::Ura,
        }
    }
}

/// [CorrectionRecord] as stored
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CorrectionRecord {
    pub key: CorrectionKey,
    pub correction: Correction,
    /// Issue of data SSR (4 bits)
    pub iod_ssr: u8,
    /// Reference epoch
    pub epoch: Epoch,
    /// Validity, either side of the reference epoch
    pub validity: Duration,
    pub provider_id: Option<u16>,
    pub solution_id: Option<u8>,
}

/// Modular "is newer" over the 4-bit issue of data range.
pub(crate) fn iod_is_newer(candidate: u8, current: u8) -> bool {
    let diff = candidate.wrapping_sub(current) & 0x0f;
    (1..8).contains(&diff)
}

impl CorrectionRecord {
    pub fn new(sv: SV, signal: Option<Signal>, correction: Correction, epoch: Epoch) -> Self {
        Self {
            key: CorrectionKey {
                sv,
                signal,
                kind: correction.kind(),
            },
            correction,
            iod_ssr: 0,
            epoch,
            validity: Duration::from_seconds(10.0),
            provider_id: None,
            solution_id: None,
        }
    }

    /// Copies and returns [CorrectionRecord] with issue of data
    pub fn with_iod_ssr(&self, iod_ssr: u8) -> Self {
        let mut s = *self;
        s.iod_ssr = iod_ssr & 0x0f;
        s
    }

    /// Copies and returns [CorrectionRecord] with validity duration
    pub fn with_validity(&self, validity: Duration) -> Self {
        let mut s = *self;
        s.validity = validity;
        s
    }

    /// True if `t` lies within the validity window
    pub fn is_valid_at(&self, t: Epoch) -> bool {
        (t - self.epoch).abs() <= self.validity
    }

    /// True if this [CorrectionRecord] should replace `stored`:
    /// newer issue of data, or same issue of data and at least as recent.
    /// Issues of data are only compared while `stored` is still valid:
    /// any later record replaces an expired one.
    pub fn supersedes(&self, stored: &Self) -> bool {
        if self.epoch > stored.epoch && !stored.is_valid_at(self.epoch) {
            true
        } else if self.iod_ssr == stored.iod_ssr {
            self.epoch >= stored.epoch
        } else {
            iod_is_newer(self.iod_ssr, stored.iod_ssr)
        }
    }
}

#[cfg(test)]
mod test {
    use super::{iod_is_newer, Correction, CorrectionRecord};
    use crate::prelude::{Constellation, Duration, Epoch, SV};

    #[test]
    fn modular_iod() {
        assert!(iod_is_newer(1, 0));
        assert!(iod_is_newer(7, 0));
        assert!(!iod_is_newer(8, 0));
        assert!(!iod_is_newer(0, 0));
        assert!(iod_is_newer(0, 15));
        assert!(iod_is_newer(2, 14));
        assert!(!iod_is_newer(14, 2));
    }

    #[test]
    fn expired_record_is_replaced() {
        let t0 = Epoch::from_gregorian_utc_at_midnight(2024, 1, 1);
        let g01 = SV::new(Constellation::GPS, 1);

        let stored = CorrectionRecord::new(g01, None, Correction::Ura { ura_m: 0.1 }, t0)
            .with_validity(Duration::from_seconds(10.0));

        // overlapping: modular ordering applies
        let overlapping = stored.with_iod_ssr(9);
        assert!(!overlapping.supersedes(&stored));

        let later = CorrectionRecord::new(
            g01,
            None,
            Correction::Ura { ura_m: 0.2 },
            t0 + Duration::from_seconds(3600.0),
        )
        .with_iod_ssr(9);

        assert!(later.supersedes(&stored));
        assert!(!stored.supersedes(&later));
    }

    #[test]
    fn validity_window() {
        let t0 = Epoch::from_gregorian_utc_at_midnight(2024, 1, 1);
        let g01 = SV::new(Constellation::GPS, 1);

        let record = CorrectionRecord::new(g01, None, Correction::Ura { ura_m: 0.1 }, t0)
            .with_validity(Duration::from_seconds(10.0));

        assert!(record.is_valid_at(t0));
        assert!(record.is_valid_at(t0 + Duration::from_seconds(10.0)));
        assert!(record.is_valid_at(t0 - Duration::from_seconds(10.0)));
        assert!(!record.is_valid_at(t0 + Duration::from_seconds(10.5)));
    }

    #[test]
    fn supersedes() {
        let t0 = Epoch::from_gregorian_utc_at_midnight(2024, 1, 1);
        let g01 = SV::new(Constellation::GPS, 1);

        let stored =
            CorrectionRecord::new(g01, None, Correction::Ura { ura_m: 0.1 }, t0).with_iod_ssr(3);

        let later = CorrectionRecord::new(
            g01,
            None,
            Correction::Ura { ura_m: 0.2 },
            t0 + Duration::from_seconds(5.0),
        );

        assert!(later.with_iod_ssr(3).supersedes(&stored));
        assert!(later.with_iod_ssr(4).supersedes(&stored));
        assert!(!later.with_iod_ssr(2).supersedes(&stored));

        let earlier = CorrectionRecord::new(
            g01,
            None,
            Correction::Ura { ura_m: 0.2 },
            t0 - Duration::from_seconds(5.0),
        );
        assert!(!earlier.with_iod_ssr(3).supersedes(&stored));
        assert!(stored.supersedes(&stored));
    }
}
