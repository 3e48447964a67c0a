use std::collections::BTreeMap;

use nalgebra::Vector3;

use crate::{
    carrier::Signal,
    corrections::{Correction, CorrectionKey, CorrectionKind, CorrectionRecord},
    prelude::{Epoch, SV},
};

/// Orbit correction evaluated at the snapshot epoch
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrbitState {
    /// Issue of data of the ephemeris this correction applies to
    pub iode: u32,
    /// Radial, along-track, cross-track (m)
    pub rac_m: Vector3<f64>,
}

/// Clock correction evaluated at the snapshot epoch
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClockState {
    /// Total correction (m), high rate term included
    pub offset_m: f64,
}

/// [CorrectionSnapshot] is an owned copy of the valid records
/// at a given [Epoch].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CorrectionSnapshot {
    pub epoch: Option<Epoch>,
    records: BTreeMap<CorrectionKey, CorrectionRecord>,
}

impl CorrectionSnapshot {
    pub(crate) fn new(epoch: Epoch, records: BTreeMap<CorrectionKey, CorrectionRecord>) -> Self {
        Self {
            epoch: Some(epoch),
            records,
        }
    }

    /// Builds a [CorrectionSnapshot] from a set of [CorrectionRecord]s,
    /// regardless of their validity.
    pub fn from_records<I: IntoIterator<Item = CorrectionRecord>>(epoch: Epoch, records: I) -> Self {
        Self {
            epoch: Some(epoch),
            records: records.into_iter().map(|r| (r.key, r)).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CorrectionRecord> + '_ {
        self.records.values()
    }

    pub fn record(
        &self,
        sv: SV,
        signal: Option<Signal>,
        kind: CorrectionKind,
    ) -> Option<&CorrectionRecord> {
        self.records.get(&CorrectionKey { sv, signal, kind })
    }

    fn elapsed_s(&self, record: &CorrectionRecord) -> f64 {
        match self.epoch {
            Some(t) => (t - record.epoch).to_seconds(),
            None => 0.0,
        }
    }

    /// Orbit correction of this satellite, propagated with its rates
    pub fn orbit(&self, sv: SV) -> Option<OrbitState> {
        let record = self.record(sv, None, CorrectionKind::Orbit)?;
        match record.correction {
            Correction::Orbit {
                iode,
                delta_m,
                rate_m_s,
            } => {
                let dt = self.elapsed_s(record);
                let rac_m = match rate_m_s {
                    Some(rate) => delta_m + rate * dt,
                    None => delta_m,
                };
                Some(OrbitState { iode, rac_m })
            },
            _ => None,
        }
    }

    /// Clock correction of this satellite. A high rate clock
    /// correction is only applied on top of a clock polynomial.
    pub fn clock(&self, sv: SV) -> Option<ClockState> {
        let record = self.record(sv, None, CorrectionKind::Clock)?;

        let mut offset_m = match record.correction {
            Correction::Clock {
                c0_m,
                c1_m_s,
                c2_m_s2,
            } => {
                let dt = self.elapsed_s(record);
                c0_m + c1_m_s.unwrap_or(0.0) * dt + c2_m_s2.unwrap_or(0.0) * dt * dt
            },
            _ => return None,
        };

        if let Some(hr) = self.record(sv, None, CorrectionKind::HighRateClock) {
            if let Correction::HighRateClock { c0_m } = hr.correction {
                offset_m += c0_m;
            }
        }

        Some(ClockState { offset_m })
    }

    /// Code bias (m) of this satellite and signal
    pub fn code_bias(&self, sv: SV, signal: Signal) -> Option<f64> {
        match self.record(sv, Some(signal), CorrectionKind::CodeBias)?.correction {
            Correction::CodeBias { bias_m } => Some(bias_m),
            _ => None,
        }
    }

    /// Phase bias (m) of this satellite and signal,
    /// with its integer property and discontinuity counter.
    pub fn phase_bias(&self, sv: SV, signal: Signal) -> Option<(f64, bool, u8)> {
        match self.record(sv, Some(signal), CorrectionKind::PhaseBias)?.correction {
            Correction::PhaseBias {
                bias_m,
                integer,
                discontinuity,
            } => Some((bias_m, integer, discontinuity)),
            _ => None,
        }
    }

    /// User range accuracy (m) of this satellite
    pub fn ura(&self, sv: SV) -> Option<f64> {
        match self.record(sv, None, CorrectionKind::Ura)?.correction {
            Correction::Ura { ura_m } => Some(ura_m),
            _ => None,
        }
    }

    /// Satellites that have both orbit and clock corrections
    pub fn satellites(&self) -> Vec<SV> {
        let mut svs = self
            .records
            .keys()
            .filter(|k| k.kind == CorrectionKind::Orbit)
            .map(|k| k.sv)
            .filter(|sv| self.records.contains_key(&CorrectionKey::new(*sv, CorrectionKind::Clock)))
            .collect::<Vec<_>>();
        svs.dedup();
        svs
    }
}
