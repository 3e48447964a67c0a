//! Observation input: the receiver side collaborator hands synchronized
//! observations and broadcast states, one epoch at a time.
use std::collections::VecDeque;

use crate::{
    carrier::Signal,
    prelude::{Epoch, Vector3, SV},
};

/// Broadcast satellite state, evaluated at transmission time
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EphemerisState {
    /// Position, ECEF (m)
    pub position_m: Vector3<f64>,
    /// Velocity, ECEF (m.s⁻¹)
    pub velocity_m_s: Vector3<f64>,
    /// Satellite clock offset (s)
    pub clock_offset_s: f64,
    /// Issue of data of the ephemeris in use
    pub iode: u32,
    /// Glonass FDMA channel number
    pub glonass_channel: Option<i8>,
}

impl EphemerisState {
    pub fn new(position_m: Vector3<f64>, velocity_m_s: Vector3<f64>, clock_offset_s: f64, iode: u32) -> Self {
        Self {
            position_m,
            velocity_m_s,
            clock_offset_s,
            iode,
            glonass_channel: None,
        }
    }

    /// Copies and returns [Self] with Glonass channel number
    pub fn with_glonass_channel(&self, channel: i8) -> Self {
        let mut s = *self;
        s.glonass_channel = Some(channel);
        s
    }
}

/// Raw observations of one [Signal]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SignalObservation {
    pub signal: Signal,
    /// Pseudo range (m)
    pub pseudo_range_m: Option<f64>,
    /// Carrier phase (cycles)
    pub phase_cycles: Option<f64>,
    /// Carrier to noise density ratio (dB-Hz)
    pub snr_dbhz: Option<f64>,
    /// Receiver lock time indicator (s)
    pub lock_time_s: Option<f64>,
    /// Loss of lock indicator
    pub loss_of_lock: bool,
}

impl SignalObservation {
    /// Code and phase observation of this [Signal]
    pub fn new(signal: Signal, pseudo_range_m: f64, phase_cycles: f64) -> Self {
        Self {
            signal,
            pseudo_range_m: Some(pseudo_range_m),
            phase_cycles: Some(phase_cycles),
            snr_dbhz: None,
            lock_time_s: None,
            loss_of_lock: false,
        }
    }

    /// Code only observation of this [Signal]
    pub fn code_only(signal: Signal, pseudo_range_m: f64) -> Self {
        Self {
            signal,
            pseudo_range_m: Some(pseudo_range_m),
            phase_cycles: None,
            snr_dbhz: None,
            lock_time_s: None,
            loss_of_lock: false,
        }
    }

    pub fn with_snr(&self, snr_dbhz: f64) -> Self {
        let mut s = *self;
        s.snr_dbhz = Some(snr_dbhz);
        s
    }

    pub fn with_lock_time(&self, lock_time_s: f64) -> Self {
        let mut s = *self;
        s.lock_time_s = Some(lock_time_s);
        s
    }

    pub fn with_loss_of_lock(&self) -> Self {
        let mut s = *self;
        s.loss_of_lock = true;
        s
    }
}

/// Observations of one satellite
#[derive(Debug, Clone, PartialEq)]
pub struct SatelliteObservation {
    pub sv: SV,
    pub ephemeris: EphemerisState,
    pub signals: Vec<SignalObservation>,
}

impl SatelliteObservation {
    pub fn new(sv: SV, ephemeris: EphemerisState, signals: Vec<SignalObservation>) -> Self {
        Self {
            sv,
            ephemeris,
            signals,
        }
    }

    /// Glonass channel, 0 for CDMA constellations
    pub(crate) fn channel(&self) -> i8 {
        self.ephemeris.glonass_channel.unwrap_or(0)
    }

    pub(crate) fn signal(&self, signal: &Signal) -> Option<&SignalObservation> {
        self.signals.iter().find(|obs| obs.signal == *signal)
    }
}

/// Observations of one receiver [Epoch]
#[derive(Debug, Clone, PartialEq)]
pub struct EpochObservations {
    /// Sampling [Epoch]
    pub epoch: Epoch,
    pub satellites: Vec<SatelliteObservation>,
}

impl EpochObservations {
    pub fn new(epoch: Epoch, satellites: Vec<SatelliteObservation>) -> Self {
        Self { epoch, satellites }
    }
}

/// Implement [ObservationAdapter] to feed the
/// [PositionResolver](crate::prelude::PositionResolver).
pub trait ObservationAdapter {
    /// Returns the next synchronized epoch, None once exhausted.
    fn next_epoch(&mut self) -> Option<EpochObservations>;
}

/// [ObservationAdapter] backed by an in-memory queue
#[derive(Debug, Clone, Default)]
pub struct BufferedAdapter {
    epochs: VecDeque<EpochObservations>,
}

impl BufferedAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, epoch: EpochObservations) {
        self.epochs.push_back(epoch);
    }

    pub fn len(&self) -> usize {
        self.epochs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.epochs.is_empty()
    }
}

impl FromIterator<EpochObservations> for BufferedAdapter {
    fn from_iter<I: IntoIterator<Item = EpochObservations>>(iter: I) -> Self {
        Self {
            epochs: iter.into_iter().collect(),
        }
    }
}

impl ObservationAdapter for BufferedAdapter {
    fn next_epoch(&mut self) -> Option<EpochObservations> {
        self.epochs.pop_front()
    }
}
