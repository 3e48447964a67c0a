//! Cycle slip screening
use std::collections::{HashMap, VecDeque};

use log::{debug, warn};
use polyfit_rs::polyfit_rs::polyfit;

use crate::{
    adapter::{SatelliteObservation, SignalObservation},
    carrier::Signal,
    cfg::CycleSlipOpts,
    constants::SPEED_OF_LIGHT_M_S,
    prelude::{Epoch, SV},
};

/// Reason why a phase arc was interrupted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlipCause {
    /// Receiver loss of lock indicator
    LossOfLock,
    /// Lock time went backwards
    LockTime,
    /// Satellite not observed for too long
    DataGap,
    /// Geometry free combination jumped
    GeometryFree,
    /// Melbourne-Wübbena combination jumped
    MelbourneWubbena,
    /// Phase bias discontinuity counter changed
    BiasDiscontinuity,
}

impl std::fmt::Display for SlipCause {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::LossOfLock => write!(f, "loss of lock"),
            Self::LockTime => write!(f, "lock time regression"),
            Self::DataGap => write!(f, "data gap"),
            Self::GeometryFree => write!(f, "geometry free jump"),
            Self::MelbourneWubbena => write!(f, "melbourne-wubbena jump"),
            Self::BiasDiscontinuity => write!(f, "phase bias discontinuity"),
        }
    }
}

/// Running average
#[derive(Debug, Clone, Default)]
struct Averager {
    y: f64,
    n: usize,
}

impl Averager {
    /// Updates average value, taking new `x` into account
    fn average(&mut self, x: f64) -> f64 {
        self.y = (x + (self.n as f64) * self.y) / (self.n + 1) as f64;
        self.n += 1;
        self.y
    }

    fn reset(&mut self) {
        self.y = 0.0;
        self.n = 0;
    }
}

/// Geometry free moving window
#[derive(Debug, Clone)]
struct Buffer {
    capacity: usize,
    inner: VecDeque<(Epoch, f64)>,
}

impl Buffer {
    fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(2),
            inner: VecDeque::with_capacity(capacity.max(2)),
        }
    }

    fn push(&mut self, t: Epoch, y: f64) {
        if self.inner.len() == self.capacity {
            self.inner.pop_front();
        }
        self.inner.push_back((t, y));
    }

    fn len(&self) -> usize {
        self.inner.len()
    }

    fn reset(&mut self) {
        self.inner.clear();
    }

    /// Polynomial prediction at `t`
    fn predict(&self, t: Epoch, degree: usize) -> Option<f64> {
        let (t_last, _) = self.inner.back()?;

        let x = self
            .inner
            .iter()
            .map(|(t_i, _)| (*t_i - *t_last).to_seconds())
            .collect::<Vec<_>>();

        let y = self.inner.iter().map(|(_, y_i)| *y_i).collect::<Vec<_>>();

        let degree = degree.min(self.inner.len() - 1);
        let coeffs = polyfit(&x, &y, degree).ok()?;

        let dt = (t - *t_last).to_seconds();
        let prediction = coeffs
            .iter()
            .rev()
            .fold(0.0, |acc, coeff| acc * dt + coeff);

        Some(prediction)
    }
}

#[derive(Debug, Clone)]
struct SvTracker {
    last_seen: Option<Epoch>,
    lock_times: HashMap<Signal, f64>,
    discontinuities: HashMap<Signal, u8>,
    mw: Averager,
    gf: Buffer,
}

impl SvTracker {
    fn new(gf_window: usize) -> Self {
        Self {
            last_seen: None,
            lock_times: HashMap::with_capacity(4),
            discontinuities: HashMap::with_capacity(4),
            mw: Averager::default(),
            gf: Buffer::new(gf_window),
        }
    }

    fn reset_combinations(&mut self) {
        self.mw.reset();
        self.gf.reset();
    }
}

/// Geometry free (m) and Melbourne-Wübbena (wide lane cycles)
/// combinations, formed on the two widest spaced carriers.
fn combinations(sat: &SatelliteObservation) -> Option<(f64, f64)> {
    let channel = sat.channel();

    let mut dual = sat
        .signals
        .iter()
        .filter(|obs| obs.phase_cycles.is_some() && obs.pseudo_range_m.is_some())
        .collect::<Vec<&SignalObservation>>();

    dual.sort_by(|a, b| {
        b.signal
            .frequency(channel)
            .total_cmp(&a.signal.frequency(channel))
    });

    let first = dual.first()?;
    let f1 = first.signal.frequency(channel);

    let second = dual
        .iter()
        .rev()
        .find(|obs| (f1 - obs.signal.frequency(channel)).abs() > 1.0E6)?;

    let f2 = second.signal.frequency(channel);

    let (phi1, p1) = (first.phase_cycles?, first.pseudo_range_m?);
    let (phi2, p2) = (second.phase_cycles?, second.pseudo_range_m?);

    let (lambda1, lambda2) = (SPEED_OF_LIGHT_M_S / f1, SPEED_OF_LIGHT_M_S / f2);
    let lambda_wl = SPEED_OF_LIGHT_M_S / (f1 - f2);

    let gf = lambda1 * phi1 - lambda2 * phi2;
    let mw = (phi1 - phi2) - (f1 * p1 + f2 * p2) / ((f1 + f2) * lambda_wl);

    Some((gf, mw))
}

/// Tracks phase arcs of every satellite and declares cycle slips
#[derive(Debug, Clone)]
pub(crate) struct SlipDetector {
    opts: CycleSlipOpts,
    trackers: HashMap<SV, SvTracker>,
}

impl SlipDetector {
    pub fn new(opts: CycleSlipOpts) -> Self {
        Self {
            opts,
            trackers: HashMap::with_capacity(16),
        }
    }

    /// Screens this satellite at `t`.
    /// `discontinuities` are the phase bias discontinuity counters
    /// currently broadcasted for this satellite.
    /// Returns the [SlipCause] when the phase arc was interrupted.
    /// Combinations restart from this epoch on slip.
    pub fn screen(
        &mut self,
        t: Epoch,
        sat: &SatelliteObservation,
        discontinuities: &[(Signal, u8)],
    ) -> Option<SlipCause> {
        let opts = self.opts;
        let sv = sat.sv;

        let tracker = self
            .trackers
            .entry(sv)
            .or_insert_with(|| SvTracker::new(opts.gf_window));

        let mut cause = None;

        if let Some(last_seen) = tracker.last_seen {
            if (t - last_seen).to_seconds() > opts.max_gap_s {
                cause = Some(SlipCause::DataGap);
            }
        }

        for obs in sat.signals.iter() {
            if obs.phase_cycles.is_none() {
                continue;
            }

            if obs.loss_of_lock {
                cause = cause.or(Some(SlipCause::LossOfLock));
            }

            if let Some(lock_time) = obs.lock_time_s {
                if let Some(previous) = tracker.lock_times.insert(obs.signal, lock_time) {
                    if lock_time < previous {
                        cause = cause.or(Some(SlipCause::LockTime));
                    }
                }
            }
        }

        for (signal, counter) in discontinuities.iter() {
            if let Some(previous) = tracker.discontinuities.insert(*signal, *counter) {
                if previous != *counter {
                    cause = cause.or(Some(SlipCause::BiasDiscontinuity));
                }
            }
        }

        if let Some((gf, mw)) = combinations(sat) {
            if cause.is_none() && tracker.gf.len() > 1 {
                if let Some(predicted) = tracker.gf.predict(t, opts.gf_degree) {
                    let residual = gf - predicted;
                    if residual.abs() > opts.gf_threshold_m {
                        debug!("{}({}) - gf residual {:.3}m", t, sv, residual);
                        cause = Some(SlipCause::GeometryFree);
                    }
                }
            }

            if cause.is_none() && tracker.mw.n >= opts.mw_min_samples {
                let residual = mw - tracker.mw.y;
                if residual.abs() > opts.mw_threshold_cycles {
                    debug!("{}({}) - mw residual {:.3} cycles", t, sv, residual);
                    cause = Some(SlipCause::MelbourneWubbena);
                }
            }

            if cause.is_some() {
                tracker.reset_combinations();
            }

            tracker.gf.push(t, gf);
            tracker.mw.average(mw);
        } else if cause.is_some() {
            tracker.reset_combinations();
        }

        tracker.last_seen = Some(t);

        if let Some(cause) = cause {
            warn!("{}({}) - cycle slip: {}", t, sv, cause);
        }

        cause
    }

    /// Stops tracking this satellite
    pub fn remove(&mut self, sv: SV) {
        self.trackers.remove(&sv);
    }
}
