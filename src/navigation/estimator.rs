//! Sequential PPP / PPP-RTK filter
use std::collections::{BTreeSet, HashMap};

use itertools::Itertools;
use log::{debug, error, info, warn};
use nalgebra::{Matrix3, Vector3};

use crate::{
    adapter::{EpochObservations, SatelliteObservation},
    carrier::Signal,
    cfg::Config,
    constants::SPEED_OF_LIGHT_M_S,
    corrections::CorrectionSnapshot,
    error::Error,
    geodesy::mapping_function,
    navigation::{
        ambiguity::{self, Candidate, FixedSolution},
        kalman::{self, Observations},
        lsq::{self, CodeEquation},
        model::{self, LineOfSight, SatelliteState},
        slip::SlipDetector,
        state::{ComponentId, StateError, StateVector},
        FilterStatus,
    },
    prelude::{Constellation, Epoch, SV},
    solutions::{AmbiguityStatus, EpochResult, SolutionQuality},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RowKind {
    Code,
    Phase,
}

impl std::fmt::Display for RowKind {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::Code => write!(f, "code"),
            Self::Phase => write!(f, "phase"),
        }
    }
}

/// One linearized observation
#[derive(Debug, Clone)]
struct Row {
    sv: SV,
    signal: Signal,
    kind: RowKind,
    partials: Vec<(ComponentId, f64)>,
    innovation: f64,
    variance: f64,
}

/// Forms the observation model of these rows, on the current slots
fn observations(state: &StateVector, rows: &[Row]) -> Observations {
    Observations::from_rows(
        state.len(),
        rows.iter().map(|row| {
            let h = row
                .partials
                .iter()
                .filter_map(|(id, value)| state.slot(id).map(|slot| (slot, *value)))
                .collect::<Vec<_>>();
            (h, row.innovation, row.variance)
        }),
    )
}

/// Fails when fewer satellites than unknowns (position, clock
/// and one inter-system bias per additional constellation) are available.
fn check_geometry(t: Epoch, satellites: &BTreeSet<SV>, inter_system_bias: bool) -> Result<(), Error> {
    let constellations = satellites.iter().map(|sv| sv.constellation).unique().count();
    let needed = if inter_system_bias {
        4 + constellations.saturating_sub(1)
    } else {
        4
    };

    if satellites.len() < needed {
        error!(
            "{} - not enough satellites: {} needed, {} available",
            t,
            needed,
            satellites.len()
        );
        return Err(Error::InsufficientGeometry {
            needed,
            available: satellites.len(),
        });
    }

    Ok(())
}

/// Slant ionosphere (m, on the reference frequency) from the
/// code observations of the two widest spaced signals.
fn code_ionosphere(sat: &SatelliteObservation, snapshot: &CorrectionSnapshot) -> Option<f64> {
    let channel = sat.channel();

    let mut codes = sat
        .signals
        .iter()
        .filter_map(|obs| {
            let code = obs.pseudo_range_m?;
            let bias = snapshot.code_bias(sat.sv, obs.signal).unwrap_or(0.0);
            Some((model::iono_factor(obs.signal.frequency(channel)), code + bias))
        })
        .collect::<Vec<_>>();

    codes.sort_by(|a, b| a.0.total_cmp(&b.0));

    let (gamma1, p1) = *codes.first()?;
    let (gamma2, p2) = *codes.last()?;

    if (gamma2 - gamma1).abs() < 1.0E-3 {
        return None;
    }

    Some((p2 - p1) / (gamma2 - gamma1))
}

/// Mutable filter content. Each epoch is processed on a copy,
/// committed once the epoch succeeded.
#[derive(Debug, Clone)]
struct Filter {
    t: Option<Epoch>,
    status: FilterStatus,
    state: StateVector,
    reference: Option<Constellation>,
    slips: SlipDetector,
    last_seen: HashMap<SV, Epoch>,
    converged_epochs: usize,
    clean_epochs: usize,
}

impl Filter {
    fn new(cfg: &Config) -> Self {
        Self {
            t: None,
            status: FilterStatus::Cold,
            state: StateVector::new(),
            reference: None,
            slips: SlipDetector::new(cfg.cycle_slip),
            last_seen: HashMap::with_capacity(16),
            converged_epochs: 0,
            clean_epochs: 0,
        }
    }

    fn position(&self) -> Option<Vector3<f64>> {
        Some(Vector3::new(
            self.state.get(&ComponentId::PositionX)?,
            self.state.get(&ComponentId::PositionY)?,
            self.state.get(&ComponentId::PositionZ)?,
        ))
    }

    fn position_covariance(&self) -> Result<Matrix3<f64>, Error> {
        let p = self.state.covariance_of(&[
            ComponentId::PositionX,
            ComponentId::PositionY,
            ComponentId::PositionZ,
        ])?;
        Ok(Matrix3::from_fn(|i, j| p[(i, j)]))
    }

    /// Initial receiver state: a-priori position, or code only least squares.
    fn initialize(
        &mut self,
        cfg: &Config,
        t: Epoch,
        satellites: &[(&SatelliteObservation, SatelliteState)],
        snapshot: &CorrectionSnapshot,
    ) -> Result<(), Error> {
        let reference = satellites
            .iter()
            .map(|(sat, _)| sat.sv.constellation)
            .counts()
            .into_iter()
            .sorted()
            .max_by_key(|(_, count)| *count)
            .map(|(constellation, _)| constellation)
            .ok_or(Error::InsufficientGeometry {
                needed: 4,
                available: 0,
            })?;

        let equations = satellites
            .iter()
            .filter_map(|(sat, sv_state)| {
                Some(CodeEquation {
                    sv: sat.sv,
                    sv_position_m: sv_state.position_m,
                    sv_clock_m: sv_state.clock_m,
                    pseudo_range_m: model::iono_free_code(sat, snapshot)?,
                })
            })
            .collect::<Vec<_>>();

        let (position_m, clock_m, isb_m) = match cfg.apriori_position {
            Some((x, y, z)) => {
                let rx = Vector3::new(x, y, z);
                let (zhd, zwd) = model::zenith_delays(&rx);

                let residuals = equations
                    .iter()
                    .map(|eq| {
                        let los = LineOfSight::new(&rx, &eq.sv_position_m, cfg.modeling.earth_rotation);
                        let tropo = if cfg.modeling.tropo_delay {
                            model::slant_troposphere(los.elevation_rad.max(0.0), zhd, zwd)
                        } else {
                            0.0
                        };
                        let residual = eq.pseudo_range_m - los.range_m + eq.sv_clock_m - tropo;
                        (eq.sv.constellation, residual)
                    })
                    .into_group_map();

                let mean = |values: &Vec<f64>| values.iter().sum::<f64>() / values.len() as f64;

                let clock_m = residuals
                    .get(&reference)
                    .map(mean)
                    .ok_or(Error::InsufficientGeometry {
                        needed: 4,
                        available: 0,
                    })?;

                let isb_m = residuals
                    .iter()
                    .filter(|(c, _)| **c != reference)
                    .map(|(c, values)| (*c, mean(values) - clock_m))
                    .collect::<Vec<_>>();

                (rx, clock_m, isb_m)
            },
            None => {
                let solution = lsq::solve(
                    &equations,
                    reference,
                    None,
                    &cfg.modeling,
                    cfg.estimator.max_iterations,
                )?;

                debug!(
                    "{} - initial fix: {:?} (m), clock={:.3}m ({} iterations)",
                    t, solution.position_m, solution.clock_m, solution.iterations
                );

                (
                    solution.position_m,
                    solution.clock_m,
                    solution.isb_m.into_iter().collect::<Vec<_>>(),
                )
            },
        };

        let opts = &cfg.estimator;
        let position_var = opts.position_sigma_m.powi(2);

        let mut state = StateVector::new();
        state.add_component(ComponentId::PositionX, position_m[0], position_var)?;
        state.add_component(ComponentId::PositionY, position_m[1], position_var)?;
        state.add_component(ComponentId::PositionZ, position_m[2], position_var)?;
        state.add_component(ComponentId::Clock, clock_m, opts.clock_sigma_m.powi(2))?;

        if cfg.modeling.inter_system_bias {
            for (constellation, isb) in isb_m.iter() {
                state.add_component(
                    ComponentId::InterSystemBias(*constellation),
                    *isb,
                    opts.isb_sigma_m.powi(2),
                )?;
            }
        }

        if cfg.modeling.tropo_delay {
            let (_, zwd) = model::zenith_delays(&position_m);
            state.add_component(ComponentId::TropoWet, zwd, opts.tropo_sigma_m.powi(2))?;
        }

        info!("{} - filter initialized, reference constellation: {}", t, reference);

        self.state = state;
        self.reference = Some(reference);
        Ok(())
    }

    /// Time update: x is constant, P += Q(dt)
    fn predict(&mut self, cfg: &Config, dt_s: f64) {
        let opts = &cfg.estimator;
        let position_q = cfg.profile.position_psd() * dt_s;

        let noises = self
            .state
            .ids()
            .iter()
            .enumerate()
            .filter_map(|(slot, id)| {
                let q = match id {
                    ComponentId::PositionX | ComponentId::PositionY | ComponentId::PositionZ => {
                        position_q
                    },
                    ComponentId::Clock => opts.clock_psd * dt_s,
                    ComponentId::InterSystemBias(_) => opts.isb_psd * dt_s,
                    ComponentId::TropoWet => opts.tropo_psd * dt_s,
                    ComponentId::Iono(_) => opts.iono_psd * dt_s,
                    ComponentId::Ambiguity(_, _) | ComponentId::CodeBias(_, _) => 0.0,
                };
                if q > 0.0 {
                    Some((slot, q))
                } else {
                    None
                }
            })
            .collect::<Vec<_>>();

        for (slot, q) in noises {
            self.state.add_process_noise(slot, q);
        }
    }

    /// Drops satellites not observed for too long
    fn drop_outages(&mut self, cfg: &Config, t: Epoch) {
        let expired = self
            .last_seen
            .iter()
            .filter(|(_, last)| (t - **last).to_seconds() > cfg.estimator.max_outage_s)
            .map(|(sv, _)| *sv)
            .collect::<Vec<_>>();

        for sv in expired {
            self.forget(sv);
            info!("{}({}) - outage: satellite states dropped", t, sv);
        }
    }

    fn forget(&mut self, sv: SV) {
        self.state.remove_satellite(sv);
        self.slips.remove(sv);
        self.last_seen.remove(&sv);
    }

    fn remove_ambiguities(&mut self, sv: SV) -> Result<(), Error> {
        let ids = self
            .state
            .ids()
            .iter()
            .filter(|id| id.is_ambiguity() && id.sv() == Some(sv))
            .copied()
            .collect::<Vec<_>>();

        for id in ids.iter() {
            self.state.remove_component(id)?;
        }
        Ok(())
    }

    fn ensure(&mut self, id: ComponentId, value: f64, variance: f64) -> Result<(), Error> {
        if !self.state.contains(&id) {
            self.state.add_component(id, value, variance)?;
            debug!("new state component {} = {:.4}", id, value);
        }
        Ok(())
    }

    /// Processes one epoch
    fn run(
        &mut self,
        cfg: &Config,
        observations_t: &EpochObservations,
        snapshot: &CorrectionSnapshot,
    ) -> Result<EpochResult, Error> {
        let t = observations_t.epoch;
        let modeling = &cfg.modeling;
        let opts = &cfg.estimator;

        let mut satellites = observations_t
            .satellites
            .iter()
            .filter_map(|sat| Some((sat, model::corrected_state(t, sat, snapshot)?)))
            .collect::<Vec<_>>();

        satellites.sort_by_key(|(sat, _)| sat.sv);

        match self.t {
            Some(t_prev) if self.status.is_initialized() => {
                let dt_s = (t - t_prev).to_seconds();
                self.predict(cfg, dt_s);
            },
            _ => {
                self.initialize(cfg, t, &satellites, snapshot)?;
            },
        }

        self.drop_outages(cfg, t);

        let rx = self.position().ok_or(Error::UninitializedFilter)?;
        let (zhd, _) = model::zenith_delays(&rx);
        let zwd = self.state.get(&ComponentId::TropoWet).unwrap_or(0.0);
        let clock_m = self.state.get(&ComponentId::Clock).unwrap_or(0.0);
        let min_elevation = cfg.min_elevation_deg.to_radians();

        let mut rows = Vec::<Row>::with_capacity(4 * satellites.len());
        let mut candidates = Vec::<Candidate>::new();
        let mut contributing = BTreeSet::<SV>::new();
        let mut slipped = false;

        for (sat, sv_state) in satellites.iter() {
            let sv = sat.sv;
            let channel = sat.channel();

            let los = LineOfSight::new(&rx, &sv_state.position_m, modeling.earth_rotation);

            if los.elevation_rad < min_elevation {
                if self.last_seen.contains_key(&sv) {
                    debug!(
                        "{}({}) - below elevation mask ({:.1}°)",
                        t,
                        sv,
                        los.elevation_rad.to_degrees()
                    );
                    self.forget(sv);
                }
                continue;
            }

            let (tropo_m, mapping) = if modeling.tropo_delay {
                let mapping = mapping_function(los.elevation_rad);
                (mapping * (zhd + zwd), mapping)
            } else {
                (0.0, 0.0)
            };

            let isb_id = match self.reference {
                Some(reference) if modeling.inter_system_bias && sv.constellation != reference => {
                    Some(ComponentId::InterSystemBias(sv.constellation))
                },
                _ => None,
            };

            if let Some(isb_id) = isb_id {
                if !self.state.contains(&isb_id) {
                    let initial = model::iono_free_code(sat, snapshot)
                        .map(|code| code - (los.range_m + clock_m - sv_state.clock_m + tropo_m))
                        .unwrap_or(0.0);
                    self.ensure(isb_id, initial, opts.isb_sigma_m.powi(2))?;
                }
            }

            // phase arc continuity
            let mut sv_slipped = false;
            if modeling.phase {
                let discontinuities = sat
                    .signals
                    .iter()
                    .filter_map(|obs| {
                        let (_, _, counter) = snapshot.phase_bias(sv, obs.signal)?;
                        Some((obs.signal, counter))
                    })
                    .collect::<Vec<_>>();

                if self.slips.screen(t, sat, &discontinuities).is_some() {
                    self.remove_ambiguities(sv)?;
                    sv_slipped = true;
                    slipped = true;
                }
            }

            self.last_seen.insert(sv, t);

            let iono_id = ComponentId::Iono(sv);
            if modeling.iono_delay {
                let initial = code_ionosphere(sat, snapshot).unwrap_or(0.0);
                self.ensure(iono_id, initial, opts.iono_sigma_m.powi(2))?;
            }

            let iono_m = self.state.get(&iono_id).unwrap_or(0.0);
            let isb_m = isb_id.and_then(|id| self.state.get(&id)).unwrap_or(0.0);

            let ura_var = match sv_state.ura_m {
                Some(ura) if cfg.weight.use_ura => ura.powi(2),
                _ => 0.0,
            };

            let common_m = los.range_m + clock_m + isb_m - sv_state.clock_m + tropo_m;

            let mut common = vec![
                (ComponentId::PositionX, -los.unit[0]),
                (ComponentId::PositionY, -los.unit[1]),
                (ComponentId::PositionZ, -los.unit[2]),
                (ComponentId::Clock, 1.0),
            ];

            if let Some(isb_id) = isb_id {
                common.push((isb_id, 1.0));
            }

            if modeling.tropo_delay {
                common.push((ComponentId::TropoWet, mapping));
            }

            for obs in sat.signals.iter() {
                if let (Some(min_snr), Some(snr)) = (cfg.min_snr_dbhz, obs.snr_dbhz) {
                    if snr < min_snr {
                        debug!("{}({}) - {} snr too low", t, sv, obs.signal);
                        continue;
                    }
                }

                let signal = obs.signal;
                let frequency = signal.frequency(channel);
                let lambda = SPEED_OF_LIGHT_M_S / frequency;
                let gamma = model::iono_factor(frequency);

                let code_bias = snapshot.code_bias(sv, signal);

                let dcb_id = match code_bias {
                    Some(_) => None,
                    None if cfg.corrections.require_code_bias => {
                        debug!("{}({}) - {} missing code bias", t, sv, signal);
                        continue;
                    },
                    None if modeling.code_bias => Some(ComponentId::CodeBias(sv, signal)),
                    None => None,
                };

                if let Some(dcb_id) = dcb_id {
                    self.ensure(dcb_id, 0.0, opts.code_bias_sigma_m.powi(2))?;
                }

                let dcb_m = dcb_id.and_then(|id| self.state.get(&id)).unwrap_or(0.0);

                let code_m = obs
                    .pseudo_range_m
                    .map(|code| code + code_bias.unwrap_or(0.0));

                if let Some(code_m) = code_m {
                    let mut partials = common.clone();
                    if modeling.iono_delay {
                        partials.push((iono_id, gamma));
                    }
                    if let Some(dcb_id) = dcb_id {
                        partials.push((dcb_id, 1.0));
                    }

                    rows.push(Row {
                        sv,
                        signal,
                        kind: RowKind::Code,
                        partials,
                        innovation: code_m - (common_m + gamma * iono_m + dcb_m),
                        variance: cfg.weight.code_variance(los.elevation_rad) + ura_var,
                    });

                    contributing.insert(sv);
                }

                if !modeling.phase || sv_slipped {
                    continue;
                }

                let phase_cycles = match obs.phase_cycles {
                    Some(phase) => phase,
                    None => continue,
                };

                let phase_bias = snapshot.phase_bias(sv, signal);
                let phase_m = lambda * phase_cycles + phase_bias.map(|(bias, _, _)| bias).unwrap_or(0.0);

                let amb_id = ComponentId::Ambiguity(sv, signal);

                if !self.state.contains(&amb_id) {
                    let code_m = match code_m {
                        Some(code_m) => code_m,
                        None => continue,
                    };
                    let initial = (phase_m - code_m + 2.0 * gamma * iono_m + dcb_m) / lambda;
                    let sigma = opts.ambiguity_sigma_m / lambda;
                    self.ensure(amb_id, initial, sigma.powi(2))?;
                }

                let ambiguity = self.state.get(&amb_id).unwrap_or(0.0);

                let mut partials = common.clone();
                if modeling.iono_delay {
                    partials.push((iono_id, -gamma));
                }
                partials.push((amb_id, lambda));

                rows.push(Row {
                    sv,
                    signal,
                    kind: RowKind::Phase,
                    partials,
                    innovation: phase_m - (common_m - gamma * iono_m + lambda * ambiguity),
                    variance: cfg.weight.phase_variance(los.elevation_rad) + ura_var,
                });

                if let Some((_, true, _)) = phase_bias {
                    if sv.constellation != Constellation::Glonass {
                        candidates.push(Candidate {
                            id: amb_id,
                            elevation_rad: los.elevation_rad,
                        });
                    }
                }
            }
        }

        check_geometry(t, &contributing, modeling.inter_system_bias)?;

        // innovation screening
        let screened = observations(&self.state, &rows);
        let normalized = kalman::normalized_innovations(self.state.p(), &screened);

        let total = rows.len();
        let mut rejected = 0;
        let mut retained = Vec::with_capacity(total);

        for (row, normalized) in rows.into_iter().zip(normalized.into_iter()) {
            if normalized > opts.outlier_sigma {
                warn!(
                    "{}({}) - {} {} rejected: normalized innovation {:.1}",
                    t, row.sv, row.signal, row.kind, normalized
                );
                if row.kind == RowKind::Phase {
                    match self
                        .state
                        .remove_component(&ComponentId::Ambiguity(row.sv, row.signal))
                    {
                        Ok(_) | Err(StateError::UnknownComponent(_)) => {},
                        Err(e) => return Err(e.into()),
                    }
                }
                rejected += 1;
            } else {
                retained.push(row);
            }
        }

        let outlier_rate = rejected as f64 / total.max(1) as f64;

        // satellites left after screening
        let contributing = retained.iter().map(|row| row.sv).collect::<BTreeSet<_>>();
        check_geometry(t, &contributing, modeling.inter_system_bias)?;

        let measurements = observations(&self.state, &retained);
        let (x, p) = kalman::update(self.state.x(), self.state.p(), &measurements)?;
        self.state.replace(x, p)?;

        // status
        let covariance = self.position_covariance()?;
        let trace = covariance.trace();

        if trace < opts.convergence_trace_m2 {
            self.converged_epochs += 1;
        } else {
            self.converged_epochs = 0;
        }

        let disturbed = slipped || outlier_rate > opts.max_outlier_rate;
        let previous = self.status;

        self.status = match self.status {
            FilterStatus::Cold => FilterStatus::Converging,
            _ if disturbed => {
                self.clean_epochs = 0;
                FilterStatus::Degraded
            },
            FilterStatus::Degraded => {
                self.clean_epochs += 1;
                if self.clean_epochs >= opts.recovery_epochs {
                    FilterStatus::Converging
                } else {
                    FilterStatus::Degraded
                }
            },
            FilterStatus::Converging => {
                if self.converged_epochs >= opts.convergence_epochs {
                    FilterStatus::Converged
                } else {
                    FilterStatus::Converging
                }
            },
            FilterStatus::Converged => {
                if self.converged_epochs == 0 {
                    FilterStatus::Converging
                } else {
                    FilterStatus::Converged
                }
            },
        };

        if self.status != previous {
            info!("{} - filter status: {} -> {}", t, previous, self.status);
        }

        debug!(
            "{} - {} satellites, {} observations ({} rejected), trace={:.3E}m²",
            t,
            contributing.len(),
            total,
            rejected,
            trace
        );

        // ambiguity resolution
        let mut ar_ratio = None;
        let mut fixed = None::<FixedSolution>;

        if self.status == FilterStatus::Converged && cfg.method.resolves_ambiguities() {
            candidates.retain(|cd| self.state.contains(&cd.id));

            match ambiguity::resolve(&self.state, &candidates, &cfg.ambiguity) {
                Ok(Some(solution)) => {
                    debug!(
                        "{} - {} ambiguities fixed, ratio={:.2}",
                        t,
                        solution.fixed.len(),
                        solution.ratio
                    );
                    ar_ratio = Some(solution.ratio);
                    fixed = Some(solution);
                },
                Ok(None) => {},
                Err(Error::AmbiguityRejected { ratio }) => {
                    debug!("{} - ambiguity fix rejected: ratio={:.2}", t, ratio);
                    ar_ratio = Some(ratio);
                },
                Err(e) => {
                    error!("{} - ambiguity resolution error: {}", t, e);
                },
            }
        }

        self.t = Some(t);

        let quality = if self.status == FilterStatus::Degraded {
            SolutionQuality::Degraded
        } else if fixed.is_some() {
            SolutionQuality::Fixed
        } else {
            SolutionQuality::Float
        };

        let mut result = self.result(t, quality, contributing.len())?;
        result.ar_ratio = ar_ratio;

        result.ambiguities = contributing
            .iter()
            .map(|sv| {
                let is_fixed = fixed.as_ref().is_some_and(|solution| {
                    solution
                        .fixed
                        .iter()
                        .any(|id| id.sv() == Some(*sv))
                });

                let is_float = self
                    .state
                    .ids()
                    .iter()
                    .any(|id| id.is_ambiguity() && id.sv() == Some(*sv));

                let status = if is_fixed {
                    AmbiguityStatus::Fixed
                } else if is_float {
                    AmbiguityStatus::Float
                } else {
                    AmbiguityStatus::Unresolved
                };

                (*sv, status)
            })
            .collect();

        if let Some(solution) = fixed {
            result.position_ecef_m = (
                solution.position_m[0],
                solution.position_m[1],
                solution.position_m[2],
            );
            result.covariance_m2 = to_array(&solution.covariance_m2);
            result.clock_m = solution.clock_m;
        }

        Ok(result)
    }

    /// Float [EpochResult] of the current state
    fn result(&self, t: Epoch, quality: SolutionQuality, satellites: usize) -> Result<EpochResult, Error> {
        let position = self.position().ok_or(Error::UninitializedFilter)?;
        let covariance = self.position_covariance()?;

        Ok(EpochResult {
            epoch: t,
            position_ecef_m: (position[0], position[1], position[2]),
            covariance_m2: to_array(&covariance),
            clock_m: self.state.get(&ComponentId::Clock).unwrap_or(0.0),
            ambiguities: Vec::new(),
            quality,
            status: self.status,
            satellites,
            ar_ratio: None,
        })
    }
}

fn to_array(m: &Matrix3<f64>) -> [[f64; 3]; 3] {
    [
        [m[(0, 0)], m[(0, 1)], m[(0, 2)]],
        [m[(1, 0)], m[(1, 1)], m[(1, 2)]],
        [m[(2, 0)], m[(2, 1)], m[(2, 2)]],
    ]
}

/// [Estimator] is the sequential PPP / PPP-RTK filter.
/// It owns the [StateVector] and processes one epoch at a time.
#[derive(Debug, Clone)]
pub struct Estimator {
    cfg: Config,
    filter: Filter,
}

impl Estimator {
    /// Builds a new [Estimator], in [FilterStatus::Cold] state
    pub fn new(cfg: Config) -> Self {
        let filter = Filter::new(&cfg);
        Self { cfg, filter }
    }

    pub fn config(&self) -> &Config {
        &self.cfg
    }

    pub fn status(&self) -> FilterStatus {
        self.filter.status
    }

    /// Last processed [Epoch]
    pub fn epoch(&self) -> Option<Epoch> {
        self.filter.t
    }

    pub fn state(&self) -> &StateVector {
        &self.filter.state
    }

    /// Current float position estimate, ECEF (m)
    pub fn position(&self) -> Option<Vector3<f64>> {
        self.filter.position()
    }

    /// Reference constellation of the receiver clock
    pub fn reference_constellation(&self) -> Option<Constellation> {
        self.filter.reference
    }

    /// Restarts from [FilterStatus::Cold]
    pub fn reset(&mut self) {
        info!("filter reset");
        self.filter = Filter::new(&self.cfg);
    }

    /// Processes one epoch of observations, using the corrections
    /// of this [CorrectionSnapshot]. The state is only modified when
    /// the epoch succeeds. A rejected update keeps the prior state and
    /// returns a [SolutionQuality::Degraded] result.
    pub fn process(
        &mut self,
        observations: &EpochObservations,
        snapshot: &CorrectionSnapshot,
    ) -> Result<EpochResult, Error> {
        let t = observations.epoch;

        if let Some(t_prev) = self.filter.t {
            if t <= t_prev {
                error!("{} - epoch does not follow {}", t, t_prev);
                return Err(Error::OutdatedEpoch(t));
            }
        }

        let mut pending = self.filter.clone();

        match pending.run(&self.cfg, observations, snapshot) {
            Ok(result) => {
                self.filter = pending;
                Ok(result)
            },
            Err(Error::NumericInstability) if self.filter.status.is_initialized() => {
                error!("{} - update rejected: numeric instability", t);
                self.filter.status = FilterStatus::Degraded;
                self.filter.clean_epochs = 0;
                self.filter
                    .result(t, SolutionQuality::Degraded, observations.satellites.len())
            },
            Err(e) => Err(e),
        }
    }
}
