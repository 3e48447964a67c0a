//! Synthetic GPS L1/L2 observations of a static receiver.
//! Satellites follow circular orbits. Observations are noise free and
//! consistent with the broadcast states and the corrections they come with.
use nalgebra::{Matrix3, Vector3};

use crate::{
    carrier::{Carrier, Signal},
    constants::SPEED_OF_LIGHT_M_S,
    corrections::{Correction, CorrectionRecord, CorrectionSnapshot},
    geodesy::{
        azimuth_elevation, ecef_to_geodetic, enu_rotation, mapping_function, saastamoinen,
        sagnac_rotation,
    },
    prelude::{
        Constellation, Duration, EphemerisState, Epoch, EpochObservations, EpochResult,
        SatelliteObservation, SignalObservation, TimeScale, SV,
    },
};

const ORBIT_RADIUS_M: f64 = 26_560_000.0;
const ORBIT_SPEED_M_S: f64 = 3_874.0;

/// (azimuth, elevation) in degrees, at the first epoch
const SKY: [(f64, f64); 10] = [
    (10.0, 75.0),
    (50.0, 40.0),
    (95.0, 55.0),
    (140.0, 45.0),
    (185.0, 62.0),
    (230.0, 38.0),
    (275.0, 50.0),
    (320.0, 42.0),
    (20.0, 35.0),
    (205.0, 80.0),
];

#[derive(Debug, Clone)]
pub struct ScenarioSatellite {
    pub sv: SV,
    position_m: Vector3<f64>,
    axis: Vector3<f64>,
    /// True clock offset (m)
    pub clock_m: f64,
    pub iode: u32,
    /// Broadcast orbit error, radial / along / cross (m)
    pub rac_m: Vector3<f64>,
    /// Broadcast clock error (m)
    pub clock_error_m: f64,
    /// Slant ionosphere delay on L1 (m)
    pub iono_m: f64,
    /// Integer ambiguities (cycles)
    pub ambiguities: [f64; 2],
    pub code_biases_m: [f64; 2],
    pub phase_biases_m: [f64; 2],
}

impl ScenarioSatellite {
    fn position(&self, dt_s: f64) -> Vector3<f64> {
        let (sin, cos) = (ORBIT_SPEED_M_S / ORBIT_RADIUS_M * dt_s).sin_cos();
        self.position_m * cos + self.axis.cross(&self.position_m) * sin
    }

    fn velocity(&self, dt_s: f64) -> Vector3<f64> {
        self.axis.cross(&self.position(dt_s)) * ORBIT_SPEED_M_S / ORBIT_RADIUS_M
    }
}

#[derive(Debug, Clone)]
pub struct Scenario {
    pub t0: Epoch,
    pub interval_s: f64,
    /// True receiver position, ECEF (m)
    pub rx_m: Vector3<f64>,
    /// True zenith wet delay (m)
    pub zwd_m: f64,
    pub signals: [Signal; 2],
    pub satellites: Vec<ScenarioSatellite>,
    /// (satellite, first epoch, L1 cycles)
    slips: Vec<(SV, usize, f64)>,
}

impl Scenario {
    /// Builds a [Scenario] with `num_sv` GPS satellites (up to 10)
    pub fn new(num_sv: usize) -> Self {
        let rx_m = Vector3::new(4627848.0, 119646.0, 4372925.0);
        let (lat, lon, height) = ecef_to_geodetic(&rx_m);
        let (_, zwd_m) = saastamoinen(lat, height);
        let to_ecef = enu_rotation(lat, lon).transpose();

        let satellites = SKY
            .iter()
            .take(num_sv)
            .enumerate()
            .map(|(i, (azimuth, elevation))| {
                let (azimuth, elevation) = (azimuth.to_radians(), elevation.to_radians());

                let enu = Vector3::new(
                    elevation.cos() * azimuth.sin(),
                    elevation.cos() * azimuth.cos(),
                    elevation.sin(),
                );

                let unit = to_ecef * enu;
                let b = rx_m.dot(&unit);
                let range = -b + (b * b - rx_m.norm_squared() + ORBIT_RADIUS_M.powi(2)).sqrt();
                let position_m = rx_m + unit * range;

                let reference = if i % 2 == 0 {
                    Vector3::z()
                } else {
                    Vector3::x()
                };

                let k = i as f64;

                ScenarioSatellite {
                    sv: SV::new(Constellation::GPS, (i + 1) as u8),
                    position_m,
                    axis: position_m.cross(&reference).normalize(),
                    clock_m: 150.0 * (k - 4.0),
                    iode: 40 + i as u32,
                    rac_m: Vector3::new(0.12 + 0.04 * k, -0.4 + 0.08 * k, 0.2 - 0.02 * k),
                    clock_error_m: 0.5 - 0.1 * k,
                    iono_m: 2.0 + 0.5 * k,
                    ambiguities: [(1000 + 17 * i) as f64, -500.0 + 3.0 * k],
                    code_biases_m: [-1.2 + 0.1 * k, 0.8 - 0.05 * k],
                    phase_biases_m: [0.05 + 0.01 * k, -0.03 + 0.002 * k],
                }
            })
            .collect();

        Self {
            t0: Epoch::from_gregorian(2024, 1, 3, 12, 0, 0, 0, TimeScale::GPST),
            interval_s: 30.0,
            rx_m,
            zwd_m,
            signals: [Signal::new(Carrier::L1, 'C'), Signal::new(Carrier::L2, 'W')],
            satellites,
            slips: Vec::new(),
        }
    }

    /// Copies and returns [Scenario] with a wet delay that departs
    /// from the standard atmosphere the filter starts from.
    pub fn with_zwd_offset(&self, offset_m: f64) -> Self {
        let mut s = self.clone();
        s.zwd_m += offset_m;
        s
    }

    /// Copies and returns [Scenario] where L1 phase of `sv`
    /// jumps by `cycles`, from epoch `k` onwards.
    pub fn with_slip(&self, sv: SV, k: usize, cycles: f64) -> Self {
        let mut s = self.clone();
        s.slips.push((sv, k, cycles));
        s
    }

    pub fn epoch(&self, k: usize) -> Epoch {
        self.t0 + Duration::from_seconds(k as f64 * self.interval_s)
    }

    /// True receiver clock offset (m) at epoch `k`
    pub fn rx_clock_m(&self, k: usize) -> f64 {
        1500.0 + 0.3 * k as f64
    }

    /// 3D position error (m) of this [EpochResult]
    pub fn error_m(&self, result: &EpochResult) -> f64 {
        (result.position() - self.rx_m).norm()
    }

    /// Observations at epoch `k`
    pub fn observe(&self, k: usize) -> EpochObservations {
        let dt_s = k as f64 * self.interval_s;
        let rx_clock_m = self.rx_clock_m(k);

        let (lat, _, height) = ecef_to_geodetic(&self.rx_m);
        let (zhd_m, _) = saastamoinen(lat, height);

        let satellites = self
            .satellites
            .iter()
            .map(|sat| {
                let position_m = sat.position(dt_s);
                let velocity_m_s = sat.velocity(dt_s);

                let tau_s = (position_m - self.rx_m).norm() / SPEED_OF_LIGHT_M_S;
                let rotated = sagnac_rotation(&position_m, tau_s);
                let range_m = (rotated - self.rx_m).norm();
                let (_, elevation) = azimuth_elevation(&self.rx_m, &rotated);

                let tropo_m = mapping_function(elevation) * (zhd_m + self.zwd_m);
                let common_m = range_m + rx_clock_m - sat.clock_m + tropo_m;

                let slip = self
                    .slips
                    .iter()
                    .filter(|(sv, first, _)| *sv == sat.sv && k >= *first)
                    .map(|(_, _, cycles)| cycles)
                    .sum::<f64>();

                let signals = self
                    .signals
                    .iter()
                    .enumerate()
                    .map(|(i, signal)| {
                        let frequency = signal.frequency(0);
                        let lambda = SPEED_OF_LIGHT_M_S / frequency;
                        let gamma = (Carrier::L1.frequency() / frequency).powi(2);

                        let ambiguity = if i == 0 {
                            sat.ambiguities[i] + slip
                        } else {
                            sat.ambiguities[i]
                        };

                        let code_m = common_m + gamma * sat.iono_m - sat.code_biases_m[i];
                        let phase_m = common_m - gamma * sat.iono_m + lambda * ambiguity
                            - sat.phase_biases_m[i];

                        SignalObservation::new(*signal, code_m, phase_m / lambda)
                    })
                    .collect();

                let e_a = velocity_m_s.normalize();
                let e_c = position_m.cross(&velocity_m_s).normalize();
                let rotation = Matrix3::from_columns(&[e_a.cross(&e_c), e_a, e_c]);

                let ephemeris = EphemerisState::new(
                    position_m + rotation * sat.rac_m,
                    velocity_m_s,
                    (sat.clock_m + sat.clock_error_m) / SPEED_OF_LIGHT_M_S,
                    sat.iode,
                );

                SatelliteObservation::new(sat.sv, ephemeris, signals)
            })
            .collect();

        EpochObservations::new(self.epoch(k), satellites)
    }

    /// Corrections issued at epoch `k`
    pub fn corrections(&self, k: usize) -> Vec<CorrectionRecord> {
        let t = self.epoch(k);
        let validity = Duration::from_seconds(2.0 * self.interval_s);

        let mut records = Vec::with_capacity(6 * self.satellites.len());

        for sat in self.satellites.iter() {
            records.push(CorrectionRecord::new(
                sat.sv,
                None,
                Correction::Orbit {
                    iode: sat.iode,
                    delta_m: sat.rac_m,
                    rate_m_s: None,
                },
                t,
            ));

            records.push(CorrectionRecord::new(
                sat.sv,
                None,
                Correction::Clock {
                    c0_m: sat.clock_error_m,
                    c1_m_s: None,
                    c2_m_s2: None,
                },
                t,
            ));

            for (i, signal) in self.signals.iter().enumerate() {
                records.push(CorrectionRecord::new(
                    sat.sv,
                    Some(*signal),
                    Correction::CodeBias {
                        bias_m: sat.code_biases_m[i],
                    },
                    t,
                ));

                records.push(CorrectionRecord::new(
                    sat.sv,
                    Some(*signal),
                    Correction::PhaseBias {
                        bias_m: sat.phase_biases_m[i],
                        integer: true,
                        discontinuity: 0,
                    },
                    t,
                ));
            }
        }

        records
            .into_iter()
            .map(|record| record.with_validity(validity))
            .collect()
    }

    pub fn snapshot(&self, k: usize) -> CorrectionSnapshot {
        CorrectionSnapshot::from_records(self.epoch(k), self.corrections(k))
    }
}
