//! Observation model: corrected satellite states and line of sight.
use log::debug;
use nalgebra::{Matrix3, Vector3};

use crate::{
    adapter::SatelliteObservation,
    carrier::Carrier,
    constants::SPEED_OF_LIGHT_M_S,
    corrections::CorrectionSnapshot,
    geodesy::{azimuth_elevation, ecef_to_geodetic, mapping_function, saastamoinen, sagnac_rotation},
    prelude::{Epoch, SV},
};

/// Satellite state after applying orbit and clock corrections
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct SatelliteState {
    pub sv: SV,
    /// Corrected position, ECEF (m)
    pub position_m: Vector3<f64>,
    /// Corrected clock offset (m)
    pub clock_m: f64,
    /// User range accuracy (m)
    pub ura_m: Option<f64>,
}

/// Rotation from (radial, along-track, cross-track) to ECEF
pub(crate) fn rac_rotation(position_m: &Vector3<f64>, velocity_m_s: &Vector3<f64>) -> Option<Matrix3<f64>> {
    let e_a = velocity_m_s.try_normalize(1.0E-9)?;
    let e_c = position_m.cross(velocity_m_s).try_normalize(1.0E-9)?;
    let e_r = e_a.cross(&e_c);
    Some(Matrix3::from_columns(&[e_r, e_a, e_c]))
}

/// Applies the snapshot corrections to the broadcast state.
/// Returns None when a correction is missing or does not
/// apply to the ephemeris in use.
pub(crate) fn corrected_state(
    t: Epoch,
    sat: &SatelliteObservation,
    snapshot: &CorrectionSnapshot,
) -> Option<SatelliteState> {
    let sv = sat.sv;

    let orbit = match snapshot.orbit(sv) {
        Some(orbit) => orbit,
        None => {
            debug!("{}({}) - missing orbit correction", t, sv);
            return None;
        },
    };

    if orbit.iode != sat.ephemeris.iode {
        debug!(
            "{}({}) - orbit correction iode={} does not match ephemeris iode={}",
            t, sv, orbit.iode, sat.ephemeris.iode
        );
        return None;
    }

    let clock = match snapshot.clock(sv) {
        Some(clock) => clock,
        None => {
            debug!("{}({}) - missing clock correction", t, sv);
            return None;
        },
    };

    let rotation = rac_rotation(&sat.ephemeris.position_m, &sat.ephemeris.velocity_m_s)?;
    let position_m = sat.ephemeris.position_m - rotation * orbit.rac_m;
    let clock_m = sat.ephemeris.clock_offset_s * SPEED_OF_LIGHT_M_S - clock.offset_m;

    Some(SatelliteState {
        sv,
        position_m,
        clock_m,
        ura_m: snapshot.ura(sv),
    })
}

/// Geometric range from `rx_m` to `sv_m`, and the satellite position
/// in the frame of reception (Earth rotation compensated, when requested).
pub(crate) fn geometric_range(
    rx_m: &Vector3<f64>,
    sv_m: &Vector3<f64>,
    earth_rotation: bool,
) -> (f64, Vector3<f64>) {
    if earth_rotation {
        let tau_s = (sv_m - rx_m).norm() / SPEED_OF_LIGHT_M_S;
        let rotated = sagnac_rotation(sv_m, tau_s);
        ((rotated - rx_m).norm(), rotated)
    } else {
        ((sv_m - rx_m).norm(), *sv_m)
    }
}

/// Line of sight attributes, from the receiver to one satellite
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct LineOfSight {
    pub range_m: f64,
    /// Unit vector, receiver to satellite
    pub unit: Vector3<f64>,
    pub elevation_rad: f64,
    pub azimuth_rad: f64,
}

impl LineOfSight {
    pub fn new(rx_m: &Vector3<f64>, sv_m: &Vector3<f64>, earth_rotation: bool) -> Self {
        let (range_m, rotated) = geometric_range(rx_m, sv_m, earth_rotation);
        let unit = (rotated - rx_m) / range_m;
        let (azimuth_rad, elevation_rad) = azimuth_elevation(rx_m, &rotated);
        Self {
            range_m,
            unit,
            elevation_rad,
            azimuth_rad,
        }
    }
}

/// Hydrostatic and wet zenith delays (m) at this location
pub(crate) fn zenith_delays(rx_m: &Vector3<f64>) -> (f64, f64) {
    let (lat, _, h) = ecef_to_geodetic(rx_m);
    saastamoinen(lat, h)
}

/// Slant troposphere delay (m) at this elevation
pub(crate) fn slant_troposphere(elevation_rad: f64, zhd_m: f64, zwd_m: f64) -> f64 {
    mapping_function(elevation_rad) * (zhd_m + zwd_m)
}

/// Ionosphere scaling of a signal at `frequency_hz`, with respect
/// to the L1 reference frequency the ionosphere states are expressed at.
pub(crate) fn iono_factor(frequency_hz: f64) -> f64 {
    (Carrier::L1.frequency() / frequency_hz).powi(2)
}

/// Best code observation of this satellite (m), code biases applied:
/// ionosphere free combination of the two widest spaced signals,
/// or the first single frequency code.
pub(crate) fn iono_free_code(sat: &SatelliteObservation, snapshot: &CorrectionSnapshot) -> Option<f64> {
    let channel = sat.channel();

    let mut codes = sat
        .signals
        .iter()
        .filter_map(|obs| {
            let code = obs.pseudo_range_m?;
            let bias = snapshot.code_bias(sat.sv, obs.signal).unwrap_or(0.0);
            Some((obs.signal.frequency(channel), code + bias))
        })
        .collect::<Vec<_>>();

    codes.sort_by(|a, b| b.0.total_cmp(&a.0));

    let (f1, p1) = *codes.first()?;

    match codes.iter().rev().find(|(f, _)| (f1 - f).abs() > 1.0E6) {
        Some((f2, p2)) => {
            let (f1_2, f2_2) = (f1.powi(2), f2.powi(2));
            Some((f1_2 * p1 - f2_2 * p2) / (f1_2 - f2_2))
        },
        None => Some(p1),
    }
}
