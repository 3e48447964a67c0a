//! Line of sight, elevation and troposphere modeling.
use nalgebra::{Matrix3, Vector3};

use crate::constants::{EARTH_ANGULAR_VEL_RAD, EARTH_FLATTENING_WGS84, EARTH_SEMI_MAJOR_AXIS_WGS84};

/// Relative humidity of the standard atmosphere
const STANDARD_HUMIDITY: f64 = 0.7;

/// ECEF (m) to geodetic latitude (rad), longitude (rad) and height (m)
pub fn ecef_to_geodetic(ecef_m: &Vector3<f64>) -> (f64, f64, f64) {
    let a = EARTH_SEMI_MAJOR_AXIS_WGS84;
    let e2 = EARTH_FLATTENING_WGS84 * (2.0 - EARTH_FLATTENING_WGS84);

    let r2 = ecef_m[0].powi(2) + ecef_m[1].powi(2);
    let mut z = ecef_m[2];
    let mut zk = 0.0_f64;
    let mut v = a;

    while (z - zk).abs() >= 1.0E-4 {
        zk = z;
        let sinp = z / (r2 + z * z).sqrt();
        v = a / (1.0 - e2 * sinp * sinp).sqrt();
        z = ecef_m[2] + v * e2 * sinp;
    }

    if r2 > 1.0E-12 {
        let lat = (z / r2.sqrt()).atan();
        let lon = ecef_m[1].atan2(ecef_m[0]);
        (lat, lon, (r2 + z * z).sqrt() - v)
    } else {
        let lat = std::f64::consts::FRAC_PI_2.copysign(ecef_m[2]);
        (lat, 0.0, ecef_m[2].abs() - v)
    }
}

/// ECEF to local East North Up rotation matrix
pub fn enu_rotation(lat_rad: f64, lon_rad: f64) -> Matrix3<f64> {
    let (sin_lat, cos_lat) = lat_rad.sin_cos();
    let (sin_lon, cos_lon) = lon_rad.sin_cos();

    Matrix3::new(
        -sin_lon,
        cos_lon,
        0.0,
        -sin_lat * cos_lon,
        -sin_lat * sin_lon,
        cos_lat,
        cos_lat * cos_lon,
        cos_lat * sin_lon,
        sin_lat,
    )
}

/// Returns (azimuth, elevation) in radians, of `sv_m` seen from `rx_m`
pub fn azimuth_elevation(rx_m: &Vector3<f64>, sv_m: &Vector3<f64>) -> (f64, f64) {
    let (lat, lon, _) = ecef_to_geodetic(rx_m);
    let los = sv_m - rx_m;
    let enu = enu_rotation(lat, lon) * los;

    let horizontal = (enu[0].powi(2) + enu[1].powi(2)).sqrt();
    let elevation = enu[2].atan2(horizontal);

    let mut azimuth = enu[0].atan2(enu[1]);
    if azimuth < 0.0 {
        azimuth += 2.0 * std::f64::consts::PI;
    }

    (azimuth, elevation)
}

/// Rotates a satellite position by the Earth rotation during
/// `tau_s` seconds of signal propagation.
pub fn sagnac_rotation(sv_m: &Vector3<f64>, tau_s: f64) -> Vector3<f64> {
    let (sin_we, cos_we) = (EARTH_ANGULAR_VEL_RAD * tau_s).sin_cos();
    Vector3::new(
        cos_we * sv_m[0] + sin_we * sv_m[1],
        -sin_we * sv_m[0] + cos_we * sv_m[1],
        sv_m[2],
    )
}

/// Saastamoinen zenith delays (hydrostatic, wet) in meters,
/// using a standard atmosphere at the given location.
pub fn saastamoinen(lat_rad: f64, height_m: f64) -> (f64, f64) {
    let height_m = height_m.clamp(-100.0, 1.0E4);

    let pressure = 1013.25 * (1.0 - 2.2557E-5 * height_m).powf(5.2568);
    let temperature = 15.0 - 6.5E-3 * height_m + 273.16;
    let e = 6.108
        * STANDARD_HUMIDITY
        * ((17.15 * temperature - 4684.0) / (temperature - 38.45)).exp();

    let zhd = 0.0022768 * pressure
        / (1.0 - 0.00266 * (2.0 * lat_rad).cos() - 0.00028E-3 * height_m);
    let zwd = 0.002277 * (1255.0 / temperature + 0.05) * e;

    (zhd, zwd)
}

/// Troposphere mapping function
pub fn mapping_function(elevation_rad: f64) -> f64 {
    1.001 / (0.002001 + elevation_rad.sin().powi(2)).sqrt()
}

#[cfg(test)]
mod test {
    use super::*;
    use nalgebra::Vector3;

    #[test]
    fn geodetic_coordinates() {
        let (lat, lon, h) = ecef_to_geodetic(&Vector3::new(EARTH_SEMI_MAJOR_AXIS_WGS84, 0.0, 0.0));
        assert!(lat.abs() < 1.0E-9);
        assert!(lon.abs() < 1.0E-9);
        assert!(h.abs() < 1.0E-3);

        // Toulouse
        let (lat, lon, h) =
            ecef_to_geodetic(&Vector3::new(4627848.0, 119646.0, 4372925.0));
        assert!((lat.to_degrees() - 43.5606).abs() < 1.0E-3);
        assert!((lon.to_degrees() - 1.4810).abs() < 1.0E-3);
        assert!(h > 100.0 && h < 300.0, "h={}", h);
    }

    #[test]
    fn zenith_and_horizon() {
        let rx = Vector3::new(EARTH_SEMI_MAJOR_AXIS_WGS84, 0.0, 0.0);

        let (_, el) = azimuth_elevation(&rx, &Vector3::new(2.6E7, 0.0, 0.0));
        assert!((el.to_degrees() - 90.0).abs() < 1.0E-6);

        let (az, el) = azimuth_elevation(&rx, &(rx + Vector3::new(0.0, 1.0E6, 0.0)));
        assert!(el.abs() < 1.0E-6);
        assert!((az.to_degrees() - 90.0).abs() < 1.0E-6);

        let (az, _) = azimuth_elevation(&rx, &(rx + Vector3::new(1.0E5, 0.0, 1.0E6)));
        assert!(az.to_degrees().abs() < 1.0E-6);
    }

    #[test]
    fn troposphere() {
        let (zhd, zwd) = saastamoinen(45.0_f64.to_radians(), 0.0);
        assert!((zhd - 2.31).abs() < 0.01, "zhd={}", zhd);
        assert!(zwd > 0.05 && zwd < 0.3, "zwd={}", zwd);

        assert!((mapping_function(std::f64::consts::FRAC_PI_2) - 1.0).abs() < 1.0E-3);
        assert!(mapping_function(10.0_f64.to_radians()) > 5.0);
    }

    #[test]
    fn earth_rotation() {
        let sv = Vector3::new(2.0E7, 1.0E7, 1.0E7);
        let rotated = sagnac_rotation(&sv, 0.07);
        assert_eq!(rotated[2], sv[2]);
        assert!((rotated.norm() - sv.norm()).abs() < 1.0E-6);
        assert!((rotated - sv).norm() > 10.0);
    }
}
