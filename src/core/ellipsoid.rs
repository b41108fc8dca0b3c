use serde::{Deserialize, Serialize};

/// Reference ellipsoid for geodetic to Earth-fixed conversion
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Ellipsoid {
    /// Semi-major axis (meters)
    pub semi_major_axis: f64,
    /// First eccentricity squared
    pub e2: f64,
}

impl Default for Ellipsoid {
    fn default() -> Self {
        Self::wgs84()
    }
}

impl Ellipsoid {
    pub fn wgs84() -> Self {
        Self {
            semi_major_axis: 6378137.0,
            e2: 0.00669437999014,
        }
    }

    /// Prime vertical radius of curvature at a latitude (radians)
    pub fn prime_vertical_radius(&self, lat_rad: f64) -> f64 {
        self.semi_major_axis / (1.0 - self.e2 * lat_rad.sin().powi(2)).sqrt()
    }

    /// Convert `[lon, lat, h]` (radians, radians, meters) to ECEF coordinates
    pub fn lon_lat_to_xyz(&self, llh: &[f64; 3]) -> [f64; 3] {
        let [lon_rad, lat_rad, height] = *llh;
        let n = self.prime_vertical_radius(lat_rad);

        let x = (n + height) * lat_rad.cos() * lon_rad.cos();
        let y = (n + height) * lat_rad.cos() * lon_rad.sin();
        let z = (n * (1.0 - self.e2) + height) * lat_rad.sin();

        [x, y, z]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_equator_prime_meridian() {
        let xyz = Ellipsoid::wgs84().lon_lat_to_xyz(&[0.0, 0.0, 0.0]);
        assert_abs_diff_eq!(xyz[0], 6378137.0, epsilon = 1e-6);
        assert_abs_diff_eq!(xyz[1], 0.0, epsilon = 1e-6);
        assert_abs_diff_eq!(xyz[2], 0.0, epsilon = 1e-6);
    }

    #[test]
    fn test_pole_uses_semi_minor_axis() {
        let xyz = Ellipsoid::wgs84().lon_lat_to_xyz(&[0.0, std::f64::consts::FRAC_PI_2, 0.0]);
        // WGS84 semi-minor axis
        assert_abs_diff_eq!(xyz[2], 6356752.314, epsilon = 1e-2);
        assert_abs_diff_eq!(xyz[0], 0.0, epsilon = 1e-6);
    }

    #[test]
    fn test_height_moves_along_normal() {
        let ell = Ellipsoid::wgs84();
        let lon = (-118.0f64).to_radians();
        let lat = 34.0f64.to_radians();
        let ground = ell.lon_lat_to_xyz(&[lon, lat, 0.0]);
        let raised = ell.lon_lat_to_xyz(&[lon, lat, 1000.0]);
        let d = ((raised[0] - ground[0]).powi(2)
            + (raised[1] - ground[1]).powi(2)
            + (raised[2] - ground[2]).powi(2))
        .sqrt();
        assert_abs_diff_eq!(d, 1000.0, epsilon = 1e-6);
    }
}
