//! Coordinate handling for sounding locations.
//!
//! Site coordinates arrive in the NZTM2000 projection; duplicate detection
//! and the nearest-neighbour diagnostics work on WGS84 longitude/latitude
//! with great-circle distances in kilometres.

// ---------------------------------------------------------------------------
// NZTM2000 -> WGS84
// ---------------------------------------------------------------------------

// NZTM2000 projection parameters (GRS80 ellipsoid).
const A: f64 = 6_378_137.0;
const F: f64 = 1.0 / 298.257222101;
const LAMBDA_ZERO: f64 = 173.0;
const N_ZERO: f64 = 10_000_000.0;
const E_ZERO: f64 = 1_600_000.0;
const K_ZERO: f64 = 0.9996;

/// Convert NZTM2000 easting/northing to (latitude, longitude) in degrees.
pub fn nztm_to_ll(nztm_x: f64, nztm_y: f64) -> (f64, f64) {
    let n = nztm_y;
    let e = nztm_x;

    let b = A * (1.0 - F);
    let esq = 2.0 * F - F * F;

    let n_prime = n - N_ZERO;
    let m_prime = n_prime / K_ZERO;
    let smn = (A - b) / (A + b);
    let g = A
        * (1.0 - smn)
        * (1.0 - smn * smn)
        * (1.0 + 9.0 * smn.powi(2) / 4.0 + 225.0 * smn.powi(4) / 64.0)
        * std::f64::consts::PI
        / 180.0;
    let sigma = m_prime * std::f64::consts::PI / (180.0 * g);
    let phi_prime = sigma
        + (3.0 * smn / 2.0 - 27.0 * smn.powi(3) / 32.0) * (2.0 * sigma).sin()
        + (21.0 * smn.powi(2) / 16.0 - 55.0 * smn.powi(4) / 32.0) * (4.0 * sigma).sin()
        + (151.0 * smn.powi(3) / 96.0) * (6.0 * sigma).sin()
        + (1097.0 * smn.powi(4) / 512.0) * (8.0 * sigma).sin();
    let rho_prime = A * (1.0 - esq) / (1.0 - esq * phi_prime.sin().powi(2)).powf(1.5);
    let upsilon_prime = A / (1.0 - esq * phi_prime.sin().powi(2)).sqrt();

    let psi = upsilon_prime / rho_prime;
    let t = phi_prime.tan();
    let e_prime = e - E_ZERO;
    let chi = e_prime / (K_ZERO * upsilon_prime);

    let term_1 = t * e_prime * chi / (K_ZERO * rho_prime * 2.0);
    let term_2 = term_1 * chi.powi(2) / 12.0
        * (-4.0 * psi.powi(2) + 9.0 * psi * (1.0 - t.powi(2)) + 12.0 * t.powi(2));
    let term_3 = t * e_prime * chi.powi(5) / (K_ZERO * rho_prime * 720.0)
        * (8.0 * psi.powi(4) * (11.0 - 24.0 * t.powi(2))
            - 12.0 * psi.powi(3) * (21.0 - 71.0 * t.powi(2))
            + 15.0 * psi.powi(2) * (15.0 - 98.0 * t.powi(2) + 15.0 * t.powi(4))
            + 180.0 * psi * (5.0 * t.powi(2) - 3.0 * t.powi(4))
            + 360.0 * t.powi(4));
    let term_4 = t * e_prime * chi.powi(7) / (K_ZERO * rho_prime * 40320.0)
        * (1385.0 + 3633.0 * t.powi(2) + 4095.0 * t.powi(4) + 1575.0 * t.powi(6));

    let sec_phi = 1.0 / phi_prime.cos();
    let term1 = chi * sec_phi;
    let term2 = chi.powi(3) * sec_phi / 6.0 * (psi + 2.0 * t.powi(2));
    let term3 = chi.powi(5) * sec_phi / 120.0
        * (-4.0 * psi.powi(3) * (1.0 - 6.0 * t.powi(2))
            + psi.powi(2) * (9.0 - 68.0 * t.powi(2))
            + 72.0 * psi * t.powi(2)
            + 24.0 * t.powi(4));
    let term4 = chi.powi(7) * sec_phi / 5040.0
        * (61.0 + 662.0 * t.powi(2) + 1320.0 * t.powi(4) + 720.0 * t.powi(6));

    let latitude = (phi_prime - term_1 + term_2 - term_3 + term_4) * 180.0 / std::f64::consts::PI;
    let longitude = LAMBDA_ZERO + 180.0 / std::f64::consts::PI * (term1 - term2 + term3 - term4);

    (latitude, longitude)
}

// ---------------------------------------------------------------------------
// Great-circle distance
// ---------------------------------------------------------------------------

const R_EARTH_KM: f64 = 6378.139;

/// Haversine distance in kilometres between two (lon, lat) points in degrees.
pub fn ll_dist(lon1: f64, lat1: f64, lon2: f64, lat2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let dlon = (lon2 - lon1).to_radians();

    let d = ((phi2 - phi1) / 2.0).sin().powi(2)
        + phi1.cos() * phi2.cos() * (dlon / 2.0).sin().powi(2);
    R_EARTH_KM * 2.0 * d.sqrt().atan2((1.0 - d).sqrt())
}

/// Index and distance (km) of the location closest to `(lon, lat)`.
/// Returns `None` for an empty slice.
pub fn closest_location(locations: &[(f64, f64)], lon: f64, lat: f64) -> Option<(usize, f64)> {
    locations
        .iter()
        .enumerate()
        .map(|(i, &(l, t))| (i, ll_dist(lon, lat, l, t)))
        .min_by(|a, b| a.1.total_cmp(&b.1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nztm_roundtrip_is_plausible() {
        // Christchurch is roughly at NZTM (1570634, 5180148).
        let (lat, lon) = nztm_to_ll(1_570_634.0, 5_180_148.0);
        assert!((-44.0..-43.0).contains(&lat), "lat {lat}");
        assert!((172.0..173.5).contains(&lon), "lon {lon}");
    }

    #[test]
    fn small_offsets_map_to_metres() {
        // 10 m easting offset should be ~0.01 km apart on the ground.
        let (lat1, lon1) = nztm_to_ll(1_570_634.0, 5_180_148.0);
        let (lat2, lon2) = nztm_to_ll(1_570_644.0, 5_180_148.0);
        let d = ll_dist(lon1, lat1, lon2, lat2);
        assert!((d - 0.01).abs() < 0.001, "distance {d} km");
    }

    #[test]
    fn closest_location_picks_minimum() {
        let locs = [(172.0, -43.0), (172.5, -43.5), (172.001, -43.001)];
        let (idx, d) = closest_location(&locs, 172.0, -43.0).unwrap();
        assert_eq!(idx, 0);
        assert!(d.abs() < 1e-9);
    }

    #[test]
    fn closest_location_empty() {
        assert!(closest_location(&[], 172.0, -43.0).is_none());
    }
}
