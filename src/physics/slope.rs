use std::f64::consts::{FRAC_PI_2, PI};

use super::los::LosError;

/// Angle from the local vertical at the start point up to the end point.
///
/// Heights are meters above the sphere of radius `earth_radius_m`, `arc_dist`
/// is the angular separation in radians. A flat horizon at equal heights sits
/// just below `π/2`; raising the end point raises the slope.
///
/// Zero (or non-finite, or beyond antipodal) arcs have no defined slope and
/// return [`LosError::DegenerateArc`].
pub fn los_slope(
    start_height: i32,
    end_height: i32,
    arc_dist: f64,
    earth_radius_m: f64,
) -> Result<f64, LosError> {
    if !arc_dist.is_finite() || arc_dist <= 0.0 || arc_dist > PI {
        return Err(LosError::DegenerateArc(arc_dist));
    }

    let end_radius = end_height as f64 + earth_radius_m;
    let p = arc_dist.sin() * end_radius;
    if p == 0.0 {
        return Err(LosError::DegenerateArc(arc_dist));
    }
    let x_prime = arc_dist.cos() * end_radius;
    let cutoff = start_height as f64 + earth_radius_m;

    Ok(FRAC_PI_2 - ((cutoff - x_prime) / p).atan())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::EARTH_RADIUS;
    use approx::assert_relative_eq;

    #[test]
    fn zero_arc_is_rejected() {
        assert!(matches!(
            los_slope(10, 10, 0.0, EARTH_RADIUS),
            Err(LosError::DegenerateArc(_))
        ));
        assert!(los_slope(10, 10, f64::NAN, EARTH_RADIUS).is_err());
        assert!(los_slope(10, 10, -1e-6, EARTH_RADIUS).is_err());
    }

    #[test]
    fn antipodal_arc_is_rejected() {
        // sin(π) is not exactly zero in f64, so only the range check catches beyond-π.
        assert!(los_slope(0, 0, PI + 1e-9, EARTH_RADIUS).is_err());
    }

    #[test]
    fn equal_heights_approach_flat_horizon() {
        let slope = los_slope(100, 100, 1e-7, EARTH_RADIUS).unwrap();
        assert!(slope.is_finite());
        assert!(slope < FRAC_PI_2);
        assert_relative_eq!(slope, FRAC_PI_2, epsilon = 1e-6);
    }

    #[test]
    fn equal_heights_drop_by_half_the_arc() {
        // Chord geometry: with equal radii the sight line dips by arc / 2.
        let arc = 0.01;
        let slope = los_slope(0, 0, arc, EARTH_RADIUS).unwrap();
        assert_relative_eq!(slope, FRAC_PI_2 - arc / 2.0, epsilon = 1e-12);
    }

    #[test]
    fn raising_the_end_point_raises_the_slope() {
        let arc = 1000.0 / EARTH_RADIUS;
        let slope_a = los_slope(10, 5, arc, EARTH_RADIUS).unwrap();
        let slope_b = los_slope(10, 15, arc, EARTH_RADIUS).unwrap();
        assert!(slope_b > slope_a);
        assert!(slope_a < FRAC_PI_2);
        assert!(slope_b > FRAC_PI_2);
    }

    #[test]
    fn worked_example() {
        // 10 m observer, 1 km away, ground at 0 m: about 0.573 degrees below horizontal.
        let arc = 1000.0 / EARTH_RADIUS;
        let slope = los_slope(10, 0, arc, EARTH_RADIUS).unwrap();
        let below_horizontal = FRAC_PI_2 - slope;
        assert_relative_eq!(below_horizontal, (10.0f64 / 1000.0).atan() + arc / 2.0, epsilon = 1e-6);
    }
}
