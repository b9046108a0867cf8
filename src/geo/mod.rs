use serde::{Deserialize, Serialize};

/// WGS84 equatorial radius in meters.
pub const EARTH_RADIUS: f64 = 6378137.0;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LatLon {
    pub latitude: f64,
    pub longitude: f64,
}

impl LatLon {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    fn to_unit_vector(self) -> [f64; 3] {
        let lat = self.latitude.to_radians();
        let lon = self.longitude.to_radians();
        [lat.cos() * lon.cos(), lat.cos() * lon.sin(), lat.sin()]
    }

    fn from_unit_vector(v: [f64; 3]) -> Self {
        let lat = v[2].atan2((v[0] * v[0] + v[1] * v[1]).sqrt());
        let lon = v[1].atan2(v[0]);
        Self {
            latitude: lat.to_degrees(),
            longitude: lon.to_degrees(),
        }
    }
}

/// Angular separation of two points on the sphere, in radians.
///
/// Haversine form, which stays accurate for the very short arcs between
/// neighbouring path samples.
pub fn arc_distance(p1: LatLon, p2: LatLon) -> f64 {
    let lat1 = p1.latitude.to_radians();
    let lat2 = p2.latitude.to_radians();
    let dlat = (p2.latitude - p1.latitude).to_radians();
    let dlon = (p2.longitude - p1.longitude).to_radians();

    let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    2.0 * a.sqrt().atan2((1.0 - a).max(0.0).sqrt())
}

/// Initial bearing from `p1` to `p2`, radians clockwise from north.
pub fn azimuth(p1: LatLon, p2: LatLon) -> f64 {
    let lat1 = p1.latitude.to_radians();
    let lat2 = p2.latitude.to_radians();
    let dlon = (p2.longitude - p1.longitude).to_radians();

    let y = dlon.sin() * lat2.cos();
    let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * dlon.cos();
    y.atan2(x)
}

/// Destination reached by travelling `arc` radians from `origin` along `azimuth`.
pub fn offset(origin: LatLon, azimuth: f64, arc: f64) -> LatLon {
    let lat1 = origin.latitude.to_radians();
    let lon1 = origin.longitude.to_radians();

    let lat2 = (lat1.sin() * arc.cos() + lat1.cos() * arc.sin() * azimuth.cos()).asin();
    let lon2 = lon1
        + (azimuth.sin() * arc.sin() * lat1.cos()).atan2(arc.cos() - lat1.sin() * lat2.sin());

    LatLon {
        latitude: lat2.to_degrees(),
        longitude: lon2.to_degrees(),
    }
}

/// Points spaced evenly along the great circle from `start` to `end`.
///
/// `num_points` interior points are generated; with `include_endpoints` the
/// start and end points bracket them, giving `num_points + 2` samples in
/// start-to-end order.
pub fn great_circle_sample(
    start: LatLon,
    end: LatLon,
    num_points: usize,
    include_endpoints: bool,
) -> Vec<LatLon> {
    let mut points = Vec::with_capacity(num_points + 2);
    if include_endpoints {
        points.push(start);
    }

    let omega = arc_distance(start, end);
    let segments = (num_points + 1) as f64;

    if omega > 0.0 {
        let a = start.to_unit_vector();
        let b = end.to_unit_vector();
        let sin_omega = omega.sin();

        for i in 1..=num_points {
            let t = i as f64 / segments;
            // Spherical linear interpolation between the two unit vectors.
            let wa = ((1.0 - t) * omega).sin() / sin_omega;
            let wb = (t * omega).sin() / sin_omega;
            let v = [
                wa * a[0] + wb * b[0],
                wa * a[1] + wb * b[1],
                wa * a[2] + wb * b[2],
            ];
            points.push(LatLon::from_unit_vector(v));
        }
    } else {
        points.extend(std::iter::repeat_n(start, num_points));
    }

    if include_endpoints {
        points.push(end);
    }
    points
}
