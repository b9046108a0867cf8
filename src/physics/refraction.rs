use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RefractionParams {
    pub k_factor: f64,
}

impl Default for RefractionParams {
    /// Straight-line optics. Radio paths usually want 4/3.
    fn default() -> Self {
        Self { k_factor: 1.0 }
    }
}

/// Radius of the sphere on which refracted rays travel in straight lines.
pub fn effective_earth_radius(radius_m: f64, params: RefractionParams) -> f64 {
    radius_m * params.k_factor
}
