use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, trace};

use crate::config::LosConfig;
use crate::geo::{arc_distance, great_circle_sample, LatLon};
use crate::physics::refraction::{effective_earth_radius, RefractionParams};
use crate::physics::slope::los_slope;

/// Fewest interior samples a query may ask for.
pub const MIN_SAMPLES: usize = 4;

/// Terrain height lookup. `None` means the source has no data for the point,
/// which is distinct from a legitimate height of zero or below.
pub trait ElevationSource: Send + Sync {
    fn elevation(&self, point: LatLon, level: u8) -> Option<i32>;
}

impl<T: ElevationSource + ?Sized> ElevationSource for &T {
    fn elevation(&self, point: LatLon, level: u8) -> Option<i32> {
        (**self).elevation(point, level)
    }
}

impl<T: ElevationSource + ?Sized> ElevationSource for Arc<T> {
    fn elevation(&self, point: LatLon, level: u8) -> Option<i32> {
        (**self).elevation(point, level)
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum LosError {
    #[error("no elevation source configured")]
    NoElevationSource,

    #[error("arc distance {0} rad has no defined slope")]
    DegenerateArc(f64),

    #[error("{requested} path samples requested, at least {min} required")]
    TooFewSamples { requested: usize, min: usize },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LosQuery {
    pub observer: LatLon,
    /// Meters above ground (or above the sphere when ground is not added).
    pub observer_height_m: i32,
    /// Add the terrain height under the observer to `observer_height_m`.
    pub add_observer_elevation: bool,
    pub target: LatLon,
    pub target_height_m: i32,
    /// Interior points sampled along the path.
    pub samples: usize,
}

impl LosQuery {
    pub fn new(observer: LatLon, observer_height_m: i32, target: LatLon, target_height_m: i32) -> Self {
        Self {
            observer,
            observer_height_m,
            add_observer_elevation: true,
            target,
            target_height_m,
            samples: LosConfig::default().samples,
        }
    }

    pub fn with_samples(mut self, samples: usize) -> Self {
        self.samples = samples;
        self
    }

    pub fn with_observer_elevation(mut self, add: bool) -> Self {
        self.add_observer_elevation = add;
        self
    }
}

/// Decides visibility between two points over terrain from an [`ElevationSource`].
#[derive(Clone)]
pub struct LosGenerator {
    source: Option<Arc<dyn ElevationSource>>,
    config: LosConfig,
}

impl std::fmt::Debug for LosGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LosGenerator")
            .field("has_source", &self.source.is_some())
            .field("config", &self.config)
            .finish()
    }
}

impl LosGenerator {
    /// A generator without terrain; every query reports no line of sight.
    pub fn new(config: LosConfig) -> Self {
        Self { source: None, config }
    }

    pub fn with_source(source: Arc<dyn ElevationSource>, config: LosConfig) -> Self {
        Self {
            source: Some(source),
            config,
        }
    }

    pub fn set_source(&mut self, source: Option<Arc<dyn ElevationSource>>) {
        self.source = source;
    }

    pub fn config(&self) -> &LosConfig {
        &self.config
    }

    fn earth_radius(&self) -> f64 {
        effective_earth_radius(
            self.config.earth_radius_m,
            RefractionParams {
                k_factor: self.config.k_factor,
            },
        )
    }

    /// Ground height at `point`. Points without data read as sea level.
    fn ground(&self, source: &dyn ElevationSource, point: LatLon) -> i32 {
        match source.elevation(point, self.config.dted_level) {
            Some(h) => h,
            None => {
                trace!(lat = point.latitude, lon = point.longitude, "no elevation data, using 0 m");
                0
            }
        }
    }

    /// Slope from an observer at total height `observer_total_m` to a point
    /// standing `height_above_ground_m` over the terrain at `point`.
    pub fn slope_to(
        &self,
        observer: LatLon,
        observer_total_m: i32,
        point: LatLon,
        height_above_ground_m: i32,
    ) -> Result<f64, LosError> {
        let source = self.source.as_deref().ok_or(LosError::NoElevationSource)?;
        let end_total = self.ground(source, point).saturating_add(height_above_ground_m);
        los_slope(
            observer_total_m,
            end_total,
            arc_distance(observer, point),
            self.earth_radius(),
        )
    }

    /// Walks the path from observer to target and reports whether the target
    /// clears the steepest sight angle required by any closer sample.
    ///
    /// Only the final comparison decides the result; intermediate samples just
    /// raise the bar the target has to clear.
    pub fn evaluate(&self, query: &LosQuery) -> Result<bool, LosError> {
        let source = self.source.as_deref().ok_or(LosError::NoElevationSource)?;
        if query.samples < MIN_SAMPLES {
            return Err(LosError::TooFewSamples {
                requested: query.samples,
                min: MIN_SAMPLES,
            });
        }
        let total_arc = arc_distance(query.observer, query.target);
        if total_arc <= 0.0 {
            return Err(LosError::DegenerateArc(total_arc));
        }

        let mut observer_total = query.observer_height_m;
        if query.add_observer_elevation {
            observer_total = observer_total.saturating_add(self.ground(source, query.observer));
        }

        let radius = self.earth_radius();
        let points = great_circle_sample(query.observer, query.target, query.samples, true);
        let last = points.len() - 1;
        let first = self.config.first_sample.min(last);

        let mut max_slope = 0.0;
        let mut visible = false;

        for (i, point) in points.iter().enumerate().skip(first) {
            let arc = arc_distance(query.observer, *point);
            if arc <= 0.0 {
                continue;
            }
            let height_above_ground = if i == last { query.target_height_m } else { 0 };
            let end_total = self.ground(source, *point).saturating_add(height_above_ground);
            let slope = los_slope(observer_total, end_total, arc, radius)?;

            if slope > max_slope {
                visible = true;
                max_slope = slope;
            } else {
                visible = false;
            }
        }

        Ok(visible)
    }

    /// [`evaluate`](Self::evaluate) with every failure treated as "not visible".
    pub fn is_los(&self, query: &LosQuery) -> bool {
        match self.evaluate(query) {
            Ok(visible) => visible,
            Err(e) => {
                debug!(error = %e, "line of sight not established");
                false
            }
        }
    }
}
