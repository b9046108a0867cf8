use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::ScanConfig;
use crate::geo::{arc_distance, LatLon};
use crate::physics::los::{LosGenerator, LosQuery};
use crate::physics::refraction::{effective_earth_radius, RefractionParams};

/// An observer the scan tests every cell against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Viewpoint {
    pub name: String,
    pub location: LatLon,
    /// Meters above the ground at `location`.
    pub height_m: i32,
}

/// Regular lat/lon grid; row 0 is the northern edge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScanGrid {
    pub north_west: LatLon,
    pub south_east: LatLon,
    pub width: usize,
    pub height: usize,
}

impl ScanGrid {
    pub fn cell_center(&self, x: usize, y: usize) -> LatLon {
        let lat_span = self.north_west.latitude - self.south_east.latitude;
        let lon_span = self.south_east.longitude - self.north_west.longitude;
        LatLon {
            latitude: self.north_west.latitude - lat_span * (y as f64 + 0.5) / self.height as f64,
            longitude: self.north_west.longitude + lon_span * (x as f64 + 0.5) / self.width as f64,
        }
    }

    pub fn cell_count(&self) -> usize {
        self.width * self.height
    }
}

/// Cooperative cancellation signal polled by long scans.
pub trait Interrupt {
    fn interrupted(&self) -> bool;
}

impl Interrupt for AtomicBool {
    fn interrupted(&self) -> bool {
        self.load(Ordering::Relaxed)
    }
}

impl<T: Interrupt + ?Sized> Interrupt for Arc<T> {
    fn interrupted(&self) -> bool {
        (**self).interrupted()
    }
}

pub struct NeverInterrupt;

impl Interrupt for NeverInterrupt {
    fn interrupted(&self) -> bool {
        false
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScanOutcome {
    pub width: usize,
    pub height: usize,
    pub rows_completed: usize,
    pub cancelled: bool,
    /// Row-major visibility of the completed rows only.
    pub visible: Vec<bool>,
}

impl ScanOutcome {
    pub fn is_visible(&self, x: usize, y: usize) -> Option<bool> {
        if x >= self.width || y >= self.rows_completed {
            return None;
        }
        self.visible.get(y * self.width + x).copied()
    }

    pub fn visible_count(&self) -> usize {
        self.visible.iter().filter(|v| **v).count()
    }
}

/// Tests every grid cell against every viewpoint in range.
///
/// `interrupt` is polled before each row; once it fires the scan returns the
/// rows finished so far and performs no further lookups. `progress` counts
/// finished rows.
pub fn scan(
    generator: &LosGenerator,
    grid: &ScanGrid,
    viewpoints: &[Viewpoint],
    config: &ScanConfig,
    interrupt: &dyn Interrupt,
    progress: Option<Arc<AtomicU32>>,
) -> ScanOutcome {
    // Range cutoff and LOS share the generator's earth model and sampling.
    let los = generator.config();
    let radius = effective_earth_radius(
        los.earth_radius_m,
        RefractionParams {
            k_factor: los.k_factor,
        },
    );
    let mut visible = Vec::with_capacity(grid.cell_count());
    let mut rows_completed = 0;
    let mut cancelled = false;

    for y in 0..grid.height {
        if interrupt.interrupted() {
            debug!(row = y, "scan interrupted");
            cancelled = true;
            break;
        }

        for x in 0..grid.width {
            let cell = grid.cell_center(x, y);
            let seen = viewpoints.iter().any(|vp| {
                // Broad phase: skip viewpoints out of sensor range.
                let dist_m = arc_distance(vp.location, cell) * radius;
                if dist_m > config.max_range_m {
                    return false;
                }
                let query = LosQuery {
                    observer: vp.location,
                    observer_height_m: vp.height_m,
                    add_observer_elevation: true,
                    target: cell,
                    target_height_m: config.target_height_m,
                    samples: los.samples,
                };
                generator.is_los(&query)
            });
            visible.push(seen);
        }

        rows_completed += 1;
        if let Some(p) = &progress {
            p.fetch_add(1, Ordering::Relaxed);
        }
    }

    let outcome = ScanOutcome {
        width: grid.width,
        height: grid.height,
        rows_completed,
        cancelled,
        visible,
    };
    info!(
        rows = outcome.rows_completed,
        of = grid.height,
        visible = outcome.visible_count(),
        cancelled,
        "scan finished"
    );
    outcome
}
