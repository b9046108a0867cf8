pub mod dted;

use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use lru::LruCache;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::TerrainConfig;
use crate::geo::LatLon;
use crate::physics::los::ElevationSource;

pub use dted::DtedFrame;

#[derive(Debug, Error)]
pub enum TerrainError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed DTED frame: {0}")]
    Malformed(String),

    #[error("checksum mismatch in record {record}: stored {stored}, computed {computed}")]
    Checksum { record: usize, stored: u32, computed: u32 },

    #[error("unsupported DTED level {0}")]
    UnsupportedLevel(u8),

    #[error("frame cache lock was poisoned")]
    CacheLockPoisoned,
}

/// `root/e006/n45.dt1` style location of the frame whose south-west corner is (`lat`, `lon`).
pub fn dted_path(root: &Path, lat: i32, lon: i32, level: u8) -> PathBuf {
    let dir = format!("{}{:03}", if lon >= 0 { "e" } else { "w" }, lon.abs());
    let file = format!("{}{:02}.dt{}", if lat >= 0 { "n" } else { "s" }, lat.abs(), level);
    root.join(dir).join(file)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct FrameKey {
    lat: i32,
    lon: i32,
    level: u8,
}

impl FrameKey {
    fn containing(point: LatLon, level: u8) -> Self {
        Self {
            lat: point.latitude.floor() as i32,
            lon: point.longitude.floor() as i32,
            level,
        }
    }
}

/// LRU cache of DTED frames read lazily from a directory tree.
///
/// Frames that do not exist on disk, or fail to parse, are cached as absent
/// so repeated misses stay cheap. Safe to share between scanning threads.
pub struct DtedFrameCache {
    root: PathBuf,
    cache: Mutex<LruCache<FrameKey, Option<Arc<DtedFrame>>>>,
}

impl DtedFrameCache {
    pub fn new(root: impl Into<PathBuf>, capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            root: root.into(),
            cache: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub fn from_config(config: &TerrainConfig) -> Self {
        Self::new(config.dted_root.clone(), config.cache_capacity)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn len(&self) -> usize {
        self.cache.lock().map(|c| c.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn load(&self, key: FrameKey) -> Result<Option<Arc<DtedFrame>>, TerrainError> {
        let path = dted_path(&self.root, key.lat, key.lon, key.level);
        if !path.exists() {
            debug!(?path, "no DTED frame");
            return Ok(None);
        }
        let bytes = std::fs::read(&path)?;
        let frame = DtedFrame::from_bytes(&bytes)?;
        debug!(?path, lon_lines = frame.lon_lines, lat_points = frame.lat_points, "loaded DTED frame");
        Ok(Some(Arc::new(frame)))
    }

    /// Frame with south-west corner at (`lat`, `lon`), `None` if absent on disk.
    ///
    /// A frame that fails to load returns the error once and `None` afterwards.
    pub fn get_frame(&self, lat: i32, lon: i32, level: u8) -> Result<Option<Arc<DtedFrame>>, TerrainError> {
        if level > 2 {
            return Err(TerrainError::UnsupportedLevel(level));
        }
        let key = FrameKey { lat, lon, level };
        {
            let mut cache = self.cache.lock().map_err(|_| TerrainError::CacheLockPoisoned)?;
            if let Some(frame) = cache.get(&key) {
                return Ok(frame.clone());
            }
        }

        // Loaded outside the lock; two threads racing on the same miss both read the file.
        let loaded = self.load(key);

        let mut cache = self.cache.lock().map_err(|_| TerrainError::CacheLockPoisoned)?;
        match loaded {
            Ok(frame) => {
                cache.put(key, frame.clone());
                Ok(frame)
            }
            Err(e) => {
                // Unreadable frames are remembered as absent; only the first lookup reports the error.
                cache.put(key, None);
                Err(e)
            }
        }
    }

    pub fn elevation_at(&self, point: LatLon, level: u8) -> Result<Option<i32>, TerrainError> {
        let key = FrameKey::containing(point, level);
        let frame = self.get_frame(key.lat, key.lon, key.level)?;
        Ok(frame.and_then(|f| f.elevation_at(point)))
    }
}

impl ElevationSource for DtedFrameCache {
    fn elevation(&self, point: LatLon, level: u8) -> Option<i32> {
        match self.elevation_at(point, level) {
            Ok(h) => h,
            Err(e) => {
                warn!(lat = point.latitude, lon = point.longitude, error = %e, "elevation lookup failed");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::dted::encode_frame;

    fn temp_root(name: &str) -> PathBuf {
        let root = std::env::temp_dir().join(format!("mapcore-{}-{}", name, std::process::id()));
        let _ = std::fs::remove_dir_all(&root);
        root
    }

    fn install(root: &Path, lat: i32, lon: i32, level: u8, bytes: &[u8]) {
        let path = dted_path(root, lat, lon, level);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, bytes).unwrap();
    }

    #[test]
    fn path_layout() {
        let root = Path::new("/data/dted");
        assert_eq!(dted_path(root, 45, 6, 1), PathBuf::from("/data/dted/e006/n45.dt1"));
        assert_eq!(dted_path(root, -3, -77, 0), PathBuf::from("/data/dted/w077/s03.dt0"));
    }

    /// 11x11 posts at 0.1 degree spacing; every post in column `c` reads `100 * (c + 1)`.
    fn striped_frame(lat: i32, lon: i32) -> Vec<u8> {
        let columns: Vec<Vec<Option<i16>>> = (0..11i16).map(|c| vec![Some(100 * (c + 1)); 11]).collect();
        encode_frame(lat, lon, 3600, &columns)
    }

    #[test]
    fn reads_through_and_caches() {
        let root = temp_root("cache");
        install(&root, 10, 20, 1, &striped_frame(10, 20));

        let cache = DtedFrameCache::new(&root, 4);
        assert!(cache.is_empty());
        assert_eq!(cache.elevation(LatLon::new(10.2, 20.6), 1), Some(700));
        assert_eq!(cache.len(), 1);

        // Served from memory once the file is gone.
        std::fs::remove_dir_all(&root).unwrap();
        assert_eq!(cache.elevation(LatLon::new(10.9, 20.9), 1), Some(1000));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn missing_frames_are_no_data() {
        let cache = DtedFrameCache::new(temp_root("missing"), 2);
        assert_eq!(cache.elevation(LatLon::new(1.5, 1.5), 1), None);
        assert_eq!(cache.len(), 1);
        assert!(cache.get_frame(1, 1, 1).unwrap().is_none());
    }

    #[test]
    fn corrupt_frames_are_no_data() {
        let root = temp_root("corrupt");
        install(&root, 0, 0, 2, b"not a dted file");
        let cache = DtedFrameCache::new(&root, 2);
        assert!(cache.get_frame(0, 0, 2).is_err());
        assert_eq!(cache.len(), 1);
        assert!(cache.get_frame(0, 0, 2).unwrap().is_none());
        assert_eq!(cache.elevation(LatLon::new(0.5, 0.5), 2), None);

        // A repaired file is not re-read while the failure is cached.
        install(&root, 0, 0, 2, &striped_frame(0, 0));
        assert_eq!(cache.elevation(LatLon::new(0.5, 0.5), 2), None);
        assert_eq!(DtedFrameCache::new(&root, 2).elevation(LatLon::new(0.5, 0.5), 2), Some(600));
        std::fs::remove_dir_all(&root).unwrap();
    }

    #[test]
    fn level_out_of_range() {
        let cache = DtedFrameCache::new(temp_root("level"), 2);
        assert!(matches!(cache.get_frame(0, 0, 3), Err(TerrainError::UnsupportedLevel(3))));
    }

    #[test]
    fn evicts_least_recently_used() {
        let root = temp_root("evict");
        for lon in 0..3 {
            install(&root, 0, lon, 0, &encode_frame(0, lon, 3600, &vec![vec![Some(lon as i16); 11]; 11]));
        }
        let cache = DtedFrameCache::new(&root, 2);
        for lon in 0..3 {
            assert_eq!(cache.elevation(LatLon::new(0.5, lon as f64 + 0.5), 0), Some(lon));
        }
        assert_eq!(cache.len(), 2);
        std::fs::remove_dir_all(&root).unwrap();
    }
}
