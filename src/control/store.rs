//! Calibration store
//!
//! Persists learned normalized→display curves to a JSON file so later
//! calibration calls can seed from a previous sweep instead of a naive
//! guess. Curves are keyed by `"t{track}.d{device}"` and parameter index;
//! a curve counts as fresh while `now - calibrated_at` stays within the
//! configured TTL.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::error::{OscError, Result};

/// Shape of a parameter's normalized→display mapping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CurveModel {
    Linear,
    Log,
}

/// One observed sweep point
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurvePoint {
    /// Normalized value that was written
    pub normalized: f64,

    /// Display string that was read back
    pub display: String,

    /// Parsed base-unit value, if the display was parseable
    pub base_value: Option<f64>,
}

/// A learned curve for one parameter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParamCurve {
    pub param_index: usize,
    pub curve_model: CurveModel,
    pub points: Vec<CurvePoint>,

    /// Unix seconds at sweep time; drives the freshness TTL
    pub calibrated_at: u64,
}

impl ParamCurve {
    /// Whether the curve is still fresh under `ttl`
    pub fn is_fresh(&self, ttl: Duration) -> bool {
        let now = unix_now();
        now.saturating_sub(self.calibrated_at) <= ttl.as_secs()
    }

    /// Invert the curve: normalized estimate producing `target` base value.
    ///
    /// Interpolates between the two bracketing points, in log space for
    /// `Log` curves. Targets outside the observed span clamp to the edge
    /// points. `None` when fewer than two points parsed.
    pub fn value_to_normalized(&self, target: f64) -> Option<f64> {
        let mut usable: Vec<(f64, f64)> = self
            .points
            .iter()
            .filter_map(|p| p.base_value.map(|v| (p.normalized, v)))
            .collect();
        if usable.len() < 2 {
            return None;
        }
        usable.sort_by(|a, b| a.1.total_cmp(&b.1));

        let (first, last) = (usable[0], usable[usable.len() - 1]);
        if target <= first.1 {
            return Some(first.0);
        }
        if target >= last.1 {
            return Some(last.0);
        }

        let transform = |v: f64| match self.curve_model {
            CurveModel::Log if v > 0.0 => v.ln(),
            _ => v,
        };

        let window = usable.windows(2).find(|w| target <= w[1].1)?;
        let (n0, v0) = window[0];
        let (n1, v1) = window[1];
        let (tv, tv0, tv1) = (transform(target), transform(v0), transform(v1));
        if (tv1 - tv0).abs() < f64::EPSILON {
            return Some(n0);
        }
        let t = (tv - tv0) / (tv1 - tv0);
        Some((n0 + t * (n1 - n0)).clamp(0.0, 1.0))
    }
}

/// JSON-file-backed store of learned curves
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct CalibrationStore {
    /// `"t{track}.d{device}"` -> param index (stringified for JSON) -> curve
    devices: HashMap<String, HashMap<String, ParamCurve>>,

    #[serde(skip)]
    path: PathBuf,
}

impl CalibrationStore {
    /// Load the store from `path`; a missing file yields an empty store
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let mut store = match std::fs::read_to_string(&path) {
            Ok(raw) => serde_json::from_str::<CalibrationStore>(&raw)
                .map_err(|e| OscError::Store(format!("{}: {e}", path.display())))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => CalibrationStore::default(),
            Err(e) => return Err(OscError::Io(e)),
        };
        store.path = path;
        Ok(store)
    }

    /// Persist the store to its path, creating parent directories
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let raw = serde_json::to_string_pretty(self)
            .map_err(|e| OscError::Store(e.to_string()))?;
        std::fs::write(&self.path, raw)?;
        Ok(())
    }

    /// Path this store reads from and writes to
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Look up the curve for `(track, device, param)`
    pub fn curve(&self, track: i32, device: i32, param: usize) -> Option<&ParamCurve> {
        self.devices
            .get(&device_key(track, device))?
            .get(&param.to_string())
    }

    /// Insert or replace the curve for `(track, device, param)`
    pub fn upsert(&mut self, track: i32, device: i32, curve: ParamCurve) {
        self.devices
            .entry(device_key(track, device))
            .or_default()
            .insert(curve.param_index.to_string(), curve);
    }

    /// Number of stored curves across all devices
    pub fn len(&self) -> usize {
        self.devices.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn device_key(track: i32, device: i32) -> String {
    format!("t{track}.d{device}")
}

/// Current time as unix seconds
pub(crate) fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
