use crate::error::{FixlabError, Result};
use crate::types::Resolution;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Option bundle handed to the I2MC detector.
///
/// Serialized names match the keys the I2MC library reads from its `opt`
/// dictionary, so an options file can be shared with plain I2MC scripts.
/// Keys missing from a file keep the defaults below.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorOptions {
    /// Horizontal resolution in pixels
    #[serde(rename = "xres")]
    pub xres: f64,
    /// Vertical resolution in pixels
    #[serde(rename = "yres")]
    pub yres: f64,
    /// Missing value for horizontal position; `None` means NaN
    #[serde(rename = "missingx")]
    pub missing_x: Option<f64>,
    /// Missing value for vertical position; `None` means NaN
    #[serde(rename = "missingy")]
    pub missing_y: Option<f64>,
    /// Sampling frequency in Hz
    #[serde(rename = "freq")]
    pub freq: f64,

    /// Screen size in cm. Without it (or without the viewing distance) noise
    /// measures are reported in pixels instead of degrees.
    #[serde(rename = "scrSz")]
    pub screen_size_cm: Option<[f64; 2]>,
    /// Viewing distance in cm
    #[serde(rename = "disttoscreen")]
    pub dist_to_screen_cm: Option<f64>,

    // Steffen interpolation
    /// Longest gap (s) that is interpolated
    #[serde(rename = "windowtimeInterp")]
    pub window_time_interp: f64,
    /// Samples required on both edges of a gap
    #[serde(rename = "edgeSampInterp")]
    pub edge_samp_interp: u32,
    /// Largest displacement (px) across a gap; derived from `xres` when unset
    #[serde(rename = "maxdisp")]
    pub max_disp: Option<f64>,

    // Two-means clustering
    /// Clustering window (s); pick it so at most one saccade fits
    #[serde(rename = "windowtime")]
    pub window_time: f64,
    /// Window shift (s); zero processes sample by sample
    #[serde(rename = "steptime")]
    pub step_time: f64,
    /// Clustering failures tolerated before the session is abandoned
    #[serde(rename = "maxerrors")]
    pub max_errors: u32,
    #[serde(rename = "downsamples")]
    pub downsamples: Vec<u32>,
    /// Apply a Chebyshev filter when downsampling
    #[serde(rename = "downsampFilter")]
    pub downsamp_filter: bool,

    // Fixation determination
    /// Standard deviations above the mean clustering weight used as cutoff
    #[serde(rename = "cutoffstd")]
    pub cutoff_std: f64,
    /// MADs from the median fixation duration used to refine on/offsets
    #[serde(rename = "onoffsetThresh")]
    pub onoffset_thresh: f64,
    /// Largest distance (px) between fixations that are merged
    #[serde(rename = "maxMergeDist")]
    pub max_merge_dist: f64,
    /// Largest gap (ms) between fixations that are merged
    #[serde(rename = "maxMergeTime")]
    pub max_merge_time: f64,
    /// Fixations shorter than this (ms) after merging are dropped
    #[serde(rename = "minFixDur")]
    pub min_fix_dur: f64,
}

impl Default for DetectorOptions {
    fn default() -> Self {
        Self {
            xres: 1920.0,
            yres: 1080.0,
            missing_x: None,
            missing_y: None,
            freq: 300.0,
            screen_size_cm: Some([50.9174, 28.6411]),
            dist_to_screen_cm: Some(60.0),
            window_time_interp: 0.1,
            edge_samp_interp: 2,
            max_disp: None,
            window_time: 1.0,
            step_time: 0.02,
            max_errors: 100,
            downsamples: vec![2, 5, 10],
            downsamp_filter: false,
            cutoff_std: 2.0,
            onoffset_thresh: 3.0,
            max_merge_dist: 30.0,
            max_merge_time: 30.0,
            min_fix_dur: 40.0,
        }
    }
}

impl DetectorOptions {
    /// Load options from a JSON file. Absent keys keep their defaults.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(FixlabError::FileNotFound(path.display().to_string()));
        }
        let content = std::fs::read_to_string(path)?;
        let options: DetectorOptions = serde_json::from_str(&content)?;
        options.validate()?;
        Ok(options)
    }

    pub fn resolution(&self) -> Resolution {
        Resolution::new(self.xres, self.yres)
    }

    /// `maxdisp` as the detector will see it
    pub fn effective_max_disp(&self) -> f64 {
        self.max_disp
            .unwrap_or(self.xres * 0.2 * std::f64::consts::SQRT_2)
    }

    /// Whether noise measures come back in degrees rather than pixels
    pub fn reports_degrees(&self) -> bool {
        self.screen_size_cm.is_some() && self.dist_to_screen_cm.is_some()
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.xres > 0.0 && self.yres > 0.0) {
            return Err(FixlabError::InvalidParameter(format!(
                "Resolution must be positive, got {}x{}",
                self.xres, self.yres
            )));
        }
        if !(self.freq > 0.0) {
            return Err(FixlabError::InvalidParameter(format!(
                "Sampling frequency must be positive, got {}",
                self.freq
            )));
        }
        if let Some([w, h]) = self.screen_size_cm {
            if !(w > 0.0 && h > 0.0) {
                return Err(FixlabError::InvalidParameter(format!(
                    "Screen size must be positive, got {}x{} cm",
                    w, h
                )));
            }
        }
        if let Some(d) = self.dist_to_screen_cm {
            if !(d > 0.0) {
                return Err(FixlabError::InvalidParameter(format!(
                    "Viewing distance must be positive, got {} cm",
                    d
                )));
            }
        }
        if !(self.window_time > 0.0) {
            return Err(FixlabError::InvalidParameter(
                "windowtime must be greater than 0".to_string(),
            ));
        }
        if self.step_time < 0.0 {
            return Err(FixlabError::InvalidParameter(
                "steptime must not be negative".to_string(),
            ));
        }
        if self.step_time > self.window_time {
            return Err(FixlabError::InvalidParameter(format!(
                "steptime ({}) must not exceed windowtime ({})",
                self.step_time, self.window_time
            )));
        }
        if self.window_time_interp < 0.0 {
            return Err(FixlabError::InvalidParameter(
                "windowtimeInterp must not be negative".to_string(),
            ));
        }
        if self.downsamples.is_empty() {
            return Err(FixlabError::InvalidParameter(
                "At least one downsampling factor is required".to_string(),
            ));
        }
        if let Some(bad) = self.downsamples.iter().find(|&&f| f < 2) {
            return Err(FixlabError::InvalidParameter(format!(
                "Downsampling factor {} must be at least 2",
                bad
            )));
        }
        if !(self.cutoff_std > 0.0) {
            return Err(FixlabError::InvalidParameter(
                "cutoffstd must be greater than 0".to_string(),
            ));
        }
        if self.max_merge_dist < 0.0 || self.max_merge_time < 0.0 || self.min_fix_dur < 0.0 {
            return Err(FixlabError::InvalidParameter(
                "Merge thresholds and minimum fixation duration must not be negative".to_string(),
            ));
        }
        Ok(())
    }

    /// Options as sent over the bridge, with derived values filled in
    pub fn to_bridge_value(&self) -> Result<serde_json::Value> {
        let mut resolved = self.clone();
        resolved.max_disp = Some(self.effective_max_disp());
        Ok(serde_json::to_value(&resolved)?)
    }
}
