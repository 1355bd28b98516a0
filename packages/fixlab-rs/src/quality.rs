//! Per-eye gaze quality gate.
//!
//! Trackers occasionally report single samples far outside the monitor. Any
//! coordinate lying more than one full screen width/height beyond the screen
//! edge is treated as data loss, as is any reading whose validity is not
//! "valid". A rejected eye loses both coordinates; the other eye, the
//! timestamp, pupil and validity are carried over unchanged.

use crate::types::{CleanedSample, Eye, EyeSample, GazeSample, Resolution};

/// Clean one session's samples against the screen bounds.
///
/// Total over any input, including an empty slice. The input is not modified.
pub fn filter(samples: &[GazeSample], bounds: Resolution) -> Vec<CleanedSample> {
    samples
        .iter()
        .map(|sample| clean_sample(sample, bounds))
        .collect()
}

pub fn clean_sample(sample: &GazeSample, bounds: Resolution) -> CleanedSample {
    let mut cleaned = sample.clone();
    for eye in [Eye::Left, Eye::Right] {
        if is_rejected(sample.eye(eye), bounds) {
            let target = cleaned.eye_mut(eye);
            target.x = None;
            target.y = None;
        }
    }
    cleaned
}

/// Whether an eye's position must be replaced by the missing sentinel
pub fn is_rejected(eye: &EyeSample, bounds: Resolution) -> bool {
    outside(eye.x, bounds.xres) || outside(eye.y, bounds.yres) || !eye.validity.is_valid()
}

// Bounds are inclusive: exactly -res or 2*res is still kept.
fn outside(value: Option<f64>, res: f64) -> bool {
    matches!(value, Some(v) if v < -res || v > 2.0 * res)
}

/// Fraction of samples whose given eye carries no position
pub fn missing_fraction(samples: &[CleanedSample], eye: Eye) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    let missing = samples.iter().filter(|s| s.eye(eye).is_missing()).count();
    missing as f64 / samples.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Validity;

    const RES: Resolution = Resolution {
        xres: 1920.0,
        yres: 1080.0,
    };

    fn sample(time: f64, left: EyeSample, right: EyeSample) -> GazeSample {
        GazeSample { time, left, right }
    }

    #[test]
    fn test_in_bounds_valid_unchanged() {
        let input = vec![
            sample(0.0, EyeSample::new(100.0, 200.0), EyeSample::new(110.0, 210.0)),
            sample(3.3, EyeSample::new(-1920.0, -1080.0), EyeSample::new(3840.0, 2160.0)),
            sample(6.7, EyeSample::new(0.0, 0.0).with_pupil(3.2), EyeSample::new(1919.0, 1079.0)),
        ];
        let cleaned = filter(&input, RES);
        assert_eq!(cleaned, input);
    }

    #[test]
    fn test_boundary_is_inclusive() {
        let at_edge = sample(0.0, EyeSample::new(-1920.0, 500.0), EyeSample::new(3840.0, 500.0));
        let cleaned = clean_sample(&at_edge, RES);
        assert_eq!(cleaned.left.x, Some(-1920.0));
        assert_eq!(cleaned.right.x, Some(3840.0));

        let past_edge = sample(0.0, EyeSample::new(-1921.0, 500.0), EyeSample::new(3841.0, 500.0));
        let cleaned = clean_sample(&past_edge, RES);
        assert!(cleaned.left.is_missing());
        assert!(cleaned.right.is_missing());
    }

    #[test]
    fn test_y_out_of_bounds_masks_both_coordinates() {
        let input = sample(1.0, EyeSample::new(500.0, 2161.0), EyeSample::new(500.0, 500.0));
        let cleaned = clean_sample(&input, RES);
        assert_eq!(cleaned.left.x, None);
        assert_eq!(cleaned.left.y, None);
        assert_eq!(cleaned.right, input.right);
    }

    #[test]
    fn test_only_offending_eye_is_masked() {
        let input = sample(
            42.0,
            EyeSample::new(3.0 * 1920.0, 500.0).with_pupil(3.1),
            EyeSample::new(600.0, 400.0).with_pupil(3.0),
        );
        let cleaned = clean_sample(&input, RES);
        assert_eq!(cleaned.time, 42.0);
        assert!(cleaned.left.is_missing());
        assert_eq!(cleaned.left.pupil, Some(3.1));
        assert_eq!(cleaned.right, input.right);
    }

    #[test]
    fn test_invalid_validity_masks_eye() {
        let input = vec![
            sample(
                0.0,
                EyeSample::new(500.0, 500.0).with_validity(Validity::Invalid),
                EyeSample::new(500.0, 500.0),
            ),
            sample(
                1.0,
                EyeSample::new(500.0, 500.0),
                EyeSample::new(500.0, 500.0).with_validity(Validity::Code(2)),
            ),
            sample(
                2.0,
                EyeSample::new(500.0, 500.0).with_validity(Validity::Code(1)),
                EyeSample::new(500.0, 500.0)
                    .with_validity(Validity::Unrecognized("Unknown".to_string())),
            ),
        ];
        let cleaned = filter(&input, RES);
        assert!(cleaned[0].left.is_missing());
        assert!(!cleaned[0].right.is_missing());
        assert!(!cleaned[1].left.is_missing());
        assert!(cleaned[1].right.is_missing());
        assert!(!cleaned[2].left.is_missing());
        assert!(cleaned[2].right.is_missing());
    }

    #[test]
    fn test_absent_coordinate_does_not_mask_sibling() {
        let eye = EyeSample {
            x: None,
            y: Some(300.0),
            pupil: None,
            validity: Validity::Valid,
        };
        let input = sample(0.0, eye.clone(), EyeSample::new(1.0, 1.0));
        let cleaned = clean_sample(&input, RES);
        assert_eq!(cleaned.left, eye);
    }

    #[test]
    fn test_filter_is_idempotent() {
        let input = vec![
            sample(0.0, EyeSample::new(-5000.0, 0.0), EyeSample::new(10.0, 10.0)),
            sample(
                1.0,
                EyeSample::new(10.0, 10.0).with_validity(Validity::Code(4)),
                EyeSample::new(10.0, 9999.0),
            ),
            sample(2.0, EyeSample::new(10.0, 10.0), EyeSample::new(10.0, 10.0)),
        ];
        let once = filter(&input, RES);
        let twice = filter(&once, RES);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_empty_session() {
        assert!(filter(&[], RES).is_empty());
        assert_eq!(missing_fraction(&[], Eye::Left), 0.0);
    }

    #[test]
    fn test_missing_fraction() {
        let input = vec![
            sample(0.0, EyeSample::new(-5000.0, 0.0), EyeSample::new(10.0, 10.0)),
            sample(1.0, EyeSample::new(10.0, 10.0), EyeSample::new(10.0, 10.0)),
        ];
        let cleaned = filter(&input, RES);
        assert_eq!(missing_fraction(&cleaned, Eye::Left), 0.5);
        assert_eq!(missing_fraction(&cleaned, Eye::Right), 0.0);
    }
}
