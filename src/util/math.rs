//! Mathematical helpers for scoring and geometric transforms.

use crate::util::{ImgFindError, ImgFindResult};

/// Converts degrees to radians.
pub(crate) fn deg_to_rad(angle_deg: f32) -> f32 {
    angle_deg.to_radians()
}

/// Computes sine and cosine for an angle in degrees.
pub(crate) fn sin_cos_deg(angle_deg: f32) -> (f32, f32) {
    let radians = deg_to_rad(angle_deg);
    radians.sin_cos()
}

/// Rounds and saturates a sample to the `u8` range.
pub(crate) fn round_to_u8(value: f32) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}

/// Validates that `value` is a finite number in `[0, 1]`.
pub(crate) fn check_unit_interval(name: &'static str, value: f32) -> ImgFindResult<f32> {
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(ImgFindError::InvalidThreshold { name, value })
    }
}

#[cfg(test)]
mod tests {
    use super::{check_unit_interval, deg_to_rad, round_to_u8, sin_cos_deg};

    #[test]
    fn deg_to_rad_matches_pi() {
        let radians = deg_to_rad(180.0);
        assert!((radians - std::f32::consts::PI).abs() < 1e-6);
    }

    #[test]
    fn sin_cos_deg_matches_quadrants() {
        let (sin, cos) = sin_cos_deg(90.0);
        assert!(sin > 0.999);
        assert!(cos.abs() < 1e-6);
    }

    #[test]
    fn round_to_u8_saturates() {
        assert_eq!(round_to_u8(-3.0), 0);
        assert_eq!(round_to_u8(127.5), 128);
        assert_eq!(round_to_u8(300.0), 255);
    }

    #[test]
    fn unit_interval_rejects_out_of_range() {
        assert!(check_unit_interval("weak", 0.0).is_ok());
        assert!(check_unit_interval("weak", 1.0).is_ok());
        assert!(check_unit_interval("weak", 1.01).is_err());
        assert!(check_unit_interval("weak", f32::NAN).is_err());
    }
}
