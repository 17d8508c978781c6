//! Mapping between matcher coordinates and logical display coordinates.
//!
//! Matching runs on native-resolution captures, possibly restricted to a
//! region of interest. Callers want points in the logical resolution their
//! scripts are written against, so every reported point goes through
//! [`map_point`]: the region offset is added back, then each axis is scaled.

/// A point in pixel coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Point {
    /// Column.
    pub x: f64,
    /// Row.
    pub y: f64,
}

impl Point {
    /// Creates a point.
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Per-axis scale from native capture pixels to logical display pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DisplayScale {
    /// Horizontal scale factor.
    pub x: f64,
    /// Vertical scale factor.
    pub y: f64,
}

impl DisplayScale {
    /// Scale that leaves points unchanged.
    pub const IDENTITY: Self = Self { x: 1.0, y: 1.0 };

    /// Creates a scale from explicit factors.
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Builds the scale that maps a native resolution onto a logical one.
    ///
    /// A zero native dimension yields an identity factor on that axis.
    pub fn from_resolutions(native_w: u32, native_h: u32, logical_w: u32, logical_h: u32) -> Self {
        let axis = |native: u32, logical: u32| {
            if native == 0 {
                1.0
            } else {
                f64::from(logical) / f64::from(native)
            }
        };
        Self {
            x: axis(native_w, logical_w),
            y: axis(native_h, logical_h),
        }
    }
}

impl Default for DisplayScale {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Read-only display scaling context.
pub trait DisplayMetrics {
    /// Returns the scale from native capture pixels to logical pixels.
    fn scale(&self) -> DisplayScale;
}

impl DisplayMetrics for DisplayScale {
    fn scale(&self) -> DisplayScale {
        *self
    }
}

/// Fixed screen description: native capture size plus logical size.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScreenMetrics {
    pub native_width: u32,
    pub native_height: u32,
    pub logical_width: u32,
    pub logical_height: u32,
}

impl ScreenMetrics {
    /// Screen whose logical size equals its native size.
    pub fn native(width: u32, height: u32) -> Self {
        Self {
            native_width: width,
            native_height: height,
            logical_width: width,
            logical_height: height,
        }
    }

    /// Overrides the logical size.
    pub fn with_logical(mut self, width: u32, height: u32) -> Self {
        self.logical_width = width;
        self.logical_height = height;
        self
    }
}

impl DisplayMetrics for ScreenMetrics {
    fn scale(&self) -> DisplayScale {
        DisplayScale::from_resolutions(
            self.native_width,
            self.native_height,
            self.logical_width,
            self.logical_height,
        )
    }
}

/// Maps a raw matcher point into logical display coordinates.
pub fn map_point(raw: Point, offset: Option<(u32, u32)>, scale: DisplayScale) -> Point {
    let (ox, oy) = offset.unwrap_or((0, 0));
    Point {
        x: (f64::from(ox) + raw.x) * scale.x,
        y: (f64::from(oy) + raw.y) * scale.y,
    }
}

/// Inverse of [`map_point`] for positive scale factors.
pub fn unmap_point(mapped: Point, offset: Option<(u32, u32)>, scale: DisplayScale) -> Point {
    let (ox, oy) = offset.unwrap_or((0, 0));
    Point {
        x: mapped.x / scale.x - f64::from(ox),
        y: mapped.y / scale.y - f64::from(oy),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_adds_offset_only() {
        let p = map_point(Point::new(3.0, 4.0), Some((10, 20)), DisplayScale::IDENTITY);
        assert_eq!(p, Point::new(13.0, 24.0));
        let q = map_point(Point::new(3.0, 4.0), None, DisplayScale::IDENTITY);
        assert_eq!(q, Point::new(3.0, 4.0));
    }

    #[test]
    fn axes_scale_independently() {
        let scale = DisplayScale::from_resolutions(1080, 2400, 540, 1800);
        assert!((scale.x - 0.5).abs() < 1e-12);
        assert!((scale.y - 0.75).abs() < 1e-12);
        let p = map_point(Point::new(100.0, 100.0), None, scale);
        assert!((p.x - 50.0).abs() < 1e-9);
        assert!((p.y - 75.0).abs() < 1e-9);
    }

    #[test]
    fn unmap_inverts_map() {
        let scale = DisplayScale::new(0.37, 1.9);
        let offset = Some((17, 5));
        for raw in [Point::new(0.0, 0.0), Point::new(12.5, 99.0), Point::new(640.0, 3.25)] {
            let back = unmap_point(map_point(raw, offset, scale), offset, scale);
            assert!((back.x - raw.x).abs() < 1e-9);
            assert!((back.y - raw.y).abs() < 1e-9);
        }
    }

    #[test]
    fn screen_metrics_scale() {
        let metrics = ScreenMetrics::native(1440, 3200).with_logical(720, 1600);
        assert_eq!(metrics.scale(), DisplayScale::new(0.5, 0.5));
        assert_eq!(ScreenMetrics::native(10, 10).scale(), DisplayScale::IDENTITY);
    }
}
