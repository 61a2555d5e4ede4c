//! sketch-core: the segment model shared by every sketch crate.
//!
//! Design rules:
//! - A segment is four coordinates in canvas pixel space and never changes after creation.
//! - Serialized field names match the persisted drawing format (`startX`, `startY`, ...).
//! - Rendering goes through the `Surface` trait so sessions never depend on a pixel buffer.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One straight line between two endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Segment {
    pub start_x: f64,
    pub start_y: f64,
    pub end_x: f64,
    pub end_y: f64,
}

impl Segment {
    pub fn new(start_x: f64, start_y: f64, end_x: f64, end_y: f64) -> Self {
        Self {
            start_x,
            start_y,
            end_x,
            end_y,
        }
    }

    /// Segment whose every coordinate is NaN. Stands in for entries that carried no usable numbers.
    pub fn undefined() -> Self {
        Self::new(f64::NAN, f64::NAN, f64::NAN, f64::NAN)
    }

    /// True when all four coordinates are finite numbers.
    /// Renderers and exporters skip segments that are not.
    pub fn is_finite(&self) -> bool {
        self.start_x.is_finite()
            && self.start_y.is_finite()
            && self.end_x.is_finite()
            && self.end_y.is_finite()
    }
}

/// Default stroke width in pixels.
pub const DEFAULT_STROKE_WIDTH: f32 = 2.0;

/// Widest stroke accepted, in pixels.
pub const MAX_STROKE_WIDTH: f32 = 512.0;

/// How every segment is stroked. One style applies to the whole drawing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrokeStyle {
    pub width: f32,
    /// RGB, 0-255.
    pub color: [u8; 3],
}

impl Default for StrokeStyle {
    fn default() -> Self {
        Self {
            width: DEFAULT_STROKE_WIDTH,
            color: [0, 0, 0],
        }
    }
}

impl StrokeStyle {
    pub fn new(width: f32, color: [u8; 3]) -> Result<Self, StyleError> {
        let style = Self { width, color };
        style.validate()?;
        Ok(style)
    }

    pub fn validate(&self) -> Result<(), StyleError> {
        if !self.width.is_finite() || self.width <= 0.0 || self.width > MAX_STROKE_WIDTH {
            return Err(StyleError::InvalidWidth { width: self.width });
        }
        Ok(())
    }

    /// `#rrggbb`, as written into SVG attributes.
    pub fn hex_color(&self) -> String {
        let [r, g, b] = self.color;
        format!("#{:02x}{:02x}{:02x}", r, g, b)
    }
}

/// Anything a drawing can be rendered into.
pub trait Surface {
    /// Erase everything drawn so far.
    fn clear(&mut self);

    /// Stroke one segment on top of what is already there.
    fn stroke_segment(&mut self, segment: &Segment, style: &StrokeStyle);
}

/// Errors related to stroke styling.
#[derive(Debug, Error)]
pub enum StyleError {
    #[error("invalid stroke width: {width} (must be in (0, {max}])", max = MAX_STROKE_WIDTH)]
    InvalidWidth { width: f32 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segment_uses_camel_case_fields() {
        let seg = Segment::new(0.0, 1.0, 10.0, 11.0);
        let json = serde_json::to_string(&seg).unwrap();
        assert_eq!(json, r#"{"startX":0.0,"startY":1.0,"endX":10.0,"endY":11.0}"#);

        let back: Segment = serde_json::from_str(r#"{"startX":0,"startY":1,"endX":10,"endY":11}"#).unwrap();
        assert_eq!(back, seg);
    }

    #[test]
    fn test_undefined_segment_is_not_finite() {
        assert!(!Segment::undefined().is_finite());
        assert!(Segment::new(1.0, 2.0, 3.0, 4.0).is_finite());
    }

    #[test]
    fn test_default_style_is_two_pixel_black() {
        let style = StrokeStyle::default();
        assert_eq!(style.width, 2.0);
        assert_eq!(style.hex_color(), "#000000");
        assert!(style.validate().is_ok());
    }

    #[test]
    fn test_style_rejects_bad_width() {
        assert!(StrokeStyle::new(0.0, [0, 0, 0]).is_err());
        assert!(StrokeStyle::new(f32::NAN, [0, 0, 0]).is_err());
        assert!(StrokeStyle::new(3.0, [255, 0, 0]).is_ok());
        assert!(StrokeStyle::new(MAX_STROKE_WIDTH, [0, 0, 0]).is_ok());
        assert!(StrokeStyle::new(3000.0, [0, 0, 0]).is_err());
        assert!(StrokeStyle::new(f32::INFINITY, [0, 0, 0]).is_err());
    }
}
