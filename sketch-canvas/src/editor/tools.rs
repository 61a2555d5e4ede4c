// Drawing tools for the canvas editor.

use egui::Color32;
use sketch_core::{Segment, StrokeStyle, MAX_STROKE_WIDTH};
use tracing::trace;

use crate::Canvas;

pub trait Tool {
    fn apply(&self, canvas: &mut Canvas, x: i64, y: i64);

    fn name(&self) -> &str;

    fn cursor_size(&self) -> u32 {
        1
    }
}

/// Square stamp of `size` pixels. Even sizes extend one pixel further up/left
/// of the point, so a 2px pen covers the point and its upper-left neighbours.
#[derive(Debug, Clone)]
pub struct Pen {
    pub size: u32,
    pub color: Color32,
}

impl Pen {
    pub fn new(size: u32, color: Color32) -> Self {
        Self {
            size: size.max(1),
            color,
        }
    }

    pub fn from_style(style: &StrokeStyle) -> Self {
        let [r, g, b] = style.color;
        let size = style.width.round().clamp(1.0, MAX_STROKE_WIDTH) as u32;
        Self::new(size, Color32::from_rgb(r, g, b))
    }

    fn stamp_range(&self) -> (i64, i64) {
        let lo = -(self.size as i64 / 2);
        (lo, lo + self.size as i64 - 1)
    }
}

impl Tool for Pen {
    fn apply(&self, canvas: &mut Canvas, x: i64, y: i64) {
        // Only the part of the stamp that lands on the canvas is visited.
        let (lo, hi) = self.stamp_range();
        let x_min = (x + lo).max(0);
        let x_max = (x + hi).min(canvas.width() as i64 - 1);
        let y_min = (y + lo).max(0);
        let y_max = (y + hi).min(canvas.height() as i64 - 1);
        if x_min > x_max || y_min > y_max {
            return;
        }
        for py in y_min..=y_max {
            for px in x_min..=x_max {
                canvas.set_pixel(px as u32, py as u32, self.color);
            }
        }
    }

    fn name(&self) -> &str {
        "Pen"
    }

    fn cursor_size(&self) -> u32 {
        self.size
    }
}

/// Walk the segment with Bresenham's algorithm and apply `tool` at every step.
/// The segment is first clipped to the canvas (plus the tool's reach), so
/// far-off coordinates never cost more than the visible part.
pub fn stroke_line(tool: &impl Tool, canvas: &mut Canvas, segment: &Segment) {
    let margin = tool.cursor_size() as f64;
    let bounds = (
        -margin,
        -margin,
        canvas.width() as f64 + margin,
        canvas.height() as f64 + margin,
    );
    let Some(clipped) = clip_segment(segment, bounds) else {
        trace!(?segment, "segment entirely off canvas");
        return;
    };

    let mut x0 = clipped.start_x.round() as i64;
    let mut y0 = clipped.start_y.round() as i64;
    let x1 = clipped.end_x.round() as i64;
    let y1 = clipped.end_y.round() as i64;

    let dx = (x1 - x0).abs();
    let dy = -(y1 - y0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;
    let mut steps = 0u64;

    loop {
        tool.apply(canvas, x0, y0);
        steps += 1;
        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }

    trace!(tool = tool.name(), steps, "line stroked");
}

/// Liang-Barsky clip against `(min_x, min_y, max_x, max_y)`.
fn clip_segment(segment: &Segment, bounds: (f64, f64, f64, f64)) -> Option<Segment> {
    let (min_x, min_y, max_x, max_y) = bounds;
    let dx = segment.end_x - segment.start_x;
    let dy = segment.end_y - segment.start_y;

    let mut t0 = 0.0_f64;
    let mut t1 = 1.0_f64;
    let edges = [
        (-dx, segment.start_x - min_x),
        (dx, max_x - segment.start_x),
        (-dy, segment.start_y - min_y),
        (dy, max_y - segment.start_y),
    ];

    for (p, q) in edges {
        if p == 0.0 {
            if q < 0.0 {
                return None;
            }
            continue;
        }
        let r = q / p;
        if p < 0.0 {
            if r > t1 {
                return None;
            }
            t0 = t0.max(r);
        } else {
            if r < t0 {
                return None;
            }
            t1 = t1.min(r);
        }
    }

    Some(Segment::new(
        segment.start_x + t0 * dx,
        segment.start_y + t0 * dy,
        segment.start_x + t1 * dx,
        segment.start_y + t1 * dy,
    ))
}
