// Raster drawing surface for the sketch editor.
// Sessions render into it; raster and PDF exports snapshot it.

use egui::Color32;
use image::RgbaImage;
use sketch_core::{Segment, StrokeStyle, Surface};
use tracing::{debug, info, trace};

use crate::editor::tools::{stroke_line, Pen};

#[derive(Debug, Clone)]
pub struct Canvas {
    width: u32,
    height: u32,
    background: Color32,
    pixels: Vec<Color32>,
}

impl Canvas {
    pub fn new(width: u32, height: u32, background: Color32) -> Self {
        info!(width, height, ?background, "creating canvas");

        let total_pixels = width as usize * height as usize;
        debug!(total_pixels, "initializing pixels");

        Self {
            width,
            height,
            background,
            pixels: vec![background; total_pixels],
        }
    }

    /// Canvas from an RGBA background as stored in config.
    pub fn with_rgba_background(width: u32, height: u32, background: [u8; 4]) -> Self {
        let [r, g, b, a] = background;
        Self::new(width, height, Color32::from_rgba_unmultiplied(r, g, b, a))
    }

    // Check if coordinates are within canvas bounds
    fn is_valid_coordinate(&self, x: u32, y: u32) -> bool {
        x < self.width && y < self.height
    }

    // Convert 2d coordinates to 1d index
    fn coord_to_index(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }

    pub fn get_pixel(&self, x: u32, y: u32) -> Option<Color32> {
        if !self.is_valid_coordinate(x, y) {
            return None;
        }
        self.pixels.get(self.coord_to_index(x, y)).copied()
    }

    /// Out-of-bounds writes are clipped. Returns whether a pixel was written.
    pub fn set_pixel(&mut self, x: u32, y: u32, color: Color32) -> bool {
        if !self.is_valid_coordinate(x, y) {
            return false;
        }
        let index = self.coord_to_index(x, y);
        match self.pixels.get_mut(index) {
            Some(pixel) => {
                *pixel = color;
                true
            }
            None => false,
        }
    }

    pub fn fill(&mut self, color: Color32) {
        trace!(?color, "filling canvas");
        for pixel in self.pixels.iter_mut() {
            *pixel = color;
        }
    }

    /// Reset every pixel to the background.
    pub fn reset(&mut self) {
        self.fill(self.background);
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn background(&self) -> Color32 {
        self.background
    }

    /// Snapshot as an unpremultiplied RGBA image.
    pub fn to_rgba_image(&self) -> RgbaImage {
        let mut raw = Vec::with_capacity(self.pixels.len() * 4);
        for pixel in &self.pixels {
            raw.extend_from_slice(&pixel.to_srgba_unmultiplied());
        }
        RgbaImage::from_raw(self.width, self.height, raw)
            .unwrap_or_else(|| RgbaImage::new(self.width, self.height))
    }

    /// Snapshot as packed RGB bytes, alpha flattened onto white.
    pub fn to_rgb_bytes(&self) -> Vec<u8> {
        let mut raw = Vec::with_capacity(self.pixels.len() * 3);
        for pixel in &self.pixels {
            let [r, g, b, a] = pixel.to_srgba_unmultiplied();
            raw.push(flatten_channel(r, a));
            raw.push(flatten_channel(g, a));
            raw.push(flatten_channel(b, a));
        }
        raw
    }
}

fn flatten_channel(value: u8, alpha: u8) -> u8 {
    let v = value as u32 * alpha as u32 + 255 * (255 - alpha as u32);
    ((v + 127) / 255) as u8
}

impl Surface for Canvas {
    fn clear(&mut self) {
        self.reset();
    }

    fn stroke_segment(&mut self, segment: &Segment, style: &StrokeStyle) {
        let pen = Pen::from_style(style);
        stroke_line(&pen, self, segment);
    }
}

impl Default for Canvas {
    fn default() -> Self {
        Canvas::new(800, 600, Color32::WHITE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_out_of_bounds_is_clipped() {
        let mut canvas = Canvas::new(4, 4, Color32::WHITE);
        assert!(!canvas.set_pixel(4, 0, Color32::BLACK));
        assert_eq!(canvas.get_pixel(0, 4), None);
        assert!(canvas.set_pixel(3, 3, Color32::BLACK));
        assert_eq!(canvas.get_pixel(3, 3), Some(Color32::BLACK));
    }

    #[test]
    fn test_surface_clear_restores_background() {
        let mut canvas = Canvas::new(5, 5, Color32::WHITE);
        canvas.stroke_segment(&Segment::new(0.0, 2.0, 4.0, 2.0), &StrokeStyle::default());
        assert_eq!(canvas.get_pixel(2, 2), Some(Color32::BLACK));

        Surface::clear(&mut canvas);
        for y in 0..5 {
            for x in 0..5 {
                assert_eq!(canvas.get_pixel(x, y), Some(Color32::WHITE));
            }
        }
    }

    #[test]
    fn test_rgb_snapshot_flattens_transparency() {
        let mut canvas = Canvas::new(2, 1, Color32::TRANSPARENT);
        canvas.set_pixel(1, 0, Color32::BLACK);
        assert_eq!(canvas.to_rgb_bytes(), vec![255, 255, 255, 0, 0, 0]);
    }

    #[test]
    fn test_rgba_snapshot_dimensions() {
        let canvas = Canvas::with_rgba_background(7, 3, [255, 255, 255, 255]);
        let img = canvas.to_rgba_image();
        assert_eq!(img.dimensions(), (7, 3));
        assert_eq!(img.get_pixel(6, 2).0, [255, 255, 255, 255]);
    }
}
