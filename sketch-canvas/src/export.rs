//! Drawing export for sketch.
//!
//! One function per format, dispatched from `export`:
//! - raster snapshots of the rendered canvas (PNG, JPEG, WEBP)
//! - an SVG document with one `<line>` per segment
//! - a single-page PDF wrapping the raster snapshot
//! - the serialized history as JSON
//!
//! Exporting an empty drawing is valid and yields a blank artifact.

use anyhow::Context;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use image::codecs::jpeg::JpegEncoder;
use image::{ImageFormat, RgbImage};
use pdf_writer::{Content, Filter, Finish, Name, Pdf, Rect, Ref};
use serde::{Deserialize, Serialize};
use sketch_core::{Segment, StrokeStyle};
use sketch_session::{serialize_history_pretty, SessionError};
use std::fmt::Write as _;
use std::fs;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

use crate::Canvas;

/// Base name of every exported file.
pub const EXPORT_FILE_STEM: &str = "drawing";

/// Supported export formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportFormat {
    Png,
    Jpeg,
    Webp,
    Svg,
    Pdf,
    Json,
}

impl ExportFormat {
    pub const ALL: [ExportFormat; 6] = [
        ExportFormat::Png,
        ExportFormat::Jpeg,
        ExportFormat::Webp,
        ExportFormat::Svg,
        ExportFormat::Pdf,
        ExportFormat::Json,
    ];

    /// Get file extension for this format.
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Png => "png",
            ExportFormat::Jpeg => "jpg",
            ExportFormat::Webp => "webp",
            ExportFormat::Svg => "svg",
            ExportFormat::Pdf => "pdf",
            ExportFormat::Json => "json",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            ExportFormat::Png => "image/png",
            ExportFormat::Jpeg => "image/jpeg",
            ExportFormat::Webp => "image/webp",
            ExportFormat::Svg => "image/svg+xml",
            ExportFormat::Pdf => "application/pdf",
            ExportFormat::Json => "application/json",
        }
    }

    /// `drawing.<ext>`
    pub fn file_name(&self) -> String {
        format!("{}.{}", EXPORT_FILE_STEM, self.extension())
    }

    /// Check if this format is a pixel snapshot of the canvas.
    pub fn is_raster(&self) -> bool {
        matches!(
            self,
            ExportFormat::Png | ExportFormat::Jpeg | ExportFormat::Webp
        )
    }

    /// Case-insensitive, with or without a leading dot.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.trim_start_matches('.').to_ascii_lowercase().as_str() {
            "png" => Some(ExportFormat::Png),
            "jpg" | "jpeg" => Some(ExportFormat::Jpeg),
            "webp" => Some(ExportFormat::Webp),
            "svg" => Some(ExportFormat::Svg),
            "pdf" => Some(ExportFormat::Pdf),
            "json" => Some(ExportFormat::Json),
            _ => None,
        }
    }
}

impl FromStr for ExportFormat {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ExportFormat::from_extension(s).ok_or_else(|| ExportError::UnknownFormat {
            name: s.to_string(),
        })
    }
}

/// Everything an export may read. Raster formats read the canvas, the
/// vector and data formats read the history.
pub struct ExportSource<'a> {
    pub canvas: &'a Canvas,
    pub history: &'a [Segment],
    pub style: &'a StrokeStyle,
    /// 1-100, JPEG only.
    pub jpeg_quality: u8,
}

/// A finished export, ready to be handed to the user.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportArtifact {
    pub format: ExportFormat,
    pub file_name: String,
    pub mime_type: &'static str,
    pub bytes: Vec<u8>,
}

impl ExportArtifact {
    fn new(format: ExportFormat, bytes: Vec<u8>) -> Self {
        Self {
            format,
            file_name: format.file_name(),
            mime_type: format.mime_type(),
            bytes,
        }
    }

    /// Write the artifact as `<dir>/<file_name>`, creating `dir` if needed.
    pub fn write_to(&self, dir: impl AsRef<Path>) -> anyhow::Result<PathBuf> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)
            .with_context(|| format!("create export dir: {}", dir.display()))?;
        let path = dir.join(&self.file_name);
        fs::write(&path, &self.bytes)
            .with_context(|| format!("write export file: {}", path.display()))?;
        Ok(path)
    }
}

/// Build the artifact for one format.
pub fn export(format: ExportFormat, source: &ExportSource<'_>) -> Result<ExportArtifact, ExportError> {
    tracing::debug!(
        ?format,
        segments = source.history.len(),
        "exporting drawing"
    );

    let bytes = match format {
        ExportFormat::Png | ExportFormat::Jpeg | ExportFormat::Webp => {
            export_raster(source.canvas, format, source.jpeg_quality)?
        }
        ExportFormat::Svg => export_svg(
            source.history,
            source.style,
            source.canvas.width(),
            source.canvas.height(),
        )
        .into_bytes(),
        ExportFormat::Pdf => export_pdf(source.canvas)?,
        ExportFormat::Json => export_json(source.history)?.into_bytes(),
    };

    tracing::debug!(?format, bytes = bytes.len(), "export complete");
    Ok(ExportArtifact::new(format, bytes))
}

/// Encode the rendered canvas. JPEG has no alpha, so it gets the
/// white-flattened snapshot.
pub fn export_raster(
    canvas: &Canvas,
    format: ExportFormat,
    jpeg_quality: u8,
) -> Result<Vec<u8>, ExportError> {
    let mut out = Cursor::new(Vec::new());
    match format {
        ExportFormat::Png => canvas.to_rgba_image().write_to(&mut out, ImageFormat::Png)?,
        ExportFormat::Webp => canvas.to_rgba_image().write_to(&mut out, ImageFormat::WebP)?,
        ExportFormat::Jpeg => {
            if !(1..=100).contains(&jpeg_quality) {
                tracing::error!(jpeg_quality, "jpeg quality out of range [1, 100]");
                return Err(ExportError::InvalidQuality {
                    quality: jpeg_quality,
                });
            }
            let rgb = rgb_snapshot(canvas)?;
            JpegEncoder::new_with_quality(&mut out, jpeg_quality).encode_image(&rgb)?;
        }
        other => return Err(ExportError::NotRaster { format: other }),
    }
    Ok(out.into_inner())
}

/// SVG document, one `<line>` per drawable segment.
pub fn export_svg(history: &[Segment], style: &StrokeStyle, width: u32, height: u32) -> String {
    let stroke = style.hex_color();
    let mut svg = String::new();
    let _ = writeln!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#,
        w = width,
        h = height
    );
    for segment in history.iter().filter(|s| s.is_finite()) {
        let _ = writeln!(
            svg,
            r#"  <line x1="{}" y1="{}" x2="{}" y2="{}" stroke="{}" stroke-width="{}"/>"#,
            segment.start_x, segment.start_y, segment.end_x, segment.end_y, stroke, style.width
        );
    }
    svg.push_str("</svg>\n");
    svg
}

/// Single-page PDF sized to the canvas (1px = 1pt) with the snapshot drawn
/// across the whole page. Pixels are embedded as Flate-compressed RGB.
pub fn export_pdf(canvas: &Canvas) -> Result<Vec<u8>, ExportError> {
    let width = canvas.width();
    let height = canvas.height();

    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&canvas.to_rgb_bytes())?;
    let image_data = encoder.finish()?;

    let catalog_id = Ref::new(1);
    let page_tree_id = Ref::new(2);
    let page_id = Ref::new(3);
    let content_id = Ref::new(4);
    let image_id = Ref::new(5);
    let image_name = Name(b"Im0");

    let mut pdf = Pdf::new();
    pdf.catalog(catalog_id).pages(page_tree_id);
    pdf.pages(page_tree_id).kids([page_id]).count(1);

    let mut page = pdf.page(page_id);
    page.media_box(Rect::new(0.0, 0.0, width as f32, height as f32));
    page.parent(page_tree_id);
    page.contents(content_id);
    page.resources().x_objects().pair(image_name, image_id);
    page.finish();

    let mut image = pdf.image_xobject(image_id, &image_data);
    image.filter(Filter::FlateDecode);
    image.width(width as i32);
    image.height(height as i32);
    image.color_space().device_rgb();
    image.bits_per_component(8);
    image.finish();

    // Scale the unit image square up to the full page.
    let mut content = Content::new();
    content.save_state();
    content.transform([width as f32, 0.0, 0.0, height as f32, 0.0, 0.0]);
    content.x_object(image_name);
    content.restore_state();
    pdf.stream(content_id, &content.finish());

    let bytes = pdf.finish();
    tracing::debug!(width, height, bytes = bytes.len(), "pdf document written");
    Ok(bytes)
}

pub fn export_json(history: &[Segment]) -> Result<String, ExportError> {
    Ok(serialize_history_pretty(history)?)
}

fn rgb_snapshot(canvas: &Canvas) -> Result<RgbImage, ExportError> {
    RgbImage::from_raw(canvas.width(), canvas.height(), canvas.to_rgb_bytes()).ok_or(
        ExportError::Snapshot {
            width: canvas.width(),
            height: canvas.height(),
        },
    )
}

/// Export errors.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("unknown export format: {name}")]
    UnknownFormat { name: String },

    #[error("{format:?} is not a raster format")]
    NotRaster { format: ExportFormat },

    #[error("invalid jpeg quality {quality} (must be in [1, 100])")]
    InvalidQuality { quality: u8 },

    #[error("canvas snapshot does not match its {width}x{height} size")]
    Snapshot { width: u32, height: u32 },

    #[error("image encoding failed: {0}")]
    Image(#[from] image::ImageError),

    #[error("document encoding failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("drawing data encoding failed: {0}")]
    Data(#[from] SessionError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use egui::Color32;
    use sketch_core::Surface;

    fn source<'a>(canvas: &'a Canvas, history: &'a [Segment], style: &'a StrokeStyle) -> ExportSource<'a> {
        ExportSource {
            canvas,
            history,
            style,
            jpeg_quality: 90,
        }
    }

    #[test]
    fn test_file_names() {
        assert_eq!(ExportFormat::Png.file_name(), "drawing.png");
        assert_eq!(ExportFormat::Jpeg.file_name(), "drawing.jpg");
        assert_eq!(ExportFormat::Webp.file_name(), "drawing.webp");
        assert_eq!(ExportFormat::Svg.file_name(), "drawing.svg");
        assert_eq!(ExportFormat::Pdf.file_name(), "drawing.pdf");
        assert_eq!(ExportFormat::Json.file_name(), "drawing.json");
    }

    #[test]
    fn test_format_parsing() {
        assert_eq!("PNG".parse::<ExportFormat>().unwrap(), ExportFormat::Png);
        assert_eq!(ExportFormat::from_extension(".jpeg"), Some(ExportFormat::Jpeg));
        assert!("gif".parse::<ExportFormat>().is_err());
        assert!(ExportFormat::Webp.is_raster());
        assert!(!ExportFormat::Svg.is_raster());
    }

    #[test]
    fn test_svg_one_line_per_segment() {
        let history = [
            Segment::new(0.0, 0.0, 10.0, 10.0),
            Segment::new(5.5, 5.0, 20.0, 20.0),
            Segment::undefined(),
        ];
        let svg = export_svg(&history, &StrokeStyle::default(), 800, 600);

        assert!(svg.starts_with("<svg"));
        assert!(svg.contains(r#"width="800" height="600""#));
        assert_eq!(svg.matches("<line").count(), 2);
        assert!(svg.contains(
            r##"<line x1="0" y1="0" x2="10" y2="10" stroke="#000000" stroke-width="2"/>"##
        ));
        assert!(svg.contains(r#"x1="5.5""#));
        assert!(svg.trim_end().ends_with("</svg>"));
    }

    #[test]
    fn test_svg_empty_history() {
        let svg = export_svg(&[], &StrokeStyle::default(), 10, 10);
        assert_eq!(svg.matches("<line").count(), 0);
    }

    #[test]
    fn test_png_decodes_to_canvas_size() {
        let mut canvas = Canvas::new(16, 8, Color32::WHITE);
        canvas.stroke_segment(&Segment::new(0.0, 4.0, 15.0, 4.0), &StrokeStyle::default());

        let bytes = export_raster(&canvas, ExportFormat::Png, 90).unwrap();
        let decoded = image::load_from_memory(&bytes).unwrap().to_rgba8();
        assert_eq!(decoded.dimensions(), (16, 8));
        assert_eq!(decoded.get_pixel(8, 4).0, [0, 0, 0, 255]);
        assert_eq!(decoded.get_pixel(8, 0).0, [255, 255, 255, 255]);
    }

    #[test]
    fn test_jpeg_and_webp_encode() {
        let canvas = Canvas::new(8, 8, Color32::TRANSPARENT);

        let jpeg = export_raster(&canvas, ExportFormat::Jpeg, 90).unwrap();
        assert_eq!(&jpeg[..2], &[0xFF, 0xD8]);

        let webp = export_raster(&canvas, ExportFormat::Webp, 90).unwrap();
        assert_eq!(&webp[..4], b"RIFF");
        assert_eq!(&webp[8..12], b"WEBP");

        assert!(matches!(
            export_raster(&canvas, ExportFormat::Jpeg, 0),
            Err(ExportError::InvalidQuality { quality: 0 })
        ));
        assert!(matches!(
            export_raster(&canvas, ExportFormat::Svg, 90),
            Err(ExportError::NotRaster { .. })
        ));
    }

    #[test]
    fn test_pdf_structure() {
        let canvas = Canvas::new(40, 30, Color32::WHITE);
        let pdf = export_pdf(&canvas).unwrap();
        let text = String::from_utf8_lossy(&pdf);

        assert!(pdf.starts_with(b"%PDF-"));
        assert!(text.contains("/MediaBox"));
        assert!(text.contains("/Subtype /Image"));
        assert!(text.contains("/Width 40"));
        assert!(text.contains("/Height 30"));
        assert!(text.contains("/FlateDecode"));
        assert!(text.contains("/Im0 Do"));
        assert!(text.trim_end().ends_with("%%EOF"));

        // startxref must point at the xref table
        let tail = text.rsplit("startxref").next().unwrap();
        let offset: usize = tail.trim().lines().next().unwrap().trim().parse().unwrap();
        assert_eq!(&pdf[offset..offset + 4], b"xref");
    }

    #[test]
    fn test_json_export_restores() {
        let history = vec![Segment::new(1.0, 2.0, 3.0, 4.0)];
        let json = export_json(&history).unwrap();
        assert_eq!(sketch_session::restore_history(&json).unwrap(), history);
    }

    #[test]
    fn test_dispatch_names_artifacts() {
        let canvas = Canvas::new(4, 4, Color32::WHITE);
        let style = StrokeStyle::default();
        for format in ExportFormat::ALL {
            let artifact = export(format, &source(&canvas, &[], &style)).unwrap();
            assert_eq!(artifact.file_name, format.file_name());
            assert_eq!(artifact.mime_type, format.mime_type());
            assert!(!artifact.bytes.is_empty());
        }
    }

    #[test]
    fn test_write_to_creates_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let canvas = Canvas::new(4, 4, Color32::WHITE);
        let style = StrokeStyle::default();
        let artifact = export(ExportFormat::Json, &source(&canvas, &[], &style)).unwrap();

        let path = artifact.write_to(tmp.path().join("out")).unwrap();
        assert_eq!(path.file_name().unwrap(), "drawing.json");
        assert_eq!(std::fs::read_to_string(path).unwrap(), "[]");
    }
}
