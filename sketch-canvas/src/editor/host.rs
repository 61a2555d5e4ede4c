// Editor host: one drawing session bound to one canvas.
// Every history change re-renders the canvas, so exports always see the current drawing.

use sketch_core::{Segment, StrokeStyle};
use sketch_session::{
    DrawingSession, ExportSettings, FileStore, KeyValueStore, SessionError, SketchConfig,
};
use std::path::{Path, PathBuf};
use tracing::{debug, info, trace};

use crate::export::{self, ExportArtifact, ExportError, ExportFormat, ExportSource};
use crate::Canvas;

pub struct Editor<S: KeyValueStore> {
    session: DrawingSession<S>,
    canvas: Canvas,
    style: StrokeStyle,
    jpeg_quality: u8,
    output_dir: PathBuf,
    /// Press position while a drag is in progress.
    gesture_start: Option<(f64, f64)>,
}

impl Editor<FileStore> {
    /// Editor over the configured file store, restoring the persisted drawing.
    pub fn from_config(config: &SketchConfig) -> Self {
        let session = DrawingSession::open_with_key(
            config.storage.file_store(),
            config.storage.key.clone(),
        );
        let canvas = Canvas::with_rgba_background(
            config.canvas.width,
            config.canvas.height,
            config.canvas.background,
        );
        Self::new(session, canvas, config.stroke).with_export_settings(&config.export)
    }
}

impl<S: KeyValueStore> Editor<S> {
    /// The canvas is rendered straight away so a restored drawing is visible.
    pub fn new(session: DrawingSession<S>, canvas: Canvas, style: StrokeStyle) -> Self {
        let mut editor = Self {
            session,
            canvas,
            style,
            jpeg_quality: ExportSettings::default().jpeg_quality,
            output_dir: PathBuf::from("."),
            gesture_start: None,
        };
        editor.render();
        editor
    }

    pub fn with_export_settings(mut self, settings: &ExportSettings) -> Self {
        self.jpeg_quality = settings.jpeg_quality;
        self.output_dir = settings.output_dir.clone();
        self
    }

    pub fn session(&self) -> &DrawingSession<S> {
        &self.session
    }

    pub fn canvas(&self) -> &Canvas {
        &self.canvas
    }

    pub fn style(&self) -> &StrokeStyle {
        &self.style
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn is_drawing(&self) -> bool {
        self.gesture_start.is_some()
    }

    pub fn pointer_down(&mut self, x: f64, y: f64) {
        trace!(x, y, "pointer down");
        self.gesture_start = Some((x, y));
    }

    /// Finish a drag. Produces a segment only if a press started it.
    pub fn pointer_up(&mut self, x: f64, y: f64) -> Option<Segment> {
        let (start_x, start_y) = self.gesture_start.take()?;
        let segment = Segment::new(start_x, start_y, x, y);
        self.add_segment(segment);
        Some(segment)
    }

    /// Abandon a drag without drawing anything.
    pub fn pointer_cancel(&mut self) {
        if self.gesture_start.take().is_some() {
            debug!("gesture cancelled");
        }
    }

    pub fn add_segment(&mut self, segment: Segment) {
        self.session.add_segment(segment);
        self.render();
    }

    pub fn undo(&mut self) -> bool {
        let changed = self.session.undo();
        if changed {
            self.render();
        }
        changed
    }

    pub fn redo(&mut self) -> bool {
        let changed = self.session.redo();
        if changed {
            self.render();
        }
        changed
    }

    pub fn clear(&mut self) {
        self.session.clear();
        self.render();
    }

    /// On error the drawing is left as it was.
    pub fn import_data(&mut self, contents: &str) -> Result<usize, SessionError> {
        let count = self.session.import_data(contents)?;
        self.render();
        Ok(count)
    }

    pub fn import_file(&mut self, path: impl AsRef<Path>) -> Result<usize, SessionError> {
        let count = self.session.import_file(path)?;
        self.render();
        Ok(count)
    }

    pub fn render(&mut self) {
        self.session.render(&mut self.canvas, &self.style);
    }

    /// Build the artifact for `format` from the current drawing.
    pub fn export(&self, format: ExportFormat) -> Result<ExportArtifact, ExportError> {
        let source = ExportSource {
            canvas: &self.canvas,
            history: self.session.history(),
            style: &self.style,
            jpeg_quality: self.jpeg_quality,
        };
        export::export(format, &source)
    }

    /// Export and write `drawing.<ext>` into the configured output directory.
    pub fn export_to_output_dir(&self, format: ExportFormat) -> anyhow::Result<PathBuf> {
        let artifact = self.export(format)?;
        let path = artifact.write_to(&self.output_dir)?;
        info!(
            session_id = %self.session.session_id(),
            path = %path.display(),
            "drawing exported"
        );
        Ok(path)
    }
}
