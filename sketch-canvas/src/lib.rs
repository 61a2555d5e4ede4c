//! sketch-canvas: raster canvas, editor host and exports for sketch drawings.
//!
//! The `Editor` binds a `DrawingSession` to a `Canvas` and re-renders after
//! every history change. Pointer input arrives as plain press/release calls.

pub mod editor;
pub mod export;
pub mod logging;

pub use editor::{Canvas, Editor, Pen, Tool};
pub use export::{ExportArtifact, ExportError, ExportFormat, ExportSource};
pub use logging::init_logging;
