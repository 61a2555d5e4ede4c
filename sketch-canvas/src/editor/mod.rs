// Editor module: raster canvas, drawing tools and the session host.

pub mod canvas;
pub mod host;
pub mod tools;

pub use canvas::Canvas;
pub use host::Editor;
pub use tools::{stroke_line, Pen, Tool};
