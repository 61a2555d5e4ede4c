//! sketch-session: undo/redo drawing history with local persistence.
//!
//! Design rules:
//! - History and redo buffer are disjoint; a new segment empties the redo buffer.
//! - Every mutation is persisted; persistence failures are logged, never raised.
//! - Undo/redo/clear on an empty drawing are no-ops, not errors.
//! - Imports either replace the whole history or leave it untouched.

pub mod config;
pub mod session;
pub mod storage;

pub use config::{
    load_config, save_config, CanvasConfig, ConfigError, ExportSettings, SketchConfig,
    StorageConfig,
};
pub use session::{
    restore_history, serialize_history, serialize_history_pretty, DrawingSession, SessionError, DRAWING_FILE_NAME,
};
pub use sketch_core::{Segment, StrokeStyle, Surface};
pub use storage::{FileStore, KeyValueStore, MemoryStore, StorageError, DEFAULT_STORAGE_KEY};
