//! Drawing session (v1).
//!
//! A session is the durable unit of work. It stores:
//! - the history of committed segments, in render order
//! - the redo buffer of segments removed by undo
//! - the store the history is persisted to after every mutation
//!
//! History and redo buffer are disjoint: a segment lives in one of them, or
//! in neither once `clear` discards it.

use serde_json::Value;
use sketch_core::{Segment, StrokeStyle, Surface};
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::storage::{KeyValueStore, DEFAULT_STORAGE_KEY};

/// Recommended file name for exported/imported drawings.
pub const DRAWING_FILE_NAME: &str = "drawing.json";

pub struct DrawingSession<S: KeyValueStore> {
    session_id: Uuid,
    history: Vec<Segment>,
    redo_buffer: Vec<Segment>,
    store: S,
    storage_key: String,
}

impl<S: KeyValueStore> DrawingSession<S> {
    /// Empty session persisting under the default key. Nothing is read from the store.
    pub fn new(store: S) -> Self {
        Self::with_key(store, DEFAULT_STORAGE_KEY)
    }

    pub fn with_key(store: S, storage_key: impl Into<String>) -> Self {
        let session = Self {
            session_id: Uuid::new_v4(),
            history: Vec::new(),
            redo_buffer: Vec::new(),
            store,
            storage_key: storage_key.into(),
        };
        tracing::debug!(session_id = %session.session_id, key = %session.storage_key, "session created");
        session
    }

    /// Session restored from whatever the store holds under the default key.
    pub fn open(store: S) -> Self {
        Self::open_with_key(store, DEFAULT_STORAGE_KEY)
    }

    /// Absent key means empty history. A persisted value that cannot be read
    /// or restored is logged and ignored so startup never fails.
    pub fn open_with_key(store: S, storage_key: impl Into<String>) -> Self {
        let mut session = Self::with_key(store, storage_key);

        let saved = match session.store.get(&session.storage_key) {
            Ok(saved) => saved,
            Err(e) => {
                tracing::warn!(
                    session_id = %session.session_id,
                    error = %e,
                    "could not read persisted drawing, starting empty"
                );
                None
            }
        };

        if let Some(data) = saved {
            match restore_history(&data) {
                Ok(history) => {
                    tracing::info!(
                        session_id = %session.session_id,
                        segments = history.len(),
                        "restored persisted drawing"
                    );
                    session.history = history;
                }
                Err(e) => {
                    tracing::warn!(
                        session_id = %session.session_id,
                        error = %e,
                        "persisted drawing is unusable, starting empty"
                    );
                }
            }
        }

        session
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn storage_key(&self) -> &str {
        &self.storage_key
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Committed segments, oldest first.
    pub fn history(&self) -> &[Segment] {
        &self.history
    }

    /// Undone segments; the last element is the next one `redo` brings back.
    pub fn redo_buffer(&self) -> &[Segment] {
        &self.redo_buffer
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    pub fn can_undo(&self) -> bool {
        !self.history.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_buffer.is_empty()
    }

    /// Commit a new segment. Any pending redo entries are discarded.
    pub fn add_segment(&mut self, segment: Segment) {
        self.history.push(segment);
        self.redo_buffer.clear();
        tracing::debug!(
            session_id = %self.session_id,
            segments = self.history.len(),
            "segment added"
        );
        self.persist();
    }

    /// Move the newest segment to the redo buffer. Returns false (and changes
    /// nothing) when the history is empty.
    pub fn undo(&mut self) -> bool {
        let Some(segment) = self.history.pop() else {
            tracing::trace!(session_id = %self.session_id, "undo with empty history");
            return false;
        };
        self.redo_buffer.push(segment);
        tracing::debug!(
            session_id = %self.session_id,
            segments = self.history.len(),
            redo = self.redo_buffer.len(),
            "undo"
        );
        self.persist();
        true
    }

    /// Move the most recently undone segment back onto the history. Returns
    /// false when there is nothing to redo.
    pub fn redo(&mut self) -> bool {
        let Some(segment) = self.redo_buffer.pop() else {
            tracing::trace!(session_id = %self.session_id, "redo with empty redo buffer");
            return false;
        };
        self.history.push(segment);
        tracing::debug!(
            session_id = %self.session_id,
            segments = self.history.len(),
            redo = self.redo_buffer.len(),
            "redo"
        );
        self.persist();
        true
    }

    /// Drop everything and erase the persisted drawing.
    pub fn clear(&mut self) {
        self.history.clear();
        self.redo_buffer.clear();
        if let Err(e) = self.store.remove(&self.storage_key) {
            tracing::warn!(
                session_id = %self.session_id,
                error = %e,
                "failed to erase persisted drawing"
            );
        }
        tracing::info!(session_id = %self.session_id, "drawing cleared");
    }

    /// Clear the surface, then stroke every committed segment in order.
    /// Segments without finite coordinates are skipped.
    pub fn render(&self, surface: &mut impl Surface, style: &StrokeStyle) {
        surface.clear();
        let mut skipped = 0usize;
        for segment in &self.history {
            if segment.is_finite() {
                surface.stroke_segment(segment, style);
            } else {
                skipped += 1;
            }
        }
        if skipped > 0 {
            tracing::debug!(session_id = %self.session_id, skipped, "skipped non-finite segments");
        }
        tracing::trace!(session_id = %self.session_id, segments = self.history.len(), "rendered");
    }

    /// History as a JSON array of segments.
    pub fn serialize(&self) -> Result<String, SessionError> {
        serialize_history(&self.history)
    }

    /// Replace the history with a serialized one. The redo buffer is emptied
    /// and the result persisted. On error nothing changes.
    pub fn restore(&mut self, data: &str) -> Result<usize, SessionError> {
        let history = restore_history(data)?;
        let count = history.len();
        self.history = history;
        self.redo_buffer.clear();
        self.persist();
        Ok(count)
    }

    /// Structured-data export: the serialized history, pretty-printed.
    pub fn export_data(&self) -> Result<String, SessionError> {
        serialize_history_pretty(&self.history)
    }

    /// Load a drawing from file contents. Returns the number of segments now in the history.
    pub fn import_data(&mut self, contents: &str) -> Result<usize, SessionError> {
        match self.restore(contents) {
            Ok(count) => {
                tracing::info!(session_id = %self.session_id, segments = count, "drawing imported");
                Ok(count)
            }
            Err(e) => {
                tracing::warn!(session_id = %self.session_id, error = %e, "import rejected");
                Err(e)
            }
        }
    }

    /// Read a file and import it. Unreadable files count as a failed load.
    pub fn import_file(&mut self, path: impl AsRef<Path>) -> Result<usize, SessionError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| {
            tracing::warn!(path = %path.display(), error = %source, "could not read drawing file");
            SessionError::ReadFailed {
                path: path.to_path_buf(),
                source,
            }
        })?;
        self.import_data(&contents)
    }

    fn persist(&mut self) {
        let data = match self.serialize() {
            Ok(data) => data,
            Err(e) => {
                tracing::warn!(session_id = %self.session_id, error = %e, "failed to encode drawing");
                return;
            }
        };
        if let Err(e) = self.store.set(&self.storage_key, &data) {
            tracing::warn!(
                session_id = %self.session_id,
                error = %e,
                "failed to persist drawing"
            );
        }
    }
}

pub fn serialize_history(history: &[Segment]) -> Result<String, SessionError> {
    serde_json::to_string(history).map_err(SessionError::Encode)
}

pub fn serialize_history_pretty(history: &[Segment]) -> Result<String, SessionError> {
    serde_json::to_string_pretty(history).map_err(SessionError::Encode)
}

/// Parse a serialized history. The top level must be a JSON array; entries
/// are taken as they come, with missing or unusable coordinates read as NaN.
pub fn restore_history(data: &str) -> Result<Vec<Segment>, SessionError> {
    let value: Value = serde_json::from_str(data).map_err(SessionError::ParseFailed)?;
    let Value::Array(entries) = value else {
        return Err(SessionError::InvalidDrawing);
    };
    Ok(entries.iter().map(segment_from_value).collect())
}

fn segment_from_value(entry: &Value) -> Segment {
    if !entry.is_object() {
        return Segment::undefined();
    }
    let coord = |name: &str| entry.get(name).map(coordinate).unwrap_or(f64::NAN);
    Segment::new(coord("startX"), coord("startY"), coord("endX"), coord("endY"))
}

/// Numbers pass through and numeric strings such as `"5"` are coerced.
/// Anything else is NaN.
fn coordinate(value: &Value) -> f64 {
    match value {
        Value::Number(n) => n.as_f64().unwrap_or(f64::NAN),
        Value::String(s) => s.trim().parse::<f64>().unwrap_or(f64::NAN),
        _ => f64::NAN,
    }
}

/// Session-level errors. The display strings are what the user sees.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("failed to load file")]
    ParseFailed(#[source] serde_json::Error),

    #[error("failed to load file")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid drawing file")]
    InvalidDrawing,

    #[error("failed to encode drawing")]
    Encode(#[source] serde_json::Error),
}
