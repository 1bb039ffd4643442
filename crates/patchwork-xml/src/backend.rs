//! Interchangeable XML parse backends.

use std::fmt;
use std::str::FromStr;

use crate::event::EventBackend;
use crate::tree::TreeBackend;
use crate::{Document, Result};

/// Something that turns XML text into a [`Document`].
///
/// Implementations must be pure: no state survives between calls, so one
/// backend can serve many threads at once.
pub trait Backend: Send + Sync {
    /// Short name used in logs and reports.
    fn name(&self) -> &'static str;

    /// Parse XML text into the value model.
    fn parse_document(&self, xml: &str) -> Result<Document>;
}

/// The built-in backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    /// roxmltree node tree, converted by a tree walk.
    Tree,
    /// quick-xml event stream, converted with an explicit element stack.
    Event,
}

impl BackendKind {
    /// Every built-in backend.
    pub const ALL: [BackendKind; 2] = [BackendKind::Tree, BackendKind::Event];

    /// Get the backend implementation.
    pub fn backend(self) -> &'static dyn Backend {
        match self {
            Self::Tree => &TreeBackend,
            Self::Event => &EventBackend,
        }
    }
}

impl Default for BackendKind {
    fn default() -> Self {
        Self::Tree
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.backend().name())
    }
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "tree" => Ok(Self::Tree),
            "event" => Ok(Self::Event),
            other => Err(format!("unknown backend '{}' (expected 'tree' or 'event')", other)),
        }
    }
}
