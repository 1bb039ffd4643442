//! Patchwork - round-trip safe preset conversion.
//!
//! This crate ties the workspace together:
//!
//! - [`patchwork_xml`] - XML ⇄ value model, serialization policy, verification
//! - [`patchwork_fxp`] - FXP preset container reading and writing
//! - [`batch`] - parallel verification of a directory of presets
//!
//! # Example
//!
//! ```no_run
//! use patchwork::prelude::*;
//!
//! let preset = PresetFile::load("Init Saw.fxp")?;
//! let document = verify(&preset.xml, BackendKind::Tree.backend(), &SerializationPolicy::default())?;
//! println!("root element: {}", document.root_tag);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod batch;
mod error;

pub use error::{Error, Result};

pub use patchwork_fxp as fxp;
pub use patchwork_xml as xml;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::batch::{find_presets, process_file, run_batch, BatchConfig, BatchReport, FileFailure, FileOutcome, Stage};
    pub use patchwork_fxp::{FixedHeader, PatchHeader, PresetFile};
    pub use patchwork_xml::{
        cross_validate, verify, Backend, BackendKind, Document, Element, SerializationPolicy, Slot, Value,
    };
}

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
