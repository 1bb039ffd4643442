//! Reader and writer for FXP preset containers.
//!
//! A preset file is laid out as:
//!
//! | bytes | content |
//! |---|---|
//! | 60 | [`FixedHeader`], big-endian |
//! | 32 | [`PatchHeader`], little-endian |
//! | `xml_size` | UTF-8 patch XML |
//! | rest | opaque payload |
//!
//! # Example
//!
//! ```no_run
//! use patchwork_fxp::PresetFile;
//!
//! let preset = PresetFile::load("Init Saw.fxp")?;
//! println!("{}: {} bytes of XML", preset.program_name()?, preset.xml.len());
//! preset.save("copy.fxp")?;
//! # Ok::<(), patchwork_fxp::Error>(())
//! ```

mod error;
mod header;
mod preset;
mod reader;

pub use error::{Error, Result};
pub use header::{FixedHeader, PatchHeader, PROGRAM_NAME_LEN};
pub use preset::PresetFile;
