//! Fixed-layout preset headers.
//!
//! A preset starts with a 60-byte VST program chunk header (big-endian)
//! followed by a 32-byte patch header (little-endian).

use zerocopy::byteorder::{BigEndian, LittleEndian, I32};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

use crate::{Error, Result};

/// Width of the program name field.
pub const PROGRAM_NAME_LEN: usize = 28;

/// VST program chunk header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
#[repr(C)]
pub struct FixedHeader {
    /// Always `CcnK`.
    pub chunk_magic: [u8; 4],
    /// Size of the chunk after this field.
    pub byte_size: I32<BigEndian>,
    /// Always `FPCh` (opaque chunk program).
    pub fx_magic: [u8; 4],
    pub version: I32<BigEndian>,
    /// Plugin identifier.
    pub fx_id: I32<BigEndian>,
    pub fx_version: I32<BigEndian>,
    pub num_programs: I32<BigEndian>,
    /// NUL-padded program name, kept raw so re-saving is byte-exact.
    pub program_name: [u8; PROGRAM_NAME_LEN],
    /// Size of the opaque chunk that follows.
    pub chunk_size: I32<BigEndian>,
}

impl FixedHeader {
    /// Encoded size in bytes.
    pub const SIZE: usize = 60;

    pub const CHUNK_MAGIC: [u8; 4] = *b"CcnK";
    pub const FX_MAGIC: [u8; 4] = *b"FPCh";

    /// A header for a single-program chunk with zeroed sizes.
    pub fn new(fx_id: [u8; 4], program_name: &str) -> Result<Self> {
        let mut header = Self {
            chunk_magic: Self::CHUNK_MAGIC,
            byte_size: I32::new(0),
            fx_magic: Self::FX_MAGIC,
            version: I32::new(1),
            fx_id: I32::new(i32::from_be_bytes(fx_id)),
            fx_version: I32::new(1),
            num_programs: I32::new(1),
            program_name: [0; PROGRAM_NAME_LEN],
            chunk_size: I32::new(0),
        };
        header.set_program_name(program_name)?;
        Ok(header)
    }

    /// The program name up to the first NUL.
    pub fn program_name(&self) -> Result<&str> {
        let end = memchr::memchr(0, &self.program_name).unwrap_or(PROGRAM_NAME_LEN);
        std::str::from_utf8(&self.program_name[..end])
            .map_err(|e| Error::format("program_name", format!("not valid UTF-8: {}", e)))
    }

    /// Replace the program name, NUL-padding the field.
    pub fn set_program_name(&mut self, name: &str) -> Result<()> {
        let bytes = name.as_bytes();
        if bytes.len() > PROGRAM_NAME_LEN {
            return Err(Error::format(
                "program_name",
                format!("{} bytes exceeds the {}-byte field", bytes.len(), PROGRAM_NAME_LEN),
            ));
        }
        if memchr::memchr(0, bytes).is_some() {
            return Err(Error::format("program_name", "contains a NUL byte"));
        }

        self.program_name = [0; PROGRAM_NAME_LEN];
        self.program_name[..bytes.len()].copy_from_slice(bytes);
        Ok(())
    }

    /// Check the magics and the program name.
    pub fn validate(&self) -> Result<()> {
        if self.chunk_magic != Self::CHUNK_MAGIC {
            return Err(Error::format(
                "chunk_magic",
                format!("expected {:?}, got {:?}", Self::CHUNK_MAGIC, self.chunk_magic),
            ));
        }
        if self.fx_magic != Self::FX_MAGIC {
            return Err(Error::format(
                "fx_magic",
                format!("expected {:?}, got {:?}", Self::FX_MAGIC, self.fx_magic),
            ));
        }
        self.program_name()?;
        Ok(())
    }
}

/// Patch header preceding the embedded XML.
///
/// Only `xml_size` is interpreted; the counts describe the payload and are
/// carried through untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
#[repr(C)]
pub struct PatchHeader {
    /// Patch format tag, not validated.
    pub magic: [u8; 4],
    /// Length of the embedded XML in bytes.
    pub xml_size: I32<LittleEndian>,
    pub version: I32<LittleEndian>,
    pub wavetables: I32<LittleEndian>,
    pub samples: I32<LittleEndian>,
    pub zones: I32<LittleEndian>,
    pub modmatrix: I32<LittleEndian>,
    pub modmatrix_rows: I32<LittleEndian>,
}

impl PatchHeader {
    /// Encoded size in bytes.
    pub const SIZE: usize = 32;

    /// A header with the given magic and all counts zero.
    pub fn new(magic: [u8; 4]) -> Self {
        Self {
            magic,
            xml_size: I32::new(0),
            version: I32::new(0),
            wavetables: I32::new(0),
            samples: I32::new(0),
            zones: I32::new(0),
            modmatrix: I32::new(0),
            modmatrix_rows: I32::new(0),
        }
    }
}
