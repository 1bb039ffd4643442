//! Preset file reading and writing.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use tracing::debug;
use zerocopy::IntoBytes;

use crate::header::{FixedHeader, PatchHeader};
use crate::reader::BinaryReader;
use crate::{Error, Result};

/// A preset container: two headers, the embedded XML and an opaque payload.
///
/// Saving a loaded preset reproduces the original file byte for byte.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresetFile {
    pub header: FixedHeader,
    pub patch: PatchHeader,
    /// The embedded patch XML.
    pub xml: String,
    /// Everything after the XML (wavetables, samples, ...).
    pub payload: Vec<u8>,
}

impl PresetFile {
    /// Build a preset around an XML document with an empty payload.
    ///
    /// The chunk sizes are recomputed for the new layout.
    pub fn new(header: FixedHeader, patch: PatchHeader, xml: String) -> Result<Self> {
        let mut preset = Self {
            header,
            patch,
            xml: String::new(),
            payload: Vec::new(),
        };
        // byte_size counts everything after itself
        preset.header.byte_size.set((FixedHeader::SIZE - 8 + PatchHeader::SIZE) as i32);
        preset.header.chunk_size.set(PatchHeader::SIZE as i32);
        preset.patch.xml_size.set(0);
        preset.set_xml(xml)?;
        Ok(preset)
    }

    /// Parse a preset from bytes.
    pub fn parse(data: &[u8]) -> Result<Self> {
        let mut reader = BinaryReader::new(data);

        let header: FixedHeader = reader.read_struct("fixed header")?;
        header.validate()?;

        let patch: PatchHeader = reader.read_struct("patch header")?;

        let xml_size = patch.xml_size.get();
        let xml_len = usize::try_from(xml_size)
            .map_err(|_| Error::format("xml_size", format!("negative length {}", xml_size)))?;
        let xml = std::str::from_utf8(reader.read_bytes(xml_len, "xml_size")?)?.to_owned();

        let payload = reader.remaining_bytes().to_vec();

        debug!(
            xml = xml.len(),
            payload = payload.len(),
            fx_id = ?header.fx_id.get().to_be_bytes(),
            "parsed preset"
        );

        Ok(Self {
            header,
            patch,
            xml,
            payload,
        })
    }

    /// Load a preset from a file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let data = std::fs::read(path.as_ref())?;
        Self::parse(&data)
    }

    /// The program name from the fixed header.
    pub fn program_name(&self) -> Result<&str> {
        self.header.program_name()
    }

    /// Replace the embedded XML.
    ///
    /// `xml_size` follows the new length, and `chunk_size` and `byte_size`
    /// shift by the same amount so they keep covering the chunk.
    pub fn set_xml(&mut self, xml: String) -> Result<()> {
        let new_len = i32::try_from(xml.len())
            .map_err(|_| Error::format("xml_size", format!("{} bytes does not fit the field", xml.len())))?;
        let delta = new_len - self.patch.xml_size.get();

        let chunk_size = shift(self.header.chunk_size.get(), delta, "chunk_size")?;
        let byte_size = shift(self.header.byte_size.get(), delta, "byte_size")?;

        self.header.chunk_size.set(chunk_size);
        self.header.byte_size.set(byte_size);
        self.patch.xml_size.set(new_len);
        self.xml = xml;
        Ok(())
    }

    /// Total encoded size in bytes.
    pub fn encoded_len(&self) -> usize {
        FixedHeader::SIZE + PatchHeader::SIZE + self.xml.len() + self.payload.len()
    }

    /// Write the preset to a writer.
    pub fn write_to<W: Write>(&self, mut writer: W) -> Result<()> {
        if usize::try_from(self.patch.xml_size.get()).ok() != Some(self.xml.len()) {
            return Err(Error::format(
                "xml_size",
                format!(
                    "header says {} bytes but the XML is {} bytes",
                    self.patch.xml_size.get(),
                    self.xml.len()
                ),
            ));
        }

        writer.write_all(self.header.as_bytes())?;
        writer.write_all(self.patch.as_bytes())?;
        writer.write_all(self.xml.as_bytes())?;
        writer.write_all(&self.payload)?;
        Ok(())
    }

    /// Encode the preset into a new buffer.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(self.encoded_len());
        self.write_to(&mut out)?;
        Ok(out)
    }

    /// Save the preset to a file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path.as_ref())?);
        self.write_to(&mut writer)?;
        writer.flush()?;
        Ok(())
    }
}

fn shift(value: i32, delta: i32, field: &'static str) -> Result<i32> {
    value
        .checked_add(delta)
        .ok_or_else(|| Error::format(field, format!("{} + {} overflows", value, delta)))
}
