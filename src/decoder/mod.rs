//! Record decoder seam and the structured dataset it produces.
//!
//! The pipeline only depends on [`RecordDecoder`]; [`DicomDecoder`] is the built-in
//! implementation used by the CLI.

pub mod dicom;

pub use dicom::DicomDecoder;

use std::fmt;
use std::io::{self, Read, Seek};
use thiserror::Error;

/// Readable, seekable byte source handed to a decoder.
pub trait ReadSeek: Read + Seek {}

impl<T: Read + Seek> ReadSeek for T {}

/// Options passed on every decode call.
#[derive(Clone, Copy, Debug)]
pub struct DecodeOptions {
    /// Stop parsing before the bulk pixel payload.
    pub skip_pixel_data: bool,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            skip_pixel_data: true,
        }
    }
}

/// Turns an open byte source into a [`Dataset`]. Implementations may panic on malformed input;
/// the parsing stage converts panics into errors.
pub trait RecordDecoder: Send + Sync {
    fn decode(&self, src: &mut dyn ReadSeek, opts: &DecodeOptions) -> Result<Dataset, DecodeError>;
}

#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("read failed: {0}")]
    Io(#[from] io::Error),

    #[error("DICOM parse failed: {0}")]
    Parse(String),
}

/// (group, element) pair identifying a data element.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Tag(pub u16, pub u16);

impl Tag {
    pub const SOP_INSTANCE_UID: Tag = Tag(0x0008, 0x0018);
    pub const MODALITY: Tag = Tag(0x0008, 0x0060);
    pub const PATIENT_ID: Tag = Tag(0x0010, 0x0020);
    pub const PIXEL_DATA: Tag = Tag(0x7FE0, 0x0010);

    pub fn group(&self) -> u16 {
        self.0
    }

    pub fn element(&self) -> u16 {
        self.1
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:04X},{:04X})", self.0, self.1)
    }
}

/// Element payload.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Bytes(Vec<u8>),
    Sequence(Vec<Dataset>),
    /// Encapsulated pixel data fragments.
    Fragments(Vec<Vec<u8>>),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Element {
    pub tag: Tag,
    /// Two-letter value representation (resolved from the dictionary for implicit VR).
    pub vr: [u8; 2],
    /// Length as stored; `u32::MAX` for undefined length.
    pub length: u32,
    pub value: Value,
}

impl Element {
    pub fn vr_str(&self) -> &str {
        std::str::from_utf8(&self.vr).unwrap_or("??")
    }
}

/// Decoded data set: body elements in tag order. The file meta group is reduced to its
/// transfer syntax; pixel data is absent when it was skipped.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Dataset {
    pub transfer_syntax: Option<String>,
    pub elements: Vec<Element>,
}

impl Dataset {
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn get(&self, tag: Tag) -> Option<&Element> {
        self.elements.iter().find(|e| e.tag == tag)
    }

    /// Text value of `tag` with DICOM padding (trailing NUL/space) removed.
    pub fn string(&self, tag: Tag) -> Option<String> {
        match &self.get(tag)?.value {
            Value::Bytes(bytes) => Some(trim_padding(bytes)),
            _ => None,
        }
    }
}

pub(crate) fn trim_padding(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes)
        .trim_end_matches(['\0', ' '])
        .to_string()
}
