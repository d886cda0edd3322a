//! Built-in decoder backed by `dicom-object`.
//!
//! Reads the whole Part 10 stream (preamble, meta group, data set) and converts the in-memory
//! object into a [`Dataset`]. With `skip_pixel_data` the parser stops before (7FE0,0010), so the
//! bulk payload is never read.

use std::error::Error as StdError;
use std::io::{Seek, SeekFrom};

use dicom_core::value::Value as DicomValue;
use dicom_dictionary_std::tags;
use dicom_object::OpenFileOptions;
use dicom_object::file::ReadPreamble;
use dicom_object::mem::{InMemDicomObject, InMemElement};

use super::{
    DecodeError, DecodeOptions, Dataset, Element, ReadSeek, RecordDecoder, Tag, Value,
    trim_padding,
};

/// Stored length of an element whose length is undefined.
const UNDEFINED_LENGTH: u32 = u32::MAX;

#[derive(Clone, Copy, Debug, Default)]
pub struct DicomDecoder;

impl DicomDecoder {
    pub fn new() -> Self {
        Self
    }
}

impl RecordDecoder for DicomDecoder {
    fn decode(&self, src: &mut dyn ReadSeek, opts: &DecodeOptions) -> Result<Dataset, DecodeError> {
        src.seek(SeekFrom::Start(0))?;

        let mut options = OpenFileOptions::new().read_preamble(ReadPreamble::Always);
        if opts.skip_pixel_data {
            options = options.read_until(tags::PIXEL_DATA);
        }
        let object = options
            .from_reader(&mut *src)
            .map_err(|e| DecodeError::Parse(error_chain(&e)))?;

        Ok(Dataset {
            transfer_syntax: Some(trim_padding(object.meta().transfer_syntax().as_bytes())),
            elements: convert_object(&object),
        })
    }
}

/// Render an error with its whole `source()` chain; the parser's top-level messages are terse.
fn error_chain(err: &dyn StdError) -> String {
    let mut out = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        out.push_str(": ");
        out.push_str(&cause.to_string());
        source = cause.source();
    }
    out
}

fn convert_object(object: &InMemDicomObject) -> Vec<Element> {
    object.iter().map(convert_element).collect()
}

fn convert_element(elem: &InMemElement) -> Element {
    let header = elem.header();
    let vr = header.vr.to_string().as_bytes();
    let value = match elem.value() {
        DicomValue::Primitive(primitive) => Value::Bytes(primitive.to_bytes().into_owned()),
        DicomValue::Sequence(seq) => Value::Sequence(
            seq.items()
                .iter()
                .map(|item| Dataset {
                    transfer_syntax: None,
                    elements: convert_object(item),
                })
                .collect(),
        ),
        DicomValue::PixelSequence(seq) => Value::Fragments(seq.fragments().to_vec()),
    };
    Element {
        tag: Tag(header.tag.0, header.tag.1),
        vr: [
            vr.first().copied().unwrap_or(b'?'),
            vr.get(1).copied().unwrap_or(b'?'),
        ],
        length: header.len.get().unwrap_or(UNDEFINED_LENGTH),
        value,
    }
}
