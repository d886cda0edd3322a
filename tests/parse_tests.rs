//! Parsing stage: decode workers, decode failures and panic isolation.

mod common;

use crossbeam_channel::bounded;
use dicomscout::decoder::{
    DecodeError, DecodeOptions, Dataset, DicomDecoder, ReadSeek, RecordDecoder, Tag, Value,
};
use dicomscout::errors::{ErrorKind, ScanError};
use dicomscout::pipeline::{collect_all, decode_isolated, parse, validate};
use dicomscout::{ScanOpts, ValidatedFile};
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;
use std::sync::Arc;

use common::{
    EXPLICIT_VR_LE, IMPLICIT_VR_LE, SAMPLE_ELEMENTS, element, header_with_meta, implicit_element,
    sample_dicom, truncated_dicom, write,
};

/// Panics when the first preamble byte is 0xFF, otherwise defers to the built-in decoder.
struct TrippingDecoder;

impl RecordDecoder for TrippingDecoder {
    fn decode(&self, src: &mut dyn ReadSeek, opts: &DecodeOptions) -> Result<Dataset, DecodeError> {
        let mut first = [0u8; 1];
        src.read_exact(&mut first)?;
        if first[0] == 0xFF {
            panic!("tripwire in preamble");
        }
        src.seek(SeekFrom::Start(0))?;
        DicomDecoder::new().decode(src, opts)
    }
}

fn opts_with(concurrency: usize) -> ScanOpts {
    ScanOpts {
        concurrency: Some(concurrency),
        ..Default::default()
    }
}

fn feed(paths: &[&Path]) -> crossbeam_channel::Receiver<ValidatedFile> {
    let (tx, rx) = bounded(paths.len().max(1));
    for p in paths {
        tx.send(validate(p).unwrap()).unwrap();
    }
    rx
}

#[test]
fn test_decode_sample_yields_expected_elements() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(dir.path(), "a.dcm", &sample_dicom("PAT-1"));
    let mut file = validate(&path).unwrap();
    let dataset = decode_isolated(&DicomDecoder::new(), &mut file, &DecodeOptions::default()).unwrap();

    assert_eq!(dataset.len(), SAMPLE_ELEMENTS);
    assert_eq!(dataset.transfer_syntax.as_deref(), Some(common::EXPLICIT_VR_LE));
    assert_eq!(dataset.string(Tag::PATIENT_ID).as_deref(), Some("PAT-1"));
    assert_eq!(dataset.string(Tag::MODALITY).as_deref(), Some("MR"));
    assert!(dataset.get(Tag::PIXEL_DATA).is_none());
}

#[test]
fn test_decode_with_pixel_data_reads_payload() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(dir.path(), "a.dcm", &sample_dicom("P"));
    let mut file = validate(&path).unwrap();
    let opts = DecodeOptions {
        skip_pixel_data: false,
    };
    let dataset = decode_isolated(&DicomDecoder::new(), &mut file, &opts).unwrap();
    assert_eq!(dataset.len(), SAMPLE_ELEMENTS + 1);
    assert_eq!(
        dataset.get(Tag::PIXEL_DATA).unwrap().value,
        Value::Bytes(vec![1u8; 64])
    );
}

fn item(content: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&0xFFFEu16.to_le_bytes());
    out.extend_from_slice(&0xE000u16.to_le_bytes());
    out.extend_from_slice(&(content.len() as u32).to_le_bytes());
    out.extend_from_slice(content);
    out
}

fn decode_bytes(bytes: &[u8]) -> Dataset {
    let dir = tempfile::tempdir().unwrap();
    let path = write(dir.path(), "x.dcm", bytes);
    let mut file = validate(&path).unwrap();
    decode_isolated(&DicomDecoder::new(), &mut file, &DecodeOptions::default()).unwrap()
}

fn single_item(dataset: &Dataset, tag: Tag) -> Dataset {
    match &dataset.get(tag).unwrap().value {
        Value::Sequence(items) => {
            assert_eq!(items.len(), 1);
            items[0].clone()
        }
        other => panic!("expected sequence, got {other:?}"),
    }
}

#[test]
fn test_decode_implicit_vr_defined_length_sequence() {
    let referenced = Tag(0x0008, 0x1115);
    let mut bytes = header_with_meta(IMPLICIT_VR_LE);
    let nested = implicit_element(0x0008, 0x1150, b"1.2\0");
    bytes.extend(implicit_element(referenced.0, referenced.1, &item(&nested)));
    bytes.extend(implicit_element(0x0008, 0x0060, b"CT"));

    let dataset = decode_bytes(&bytes);
    assert_eq!(dataset.transfer_syntax.as_deref(), Some(IMPLICIT_VR_LE));
    assert_eq!(dataset.len(), 2);
    assert_eq!(&dataset.get(referenced).unwrap().vr, b"SQ");
    let first = single_item(&dataset, referenced);
    assert_eq!(first.string(Tag(0x0008, 0x1150)).as_deref(), Some("1.2"));
    assert_eq!(dataset.string(Tag::MODALITY).as_deref(), Some("CT"));
}

#[test]
fn test_decode_explicit_undefined_length_sequence() {
    let referenced = Tag(0x0008, 0x1115);
    let mut bytes = header_with_meta(EXPLICIT_VR_LE);
    bytes.extend_from_slice(&referenced.0.to_le_bytes());
    bytes.extend_from_slice(&referenced.1.to_le_bytes());
    bytes.extend_from_slice(b"SQ\0\0");
    bytes.extend_from_slice(&u32::MAX.to_le_bytes());
    // Undefined-length item closed by an item delimiter, then the sequence delimiter.
    bytes.extend_from_slice(&0xFFFEu16.to_le_bytes());
    bytes.extend_from_slice(&0xE000u16.to_le_bytes());
    bytes.extend_from_slice(&u32::MAX.to_le_bytes());
    bytes.extend(element(0x0008, 0x1150, b"UI", b"1.2\0"));
    for elem in [0xE00Du16, 0xE0DD] {
        bytes.extend_from_slice(&0xFFFEu16.to_le_bytes());
        bytes.extend_from_slice(&elem.to_le_bytes());
        bytes.extend_from_slice(&0u32.to_le_bytes());
    }
    bytes.extend(element(0x0008, 0x0060, b"CS", b"CT"));

    let dataset = decode_bytes(&bytes);
    assert_eq!(dataset.len(), 2);
    assert_eq!(dataset.get(referenced).unwrap().length, u32::MAX);
    let first = single_item(&dataset, referenced);
    assert_eq!(first.string(Tag(0x0008, 0x1150)).as_deref(), Some("1.2"));
}

#[test]
fn test_decode_truncated_is_decode_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(dir.path(), "bad.dcm", &truncated_dicom());
    let mut file = validate(&path).unwrap();
    let err = decode_isolated(&DicomDecoder::new(), &mut file, &DecodeOptions::default()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Decode);
    match err {
        ScanError::Decode { source, .. } => {
            assert!(matches!(source, DecodeError::Parse(_)))
        }
        other => panic!("expected decode error, got {other}"),
    }
}

#[test]
fn test_decode_panic_becomes_error() {
    let dir = tempfile::tempdir().unwrap();
    let mut bytes = sample_dicom("P");
    bytes[0] = 0xFF;
    let path = write(dir.path(), "boom.dcm", &bytes);
    let mut file = validate(&path).unwrap();
    let err = decode_isolated(&TrippingDecoder, &mut file, &DecodeOptions::default()).unwrap_err();
    match err {
        ScanError::DecoderPanic { path: p, message } => {
            assert_eq!(p, path);
            assert!(message.contains("tripwire"));
        }
        other => panic!("expected panic error, got {other}"),
    }
}

#[test]
fn test_parse_stage_isolates_panics_and_decodes_the_rest() {
    let dir = tempfile::tempdir().unwrap();
    let good1 = write(dir.path(), "1.dcm", &sample_dicom("A"));
    let good2 = write(dir.path(), "2.dcm", &sample_dicom("B"));
    let mut bytes = sample_dicom("C");
    bytes[0] = 0xFF;
    let boom = write(dir.path(), "3.dcm", &bytes);

    let files = feed(&[&good1, &boom, &good2]);
    let collected = collect_all(parse(files, Arc::new(TrippingDecoder), &opts_with(2)));

    let mut parsed: Vec<_> = collected.items.iter().map(|r| r.path.clone()).collect();
    parsed.sort();
    assert_eq!(parsed, vec![good1, good2]);
    assert!(collected.items.iter().all(|r| r.is_open()));

    let failure = collected.failure.expect("panic should surface as an error");
    assert_eq!(failure.len(), 1);
    assert!(matches!(failure.errors()[0], ScanError::DecoderPanic { .. }));
}

#[test]
fn test_parse_stage_reports_decode_failure() {
    let dir = tempfile::tempdir().unwrap();
    let good = write(dir.path(), "ok.dcm", &sample_dicom("A"));
    let bad = write(dir.path(), "bad.dcm", &truncated_dicom());

    let files = feed(&[&good, &bad]);
    let collected = collect_all(parse(files, Arc::new(DicomDecoder::new()), &opts_with(1)));

    assert_eq!(collected.items.len(), 1);
    assert_eq!(collected.items[0].path, good);
    let failure = collected.failure.unwrap();
    assert_eq!(failure.errors()[0].path(), Some(&bad));
}

#[test]
fn test_parse_empty_input_closes_cleanly() {
    let (tx, rx) = bounded::<ValidatedFile>(1);
    drop(tx);
    let collected = collect_all(parse(rx, Arc::new(DicomDecoder::new()), &opts_with(4)));
    assert!(collected.items.is_empty());
    assert!(collected.failure.is_none());
}

#[test]
fn test_record_handle_close_and_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let bytes = sample_dicom("A");
    let path = write(dir.path(), "a.dcm", &bytes);
    let files = feed(&[&path]);
    let mut records = collect_all(parse(files, Arc::new(DicomDecoder::new()), &opts_with(1)))
        .into_result()
        .unwrap();
    let mut record = records.pop().unwrap();

    assert!(record.is_open());
    record.close();
    assert!(!record.is_open());
    record.close();

    let handle = record.handle().unwrap();
    handle.seek(SeekFrom::Start(0)).unwrap();
    let mut read_back = Vec::new();
    handle.read_to_end(&mut read_back).unwrap();
    assert_eq!(read_back, bytes);
    assert!(record.is_open());
}
