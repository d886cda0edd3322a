//! Decoder panics are reported as errors without reaching the process panic hook.
//! Own binary: the test installs a global hook.

mod common;

use dicomscout::decoder::{DecodeError, DecodeOptions, Dataset, ReadSeek, RecordDecoder};
use dicomscout::errors::ScanError;
use dicomscout::pipeline::{decode_isolated, validate};
use std::panic;
use std::sync::atomic::{AtomicUsize, Ordering};

use common::{sample_dicom, write};

static HOOK_CALLS: AtomicUsize = AtomicUsize::new(0);

struct AlwaysPanics;

impl RecordDecoder for AlwaysPanics {
    fn decode(&self, _src: &mut dyn ReadSeek, _opts: &DecodeOptions) -> Result<Dataset, DecodeError> {
        panic!("decoder blew up");
    }
}

#[test]
fn test_decoder_panic_skips_outer_hook() {
    panic::set_hook(Box::new(|_| {
        HOOK_CALLS.fetch_add(1, Ordering::SeqCst);
    }));

    let dir = tempfile::tempdir().unwrap();
    let path = write(dir.path(), "a.dcm", &sample_dicom("P"));
    for _ in 0..3 {
        let mut file = validate(&path).unwrap();
        let err = decode_isolated(&AlwaysPanics, &mut file, &DecodeOptions::default()).unwrap_err();
        assert!(matches!(err, ScanError::DecoderPanic { .. }));
    }
    assert_eq!(HOOK_CALLS.load(Ordering::SeqCst), 0);

    // Panics outside the decoder still reach the previous hook.
    let outside = panic::catch_unwind(|| panic!("elsewhere"));
    assert!(outside.is_err());
    assert_eq!(HOOK_CALLS.load(Ordering::SeqCst), 1);
}
