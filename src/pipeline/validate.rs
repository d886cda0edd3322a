//! Format validator: decides whether a path is a DICOM candidate and hands back a rewound handle.

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;

use crate::ValidatedFile;
use crate::errors::ScanError;
use crate::utils::config::Signature;

/// Open `path`, check the 128-byte preamble + `DICM` magic, and return the handle at offset 0.
///
/// Files shorter than the header are [`ScanError::TooSmall`], a wrong magic is
/// [`ScanError::BadSignature`]; both are ignorable. Any other failure is [`ScanError::Io`].
/// On every error path the handle is dropped before returning.
pub fn validate(path: &Path) -> Result<ValidatedFile, ScanError> {
    let io_err = |source: io::Error| ScanError::Io {
        path: path.to_path_buf(),
        source,
    };

    let mut file = File::open(path).map_err(io_err)?;

    let mut header = [0u8; Signature::HEADER_LEN];
    let read = read_header(&mut file, &mut header).map_err(io_err)?;
    if read < Signature::HEADER_LEN {
        return Err(ScanError::TooSmall {
            path: path.to_path_buf(),
            read,
        });
    }
    if &header[Signature::PREAMBLE_LEN..] != Signature::MAGIC {
        return Err(ScanError::BadSignature {
            path: path.to_path_buf(),
        });
    }

    file.seek(SeekFrom::Start(0)).map_err(io_err)?;
    Ok(ValidatedFile {
        path: path.to_path_buf(),
        handle: file,
    })
}

/// Fill `buf` until full or EOF; returns bytes read. Short reads are retried.
fn read_header<R: Read>(src: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match src.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Reader that returns at most `chunk` bytes per call.
    struct Trickle<'a> {
        data: &'a [u8],
        chunk: usize,
    }

    impl Read for Trickle<'_> {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let n = self.chunk.min(buf.len()).min(self.data.len());
            buf[..n].copy_from_slice(&self.data[..n]);
            self.data = &self.data[n..];
            Ok(n)
        }
    }

    #[test]
    fn header_read_survives_short_reads() {
        let data = vec![7u8; 200];
        let mut src = Trickle {
            data: &data,
            chunk: 10,
        };
        let mut buf = [0u8; Signature::HEADER_LEN];
        assert_eq!(read_header(&mut src, &mut buf).unwrap(), Signature::HEADER_LEN);
    }

    #[test]
    fn header_read_stops_at_eof() {
        let data = vec![7u8; 23];
        let mut src = Trickle {
            data: &data,
            chunk: 5,
        };
        let mut buf = [0u8; Signature::HEADER_LEN];
        assert_eq!(read_header(&mut src, &mut buf).unwrap(), 23);
    }
}
