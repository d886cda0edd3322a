//! Shared fixtures: minimal DICOM Part 10 files written into temp trees.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

pub const EXPLICIT_VR_LE: &str = "1.2.840.10008.1.2.1";

pub fn pad_even(value: &[u8], pad: u8) -> Vec<u8> {
    let mut v = value.to_vec();
    if v.len() % 2 == 1 {
        v.push(pad);
    }
    v
}

/// Explicit VR little endian element.
pub fn element(group: u16, elem: u16, vr: &[u8; 2], value: &[u8]) -> Vec<u8> {
    let long = matches!(vr, b"OB" | b"OW" | b"SQ" | b"UN" | b"UT");
    let mut out = Vec::new();
    out.extend_from_slice(&group.to_le_bytes());
    out.extend_from_slice(&elem.to_le_bytes());
    out.extend_from_slice(vr);
    if long {
        out.extend_from_slice(&[0, 0]);
        out.extend_from_slice(&(value.len() as u32).to_le_bytes());
    } else {
        out.extend_from_slice(&(value.len() as u16).to_le_bytes());
    }
    out.extend_from_slice(value);
    out
}

pub const IMPLICIT_VR_LE: &str = "1.2.840.10008.1.2";

/// Preamble, magic and a complete file meta group (explicit VR little endian) declaring `ts`.
pub fn header_with_meta(ts: &str) -> Vec<u8> {
    let mut group = Vec::new();
    group.extend(element(0x0002, 0x0001, b"OB", &[0, 1]));
    group.extend(element(0x0002, 0x0002, b"UI", &pad_even(b"1.2.840.10008.5.1.4.1.1.4", 0)));
    group.extend(element(0x0002, 0x0003, b"UI", &pad_even(b"1.2.3.4.5", 0)));
    group.extend(element(0x0002, 0x0010, b"UI", &pad_even(ts.as_bytes(), 0)));
    group.extend(element(0x0002, 0x0012, b"UI", &pad_even(b"1.2.3.4", 0)));

    let mut out = vec![0u8; 128];
    out.extend_from_slice(b"DICM");
    out.extend(element(0x0002, 0x0000, b"UL", &(group.len() as u32).to_le_bytes()));
    out.extend(group);
    out
}

/// Implicit VR little endian element.
pub fn implicit_element(group: u16, elem: u16, value: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&group.to_le_bytes());
    out.extend_from_slice(&elem.to_le_bytes());
    out.extend_from_slice(&(value.len() as u32).to_le_bytes());
    out.extend_from_slice(value);
    out
}

/// Meta group + a handful of body elements + small native pixel data.
pub fn sample_dicom(patient_id: &str) -> Vec<u8> {
    let mut out = header_with_meta(EXPLICIT_VR_LE);
    out.extend(element(0x0008, 0x0018, b"UI", &pad_even(b"1.2.3.4.5", 0)));
    out.extend(element(0x0008, 0x0060, b"CS", b"MR"));
    out.extend(element(0x0010, 0x0020, b"LO", &pad_even(patient_id.as_bytes(), b' ')));
    out.extend(element(0x7FE0, 0x0010, b"OW", &[1u8; 64]));
    out
}

/// Body elements of [`sample_dicom`] in front of the pixel data.
pub const SAMPLE_ELEMENTS: usize = 3;

/// 132+ bytes whose magic is wrong.
pub fn wrong_magic() -> Vec<u8> {
    let mut out = vec![0u8; 128];
    out.extend_from_slice(b"NOPE");
    out.extend_from_slice(&[0u8; 64]);
    out
}

/// Valid signature and meta group, then an element whose length runs past EOF.
pub fn truncated_dicom() -> Vec<u8> {
    let mut out = header_with_meta(EXPLICIT_VR_LE);
    out.extend_from_slice(&0x0008u16.to_le_bytes());
    out.extend_from_slice(&0x0060u16.to_le_bytes());
    out.extend_from_slice(b"CS");
    out.extend_from_slice(&200u16.to_le_bytes());
    out.extend_from_slice(b"MR");
    out
}

pub fn write(dir: &Path, rel: &str, bytes: &[u8]) -> PathBuf {
    let path = dir.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, bytes).unwrap();
    path
}
