//! Byte-level helpers for joining and cleaning path text.
//!
//! Both `/` and `\` are treated as separators on input. Output always uses
//! [`SEPARATOR`], and runs of separators collapse to one.
//!
//! Paths are handled through [`OsStr::as_encoded_bytes`], so names that are
//! not valid UTF-8 pass through untouched. Slices are only ever cut next to
//! an ASCII separator or `.`.

use std::ffi::{OsStr, OsString};

use crate::{FsPath, Result};
use eyre::eyre;

/// Canonical separator for the current platform.
///
/// `\` is read as a separator on every platform, so a Unix file whose name
/// contains a backslash can't be addressed through a join and is skipped by
/// walks.
pub const SEPARATOR: char = std::path::MAIN_SEPARATOR;

#[allow(clippy::cast_possible_truncation)]
const SEPARATOR_BYTE: u8 = SEPARATOR as u8;

pub(crate) fn is_separator(b: u8) -> bool {
    b == b'/' || b == b'\\'
}

pub(crate) fn os_str(bytes: &[u8]) -> &OsStr {
    // SAFETY: `bytes` is UTF-8 or a slice of `as_encoded_bytes` output cut
    // next to an ASCII byte, both of which the encoding accepts.
    unsafe { OsStr::from_encoded_bytes_unchecked(bytes) }
}

pub(crate) fn os_string(bytes: Vec<u8>) -> OsString {
    // SAFETY: as for `os_str`; concatenating such pieces stays valid.
    unsafe { OsString::from_encoded_bytes_unchecked(bytes) }
}

/// Appends `segment` to `buf`, rewriting separators and collapsing runs,
/// including a run that spans the boundary between `buf` and `segment`.
fn push_normalized(buf: &mut Vec<u8>, segment: &[u8]) {
    for &b in segment {
        if is_separator(b) {
            if buf.last() != Some(&SEPARATOR_BYTE) {
                buf.push(SEPARATOR_BYTE);
            }
        } else {
            buf.push(b);
        }
    }
}

/// Joins `segment` onto `base`, adding a separator between them when neither
/// side supplies one. An empty segment leaves `base` unchanged apart from
/// separator normalization.
///
/// A `\` inside `segment` is a separator too, even on Unix where it is a
/// legal name character.
pub(crate) fn join_os(base: &OsStr, segment: &OsStr) -> OsString {
    let base = base.as_encoded_bytes();
    let segment = segment.as_encoded_bytes();
    let mut buf = Vec::with_capacity(base.len() + segment.len() + 1);
    push_normalized(&mut buf, base);
    if !segment.is_empty() && !buf.is_empty() && buf.last() != Some(&SEPARATOR_BYTE) {
        buf.push(SEPARATOR_BYTE);
    }
    push_normalized(&mut buf, segment);
    os_string(buf)
}

/// Joins every segment in order. Empty segments are skipped.
pub fn join_paths<S: AsRef<OsStr>>(segments: &[S]) -> Result<FsPath> {
    let joined = segments
        .iter()
        .fold(OsString::new(), |acc, segment| join_os(&acc, segment.as_ref()));
    if joined.is_empty() {
        return Err(eyre!("joining {} empty segment(s) produced an empty path", segments.len()));
    }
    Ok(FsPath::from_raw(joined))
}

/// Lexically normalizes a path: drops `.` components, folds `..` into the
/// preceding normal component and collapses separators. `..` above a root
/// is discarded; `..` at the front of a relative path is kept.
pub(crate) fn clean(path: &OsStr) -> OsString {
    let bytes = path.as_encoded_bytes();
    let rooted = bytes.first().copied().map_or(false, is_separator);
    let mut parts: Vec<&[u8]> = vec![];
    for part in bytes.split(|&b| is_separator(b)) {
        match part {
            b"" | b"." => (),
            b".." => match parts.last() {
                Some(&last) if last != b".." => {
                    parts.pop();
                }
                _ if rooted => (),
                _ => parts.push(b".."),
            },
            other => parts.push(other),
        }
    }

    let mut out = Vec::with_capacity(bytes.len());
    if rooted {
        out.push(SEPARATOR_BYTE);
    }
    for (i, part) in parts.iter().enumerate() {
        if i > 0 {
            out.push(SEPARATOR_BYTE);
        }
        out.extend_from_slice(part);
    }
    if out.is_empty() {
        out.push(b'.');
    }
    os_string(out)
}

/// Last component of `path`, ignoring trailing separators. A path made of
/// separators only names the root.
pub(crate) fn base_name(path: &OsStr) -> &OsStr {
    let bytes = path.as_encoded_bytes();
    let end = bytes
        .iter()
        .rposition(|&b| !is_separator(b))
        .map_or(0, |idx| idx + 1);
    if end == 0 {
        return if bytes.is_empty() {
            OsStr::new(".")
        } else {
            os_str(&bytes[..1])
        };
    }
    let trimmed = &bytes[..end];
    match trimmed.iter().rposition(|&b| is_separator(b)) {
        Some(idx) => os_str(&trimmed[idx + 1..]),
        None => os_str(trimmed),
    }
}

/// Splits a final component at its last `.`, returning the stem and the
/// text after the dot.
pub(crate) fn split_extension(name: &OsStr) -> (&OsStr, Option<&OsStr>) {
    let bytes = name.as_encoded_bytes();
    match bytes.iter().rposition(|&b| b == b'.') {
        Some(dot) => (os_str(&bytes[..dot]), Some(os_str(&bytes[dot + 1..]))),
        None => (name, None),
    }
}
