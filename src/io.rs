//! Input plumbing: open a source file (buffered or memory-mapped), grab the
//! sniffing prefix, and decode raw CSV fields with a caller-chosen encoding.
use std::borrow::Cow;
use std::fs::File;
use std::io::{self, BufReader, Cursor, Read};
use std::path::Path;

use anyhow::{Context, Result};
use encoding_rs::Encoding;
use memmap2::Mmap;

/// Threshold in bytes above which we attempt to use mmap for reading.
/// Callers can override via API; this is a reasonable default.
pub const DEFAULT_MMAP_THRESHOLD_BYTES: u64 = 16 * 1024 * 1024; // 16 MiB

/// Number of leading bytes inspected when sniffing the delimiter.
pub const SNIFF_PREFIX_BYTES: usize = 64 * 1024;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

pub type Source = Box<dyn Read + 'static>;

#[derive(Debug, thiserror::Error)]
pub enum EncodingError {
    #[error("unknown encoding: {0}")]
    Unknown(String),
    #[error("encoding {0} is not ASCII-compatible; re-encode the file as UTF-8 first")]
    NotAsciiCompatible(&'static str),
}

/// Resolve an encoding label such as `utf-8` or `latin-1`. Fields are split
/// on raw ASCII delimiters before decoding, so only ASCII-compatible
/// encodings are accepted.
pub fn encoding_for_label(label: &str) -> Result<&'static Encoding, EncodingError> {
    let encoding = Encoding::for_label(label.trim().as_bytes())
        .ok_or_else(|| EncodingError::Unknown(label.to_string()))?;
    if !encoding.is_ascii_compatible() {
        return Err(EncodingError::NotAsciiCompatible(encoding.name()));
    }
    Ok(encoding)
}

/// Decide whether to use mmap based on file size and threshold.
pub fn should_use_mmap(file_size_bytes: u64, threshold_bytes: u64) -> bool {
    file_size_bytes >= threshold_bytes
}

/// Open a file through a buffered reader (non-mmap).
pub fn open_bufread<P: AsRef<Path>>(path: P) -> Result<Source> {
    let file = File::open(&path).with_context(|| format!("open {}", path.as_ref().display()))?;
    Ok(Box::new(BufReader::new(file)))
}

/// Open a file through a read-only memory map.
pub fn open_mmap<P: AsRef<Path>>(path: P) -> Result<Source> {
    let file = File::open(&path).with_context(|| format!("open {}", path.as_ref().display()))?;
    let mmap =
        unsafe { Mmap::map(&file) }.with_context(|| format!("mmap {}", path.as_ref().display()))?;
    Ok(Box::new(Cursor::new(mmap)))
}

/// Choose mmap or bufread based on file size.
pub fn open_auto<P: AsRef<Path>>(path: P, threshold_bytes: u64) -> Result<Source> {
    let meta =
        std::fs::metadata(&path).with_context(|| format!("stat {}", path.as_ref().display()))?;
    if meta.is_file() && meta.len() > 0 && should_use_mmap(meta.len(), threshold_bytes) {
        open_mmap(path)
    } else {
        open_bufread(path)
    }
}

/// Read up to `limit` bytes from the front of `source` and hand back a reader
/// that replays those bytes before continuing with the rest of the source.
/// A leading UTF-8 BOM is dropped from both.
pub fn take_prefix(mut source: Source, limit: usize) -> io::Result<(Vec<u8>, Source, bool)> {
    let mut prefix = Vec::with_capacity(limit.min(8192));
    (&mut source)
        .take(limit as u64 + 1)
        .read_to_end(&mut prefix)?;
    let truncated = prefix.len() > limit;
    if prefix.starts_with(UTF8_BOM) {
        prefix.drain(..UTF8_BOM.len());
    }
    let replay = Cursor::new(prefix.clone());
    prefix.truncate(limit);
    Ok((prefix, Box::new(replay.chain(source)), truncated))
}

/// Decode one raw field. The flag reports whether malformed input was replaced.
pub fn decode_field<'a>(raw: &'a [u8], encoding: &'static Encoding) -> (Cow<'a, str>, bool) {
    encoding.decode_without_bom_handling(raw)
}

/// Drops spaces at the start of every unquoted field, so `a, "b, c"` parses
/// as two fields with the second one quoted.
pub struct SkipInitialSpace<R> {
    inner: R,
    delimiter: u8,
    in_quotes: bool,
    just_closed: bool,
    field_start: bool,
}

impl<R: Read> SkipInitialSpace<R> {
    pub fn new(inner: R, delimiter: u8) -> Self {
        Self {
            inner,
            delimiter,
            in_quotes: false,
            just_closed: false,
            field_start: true,
        }
    }

    /// Returns `false` when `b` should be dropped.
    fn step(&mut self, b: u8) -> bool {
        if self.in_quotes {
            if b == b'"' {
                self.in_quotes = false;
                self.just_closed = true;
            }
            return true;
        }
        if self.just_closed {
            self.just_closed = false;
            if b == b'"' {
                // doubled quote inside a quoted field
                self.in_quotes = true;
                return true;
            }
        }
        if b == self.delimiter {
            self.field_start = true;
            return true;
        }
        if b == b'\n' || b == b'\r' {
            self.field_start = true;
            return true;
        }
        if self.field_start && b == b' ' && self.delimiter != b' ' {
            return false;
        }
        if self.field_start && b == b'"' {
            self.in_quotes = true;
        }
        self.field_start = false;
        true
    }
}

impl<R: Read> Read for SkipInitialSpace<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        loop {
            let n = self.inner.read(buf)?;
            if n == 0 {
                return Ok(0);
            }
            let mut kept = 0;
            for i in 0..n {
                let b = buf[i];
                if self.step(b) {
                    buf[kept] = b;
                    kept += 1;
                }
            }
            if kept > 0 {
                return Ok(kept);
            }
        }
    }
}
