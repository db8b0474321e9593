// 🔐 Digests - SHA-1 over the exact bytes of a listing file
//
// The filters hash whatever passes through them, so a file's digest is
// computed while it is written or parsed, never in a second pass.

use crate::error::{LedgerError, LedgerResult};
use sha1::{Digest, Sha1};
use std::fmt;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;
use tempfile::NamedTempFile;

/// Digests are 160 bits rendered as lowercase hex.
pub const DIGEST_HEX_LEN: usize = 40;

/// `Write` filter hashing every byte accepted by the inner writer.
pub struct DigestWriter<W> {
    inner: W,
    hasher: Sha1,
}

impl<W: Write> DigestWriter<W> {
    pub fn new(inner: W) -> Self {
        DigestWriter {
            inner,
            hasher: Sha1::new(),
        }
    }

    /// Digest of the bytes written so far.
    pub fn hex_digest(&self) -> String {
        hex::encode(self.hasher.clone().finalize())
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> Write for DigestWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let written = self.inner.write(buf)?;
        self.hasher.update(&buf[..written]);
        Ok(written)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// `Read` filter hashing every byte handed out by the inner reader.
pub struct DigestReader<R> {
    inner: R,
    hasher: Sha1,
}

impl<R: Read> DigestReader<R> {
    pub fn new(inner: R) -> Self {
        DigestReader {
            inner,
            hasher: Sha1::new(),
        }
    }

    /// Digest of the bytes read so far.
    pub fn hex_digest(&self) -> String {
        hex::encode(self.hasher.clone().finalize())
    }
}

impl<R: Read> Read for DigestReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let read = self.inner.read(buf)?;
        self.hasher.update(&buf[..read]);
        Ok(read)
    }
}

pub fn hex_digest(bytes: impl AsRef<[u8]>) -> String {
    hex::encode(Sha1::digest(bytes.as_ref()))
}

pub fn is_hex_digest(text: &str) -> bool {
    text.len() == DIGEST_HEX_LEN && text.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

/// Hashes the current contents of `path`.
pub fn file_digest(path: &Path) -> LedgerResult<String> {
    let file = File::open(path).map_err(|e| LedgerError::io(path, e))?;
    let mut reader = DigestReader::new(BufReader::new(file));
    io::copy(&mut reader, &mut io::sink()).map_err(|e| LedgerError::io(path, e))?;
    Ok(reader.hex_digest())
}

/// Opens `path` for reading through a digest filter.
pub fn open_digested(path: &Path) -> LedgerResult<BufReader<DigestReader<File>>> {
    if path.is_dir() {
        return Err(LedgerError::IsADirectory {
            path: path.to_path_buf(),
        });
    }
    let file = File::open(path).map_err(|e| LedgerError::io(path, e))?;
    Ok(BufReader::new(DigestReader::new(file)))
}

/// Writes `contents` to `path` and returns the digest of the written bytes.
///
/// The bytes go to a temporary file in the destination directory which is
/// then renamed over `path`, so readers never see a half-written file. With
/// `overwrite` unset an existing `path` is a `FileExists` error.
pub fn write_digested(path: &Path, contents: &impl fmt::Display, overwrite: bool) -> LedgerResult<String> {
    if path.is_dir() {
        return Err(LedgerError::IsADirectory {
            path: path.to_path_buf(),
        });
    }
    if !overwrite && path.exists() {
        return Err(LedgerError::FileExists {
            path: path.to_path_buf(),
        });
    }

    let directory = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut temp = NamedTempFile::new_in(directory).map_err(|e| LedgerError::io(path, e))?;

    let digest = {
        let mut out = DigestWriter::new(BufWriter::new(temp.as_file_mut()));
        write!(out, "{contents}")
            .and_then(|_| out.flush())
            .map_err(|e| LedgerError::io(path, e))?;
        out.hex_digest()
    };
    temp.as_file().sync_all().map_err(|e| LedgerError::io(path, e))?;

    let persisted = if overwrite {
        temp.persist(path)
    } else {
        temp.persist_noclobber(path)
    };
    persisted.map_err(|e| LedgerError::io(path, e.error))?;

    Ok(digest)
}
