//! Archive Decoder
//!
//! Turns a gzip-compressed tar stream into a lazy, finite, non-restartable sequence of
//! file entries. Entries come out in archive order; directories and other non-file
//! entries are skipped. Any decompression or framing error surfaces as
//! `IngestError::MalformedArchive`.

use crate::error::IngestError;

use flate2::read::GzDecoder;
use std::io::{self, Read};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Other,
}

impl From<tar::EntryType> for EntryKind {
    fn from(entry_type: tar::EntryType) -> Self {
        if entry_type.is_file() {
            EntryKind::File
        } else {
            EntryKind::Other
        }
    }
}

pub struct ArchiveDecoder<R: Read> {
    archive: tar::Archive<GzDecoder<R>>,
}

impl<R: Read> ArchiveDecoder<R> {
    pub fn new(reader: R) -> Self {
        Self {
            archive: tar::Archive::new(GzDecoder::new(reader)),
        }
    }

    /// Starts iterating the archive. Can only be called once per decoder.
    pub fn entries(&mut self) -> Result<ArchiveEntries<'_, R>, IngestError> {
        let inner = self
            .archive
            .entries()
            .map_err(IngestError::MalformedArchive)?;
        Ok(ArchiveEntries { inner })
    }
}

pub struct ArchiveEntries<'a, R: 'a + Read> {
    inner: tar::Entries<'a, GzDecoder<R>>,
}

impl<'a, R: Read> Iterator for ArchiveEntries<'a, R> {
    type Item = Result<ArchiveEntry<'a, R>, IngestError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let entry = match self.inner.next()? {
                Ok(entry) => entry,
                Err(e) => return Some(Err(IngestError::MalformedArchive(e))),
            };

            let kind = EntryKind::from(entry.header().entry_type());
            let path = match entry.path() {
                Ok(path) => normalize_path(&path.to_string_lossy()),
                Err(e) => return Some(Err(IngestError::MalformedArchive(e))),
            };

            if kind != EntryKind::File {
                tracing::trace!("Skipping non-file archive entry {}", path);
                continue;
            }

            return Some(Ok(ArchiveEntry {
                path,
                kind,
                inner: entry,
            }));
        }
    }
}

/// A single file inside the archive. Its body can be read exactly once.
pub struct ArchiveEntry<'a, R: 'a + Read> {
    path: String,
    kind: EntryKind,
    inner: tar::Entry<'a, GzDecoder<R>>,
}

impl<'a, R: Read> ArchiveEntry<'a, R> {
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn kind(&self) -> EntryKind {
        self.kind
    }

    /// Reads the whole body; must run before any other read of this entry. A body
    /// shorter than its header declares is an archive error, not an entry error.
    ///
    /// The declared size comes from an untrusted header, so it only bounds the check
    /// after reading and never drives allocation.
    pub fn read_body(&mut self) -> Result<Vec<u8>, IngestError> {
        let declared = self.inner.size();
        let mut body = Vec::new();
        self.inner
            .read_to_end(&mut body)
            .map_err(IngestError::MalformedArchive)?;

        if (body.len() as u64) < declared {
            return Err(IngestError::MalformedArchive(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!(
                    "{} declares {} bytes but holds {}",
                    self.path,
                    declared,
                    body.len()
                ),
            )));
        }
        Ok(body)
    }
}

impl<'a, R: Read> Read for ArchiveEntry<'a, R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}

fn normalize_path(path: &str) -> String {
    path.trim_start_matches("./").to_string()
}
