// Copyright (c) 2024 Furchill

//! Append-only operation journal.
//!
//! File layout: an 8-byte magic followed by records of
//! `len (u32 LE) || crc32 (u32 LE) || bincode payload`.
//!
//! A record cut short by a crash is dropped on open and the file is
//! truncated back to the last complete record. A complete record whose
//! checksum does not match is corruption and fails the open.

use crc::{Crc, CRC_32_ISO_HDLC};
use serde::{de::DeserializeOwned, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;
use tracing::{debug, warn};

use super::JournalError;

pub const JOURNAL_MAGIC: &[u8; 8] = b"FURJRNL1";

const HEADER_LEN: usize = 8;
const MAX_RECORD_LEN: u32 = 16 * 1024 * 1024;

const CRC32: Crc<u32> = Crc::<u32>::new(&CRC_32_ISO_HDLC);

pub struct Journal {
    file: File,
    /// Offset just past the last complete record
    end: u64,
    records: u64,
}

impl Journal {
    /// Open or create a journal, returning every record it holds.
    pub fn open<T: DeserializeOwned>(path: &Path) -> Result<(Self, Vec<T>), JournalError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;

        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes)?;

        if bytes.len() < HEADER_LEN {
            // New file, or a crash while writing the magic.
            file.set_len(0)?;
            file.seek(SeekFrom::Start(0))?;
            file.write_all(JOURNAL_MAGIC)?;
            file.sync_data()?;
            debug!(path = %path.display(), "Created journal");
            return Ok((
                Self {
                    file,
                    end: HEADER_LEN as u64,
                    records: 0,
                },
                Vec::new(),
            ));
        }

        if &bytes[..HEADER_LEN] != JOURNAL_MAGIC {
            return Err(JournalError::BadMagic);
        }

        let mut entries = Vec::new();
        let mut offset = HEADER_LEN;
        loop {
            let rest = &bytes[offset..];
            if rest.len() < 8 {
                break;
            }

            let len = u32::from_le_bytes([rest[0], rest[1], rest[2], rest[3]]);
            let crc = u32::from_le_bytes([rest[4], rest[5], rest[6], rest[7]]);
            if len > MAX_RECORD_LEN {
                return Err(JournalError::Corrupt {
                    offset: offset as u64,
                });
            }
            let len = len as usize;
            if rest.len() < 8 + len {
                break;
            }

            let payload = &rest[8..8 + len];
            if CRC32.checksum(payload) != crc {
                return Err(JournalError::Corrupt {
                    offset: offset as u64,
                });
            }
            let entry = bincode::deserialize(payload)
                .map_err(|e| JournalError::Serialization(e.to_string()))?;
            entries.push(entry);
            offset += 8 + len;
        }

        if offset < bytes.len() {
            warn!(
                path = %path.display(),
                dropped_bytes = bytes.len() - offset,
                "Truncating incomplete journal record"
            );
            file.set_len(offset as u64)?;
            file.sync_data()?;
        }

        let records = entries.len() as u64;
        debug!(path = %path.display(), records, "Opened journal");

        Ok((
            Self {
                file,
                end: offset as u64,
                records,
            },
            entries,
        ))
    }

    /// Append one record and flush it to disk.
    ///
    /// On failure the file is cut back to its previous length, so a failed
    /// append leaves no trace.
    pub fn append<T: Serialize>(&mut self, entry: &T) -> Result<(), JournalError> {
        let payload =
            bincode::serialize(entry).map_err(|e| JournalError::Serialization(e.to_string()))?;
        let len = u32::try_from(payload.len())
            .ok()
            .filter(|len| *len <= MAX_RECORD_LEN)
            .ok_or(JournalError::RecordTooLarge(payload.len()))?;

        let mut frame = Vec::with_capacity(8 + payload.len());
        frame.extend_from_slice(&len.to_le_bytes());
        frame.extend_from_slice(&CRC32.checksum(&payload).to_le_bytes());
        frame.extend_from_slice(&payload);

        if let Err(e) = self.write_frame(&frame) {
            // Best effort; the next open truncates anything left behind.
            let _ = self.file.set_len(self.end);
            return Err(e.into());
        }

        self.end += frame.len() as u64;
        self.records += 1;
        Ok(())
    }

    fn write_frame(&mut self, frame: &[u8]) -> std::io::Result<()> {
        self.file.seek(SeekFrom::Start(self.end))?;
        self.file.write_all(frame)?;
        self.file.sync_data()
    }

    /// Number of records in the journal.
    pub fn len(&self) -> u64 {
        self.records
    }

    pub fn is_empty(&self) -> bool {
        self.records == 0
    }

    /// Size of the journal file in bytes.
    pub fn size(&self) -> u64 {
        self.end
    }
}
