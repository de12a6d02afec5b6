//! Checksummed append-only journal.
//!
//! Every committed unit is written as exactly one frame:
//!
//! ```text
//! magic "FSJL" (4) | version (2, LE) | payload length (4, LE) | CBOR payload | CRC32 (4, LE)
//! ```
//!
//! The CRC covers the header and the payload. One frame per unit is what makes
//! a unit atomic on disk: recovery keeps whole frames and discards a partial
//! one, so a crash mid-append loses only the unit being written.
//!
//! Recovery rules:
//! - fewer bytes than a full frame at the end of the log: torn tail, trimmed
//! - checksum mismatch on the final frame: torn tail, trimmed
//! - bad magic, unknown version, or a checksum mismatch followed by more
//!   frames: corruption, reported
//! - a length running past the end while a valid frame follows: corruption,
//!   reported

use crate::error::{CoreError, CoreResult};
use feedsync_storage::StorageBackend;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

/// Magic bytes opening every frame.
pub const JOURNAL_MAGIC: [u8; 4] = *b"FSJL";

/// Current frame format version.
pub const JOURNAL_VERSION: u16 = 1;

/// magic (4) + version (2) + length (4)
const HEADER_SIZE: usize = 10;

const CRC_SIZE: usize = 4;

/// An append-only journal of CBOR-encoded records over a storage backend.
pub struct Journal {
    backend: Box<dyn StorageBackend>,
    sync_on_write: bool,
    poisoned: bool,
}

impl Journal {
    /// Wraps a backend. Call [`Journal::recover`] before appending.
    pub fn new(backend: Box<dyn StorageBackend>, sync_on_write: bool) -> Self {
        Self {
            backend,
            sync_on_write,
            poisoned: false,
        }
    }

    /// Reads every complete record, trimming a torn tail if one is found.
    ///
    /// # Errors
    ///
    /// Returns an error on corruption that is not explained by a torn tail,
    /// or if a frame's payload does not decode as `R`.
    pub fn recover<R: DeserializeOwned>(&mut self) -> CoreResult<Vec<R>> {
        let data = self.backend.read_all()?;
        let (frames, valid_len) = scan_frames(&data)?;

        if valid_len < data.len() {
            warn!(
                discarded = data.len() - valid_len,
                "trimming torn journal tail"
            );
            self.backend.truncate(valid_len as u64)?;
        }

        let mut records = Vec::with_capacity(frames.len());
        for (offset, payload) in frames {
            let record = ciborium::from_reader(payload).map_err(|e| {
                CoreError::journal_corruption(offset, format!("undecodable record: {e}"))
            })?;
            records.push(record);
        }

        debug!(records = records.len(), bytes = valid_len, "journal recovered");
        self.poisoned = false;
        Ok(records)
    }

    /// Appends one record as a single frame and makes it durable.
    ///
    /// On failure the partial frame is trimmed again, so the journal still
    /// ends at the last complete unit. If trimming fails too, the journal
    /// refuses further writes until recovered.
    pub fn append<R: Serialize>(&mut self, record: &R) -> CoreResult<u64> {
        if self.poisoned {
            return Err(CoreError::JournalPoisoned);
        }

        let frame = encode_frame(&encode_record(record)?)?;
        let start = self.backend.size()?;

        let written = self.backend.append(&frame).and_then(|_| {
            if self.sync_on_write {
                self.backend.sync()
            } else {
                self.backend.flush()
            }
        });

        match written {
            Ok(()) => Ok(start),
            Err(err) => {
                if let Err(trim_err) = self.backend.truncate(start) {
                    warn!(error = %trim_err, "could not trim failed journal write");
                    self.poisoned = true;
                }
                Err(err.into())
            }
        }
    }

    /// Atomically replaces the whole journal with a single record.
    pub fn rewrite<R: Serialize>(&mut self, record: &R) -> CoreResult<()> {
        if self.poisoned {
            return Err(CoreError::JournalPoisoned);
        }
        let frame = encode_frame(&encode_record(record)?)?;
        self.backend.replace_contents(&frame)?;
        Ok(())
    }

    /// Current journal size in bytes.
    pub fn size(&self) -> CoreResult<u64> {
        Ok(self.backend.size()?)
    }
}

fn encode_record<R: Serialize>(record: &R) -> CoreResult<Vec<u8>> {
    let mut payload = Vec::new();
    ciborium::into_writer(record, &mut payload).map_err(|e| CoreError::Codec(e.to_string()))?;
    Ok(payload)
}

/// Wraps a payload in a frame envelope.
pub(crate) fn encode_frame(payload: &[u8]) -> CoreResult<Vec<u8>> {
    let len = u32::try_from(payload.len())
        .map_err(|_| CoreError::Codec("journal record larger than 4 GiB".into()))?;

    let mut frame = Vec::with_capacity(HEADER_SIZE + payload.len() + CRC_SIZE);
    frame.extend_from_slice(&JOURNAL_MAGIC);
    frame.extend_from_slice(&JOURNAL_VERSION.to_le_bytes());
    frame.extend_from_slice(&len.to_le_bytes());
    frame.extend_from_slice(payload);

    let crc = compute_crc32(&frame);
    frame.extend_from_slice(&crc.to_le_bytes());
    Ok(frame)
}

/// Splits `data` into frame payloads. Returns the payloads with their offsets
/// and the length of the valid prefix.
fn scan_frames(data: &[u8]) -> CoreResult<(Vec<(u64, &[u8])>, usize)> {
    let mut frames = Vec::new();
    let mut offset = 0usize;

    while offset < data.len() {
        let rest = &data[offset..];
        if rest.len() < HEADER_SIZE {
            break;
        }
        if rest[..4] != JOURNAL_MAGIC {
            return Err(CoreError::journal_corruption(offset as u64, "bad magic"));
        }

        let version = u16::from_le_bytes([rest[4], rest[5]]);
        if version != JOURNAL_VERSION {
            return Err(CoreError::invalid_format(format!(
                "unsupported journal version {version} at offset {offset}"
            )));
        }

        let len = u32::from_le_bytes([rest[6], rest[7], rest[8], rest[9]]) as usize;
        let frame_len = HEADER_SIZE + len + CRC_SIZE;
        if rest.len() < frame_len {
            // A torn append leaves nothing after it. A complete frame further
            // on means this header's length is damaged.
            if let Some(next) = next_valid_frame(data, offset + 1) {
                return Err(CoreError::journal_corruption(
                    offset as u64,
                    format!("frame length {len} overruns a valid frame at offset {next}"),
                ));
            }
            break;
        }

        let body_end = HEADER_SIZE + len;
        let stored = u32::from_le_bytes([
            rest[body_end],
            rest[body_end + 1],
            rest[body_end + 2],
            rest[body_end + 3],
        ]);
        let actual = compute_crc32(&rest[..body_end]);
        if stored != actual {
            if offset + frame_len == data.len() {
                break;
            }
            return Err(CoreError::ChecksumMismatch {
                offset: offset as u64,
                expected: stored,
                actual,
            });
        }

        frames.push((offset as u64, &rest[HEADER_SIZE..body_end]));
        offset += frame_len;
    }

    Ok((frames, offset))
}

/// Offset of the first complete, checksum-valid frame starting at or after
/// `from`, if any.
fn next_valid_frame(data: &[u8], from: usize) -> Option<usize> {
    (from..data.len().saturating_sub(HEADER_SIZE + CRC_SIZE - 1)).find(|&start| {
        let rest = &data[start..];
        if rest[..4] != JOURNAL_MAGIC
            || u16::from_le_bytes([rest[4], rest[5]]) != JOURNAL_VERSION
        {
            return false;
        }
        let len = u32::from_le_bytes([rest[6], rest[7], rest[8], rest[9]]) as usize;
        let body_end = HEADER_SIZE + len;
        if rest.len() < body_end + CRC_SIZE {
            return false;
        }
        let stored = u32::from_le_bytes([
            rest[body_end],
            rest[body_end + 1],
            rest[body_end + 2],
            rest[body_end + 3],
        ]);
        stored == compute_crc32(&rest[..body_end])
    })
}

/// Computes the IEEE CRC32 of `data`.
pub fn compute_crc32(data: &[u8]) -> u32 {
    const CRC32_TABLE: [u32; 256] = {
        let mut table = [0u32; 256];
        let mut i = 0;
        while i < 256 {
            let mut crc = i as u32;
            let mut bit = 0;
            while bit < 8 {
                crc = if crc & 1 != 0 {
                    (crc >> 1) ^ 0xEDB8_8320
                } else {
                    crc >> 1
                };
                bit += 1;
            }
            table[i] = crc;
            i += 1;
        }
        table
    };

    let mut crc = 0xFFFF_FFFF_u32;
    for &byte in data {
        crc = (crc >> 8) ^ CRC32_TABLE[((crc ^ u32::from(byte)) & 0xFF) as usize];
    }
    !crc
}
