//! Fixed-layout binary codec for OHLCV records.
//!
//! The on-disk layout is 64 bytes, little-endian:
//!
//! - `u64`: timestamp in UTC epoch milliseconds (bytes 0-7)
//! - `f64`: open, high, low, close (bytes 8-39)
//! - `f64`: volume (bytes 40-47)
//! - 16 reserved bytes, zeroed on encode, ignored on decode (bytes 48-63)
//!
//! One record never spans two 64-byte boundaries, so a series file is
//! readable as a raw record array without a parsing pass.

use byteorder::{ByteOrder, LittleEndian};
use cascata_types::{BarRecord, CascataError};
use thiserror::Error;

/// Size in bytes of one encoded record.
pub const RECORD_SIZE: usize = 64;

/// Errors that can occur during record encoding or decoding.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// Buffer shorter than one record.
    #[error("Buffer too short: {0} bytes (need {RECORD_SIZE})")]
    ShortBuffer(usize),

    /// Data length is not a multiple of the record size.
    #[error("Invalid data length: {0} bytes (expected multiple of {RECORD_SIZE})")]
    InvalidLength(usize),
}

impl From<CodecError> for CascataError {
    fn from(err: CodecError) -> Self {
        Self::Codec(err.to_string())
    }
}

/// Encodes one record into the first 64 bytes of `buf`.
///
/// # Errors
///
/// Returns an error if `buf` is shorter than [`RECORD_SIZE`].
pub fn encode_record(bar: &BarRecord, buf: &mut [u8]) -> Result<(), CodecError> {
    if buf.len() < RECORD_SIZE {
        return Err(CodecError::ShortBuffer(buf.len()));
    }
    LittleEndian::write_u64(&mut buf[0..8], bar.timestamp_ms as u64);
    LittleEndian::write_f64(&mut buf[8..16], bar.open);
    LittleEndian::write_f64(&mut buf[16..24], bar.high);
    LittleEndian::write_f64(&mut buf[24..32], bar.low);
    LittleEndian::write_f64(&mut buf[32..40], bar.close);
    LittleEndian::write_f64(&mut buf[40..48], bar.volume);
    buf[48..64].fill(0);
    Ok(())
}

/// Decodes one record from the first 64 bytes of `buf`.
///
/// # Errors
///
/// Returns an error if `buf` is shorter than [`RECORD_SIZE`].
pub fn decode_record(buf: &[u8]) -> Result<BarRecord, CodecError> {
    if buf.len() < RECORD_SIZE {
        return Err(CodecError::ShortBuffer(buf.len()));
    }
    Ok(BarRecord {
        timestamp_ms: LittleEndian::read_u64(&buf[0..8]) as i64,
        open: LittleEndian::read_f64(&buf[8..16]),
        high: LittleEndian::read_f64(&buf[16..24]),
        low: LittleEndian::read_f64(&buf[24..32]),
        close: LittleEndian::read_f64(&buf[32..40]),
        volume: LittleEndian::read_f64(&buf[40..48]),
    })
}

/// Decodes a batch of records from raw series bytes.
///
/// # Errors
///
/// Returns an error if the data length is not a multiple of the record
/// size.
pub fn decode_records(data: &[u8]) -> Result<impl Iterator<Item = BarRecord> + '_, CodecError> {
    if !data.len().is_multiple_of(RECORD_SIZE) {
        return Err(CodecError::InvalidLength(data.len()));
    }
    Ok(data.chunks_exact(RECORD_SIZE).map(|chunk| {
        decode_record(chunk).expect("chunk is exactly one record")
    }))
}

/// Encodes a batch of records into a contiguous buffer.
#[must_use]
pub(crate) fn encode_records(bars: &[BarRecord]) -> Vec<u8> {
    let mut buf = vec![0u8; bars.len() * RECORD_SIZE];
    for (bar, chunk) in bars.iter().zip(buf.chunks_exact_mut(RECORD_SIZE)) {
        encode_record(bar, chunk).expect("chunk is exactly one record");
    }
    buf
}
