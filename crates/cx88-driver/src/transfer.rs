//! Settings export/import blob codec.
//!
//! Layout: repeated records of `{u32 address, u32 byte_length}` followed by
//! `byte_length` bytes of little-endian 32-bit words, concatenated, zlib
//! compressed, base64 encoded for copy/paste transport. The layout is fixed;
//! blobs saved by older builds must keep importing.
//!
//! Import decodes and validates the whole record stream before the first
//! write, so a corrupt tail applies nothing.

use crate::error::{CxError, Result};
use crate::window::MemoryWindow;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use std::io::{Read as _, Write as _};

pub use cx88_chip::tables::EXPORT_RANGES;

/// Pack the given register ranges into a transportable blob.
///
/// # Errors
///
/// Propagates window errors for unreadable or misaligned ranges.
pub fn export(window: &MemoryWindow, ranges: &[(u32, u32)]) -> Result<String> {
    let mut packed = Vec::new();
    for &(addr, size) in ranges {
        let words = window.read_block(addr, size)?;
        packed.extend_from_slice(&addr.to_le_bytes());
        packed.extend_from_slice(&size.to_le_bytes());
        for word in words {
            packed.extend_from_slice(&word.to_le_bytes());
        }
    }

    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::best());
    encoder.write_all(&packed)?;
    let compressed = encoder.finish()?;

    tracing::debug!(
        "Exported {} ranges: {} bytes packed, {} compressed",
        ranges.len(),
        packed.len(),
        compressed.len()
    );
    Ok(STANDARD.encode(compressed))
}

/// Export the canonical video core register ranges.
///
/// # Errors
///
/// See [`export`].
pub fn export_defaults(window: &MemoryWindow) -> Result<String> {
    export(window, EXPORT_RANGES)
}

/// Decode `blob`, validate every record, then replay each word write in
/// address order. Returns the number of words written.
///
/// # Errors
///
/// Returns [`CxError::CorruptImport`] for undecodable base64/zlib data,
/// truncated or misaligned records, or records outside the window. Nothing
/// is written unless the whole blob validates.
pub fn import(window: &MemoryWindow, blob: &str) -> Result<usize> {
    let compressed = STANDARD
        .decode(blob.trim())
        .map_err(|e| CxError::corrupt_import(format!("base64: {e}")))?;

    let mut packed = Vec::new();
    ZlibDecoder::new(compressed.as_slice())
        .read_to_end(&mut packed)
        .map_err(|e| CxError::corrupt_import(format!("zlib: {e}")))?;

    let records = validate(&packed, window.size())?;

    let mut written = 0usize;
    for (addr, words) in &records {
        for (n, word) in words.iter().enumerate() {
            window.write_word(addr + 4 * n as u32, *word, 0xffff_ffff)?;
            written += 1;
        }
    }

    tracing::info!("Imported {written} register words from {} records", records.len());
    Ok(written)
}

/// Parse and fully check the packed record stream without touching the
/// window.
fn validate(packed: &[u8], window_size: usize) -> Result<Vec<(u32, Vec<u32>)>> {
    let mut records = Vec::new();
    let mut pos = 0usize;

    while pos < packed.len() {
        let header = packed
            .get(pos..pos + 8)
            .ok_or_else(|| CxError::corrupt_import("truncated record header"))?;
        let addr = u32::from_le_bytes([header[0], header[1], header[2], header[3]]);
        let size = u32::from_le_bytes([header[4], header[5], header[6], header[7]]);
        pos += 8;

        if addr % 4 != 0 || size % 4 != 0 {
            return Err(CxError::corrupt_import(format!(
                "misaligned record {addr:#08x}+{size:#x}"
            )));
        }
        if addr as usize + size as usize > window_size {
            return Err(CxError::corrupt_import(format!(
                "record {addr:#08x}+{size:#x} outside window"
            )));
        }
        let body = packed
            .get(pos..pos + size as usize)
            .ok_or_else(|| CxError::corrupt_import("truncated record body"))?;
        pos += size as usize;

        let words = body
            .chunks_exact(4)
            .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect();
        records.push((addr, words));
    }

    if records.is_empty() {
        return Err(CxError::corrupt_import("empty record stream"));
    }
    Ok(records)
}
