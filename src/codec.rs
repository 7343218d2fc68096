//! Fixed-algorithm buffer compress/decompress with a self-describing trailer.
//!
//! The wire format is `compressed_payload || uint64_le(uncompressed_length)`.
//! There is no magic number: the trailer is the only source of truth for how
//! many bytes the decompressor must allocate, and callers must never rely on
//! a length hint the decompressor itself reports.

use std::io::{Read, Write};

use flate2::read::DeflateDecoder;
use flate2::write::DeflateEncoder;
use flate2::Compression;

use crate::error::{Result, UdfError};

const TRAILER_LEN: usize = 8;

/// Compresses `bytes` and appends the 8-byte little-endian uncompressed
/// length trailer.
pub fn compress(bytes: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = DeflateEncoder::new(Vec::with_capacity(bytes.len() / 2 + 16), Compression::best());
    encoder
        .write_all(bytes)
        .map_err(|e| UdfError::Codec(format!("deflate write failed: {e}")))?;
    let mut payload = encoder
        .finish()
        .map_err(|e| UdfError::Codec(format!("deflate finish failed: {e}")))?;
    payload.extend_from_slice(&(bytes.len() as u64).to_le_bytes());
    Ok(payload)
}

/// Reads the trailer, allocates exactly that many bytes, and decompresses
/// the payload into them.
pub fn decompress(blob: &[u8]) -> Result<Vec<u8>> {
    if blob.len() < TRAILER_LEN {
        return Err(UdfError::Codec(format!(
            "blob of {} bytes is shorter than the {}-byte trailer",
            blob.len(),
            TRAILER_LEN
        )));
    }
    let split_at = blob.len() - TRAILER_LEN;
    let (payload, trailer) = blob.split_at(split_at);
    let uncompressed_len = u64::from_le_bytes(trailer.try_into().unwrap()) as usize;

    let mut out = vec![0u8; uncompressed_len];
    let mut decoder = DeflateDecoder::new(payload);
    decoder
        .read_exact(&mut out)
        .map_err(|e| UdfError::Codec(format!("deflate decode truncated or corrupt: {e}")))?;

    // Confirm the decoder is exhausted; trailing garbage in the payload
    // indicates a mismatch between the trailer and the real length.
    let mut probe = [0u8; 1];
    if decoder.read(&mut probe).unwrap_or(0) != 0 {
        return Err(UdfError::Codec(
            "decompressed payload longer than the trailer claims".to_string(),
        ));
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrips_nonempty_input() {
        let data = b"the quick brown fox jumps over the lazy dog".repeat(37);
        let blob = compress(&data).unwrap();
        let restored = decompress(&blob).unwrap();
        assert_eq!(restored, data);
    }

    #[test]
    fn roundtrips_single_byte() {
        let data = [0x42u8];
        let blob = compress(&data).unwrap();
        assert_eq!(decompress(&blob).unwrap(), data);
    }

    #[test]
    fn trailer_matches_uncompressed_length() {
        let data = vec![7u8; 4096];
        let blob = compress(&data).unwrap();
        let trailer = &blob[blob.len() - TRAILER_LEN..];
        let len = u64::from_le_bytes(trailer.try_into().unwrap());
        assert_eq!(len as usize, data.len());
    }

    #[test]
    fn rejects_blob_shorter_than_trailer() {
        assert!(decompress(&[1, 2, 3]).is_err());
    }

    #[test]
    fn rejects_corrupt_payload() {
        let data = vec![3u8; 256];
        let mut blob = compress(&data).unwrap();
        // Flip a byte in the middle of the compressed payload.
        let mid = blob.len() / 2;
        blob[mid] ^= 0xff;
        assert!(decompress(&blob).is_err());
    }
}
