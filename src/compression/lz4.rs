//! LZ4 decompression (requires the `compression` feature).
//!
//! MonoGame marks LZ4-compressed XNB files with header flag `0x40`. The
//! payload after the 14-byte header is a single raw LZ4 block (no frame, no
//! size prefix); the expected output size comes from the header's
//! decompressed-size field.

#![cfg(feature = "compression")]

use lz4_flex::block::DecompressError;

use crate::{Error, Result};

/// Decompress a raw LZ4 block that must expand to exactly
/// `decompressed_size` bytes.
///
/// Returns [`Error::CorruptCompression`] when the block expands to a
/// different size and [`Error::Lz4`] on any other decompression failure.
pub fn decompress_lz4(data: &[u8], decompressed_size: usize) -> Result<Vec<u8>> {
    let out = match lz4_flex::block::decompress(data, decompressed_size) {
        Ok(out) => out,
        // The block expands past the declared size; the true length is not
        // known, only that it is larger.
        Err(DecompressError::OutputTooSmall { .. }) => {
            return Err(Error::CorruptCompression {
                expected: decompressed_size,
                actual: decompressed_size + 1,
            });
        }
        Err(e) => return Err(Error::Lz4(e.to_string())),
    };
    if out.len() != decompressed_size {
        return Err(Error::CorruptCompression {
            expected: decompressed_size,
            actual: out.len(),
        });
    }
    Ok(out)
}

/// Compress `data` into a raw LZ4 block.
pub fn compress_lz4(data: &[u8]) -> Vec<u8> {
    lz4_flex::block::compress(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip() {
        let data: Vec<u8> = b"abcabcabcabc-xnb-".iter().cycle().take(4096).copied().collect();
        let packed = compress_lz4(&data);
        assert!(packed.len() < data.len());
        assert_eq!(decompress_lz4(&packed, data.len()).unwrap(), data);
    }

    #[test]
    fn declared_size_mismatch() {
        let data = vec![7u8; 1000];
        let packed = compress_lz4(&data);
        assert!(matches!(
            decompress_lz4(&packed, 1001),
            Err(Error::CorruptCompression { expected: 1001, actual: 1000 })
        ));
        assert!(decompress_lz4(&packed, 999).is_err());
    }
}
