//! Payload decompression.
//!
//! XNB files may compress everything after the fixed header with one of two
//! schemes, selected by the header flags:
//!
//! | Module   | Flag   | Algorithm | Producer |
//! |----------|--------|-----------|----------|
//! | [`lzx`]  | `0x80` | LZX, 64 KiB window, framed | XNA Game Studio content pipeline |
//! | [`lz4`]  | `0x40` | LZ4 raw block | MonoGame content pipeline |
//!
//! LZX is always available. LZ4 is gated behind the `compression` Cargo
//! feature:
//!
//! ```toml
//! [dependencies]
//! xnbkit = { version = "0.1", features = ["compression"] }
//! ```
//!
//! Any outer envelope (for example a gzip wrapper applied to the whole file)
//! must be removed by the caller before the bytes reach this module; nothing
//! here sniffs for one.

use std::borrow::Cow;

use log::debug;

use crate::header::{Compression, Header};
use crate::Result;

#[cfg(feature = "compression")]
pub mod lz4;
pub mod lzx;

/// Produce the decompressed payload for `body`, the bytes following the
/// fixed header.
///
/// Uncompressed payloads are borrowed as-is. Compressed payloads must expand
/// to exactly `header.decompressed_size` bytes.
pub fn decompress_payload<'a>(body: &'a [u8], header: &Header) -> Result<Cow<'a, [u8]>> {
    let compression = header.compression();
    let Some(expected) = header.decompressed_size else {
        return Ok(Cow::Borrowed(body));
    };
    let expected = expected as usize;
    debug!(
        "decompressing {:?} payload: {} -> {} bytes",
        compression,
        body.len(),
        expected
    );

    match compression {
        Compression::None => Ok(Cow::Borrowed(body)),
        Compression::Lzx => lzx::decompress(body, expected).map(Cow::Owned),
        #[cfg(feature = "compression")]
        Compression::Lz4 => lz4::decompress_lz4(body, expected).map(Cow::Owned),
        #[cfg(not(feature = "compression"))]
        Compression::Lz4 => Err(crate::Error::invalid(
            5,
            "LZ4 payloads require the `compression` feature",
        )),
    }
}

/// Compress a payload for storage after a header with the given scheme.
pub fn compress_payload(payload: &[u8], compression: Compression) -> Result<Vec<u8>> {
    match compression {
        Compression::None => Ok(payload.to_vec()),
        Compression::Lzx => Ok(lzx::compress(payload)),
        #[cfg(feature = "compression")]
        Compression::Lz4 => Ok(lz4::compress_lz4(payload)),
        #[cfg(not(feature = "compression"))]
        Compression::Lz4 => Err(crate::Error::invalid(
            5,
            "LZ4 payloads require the `compression` feature",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use crate::header::{FLAG_LZX, Platform};

    fn header(flags: u8, decompressed_size: Option<u32>) -> Header {
        Header {
            platform: Platform::Windows,
            version: 5,
            flags,
            file_size: 0,
            decompressed_size,
        }
    }

    #[test]
    fn uncompressed_payload_is_borrowed() {
        let body = [1u8, 2, 3];
        let out = decompress_payload(&body, &header(0, None)).unwrap();
        assert!(matches!(out, Cow::Borrowed(_)));
        assert_eq!(&*out, &body);
    }

    #[test]
    fn lzx_payload() {
        let payload: Vec<u8> = (0..10_000u32).map(|i| (i % 251) as u8).collect();
        let body = compress_payload(&payload, Compression::Lzx).unwrap();
        let h = header(FLAG_LZX, Some(payload.len() as u32));
        assert_eq!(&*decompress_payload(&body, &h).unwrap(), &payload[..]);

        let tampered = header(FLAG_LZX, Some(payload.len() as u32 - 1));
        assert!(matches!(
            decompress_payload(&body, &tampered),
            Err(Error::CorruptCompression { .. })
        ));
    }
}
