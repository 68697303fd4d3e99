//! XNB file header and type-reader table.
//!
//! ## Layout
//! ```text
//! [0x00] Magic "XNB"                         (3 bytes)
//! [0x03] Target platform                     (u8, ASCII letter)
//! [0x04] Format version (5 = XNA 4.0)        (u8)
//! [0x05] Flags                               (u8)
//!         0x01 = HiDef profile
//!         0x40 = LZ4 compressed (MonoGame)
//!         0x80 = LZX compressed
//! [0x06] Total file size incl. header        (u32 LE)
//! [0x0A] Decompressed payload size           (u32 LE, compressed files only)
//! [....] Payload (possibly compressed)
//! ```
//!
//! The payload starts with the type-reader table:
//! ```text
//! Reader count                               (7-bit encoded int)
//! Reader count × { name: string, version: i32 LE }
//! Shared resource count                      (7-bit encoded int)
//! ```

use serde::Serialize;

use crate::cursor::{ByteCursor, ByteWriter};
use crate::{Error, Result};

/// The three magic bytes every XNB file starts with.
pub const MAGIC: &[u8; 3] = b"XNB";

/// Flag bit: content was built for the HiDef graphics profile.
pub const FLAG_HIDEF: u8 = 0x01;
/// Flag bit: payload is LZ4 compressed (MonoGame extension).
pub const FLAG_LZ4: u8 = 0x40;
/// Flag bit: payload is LZX compressed.
pub const FLAG_LZX: u8 = 0x80;

/// Target platform letter stored at offset 3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Platform {
    Windows,
    WindowsPhone7,
    Xbox360,
    Ios,
    Android,
    DesktopGl,
    MacOsx,
    WindowsStoreApp,
    NativeClient,
    WindowsPhone8,
    RaspberryPi,
    PlayStation4,
    PsVita,
    XboxOne,
    Switch,
    Stadia,
    WebAssembly,
    Unknown(u8),
}

impl Platform {
    pub fn from_byte(b: u8) -> Self {
        match b {
            b'w' => Platform::Windows,
            b'm' => Platform::WindowsPhone7,
            b'x' => Platform::Xbox360,
            b'i' => Platform::Ios,
            b'a' => Platform::Android,
            b'd' => Platform::DesktopGl,
            b'X' => Platform::MacOsx,
            b'W' => Platform::WindowsStoreApp,
            b'n' => Platform::NativeClient,
            b'M' => Platform::WindowsPhone8,
            b'r' => Platform::RaspberryPi,
            b'P' => Platform::PlayStation4,
            b'v' => Platform::PsVita,
            b'O' => Platform::XboxOne,
            b'S' => Platform::Switch,
            b'G' => Platform::Stadia,
            b'b' => Platform::WebAssembly,
            other => Platform::Unknown(other),
        }
    }

    pub fn as_byte(self) -> u8 {
        match self {
            Platform::Windows => b'w',
            Platform::WindowsPhone7 => b'm',
            Platform::Xbox360 => b'x',
            Platform::Ios => b'i',
            Platform::Android => b'a',
            Platform::DesktopGl => b'd',
            Platform::MacOsx => b'X',
            Platform::WindowsStoreApp => b'W',
            Platform::NativeClient => b'n',
            Platform::WindowsPhone8 => b'M',
            Platform::RaspberryPi => b'r',
            Platform::PlayStation4 => b'P',
            Platform::PsVita => b'v',
            Platform::XboxOne => b'O',
            Platform::Switch => b'S',
            Platform::Stadia => b'G',
            Platform::WebAssembly => b'b',
            Platform::Unknown(b) => b,
        }
    }
}

/// Compression applied to the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Compression {
    None,
    Lzx,
    Lz4,
}

/// Fixed-size XNB file header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Header {
    pub platform: Platform,
    pub version: u8,
    /// Raw flags byte; see [`FLAG_HIDEF`], [`FLAG_LZX`], [`FLAG_LZ4`].
    pub flags: u8,
    /// Total size of the file on disk, header included.
    pub file_size: u32,
    /// Size of the payload after decompression. Present iff the payload is
    /// compressed.
    pub decompressed_size: Option<u32>,
}

impl Header {
    /// Parse the fixed header from the start of `c`.
    ///
    /// The magic is checked before anything else is trusted.
    pub fn parse(c: &mut ByteCursor<'_>) -> Result<Self> {
        let found = c.read_array::<3>()?;
        if &found != MAGIC {
            return Err(Error::BadMagic { found });
        }

        let platform = Platform::from_byte(c.read_u8()?);
        let version = c.read_u8()?;
        let flags_offset = c.position();
        let flags = c.read_u8()?;
        if flags & FLAG_LZX != 0 && flags & FLAG_LZ4 != 0 {
            return Err(Error::invalid(
                flags_offset,
                "both LZX and LZ4 compression flags are set",
            ));
        }
        let file_size = c.read_u32()?;
        let decompressed_size = if flags & (FLAG_LZX | FLAG_LZ4) != 0 {
            Some(c.read_u32()?)
        } else {
            None
        };

        Ok(Self {
            platform,
            version,
            flags,
            file_size,
            decompressed_size,
        })
    }

    /// Serialize the header. Inverse of [`Header::parse`].
    pub fn write(&self, w: &mut ByteWriter) {
        w.write_bytes(MAGIC)
            .write_u8(self.platform.as_byte())
            .write_u8(self.version)
            .write_u8(self.flags)
            .write_u32(self.file_size);
        if let Some(size) = self.decompressed_size {
            w.write_u32(size);
        }
    }

    /// Encoded length of this header in bytes.
    pub fn len(&self) -> usize {
        if self.decompressed_size.is_some() { 14 } else { 10 }
    }

    pub fn is_hidef(&self) -> bool {
        self.flags & FLAG_HIDEF != 0
    }

    pub fn compression(&self) -> Compression {
        if self.flags & FLAG_LZX != 0 {
            Compression::Lzx
        } else if self.flags & FLAG_LZ4 != 0 {
            Compression::Lz4
        } else {
            Compression::None
        }
    }

    /// Human-readable name of the format version.
    pub fn version_name(&self) -> Option<&'static str> {
        match self.version {
            3 => Some("XNA Game Studio 3.0"),
            4 => Some("XNA Game Studio 3.1"),
            5 => Some("XNA Game Studio 4.0"),
            _ => None,
        }
    }
}

/// One entry of the type-reader table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TypeReaderEntry {
    /// Assembly-qualified reader type name.
    pub name: String,
    pub version: i32,
}

impl TypeReaderEntry {
    /// Read the reader count followed by that many entries.
    pub fn read_table(c: &mut ByteCursor<'_>) -> Result<Vec<Self>> {
        let count = c.read_7bit_int()? as usize;
        // Each entry is at least five bytes; refuse absurd counts before
        // allocating for them.
        let mut entries = Vec::with_capacity(count.min(c.remaining() / 5));
        for _ in 0..count {
            let name = c.read_string()?;
            let version = c.read_i32()?;
            entries.push(Self { name, version });
        }
        Ok(entries)
    }

    pub fn write_table(entries: &[Self], w: &mut ByteWriter) {
        w.write_7bit_int(entries.len() as u32);
        for e in entries {
            w.write_string(&e.name).write_i32(e.version);
        }
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn roundtrip(h: &Header) -> Header {
        let mut w = ByteWriter::new();
        h.write(&mut w);
        let bytes = w.into_bytes();
        assert_eq!(bytes.len(), h.len());
        Header::parse(&mut ByteCursor::new(&bytes)).unwrap()
    }

    #[test]
    fn uncompressed_header() {
        let bytes = [b'X', b'N', b'B', b'w', 5, 0x01, 0x40, 0x00, 0x00, 0x00];
        let h = Header::parse(&mut ByteCursor::new(&bytes)).unwrap();
        assert_eq!(h.platform, Platform::Windows);
        assert_eq!(h.version_name(), Some("XNA Game Studio 4.0"));
        assert!(h.is_hidef());
        assert_eq!(h.compression(), Compression::None);
        assert_eq!(h.file_size, 0x40);
        assert_eq!(h.decompressed_size, None);
        assert_eq!(h.len(), 10);
    }

    #[test]
    fn compressed_header_reads_decompressed_size() {
        let h = Header {
            platform: Platform::Xbox360,
            version: 5,
            flags: FLAG_LZX,
            file_size: 1234,
            decompressed_size: Some(99_999),
        };
        assert_eq!(roundtrip(&h), h);
        assert_eq!(h.compression(), Compression::Lzx);
    }

    #[test]
    fn bad_magic() {
        let bytes = *b"BADw\x05\x00\x0a\x00\x00\x00";
        match Header::parse(&mut ByteCursor::new(&bytes)) {
            Err(Error::BadMagic { found }) => assert_eq!(&found, b"BAD"),
            other => panic!("expected BadMagic, got {other:?}"),
        }
    }

    #[test]
    fn both_compression_flags_rejected() {
        let bytes = [b'X', b'N', b'B', b'w', 5, 0xC0, 0, 0, 0, 0, 0, 0, 0, 0];
        assert!(matches!(
            Header::parse(&mut ByteCursor::new(&bytes)),
            Err(Error::InvalidData { offset: 5, .. })
        ));
    }

    #[test]
    fn type_reader_table_roundtrip() {
        let entries = vec![
            TypeReaderEntry {
                name: "Microsoft.Xna.Framework.Content.Texture2DReader, Microsoft.Xna.Framework.Graphics, Version=4.0.0.0".into(),
                version: 0,
            },
            TypeReaderEntry {
                name: "Microsoft.Xna.Framework.Content.Int32Reader".into(),
                version: 1,
            },
        ];
        let mut w = ByteWriter::new();
        TypeReaderEntry::write_table(&entries, &mut w);
        let bytes = w.into_bytes();
        let parsed = TypeReaderEntry::read_table(&mut ByteCursor::new(&bytes)).unwrap();
        assert_eq!(parsed, entries);
    }

    #[test]
    fn truncated_type_reader_table() {
        let mut w = ByteWriter::new();
        w.write_7bit_int(5);
        for name in ["A", "B"] {
            w.write_string(name).write_i32(0);
        }
        let bytes = w.into_bytes();
        assert!(matches!(
            TypeReaderEntry::read_table(&mut ByteCursor::new(&bytes)),
            Err(Error::TruncatedInput { .. })
        ));
    }

    fn any_header() -> impl Strategy<Value = Header> {
        (any::<u8>(), any::<u8>(), any::<u8>(), any::<u32>(), any::<u32>()).prop_map(
            |(platform, version, flags, file_size, dsize)| {
                // At most one compression bit.
                let flags = if flags & FLAG_LZX != 0 { flags & !FLAG_LZ4 } else { flags };
                let compressed = flags & (FLAG_LZX | FLAG_LZ4) != 0;
                Header {
                    platform: Platform::from_byte(platform),
                    version,
                    flags,
                    file_size,
                    decompressed_size: compressed.then_some(dsize),
                }
            },
        )
    }

    proptest! {
        #[test]
        fn header_roundtrip(h in any_header()) {
            prop_assert_eq!(roundtrip(&h), h);
        }
    }
}
