//! Whole-file decoding and encoding.
//!
//! ```text
//! raw bytes ─► Header::parse ─► decompress_payload ─► reader table
//!           ─► shared count ─► ContentReader::read_graph ─► Document
//! ```
//!
//! Decoding is all-or-nothing: any error aborts the pass and no partial
//! [`Document`] is produced.

use log::{info, warn};

use crate::compression::{compress_payload, decompress_payload};
use crate::content::{Asset, ContentReader, ReaderTable, Record, Registry};
use crate::cursor::{ByteCursor, ByteWriter};
use crate::header::{
    Compression, FLAG_HIDEF, FLAG_LZ4, FLAG_LZX, Header, Platform, TypeReaderEntry,
};
use crate::{Error, Result};

/// A fully decoded XNB file.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub header: Header,
    /// The file's type-reader table, in file order.
    pub readers: Vec<TypeReaderEntry>,
    /// The root object; [`Asset::Null`] for an empty root.
    pub primary: Asset,
    /// Shared resources by zero-based slot.
    pub shared: Vec<Asset>,
}

impl Document {
    /// Decode a complete XNB file held in memory.
    ///
    /// Any outer envelope (such as gzip) must already have been removed.
    pub fn decode(data: &[u8], registry: &Registry) -> Result<Self> {
        let mut c = ByteCursor::new(data);
        let header = Header::parse(&mut c)?;
        info!(
            "XNB v{} for {:?}, {} profile, compression {:?}, {} bytes",
            header.version,
            header.platform,
            if header.is_hidef() { "HiDef" } else { "Reach" },
            header.compression(),
            header.file_size
        );
        if let Platform::Unknown(b) = header.platform {
            warn!("unknown target platform {:?}", b as char);
        }
        if header.version_name().is_none() {
            warn!("unknown format version {}", header.version);
        }

        let body = file_body(data, &header)?;
        let payload = decompress_payload(body, &header)?;

        let mut c = ByteCursor::new(&payload);
        let readers = TypeReaderEntry::read_table(&mut c)?;
        for (i, r) in readers.iter().enumerate() {
            info!("type reader {}: {} (version {})", i + 1, r.name, r.version);
        }
        let shared_count = c.read_7bit_int()? as usize;

        let table = ReaderTable::build(readers.iter().map(|r| r.name.as_str()), registry);
        let mut input = ContentReader::new(c, &table, registry);
        let (primary, shared) = input.read_graph(shared_count)?;
        if input.remaining() > 0 {
            warn!("{} bytes left unread after the last object", input.remaining());
        }

        Ok(Self {
            header,
            readers,
            primary,
            shared,
        })
    }

    /// A shared resource by zero-based slot.
    pub fn shared_resource(&self, slot: usize) -> Option<&Asset> {
        self.shared.get(slot)
    }

    /// Copy of `asset` with every shared reference replaced by the referenced
    /// value.
    ///
    /// References back into a slot already being expanded are left as
    /// [`Asset::Shared`]. So is every reference met after
    /// [`MAX_INLINED_NODES`] nodes have been copied out of shared slots.
    pub fn resolve(&self, asset: &Asset) -> Asset {
        Inliner {
            shared: &self.shared,
            expanding: Vec::new(),
            budget: MAX_INLINED_NODES,
        }
        .inline(asset)
    }

    /// The primary object with shared references inlined.
    pub fn resolved_primary(&self) -> Asset {
        self.resolve(&self.primary)
    }
}

/// Limit on nodes copied out of shared slots by one [`Document::resolve`].
pub const MAX_INLINED_NODES: usize = 1 << 20;

struct Inliner<'d> {
    shared: &'d [Asset],
    expanding: Vec<usize>,
    budget: usize,
}

impl Inliner<'_> {
    fn inline(&mut self, asset: &Asset) -> Asset {
        if !self.expanding.is_empty() {
            self.budget = self.budget.saturating_sub(1);
        }
        match asset {
            Asset::Shared(slot) => {
                let shared = self.shared;
                match shared.get(*slot) {
                    Some(target) if self.budget > 0 && !self.expanding.contains(slot) => {
                        self.expanding.push(*slot);
                        let value = self.inline(target);
                        self.expanding.pop();
                        value
                    }
                    _ => asset.clone(),
                }
            }
            Asset::Record(r) => Asset::Record(Record {
                type_name: r.type_name.clone(),
                fields: r
                    .fields
                    .iter()
                    .map(|(name, v)| (name.clone(), self.inline(v)))
                    .collect(),
            }),
            Asset::List(items) => Asset::List(items.iter().map(|v| self.inline(v)).collect()),
            Asset::Map(entries) => Asset::Map(
                entries
                    .iter()
                    .map(|(k, v)| (self.inline(k), self.inline(v)))
                    .collect(),
            ),
            other => other.clone(),
        }
    }
}

/// The bytes after the header, bounded by the declared file size.
fn file_body<'a>(data: &'a [u8], header: &Header) -> Result<&'a [u8]> {
    let declared = header.file_size as usize;
    if declared > data.len() {
        return Err(Error::TruncatedInput {
            offset: 0,
            need: declared,
            have: data.len(),
        });
    }
    if declared < header.len() {
        return Err(Error::invalid(
            6,
            format!("declared file size {declared} is smaller than the header"),
        ));
    }
    if declared < data.len() {
        warn!(
            "{} bytes past the declared file size ignored",
            data.len() - declared
        );
    }
    Ok(&data[header.len()..declared])
}

/// Assembles XNB files from already-serialized objects.
///
/// ```
/// use xnbkit::header::Compression;
/// use xnbkit::xnb::XnbBuilder;
///
/// let mut objects = xnbkit::cursor::ByteWriter::new();
/// objects.write_7bit_int(1).write_i32(42);
/// let file = XnbBuilder::new()
///     .reader("Microsoft.Xna.Framework.Content.Int32Reader", 0)
///     .compression(Compression::Lzx)
///     .build(objects.as_slice())
///     .unwrap();
/// assert_eq!(&file[..3], b"XNB");
/// ```
#[derive(Debug, Clone)]
pub struct XnbBuilder {
    platform: Platform,
    version: u8,
    hidef: bool,
    compression: Compression,
    readers: Vec<TypeReaderEntry>,
    shared_count: u32,
}

impl Default for XnbBuilder {
    fn default() -> Self {
        Self {
            platform: Platform::Windows,
            version: 5,
            hidef: false,
            compression: Compression::None,
            readers: Vec::new(),
            shared_count: 0,
        }
    }
}

impl XnbBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }

    pub fn version(mut self, version: u8) -> Self {
        self.version = version;
        self
    }

    pub fn hidef(mut self, hidef: bool) -> Self {
        self.hidef = hidef;
        self
    }

    pub fn compression(mut self, compression: Compression) -> Self {
        self.compression = compression;
        self
    }

    /// Append a type-reader table entry. Type ids are assigned in call
    /// order, starting at 1.
    pub fn reader(mut self, name: impl Into<String>, version: i32) -> Self {
        self.readers.push(TypeReaderEntry {
            name: name.into(),
            version,
        });
        self
    }

    pub fn shared_count(mut self, count: u32) -> Self {
        self.shared_count = count;
        self
    }

    /// Build the file. `objects` holds the primary object followed by the
    /// shared resources.
    pub fn build(&self, objects: &[u8]) -> Result<Vec<u8>> {
        let mut payload = ByteWriter::with_capacity(objects.len() + 64);
        TypeReaderEntry::write_table(&self.readers, &mut payload);
        payload.write_7bit_int(self.shared_count).write_bytes(objects);
        let flags = if self.hidef { FLAG_HIDEF } else { 0 };
        assemble(
            self.platform,
            self.version,
            flags,
            self.compression,
            payload.as_slice(),
        )
    }
}

/// Re-encode an XNB file with a different payload compression.
pub fn compress_file(data: &[u8], compression: Compression) -> Result<Vec<u8>> {
    let header = Header::parse(&mut ByteCursor::new(data))?;
    let payload = decompress_payload(file_body(data, &header)?, &header)?;
    assemble(
        header.platform,
        header.version,
        header.flags,
        compression,
        &payload,
    )
}

fn assemble(
    platform: Platform,
    version: u8,
    flags: u8,
    compression: Compression,
    payload: &[u8],
) -> Result<Vec<u8>> {
    let too_large = || Error::invalid(0, "payload does not fit in a 32-bit file size");
    let body = compress_payload(payload, compression)?;
    let flags = (flags & !(FLAG_LZX | FLAG_LZ4))
        | match compression {
            Compression::None => 0,
            Compression::Lzx => FLAG_LZX,
            Compression::Lz4 => FLAG_LZ4,
        };
    let decompressed_size = match compression {
        Compression::None => None,
        _ => Some(u32::try_from(payload.len()).map_err(|_| too_large())?),
    };
    let mut header = Header {
        platform,
        version,
        flags,
        file_size: 0,
        decompressed_size,
    };
    header.file_size = u32::try_from(header.len() + body.len()).map_err(|_| too_large())?;

    let mut w = ByteWriter::with_capacity(header.file_size as usize);
    header.write(&mut w);
    w.write_bytes(&body);
    Ok(w.into_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    const INT32: &str = "Microsoft.Xna.Framework.Content.Int32Reader, Microsoft.Xna.Framework";

    fn int_file(compression: Compression) -> Vec<u8> {
        let mut objects = ByteWriter::new();
        objects.write_7bit_int(1).write_i32(42);
        XnbBuilder::new()
            .reader(INT32, 0)
            .compression(compression)
            .build(objects.as_slice())
            .unwrap()
    }

    #[test]
    fn decode_uncompressed() {
        let doc = Document::decode(&int_file(Compression::None), &Registry::with_builtins()).unwrap();
        assert_eq!(doc.primary, Asset::from(42));
        assert_eq!(doc.readers.len(), 1);
        assert!(doc.shared.is_empty());
    }

    #[test]
    fn decode_lzx() {
        let file = int_file(Compression::Lzx);
        assert_eq!(file[5] & FLAG_LZX, FLAG_LZX);
        let doc = Document::decode(&file, &Registry::with_builtins()).unwrap();
        assert_eq!(doc.primary, Asset::from(42));
        assert_eq!(doc.header.compression(), Compression::Lzx);
    }

    #[test]
    fn compress_file_preserves_content() {
        let plain = int_file(Compression::None);
        let packed = compress_file(&plain, Compression::Lzx).unwrap();
        let unpacked = compress_file(&packed, Compression::None).unwrap();
        assert_eq!(unpacked, plain);
    }

    #[test]
    fn declared_size_longer_than_buffer() {
        let mut file = int_file(Compression::None);
        file.pop();
        assert!(matches!(
            Document::decode(&file, &Registry::with_builtins()),
            Err(Error::TruncatedInput { .. })
        ));
    }

    #[test]
    fn trailing_bytes_are_ignored() {
        let mut file = int_file(Compression::None);
        file.extend_from_slice(&[0xEE; 8]);
        let doc = Document::decode(&file, &Registry::with_builtins()).unwrap();
        assert_eq!(doc.primary, Asset::from(42));
    }

    #[test]
    fn resolve_inlines_and_stops_at_cycles() {
        let doc = Document {
            header: Header {
                platform: Platform::Windows,
                version: 5,
                flags: 0,
                file_size: 0,
                decompressed_size: None,
            },
            readers: Vec::new(),
            primary: Asset::List(vec![Asset::Shared(0), Asset::Shared(1)]),
            shared: vec![
                Asset::from("leaf"),
                Asset::from(Record::new("Node").with("next", Asset::Shared(1))),
            ],
        };
        let resolved = doc.resolved_primary();
        let items = resolved.as_list().unwrap();
        assert_eq!(items[0], Asset::from("leaf"));
        let node = items[1].as_record().unwrap();
        assert_eq!(node.get("next"), Some(&Asset::Shared(1)));
    }

    fn count_nodes(asset: &Asset) -> usize {
        1 + match asset {
            Asset::Record(r) => r.fields.iter().map(|(_, v)| count_nodes(v)).sum(),
            Asset::List(items) => items.iter().map(count_nodes).sum(),
            Asset::Map(entries) => entries.iter().map(|(k, v)| count_nodes(k) + count_nodes(v)).sum(),
            _ => 0,
        }
    }

    #[test]
    fn diamond_references_are_bounded() {
        let header = Header {
            platform: Platform::Windows,
            version: 5,
            flags: 0,
            file_size: 0,
            decompressed_size: None,
        };
        // Small diamond: both branches are fully inlined.
        let small = Document {
            header: header.clone(),
            readers: Vec::new(),
            primary: Asset::Shared(0),
            shared: vec![
                Asset::List(vec![Asset::Shared(1), Asset::Shared(1)]),
                Asset::from(3),
            ],
        };
        assert_eq!(
            small.resolved_primary(),
            Asset::List(vec![Asset::from(3), Asset::from(3)])
        );

        // Each slot references the next one twice: 2^40 nodes if fully expanded.
        let depth = 40;
        let mut shared: Vec<Asset> = (0..depth)
            .map(|i| Asset::List(vec![Asset::Shared(i + 1), Asset::Shared(i + 1)]))
            .collect();
        shared.push(Asset::from(1));
        let deep = Document {
            header,
            readers: Vec::new(),
            primary: Asset::Shared(0),
            shared,
        };
        let resolved = deep.resolved_primary();
        assert!(count_nodes(&resolved) <= 2 * MAX_INLINED_NODES + 1);
    }
}
