//! In-memory representation of decoded content.

use std::fmt;

/// A primitive value.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Bool(bool),
    Byte(u8),
    SByte(i8),
    Int16(i16),
    UInt16(u16),
    Int32(i32),
    UInt32(u32),
    Int64(i64),
    UInt64(u64),
    Single(f32),
    Double(f64),
    Char(char),
    String(String),
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Bool(v) => write!(f, "{v}"),
            Scalar::Byte(v) => write!(f, "{v}"),
            Scalar::SByte(v) => write!(f, "{v}"),
            Scalar::Int16(v) => write!(f, "{v}"),
            Scalar::UInt16(v) => write!(f, "{v}"),
            Scalar::Int32(v) => write!(f, "{v}"),
            Scalar::UInt32(v) => write!(f, "{v}"),
            Scalar::Int64(v) => write!(f, "{v}"),
            Scalar::UInt64(v) => write!(f, "{v}"),
            Scalar::Single(v) => write!(f, "{v}"),
            Scalar::Double(v) => write!(f, "{v}"),
            Scalar::Char(v) => write!(f, "{v}"),
            Scalar::String(v) => f.write_str(v),
        }
    }
}

/// GPU surface formats, in the order of the XNA `SurfaceFormat` enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceFormat {
    Color,
    Bgr565,
    Bgra5551,
    Bgra4444,
    Dxt1,
    Dxt3,
    Dxt5,
    NormalizedByte2,
    NormalizedByte4,
    Rgba1010102,
    Rg32,
    Rgba64,
    Alpha8,
    Single,
    Vector2,
    Vector4,
    HalfSingle,
    HalfVector2,
    HalfVector4,
    HdrBlendable,
}

impl SurfaceFormat {
    const ALL: [SurfaceFormat; 20] = [
        SurfaceFormat::Color,
        SurfaceFormat::Bgr565,
        SurfaceFormat::Bgra5551,
        SurfaceFormat::Bgra4444,
        SurfaceFormat::Dxt1,
        SurfaceFormat::Dxt3,
        SurfaceFormat::Dxt5,
        SurfaceFormat::NormalizedByte2,
        SurfaceFormat::NormalizedByte4,
        SurfaceFormat::Rgba1010102,
        SurfaceFormat::Rg32,
        SurfaceFormat::Rgba64,
        SurfaceFormat::Alpha8,
        SurfaceFormat::Single,
        SurfaceFormat::Vector2,
        SurfaceFormat::Vector4,
        SurfaceFormat::HalfSingle,
        SurfaceFormat::HalfVector2,
        SurfaceFormat::HalfVector4,
        SurfaceFormat::HdrBlendable,
    ];

    pub fn from_index(i: i32) -> Option<Self> {
        usize::try_from(i).ok().and_then(|i| Self::ALL.get(i).copied())
    }

    pub fn index(self) -> i32 {
        Self::ALL.iter().position(|&f| f == self).unwrap_or(0) as i32
    }

    pub fn name(self) -> String {
        format!("{self:?}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureKind {
    Texture2D,
    Texture3D,
    TextureCube,
}

/// One mip level (and, for cube maps, one face) of a texture.
#[derive(Debug, Clone, PartialEq)]
pub struct Surface {
    pub level: u32,
    /// Cube face index (0-5), `None` for 2D and 3D textures.
    pub face: Option<u32>,
    pub width: u32,
    pub height: u32,
    /// Number of depth slices stored back to back in `data`.
    pub depth: u32,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Texture {
    pub kind: TextureKind,
    pub format: SurfaceFormat,
    pub width: u32,
    pub height: u32,
    pub depth: u32,
    pub mip_count: u32,
    pub surfaces: Vec<Surface>,
}

/// What a [`Buffer`] holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferKind {
    /// Compiled effect bytecode.
    Effect,
    /// Index data; `true` for 16-bit indices.
    Index { sixteen_bit: bool },
    /// Raw vertex data laid out per the accompanying declaration.
    Vertex,
}

/// An opaque, typed block of bytes.
#[derive(Debug, Clone, PartialEq)]
pub struct Buffer {
    pub kind: BufferKind,
    pub data: Vec<u8>,
}

/// A sound effect: a WAVE `fmt ` chunk plus PCM/ADPCM sample data.
#[derive(Debug, Clone, PartialEq)]
pub struct Sound {
    pub format: Vec<u8>,
    pub data: Vec<u8>,
    pub loop_start: i32,
    pub loop_length: i32,
    pub duration_ms: i32,
}

/// A named collection of fields, used for every structured type.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub type_name: String,
    pub fields: Vec<(String, Asset)>,
}

impl Record {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            fields: Vec::new(),
        }
    }

    /// Append a field.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Asset>) -> Self {
        self.fields.push((name.into(), value.into()));
        self
    }

    pub fn get(&self, name: &str) -> Option<&Asset> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }
}

/// A decoded value.
#[derive(Debug, Clone, PartialEq)]
pub enum Asset {
    /// Null reference or empty root.
    Null,
    Scalar(Scalar),
    Texture(Texture),
    Buffer(Buffer),
    Sound(Sound),
    Record(Record),
    /// Arrays and lists.
    List(Vec<Asset>),
    /// Dictionary entries in stored order.
    Map(Vec<(Asset, Asset)>),
    /// Reference to a shared resource slot (zero-based).
    Shared(usize),
    /// Reference to another content file by asset name.
    External(String),
}

impl Asset {
    pub fn is_null(&self) -> bool {
        matches!(self, Asset::Null)
    }

    pub fn as_scalar(&self) -> Option<&Scalar> {
        match self {
            Asset::Scalar(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Asset::Record(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Asset]> {
        match self {
            Asset::List(items) => Some(items),
            _ => None,
        }
    }

    /// Whether this value, or anything nested in it, carries binary payload
    /// (pixels, samples, bytecode, buffers) rather than plain data.
    pub fn has_payload(&self) -> bool {
        match self {
            Asset::Texture(_) | Asset::Buffer(_) | Asset::Sound(_) => true,
            Asset::Record(r) => r.fields.iter().any(|(_, v)| v.has_payload()),
            Asset::List(items) => items.iter().any(Asset::has_payload),
            Asset::Map(entries) => entries
                .iter()
                .any(|(k, v)| k.has_payload() || v.has_payload()),
            Asset::Null | Asset::Scalar(_) | Asset::Shared(_) | Asset::External(_) => false,
        }
    }

    /// Visit every shared slot referenced by this value.
    pub fn for_each_shared(&self, f: &mut impl FnMut(usize)) {
        match self {
            Asset::Shared(slot) => f(*slot),
            Asset::Record(r) => r.fields.iter().for_each(|(_, v)| v.for_each_shared(f)),
            Asset::List(items) => items.iter().for_each(|v| v.for_each_shared(f)),
            Asset::Map(entries) => entries.iter().for_each(|(k, v)| {
                k.for_each_shared(f);
                v.for_each_shared(f);
            }),
            _ => {}
        }
    }
}

impl From<Scalar> for Asset {
    fn from(s: Scalar) -> Self {
        Asset::Scalar(s)
    }
}

impl From<Record> for Asset {
    fn from(r: Record) -> Self {
        Asset::Record(r)
    }
}

impl From<Texture> for Asset {
    fn from(t: Texture) -> Self {
        Asset::Texture(t)
    }
}

impl From<Buffer> for Asset {
    fn from(b: Buffer) -> Self {
        Asset::Buffer(b)
    }
}

impl From<Vec<Asset>> for Asset {
    fn from(items: Vec<Asset>) -> Self {
        Asset::List(items)
    }
}

macro_rules! scalar_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Asset {
                fn from(v: $ty) -> Self {
                    Asset::Scalar(Scalar::$variant(v.into()))
                }
            }
        )*
    };
}

scalar_from! {
    bool => Bool,
    u8 => Byte,
    i8 => SByte,
    i16 => Int16,
    u16 => UInt16,
    i32 => Int32,
    u32 => UInt32,
    i64 => Int64,
    u64 => UInt64,
    f32 => Single,
    f64 => Double,
    char => Char,
    String => String,
    &str => String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn surface_format_indices() {
        assert_eq!(SurfaceFormat::from_index(0), Some(SurfaceFormat::Color));
        assert_eq!(SurfaceFormat::from_index(6), Some(SurfaceFormat::Dxt5));
        assert_eq!(SurfaceFormat::from_index(20), None);
        assert_eq!(SurfaceFormat::from_index(-1), None);
        assert_eq!(SurfaceFormat::Alpha8.index(), 12);
    }

    #[test]
    fn payload_detection() {
        let plain = Asset::from(Record::new("Point").with("x", 1).with("y", 2));
        assert!(!plain.has_payload());
        let nested = Asset::List(vec![
            plain.clone(),
            Asset::Buffer(Buffer {
                kind: BufferKind::Effect,
                data: vec![1, 2, 3],
            }),
        ]);
        assert!(nested.has_payload());
    }

    #[test]
    fn shared_slots_are_visited() {
        let a = Asset::from(
            Record::new("Part")
                .with("vertices", Asset::Shared(2))
                .with("effect", Asset::List(vec![Asset::Shared(0)])),
        );
        let mut seen = Vec::new();
        a.for_each_shared(&mut |s| seen.push(s));
        assert_eq!(seen, vec![2, 0]);
    }
}
