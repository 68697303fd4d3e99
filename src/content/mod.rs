//! Content model and object-graph decoding.
//!
//! | Module       | Purpose |
//! |--------------|---------|
//! | [`asset`]    | [`Asset`] tree produced by decoding |
//! | [`type_name`]| .NET type-name parsing |
//! | [`registry`] | [`Registry`] of [`TypeReader`]s and the per-file [`ReaderTable`] |
//! | [`reader`]   | [`ContentReader`], the decoding session |

pub mod asset;
pub mod reader;
pub mod registry;
pub mod type_name;

pub use asset::{
    Asset, Buffer, BufferKind, Record, Scalar, Sound, Surface, SurfaceFormat, Texture, TextureKind,
};
pub use reader::{ContentReader, ElementReader};
pub use registry::{ReaderTable, Registry, TypeReader};
pub use type_name::TypeName;
