//! Writing decoded documents to disk.
//!
//! The primary object is exported under the base name `primary` and shared
//! resource *i* under `shared_<i>`. Each value picks its own artifact:
//!
//! | Value                             | Artifact |
//! |-----------------------------------|----------|
//! | null                              | nothing |
//! | scalar, string                    | `<base>.txt` |
//! | record/list/map without payload   | `<base>.json` |
//! | texture                           | one image per surface: `<base>_mip<N>`, `_mip<N>_z<Z>`, `_mip<N>_face<F>` |
//! | sound effect                      | `<base>.wav` |
//! | effect bytecode, raw buffers      | `<base>.bin` |
//! | record/list/map with payload      | directory `<base>/`, one entry per field or index |
//!
//! Surfaces whose format cannot be converted, or any surface when no
//! [`ImageWriter`] is installed, are written raw as `.bin`.

use std::ffi::OsString;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use serde_json::{Map, Value, json};

use crate::content::{Asset, BufferKind, Record, Scalar, Sound, Texture, TextureKind};
use crate::cursor::ByteWriter;
use crate::pixels;
use crate::xnb::Document;
use crate::{Error, Result};

/// Name of the optional manifest written next to the artifacts. Nothing is
/// written, manifest included, for a document whose values are all null.
pub const MANIFEST_NAME: &str = "index.json";

/// Exporter settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExportOptions {
    /// Write [`MANIFEST_NAME`] describing the header, readers and decoded
    /// tree.
    pub write_manifest: bool,
    /// Replace existing files instead of failing.
    pub overwrite: bool,
}

/// Encodes RGBA8 pixels into an image file format.
pub trait ImageWriter: Send + Sync {
    /// File extension without the dot.
    fn extension(&self) -> &'static str;

    fn encode_rgba8(&self, width: u32, height: u32, rgba: &[u8]) -> Result<Vec<u8>>;
}

/// PNG output through the `png` crate.
#[cfg(feature = "png")]
#[derive(Debug, Clone, Copy, Default)]
pub struct PngWriter;

#[cfg(feature = "png")]
impl ImageWriter for PngWriter {
    fn extension(&self) -> &'static str {
        "png"
    }

    fn encode_rgba8(&self, width: u32, height: u32, rgba: &[u8]) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        let mut encoder = png::Encoder::new(&mut out, width, height);
        encoder.set_color(png::ColorType::Rgba);
        encoder.set_depth(png::BitDepth::Eight);
        let mut writer = encoder
            .write_header()
            .map_err(|e| Error::Png(e.to_string()))?;
        writer
            .write_image_data(rgba)
            .map_err(|e| Error::Png(e.to_string()))?;
        writer.finish().map_err(|e| Error::Png(e.to_string()))?;
        Ok(out)
    }
}

/// Writes the artifacts of a [`Document`] into a directory.
pub struct AssetExporter {
    options: ExportOptions,
    images: Option<Box<dyn ImageWriter>>,
}

impl AssetExporter {
    /// An exporter using PNG for images when the `png` feature is enabled.
    pub fn new(options: ExportOptions) -> Self {
        #[cfg(feature = "png")]
        let images: Option<Box<dyn ImageWriter>> = Some(Box::new(PngWriter));
        #[cfg(not(feature = "png"))]
        let images: Option<Box<dyn ImageWriter>> = None;
        Self { options, images }
    }

    /// Use `writer` for converted surfaces.
    pub fn with_image_writer(mut self, writer: impl ImageWriter + 'static) -> Self {
        self.images = Some(Box::new(writer));
        self
    }

    /// Write every surface raw.
    pub fn without_images(mut self) -> Self {
        self.images = None;
        self
    }

    /// Export `doc` into `out_dir`, creating it as needed. Returns the paths
    /// written, in order.
    pub fn export(&self, doc: &Document, out_dir: &Path) -> Result<Vec<PathBuf>> {
        fs::create_dir_all(out_dir)?;
        let mut session = Session {
            exporter: self,
            written: Vec::new(),
        };
        session.value(&doc.primary, &out_dir.join("primary"))?;
        for (i, asset) in doc.shared.iter().enumerate() {
            session.value(asset, &out_dir.join(format!("shared_{i}")))?;
        }

        let empty = doc.primary.is_null() && doc.shared.iter().all(Asset::is_null);
        if self.options.write_manifest && !empty {
            let files: Vec<String> = session
                .written
                .iter()
                .filter_map(|p| p.strip_prefix(out_dir).ok())
                .map(|p| p.to_string_lossy().replace('\\', "/"))
                .collect();
            let manifest = json!({
                "header": doc.header,
                "readers": doc.readers,
                "primary": to_json(&doc.primary),
                "shared": doc.shared.iter().map(to_json).collect::<Vec<_>>(),
                "files": files,
            });
            let text = serde_json::to_string_pretty(&manifest)
                .map_err(|e| Error::Json(e.to_string()))?;
            session.write(&out_dir.join(MANIFEST_NAME), text.as_bytes())?;
        }

        info!(
            "exported {} files to {}",
            session.written.len(),
            out_dir.display()
        );
        Ok(session.written)
    }
}

impl Default for AssetExporter {
    fn default() -> Self {
        Self::new(ExportOptions::default())
    }
}

struct Session<'e> {
    exporter: &'e AssetExporter,
    written: Vec<PathBuf>,
}

impl Session<'_> {
    fn value(&mut self, asset: &Asset, base: &Path) -> Result<()> {
        match asset {
            Asset::Null => Ok(()),
            Asset::Scalar(s) => self.write(&suffixed(base, ".txt"), s.to_string().as_bytes()),
            Asset::Texture(t) => self.texture(t, base),
            Asset::Sound(s) => self.write(&suffixed(base, ".wav"), &wav_bytes(s)),
            Asset::Buffer(b) => self.write(&suffixed(base, ".bin"), &b.data),
            Asset::Record(r) if asset.has_payload() => {
                for (name, field) in &r.fields {
                    self.value(field, &base.join(name))?;
                }
                Ok(())
            }
            Asset::List(items) if asset.has_payload() => {
                for (i, item) in items.iter().enumerate() {
                    self.value(item, &base.join(i.to_string()))?;
                }
                Ok(())
            }
            Asset::Map(entries) if asset.has_payload() => {
                for (i, (k, v)) in entries.iter().enumerate() {
                    let dir = base.join(i.to_string());
                    self.value(k, &dir.join("key"))?;
                    self.value(v, &dir.join("value"))?;
                }
                Ok(())
            }
            Asset::Record(_)
            | Asset::List(_)
            | Asset::Map(_)
            | Asset::Shared(_)
            | Asset::External(_) => {
                let text = serde_json::to_string_pretty(&to_json(asset))
                    .map_err(|e| Error::Json(e.to_string()))?;
                self.write(&suffixed(base, ".json"), text.as_bytes())
            }
        }
    }

    fn texture(&mut self, t: &Texture, base: &Path) -> Result<()> {
        let exporter = self.exporter;
        let images = exporter
            .images
            .as_deref()
            .filter(|_| pixels::is_convertible(t.format));
        if images.is_none() {
            warn!("{:?} surfaces of {} written raw", t.format, base.display());
        }

        for surface in &t.surfaces {
            let name = match (t.kind, surface.face) {
                (TextureKind::TextureCube, Some(face)) => {
                    format!("_mip{}_face{face}", surface.level)
                }
                _ => format!("_mip{}", surface.level),
            };
            let sliced = t.kind == TextureKind::Texture3D;
            let depth = surface.depth.max(1) as usize;
            let len = surface.data.len();
            if sliced && (len == 0 || len % depth != 0) {
                warn!(
                    "surface {name} of {} holds {len} bytes for {depth} slices; written raw",
                    base.display()
                );
                self.write(&suffixed(base, &format!("{name}.bin")), &surface.data)?;
                continue;
            }
            let slices = if sliced { depth } else { 1 };
            let slice_len = len / slices;

            for z in 0..slices {
                let stem = if sliced {
                    format!("{name}_z{z}")
                } else {
                    name.clone()
                };
                let start = z * slice_len;
                let data = &surface.data[start..start + slice_len];
                let encoded = match images {
                    Some(writer) => {
                        match pixels::to_rgba8(t.format, surface.width, surface.height, data) {
                            Some(rgba) => Some((
                                writer.encode_rgba8(surface.width, surface.height, &rgba)?,
                                writer.extension(),
                            )),
                            None => {
                                warn!(
                                    "surface {stem} of {} is shorter than its dimensions; written raw",
                                    base.display()
                                );
                                None
                            }
                        }
                    }
                    None => None,
                };
                match encoded {
                    Some((bytes, ext)) => {
                        self.write(&suffixed(base, &format!("{stem}.{ext}")), &bytes)?
                    }
                    None => self.write(&suffixed(base, &format!("{stem}.bin")), data)?,
                }
            }
        }
        Ok(())
    }

    fn write(&mut self, path: &Path, bytes: &[u8]) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut file = if self.exporter.options.overwrite {
            fs::File::create(path)?
        } else {
            OpenOptions::new().write(true).create_new(true).open(path)?
        };
        file.write_all(bytes)?;
        debug!("wrote {} ({} bytes)", path.display(), bytes.len());
        self.written.push(path.to_path_buf());
        Ok(())
    }
}

/// `base` with `suffix` appended to its final component.
fn suffixed(base: &Path, suffix: &str) -> PathBuf {
    let mut s = OsString::from(base.as_os_str());
    s.push(suffix);
    PathBuf::from(s)
}

/// A RIFF/WAVE file around the stored `fmt ` chunk and sample data.
pub fn wav_bytes(sound: &Sound) -> Vec<u8> {
    let pad = sound.format.len() % 2;
    let riff_len = 4 + 8 + sound.format.len() + pad + 8 + sound.data.len();
    let mut w = ByteWriter::with_capacity(riff_len + 8);
    w.write_bytes(b"RIFF")
        .write_u32(riff_len as u32)
        .write_bytes(b"WAVE")
        .write_bytes(b"fmt ")
        .write_u32(sound.format.len() as u32)
        .write_bytes(&sound.format);
    if pad == 1 {
        w.write_u8(0);
    }
    w.write_bytes(b"data")
        .write_u32(sound.data.len() as u32)
        .write_bytes(&sound.data);
    w.into_bytes()
}

/// JSON view of a value. Binary payloads are summarized, not embedded.
pub fn to_json(asset: &Asset) -> Value {
    match asset {
        Asset::Null => Value::Null,
        Asset::Scalar(s) => scalar_json(s),
        Asset::Record(r) => record_json(r),
        Asset::List(items) => Value::Array(items.iter().map(to_json).collect()),
        Asset::Map(entries) => {
            let string_keys = entries
                .iter()
                .all(|(k, _)| matches!(k, Asset::Scalar(Scalar::String(_))));
            if string_keys {
                let mut map = Map::new();
                for (k, v) in entries {
                    if let Asset::Scalar(Scalar::String(key)) = k {
                        map.insert(key.clone(), to_json(v));
                    }
                }
                Value::Object(map)
            } else {
                Value::Array(
                    entries
                        .iter()
                        .map(|(k, v)| json!({ "key": to_json(k), "value": to_json(v) }))
                        .collect(),
                )
            }
        }
        Asset::Shared(slot) => json!({ "$shared": slot }),
        Asset::External(name) => json!({ "$external": name }),
        Asset::Texture(t) => json!({
            "$texture": {
                "kind": format!("{:?}", t.kind),
                "format": t.format.name(),
                "width": t.width,
                "height": t.height,
                "depth": t.depth,
                "mip_count": t.mip_count,
            }
        }),
        Asset::Buffer(b) => {
            let kind = match b.kind {
                BufferKind::Effect => "effect",
                BufferKind::Index { sixteen_bit: true } => "index16",
                BufferKind::Index { sixteen_bit: false } => "index32",
                BufferKind::Vertex => "vertex",
            };
            json!({ "$buffer": { "kind": kind, "bytes": b.data.len() } })
        }
        Asset::Sound(s) => json!({
            "$sound": {
                "bytes": s.data.len(),
                "loop_start": s.loop_start,
                "loop_length": s.loop_length,
                "duration_ms": s.duration_ms,
            }
        }),
    }
}

fn scalar_json(s: &Scalar) -> Value {
    match s {
        Scalar::Bool(v) => json!(v),
        Scalar::Byte(v) => json!(v),
        Scalar::SByte(v) => json!(v),
        Scalar::Int16(v) => json!(v),
        Scalar::UInt16(v) => json!(v),
        Scalar::Int32(v) => json!(v),
        Scalar::UInt32(v) => json!(v),
        Scalar::Int64(v) => json!(v),
        Scalar::UInt64(v) => json!(v),
        // Non-finite floats become null.
        Scalar::Single(v) => json!(v),
        Scalar::Double(v) => json!(v),
        Scalar::Char(v) => json!(v.to_string()),
        Scalar::String(v) => json!(v),
    }
}

fn record_json(r: &Record) -> Value {
    let mut map = Map::new();
    map.insert("$type".into(), Value::String(r.type_name.clone()));
    for (name, value) in &r.fields {
        map.insert(name.clone(), to_json(value));
    }
    Value::Object(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::{Buffer, Surface, SurfaceFormat};
    use crate::header::{Header, Platform};

    fn doc(primary: Asset, shared: Vec<Asset>) -> Document {
        Document {
            header: Header {
                platform: Platform::Windows,
                version: 5,
                flags: 0,
                file_size: 0,
                decompressed_size: None,
            },
            readers: Vec::new(),
            primary,
            shared,
        }
    }

    fn names(dir: &Path, written: &[PathBuf]) -> Vec<String> {
        written
            .iter()
            .map(|p| p.strip_prefix(dir).unwrap().to_string_lossy().replace('\\', "/"))
            .collect()
    }

    #[test]
    fn scalar_and_null() {
        let dir = tempfile::tempdir().unwrap();
        let written = AssetExporter::default()
            .export(&doc(Asset::from(42), vec![Asset::Null]), dir.path())
            .unwrap();
        assert_eq!(names(dir.path(), &written), vec!["primary.txt"]);
        assert_eq!(fs::read_to_string(&written[0]).unwrap(), "42");
    }

    #[test]
    fn records_with_payload_become_directories() {
        let dir = tempfile::tempdir().unwrap();
        let primary = Asset::from(
            Record::new("Thing")
                .with("name", "crate")
                .with("bounds", Record::new("Point").with("x", 1).with("y", 2))
                .with(
                    "shader",
                    Buffer {
                        kind: BufferKind::Effect,
                        data: vec![0xDE, 0xAD],
                    },
                )
                .with("missing", Asset::Null),
        );
        let written = AssetExporter::default()
            .export(&doc(primary, vec![Asset::from(Record::new("Empty"))]), dir.path())
            .unwrap();
        assert_eq!(
            names(dir.path(), &written),
            vec![
                "primary/name.txt",
                "primary/bounds.json",
                "primary/shader.bin",
                "shared_0.json",
            ]
        );
        let bounds: Value =
            serde_json::from_str(&fs::read_to_string(dir.path().join("primary/bounds.json")).unwrap())
                .unwrap();
        assert_eq!(bounds["$type"], "Point");
        assert_eq!(bounds["y"], 2);
    }

    #[test]
    fn texture_surfaces() {
        let dir = tempfile::tempdir().unwrap();
        let texture = Texture {
            kind: TextureKind::Texture3D,
            format: SurfaceFormat::Vector4,
            width: 1,
            height: 1,
            depth: 2,
            mip_count: 1,
            surfaces: vec![Surface {
                level: 0,
                face: None,
                width: 1,
                height: 1,
                depth: 2,
                data: vec![0; 32],
            }],
        };
        let written = AssetExporter::default()
            .export(&doc(texture.into(), vec![]), dir.path())
            .unwrap();
        assert_eq!(
            names(dir.path(), &written),
            vec!["primary_mip0_z0.bin", "primary_mip0_z1.bin"]
        );
    }

    fn volume(depth: u32, data: Vec<u8>) -> Asset {
        Texture {
            kind: TextureKind::Texture3D,
            format: SurfaceFormat::Color,
            width: 1,
            height: 1,
            depth,
            mip_count: 1,
            surfaces: vec![Surface {
                level: 0,
                face: None,
                width: 1,
                height: 1,
                depth,
                data,
            }],
        }
        .into()
    }

    #[test]
    fn volume_depth_larger_than_data_is_written_once() {
        let dir = tempfile::tempdir().unwrap();
        let written = AssetExporter::default()
            .export(&doc(volume(200_000, vec![]), vec![]), dir.path())
            .unwrap();
        assert_eq!(names(dir.path(), &written), vec!["primary_mip0.bin"]);
    }

    #[test]
    fn volume_with_ragged_slices_keeps_every_byte() {
        let dir = tempfile::tempdir().unwrap();
        let written = AssetExporter::default()
            .export(&doc(volume(3, vec![7; 10]), vec![]), dir.path())
            .unwrap();
        assert_eq!(names(dir.path(), &written), vec!["primary_mip0.bin"]);
        assert_eq!(fs::read(&written[0]).unwrap(), vec![7; 10]);
    }

    #[test]
    fn null_document_writes_no_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let options = ExportOptions {
            write_manifest: true,
            overwrite: false,
        };
        let written = AssetExporter::new(options)
            .export(&doc(Asset::Null, vec![Asset::Null]), dir.path())
            .unwrap();
        assert!(written.is_empty());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn json_error_message() {
        let err = Error::Json("key must be a string".into());
        assert_eq!(err.to_string(), "json serialization failed: key must be a string");
    }

    #[cfg(feature = "png")]
    #[test]
    fn color_texture_to_png() {
        let dir = tempfile::tempdir().unwrap();
        let texture = Texture {
            kind: TextureKind::TextureCube,
            format: SurfaceFormat::Color,
            width: 1,
            height: 1,
            depth: 1,
            mip_count: 1,
            surfaces: (0..6)
                .map(|face| Surface {
                    level: 0,
                    face: Some(face),
                    width: 1,
                    height: 1,
                    depth: 1,
                    data: vec![255, 0, 0, 255],
                })
                .collect(),
        };
        let written = AssetExporter::default()
            .export(&doc(texture.into(), vec![]), dir.path())
            .unwrap();
        assert_eq!(written.len(), 6);
        assert!(written[5].ends_with("primary_mip0_face5.png"));
        let bytes = fs::read(&written[0]).unwrap();
        assert_eq!(&bytes[1..4], b"PNG");
    }

    #[test]
    fn wav_header() {
        let sound = Sound {
            format: vec![1, 0, 1, 0, 0x44, 0xAC, 0, 0, 0x88, 0x58, 1, 0, 2, 0, 16, 0],
            data: vec![0; 10],
            loop_start: 0,
            loop_length: 0,
            duration_ms: 0,
        };
        let wav = wav_bytes(&sound);
        assert_eq!(&wav[..4], b"RIFF");
        assert_eq!(u32::from_le_bytes(wav[4..8].try_into().unwrap()) as usize, wav.len() - 8);
        assert_eq!(&wav[12..16], b"fmt ");
        assert_eq!(&wav[36..40], b"data");
    }

    #[test]
    fn refuses_to_overwrite_without_option() {
        let dir = tempfile::tempdir().unwrap();
        let d = doc(Asset::from("x"), vec![]);
        AssetExporter::default().export(&d, dir.path()).unwrap();
        assert!(matches!(
            AssetExporter::default().export(&d, dir.path()),
            Err(Error::Io(_))
        ));
        let options = ExportOptions {
            overwrite: true,
            ..Default::default()
        };
        AssetExporter::new(options).export(&d, dir.path()).unwrap();
    }

    #[test]
    fn manifest_marks_shared_references() {
        let dir = tempfile::tempdir().unwrap();
        let options = ExportOptions {
            write_manifest: true,
            overwrite: false,
        };
        let d = doc(Asset::List(vec![Asset::Shared(0)]), vec![Asset::from(7)]);
        let written = AssetExporter::new(options).export(&d, dir.path()).unwrap();
        assert_eq!(written.last().unwrap().file_name().unwrap(), MANIFEST_NAME);
        let manifest: Value =
            serde_json::from_str(&fs::read_to_string(written.last().unwrap()).unwrap()).unwrap();
        assert_eq!(manifest["primary"][0]["$shared"], 0);
        assert_eq!(manifest["shared"][0], 7);
        assert_eq!(manifest["header"]["version"], 5);
    }
}
