//! Readers for `Microsoft.Xna.Framework.Graphics` content.
//!
//! ## Texture2D
//! ```text
//! format      i32 (SurfaceFormat)
//! width       u32
//! height      u32
//! mip count   u32
//! mip count × { size: u32, data: [u8; size] }
//! ```
//!
//! Texture3D adds a `depth` field after `height`; each mip then holds all of
//! its depth slices. TextureCube stores a single edge length and six faces,
//! each holding every mip level.
//!
//! ## Model
//! Bone references are a byte when the model has fewer than 255 bones and a
//! u32 otherwise, with 0 meaning "no bone". Vertex buffers, index buffers and
//! effects of mesh parts are shared resources.

use log::debug;

use super::math::{bounding_sphere, matrix, vector3};
use super::{Builtin, add, read_enum_name};
use crate::content::{
    Asset, Buffer, BufferKind, ContentReader, Record, Registry, Surface, SurfaceFormat, Texture,
    TextureKind, TypeName,
};
use crate::{Error, Result};

const VERTEX_ELEMENT_FORMATS: &[&str] = &[
    "Single",
    "Vector2",
    "Vector3",
    "Vector4",
    "Color",
    "Byte4",
    "Short2",
    "Short4",
    "NormalizedShort2",
    "NormalizedShort4",
    "HalfVector2",
    "HalfVector4",
];

const VERTEX_ELEMENT_USAGES: &[&str] = &[
    "Position",
    "Color",
    "TextureCoordinate",
    "Normal",
    "Binormal",
    "Tangent",
    "BlendIndices",
    "BlendWeight",
    "Depth",
    "Fog",
    "PointSize",
    "Sample",
    "TessellateFactor",
];

const COMPARE_FUNCTIONS: &[&str] = &[
    "Always",
    "Never",
    "Less",
    "LessEqual",
    "Equal",
    "GreaterEqual",
    "Greater",
    "NotEqual",
];

pub(super) fn register(registry: &mut Registry) {
    add(registry, "Texture2DReader", Builtin::reference("Microsoft.Xna.Framework.Graphics.Texture2D", read_texture_2d));
    add(registry, "Texture3DReader", Builtin::reference("Microsoft.Xna.Framework.Graphics.Texture3D", read_texture_3d));
    add(registry, "TextureCubeReader", Builtin::reference("Microsoft.Xna.Framework.Graphics.TextureCube", read_texture_cube));
    add(registry, "IndexBufferReader", Builtin::reference("Microsoft.Xna.Framework.Graphics.IndexBuffer", read_index_buffer));
    add(registry, "VertexBufferReader", Builtin::reference("Microsoft.Xna.Framework.Graphics.VertexBuffer", read_vertex_buffer));
    add(
        registry,
        "VertexDeclarationReader",
        Builtin::reference("Microsoft.Xna.Framework.Graphics.VertexDeclaration", |i, _| vertex_declaration(i)),
    );
    add(registry, "EffectReader", Builtin::reference("Microsoft.Xna.Framework.Graphics.Effect", read_effect));
    add(registry, "EffectMaterialReader", Builtin::reference("Microsoft.Xna.Framework.Graphics.EffectMaterial", read_effect_material));
    add(registry, "BasicEffectReader", Builtin::reference("Microsoft.Xna.Framework.Graphics.BasicEffect", read_basic_effect));
    add(registry, "AlphaTestEffectReader", Builtin::reference("Microsoft.Xna.Framework.Graphics.AlphaTestEffect", read_alpha_test_effect));
    add(
        registry,
        "DualTextureEffectReader",
        Builtin::reference("Microsoft.Xna.Framework.Graphics.DualTextureEffect", read_dual_texture_effect),
    );
    add(
        registry,
        "EnvironmentMapEffectReader",
        Builtin::reference("Microsoft.Xna.Framework.Graphics.EnvironmentMapEffect", read_environment_map_effect),
    );
    add(registry, "SkinnedEffectReader", Builtin::reference("Microsoft.Xna.Framework.Graphics.SkinnedEffect", read_skinned_effect));
    add(registry, "SpriteFontReader", Builtin::reference("Microsoft.Xna.Framework.Graphics.SpriteFont", read_sprite_font));
    add(registry, "ModelReader", Builtin::reference("Microsoft.Xna.Framework.Graphics.Model", read_model));
}

fn surface_format(input: &mut ContentReader<'_>) -> Result<SurfaceFormat> {
    let offset = input.position();
    let index = input.read_i32()?;
    SurfaceFormat::from_index(index)
        .ok_or_else(|| Error::invalid(offset, format!("unknown surface format {index}")))
}

fn mip_extent(extent: u32, level: u32) -> u32 {
    extent.checked_shr(level).unwrap_or(0).max(1)
}

fn read_surface(
    input: &mut ContentReader<'_>,
    level: u32,
    face: Option<u32>,
    (width, height, depth): (u32, u32, u32),
) -> Result<Surface> {
    let data = input.read_sized_bytes()?.to_vec();
    Ok(Surface {
        level,
        face,
        width: mip_extent(width, level),
        height: mip_extent(height, level),
        depth: mip_extent(depth, level),
        data,
    })
}

fn read_texture_2d(input: &mut ContentReader<'_>, _instance: &TypeName) -> Result<Asset> {
    let format = surface_format(input)?;
    let width = input.read_u32()?;
    let height = input.read_u32()?;
    let mip_count = input.read_u32()?;
    debug!("Texture2D {width}x{height} {format:?}, {mip_count} mips");
    let mut surfaces = Vec::new();
    for level in 0..mip_count {
        surfaces.push(read_surface(input, level, None, (width, height, 1))?);
    }
    Ok(Texture {
        kind: TextureKind::Texture2D,
        format,
        width,
        height,
        depth: 1,
        mip_count,
        surfaces,
    }
    .into())
}

fn read_texture_3d(input: &mut ContentReader<'_>, _instance: &TypeName) -> Result<Asset> {
    let format = surface_format(input)?;
    let width = input.read_u32()?;
    let height = input.read_u32()?;
    let depth = input.read_u32()?;
    let mip_count = input.read_u32()?;
    debug!("Texture3D {width}x{height}x{depth} {format:?}, {mip_count} mips");
    let mut surfaces = Vec::new();
    for level in 0..mip_count {
        surfaces.push(read_surface(input, level, None, (width, height, depth))?);
    }
    Ok(Texture {
        kind: TextureKind::Texture3D,
        format,
        width,
        height,
        depth,
        mip_count,
        surfaces,
    }
    .into())
}

fn read_texture_cube(input: &mut ContentReader<'_>, _instance: &TypeName) -> Result<Asset> {
    let format = surface_format(input)?;
    let size = input.read_u32()?;
    let mip_count = input.read_u32()?;
    debug!("TextureCube {size}x{size} {format:?}, {mip_count} mips");
    let mut surfaces = Vec::new();
    for face in 0..6 {
        for level in 0..mip_count {
            surfaces.push(read_surface(input, level, Some(face), (size, size, 1))?);
        }
    }
    Ok(Texture {
        kind: TextureKind::TextureCube,
        format,
        width: size,
        height: size,
        depth: 1,
        mip_count,
        surfaces,
    }
    .into())
}

fn read_index_buffer(input: &mut ContentReader<'_>, _instance: &TypeName) -> Result<Asset> {
    let sixteen_bit = input.read_bool()?;
    let data = input.read_sized_bytes()?.to_vec();
    Ok(Buffer {
        kind: BufferKind::Index { sixteen_bit },
        data,
    }
    .into())
}

fn read_vertex_buffer(input: &mut ContentReader<'_>, _instance: &TypeName) -> Result<Asset> {
    let (stride, declaration) = read_declaration(input)?;
    let offset = input.position();
    let vertex_count = input.read_u32()?;
    let size = (stride as usize)
        .checked_mul(vertex_count as usize)
        .ok_or_else(|| Error::invalid(offset, "vertex buffer size overflows"))?;
    let data = input.read_bytes(size)?.to_vec();
    Ok(Record::new("VertexBuffer")
        .with("declaration", declaration)
        .with("vertex_count", vertex_count)
        .with(
            "vertices",
            Buffer {
                kind: BufferKind::Vertex,
                data,
            },
        )
        .into())
}

/// Vertex stride, then the element list.
pub fn vertex_declaration(input: &mut ContentReader<'_>) -> Result<Asset> {
    Ok(read_declaration(input)?.1.into())
}

fn read_declaration(input: &mut ContentReader<'_>) -> Result<(u32, Record)> {
    let stride = input.read_u32()?;
    let count = input.read_u32()? as usize;
    let mut elements = Vec::with_capacity(input.capacity_for(count, 16));
    for _ in 0..count {
        let element = Record::new("VertexElement")
            .with("offset", input.read_u32()?)
            .with(
                "format",
                read_enum_name(input, "vertex element format", VERTEX_ELEMENT_FORMATS)?,
            )
            .with(
                "usage",
                read_enum_name(input, "vertex element usage", VERTEX_ELEMENT_USAGES)?,
            )
            .with("usage_index", input.read_u32()?);
        elements.push(element.into());
    }
    let declaration = Record::new("VertexDeclaration")
        .with("vertex_stride", stride)
        .with("elements", Asset::List(elements));
    Ok((stride, declaration))
}

fn read_effect(input: &mut ContentReader<'_>, _instance: &TypeName) -> Result<Asset> {
    let data = input.read_sized_bytes()?.to_vec();
    Ok(Buffer {
        kind: BufferKind::Effect,
        data,
    }
    .into())
}

fn read_effect_material(input: &mut ContentReader<'_>, _instance: &TypeName) -> Result<Asset> {
    Ok(Record::new("EffectMaterial")
        .with("effect", input.read_external_reference()?)
        .with("parameters", input.read_object()?)
        .into())
}

fn read_basic_effect(input: &mut ContentReader<'_>, _instance: &TypeName) -> Result<Asset> {
    Ok(Record::new("BasicEffect")
        .with("texture", input.read_external_reference()?)
        .with("diffuse_color", vector3(input)?)
        .with("emissive_color", vector3(input)?)
        .with("specular_color", vector3(input)?)
        .with("specular_power", input.read_f32()?)
        .with("alpha", input.read_f32()?)
        .with("vertex_color_enabled", input.read_bool()?)
        .into())
}

fn read_alpha_test_effect(input: &mut ContentReader<'_>, _instance: &TypeName) -> Result<Asset> {
    Ok(Record::new("AlphaTestEffect")
        .with("texture", input.read_external_reference()?)
        .with(
            "compare_function",
            read_enum_name(input, "compare function", COMPARE_FUNCTIONS)?,
        )
        .with("reference_alpha", input.read_u32()?)
        .with("diffuse_color", vector3(input)?)
        .with("alpha", input.read_f32()?)
        .with("vertex_color_enabled", input.read_bool()?)
        .into())
}

fn read_dual_texture_effect(input: &mut ContentReader<'_>, _instance: &TypeName) -> Result<Asset> {
    Ok(Record::new("DualTextureEffect")
        .with("texture1", input.read_external_reference()?)
        .with("texture2", input.read_external_reference()?)
        .with("diffuse_color", vector3(input)?)
        .with("alpha", input.read_f32()?)
        .with("vertex_color_enabled", input.read_bool()?)
        .into())
}

fn read_environment_map_effect(input: &mut ContentReader<'_>, _instance: &TypeName) -> Result<Asset> {
    Ok(Record::new("EnvironmentMapEffect")
        .with("texture", input.read_external_reference()?)
        .with("environment_map", input.read_external_reference()?)
        .with("environment_map_amount", input.read_f32()?)
        .with("environment_map_specular", vector3(input)?)
        .with("fresnel_factor", input.read_f32()?)
        .with("diffuse_color", vector3(input)?)
        .with("emissive_color", vector3(input)?)
        .with("alpha", input.read_f32()?)
        .into())
}

fn read_skinned_effect(input: &mut ContentReader<'_>, _instance: &TypeName) -> Result<Asset> {
    Ok(Record::new("SkinnedEffect")
        .with("texture", input.read_external_reference()?)
        .with("weights_per_vertex", input.read_u32()?)
        .with("diffuse_color", vector3(input)?)
        .with("emissive_color", vector3(input)?)
        .with("specular_color", vector3(input)?)
        .with("specular_power", input.read_f32()?)
        .with("alpha", input.read_f32()?)
        .into())
}

fn read_sprite_font(input: &mut ContentReader<'_>, _instance: &TypeName) -> Result<Asset> {
    let texture = input.read_object()?;
    let glyphs = input.read_object()?;
    let cropping = input.read_object()?;
    let characters = input.read_object()?;
    let line_spacing = input.read_i32()?;
    let spacing = input.read_f32()?;
    let kerning = input.read_object()?;
    let default_char = if input.read_bool()? {
        Asset::from(input.read_char()?)
    } else {
        Asset::Null
    };
    Ok(Record::new("SpriteFont")
        .with("texture", texture)
        .with("glyphs", glyphs)
        .with("cropping", cropping)
        .with("characters", characters)
        .with("line_spacing", line_spacing)
        .with("spacing", spacing)
        .with("kerning", kerning)
        .with("default_character", default_char)
        .into())
}

/// Bone index stored with a width that depends on the bone count; 0 means
/// none, otherwise index + 1.
fn read_bone_ref(input: &mut ContentReader<'_>, bone_count: u32) -> Result<Asset> {
    let offset = input.position();
    let raw = if bone_count < 255 {
        input.read_u8()? as u32
    } else {
        input.read_u32()?
    };
    if raw == 0 {
        return Ok(Asset::Null);
    }
    if raw > bone_count {
        return Err(Error::invalid(
            offset,
            format!("bone reference {raw} exceeds bone count {bone_count}"),
        ));
    }
    Ok(Asset::from(raw - 1))
}

fn read_model(input: &mut ContentReader<'_>, _instance: &TypeName) -> Result<Asset> {
    let bone_count = input.read_u32()?;
    let mut bones = Vec::with_capacity(input.capacity_for(bone_count as usize, 65));
    for _ in 0..bone_count {
        let name = input.read_object()?;
        let transform = matrix(input)?;
        bones.push(Record::new("ModelBone").with("name", name).with("transform", transform));
    }
    for bone in &mut bones {
        let parent = read_bone_ref(input, bone_count)?;
        let child_count = input.read_u32()?;
        let mut children = Vec::new();
        for _ in 0..child_count {
            children.push(read_bone_ref(input, bone_count)?);
        }
        bone.fields.push(("parent".into(), parent));
        bone.fields.push(("children".into(), Asset::List(children)));
    }

    let mesh_count = input.read_u32()?;
    let mut meshes = Vec::new();
    for _ in 0..mesh_count {
        let name = input.read_object()?;
        let parent_bone = read_bone_ref(input, bone_count)?;
        let bounds = bounding_sphere(input)?;
        let tag = input.read_object()?;
        let part_count = input.read_u32()?;
        let mut parts = Vec::new();
        for _ in 0..part_count {
            let part = Record::new("ModelMeshPart")
                .with("vertex_offset", input.read_u32()?)
                .with("num_vertices", input.read_u32()?)
                .with("start_index", input.read_u32()?)
                .with("primitive_count", input.read_u32()?)
                .with("tag", input.read_object()?)
                .with("vertex_buffer", input.read_shared_resource()?)
                .with("index_buffer", input.read_shared_resource()?)
                .with("effect", input.read_shared_resource()?);
            parts.push(part.into());
        }
        meshes.push(
            Record::new("ModelMesh")
                .with("name", name)
                .with("parent_bone", parent_bone)
                .with("bounds", bounds)
                .with("tag", tag)
                .with("parts", Asset::List(parts))
                .into(),
        );
    }

    let root_bone = read_bone_ref(input, bone_count)?;
    let tag = input.read_object()?;
    Ok(Record::new("Model")
        .with("bones", Asset::List(bones.into_iter().map(Asset::from).collect()))
        .with("meshes", Asset::List(meshes))
        .with("root_bone", root_bone)
        .with("tag", tag)
        .into())
}
