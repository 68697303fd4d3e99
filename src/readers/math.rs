//! Readers for the `Microsoft.Xna.Framework` math types.
//!
//! The helpers are public so custom readers can decode embedded math values
//! the same way the built-in graphics readers do.

use super::{Builtin, add, read_enum_name};
use crate::content::{Asset, ContentReader, Record, Registry, TypeName};
use crate::Result;

const CURVE_LOOP_TYPES: &[&str] = &["Constant", "Cycle", "CycleOffset", "Oscillate", "Linear"];

pub(super) fn register(registry: &mut Registry) {
    add(registry, "Vector2Reader", Builtin::value("Microsoft.Xna.Framework.Vector2", |i, _| vector2(i)));
    add(registry, "Vector3Reader", Builtin::value("Microsoft.Xna.Framework.Vector3", |i, _| vector3(i)));
    add(registry, "Vector4Reader", Builtin::value("Microsoft.Xna.Framework.Vector4", |i, _| vector4(i)));
    add(registry, "MatrixReader", Builtin::value("Microsoft.Xna.Framework.Matrix", |i, _| matrix(i)));
    add(registry, "QuaternionReader", Builtin::value("Microsoft.Xna.Framework.Quaternion", read_quaternion));
    add(registry, "ColorReader", Builtin::value("Microsoft.Xna.Framework.Color", |i, _| color(i)));
    add(registry, "PlaneReader", Builtin::value("Microsoft.Xna.Framework.Plane", read_plane));
    add(registry, "PointReader", Builtin::value("Microsoft.Xna.Framework.Point", read_point));
    add(registry, "RectangleReader", Builtin::value("Microsoft.Xna.Framework.Rectangle", |i, _| rectangle(i)));
    add(registry, "BoundingBoxReader", Builtin::value("Microsoft.Xna.Framework.BoundingBox", read_bounding_box));
    add(
        registry,
        "BoundingSphereReader",
        Builtin::value("Microsoft.Xna.Framework.BoundingSphere", |i, _| bounding_sphere(i)),
    );
    add(
        registry,
        "BoundingFrustumReader",
        Builtin::reference("Microsoft.Xna.Framework.BoundingFrustum", read_bounding_frustum),
    );
    add(registry, "RayReader", Builtin::value("Microsoft.Xna.Framework.Ray", read_ray));
    add(registry, "CurveReader", Builtin::reference("Microsoft.Xna.Framework.Curve", read_curve));
}

pub fn vector2(input: &mut ContentReader<'_>) -> Result<Asset> {
    Ok(Record::new("Vector2")
        .with("x", input.read_f32()?)
        .with("y", input.read_f32()?)
        .into())
}

pub fn vector3(input: &mut ContentReader<'_>) -> Result<Asset> {
    Ok(Record::new("Vector3")
        .with("x", input.read_f32()?)
        .with("y", input.read_f32()?)
        .with("z", input.read_f32()?)
        .into())
}

pub fn vector4(input: &mut ContentReader<'_>) -> Result<Asset> {
    Ok(Record::new("Vector4")
        .with("x", input.read_f32()?)
        .with("y", input.read_f32()?)
        .with("z", input.read_f32()?)
        .with("w", input.read_f32()?)
        .into())
}

/// Sixteen floats, row-major, as four rows of four.
pub fn matrix(input: &mut ContentReader<'_>) -> Result<Asset> {
    let mut rows = Vec::with_capacity(4);
    for _ in 0..4 {
        let mut row = Vec::with_capacity(4);
        for _ in 0..4 {
            row.push(input.read_f32()?.into());
        }
        rows.push(Asset::List(row));
    }
    Ok(Asset::List(rows))
}

pub fn color(input: &mut ContentReader<'_>) -> Result<Asset> {
    Ok(Record::new("Color")
        .with("r", input.read_u8()?)
        .with("g", input.read_u8()?)
        .with("b", input.read_u8()?)
        .with("a", input.read_u8()?)
        .into())
}

pub fn rectangle(input: &mut ContentReader<'_>) -> Result<Asset> {
    Ok(Record::new("Rectangle")
        .with("x", input.read_i32()?)
        .with("y", input.read_i32()?)
        .with("width", input.read_i32()?)
        .with("height", input.read_i32()?)
        .into())
}

pub fn bounding_sphere(input: &mut ContentReader<'_>) -> Result<Asset> {
    Ok(Record::new("BoundingSphere")
        .with("center", vector3(input)?)
        .with("radius", input.read_f32()?)
        .into())
}

fn read_quaternion(input: &mut ContentReader<'_>, _instance: &TypeName) -> Result<Asset> {
    Ok(Record::new("Quaternion")
        .with("x", input.read_f32()?)
        .with("y", input.read_f32()?)
        .with("z", input.read_f32()?)
        .with("w", input.read_f32()?)
        .into())
}

fn read_plane(input: &mut ContentReader<'_>, _instance: &TypeName) -> Result<Asset> {
    Ok(Record::new("Plane")
        .with("normal", vector3(input)?)
        .with("d", input.read_f32()?)
        .into())
}

fn read_point(input: &mut ContentReader<'_>, _instance: &TypeName) -> Result<Asset> {
    Ok(Record::new("Point")
        .with("x", input.read_i32()?)
        .with("y", input.read_i32()?)
        .into())
}

fn read_bounding_box(input: &mut ContentReader<'_>, _instance: &TypeName) -> Result<Asset> {
    Ok(Record::new("BoundingBox")
        .with("min", vector3(input)?)
        .with("max", vector3(input)?)
        .into())
}

fn read_bounding_frustum(input: &mut ContentReader<'_>, _instance: &TypeName) -> Result<Asset> {
    Ok(Record::new("BoundingFrustum")
        .with("matrix", matrix(input)?)
        .into())
}

fn read_ray(input: &mut ContentReader<'_>, _instance: &TypeName) -> Result<Asset> {
    Ok(Record::new("Ray")
        .with("position", vector3(input)?)
        .with("direction", vector3(input)?)
        .into())
}

fn read_curve(input: &mut ContentReader<'_>, _instance: &TypeName) -> Result<Asset> {
    let pre_loop = read_enum_name(input, "curve loop type", CURVE_LOOP_TYPES)?;
    let post_loop = read_enum_name(input, "curve loop type", CURVE_LOOP_TYPES)?;
    let count = input.read_u32()? as usize;
    let mut keys = Vec::with_capacity(input.capacity_for(count, 20));
    for _ in 0..count {
        let key = Record::new("CurveKey")
            .with("position", input.read_f32()?)
            .with("value", input.read_f32()?)
            .with("tangent_in", input.read_f32()?)
            .with("tangent_out", input.read_f32()?)
            .with(
                "continuity",
                if input.read_i32()? == 0 { "Smooth" } else { "Step" },
            );
        keys.push(key.into());
    }
    Ok(Record::new("Curve")
        .with("pre_loop", pre_loop)
        .with("post_loop", post_loop)
        .with("keys", Asset::List(keys))
        .into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use crate::cursor::ByteWriter;
    use crate::readers::testing::decode;

    #[test]
    fn list_of_vector3_is_inline() {
        let reader = "Microsoft.Xna.Framework.Content.ListReader`1[[Microsoft.Xna.Framework.Vector3, Microsoft.Xna.Framework, Version=4.0.0.0]]";
        let mut w = ByteWriter::new();
        w.write_7bit_int(1).write_u32(2);
        for v in [1.0f32, 2.0, 3.0, 4.0, 5.0, 6.0] {
            w.write_f32(v);
        }
        // Vector3Reader is not in the file's table; found through the registry.
        let asset = decode(&[reader], w.as_slice()).unwrap();
        let items = asset.as_list().unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[1].as_record().unwrap().get("z"), Some(&Asset::from(6.0f32)));
    }

    #[test]
    fn matrix_rows() {
        let mut w = ByteWriter::new();
        w.write_7bit_int(1);
        for i in 0..16 {
            w.write_f32(i as f32);
        }
        let asset = decode(&["MatrixReader"], w.as_slice()).unwrap();
        let rows = asset.as_list().unwrap();
        assert_eq!(rows[2].as_list().unwrap()[3], Asset::from(11.0f32));
    }

    #[test]
    fn curve_keys() {
        let mut w = ByteWriter::new();
        w.write_7bit_int(1).write_i32(1).write_i32(4).write_u32(1);
        w.write_f32(0.0).write_f32(1.0).write_f32(0.5).write_f32(0.5).write_i32(1);
        let asset = decode(&["CurveReader"], w.as_slice()).unwrap();
        let curve = asset.as_record().unwrap();
        assert_eq!(curve.get("pre_loop"), Some(&Asset::from("Cycle")));
        assert_eq!(curve.get("post_loop"), Some(&Asset::from("Linear")));
        let key = curve.get("keys").unwrap().as_list().unwrap()[0].as_record().unwrap();
        assert_eq!(key.get("continuity"), Some(&Asset::from("Step")));
    }

    #[test]
    fn curve_with_bad_loop_type() {
        let mut w = ByteWriter::new();
        w.write_7bit_int(1).write_i32(9);
        assert!(matches!(
            decode(&["CurveReader"], w.as_slice()),
            Err(Error::InvalidData { offset: 1, .. })
        ));
    }
}
