//! Readers for generic collections and `System` value types.

use super::{Builtin, Target, add, type_arg};
use crate::content::{Asset, ContentReader, Record, Registry, Scalar, TypeName};
use crate::Result;

/// Low 62 bits of a serialized `DateTime`.
const TICKS_MASK: u64 = (1 << 62) - 1;

pub(super) fn register(registry: &mut Registry) {
    add(registry, "EnumReader", Builtin::generic(Target::Argument, true, read_enum));
    add(
        registry,
        "NullableReader",
        Builtin::generic(Target::Generic("System.Nullable"), true, read_nullable),
    );
    add(registry, "ArrayReader", Builtin::generic(Target::Array, false, read_list));
    add(
        registry,
        "ListReader",
        Builtin::generic(Target::Generic("System.Collections.Generic.List"), false, read_list),
    );
    add(
        registry,
        "DictionaryReader",
        Builtin::generic(
            Target::Generic("System.Collections.Generic.Dictionary"),
            false,
            read_dictionary,
        ),
    );
    add(registry, "TimeSpanReader", Builtin::value("System.TimeSpan", read_time_span));
    add(registry, "DateTimeReader", Builtin::value("System.DateTime", read_date_time));
    add(registry, "DecimalReader", Builtin::value("System.Decimal", read_decimal));
    add(
        registry,
        "ExternalReferenceReader",
        Builtin::reference("Microsoft.Xna.Framework.Content.ExternalReference", |input, _| {
            input.read_external_reference()
        }),
    );
}

/// Enums are stored as their underlying 32-bit value.
fn read_enum(input: &mut ContentReader<'_>, _instance: &TypeName) -> Result<Asset> {
    Ok(input.read_i32()?.into())
}

fn read_nullable(input: &mut ContentReader<'_>, instance: &TypeName) -> Result<Asset> {
    let ty = type_arg(input, instance, 0)?.clone();
    if input.read_bool()? {
        input.read_value(&ty)
    } else {
        Ok(Asset::Null)
    }
}

/// Arrays and lists share one layout: u32 count, then the elements.
fn read_list(input: &mut ContentReader<'_>, instance: &TypeName) -> Result<Asset> {
    let ty = type_arg(input, instance, 0)?;
    let element = input.element_reader(ty);
    let count = input.read_u32()? as usize;
    let mut items = Vec::with_capacity(input.capacity_for(count, 1));
    for _ in 0..count {
        items.push(input.read_element(&element)?);
    }
    Ok(Asset::List(items))
}

fn read_dictionary(input: &mut ContentReader<'_>, instance: &TypeName) -> Result<Asset> {
    let key = input.element_reader(type_arg(input, instance, 0)?);
    let value = input.element_reader(type_arg(input, instance, 1)?);
    let count = input.read_u32()? as usize;
    let mut entries = Vec::with_capacity(input.capacity_for(count, 2));
    for _ in 0..count {
        let k = input.read_element(&key)?;
        let v = input.read_element(&value)?;
        entries.push((k, v));
    }
    Ok(Asset::Map(entries))
}

fn read_time_span(input: &mut ContentReader<'_>, _instance: &TypeName) -> Result<Asset> {
    Ok(Record::new("TimeSpan").with("ticks", input.read_i64()?).into())
}

fn read_date_time(input: &mut ContentReader<'_>, _instance: &TypeName) -> Result<Asset> {
    let packed = input.read_u64()?;
    let kind = match packed >> 62 {
        1 => "Utc",
        2 => "Local",
        _ => "Unspecified",
    };
    Ok(Record::new("DateTime")
        .with("ticks", packed & TICKS_MASK)
        .with("kind", kind)
        .into())
}

fn read_decimal(input: &mut ContentReader<'_>, _instance: &TypeName) -> Result<Asset> {
    let lo = input.read_u32()?;
    let mid = input.read_u32()?;
    let hi = input.read_u32()?;
    let flags = input.read_u32()?;
    Ok(Asset::Scalar(Scalar::String(format_decimal(lo, mid, hi, flags))))
}

/// Render a .NET `decimal` (96-bit mantissa, power-of-ten scale, sign bit)
/// exactly.
fn format_decimal(lo: u32, mid: u32, hi: u32, flags: u32) -> String {
    let mantissa = (hi as u128) << 64 | (mid as u128) << 32 | lo as u128;
    let scale = ((flags >> 16) & 0xFF) as usize;
    let digits = mantissa.to_string();
    let mut s = if scale == 0 {
        digits
    } else if digits.len() > scale {
        let (int, frac) = digits.split_at(digits.len() - scale);
        format!("{int}.{frac}")
    } else {
        format!("0.{}{digits}", "0".repeat(scale - digits.len()))
    };
    if flags & 0x8000_0000 != 0 {
        s.insert(0, '-');
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cursor::ByteWriter;
    use crate::readers::testing::decode;

    const INT_LIST: &str = "Microsoft.Xna.Framework.Content.ListReader`1[[System.Int32, mscorlib, Version=4.0.0.0]]";
    const INT_ARRAY: &str = "Microsoft.Xna.Framework.Content.ArrayReader`1[[System.Int32, mscorlib]]";
    const STRING_LIST: &str = "Microsoft.Xna.Framework.Content.ListReader`1[[System.String, mscorlib]]";

    #[test]
    fn value_type_elements_are_inline() {
        for reader in [INT_LIST, INT_ARRAY] {
            let mut w = ByteWriter::new();
            w.write_7bit_int(1).write_u32(3).write_i32(1).write_i32(-2).write_i32(3);
            assert_eq!(
                decode(&[reader], w.as_slice()).unwrap(),
                Asset::List(vec![1.into(), (-2).into(), 3.into()])
            );
        }
    }

    #[test]
    fn reference_elements_carry_type_ids() {
        let mut w = ByteWriter::new();
        w.write_7bit_int(1).write_u32(2);
        w.write_7bit_int(2).write_string("a");
        w.write_7bit_int(0);
        assert_eq!(
            decode(&[STRING_LIST, "StringReader"], w.as_slice()).unwrap(),
            Asset::List(vec!["a".into(), Asset::Null])
        );
    }

    #[test]
    fn dictionary_of_string_to_vector2() {
        let reader = "Microsoft.Xna.Framework.Content.DictionaryReader`2[[System.String, mscorlib],[Microsoft.Xna.Framework.Vector2, Microsoft.Xna.Framework]]";
        let mut w = ByteWriter::new();
        w.write_7bit_int(1).write_u32(1);
        w.write_7bit_int(2).write_string("spawn");
        w.write_f32(1.0).write_f32(2.0);
        let asset = decode(&[reader, "StringReader", "Vector2Reader"], w.as_slice()).unwrap();
        let Asset::Map(entries) = asset else {
            panic!("expected a map, got {asset:?}");
        };
        assert_eq!(entries[0].0, Asset::from("spawn"));
        let v = entries[0].1.as_record().unwrap();
        assert_eq!(v.get("x"), Some(&Asset::from(1.0f32)));
    }

    #[test]
    fn nullable_and_enum() {
        let nullable = "Microsoft.Xna.Framework.Content.NullableReader`1[[System.Int32, mscorlib]]";
        let mut w = ByteWriter::new();
        w.write_7bit_int(1).write_bool(true).write_i32(9);
        assert_eq!(decode(&[nullable], w.as_slice()).unwrap(), Asset::from(9));

        let mut w = ByteWriter::new();
        w.write_7bit_int(1).write_bool(false);
        assert_eq!(decode(&[nullable], w.as_slice()).unwrap(), Asset::Null);

        let list_of_enum = "Microsoft.Xna.Framework.Content.ListReader`1[[MyGame.Direction, MyGame]]";
        let enum_reader = "Microsoft.Xna.Framework.Content.EnumReader`1[[MyGame.Direction, MyGame]]";
        let mut w = ByteWriter::new();
        w.write_7bit_int(1).write_u32(2).write_i32(0).write_i32(3);
        assert_eq!(
            decode(&[list_of_enum, enum_reader], w.as_slice()).unwrap(),
            Asset::List(vec![0.into(), 3.into()])
        );
    }

    #[test]
    fn date_time_kind_and_ticks() {
        let mut w = ByteWriter::new();
        w.write_7bit_int(1).write_u64((1 << 62) | 12345);
        let asset = decode(&["DateTimeReader"], w.as_slice()).unwrap();
        let r = asset.as_record().unwrap();
        assert_eq!(r.get("kind"), Some(&Asset::from("Utc")));
        assert_eq!(r.get("ticks"), Some(&Asset::from(12345u64)));
    }

    #[test]
    fn decimals() {
        assert_eq!(format_decimal(12345, 0, 0, 2 << 16), "123.45");
        assert_eq!(format_decimal(5, 0, 0, (3 << 16) | 0x8000_0000), "-0.005");
        assert_eq!(format_decimal(0, 0, 1, 0), "18446744073709551616");
    }
}
