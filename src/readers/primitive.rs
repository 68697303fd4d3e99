//! Primitive value readers.

use super::{Builtin, add};
use crate::content::Registry;

pub(super) fn register(registry: &mut Registry) {
    add(registry, "ByteReader", Builtin::value("System.Byte", |input, _| Ok(input.read_u8()?.into())));
    add(registry, "SByteReader", Builtin::value("System.SByte", |input, _| Ok(input.read_i8()?.into())));
    add(registry, "Int16Reader", Builtin::value("System.Int16", |input, _| Ok(input.read_i16()?.into())));
    add(registry, "UInt16Reader", Builtin::value("System.UInt16", |input, _| Ok(input.read_u16()?.into())));
    add(registry, "Int32Reader", Builtin::value("System.Int32", |input, _| Ok(input.read_i32()?.into())));
    add(registry, "UInt32Reader", Builtin::value("System.UInt32", |input, _| Ok(input.read_u32()?.into())));
    add(registry, "Int64Reader", Builtin::value("System.Int64", |input, _| Ok(input.read_i64()?.into())));
    add(registry, "UInt64Reader", Builtin::value("System.UInt64", |input, _| Ok(input.read_u64()?.into())));
    add(registry, "SingleReader", Builtin::value("System.Single", |input, _| Ok(input.read_f32()?.into())));
    add(registry, "DoubleReader", Builtin::value("System.Double", |input, _| Ok(input.read_f64()?.into())));
    add(registry, "BooleanReader", Builtin::value("System.Boolean", |input, _| Ok(input.read_bool()?.into())));
    add(registry, "CharReader", Builtin::value("System.Char", |input, _| Ok(input.read_char()?.into())));
    add(registry, "StringReader", Builtin::reference("System.String", |input, _| Ok(input.read_string()?.into())));
    // Boxed values: the object itself carries a type id.
    add(registry, "ObjectReader", Builtin::reference("System.Object", |input, _| input.read_object()));
}

#[cfg(test)]
mod tests {
    use crate::content::{Asset, Scalar};
    use crate::cursor::ByteWriter;
    use crate::readers::testing::decode;

    #[test]
    fn int32_root() {
        let mut w = ByteWriter::new();
        w.write_7bit_int(1).write_i32(42);
        assert_eq!(
            decode(&["Int32Reader"], w.as_slice()).unwrap(),
            Asset::Scalar(Scalar::Int32(42))
        );
    }

    #[test]
    fn scalar_kinds() {
        let readers = [
            "ByteReader",
            "SByteReader",
            "UInt16Reader",
            "Int64Reader",
            "DoubleReader",
            "BooleanReader",
            "CharReader",
        ];
        let mut w = ByteWriter::new();
        w.write_7bit_int(1).write_u8(200);
        assert_eq!(decode(&readers, w.as_slice()).unwrap(), Asset::from(200u8));

        let mut w = ByteWriter::new();
        w.write_7bit_int(2).write_u8(0xFF);
        assert_eq!(decode(&readers, w.as_slice()).unwrap(), Asset::from(-1i8));

        let mut w = ByteWriter::new();
        w.write_7bit_int(3).write_u16(65_000);
        assert_eq!(decode(&readers, w.as_slice()).unwrap(), Asset::from(65_000u16));

        let mut w = ByteWriter::new();
        w.write_7bit_int(4).write_i64(-5_000_000_000);
        assert_eq!(decode(&readers, w.as_slice()).unwrap(), Asset::from(-5_000_000_000i64));

        let mut w = ByteWriter::new();
        w.write_7bit_int(5).write_f64(0.25);
        assert_eq!(decode(&readers, w.as_slice()).unwrap(), Asset::from(0.25f64));

        let mut w = ByteWriter::new();
        w.write_7bit_int(6).write_bool(true);
        assert_eq!(decode(&readers, w.as_slice()).unwrap(), Asset::from(true));

        let mut w = ByteWriter::new();
        w.write_7bit_int(7).write_char('ß');
        assert_eq!(decode(&readers, w.as_slice()).unwrap(), Asset::from('ß'));
    }

    #[test]
    fn boxed_object() {
        let mut w = ByteWriter::new();
        w.write_7bit_int(1).write_7bit_int(2).write_string("boxed");
        assert_eq!(
            decode(&["ObjectReader", "StringReader"], w.as_slice()).unwrap(),
            Asset::from("boxed")
        );
    }
}
