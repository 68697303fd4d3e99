//! Built-in type readers for the XNA 4.0 content types.
//!
//! All readers are registered under their
//! `Microsoft.Xna.Framework.Content.*Reader` names by
//! [`Registry::with_builtins`].
//!
//! | Module        | Readers |
//! |---------------|---------|
//! | [`primitive`] | Byte … Double, Boolean, Char, String, Object |
//! | [`system`]    | Enum, Nullable, Array, List, Dictionary, TimeSpan, DateTime, Decimal, ExternalReference |
//! | [`math`]      | Vector2/3/4, Matrix, Quaternion, Color, Plane, Point, Rectangle, bounding volumes, Ray, Curve |
//! | [`graphics`]  | Textures, index/vertex buffers, effects, SpriteFont, Model |
//! | [`media`]     | SoundEffect, Song, Video |
//!
//! Reflection-based content (`ReflectiveReader`) has no built-in reader;
//! register one for each custom type instead.

use crate::content::{Asset, ContentReader, Registry, TypeName, TypeReader};
use crate::{Error, Result};

pub mod graphics;
pub mod math;
pub mod media;
pub mod primitive;
pub mod system;

/// Namespace shared by every built-in reader name.
pub const NAMESPACE: &str = "Microsoft.Xna.Framework.Content.";

type ReadFn = fn(&mut ContentReader<'_>, &TypeName) -> Result<Asset>;

/// What a built-in reader produces.
#[derive(Debug, Clone, Copy)]
enum Target {
    /// A fixed runtime type.
    Type(&'static str),
    /// A generic type instantiated with the reader's own type arguments.
    Generic(&'static str),
    /// The reader's first type argument (enums).
    Argument,
    /// An array of the reader's first type argument.
    Array,
}

/// A reader implemented by a plain function.
struct Builtin {
    target: Target,
    value_type: bool,
    read: ReadFn,
}

impl Builtin {
    fn value(target: &'static str, read: ReadFn) -> Self {
        Self {
            target: Target::Type(target),
            value_type: true,
            read,
        }
    }

    fn reference(target: &'static str, read: ReadFn) -> Self {
        Self {
            target: Target::Type(target),
            value_type: false,
            read,
        }
    }

    fn generic(target: Target, value_type: bool, read: ReadFn) -> Self {
        Self {
            target,
            value_type,
            read,
        }
    }
}

impl TypeReader for Builtin {
    fn read(&self, input: &mut ContentReader<'_>, instance: &TypeName) -> Result<Asset> {
        (self.read)(input, instance)
    }

    fn target_type(&self, instance: &TypeName) -> Option<TypeName> {
        match self.target {
            Target::Type(name) => Some(TypeName::simple(name)),
            Target::Generic(name) => Some(TypeName::generic(name, instance.args.clone())),
            Target::Argument => instance.arg(0).cloned(),
            Target::Array => instance.arg(0).map(|elem| TypeName {
                name: format!("{}[]", elem.name),
                args: elem.args.clone(),
            }),
        }
    }

    fn is_value_type(&self) -> bool {
        self.value_type
    }
}

/// Register every built-in reader.
pub(crate) fn register_builtins(registry: &mut Registry) {
    primitive::register(registry);
    system::register(registry);
    math::register(registry);
    graphics::register(registry);
    media::register(registry);
}

fn add(registry: &mut Registry, short_name: &str, reader: Builtin) {
    registry.register(&format!("{NAMESPACE}{short_name}"), reader);
}

/// The `i`-th generic argument of a reader, or an error naming the reader.
fn type_arg<'s>(input: &ContentReader<'_>, instance: &'s TypeName, i: usize) -> Result<&'s TypeName> {
    instance.arg(i).ok_or_else(|| {
        Error::invalid(
            input.position(),
            format!("{} is missing generic argument {i}", instance.name),
        )
    })
}

/// Read an i32 and map it to a name from `names`.
fn read_enum_name(input: &mut ContentReader<'_>, what: &str, names: &[&str]) -> Result<Asset> {
    let offset = input.position();
    let index = input.read_i32()?;
    usize::try_from(index)
        .ok()
        .and_then(|i| names.get(i))
        .map(|&name| Asset::from(name))
        .ok_or_else(|| Error::invalid(offset, format!("invalid {what} {index}")))
}

#[cfg(test)]
pub(crate) mod testing {
    use crate::content::{Asset, ContentReader, ReaderTable, Registry};
    use crate::cursor::ByteCursor;
    use crate::Result;

    /// Decode `payload` as a primary object against a table built from the
    /// short reader names in `readers`.
    pub fn decode(readers: &[&str], payload: &[u8]) -> Result<Asset> {
        let registry = Registry::with_builtins();
        let names: Vec<String> = readers
            .iter()
            .map(|r| {
                if r.contains('.') {
                    (*r).to_owned()
                } else {
                    format!("{}{r}", super::NAMESPACE)
                }
            })
            .collect();
        let table = ReaderTable::build(names.iter().map(String::as_str), &registry);
        let mut input = ContentReader::new(ByteCursor::new(payload), &table, &registry);
        let (primary, _) = input.read_graph(0)?;
        assert_eq!(input.remaining(), 0, "payload not fully consumed");
        Ok(primary)
    }
}
