//! Parsing of .NET type names as they appear in the type-reader table.
//!
//! ```text
//! Microsoft.Xna.Framework.Content.ListReader`1[[System.Char, mscorlib, Version=4.0.0.0]], Microsoft.Xna.Framework
//! └────────────── name ──────────────────┘ └┘ └──────────── args ─────────────┘ └──── assembly (dropped) ───┘
//!                                         arity (dropped)
//! ```
//!
//! Array suffixes (`System.Int32[]`) are kept as part of the name.

use std::fmt;

/// A type name with assembly qualifiers and generic arity removed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeName {
    pub name: String,
    pub args: Vec<TypeName>,
}

impl TypeName {
    /// A non-generic name.
    pub fn simple(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: Vec::new(),
        }
    }

    pub fn generic(name: impl Into<String>, args: Vec<TypeName>) -> Self {
        Self {
            name: name.into(),
            args,
        }
    }

    /// Parse a possibly assembly-qualified name. Never fails: malformed
    /// bracket nesting yields a best-effort result.
    pub fn parse(s: &str) -> Self {
        let mut pos = 0;
        parse_at(s.as_bytes(), &mut pos)
    }

    /// Whether this names a single-dimension array type.
    pub fn is_array(&self) -> bool {
        self.name.ends_with("[]")
    }

    /// Element type of an array type.
    pub fn element(&self) -> Option<TypeName> {
        let name = self.name.strip_suffix("[]")?;
        Some(TypeName {
            name: name.to_owned(),
            args: self.args.clone(),
        })
    }

    /// The `i`-th generic argument.
    pub fn arg(&self, i: usize) -> Option<&TypeName> {
        self.args.get(i)
    }

    /// Last dotted component of the name (`Microsoft.Xna.Framework.Vector3`
    /// → `Vector3`).
    pub fn short_name(&self) -> &str {
        let base = self.name.split('[').next().unwrap_or(&self.name);
        base.rsplit(['.', '+']).next().unwrap_or(base)
    }
}

impl fmt::Display for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (base, suffix) = match self.name.find("[]") {
            Some(i) => self.name.split_at(i),
            None => (self.name.as_str(), ""),
        };
        f.write_str(base)?;
        if !self.args.is_empty() {
            f.write_str("<")?;
            for (i, a) in self.args.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{a}")?;
            }
            f.write_str(">")?;
        }
        f.write_str(suffix)
    }
}

fn parse_at(s: &[u8], pos: &mut usize) -> TypeName {
    let start = *pos;
    while *pos < s.len() && !matches!(s[*pos], b'`' | b'[' | b']' | b',') {
        *pos += 1;
    }
    let mut name = String::from_utf8_lossy(&s[start..*pos]).trim().to_owned();

    if s.get(*pos) == Some(&b'`') {
        *pos += 1;
        while s.get(*pos).is_some_and(u8::is_ascii_digit) {
            *pos += 1;
        }
    }

    let mut args = Vec::new();
    if s[*pos..].starts_with(b"[[") {
        *pos += 1;
        while s.get(*pos) == Some(&b'[') {
            *pos += 1;
            args.push(parse_at(s, pos));
            skip_qualifier(s, pos);
            if s.get(*pos) == Some(&b']') {
                *pos += 1;
            }
            if s.get(*pos) == Some(&b',') {
                *pos += 1;
            }
        }
        if s.get(*pos) == Some(&b']') {
            *pos += 1;
        }
    }

    while s[*pos..].starts_with(b"[]") {
        name.push_str("[]");
        *pos += 2;
    }

    TypeName { name, args }
}

/// Skip `, Assembly, Version=...` up to the bracket closing the current
/// argument.
fn skip_qualifier(s: &[u8], pos: &mut usize) {
    let mut depth = 0usize;
    while let Some(&b) = s.get(*pos) {
        match b {
            b'[' => depth += 1,
            b']' if depth == 0 => return,
            b']' => depth -= 1,
            _ => {}
        }
        *pos += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_assembly_qualifier() {
        let t = TypeName::parse(
            "Microsoft.Xna.Framework.Content.Texture2DReader, Microsoft.Xna.Framework.Graphics, Version=4.0.0.0, Culture=neutral",
        );
        assert_eq!(t, TypeName::simple("Microsoft.Xna.Framework.Content.Texture2DReader"));
        assert_eq!(t.short_name(), "Texture2DReader");
    }

    #[test]
    fn generic_arguments() {
        let t = TypeName::parse(
            "Microsoft.Xna.Framework.Content.DictionaryReader`2[[System.String, mscorlib, Version=4.0.0.0, Culture=neutral, PublicKeyToken=b77a5c561934e089],[Microsoft.Xna.Framework.Vector3, Microsoft.Xna.Framework]]",
        );
        assert_eq!(t.name, "Microsoft.Xna.Framework.Content.DictionaryReader");
        assert_eq!(
            t.args,
            vec![
                TypeName::simple("System.String"),
                TypeName::simple("Microsoft.Xna.Framework.Vector3"),
            ]
        );
    }

    #[test]
    fn nested_generics_and_arrays() {
        let t = TypeName::parse(
            "Microsoft.Xna.Framework.Content.ListReader`1[[System.Collections.Generic.List`1[[System.Int32[], mscorlib]], mscorlib]]",
        );
        assert_eq!(t.name, "Microsoft.Xna.Framework.Content.ListReader");
        let inner = t.arg(0).unwrap();
        assert_eq!(inner.name, "System.Collections.Generic.List");
        let elem = inner.arg(0).unwrap();
        assert!(elem.is_array());
        assert_eq!(elem.element(), Some(TypeName::simple("System.Int32")));
        assert_eq!(
            t.to_string(),
            "Microsoft.Xna.Framework.Content.ListReader<System.Collections.Generic.List<System.Int32[]>>"
        );
    }

    #[test]
    fn unqualified_name_is_unchanged() {
        assert_eq!(
            TypeName::parse("XnbExtractTests.IntReader"),
            TypeName::simple("XnbExtractTests.IntReader")
        );
    }

    #[test]
    fn malformed_brackets_do_not_panic() {
        let t = TypeName::parse("Foo`1[[Bar, Baz");
        assert_eq!(t.name, "Foo");
        assert_eq!(t.args, vec![TypeName::simple("Bar")]);
        let _ = TypeName::parse("]]]][[,,``");
    }
}
