//! Type-reader registry.
//!
//! Every object in an XNB payload is decoded by the reader whose name was
//! listed in the file's type-reader table. A [`Registry`] maps those names
//! to [`TypeReader`] implementations. Lookup ignores assembly qualifiers and
//! generic arity, so `"Texture2DReader, MyAssembly, Version=1.0"` and
//! `"Texture2DReader"` resolve to the same reader.
//!
//! The registry is assembled before decoding and only borrowed immutably
//! while a file is decoded.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::content::{Asset, ContentReader, TypeName};
use crate::{Error, Result};

/// Decodes one value of a particular runtime type.
pub trait TypeReader: Send + Sync {
    /// Read one value. `instance` is the parsed reader name from the file, so
    /// generic readers can inspect their type arguments.
    fn read(&self, input: &mut ContentReader<'_>, instance: &TypeName) -> Result<Asset>;

    /// Runtime type produced by this reader when instantiated as `instance`.
    ///
    /// Used to find the reader for collection elements, which are stored
    /// without a type id. Readers returning `None` can only be reached
    /// through a type id.
    fn target_type(&self, instance: &TypeName) -> Option<TypeName> {
        let _ = instance;
        None
    }

    /// Value types are stored inline in collections (no type id, no null).
    fn is_value_type(&self) -> bool {
        false
    }
}

struct FnReader<F>(F);

impl<F> TypeReader for FnReader<F>
where
    F: Fn(&mut ContentReader<'_>) -> Result<Asset> + Send + Sync,
{
    fn read(&self, input: &mut ContentReader<'_>, _instance: &TypeName) -> Result<Asset> {
        (self.0)(input)
    }
}

/// Name-keyed collection of type readers.
#[derive(Clone, Default)]
pub struct Registry {
    readers: HashMap<String, Arc<dyn TypeReader>>,
}

impl Registry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding every built-in XNA reader.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        crate::readers::register_builtins(&mut registry);
        registry
    }

    /// Register `reader` under `type_name`. Any assembly qualifier or generic
    /// arity on the name is stripped. A later registration under the same
    /// name replaces the earlier one.
    pub fn register(
        &mut self,
        type_name: &str,
        reader: impl TypeReader + 'static,
    ) -> &mut Self {
        self.readers
            .insert(TypeName::parse(type_name).name, Arc::new(reader));
        self
    }

    /// Register a closure as a reader.
    ///
    /// ```
    /// use xnbkit::content::{ContentReader, Registry};
    ///
    /// let mut registry = Registry::with_builtins();
    /// registry.register_fn("MyGame.ScoreReader", |input: &mut ContentReader<'_>| {
    ///     Ok(input.read_i32()?.into())
    /// });
    /// assert!(registry.contains("MyGame.ScoreReader, MyGame"));
    /// ```
    pub fn register_fn<F>(&mut self, type_name: &str, f: F) -> &mut Self
    where
        F: Fn(&mut ContentReader<'_>) -> Result<Asset> + Send + Sync + 'static,
    {
        self.register(type_name, FnReader(f))
    }

    /// Look up the reader for a (possibly assembly-qualified) reader name.
    pub fn resolve(&self, type_name: &str) -> Result<Arc<dyn TypeReader>> {
        let key = TypeName::parse(type_name).name;
        self.readers
            .get(&key)
            .cloned()
            .ok_or(Error::UnsupportedType {
                name: type_name.to_owned(),
                offset: 0,
            })
    }

    pub fn contains(&self, type_name: &str) -> bool {
        self.readers.contains_key(&TypeName::parse(type_name).name)
    }

    pub fn len(&self) -> usize {
        self.readers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readers.is_empty()
    }

    /// Find a reader whose target type is `target`, instantiating generic
    /// readers with `target`'s type arguments.
    pub fn find_by_target(&self, target: &TypeName) -> Option<(Arc<dyn TypeReader>, TypeName)> {
        self.readers.iter().find_map(|(name, reader)| {
            let instance = TypeName::generic(name.clone(), target.args.clone());
            (reader.target_type(&instance).as_ref() == Some(target))
                .then(|| (Arc::clone(reader), instance))
        })
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.readers.keys().collect();
        names.sort();
        f.debug_struct("Registry").field("readers", &names).finish()
    }
}

/// A file's type-reader table with each entry resolved against a registry.
///
/// Entries the registry does not know are kept unresolved; the error is
/// raised only if an object actually dispatches to one.
pub struct ReaderTable {
    entries: Vec<TableEntry>,
}

pub(crate) struct TableEntry {
    pub(crate) name: String,
    pub(crate) instance: TypeName,
    pub(crate) reader: Option<Arc<dyn TypeReader>>,
}

impl ReaderTable {
    pub fn build<'n>(names: impl IntoIterator<Item = &'n str>, registry: &Registry) -> Self {
        let entries = names
            .into_iter()
            .map(|name| {
                let instance = TypeName::parse(name);
                let reader = registry.readers.get(&instance.name).cloned();
                if reader.is_none() {
                    log::debug!("no reader registered for {name:?}");
                }
                TableEntry {
                    name: name.to_owned(),
                    instance,
                    reader,
                }
            })
            .collect();
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Names of entries with no registered reader.
    pub fn unresolved(&self) -> impl Iterator<Item = &str> {
        self.entries
            .iter()
            .filter(|e| e.reader.is_none())
            .map(|e| e.name.as_str())
    }

    pub(crate) fn get(&self, index: usize) -> Option<&TableEntry> {
        self.entries.get(index)
    }

    /// Find the table entry whose reader targets `target`.
    pub(crate) fn find_by_target(&self, target: &TypeName) -> Option<(Arc<dyn TypeReader>, TypeName)> {
        self.entries.iter().find_map(|e| {
            let reader = e.reader.as_ref()?;
            (reader.target_type(&e.instance).as_ref() == Some(target))
                .then(|| (Arc::clone(reader), e.instance.clone()))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_ignores_assembly_suffix() {
        let registry = Registry::with_builtins();
        let a = registry
            .resolve("Microsoft.Xna.Framework.Content.Texture2DReader, Microsoft.Xna.Framework.Graphics, Version=4.0.0.0")
            .unwrap();
        let b = registry
            .resolve("Microsoft.Xna.Framework.Content.Texture2DReader")
            .unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn short_registration_resolves_qualified_name() {
        let mut registry = Registry::new();
        registry.register_fn("Texture2DReader", |input: &mut ContentReader<'_>| {
            Ok(input.read_u8()?.into())
        });
        let qualified = registry
            .resolve("Texture2DReader, MyAssembly, Version=1.0")
            .unwrap();
        let short = registry.resolve("Texture2DReader").unwrap();
        assert!(Arc::ptr_eq(&qualified, &short));
    }

    #[test]
    fn resolve_unknown_reader() {
        let registry = Registry::with_builtins();
        match registry.resolve("MyGame.LevelReader, MyGame") {
            Err(Error::UnsupportedType { name, .. }) => assert_eq!(name, "MyGame.LevelReader, MyGame"),
            Err(e) => panic!("unexpected error {e}"),
            Ok(_) => panic!("resolved an unregistered reader"),
        }
    }

    #[test]
    fn custom_registration() {
        let mut registry = Registry::new();
        registry.register_fn("MyGame.LevelReader", |input: &mut ContentReader<'_>| {
            Ok(input.read_string()?.into())
        });
        assert!(registry.contains("MyGame.LevelReader, MyGame, Version=1.0.0.0"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn generic_reader_by_target() {
        let registry = Registry::with_builtins();
        let target = TypeName::generic(
            "System.Collections.Generic.List",
            vec![TypeName::simple("System.Int32")],
        );
        let (_, instance) = registry.find_by_target(&target).unwrap();
        assert_eq!(instance.name, "Microsoft.Xna.Framework.Content.ListReader");
        assert_eq!(instance.args, target.args);

        let (reader, _) = registry
            .find_by_target(&TypeName::simple("Microsoft.Xna.Framework.Vector3"))
            .unwrap();
        assert!(reader.is_value_type());
    }

    #[test]
    fn table_keeps_unresolved_entries() {
        let registry = Registry::with_builtins();
        let table = ReaderTable::build(
            [
                "Microsoft.Xna.Framework.Content.Int32Reader",
                "MyGame.LevelReader, MyGame",
            ],
            &registry,
        );
        assert_eq!(table.len(), 2);
        assert_eq!(table.unresolved().collect::<Vec<_>>(), vec!["MyGame.LevelReader, MyGame"]);
    }
}
