//! Object-graph decoding session.
//!
//! A [`ContentReader`] walks one decompressed payload. Objects are stored as
//! a 7-bit encoded type id (1-based index into the file's reader table, 0 for
//! null) followed by whatever the selected reader consumes. Shared resources
//! are written once, after the primary object, and referenced elsewhere by a
//! 1-based slot index; references are kept as [`Asset::Shared`] placeholders
//! and checked against the declared slot count once the pass completes.
//!
//! Offsets in errors raised here are relative to the decompressed payload.

use std::sync::Arc;

use log::{debug, trace};

use crate::content::{Asset, ReaderTable, Registry, TypeName, TypeReader};
use crate::cursor::ByteCursor;
use crate::{Error, Result};

/// Nesting limit for readers calling back into the decoder.
const MAX_DEPTH: usize = 256;

/// Most elements reserved up front for one collection.
const MAX_PREALLOC: usize = 4096;

/// How collection elements of one declared type are read.
#[derive(Clone)]
pub struct ElementReader {
    direct: Option<(Arc<dyn TypeReader>, TypeName)>,
}

impl ElementReader {
    /// Whether elements are stored inline (no type id).
    pub fn is_direct(&self) -> bool {
        self.direct.is_some()
    }
}

/// Decoding state for one payload.
pub struct ContentReader<'a> {
    cursor: ByteCursor<'a>,
    table: &'a ReaderTable,
    registry: &'a Registry,
    shared_refs: Vec<(usize, usize)>,
    depth: usize,
}

impl<'a> ContentReader<'a> {
    /// Start decoding at the cursor's current position.
    pub fn new(cursor: ByteCursor<'a>, table: &'a ReaderTable, registry: &'a Registry) -> Self {
        Self {
            cursor,
            table,
            registry,
            shared_refs: Vec::new(),
            depth: 0,
        }
    }

    pub fn registry(&self) -> &'a Registry {
        self.registry
    }

    /// The underlying cursor, for readers that need raw access.
    pub fn cursor(&mut self) -> &mut ByteCursor<'a> {
        &mut self.cursor
    }

    pub fn position(&self) -> usize {
        self.cursor.position()
    }

    pub fn remaining(&self) -> usize {
        self.cursor.remaining()
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        self.cursor.read_u8()
    }

    pub fn read_i8(&mut self) -> Result<i8> {
        self.cursor.read_i8()
    }

    pub fn read_bool(&mut self) -> Result<bool> {
        self.cursor.read_bool()
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        self.cursor.read_u16()
    }

    pub fn read_i16(&mut self) -> Result<i16> {
        self.cursor.read_i16()
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        self.cursor.read_u32()
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        self.cursor.read_i32()
    }

    pub fn read_u64(&mut self) -> Result<u64> {
        self.cursor.read_u64()
    }

    pub fn read_i64(&mut self) -> Result<i64> {
        self.cursor.read_i64()
    }

    pub fn read_f32(&mut self) -> Result<f32> {
        self.cursor.read_f32()
    }

    pub fn read_f64(&mut self) -> Result<f64> {
        self.cursor.read_f64()
    }

    pub fn read_7bit_int(&mut self) -> Result<u32> {
        self.cursor.read_7bit_int()
    }

    pub fn read_string(&mut self) -> Result<String> {
        self.cursor.read_string()
    }

    pub fn read_char(&mut self) -> Result<char> {
        self.cursor.read_char()
    }

    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        self.cursor.read_bytes(n)
    }

    /// Read a u32 byte count followed by that many bytes.
    pub fn read_sized_bytes(&mut self) -> Result<&'a [u8]> {
        let n = self.cursor.read_u32()? as usize;
        self.cursor.read_bytes(n)
    }

    /// Read an i32 element count, rejecting negative values.
    pub fn read_count(&mut self) -> Result<usize> {
        let offset = self.position();
        let n = self.cursor.read_i32()?;
        usize::try_from(n).map_err(|_| Error::invalid(offset, format!("negative count {n}")))
    }

    /// Capacity to reserve for `count` elements of at least `min_encoded`
    /// bytes each, bounded by what is left in the payload.
    pub fn capacity_for(&self, count: usize, min_encoded: usize) -> usize {
        count
            .min(self.remaining() / min_encoded.max(1))
            .min(MAX_PREALLOC)
    }

    /// Read a polymorphic object: type id, then the object itself.
    pub fn read_object(&mut self) -> Result<Asset> {
        let offset = self.position();
        let id = self.cursor.read_7bit_int()? as usize;
        if id == 0 {
            return Ok(Asset::Null);
        }
        let table = self.table;
        let entry = table.get(id - 1).ok_or_else(|| {
            Error::invalid(
                offset,
                format!("type reader index {id} out of range ({} readers)", table.len()),
            )
        })?;
        let Some(reader) = &entry.reader else {
            return Err(Error::UnsupportedType {
                name: entry.name.clone(),
                offset,
            });
        };
        trace!("{offset:#x}: {}", entry.instance);
        self.dispatch(reader, &entry.instance)
    }

    /// Read a value with the reader registered under `reader_name`, without a
    /// type id. Used for fields whose type is fixed by the containing type.
    pub fn read_raw(&mut self, reader_name: &str) -> Result<Asset> {
        let offset = self.position();
        let reader = self.registry.resolve(reader_name).map_err(|e| match e {
            Error::UnsupportedType { name, .. } => Error::UnsupportedType { name, offset },
            other => other,
        })?;
        self.dispatch(&reader, &TypeName::parse(reader_name))
    }

    /// Work out how elements of type `ty` are stored.
    ///
    /// Value types with a known reader are read inline; everything else is
    /// read as a polymorphic object. Lookup checks the file's own reader table
    /// before the registry.
    pub fn element_reader(&self, ty: &TypeName) -> ElementReader {
        let found = if let Some(elem) = ty.element() {
            self.registry
                .resolve("Microsoft.Xna.Framework.Content.ArrayReader")
                .ok()
                .map(|r| {
                    (
                        r,
                        TypeName::generic("Microsoft.Xna.Framework.Content.ArrayReader", vec![elem]),
                    )
                })
        } else {
            self.table
                .find_by_target(ty)
                .or_else(|| self.registry.find_by_target(ty))
        };
        if found.is_none() {
            debug!("no reader targets {ty}; reading elements polymorphically");
        }
        ElementReader {
            direct: found.filter(|(r, _)| r.is_value_type()),
        }
    }

    /// Read one element with a previously computed [`ElementReader`].
    pub fn read_element(&mut self, element: &ElementReader) -> Result<Asset> {
        match &element.direct {
            Some((reader, instance)) => self.dispatch(reader, instance),
            None => self.read_object(),
        }
    }

    /// Read one value of declared type `ty`.
    pub fn read_value(&mut self, ty: &TypeName) -> Result<Asset> {
        let element = self.element_reader(ty);
        self.read_element(&element)
    }

    /// Read a shared-resource reference: 7-bit 1-based slot index, 0 for
    /// none.
    pub fn read_shared_resource(&mut self) -> Result<Asset> {
        let offset = self.position();
        let index = self.cursor.read_7bit_int()? as usize;
        if index == 0 {
            return Ok(Asset::Null);
        }
        self.shared_refs.push((index - 1, offset));
        Ok(Asset::Shared(index - 1))
    }

    /// Read an external reference (asset name, empty for none).
    pub fn read_external_reference(&mut self) -> Result<Asset> {
        let name = self.read_string()?;
        Ok(if name.is_empty() {
            Asset::Null
        } else {
            Asset::External(name)
        })
    }

    /// Decode the primary object followed by `shared_count` shared
    /// resources, then check every shared reference seen along the way.
    pub fn read_graph(&mut self, shared_count: usize) -> Result<(Asset, Vec<Asset>)> {
        let primary = self.read_object()?;
        debug!(
            "primary object decoded, {} bytes consumed, {shared_count} shared resources follow",
            self.position()
        );

        let mut shared = Vec::with_capacity(self.capacity_for(shared_count, 1));
        for slot in 0..shared_count {
            trace!("shared resource {slot} at {:#x}", self.position());
            shared.push(self.read_object()?);
        }

        if let Some(&(slot, offset)) = self.shared_refs.iter().find(|(slot, _)| *slot >= shared.len()) {
            debug!("dangling shared reference at {offset:#x}");
            return Err(Error::DanglingReference {
                slot,
                available: shared.len(),
            });
        }
        Ok((primary, shared))
    }

    fn dispatch(&mut self, reader: &Arc<dyn TypeReader>, instance: &TypeName) -> Result<Asset> {
        if self.depth >= MAX_DEPTH {
            return Err(Error::invalid(
                self.position(),
                format!("objects nested deeper than {MAX_DEPTH} levels"),
            ));
        }
        self.depth += 1;
        let result = reader.read(self, instance);
        self.depth -= 1;
        result
    }
}
