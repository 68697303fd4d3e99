//! **xnbkit** - a Rust library for decoding XNA/MonoGame XNB content files.
//!
//! # Pipeline
//! | Stage | Module |
//! |-------|--------|
//! | Byte-level reads and writes        | [`cursor`] |
//! | Header and type-reader table       | [`header`] |
//! | LZX / LZ4 payload decompression    | [`compression`] |
//! | Type readers and object-graph walk | [`content`], [`readers`] |
//! | Whole-file decode and rebuild      | [`xnb`] |
//! | Pixel conversion                   | [`pixels`] |
//! | Writing artifacts to disk          | [`export`] |
//!
//! # Example
//! ```no_run
//! use xnbkit::content::Registry;
//! use xnbkit::export::{AssetExporter, ExportOptions};
//! use xnbkit::xnb::Document;
//!
//! let data = std::fs::read("Content/hero.xnb")?;
//! let doc = Document::decode(&data, &Registry::with_builtins())?;
//! AssetExporter::new(ExportOptions::default()).export(&doc, "out/hero".as_ref())?;
//! # Ok::<(), xnbkit::Error>(())
//! ```
//!
//! Custom content types are supported by registering a reader under the
//! reader name the content pipeline wrote into the file; see
//! [`content::Registry::register`].

pub mod compression;
pub mod content;
pub mod cursor;
pub mod error;
pub mod export;
pub mod header;
pub mod pixels;
pub mod readers;
pub mod xnb;

pub use error::{Error, Result};
