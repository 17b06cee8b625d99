//! YAML document trees with a round-trippable emitter, in pure Rust.
//!
//! # Usage
//!
//! Parsing yields [`Document`]s holding an arena of [`Node`]s. Nodes carry the resolved Core
//! Schema tag, the source style and the source position, which is enough to render the document
//! back out and re-read an equal tree.
//!
//! ```
//! use peridot::{load_from_str, emit_to_string, NodeKind};
//!
//! let docs = load_from_str("- 1\n- 2\n- 3").unwrap();
//! let doc = &docs[0]; // select the first YAML document
//! let root = doc.root().unwrap();
//! assert_eq!(doc.node(root).kind, NodeKind::Sequence);
//!
//! let out = emit_to_string(doc).unwrap();
//! assert_eq!(out, "- 1\n- 2\n- 3\n");
//! ```
//!
//! # Tags and typed values
//!
//! Scalars resolve against the YAML 1.1-flavored schema in [`resolve`]: plain `true`, `0x1F` or
//! `.inf` get `!!bool`, `!!int` and `!!float` tags while quoted scalars always resolve to
//! `!!str`. [`resolve::parse_scalar`] converts a tagged scalar into a [`ScalarValue`] when a
//! typed view is needed. `!!binary` scalars are base64-decoded at composition time and
//! re-encoded by the emitter.
//!
//! # Options and limits
//!
//! [`Options`] controls composing (`unique-keys`, `single-document`, ...) and emitting
//! (`indent`, `canonical`, `line-break`, ...). Every option can also be set from string pairs
//! through [`Options::set`], which rejects unknown names. Structural DoS defenses live in
//! [`Limits`]: a nesting depth ceiling enforced by the scanner and an alias expansion budget
//! enforced by the composer.

#![warn(missing_docs, clippy::pedantic)]

#[cfg(feature = "comments")]
pub mod comments;
pub mod composer;
pub mod emitter;
pub mod error;
pub mod node;
pub mod options;
pub mod resolve;

pub use crate::composer::Composer;
pub use crate::emitter::{EmitResult, Emitter};
pub use crate::error::{ComposeError, EmitError, Error, OptionsError};
pub use crate::node::{Document, Node, NodeId, NodeKind, NodeStyle};
pub use crate::options::{LineBreak, Options};
pub use crate::resolve::ScalarValue;

pub use peridot_parser as parser;
pub use peridot_parser::{Limits, Marker, ScalarStyle, ScanError, Span, Tag};

/// Load every document of `input` with default options and limits.
///
/// # Errors
/// Returns an error on malformed input or on a violated limit.
pub fn load_from_str(input: &str) -> Result<Vec<Document>, Error> {
    Composer::new().load_from_str(input)
}

/// Decode `input` and load every document in it with default options and limits.
///
/// # Errors
/// Returns an error when the bytes cannot be decoded, plus everything [`load_from_str`] can
/// return.
#[cfg(feature = "encoding")]
pub fn load_from_bytes(input: &[u8]) -> Result<Vec<Document>, Error> {
    Composer::new().load_from_bytes(input)
}

/// Emit a single document to a string with default options.
///
/// # Errors
/// Returns an error when the document cannot be rendered, see [`EmitError`].
pub fn emit_to_string(doc: &Document) -> Result<String, Error> {
    let mut out = String::new();
    Emitter::new(&mut out).dump(doc)?;
    Ok(out)
}

/// Emit a stream of documents to a string with default options, separated by `---` markers.
///
/// # Errors
/// Returns an error when a document cannot be rendered, see [`EmitError`].
pub fn emit_all_to_string(docs: &[Document]) -> Result<String, Error> {
    let mut out = String::new();
    let mut emitter = Emitter::new(&mut out);
    for doc in docs {
        emitter.dump(doc)?;
    }
    Ok(out)
}
