//! YAML 1.2 parser implementation in pure Rust.
//!
//! **If you want to load to a YAML Rust structure or manipulate YAML objects, use `peridot`
//! instead of `peridot-parser`. This crate contains only the parser.**
//!
//! This is a low-level event-based parsing API for YAML. It allows users to fetch a stream of
//! YAML events from a stream of characters/bytes.
//!
//! # Usage
//!
//! ```toml
//! [dependencies]
//! peridot-parser = "0.1"
//! ```
//!
//! # Features
//! #### `encoding` (enabled by default)
//! Enables [`decode_bytes`], which detects the encoding of a byte stream (UTF-8, UTF-16LE or
//! UTF-16BE, with or without a byte order mark) and decodes it prior to parsing.
//!
//! #### `comments`
//! Makes the scanner capture comments instead of discarding them. Comments are classified
//! relative to the surrounding tokens and can be drained with [`Parser::unfold_comments`].

#![warn(missing_docs, clippy::pedantic)]

pub mod char_traits;
#[cfg(feature = "encoding")]
mod decode;
pub mod input;
mod limits;
mod parser;
mod scanner;

#[cfg(feature = "encoding")]
pub use crate::decode::{decode_bytes, DecodeError};
pub use crate::input::{str::StrInput, BufferedInput, Input, SkipTabs};
pub use crate::limits::Limits;
pub use crate::parser::{
    CollectionStyle, Event, EventReceiver, ParseResult, Parser, SpannedEventReceiver, Tag,
};
#[cfg(feature = "comments")]
pub use crate::scanner::{Comment, CommentKind};
pub use crate::scanner::{
    Marker, ScalarStyle, ScanError, ScanResult, Scanner, Span, Token, TokenType,
};
