//! Error types for composing and emitting.

use peridot_parser::{Marker, ScanError};

/// An error raised while composing a document from events.
///
/// All variants carry the position at which composition failed, rendered the same way as
/// [`ScanError`]: `"<problem> at byte N line L column C"`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ComposeError {
    /// The cumulative alias expansion exceeded [`Limits::max_alias_expansion`].
    ///
    /// [`Limits::max_alias_expansion`]: peridot_parser::Limits
    #[error("excessive aliasing at byte {} line {} column {}", .0.index(), .0.line(), .0.col() + 1)]
    ExcessiveAliasing(Marker),
    /// A mapping key appeared twice while `unique-keys` was enabled.
    #[error(
        "duplicate mapping key at byte {} line {} column {} (first defined at line {} column {})",
        .second.index(), .second.line(), .second.col() + 1, .first.line(), .first.col() + 1
    )]
    DuplicateKey {
        /// Where the key was first defined.
        first: Marker,
        /// Where the key was defined again.
        second: Marker,
    },
    /// An alias referenced an anchor that is not visible at this point.
    ///
    /// The parser already checks anchor existence; the composer additionally rejects aliases to
    /// nodes still under construction, which is how anchor cycles surface.
    #[error("unknown anchor '{name}' referenced at byte {} line {} column {}", .mark.index(), .mark.line(), .mark.col() + 1)]
    UnknownAnchor {
        /// The anchor name the alias used.
        name: String,
        /// Where the alias appears.
        mark: Marker,
    },
    /// A `<<` merge value was neither a mapping nor a sequence of mappings.
    #[error("map merge requires map or sequence of maps as the value at byte {} line {} column {}", .0.index(), .0.line(), .0.col() + 1)]
    InvalidMerge(Marker),
    /// An explicitly `!!binary`-tagged scalar did not hold valid base64.
    #[error("invalid base64 in !!binary scalar at byte {} line {} column {}", .0.index(), .0.line(), .0.col() + 1)]
    InvalidBinary(Marker),
    /// A second document was found while loading in single-document mode.
    #[error("expected a single document in the stream at byte {} line {} column {}", .0.index(), .0.line(), .0.col() + 1)]
    MoreThanOneDocument(Marker),
}

/// An error raised while emitting.
#[derive(Debug, thiserror::Error)]
pub enum EmitError {
    /// A write on the underlying sink failed. The partial output must be discarded.
    #[error("write error: {0}")]
    Fmt(#[from] std::fmt::Error),
    /// An alias node references a node that carries no anchor name.
    #[error("alias to a node without an anchor")]
    AliasWithoutAnchor,
    /// A mapping node holds an odd number of children.
    #[error("mapping with an odd number of children")]
    OddMapping,
}

/// An error raised while setting a formatting or loading option.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OptionsError {
    /// The option name is not recognized.
    #[error("option not found: '{0}'")]
    NotFound(String),
    /// The option value did not parse.
    #[error("invalid value '{value}' for option '{name}'")]
    InvalidValue {
        /// The option name.
        name: String,
        /// The rejected value.
        value: String,
    },
}

/// Any error this crate can produce.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The input byte stream could not be decoded.
    #[cfg(feature = "encoding")]
    #[error(transparent)]
    Decode(#[from] peridot_parser::DecodeError),
    /// A lexical or grammatical error from the scanner or parser.
    #[error(transparent)]
    Scan(#[from] ScanError),
    /// An error while composing the document tree.
    #[error(transparent)]
    Compose(#[from] ComposeError),
    /// An error while emitting.
    #[error(transparent)]
    Emit(#[from] EmitError),
    /// An unknown or malformed option.
    #[error(transparent)]
    Options(#[from] OptionsError),
}

#[cfg(test)]
mod tests {
    use super::ComposeError;
    use peridot_parser::Marker;

    #[test]
    fn compose_errors_render_byte_line_column() {
        let err = ComposeError::ExcessiveAliasing(Marker::new(26, 4, 3));
        assert_eq!(err.to_string(), "excessive aliasing at byte 26 line 4 column 4");
    }

    #[test]
    fn duplicate_key_renders_both_positions() {
        let err = ComposeError::DuplicateKey {
            first: Marker::new(0, 1, 0),
            second: Marker::new(10, 3, 2),
        };
        assert_eq!(
            err.to_string(),
            "duplicate mapping key at byte 10 line 3 column 3 (first defined at line 1 column 1)"
        );
    }
}
