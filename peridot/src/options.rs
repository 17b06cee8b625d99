//! Loading and formatting options.

use crate::error::OptionsError;

/// The line break style used when emitting.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum LineBreak {
    /// `\n` (default).
    #[default]
    Ln,
    /// `\r`.
    Cr,
    /// `\r\n`.
    CrLn,
}

impl LineBreak {
    /// Return the break as written to the output.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            LineBreak::Ln => "\n",
            LineBreak::Cr => "\r",
            LineBreak::CrLn => "\r\n",
        }
    }
}

/// Options controlling loading and emitting.
///
/// Options can be set programmatically through the public fields, or from string pairs through
/// [`Options::set`] for callers driven by configuration. Unknown names fail fast, never silently
/// ignore.
#[derive(Clone, PartialEq, Eq, Debug)]
#[allow(clippy::struct_excessive_bools)]
pub struct Options {
    /// Number of spaces per indentation level when emitting, 2 to 9.
    pub indent: usize,
    /// Whether a block sequence nested under a mapping key keeps its dashes in the key's column
    /// (the default) instead of one indentation level deeper.
    pub compact_seq_indent: bool,
    /// Preferred line width when folding long scalars. `-1` means unlimited.
    pub line_width: i64,
    /// Whether non-ASCII characters pass through unescaped.
    pub unicode: bool,
    /// Whether composing rejects duplicate mapping keys.
    pub unique_keys: bool,
    /// Whether to emit in canonical form: explicit markers, explicit tags, quoted scalars.
    pub canonical: bool,
    /// The line break style used when emitting.
    pub line_break: LineBreak,
    /// Whether to always emit the `---` document start marker.
    pub explicit_start: bool,
    /// Whether to always emit the `...` document end marker.
    pub explicit_end: bool,
    /// Whether collections whose items are all scalars are emitted in flow style.
    pub flow_simple_coll: bool,
    /// Whether a binding layer should reject fields absent from the target type. Stored for the
    /// reflection boundary, never interpreted by this crate.
    pub known_fields: bool,
    /// Whether loading fails if the stream holds more than one document.
    pub single_document: bool,
    /// Whether loading returns every document of the stream.
    pub all_documents: bool,
    /// Whether loading surfaces stream boundaries as documents of their own.
    pub stream_nodes: bool,
}

impl Default for Options {
    fn default() -> Options {
        Options {
            indent: 2,
            compact_seq_indent: true,
            line_width: 80,
            unicode: true,
            unique_keys: true,
            canonical: false,
            line_break: LineBreak::default(),
            explicit_start: false,
            explicit_end: false,
            flow_simple_coll: false,
            known_fields: false,
            single_document: false,
            all_documents: true,
            stream_nodes: false,
        }
    }
}

impl Options {
    /// Create the default option set.
    #[must_use]
    pub fn new() -> Options {
        Options::default()
    }

    /// Set an option from its string name and value.
    ///
    /// Recognized names are `indent`, `compact-seq-indent`, `line-width`, `unicode`,
    /// `unique-keys`, `canonical`, `line-break`, `explicit-start`, `explicit-end`,
    /// `flow-simple-coll`, `known-fields`, `single-document`, `all-documents` and
    /// `stream-nodes`.
    ///
    /// # Errors
    /// Returns [`OptionsError::NotFound`] for an unknown name and [`OptionsError::InvalidValue`]
    /// for a value that does not parse.
    pub fn set(&mut self, name: &str, value: &str) -> Result<(), OptionsError> {
        match name {
            "indent" => {
                let v = parse_int(name, value)?;
                self.indent = usize::try_from(v.clamp(2, 9)).unwrap_or(2);
            }
            "compact-seq-indent" => self.compact_seq_indent = parse_bool(name, value)?,
            "line-width" => self.line_width = parse_int(name, value)?,
            "unicode" => self.unicode = parse_bool(name, value)?,
            "unique-keys" => self.unique_keys = parse_bool(name, value)?,
            "canonical" => self.canonical = parse_bool(name, value)?,
            "line-break" => {
                self.line_break = match value {
                    "ln" => LineBreak::Ln,
                    "cr" => LineBreak::Cr,
                    "crln" => LineBreak::CrLn,
                    _ => return Err(invalid(name, value)),
                };
            }
            "explicit-start" => self.explicit_start = parse_bool(name, value)?,
            "explicit-end" => self.explicit_end = parse_bool(name, value)?,
            "flow-simple-coll" => self.flow_simple_coll = parse_bool(name, value)?,
            "known-fields" => self.known_fields = parse_bool(name, value)?,
            "single-document" => self.single_document = parse_bool(name, value)?,
            "all-documents" => self.all_documents = parse_bool(name, value)?,
            "stream-nodes" => self.stream_nodes = parse_bool(name, value)?,
            _ => return Err(OptionsError::NotFound(name.to_owned())),
        }
        Ok(())
    }
}

fn invalid(name: &str, value: &str) -> OptionsError {
    OptionsError::InvalidValue {
        name: name.to_owned(),
        value: value.to_owned(),
    }
}

fn parse_bool(name: &str, value: &str) -> Result<bool, OptionsError> {
    match value {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(invalid(name, value)),
    }
}

fn parse_int(name: &str, value: &str) -> Result<i64, OptionsError> {
    value.parse::<i64>().map_err(|_| invalid(name, value))
}

#[cfg(test)]
mod tests {
    use super::{LineBreak, Options};
    use crate::error::OptionsError;

    #[test]
    fn unknown_option_fails_fast() {
        let mut opts = Options::new();
        assert_eq!(
            opts.set("no-such-option", "true"),
            Err(OptionsError::NotFound("no-such-option".to_owned()))
        );
        let err = opts.set("no-such-option", "true").unwrap_err();
        assert_eq!(err.to_string(), "option not found: 'no-such-option'");
    }

    #[test]
    fn indent_is_clamped() {
        let mut opts = Options::new();
        opts.set("indent", "1").unwrap();
        assert_eq!(opts.indent, 2);
        opts.set("indent", "42").unwrap();
        assert_eq!(opts.indent, 9);
        opts.set("indent", "4").unwrap();
        assert_eq!(opts.indent, 4);
    }

    #[test]
    fn malformed_values_are_rejected() {
        let mut opts = Options::new();
        assert!(opts.set("unique-keys", "maybe").is_err());
        assert!(opts.set("line-width", "wide").is_err());
        assert!(opts.set("line-break", "lf").is_err());
    }

    #[test]
    fn recognized_keys_round_trip() {
        let mut opts = Options::new();
        opts.set("line-break", "crln").unwrap();
        assert_eq!(opts.line_break, LineBreak::CrLn);
        opts.set("explicit-start", "true").unwrap();
        assert!(opts.explicit_start);
        opts.set("single-document", "true").unwrap();
        assert!(opts.single_document);
    }
}
