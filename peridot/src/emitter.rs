//! Rendering [`Document`] trees back to YAML text.
//!
//! The emitter picks a presentation for every scalar so that the output re-composes to a
//! structurally equal tree. Style recorded on a node is honored when it is valid for the value,
//! and overridden when it is not.

use std::fmt;

use base64::Engine;

use crate::error::EmitError;
use crate::node::{Document, Node, NodeId, NodeKind, NodeStyle};
use crate::options::Options;
use crate::resolve;

/// A convenience alias for emitter results.
pub type EmitResult = Result<(), EmitError>;

/// The YAML serializer.
#[allow(clippy::module_name_repetitions)]
pub struct Emitter<'a> {
    writer: &'a mut dyn fmt::Write,
    opts: Options,
    emitted_docs: usize,
}

/// The presentation chosen for one scalar.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum ScalarForm {
    Plain,
    SingleQuoted,
    DoubleQuoted,
    Literal,
    Folded,
}

impl<'a> Emitter<'a> {
    /// Create an emitter with default options writing to `writer`.
    pub fn new(writer: &'a mut dyn fmt::Write) -> Emitter<'a> {
        Emitter::with_options(writer, Options::default())
    }

    /// Create an emitter with the given options.
    pub fn with_options(writer: &'a mut dyn fmt::Write, mut opts: Options) -> Emitter<'a> {
        opts.indent = opts.indent.clamp(2, 9);
        Emitter {
            writer,
            opts,
            emitted_docs: 0,
        }
    }

    /// Emit one document. Call repeatedly to emit a multi-document stream.
    ///
    /// # Errors
    /// Returns [`EmitError::Fmt`] when the sink fails, [`EmitError::OddMapping`] for a mapping
    /// with an odd number of children and [`EmitError::AliasWithoutAnchor`] for an alias whose
    /// target has no anchor name.
    pub fn dump(&mut self, doc: &Document) -> EmitResult {
        let marker = self.opts.explicit_start
            || self.opts.canonical
            || doc.explicit_start
            || self.emitted_docs > 0;
        let Some(root) = doc.root() else {
            if marker {
                self.writer.write_str("---")?;
                self.write_break()?;
            }
            self.emitted_docs += 1;
            return Ok(());
        };
        if self.is_inline(doc, root) {
            if marker {
                self.writer.write_str("--- ")?;
            }
            self.emit_node(doc, root, 0, false)?;
        } else {
            // Anchor and tag of a block collection go on the directive's line, or on a line of
            // their own, so the body starts at column 0.
            let props = self.node_props(doc.node(root));
            if marker {
                self.writer.write_str("---")?;
                if !props.is_empty() {
                    write!(self.writer, " {props}")?;
                }
                self.write_break()?;
            } else if !props.is_empty() {
                self.writer.write_str(&props)?;
                self.write_break()?;
            }
            self.emit_collection(doc, root, 0)?;
        }
        self.write_break()?;
        if self.opts.explicit_end || doc.explicit_end {
            self.writer.write_str("...")?;
            self.write_break()?;
        }
        self.emitted_docs += 1;
        Ok(())
    }

    fn write_break(&mut self) -> EmitResult {
        self.writer.write_str(self.opts.line_break.as_str())?;
        Ok(())
    }

    fn write_indent(&mut self, level: usize) -> EmitResult {
        for _ in 0..level * self.opts.indent {
            self.writer.write_str(" ")?;
        }
        Ok(())
    }

    /// Whether the node renders on the line it starts on, with no leading break.
    fn is_inline(&self, doc: &Document, id: NodeId) -> bool {
        let node = doc.node(id);
        match node.kind {
            NodeKind::Scalar | NodeKind::Alias => true,
            NodeKind::Sequence | NodeKind::Mapping => {
                self.use_flow(doc, node) || node.content.is_empty()
            }
        }
    }

    fn use_flow(&self, doc: &Document, node: &Node) -> bool {
        if self.opts.canonical || node.style == NodeStyle::Flow || node.content.is_empty() {
            return true;
        }
        self.opts.flow_simple_coll
            && node
                .content
                .iter()
                .all(|&c| doc.node(doc.deref(c)).kind == NodeKind::Scalar)
    }

    fn emit_node(&mut self, doc: &Document, id: NodeId, level: usize, in_flow: bool) -> EmitResult {
        let node = doc.node(id);
        match node.kind {
            NodeKind::Alias => {
                let target = doc.deref(id);
                let anchor = &doc.node(target).anchor;
                if anchor.is_empty() {
                    return Err(EmitError::AliasWithoutAnchor);
                }
                write!(self.writer, "*{anchor}")?;
                Ok(())
            }
            NodeKind::Scalar => {
                self.emit_props(node)?;
                self.emit_scalar(node, level, in_flow)
            }
            NodeKind::Sequence | NodeKind::Mapping => {
                self.emit_props(node)?;
                self.emit_collection(doc, id, level)
            }
        }
    }

    /// Write a collection's body, without its anchor or tag.
    fn emit_collection(&mut self, doc: &Document, id: NodeId, level: usize) -> EmitResult {
        let node = doc.node(id);
        match node.kind {
            NodeKind::Sequence => {
                if self.use_flow(doc, node) {
                    self.emit_flow_seq(doc, node, level)
                } else {
                    self.emit_block_seq(doc, node, level)
                }
            }
            NodeKind::Mapping => {
                if node.content.len() % 2 != 0 {
                    return Err(EmitError::OddMapping);
                }
                if self.use_flow(doc, node) {
                    self.emit_flow_map(doc, node, level)
                } else {
                    self.emit_block_map(doc, node, level)
                }
            }
            NodeKind::Scalar | NodeKind::Alias => unreachable!("not a collection"),
        }
    }

    /// The node's anchor and tag as they are written out, or an empty string.
    fn node_props(&self, node: &Node) -> String {
        let mut props = String::new();
        if !node.anchor.is_empty() {
            props.push('&');
            props.push_str(&node.anchor);
        }
        let binary = node.has_core_tag("binary");
        if (!node.tag_implicit || self.opts.canonical) && !binary {
            if !props.is_empty() {
                props.push(' ');
            }
            if node.tag.is_yaml_core_schema() {
                props.push_str("!!");
                props.push_str(&node.tag.suffix);
            } else if node.tag.handle == "!" {
                props.push('!');
                props.push_str(&node.tag.suffix);
            } else {
                props.push_str("!<");
                props.push_str(&node.tag.handle);
                props.push_str(&node.tag.suffix);
                props.push('>');
            }
        }
        props
    }

    /// Write the node's anchor and tag, when present, followed by a space.
    fn emit_props(&mut self, node: &Node) -> EmitResult {
        let props = self.node_props(node);
        if !props.is_empty() {
            write!(self.writer, "{props} ")?;
        }
        Ok(())
    }

    fn emit_flow_seq(&mut self, doc: &Document, node: &Node, level: usize) -> EmitResult {
        self.writer.write_str("[")?;
        for (i, &item) in node.content.iter().enumerate() {
            if i > 0 {
                self.writer.write_str(", ")?;
            }
            self.emit_node(doc, item, level + 1, true)?;
        }
        self.writer.write_str("]")?;
        Ok(())
    }

    fn emit_flow_map(&mut self, doc: &Document, node: &Node, level: usize) -> EmitResult {
        self.writer.write_str("{")?;
        for (i, pair) in node.content.chunks_exact(2).enumerate() {
            if i > 0 {
                self.writer.write_str(", ")?;
            }
            self.emit_node(doc, pair[0], level + 1, true)?;
            self.writer.write_str(": ")?;
            self.emit_node(doc, pair[1], level + 1, true)?;
        }
        self.writer.write_str("}")?;
        Ok(())
    }

    fn emit_block_seq(&mut self, doc: &Document, node: &Node, level: usize) -> EmitResult {
        for (i, &item) in node.content.iter().enumerate() {
            if i > 0 {
                self.write_break()?;
            }
            self.write_indent(level)?;
            self.writer.write_str("-")?;
            self.emit_block_child(doc, item, level + 1)?;
        }
        Ok(())
    }

    /// Write a block child after its `-` or `:` indicator.
    ///
    /// A block collection child keeps its anchor and tag on the indicator's line, so its body
    /// starts flush on the next line.
    fn emit_block_child(&mut self, doc: &Document, id: NodeId, level: usize) -> EmitResult {
        if self.is_inline(doc, id) {
            self.writer.write_str(" ")?;
            self.emit_node(doc, id, level, false)
        } else {
            let props = self.node_props(doc.node(id));
            if !props.is_empty() {
                write!(self.writer, " {props}")?;
            }
            self.write_break()?;
            self.emit_collection(doc, id, level)
        }
    }

    fn emit_block_map(&mut self, doc: &Document, node: &Node, level: usize) -> EmitResult {
        for (i, pair) in node.content.chunks_exact(2).enumerate() {
            if i > 0 {
                self.write_break()?;
            }
            self.write_indent(level)?;
            let key = doc.node(doc.deref(pair[0]));
            let simple_key = key.kind == NodeKind::Scalar && !key.value.contains('\n');
            if simple_key {
                self.emit_node(doc, pair[0], level, false)?;
                self.writer.write_str(":")?;
            } else {
                self.writer.write_str("? ")?;
                self.emit_node(doc, pair[0], level + 1, false)?;
                self.write_break()?;
                self.write_indent(level)?;
                self.writer.write_str(":")?;
            }
            let value = doc.node(doc.deref(pair[1]));
            let compact_seq = self.opts.compact_seq_indent
                && value.kind == NodeKind::Sequence
                && !self.use_flow(doc, value);
            let child_level = if compact_seq { level } else { level + 1 };
            self.emit_block_child(doc, pair[1], child_level)?;
        }
        Ok(())
    }

    fn emit_scalar(&mut self, node: &Node, level: usize, in_flow: bool) -> EmitResult {
        if node.has_core_tag("binary") {
            let bytes: Vec<u8> = node.value.chars().map(|c| c as u8).collect();
            let encoded = base64::engine::general_purpose::STANDARD.encode(bytes);
            write!(self.writer, "!!binary {encoded}")?;
            return Ok(());
        }
        match self.scalar_form(node, in_flow) {
            ScalarForm::Plain => {
                self.writer.write_str(&node.value)?;
            }
            ScalarForm::SingleQuoted => {
                self.writer.write_str("'")?;
                self.writer.write_str(&node.value.replace('\'', "''"))?;
                self.writer.write_str("'")?;
            }
            ScalarForm::DoubleQuoted => self.write_double_quoted(&node.value)?,
            ScalarForm::Literal => self.write_literal(&node.value, level.max(1))?,
            ScalarForm::Folded => self.write_folded(&node.value, level.max(1))?,
        }
        Ok(())
    }

    fn scalar_form(&self, node: &Node, in_flow: bool) -> ScalarForm {
        let v = &node.value;
        if self.opts.canonical {
            return ScalarForm::DoubleQuoted;
        }
        if v.is_empty() {
            return ScalarForm::DoubleQuoted;
        }
        if !self.opts.unicode && !v.is_ascii() {
            return ScalarForm::DoubleQuoted;
        }
        if v.chars().all(char::is_whitespace) {
            return ScalarForm::DoubleQuoted;
        }
        // NEL, LS and PS read back as line breaks, so they only survive escaped.
        if v.contains(['\u{85}', '\u{2028}', '\u{2029}']) {
            return ScalarForm::DoubleQuoted;
        }
        if v.contains('\n') {
            if in_flow || !literal_ok(v) {
                return ScalarForm::DoubleQuoted;
            }
            if node.style == NodeStyle::Folded && foldable(v) {
                return ScalarForm::Folded;
            }
            return ScalarForm::Literal;
        }
        if v.chars().any(char::is_control) || v.starts_with(' ') || v.ends_with(' ') {
            return ScalarForm::DoubleQuoted;
        }
        if node.style == NodeStyle::DoubleQuoted {
            return ScalarForm::DoubleQuoted;
        }
        // A plain rendering must resolve back to the node's own tag.
        let ambiguous = node.has_core_tag("str") && resolve::is_ambiguous_as_plain(v);
        if ambiguous || !plain_safe(v, in_flow) {
            return ScalarForm::SingleQuoted;
        }
        ScalarForm::Plain
    }

    fn write_double_quoted(&mut self, value: &str) -> EmitResult {
        self.writer.write_str("\"")?;
        for ch in value.chars() {
            match ch {
                '"' => self.writer.write_str("\\\"")?,
                '\\' => self.writer.write_str("\\\\")?,
                '\n' => self.writer.write_str("\\n")?,
                '\t' => self.writer.write_str("\\t")?,
                '\r' => self.writer.write_str("\\r")?,
                '\0' => self.writer.write_str("\\0")?,
                '\x07' => self.writer.write_str("\\a")?,
                '\x08' => self.writer.write_str("\\b")?,
                '\x0b' => self.writer.write_str("\\v")?,
                '\x0c' => self.writer.write_str("\\f")?,
                '\x1b' => self.writer.write_str("\\e")?,
                '\u{85}' => self.writer.write_str("\\N")?,
                '\u{a0}' => self.writer.write_str("\\_")?,
                '\u{2028}' => self.writer.write_str("\\L")?,
                '\u{2029}' => self.writer.write_str("\\P")?,
                c if c.is_control() => {
                    let code = u32::from(c);
                    if code <= 0xff {
                        write!(self.writer, "\\x{code:02x}")?;
                    } else if code <= 0xffff {
                        write!(self.writer, "\\u{code:04x}")?;
                    } else {
                        write!(self.writer, "\\U{code:08x}")?;
                    }
                }
                c if !self.opts.unicode && !c.is_ascii() => {
                    let code = u32::from(c);
                    if code <= 0xffff {
                        write!(self.writer, "\\u{code:04x}")?;
                    } else {
                        write!(self.writer, "\\U{code:08x}")?;
                    }
                }
                c => self.writer.write_char(c)?,
            }
        }
        self.writer.write_str("\"")?;
        Ok(())
    }

    fn write_literal(&mut self, value: &str, level: usize) -> EmitResult {
        self.writer.write_char('|')?;
        let trailing = value.len() - value.trim_end_matches('\n').len();
        match trailing {
            0 => self.writer.write_str("-")?,
            1 => {}
            _ => self.writer.write_str("+")?,
        }
        let body = if trailing <= 1 {
            value.trim_end_matches('\n')
        } else {
            &value[..value.len() - 1]
        };
        for line in body.split('\n') {
            self.write_break()?;
            if !line.is_empty() {
                self.write_indent(level)?;
                self.writer.write_str(line)?;
            }
        }
        Ok(())
    }

    fn write_folded(&mut self, value: &str, level: usize) -> EmitResult {
        self.writer.write_char('>')?;
        if !value.ends_with('\n') {
            self.writer.write_str("-")?;
        }
        let width = if self.opts.line_width > 0 {
            usize::try_from(self.opts.line_width).unwrap_or(usize::MAX)
        } else {
            usize::MAX
        };
        for (li, line) in value.trim_end_matches('\n').split('\n').enumerate() {
            if li > 0 {
                // A blank line is what restores the newline when re-parsed.
                self.write_break()?;
            }
            let mut col = 0usize;
            for (wi, word) in line.split(' ').enumerate() {
                if wi > 0 && col.saturating_add(1 + word.len()) <= width {
                    self.writer.write_str(" ")?;
                    col += 1 + word.len();
                } else {
                    self.write_break()?;
                    self.write_indent(level)?;
                    col = level * self.opts.indent + word.len();
                }
                self.writer.write_str(word)?;
            }
        }
        Ok(())
    }
}

/// Whether a multiline value can be written as a literal block scalar.
fn literal_ok(value: &str) -> bool {
    if value.chars().any(|c| c.is_control() && c != '\n') {
        return false;
    }
    // Leading spaces would need an indentation indicator, trailing spaces are fragile.
    value
        .split('\n')
        .all(|line| !line.starts_with(' ') && !line.ends_with(' '))
}

/// Whether a value survives folded style, which joins single breaks with a space.
fn foldable(value: &str) -> bool {
    literal_ok(value) && !value.contains("\n\n") && value.split('\n').all(|l| !l.contains("  "))
}

/// Whether a value can be written without quotes in the given context.
fn plain_safe(value: &str, in_flow: bool) -> bool {
    let mut chars = value.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    if matches!(
        first,
        '-' | '?' | ':' | ',' | '[' | ']' | '{' | '}' | '#' | '&' | '*' | '!' | '|' | '>' | '\''
            | '"' | '%' | '@' | '`'
    ) {
        // Indicators are only unsafe when they start a token on their own.
        let second = value[first.len_utf8()..].chars().next();
        if matches!(first, '-' | '?' | ':') {
            if second.map_or(true, |c| c == ' ') {
                return false;
            }
        } else {
            return false;
        }
    }
    if value.contains(": ") || value.ends_with(':') || value.contains(" #") {
        return false;
    }
    if in_flow && value.contains([',', '[', ']', '{', '}']) {
        return false;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::Emitter;
    use crate::composer::Composer;
    use crate::node::{Document, Node, NodeStyle};
    use crate::options::Options;
    use crate::resolve::core_tag;

    fn emit(doc: &Document) -> String {
        let mut out = String::new();
        Emitter::new(&mut out).dump(doc).unwrap();
        out
    }

    fn emit_str_scalar(value: &str) -> String {
        let mut doc = Document::new();
        let id = doc.push(Node::scalar(
            core_tag("str"),
            true,
            value.to_owned(),
            NodeStyle::Plain,
        ));
        doc.set_root(id);
        emit(&doc)
    }

    #[test]
    fn simple_strings_stay_plain() {
        assert_eq!(emit_str_scalar("hello"), "hello\n");
    }

    #[test]
    fn mapping_lookalikes_are_single_quoted() {
        assert_eq!(emit_str_scalar("a: b"), "'a: b'\n");
    }

    #[test]
    fn whitespace_only_strings_are_double_quoted() {
        assert_eq!(emit_str_scalar("\t\n"), "\"\\t\\n\"\n");
    }

    #[test]
    fn multiline_strings_become_literal_blocks() {
        assert_eq!(emit_str_scalar("hello\nworld"), "|-\n  hello\n  world\n");
    }

    #[test]
    fn number_lookalike_strings_are_quoted() {
        assert_eq!(emit_str_scalar("42"), "'42'\n");
        assert_eq!(emit_str_scalar("null"), "'null'\n");
    }

    #[test]
    fn binary_nodes_reencode_as_base64() {
        let mut doc = Document::new();
        let id = doc.push(Node::scalar(
            core_tag("binary"),
            false,
            "hello".to_owned(),
            NodeStyle::Plain,
        ));
        doc.set_root(id);
        assert_eq!(emit(&doc), "!!binary aGVsbG8=\n");
    }

    #[test]
    fn block_mapping_with_nested_sequence() {
        let mut composer = Composer::new();
        let docs = composer.load_from_str("a:\n- 1\n- 2\nb: ok\n").unwrap();
        assert_eq!(emit(&docs[0]), "a:\n- 1\n- 2\nb: ok\n");
    }

    #[test]
    fn compact_seq_indent_can_be_disabled() {
        let mut composer = Composer::new();
        let docs = composer.load_from_str("a:\n- 1\n").unwrap();
        let mut opts = Options::default();
        opts.set("compact-seq-indent", "false").unwrap();
        let mut out = String::new();
        Emitter::with_options(&mut out, opts).dump(&docs[0]).unwrap();
        assert_eq!(out, "a:\n  - 1\n");
    }

    #[test]
    fn explicit_markers_are_honored() {
        let mut composer = Composer::new();
        let docs = composer.load_from_str("hi\n").unwrap();
        let mut opts = Options::default();
        opts.set("explicit-start", "true").unwrap();
        opts.set("explicit-end", "true").unwrap();
        let mut out = String::new();
        Emitter::with_options(&mut out, opts).dump(&docs[0]).unwrap();
        assert_eq!(out, "--- hi\n...\n");
    }

    #[test]
    fn second_document_gets_a_separator() {
        let mut composer = Composer::new();
        let docs = composer.load_from_str("a\n---\nb\n").unwrap();
        let mut out = String::new();
        let mut emitter = Emitter::new(&mut out);
        emitter.dump(&docs[0]).unwrap();
        emitter.dump(&docs[1]).unwrap();
        assert_eq!(out, "a\n--- b\n");
    }

    #[test]
    fn anchors_and_aliases_round_trip() {
        let mut composer = Composer::new();
        let docs = composer.load_from_str("a: &x [1, 2]\nb: *x\n").unwrap();
        let out = emit(&docs[0]);
        assert!(out.contains('&'));
        assert!(out.contains('*'));
        let docs2 = Composer::new().load_from_str(&out).unwrap();
        let (d1, d2) = (&docs[0], &docs2[0]);
        assert!(d1.structural_eq(d1.root().unwrap(), d2, d2.root().unwrap()));
    }

    #[test]
    fn anchored_block_collections_keep_the_anchor_on_the_key_line() {
        let mut composer = Composer::new();
        let docs = composer.load_from_str("base: &b\n  x: 1\nother: *b\n").unwrap();
        let out = emit(&docs[0]);
        assert_eq!(out, "base: &id001\n  x: 1\nother: *id001\n");
        let docs2 = Composer::new().load_from_str(&out).unwrap();
        let (d1, d2) = (&docs[0], &docs2[0]);
        assert!(d1.structural_eq(d1.root().unwrap(), d2, d2.root().unwrap()));
    }

    #[test]
    fn anchored_block_root_gets_a_line_of_its_own() {
        let mut doc = Document::new();
        let k = doc.push(Node::scalar(
            core_tag("str"),
            true,
            "x".to_owned(),
            NodeStyle::Plain,
        ));
        let v = doc.push(Node::scalar(
            core_tag("int"),
            true,
            "1".to_owned(),
            NodeStyle::Plain,
        ));
        let mut map = Node::mapping(core_tag("map"), true, NodeStyle::Plain);
        map.content.push(k);
        map.content.push(v);
        map.anchor = "a".to_owned();
        let root = doc.push(map);
        doc.set_root(root);
        assert_eq!(emit(&doc), "&a\nx: 1\n");
    }

    #[test]
    fn unicode_line_separators_are_escaped() {
        assert_eq!(emit_str_scalar("\u{2028}!"), "\"\\L!\"\n");
        assert_eq!(emit_str_scalar("a\u{85}b"), "\"a\\Nb\"\n");
        assert_eq!(emit_str_scalar("p\u{2029}q"), "\"p\\Pq\"\n");
    }

    #[test]
    fn flow_style_from_the_source_survives() {
        let mut composer = Composer::new();
        let docs = composer.load_from_str("a: [1, 2]\nb: {x: 1}\n").unwrap();
        assert_eq!(emit(&docs[0]), "a: [1, 2]\nb: {x: 1}\n");
    }

    #[test]
    fn flow_simple_coll_uses_flow_style() {
        let mut composer = Composer::new();
        let docs = composer.load_from_str("nums:\n- 1\n- 2\n").unwrap();
        let mut opts = Options::default();
        opts.set("flow-simple-coll", "true").unwrap();
        let mut out = String::new();
        Emitter::with_options(&mut out, opts).dump(&docs[0]).unwrap();
        assert_eq!(out, "nums: [1, 2]\n");
    }

    #[test]
    fn crln_line_breaks() {
        let mut composer = Composer::new();
        let docs = composer.load_from_str("a: 1\nb: 2\n").unwrap();
        let mut opts = Options::default();
        opts.set("line-break", "crln").unwrap();
        let mut out = String::new();
        Emitter::with_options(&mut out, opts).dump(&docs[0]).unwrap();
        assert_eq!(out, "a: 1\r\nb: 2\r\n");
    }
}
