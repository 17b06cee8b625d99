//! Composing event streams into [`Document`] trees.
//!
//! The composer pulls events from a [`Parser`] and builds the node arena bottom-up with an
//! explicit stack, so document depth never translates into call stack depth. Alias expansion is
//! metered against [`Limits::max_alias_expansion`] and anchors only become visible once the
//! anchored node is complete, which is what rejects anchor cycles.

use std::collections::HashMap;

use base64::Engine;
use hashlink::LinkedHashMap;
use peridot_parser::{
    CollectionStyle, Event, Input, Limits, Marker, Parser, ScalarStyle, ScanError, Span, Tag,
};

#[cfg(feature = "comments")]
use crate::comments::{CommentStrategy, DropComments, MappingPairContext};
use crate::error::{ComposeError, Error};
use crate::node::{Document, Node, NodeId, NodeKind, NodeStyle};
use crate::options::Options;
use crate::resolve;

/// Builds [`Document`] trees from YAML text.
///
/// A composer is reusable: each `load_*` call parses an independent stream with the same options
/// and limits.
pub struct Composer {
    opts: Options,
    limits: Limits,
    #[cfg(feature = "comments")]
    strategy: Box<dyn CommentStrategy>,
}

impl Default for Composer {
    fn default() -> Composer {
        Composer::new()
    }
}

impl Composer {
    /// Create a composer with default options and limits.
    #[must_use]
    pub fn new() -> Composer {
        Composer {
            opts: Options::default(),
            limits: Limits::default(),
            #[cfg(feature = "comments")]
            strategy: Box::new(DropComments),
        }
    }

    /// Create a composer with the given options.
    #[must_use]
    pub fn with_options(opts: Options) -> Composer {
        Composer {
            opts,
            ..Composer::new()
        }
    }

    /// Replace the structural limits.
    #[must_use]
    pub fn limits(mut self, limits: Limits) -> Composer {
        self.limits = limits;
        self
    }

    /// Replace the comment strategy. Comments are dropped unless this is called.
    #[cfg(feature = "comments")]
    #[must_use]
    pub fn comment_strategy(mut self, strategy: Box<dyn CommentStrategy>) -> Composer {
        self.strategy = strategy;
        self
    }

    /// Load every document of `input`.
    ///
    /// # Errors
    /// Returns an error on malformed input, on a violated limit, or when the stream disagrees
    /// with the `single-document` option.
    pub fn load_from_str(&mut self, input: &str) -> Result<Vec<Document>, Error> {
        let mut parser = Parser::new_from_str_with_limits(input, self.limits);
        self.load(&mut parser)
    }

    /// Decode `input` and load every document in it.
    ///
    /// # Errors
    /// Returns an error when the bytes cannot be decoded, plus everything
    /// [`Composer::load_from_str`] can return.
    #[cfg(feature = "encoding")]
    pub fn load_from_bytes(&mut self, input: &[u8]) -> Result<Vec<Document>, Error> {
        let text = peridot_parser::decode_bytes(input)?;
        self.load_from_str(&text)
    }

    /// Load every document produced by `parser`.
    ///
    /// # Errors
    /// Returns an error on malformed input, on a violated limit, or when the stream disagrees
    /// with the `single-document` option.
    pub fn load<I: Input>(&mut self, parser: &mut Parser<I>) -> Result<Vec<Document>, Error> {
        let (ev, span) = parser.next_event()?;
        if ev != Event::StreamStart {
            return Err(ScanError::new_str(span.start, "did not find expected <stream-start>").into());
        }

        let mut docs = Vec::new();
        let mut budget_used = 0u64;
        loop {
            let (ev, span) = parser.next_event()?;
            match ev {
                Event::StreamEnd => break,
                Event::DocumentStart(explicit) => {
                    if self.opts.single_document && !docs.is_empty() {
                        return Err(ComposeError::MoreThanOneDocument(span.start).into());
                    }
                    let doc = self.compose_document(parser, explicit, &mut budget_used)?;
                    docs.push(doc);
                    if !self.opts.all_documents && !self.opts.single_document {
                        break;
                    }
                }
                _ => {
                    return Err(
                        ScanError::new_str(span.start, "did not find expected <document start>")
                            .into(),
                    )
                }
            }
        }

        if self.opts.stream_nodes {
            return Ok(vec![merge_stream(docs)]);
        }
        Ok(docs)
    }

    fn compose_document<I: Input>(
        &mut self,
        parser: &mut Parser<I>,
        explicit_start: bool,
        budget_used: &mut u64,
    ) -> Result<Document, Error> {
        let mut state = DocState {
            doc: Document::new(),
            anchors: HashMap::new(),
            stack: Vec::new(),
            #[cfg(feature = "comments")]
            pending: Vec::new(),
        };
        state.doc.explicit_start = explicit_start;

        loop {
            let (ev, span) = parser.next_event()?;
            match ev {
                Event::DocumentEnd(explicit) => {
                    state.doc.explicit_end = explicit;
                    #[cfg(feature = "comments")]
                    self.flush_end_comments(parser, &mut state)?;
                    return Ok(state.doc);
                }
                Event::Scalar(value, style, anchor_id, tag) => {
                    let node = self.compose_scalar(value, style, tag, span)?;
                    let id = state.doc.push(node);
                    if anchor_id != 0 {
                        state.anchors.insert(anchor_id, id);
                    }
                    #[cfg(feature = "comments")]
                    self.attach_comments(parser, &mut state, id)?;
                    self.attach(&mut state, id)?;
                }
                Event::SequenceStart(anchor_id, tag, style) => {
                    let (tag, implicit) = match tag {
                        Some(t) => (t, false),
                        None => (resolve::core_tag("seq"), true),
                    };
                    let mut node = Node::sequence(tag, implicit, collection_style(style));
                    node.span = span;
                    let id = state.doc.push(node);
                    state.stack.push(Frame {
                        node: id,
                        anchor_id,
                    });
                }
                Event::MappingStart(anchor_id, tag, style) => {
                    let (tag, implicit) = match tag {
                        Some(t) => (t, false),
                        None => (resolve::core_tag("map"), true),
                    };
                    let mut node = Node::mapping(tag, implicit, collection_style(style));
                    node.span = span;
                    let id = state.doc.push(node);
                    state.stack.push(Frame {
                        node: id,
                        anchor_id,
                    });
                }
                Event::SequenceEnd | Event::MappingEnd => {
                    // The parser balances start and end events.
                    let frame = state.stack.pop().expect("unbalanced collection events");
                    let id = frame.node;
                    state.doc.node_mut(id).span.end = span.end;
                    if state.doc.node(id).kind == NodeKind::Mapping {
                        self.check_unique_keys(&state.doc, id)?;
                        self.expand_merges(&mut state.doc, id)?;
                    }
                    let cost = 1u64.saturating_add(
                        state
                            .doc
                            .node(id)
                            .content
                            .iter()
                            .map(|&c| state.doc.node(c).cost)
                            .fold(0u64, u64::saturating_add),
                    );
                    state.doc.node_mut(id).cost = cost;
                    if frame.anchor_id != 0 {
                        state.anchors.insert(frame.anchor_id, id);
                    }
                    #[cfg(feature = "comments")]
                    self.attach_comments(parser, &mut state, id)?;
                    self.attach(&mut state, id)?;
                }
                Event::Alias(anchor_id) => {
                    // Anchors become visible when their node closes, so an alias inside the
                    // anchored collection itself cannot resolve.
                    let Some(&target) = state.anchors.get(&anchor_id) else {
                        let name = parser.anchor_name(anchor_id).unwrap_or("").to_owned();
                        return Err(ComposeError::UnknownAnchor {
                            name,
                            mark: span.start,
                        }
                        .into());
                    };
                    let target_cost = state.doc.node(target).cost;
                    *budget_used = budget_used.saturating_add(target_cost);
                    if *budget_used > self.limits.max_alias_expansion {
                        return Err(ComposeError::ExcessiveAliasing(span.start).into());
                    }
                    if state.doc.node(target).anchor.is_empty() {
                        state.doc.node_mut(target).anchor = format!("id{anchor_id:03}");
                    }
                    let mut node = Node::alias(target);
                    node.span = span;
                    node.cost = target_cost;
                    let id = state.doc.push(node);
                    self.attach(&mut state, id)?;
                }
                _ => {
                    return Err(
                        ScanError::new_str(span.start, "did not find expected node content").into(),
                    )
                }
            }
        }
    }

    fn compose_scalar(
        &self,
        value: String,
        style: ScalarStyle,
        tag: Option<Tag>,
        span: Span,
    ) -> Result<Node, ComposeError> {
        let node_style = match style {
            ScalarStyle::Plain => NodeStyle::Plain,
            ScalarStyle::SingleQuoted => NodeStyle::SingleQuoted,
            ScalarStyle::DoubleQuoted => NodeStyle::DoubleQuoted,
            ScalarStyle::Literal => NodeStyle::Literal,
            ScalarStyle::Folded => NodeStyle::Folded,
        };
        let (tag, implicit, value) = match tag {
            Some(t) => {
                let value = if t.is_yaml_core_schema() && t.suffix == "binary" {
                    decode_binary(&value).ok_or(ComposeError::InvalidBinary(span.start))?
                } else {
                    value
                };
                (t, false, value)
            }
            None if style == ScalarStyle::Plain => (resolve::resolve_plain(&value), true, value),
            None => (resolve::core_tag("str"), true, value),
        };
        let mut node = Node::scalar(tag, implicit, value, node_style);
        node.span = span;
        Ok(node)
    }

    fn attach(&mut self, state: &mut DocState, id: NodeId) -> Result<(), Error> {
        let Some(frame) = state.stack.last() else {
            state.doc.set_root(id);
            return Ok(());
        };
        let parent = frame.node;
        state.doc.node_mut(parent).content.push(id);
        #[cfg(feature = "comments")]
        {
            let node = state.doc.node(parent);
            if node.kind == NodeKind::Mapping && node.content.len() % 2 == 0 {
                let len = node.content.len();
                let key = node.content[len - 2];
                let value = node.content[len - 1];
                let is_block = node.style != NodeStyle::Flow;
                self.strategy.process_mapping_pair(
                    &mut state.doc,
                    MappingPairContext {
                        key,
                        value,
                        owning_mapping: parent,
                        is_block,
                    },
                )?;
            }
        }
        Ok(())
    }

    #[cfg(feature = "comments")]
    fn attach_comments<I: Input>(
        &mut self,
        parser: &mut Parser<I>,
        state: &mut DocState,
        id: NodeId,
    ) -> Result<(), Error> {
        // Trailing comments on the node's line are only scanned with the next token, so look
        // one event ahead before draining.
        let _ = parser.peek()?;
        let mut comments = std::mem::take(&mut state.pending);
        comments.extend(parser.unfold_comments());
        // Head comments below the node belong to whatever comes next; hold them back.
        let node_line = state.doc.node(id).span.end.line();
        let (now, later): (Vec<_>, Vec<_>) = comments.into_iter().partition(|c| {
            c.kind != peridot_parser::CommentKind::Head || c.span.start.line() <= node_line
        });
        state.pending = later;
        if !now.is_empty() {
            self.strategy.process_comment(&mut state.doc, id, &now)?;
        }
        Ok(())
    }

    #[cfg(feature = "comments")]
    fn flush_end_comments<I: Input>(
        &mut self,
        parser: &mut Parser<I>,
        state: &mut DocState,
    ) -> Result<(), Error> {
        let mut comments = std::mem::take(&mut state.pending);
        comments.extend(parser.unfold_comments());
        if comments.is_empty() {
            return Ok(());
        }
        if let Some(root) = state.doc.root() {
            self.strategy
                .process_end_comments(&mut state.doc, root, &comments)?;
        }
        Ok(())
    }

    fn check_unique_keys(&self, doc: &Document, mapping: NodeId) -> Result<(), ComposeError> {
        if !self.opts.unique_keys {
            return Ok(());
        }
        let mut scalars: LinkedHashMap<(String, String), Marker> = LinkedHashMap::new();
        let mut others: Vec<NodeId> = Vec::new();
        for (key, _) in doc.pairs(mapping) {
            let key = doc.deref(key);
            let node = doc.node(key);
            if node.has_core_tag("merge") {
                continue;
            }
            if node.kind == NodeKind::Scalar {
                let fp = scalar_fingerprint(node);
                if let Some(&first) = scalars.get(&fp) {
                    return Err(ComposeError::DuplicateKey {
                        first,
                        second: node.span.start,
                    });
                }
                scalars.insert(fp, node.span.start);
            } else {
                for &prev in &others {
                    if doc.structural_eq(prev, doc, key) {
                        return Err(ComposeError::DuplicateKey {
                            first: doc.node(prev).span.start,
                            second: node.span.start,
                        });
                    }
                }
                others.push(key);
            }
        }
        Ok(())
    }

    /// Expand `<<` merge pairs into their mapping, in place.
    ///
    /// Keys written out in the mapping always win over merged-in keys and keep their written
    /// order; inherited pairs are appended after them. Among several merge sources the first
    /// occurrence wins, which mirrors the YAML merge key specification.
    fn expand_merges(&self, doc: &mut Document, mapping: NodeId) -> Result<(), ComposeError> {
        let content = doc.node(mapping).content.clone();
        if !content
            .chunks_exact(2)
            .any(|pair| doc.node(doc.deref(pair[0])).has_core_tag("merge"))
        {
            return Ok(());
        }

        let mut seen: Vec<NodeId> = Vec::new();
        let mut merged: Vec<NodeId> = Vec::new();
        for pair in content.chunks_exact(2) {
            let key = doc.deref(pair[0]);
            if !doc.node(key).has_core_tag("merge") {
                seen.push(key);
                merged.push(pair[0]);
                merged.push(pair[1]);
            }
        }

        for pair in content.chunks_exact(2) {
            let key = doc.deref(pair[0]);
            if !doc.node(key).has_core_tag("merge") {
                continue;
            }
            let source = doc.deref(pair[1]);
            match doc.node(source).kind {
                NodeKind::Mapping => {
                    merge_pairs(doc, source, &mut seen, &mut merged);
                }
                NodeKind::Sequence => {
                    for item in doc.node(source).content.clone() {
                        let item = doc.deref(item);
                        if doc.node(item).kind != NodeKind::Mapping {
                            return Err(ComposeError::InvalidMerge(doc.node(key).span.start));
                        }
                        merge_pairs(doc, item, &mut seen, &mut merged);
                    }
                }
                _ => return Err(ComposeError::InvalidMerge(doc.node(key).span.start)),
            }
        }
        doc.node_mut(mapping).content = merged;
        Ok(())
    }
}

struct Frame {
    node: NodeId,
    anchor_id: usize,
}

struct DocState {
    doc: Document,
    anchors: HashMap<usize, NodeId>,
    stack: Vec<Frame>,
    #[cfg(feature = "comments")]
    pending: Vec<peridot_parser::Comment>,
}

fn collection_style(style: CollectionStyle) -> NodeStyle {
    match style {
        CollectionStyle::Block => NodeStyle::Plain,
        CollectionStyle::Flow => NodeStyle::Flow,
    }
}

fn scalar_fingerprint(node: &Node) -> (String, String) {
    (
        format!("{}{}", node.tag.handle, node.tag.suffix),
        node.value.clone(),
    )
}

fn merge_pairs(doc: &mut Document, source: NodeId, seen: &mut Vec<NodeId>, out: &mut Vec<NodeId>) {
    let content = doc.node(source).content.clone();
    for pair in content.chunks_exact(2) {
        let key = doc.deref(pair[0]);
        if seen.iter().any(|&s| doc.structural_eq(s, doc, key)) {
            continue;
        }
        seen.push(key);
        out.push(pair[0]);
        out.push(pair[1]);
    }
}

fn decode_binary(value: &str) -> Option<String> {
    let compact: String = value.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(compact)
        .ok()?;
    // Bytes map one-to-one onto U+0000..U+00FF so arbitrary binary survives in a String.
    Some(bytes.iter().map(|&b| char::from(b)).collect())
}

/// Collapse a multi-document stream into one document whose root is a sequence of the document
/// roots.
fn merge_stream(docs: Vec<Document>) -> Document {
    let mut out = Document::new();
    let root = out.push(Node::sequence(
        resolve::core_tag("seq"),
        true,
        NodeStyle::Plain,
    ));
    for doc in docs {
        let Some(doc_root) = doc.root() else { continue };
        let offset = out.len();
        for mut node in doc.into_nodes() {
            for child in &mut node.content {
                *child = NodeId(child.index() + offset);
            }
            if let Some(target) = &mut node.alias_target {
                *target = NodeId(target.index() + offset);
            }
            out.push(node);
        }
        let mapped = NodeId(doc_root.index() + offset);
        out.node_mut(root).content.push(mapped);
    }
    out.set_root(root);
    out
}

#[cfg(test)]
mod tests {
    use peridot_parser::Limits;

    use super::Composer;
    use crate::error::{ComposeError, Error};
    use crate::node::NodeKind;
    use crate::options::Options;
    use crate::resolve::{parse_scalar, ScalarValue};

    fn scalar_value(doc: &crate::node::Document, id: crate::node::NodeId) -> ScalarValue {
        let node = doc.node(doc.deref(id));
        parse_scalar(&node.tag, &node.value)
    }

    #[test]
    fn composes_nested_collections() {
        let mut composer = Composer::new();
        let docs = composer.load_from_str("a:\n  - 1\n  - 2\nb: true\n").unwrap();
        assert_eq!(docs.len(), 1);
        let doc = &docs[0];
        let root = doc.root().unwrap();
        assert_eq!(doc.node(root).kind, NodeKind::Mapping);
        let pairs: Vec<_> = doc.pairs(root).collect();
        assert_eq!(pairs.len(), 2);
        let (_, seq) = pairs[0];
        let items = &doc.node(seq).content;
        assert_eq!(items.len(), 2);
        assert_eq!(scalar_value(doc, items[0]), ScalarValue::Int(1));
        assert_eq!(scalar_value(doc, pairs[1].1), ScalarValue::Bool(true));
    }

    #[test]
    fn merge_key_never_overrides_explicit_keys() {
        let input = "anchor: &base\n  x: 1\n  y: 2\n  r: 5\nderived:\n  <<: *base\n  r: 10\n";
        let mut composer = Composer::new();
        let docs = composer.load_from_str(input).unwrap();
        let doc = &docs[0];
        let root = doc.root().unwrap();
        let (_, derived) = doc.pairs(root).nth(1).unwrap();
        let derived = doc.deref(derived);
        let got: Vec<(String, ScalarValue)> = doc
            .pairs(derived)
            .map(|(k, v)| (doc.node(doc.deref(k)).value.clone(), scalar_value(doc, v)))
            .collect();
        assert_eq!(
            got,
            vec![
                ("r".to_owned(), ScalarValue::Int(10)),
                ("x".to_owned(), ScalarValue::Int(1)),
                ("y".to_owned(), ScalarValue::Int(2)),
            ]
        );
    }

    #[test]
    fn merge_of_a_scalar_is_an_error() {
        let mut composer = Composer::new();
        let err = composer.load_from_str("<<: 3\n").unwrap_err();
        assert!(matches!(
            err,
            Error::Compose(ComposeError::InvalidMerge(_))
        ));
        assert!(err
            .to_string()
            .starts_with("map merge requires map or sequence of maps as the value"));
    }

    #[test]
    fn duplicate_keys_are_rejected_by_default() {
        let mut composer = Composer::new();
        let err = composer.load_from_str("a: 1\nb: 2\na: 3\n").unwrap_err();
        assert!(matches!(
            err,
            Error::Compose(ComposeError::DuplicateKey { .. })
        ));
    }

    #[test]
    fn duplicate_keys_pass_when_disabled() {
        let mut opts = Options::default();
        opts.set("unique-keys", "false").unwrap();
        let mut composer = Composer::with_options(opts);
        let docs = composer.load_from_str("a: 1\na: 3\n").unwrap();
        assert_eq!(docs[0].pairs(docs[0].root().unwrap()).count(), 2);
    }

    #[test]
    fn alias_expansion_budget_is_enforced() {
        // One anchored sequence of 100 items aliased 100 times.
        let mut input = String::from("base: &b [");
        for i in 0..100 {
            if i > 0 {
                input.push_str(", ");
            }
            input.push_str("x");
        }
        input.push_str("]\n");
        for i in 0..100 {
            input.push_str(&format!("k{i}: *b\n"));
        }
        let mut composer = Composer::new().limits(Limits {
            max_alias_expansion: 5_000,
            ..Limits::default()
        });
        let err = composer.load_from_str(&input).unwrap_err();
        assert!(matches!(
            err,
            Error::Compose(ComposeError::ExcessiveAliasing(_))
        ));
        assert!(err.to_string().starts_with("excessive aliasing at byte"));
    }

    #[test]
    fn self_referential_alias_is_rejected() {
        let mut composer = Composer::new();
        let err = composer.load_from_str("&a [1, *a]\n").unwrap_err();
        assert!(matches!(
            err,
            Error::Compose(ComposeError::UnknownAnchor { .. })
        ));
        assert!(err.to_string().starts_with("unknown anchor 'a' referenced"));
    }

    #[test]
    fn binary_scalars_are_decoded() {
        let mut composer = Composer::new();
        let docs = composer
            .load_from_str("!!binary \"aGVsbG8=\"\n")
            .unwrap();
        let doc = &docs[0];
        let root = doc.root().unwrap();
        assert!(doc.node(root).has_core_tag("binary"));
        assert_eq!(doc.node(root).value, "hello");
    }

    #[test]
    fn invalid_base64_is_an_error() {
        let mut composer = Composer::new();
        let err = composer.load_from_str("!!binary \"no*t/b64!\"\n").unwrap_err();
        assert!(matches!(
            err,
            Error::Compose(ComposeError::InvalidBinary(_))
        ));
    }

    #[test]
    fn single_document_mode_rejects_a_second_document() {
        let mut opts = Options::default();
        opts.set("single-document", "true").unwrap();
        let mut composer = Composer::with_options(opts);
        let err = composer.load_from_str("a: 1\n---\nb: 2\n").unwrap_err();
        assert!(matches!(
            err,
            Error::Compose(ComposeError::MoreThanOneDocument(_))
        ));
    }

    #[test]
    fn stream_nodes_collapse_documents_into_a_sequence() {
        let mut opts = Options::default();
        opts.set("stream-nodes", "true").unwrap();
        let mut composer = Composer::with_options(opts);
        let docs = composer.load_from_str("a\n---\nb\n").unwrap();
        assert_eq!(docs.len(), 1);
        let doc = &docs[0];
        let root = doc.root().unwrap();
        assert_eq!(doc.node(root).kind, NodeKind::Sequence);
        let items = &doc.node(root).content;
        assert_eq!(items.len(), 2);
        assert_eq!(doc.node(items[0]).value, "a");
        assert_eq!(doc.node(items[1]).value, "b");
    }

    #[test]
    fn aliased_nodes_share_identity_in_the_tree() {
        let mut composer = Composer::new();
        let docs = composer.load_from_str("a: &x [1, 2]\nb: *x\n").unwrap();
        let doc = &docs[0];
        let root = doc.root().unwrap();
        let pairs: Vec<_> = doc.pairs(root).collect();
        assert_eq!(doc.deref(pairs[0].1), doc.deref(pairs[1].1));
        assert!(!doc.node(doc.deref(pairs[0].1)).anchor.is_empty());
    }
}
