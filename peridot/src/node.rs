//! The in-memory document model.
//!
//! A [`Document`] owns all of its nodes in an arena. Nodes refer to their children (and, for
//! aliases, to their target) through [`NodeId`] indices rather than pointers, which keeps the
//! "no true cycles, but many shared references" shape of a composed YAML document explicit.

use peridot_parser::{Span, Tag};

/// The index of a [`Node`] within its [`Document`]'s arena.
///
/// A `NodeId` is only meaningful for the document that produced it.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    /// Return the raw index of the node in the arena.
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

/// What a [`Node`] represents.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum NodeKind {
    /// A scalar leaf. The text lives in [`Node::value`].
    Scalar,
    /// A sequence. [`Node::content`] holds the items in order.
    Sequence,
    /// A mapping. [`Node::content`] holds alternating keys and values, in insertion order.
    Mapping,
    /// A reference to an anchored node. [`Node::alias_target`] holds the target.
    Alias,
}

/// The presentation style of a [`Node`].
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum NodeStyle {
    /// A plain scalar or a block collection.
    #[default]
    Plain,
    /// A single quoted scalar.
    SingleQuoted,
    /// A double quoted scalar.
    DoubleQuoted,
    /// A literal block scalar.
    Literal,
    /// A folded block scalar.
    Folded,
    /// A flow collection (`[a, b]`, `{k: v}`).
    Flow,
}

/// A node of a composed YAML document.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Node {
    /// What the node represents.
    pub kind: NodeKind,
    /// The node's resolved tag.
    pub tag: Tag,
    /// Whether the tag was inferred from content rather than written in the source.
    pub tag_implicit: bool,
    /// The node's anchor name. Empty if the node is not anchored.
    pub anchor: String,
    /// The scalar text. Empty for collections and aliases.
    pub value: String,
    /// The style the node had in the source, or should be emitted with.
    pub style: NodeStyle,
    /// Children, by arena index. Even-length key/value pairs for mappings.
    pub content: Vec<NodeId>,
    /// For alias nodes, the anchored node this alias refers to.
    pub alias_target: Option<NodeId>,
    /// The node's position in the source, if it was parsed.
    pub span: Span,
    /// Comment on the line(s) preceding the node.
    #[cfg(feature = "comments")]
    pub head_comment: String,
    /// Comment at the end of the line on which the node ends.
    #[cfg(feature = "comments")]
    pub line_comment: String,
    /// Comment following the node, separated from what comes after by a blank line.
    #[cfg(feature = "comments")]
    pub foot_comment: String,
    /// Number of nodes an alias to this node expands to. Filled in by the composer.
    pub(crate) cost: u64,
}

impl Node {
    /// Create a scalar node with the given resolved tag and text.
    #[must_use]
    pub fn scalar(tag: Tag, tag_implicit: bool, value: String, style: NodeStyle) -> Node {
        Node {
            kind: NodeKind::Scalar,
            tag,
            tag_implicit,
            value,
            style,
            ..Node::default()
        }
    }

    /// Create an empty sequence node.
    #[must_use]
    pub fn sequence(tag: Tag, tag_implicit: bool, style: NodeStyle) -> Node {
        Node {
            kind: NodeKind::Sequence,
            tag,
            tag_implicit,
            style,
            ..Node::default()
        }
    }

    /// Create an empty mapping node.
    #[must_use]
    pub fn mapping(tag: Tag, tag_implicit: bool, style: NodeStyle) -> Node {
        Node {
            kind: NodeKind::Mapping,
            tag,
            tag_implicit,
            style,
            ..Node::default()
        }
    }

    /// Create an alias node pointing at `target`.
    #[must_use]
    pub fn alias(target: NodeId) -> Node {
        Node {
            kind: NodeKind::Alias,
            alias_target: Some(target),
            ..Node::default()
        }
    }

    /// Whether the node is a scalar with the given core schema tag suffix (e.g. `"str"`).
    #[must_use]
    pub fn has_core_tag(&self, suffix: &str) -> bool {
        self.tag.is_yaml_core_schema() && self.tag.suffix == suffix
    }
}

impl Default for Node {
    fn default() -> Node {
        Node {
            kind: NodeKind::Scalar,
            tag: Tag {
                handle: "tag:yaml.org,2002:".to_owned(),
                suffix: "null".to_owned(),
            },
            tag_implicit: true,
            anchor: String::new(),
            value: String::new(),
            style: NodeStyle::Plain,
            content: Vec::new(),
            alias_target: None,
            span: Span::default(),
            #[cfg(feature = "comments")]
            head_comment: String::new(),
            #[cfg(feature = "comments")]
            line_comment: String::new(),
            #[cfg(feature = "comments")]
            foot_comment: String::new(),
            cost: 1,
        }
    }
}

/// A composed YAML document.
///
/// All nodes, including the root, live in the document's arena and are addressed by [`NodeId`].
#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct Document {
    nodes: Vec<Node>,
    root: Option<NodeId>,
    /// Whether the document had an explicit `---` marker.
    pub explicit_start: bool,
    /// Whether the document had an explicit `...` marker.
    pub explicit_end: bool,
}

impl Document {
    /// Create an empty document.
    #[must_use]
    pub fn new() -> Document {
        Document::default()
    }

    /// Add a node to the arena and return its index.
    pub fn push(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(node);
        id
    }

    /// Return the root node's index, if the document has content.
    #[must_use]
    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    /// Set the root node.
    pub fn set_root(&mut self, id: NodeId) {
        self.root = Some(id);
    }

    /// Access a node.
    ///
    /// # Panics
    /// Panics if `id` does not come from this document.
    #[must_use]
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    /// Access a node mutably.
    ///
    /// # Panics
    /// Panics if `id` does not come from this document.
    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    /// Return the number of nodes in the arena.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the arena holds no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Follow alias links until a non-alias node is reached.
    ///
    /// Alias targets are always resolved when the alias is created, so the chain is finite.
    #[must_use]
    pub fn deref(&self, mut id: NodeId) -> NodeId {
        while let Some(target) = self.node(id).alias_target {
            id = target;
        }
        id
    }

    /// Compare two subtrees for structural equality.
    ///
    /// Only `(kind, tag, value, content order)` take part in the comparison; styles, anchors,
    /// comments and positions are presentation details. Aliases compare equal to the subtree they
    /// reference.
    #[must_use]
    pub fn structural_eq(&self, id: NodeId, other: &Document, other_id: NodeId) -> bool {
        let a = self.node(self.deref(id));
        let b = other.node(other.deref(other_id));
        if a.kind != b.kind || a.tag != b.tag {
            return false;
        }
        match a.kind {
            NodeKind::Scalar => a.value == b.value,
            NodeKind::Sequence | NodeKind::Mapping => {
                a.content.len() == b.content.len()
                    && a.content
                        .iter()
                        .zip(&b.content)
                        .all(|(x, y)| self.structural_eq(*x, other, *y))
            }
            // deref never returns an alias
            NodeKind::Alias => false,
        }
    }

    /// Iterate over every node in the arena with its id.
    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.nodes.iter().enumerate().map(|(i, n)| (NodeId(i), n))
    }

    /// Consume the document and return its arena.
    #[must_use]
    pub fn into_nodes(self) -> Vec<Node> {
        self.nodes
    }

    /// Iterate over a mapping's `(key, value)` pairs.
    ///
    /// Returns an empty iterator for non-mapping nodes.
    pub fn pairs(&self, id: NodeId) -> impl Iterator<Item = (NodeId, NodeId)> + '_ {
        let node = self.node(id);
        let content: &[NodeId] = if node.kind == NodeKind::Mapping {
            &node.content
        } else {
            &[]
        };
        content.chunks_exact(2).map(|pair| (pair[0], pair[1]))
    }
}
