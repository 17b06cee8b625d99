//! Comment handling strategies.
//!
//! The composer does not decide what happens to comments. It hands each batch captured by the
//! scanner to a [`CommentStrategy`] together with the node the batch surrounds, and the strategy
//! decides whether the comments become part of the tree. [`DropComments`] discards everything,
//! which is the default; [`LegacyComments`] attaches comments to nodes the way round-tripping
//! editors expect.

use peridot_parser::{Comment, CommentKind};

use crate::error::ComposeError;
use crate::node::{Document, NodeId, NodeKind};

/// The key/value pair a mapping comment decision applies to.
#[derive(Clone, Copy, Debug)]
pub struct MappingPairContext {
    /// The key node of the pair.
    pub key: NodeId,
    /// The value node of the pair.
    pub value: NodeId,
    /// The mapping holding the pair.
    pub owning_mapping: NodeId,
    /// Whether the mapping is in block style. Flow mappings cannot carry per-pair comments.
    pub is_block: bool,
}

/// Decides what the composer does with comments.
///
/// Each method returns whether the strategy consumed the comments. A strategy returning
/// `Ok(false)` leaves the tree untouched.
pub trait CommentStrategy {
    /// Called when a node has been composed and the comments scanned around it are known.
    fn process_comment(
        &mut self,
        doc: &mut Document,
        node: NodeId,
        comments: &[Comment],
    ) -> Result<bool, ComposeError>;

    /// Called after both halves of a mapping pair have been composed.
    fn process_mapping_pair(
        &mut self,
        doc: &mut Document,
        ctx: MappingPairContext,
    ) -> Result<bool, ComposeError>;

    /// Called with the comments left over when a collection or document closes.
    fn process_end_comments(
        &mut self,
        doc: &mut Document,
        node: NodeId,
        comments: &[Comment],
    ) -> Result<bool, ComposeError>;
}

/// Discards every comment.
#[derive(Clone, Copy, Debug, Default)]
pub struct DropComments;

impl CommentStrategy for DropComments {
    fn process_comment(
        &mut self,
        _doc: &mut Document,
        _node: NodeId,
        _comments: &[Comment],
    ) -> Result<bool, ComposeError> {
        Ok(false)
    }

    fn process_mapping_pair(
        &mut self,
        _doc: &mut Document,
        _ctx: MappingPairContext,
    ) -> Result<bool, ComposeError> {
        Ok(false)
    }

    fn process_end_comments(
        &mut self,
        _doc: &mut Document,
        _node: NodeId,
        _comments: &[Comment],
    ) -> Result<bool, ComposeError> {
        Ok(false)
    }
}

/// Attaches comments to the nodes they surround.
///
/// Head comments land on the node below them, line comments on the node sharing their line, and
/// foot comments on the node above. A foot comment scanned after a mapping key belongs to the
/// pair, so it is moved to the value; a foot comment trailing the last pair of a block mapping
/// belongs to that pair rather than to the mapping itself.
#[derive(Clone, Copy, Debug, Default)]
pub struct LegacyComments;

impl LegacyComments {
    fn append(slot: &mut String, text: &str) {
        if !slot.is_empty() {
            slot.push('\n');
        }
        slot.push_str(text);
    }
}

impl CommentStrategy for LegacyComments {
    fn process_comment(
        &mut self,
        doc: &mut Document,
        node: NodeId,
        comments: &[Comment],
    ) -> Result<bool, ComposeError> {
        if comments.is_empty() {
            return Ok(false);
        }
        let n = doc.node_mut(node);
        for comment in comments {
            match comment.kind {
                CommentKind::Head => Self::append(&mut n.head_comment, &comment.text),
                CommentKind::Line => Self::append(&mut n.line_comment, &comment.text),
                CommentKind::Foot => Self::append(&mut n.foot_comment, &comment.text),
            }
        }
        Ok(true)
    }

    fn process_mapping_pair(
        &mut self,
        doc: &mut Document,
        ctx: MappingPairContext,
    ) -> Result<bool, ComposeError> {
        if !ctx.is_block {
            return Ok(false);
        }
        // A foot comment captured after a key was really written under the whole pair.
        let foot = std::mem::take(&mut doc.node_mut(ctx.key).foot_comment);
        if foot.is_empty() {
            return Ok(false);
        }
        Self::append(&mut doc.node_mut(ctx.value).foot_comment, &foot);
        Ok(true)
    }

    fn process_end_comments(
        &mut self,
        doc: &mut Document,
        node: NodeId,
        comments: &[Comment],
    ) -> Result<bool, ComposeError> {
        if comments.is_empty() {
            return Ok(false);
        }
        // Trailing comments of a block collection belong to its last child, not to the
        // collection itself.
        let target = match doc.node(node).kind {
            NodeKind::Mapping | NodeKind::Sequence => {
                doc.node(node).content.last().copied().unwrap_or(node)
            }
            _ => node,
        };
        let slot = &mut doc.node_mut(target).foot_comment;
        for comment in comments {
            Self::append(slot, &comment.text);
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use peridot_parser::{Comment, CommentKind, Marker, Span, Tag};

    use super::{CommentStrategy, DropComments, LegacyComments, MappingPairContext};
    use crate::node::{Document, Node, NodeStyle};

    fn comment(kind: CommentKind, text: &str) -> Comment {
        Comment {
            kind,
            text: text.to_owned(),
            span: Span::empty(Marker::default()),
        }
    }

    fn scalar(text: &str) -> Node {
        let tag = Tag {
            handle: "tag:yaml.org,2002:".to_owned(),
            suffix: "str".to_owned(),
        };
        Node::scalar(tag, true, text.to_owned(), NodeStyle::Plain)
    }

    fn mapping(pairs: &[(super::NodeId, super::NodeId)]) -> Node {
        let tag = Tag {
            handle: "tag:yaml.org,2002:".to_owned(),
            suffix: "map".to_owned(),
        };
        let mut node = Node::mapping(tag, true, NodeStyle::Plain);
        for &(k, v) in pairs {
            node.content.push(k);
            node.content.push(v);
        }
        node
    }

    #[test]
    fn drop_comments_leaves_the_tree_untouched() {
        let mut doc = Document::new();
        let node = doc.push(scalar("a"));
        let consumed = DropComments
            .process_comment(&mut doc, node, &[comment(CommentKind::Head, "hi")])
            .unwrap();
        assert!(!consumed);
        assert!(doc.node(node).head_comment.is_empty());
    }

    #[test]
    fn legacy_comments_attach_by_kind() {
        let mut doc = Document::new();
        let node = doc.push(scalar("a"));
        LegacyComments
            .process_comment(
                &mut doc,
                node,
                &[
                    comment(CommentKind::Head, "above"),
                    comment(CommentKind::Line, "beside"),
                    comment(CommentKind::Head, "more"),
                ],
            )
            .unwrap();
        assert_eq!(doc.node(node).head_comment, "above\nmore");
        assert_eq!(doc.node(node).line_comment, "beside");
    }

    #[test]
    fn key_foot_comment_moves_to_the_value() {
        let mut doc = Document::new();
        let key = doc.push(scalar("k"));
        let value = doc.push(scalar("v"));
        let mapping = doc.push(mapping(&[(key, value)]));
        doc.node_mut(key).foot_comment = "after the pair".to_owned();
        LegacyComments
            .process_mapping_pair(
                &mut doc,
                MappingPairContext {
                    key,
                    value,
                    owning_mapping: mapping,
                    is_block: true,
                },
            )
            .unwrap();
        assert!(doc.node(key).foot_comment.is_empty());
        assert_eq!(doc.node(value).foot_comment, "after the pair");
    }

    #[test]
    fn mapping_tail_comments_land_on_the_last_pair() {
        let mut doc = Document::new();
        let key = doc.push(scalar("k"));
        let value = doc.push(scalar("v"));
        let map = doc.push(mapping(&[(key, value)]));
        LegacyComments
            .process_end_comments(&mut doc, map, &[comment(CommentKind::Foot, "tail")])
            .unwrap();
        assert_eq!(doc.node(value).foot_comment, "tail");
        assert!(doc.node(map).foot_comment.is_empty());
    }
}
