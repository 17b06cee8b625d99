#![cfg(feature = "comments")]

use peridot::comments::LegacyComments;
use peridot::{Composer, Document, NodeId};

fn load_with_comments(input: &str) -> Document {
    let mut composer = Composer::new().comment_strategy(Box::new(LegacyComments));
    let mut docs = composer.load_from_str(input).unwrap();
    docs.remove(0)
}

fn find_scalar(doc: &Document, value: &str) -> NodeId {
    doc.nodes()
        .find(|(_, n)| n.value == value)
        .map(|(id, _)| id)
        .unwrap_or_else(|| panic!("scalar {value} not found"))
}

#[test]
fn head_comments_attach_to_the_following_node() {
    let doc = load_with_comments("# introduction\nname: peridot\n");
    let key = find_scalar(&doc, "name");
    assert_eq!(doc.node(key).head_comment, "introduction");
}

#[test]
fn line_comments_attach_to_the_node_on_their_line() {
    let doc = load_with_comments("name: peridot # the value\n");
    let value = find_scalar(&doc, "peridot");
    assert_eq!(doc.node(value).line_comment, "the value");
}

#[test]
fn comments_are_dropped_without_a_strategy() {
    let mut composer = Composer::new();
    let docs = composer
        .load_from_str("# introduction\nname: peridot\n")
        .unwrap();
    for (_, node) in docs[0].nodes() {
        assert!(node.head_comment.is_empty());
        assert!(node.line_comment.is_empty());
        assert!(node.foot_comment.is_empty());
    }
}
