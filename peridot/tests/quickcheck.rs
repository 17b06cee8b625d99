#[macro_use]
extern crate quickcheck;

use quickcheck::TestResult;

use peridot::resolve::core_tag;
use peridot::{emit_to_string, load_from_str, Document, Node, NodeStyle};

fn string_sequence(xs: Vec<String>) -> Document {
    let mut doc = Document::new();
    let items: Vec<_> = xs
        .into_iter()
        .map(|x| doc.push(Node::scalar(core_tag("str"), true, x, NodeStyle::Plain)))
        .collect();
    let mut root = Node::sequence(core_tag("seq"), true, NodeStyle::Plain);
    root.content = items;
    let root = doc.push(root);
    doc.set_root(root);
    doc
}

quickcheck! {
    fn weird_strings_survive_a_round_trip(xs: Vec<String>) -> TestResult {
        let input = string_sequence(xs);
        let text = match emit_to_string(&input) {
            Ok(text) => text,
            Err(err) => return TestResult::error(err.to_string()),
        };
        match load_from_str(&text) {
            Ok(output) => TestResult::from_bool(
                output.len() == 1
                    && input.structural_eq(
                        input.root().unwrap(),
                        &output[0],
                        output[0].root().unwrap(),
                    ),
            ),
            Err(err) => TestResult::error(format!("{err} while re-reading {text:?}")),
        }
    }

    fn string_keyed_mappings_survive_a_round_trip(pairs: Vec<(String, i64)>) -> TestResult {
        let mut keys: Vec<&String> = pairs.iter().map(|(k, _)| k).collect();
        keys.sort();
        keys.dedup();
        if keys.len() != pairs.len() {
            return TestResult::discard();
        }

        let mut doc = Document::new();
        let mut root = Node::mapping(core_tag("map"), true, NodeStyle::Plain);
        for (k, v) in &pairs {
            let key = doc.push(Node::scalar(
                core_tag("str"),
                true,
                k.clone(),
                NodeStyle::Plain,
            ));
            let value = doc.push(Node::scalar(
                core_tag("int"),
                true,
                v.to_string(),
                NodeStyle::Plain,
            ));
            root.content.push(key);
            root.content.push(value);
        }
        let root = doc.push(root);
        doc.set_root(root);

        let text = match emit_to_string(&doc) {
            Ok(text) => text,
            Err(err) => return TestResult::error(err.to_string()),
        };
        match load_from_str(&text) {
            Ok(output) => TestResult::from_bool(
                output.len() == 1
                    && doc.structural_eq(
                        doc.root().unwrap(),
                        &output[0],
                        output[0].root().unwrap(),
                    ),
            ),
            Err(err) => TestResult::error(format!("{err} while re-reading {text:?}")),
        }
    }
}
