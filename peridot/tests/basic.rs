use peridot::resolve::parse_scalar;
use peridot::{
    load_from_str, ComposeError, Document, Error, Limits, NodeId, NodeKind, Options, ScalarValue,
};

fn typed(doc: &Document, id: NodeId) -> ScalarValue {
    let node = doc.node(doc.deref(id));
    parse_scalar(&node.tag, &node.value)
}

fn lookup(doc: &Document, mapping: NodeId, key: &str) -> NodeId {
    doc.pairs(mapping)
        .find(|&(k, _)| doc.node(doc.deref(k)).value == key)
        .map(|(_, v)| v)
        .unwrap_or_else(|| panic!("key {key} not found"))
}

#[test]
fn core_schema_values_are_typed() {
    let input = "null_: ~\nbool: yes\nint: 0x1F\noctal: 0o17\nsexa: 190:20:30\nfloat: .5\ninf: -.inf\nstr: '123'\n";
    let docs = load_from_str(input).unwrap();
    let doc = &docs[0];
    let root = doc.root().unwrap();
    assert_eq!(typed(doc, lookup(doc, root, "null_")), ScalarValue::Null);
    assert_eq!(typed(doc, lookup(doc, root, "bool")), ScalarValue::Bool(true));
    assert_eq!(typed(doc, lookup(doc, root, "int")), ScalarValue::Int(31));
    assert_eq!(typed(doc, lookup(doc, root, "octal")), ScalarValue::Int(15));
    assert_eq!(
        typed(doc, lookup(doc, root, "sexa")),
        ScalarValue::Int(685_230)
    );
    assert!(matches!(
        typed(doc, lookup(doc, root, "float")),
        ScalarValue::Float(f) if f.into_inner() == 0.5
    ));
    assert!(matches!(
        typed(doc, lookup(doc, root, "inf")),
        ScalarValue::Float(f) if f.into_inner() == f64::NEG_INFINITY
    ));
    assert_eq!(
        typed(doc, lookup(doc, root, "str")),
        ScalarValue::Str("123".to_owned())
    );
}

#[test]
fn merge_keys_follow_yaml_precedence() {
    // The merge key example from the YAML type repository.
    let input = "\
- &center {x: 1, y: 2}
- &left {x: 0, y: 2}
- &big {r: 10}
- &small {r: 1}
- # Merge one map
  <<: *center
  r: 10
- # Merge multiple maps
  <<: [*center, *big]
  label: center/big
- # Override
  <<: [*big, *left, *small]
  x: 1
  label: center/big
";
    let docs = load_from_str(input).unwrap();
    let doc = &docs[0];
    let root = doc.root().unwrap();
    let items = doc.node(root).content.clone();

    let one = items[4];
    assert_eq!(typed(doc, lookup(doc, one, "x")), ScalarValue::Int(1));
    assert_eq!(typed(doc, lookup(doc, one, "y")), ScalarValue::Int(2));
    assert_eq!(typed(doc, lookup(doc, one, "r")), ScalarValue::Int(10));

    let multiple = items[5];
    assert_eq!(typed(doc, lookup(doc, multiple, "x")), ScalarValue::Int(1));
    assert_eq!(typed(doc, lookup(doc, multiple, "r")), ScalarValue::Int(10));

    // The first map of the sequence wins for keys present in several sources.
    let overridden = items[6];
    assert_eq!(typed(doc, lookup(doc, overridden, "x")), ScalarValue::Int(1));
    assert_eq!(typed(doc, lookup(doc, overridden, "y")), ScalarValue::Int(2));
    assert_eq!(
        typed(doc, lookup(doc, overridden, "r")),
        ScalarValue::Int(10)
    );
}

#[test]
fn duplicate_key_error_carries_both_positions() {
    let err = load_from_str("a: 1\nb: 2\na: 3\n").unwrap_err();
    let Error::Compose(ComposeError::DuplicateKey { first, second }) = err else {
        panic!("expected a duplicate key error");
    };
    assert_eq!(first.line(), 1);
    assert_eq!(second.line(), 3);
}

#[test]
fn depth_limit_is_exact() {
    let limits = Limits {
        max_depth: 50,
        ..Limits::default()
    };
    let at_limit: String =
        "[".repeat(50) + "x" + &"]".repeat(50);
    let beyond: String = "[".repeat(51) + "x" + &"]".repeat(51);

    let mut composer = peridot::Composer::new().limits(limits);
    assert!(composer.load_from_str(&at_limit).is_ok());
    let err = composer.load_from_str(&beyond).unwrap_err();
    assert!(err.to_string().starts_with("exceeded max depth"));
}

#[test]
fn multi_document_streams_load_in_order() {
    let docs = load_from_str("first\n---\nsecond\n---\nthird\n").unwrap();
    let values: Vec<&str> = docs
        .iter()
        .map(|d| doc_root_value(d))
        .collect();
    assert_eq!(values, ["first", "second", "third"]);
}

fn doc_root_value(doc: &Document) -> &str {
    &doc.node(doc.root().unwrap()).value
}

#[test]
fn utf16_input_is_decoded() {
    let text = "key: value\n";
    let mut bytes = vec![0xff, 0xfe];
    for unit in text.encode_utf16() {
        bytes.extend_from_slice(&unit.to_le_bytes());
    }
    let docs = peridot::load_from_bytes(&bytes).unwrap();
    let doc = &docs[0];
    let root = doc.root().unwrap();
    assert_eq!(doc.node(doc.deref(lookup(doc, root, "key"))).value, "value");
}

#[test]
fn known_fields_flag_is_stored_untouched() {
    let mut opts = Options::default();
    assert!(!opts.known_fields);
    opts.set("known-fields", "true").unwrap();
    assert!(opts.known_fields);
    // Loading behaves identically; the flag is only carried for binding layers.
    let mut composer = peridot::Composer::with_options(opts);
    assert!(composer.load_from_str("a: 1\nunexpected: 2\n").is_ok());
}

#[test]
fn mapping_content_always_has_even_length() {
    let inputs = ["a: 1\nb:\n", "{x: , y: 2}\n", "? k\n", "a:\n  b:\n"];
    for input in inputs {
        let docs = load_from_str(input).unwrap();
        let doc = &docs[0];
        for (_, node) in doc.nodes() {
            if node.kind == NodeKind::Mapping {
                assert_eq!(node.content.len() % 2, 0, "odd mapping in {input:?}");
            }
        }
    }
}
