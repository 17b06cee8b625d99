use peridot::{emit_all_to_string, emit_to_string, load_from_str, Emitter, Options};

fn roundtrip(input: &str) -> String {
    let docs = load_from_str(input).unwrap();
    emit_all_to_string(&docs).unwrap()
}

fn assert_structurally_stable(input: &str) {
    let docs = load_from_str(input).unwrap();
    let out = emit_all_to_string(&docs).unwrap();
    let docs2 = load_from_str(&out).unwrap_or_else(|e| panic!("re-parse of {out:?} failed: {e}"));
    assert_eq!(docs.len(), docs2.len(), "document count changed for {out:?}");
    for (a, b) in docs.iter().zip(&docs2) {
        match (a.root(), b.root()) {
            (Some(ra), Some(rb)) => {
                assert!(a.structural_eq(ra, b, rb), "tree changed: {input:?} -> {out:?}");
            }
            (None, None) => {}
            _ => panic!("one side lost its root for {input:?}"),
        }
    }
}

#[test]
fn stable_across_a_mixed_document() {
    assert_structurally_stable(
        "name: project\nversion: 1.4\ntags:\n  - fast\n  - 'no'\nlimits:\n  depth: 100\n  width: ~\nmatrix:\n  - [1, 2]\n  - [3, 4]\n",
    );
}

#[test]
fn stable_across_anchors_and_merges() {
    assert_structurally_stable("base: &b\n  x: 1\nderived:\n  <<: *b\n  y: 2\nalias: *b\n");
}

#[test]
fn stable_across_awkward_strings() {
    assert_structurally_stable(
        "- 'true'\n- '0x10'\n- 'a: b'\n- '- dash'\n- '#hash'\n- \"line\\nbreak\"\n- \"  padded  \"\n- ''\n",
    );
}

#[test]
fn stable_across_multiple_documents() {
    assert_structurally_stable("one: 1\n---\n- a\n- b\n---\nplain\n");
}

#[test]
fn binary_round_trips_through_base64() {
    let docs = load_from_str("data: !!binary \"R0lG\\nODdh\"\n").unwrap();
    let out = emit_to_string(&docs[0]).unwrap();
    assert_eq!(out, "data: !!binary R0lGODdh\n");
    let docs2 = load_from_str(&out).unwrap();
    assert!(docs[0].structural_eq(
        docs[0].root().unwrap(),
        &docs2[0],
        docs2[0].root().unwrap()
    ));
}

#[test]
fn canonical_output_is_flow_quoted_and_tagged() {
    let docs = load_from_str("a: 1\nb: [x, y]\n").unwrap();
    let mut opts = Options::default();
    opts.set("canonical", "true").unwrap();
    let mut out = String::new();
    Emitter::with_options(&mut out, opts).dump(&docs[0]).unwrap();
    assert_eq!(
        out,
        "--- !!map {!!str \"a\": !!int \"1\", !!str \"b\": !!seq [!!str \"x\", !!str \"y\"]}\n"
    );
}

#[test]
fn unicode_passthrough_and_escaping() {
    let docs = load_from_str("greeting: héllo\n").unwrap();
    assert_eq!(emit_to_string(&docs[0]).unwrap(), "greeting: héllo\n");

    let mut opts = Options::default();
    opts.set("unicode", "false").unwrap();
    let mut out = String::new();
    Emitter::with_options(&mut out, opts).dump(&docs[0]).unwrap();
    assert_eq!(out, "greeting: \"h\\u00e9llo\"\n");
}

#[test]
fn indent_option_is_honored() {
    let docs = load_from_str("outer:\n  inner: 1\n").unwrap();
    let mut opts = Options::default();
    opts.set("indent", "4").unwrap();
    let mut out = String::new();
    Emitter::with_options(&mut out, opts).dump(&docs[0]).unwrap();
    assert_eq!(out, "outer:\n    inner: 1\n");
}

#[test]
fn quoted_styles_from_the_source_survive() {
    assert_eq!(roundtrip("k: \"quoted\"\n"), "k: \"quoted\"\n");
    assert_eq!(roundtrip("k: plain\n"), "k: plain\n");
}

#[test]
fn literal_blocks_preserve_breaks() {
    let out = roundtrip("text: |\n  line one\n  line two\n");
    assert_eq!(out, "text: |\n  line one\n  line two\n");
}

#[test]
fn stream_separator_between_documents() {
    let out = roundtrip("a\n---\nb\n");
    assert_eq!(out, "a\n--- b\n");
}
