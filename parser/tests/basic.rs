#![allow(clippy::bool_assert_comparison)]

use peridot_parser::{Event, Limits, Parser, ScalarStyle, ScanError};

/// Run the parser through the string.
///
/// # Returns
/// This function returns the events if parsing succeeds, the error the parser returned otherwise.
fn run_parser(input: &str) -> Result<Vec<Event>, ScanError> {
    let mut events = vec![];
    for x in Parser::new_from_str(input) {
        events.push(x?.0);
    }
    Ok(events)
}

#[test]
fn test_fail() {
    let s = "
# syntax error
scalar
key: [1, 2]]
key1:a2
";
    let Err(error) = run_parser(s) else { panic!() };
    assert_eq!(
        error.info(),
        "mapping values are not allowed in this context"
    );
    assert_eq!(
        error.to_string(),
        "mapping values are not allowed in this context at byte 26 line 4 column 4"
    );
}

#[test]
fn test_empty_doc() {
    assert_eq!(
        run_parser("").unwrap(),
        [Event::StreamStart, Event::StreamEnd]
    );

    assert_eq!(
        run_parser("---").unwrap(),
        [
            Event::StreamStart,
            Event::DocumentStart(true),
            Event::Scalar("~".to_string(), ScalarStyle::Plain, 0, None),
            Event::DocumentEnd(false),
            Event::StreamEnd,
        ]
    );
}

#[test]
fn test_multiple_documents() {
    let events = run_parser("a\n---\nb\n...\n").unwrap();
    assert_eq!(
        events,
        [
            Event::StreamStart,
            Event::DocumentStart(false),
            Event::Scalar("a".to_string(), ScalarStyle::Plain, 0, None),
            Event::DocumentEnd(false),
            Event::DocumentStart(true),
            Event::Scalar("b".to_string(), ScalarStyle::Plain, 0, None),
            Event::DocumentEnd(true),
            Event::StreamEnd,
        ]
    );
}

#[test]
fn test_scalar_styles() {
    let events = run_parser("- plain\n- 'single'\n- \"double\"\n- |\n  lit\n- >\n  fold\n").unwrap();
    let styles: Vec<ScalarStyle> = events
        .into_iter()
        .filter_map(|e| match e {
            Event::Scalar(_, style, ..) => Some(style),
            _ => None,
        })
        .collect();
    assert_eq!(
        styles,
        [
            ScalarStyle::Plain,
            ScalarStyle::SingleQuoted,
            ScalarStyle::DoubleQuoted,
            ScalarStyle::Literal,
            ScalarStyle::Folded,
        ]
    );
}

#[test]
fn test_max_depth() {
    let limits = Limits {
        max_depth: 4,
        ..Limits::default()
    };
    let ok = "[[[[x]]]]";
    let mut parser = Parser::new_from_str_with_limits(ok, limits);
    assert!(parser.all(|r| r.is_ok()));

    let too_deep = "[[[[[x]]]]]";
    let mut parser = Parser::new_from_str_with_limits(too_deep, limits);
    let err = parser
        .find_map(std::result::Result::err)
        .expect("nesting beyond the limit must fail");
    assert_eq!(err.info(), "exceeded max depth");
}

#[test]
fn test_anchors_resolve_to_ids() {
    let events = run_parser("a: &x 1\nb: *x\n").unwrap();
    let anchor = events
        .iter()
        .find_map(|e| match e {
            Event::Scalar(v, _, id, _) if v == "1" => Some(*id),
            _ => None,
        })
        .unwrap();
    assert_ne!(anchor, 0);
    assert!(events.contains(&Event::Alias(anchor)));
}

#[test]
fn test_unknown_anchor_message() {
    let Err(error) = run_parser("a: *nope\n") else {
        panic!()
    };
    assert_eq!(error.info(), "unknown anchor 'nope' referenced");
}

#[test]
fn test_tag_directive() {
    let events = run_parser("%TAG !e! tag:example.com,2024:\n---\n!e!point {x: 1}\n").unwrap();
    let tag = events
        .iter()
        .find_map(|e| match e {
            Event::MappingStart(_, Some(tag), _) => Some(tag.clone()),
            _ => None,
        })
        .unwrap();
    assert_eq!(tag.handle, "tag:example.com,2024:");
    assert_eq!(tag.suffix, "point");
}

#[test]
fn test_non_specific_tag() {
    let events = run_parser("! x\n").unwrap();
    let tag = events
        .iter()
        .find_map(|e| match e {
            Event::Scalar(_, _, _, Some(tag)) => Some(tag.clone()),
            _ => None,
        })
        .unwrap();
    assert_eq!(tag.handle, "");
    assert_eq!(tag.suffix, "!");
}

#[test]
fn test_version_directive_is_reported() {
    let mut parser = Parser::new_from_str("%YAML 1.2\n---\na\n");
    while let Ok((ev, _)) = parser.next_event() {
        if ev == Event::StreamEnd {
            break;
        }
    }
    assert_eq!(parser.version_directive(), Some((1, 2)));
}
