//! Checks on the position information attached to events.

use peridot_parser::{Event, Parser};

/// Collect `(event, span)` pairs for a stream that must parse cleanly.
fn run_parser_spanned(input: &str) -> Vec<(Event, peridot_parser::Span)> {
    Parser::new_from_str(input)
        .collect::<Result<Vec<_>, _>>()
        .unwrap()
}

/// Spans must never move backwards while traversing a stream.
#[test]
fn marks_are_monotonic() {
    let inputs = [
        "a: 1\nb:\n  - x\n  - y\nc: {k: v}\n",
        "---\nfoo\n...\n---\nbar\n",
        "- &a [1, 2]\n- *a\n- |\n  block\n",
        "? [complex, key]\n: value\n",
    ];
    for input in inputs {
        let mut last = 0;
        for (ev, span) in run_parser_spanned(input) {
            assert!(
                span.start.index() >= last,
                "span for {ev:?} moved backwards in {input:?}"
            );
            assert!(span.end.index() >= span.start.index());
            last = span.start.index();
        }
    }
}

/// A scalar's span must cover exactly its text in the input.
#[test]
fn plain_scalar_spans_cover_their_text() {
    let input = "foo: bar\nbaz: qux\n";
    for (ev, span) in run_parser_spanned(input) {
        if let Event::Scalar(text, ..) = ev {
            let slice: String = input
                .chars()
                .skip(span.start.index())
                .take(span.end.index() - span.start.index())
                .collect();
            assert_eq!(slice, text);
        }
    }
}

/// Flow collection spans include their brackets.
#[test]
fn flow_sequence_spans_include_delimiters() {
    let input = "key: [1, 2, 3]\n";
    let events = run_parser_spanned(input);
    let start = events
        .iter()
        .find_map(|(ev, span)| match ev {
            Event::SequenceStart(..) => Some(span.start.index()),
            _ => None,
        })
        .unwrap();
    let end = events
        .iter()
        .find_map(|(ev, span)| match ev {
            Event::SequenceEnd => Some(span.end.index()),
            _ => None,
        })
        .unwrap();
    assert_eq!(&input[start..end], "[1, 2, 3]");
}

/// Line and column match the byte index for single-line ASCII input.
#[test]
fn line_and_column_are_consistent() {
    let input = "alpha: 1\nbeta: 2\n";
    for (ev, span) in run_parser_spanned(input) {
        if let Event::Scalar(..) = ev {
            let line_start = input[..span.start.index()]
                .rfind('\n')
                .map_or(0, |i| i + 1);
            assert_eq!(span.start.col(), span.start.index() - line_start);
        }
    }
}
