//! Home to the YAML parser.
//!
//! The parser takes input from the scanner and checks it against the YAML grammar, turning tokens
//! into a stream of [`Event`]s. Irrelevant details from the scanner (simple keys, indentation
//! tokens) are absent at this level; anchors and tag handles have been resolved.

use std::collections::HashMap;

use crate::{
    input::{BufferedInput, Input, StrInput},
    scanner::{Marker, ScalarStyle, ScanError, Scanner, Span, Token, TokenType},
    Limits,
};

#[derive(Clone, Copy, PartialEq, Debug, Eq)]
enum State {
    /// We await the start of the stream.
    StreamStart,
    ImplicitDocumentStart,
    DocumentStart,
    DocumentContent,
    DocumentEnd,
    BlockNode,
    BlockSequenceFirstEntry,
    BlockSequenceEntry,
    IndentlessSequenceEntry,
    BlockMappingFirstKey,
    BlockMappingKey,
    BlockMappingValue,
    FlowSequenceFirstEntry,
    FlowSequenceEntry,
    FlowSequenceEntryMappingKey,
    FlowSequenceEntryMappingValue,
    FlowSequenceEntryMappingEnd,
    FlowMappingFirstKey,
    FlowMappingKey,
    FlowMappingValue,
    FlowMappingEmptyValue,
    /// The parsing of the stream is finished.
    End,
}

/// A resolved YAML tag.
///
/// For tags using a registered handle (through a `%TAG` directive or one of the default `!` and
/// `!!` handles), [`handle`] holds the expanded prefix, e.g. `tag:yaml.org,2002:` for `!!str`.
/// For verbatim tags (`!<...>`), [`handle`] is empty and [`suffix`] holds the whole tag.
///
/// [`handle`]: Tag::handle
/// [`suffix`]: Tag::suffix
#[derive(Clone, PartialEq, Debug, Eq, Hash, PartialOrd, Ord)]
pub struct Tag {
    /// The expanded handle of the tag.
    pub handle: String,
    /// The suffix of the tag.
    pub suffix: String,
}

impl Tag {
    /// Whether the tag is from the YAML core schema (`tag:yaml.org,2002:`).
    #[must_use]
    pub fn is_yaml_core_schema(&self) -> bool {
        self.handle == "tag:yaml.org,2002:"
    }
}

impl std::fmt::Display for Tag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", self.handle, self.suffix)
    }
}

/// The presentation a collection used in the source.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum CollectionStyle {
    /// An indentation-based collection.
    Block,
    /// A `[...]` or `{...}` collection.
    Flow,
}

/// An event generated by the YAML parser.
///
/// Events are used in the low-level event-based API. This API is shared by all the higher level
/// constructs, such as the document tree.
#[derive(Clone, PartialEq, Debug, Eq)]
pub enum Event {
    /// Reserved for internal use.
    Nothing,
    /// Event generated at the very beginning of parsing.
    StreamStart,
    /// Last event that will be generated by the parser. Signals EOF.
    StreamEnd,
    /// The YAML start document directive (`---`).
    ///
    /// The `bool` is set if the directive was explicitly written in the input.
    DocumentStart(bool),
    /// The YAML end document directive (`...`).
    ///
    /// The `bool` is set if the directive was explicitly written in the input.
    DocumentEnd(bool),
    /// A YAML Alias.
    Alias(
        /// The anchor ID the alias refers to.
        usize,
    ),
    /// Value, style, anchor ID, tag.
    Scalar(String, ScalarStyle, usize, Option<Tag>),
    /// The start of a YAML sequence (array).
    SequenceStart(
        /// The anchor ID of the start of the sequence.
        usize,
        /// An optional tag.
        Option<Tag>,
        /// Whether the sequence was written in block or flow style.
        CollectionStyle,
    ),
    /// The end of a YAML sequence (array).
    SequenceEnd,
    /// The start of a YAML mapping (object, hash).
    MappingStart(
        /// The anchor ID of the start of the mapping.
        usize,
        /// An optional tag.
        Option<Tag>,
        /// Whether the mapping was written in block or flow style.
        CollectionStyle,
    ),
    /// The end of a YAML mapping (object, hash).
    MappingEnd,
}

impl Event {
    /// Create an empty scalar.
    fn empty_scalar() -> Event {
        // A empty scalar with plain style "~".
        Event::Scalar("~".to_owned(), ScalarStyle::Plain, 0, None)
    }

    /// Create an empty scalar with the given anchor.
    fn empty_scalar_with_anchor(anchor: usize, tag: Option<Tag>) -> Event {
        Event::Scalar(String::new(), ScalarStyle::Plain, anchor, tag)
    }
}

/// Trait to be implemented in order to use the low-level parsing API.
///
/// The low-level parsing API is event-based (a push parser), it calls [`EventReceiver::on_event`]
/// for each YAML [`Event`] that occurs.
pub trait EventReceiver {
    /// Handler called for each YAML event that is emitted by the parser.
    fn on_event(&mut self, ev: Event);
}

/// Trait to be implemented for using the low-level parsing API with spans.
pub trait SpannedEventReceiver {
    /// Handler called for each event that occurs.
    fn on_event(&mut self, ev: Event, span: Span);
}

impl<R: EventReceiver> SpannedEventReceiver for R {
    fn on_event(&mut self, ev: Event, _span: Span) {
        self.on_event(ev);
    }
}

/// A convenience alias for a `Result` of a parser event.
pub type ParseResult = Result<(Event, Span), ScanError>;

/// A YAML parser.
pub struct Parser<T: Input> {
    scanner: Scanner<T>,
    states: Vec<State>,
    state: State,
    token: Option<Token>,
    current: Option<(Event, Span)>,
    anchors: HashMap<String, usize>,
    anchor_id_count: usize,
    tags: HashMap<String, String>,
    /// The `%YAML` directive of the current document, if any.
    version: Option<(u32, u32)>,
    /// Whether tags declared through `%TAG` directives are kept across documents.
    keep_tags: bool,
}

impl<'a> Parser<StrInput<'a>> {
    /// Create a new instance of a parser from a &str.
    #[must_use]
    pub fn new_from_str(value: &'a str) -> Self {
        Parser::new(StrInput::new(value))
    }

    /// Create a new instance of a parser from a &str with the given limits.
    #[must_use]
    pub fn new_from_str_with_limits(value: &'a str, limits: Limits) -> Self {
        Parser::new_with_limits(StrInput::new(value), limits)
    }
}

impl<T: Iterator<Item = char>> Parser<BufferedInput<T>> {
    /// Create a new instance of a parser from an iterator of `char`s.
    pub fn new_from_iter(iter: T) -> Self {
        Parser::new(BufferedInput::new(iter))
    }
}

impl<T: Input> Parser<T> {
    /// Create a new instance of a parser from the given input of characters.
    pub fn new(input: T) -> Parser<T> {
        Self::new_with_limits(input, Limits::default())
    }

    /// Create a new instance of a parser with the given limits.
    pub fn new_with_limits(input: T, limits: Limits) -> Parser<T> {
        Parser {
            scanner: Scanner::new_with_limits(input, limits),
            states: Vec::new(),
            state: State::StreamStart,
            token: None,
            current: None,
            anchors: HashMap::new(),
            // valid anchor_id starts from 1
            anchor_id_count: 1,
            tags: HashMap::new(),
            version: None,
            keep_tags: false,
        }
    }

    /// Whether to keep tags across multiple documents when parsing.
    ///
    /// This behavior is non-standard as per the YAML specification but can be encountered in the
    /// wild. It is disabled by default.
    #[must_use]
    pub fn keep_tags(mut self, value: bool) -> Self {
        self.keep_tags = value;
        self
    }

    /// Return the limits the underlying scanner was built with.
    #[must_use]
    pub fn limits(&self) -> Limits {
        self.scanner.limits()
    }

    /// Return the `%YAML` directive of the document being parsed, if one was given.
    ///
    /// Reset when a new document starts.
    #[must_use]
    pub fn version_directive(&self) -> Option<(u32, u32)> {
        self.version
    }

    /// Drain the comments buffered by the scanner so far.
    ///
    /// See [`Scanner::unfold_comments`].
    #[cfg(feature = "comments")]
    pub fn unfold_comments(&mut self) -> Vec<crate::scanner::Comment> {
        self.scanner.unfold_comments()
    }

    /// Try to load the next event and return it, but do not consume it from `self`.
    ///
    /// Any subsequent call of [`Parser::next_event`] will return the same event.
    ///
    /// # Errors
    /// Returns `ScanError` when loading the next event fails.
    pub fn peek(&mut self) -> Result<&(Event, Span), ScanError> {
        if self.current.is_none() {
            self.current = Some(self.parse()?);
        }
        match self.current {
            Some(ref x) => Ok(x),
            None => unreachable!(),
        }
    }

    /// Try to load the next event and return it, consuming it from `self`.
    ///
    /// # Errors
    /// Returns `ScanError` when loading the next event fails.
    pub fn next_event(&mut self) -> ParseResult {
        match self.current.take() {
            None => self.parse(),
            Some(v) => Ok(v),
        }
    }

    /// Load the YAML from the stream in `self`, pushing events into `recv`.
    ///
    /// The contents of the stream are parsed and the corresponding events are sent into the
    /// recveiver. For detailed explanations about how events work, see [`EventReceiver`].
    ///
    /// If `multi` is set to `true`, the parser will allow parsing of multiple YAML documents
    /// inside the stream. Otherwise, parsing stops after the first document.
    ///
    /// # Errors
    /// Returns `ScanError` when loading fails.
    pub fn load<R: SpannedEventReceiver>(
        &mut self,
        recv: &mut R,
        multi: bool,
    ) -> Result<(), ScanError> {
        let (ev, span) = self.next_event()?;
        if ev != Event::StreamStart {
            return Err(ScanError::new_str(
                span.start,
                "did not find expected <stream-start>",
            ));
        }
        recv.on_event(ev, span);

        let (mut ev, mut span) = self.next_event()?;
        loop {
            if ev == Event::StreamEnd {
                recv.on_event(ev, span);
                return Ok(());
            }
            self.load_document(ev, span, recv)?;
            if !multi {
                break;
            }
            (ev, span) = self.next_event()?;
        }
        Ok(())
    }

    fn load_document<R: SpannedEventReceiver>(
        &mut self,
        first_ev: Event,
        span: Span,
        recv: &mut R,
    ) -> Result<(), ScanError> {
        if !matches!(first_ev, Event::DocumentStart(_)) {
            return Err(ScanError::new(
                span.start,
                format!("did not find expected <document start> (actual: {first_ev:?})"),
            ));
        }
        recv.on_event(first_ev, span);

        let (ev, span) = self.next_event()?;
        self.load_node(ev, span, recv)?;

        // DocumentEnd
        let (ev, span) = self.next_event()?;
        if !matches!(ev, Event::DocumentEnd(_)) {
            return Err(ScanError::new(
                span.start,
                format!("did not find expected <document end> (actual: {ev:?})"),
            ));
        }
        recv.on_event(ev, span);

        Ok(())
    }

    fn load_node<R: SpannedEventReceiver>(
        &mut self,
        first_ev: Event,
        span: Span,
        recv: &mut R,
    ) -> Result<(), ScanError> {
        match first_ev {
            Event::Alias(..) | Event::Scalar(..) => {
                recv.on_event(first_ev, span);
                Ok(())
            }
            Event::SequenceStart(..) => {
                recv.on_event(first_ev, span);
                self.load_sequence(recv)
            }
            Event::MappingStart(..) => {
                recv.on_event(first_ev, span);
                self.load_mapping(recv)
            }
            _ => Err(ScanError::new(
                span.start,
                format!("unexpected event (actual: {first_ev:?})"),
            )),
        }
    }

    fn load_mapping<R: SpannedEventReceiver>(&mut self, recv: &mut R) -> Result<(), ScanError> {
        let (mut key_ev, mut key_span) = self.next_event()?;
        while key_ev != Event::MappingEnd {
            // key
            self.load_node(key_ev, key_span, recv)?;

            // value
            let (ev, span) = self.next_event()?;
            self.load_node(ev, span, recv)?;

            // next event
            let (ev, span) = self.next_event()?;
            key_ev = ev;
            key_span = span;
        }
        recv.on_event(key_ev, key_span);
        Ok(())
    }

    fn load_sequence<R: SpannedEventReceiver>(&mut self, recv: &mut R) -> Result<(), ScanError> {
        let (mut ev, mut span) = self.next_event()?;
        while ev != Event::SequenceEnd {
            self.load_node(ev, span, recv)?;

            // next event
            let (next_ev, next_span) = self.next_event()?;
            ev = next_ev;
            span = next_span;
        }
        recv.on_event(ev, span);
        Ok(())
    }

    fn peek_token(&mut self) -> Result<&Token, ScanError> {
        if self.token.is_none() {
            let token = self.scan_next_token()?;
            self.token = Some(token);
        }
        match self.token {
            Some(ref tok) => Ok(tok),
            None => unreachable!(),
        }
    }

    fn scan_next_token(&mut self) -> Result<Token, ScanError> {
        match self.scanner.next_token()? {
            Some(tok) => Ok(tok),
            None => Err(ScanError::new_str(
                self.scanner.mark(),
                "unexpected end of stream",
            )),
        }
    }

    fn fetch_token(&mut self) -> Token {
        self.token
            .take()
            .expect("fetch_token needs to be preceded by peek_token")
    }

    fn skip(&mut self) {
        self.token = None;
    }

    fn pop_state(&mut self) {
        self.state = self.states.pop().expect("pop_state needs a preceding push_state");
    }

    fn push_state(&mut self, state: State) {
        self.states.push(state);
    }

    fn parse(&mut self) -> ParseResult {
        if self.state == State::End {
            return Ok((Event::StreamEnd, Span::empty(self.scanner.mark())));
        }
        self.state_machine()
    }

    fn state_machine(&mut self) -> ParseResult {
        match self.state {
            State::StreamStart => self.stream_start(),

            State::ImplicitDocumentStart => self.document_start(true),
            State::DocumentStart => self.document_start(false),
            State::DocumentContent => self.document_content(),
            State::DocumentEnd => self.document_end(),

            State::BlockNode => self.parse_node(true, false),
            State::BlockMappingFirstKey => self.block_mapping_key(true),
            State::BlockMappingKey => self.block_mapping_key(false),
            State::BlockMappingValue => self.block_mapping_value(),

            State::BlockSequenceFirstEntry => self.block_sequence_entry(true),
            State::BlockSequenceEntry => self.block_sequence_entry(false),

            State::FlowSequenceFirstEntry => self.flow_sequence_entry(true),
            State::FlowSequenceEntry => self.flow_sequence_entry(false),

            State::FlowMappingFirstKey => self.flow_mapping_key(true),
            State::FlowMappingKey => self.flow_mapping_key(false),
            State::FlowMappingValue => self.flow_mapping_value(false),

            State::IndentlessSequenceEntry => self.indentless_sequence_entry(),

            State::FlowSequenceEntryMappingKey => self.flow_sequence_entry_mapping_key(),
            State::FlowSequenceEntryMappingValue => self.flow_sequence_entry_mapping_value(),
            State::FlowSequenceEntryMappingEnd => self.flow_sequence_entry_mapping_end(),
            State::FlowMappingEmptyValue => self.flow_mapping_value(true),

            State::End => unreachable!(),
        }
    }

    fn stream_start(&mut self) -> ParseResult {
        match *self.peek_token()? {
            Token {
                span,
                kind: TokenType::StreamStart,
            } => {
                self.state = State::ImplicitDocumentStart;
                self.skip();
                Ok((Event::StreamStart, span))
            }
            Token { span, .. } => Err(ScanError::new_str(
                span.start,
                "did not find expected <stream-start>",
            )),
        }
    }

    fn document_start(&mut self, implicit: bool) -> ParseResult {
        if !implicit {
            while let TokenType::DocumentEnd = self.peek_token()?.kind {
                self.skip();
            }
        }

        match *self.peek_token()? {
            Token {
                span,
                kind: TokenType::StreamEnd,
            } => {
                self.state = State::End;
                self.skip();
                Ok((Event::StreamEnd, span))
            }
            Token {
                kind:
                    TokenType::VersionDirective(..)
                    | TokenType::TagDirective(..)
                    | TokenType::DocumentStart,
                ..
            } => self.explicit_document_start(),
            Token { span, .. } if implicit => {
                self.parser_process_directives()?;
                self.push_state(State::DocumentEnd);
                self.state = State::BlockNode;
                Ok((Event::DocumentStart(false), span))
            }
            _ => {
                // explicit document
                self.explicit_document_start()
            }
        }
    }

    fn parser_process_directives(&mut self) -> Result<(), ScanError> {
        let mut version_directive_received = false;
        self.version = None;
        loop {
            let mut tags = HashMap::new();
            let mut version = None;
            match self.peek_token()? {
                Token {
                    span,
                    kind: TokenType::VersionDirective(major, minor),
                } => {
                    if *major != 1 {
                        return Err(ScanError::new_str(
                            span.start,
                            "found incompatible YAML document",
                        ));
                    }
                    if version_directive_received {
                        return Err(ScanError::new_str(span.start, "duplicate version directive"));
                    }
                    version_directive_received = true;
                    version = Some((*major, *minor));
                }
                Token {
                    span,
                    kind: TokenType::TagDirective(handle, prefix),
                } => {
                    if tags.contains_key(handle) {
                        return Err(ScanError::new_str(
                            span.start,
                            "the TAG directive must only be given at most once per handle in the same document",
                        ));
                    }
                    tags.insert(handle.to_string(), prefix.to_string());
                }
                _ => break,
            }
            self.tags.extend(tags);
            if version.is_some() {
                self.version = version;
            }
            self.skip();
        }
        Ok(())
    }

    fn explicit_document_start(&mut self) -> ParseResult {
        self.parser_process_directives()?;
        match *self.peek_token()? {
            Token {
                span,
                kind: TokenType::DocumentStart,
            } => {
                self.push_state(State::DocumentEnd);
                self.state = State::DocumentContent;
                self.skip();
                Ok((Event::DocumentStart(true), span))
            }
            Token { span, .. } => Err(ScanError::new_str(
                span.start,
                "did not find expected <document start>",
            )),
        }
    }

    fn document_content(&mut self) -> ParseResult {
        match *self.peek_token()? {
            Token {
                span,
                kind:
                    TokenType::VersionDirective(..)
                    | TokenType::TagDirective(..)
                    | TokenType::DocumentStart
                    | TokenType::DocumentEnd
                    | TokenType::StreamEnd,
            } => {
                self.pop_state();
                // empty scalar
                Ok((Event::empty_scalar(), Span::empty(span.start)))
            }
            _ => self.parse_node(true, false),
        }
    }

    fn document_end(&mut self) -> ParseResult {
        let mut explicit_end = false;
        let span: Span = match *self.peek_token()? {
            Token {
                span,
                kind: TokenType::DocumentEnd,
            } => {
                explicit_end = true;
                self.skip();
                span
            }
            Token { span, .. } => span,
        };

        if !self.keep_tags {
            self.tags.clear();
        }
        // Anchors are scoped to one document.
        self.anchors.clear();
        self.state = State::DocumentStart;
        Ok((Event::DocumentEnd(explicit_end), span))
    }

    fn register_anchor(&mut self, name: String) -> usize {
        // anchors can be overridden/reused
        let new_id = self.anchor_id_count;
        self.anchor_id_count += 1;
        self.anchors.insert(name, new_id);
        new_id
    }

    /// Return the source name behind an anchor id of the current document.
    ///
    /// Returns `None` for ids of other documents or for names that have since been redefined.
    #[must_use]
    pub fn anchor_name(&self, anchor_id: usize) -> Option<&str> {
        self.anchors
            .iter()
            .find(|&(_, &id)| id == anchor_id)
            .map(|(name, _)| name.as_str())
    }

    #[allow(clippy::too_many_lines)]
    fn parse_node(&mut self, block: bool, indentless_sequence: bool) -> ParseResult {
        let mut anchor_id = 0;
        let mut tag = None;
        match *self.peek_token()? {
            Token {
                kind: TokenType::Alias(_),
                ..
            } => {
                self.pop_state();
                if let Token {
                    span,
                    kind: TokenType::Alias(name),
                } = self.fetch_token()
                {
                    match self.anchors.get(&name) {
                        None => {
                            return Err(ScanError::new(
                                span.start,
                                format!("unknown anchor '{name}' referenced"),
                            ))
                        }
                        Some(id) => return Ok((Event::Alias(*id), span)),
                    }
                }
                unreachable!()
            }
            Token {
                kind: TokenType::Anchor(_),
                ..
            } => {
                if let Token {
                    kind: TokenType::Anchor(name),
                    ..
                } = self.fetch_token()
                {
                    anchor_id = self.register_anchor(name);
                    if let TokenType::Tag(..) = self.peek_token()?.kind {
                        if let Token {
                            kind: TokenType::Tag(handle, suffix),
                            span: tag_span,
                        } = self.fetch_token()
                        {
                            tag = Some(self.resolve_tag(tag_span.start, &handle, suffix)?);
                        } else {
                            unreachable!()
                        }
                    }
                } else {
                    unreachable!()
                }
            }
            Token {
                kind: TokenType::Tag(..),
                ..
            } => {
                if let Token {
                    kind: TokenType::Tag(handle, suffix),
                    span: tag_span,
                } = self.fetch_token()
                {
                    tag = Some(self.resolve_tag(tag_span.start, &handle, suffix)?);
                    if let TokenType::Anchor(_) = self.peek_token()?.kind {
                        if let Token {
                            kind: TokenType::Anchor(name),
                            ..
                        } = self.fetch_token()
                        {
                            anchor_id = self.register_anchor(name);
                        } else {
                            unreachable!()
                        }
                    }
                } else {
                    unreachable!()
                }
            }
            _ => {}
        }
        match *self.peek_token()? {
            Token {
                span,
                kind: TokenType::BlockEntry,
            } if indentless_sequence => {
                self.state = State::IndentlessSequenceEntry;
                Ok((
                    Event::SequenceStart(anchor_id, tag, CollectionStyle::Block),
                    span,
                ))
            }
            Token {
                kind: TokenType::Scalar(..),
                ..
            } => {
                self.pop_state();
                if let Token {
                    span,
                    kind: TokenType::Scalar(style, v),
                } = self.fetch_token()
                {
                    Ok((Event::Scalar(v, style, anchor_id, tag), span))
                } else {
                    unreachable!()
                }
            }
            Token {
                span,
                kind: TokenType::FlowSequenceStart,
            } => {
                self.state = State::FlowSequenceFirstEntry;
                Ok((
                    Event::SequenceStart(anchor_id, tag, CollectionStyle::Flow),
                    span,
                ))
            }
            Token {
                span,
                kind: TokenType::FlowMappingStart,
            } => {
                self.state = State::FlowMappingFirstKey;
                Ok((
                    Event::MappingStart(anchor_id, tag, CollectionStyle::Flow),
                    span,
                ))
            }
            Token {
                span,
                kind: TokenType::BlockSequenceStart,
            } if block => {
                self.state = State::BlockSequenceFirstEntry;
                Ok((
                    Event::SequenceStart(anchor_id, tag, CollectionStyle::Block),
                    span,
                ))
            }
            Token {
                span,
                kind: TokenType::BlockMappingStart,
            } if block => {
                self.state = State::BlockMappingFirstKey;
                Ok((
                    Event::MappingStart(anchor_id, tag, CollectionStyle::Block),
                    span,
                ))
            }
            Token { span, .. } if tag.is_some() || anchor_id > 0 => {
                self.pop_state();
                Ok((
                    Event::empty_scalar_with_anchor(anchor_id, tag),
                    Span::empty(span.start),
                ))
            }
            Token { span, .. } => Err(ScanError::new_str(
                span.start,
                "while parsing a node, did not find expected node content",
            )),
        }
    }

    /// Expand the handle of a shorthand tag into its prefix.
    fn resolve_tag(&self, mark: Marker, handle: &str, suffix: String) -> Result<Tag, ScanError> {
        if handle.is_empty() {
            // Verbatim tag or the non-specific `!` tag.
            return Ok(Tag {
                handle: String::new(),
                suffix,
            });
        }
        if let Some(prefix) = self.tags.get(handle) {
            return Ok(Tag {
                handle: prefix.clone(),
                suffix,
            });
        }
        match handle {
            "!!" => Ok(Tag {
                handle: "tag:yaml.org,2002:".to_owned(),
                suffix,
            }),
            "!" => Ok(Tag {
                handle: "!".to_owned(),
                suffix,
            }),
            _ => Err(ScanError::new(
                mark,
                format!("while parsing a node, found undefined tag handle '{handle}'"),
            )),
        }
    }

    fn block_sequence_entry(&mut self, first: bool) -> ParseResult {
        // BLOCK-SEQUENCE-START
        if first {
            let _ = self.peek_token()?;
            self.skip();
        }
        match *self.peek_token()? {
            Token {
                span,
                kind: TokenType::BlockEnd,
            } => {
                self.pop_state();
                self.skip();
                Ok((Event::SequenceEnd, span))
            }
            Token {
                span,
                kind: TokenType::BlockEntry,
            } => {
                self.skip();
                match *self.peek_token()? {
                    Token {
                        kind: TokenType::BlockEntry | TokenType::BlockEnd,
                        ..
                    } => {
                        self.state = State::BlockSequenceEntry;
                        Ok((Event::empty_scalar(), Span::empty(span.end)))
                    }
                    _ => {
                        self.push_state(State::BlockSequenceEntry);
                        self.parse_node(true, false)
                    }
                }
            }
            Token { span, .. } => Err(ScanError::new_str(
                span.start,
                "while parsing a block collection, did not find expected '-' indicator",
            )),
        }
    }

    fn indentless_sequence_entry(&mut self) -> ParseResult {
        match *self.peek_token()? {
            Token {
                kind: TokenType::BlockEntry,
                ..
            } => (),
            Token { span, .. } => {
                self.pop_state();
                return Ok((Event::SequenceEnd, Span::empty(span.start)));
            }
        }
        let span = self.peek_token()?.span;
        self.skip();
        match *self.peek_token()? {
            Token {
                kind:
                    TokenType::BlockEntry
                    | TokenType::Key
                    | TokenType::Value
                    | TokenType::BlockEnd,
                ..
            } => {
                self.state = State::IndentlessSequenceEntry;
                Ok((Event::empty_scalar(), Span::empty(span.end)))
            }
            _ => {
                self.push_state(State::IndentlessSequenceEntry);
                self.parse_node(true, false)
            }
        }
    }

    fn block_mapping_key(&mut self, first: bool) -> ParseResult {
        // skip BlockMappingStart
        if first {
            let _ = self.peek_token()?;
            self.skip();
        }
        match *self.peek_token()? {
            Token {
                span,
                kind: TokenType::Key,
            } => {
                self.skip();
                match *self.peek_token()? {
                    Token {
                        kind: TokenType::Key | TokenType::Value | TokenType::BlockEnd,
                        ..
                    } => {
                        self.state = State::BlockMappingValue;
                        // empty scalar
                        Ok((Event::empty_scalar(), Span::empty(span.end)))
                    }
                    _ => {
                        self.push_state(State::BlockMappingValue);
                        self.parse_node(true, true)
                    }
                }
            }
            // A `:` with no preceding key token, as in YAML 1.2 example 8.18.
            Token {
                span,
                kind: TokenType::Value,
            } => {
                self.state = State::BlockMappingValue;
                Ok((Event::empty_scalar(), Span::empty(span.start)))
            }
            Token {
                span,
                kind: TokenType::BlockEnd,
            } => {
                self.pop_state();
                self.skip();
                Ok((Event::MappingEnd, span))
            }
            Token { span, .. } => Err(ScanError::new_str(
                span.start,
                "while parsing a block mapping, did not find expected key",
            )),
        }
    }

    fn block_mapping_value(&mut self) -> ParseResult {
        match *self.peek_token()? {
            Token {
                span,
                kind: TokenType::Value,
            } => {
                self.skip();
                match *self.peek_token()? {
                    Token {
                        kind: TokenType::Key | TokenType::Value | TokenType::BlockEnd,
                        ..
                    } => {
                        self.state = State::BlockMappingKey;
                        // empty scalar
                        Ok((Event::empty_scalar(), Span::empty(span.end)))
                    }
                    _ => {
                        self.push_state(State::BlockMappingKey);
                        self.parse_node(true, true)
                    }
                }
            }
            Token { span, .. } => {
                self.state = State::BlockMappingKey;
                // empty scalar
                Ok((Event::empty_scalar(), Span::empty(span.start)))
            }
        }
    }

    fn flow_mapping_key(&mut self, first: bool) -> ParseResult {
        if first {
            let _ = self.peek_token()?;
            self.skip();
        } else {
            match *self.peek_token()? {
                Token {
                    kind: TokenType::FlowMappingEnd,
                    ..
                } => {}
                Token {
                    kind: TokenType::FlowEntry,
                    ..
                } => self.skip(),
                Token { span, .. } => {
                    return Err(ScanError::new_str(
                        span.start,
                        "while parsing a flow mapping, did not find expected ',' or '}'",
                    ))
                }
            }
        }

        match *self.peek_token()? {
            Token {
                span,
                kind: TokenType::Key,
            } => {
                self.skip();
                match *self.peek_token()? {
                    Token {
                        kind:
                            TokenType::Value | TokenType::FlowEntry | TokenType::FlowMappingEnd,
                        ..
                    } => {
                        self.state = State::FlowMappingValue;
                        Ok((Event::empty_scalar(), Span::empty(span.end)))
                    }
                    _ => {
                        self.push_state(State::FlowMappingValue);
                        self.parse_node(false, false)
                    }
                }
            }
            Token {
                span,
                kind: TokenType::Value,
            } => {
                self.state = State::FlowMappingValue;
                Ok((Event::empty_scalar(), Span::empty(span.start)))
            }
            Token {
                kind: TokenType::FlowMappingEnd,
                ..
            } => {
                let span = self.peek_token()?.span;
                self.pop_state();
                self.skip();
                Ok((Event::MappingEnd, span))
            }
            _ => {
                self.push_state(State::FlowMappingEmptyValue);
                self.parse_node(false, false)
            }
        }
    }

    fn flow_mapping_value(&mut self, empty: bool) -> ParseResult {
        let span: Span = {
            if empty {
                let span = self.peek_token()?.span;
                self.state = State::FlowMappingKey;
                return Ok((Event::empty_scalar(), Span::empty(span.start)));
            }
            match *self.peek_token()? {
                Token {
                    span,
                    kind: TokenType::Value,
                } => {
                    self.skip();
                    match self.peek_token()?.kind {
                        TokenType::FlowEntry | TokenType::FlowMappingEnd => {}
                        _ => {
                            self.push_state(State::FlowMappingKey);
                            return self.parse_node(false, false);
                        }
                    }
                    span
                }
                Token { span, .. } => span,
            }
        };

        self.state = State::FlowMappingKey;
        Ok((Event::empty_scalar(), Span::empty(span.start)))
    }

    fn flow_sequence_entry(&mut self, first: bool) -> ParseResult {
        // skip FlowSequenceStart
        if first {
            let _ = self.peek_token()?;
            self.skip();
        }
        match *self.peek_token()? {
            Token {
                span,
                kind: TokenType::FlowSequenceEnd,
            } => {
                self.pop_state();
                self.skip();
                return Ok((Event::SequenceEnd, span));
            }
            Token {
                kind: TokenType::FlowEntry,
                ..
            } if !first => {
                self.skip();
            }
            Token { span, .. } if !first => {
                return Err(ScanError::new_str(
                    span.start,
                    "while parsing a flow sequence, expected ',' or ']'",
                ));
            }
            _ => { /* next */ }
        }
        match *self.peek_token()? {
            Token {
                span,
                kind: TokenType::FlowSequenceEnd,
            } => {
                self.pop_state();
                self.skip();
                Ok((Event::SequenceEnd, span))
            }
            Token {
                span,
                kind: TokenType::Key,
            } => {
                self.state = State::FlowSequenceEntryMappingKey;
                self.skip();
                Ok((Event::MappingStart(0, None, CollectionStyle::Flow), span))
            }
            _ => {
                self.push_state(State::FlowSequenceEntry);
                self.parse_node(false, false)
            }
        }
    }

    fn flow_sequence_entry_mapping_key(&mut self) -> ParseResult {
        match *self.peek_token()? {
            Token {
                span,
                kind:
                    TokenType::Value | TokenType::FlowEntry | TokenType::FlowSequenceEnd,
            } => {
                self.state = State::FlowSequenceEntryMappingValue;
                Ok((Event::empty_scalar(), Span::empty(span.start)))
            }
            _ => {
                self.push_state(State::FlowSequenceEntryMappingValue);
                self.parse_node(false, false)
            }
        }
    }

    fn flow_sequence_entry_mapping_value(&mut self) -> ParseResult {
        match *self.peek_token()? {
            Token {
                span,
                kind: TokenType::Value,
            } => {
                self.skip();
                self.state = State::FlowSequenceEntryMappingValue;
                match *self.peek_token()? {
                    Token {
                        kind: TokenType::FlowEntry | TokenType::FlowSequenceEnd,
                        ..
                    } => {
                        self.state = State::FlowSequenceEntryMappingEnd;
                        Ok((Event::empty_scalar(), Span::empty(span.start)))
                    }
                    _ => {
                        self.push_state(State::FlowSequenceEntryMappingEnd);
                        self.parse_node(false, false)
                    }
                }
            }
            Token { span, .. } => {
                self.state = State::FlowSequenceEntryMappingEnd;
                Ok((Event::empty_scalar(), Span::empty(span.start)))
            }
        }
    }

    fn flow_sequence_entry_mapping_end(&mut self) -> ParseResult {
        self.state = State::FlowSequenceEntry;
        Ok((Event::MappingEnd, Span::empty(self.scanner.mark())))
    }
}

impl<T: Input> Iterator for Parser<T> {
    type Item = ParseResult;

    fn next(&mut self) -> Option<Self::Item> {
        if self.state == State::End && self.current.is_none() {
            None
        } else {
            Some(self.next_event())
        }
    }
}
