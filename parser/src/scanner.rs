//! The tokenizer.
//!
//! The scanner turns a stream of characters into a stream of [`Token`]s, keeping track of
//! indentation, flow nesting and simple-key candidates. It is the only stage that looks at
//! individual characters; the parser above it only ever sees tokens.

use std::collections::VecDeque;

use crate::{
    char_traits::{
        as_hex, is_alpha, is_anchor_char, is_blank, is_blank_or_breakz, is_break, is_breakz,
        is_digit, is_flow, is_hex, is_tag_char, is_uri_char, is_z,
    },
    input::{Input, SkipTabs},
    Limits,
};

/// The style of a YAML scalar.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ScalarStyle {
    /// A YAML plain scalar.
    Plain,
    /// A YAML single quoted scalar.
    SingleQuoted,
    /// A YAML double quoted scalar.
    DoubleQuoted,
    /// A YAML literal block scalar.
    Literal,
    /// A YAML folded block scalar.
    Folded,
}

impl ScalarStyle {
    /// Whether the style is a block scalar style (literal or folded).
    #[must_use]
    pub fn is_block(self) -> bool {
        matches!(self, ScalarStyle::Literal | ScalarStyle::Folded)
    }
}

/// A location in a YAML stream.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct Marker {
    /// The offset (in characters) of the mark from the start of the stream.
    index: usize,
    /// The line of the mark, starting at 1.
    line: usize,
    /// The column of the mark, starting at 0.
    col: usize,
}

impl Marker {
    /// Create a new [`Marker`] at the given position.
    #[must_use]
    pub fn new(index: usize, line: usize, col: usize) -> Marker {
        Marker { index, line, col }
    }

    /// Return the index (in characters) of the mark.
    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    /// Return the line of the mark, starting at 1.
    #[must_use]
    pub fn line(&self) -> usize {
        self.line
    }

    /// Return the column of the mark, starting at 0.
    #[must_use]
    pub fn col(&self) -> usize {
        self.col
    }
}

/// A range of locations in a YAML stream.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct Span {
    /// The start (inclusive) of the range.
    pub start: Marker,
    /// The end (exclusive) of the range.
    pub end: Marker,
}

impl Span {
    /// Create a new [`Span`] from the given range.
    #[must_use]
    pub fn new(start: Marker, end: Marker) -> Span {
        Span { start, end }
    }

    /// Create an empty [`Span`] at the given position.
    #[must_use]
    pub fn empty(mark: Marker) -> Span {
        Span {
            start: mark,
            end: mark,
        }
    }
}

/// An error that occurred while scanning.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct ScanError {
    /// The position at which the error happened in the source.
    mark: Marker,
    /// Human-readable details about the error.
    info: String,
}

impl ScanError {
    /// Create a new error with the given position and message.
    #[must_use]
    pub fn new(mark: Marker, info: String) -> ScanError {
        ScanError { mark, info }
    }

    /// Convenience alias for string slices.
    #[must_use]
    pub fn new_str(mark: Marker, info: &str) -> ScanError {
        ScanError {
            mark,
            info: info.to_owned(),
        }
    }

    /// Return the position at which the error happened.
    #[must_use]
    pub fn marker(&self) -> &Marker {
        &self.mark
    }

    /// Return the information string describing the error that happened.
    #[must_use]
    pub fn info(&self) -> &str {
        self.info.as_ref()
    }
}

impl std::error::Error for ScanError {
    fn description(&self) -> &str {
        self.info.as_ref()
    }
}

impl std::fmt::Display for ScanError {
    fn fmt(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            formatter,
            "{} at byte {} line {} column {}",
            self.info,
            self.mark.index,
            self.mark.line,
            self.mark.col + 1,
        )
    }
}

/// The contents of a scanner token.
#[derive(Clone, PartialEq, Debug, Eq)]
pub enum TokenType {
    /// The start of the stream. Sent first, before even [`TokenType::DocumentStart`].
    StreamStart,
    /// The end of the stream, EOF.
    StreamEnd,
    /// A YAML version directive, e.g.: `%YAML 1.2`.
    VersionDirective(
        /// Major version.
        u32,
        /// Minor version.
        u32,
    ),
    /// A YAML tag directive, e.g.: `%TAG !yaml! tag:yaml.org,2002:`.
    TagDirective(
        /// Handle.
        String,
        /// Prefix.
        String,
    ),
    /// The start of a YAML document (`---`).
    DocumentStart,
    /// The end of a YAML document (`...`).
    DocumentEnd,
    /// The start of a sequence block.
    ///
    /// Sequence blocks are arrays starting with a `-`.
    BlockSequenceStart,
    /// The start of a sequence mapping.
    ///
    /// Sequence mappings are "dictionaries" with "key: value" entries.
    BlockMappingStart,
    /// End of the corresponding `BlockSequenceStart` or `BlockMappingStart`.
    BlockEnd,
    /// Start of an inline sequence (`[ a, b ]`).
    FlowSequenceStart,
    /// End of an inline sequence.
    FlowSequenceEnd,
    /// Start of an inline mapping (`{ a: b, c: d }`).
    FlowMappingStart,
    /// End of an inline mapping.
    FlowMappingEnd,
    /// An entry in a block sequence (c.f.: [`TokenType::BlockSequenceStart`]).
    BlockEntry,
    /// An entry in a flow sequence (c.f.: [`TokenType::FlowSequenceStart`]).
    FlowEntry,
    /// A key in a mapping.
    Key,
    /// A value in a mapping.
    Value,
    /// A reference to an anchor.
    Alias(String),
    /// A YAML anchor (`&`/`*`).
    Anchor(String),
    /// A YAML tag (starting with bangs `!`).
    Tag(
        /// The handle of the tag.
        String,
        /// The suffix of the tag.
        String,
    ),
    /// A regular YAML scalar.
    Scalar(ScalarStyle, String),
}

/// A scanner token.
#[derive(Clone, PartialEq, Debug, Eq)]
pub struct Token {
    /// The token's position in the source.
    pub span: Span,
    /// The token's contents.
    pub kind: TokenType,
}

impl Token {
    fn new(span: Span, kind: TokenType) -> Token {
        Token { span, kind }
    }
}

/// A comment captured while scanning.
///
/// Only available with the `comments` feature. Comments are buffered by the scanner and surfaced
/// through [`Scanner::unfold_comments`], after which the buffer is cleared so no comment is ever
/// reported twice.
#[cfg(feature = "comments")]
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Comment {
    /// How the comment relates to the surrounding tokens.
    pub kind: CommentKind,
    /// The comment's text, without the leading `#` and surrounding whitespace.
    pub text: String,
    /// The comment's position in the source.
    pub span: Span,
}

/// The attachment position of a [`Comment`].
#[cfg(feature = "comments")]
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum CommentKind {
    /// A comment on its own line(s), preceding the next token.
    Head,
    /// A trailing comment on the same line as the previous token.
    Line,
    /// A comment block separated from the following content by a blank line, attributable to the
    /// preceding construct.
    Foot,
}

/// A candidate for a simple (unquoted, single-line) mapping key.
#[derive(Clone, Copy, PartialEq, Debug, Eq, Default)]
struct SimpleKey {
    /// Whether the candidate may still become a key.
    possible: bool,
    /// Whether a key is required at this position (the grammar allows nothing else).
    required: bool,
    /// The number of the token this candidate would retro-emit a `Key` before.
    token_number: usize,
    /// The position of the candidate.
    mark: Marker,
}

impl SimpleKey {
    fn new(mark: Marker) -> SimpleKey {
        SimpleKey {
            mark,
            ..SimpleKey::default()
        }
    }
}

/// A convenience alias for scanner functions that may fail.
pub type ScanResult<T = ()> = Result<T, ScanError>;

/// The YAML tokenizer.
#[allow(clippy::struct_excessive_bools)]
pub struct Scanner<T: Input> {
    /// The input source.
    input: T,
    /// The position of the next character to read.
    mark: Marker,
    /// Structural limits for this parse.
    limits: Limits,
    /// The current combined block/flow nesting depth, checked against [`Limits::max_depth`].
    depth: usize,
    /// Buffer for tokens that have been scanned but not yet returned.
    ///
    /// Tokens are queued rather than returned one by one because confirming a simple key
    /// retro-emits a `Key` token in front of tokens that have already been scanned.
    tokens: VecDeque<Token>,
    /// Whether we have already emitted the `StreamStart` token.
    stream_start_produced: bool,
    /// Whether we have already emitted the `StreamEnd` token.
    stream_end_produced: bool,
    /// In these positions, a value of a mapping may not begin with a whitespace.
    ///
    /// This is set after a quoted scalar in flow context: `{"a":b}` is valid there.
    adjacent_value_allowed_at: usize,
    /// Whether a simple key could potentially start at the current position.
    simple_key_allowed: bool,
    /// One simple-key candidate per flow level (+1 for the block context).
    simple_keys: Vec<SimpleKey>,
    /// The current indentation level. `-1` at the root.
    indent: isize,
    /// List of the previous indentation levels, innermost last.
    indents: Vec<isize>,
    /// Level of nesting of flow sequences and flow mappings.
    flow_level: usize,
    /// The number of tokens that have been returned from the scanner.
    tokens_parsed: usize,
    /// Whether a token is ready to be taken from [`Self::tokens`].
    token_available: bool,
    /// Comments captured since the last call to [`Self::unfold_comments`].
    #[cfg(feature = "comments")]
    comments: Vec<Comment>,
    /// The line on which the most recent token started. `0` before any token.
    #[cfg(feature = "comments")]
    last_token_line: usize,
}

impl<T: Input> Iterator for Scanner<T> {
    type Item = ScanResult<Token>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_token().transpose()
    }
}

impl<T: Input> Scanner<T> {
    /// Create a new [`Scanner`] with the given input and the default [`Limits`].
    pub fn new(input: T) -> Scanner<T> {
        Self::new_with_limits(input, Limits::default())
    }

    /// Create a new [`Scanner`] with the given input and limits.
    pub fn new_with_limits(input: T, limits: Limits) -> Scanner<T> {
        Scanner {
            input,
            mark: Marker::new(0, 1, 0),
            limits,
            depth: 0,
            tokens: VecDeque::new(),
            stream_start_produced: false,
            stream_end_produced: false,
            adjacent_value_allowed_at: usize::MAX,
            simple_key_allowed: true,
            simple_keys: vec![SimpleKey::default()],
            indent: -1,
            indents: Vec::new(),
            flow_level: 0,
            tokens_parsed: 0,
            token_available: false,
            #[cfg(feature = "comments")]
            comments: Vec::new(),
            #[cfg(feature = "comments")]
            last_token_line: 0,
        }
    }

    /// Return the current position in the input.
    #[must_use]
    pub fn mark(&self) -> Marker {
        self.mark
    }

    /// Return the limits this scanner was built with.
    #[must_use]
    pub fn limits(&self) -> Limits {
        self.limits
    }

    /// Drain the comments buffered since the last call.
    ///
    /// Comments are reported at most once. With the `comments` feature disabled, comment text is
    /// discarded while scanning and this function does not exist.
    #[cfg(feature = "comments")]
    pub fn unfold_comments(&mut self) -> Vec<Comment> {
        std::mem::take(&mut self.comments)
    }

    /// Fetch the next token, scanning more of the input if required.
    ///
    /// # Errors
    /// Returns an error if the input is malformed. Errors are fatal: the scanner will not produce
    /// further tokens for this stream.
    pub fn next_token(&mut self) -> ScanResult<Option<Token>> {
        if self.stream_end_produced {
            return Ok(None);
        }

        if !self.token_available {
            self.fetch_more_tokens()?;
        }
        let Some(t) = self.tokens.pop_front() else {
            return Ok(None);
        };
        self.token_available = false;
        self.tokens_parsed += 1;

        if t.kind == TokenType::StreamEnd {
            self.stream_end_produced = true;
        }

        Ok(Some(t))
    }

    /// Fill `self.tokens` until the front token can safely be returned.
    ///
    /// A queued token cannot be returned while a simple-key candidate may still retro-emit a
    /// `Key` in front of it.
    fn fetch_more_tokens(&mut self) -> ScanResult {
        loop {
            let mut need_more = false;
            if self.tokens.is_empty() {
                need_more = true;
            } else {
                self.stale_simple_keys()?;
                for sk in &self.simple_keys {
                    if sk.possible && sk.token_number == self.tokens_parsed {
                        need_more = true;
                        break;
                    }
                }
            }

            if !need_more {
                break;
            }
            self.fetch_next_token()?;
        }
        self.token_available = true;

        Ok(())
    }

    /// Scan one more token from the input into the queue.
    fn fetch_next_token(&mut self) -> ScanResult {
        self.input.lookahead(1);

        if !self.stream_start_produced {
            self.fetch_stream_start();
            return Ok(());
        }
        self.skip_to_next_token()?;

        self.stale_simple_keys()?;

        let mark = self.mark;
        self.unroll_indent(mark.col as isize);

        self.input.lookahead(4);

        if is_z(self.input.peek()) {
            self.fetch_stream_end();
            return Ok(());
        }

        #[cfg(feature = "comments")]
        {
            self.last_token_line = self.mark.line;
        }

        // Is it a directive?
        if mark.col == 0 && self.input.next_char_is('%') {
            return self.fetch_directive();
        }

        if mark.col == 0 && self.input.next_is_document_start() && self.flow_level == 0 {
            return self.fetch_document_indicator(TokenType::DocumentStart);
        }
        if mark.col == 0 && self.input.next_is_document_end() && self.flow_level == 0 {
            return self.fetch_document_indicator(TokenType::DocumentEnd);
        }

        let c = self.input.peek();
        let nc = self.input.peek_nth(1);
        match c {
            '[' => self.fetch_flow_collection_start(TokenType::FlowSequenceStart),
            '{' => self.fetch_flow_collection_start(TokenType::FlowMappingStart),
            ']' => self.fetch_flow_collection_end(TokenType::FlowSequenceEnd),
            '}' => self.fetch_flow_collection_end(TokenType::FlowMappingEnd),
            ',' => self.fetch_flow_entry(),
            '-' if is_blank_or_breakz(nc) => self.fetch_block_entry(),
            '?' if is_blank_or_breakz(nc) || self.flow_level > 0 => self.fetch_key(),
            ':' if is_blank_or_breakz(nc)
                || (self.flow_level > 0
                    && (is_flow(nc) || self.mark.index == self.adjacent_value_allowed_at)) =>
            {
                self.fetch_value()
            }
            '*' => self.fetch_anchor(true),
            '&' => self.fetch_anchor(false),
            '!' => self.fetch_tag(),
            '|' if self.flow_level == 0 => self.fetch_block_scalar(true),
            '>' if self.flow_level == 0 => self.fetch_block_scalar(false),
            '\'' => self.fetch_flow_scalar(true),
            '"' => self.fetch_flow_scalar(false),
            _ => self.fetch_plain_scalar(),
        }
    }

    /// Skip over whitespace, line breaks and comments until the start of the next token.
    fn skip_to_next_token(&mut self) -> ScanResult {
        loop {
            match self.input.look_ch() {
                ' ' | '\t' => self.skip_blank(),
                '\u{FEFF}' if self.mark.index == 0 => {
                    // A BOM at the very start of the stream may be left over by a caller that
                    // decoded the input without stripping it.
                    self.skip_non_break();
                }
                '#' => self.scan_comment()?,
                c if is_break(c) => {
                    self.input.lookahead(2);
                    self.skip_break();
                    if self.flow_level == 0 {
                        self.simple_key_allowed = true;
                    }
                    #[cfg(feature = "comments")]
                    self.reclassify_foot_comments();
                }
                _ => break,
            }
        }
        Ok(())
    }

    /// Consume a comment up to (not including) the line break.
    ///
    /// With the `comments` feature, the text is captured and classified; otherwise it is
    /// discarded.
    fn scan_comment(&mut self) -> ScanResult {
        #[cfg(feature = "comments")]
        let start = self.mark;
        #[cfg(feature = "comments")]
        let mut text = String::new();

        // Consume the '#'.
        self.skip_non_break();
        while !is_breakz(self.input.look_ch()) {
            #[cfg(feature = "comments")]
            text.push(self.input.peek());
            self.skip_non_break();
        }

        #[cfg(feature = "comments")]
        {
            let kind = if self.last_token_line == start.line {
                CommentKind::Line
            } else {
                CommentKind::Head
            };
            self.comments.push(Comment {
                kind,
                text: text.trim().to_owned(),
                span: Span::new(start, self.mark),
            });
        }
        Ok(())
    }

    /// Turn trailing head comments into foot comments when a blank line follows them.
    ///
    /// Called after consuming a line break: if the next line is blank (or the stream ends) and a
    /// token was already produced, the comment block that just ended belongs to the preceding
    /// construct, not the next one.
    #[cfg(feature = "comments")]
    fn reclassify_foot_comments(&mut self) {
        if self.last_token_line == 0 || !matches!(self.input.look_ch(), '\r' | '\n' | '\0') {
            return;
        }
        for comment in self.comments.iter_mut().rev() {
            if comment.kind == CommentKind::Head && comment.span.start.line > self.last_token_line
            {
                comment.kind = CommentKind::Foot;
            } else {
                break;
            }
        }
    }

    /// Expire simple-key candidates that can no longer become keys.
    ///
    /// A simple key must be on a single line and within 1024 characters of the position where its
    /// `:` would appear.
    fn stale_simple_keys(&mut self) -> ScanResult {
        for sk in &mut self.simple_keys {
            if sk.possible
                && (sk.mark.line < self.mark.line || sk.mark.index + 1024 < self.mark.index)
            {
                if sk.required {
                    return Err(ScanError::new_str(
                        self.mark,
                        "while scanning a simple key, could not find expected ':'",
                    ));
                }
                sk.possible = false;
            }
        }
        Ok(())
    }

    fn fetch_stream_start(&mut self) {
        let mark = self.mark;
        self.indent = -1;
        self.stream_start_produced = true;
        self.simple_key_allowed = true;
        self.tokens
            .push_back(Token::new(Span::empty(mark), TokenType::StreamStart));
    }

    fn fetch_stream_end(&mut self) {
        // Force new line.
        if self.mark.col != 0 {
            self.mark.col = 0;
            self.mark.line += 1;
        }

        // If the stream ended, we won't have more context. We can stale all the simple keys we
        // had.
        for sk in &mut self.simple_keys {
            sk.possible = false;
        }

        self.unroll_indent(-1);
        self.remove_simple_key_unchecked();
        self.simple_key_allowed = false;
        self.tokens
            .push_back(Token::new(Span::empty(self.mark), TokenType::StreamEnd));
    }

    fn fetch_directive(&mut self) -> ScanResult {
        self.unroll_indent(-1);
        self.remove_simple_key()?;
        self.simple_key_allowed = false;

        let tok = self.scan_directive()?;
        self.tokens.push_back(tok);

        Ok(())
    }

    fn scan_directive(&mut self) -> ScanResult<Token> {
        let start_mark = self.mark;
        // Consume the '%'.
        self.skip_non_break();

        let name = self.scan_directive_name()?;
        let tok = match name.as_ref() {
            "YAML" => self.scan_version_directive_value(&start_mark)?,
            "TAG" => self.scan_tag_directive_value(&start_mark)?,
            _ => {
                return Err(ScanError::new_str(
                    start_mark,
                    "while scanning a directive, found unknown directive name",
                ))
            }
        };

        self.skip_ws_to_eol(SkipTabs::Yes, true)?;

        if is_breakz(self.input.peek()) {
            self.input.lookahead(2);
            self.skip_break();
            Ok(tok)
        } else {
            Err(ScanError::new_str(
                start_mark,
                "while scanning a directive, did not find expected comment or line break",
            ))
        }
    }

    fn scan_directive_name(&mut self) -> ScanResult<String> {
        let start_mark = self.mark;
        let mut string = String::new();
        while is_alpha(self.input.look_ch()) {
            string.push(self.input.peek());
            self.skip_non_break();
        }

        if string.is_empty() {
            return Err(ScanError::new_str(
                start_mark,
                "while scanning a directive, could not find expected directive name",
            ));
        }

        if !is_blank_or_breakz(self.input.peek()) {
            return Err(ScanError::new_str(
                start_mark,
                "while scanning a directive, found unexpected non-alphabetical character",
            ));
        }

        Ok(string)
    }

    fn scan_version_directive_value(&mut self, mark: &Marker) -> ScanResult<Token> {
        while is_blank(self.input.look_ch()) {
            self.skip_blank();
        }

        let major = self.scan_version_directive_number(mark)?;

        if self.input.peek() != '.' {
            return Err(ScanError::new_str(
                *mark,
                "while scanning a YAML directive, did not find expected digit or '.' character",
            ));
        }
        self.skip_non_break();

        let minor = self.scan_version_directive_number(mark)?;

        Ok(Token::new(
            Span::new(*mark, self.mark),
            TokenType::VersionDirective(major, minor),
        ))
    }

    fn scan_version_directive_number(&mut self, mark: &Marker) -> ScanResult<u32> {
        let mut val = 0u32;
        let mut length = 0usize;
        while let Some(digit) = self.input.look_ch().to_digit(10) {
            if length + 1 > 9 {
                return Err(ScanError::new_str(
                    *mark,
                    "while scanning a YAML directive, found extremely long version number",
                ));
            }
            length += 1;
            val = val * 10 + digit;
            self.skip_non_break();
        }

        if length == 0 {
            return Err(ScanError::new_str(
                *mark,
                "while scanning a YAML directive, did not find expected version number",
            ));
        }

        Ok(val)
    }

    fn scan_tag_directive_value(&mut self, mark: &Marker) -> ScanResult<Token> {
        while is_blank(self.input.look_ch()) {
            self.skip_blank();
        }
        let handle = self.scan_tag_handle(true, mark)?;
        while is_blank(self.input.look_ch()) {
            self.skip_blank();
        }
        let prefix = self.scan_tag_prefix(mark)?;

        self.input.lookahead(1);
        if is_blank_or_breakz(self.input.peek()) {
            Ok(Token::new(
                Span::new(*mark, self.mark),
                TokenType::TagDirective(handle, prefix),
            ))
        } else {
            Err(ScanError::new_str(
                *mark,
                "while scanning a TAG directive, did not find expected whitespace or line break",
            ))
        }
    }

    fn fetch_tag(&mut self) -> ScanResult {
        self.save_simple_key();
        self.simple_key_allowed = false;

        let tok = self.scan_tag()?;
        self.tokens.push_back(tok);
        Ok(())
    }

    fn scan_tag(&mut self) -> ScanResult<Token> {
        let start_mark = self.mark;
        let mut handle = String::new();
        let mut suffix;

        // Check if the tag is in the canonical form (verbatim).
        self.input.lookahead(2);

        if self.input.nth_char_is(1, '<') {
            // Consume `!<`.
            self.skip_non_break();
            self.skip_non_break();
            suffix = self.scan_tag_uri(false, "", &start_mark)?;

            if self.input.peek() != '>' {
                return Err(ScanError::new_str(
                    start_mark,
                    "while scanning a tag, did not find the expected '>'",
                ));
            }
            self.skip_non_break();
        } else {
            // The tag has either the prefix '!!' or the prefix '!' followed by a suffix.
            handle = self.scan_tag_handle(false, &start_mark)?;
            // Check if it is, indeed, handled.
            if handle.len() >= 2 && handle.starts_with('!') && handle.ends_with('!') {
                suffix = self.scan_tag_uri(true, "", &start_mark)?;
            } else {
                suffix = self.scan_tag_uri(false, &handle, &start_mark)?;
                handle = "!".to_owned();
                // A special case: the '!' tag.  Set the handle to '' and the suffix to '!'.
                if suffix.is_empty() {
                    handle.clear();
                    suffix = "!".to_owned();
                }
            }
        }

        self.input.lookahead(1);
        if is_blank_or_breakz(self.input.peek())
            || (self.flow_level > 0 && is_flow(self.input.peek()))
        {
            Ok(Token::new(
                Span::new(start_mark, self.mark),
                TokenType::Tag(handle, suffix),
            ))
        } else {
            Err(ScanError::new_str(
                start_mark,
                "while scanning a tag, did not find expected whitespace or line break",
            ))
        }
    }

    fn scan_tag_handle(&mut self, directive: bool, mark: &Marker) -> ScanResult<String> {
        let mut string = String::new();
        if self.input.look_ch() != '!' {
            return Err(ScanError::new_str(
                *mark,
                "while scanning a tag, did not find expected '!'",
            ));
        }

        string.push(self.input.peek());
        self.skip_non_break();

        while is_alpha(self.input.look_ch()) {
            string.push(self.input.peek());
            self.skip_non_break();
        }

        // Check if the trailing character is '!' and copy it.
        if self.input.peek() == '!' {
            string.push(self.input.peek());
            self.skip_non_break();
        } else if directive && string != "!" {
            // It's either the '!' tag or not really a tag handle.  If it's a %TAG directive, it's
            // an error.  If it's a tag token, it must be a part of URI.
            return Err(ScanError::new_str(
                *mark,
                "while parsing a tag directive, did not find expected '!'",
            ));
        }
        Ok(string)
    }

    fn scan_tag_prefix(&mut self, start_mark: &Marker) -> ScanResult<String> {
        let mut string = String::new();

        if self.input.look_ch() == '!' {
            // If we have a local tag, insert and skip `!`.
            string.push(self.input.peek());
            self.skip_non_break();
        }

        while is_uri_char(self.input.look_ch()) {
            if self.input.peek() == '%' {
                string.push(self.scan_uri_escapes(start_mark)?);
            } else {
                string.push(self.input.peek());
                self.skip_non_break();
            }
        }

        if string.is_empty() {
            return Err(ScanError::new_str(
                *start_mark,
                "while parsing a tag directive, did not find a prefix",
            ));
        }

        Ok(string)
    }

    fn scan_tag_uri(&mut self, tag_char_only: bool, head: &str, mark: &Marker) -> ScanResult<String> {
        let mut string = String::new();

        // Copy the head if needed. Note that we don't copy the leading '!' character.
        if head.len() > 1 {
            string.extend(head.chars().skip(1));
        }

        loop {
            self.input.lookahead(1);
            let c = self.input.peek();
            let valid = if tag_char_only {
                is_tag_char(c)
            } else {
                is_uri_char(c)
            };
            if !valid {
                break;
            }
            if c == '%' {
                string.push(self.scan_uri_escapes(mark)?);
            } else {
                string.push(c);
                self.skip_non_break();
            }
        }

        Ok(string)
    }

    /// Decode a percent-escape (`%XX`) in a tag URI.
    ///
    /// Multi-byte UTF-8 sequences are assembled from consecutive escapes.
    fn scan_uri_escapes(&mut self, mark: &Marker) -> ScanResult<char> {
        let mut bytes = Vec::with_capacity(4);
        loop {
            self.input.lookahead(3);
            if !(self.input.peek() == '%'
                && is_hex(self.input.peek_nth(1))
                && is_hex(self.input.peek_nth(2)))
            {
                break;
            }
            let byte = (as_hex(self.input.peek_nth(1)) << 4) + as_hex(self.input.peek_nth(2));
            bytes.push(byte as u8);
            self.skip_non_break();
            self.skip_non_break();
            self.skip_non_break();
            match std::str::from_utf8(&bytes) {
                Ok(s) => {
                    if let Some(c) = s.chars().next() {
                        return Ok(c);
                    }
                }
                Err(_) if bytes.len() < 4 => {}
                Err(_) => break,
            }
        }
        Err(ScanError::new_str(
            *mark,
            "while parsing a tag, found an invalid UTF-8 sequence in a URI escape",
        ))
    }

    fn fetch_anchor(&mut self, alias: bool) -> ScanResult {
        self.save_simple_key();
        self.simple_key_allowed = false;

        let tok = self.scan_anchor(alias)?;
        self.tokens.push_back(tok);
        Ok(())
    }

    fn scan_anchor(&mut self, alias: bool) -> ScanResult<Token> {
        let mut string = String::new();
        let start_mark = self.mark;

        // Consume the '&' or '*'.
        self.skip_non_break();
        while is_anchor_char(self.input.look_ch()) {
            string.push(self.input.peek());
            self.skip_non_break();
        }

        if string.is_empty() {
            return Err(ScanError::new_str(
                start_mark,
                "while scanning an anchor or alias, did not find expected alphabetic or numeric character",
            ));
        }

        let tok = if alias {
            TokenType::Alias(string)
        } else {
            TokenType::Anchor(string)
        };
        Ok(Token::new(Span::new(start_mark, self.mark), tok))
    }

    fn fetch_flow_collection_start(&mut self, tok: TokenType) -> ScanResult {
        // The indicators '[' and '{' may start a simple key.
        self.save_simple_key();

        self.increase_flow_level()?;

        // A simple key may follow the indicators '[' and '{'.
        self.simple_key_allowed = true;

        let start_mark = self.mark;
        self.skip_non_break();

        self.tokens
            .push_back(Token::new(Span::new(start_mark, self.mark), tok));
        Ok(())
    }

    fn fetch_flow_collection_end(&mut self, tok: TokenType) -> ScanResult {
        self.remove_simple_key()?;
        self.decrease_flow_level();

        self.simple_key_allowed = false;

        let start_mark = self.mark;
        self.skip_non_break();

        self.tokens
            .push_back(Token::new(Span::new(start_mark, self.mark), tok));
        Ok(())
    }

    fn fetch_flow_entry(&mut self) -> ScanResult {
        self.remove_simple_key()?;
        self.simple_key_allowed = true;

        let start_mark = self.mark;
        self.skip_non_break();

        self.tokens.push_back(Token::new(
            Span::new(start_mark, self.mark),
            TokenType::FlowEntry,
        ));
        Ok(())
    }

    fn fetch_block_entry(&mut self) -> ScanResult {
        if self.flow_level > 0 {
            return Err(ScanError::new_str(
                self.mark,
                "block sequence entries are not allowed in this context",
            ));
        }

        if !self.simple_key_allowed {
            return Err(ScanError::new_str(
                self.mark,
                "block sequence entries are not allowed in this context",
            ));
        }

        let mark = self.mark;
        self.roll_indent(mark.col, None, TokenType::BlockSequenceStart, mark)?;

        self.remove_simple_key()?;
        self.simple_key_allowed = true;

        self.skip_non_break();

        self.tokens.push_back(Token::new(
            Span::new(mark, self.mark),
            TokenType::BlockEntry,
        ));
        Ok(())
    }

    fn fetch_document_indicator(&mut self, t: TokenType) -> ScanResult {
        self.unroll_indent(-1);
        self.remove_simple_key()?;
        self.simple_key_allowed = false;

        let mark = self.mark;

        self.skip_non_break();
        self.skip_non_break();
        self.skip_non_break();

        self.tokens.push_back(Token::new(Span::new(mark, self.mark), t));
        Ok(())
    }

    fn fetch_key(&mut self) -> ScanResult {
        let start_mark = self.mark;
        if self.flow_level == 0 {
            // Check if we are allowed to start a new key (not necessarily simple).
            if !self.simple_key_allowed {
                return Err(ScanError::new_str(
                    self.mark,
                    "mapping keys are not allowed in this context",
                ));
            }
            self.roll_indent(
                start_mark.col,
                None,
                TokenType::BlockMappingStart,
                start_mark,
            )?;
        }

        self.remove_simple_key()?;

        if self.flow_level == 0 {
            self.simple_key_allowed = true;
        } else {
            self.simple_key_allowed = false;
        }

        self.skip_non_break();
        self.tokens
            .push_back(Token::new(Span::new(start_mark, self.mark), TokenType::Key));
        Ok(())
    }

    fn fetch_value(&mut self) -> ScanResult {
        let sk = self.simple_keys.last().copied().unwrap_or_default();
        let start_mark = self.mark;

        if sk.possible {
            // Insert a `Key` token in front of the token the candidate started with.
            let tok = Token::new(Span::empty(sk.mark), TokenType::Key);
            self.insert_token(sk.token_number - self.tokens_parsed, tok);

            // In the block context, we may need to add the BlockMappingStart token.
            self.roll_indent(
                sk.mark.col,
                Some(sk.token_number),
                TokenType::BlockMappingStart,
                sk.mark,
            )?;

            self.simple_keys.last_mut().unwrap().possible = false;
            self.simple_key_allowed = false;
        } else {
            if self.flow_level == 0 {
                if !self.simple_key_allowed {
                    return Err(ScanError::new_str(
                        start_mark,
                        "mapping values are not allowed in this context",
                    ));
                }

                self.roll_indent(
                    start_mark.col,
                    None,
                    TokenType::BlockMappingStart,
                    start_mark,
                )?;
            }

            self.simple_key_allowed = self.flow_level == 0;
        }

        self.skip_non_break();
        self.tokens.push_back(Token::new(
            Span::new(start_mark, self.mark),
            TokenType::Value,
        ));

        Ok(())
    }

    fn fetch_block_scalar(&mut self, literal: bool) -> ScanResult {
        self.remove_simple_key()?;
        self.simple_key_allowed = true;

        let tok = self.scan_block_scalar(literal)?;
        self.tokens.push_back(tok);
        Ok(())
    }

    #[allow(clippy::too_many_lines)]
    fn scan_block_scalar(&mut self, literal: bool) -> ScanResult<Token> {
        let start_mark = self.mark;
        let mut chomping = Chomping::Clip;
        let mut increment: usize = 0;
        let mut indent: usize = 0;

        let mut trailing_breaks = String::new();
        let mut leading_break = String::new();
        let mut string = String::new();

        // Consume the block scalar indicator ('|' or '>').
        self.skip_non_break();

        // Check for a chomping indicator and/or an indentation indicator.
        self.input.lookahead(2);
        match self.input.peek() {
            '+' | '-' => {
                chomping = if self.input.peek() == '+' {
                    Chomping::Keep
                } else {
                    Chomping::Strip
                };
                self.skip_non_break();
                if is_digit(self.input.look_ch()) {
                    if self.input.peek() == '0' {
                        return Err(ScanError::new_str(
                            start_mark,
                            "while scanning a block scalar, found an indentation indicator equal to 0",
                        ));
                    }
                    increment = (self.input.peek() as usize) - ('0' as usize);
                    self.skip_non_break();
                }
            }
            c if is_digit(c) => {
                if c == '0' {
                    return Err(ScanError::new_str(
                        start_mark,
                        "while scanning a block scalar, found an indentation indicator equal to 0",
                    ));
                }
                increment = (c as usize) - ('0' as usize);
                self.skip_non_break();

                self.input.lookahead(1);
                if matches!(self.input.peek(), '+' | '-') {
                    chomping = if self.input.peek() == '+' {
                        Chomping::Keep
                    } else {
                        Chomping::Strip
                    };
                    self.skip_non_break();
                }
            }
            _ => {}
        }

        // Eat whitespace and comments to the end of the line.
        self.skip_ws_to_eol(SkipTabs::Yes, true)?;

        // Check if we are at the end of the line.
        self.input.lookahead(1);
        if !is_breakz(self.input.peek()) {
            return Err(ScanError::new_str(
                start_mark,
                "while scanning a block scalar, did not find expected comment or line break",
            ));
        }

        if is_break(self.input.peek()) {
            self.input.lookahead(2);
            self.skip_break();
        }

        if increment > 0 {
            indent = if self.indent >= 0 {
                (self.indent as usize) + increment
            } else {
                increment
            };
        }

        // Scan the leading line breaks and determine the indentation level if needed.
        self.block_scalar_breaks(&mut indent, &mut trailing_breaks, &start_mark)?;

        self.input.lookahead(1);

        let mut line_buffer = String::new();
        // Note that a leading blank on the first content line inhibits folding for the next one.
        let mut leading_blank = false;
        while self.mark.col == indent && !is_z(self.input.peek()) {
            // We are at the beginning of a non-empty line.
            let trailing_blank = is_blank(self.input.peek());
            if !literal && !leading_break.is_empty() && !leading_blank && !trailing_blank {
                if trailing_breaks.is_empty() {
                    string.push(' ');
                }
            } else {
                string.push_str(&leading_break);
            }
            string.push_str(&trailing_breaks);
            leading_break.clear();
            trailing_breaks.clear();

            leading_blank = is_blank(self.input.peek());

            while !is_breakz(self.input.look_ch()) {
                line_buffer.push(self.input.peek());
                self.skip_non_break();
            }
            string.push_str(&line_buffer);
            line_buffer.clear();

            // break on EOF
            self.input.lookahead(2);
            if is_z(self.input.peek()) {
                break;
            }

            self.read_break(&mut leading_break);

            // Eat the following indentation spaces and line breaks.
            self.block_scalar_breaks(&mut indent, &mut trailing_breaks, &start_mark)?;
        }

        // Chomp the tail.
        if chomping != Chomping::Strip {
            string.push_str(&leading_break);
        }

        if chomping == Chomping::Keep {
            string.push_str(&trailing_breaks);
        }

        let style = if literal {
            ScalarStyle::Literal
        } else {
            ScalarStyle::Folded
        };
        Ok(Token::new(
            Span::new(start_mark, self.mark),
            TokenType::Scalar(style, string),
        ))
    }

    /// Consume indentation spaces and line breaks at the start of block scalar lines.
    ///
    /// If `indent` is 0, it is auto-detected as the maximum indentation of the leading blank
    /// lines, clamped below by one more than the enclosing block's indentation.
    fn block_scalar_breaks(
        &mut self,
        indent: &mut usize,
        breaks: &mut String,
        start_mark: &Marker,
    ) -> ScanResult {
        let mut max_indent = 0;
        loop {
            while (*indent == 0 || self.mark.col < *indent) && self.input.look_ch() == ' ' {
                self.skip_blank();
            }

            if self.mark.col > max_indent {
                max_indent = self.mark.col;
            }

            if (*indent == 0 || self.mark.col < *indent) && self.input.look_ch() == '\t' {
                return Err(ScanError::new_str(
                    *start_mark,
                    "while scanning a block scalar, found a tab character where an indentation space is expected",
                ));
            }

            if !is_break(self.input.peek()) {
                break;
            }

            self.input.lookahead(2);
            self.read_break(breaks);
        }

        if *indent == 0 {
            *indent = max_indent.max((self.indent + 1).max(1) as usize).max(1);
        }

        Ok(())
    }

    fn fetch_flow_scalar(&mut self, single: bool) -> ScanResult {
        self.save_simple_key();
        self.simple_key_allowed = false;

        let tok = self.scan_flow_scalar(single)?;

        // From the YAML 1.2 spec (7.2): in flow context, a `:` immediately following a quoted
        // scalar starts its value, without requiring a following space.
        self.adjacent_value_allowed_at = self.mark.index;

        self.tokens.push_back(tok);
        Ok(())
    }

    #[allow(clippy::too_many_lines)]
    fn scan_flow_scalar(&mut self, single: bool) -> ScanResult<Token> {
        let start_mark = self.mark;

        let mut string = String::new();
        let mut leading_break = String::new();
        let mut trailing_breaks = String::new();
        let mut whitespaces = String::new();
        let mut leading_blanks;

        // Eat the left quote.
        self.skip_non_break();

        loop {
            // Check for a document indicator.
            self.input.lookahead(4);

            if self.mark.col == 0 && self.input.next_is_document_indicator() {
                return Err(ScanError::new_str(
                    start_mark,
                    "while scanning a quoted scalar, found unexpected document indicator",
                ));
            }

            if is_z(self.input.peek()) {
                return Err(ScanError::new_str(
                    start_mark,
                    "while scanning a quoted scalar, found unexpected end of stream",
                ));
            }

            self.input.lookahead(2);
            leading_blanks = false;

            // Consume non-blank characters.
            while !is_blank_or_breakz(self.input.peek()) {
                match self.input.peek() {
                    // Check for an escaped single quote.
                    '\'' if self.input.peek_nth(1) == '\'' && single => {
                        string.push('\'');
                        self.skip_non_break();
                        self.skip_non_break();
                    }
                    // Check for the right quote.
                    '\'' if single => break,
                    '"' if !single => break,
                    // Check for an escaped line break.
                    '\\' if !single && is_break(self.input.peek_nth(1)) => {
                        self.input.lookahead(3);
                        self.skip_non_break();
                        self.skip_break();
                        leading_blanks = true;
                        break;
                    }
                    // Check for an escape sequence.
                    '\\' if !single => {
                        string.push(self.resolve_flow_scalar_escape_sequence(&start_mark)?);
                    }
                    c => {
                        string.push(c);
                        self.skip_non_break();
                    }
                }
                self.input.lookahead(2);
            }

            // Check if we are at the end of the scalar.
            if self.input.peek() == if single { '\'' } else { '"' } {
                break;
            }

            // Consume blank characters.
            self.input.lookahead(1);
            while is_blank(self.input.peek()) || is_break(self.input.peek()) {
                if is_blank(self.input.peek()) {
                    // Consume a space or a tab character.
                    if leading_blanks {
                        self.skip_blank();
                    } else {
                        whitespaces.push(self.input.peek());
                        self.skip_blank();
                    }
                } else {
                    self.input.lookahead(2);
                    // Check if it is a first line break.
                    if leading_blanks {
                        self.read_break(&mut trailing_breaks);
                    } else {
                        whitespaces.clear();
                        self.read_break(&mut leading_break);
                        leading_blanks = true;
                    }
                }
                self.input.lookahead(1);
            }

            // Join the whitespaces or fold line breaks.
            if leading_blanks {
                if leading_break.is_empty() {
                    string.push_str(&leading_break);
                    string.push_str(&trailing_breaks);
                    trailing_breaks.clear();
                    leading_break.clear();
                } else {
                    if trailing_breaks.is_empty() {
                        string.push(' ');
                    } else {
                        string.push_str(&trailing_breaks);
                        trailing_breaks.clear();
                    }
                    leading_break.clear();
                }
            } else {
                string.push_str(&whitespaces);
                whitespaces.clear();
            }
        }

        // Eat the right quote.
        self.skip_non_break();

        let style = if single {
            ScalarStyle::SingleQuoted
        } else {
            ScalarStyle::DoubleQuoted
        };
        Ok(Token::new(
            Span::new(start_mark, self.mark),
            TokenType::Scalar(style, string),
        ))
    }

    /// Escape the sequence we encounter in a flow scalar.
    ///
    /// The input must be positioned on the `\`. The `\` and the escape sequence are consumed.
    fn resolve_flow_scalar_escape_sequence(&mut self, start_mark: &Marker) -> ScanResult<char> {
        let mut code_length = 0usize;
        let mut ret = '\0';

        self.input.lookahead(2);
        match self.input.peek_nth(1) {
            '0' => ret = '\0',
            'a' => ret = '\x07',
            'b' => ret = '\x08',
            't' | '\t' => ret = '\t',
            'n' => ret = '\n',
            'v' => ret = '\x0b',
            'f' => ret = '\x0c',
            'r' => ret = '\x0d',
            'e' => ret = '\x1b',
            ' ' => ret = '\x20',
            '"' => ret = '"',
            '/' => ret = '/',
            '\\' => ret = '\\',
            // Unicode next line (#x85)
            'N' => ret = char::from_u32(0x85).unwrap(),
            // Unicode non-breaking space (#xA0)
            '_' => ret = char::from_u32(0xA0).unwrap(),
            // Unicode line separator (#x2028)
            'L' => ret = char::from_u32(0x2028).unwrap(),
            // Unicode paragraph separator (#x2029)
            'P' => ret = char::from_u32(0x2029).unwrap(),
            'x' => code_length = 2,
            'u' => code_length = 4,
            'U' => code_length = 8,
            _ => {
                return Err(ScanError::new_str(
                    *start_mark,
                    "while parsing a quoted scalar, found unknown escape character",
                ))
            }
        }
        self.skip_non_break();
        self.skip_non_break();

        // Consume an arbitrary escape code.
        if code_length > 0 {
            self.input.lookahead(code_length);
            let mut value = 0u32;
            for i in 0..code_length {
                let c = self.input.peek_nth(i);
                if !is_hex(c) {
                    return Err(ScanError::new_str(
                        *start_mark,
                        "while parsing a quoted scalar, did not find expected hexadecimal number",
                    ));
                }
                value = (value << 4) + as_hex(c);
            }

            let Some(ch) = char::from_u32(value) else {
                return Err(ScanError::new_str(
                    *start_mark,
                    "while parsing a quoted scalar, found invalid Unicode character escape code",
                ));
            };
            ret = ch;

            for _ in 0..code_length {
                self.skip_non_break();
            }
        }
        Ok(ret)
    }

    fn fetch_plain_scalar(&mut self) -> ScanResult {
        self.save_simple_key();
        self.simple_key_allowed = false;

        let tok = self.scan_plain_scalar()?;
        self.tokens.push_back(tok);
        Ok(())
    }

    /// Scan for a plain scalar.
    ///
    /// Plain scalars are the most readable but restricted style. They may span multiple lines in
    /// some contexts.
    #[allow(clippy::too_many_lines)]
    fn scan_plain_scalar(&mut self) -> ScanResult<Token> {
        let indent = self.indent + 1;
        let start_mark = self.mark;
        let mut end_mark = self.mark;

        let mut string = String::new();
        let mut leading_break = String::new();
        let mut trailing_breaks = String::new();
        let mut whitespaces = String::new();
        let mut leading_blanks = false;

        loop {
            // Check for a document indicator.
            self.input.lookahead(4);

            if self.mark.col == 0 && self.input.next_is_document_indicator() {
                break;
            }

            if self.input.peek() == '#' {
                break;
            }

            // Consume non-blank characters.
            while !is_blank_or_breakz(self.input.peek()) {
                // Check for indicators that end a plain scalar.
                if !self.input.next_can_be_plain_scalar(self.flow_level > 0) {
                    break;
                }

                // Join pending whitespace or folded breaks before appending content.
                if leading_blanks || !whitespaces.is_empty() {
                    if leading_blanks {
                        if leading_break.is_empty() {
                            string.push_str(&leading_break);
                            string.push_str(&trailing_breaks);
                            trailing_breaks.clear();
                            leading_break.clear();
                        } else {
                            if trailing_breaks.is_empty() {
                                string.push(' ');
                            } else {
                                string.push_str(&trailing_breaks);
                                trailing_breaks.clear();
                            }
                            leading_break.clear();
                        }
                        leading_blanks = false;
                    } else {
                        string.push_str(&whitespaces);
                        whitespaces.clear();
                    }
                }

                string.push(self.input.peek());
                self.skip_non_break();
                self.input.lookahead(2);
            }

            // The scalar ends at the last content character, before any trailing blanks.
            end_mark = self.mark;

            // We may reach the end of a plain scalar if:
            //  - We reach eof
            //  - We reach ": "
            //  - We find a flow character in a flow context
            if !(is_blank(self.input.peek()) || is_break(self.input.peek())) {
                break;
            }

            // Consume blank characters.
            self.input.lookahead(1);
            while is_blank(self.input.peek()) || is_break(self.input.peek()) {
                if is_blank(self.input.peek()) {
                    if leading_blanks && (self.mark.col as isize) < indent
                        && self.input.peek() == '\t'
                    {
                        return Err(ScanError::new_str(
                            start_mark,
                            "while scanning a plain scalar, found a tab character that violates indentation",
                        ));
                    }

                    if leading_blanks {
                        self.skip_blank();
                    } else {
                        whitespaces.push(self.input.peek());
                        self.skip_blank();
                    }
                } else {
                    self.input.lookahead(2);
                    // Check if it is a first line break
                    if leading_blanks {
                        self.read_break(&mut trailing_breaks);
                    } else {
                        whitespaces.clear();
                        self.read_break(&mut leading_break);
                        leading_blanks = true;
                    }
                }
                self.input.lookahead(1);
            }

            // check indentation level
            if self.flow_level == 0 && (self.mark.col as isize) < indent {
                break;
            }
        }

        if leading_blanks {
            self.simple_key_allowed = true;
        }

        Ok(Token::new(
            Span::new(start_mark, end_mark),
            TokenType::Scalar(ScalarStyle::Plain, string),
        ))
    }

    fn increase_flow_level(&mut self) -> ScanResult {
        self.simple_keys.push(SimpleKey::new(Marker::new(0, 1, 0)));
        self.flow_level += 1;
        self.bump_depth()
    }

    fn decrease_flow_level(&mut self) {
        if self.flow_level > 0 {
            self.flow_level -= 1;
            self.simple_keys.pop().unwrap();
            self.depth = self.depth.saturating_sub(1);
        }
    }

    /// Increment the structural depth and check it against the configured limit.
    fn bump_depth(&mut self) -> ScanResult {
        self.depth += 1;
        if self.depth > self.limits.max_depth {
            Err(ScanError::new_str(self.mark, "exceeded max depth"))
        } else {
            Ok(())
        }
    }

    /// Mark the current position as a simple-key candidate for the current level.
    fn save_simple_key(&mut self) {
        if self.simple_key_allowed {
            let required = self.flow_level == 0 && self.indent == (self.mark.col as isize);
            let mut sk = SimpleKey::new(self.mark);
            sk.possible = true;
            sk.required = required;
            sk.token_number = self.tokens_parsed + self.tokens.len();

            *self.simple_keys.last_mut().unwrap() = sk;
        }
    }

    fn remove_simple_key(&mut self) -> ScanResult {
        let last = self.simple_keys.last_mut().unwrap();
        if last.possible && last.required {
            return Err(ScanError::new_str(
                self.mark,
                "while scanning a simple key, could not find expected ':'",
            ));
        }

        last.possible = false;
        Ok(())
    }

    fn remove_simple_key_unchecked(&mut self) {
        if let Some(last) = self.simple_keys.last_mut() {
            last.possible = false;
        }
    }

    /// Add an indentation level to the stack with the given block token, if needed.
    ///
    /// An indentation level is added only if the current indentation is lower than `col`, which
    /// means that this function does nothing in flow context.
    fn roll_indent(
        &mut self,
        col: usize,
        number: Option<usize>,
        tok: TokenType,
        mark: Marker,
    ) -> ScanResult {
        if self.flow_level > 0 {
            return Ok(());
        }

        if self.indent < col as isize {
            self.indents.push(self.indent);
            self.indent = col as isize;
            self.bump_depth()?;

            let tokens_parsed = self.tokens_parsed;
            match number {
                Some(n) => self.insert_token(n - tokens_parsed, Token::new(Span::empty(mark), tok)),
                None => self
                    .tokens
                    .push_back(Token::new(Span::empty(mark), tok)),
            }
        }
        Ok(())
    }

    /// Pop indentation levels from the stack as much as needed.
    ///
    /// Indentation levels are popped from the stack while they are higher than `col`. A `BlockEnd`
    /// token is queued for each of them, innermost first.
    fn unroll_indent(&mut self, col: isize) {
        if self.flow_level > 0 {
            return;
        }
        while self.indent > col {
            self.tokens
                .push_back(Token::new(Span::empty(self.mark), TokenType::BlockEnd));
            self.indent = self.indents.pop().unwrap_or(-1);
            self.depth = self.depth.saturating_sub(1);
        }
    }

    fn insert_token(&mut self, pos: usize, tok: Token) {
        self.tokens.insert(pos, tok);
    }

    /// Skip whitespace up to end of line, handling comments per the `comments` feature.
    fn skip_ws_to_eol(&mut self, skip_tabs: SkipTabs, comment_allowed: bool) -> ScanResult {
        match self.input.skip_ws_to_eol(skip_tabs) {
            Ok(skipped) => {
                self.mark.index += skipped.consumed;
                self.mark.col += skipped.consumed;
                if skipped.at_comment {
                    if !comment_allowed {
                        return Err(ScanError::new_str(
                            self.mark,
                            "comments are not allowed in this context",
                        ));
                    }
                    self.scan_comment()?;
                }
                Ok(())
            }
            Err(e) => {
                self.mark.index += e.consumed;
                self.mark.col += e.consumed;
                Err(ScanError::new_str(self.mark, e.message))
            }
        }
    }

    /// Consume one non-break character, advancing the mark.
    ///
    /// Unicode line separators (NEL, LS, PS) appearing as scalar content still increment
    /// the line count for position reporting.
    fn skip_non_break(&mut self) {
        let c = self.input.peek();
        self.input.skip();
        self.mark.index += 1;
        if crate::char_traits::is_any_break(c) {
            self.mark.line += 1;
            self.mark.col = 0;
        } else {
            self.mark.col += 1;
        }
    }

    /// Consume one blank character, advancing the mark.
    fn skip_blank(&mut self) {
        self.input.skip();
        self.mark.index += 1;
        self.mark.col += 1;
    }

    /// Consume a line break (CR, LF or CRLF), advancing the mark to the next line.
    ///
    /// The input must have 2 characters of lookahead.
    fn skip_break(&mut self) {
        let c = self.input.peek();
        let nc = self.input.peek_nth(1);
        if c == '\r' && nc == '\n' {
            self.input.skip_n(2);
            self.mark.index += 2;
        } else {
            self.input.skip();
            self.mark.index += 1;
        }
        self.mark.line += 1;
        self.mark.col = 0;
    }

    /// Consume a line break and push a normalized `\n` into `s`.
    ///
    /// The input must have 2 characters of lookahead.
    fn read_break(&mut self, s: &mut String) {
        self.skip_break();
        s.push('\n');
    }
}

/// Chomping, how final line breaks and trailing empty lines are interpreted.
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
enum Chomping {
    /// The final line break and any trailing empty lines are excluded.
    Strip,
    /// The final line break is preserved, but trailing empty lines are excluded.
    Clip,
    /// The final line break and trailing empty lines are included.
    Keep,
}

#[cfg(test)]
mod tests {
    use super::{ScalarStyle, Scanner, TokenType};
    use crate::input::StrInput;

    fn tokens(input: &str) -> Vec<TokenType> {
        let mut scanner = Scanner::new(StrInput::new(input));
        let mut out = vec![];
        while let Some(tok) = scanner.next_token().unwrap() {
            out.push(tok.kind);
        }
        out
    }

    #[test]
    fn simple_mapping() {
        assert_eq!(
            tokens("a: b"),
            [
                TokenType::StreamStart,
                TokenType::BlockMappingStart,
                TokenType::Key,
                TokenType::Scalar(ScalarStyle::Plain, "a".to_string()),
                TokenType::Value,
                TokenType::Scalar(ScalarStyle::Plain, "b".to_string()),
                TokenType::BlockEnd,
                TokenType::StreamEnd,
            ]
        );
    }

    #[test]
    fn flow_sequence() {
        assert_eq!(
            tokens("[1, 2]"),
            [
                TokenType::StreamStart,
                TokenType::FlowSequenceStart,
                TokenType::Scalar(ScalarStyle::Plain, "1".to_string()),
                TokenType::FlowEntry,
                TokenType::Scalar(ScalarStyle::Plain, "2".to_string()),
                TokenType::FlowSequenceEnd,
                TokenType::StreamEnd,
            ]
        );
    }

    #[test]
    fn block_end_tokens_pop_innermost_first() {
        assert_eq!(
            tokens("a:\n  b: c\n"),
            [
                TokenType::StreamStart,
                TokenType::BlockMappingStart,
                TokenType::Key,
                TokenType::Scalar(ScalarStyle::Plain, "a".to_string()),
                TokenType::Value,
                TokenType::BlockMappingStart,
                TokenType::Key,
                TokenType::Scalar(ScalarStyle::Plain, "b".to_string()),
                TokenType::Value,
                TokenType::Scalar(ScalarStyle::Plain, "c".to_string()),
                TokenType::BlockEnd,
                TokenType::BlockEnd,
                TokenType::StreamEnd,
            ]
        );
    }

    #[test]
    fn double_quoted_escapes() {
        assert_eq!(
            tokens(r#""a\tb\nc\u0041""#),
            [
                TokenType::StreamStart,
                TokenType::Scalar(ScalarStyle::DoubleQuoted, "a\tb\nc\u{41}".to_string()),
                TokenType::StreamEnd,
            ]
        );
    }

    #[test]
    fn literal_block_scalar_strips_final_break() {
        assert_eq!(
            tokens("|-\n  hello\n  world\n"),
            [
                TokenType::StreamStart,
                TokenType::Scalar(ScalarStyle::Literal, "hello\nworld".to_string()),
                TokenType::StreamEnd,
            ]
        );
    }

    #[test]
    fn block_scalar_keeps_trailing_breaks() {
        assert_eq!(
            tokens("|+\n  a\n\n\n"),
            [
                TokenType::StreamStart,
                TokenType::Scalar(ScalarStyle::Literal, "a\n\n\n".to_string()),
                TokenType::StreamEnd,
            ]
        );
    }

    #[test]
    fn folded_scalar_folds_breaks() {
        assert_eq!(
            tokens(">\n  a\n  b\n"),
            [
                TokenType::StreamStart,
                TokenType::Scalar(ScalarStyle::Folded, "a b\n".to_string()),
                TokenType::StreamEnd,
            ]
        );
    }

    #[test]
    fn max_depth_exceeded() {
        let limits = crate::Limits {
            max_depth: 10,
            ..crate::Limits::default()
        };
        let input = "[".repeat(11);
        let mut scanner = Scanner::new_with_limits(StrInput::new(&input), limits);
        let mut result = Ok(());
        while let Some(tok) = scanner.next_token().transpose() {
            if let Err(e) = tok {
                result = Err(e);
                break;
            }
        }
        let err = result.unwrap_err();
        assert_eq!(err.info(), "exceeded max depth");
    }

    #[test]
    fn max_depth_boundary_succeeds() {
        let limits = crate::Limits {
            max_depth: 10,
            ..crate::Limits::default()
        };
        let input = format!("{}{}", "[".repeat(10), "]".repeat(10));
        let mut scanner = Scanner::new_with_limits(StrInput::new(&input), limits);
        while let Some(tok) = scanner.next_token().transpose() {
            tok.unwrap();
        }
    }

    #[test]
    fn value_without_key_is_an_error() {
        let mut scanner = Scanner::new(StrInput::new("scalar\nkey: x\n"));
        let mut err = None;
        loop {
            match scanner.next_token() {
                Ok(Some(_)) => {}
                Ok(None) => break,
                Err(e) => {
                    err = Some(e);
                    break;
                }
            }
        }
        let err = err.expect("expected scan error");
        assert_eq!(err.info(), "mapping values are not allowed in this context");
    }

    #[cfg(feature = "comments")]
    #[test]
    fn comments_are_captured_once() {
        use super::CommentKind;

        let mut scanner = Scanner::new(StrInput::new("# head\na: b # trailing\n"));
        while let Some(tok) = scanner.next_token().unwrap() {
            let _ = tok;
        }
        let comments = scanner.unfold_comments();
        assert_eq!(comments.len(), 2);
        assert_eq!(comments[0].kind, CommentKind::Head);
        assert_eq!(comments[0].text, "head");
        assert_eq!(comments[1].kind, CommentKind::Line);
        assert_eq!(comments[1].text, "trailing");
        assert!(scanner.unfold_comments().is_empty());
    }
}
