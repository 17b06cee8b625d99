use crate::{char_traits::is_blank_or_breakz, input::Input};

/// An [`Input`] implementation over a fully loaded string.
///
/// Since the whole input is in memory, lookahead is free and the buffer is virtual.
#[allow(clippy::module_name_repetitions)]
pub struct StrInput<'a> {
    /// The input str buffer.
    buffer: &'a str,
    /// The number of characters we have been asked to look ahead.
    ///
    /// We have all characters at hand. We must however keep track of how many characters the
    /// scanner asked us for so that we can return the correct value in [`Self::buflen`].
    lookahead: usize,
}

impl<'a> StrInput<'a> {
    /// Create a new [`StrInput`] with the given str.
    #[must_use]
    pub fn new(input: &'a str) -> Self {
        Self {
            buffer: input,
            lookahead: 0,
        }
    }
}

impl<'a> Input for StrInput<'a> {
    #[inline]
    fn lookahead(&mut self, x: usize) {
        // We already have all characters that we need.
        // We cannot add '\0's to the buffer should we prematurely reach EOF.
        // Returning '\0's befalls the character-retrieving functions.
        self.lookahead = self.lookahead.max(x);
    }

    #[inline]
    fn buflen(&self) -> usize {
        self.lookahead
    }

    #[inline]
    fn bufmaxlen(&self) -> usize {
        BUFFER_LEN
    }

    fn buf_is_empty(&self) -> bool {
        self.buflen() == 0
    }

    #[inline]
    fn raw_read_ch(&mut self) -> char {
        let mut chars = self.buffer.chars();
        if let Some(c) = chars.next() {
            self.buffer = chars.as_str();
            c
        } else {
            '\0'
        }
    }

    #[inline]
    fn push_back(&mut self, c: char) {
        let n_bytes = c.len_utf8();

        // SAFETY: The character that gets pushed back is guaranteed to be the one that is
        // immediately preceding our buffer. We can compute the length of the character and move
        // our buffer back that many bytes.
        unsafe {
            let buffer_byte_len = self.buffer.len();
            let now_ptr = self.buffer.as_ptr().wrapping_sub(n_bytes);
            self.buffer = std::str::from_utf8_unchecked(std::slice::from_raw_parts(
                now_ptr,
                buffer_byte_len + n_bytes,
            ));
        }
    }

    #[inline]
    fn skip(&mut self) {
        let mut chars = self.buffer.chars();
        if chars.next().is_some() {
            self.buffer = chars.as_str();
        }
    }

    #[inline]
    fn skip_n(&mut self, count: usize) {
        let mut chars = self.buffer.chars();
        for _ in 0..count {
            if chars.next().is_none() {
                break;
            }
        }
        self.buffer = chars.as_str();
    }

    #[inline]
    fn peek(&self) -> char {
        self.buffer.chars().next().unwrap_or('\0')
    }

    #[inline]
    fn peek_nth(&self, n: usize) -> char {
        let mut chars = self.buffer.chars();
        for _ in 0..n {
            if chars.next().is_none() {
                return '\0';
            }
        }
        chars.next().unwrap_or('\0')
    }

    #[inline]
    fn look_ch(&mut self) -> char {
        self.lookahead(1);
        self.peek()
    }

    #[inline]
    fn next_char_is(&self, c: char) -> bool {
        self.peek() == c
    }

    #[inline]
    fn nth_char_is(&self, n: usize, c: char) -> bool {
        self.peek_nth(n) == c
    }

    #[inline]
    fn next_2_are(&self, c1: char, c2: char) -> bool {
        let mut chars = self.buffer.chars();
        chars.next().is_some_and(|c| c == c1) && chars.next().is_some_and(|c| c == c2)
    }

    #[inline]
    fn next_3_are(&self, c1: char, c2: char, c3: char) -> bool {
        let mut chars = self.buffer.chars();
        chars.next().is_some_and(|c| c == c1)
            && chars.next().is_some_and(|c| c == c2)
            && chars.next().is_some_and(|c| c == c3)
    }

    #[inline]
    fn next_is_document_indicator(&self) -> bool {
        self.starts_with_indicator("...") || self.starts_with_indicator("---")
    }

    #[inline]
    fn next_is_document_start(&self) -> bool {
        self.starts_with_indicator("---")
    }

    #[inline]
    fn next_is_document_end(&self) -> bool {
        self.starts_with_indicator("...")
    }
}

impl<'a> StrInput<'a> {
    /// Check whether the buffer starts with the given 3-character indicator followed by a
    /// blank, a break or the end of input.
    #[inline]
    fn starts_with_indicator(&self, indicator: &str) -> bool {
        if self.buffer.len() < 3 {
            false
        } else {
            // Since all characters we look for are ascii, we can directly use the byte API of str.
            (if self.buffer.len() == 3 {
                true
            } else {
                is_blank_or_breakz(self.buffer.as_bytes()[3] as char)
            }) && self.buffer.starts_with(indicator)
        }
    }
}

/// The buffer size we return to the scanner.
///
/// This does not correspond to any allocated buffer size. In practice, the scanner can withdraw
/// any character they want. If it's within the input buffer, the given character is returned,
/// otherwise `\0` is returned.
///
/// The number of characters we are asked to retrieve in `lookahead` depends on the buffer size of
/// the input. Our buffer here is virtually unlimited, but the scanner cannot work with that. It
/// may allocate buffers of its own of the size we return in `bufmaxlen`. We can't always return
/// the number of characters left either, as the scanner expects `buflen` to return the same value
/// that was given to `lookahead` right after its call.
const BUFFER_LEN: usize = 128;
