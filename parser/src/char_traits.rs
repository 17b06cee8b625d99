//! Character classification helpers shared by the scanner and the parser.

/// The Unicode next-line character, a YAML 1.1 line break.
pub const NEL: char = '\u{0085}';
/// The Unicode line-separator character, a YAML 1.1 line break.
pub const LINE_SEPARATOR: char = '\u{2028}';
/// The Unicode paragraph-separator character, a YAML 1.1 line break.
pub const PARAGRAPH_SEPARATOR: char = '\u{2029}';

/// Check whether the character is nil (`\0`).
#[inline]
#[must_use]
pub fn is_z(c: char) -> bool {
    c == '\0'
}

/// Check whether the character is an ASCII line break (`\r` or `\n`).
#[inline]
#[must_use]
pub fn is_break(c: char) -> bool {
    c == '\n' || c == '\r'
}

/// Check whether the character is any line break, including the Unicode ones.
///
/// Covers `\r`, `\n`, NEL (U+0085), LS (U+2028) and PS (U+2029).
#[inline]
#[must_use]
pub fn is_any_break(c: char) -> bool {
    is_break(c) || c == NEL || c == LINE_SEPARATOR || c == PARAGRAPH_SEPARATOR
}

/// Check whether the character is nil or a line break (`\0`, `\r`, `\n`).
#[inline]
#[must_use]
pub fn is_breakz(c: char) -> bool {
    is_break(c) || is_z(c)
}

/// Check whether the character is a whitespace (` ` or `\t`).
#[inline]
#[must_use]
pub fn is_blank(c: char) -> bool {
    c == ' ' || c == '\t'
}

/// Check whether the character is nil, a linebreak or a whitespace.
///
/// `\0`, ` `, `\t`, `\n`, `\r`
#[inline]
#[must_use]
pub fn is_blank_or_breakz(c: char) -> bool {
    is_blank(c) || is_breakz(c)
}

/// Check whether the character is an ascii digit.
#[inline]
#[must_use]
pub fn is_digit(c: char) -> bool {
    c.is_ascii_digit()
}

/// Check whether the character is a digit, letter, `_` or `-`.
#[inline]
#[must_use]
pub fn is_alpha(c: char) -> bool {
    matches!(c, '0'..='9' | 'a'..='z' | 'A'..='Z' | '_' | '-')
}

/// Check whether the character is a hexadecimal character (case insensitive).
#[inline]
#[must_use]
pub fn is_hex(c: char) -> bool {
    c.is_ascii_hexdigit()
}

/// Convert the hexadecimal digit to an integer.
#[inline]
#[must_use]
pub fn as_hex(c: char) -> u32 {
    match c {
        '0'..='9' => (c as u32) - ('0' as u32),
        'a'..='f' => (c as u32) - ('a' as u32) + 10,
        'A'..='F' => (c as u32) - ('A' as u32) + 10,
        _ => unreachable!(),
    }
}

/// Check whether the character is a YAML flow character (one of `,[]{}`).
#[inline]
#[must_use]
pub fn is_flow(c: char) -> bool {
    matches!(c, ',' | '[' | ']' | '{' | '}')
}

/// Check whether the character is the BOM character.
#[inline]
#[must_use]
pub fn is_bom(c: char) -> bool {
    c == '\u{FEFF}'
}

/// Check whether the character may appear in an anchor or alias name.
#[inline]
#[must_use]
pub fn is_anchor_char(c: char) -> bool {
    !is_blank_or_breakz(c) && !is_flow(c) && !is_bom(c) && !is_any_break(c)
}

/// Check whether the character is a valid word character per the URI grammar.
#[inline]
#[must_use]
pub fn is_word_char(c: char) -> bool {
    is_alpha(c) && c != '_'
}

/// Check whether the character is a valid URI character.
#[inline]
#[must_use]
pub fn is_uri_char(c: char) -> bool {
    is_word_char(c) || "#;/?:@&=+$,_.!~*'()[]%".contains(c)
}

/// Check whether the character is a valid tag character.
///
/// Tag characters are URI characters minus flow indicators and `!`.
#[inline]
#[must_use]
pub fn is_tag_char(c: char) -> bool {
    is_uri_char(c) && !is_flow(c) && c != '!'
}

/// Check whether the string contains only YAML whitespace (ASCII or Unicode).
///
/// Used by the emitter: whitespace-only values must never be emitted in
/// literal or folded style, where they would be indistinguishable from
/// indentation.
#[must_use]
pub fn is_all_whitespace(s: &str) -> bool {
    s.chars().all(|c| is_blank(c) || is_any_break(c) || c.is_whitespace())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unicode_breaks() {
        assert!(is_any_break('\n'));
        assert!(is_any_break('\r'));
        assert!(is_any_break('\u{0085}'));
        assert!(is_any_break('\u{2028}'));
        assert!(is_any_break('\u{2029}'));
        assert!(!is_any_break(' '));
    }

    #[test]
    fn hex_digits() {
        assert_eq!(as_hex('0'), 0);
        assert_eq!(as_hex('a'), 10);
        assert_eq!(as_hex('F'), 15);
    }

    #[test]
    fn whitespace_only() {
        assert!(is_all_whitespace(" \t\n"));
        assert!(!is_all_whitespace(" a "));
    }
}
