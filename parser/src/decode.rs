//! Byte-stream decoding. Available only with the `encoding` feature.
//!
//! YAML streams may be encoded in UTF-8, UTF-16LE or UTF-16BE. The encoding is detected from a
//! leading byte-order mark and, absent one, from the null-byte pattern of the first two bytes
//! (the YAML specification mandates that a document starts with an ASCII character). Decoding
//! happens up front; the scanner then operates on codepoints.

use encoding_rs::{Decoder, DecoderResult, Encoding};

/// An error encountered while decoding a byte stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeError {
    /// The byte offset at which the malformed sequence starts.
    pub index: usize,
    /// A description of the malformation.
    pub info: String,
}

impl std::error::Error for DecodeError {}

impl std::fmt::Display for DecodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} at byte {}", self.info, self.index)
    }
}

/// Decode the given byte buffer into a string suitable for scanning.
///
/// # Errors
/// Returns a [`DecodeError`] on the first malformed sequence for the detected encoding. A decoding
/// error is fatal for the stream; there is no lossy fallback in the core.
pub fn decode_bytes(input: &[u8]) -> Result<String, DecodeError> {
    // `encoding_rs` can detect the encoding from the BOM. Without a BOM, fall back to the
    // null-byte pattern detection.
    let (encoding, _bom_len) =
        Encoding::for_bom(input).unwrap_or_else(|| (detect_utf16_endianness(input), 0));
    let mut decoder = encoding.new_decoder();
    let mut output = String::new();
    decode_loop(input, &mut output, &mut decoder)?;
    Ok(output)
}

/// Perform a loop of [`Decoder::decode_to_string_without_replacement`], reallocating `output` if
/// needed.
fn decode_loop(
    input: &[u8],
    output: &mut String,
    decoder: &mut Decoder,
) -> Result<(), DecodeError> {
    output.reserve(input.len());
    let mut total_bytes_read = 0;

    loop {
        match decoder.decode_to_string_without_replacement(&input[total_bytes_read..], output, true)
        {
            // If the input is empty, we processed the whole input.
            (DecoderResult::InputEmpty, _) => break Ok(()),
            // If the output is full, we must reallocate.
            (DecoderResult::OutputFull, bytes_read) => {
                total_bytes_read += bytes_read;
                // The output is already reserved to the size of the input. We slowly resize. Here,
                // we're expecting that 10% of bytes will double in size when converting to UTF-8.
                output.reserve(input.len() / 10);
            }
            (DecoderResult::Malformed(malformed_len, bytes_after_malformed), bytes_read) => {
                total_bytes_read += bytes_read;
                let malformed_len = malformed_len as usize;
                let bytes_after_malformed = bytes_after_malformed as usize;
                let index = total_bytes_read - (malformed_len + bytes_after_malformed);
                let malformed_sequence = &input[index..index + malformed_len];
                break Err(DecodeError {
                    index,
                    info: format!("invalid character sequence {malformed_sequence:?}"),
                });
            }
        }
    }
}

/// Guess the UTF-16 endianness of a BOM-less byte stream.
///
/// `encoding_rs` doesn't attempt to guess the UTF-16 endianness of the input bytestream since in
/// the general case the bytestream could start with a codepoint that uses both bytes.
///
/// The YAML spec mandates that the first character of a YAML document is an ASCII character. This
/// allows the encoding to be deduced by the pattern of null (#x00) characters.
fn detect_utf16_endianness(b: &[u8]) -> &'static Encoding {
    if b.len() > 1 && (b[0] != b[1]) {
        if b[0] == 0 {
            return encoding_rs::UTF_16BE;
        } else if b[1] == 0 {
            return encoding_rs::UTF_16LE;
        }
    }
    encoding_rs::UTF_8
}
