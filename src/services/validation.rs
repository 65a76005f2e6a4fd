//! Well-formedness checks for uploaded transcription files.

use std::borrow::Cow;

use encoding_rs::{Encoding, UTF_16BE, UTF_16LE, UTF_8};
use roxmltree::{Document, ParsingOptions};

/// Returns `true` when `bytes` is a well-formed XML document.
///
/// Only syntax is checked: no schema or DTD validation takes place, although
/// a DOCTYPE declaration is allowed since TEI transcriptions often carry one.
/// The text is decoded first, using the byte order mark or else the
/// `encoding` of the XML declaration (UTF-8 when neither is present).
pub fn validate_xml(bytes: &[u8]) -> bool {
    let Some(text) = decode(bytes) else {
        tracing::debug!("Rejected XML that does not match its encoding");
        return false;
    };

    let mut options = ParsingOptions::default();
    options.allow_dtd = true;

    match Document::parse_with_options(&text, options) {
        Ok(_) => true,
        Err(e) => {
            tracing::debug!(error = %e, "Rejected malformed XML");
            false
        }
    }
}

/// Decode the document in its own encoding, or `None` when the bytes do not
/// match that encoding.
fn decode(bytes: &[u8]) -> Option<Cow<'_, str>> {
    if let Some((encoding, bom_len)) = Encoding::for_bom(bytes) {
        return encoding.decode_without_bom_handling_and_without_replacement(&bytes[bom_len..]);
    }

    // UTF-16 without a BOM still starts with `<` as a 16-bit unit.
    let encoding = match bytes {
        [b'<', 0, ..] => UTF_16LE,
        [0, b'<', ..] => UTF_16BE,
        _ => match declared_encoding(bytes) {
            Some(label) => {
                let declared = Encoding::for_label(label)?;
                // An ASCII-readable declaration cannot be UTF-16.
                if declared == UTF_16LE || declared == UTF_16BE {
                    return None;
                }
                declared
            }
            None => UTF_8,
        },
    };
    encoding.decode_without_bom_handling_and_without_replacement(bytes)
}

/// The `encoding` pseudo-attribute of a leading `<?xml ...?>` declaration.
fn declared_encoding(bytes: &[u8]) -> Option<&[u8]> {
    let rest = bytes.strip_prefix(b"<?xml")?;
    let end = rest.windows(2).position(|w| w == b"?>")?;
    let decl = &rest[..end];

    let at = decl.windows(8).position(|w| w == b"encoding")?;
    let after = decl[at + 8..].trim_ascii_start().strip_prefix(b"=")?;
    let after = after.trim_ascii_start();
    let (&quote, value) = after.split_first()?;
    if quote != b'"' && quote != b'\'' {
        return None;
    }
    let close = value.iter().position(|&b| b == quote)?;
    Some(&value[..close])
}
