/*!
# Escaping of character data and attribute values

Canonical XML mandates a fixed set of substitutions. No other transformation
is applied; in particular, apostrophes are never escaped and `>` is left alone
inside attribute values.
*/
use bytes::BufMut;

/// Characters which need substitution in text content.
const TEXT_SPECIALS: &'static [u8] = &[b'&', b'<', b'>', b'\r'];

/// Characters which need substitution in attribute values.
const ATTR_SPECIALS: &'static [u8] = &[b'&', b'<', b'"', b'\t', b'\n', b'\r'];

fn escape<B: BufMut>(out: &mut B, data: &[u8], specials: &'static [u8]) {
	let mut last_index = 0;
	for (i, ch) in data.iter().enumerate() {
		if !specials.contains(ch) {
			continue;
		}
		if i > last_index {
			out.put_slice(&data[last_index..i]);
		}
		// every replacement is emitted in one piece, so a substituted `&`
		// can never be picked up again
		let replacement: &[u8] = match ch {
			b'&' => b"&amp;",
			b'<' => b"&lt;",
			b'>' => b"&gt;",
			b'"' => b"&quot;",
			b'\t' => b"&#x9;",
			b'\n' => b"&#xA;",
			b'\r' => b"&#xD;",
			_ => unreachable!("no substitution for special {:?}", *ch as char),
		};
		out.put_slice(replacement);
		last_index = i + 1;
	}
	out.put_slice(&data[last_index..]);
}

/// Append `text` to `out`, escaped for use as element content.
///
/// ```
/// let mut out = Vec::new();
/// exc14n::escape::escape_text(&mut out, "a < b\r\n");
/// assert_eq!(out, b"a &lt; b&#xD;\n");
/// ```
pub fn escape_text<B: BufMut>(out: &mut B, text: &str) {
	escape(out, text.as_bytes(), TEXT_SPECIALS)
}

/// Append `value` to `out`, escaped for use inside a double-quoted attribute
/// value.
pub fn escape_attribute<B: BufMut>(out: &mut B, value: &str) {
	escape(out, value.as_bytes(), ATTR_SPECIALS)
}
