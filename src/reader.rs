/*!
# Tokenizing serialized XML

[`XmlTokens`] turns UTF-8 encoded XML read from any [`io::BufRead`] into
[`Token`]s, using [`quick_xml`] for the lexical work. Well-formedness errors
detected by `quick_xml` are reported as [`Error::Source`].

Only UTF-8 input is supported. The `encoding` given in the XML declaration
is not consulted, and bytes which are not valid UTF-8 are reported as
[`Error::Source`]. Documents in other encodings have to be transcoded before
they are handed to [`XmlTokens`].
*/
use std::borrow::Cow;
use std::io;
use std::str;

use bytes::Bytes;
use log::trace;

use quick_xml::escape::{resolve_predefined_entity, unescape};
use quick_xml::events::{BytesRef, BytesStart, Event};
use quick_xml::Reader;

use crate::token::{Attribute, QName, Token, PREFIX_XML};
use crate::{Canonicalizer, Error, Result, TokenRead};

const LOG_TARGET: &'static str = "exc14n.reader";

fn xml_error(e: quick_xml::Error) -> Error {
	match e {
		quick_xml::Error::Io(e) => e.into(),
		other => Error::from_source(other),
	}
}

fn utf8(raw: &[u8]) -> Result<&str> {
	str::from_utf8(raw).map_err(Error::from_source)
}

/// Attribute-value normalization for CDATA attributes: every literal
/// whitespace character (and CRLF as a whole) becomes a single space.
///
/// Whitespace introduced by character references is not affected, because
/// references are only resolved afterwards.
fn normalize_attribute_whitespace(raw: &str) -> Cow<'_, str> {
	if !raw.bytes().any(|b| b == b'\t' || b == b'\n' || b == b'\r') {
		return Cow::Borrowed(raw);
	}
	let mut out = String::with_capacity(raw.len());
	let mut chars = raw.chars().peekable();
	while let Some(ch) = chars.next() {
		match ch {
			'\r' => {
				if chars.peek() == Some(&'\n') {
					chars.next();
				}
				out.push(' ');
			}
			'\t' | '\n' => out.push(' '),
			other => out.push(other),
		}
	}
	Cow::Owned(out)
}

fn start_token(e: &BytesStart<'_>) -> Result<Token> {
	let name = QName::parse(utf8(e.name().as_ref())?);
	let mut attributes = Vec::new();
	for attr in e.attributes() {
		let attr = attr.map_err(Error::from_source)?;
		let key = QName::parse(utf8(attr.key.as_ref())?);
		let raw = utf8(&attr.value)?;
		let value = unescape(&normalize_attribute_whitespace(raw))
			.map_err(Error::from_source)?
			.into_owned();
		attributes.push(Attribute::new(key, value));
	}
	Ok(Token::StartElement(name, attributes))
}

fn reference_token(e: &BytesRef<'_>) -> Result<Token> {
	if let Some(ch) = e.resolve_char_ref().map_err(xml_error)? {
		return Ok(Token::Text(ch.to_string()));
	}
	let name = utf8(e)?;
	match resolve_predefined_entity(name) {
		Some(resolved) => Ok(Token::Text(resolved.to_string())),
		None => Err(Error::from_source(format!("unknown entity reference &{};", name))),
	}
}

/**
# Token source reading XML text

Empty-element tags are reported as a start and an end token. Character data
has its line endings normalized and its references resolved; CDATA sections
are reported as plain text. Only the predefined entities can be referenced,
as document type declarations are not interpreted.

The XML declaration is reported as a processing instruction with target
`xml`, comments and document type declarations as [`Token::Comment`] and
[`Token::Directive`].
*/
pub struct XmlTokens<R> {
	reader: Reader<R>,
	buf: Vec<u8>,
	pending: Option<Token>,
}

impl<R: io::BufRead> XmlTokens<R> {
	pub fn new(inner: R) -> Self {
		let mut reader = Reader::from_reader(inner);
		reader.config_mut().trim_text(false);
		Self {
			reader,
			buf: Vec::new(),
			pending: None,
		}
	}

	/// Return the wrapped reader.
	///
	/// Data which has already been buffered by the reader may be lost.
	pub fn into_inner(self) -> R {
		self.reader.into_inner()
	}
}

impl<R: io::BufRead> TokenRead for XmlTokens<R> {
	fn read(&mut self) -> Result<Option<Token>> {
		if let Some(token) = self.pending.take() {
			return Ok(Some(token));
		}
		self.buf.clear();
		let token = match self.reader.read_event_into(&mut self.buf).map_err(xml_error)? {
			Event::Start(e) => start_token(&e)?,
			Event::Empty(e) => {
				let start = start_token(&e)?;
				if let Token::StartElement(name, _) = &start {
					self.pending = Some(Token::EndElement(name.clone()));
				}
				start
			}
			Event::End(e) => Token::EndElement(QName::parse(utf8(e.name().as_ref())?)),
			Event::Text(e) => Token::Text(e.xml10_content().map_err(Error::from_source)?.into_owned()),
			Event::CData(e) => Token::Text(e.xml10_content().map_err(Error::from_source)?.into_owned()),
			Event::GeneralRef(e) => reference_token(&e)?,
			Event::PI(e) => Token::ProcessingInstruction(
				utf8(e.target())?.into(),
				utf8(e.content())?.trim_start().to_string(),
			),
			Event::Decl(e) => {
				let raw = utf8(&e)?;
				let body = raw.strip_prefix(PREFIX_XML).unwrap_or(raw).trim_start();
				Token::ProcessingInstruction(PREFIX_XML.into(), body.to_string())
			}
			Event::Comment(e) => Token::Comment(e.xml10_content().map_err(Error::from_source)?.into_owned()),
			Event::DocType(e) => Token::Directive(format!("DOCTYPE {}", utf8(&e)?.trim())),
			Event::Eof => {
				trace!(target: LOG_TARGET, "end of XML input");
				return Ok(None);
			}
		};
		Ok(Some(token))
	}
}

/// Canonicalize the document element of a serialized XML document.
///
/// ```
/// let out = exc14n::canonicalize_xml(b"<?xml version='1.0'?><foo z='2' a='1'><bar/></foo>").unwrap();
/// assert_eq!(&out[..], &b"<foo a=\"1\" z=\"2\"><bar></bar></foo>"[..]);
/// ```
pub fn canonicalize_xml(data: &[u8]) -> Result<Bytes> {
	Canonicalizer::new().canonicalize(&mut XmlTokens::new(data))
}
