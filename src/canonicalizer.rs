/*!
# Exclusive canonicalization of a token stream

The [`Canonicalizer`] consumes [`Token`]s one at a time and writes the
canonical form of the first element it sees (the document element) into an
output buffer. Anything before that element is skipped. Once the element is
closed, the buffer is handed out and the canonicalizer is ready for the next
document.
*/
use std::collections::BTreeSet;

use bytes::{BufMut, Bytes, BytesMut};
use log::{debug, trace, warn};

use crate::error::{Error, Result};
use crate::escape::{escape_attribute, escape_text};
use crate::order::AttributeOrderer;
use crate::scope::{NamespaceScopes, Prefix, RenderedScopes};
use crate::token::{Attribute, Name, QName, Token, PREFIX_XML};
use crate::TokenRead;

const LOG_TARGET: &'static str = "exc14n.canonicalizer";

/// Options to configure a [`Canonicalizer`].
///
/// See also [`Canonicalizer::with_options()`].
#[derive(Debug, Clone, PartialEq, Copy)]
pub struct CanonicalizerOptions {
	/// Maximum nesting depth of elements.
	///
	/// Opening an element beyond this depth fails with
	/// [`Error::LimitExceeded`]. `None` means unbounded.
	pub max_depth: Option<usize>,

	/// Number of bytes to allocate for the output buffer up front.
	pub initial_capacity: usize,
}

impl CanonicalizerOptions {
	/// Set the [`CanonicalizerOptions::max_depth`] value.
	///
	/// # Example
	///
	/// ```
	/// use exc14n::{Canonicalizer, CanonicalizerOptions};
	/// let c = Canonicalizer::with_options(CanonicalizerOptions::default().max_depth(Some(64)));
	/// ```
	pub fn max_depth(mut self, v: Option<usize>) -> CanonicalizerOptions {
		self.max_depth = v;
		self
	}

	/// Set the [`CanonicalizerOptions::initial_capacity`] value.
	pub fn initial_capacity(mut self, v: usize) -> CanonicalizerOptions {
		self.initial_capacity = v;
		self
	}
}

impl Default for CanonicalizerOptions {
	/// Constructs default options: unbounded depth and a 4 KiB output buffer.
	fn default() -> Self {
		Self {
			max_depth: None,
			initial_capacity: 4096,
		}
	}
}

/// Decide whether `xmlns=""` has to be written on an element which has no
/// default namespace in scope.
///
/// The declaration is only needed to cancel a non-empty default namespace
/// which an output ancestor rendered; `rendered` is the nearest default
/// namespace URI rendered by an open element, if any.
pub fn render_empty_default_namespace(visibly_used: bool, rendered: Option<&str>) -> bool {
	let cancels = match rendered {
		Some(uri) => !uri.is_empty(),
		None => false,
	};
	visibly_used && cancels
}

/// Decide whether the binding of a prefix to `uri` has to be written on an
/// element.
///
/// This is the case if the element visibly uses the prefix and the nearest
/// rendered binding of the prefix, if any, is to a different URI.
pub fn render_namespace(visibly_used: bool, uri: &str, rendered: Option<&str>) -> bool {
	visibly_used && rendered != Some(uri)
}

fn put_qname(out: &mut BytesMut, name: &QName) {
	if let Some(prefix) = name.prefix() {
		out.put_slice(prefix.as_bytes());
		out.put_u8(b':');
	}
	out.put_slice(name.local.as_bytes());
}

/**
# Streaming exclusive canonicalizer

Tokens are fed through [`Canonicalizer::process`], or pulled from a
[`TokenRead`] by [`Canonicalizer::canonicalize`].

The canonicalizer does not validate its input. Unbalanced or mismatched tags
and duplicate attributes lead to unspecified output. An end tag while no
element is open is ignored.

## Example

```
use exc14n::{Attribute, Canonicalizer, QName, Token};
let mut c = Canonicalizer::new();
let tokens = vec![
	Token::StartElement(QName::unprefixed("foo"), vec![
		Attribute::new(QName::unprefixed("z"), "2"),
		Attribute::new(QName::unprefixed("a"), "1"),
	]),
	Token::StartElement(QName::unprefixed("bar"), vec![]),
	Token::EndElement(QName::unprefixed("bar")),
	Token::EndElement(QName::unprefixed("foo")),
];
let mut result = None;
for token in tokens {
	result = c.process(token).unwrap();
}
assert_eq!(&result.unwrap()[..], &b"<foo a=\"1\" z=\"2\"><bar></bar></foo>"[..]);
```
*/
pub struct Canonicalizer {
	opts: CanonicalizerOptions,
	known: NamespaceScopes,
	rendered: RenderedScopes,
	out: BytesMut,
}

impl Canonicalizer {
	/// Construct a new canonicalizer based on
	/// [`CanonicalizerOptions::default()`].
	pub fn new() -> Self {
		Self::with_options(CanonicalizerOptions::default())
	}

	pub fn with_options(opts: CanonicalizerOptions) -> Self {
		Self {
			opts,
			known: NamespaceScopes::new(),
			rendered: RenderedScopes::new(),
			out: BytesMut::with_capacity(opts.initial_capacity),
		}
	}

	/// Number of currently open elements.
	pub fn depth(&self) -> usize {
		self.known.len()
	}

	/// Drop any partial output and close all open elements.
	pub fn reset(&mut self) {
		while !self.known.is_empty() {
			self.known.pop();
		}
		while !self.rendered.is_empty() {
			self.rendered.pop();
		}
		self.out.clear();
	}

	/// Process a single token.
	///
	/// Returns the canonical form of the document element once its end tag
	/// has been processed, `None` before that.
	///
	/// After an error, the canonicalizer has been reset.
	pub fn process(&mut self, token: Token) -> Result<Option<Bytes>> {
		match token {
			Token::StartElement(name, attrs) => {
				self.start_element(name, attrs)?;
				Ok(None)
			}
			Token::EndElement(name) => Ok(self.end_element(&name)),
			Token::Text(text) => {
				self.text(&text);
				Ok(None)
			}
			Token::ProcessingInstruction(target, body) => {
				self.processing_instruction(&target, &body);
				Ok(None)
			}
			Token::Comment(_) => {
				trace!(target: LOG_TARGET, "dropping comment");
				Ok(None)
			}
			Token::Directive(_) => {
				trace!(target: LOG_TARGET, "dropping directive");
				Ok(None)
			}
		}
	}

	/// Pull tokens from `source` until the document element is closed and
	/// return its canonical form.
	///
	/// Tokens following the end of the document element are not read. If
	/// `source` ends earlier, [`Error::UnexpectedEof`] is returned.
	pub fn canonicalize<R: TokenRead + ?Sized>(&mut self, source: &mut R) -> Result<Bytes> {
		loop {
			let token = match source.read() {
				Ok(Some(token)) => token,
				Ok(None) => {
					self.reset();
					return Err(Error::UnexpectedEof);
				}
				Err(e) => {
					self.reset();
					return Err(e);
				}
			};
			if let Some(out) = self.process(token)? {
				return Ok(out);
			}
		}
	}

	fn start_element(&mut self, name: QName, attrs: Vec<Attribute>) -> Result<()> {
		if let Some(max_depth) = self.opts.max_depth {
			if self.known.len() >= max_depth {
				self.reset();
				return Err(Error::LimitExceeded("element nesting depth"));
			}
		}
		if self.known.is_empty() {
			debug!(target: LOG_TARGET, "canonicalizing document element <{}>", name);
		}

		let mut declared: Vec<(Prefix, String)> = Vec::new();
		let mut attributes = Vec::with_capacity(attrs.len());
		let mut visibly_used: BTreeSet<Prefix> = BTreeSet::new();
		visibly_used.insert(name.prefix.clone());
		for attr in attrs {
			match attr.name.declared_prefix() {
				Some(prefix) => {
					let prefix = prefix.map(Name::from);
					declared.push((prefix, attr.value));
				}
				None => {
					visibly_used.insert(attr.name.prefix.clone());
					attributes.push(attr);
				}
			}
		}

		self.known.push(declared);
		for prefix in visibly_used.iter() {
			self.known.get(prefix.as_deref());
		}

		let mut to_render: Vec<(Prefix, String)> = Vec::new();
		for (prefix, uri) in self.known.resolved() {
			let used = visibly_used.contains(&prefix);
			let previous = self.rendered.get(prefix.as_deref());
			let render = if prefix.is_none() && uri.is_empty() {
				render_empty_default_namespace(used, previous)
			} else {
				render_namespace(used, uri, previous)
			};
			if render {
				trace!(target: LOG_TARGET, "rendering namespace {:?} = {:?} on <{}>", prefix, uri, name);
				to_render.push((prefix, uri.to_string()));
			}
		}

		for (prefix, uri) in to_render.iter() {
			attributes.push(Attribute::namespace_declaration(prefix.as_deref(), uri.as_str()));
		}
		self.rendered.push(to_render);
		AttributeOrderer::new(&mut self.known).sort(&mut attributes);

		self.out.put_u8(b'<');
		put_qname(&mut self.out, &name);
		for attr in attributes.iter() {
			self.out.put_u8(b' ');
			put_qname(&mut self.out, &attr.name);
			self.out.put_slice(b"=\"");
			escape_attribute(&mut self.out, &attr.value);
			self.out.put_u8(b'"');
		}
		self.out.put_u8(b'>');
		Ok(())
	}

	fn end_element(&mut self, name: &QName) -> Option<Bytes> {
		if self.known.is_empty() {
			warn!(target: LOG_TARGET, "ignoring end tag </{}> outside of the document element", name);
			return None;
		}
		self.out.put_slice(b"</");
		put_qname(&mut self.out, name);
		self.out.put_u8(b'>');

		self.known.pop();
		self.rendered.pop();
		if !self.known.is_empty() {
			return None;
		}
		let out = self.out.split().freeze();
		debug!(target: LOG_TARGET, "document element </{}> closed, {} bytes of canonical output", name, out.len());
		Some(out)
	}

	fn text(&mut self, text: &str) {
		if self.known.is_empty() {
			trace!(target: LOG_TARGET, "skipping {} bytes of text outside of the document element", text.len());
			return;
		}
		escape_text(&mut self.out, text);
	}

	fn processing_instruction(&mut self, target: &str, body: &str) {
		if self.known.is_empty() {
			trace!(target: LOG_TARGET, "skipping processing instruction <?{}?> outside of the document element", target);
			return;
		}
		// the XML declaration is never part of the canonical form
		if target == PREFIX_XML {
			return;
		}
		self.out.put_slice(b"<?");
		self.out.put_slice(target.as_bytes());
		if !body.is_empty() {
			self.out.put_u8(b' ');
			self.out.put_slice(body.as_bytes());
		}
		self.out.put_slice(b"?>");
	}
}

impl Default for Canonicalizer {
	fn default() -> Self {
		Self::new()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	use crate::token::Attribute;
	use crate::TokenIter;

	fn start(name: &str, attrs: &[(&str, &str)]) -> Token {
		Token::StartElement(
			QName::parse(name),
			attrs
				.iter()
				.map(|(k, v)| Attribute::new(QName::parse(k), *v))
				.collect(),
		)
	}

	fn end(name: &str) -> Token {
		Token::EndElement(QName::parse(name))
	}

	fn text(s: &str) -> Token {
		Token::Text(s.to_string())
	}

	fn pi(target: &str, body: &str) -> Token {
		Token::ProcessingInstruction(target.into(), body.to_string())
	}

	fn run(tokens: Vec<Token>) -> Result<Bytes> {
		Canonicalizer::new().canonicalize(&mut TokenIter::new(tokens.into_iter()))
	}

	fn run_ok(tokens: Vec<Token>) -> String {
		String::from_utf8(run(tokens).unwrap().to_vec()).unwrap()
	}

	#[test]
	fn empty_default_namespace_needs_visible_use() {
		assert!(!render_empty_default_namespace(false, Some("urn:d")));
		assert!(render_empty_default_namespace(true, Some("urn:d")));
	}

	#[test]
	fn empty_default_namespace_needs_rendered_nonempty_default() {
		assert!(!render_empty_default_namespace(true, None));
		assert!(!render_empty_default_namespace(true, Some("")));
	}

	#[test]
	fn namespace_rendered_when_new_or_changed() {
		assert!(render_namespace(true, "urn:a", None));
		assert!(render_namespace(true, "urn:a", Some("urn:b")));
		assert!(!render_namespace(true, "urn:a", Some("urn:a")));
		assert!(!render_namespace(false, "urn:a", None));
	}

	#[test]
	fn attributes_are_reordered_and_empty_elements_expanded() {
		let out = run_ok(vec![
			start("foo", &[("z", "2"), ("a", "1")]),
			start("bar", &[]),
			end("bar"),
			end("foo"),
		]);
		assert_eq!(out, "<foo a=\"1\" z=\"2\"><bar></bar></foo>");
	}

	#[test]
	fn inherited_prefix_is_not_redeclared() {
		let out = run_ok(vec![
			start("a:e1", &[("xmlns:a", "uri1")]),
			start("a:e2", &[]),
			end("a:e2"),
			end("a:e1"),
		]);
		assert_eq!(out, "<a:e1 xmlns:a=\"uri1\"><a:e2></a:e2></a:e1>");
	}

	#[test]
	fn redundant_redeclaration_is_dropped() {
		let out = run_ok(vec![
			start("a:e1", &[("xmlns:a", "uri1")]),
			start("a:e2", &[("xmlns:a", "uri1")]),
			end("a:e2"),
			end("a:e1"),
		]);
		assert_eq!(out, "<a:e1 xmlns:a=\"uri1\"><a:e2></a:e2></a:e1>");
	}

	#[test]
	fn rebinding_is_rendered() {
		let out = run_ok(vec![
			start("a:e1", &[("xmlns:a", "uri1")]),
			start("a:e2", &[("xmlns:a", "uri2")]),
			end("a:e2"),
			start("a:e3", &[]),
			end("a:e3"),
			end("a:e1"),
		]);
		assert_eq!(
			out,
			"<a:e1 xmlns:a=\"uri1\"><a:e2 xmlns:a=\"uri2\"></a:e2><a:e3></a:e3></a:e1>"
		);
	}

	#[test]
	fn unused_declarations_are_dropped_until_used() {
		let out = run_ok(vec![
			start("root", &[("xmlns:a", "urn:a"), ("xmlns:b", "urn:b")]),
			start("child", &[("b:attr", "v")]),
			end("child"),
			start("a:child", &[]),
			end("a:child"),
			end("root"),
		]);
		assert_eq!(
			out,
			"<root><child xmlns:b=\"urn:b\" b:attr=\"v\"></child><a:child xmlns:a=\"urn:a\"></a:child></root>"
		);
	}

	#[test]
	fn sibling_elements_each_render_used_prefix() {
		let out = run_ok(vec![
			start("root", &[("xmlns:a", "urn:a")]),
			start("a:x", &[]),
			end("a:x"),
			start("a:y", &[]),
			end("a:y"),
			end("root"),
		]);
		assert_eq!(
			out,
			"<root><a:x xmlns:a=\"urn:a\"></a:x><a:y xmlns:a=\"urn:a\"></a:y></root>"
		);
	}

	#[test]
	fn default_namespace_is_cancelled() {
		let out = run_ok(vec![
			start("a", &[("xmlns", "urn:d")]),
			start("b", &[("xmlns", "")]),
			start("c", &[]),
			end("c"),
			end("b"),
			end("a"),
		]);
		assert_eq!(out, "<a xmlns=\"urn:d\"><b xmlns=\"\"><c></c></b></a>");
	}

	#[test]
	fn cancellation_is_rendered_where_the_default_is_first_used() {
		let out = run_ok(vec![
			start("a", &[("xmlns", "urn:d")]),
			start("x:b", &[("xmlns:x", "urn:x"), ("xmlns", "")]),
			start("c", &[("xmlns", "")]),
			end("c"),
			end("x:b"),
			end("a"),
		]);
		assert_eq!(
			out,
			"<a xmlns=\"urn:d\"><x:b xmlns:x=\"urn:x\"><c xmlns=\"\"></c></x:b></a>"
		);
	}

	#[test]
	fn empty_default_namespace_is_not_rendered_without_prior_default() {
		let out = run_ok(vec![start("a", &[("xmlns", "")]), end("a")]);
		assert_eq!(out, "<a></a>");
	}

	#[test]
	fn unprefixed_attribute_uses_default_namespace() {
		let out = run_ok(vec![
			start("x:a", &[("xmlns:x", "urn:x"), ("xmlns", "urn:d"), ("attr", "1")]),
			end("x:a"),
		]);
		assert_eq!(out, "<x:a xmlns=\"urn:d\" xmlns:x=\"urn:x\" attr=\"1\"></x:a>");
	}

	#[test]
	fn unprefixed_attribute_sorts_by_default_namespace_uri() {
		let out = run_ok(vec![
			start(
				"x:a",
				&[
					("xmlns:x", "urn:x"),
					("xmlns", "urn:d"),
					("xmlns:p", "urn:a"),
					("b", "1"),
					("p:c", "2"),
				],
			),
			end("x:a"),
		]);
		assert_eq!(
			out,
			"<x:a xmlns=\"urn:d\" xmlns:p=\"urn:a\" xmlns:x=\"urn:x\" p:c=\"2\" b=\"1\"></x:a>"
		);
	}

	#[test]
	fn unprefixed_attribute_renders_default_namespace_cancellation() {
		let out = run_ok(vec![
			start("a", &[("xmlns", "urn:d")]),
			start("x:b", &[("xmlns:x", "urn:x"), ("xmlns", ""), ("k", "v")]),
			end("x:b"),
			end("a"),
		]);
		assert_eq!(
			out,
			"<a xmlns=\"urn:d\"><x:b xmlns=\"\" xmlns:x=\"urn:x\" k=\"v\"></x:b></a>"
		);
	}

	#[test]
	fn explicit_xml_prefix_declaration_is_rendered_when_used() {
		let out = run_ok(vec![
			start("a", &[("xml:lang", "en"), ("xmlns:xml", "http://www.w3.org/XML/1998/namespace")]),
			start("b", &[("xml:lang", "de")]),
			end("b"),
			end("a"),
		]);
		assert_eq!(
			out,
			"<a xmlns:xml=\"http://www.w3.org/XML/1998/namespace\" xml:lang=\"en\"><b xml:lang=\"de\"></b></a>"
		);
	}

	#[test]
	fn implicit_xml_prefix_is_not_declared() {
		let out = run_ok(vec![start("a", &[("xml:lang", "en")]), end("a")]);
		assert_eq!(out, "<a xml:lang=\"en\"></a>");
	}

	#[test]
	fn attribute_values_are_escaped() {
		let out = run_ok(vec![start("a", &[("v", "I'm \"quoted\"\t")]), end("a")]);
		assert_eq!(out, "<a v=\"I'm &quot;quoted&quot;&#x9;\"></a>");
	}

	#[test]
	fn text_is_escaped() {
		let out = run_ok(vec![start("a", &[]), text("1 < 2 && 3 > 2\r\n"), end("a")]);
		assert_eq!(out, "<a>1 &lt; 2 &amp;&amp; 3 &gt; 2&#xD;\n</a>");
	}

	#[test]
	fn prolog_and_epilog_are_skipped() {
		let out = run_ok(vec![
			pi("xml", "version=\"1.0\""),
			Token::Directive("DOCTYPE a".to_string()),
			text("\n"),
			pi("before", "x"),
			Token::Comment(" c ".to_string()),
			start("a", &[]),
			end("a"),
			pi("after", "x"),
		]);
		assert_eq!(out, "<a></a>");
	}

	#[test]
	fn processing_instructions_inside_the_document_element() {
		let out = run_ok(vec![
			start("a", &[]),
			pi("empty", ""),
			pi("target", "some data"),
			pi("xml", "version=\"1.0\""),
			end("a"),
		]);
		assert_eq!(out, "<a><?empty?><?target some data?></a>");
	}

	#[test]
	fn comments_inside_the_document_element_are_dropped() {
		let out = run_ok(vec![
			start("a", &[]),
			text("x"),
			Token::Comment("secret".to_string()),
			text("y"),
			end("a"),
		]);
		assert_eq!(out, "<a>xy</a>");
	}

	#[test]
	fn stray_end_tag_before_root_is_ignored() {
		let out = run_ok(vec![end("stray"), start("a", &[]), end("a")]);
		assert_eq!(out, "<a></a>");
	}

	#[test]
	fn only_processing_instruction_is_unexpected_eof() {
		assert_eq!(run(vec![pi("xml", "version=\"1.0\"")]), Err(Error::UnexpectedEof));
	}

	#[test]
	fn truncated_document_is_unexpected_eof() {
		assert_eq!(
			run(vec![start("a", &[]), start("b", &[]), end("b")]),
			Err(Error::UnexpectedEof)
		);
	}

	#[test]
	fn empty_source_is_unexpected_eof() {
		assert_eq!(run(vec![]), Err(Error::UnexpectedEof));
	}

	#[test]
	fn tokens_after_document_element_are_not_consumed() {
		let mut source = TokenIter::new(
			vec![start("a", &[]), end("a"), start("b", &[]), end("b")].into_iter(),
		);
		let mut c = Canonicalizer::new();
		assert_eq!(&c.canonicalize(&mut source).unwrap()[..], b"<a></a>");
		assert_eq!(&c.canonicalize(&mut source).unwrap()[..], b"<b></b>");
		assert_eq!(c.canonicalize(&mut source), Err(Error::UnexpectedEof));
	}

	#[test]
	fn source_errors_are_passed_through() {
		struct Failing(usize);

		impl TokenRead for Failing {
			fn read(&mut self) -> Result<Option<Token>> {
				if self.0 == 0 {
					return Err(Error::from_source("broken markup"));
				}
				self.0 -= 1;
				Ok(Some(Token::StartElement(QName::unprefixed("a"), Vec::new())))
			}
		}

		let mut c = Canonicalizer::new();
		match c.canonicalize(&mut Failing(2)) {
			Err(Error::Source(e)) => assert_eq!(e.to_string(), "broken markup"),
			other => panic!("unexpected result: {:?}", other),
		}
		assert_eq!(c.depth(), 0);
	}

	#[test]
	fn max_depth_is_enforced() {
		let mut c = Canonicalizer::with_options(CanonicalizerOptions::default().max_depth(Some(2)));
		assert_eq!(c.process(start("a", &[])), Ok(None));
		assert_eq!(c.process(start("b", &[])), Ok(None));
		assert_eq!(
			c.process(start("c", &[])),
			Err(Error::LimitExceeded("element nesting depth"))
		);
		assert_eq!(c.depth(), 0);
	}

	#[test]
	fn max_depth_allows_documents_within_the_limit() {
		let mut c = Canonicalizer::with_options(CanonicalizerOptions::default().max_depth(Some(2)));
		let out = c
			.canonicalize(&mut TokenIter::new(
				vec![start("a", &[]), start("b", &[]), end("b"), end("a")].into_iter(),
			))
			.unwrap();
		assert_eq!(&out[..], b"<a><b></b></a>");
	}

	#[test]
	fn reset_discards_partial_output() {
		let mut c = Canonicalizer::new();
		c.process(start("a", &[("xmlns:p", "urn:p")])).unwrap();
		c.process(text("partial")).unwrap();
		c.reset();
		assert_eq!(c.depth(), 0);
		c.process(start("b", &[])).unwrap();
		let out = c.process(end("b")).unwrap().unwrap();
		assert_eq!(&out[..], b"<b></b>");
	}

	#[test]
	fn depth_tracks_open_elements() {
		let mut c = Canonicalizer::default();
		assert_eq!(c.depth(), 0);
		c.process(start("a", &[])).unwrap();
		c.process(start("b", &[])).unwrap();
		assert_eq!(c.depth(), 2);
		c.process(end("b")).unwrap();
		assert_eq!(c.depth(), 1);
	}
}
