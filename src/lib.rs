/*!
# Streaming Exclusive XML Canonicalization

This crate computes the [Exclusive XML Canonicalization] (without comments)
of the document element of an XML token stream, as needed for signing and
verifying XML signatures.

## Features

* Works on a stream of tokens produced by any tokenizer
* Namespace declarations are rendered only where they are visibly used
* Attributes are emitted in canonical document order
* No comments, no XML declaration, no document type declaration in the output
* Push- and pull-based usage
* Optional tokenizer based on `quick-xml` via the `reader` feature
* Poll-based asynchronicity supported via the `async` feature and
  [`future::canonicalize_async`].

The canonicalizer does not check well-formedness of its input. Feeding it
mismatched tags or duplicate attributes leads to unspecified output.

## Example

```
use exc14n::{Attribute, QName, Token, TokenIter};
let tokens = vec![
	Token::StartElement(
		QName::parse("a:e1"),
		vec![Attribute::new(QName::parse("xmlns:a"), "uri1")],
	),
	Token::StartElement(QName::parse("a:e2"), vec![]),
	Token::EndElement(QName::parse("a:e2")),
	Token::EndElement(QName::parse("a:e1")),
];
let out = exc14n::canonicalize(&mut TokenIter::new(tokens.into_iter())).unwrap();
assert_eq!(&out[..], &b"<a:e1 xmlns:a=\"uri1\"><a:e2></a:e2></a:e1>"[..]);
```

## High-level usage

### Pull-based usage

Anything which implements [`TokenRead`] can be canonicalized with
[`canonicalize()`]. [`TokenIter`] turns any iterator over [`Token`]s into a
`TokenRead`.

### Push-based usage

The [`Canonicalizer`] accepts tokens one by one through
[`Canonicalizer::process`] and hands out the canonical form once the document
element has been closed.

### Parsing XML text

With the `reader` feature, [`reader::canonicalize_xml`] and
[`reader::XmlTokens`] take care of tokenizing serialized XML.

   [Exclusive XML Canonicalization]: https://www.w3.org/TR/xml-exc-c14n/
*/
use bytes::Bytes;

pub mod error;
pub mod escape;
pub mod order;
pub mod scope;
pub mod token;
mod canonicalizer;
#[cfg(feature = "async")]
pub mod future;
#[cfg(feature = "reader")]
pub mod reader;


#[doc(inline)]
pub use error::{Error, Result};
#[doc(inline)]
pub use token::{Attribute, Name, QName, Token, XMLNS_XML};
#[doc(inline)]
pub use canonicalizer::{Canonicalizer, CanonicalizerOptions};
#[cfg(feature = "reader")]
#[doc(inline)]
pub use reader::{canonicalize_xml, XmlTokens};

pub const VERSION: &'static str = env!("CARGO_PKG_VERSION");

/**
# Source for individual XML tokens

This trait is implemented by tokenizer frontends. It is analogous to the
[`std::io::Read`] trait, but for [`Token`]s instead of bytes.
*/
pub trait TokenRead {
	/// Read a single token from the source.
	///
	/// If the end of the source has been reached, `None` is returned.
	fn read(&mut self) -> Result<Option<Token>>;

	/// Read all tokens which can be produced by the source.
	///
	/// The given `cb` is invoked for each token.
	fn read_all<F>(&mut self, mut cb: F) -> Result<()>
		where F: FnMut(Token) -> (), Self: Sized
	{
		loop {
			match self.read()? {
				None => return Ok(()),
				Some(token) => cb(token),
			}
		}
	}
}

impl<T: TokenRead + ?Sized> TokenRead for &mut T {
	fn read(&mut self) -> Result<Option<Token>> {
		(**self).read()
	}
}

/// Wrapper to read tokens from an iterator which cannot fail.
pub struct TokenIter<I> {
	inner: I,
}

impl<I: Iterator<Item = Token>> TokenIter<I> {
	pub fn new(inner: I) -> Self {
		Self { inner }
	}

	/// Return the wrapped iterator.
	pub fn into_inner(self) -> I {
		self.inner
	}
}

impl<I: Iterator<Item = Token>> TokenRead for TokenIter<I> {
	fn read(&mut self) -> Result<Option<Token>> {
		Ok(self.inner.next())
	}
}

/// Canonicalize the document element read from `source` with the default
/// options.
///
/// See [`Canonicalizer::canonicalize`] for details.
pub fn canonicalize<R: TokenRead + ?Sized>(source: &mut R) -> Result<Bytes> {
	Canonicalizer::new().canonicalize(source)
}

/// Canonicalize the document element read from `source` using the given
/// options.
pub fn canonicalize_with_options<R: TokenRead + ?Sized>(
	source: &mut R,
	opts: CanonicalizerOptions,
) -> Result<Bytes> {
	Canonicalizer::with_options(opts).canonicalize(source)
}
