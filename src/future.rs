/*!
# Asynchronous token sources

The canonicalizer itself never blocks; the only point where an asynchronous
canonicalization can suspend is while waiting for the next token. This module
provides the poll-based [`AsyncTokenRead`] trait for such sources and the
[`Canonicalize`] future which drives a [`Canonicalizer`] from one.
*/
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;

#[cfg(feature = "stream")]
use futures_core::stream::Stream;

use pin_project_lite::pin_project;

use crate::token::Token;
use crate::{Canonicalizer, CanonicalizerOptions, Error, Result};

/**
Asynchronous source of individual XML tokens

This is the asynchronous counterpart of [`TokenRead`](crate::TokenRead).
*/
pub trait AsyncTokenRead {
	/// Poll for a single token from the source.
	///
	/// `Ok(None)` indicates the end of the source.
	fn poll_read(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<Option<Token>>>;
}

impl<T: AsyncTokenRead + Unpin + ?Sized> AsyncTokenRead for &mut T {
	fn poll_read(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<Option<Token>>> {
		let this: &mut &mut T = Pin::into_inner(self);
		let this: &mut T = *this;
		let this = Pin::new(this);
		this.poll_read(cx)
	}
}

pin_project! {
	/**
	# Future canonicalizing the document element of an asynchronous source

	Created by [`canonicalize_async`] and
	[`canonicalize_async_with_options`].
	*/
	pub struct Canonicalize<T> {
		canonicalizer: Canonicalizer,
		#[pin]
		source: T,
	}
}

impl<T: AsyncTokenRead> Canonicalize<T> {
	/// Number of elements opened so far and not yet closed.
	pub fn depth(&self) -> usize {
		self.canonicalizer.depth()
	}
}

impl<T: AsyncTokenRead> Future for Canonicalize<T> {
	type Output = Result<Bytes>;

	fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
		let mut this = self.project();
		loop {
			let token = match this.source.as_mut().poll_read(cx) {
				Poll::Pending => return Poll::Pending,
				Poll::Ready(Ok(Some(token))) => token,
				Poll::Ready(Ok(None)) => {
					this.canonicalizer.reset();
					return Poll::Ready(Err(Error::UnexpectedEof));
				}
				Poll::Ready(Err(e)) => {
					this.canonicalizer.reset();
					return Poll::Ready(Err(e));
				}
			};
			match this.canonicalizer.process(token) {
				Ok(Some(out)) => return Poll::Ready(Ok(out)),
				Ok(None) => (),
				Err(e) => return Poll::Ready(Err(e)),
			}
		}
	}
}

/**
Canonicalize the document element read from an asynchronous `source`.

# Example

```
use std::pin::Pin;
use std::task::{Context, Poll};
use exc14n::{QName, Result, Token};
use exc14n::future::{canonicalize_async, AsyncTokenRead};

struct Queue(Vec<Token>);

impl AsyncTokenRead for Queue {
	fn poll_read(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<Option<Token>>> {
		let tokens = &mut self.get_mut().0;
		Poll::Ready(Ok(if tokens.is_empty() { None } else { Some(tokens.remove(0)) }))
	}
}

# tokio_test::block_on(async {
let source = Queue(vec![
	Token::StartElement(QName::unprefixed("hello"), vec![]),
	Token::Text("World!".to_string()),
	Token::EndElement(QName::unprefixed("hello")),
]);
let out = canonicalize_async(source).await.unwrap();
assert_eq!(&out[..], &b"<hello>World!</hello>"[..]);
# })
```
*/
pub fn canonicalize_async<T: AsyncTokenRead>(source: T) -> Canonicalize<T> {
	canonicalize_async_with_options(source, CanonicalizerOptions::default())
}

/// Canonicalize the document element read from an asynchronous `source`
/// using the given options.
pub fn canonicalize_async_with_options<T: AsyncTokenRead>(
	source: T,
	opts: CanonicalizerOptions,
) -> Canonicalize<T> {
	Canonicalize {
		canonicalizer: Canonicalizer::with_options(opts),
		source,
	}
}

#[cfg(feature = "stream")]
pin_project! {
	/// Adapter to use a [`Stream`] of tokens as [`AsyncTokenRead`].
	pub struct StreamTokens<S> {
		#[pin]
		inner: S,
	}
}

#[cfg(feature = "stream")]
impl<S> StreamTokens<S> {
	pub fn new(inner: S) -> Self {
		Self { inner }
	}

	/// Return the wrapped stream.
	pub fn into_inner(self) -> S {
		self.inner
	}
}

#[cfg(feature = "stream")]
impl<S: Stream<Item = Result<Token>>> AsyncTokenRead for StreamTokens<S> {
	fn poll_read(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<Option<Token>>> {
		match self.project().inner.poll_next(cx) {
			Poll::Pending => Poll::Pending,
			Poll::Ready(Some(Ok(token))) => Poll::Ready(Ok(Some(token))),
			Poll::Ready(Some(Err(e))) => Poll::Ready(Err(e)),
			Poll::Ready(None) => Poll::Ready(Ok(None)),
		}
	}
}
