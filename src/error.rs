/*!
# Error types

This module holds the error types returned by the canonicalizer and by the
token sources shipped with this crate.
*/
use std::error;
use std::fmt;
use std::io;
use std::ops::Deref;
use std::result::Result as StdResult;
use std::sync::Arc;

/// [`std::sync::Arc`]-based around [`std::io::Error`] to allow cloning.
#[derive(Clone)]
pub struct IOErrorWrapper(Arc<io::Error>);

impl IOErrorWrapper {
	fn wrap(e: io::Error) -> IOErrorWrapper {
		IOErrorWrapper(Arc::new(e))
	}
}

impl fmt::Debug for IOErrorWrapper {
	fn fmt<'f>(&self, f: &'f mut fmt::Formatter) -> fmt::Result {
		fmt::Debug::fmt(&**self, f)
	}
}

impl fmt::Display for IOErrorWrapper {
	fn fmt<'f>(&self, f: &'f mut fmt::Formatter) -> fmt::Result {
		fmt::Display::fmt(&**self, f)
	}
}

impl PartialEq for IOErrorWrapper {
	fn eq(&self, other: &Self) -> bool {
		Arc::ptr_eq(&self.0, &other.0)
	}
}

impl AsRef<io::Error> for IOErrorWrapper {
	fn as_ref(&self) -> &io::Error {
		&*self.0
	}
}

impl Deref for IOErrorWrapper {
	type Target = io::Error;

	fn deref(&self) -> &io::Error {
		&*self.0
	}
}

/// Failure reported by a token source, kept verbatim.
///
/// Like [`IOErrorWrapper`], the inner error is shared so that [`Error`] can
/// stay `Clone`.
#[derive(Clone)]
pub struct SourceError(Arc<dyn error::Error + Send + Sync>);

impl SourceError {
	/// Access the wrapped error.
	pub fn get_ref(&self) -> &(dyn error::Error + Send + Sync + 'static) {
		&*self.0
	}
}

impl fmt::Debug for SourceError {
	fn fmt<'f>(&self, f: &'f mut fmt::Formatter) -> fmt::Result {
		fmt::Debug::fmt(&*self.0, f)
	}
}

impl fmt::Display for SourceError {
	fn fmt<'f>(&self, f: &'f mut fmt::Formatter) -> fmt::Result {
		fmt::Display::fmt(&*self.0, f)
	}
}

impl PartialEq for SourceError {
	fn eq(&self, other: &Self) -> bool {
		Arc::ptr_eq(&self.0, &other.0)
	}
}

/// Error types which may be returned from canonicalization.
///
/// All errors abort the canonicalization in progress; output produced so far
/// is discarded.
///
/// Malformed input (unbalanced tags, duplicate attributes) is **not**
/// detected by the canonicalizer and yields unspecified output rather than an
/// error. Callers which need strict validation must rely on the token source
/// to reject such input.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
	/// The token source signalled a regular end of stream before the root
	/// element was closed.
	///
	/// This indicates truncated input, not a failing source.
	UnexpectedEof,

	/// An I/O error was reported by the token source.
	IO(IOErrorWrapper),

	/// Any other failure reported by the token source, such as malformed
	/// markup or undecodable text.
	Source(SourceError),

	/// A limit configured via
	/// [`CanonicalizerOptions`](crate::CanonicalizerOptions) was exceeded.
	///
	/// The string indicates the context and should not be interpreted by user
	/// code.
	LimitExceeded(&'static str),
}

pub type Result<T> = StdResult<T, Error>;

impl Error {
	pub fn io(e: io::Error) -> Error {
		Error::IO(IOErrorWrapper::wrap(e))
	}

	/// Wrap an arbitrary token source failure.
	pub fn from_source<E: Into<Box<dyn error::Error + Send + Sync>>>(e: E) -> Error {
		Error::Source(SourceError(Arc::from(e.into())))
	}
}

impl From<io::Error> for Error {
	fn from(e: io::Error) -> Error {
		Error::io(e)
	}
}

impl From<Arc<io::Error>> for Error {
	fn from(e: Arc<io::Error>) -> Error {
		Error::IO(IOErrorWrapper(e))
	}
}

impl fmt::Display for Error {
	fn fmt<'f>(&self, f: &'f mut fmt::Formatter) -> fmt::Result {
		match self {
			Error::UnexpectedEof => f.write_str("unexpected end of input before the root element was closed"),
			Error::IO(e) => write!(f, "I/O error: {}", e),
			Error::Source(e) => write!(f, "token source error: {}", e),
			Error::LimitExceeded(ctx) => write!(f, "limit exceeded: {}", ctx),
		}
	}
}

impl error::Error for Error {
	fn source(&self) -> Option<&(dyn error::Error + 'static)> {
		match self {
			Error::IO(e) => Some(&**e),
			Error::Source(e) => Some(e.get_ref()),
			Error::UnexpectedEof | Error::LimitExceeded(_) => None,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn io_errors_convert_and_expose_source() {
		let e: Error = io::Error::new(io::ErrorKind::BrokenPipe, "gone").into();
		match &e {
			Error::IO(inner) => assert_eq!(inner.kind(), io::ErrorKind::BrokenPipe),
			other => panic!("unexpected error: {:?}", other),
		}
		assert!(error::Error::source(&e).is_some());
		assert_eq!(e.to_string(), "I/O error: gone");
	}

	#[test]
	fn source_errors_keep_their_message() {
		let e = Error::from_source("mismatched end tag");
		assert_eq!(e.to_string(), "token source error: mismatched end tag");
		assert!(error::Error::source(&e).is_some());
	}

	#[test]
	fn clones_compare_equal() {
		let e = Error::from_source("boom");
		assert_eq!(e.clone(), e);
		assert_ne!(Error::from_source("boom"), e);
		assert_eq!(Error::UnexpectedEof, Error::UnexpectedEof);
	}

	#[test]
	fn unexpected_eof_has_no_source() {
		assert!(error::Error::source(&Error::UnexpectedEof).is_none());
		assert!(error::Error::source(&Error::LimitExceeded("depth")).is_none());
	}
}
