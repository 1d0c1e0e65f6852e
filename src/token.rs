/*!
# Input tokens

The canonicalizer consumes [`Token`]s which carry names exactly as they were
written in the source document, i.e. with their namespace prefixes unresolved.
Character data and attribute values are expected to be decoded already
(references expanded, line endings normalized).
*/
use std::fmt;

/// Short string type used for prefixes, local names and PI targets.
pub type Name = smartstring::alias::String;

/// Prefix reserved for namespace declarations (`xmlns:foo="..."`).
pub const PREFIX_XMLNS: &'static str = "xmlns";
/// Prefix implicitly bound to [`XMLNS_XML`].
pub const PREFIX_XML: &'static str = "xml";
/// XML core namespace URI (for the `xml:` prefix)
pub const XMLNS_XML: &'static str = "http://www.w3.org/XML/1998/namespace";

/// Qualified name as written in the source document.
///
/// An absent prefix and an empty prefix are the same thing; [`QName::new`]
/// folds the latter into the former.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QName {
	/// Namespace prefix, `None` for unprefixed names
	pub prefix: Option<Name>,
	/// Local part of the name
	pub local: Name,
}

impl QName {
	pub fn new(prefix: Option<&str>, local: &str) -> Self {
		Self {
			prefix: match prefix {
				Some(p) if !p.is_empty() => Some(p.into()),
				_ => None,
			},
			local: local.into(),
		}
	}

	/// Construct an unprefixed name.
	pub fn unprefixed(local: &str) -> Self {
		Self::new(None, local)
	}

	/// Split a raw `prefix:local` name at its first colon.
	///
	/// ```
	/// use exc14n::QName;
	/// let name = QName::parse("ds:Signature");
	/// assert_eq!(name.prefix.as_deref(), Some("ds"));
	/// assert_eq!(name.local, "Signature");
	/// assert_eq!(QName::parse("root").prefix, None);
	/// ```
	pub fn parse(raw: &str) -> Self {
		match raw.find(':') {
			Some(idx) => Self::new(Some(&raw[..idx]), &raw[idx + 1..]),
			None => Self::unprefixed(raw),
		}
	}

	pub fn prefix(&self) -> Option<&str> {
		self.prefix.as_deref()
	}

	/// If this names a namespace declaration attribute, return the prefix it
	/// declares.
	///
	/// `xmlns` declares the default namespace (`Some(None)`), `xmlns:foo`
	/// declares `foo` (`Some(Some("foo"))`). Any other name returns `None`.
	pub fn declared_prefix(&self) -> Option<Option<&str>> {
		match self.prefix() {
			None if self.local == PREFIX_XMLNS => Some(None),
			Some(PREFIX_XMLNS) => Some(Some(&self.local)),
			_ => None,
		}
	}
}

impl fmt::Display for QName {
	fn fmt<'f>(&self, f: &'f mut fmt::Formatter) -> fmt::Result {
		match self.prefix() {
			Some(prefix) => write!(f, "{}:{}", prefix, self.local),
			None => f.write_str(&self.local),
		}
	}
}

/// A single attribute of an element start tag, including namespace
/// declarations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Attribute {
	pub name: QName,
	pub value: String,
}

impl Attribute {
	pub fn new<V: Into<String>>(name: QName, value: V) -> Self {
		Self {
			name,
			value: value.into(),
		}
	}

	/// Construct the declaration of `prefix` (the default namespace if
	/// `None`) as an attribute.
	pub fn namespace_declaration<V: Into<String>>(prefix: Option<&str>, uri: V) -> Self {
		let name = match prefix {
			Some(prefix) => QName::new(Some(PREFIX_XMLNS), prefix),
			None => QName::unprefixed(PREFIX_XMLNS),
		};
		Self::new(name, uri)
	}
}

/**
# Structural piece of an XML document

Tokens are produced by an external tokenizer, one at a time, in document
order. [`Token::StartElement`] and [`Token::EndElement`] are expected to be
well nested; this is not checked.
*/
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Token {
	/// Start tag of an element.
	StartElement(
		/// Name of the element
		QName,
		/// Attributes in source order, including namespace declarations
		Vec<Attribute>,
	),

	/// End tag of an element. Empty-element tags are expected to be reported
	/// as a start and an end token.
	EndElement(QName),

	/// Character data, fully decoded.
	Text(String),

	/// Processing instruction. The XML declaration is reported with target
	/// `xml`.
	ProcessingInstruction(
		/// Target
		Name,
		/// Instruction body, without the whitespace separating it from the
		/// target
		String,
	),

	/// Comment. Exclusive canonicalization without comments drops these.
	Comment(String),

	/// Any other markup declaration, most notably a document type
	/// declaration. Never part of the canonical form.
	Directive(String),
}
