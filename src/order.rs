/*!
# Document order of attributes

Canonical XML serializes the namespace and attribute nodes of an element in
document order:

1. The default namespace declaration, if any, comes first.
2. All other namespace declarations follow, sorted by the prefix they declare.
3. Ordinary attributes come last, sorted by namespace URI and then by local
   name. Unprefixed attributes take the URI of the default namespace in
   scope, or the empty URI if there is none, which sorts lowest.

All comparisons are byte-wise.
*/
use std::cmp::Ordering;

use crate::scope::NamespaceScopes;
use crate::token::{Attribute, Name};

/// Sort key of a single attribute.
///
/// The variant order is the order of the groups in the output.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum SortKey {
	DefaultNamespace,
	Namespace(Name),
	Attribute(String, Name),
}

/// Orders the attributes of one element.
///
/// Resolving attribute prefixes goes through [`NamespaceScopes::get`] and
/// thus marks the resolving declarations as used.
pub struct AttributeOrderer<'s> {
	scopes: &'s mut NamespaceScopes,
}

impl<'s> AttributeOrderer<'s> {
	pub fn new(scopes: &'s mut NamespaceScopes) -> Self {
		Self { scopes }
	}

	pub fn key(&mut self, attr: &Attribute) -> SortKey {
		match attr.name.declared_prefix() {
			Some(None) => SortKey::DefaultNamespace,
			Some(Some(prefix)) => SortKey::Namespace(prefix.into()),
			None => {
				let uri = self.scopes.get(attr.name.prefix()).to_string();
				SortKey::Attribute(uri, attr.name.local.clone())
			}
		}
	}

	pub fn compare(&mut self, a: &Attribute, b: &Attribute) -> Ordering {
		self.key(a).cmp(&self.key(b))
	}

	/// Sort `attrs` in place.
	///
	/// Each key is computed once. Distinct qualified names never compare
	/// equal unless two prefixes are bound to the same URI and used with the
	/// same local name, which is not namespace-well-formed.
	pub fn sort(&mut self, attrs: &mut Vec<Attribute>) {
		let mut keyed: Vec<(SortKey, Attribute)> = attrs
			.drain(..)
			.map(|attr| (self.key(&attr), attr))
			.collect();
		keyed.sort_by(|a, b| a.0.cmp(&b.0));
		attrs.extend(keyed.into_iter().map(|(_, attr)| attr));
	}
}
