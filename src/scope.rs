/*!
# Namespace scope tracking

Two stacks with one frame per open element:

* [`NamespaceScopes`] records the namespace declarations found in the input,
  together with a flag telling whether a declaration was used to resolve a
  name.
* [`RenderedScopes`] records the declarations which were written to the
  output.

Both are backed by a frame arena addressed by nesting depth: popping a frame
only decrements the depth, so the allocations of a frame are reused by the
next sibling element.
*/
use std::collections::BTreeMap;

use crate::token::{Name, PREFIX_XML, XMLNS_XML};

/// Prefix of a namespace binding; `None` is the default namespace.
pub type Prefix = Option<Name>;

struct Frame<T> {
	entries: Vec<(Prefix, T)>,
}

impl<T> Frame<T> {
	fn position(&self, prefix: Option<&str>) -> Option<usize> {
		self.entries
			.iter()
			.position(|(p, _)| p.as_deref() == prefix)
	}

	fn insert(&mut self, prefix: Prefix, value: T) {
		match self.position(prefix.as_deref()) {
			Some(idx) => self.entries[idx].1 = value,
			None => self.entries.push((prefix, value)),
		}
	}
}

struct FrameArena<T> {
	frames: Vec<Frame<T>>,
	depth: usize,
}

impl<T> FrameArena<T> {
	fn new() -> Self {
		Self {
			frames: Vec::new(),
			depth: 0,
		}
	}

	fn push<I: IntoIterator<Item = (Prefix, T)>>(&mut self, entries: I) {
		if self.depth == self.frames.len() {
			self.frames.push(Frame {
				entries: Vec::new(),
			});
		}
		let frame = &mut self.frames[self.depth];
		frame.entries.clear();
		for (prefix, value) in entries {
			frame.insert(prefix, value);
		}
		self.depth += 1;
	}

	fn pop(&mut self) {
		assert!(self.depth > 0, "pop on empty namespace scope stack");
		self.depth -= 1;
		self.frames[self.depth].entries.clear();
	}

	fn live(&self) -> &[Frame<T>] {
		&self.frames[..self.depth]
	}

	/// Locate the nearest binding of `prefix` as (frame index, entry index).
	fn find(&self, prefix: Option<&str>) -> Option<(usize, usize)> {
		self.live()
			.iter()
			.enumerate()
			.rev()
			.find_map(|(i, frame)| frame.position(prefix).map(|j| (i, j)))
	}

	fn innermost(&self) -> Option<&Frame<T>> {
		self.live().last()
	}
}

struct Declaration {
	uri: String,
	used: bool,
}

/**
# Namespace declarations of the input document

Lookups scan the frames from the innermost to the outermost one. A successful
lookup through [`NamespaceScopes::get`] marks the resolving entry as used.

The `xml` prefix is always bound to [`XMLNS_XML`], but that binding is not
part of any frame: it is never reported by [`NamespaceScopes::resolved`].
An explicit declaration of `xml` is an ordinary entry.
*/
pub struct NamespaceScopes {
	arena: FrameArena<Declaration>,
}

impl NamespaceScopes {
	pub fn new() -> Self {
		Self {
			arena: FrameArena::new(),
		}
	}

	/// Open a new frame holding the given declarations, all of them unused.
	///
	/// If a prefix occurs more than once, the last occurrence wins.
	pub fn push<I: IntoIterator<Item = (Prefix, String)>>(&mut self, declared: I) {
		self.arena.push(
			declared
				.into_iter()
				.map(|(prefix, uri)| (prefix, Declaration { uri, used: false })),
		)
	}

	/// Close the innermost frame.
	///
	/// # Panics
	///
	/// If the stack is empty.
	pub fn pop(&mut self) {
		self.arena.pop()
	}

	/// Number of open frames.
	pub fn len(&self) -> usize {
		self.arena.depth
	}

	pub fn is_empty(&self) -> bool {
		self.arena.depth == 0
	}

	/// Resolve `prefix` to its URI, marking the resolving declaration as used.
	///
	/// Unbound prefixes resolve to the empty string.
	pub fn get(&mut self, prefix: Option<&str>) -> &str {
		match self.arena.find(prefix) {
			Some((i, j)) => {
				let decl = &mut self.arena.frames[i].entries[j].1;
				decl.used = true;
				&decl.uri
			}
			None if prefix == Some(PREFIX_XML) => XMLNS_XML,
			None => "",
		}
	}

	/// Resolve `prefix` without marking anything.
	#[cfg(test)]
	fn peek(&self, prefix: Option<&str>) -> Option<&str> {
		self.arena
			.find(prefix)
			.map(|(i, j)| self.arena.frames[i].entries[j].1.uri.as_str())
	}

	/// All bindings currently in scope, each prefix mapped to its nearest
	/// declaration.
	pub fn resolved(&self) -> BTreeMap<Prefix, &str> {
		let mut result = BTreeMap::new();
		for frame in self.arena.live() {
			for (prefix, decl) in frame.entries.iter() {
				result.insert(prefix.clone(), decl.uri.as_str());
			}
		}
		result
	}

	/// Declarations of the innermost frame which have been used so far.
	pub fn used_in_innermost_frame(&self) -> BTreeMap<Prefix, String> {
		match self.arena.innermost() {
			Some(frame) => frame
				.entries
				.iter()
				.filter(|(_, decl)| decl.used)
				.map(|(prefix, decl)| (prefix.clone(), decl.uri.clone()))
				.collect(),
			None => BTreeMap::new(),
		}
	}
}

impl Default for NamespaceScopes {
	fn default() -> Self {
		Self::new()
	}
}

/// Namespace declarations written to the output, per open element.
pub struct RenderedScopes {
	arena: FrameArena<String>,
}

impl RenderedScopes {
	pub fn new() -> Self {
		Self {
			arena: FrameArena::new(),
		}
	}

	pub fn push<I: IntoIterator<Item = (Prefix, String)>>(&mut self, rendered: I) {
		self.arena.push(rendered)
	}

	/// Close the innermost frame.
	///
	/// # Panics
	///
	/// If the stack is empty.
	pub fn pop(&mut self) {
		self.arena.pop()
	}

	pub fn len(&self) -> usize {
		self.arena.depth
	}

	pub fn is_empty(&self) -> bool {
		self.arena.depth == 0
	}

	/// URI most recently rendered for `prefix` by an open element, if any.
	pub fn get(&self, prefix: Option<&str>) -> Option<&str> {
		self.arena
			.find(prefix)
			.map(|(i, j)| self.arena.frames[i].entries[j].1.as_str())
	}
}

impl Default for RenderedScopes {
	fn default() -> Self {
		Self::new()
	}
}
