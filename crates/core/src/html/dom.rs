//! Tolerant element index over an HTML string.
//!
//! The document is scanned once with a tag regex and turned into a flat list
//! of elements with parent links and byte ranges into the source. Unclosed
//! elements are closed implicitly when an ancestor closes or at end of input,
//! which is enough structure for selector matching on real-world markup.

use std::ops::Range;
use std::sync::LazyLock;

use regex_lite::Regex;

use super::selector::Selector;
use super::text::{decode_html_entities, html_to_text};

static TAG_RE: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(r#"(?s)<!--.*?-->|<!\[CDATA\[.*?\]\]>|<[!?][^>]*>|<(/)?([A-Za-z][A-Za-z0-9:_-]*)((?:[^>"']|"[^"]*"|'[^']*')*)>"#)
		.expect("TAG_RE regex should compile")
});
static ATTR_RE: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(r#"([^\s"'<>/=]+)(?:\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'=<>`]+)))?"#).expect("ATTR_RE regex should compile")
});

const VOID_ELEMENTS: &[&str] = &[
	"area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source", "track", "wbr",
];
const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style", "textarea", "title"];

#[derive(Debug, Clone)]
pub(crate) struct Node {
	pub(crate) tag: String,
	pub(crate) attrs: Vec<(String, String)>,
	pub(crate) parent: Option<usize>,
	inner: Range<usize>,
	outer: Range<usize>,
}

/// Parsed HTML document.
#[derive(Debug, Clone)]
pub struct Document {
	source: String,
	nodes: Vec<Node>,
}

impl Document {
	pub fn parse(html: impl Into<String>) -> Self {
		let source = html.into();
		let nodes = index_elements(&source);
		Self { source, nodes }
	}

	pub fn source(&self) -> &str {
		&self.source
	}

	/// All elements matching `selector`, in document order.
	pub fn select(&self, selector: &Selector) -> Vec<Element<'_>> {
		(0..self.nodes.len()).filter(|&i| selector.matches(self, i)).map(|index| Element { doc: self, index }).collect()
	}

	pub fn select_first(&self, selector: &Selector) -> Option<Element<'_>> {
		(0..self.nodes.len()).find(|&i| selector.matches(self, i)).map(|index| Element { doc: self, index })
	}

	/// Parses `selector` and selects with it; an invalid selector matches nothing.
	pub fn find(&self, selector: &str) -> Vec<Element<'_>> {
		match Selector::parse(selector) {
			Ok(parsed) => self.select(&parsed),
			Err(e) => {
				tracing::debug!(target = "seatwatch.html", selector, error = %e, "ignoring invalid selector");
				Vec::new()
			}
		}
	}

	pub fn find_first(&self, selector: &str) -> Option<Element<'_>> {
		Selector::parse(selector).ok().and_then(|parsed| self.select_first(&parsed))
	}

	/// Visible text of the whole document.
	pub fn text(&self) -> String {
		html_to_text(&self.source)
	}

	pub(crate) fn node(&self, index: usize) -> &Node {
		&self.nodes[index]
	}

	pub(crate) fn inner_html_at(&self, index: usize) -> &str {
		&self.source[self.nodes[index].inner.clone()]
	}
}

/// Borrowed view of one element.
#[derive(Clone, Copy)]
pub struct Element<'a> {
	doc: &'a Document,
	index: usize,
}

impl std::fmt::Debug for Element<'_> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Element").field("tag", &self.tag()).field("attrs", &self.node().attrs).finish()
	}
}

impl<'a> Element<'a> {
	fn node(&self) -> &'a Node {
		self.doc.node(self.index)
	}

	pub fn tag(&self) -> &'a str {
		&self.node().tag
	}

	/// Attribute value with entities decoded. Names are matched case-insensitively.
	pub fn attr(&self, name: &str) -> Option<String> {
		self.node()
			.attrs
			.iter()
			.find(|(k, _)| k.eq_ignore_ascii_case(name))
			.map(|(_, v)| decode_html_entities(v))
	}

	pub fn has_attr(&self, name: &str) -> bool {
		self.node().attrs.iter().any(|(k, _)| k.eq_ignore_ascii_case(name))
	}

	pub fn has_class(&self, class: &str) -> bool {
		self.attr("class").is_some_and(|classes| classes.split_ascii_whitespace().any(|c| c == class))
	}

	pub fn inner_html(&self) -> &'a str {
		let node = self.node();
		&self.doc.source[node.inner.clone()]
	}

	pub fn outer_html(&self) -> &'a str {
		let node = self.node();
		&self.doc.source[node.outer.clone()]
	}

	/// Visible text content, whitespace-collapsed.
	pub fn text(&self) -> String {
		html_to_text(self.inner_html())
	}

	pub fn parent(&self) -> Option<Element<'a>> {
		self.node().parent.map(|index| Element { doc: self.doc, index })
	}

	/// Descendants of this element matching `selector`.
	pub fn select(&self, selector: &Selector) -> Vec<Element<'a>> {
		let outer = self.node().outer.clone();
		let doc = self.doc;
		(self.index + 1..doc.nodes.len())
			.take_while(|&i| doc.nodes[i].outer.start < outer.end)
			.filter(|&i| doc.is_descendant(i, self.index) && selector.matches(doc, i))
			.map(|index| Element { doc, index })
			.collect()
	}

	pub fn find(&self, selector: &str) -> Vec<Element<'a>> {
		Selector::parse(selector).map(|parsed| self.select(&parsed)).unwrap_or_default()
	}

	pub fn find_first(&self, selector: &str) -> Option<Element<'a>> {
		self.find(selector).into_iter().next()
	}

	/// Nearest ancestor (or self) carrying attribute `name`.
	pub fn closest_attr(&self, name: &str) -> Option<String> {
		let mut current = Some(*self);
		while let Some(el) = current {
			if let Some(value) = el.attr(name) {
				return Some(value);
			}
			current = el.parent();
		}
		None
	}
}

impl Document {
	fn is_descendant(&self, index: usize, ancestor: usize) -> bool {
		let mut current = self.nodes[index].parent;
		while let Some(p) = current {
			if p == ancestor {
				return true;
			}
			current = self.nodes[p].parent;
		}
		false
	}
}

fn parse_attrs(raw: &str) -> Vec<(String, String)> {
	ATTR_RE
		.captures_iter(raw)
		.filter_map(|caps| {
			let name = caps.get(1)?.as_str().to_ascii_lowercase();
			let value = caps.get(2).or_else(|| caps.get(3)).or_else(|| caps.get(4)).map(|m| m.as_str().to_string()).unwrap_or_default();
			Some((name, value))
		})
		.collect()
}

fn index_elements(source: &str) -> Vec<Node> {
	let mut nodes: Vec<Node> = Vec::new();
	let mut open: Vec<usize> = Vec::new();
	let mut pos = 0;

	while let Some(caps) = TAG_RE.captures_at(source, pos) {
		let Some(whole) = caps.get(0) else { break };
		pos = whole.end();

		let Some(name) = caps.get(2) else {
			// Comment, doctype or processing instruction.
			continue;
		};
		let tag = name.as_str().to_ascii_lowercase();

		if caps.get(1).is_some() {
			if let Some(depth) = open.iter().rposition(|&i| nodes[i].tag == tag) {
				for &i in &open[depth..] {
					nodes[i].inner.end = whole.start();
					nodes[i].outer.end = if i == open[depth] { whole.end() } else { whole.start() };
				}
				open.truncate(depth);
			}
			continue;
		}

		let raw_attrs = caps.get(3).map(|m| m.as_str()).unwrap_or("");
		let self_closing = raw_attrs.trim_end().ends_with('/');
		let attr_text = if self_closing { raw_attrs.trim_end().trim_end_matches('/') } else { raw_attrs };
		let index = nodes.len();
		nodes.push(Node {
			attrs: parse_attrs(attr_text),
			parent: open.last().copied(),
			inner: whole.end()..whole.end(),
			outer: whole.start()..whole.end(),
			tag: tag.clone(),
		});

		if self_closing || VOID_ELEMENTS.contains(&tag.as_str()) {
			continue;
		}

		if RAW_TEXT_ELEMENTS.contains(&tag.as_str()) {
			let close = format!("</{}", tag);
			let rest = &source[whole.end()..];
			let end = find_ignore_ascii_case(rest, &close).map(|off| whole.end() + off).unwrap_or(source.len());
			let close_end = source[end..].find('>').map(|off| end + off + 1).unwrap_or(source.len());
			nodes[index].inner.end = end;
			nodes[index].outer.end = close_end;
			pos = close_end;
			continue;
		}

		open.push(index);
	}

	for &i in &open {
		nodes[i].inner.end = source.len();
		nodes[i].outer.end = source.len();
	}
	nodes
}

fn find_ignore_ascii_case(haystack: &str, needle: &str) -> Option<usize> {
	let hay = haystack.as_bytes();
	let pat = needle.as_bytes();
	if pat.is_empty() || hay.len() < pat.len() {
		return None;
	}
	(0..=hay.len() - pat.len()).find(|&i| hay[i..i + pat.len()].eq_ignore_ascii_case(pat))
}
