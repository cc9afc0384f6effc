//! CSS selector subset used by site profiles.
//!
//! Supported: type and universal selectors, `.class`, `#id`, attribute
//! filters (`[a]`, `[a=v]`, `[a*=v]`, `[a^=v]`, `[a$=v]`, `[a~=v]`),
//! `:not(...)`, `:contains("text")`, descendant and child combinators and
//! comma-separated lists.

use thiserror::Error;

use super::dom::Document;
use super::text::{contains_ignore_case, html_to_text};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("invalid selector {selector:?}: {message}")]
pub struct SelectorError {
	pub selector: String,
	pub message: String,
}

/// Compiled selector list.
#[derive(Debug, Clone, PartialEq)]
pub struct Selector {
	source: String,
	alternatives: Vec<Vec<Part>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Combinator {
	Descendant,
	Child,
}

#[derive(Debug, Clone, PartialEq)]
struct Part {
	/// Relation to the previous part; ignored for the first.
	combinator: Combinator,
	compound: Compound,
}

#[derive(Debug, Clone, Default, PartialEq)]
struct Compound {
	tag: Option<String>,
	ids: Vec<String>,
	classes: Vec<String>,
	attrs: Vec<AttrFilter>,
	negations: Vec<Compound>,
	contains: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
struct AttrFilter {
	name: String,
	op: AttrOp,
	value: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AttrOp {
	Exists,
	Equals,
	Contains,
	Prefix,
	Suffix,
	Word,
}

impl Selector {
	pub fn parse(selector: &str) -> Result<Self, SelectorError> {
		let mut parser = Parser {
			input: selector,
			pos: 0,
		};
		let alternatives = parser.selector_list().map_err(|message| SelectorError {
			selector: selector.to_string(),
			message,
		})?;
		Ok(Self {
			source: selector.to_string(),
			alternatives,
		})
	}

	pub fn as_str(&self) -> &str {
		&self.source
	}

	pub(crate) fn matches(&self, doc: &Document, index: usize) -> bool {
		self.alternatives.iter().any(|parts| match_parts(doc, index, parts))
	}
}

impl std::fmt::Display for Selector {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(&self.source)
	}
}

fn match_parts(doc: &Document, index: usize, parts: &[Part]) -> bool {
	let Some((last, rest)) = parts.split_last() else {
		return false;
	};
	if !last.compound.matches(doc, index) {
		return false;
	}
	if rest.is_empty() {
		return true;
	}

	let mut ancestor = doc.node(index).parent;
	match last.combinator {
		Combinator::Child => ancestor.is_some_and(|p| match_parts(doc, p, rest)),
		Combinator::Descendant => {
			while let Some(p) = ancestor {
				if match_parts(doc, p, rest) {
					return true;
				}
				ancestor = doc.node(p).parent;
			}
			false
		}
	}
}

impl Compound {
	fn matches(&self, doc: &Document, index: usize) -> bool {
		let node = doc.node(index);
		let attr = |name: &str| node.attrs.iter().find(|(k, _)| k == name).map(|(_, v)| v.as_str());

		if let Some(tag) = &self.tag {
			if &node.tag != tag {
				return false;
			}
		}
		if !self.ids.iter().all(|id| attr("id") == Some(id.as_str())) {
			return false;
		}
		if !self.classes.is_empty() {
			let classes = attr("class").unwrap_or("");
			if !self.classes.iter().all(|c| classes.split_ascii_whitespace().any(|have| have == c)) {
				return false;
			}
		}
		for filter in &self.attrs {
			let Some(value) = attr(&filter.name) else {
				return false;
			};
			let ok = match filter.op {
				AttrOp::Exists => true,
				AttrOp::Equals => value == filter.value,
				AttrOp::Contains => value.contains(&filter.value),
				AttrOp::Prefix => value.starts_with(&filter.value),
				AttrOp::Suffix => value.ends_with(&filter.value),
				AttrOp::Word => value.split_ascii_whitespace().any(|w| w == filter.value),
			};
			if !ok {
				return false;
			}
		}
		if self.negations.iter().any(|n| n.matches(doc, index)) {
			return false;
		}
		if !self.contains.is_empty() {
			let text = html_to_text(doc.inner_html_at(index));
			if !self.contains.iter().all(|needle| contains_ignore_case(&text, needle)) {
				return false;
			}
		}
		true
	}

	fn is_empty(&self) -> bool {
		self == &Compound::default()
	}
}

struct Parser<'a> {
	input: &'a str,
	pos: usize,
}

type ParseResult<T> = std::result::Result<T, String>;

impl Parser<'_> {
	fn peek(&self) -> Option<char> {
		self.input[self.pos..].chars().next()
	}

	fn bump(&mut self) -> Option<char> {
		let c = self.peek()?;
		self.pos += c.len_utf8();
		Some(c)
	}

	fn eat(&mut self, expected: char) -> bool {
		if self.peek() == Some(expected) {
			self.pos += expected.len_utf8();
			true
		} else {
			false
		}
	}

	fn skip_ws(&mut self) -> bool {
		let start = self.pos;
		while self.peek().is_some_and(char::is_whitespace) {
			self.bump();
		}
		self.pos > start
	}

	fn selector_list(&mut self) -> ParseResult<Vec<Vec<Part>>> {
		let mut list = vec![self.complex()?];
		while self.eat(',') {
			list.push(self.complex()?);
		}
		if let Some(c) = self.peek() {
			return Err(format!("unexpected {:?} at offset {}", c, self.pos));
		}
		Ok(list)
	}

	fn complex(&mut self) -> ParseResult<Vec<Part>> {
		self.skip_ws();
		let mut parts = vec![Part {
			combinator: Combinator::Descendant,
			compound: self.compound()?,
		}];

		loop {
			let had_ws = self.skip_ws();
			let combinator = match self.peek() {
				None | Some(',') | Some(')') => break,
				Some('>') => {
					self.bump();
					self.skip_ws();
					Combinator::Child
				}
				Some(_) if had_ws => Combinator::Descendant,
				Some(c) => return Err(format!("unexpected {:?} at offset {}", c, self.pos)),
			};
			parts.push(Part {
				combinator,
				compound: self.compound()?,
			});
		}
		Ok(parts)
	}

	fn compound(&mut self) -> ParseResult<Compound> {
		let mut compound = Compound::default();

		let universal = self.eat('*');
		if !universal && self.peek().is_some_and(is_ident_char) {
			compound.tag = Some(self.ident()?.to_ascii_lowercase());
		}

		loop {
			match self.peek() {
				Some('.') => {
					self.bump();
					compound.classes.push(self.ident()?);
				}
				Some('#') => {
					self.bump();
					compound.ids.push(self.ident()?);
				}
				Some('[') => {
					self.bump();
					compound.attrs.push(self.attr_filter()?);
				}
				Some(':') => {
					self.bump();
					let pseudo = self.ident()?.to_ascii_lowercase();
					if !self.eat('(') {
						return Err(format!("pseudo-class :{} needs an argument", pseudo));
					}
					match pseudo.as_str() {
						"not" => {
							self.skip_ws();
							compound.negations.push(self.compound()?);
							self.skip_ws();
						}
						"contains" | "has-text" => {
							self.skip_ws();
							compound.contains.push(self.value()?);
							self.skip_ws();
						}
						other => return Err(format!("unsupported pseudo-class :{}", other)),
					}
					if !self.eat(')') {
						return Err(format!("unclosed :{}(", pseudo));
					}
				}
				_ => break,
			}
		}

		if compound.is_empty() && !universal {
			return Err(format!("expected selector at offset {}", self.pos));
		}
		Ok(compound)
	}

	fn attr_filter(&mut self) -> ParseResult<AttrFilter> {
		self.skip_ws();
		let name = self.ident()?.to_ascii_lowercase();
		self.skip_ws();

		let op = match self.bump() {
			Some(']') => {
				return Ok(AttrFilter {
					name,
					op: AttrOp::Exists,
					value: String::new(),
				});
			}
			Some('=') => AttrOp::Equals,
			Some(c @ ('*' | '^' | '$' | '~')) => {
				if !self.eat('=') {
					return Err(format!("expected '=' after '{}'", c));
				}
				match c {
					'*' => AttrOp::Contains,
					'^' => AttrOp::Prefix,
					'$' => AttrOp::Suffix,
					_ => AttrOp::Word,
				}
			}
			other => return Err(format!("unexpected {:?} in attribute filter", other)),
		};

		self.skip_ws();
		let value = self.value()?;
		self.skip_ws();
		if !self.eat(']') {
			return Err("unclosed attribute filter".into());
		}
		Ok(AttrFilter { name, op, value })
	}

	fn value(&mut self) -> ParseResult<String> {
		match self.peek() {
			Some(quote @ ('"' | '\'')) => {
				self.bump();
				let start = self.pos;
				while let Some(c) = self.bump() {
					if c == quote {
						return Ok(self.input[start..self.pos - 1].to_string());
					}
				}
				Err("unterminated string".into())
			}
			_ => self.ident(),
		}
	}

	fn ident(&mut self) -> ParseResult<String> {
		let start = self.pos;
		while self.peek().is_some_and(is_ident_char) {
			self.bump();
		}
		if self.pos == start {
			return Err(format!("expected identifier at offset {}", start));
		}
		Ok(self.input[start..self.pos].to_string())
	}
}

fn is_ident_char(c: char) -> bool {
	c.is_alphanumeric() || c == '-' || c == '_'
}

/// Ordered selector alternatives for one page element, tried until one matches.
#[derive(Debug, Clone, Default)]
pub struct SelectorChain {
	selectors: Vec<Selector>,
}

impl SelectorChain {
	pub fn parse<S: AsRef<str>>(selectors: &[S]) -> Result<Self, SelectorError> {
		let selectors = selectors.iter().map(|s| Selector::parse(s.as_ref())).collect::<Result<Vec<_>, _>>()?;
		Ok(Self { selectors })
	}

	pub fn is_empty(&self) -> bool {
		self.selectors.is_empty()
	}

	/// Matches of the first selector that finds anything, with that selector.
	pub fn first_match<'d>(&self, doc: &'d Document) -> Option<(&Selector, Vec<super::Element<'d>>)> {
		self.selectors.iter().find_map(|selector| {
			let found = doc.select(selector);
			(!found.is_empty()).then_some((selector, found))
		})
	}

	/// Like [`SelectorChain::first_match`] but scoped to descendants of `root`.
	pub fn first_match_in<'d>(&self, root: &super::Element<'d>) -> Option<Vec<super::Element<'d>>> {
		self.selectors.iter().map(|selector| root.select(selector)).find(|found| !found.is_empty())
	}

	pub fn matches_any(&self, doc: &Document) -> bool {
		self.selectors.iter().any(|selector| doc.select_first(selector).is_some())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn count(html: &str, selector: &str) -> usize {
		Document::parse(html).select(&Selector::parse(selector).unwrap()).len()
	}

	#[test]
	fn matches_classes_ids_and_attributes() {
		let html = r#"<div id="main" class="event card"><a href="/en/events/derby-12" data-testid="buy-ticket-button">Buy</a></div>"#;
		assert_eq!(count(html, ".event.card"), 1);
		assert_eq!(count(html, "div#main"), 1);
		assert_eq!(count(html, r#"a[href*="/events/"]"#), 1);
		assert_eq!(count(html, "a[href^='/en']"), 1);
		assert_eq!(count(html, "a[href$=-12]"), 1);
		assert_eq!(count(html, r#"[data-testid="buy-ticket-button"]"#), 1);
		assert_eq!(count(html, "[data-testid=other]"), 0);
	}

	#[test]
	fn combinators_and_lists() {
		let html = "<section class=seats><div class=row><span class=seat></span></div></section><span class=seat></span>";
		assert_eq!(count(html, ".seats .seat"), 1);
		assert_eq!(count(html, ".seats > .seat"), 0);
		assert_eq!(count(html, ".row > .seat"), 1);
		assert_eq!(count(html, ".row, .seats"), 2);
	}

	#[test]
	fn negation_and_text_filters() {
		let html = "<span class='seat'>1</span><span class='seat sold-out'>2</span><button>Book Now</button>";
		assert_eq!(count(html, ".seat:not(.sold-out)"), 1);
		assert_eq!(count(html, "button:contains('book now')"), 1);
		assert_eq!(count(html, "button:contains(Cancel)"), 0);
	}

	#[test]
	fn rejects_malformed_selectors() {
		assert!(Selector::parse("div[").is_err());
		assert!(Selector::parse(".").is_err());
		assert!(Selector::parse(":hover").is_err());
		assert!(Selector::parse("a,").is_err());
		let err = Selector::parse("a[href~]").unwrap_err();
		assert!(err.to_string().contains("a[href~]"));
	}

	#[test]
	fn chain_stops_at_first_matching_selector() {
		let doc = Document::parse("<div class=b>one</div><div class=c>two</div>");
		let chain = SelectorChain::parse(&[".a", ".c", ".b"]).unwrap();
		let (selector, found) = chain.first_match(&doc).unwrap();
		assert_eq!(selector.as_str(), ".c");
		assert_eq!(found[0].text(), "two");
	}
}
