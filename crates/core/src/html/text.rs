//! Text cleanup helpers shared by element extraction.

use std::sync::LazyLock;

use regex_lite::Regex;

static SCRIPT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?is)<script[^>]*>.*?</script\s*>").expect("SCRIPT_RE regex should compile"));
static STYLE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?is)<style[^>]*>.*?</style\s*>").expect("STYLE_RE regex should compile"));
static COMMENT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->").expect("COMMENT_RE regex should compile"));
static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").expect("TAG_RE regex should compile"));
static NUMERIC_ENTITY: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"&#(x[0-9a-fA-F]+|[0-9]+);").expect("NUMERIC_ENTITY regex should compile"));
static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("WHITESPACE regex should compile"));

/// Decodes the named entities common in ticketing markup plus numeric references.
pub fn decode_html_entities(s: &str) -> String {
	let named = s
		.replace("&lt;", "<")
		.replace("&gt;", ">")
		.replace("&quot;", "\"")
		.replace("&#39;", "'")
		.replace("&apos;", "'")
		.replace("&nbsp;", " ");

	let numeric = NUMERIC_ENTITY.replace_all(&named, |caps: &regex_lite::Captures| {
		let raw = &caps[1];
		let code = match raw.strip_prefix('x') {
			Some(hex) => u32::from_str_radix(hex, 16).ok(),
			None => raw.parse::<u32>().ok(),
		};
		code.and_then(char::from_u32).map(String::from).unwrap_or_else(|| caps[0].to_string())
	});

	// `&amp;` last so "&amp;lt;" stays literal.
	numeric.replace("&amp;", "&")
}

/// Collapses every whitespace run to one space and trims the ends.
pub fn collapse_whitespace(s: &str) -> String {
	WHITESPACE.replace_all(s, " ").trim().to_string()
}

/// Visible text of an HTML fragment.
pub fn html_to_text(fragment: &str) -> String {
	let stripped = SCRIPT_RE.replace_all(fragment, " ");
	let stripped = STYLE_RE.replace_all(&stripped, " ");
	let stripped = COMMENT_RE.replace_all(&stripped, " ");
	let stripped = TAG_RE.replace_all(&stripped, " ");
	collapse_whitespace(&decode_html_entities(&stripped))
}

/// Case-insensitive substring test.
pub fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
	haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// Shortens `text` to at most `max` characters on a char boundary.
pub fn snippet(text: &str, max: usize) -> String {
	match text.char_indices().nth(max) {
		Some((idx, _)) => format!("{}…", &text[..idx]),
		None => text.to_string(),
	}
}
