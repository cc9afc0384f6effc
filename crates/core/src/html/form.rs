//! Form field extraction for the login and checkout steps.

use super::dom::{Document, Element};

/// A `<form>` reduced to what is needed to resubmit it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Form {
	pub action: Option<String>,
	pub method: String,
	/// Every named field with its current value, in document order.
	pub fields: Vec<(String, String)>,
}

impl Form {
	pub fn from_element(form: &Element<'_>) -> Self {
		let mut fields = Vec::new();

		for input in form.find("input[name]") {
			let Some(name) = input.attr("name") else { continue };
			let kind = input.attr("type").unwrap_or_default().to_ascii_lowercase();
			match kind.as_str() {
				"submit" | "button" | "image" | "reset" | "file" => continue,
				"checkbox" | "radio" if !input.has_attr("checked") => continue,
				_ => {}
			}
			fields.push((name, input.attr("value").unwrap_or_default()));
		}

		for select in form.find("select[name]") {
			let Some(name) = select.attr("name") else { continue };
			let option = select.find_first("option[selected]").or_else(|| select.find_first("option"));
			let value = option.map(|o| o.attr("value").unwrap_or_else(|| o.text())).unwrap_or_default();
			fields.push((name, value));
		}

		Self {
			action: form.attr("action").filter(|a| !a.trim().is_empty()),
			method: form.attr("method").unwrap_or_else(|| "get".into()).to_ascii_uppercase(),
			fields,
		}
	}

	pub fn field(&self, name: &str) -> Option<&str> {
		self.fields.iter().find(|(k, _)| k == name).map(|(_, v)| v.as_str())
	}

	/// Replaces the first field named `name` or appends it.
	pub fn set(&mut self, name: &str, value: impl Into<String>) {
		let value = value.into();
		match self.fields.iter_mut().find(|(k, _)| k == name) {
			Some(slot) => slot.1 = value,
			None => self.fields.push((name.to_string(), value)),
		}
	}
}

/// `<input type="hidden">` fields under `root`.
pub fn hidden_fields(root: &Element<'_>) -> Vec<(String, String)> {
	root.find("input[type=hidden][name]")
		.into_iter()
		.filter_map(|input| Some((input.attr("name")?, input.attr("value").unwrap_or_default())))
		.collect()
}

/// Content of `<meta name="...">`.
pub fn meta_content(doc: &Document, name: &str) -> Option<String> {
	doc.find("meta[name]")
		.into_iter()
		.find(|meta| meta.attr("name").is_some_and(|n| n.eq_ignore_ascii_case(name)))
		.and_then(|meta| meta.attr("content"))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn collects_named_fields_and_skips_buttons() {
		let doc = Document::parse(
			r#"<form action="/checkout/77" method="post">
				<input type="hidden" name="_token" value="abc">
				<input type="hidden" name="order_ref" value="R-1">
				<input type="text" name="first_name">
				<input type="checkbox" name="terms">
				<input type="checkbox" name="news" checked value="yes">
				<select name="payment_method"><option value="card" selected>Card</option><option value="apple">Apple</option></select>
				<input type="submit" name="go" value="Pay">
			</form>"#,
		);
		let form = Form::from_element(&doc.find_first("form").unwrap());
		assert_eq!(form.action.as_deref(), Some("/checkout/77"));
		assert_eq!(form.method, "POST");
		assert_eq!(form.field("_token"), Some("abc"));
		assert_eq!(form.field("first_name"), Some(""));
		assert_eq!(form.field("terms"), None);
		assert_eq!(form.field("news"), Some("yes"));
		assert_eq!(form.field("payment_method"), Some("card"));
		assert_eq!(form.field("go"), None);

		let hidden = hidden_fields(&doc.find_first("form").unwrap());
		assert_eq!(hidden.len(), 2);
	}

	#[test]
	fn reads_csrf_meta() {
		let doc = Document::parse(r#"<head><meta name="csrf-token" content="tok-1"><meta charset="utf-8"></head>"#);
		assert_eq!(meta_content(&doc, "csrf-token").as_deref(), Some("tok-1"));
		assert_eq!(meta_content(&doc, "missing"), None);
	}
}
