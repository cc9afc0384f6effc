//! HTML scanning used by every page-reading step.
//!
//! Pages from the target site are read with a small selector engine rather
//! than a full DOM: the document is indexed once, then queried with the
//! ordered selector lists from the site profile.

mod dom;
mod form;
mod selector;
mod text;

pub use dom::{Document, Element};
pub use form::{Form, hidden_fields, meta_content};
pub use selector::{Selector, SelectorChain, SelectorError};
pub use text::{collapse_whitespace, contains_ignore_case, decode_html_entities, html_to_text, snippet};
